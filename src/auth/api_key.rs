//! Issued API keys.
//!
//! A key has the shape `besco_<username>_<tag>` where `<tag>` is the first
//! 16 bytes of HMAC-SHA256(secret, username), base64url encoded. Keys are
//! verified by recomputing the tag, so nothing has to be stored.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const KEY_PREFIX: &str = "besco_";

/// Truncated HMAC length in bytes.
const TAG_LENGTH: usize = 16;

/// Length of the base64url (unpadded) encoding of the tag.
const ENCODED_TAG_LENGTH: usize = 22;

pub struct ApiKeySigner {
    key: Vec<u8>,
}

impl ApiKeySigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    pub fn issue(&self, username: &str) -> String {
        let tag = self.tag(username);
        format!("{KEY_PREFIX}{username}_{}", URL_SAFE_NO_PAD.encode(tag))
    }

    /// Returns the username the key was issued to.
    pub fn verify(&self, api_key: &str) -> Option<String> {
        let rest = api_key.strip_prefix(KEY_PREFIX)?;
        if rest.len() <= ENCODED_TAG_LENGTH || !rest.is_char_boundary(rest.len() - ENCODED_TAG_LENGTH) {
            return None;
        }
        let (head, encoded_tag) = rest.split_at(rest.len() - ENCODED_TAG_LENGTH);
        let username = head.strip_suffix('_')?;
        if username.is_empty() {
            return None;
        }

        let presented = URL_SAFE_NO_PAD.decode(encoded_tag).ok()?;
        let expected = self.tag(username);
        if bool::from(presented.as_slice().ct_eq(&expected[..])) {
            Some(username.to_string())
        } else {
            None
        }
    }

    fn tag(&self, username: &str) -> [u8; TAG_LENGTH] {
        // HMAC accepts keys of any length.
        let mut mac = match HmacSha256::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(_) => return [0u8; TAG_LENGTH],
        };
        mac.update(username.as_bytes());
        let digest = mac.finalize().into_bytes();

        let mut tag = [0u8; TAG_LENGTH];
        tag.copy_from_slice(&digest[..TAG_LENGTH]);
        tag
    }
}

/// Constant-time membership test against the configured static keys.
pub fn matches_static_key(candidate: &str, keys: &[String]) -> bool {
    keys.iter()
        .filter(|k| !k.is_empty())
        .fold(false, |found, key| {
            found | bool::from(key.as_bytes().ct_eq(candidate.as_bytes()))
        })
}
