use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::AuthError;

#[derive(Debug, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Parses an `Authorization: Basic <base64(user:pass)>` header value.
pub fn parse_basic(header_value: &str) -> Result<BasicCredentials, AuthError> {
    let (scheme, encoded) = header_value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidScheme)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::InvalidScheme);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;

    // The password may itself contain ':'.
    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthError::MalformedCredentials)?;

    Ok(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(raw: &str) -> String {
        format!("Basic {}", STANDARD.encode(raw))
    }

    #[test]
    fn parses_username_and_password() {
        let creds = parse_basic(&encode("admin:admin123")).unwrap();
        assert_eq!(
            creds,
            BasicCredentials {
                username: "admin".into(),
                password: "admin123".into()
            }
        );
    }

    #[test]
    fn password_may_contain_colons() {
        let creds = parse_basic(&encode("admin:a:b:c")).unwrap();
        assert_eq!(creds.password, "a:b:c");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let value = format!("basic {}", STANDARD.encode("u:p"));
        assert!(parse_basic(&value).is_ok());
    }

    #[test]
    fn bearer_scheme_is_rejected() {
        assert!(matches!(parse_basic("Bearer abc"), Err(AuthError::InvalidScheme)));
    }

    #[test]
    fn invalid_payloads_are_rejected() {
        assert!(matches!(
            parse_basic("Basic !!!not-base64"),
            Err(AuthError::MalformedCredentials)
        ));
        assert!(matches!(
            parse_basic(&encode("no-separator")),
            Err(AuthError::MalformedCredentials)
        ));
    }
}
