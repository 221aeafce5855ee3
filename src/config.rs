use std::net::IpAddr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::reports::OverheadRates;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;
const DEFAULT_ADMIN_USERNAME: &str = "admin";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("failed to hash ADMIN_PASSWORD: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_connections: u32,
    pub run_migrations: bool,
    pub auth: AuthConfig,
    pub overheads: OverheadRates,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_key: String,
    pub api_keys: Vec<String>,
    pub token_ttl_minutes: i64,
    pub admin_username: String,
    /// bcrypt hash; `None` disables password logins.
    pub admin_password_hash: Option<String>,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let secret_key = get("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;

        let host = parse_or("HOST", get("HOST"), DEFAULT_HOST.parse().ok())?;
        let port = parse_or("PORT", get("PORT"), Some(DEFAULT_PORT))?;
        let max_connections = parse_or(
            "DATABASE_MAX_CONNECTIONS",
            get("DATABASE_MAX_CONNECTIONS"),
            Some(DEFAULT_MAX_CONNECTIONS),
        )?;
        let run_migrations = parse_or("RUN_MIGRATIONS", get("RUN_MIGRATIONS"), Some(true))?;
        let token_ttl_minutes = parse_or(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            get("ACCESS_TOKEN_EXPIRE_MINUTES"),
            Some(DEFAULT_TOKEN_TTL_MINUTES),
        )?;
        if token_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: token_ttl_minutes.to_string(),
            });
        }

        let defaults = OverheadRates::default();
        let overheads = OverheadRates {
            packaging_per_kg: parse_rate(
                "PACKAGING_COST_PER_KG",
                get("PACKAGING_COST_PER_KG"),
                defaults.packaging_per_kg,
            )?,
            shipping_box: parse_rate(
                "SHIPPING_BOX_COST",
                get("SHIPPING_BOX_COST"),
                defaults.shipping_box,
            )?,
            kg_per_box: parse_rate(
                "SHIPPING_BOX_KG",
                get("SHIPPING_BOX_KG"),
                defaults.kg_per_box,
            )?,
            per_order: parse_rate(
                "ORDER_BOX_COST",
                get("ORDER_BOX_COST"),
                defaults.per_order,
            )?,
            monthly_rent: parse_rate(
                "MONTHLY_RENT",
                get("MONTHLY_RENT"),
                defaults.monthly_rent,
            )?,
        };
        if overheads.kg_per_box.is_zero() {
            return Err(ConfigError::Invalid {
                key: "SHIPPING_BOX_KG",
                value: overheads.kg_per_box.to_string(),
            });
        }

        let admin_password_hash = match (get("ADMIN_PASSWORD_HASH"), get("ADMIN_PASSWORD")) {
            (Some(hash), _) => Some(hash),
            (None, Some(plain)) => Some(bcrypt::hash(plain, bcrypt::DEFAULT_COST)?),
            (None, None) => None,
        };

        Ok(Config {
            database_url,
            host,
            port,
            max_connections,
            run_migrations,
            auth: AuthConfig {
                secret_key,
                api_keys: parse_api_keys(get("API_KEYS").as_deref().unwrap_or_default()),
                token_ttl_minutes,
                admin_username: get("ADMIN_USERNAME")
                    .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
                admin_password_hash,
            },
            overheads,
        })
    }
}

/// Splits the comma-separated `API_KEYS` value, dropping blank entries.
pub fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => default.ok_or(ConfigError::Missing(key)),
    }
}

/// Overhead rates must be non-negative and no larger than a price column holds.
fn parse_rate(
    key: &'static str,
    raw: Option<String>,
    default: Decimal,
) -> Result<Decimal, ConfigError> {
    let rate: Decimal = parse_or(key, raw, Some(default))?;
    if rate < Decimal::ZERO || rate > Decimal::new(999_999_999_999_99, 2) {
        return Err(ConfigError::Invalid {
            key,
            value: rate.to_string(),
        });
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_keys_are_set() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://besco@localhost/besco"),
            ("SECRET_KEY", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.host.to_string(), "127.0.0.1");
        assert_eq!(config.max_connections, 5);
        assert!(config.run_migrations);
        assert_eq!(config.auth.token_ttl_minutes, 30);
        assert_eq!(config.auth.admin_username, "admin");
        assert!(config.auth.api_keys.is_empty());
        assert!(config.auth.admin_password_hash.is_none());
        assert_eq!(config.overheads, OverheadRates::default());
    }

    #[test]
    fn overhead_rates_can_be_overridden() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://localhost/besco"),
            ("SECRET_KEY", "s3cret"),
            ("MONTHLY_RENT", "700000"),
            ("SHIPPING_BOX_KG", "20"),
        ]))
        .unwrap();
        assert_eq!(config.overheads.monthly_rent, Decimal::from(700_000));
        assert_eq!(config.overheads.kg_per_box, Decimal::from(20));
        assert_eq!(config.overheads.per_order, Decimal::from(1_000));
    }

    #[test]
    fn zero_box_size_and_negative_rates_are_rejected() {
        for (key, value) in [("SHIPPING_BOX_KG", "0"), ("ORDER_BOX_COST", "-1")] {
            let err = Config::from_lookup(lookup(&[
                ("DATABASE_URL", "mysql://localhost/besco"),
                ("SECRET_KEY", "s3cret"),
                (key, value),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{key}");
        }
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "mysql://localhost/besco")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SECRET_KEY")));
    }

    #[test]
    fn invalid_port_is_reported_with_its_value() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://localhost/besco"),
            ("SECRET_KEY", "s3cret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "PORT has an invalid value: eighty");
    }

    #[test]
    fn api_keys_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(
            parse_api_keys(" key-one, ,key-two,,"),
            vec!["key-one".to_string(), "key-two".to_string()]
        );
        assert!(parse_api_keys("").is_empty());
    }

    #[test]
    fn explicit_password_hash_wins_over_plain_password() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "mysql://localhost/besco"),
            ("SECRET_KEY", "s3cret"),
            ("ADMIN_PASSWORD_HASH", "$2b$04$precomputed"),
            ("ADMIN_PASSWORD", "ignored"),
        ]))
        .unwrap();
        assert_eq!(
            config.auth.admin_password_hash.as_deref(),
            Some("$2b$04$precomputed")
        );
    }
}
