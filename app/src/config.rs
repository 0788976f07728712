use std::fs;
use std::io;
use std::net::SocketAddr;

use actix_web::cookie::Key;
use derive_more::{Display, Error};
use log::warn;

use site_security_core::http::security::{InMemoryUserDetailsService, UserAccount};

use crate::security::RuleOrdering;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
const MIN_SESSION_KEY_LEN: usize = 64;

/// Site configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub session_key: Option<Vec<u8>>,
    pub users_file: Option<String>,
    pub rule_ordering: RuleOrdering,
    pub secure_cookies: bool,
}

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("invalid value for {name}: {value}")]
    InvalidValue {
        #[error(not(source))]
        name: &'static str,
        value: String,
    },
    #[display("SITE_SESSION_KEY must be at least 64 bytes, got {_0}")]
    SessionKeyTooShort(#[error(not(source))] usize),
    #[display("read users file {path}: {source}")]
    ReadUsers { path: String, source: io::Error },
    #[display("parse users file: {_0}")]
    ParseUsers(serde_yaml::Error),
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            session_key: None,
            users_file: None,
            rule_ordering: RuleOrdering::default(),
            secure_cookies: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_value = lookup("SITE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_value.parse().map_err(|_| ConfigError::InvalidValue {
            name: "SITE_BIND",
            value: bind_value.clone(),
        })?;

        let session_key = match lookup("SITE_SESSION_KEY") {
            Some(key) if key.len() < MIN_SESSION_KEY_LEN => {
                return Err(ConfigError::SessionKeyTooShort(key.len()));
            }
            Some(key) => Some(key.into_bytes()),
            None => None,
        };

        let rule_ordering = match lookup("SITE_RULE_ORDERING") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: "SITE_RULE_ORDERING",
                value,
            })?,
            None => RuleOrdering::default(),
        };

        let secure_cookies = match lookup("SITE_SECURE_COOKIES").as_deref() {
            None => false,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "SITE_SECURE_COOKIES",
                    value: other.to_string(),
                })
            }
        };

        Ok(AppConfig {
            bind,
            session_key,
            users_file: lookup("SITE_USERS_FILE").filter(|path| !path.is_empty()),
            rule_ordering,
            secure_cookies,
        })
    }

    /// Signing key for the session cookie. Without `SITE_SESSION_KEY` a
    /// random key is used and sessions do not survive a restart.
    pub fn session_key(&self) -> Result<Key, ConfigError> {
        match &self.session_key {
            Some(bytes) => Key::try_from(bytes.as_slice()).map_err(|_| ConfigError::SessionKeyTooShort(bytes.len())),
            None => {
                warn!("SITE_SESSION_KEY not set, generating a random session key");
                Ok(Key::generate())
            }
        }
    }

    /// Accounts from `SITE_USERS_FILE`; empty when unset.
    pub fn load_users(&self) -> Result<InMemoryUserDetailsService, ConfigError> {
        let Some(path) = &self.users_file else {
            warn!("SITE_USERS_FILE not set, no account can log in");
            return Ok(InMemoryUserDetailsService::new());
        };
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadUsers {
            path: path.clone(),
            source,
        })?;
        parse_users(&contents)
    }
}

/// Parses a YAML list of `{email, password_hash, roles, enabled}` entries.
pub fn parse_users(contents: &str) -> Result<InMemoryUserDetailsService, ConfigError> {
    let accounts: Vec<UserAccount> = serde_yaml::from_str(contents).map_err(ConfigError::ParseUsers)?;
    Ok(InMemoryUserDetailsService::new().with_users(accounts))
}
