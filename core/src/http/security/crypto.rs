//! Password encoding utilities.
//!
//! # Spring Security Equivalent
//! `org.springframework.security.crypto.password.PasswordEncoder`

use std::sync::LazyLock;

use derive_more::{Display, Error};
use log::warn;
use regex::Regex;

/// Shape of a modular-crypt BCrypt hash: `$2a$`, `$2b$`, `$2y$` or `$2$`,
/// two cost digits, then 53 characters of salt and digest.
static BCRYPT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A\$2(a|y|b)?\$(\d\d)\$[./0-9A-Za-z]{53}").expect("valid bcrypt pattern")
});

/// Spring's `BCryptPasswordEncoder` default strength.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Display, Error)]
pub enum CryptoError {
    #[display("password hashing failed: {_0}")]
    Hash(#[error(not(source))] String),
}

/// Trait for encoding and verifying passwords.
///
/// # Spring Security Equivalent
/// `PasswordEncoder` interface
///
/// # Example
/// ```
/// use site_security_core::http::security::crypto::{BCryptPasswordEncoder, PasswordEncoder};
///
/// let encoder = BCryptPasswordEncoder::with_cost(4);
/// let hash = encoder.encode("my_password").unwrap();
/// assert!(encoder.matches("my_password", &hash));
/// assert!(!encoder.matches("other", &hash));
/// ```
pub trait PasswordEncoder: Send + Sync {
    /// Encode the raw password.
    ///
    /// # Spring Equivalent
    /// `PasswordEncoder.encode(CharSequence rawPassword)`
    fn encode(&self, raw_password: &str) -> Result<String, CryptoError>;

    /// Verify a raw password against an encoded password.
    ///
    /// Never fails: a malformed stored hash simply does not match.
    ///
    /// # Spring Equivalent
    /// `PasswordEncoder.matches(CharSequence rawPassword, String encodedPassword)`
    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool;

    /// Returns true if the encoded password should be re-hashed.
    ///
    /// # Spring Equivalent
    /// `PasswordEncoder.upgradeEncoding(String encodedPassword)`
    fn upgrade_encoding(&self, _encoded_password: &str) -> bool {
        false
    }
}

/// BCrypt password encoder backed by the `bcrypt` crate.
///
/// # Spring Security Equivalent
/// `new BCryptPasswordEncoder()`
#[derive(Clone, Debug)]
pub struct BCryptPasswordEncoder {
    cost: u32,
}

impl BCryptPasswordEncoder {
    /// Creates an encoder with the default cost (10).
    pub fn new() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }

    /// Creates an encoder with a custom cost, clamped to 4..=31.
    pub fn with_cost(cost: u32) -> Self {
        let cost = cost.clamp(4, 31);
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BCryptPasswordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordEncoder for BCryptPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, CryptoError> {
        bcrypt::hash(raw_password, self.cost).map_err(|e| CryptoError::Hash(e.to_string()))
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        if encoded_password.is_empty() {
            warn!("Empty encoded password");
            return false;
        }
        if !BCRYPT_PATTERN.is_match(encoded_password) {
            warn!("Encoded password does not look like BCrypt");
            return false;
        }
        bcrypt::verify(raw_password, encoded_password).unwrap_or(false)
    }

    fn upgrade_encoding(&self, encoded_password: &str) -> bool {
        match BCRYPT_PATTERN.captures(encoded_password) {
            Some(caps) => caps
                .get(2)
                .and_then(|cost| cost.as_str().parse::<u32>().ok())
                .map_or(true, |hash_cost| hash_cost < self.cost),
            None => {
                warn!("Encoded password does not look like BCrypt");
                false
            }
        }
    }
}
