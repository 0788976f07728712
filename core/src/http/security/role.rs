//! Site roles.
//!
//! # Spring Equivalent
//! `hasRole("ADMIN")` / `GrantedAuthority("ROLE_ADMIN")`

use std::fmt;
use std::str::FromStr;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Prefix Spring puts in front of role names to form authorities.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Closed set of roles a site account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    View,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::View];

    /// Role name without prefix, e.g. `ADMIN`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::View => "VIEW",
        }
    }

    /// Authority string, e.g. `ROLE_ADMIN`.
    pub fn authority(&self) -> String {
        format!("{}{}", ROLE_PREFIX, self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role name is not one of [`Role::ALL`].
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("unknown role: {name}")]
pub struct UnknownRole {
    #[error(not(source))]
    pub name: String,
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Accepts both `ADMIN` and `ROLE_ADMIN`. Names are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix(ROLE_PREFIX).unwrap_or(s);
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == name)
            .ok_or_else(|| UnknownRole {
                name: s.to_string(),
            })
    }
}
