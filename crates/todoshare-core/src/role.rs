use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A position in the reader < writer < admin hierarchy.
///
/// Role strings coming from tokens or storage are never rejected at parse
/// time; anything unrecognised is carried as [`Role::Invalid`] so callers can
/// see exactly what was presented. An invalid role satisfies nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Reader,
    Writer,
    Admin,
    Invalid(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Reader => "reader",
            Role::Writer => "writer",
            Role::Admin => "admin",
            Role::Invalid(raw) => raw,
        }
    }

    pub fn power(&self) -> u8 {
        match self {
            Role::Reader => 1,
            Role::Writer => 2,
            Role::Admin => 3,
            Role::Invalid(_) => 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Role::Invalid(_))
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// True when a holder of `self` may perform an action requiring `required`.
    pub fn satisfies(&self, required: &Role) -> bool {
        satisfies(required, self)
    }
}

/// `power(actual) >= power(required)`, with either side invalid failing.
pub fn satisfies(required: &Role, actual: &Role) -> bool {
    if !required.is_valid() || !actual.is_valid() {
        return false;
    }
    actual.power() >= required.power()
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        match raw {
            "reader" => Role::Reader,
            "writer" => Role::Writer,
            "admin" => Role::Admin,
            other => Role::Invalid(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match Role::from(raw.as_str()) {
            Role::Invalid(_) => Role::Invalid(raw),
            role => role,
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Invalid(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Role::from(s))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
