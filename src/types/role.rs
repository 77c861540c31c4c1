use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InputError};

/// A persona identifier that selects which behavior the backend applies.
///
/// Roles are opaque to the client.  The only rule enforced locally is that a role is not blank;
/// surrounding whitespace is trimmed on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Creates a role from user input, rejecting blank strings.
    pub fn new(role: impl AsRef<str>) -> Result<Self, Error> {
        let role = role.as_ref().trim();
        if role.is_empty() {
            return Err(Error::input(InputError::NoRole));
        }
        Ok(Self(role.to_string()))
    }

    /// Returns the role as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::new(s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
