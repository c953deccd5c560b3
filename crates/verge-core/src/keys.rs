//! Strongly-typed key wrappers for VergeOS resources.
//!
//! VergeOS identifies resources by opaque keys (40-character hex strings for
//! volumes, backend-assigned identifiers for jobs). Wrapping them prevents
//! passing a job key where a volume key is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Macro to generate strongly-typed key wrapper types.
macro_rules! key_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parses a key, rejecting empty or whitespace-only input.
            ///
            /// # Errors
            ///
            /// Returns [`Error::InvalidKey`] if the input is blank.
            pub fn parse_str(input: &str) -> Result<Self> {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    return Err(Error::InvalidKey(format!(
                        "{} must not be empty",
                        stringify!($name)
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Converts into the inner string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_str(s)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = Error;

            fn try_from(s: &str) -> Result<Self> {
                Self::parse_str(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

key_type!(VolumeKey, "NAS volume key");
key_type!(JobKey, "Asynchronous job key");

impl JobKey {
    /// Reads a job key out of a submission response.
    ///
    /// VergeOS returns the handle under `$key`, older endpoints under `id`;
    /// either may be a string or a number. Returns `None` when neither field
    /// holds a usable value.
    #[must_use]
    pub fn from_response(response: &serde_json::Value) -> Option<Self> {
        ["$key", "id"]
            .iter()
            .filter_map(|field| response.get(*field))
            .find_map(|value| match value {
                serde_json::Value::String(s) => Self::parse_str(s).ok(),
                serde_json::Value::Number(n) => Some(Self(n.to_string())),
                _ => None,
            })
    }
}
