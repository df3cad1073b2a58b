//! Controller identifier types
//!
//! Newtype wrappers for the opaque identifiers the controller hands out.
//! The controller formats most of them as UUIDs but makes no promise about it,
//! so they are kept as strings.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a controller-issued identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(
    /// Identifier of an asynchronous controller-side mutation
    /// (business API execution id or task id).
    ExecutionId
);

opaque_id!(
    /// Stable identifier of an inventory entity (site, tag).
    EntityId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_id_display() {
        let id = ExecutionId::new("0f6c-11ee");
        assert_eq!(id.to_string(), "0f6c-11ee");
        assert_eq!(id.as_str(), "0f6c-11ee");
    }

    #[test]
    fn test_entity_id_serde_is_transparent() {
        let id = EntityId::from("site-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"site-1\"");

        let parsed: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
