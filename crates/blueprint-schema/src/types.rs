//! Identifiers handed out by the revision store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Hex blake3 digests. Both serialize as bare strings and deref to `str`, so
/// they can be passed anywhere the store expects a hash.
macro_rules! hash_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(hex: impl Into<String>) -> Self {
                Self(hex.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }

            /// Leading 12 characters, used for display.
            pub fn short(&self) -> &str {
                self.0.get(..12).unwrap_or(&self.0)
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(hex: String) -> Self {
                Self(hex)
            }
        }
    };
}

hash_newtype!(
    /// Hash of a revision record; names one committed version of a blueprint.
    RevisionId
);

hash_newtype!(
    /// Hash of an object's bytes in the store.
    ObjectHash
);
