use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Validated blueprint name. Names double as branch names in the store, so
/// they must be non-empty, not `-`, and free of whitespace and `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlueprintName(String);

pub fn validate_name(name: &str) -> Result<(), SchemaError> {
    if name.is_empty() || name == "-" {
        return Err(SchemaError::InvalidName(name.to_owned()));
    }
    if name.chars().any(|c| c == '/' || c.is_whitespace()) {
        return Err(SchemaError::InvalidName(name.to_owned()));
    }
    Ok(())
}

impl BlueprintName {
    pub fn new(name: impl Into<String>) -> Result<Self, SchemaError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for BlueprintName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlueprintName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlueprintName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BlueprintName {
    type Error = SchemaError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for BlueprintName {
    type Error = SchemaError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl FromStr for BlueprintName {
    type Err = SchemaError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<BlueprintName> for String {
    fn from(name: BlueprintName) -> Self {
        name.0
    }
}
