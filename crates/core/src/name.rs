//! Validated display names for categories and items.

use serde::Serialize;
use thiserror::Error;

/// Longest accepted name, counted in characters rather than bytes.
pub const MAX_NAME_LEN: usize = 50;

/// Why a raw name was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// Empty or whitespace-only (U+3000 ideographic space included).
    #[error("name is blank")]
    Blank,

    #[error("name exceeds {MAX_NAME_LEN} characters")]
    TooLong,
}

/// A category or item name: 1 to 50 visible characters.
///
/// The raw value is kept as supplied; validation only rejects, it never
/// rewrites. Whitespace-only names are blank because they render as
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityName(String);

impl EntityName {
    pub fn new(raw: impl Into<String>) -> Result<Self, NameError> {
        let raw = raw.into();
        if raw.chars().all(char::is_whitespace) {
            return Err(NameError::Blank);
        }
        if raw.chars().count() > MAX_NAME_LEN {
            return Err(NameError::TooLong);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl core::fmt::Display for EntityName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
