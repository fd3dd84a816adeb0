//! Validated SQL identifiers.
//!
//! Table and column names come from file names, spreadsheet headers and
//! request paths. Every one of them passes through [`Identifier`] before it is
//! written into statement text, and is always emitted double-quoted.
use std::fmt::Display;
use thiserror::Error;

/// Longest identifier accepted, in characters.
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

#[derive(Error, Debug, PartialEq)]
pub enum IdentifierError {
    #[error("Identifier must not be empty")]
    Empty,

    #[error("Identifier '{0}' is longer than {MAX_IDENTIFIER_LENGTH} characters")]
    TooLong(String),

    #[error("Identifier '{0}' contains control characters")]
    ControlCharacter(String),
}

/// A table or column name that is safe to embed in a statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validates a raw name.
    ///
    /// # Errors
    ///
    /// Rejects empty names, names longer than [`MAX_IDENTIFIER_LENGTH`] and
    /// names containing control characters (including NUL).
    pub fn new(name: impl Into<String>) -> Result<Self, IdentifierError> {
        let name = name.into();
        if name.is_empty() {
            Err(IdentifierError::Empty)
        } else if name.chars().count() > MAX_IDENTIFIER_LENGTH {
            Err(IdentifierError::TooLong(name))
        } else if name.chars().any(char::is_control) {
            Err(IdentifierError::ControlCharacter(name))
        } else {
            Ok(Self(name))
        }
    }

    /// The unquoted name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name quoted for statement text, with embedded quotes doubled.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Identifier::new(value)
    }
}

/// Joins identifiers as a quoted, comma separated column list.
pub(crate) fn quoted_list(identifiers: &[Identifier]) -> String {
    identifiers
        .iter()
        .map(Identifier::quoted)
        .collect::<Vec<_>>()
        .join(", ")
}
