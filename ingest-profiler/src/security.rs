//! Credential handling and SQL identifier quoting.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ProfilerError, Result};

/// A secure string that automatically clears its contents when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert to a regular string. The SecureString will be zeroized.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Maximum identifier length accepted by every supported dialect.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// SQL dialects the DDL renderer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    /// Double-quoted identifiers
    Postgres,
    /// Backtick-quoted identifiers
    ClickHouse,
    /// Backtick-quoted identifiers
    Hive,
}

/// Identifier validation and quoting.
///
/// Column names come straight from file headers, so they may contain spaces
/// or punctuation. Instead of rejecting those, identifiers are always quoted
/// and embedded quote characters are doubled.
pub struct SqlIdentifier;

impl SqlIdentifier {
    /// Rejects identifiers that cannot be quoted safely.
    pub fn validate(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(ProfilerError::Security(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }
        if identifier.chars().count() > MAX_IDENTIFIER_LENGTH {
            return Err(ProfilerError::Security(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }
        if identifier.contains('\0') {
            return Err(ProfilerError::Security(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates and quotes an identifier for the given dialect.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ingest_profiler::security::{SqlDialect, SqlIdentifier};
    ///
    /// assert_eq!(SqlIdentifier::quote("first name", SqlDialect::Postgres).unwrap(), "\"first name\"");
    /// assert_eq!(SqlIdentifier::quote("a`b", SqlDialect::ClickHouse).unwrap(), "`a``b`");
    /// assert!(SqlIdentifier::quote("", SqlDialect::Hive).is_err());
    /// ```
    pub fn quote(identifier: &str, dialect: SqlDialect) -> Result<String> {
        Self::validate(identifier)?;
        let quoted = match dialect {
            SqlDialect::Postgres => format!("\"{}\"", identifier.replace('"', "\"\"")),
            SqlDialect::ClickHouse | SqlDialect::Hive => {
                format!("`{}`", identifier.replace('`', "``"))
            }
        };
        Ok(quoted)
    }

    /// Escapes a string literal by doubling single quotes.
    pub fn quote_literal(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_masks_debug() {
        let secret = SecureString::new("super-secret");
        assert_eq!(format!("{secret:?}"), "SecureString(***)");
        assert_eq!(secret.expose(), "super-secret");
        assert_eq!(secret.into_string(), "super-secret");
    }

    #[test]
    fn test_quote_escapes_embedded_quotes() {
        assert_eq!(
            SqlIdentifier::quote("say \"hi\"", SqlDialect::Postgres).unwrap(),
            "\"say \"\"hi\"\"\""
        );
        assert_eq!(
            SqlIdentifier::quote("id; DROP TABLE users--", SqlDialect::Postgres).unwrap(),
            "\"id; DROP TABLE users--\""
        );
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(SqlIdentifier::validate("   ").is_err());
        assert!(SqlIdentifier::validate("bad\0name").is_err());
        assert!(SqlIdentifier::validate(&"x".repeat(129)).is_err());
        assert!(SqlIdentifier::validate(&"x".repeat(128)).is_ok());
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(SqlIdentifier::quote_literal("it's"), "'it''s'");
    }
}
