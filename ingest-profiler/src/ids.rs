//! Identifier generation for analyses, files and profiles.

use std::fmt;

use chrono::Utc;
use uuid::Uuid;

/// The kind of record an identifier names; used as the id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Analysis,
    File,
    Profile,
}

impl IdKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::File => "file",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// How the suffix after `<kind>_` is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdScheme {
    /// Random UUID v4 in simple (hyphen-less) form.
    #[default]
    Uuid,
    /// Seconds since the Unix epoch. Ids minted in the same second collide.
    UnixTimestamp,
}

/// Mints `<kind>_<suffix>` identifiers.
///
/// # Examples
///
/// ```rust
/// use ingest_profiler::ids::{IdGenerator, IdKind};
///
/// let id = IdGenerator::default().generate(IdKind::Analysis);
/// assert!(id.starts_with("analysis_"));
/// assert_eq!(id.len(), "analysis_".len() + 32);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator {
    scheme: IdScheme,
}

impl IdGenerator {
    pub fn new(scheme: IdScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> IdScheme {
        self.scheme
    }

    pub fn generate(&self, kind: IdKind) -> String {
        match self.scheme {
            IdScheme::Uuid => format!("{}_{}", kind.prefix(), Uuid::new_v4().simple()),
            IdScheme::UnixTimestamp => format!("{}_{}", kind.prefix(), Utc::now().timestamp()),
        }
    }

    pub fn analysis_id(&self) -> String {
        self.generate(IdKind::Analysis)
    }

    pub fn file_id(&self) -> String {
        self.generate(IdKind::File)
    }
}
