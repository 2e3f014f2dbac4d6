// crates/slam-telemetry-core/src/core/identifiers.rs
// ============================================================================
// Module: SLAM Telemetry Identifiers
// Description: Validated run identifiers for recorded tracking sessions.
// Purpose: Provide a run id that is safe to use as a storage object name.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Run identifiers arrive from an external control channel and end up naming
//! a per-run table. [`RunId::parse`] is the only constructor, so every
//! `RunId` in the system has already been checked against the character set
//! and reserved names below. `SQLite` resolves table names without regard to
//! ASCII case, so ids are folded to lowercase: `Run1` and `run1` name the
//! same run, the same table, and the same summary row.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum run identifier length in bytes.
pub const MAX_RUN_ID_LENGTH: usize = 128;

/// Names owned by the recorder schema that a run may not shadow.
const RESERVED_RUN_IDS: [&str; 2] = ["global", "store_meta"];

/// Prefix reserved by `SQLite` for internal tables.
const RESERVED_PREFIX: &str = "sqlite_";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Run identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunIdError {
    /// The identifier was empty.
    #[error("run id is empty")]
    Empty,
    /// The identifier exceeded [`MAX_RUN_ID_LENGTH`].
    #[error("run id exceeds {MAX_RUN_ID_LENGTH} bytes: {0} bytes")]
    TooLong(usize),
    /// The identifier contained a character outside `[A-Za-z0-9_-]`.
    #[error("run id contains invalid character {0:?}")]
    InvalidCharacter(char),
    /// The identifier collides with a recorder-owned name.
    #[error("run id is reserved: {0}")]
    Reserved(String),
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Identifier of one recording session.
///
/// # Invariants
/// - Non-empty, at most [`MAX_RUN_ID_LENGTH`] bytes.
/// - Only lowercase ASCII letters, digits, `_` and `-`.
/// - Never equal (case-insensitively) to `Global` or `store_meta`, never
///   prefixed with `sqlite_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Parses and validates a run identifier, folding it to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`RunIdError`] when the identifier is empty, too long, contains
    /// a disallowed character, or is reserved.
    pub fn parse(raw: &str) -> Result<Self, RunIdError> {
        if raw.is_empty() {
            return Err(RunIdError::Empty);
        }
        if raw.len() > MAX_RUN_ID_LENGTH {
            return Err(RunIdError::TooLong(raw.len()));
        }
        if let Some(bad) = raw.chars().find(|ch| !is_run_id_char(*ch)) {
            return Err(RunIdError::InvalidCharacter(bad));
        }
        let lowered = raw.to_ascii_lowercase();
        if RESERVED_RUN_IDS.contains(&lowered.as_str()) || lowered.starts_with(RESERVED_PREFIX) {
            return Err(RunIdError::Reserved(raw.to_string()));
        }
        Ok(Self(lowered))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier as a double-quoted SQL identifier.
    #[must_use]
    pub fn quoted_identifier(&self) -> String {
        // Validation already excludes quotes; the escape keeps the helper total.
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for RunId {
    type Error = RunIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for RunId {
    type Error = RunIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RunId> for String {
    fn from(value: RunId) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when `ch` is allowed in a run identifier.
const fn is_run_id_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}
