// crates/slam-telemetry-core/src/core/time.rs
// ============================================================================
// Module: SLAM Telemetry Time Units
// Description: Typed seconds and milliseconds values.
// Purpose: Centralize the seconds-to-milliseconds conversion in one place.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Trackers report time in fractional seconds; the recorder persists integer
//! milliseconds. [`Seconds::to_millis`] is the only conversion between the
//! two, and it truncates toward zero so that re-recorded frames land on the
//! same primary key as previously stored data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Milliseconds per second.
const MILLIS_PER_SECOND: f64 = 1_000.0;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Duration or timestamp expressed in fractional seconds.
///
/// # Invariants
/// - No validation is performed at construction; non-finite values convert
///   to zero milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seconds(f64);

impl Seconds {
    /// Zero seconds.
    pub const ZERO: Self = Self(0.0);

    /// Creates a seconds value.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// Returns the raw seconds value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Converts to milliseconds, truncating toward zero.
    ///
    /// Values outside the `i64` range saturate; NaN and infinities map to zero.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Truncation toward zero is the documented conversion; float-to-int casts saturate."
    )]
    pub fn to_millis(self) -> Millis {
        if !self.0.is_finite() {
            return Millis::ZERO;
        }
        Millis((self.0 * MILLIS_PER_SECOND).trunc() as i64)
    }
}

impl From<f64> for Seconds {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Duration or timestamp expressed in whole milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Millis(i64);

impl Millis {
    /// Zero milliseconds.
    pub const ZERO: Self = Self(0);

    /// Creates a milliseconds value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw milliseconds value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns true when the value is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two values, saturating at the `i64` bounds.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl From<Seconds> for Millis {
    fn from(value: Seconds) -> Self {
        value.to_millis()
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
