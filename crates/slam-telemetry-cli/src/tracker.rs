// crates/slam-telemetry-cli/src/tracker.rs
// ============================================================================
// Module: Stand-In Tracker
// Description: Tracker control surface for hosts without a live tracker.
// Purpose: Accept map resets and report the observed sequence length.
// Dependencies: slam-telemetry-core, tracing
// ============================================================================

//! ## Overview
//! [`StandInTracker`] remembers the earliest and latest frame timestamps it
//! has been shown since the last reset, and reports their difference as the
//! sequence length. Frame timestamps may be absolute (bag or epoch time), so
//! only the span is meaningful. A reset clears both and is logged, since
//! there is no map to clear.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use slam_telemetry_core::Seconds;
use slam_telemetry_core::TrackerControl;
use tracing::info;

// ============================================================================
// SECTION: Tracker
// ============================================================================

/// Mutable tracker state.
#[derive(Debug, Default)]
struct TrackerState {
    /// Earliest and latest frame timestamps since the last reset.
    span: Option<(Seconds, Seconds)>,
    /// Number of resets received.
    resets: u64,
}

/// Tracker stand-in used by the `listen` and `replay` commands.
#[derive(Debug, Default)]
pub struct StandInTracker {
    /// Shared state; the dispatcher holds the tracker behind an `Arc`.
    state: Mutex<TrackerState>,
}

impl StandInTracker {
    /// Creates a tracker with no observed frames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a frame with this timestamp was processed.
    pub fn observe(&self, timestamp: Seconds) {
        let mut state = self.lock();
        state.span = Some(match state.span {
            None => (timestamp, timestamp),
            Some((first, last)) => (
                Seconds::new(first.value().min(timestamp.value())),
                Seconds::new(last.value().max(timestamp.value())),
            ),
        });
    }

    /// Returns how many resets have been received.
    #[must_use]
    pub fn reset_count(&self) -> u64 {
        self.lock().resets
    }

    /// Locks the state, recovering from a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TrackerControl for StandInTracker {
    fn reset(&self) {
        let mut state = self.lock();
        state.span = None;
        state.resets = state.resets.saturating_add(1);
        info!(resets = state.resets, "stand-in tracker reset");
    }

    fn sequence_length(&self) -> Option<Seconds> {
        self.lock().span.map(|(first, last)| Seconds::new(last.value() - first.value()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
