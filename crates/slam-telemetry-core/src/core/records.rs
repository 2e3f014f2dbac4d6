// crates/slam-telemetry-core/src/core/records.rs
// ============================================================================
// Module: SLAM Telemetry Records
// Description: Frame samples, loss statistics, and per-run summaries.
// Purpose: Define the rows a run recorder persists and how they are derived.
// Dependencies: serde, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! A run produces one [`FrameSample`] per tracked frame and, on finalize, one
//! [`GlobalSummary`] built from the current [`LossAccumulator`]. The
//! accumulator covers a run segment: it starts empty and is reset after each
//! summary is written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RunId;
use crate::core::pose::PoseSample;
use crate::core::time::Millis;
use crate::core::time::Seconds;
use crate::interfaces::KeyFrameView;
use crate::interfaces::TrackedFrame;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator used when serializing loss timestamps.
pub const LOSS_DETAIL_SEPARATOR: &str = ";";

// ============================================================================
// SECTION: Frame Sample
// ============================================================================

/// One recorded frame of a run.
///
/// # Invariants
/// - `timestamp` is the frame time in milliseconds, truncated from seconds.
/// - Within one run, `timestamp` is unique; a later write replaces an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    /// Frame timestamp.
    pub timestamp: Millis,
    /// Whether the frame was promoted to a key frame.
    pub is_key_frame: bool,
    /// Decoded camera pose.
    pub pose: PoseSample,
}

impl FrameSample {
    /// Creates a frame sample from already-decoded values.
    #[must_use]
    pub const fn new(timestamp: Millis, is_key_frame: bool, pose: PoseSample) -> Self {
        Self {
            timestamp,
            is_key_frame,
            pose,
        }
    }

    /// Decodes a tracked frame from its world-to-camera pose.
    #[must_use]
    pub fn from_frame(frame: &dyn TrackedFrame, is_key_frame: bool) -> Self {
        let (rotation_cw, translation_cw) = frame.camera_pose();
        Self::new(
            frame.timestamp().to_millis(),
            is_key_frame,
            PoseSample::from_camera_pose(&rotation_cw, translation_cw),
        )
    }

    /// Decodes a key frame from its cached camera-to-world pose.
    #[must_use]
    pub fn from_key_frame(key_frame: &dyn KeyFrameView) -> Self {
        let (rotation_wc, center_w) = key_frame.inverse_pose();
        Self::new(
            key_frame.timestamp().to_millis(),
            true,
            PoseSample::from_inverse_pose(&rotation_wc, center_w),
        )
    }
}

// ============================================================================
// SECTION: Loss Accumulator
// ============================================================================

/// Tracking-loss statistics for the current run segment.
///
/// # Invariants
/// - `total_time_lost` and `max_time_lost` never decrease between resets.
/// - `loss_timestamps` is append-only between resets and keeps arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LossAccumulator {
    /// Number of loss events.
    times_lost: u32,
    /// Sum of loss durations.
    total_time_lost: Millis,
    /// Longest single loss duration.
    max_time_lost: Millis,
    /// Loss event times in arrival order.
    loss_timestamps: Vec<Millis>,
}

impl LossAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            times_lost: 0,
            total_time_lost: Millis::ZERO,
            max_time_lost: Millis::ZERO,
            loss_timestamps: Vec::new(),
        }
    }

    /// Records one loss event of the given duration.
    ///
    /// Negative durations count as an event of zero length.
    pub fn record_loss(&mut self, duration: Seconds) {
        let duration = duration.to_millis().max(Millis::ZERO);
        self.times_lost = self.times_lost.saturating_add(1);
        self.max_time_lost = self.max_time_lost.max(duration);
        self.total_time_lost = self.total_time_lost.saturating_add(duration);
    }

    /// Appends the time at which a loss event happened.
    pub fn record_loss_at(&mut self, timestamp: Seconds) {
        self.loss_timestamps.push(timestamp.to_millis());
    }

    /// Returns the number of loss events.
    #[must_use]
    pub const fn times_lost(&self) -> u32 {
        self.times_lost
    }

    /// Returns the summed loss duration.
    #[must_use]
    pub const fn total_time_lost(&self) -> Millis {
        self.total_time_lost
    }

    /// Returns the longest loss duration.
    #[must_use]
    pub const fn max_time_lost(&self) -> Millis {
        self.max_time_lost
    }

    /// Returns the recorded loss times.
    #[must_use]
    pub fn loss_timestamps(&self) -> &[Millis] {
        &self.loss_timestamps
    }

    /// Serializes loss times as `a;b;c`, skipping zero entries.
    #[must_use]
    pub fn lost_details(&self) -> String {
        self.loss_timestamps
            .iter()
            .filter(|value| !value.is_zero())
            .map(|value| value.value().to_string())
            .collect::<Vec<_>>()
            .join(LOSS_DETAIL_SEPARATOR)
    }

    /// Clears all statistics, starting a new run segment.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// ============================================================================
// SECTION: Global Summary
// ============================================================================

/// Aggregate statistics for one run, written on finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSummary {
    /// Run the summary belongs to.
    pub run_id: RunId,
    /// Delay between start-up and tracker initialization.
    pub initialization_delay: Millis,
    /// Number of loss events in the segment.
    pub times_lost: u32,
    /// Summed loss duration.
    pub total_time_lost: Millis,
    /// Longest single loss.
    pub max_time_lost: Millis,
    /// Length of the recorded sequence.
    pub sequence_length: Millis,
    /// Serialized loss times (see [`LossAccumulator::lost_details`]).
    pub lost_details: String,
}

impl GlobalSummary {
    /// Builds a summary from the current segment statistics.
    #[must_use]
    pub fn from_accumulator(
        run_id: RunId,
        initialization_delay: Millis,
        losses: &LossAccumulator,
        sequence_length: Seconds,
    ) -> Self {
        Self {
            run_id,
            initialization_delay,
            times_lost: losses.times_lost(),
            total_time_lost: losses.total_time_lost(),
            max_time_lost: losses.max_time_lost(),
            sequence_length: sequence_length.to_millis(),
            lost_details: losses.lost_details(),
        }
    }
}
