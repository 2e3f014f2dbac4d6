// crates/slam-telemetry-core/src/interfaces/mod.rs
// ============================================================================
// Module: SLAM Telemetry Interfaces
// Description: Collaborator contracts for trackers, maps, and run recorders.
// Purpose: Define the seams between the tracking pipeline and telemetry.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The tracking pipeline is an external collaborator. It exposes frames, key
//! frames, and map points through the read-only views below, and accepts a
//! reset through [`TrackerControl`]. Telemetry sinks implement
//! [`RunRecorder`]; every recorder method is fail-soft and returns nothing,
//! because observability failures must never interrupt tracking.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::pose::Matrix3;
use crate::core::pose::Vector3;
use crate::core::records::FrameSample;
use crate::core::time::Seconds;

// ============================================================================
// SECTION: Tracking Views
// ============================================================================

/// Frame produced by the tracker, carrying its world-to-camera pose.
pub trait TrackedFrame {
    /// Frame timestamp.
    fn timestamp(&self) -> Seconds;

    /// World-to-camera rotation `R_cw` and translation `t_cw`.
    fn camera_pose(&self) -> (Matrix3, Vector3);
}

/// Key frame with a cached inverse pose.
pub trait KeyFrameView {
    /// Key frame timestamp.
    fn timestamp(&self) -> Seconds;

    /// Camera-to-world rotation `R_wc` and camera center `o_w`.
    fn inverse_pose(&self) -> (Matrix3, Vector3);
}

/// Landmark in the current map.
pub trait MapPointView {
    /// Landmark position in world coordinates.
    fn world_position(&self) -> Vector3;
}

// ============================================================================
// SECTION: Tracker Control
// ============================================================================

/// Control surface the tracker exposes to the command channel.
pub trait TrackerControl {
    /// Clears the map and tracking state. Safe to call at any time.
    fn reset(&self);

    /// Length of the sequence processed so far, when the tracker knows it.
    fn sequence_length(&self) -> Option<Seconds> {
        None
    }
}

// ============================================================================
// SECTION: Run Recorder
// ============================================================================

/// Sink for per-run telemetry.
///
/// # Invariants
/// - No method fails or panics; unavailable storage turns calls into no-ops.
/// - Implementations serialize all calls against shared recorder state.
pub trait RunRecorder {
    /// Selects the active run, resetting its per-run storage.
    fn set_id(&self, run_id: &str);

    /// Records the delay between start-up and tracker initialization.
    fn set_initialization_time(&self, delay: Seconds);

    /// Persists one frame sample for the active run.
    fn record_frame(&self, sample: &FrameSample);

    /// Accumulates one tracking-loss event of the given duration.
    fn record_loss(&self, duration: Seconds);

    /// Appends the time at which tracking was lost.
    fn record_loss_at(&self, timestamp: Seconds);

    /// Writes the run summary and starts a new run segment.
    fn finalize(&self, sequence_length: Seconds);

    /// Writes map point positions for the active run.
    fn export_map(&self, points: &[Vector3]);

    /// Decodes and persists a tracked frame.
    fn record_tracked_frame(&self, frame: &dyn TrackedFrame, is_key_frame: bool) {
        self.record_frame(&FrameSample::from_frame(frame, is_key_frame));
    }

    /// Decodes and persists a key frame from its cached inverse pose.
    fn record_key_frame(&self, key_frame: &dyn KeyFrameView) {
        self.record_frame(&FrameSample::from_key_frame(key_frame));
    }

    /// Writes the positions of the given map points for the active run.
    fn export_map_points(&self, points: &[&dyn MapPointView]) {
        let positions: Vec<Vector3> = points.iter().map(|point| point.world_position()).collect();
        self.export_map(&positions);
    }
}
