// crates/slam-telemetry-cli/src/lib.rs
// ============================================================================
// Module: SLAM Telemetry CLI Library
// Description: Shared helpers for the slam-telemetry command-line interface.
// Purpose: Provide the stand-in tracker and replay event model to the binary
//          and its tests.
// Dependencies: slam-telemetry-core, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! The `slam-telemetry` binary hosts a run recorder without a live tracker.
//! [`tracker::StandInTracker`] plays the tracker's part on the control
//! channel, and [`replay`] feeds a recorded JSON-lines session through the
//! recorder and dispatcher.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod replay;
pub mod tracker;
