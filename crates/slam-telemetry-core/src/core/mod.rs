// crates/slam-telemetry-core/src/core/mod.rs
// ============================================================================
// Module: SLAM Telemetry Core Types
// Description: Canonical run, time, pose, and record structures.
// Purpose: Provide stable, serializable types shared by recorders and hosts.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types are the single source of truth for what a run recorder
//! persists. Storage backends and hosts consume them; they never re-derive
//! unit conversions or pose math on their own.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod pose;
pub mod records;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::MAX_RUN_ID_LENGTH;
pub use identifiers::RunId;
pub use identifiers::RunIdError;
pub use pose::Matrix3;
pub use pose::PoseSample;
pub use pose::Vector3;
pub use pose::YawPitchRoll;
pub use records::FrameSample;
pub use records::GlobalSummary;
pub use records::LOSS_DETAIL_SEPARATOR;
pub use records::LossAccumulator;
pub use time::Millis;
pub use time::Seconds;
