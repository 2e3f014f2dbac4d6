// crates/slam-telemetry-core/src/lib.rs
// ============================================================================
// Module: SLAM Telemetry Core Library
// Description: Public API surface for the SLAM telemetry core.
// Purpose: Expose core types, collaborator interfaces, and the command dispatcher.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! SLAM telemetry core defines the value types recorded for a tracking run
//! (frame samples, loss statistics, global summaries), the pose codec that
//! turns camera poses into world positions and Euler angles, and the control
//! dispatcher that routes text commands to a run recorder and a tracker. It is
//! storage-agnostic: persistence lives behind the [`RunRecorder`] interface.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::KeyFrameView;
pub use interfaces::MapPointView;
pub use interfaces::RunRecorder;
pub use interfaces::TrackedFrame;
pub use interfaces::TrackerControl;
pub use runtime::CommandDispatcher;
pub use runtime::CommandParseError;
pub use runtime::ControlCommand;
pub use runtime::DispatchOutcome;
