// crates/slam-telemetry-core/src/runtime/mod.rs
// ============================================================================
// Module: SLAM Telemetry Runtime
// Description: Control-plane routing for telemetry and tracker commands.
// Purpose: Expose the command parser and dispatcher.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The runtime hosts the stateless control-message router. Hosts feed it one
//! text message at a time from whatever channel delivers control commands.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dispatcher;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dispatcher::CommandDispatcher;
pub use dispatcher::CommandParseError;
pub use dispatcher::ControlCommand;
pub use dispatcher::DispatchOutcome;
