// crates/slam-telemetry-config/src/lib.rs
// ============================================================================
// Module: SLAM Telemetry Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for slam-telemetry.toml semantics.
// Dependencies: slam-telemetry-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `slam-telemetry-config` loads `slam-telemetry.toml`, applies defaults, and
//! validates it fail-closed before any storage is touched. The recorder
//! section converts directly into a store configuration.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
