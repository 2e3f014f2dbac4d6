// crates/slam-telemetry-store-sqlite/src/lib.rs
// ============================================================================
// Module: SLAM Telemetry SQLite Store
// Description: Fail-soft RunRecorder backend using SQLite.
// Purpose: Persist per-run frame samples and global summaries for SLAM runs.
// Dependencies: slam-telemetry-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides [`SqliteRunRecorder`], a [`RunRecorder`] that writes
//! one table per run (frame samples keyed by timestamp) and a shared `Global`
//! table of run summaries. Map points are exported to CSV files next to the
//! database. Storage problems never reach the tracking caller: an open or
//! schema failure turns the recorder into an inert sink, and write failures
//! are logged and dropped.
//!
//! [`RunRecorder`]: slam_telemetry_core::RunRecorder

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod map_export;
pub mod recorder;
mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use map_export::MapExportConfig;
pub use recorder::RecorderStatus;
pub use recorder::SqliteJournalMode;
pub use recorder::SqliteRecorderConfig;
pub use recorder::SqliteRecorderError;
pub use recorder::SqliteRunRecorder;
pub use recorder::SqliteSyncMode;
