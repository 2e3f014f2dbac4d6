// crates/slam-telemetry-store-sqlite/src/map_export.rs
// ============================================================================
// Module: Map Point Export
// Description: CSV export of map point positions for a run.
// Purpose: Write `{prefix}/{run id}.csv` with one `x, y, z` line per point.
// Dependencies: serde, slam-telemetry-core
// ============================================================================

//! ## Overview
//! Map exports live outside the database. Each export overwrites the file for
//! the run, writing coordinates with six fractional digits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use slam_telemetry_core::RunId;
use slam_telemetry_core::Vector3;

use crate::recorder::SqliteRecorderError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File extension for exported maps.
const MAP_FILE_EXTENSION: &str = "csv";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Map export configuration.
///
/// # Invariants
/// - When `enabled` is true, `path_prefix` names the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct MapExportConfig {
    /// Whether map exports are written.
    #[serde(default)]
    pub enabled: bool,
    /// Directory receiving `{run id}.csv` files.
    #[serde(default)]
    pub path_prefix: PathBuf,
}

impl MapExportConfig {
    /// Returns the export file path for a run.
    #[must_use]
    pub fn file_path(&self, run_id: &RunId) -> PathBuf {
        self.path_prefix.join(format!("{run_id}.{MAP_FILE_EXTENSION}"))
    }
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Writes map point positions for `run_id`, replacing any previous export.
///
/// # Errors
///
/// Returns [`SqliteRecorderError::Io`] when the directory or file cannot be
/// written.
pub(crate) fn write_map_csv(
    config: &MapExportConfig,
    run_id: &RunId,
    points: &[Vector3],
) -> Result<PathBuf, SqliteRecorderError> {
    ensure_export_dir(&config.path_prefix)?;
    let path = config.file_path(run_id);
    let file = File::create(&path).map_err(|err| SqliteRecorderError::Io(err.to_string()))?;
    let mut writer = BufWriter::new(file);
    for point in points {
        writeln!(writer, "{:.6}, {:.6}, {:.6}", point.x, point.y, point.z)
            .map_err(|err| SqliteRecorderError::Io(err.to_string()))?;
    }
    writer.flush().map_err(|err| SqliteRecorderError::Io(err.to_string()))?;
    Ok(path)
}

/// Creates the export directory if missing.
fn ensure_export_dir(prefix: &Path) -> Result<(), SqliteRecorderError> {
    if prefix.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(prefix).map_err(|err| SqliteRecorderError::Io(err.to_string()))
}
