// crates/slam-telemetry-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Recorder Schema
// Description: Connection setup, schema bootstrap, and row-level statements.
// Purpose: Keep every SQL statement the recorder issues in one place.
// Dependencies: rusqlite, slam-telemetry-core
// ============================================================================

//! ## Overview
//! The database holds a `store_meta` version row, a shared `Global` summary
//! table, and one frame table per run named after the run id. Values are
//! always bound as parameters; run ids reach SQL text only as quoted
//! identifiers of an already-validated [`RunId`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use slam_telemetry_core::FrameSample;
use slam_telemetry_core::GlobalSummary;
use slam_telemetry_core::Millis;
use slam_telemetry_core::PoseSample;
use slam_telemetry_core::RunId;
use slam_telemetry_core::Vector3;
use slam_telemetry_core::YawPitchRoll;

use crate::recorder::SqliteRecorderConfig;
use crate::recorder::SqliteRecorderError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the recorder.
const SCHEMA_VERSION: i64 = 1;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Shared summary table.
const CREATE_GLOBAL_TABLE: &str = "CREATE TABLE IF NOT EXISTS Global (
    id TEXT PRIMARY KEY,
    delay INTEGER NOT NULL,
    timesLost INTEGER NOT NULL,
    totalTimeLost INTEGER NOT NULL,
    maxTimeLost INTEGER NOT NULL,
    sequenceLength INTEGER NOT NULL,
    lostDetails TEXT NOT NULL
);";

/// Summary upsert keyed by run id.
const UPSERT_GLOBAL: &str = "INSERT OR REPLACE INTO Global \
     (id, delay, timesLost, totalTimeLost, maxTimeLost, sequenceLength, lostDetails) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

/// Column list shared by summary reads.
const SELECT_GLOBAL: &str = "SELECT id, delay, timesLost, totalTimeLost, maxTimeLost, \
     sequenceLength, lostDetails FROM Global";

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Validates the path, opens the database, and bootstraps the schema.
pub(crate) fn open_store(config: &SqliteRecorderConfig) -> Result<Connection, SqliteRecorderError> {
    validate_store_path(&config.path)?;
    ensure_parent_dir(&config.path)?;
    let mut connection = open_connection(config)?;
    initialize_schema(&mut connection)?;
    Ok(connection)
}

/// Ensures the parent directory for the database exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteRecorderError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteRecorderError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteRecorderError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteRecorderError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteRecorderError::Invalid("store path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteRecorderError::Invalid("store path exceeds length limit".to_string()));
    }
    let overlong = path
        .components()
        .any(|component| component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH);
    if overlong {
        return Err(SqliteRecorderError::Invalid(
            "store path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteRecorderError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens a read-write connection and applies pragmas.
fn open_connection(config: &SqliteRecorderConfig) -> Result<Connection, SqliteRecorderError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    Ok(connection)
}

/// Creates the version and summary tables, or validates an existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteRecorderError> {
    let tx = connection.transaction().map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteRecorderError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.execute_batch(CREATE_GLOBAL_TABLE).map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    Ok(())
}

// ============================================================================
// SECTION: Run Tables
// ============================================================================

/// Drops and recreates the frame table for `run_id`.
pub(crate) fn reset_run_table(
    connection: &mut Connection,
    run_id: &RunId,
) -> Result<(), SqliteRecorderError> {
    let table = run_id.quoted_identifier();
    let tx = connection.transaction().map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    tx.execute_batch(&format!(
        "CREATE TABLE {table} (
            timestamp INTEGER PRIMARY KEY ASC,
            isKF INTEGER NOT NULL,
            x FLOAT NOT NULL,
            y FLOAT NOT NULL,
            z FLOAT NOT NULL,
            yaw FLOAT,
            pitch FLOAT,
            roll FLOAT
        );"
    ))
    .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    Ok(())
}

/// Upserts one frame sample keyed by its timestamp.
pub(crate) fn upsert_frame(
    connection: &Connection,
    run_id: &RunId,
    sample: &FrameSample,
) -> Result<(), SqliteRecorderError> {
    let position = sample.pose.position;
    let orientation = sample.pose.orientation;
    connection
        .execute(
            &format!(
                "INSERT OR REPLACE INTO {} (timestamp, isKF, x, y, z, yaw, pitch, roll) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                run_id.quoted_identifier()
            ),
            params![
                sample.timestamp.value(),
                i64::from(sample.is_key_frame),
                f64::from(position.x),
                f64::from(position.y),
                f64::from(position.z),
                f64::from(orientation.yaw),
                f64::from(orientation.pitch),
                f64::from(orientation.roll),
            ],
        )
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    Ok(())
}

/// Reads all frame samples of a run in timestamp order.
pub(crate) fn query_frames(
    connection: &Connection,
    run_id: &RunId,
) -> Result<Vec<FrameSample>, SqliteRecorderError> {
    let mut stmt = connection
        .prepare(&format!(
            "SELECT timestamp, isKF, x, y, z, yaw, pitch, roll FROM {} ORDER BY timestamp ASC",
            run_id.quoted_identifier()
        ))
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    let rows = stmt
        .query_map([], map_frame_row)
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(|err| SqliteRecorderError::Db(err.to_string()))
}

/// Maps a frame table row. Null angles read as zero.
fn map_frame_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FrameSample> {
    let angle = |index: usize| -> rusqlite::Result<f32> {
        Ok(narrow(row.get::<_, Option<f64>>(index)?.unwrap_or_default()))
    };
    let pose = PoseSample {
        position: Vector3::new(narrow(row.get(2)?), narrow(row.get(3)?), narrow(row.get(4)?)),
        orientation: YawPitchRoll::new(angle(5)?, angle(6)?, angle(7)?),
    };
    Ok(FrameSample::new(Millis::new(row.get(0)?), row.get::<_, i64>(1)? != 0, pose))
}

// ============================================================================
// SECTION: Global Summaries
// ============================================================================

/// Raw `Global` row before validation.
struct SummaryRow {
    /// Run id column.
    id: String,
    /// Initialization delay in milliseconds.
    delay: i64,
    /// Loss event count.
    times_lost: i64,
    /// Summed loss duration in milliseconds.
    total_time_lost: i64,
    /// Longest loss in milliseconds.
    max_time_lost: i64,
    /// Sequence length in milliseconds.
    sequence_length: i64,
    /// Serialized loss times.
    lost_details: String,
}

/// Upserts the summary row for its run.
pub(crate) fn upsert_summary(
    connection: &Connection,
    summary: &GlobalSummary,
) -> Result<(), SqliteRecorderError> {
    connection
        .execute(
            UPSERT_GLOBAL,
            params![
                summary.run_id.as_str(),
                summary.initialization_delay.value(),
                i64::from(summary.times_lost),
                summary.total_time_lost.value(),
                summary.max_time_lost.value(),
                summary.sequence_length.value(),
                summary.lost_details,
            ],
        )
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    Ok(())
}

/// Reads the summary row for one run.
pub(crate) fn query_summary(
    connection: &Connection,
    run_id: &RunId,
) -> Result<Option<GlobalSummary>, SqliteRecorderError> {
    let sql = format!("{SELECT_GLOBAL} WHERE id = ?1");
    let row = connection
        .query_row(&sql, params![run_id.as_str()], map_summary_row)
        .optional()
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    row.map(build_summary).transpose()
}

/// Reads every summary row ordered by run id.
pub(crate) fn query_summaries(
    connection: &Connection,
) -> Result<Vec<GlobalSummary>, SqliteRecorderError> {
    let mut stmt = connection
        .prepare(&format!("{SELECT_GLOBAL} ORDER BY id ASC"))
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    let rows = stmt
        .query_map([], map_summary_row)
        .map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
    let mut summaries = Vec::new();
    for row in rows {
        let row = row.map_err(|err| SqliteRecorderError::Db(err.to_string()))?;
        summaries.push(build_summary(row)?);
    }
    Ok(summaries)
}

/// Maps a `Global` row.
fn map_summary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SummaryRow> {
    Ok(SummaryRow {
        id: row.get(0)?,
        delay: row.get(1)?,
        times_lost: row.get(2)?,
        total_time_lost: row.get(3)?,
        max_time_lost: row.get(4)?,
        sequence_length: row.get(5)?,
        lost_details: row.get(6)?,
    })
}

/// Validates a raw `Global` row.
fn build_summary(row: SummaryRow) -> Result<GlobalSummary, SqliteRecorderError> {
    let run_id = RunId::parse(&row.id)
        .map_err(|err| SqliteRecorderError::Invalid(format!("stored run id {}: {err}", row.id)))?;
    let times_lost = u32::try_from(row.times_lost).map_err(|_| {
        SqliteRecorderError::Invalid(format!("stored loss count out of range: {}", row.times_lost))
    })?;
    Ok(GlobalSummary {
        run_id,
        initialization_delay: Millis::new(row.delay),
        times_lost,
        total_time_lost: Millis::new(row.total_time_lost),
        max_time_lost: Millis::new(row.max_time_lost),
        sequence_length: Millis::new(row.sequence_length),
        lost_details: row.lost_details,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Narrows a stored `REAL` back to the pose precision.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Stored coordinates were widened from f32 on write."
)]
fn narrow(value: f64) -> f32 {
    value as f32
}
