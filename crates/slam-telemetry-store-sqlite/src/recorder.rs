// crates/slam-telemetry-store-sqlite/src/recorder.rs
// ============================================================================
// Module: SQLite Run Recorder
// Description: Fail-soft RunRecorder backed by a single SQLite connection.
// Purpose: Persist frame samples and run summaries without ever failing the
//          tracking caller.
// Dependencies: rusqlite, serde, thiserror, tracing, slam-telemetry-core
// ============================================================================

//! ## Overview
//! [`SqliteRunRecorder`] moves through three states:
//!
//! ```text
//! open ok ──► Active(no run) ──set_id──► Active(run) ──finalize──► Active(run)
//!    │                 │                       │
//!    └── open failed ──┴──── schema failure ───┴──► Inactive (terminal)
//! ```
//!
//! All state (connection, current run, loss accumulator) sits behind one
//! mutex, so a run switch never interleaves with a frame write and a
//! finalize reads and resets the accumulator atomically. Trait methods log
//! failures and return; the inherent read accessors surface
//! [`SqliteRecorderError`] for hosts and tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use rusqlite::Connection;
use serde::Deserialize;
use slam_telemetry_core::FrameSample;
use slam_telemetry_core::GlobalSummary;
use slam_telemetry_core::LossAccumulator;
use slam_telemetry_core::Millis;
use slam_telemetry_core::RunId;
use slam_telemetry_core::RunIdError;
use slam_telemetry_core::RunRecorder;
use slam_telemetry_core::Seconds;
use slam_telemetry_core::Vector3;
use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::map_export::MapExportConfig;
use crate::map_export::write_map_csv;
use crate::schema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    Full,
    /// Normal synchronous mode (default).
    #[default]
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` run recorder.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
/// - `active = false` yields an inactive recorder without touching `path`.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteRecorderConfig {
    /// Whether recording is enabled at all.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Map point export settings.
    #[serde(default)]
    pub map_export: MapExportConfig,
}

impl SqliteRecorderConfig {
    /// Creates an active configuration with default settings for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            active: true,
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            map_export: MapExportConfig::default(),
        }
    }
}

/// Default for [`SqliteRecorderConfig::active`].
const fn default_active() -> bool {
    true
}

/// Default for [`SqliteRecorderConfig::busy_timeout_ms`].
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` recorder errors.
///
/// # Invariants
/// - Never returned from [`RunRecorder`] methods; those log and continue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteRecorderError {
    /// Store I/O error.
    #[error("sqlite recorder io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite recorder db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite recorder version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or stored data.
    #[error("sqlite recorder invalid data: {0}")]
    Invalid(String),
    /// Rejected run identifier.
    #[error("sqlite recorder rejected run id: {0}")]
    RunId(#[from] RunIdError),
    /// The recorder is permanently inactive.
    #[error("sqlite recorder is inactive")]
    Inactive,
    /// No run has been selected yet.
    #[error("sqlite recorder has no active run")]
    NoActiveRun,
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// Observable recorder state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderStatus {
    /// Storage is open; `run_id` is the current run, if one was selected.
    Active {
        /// Current run.
        run_id: Option<RunId>,
    },
    /// Storage is unavailable for the rest of the process lifetime.
    Inactive,
}

impl RecorderStatus {
    /// Returns true when the recorder can persist data.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

// ============================================================================
// SECTION: Recorder State
// ============================================================================

/// Storage side of the recorder state machine.
enum StoreState {
    /// Open connection.
    Active(Connection),
    /// Terminal state after an open or schema failure.
    Inactive,
}

/// Mutex-guarded recorder state.
struct RecorderInner {
    /// Storage handle.
    store: StoreState,
    /// Current run.
    run_id: Option<RunId>,
    /// Loss statistics for the current run segment.
    losses: LossAccumulator,
    /// Delay between start-up and tracker initialization.
    initialization_delay: Millis,
    /// Map export settings.
    map_export: MapExportConfig,
}

impl RecorderInner {
    /// Creates recorder state around a storage handle.
    const fn new(store: StoreState, map_export: MapExportConfig) -> Self {
        Self {
            store,
            run_id: None,
            losses: LossAccumulator::new(),
            initialization_delay: Millis::ZERO,
            map_export,
        }
    }

    /// Returns the observable status.
    fn status(&self) -> RecorderStatus {
        match self.store {
            StoreState::Active(_) => RecorderStatus::Active {
                run_id: self.run_id.clone(),
            },
            StoreState::Inactive => RecorderStatus::Inactive,
        }
    }

    /// Returns the open connection.
    fn connection(&self) -> Result<&Connection, SqliteRecorderError> {
        match &self.store {
            StoreState::Active(connection) => Ok(connection),
            StoreState::Inactive => Err(SqliteRecorderError::Inactive),
        }
    }

    /// Returns the open connection and the current run.
    fn active_run(&self) -> Result<(&Connection, &RunId), SqliteRecorderError> {
        let connection = self.connection()?;
        let run_id = self.run_id.as_ref().ok_or(SqliteRecorderError::NoActiveRun)?;
        Ok((connection, run_id))
    }

    /// Drops the connection and enters the terminal state.
    fn deactivate(&mut self) {
        self.store = StoreState::Inactive;
        self.run_id = None;
    }

    /// Validates `raw`, wipes its frame table, and makes it the current run.
    fn select_run(&mut self, raw: &str) -> Result<RunId, SqliteRecorderError> {
        let StoreState::Active(connection) = &mut self.store else {
            return Err(SqliteRecorderError::Inactive);
        };
        let run_id = RunId::parse(raw)?;
        schema::reset_run_table(connection, &run_id)?;
        self.run_id = Some(run_id.clone());
        Ok(run_id)
    }

    /// Builds and writes the summary, then resets the accumulator.
    ///
    /// The accumulator is reset even when the write fails.
    fn finalize_run(
        &mut self,
        sequence_length: Seconds,
    ) -> Result<GlobalSummary, SqliteRecorderError> {
        let (connection, run_id) = self.active_run()?;
        let summary = GlobalSummary::from_accumulator(
            run_id.clone(),
            self.initialization_delay,
            &self.losses,
            sequence_length,
        );
        let written = schema::upsert_summary(connection, &summary);
        self.losses.reset();
        written.map(|()| summary)
    }
}

// ============================================================================
// SECTION: Recorder
// ============================================================================

/// `SQLite`-backed run recorder.
///
/// # Invariants
/// - Cloned handles share one state; every operation is serialized.
/// - Once [`RecorderStatus::Inactive`], the recorder never reopens storage.
/// - No frame or summary is written without a current run.
#[derive(Clone)]
pub struct SqliteRunRecorder {
    /// Shared recorder state.
    inner: Arc<Mutex<RecorderInner>>,
}

impl SqliteRunRecorder {
    /// Opens a recorder, falling back to an inactive one on failure.
    ///
    /// An open failure is logged once here; later calls are silent no-ops.
    #[must_use]
    pub fn open(config: SqliteRecorderConfig) -> Self {
        if !config.active {
            info!("telemetry recording disabled by configuration");
            return Self::disabled(config.map_export);
        }
        let path = config.path.clone();
        match Self::try_open(config) {
            Ok(recorder) => recorder,
            Err(err) => {
                error!(
                    path = %path.display(),
                    error = %err,
                    "telemetry store unavailable; recording disabled"
                );
                Self::from_state(StoreState::Inactive, MapExportConfig::default())
            }
        }
    }

    /// Opens a recorder, returning storage errors to the caller.
    ///
    /// Ignores [`SqliteRecorderConfig::active`]; hosts use it to read stored
    /// runs.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteRecorderError`] when the path is invalid or the
    /// database cannot be opened or initialized.
    pub fn try_open(config: SqliteRecorderConfig) -> Result<Self, SqliteRecorderError> {
        let connection = schema::open_store(&config)?;
        info!(path = %config.path.display(), "telemetry store opened");
        Ok(Self::from_state(StoreState::Active(connection), config.map_export))
    }

    /// Creates a recorder that never touches storage.
    #[must_use]
    pub fn disabled(map_export: MapExportConfig) -> Self {
        Self::from_state(StoreState::Inactive, map_export)
    }

    /// Wraps recorder state in a shared handle.
    fn from_state(store: StoreState, map_export: MapExportConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RecorderInner::new(store, map_export))),
        }
    }

    /// Locks the shared state, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, RecorderInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current recorder status.
    #[must_use]
    pub fn status(&self) -> RecorderStatus {
        self.lock().status()
    }

    /// Returns the current run, if any.
    #[must_use]
    pub fn current_run(&self) -> Option<RunId> {
        self.lock().run_id.clone()
    }

    /// Returns a copy of the current loss statistics.
    #[must_use]
    pub fn loss_snapshot(&self) -> LossAccumulator {
        self.lock().losses.clone()
    }

    /// Returns the recorded initialization delay.
    #[must_use]
    pub fn initialization_delay(&self) -> Millis {
        self.lock().initialization_delay
    }

    /// Reads all stored frame samples of a run in timestamp order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteRecorderError::Inactive`] on an inactive recorder and
    /// [`SqliteRecorderError::Db`] when the run has no table.
    pub fn frame_samples(&self, run_id: &RunId) -> Result<Vec<FrameSample>, SqliteRecorderError> {
        let inner = self.lock();
        schema::query_frames(inner.connection()?, run_id)
    }

    /// Reads the stored summary of a run.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteRecorderError`] when the recorder is inactive or the
    /// stored row is unreadable.
    pub fn global_summary(
        &self,
        run_id: &RunId,
    ) -> Result<Option<GlobalSummary>, SqliteRecorderError> {
        let inner = self.lock();
        schema::query_summary(inner.connection()?, run_id)
    }

    /// Reads every stored summary ordered by run id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteRecorderError`] when the recorder is inactive or a
    /// stored row is unreadable.
    pub fn global_summaries(&self) -> Result<Vec<GlobalSummary>, SqliteRecorderError> {
        let inner = self.lock();
        schema::query_summaries(inner.connection()?)
    }
}

impl RunRecorder for SqliteRunRecorder {
    fn set_id(&self, run_id: &str) {
        if run_id.is_empty() {
            return;
        }
        let mut inner = self.lock();
        match inner.select_run(run_id) {
            Ok(selected) => info!(run_id = %selected, "run selected"),
            Err(SqliteRecorderError::Inactive) => {}
            Err(SqliteRecorderError::RunId(err)) => {
                warn!(run_id, error = %err, "run id rejected");
            }
            Err(err) => {
                error!(run_id, error = %err, "run table reset failed; recording disabled");
                inner.deactivate();
            }
        }
    }

    fn set_initialization_time(&self, delay: Seconds) {
        let delay = delay.to_millis();
        self.lock().initialization_delay = delay;
        debug!(delay_ms = delay.value(), "initialization delay recorded");
    }

    fn record_frame(&self, sample: &FrameSample) {
        let inner = self.lock();
        let written = inner
            .active_run()
            .and_then(|(connection, run_id)| schema::upsert_frame(connection, run_id, sample));
        if let Err(err) = written {
            report_skipped_write("frame", sample.timestamp.value(), &err);
        }
    }

    fn record_loss(&self, duration: Seconds) {
        self.lock().losses.record_loss(duration);
    }

    fn record_loss_at(&self, timestamp: Seconds) {
        self.lock().losses.record_loss_at(timestamp);
    }

    fn finalize(&self, sequence_length: Seconds) {
        let mut inner = self.lock();
        match inner.finalize_run(sequence_length) {
            Ok(summary) => info!(
                run_id = %summary.run_id,
                times_lost = summary.times_lost,
                total_time_lost_ms = summary.total_time_lost.value(),
                sequence_length_ms = summary.sequence_length.value(),
                "run summary written"
            ),
            Err(err) => report_skipped_write("summary", sequence_length.to_millis().value(), &err),
        }
    }

    fn export_map(&self, points: &[Vector3]) {
        let inner = self.lock();
        if !inner.map_export.enabled {
            return;
        }
        let written = inner
            .active_run()
            .and_then(|(_, run_id)| write_map_csv(&inner.map_export, run_id, points));
        match written {
            Ok(path) => info!(path = %path.display(), points = points.len(), "map exported"),
            Err(err) => report_skipped_write("map", 0, &err),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Logs a dropped write. Missing storage or run is expected and stays quiet.
fn report_skipped_write(kind: &'static str, timestamp_ms: i64, err: &SqliteRecorderError) {
    match err {
        SqliteRecorderError::Inactive | SqliteRecorderError::NoActiveRun => {
            debug!(kind, timestamp_ms, error = %err, "telemetry write skipped");
        }
        _ => warn!(kind, timestamp_ms, error = %err, "telemetry write failed"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
