// crates/slam-telemetry-store-sqlite/tests/sqlite_recorder.rs
// ============================================================================
// Module: SQLite Run Recorder Tests
// Description: Persistence, fail-soft, and state-machine tests for the recorder.
// Purpose: Validate per-run table resets, upserts, summaries, map export, and
//          permanent deactivation.
// Dependencies: slam-telemetry-core, slam-telemetry-store-sqlite, rusqlite,
//               tempfile, proptest
// ============================================================================

//! ## Overview
//! Drives [`SqliteRunRecorder`] against scratch databases:
//! - Schema reset on run selection and upsert by timestamp
//! - Loss accumulation, summary writes, and accumulator reset
//! - No-op behavior without a run or without storage
//! - Map export and concurrent use from cloned handles

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use proptest::prelude::*;
use rusqlite::Connection;
use slam_telemetry_core::CommandDispatcher;
use slam_telemetry_core::DispatchOutcome;
use slam_telemetry_core::FrameSample;
use slam_telemetry_core::Matrix3;
use slam_telemetry_core::Millis;
use slam_telemetry_core::PoseSample;
use slam_telemetry_core::RunId;
use slam_telemetry_core::RunRecorder;
use slam_telemetry_core::Seconds;
use slam_telemetry_core::TrackedFrame;
use slam_telemetry_core::TrackerControl;
use slam_telemetry_core::Vector3;
use slam_telemetry_core::YawPitchRoll;
use slam_telemetry_store_sqlite::MapExportConfig;
use slam_telemetry_store_sqlite::RecorderStatus;
use slam_telemetry_store_sqlite::SqliteJournalMode;
use slam_telemetry_store_sqlite::SqliteRecorderConfig;
use slam_telemetry_store_sqlite::SqliteRecorderError;
use slam_telemetry_store_sqlite::SqliteRunRecorder;
use slam_telemetry_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("telemetry.sqlite")
}

fn open_recorder(dir: &TempDir) -> SqliteRunRecorder {
    let recorder = SqliteRunRecorder::open(SqliteRecorderConfig::new(db_path(dir)));
    assert!(recorder.status().is_active());
    recorder
}

fn run(raw: &str) -> RunId {
    RunId::parse(raw).unwrap()
}

fn sample(timestamp_ms: i64, x: f32, is_key_frame: bool) -> FrameSample {
    FrameSample::new(
        Millis::new(timestamp_ms),
        is_key_frame,
        PoseSample {
            position: Vector3::new(x, 2.0, 3.0),
            orientation: YawPitchRoll::new(0.25, -0.5, 1.0),
        },
    )
}

fn count_tables(path: &Path, name: &str) -> i64 {
    let connection = Connection::open(path).unwrap();
    connection
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .unwrap()
}

struct StillFrame {
    timestamp: Seconds,
}

impl TrackedFrame for StillFrame {
    fn timestamp(&self) -> Seconds {
        self.timestamp
    }

    fn camera_pose(&self) -> (Matrix3, Vector3) {
        (Matrix3::IDENTITY, Vector3::new(-1.0, -2.0, -3.0))
    }
}

#[derive(Default)]
struct CountingTracker {
    resets: AtomicUsize,
}

impl TrackerControl for CountingTracker {
    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn sequence_length(&self) -> Option<Seconds> {
        Some(Seconds::new(12.5))
    }
}

// ============================================================================
// SECTION: Open
// ============================================================================

#[test]
fn open_bootstraps_schema_without_run() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    assert_eq!(
        recorder.status(),
        RecorderStatus::Active {
            run_id: None
        }
    );
    assert_eq!(count_tables(&db_path(&dir), "Global"), 1);
    assert_eq!(count_tables(&db_path(&dir), "store_meta"), 1);
    assert!(recorder.global_summaries().unwrap().is_empty());
}

#[test]
fn open_creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("t.sqlite");
    let mut config = SqliteRecorderConfig::new(&path);
    config.journal_mode = SqliteJournalMode::Delete;
    config.sync_mode = SqliteSyncMode::Full;
    let recorder = SqliteRunRecorder::open(config);
    assert!(recorder.status().is_active());
    assert!(path.exists());
}

#[test]
fn open_failure_is_permanent_and_silent() {
    let dir = TempDir::new().unwrap();
    let recorder = SqliteRunRecorder::open(SqliteRecorderConfig::new(dir.path()));
    assert_eq!(recorder.status(), RecorderStatus::Inactive);

    recorder.set_id("run42");
    recorder.set_initialization_time(Seconds::new(1.0));
    recorder.record_frame(&sample(1, 1.0, false));
    recorder.record_loss(Seconds::new(2.0));
    recorder.record_loss_at(Seconds::new(3.0));
    recorder.finalize(Seconds::new(10.0));
    recorder.export_map(&[Vector3::new(1.0, 1.0, 1.0)]);

    assert_eq!(recorder.status(), RecorderStatus::Inactive);
    assert_eq!(recorder.current_run(), None);
    assert_eq!(recorder.global_summaries(), Err(SqliteRecorderError::Inactive));
    assert_eq!(recorder.frame_samples(&run("run42")), Err(SqliteRecorderError::Inactive));
}

#[test]
fn try_open_reports_directory_path() {
    let dir = TempDir::new().unwrap();
    let result = SqliteRunRecorder::try_open(SqliteRecorderConfig::new(dir.path()));
    assert!(matches!(result, Err(SqliteRecorderError::Invalid(_))));
}

#[test]
fn disabled_by_configuration_never_touches_storage() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteRecorderConfig::new(db_path(&dir));
    config.active = false;
    let recorder = SqliteRunRecorder::open(config);
    recorder.set_id("run42");
    recorder.record_frame(&sample(1, 1.0, false));
    assert_eq!(recorder.status(), RecorderStatus::Inactive);
    assert!(!db_path(&dir).exists());
}

#[test]
fn unsupported_schema_version_deactivates() {
    let dir = TempDir::new().unwrap();
    {
        let connection = Connection::open(db_path(&dir)).unwrap();
        connection
            .execute_batch(
                "CREATE TABLE store_meta (version INTEGER NOT NULL);
                 INSERT INTO store_meta (version) VALUES (99);",
            )
            .unwrap();
    }
    let result = SqliteRunRecorder::try_open(SqliteRecorderConfig::new(db_path(&dir)));
    assert!(matches!(result, Err(SqliteRecorderError::VersionMismatch(_))));
    let recorder = SqliteRunRecorder::open(SqliteRecorderConfig::new(db_path(&dir)));
    assert_eq!(recorder.status(), RecorderStatus::Inactive);
}

// ============================================================================
// SECTION: Run Selection
// ============================================================================

#[test]
fn selecting_run_twice_leaves_table_empty() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("run42");
    assert!(recorder.frame_samples(&run("run42")).unwrap().is_empty());
    recorder.record_frame(&sample(100, 1.0, false));
    recorder.record_frame(&sample(200, 1.0, true));
    assert_eq!(recorder.frame_samples(&run("run42")).unwrap().len(), 2);

    recorder.set_id("run42");
    assert!(recorder.frame_samples(&run("run42")).unwrap().is_empty());
    assert_eq!(recorder.current_run(), Some(run("run42")));
}

#[test]
fn switching_runs_keeps_previous_run_data() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("first");
    recorder.record_frame(&sample(100, 1.0, false));
    recorder.set_id("second");
    recorder.record_frame(&sample(100, 9.0, false));
    assert_eq!(recorder.frame_samples(&run("first")).unwrap()[0].pose.position.x, 1.0);
    assert_eq!(recorder.frame_samples(&run("second")).unwrap()[0].pose.position.x, 9.0);
}

#[test]
fn run_ids_differing_in_case_share_one_run() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("Run1");
    recorder.record_frame(&sample(1, 1.0, false));
    recorder.record_frame(&sample(2, 1.0, false));
    assert_eq!(recorder.current_run(), Some(run("run1")));
    assert_eq!(recorder.frame_samples(&run("RUN1")).unwrap().len(), 2);
    recorder.finalize(Seconds::new(1.0));

    recorder.set_id("other");
    recorder.record_frame(&sample(5, 2.0, false));
    recorder.set_id("rUN1");
    assert!(recorder.frame_samples(&run("Run1")).unwrap().is_empty());
    assert_eq!(recorder.frame_samples(&run("other")).unwrap().len(), 1);
    recorder.finalize(Seconds::new(2.0));

    let summaries = recorder.global_summaries().unwrap();
    let ids: Vec<&str> = summaries.iter().map(|summary| summary.run_id.as_str()).collect();
    assert_eq!(ids, ["run1"]);
    assert_eq!(summaries[0].sequence_length, Millis::new(2_000));
    assert_eq!(count_tables(&db_path(&dir), "run1"), 1);
}

#[test]
fn empty_run_id_is_ignored() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("run42");
    recorder.set_id("");
    assert_eq!(recorder.current_run(), Some(run("run42")));
}

#[test]
fn rejected_run_id_keeps_store_active() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("run42");
    recorder.set_id("Global");
    recorder.set_id("x\"; DROP TABLE Global; --");
    assert_eq!(
        recorder.status(),
        RecorderStatus::Active {
            run_id: Some(run("run42"))
        }
    );
    assert_eq!(count_tables(&db_path(&dir), "Global"), 1);
}

// ============================================================================
// SECTION: Frames
// ============================================================================

#[test]
fn frames_before_run_selection_are_dropped() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.record_frame(&sample(100, 1.0, false));
    recorder.finalize(Seconds::new(5.0));
    assert!(recorder.global_summaries().unwrap().is_empty());
    assert!(recorder.status().is_active());
}

#[test]
fn same_timestamp_keeps_latest_write() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("run42");
    recorder.record_frame(&sample(1_234, 1.0, false));
    recorder.record_frame(&sample(1_234, 7.5, true));
    let frames = recorder.frame_samples(&run("run42")).unwrap();
    assert_eq!(frames, vec![sample(1_234, 7.5, true)]);
}

#[test]
fn tracked_frames_are_decoded_and_truncated() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("run42");
    recorder.record_tracked_frame(
        &StillFrame {
            timestamp: Seconds::new(1.234_9),
        },
        true,
    );
    let frames = recorder.frame_samples(&run("run42")).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].timestamp, Millis::new(1_234));
    assert!(frames[0].is_key_frame);
    assert_eq!(frames[0].pose.position, Vector3::new(1.0, 2.0, 3.0));
}

#[test]
fn frames_are_returned_in_timestamp_order() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("run42");
    for timestamp in [300, 100, 200] {
        recorder.record_frame(&sample(timestamp, 1.0, false));
    }
    let timestamps: Vec<i64> = recorder
        .frame_samples(&run("run42"))
        .unwrap()
        .iter()
        .map(|frame| frame.timestamp.value())
        .collect();
    assert_eq!(timestamps, vec![100, 200, 300]);
}

// ============================================================================
// SECTION: Summaries
// ============================================================================

#[test]
fn finalize_writes_summary_and_resets_losses() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("run42");
    recorder.set_initialization_time(Seconds::new(0.8));
    for duration in [2.0, 5.0, 1.0] {
        recorder.record_loss(Seconds::new(duration));
    }
    for timestamp in [0.0, 1.5, 0.0, 4.2] {
        recorder.record_loss_at(Seconds::new(timestamp));
    }
    recorder.finalize(Seconds::new(30.0));

    let summary = recorder.global_summary(&run("run42")).unwrap().unwrap();
    assert_eq!(summary.initialization_delay, Millis::new(800));
    assert_eq!(summary.times_lost, 3);
    assert_eq!(summary.total_time_lost, Millis::new(8_000));
    assert_eq!(summary.max_time_lost, Millis::new(5_000));
    assert_eq!(summary.sequence_length, Millis::new(30_000));
    assert_eq!(summary.lost_details, "1500;4200");

    assert_eq!(recorder.loss_snapshot().times_lost(), 0);
    recorder.record_loss(Seconds::new(3.0));
    assert_eq!(recorder.loss_snapshot().times_lost(), 1);
    assert_eq!(recorder.current_run(), Some(run("run42")));
    assert_eq!(recorder.initialization_delay(), Millis::new(800));
}

#[test]
fn finalize_twice_upserts_one_row() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("run42");
    recorder.record_loss(Seconds::new(2.0));
    recorder.finalize(Seconds::new(10.0));
    recorder.finalize(Seconds::new(11.0));
    let summaries = recorder.global_summaries().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].times_lost, 0);
    assert_eq!(summaries[0].sequence_length, Millis::new(11_000));
}

#[test]
fn finalize_without_run_keeps_losses() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.record_loss(Seconds::new(2.0));
    recorder.finalize(Seconds::new(10.0));
    assert_eq!(recorder.loss_snapshot().times_lost(), 1);
}

#[test]
fn summaries_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let recorder = open_recorder(&dir);
        recorder.set_id("alpha");
        recorder.finalize(Seconds::new(1.0));
        recorder.set_id("beta");
        recorder.finalize(Seconds::new(2.0));
    }
    let reopened = open_recorder(&dir);
    let ids: Vec<String> = reopened
        .global_summaries()
        .unwrap()
        .into_iter()
        .map(|summary| summary.run_id.to_string())
        .collect();
    assert_eq!(ids, vec!["alpha".to_string(), "beta".to_string()]);
    assert_eq!(reopened.global_summary(&run("gamma")).unwrap(), None);
}

// ============================================================================
// SECTION: Map Export
// ============================================================================

#[test]
fn map_export_writes_csv_per_run() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteRecorderConfig::new(db_path(&dir));
    config.map_export = MapExportConfig {
        enabled: true,
        path_prefix: dir.path().join("maps"),
    };
    let recorder = SqliteRunRecorder::open(config);
    recorder.set_id("run42");
    recorder.export_map(&[Vector3::new(1.0, 2.5, -3.0), Vector3::new(0.125, 0.0, 10.0)]);
    let csv = fs::read_to_string(dir.path().join("maps").join("run42.csv")).unwrap();
    assert_eq!(csv, "1.000000, 2.500000, -3.000000\n0.125000, 0.000000, 10.000000\n");

    recorder.export_map(&[Vector3::new(4.0, 4.0, 4.0)]);
    let csv = fs::read_to_string(dir.path().join("maps").join("run42.csv")).unwrap();
    assert_eq!(csv, "4.000000, 4.000000, 4.000000\n");
}

#[test]
fn map_export_disabled_or_without_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let maps = dir.path().join("maps");
    let mut config = SqliteRecorderConfig::new(db_path(&dir));
    config.map_export = MapExportConfig {
        enabled: true,
        path_prefix: maps.clone(),
    };
    let recorder = SqliteRunRecorder::open(config);
    recorder.export_map(&[Vector3::new(1.0, 1.0, 1.0)]);
    assert!(!maps.exists());

    let disabled = open_recorder(&dir);
    disabled.set_id("run42");
    disabled.export_map(&[Vector3::new(1.0, 1.0, 1.0)]);
    assert!(!maps.exists());
}

// ============================================================================
// SECTION: Concurrency
// ============================================================================

#[test]
fn cloned_handles_serialize_writes() {
    let dir = TempDir::new().unwrap();
    let recorder = open_recorder(&dir);
    recorder.set_id("run42");
    let handles: Vec<_> = (0 .. 4)
        .map(|worker| {
            let recorder = recorder.clone();
            thread::spawn(move || {
                for index in 0 .. 50 {
                    recorder.record_frame(&sample(worker * 1_000 + index, 1.0, false));
                    recorder.record_loss(Seconds::new(0.001));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(recorder.frame_samples(&run("run42")).unwrap().len(), 200);
    assert_eq!(recorder.loss_snapshot().times_lost(), 200);
}

#[test]
fn dispatcher_drives_recorder_lifecycle() {
    let dir = TempDir::new().unwrap();
    let recorder = Arc::new(open_recorder(&dir));
    let tracker = Arc::new(CountingTracker::default());
    let dispatcher = CommandDispatcher::new(Arc::clone(&recorder), Arc::clone(&tracker));

    let outcome = dispatcher.dispatch("SetVideoKey:run42");
    assert_eq!(outcome, DispatchOutcome::RunSelected("run42".to_string()));
    recorder.record_loss(Seconds::new(1.0));
    assert_eq!(dispatcher.dispatch("saveandresetmap").label(), "run_finalized");
    assert_eq!(dispatcher.dispatch("Unknown:foo").label(), "ignored");

    let summary = recorder.global_summary(&run("run42")).unwrap().unwrap();
    assert_eq!(summary.times_lost, 1);
    assert_eq!(summary.sequence_length, Millis::new(12_500));
    assert_eq!(tracker.resets.load(Ordering::SeqCst), 1);
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn last_write_per_timestamp_wins(
        writes in prop::collection::vec((0i64..8, -100.0f32..100.0), 1..40),
    ) {
        let dir = TempDir::new().unwrap();
        let recorder = open_recorder(&dir);
        recorder.set_id("prop");
        let mut expected = std::collections::BTreeMap::new();
        for (timestamp, x) in &writes {
            recorder.record_frame(&sample(*timestamp, *x, false));
            expected.insert(*timestamp, *x);
        }
        let stored: Vec<(i64, f32)> = recorder
            .frame_samples(&run("prop"))
            .unwrap()
            .iter()
            .map(|frame| (frame.timestamp.value(), frame.pose.position.x))
            .collect();
        let expected: Vec<(i64, f32)> = expected.into_iter().collect();
        prop_assert_eq!(stored, expected);
    }
}
