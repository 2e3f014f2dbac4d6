// crates/slam-telemetry-core/tests/dispatcher.rs
// ============================================================================
// Module: Command Dispatcher Tests
// Description: Routing of control messages to recorder and tracker doubles.
// Purpose: Ensure verbs route correctly and malformed messages are ignored.
// Dependencies: slam-telemetry-core
// ============================================================================

//! ## Overview
//! Drives [`CommandDispatcher`] against in-memory doubles that log every call,
//! covering verb matching, argument handling, and the finalize-then-reset
//! ordering.

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

use std::sync::Arc;
use std::sync::Mutex;

use slam_telemetry_core::CommandDispatcher;
use slam_telemetry_core::CommandParseError;
use slam_telemetry_core::ControlCommand;
use slam_telemetry_core::DispatchOutcome;
use slam_telemetry_core::FrameSample;
use slam_telemetry_core::RunRecorder;
use slam_telemetry_core::Seconds;
use slam_telemetry_core::TrackerControl;
use slam_telemetry_core::Vector3;

// ============================================================================
// SECTION: Helpers
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    SetId(String),
    Finalize(Seconds),
    Reset,
}

#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<Call>>,
}

impl CallLog {
    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn snapshot(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

struct LoggingRecorder {
    log: Arc<CallLog>,
}

impl RunRecorder for LoggingRecorder {
    fn set_id(&self, run_id: &str) {
        self.log.push(Call::SetId(run_id.to_string()));
    }

    fn set_initialization_time(&self, _delay: Seconds) {}

    fn record_frame(&self, _sample: &FrameSample) {}

    fn record_loss(&self, _duration: Seconds) {}

    fn record_loss_at(&self, _timestamp: Seconds) {}

    fn finalize(&self, sequence_length: Seconds) {
        self.log.push(Call::Finalize(sequence_length));
    }

    fn export_map(&self, _points: &[Vector3]) {}
}

struct LoggingTracker {
    log: Arc<CallLog>,
    sequence_length: Option<Seconds>,
}

impl TrackerControl for LoggingTracker {
    fn reset(&self) {
        self.log.push(Call::Reset);
    }

    fn sequence_length(&self) -> Option<Seconds> {
        self.sequence_length
    }
}

fn dispatcher_with(
    sequence_length: Option<Seconds>,
) -> (CommandDispatcher<LoggingRecorder, LoggingTracker>, Arc<CallLog>) {
    let log = Arc::new(CallLog::default());
    let recorder = Arc::new(LoggingRecorder {
        log: Arc::clone(&log),
    });
    let tracker = Arc::new(LoggingTracker {
        log: Arc::clone(&log),
        sequence_length,
    });
    (CommandDispatcher::new(recorder, tracker), log)
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn parse_matches_verbs_case_insensitively() {
    assert_eq!(
        ControlCommand::parse("setvideokey:run42"),
        Ok(ControlCommand::SetVideoKey("run42".to_string()))
    );
    assert_eq!(ControlCommand::parse("RESETMAP"), Ok(ControlCommand::ResetMap));
    assert_eq!(ControlCommand::parse("saveAndResetMap"), Ok(ControlCommand::SaveAndResetMap));
}

#[test]
fn parse_compresses_empty_fields_and_ignores_extra_arguments() {
    assert_eq!(
        ControlCommand::parse("SetVideoKey::run42:extra\n"),
        Ok(ControlCommand::SetVideoKey("run42".to_string()))
    );
    assert_eq!(ControlCommand::parse("ResetMap:now"), Ok(ControlCommand::ResetMap));
}

#[test]
fn parse_rejects_malformed_messages() {
    assert_eq!(ControlCommand::parse(""), Err(CommandParseError::Empty));
    assert_eq!(ControlCommand::parse(" : "), Err(CommandParseError::Empty));
    assert_eq!(
        ControlCommand::parse("SetVideoKey"),
        Err(CommandParseError::MissingArgument("SetVideoKey"))
    );
    assert_eq!(
        ControlCommand::parse("SetVideoKey:"),
        Err(CommandParseError::MissingArgument("SetVideoKey"))
    );
    assert_eq!(
        ControlCommand::parse("Unknown:foo"),
        Err(CommandParseError::UnknownVerb("Unknown".to_string()))
    );
}

// ============================================================================
// SECTION: Routing
// ============================================================================

#[test]
fn set_video_key_selects_run() {
    let (dispatcher, log) = dispatcher_with(None);
    let outcome = dispatcher.dispatch("SetVideoKey:run42");
    assert_eq!(outcome, DispatchOutcome::RunSelected("run42".to_string()));
    assert_eq!(log.snapshot(), vec![Call::SetId("run42".to_string())]);
}

#[test]
fn lowercase_reset_map_resets_tracker_once() {
    let (dispatcher, log) = dispatcher_with(None);
    assert_eq!(dispatcher.dispatch("resetmap"), DispatchOutcome::MapReset);
    assert_eq!(log.snapshot(), vec![Call::Reset]);
}

#[test]
fn save_and_reset_finalizes_before_reset() {
    let (dispatcher, log) = dispatcher_with(Some(Seconds::new(42.5)));
    let outcome = dispatcher.dispatch("SaveAndResetMap");
    assert_eq!(outcome, DispatchOutcome::RunFinalized(Seconds::new(42.5)));
    assert_eq!(log.snapshot(), vec![Call::Finalize(Seconds::new(42.5)), Call::Reset]);
}

#[test]
fn save_and_reset_defaults_to_zero_length_without_tracker_clock() {
    let (dispatcher, log) = dispatcher_with(None);
    let outcome = dispatcher.dispatch("SaveAndResetMap");
    assert_eq!(outcome, DispatchOutcome::RunFinalized(Seconds::ZERO));
    assert_eq!(log.snapshot(), vec![Call::Finalize(Seconds::ZERO), Call::Reset]);
}

#[test]
fn unknown_and_incomplete_messages_have_no_effect() {
    let (dispatcher, log) = dispatcher_with(None);
    for message in ["Unknown:foo", "SetVideoKey", "", ":::"] {
        let outcome = dispatcher.dispatch(message);
        assert_eq!(outcome.label(), "ignored", "message {message:?}");
    }
    assert!(log.snapshot().is_empty());
}

#[test]
fn cloned_dispatchers_share_handles() {
    let (dispatcher, log) = dispatcher_with(None);
    let clone = dispatcher.clone();
    let handle = std::thread::spawn(move || clone.dispatch("ResetMap"));
    assert_eq!(handle.join().unwrap(), DispatchOutcome::MapReset);
    dispatcher.dispatch("ResetMap");
    assert_eq!(log.snapshot(), vec![Call::Reset, Call::Reset]);
}
