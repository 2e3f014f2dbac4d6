// crates/slam-telemetry-core/src/runtime/dispatcher.rs
// ============================================================================
// Module: SLAM Telemetry Command Dispatcher
// Description: Parser and router for text control messages.
// Purpose: Turn `VERB:ARG` messages into recorder and tracker calls.
// Dependencies: thiserror, tracing, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Control messages are colon-delimited strings whose first field is a verb,
//! matched case-insensitively:
//!
//! | Message                | Action                                      |
//! |------------------------|---------------------------------------------|
//! | `SetVideoKey:<run id>` | [`RunRecorder::set_id`]                     |
//! | `ResetMap`             | [`TrackerControl::reset`]                   |
//! | `SaveAndResetMap`      | [`RunRecorder::finalize`], then reset       |
//!
//! Empty fields are compressed (`a::b` reads as `a:b`) and extra arguments
//! are ignored. Malformed messages never fail the caller; they are reported
//! as [`DispatchOutcome::Ignored`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use tracing::info;

use crate::core::time::Seconds;
use crate::interfaces::RunRecorder;
use crate::interfaces::TrackerControl;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Field delimiter for control messages.
const FIELD_DELIMITER: char = ':';
/// Verb selecting the active run.
const VERB_SET_VIDEO_KEY: &str = "SetVideoKey";
/// Verb resetting the tracker map.
const VERB_RESET_MAP: &str = "ResetMap";
/// Verb finalizing the run and resetting the tracker map.
const VERB_SAVE_AND_RESET_MAP: &str = "SaveAndResetMap";

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Parsed control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Select a new active run.
    SetVideoKey(String),
    /// Reset the tracker map.
    ResetMap,
    /// Finalize the active run, then reset the tracker map.
    SaveAndResetMap,
}

/// Reasons a control message is not routed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    /// The message had no fields.
    #[error("empty control message")]
    Empty,
    /// The verb is not recognized.
    #[error("unknown control verb: {0}")]
    UnknownVerb(String),
    /// A required argument was absent.
    #[error("control verb {0} requires an argument")]
    MissingArgument(&'static str),
}

impl ControlCommand {
    /// Parses a control message.
    ///
    /// # Errors
    ///
    /// Returns [`CommandParseError`] for empty messages, unknown verbs, or
    /// missing arguments.
    pub fn parse(message: &str) -> Result<Self, CommandParseError> {
        let mut fields =
            message.trim().split(FIELD_DELIMITER).map(str::trim).filter(|field| !field.is_empty());
        let Some(verb) = fields.next() else {
            return Err(CommandParseError::Empty);
        };
        if verb.eq_ignore_ascii_case(VERB_SET_VIDEO_KEY) {
            let Some(run_id) = fields.next() else {
                return Err(CommandParseError::MissingArgument(VERB_SET_VIDEO_KEY));
            };
            return Ok(Self::SetVideoKey(run_id.to_string()));
        }
        if verb.eq_ignore_ascii_case(VERB_RESET_MAP) {
            return Ok(Self::ResetMap);
        }
        if verb.eq_ignore_ascii_case(VERB_SAVE_AND_RESET_MAP) {
            return Ok(Self::SaveAndResetMap);
        }
        Err(CommandParseError::UnknownVerb(verb.to_string()))
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of routing one control message.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The recorder was asked to switch to this run.
    RunSelected(String),
    /// The tracker map was reset.
    MapReset,
    /// The run was finalized with this sequence length, then the map reset.
    RunFinalized(Seconds),
    /// The message was not routed.
    Ignored(CommandParseError),
}

impl DispatchOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::RunSelected(_) => "run_selected",
            Self::MapReset => "map_reset",
            Self::RunFinalized(_) => "run_finalized",
            Self::Ignored(_) => "ignored",
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunSelected(run_id) => write!(f, "run selected: {run_id}"),
            Self::MapReset => f.write_str("map reset"),
            Self::RunFinalized(length) => write!(f, "run finalized after {length}"),
            Self::Ignored(reason) => write!(f, "ignored: {reason}"),
        }
    }
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Stateless router from control messages to a recorder and a tracker.
pub struct CommandDispatcher<R: ?Sized, T: ?Sized> {
    /// Telemetry sink.
    recorder: Arc<R>,
    /// Tracker control surface.
    tracker: Arc<T>,
}

impl<R: ?Sized, T: ?Sized> Clone for CommandDispatcher<R, T> {
    fn clone(&self) -> Self {
        Self {
            recorder: Arc::clone(&self.recorder),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<R, T> CommandDispatcher<R, T>
where
    R: RunRecorder + ?Sized,
    T: TrackerControl + ?Sized,
{
    /// Creates a dispatcher over shared recorder and tracker handles.
    #[must_use]
    pub const fn new(recorder: Arc<R>, tracker: Arc<T>) -> Self {
        Self {
            recorder,
            tracker,
        }
    }

    /// Parses and routes one control message.
    pub fn dispatch(&self, message: &str) -> DispatchOutcome {
        debug!(message, "control message received");
        match ControlCommand::parse(message) {
            Ok(command) => self.execute(command),
            Err(reason) => {
                debug!(message, error = %reason, "control message ignored");
                DispatchOutcome::Ignored(reason)
            }
        }
    }

    /// Routes an already-parsed command.
    pub fn execute(&self, command: ControlCommand) -> DispatchOutcome {
        match command {
            ControlCommand::SetVideoKey(run_id) => {
                self.recorder.set_id(&run_id);
                DispatchOutcome::RunSelected(run_id)
            }
            ControlCommand::ResetMap => {
                self.tracker.reset();
                info!("tracker map reset");
                DispatchOutcome::MapReset
            }
            ControlCommand::SaveAndResetMap => {
                let sequence_length = self.tracker.sequence_length().unwrap_or(Seconds::ZERO);
                self.recorder.finalize(sequence_length);
                self.tracker.reset();
                info!(sequence_length = sequence_length.value(), "run finalized and map reset");
                DispatchOutcome::RunFinalized(sequence_length)
            }
        }
    }
}
