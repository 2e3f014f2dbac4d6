// crates/slam-telemetry-cli/src/replay.rs
// ============================================================================
// Module: Session Replay
// Description: JSON-lines event model and driver for offline sessions.
// Purpose: Reproduce a tracking session against a run recorder without a
//          live tracker.
// Dependencies: slam-telemetry-core, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! A replay log holds one JSON object per line, tagged by `event`:
//!
//! ```text
//! {"event":"initialized","delay":0.8}
//! {"event":"command","message":"SetVideoKey:run_01"}
//! {"event":"frame","timestamp":0.033,"rotation":[[1,0,0],[0,1,0],[0,0,1]],"translation":[0,0,0]}
//! {"event":"key_frame","timestamp":0.033,"rotation":[[1,0,0],[0,1,0],[0,0,1]],"center":[0,0,0]}
//! {"event":"loss_at","timestamp":1.5}
//! {"event":"loss","duration":0.4}
//! {"event":"map","points":[[1,2,3]]}
//! {"event":"command","message":"SaveAndResetMap"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. A malformed line
//! aborts the replay with its line number.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use slam_telemetry_core::CommandDispatcher;
use slam_telemetry_core::DispatchOutcome;
use slam_telemetry_core::KeyFrameView;
use slam_telemetry_core::MapPointView;
use slam_telemetry_core::Matrix3;
use slam_telemetry_core::RunRecorder;
use slam_telemetry_core::Seconds;
use slam_telemetry_core::TrackedFrame;
use slam_telemetry_core::Vector3;
use thiserror::Error;
use tracing::debug;

use crate::tracker::StandInTracker;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted length of one replay line in bytes.
pub const MAX_EVENT_LINE_BYTES: usize = 1024 * 1024;

/// Prefix marking a comment line.
const COMMENT_PREFIX: char = '#';

// ============================================================================
// SECTION: Events
// ============================================================================

/// One recorded tracking event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// The tracker finished initializing.
    Initialized {
        /// Delay between start-up and initialization.
        delay: Seconds,
    },
    /// A tracked frame with its world-to-camera pose.
    Frame {
        /// Frame timestamp.
        timestamp: Seconds,
        /// World-to-camera rotation rows.
        rotation: Matrix3,
        /// World-to-camera translation.
        translation: Vector3,
        /// Whether the frame was promoted to a key frame.
        #[serde(default)]
        key_frame: bool,
    },
    /// A key frame carrying its cached inverse pose.
    KeyFrame {
        /// Key frame timestamp.
        timestamp: Seconds,
        /// Camera-to-world rotation rows.
        rotation: Matrix3,
        /// Camera center in world coordinates.
        center: Vector3,
    },
    /// Tracking was lost for the given duration.
    Loss {
        /// Loss duration.
        duration: Seconds,
    },
    /// Tracking was lost at the given time.
    LossAt {
        /// Time of the loss.
        timestamp: Seconds,
    },
    /// Snapshot of the current map points.
    Map {
        /// Landmark positions in world coordinates.
        points: Vec<Vector3>,
    },
    /// A control message for the dispatcher.
    Command {
        /// Raw `VERB:ARG` message.
        message: String,
    },
}

impl ReplayEvent {
    /// Parses one replay line; `None` for blank and comment lines.
    ///
    /// # Errors
    ///
    /// Returns the JSON decoding error message when the line is malformed.
    pub fn parse_line(line: &str) -> Result<Option<Self>, String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
            return Ok(None);
        }
        serde_json::from_str(trimmed).map(Some).map_err(|err| err.to_string())
    }
}

/// Frame decoded from a `frame` event.
struct ReplayFrame {
    /// Frame timestamp.
    timestamp: Seconds,
    /// World-to-camera rotation.
    rotation: Matrix3,
    /// World-to-camera translation.
    translation: Vector3,
}

impl TrackedFrame for ReplayFrame {
    fn timestamp(&self) -> Seconds {
        self.timestamp
    }

    fn camera_pose(&self) -> (Matrix3, Vector3) {
        (self.rotation, self.translation)
    }
}

/// Key frame decoded from a `key_frame` event.
struct ReplayKeyFrame {
    /// Key frame timestamp.
    timestamp: Seconds,
    /// Camera-to-world rotation.
    rotation: Matrix3,
    /// Camera center.
    center: Vector3,
}

impl KeyFrameView for ReplayKeyFrame {
    fn timestamp(&self) -> Seconds {
        self.timestamp
    }

    fn inverse_pose(&self) -> (Matrix3, Vector3) {
        (self.rotation, self.center)
    }
}

/// Map point decoded from a `map` event.
struct ReplayMapPoint(Vector3);

impl MapPointView for ReplayMapPoint {
    fn world_position(&self) -> Vector3 {
        self.0
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Replay failures.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Reading the log or writing output failed.
    #[error("replay io error: {0}")]
    Io(String),
    /// A line could not be decoded.
    #[error("replay line {line}: {message}")]
    Event {
        /// One-based line number.
        line: usize,
        /// Decoding failure.
        message: String,
    },
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Counters reported after a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Events applied.
    pub events: usize,
    /// Frame and key frame events applied.
    pub frames: usize,
    /// Control messages dispatched.
    pub commands: usize,
}

/// Drives replay events into a recorder and a stand-in tracker.
pub struct ReplaySession<R: RunRecorder + ?Sized> {
    /// Telemetry sink receiving frames, losses, and map exports.
    recorder: Arc<R>,
    /// Tracker stand-in observing frame timestamps.
    tracker: Arc<StandInTracker>,
    /// Router for `command` events.
    dispatcher: CommandDispatcher<R, StandInTracker>,
}

impl<R: RunRecorder + ?Sized> ReplaySession<R> {
    /// Creates a session over shared recorder and tracker handles.
    #[must_use]
    pub fn new(recorder: Arc<R>, tracker: Arc<StandInTracker>) -> Self {
        let dispatcher = CommandDispatcher::new(Arc::clone(&recorder), Arc::clone(&tracker));
        Self {
            recorder,
            tracker,
            dispatcher,
        }
    }

    /// Applies one event; returns the dispatch outcome for `command` events.
    pub fn apply(&self, event: ReplayEvent) -> Option<DispatchOutcome> {
        match event {
            ReplayEvent::Initialized {
                delay,
            } => self.recorder.set_initialization_time(delay),
            ReplayEvent::Frame {
                timestamp,
                rotation,
                translation,
                key_frame,
            } => {
                let frame = ReplayFrame {
                    timestamp,
                    rotation,
                    translation,
                };
                self.recorder.record_tracked_frame(&frame, key_frame);
                self.tracker.observe(timestamp);
            }
            ReplayEvent::KeyFrame {
                timestamp,
                rotation,
                center,
            } => {
                let key_frame = ReplayKeyFrame {
                    timestamp,
                    rotation,
                    center,
                };
                self.recorder.record_key_frame(&key_frame);
                self.tracker.observe(timestamp);
            }
            ReplayEvent::Loss {
                duration,
            } => self.recorder.record_loss(duration),
            ReplayEvent::LossAt {
                timestamp,
            } => self.recorder.record_loss_at(timestamp),
            ReplayEvent::Map {
                points,
            } => {
                let points: Vec<ReplayMapPoint> = points.into_iter().map(ReplayMapPoint).collect();
                let views: Vec<&dyn MapPointView> =
                    points.iter().map(|point| point as &dyn MapPointView).collect();
                self.recorder.export_map_points(&views);
            }
            ReplayEvent::Command {
                message,
            } => return Some(self.dispatcher.dispatch(&message)),
        }
        None
    }

    /// Replays every line of `input`, handing dispatch outcomes to `on_outcome`.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] when a line cannot be read or decoded, or when
    /// `on_outcome` fails.
    pub fn run<B, F>(&self, input: B, mut on_outcome: F) -> Result<ReplayReport, ReplayError>
    where
        B: BufRead,
        F: FnMut(&DispatchOutcome) -> std::io::Result<()>,
    {
        let mut report = ReplayReport::default();
        for (index, line) in input.lines().enumerate() {
            let line_number = index.saturating_add(1);
            let line = line.map_err(|err| ReplayError::Io(err.to_string()))?;
            if line.len() > MAX_EVENT_LINE_BYTES {
                return Err(ReplayError::Event {
                    line: line_number,
                    message: "line exceeds size limit".to_string(),
                });
            }
            let event = ReplayEvent::parse_line(&line).map_err(|message| ReplayError::Event {
                line: line_number,
                message,
            })?;
            let Some(event) = event else {
                continue;
            };
            if matches!(event, ReplayEvent::Frame { .. } | ReplayEvent::KeyFrame { .. }) {
                report.frames = report.frames.saturating_add(1);
            }
            report.events = report.events.saturating_add(1);
            if let Some(outcome) = self.apply(event) {
                report.commands = report.commands.saturating_add(1);
                on_outcome(&outcome).map_err(|err| ReplayError::Io(err.to_string()))?;
            }
        }
        debug!(
            events = report.events,
            frames = report.frames,
            commands = report.commands,
            "replay complete"
        );
        Ok(report)
    }
}
