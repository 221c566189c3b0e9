//! Challenge-response liveness gate.
//!
//! A [`LivenessDetector`] runs randomized challenges (blink, head turns,
//! nod, smile) against per-frame face measurements and only yields a
//! [`LivenessPass`] once every challenge is met before its deadline.
//! [`LivenessGate`] drives a detector from an async frame stream.

mod detector;
mod gate;

pub use detector::LivenessDetector;
pub use gate::LivenessGate;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Challenges run when the caller does not choose.
pub const DEFAULT_CHALLENGES: [LivenessChallenge; 3] = [
    LivenessChallenge::Blink,
    LivenessChallenge::TurnLeft,
    LivenessChallenge::TurnRight,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessState {
    Idle,
    Challenging,
    Passed,
    Failed,
    Timeout,
}

impl LivenessState {
    /// Passed, Failed and Timeout are final until `reset`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessChallenge {
    Blink,
    TurnLeft,
    TurnRight,
    Nod,
    Smile,
}

impl LivenessChallenge {
    /// Instruction shown to the subject.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Blink => "Blink slowly",
            Self::TurnLeft => "Turn your head to the left",
            Self::TurnRight => "Turn your head to the right",
            Self::Nod => "Nod your head",
            Self::Smile => "Smile",
        }
    }
}

impl fmt::Display for LivenessChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Blink => "blink",
            Self::TurnLeft => "turn_left",
            Self::TurnRight => "turn_right",
            Self::Nod => "nod",
            Self::Smile => "smile",
        })
    }
}

/// Thresholds and timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivenessConfig {
    /// Time allowed for each challenge.
    pub timeout: Duration,
    /// Eye-open probability below which an eye counts as closed.
    pub blink_threshold: f32,
    /// Degrees of yaw (turns) or pitch (nod) required.
    pub head_turn_threshold: f32,
    /// Smiling probability required.
    pub smile_threshold: f32,
    /// Consecutive closed-eye frames before a reopen counts as a blink.
    pub required_blink_frames: u32,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(15_000),
            blink_threshold: 0.3,
            head_turn_threshold: 20.0,
            smile_threshold: 0.7,
            required_blink_frames: 2,
        }
    }
}

/// Face measurements for one camera frame, normalised across detectors.
///
/// Missing eye probabilities count as open; missing angles and smile as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessFrame {
    pub left_eye_open_probability: Option<f32>,
    pub right_eye_open_probability: Option<f32>,
    /// Head turn, degrees. Positive is the subject's left.
    pub yaw_angle: Option<f32>,
    /// Head nod, degrees.
    pub pitch_angle: Option<f32>,
    pub smiling_probability: Option<f32>,
}

impl LivenessFrame {
    pub fn eyes(open: f32) -> Self {
        Self {
            left_eye_open_probability: Some(open),
            right_eye_open_probability: Some(open),
            ..Default::default()
        }
    }

    pub fn yaw(degrees: f32) -> Self {
        Self {
            yaw_angle: Some(degrees),
            ..Default::default()
        }
    }

    pub fn pitch(degrees: f32) -> Self {
        Self {
            pitch_angle: Some(degrees),
            ..Default::default()
        }
    }

    pub fn smiling(probability: f32) -> Self {
        Self {
            smiling_probability: Some(probability),
            ..Default::default()
        }
    }
}

/// Snapshot of a session for UI progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessStatus {
    pub state: LivenessState,
    pub current_challenge: Option<LivenessChallenge>,
    /// Completed fraction, 0.0 to 1.0.
    pub progress: f32,
    pub completed: Vec<LivenessChallenge>,
    pub remaining: Vec<LivenessChallenge>,
}

/// Evidence that a liveness session passed.
///
/// Only a detector in the `Passed` state can produce one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessPass {
    completed: Vec<LivenessChallenge>,
    passed_at: DateTime<Utc>,
}

impl LivenessPass {
    pub(crate) fn new(completed: Vec<LivenessChallenge>) -> Self {
        Self {
            completed,
            passed_at: Utc::now(),
        }
    }

    pub fn completed(&self) -> &[LivenessChallenge] {
        &self.completed
    }

    pub fn passed_at(&self) -> DateTime<Utc> {
        self.passed_at
    }
}
