//! Liveness state machine.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    LivenessChallenge, LivenessConfig, LivenessFrame, LivenessPass, LivenessState,
    LivenessStatus,
};
use crate::error::{GlowError, Result};

/// One liveness session.
///
/// Frames are processed synchronously, one at a time. The per-challenge
/// deadline is plain state: it is checked on every update and cleared on
/// every terminal transition and on reset, so nothing outlives the session.
pub struct LivenessDetector {
    config: LivenessConfig,
    state: LivenessState,
    current: Option<LivenessChallenge>,
    challenges: Vec<LivenessChallenge>,
    completed: Vec<LivenessChallenge>,
    deadline: Option<Instant>,
    blink_frames: u32,
    failure: Option<String>,
    rng: StdRng,
}

impl std::fmt::Debug for LivenessDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessDetector")
            .field("state", &self.state)
            .field("current", &self.current)
            .field("completed", &self.completed)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl Default for LivenessDetector {
    fn default() -> Self {
        Self::new(LivenessConfig::default())
    }
}

impl LivenessDetector {
    pub fn new(config: LivenessConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic challenge order, for tests and replays.
    pub fn with_seed(config: LivenessConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: LivenessConfig, rng: StdRng) -> Self {
        Self {
            config,
            state: LivenessState::Idle,
            current: None,
            challenges: Vec::new(),
            completed: Vec::new(),
            deadline: None,
            blink_frames: 0,
            failure: None,
            rng,
        }
    }

    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    pub fn current_challenge(&self) -> Option<LivenessChallenge> {
        self.current
    }

    /// Deadline of the active challenge; `None` outside `Challenging`.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Begin a session. Duplicate challenges are collapsed; an empty set is
    /// rejected so a session can never pass without a challenge.
    pub fn start(&mut self, challenges: &[LivenessChallenge]) -> Result<LivenessState> {
        self.start_at(challenges, Instant::now())
    }

    pub fn start_at(
        &mut self,
        challenges: &[LivenessChallenge],
        now: Instant,
    ) -> Result<LivenessState> {
        let mut unique = Vec::with_capacity(challenges.len());
        for &challenge in challenges {
            if !unique.contains(&challenge) {
                unique.push(challenge);
            }
        }
        if unique.is_empty() {
            return Err(GlowError::InvalidConfig(
                "Liveness session needs at least one challenge".into(),
            ));
        }

        self.challenges = unique;
        self.completed.clear();
        self.failure = None;
        self.state = LivenessState::Challenging;
        info!(challenges = self.challenges.len(), "Liveness session started");
        self.next_challenge(now);
        Ok(self.state)
    }

    /// Feed one frame.
    pub fn update(&mut self, frame: &LivenessFrame) -> LivenessState {
        self.update_at(frame, Instant::now())
    }

    /// Feed one frame observed at `now`. A frame that arrives after the
    /// deadline times the session out instead of being evaluated.
    pub fn update_at(&mut self, frame: &LivenessFrame, now: Instant) -> LivenessState {
        if self.expire_at(now) != LivenessState::Challenging {
            return self.state;
        }
        let Some(challenge) = self.current else {
            return self.state;
        };

        if self.check(challenge, frame) {
            debug!(challenge = %challenge, "Challenge completed");
            self.completed.push(challenge);
            self.next_challenge(now);
        }
        self.state
    }

    /// Apply the deadline. Transitions to `Timeout` at most once.
    pub fn expire_at(&mut self, now: Instant) -> LivenessState {
        if self.state == LivenessState::Challenging
            && self.deadline.is_some_and(|deadline| now >= deadline)
        {
            warn!(challenge = ?self.current, "Liveness challenge timed out");
            self.state = LivenessState::Timeout;
            self.deadline = None;
        }
        self.state
    }

    /// Abandon an active session, e.g. when the camera goes away.
    pub fn abort(&mut self, reason: impl Into<String>) -> LivenessState {
        if self.state == LivenessState::Challenging {
            let reason = reason.into();
            warn!(reason = %reason, "Liveness session aborted");
            self.state = LivenessState::Failed;
            self.failure = Some(reason);
            self.deadline = None;
        }
        self.state
    }

    /// Back to `Idle`, discarding all progress.
    pub fn reset(&mut self) {
        self.state = LivenessState::Idle;
        self.current = None;
        self.challenges.clear();
        self.completed.clear();
        self.deadline = None;
        self.blink_frames = 0;
        self.failure = None;
    }

    pub fn status(&self) -> LivenessStatus {
        let progress = if self.challenges.is_empty() {
            0.0
        } else {
            self.completed.len() as f32 / self.challenges.len() as f32
        };
        LivenessStatus {
            state: self.state,
            current_challenge: self.current,
            progress,
            completed: self.completed.clone(),
            remaining: self.remaining(),
        }
    }

    /// The pass token, or why there is none.
    pub fn pass(&self) -> Result<LivenessPass> {
        match self.state {
            LivenessState::Passed => Ok(LivenessPass::new(self.completed.clone())),
            LivenessState::Timeout => Err(GlowError::LivenessTimeout {
                challenge: self
                    .current
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".into()),
            }),
            LivenessState::Failed => Err(GlowError::LivenessFailed(
                self.failure.clone().unwrap_or_else(|| "Session failed".into()),
            )),
            LivenessState::Idle | LivenessState::Challenging => Err(GlowError::LivenessFailed(
                "Liveness session has not passed".into(),
            )),
        }
    }

    fn remaining(&self) -> Vec<LivenessChallenge> {
        self.challenges
            .iter()
            .copied()
            .filter(|c| !self.completed.contains(c))
            .collect()
    }

    fn next_challenge(&mut self, now: Instant) {
        let remaining = self.remaining();
        self.blink_frames = 0;

        match remaining.choose(&mut self.rng) {
            Some(&next) => {
                self.current = Some(next);
                self.deadline = Some(now + self.config.timeout);
                debug!(challenge = %next, "Next challenge");
            }
            None => {
                self.state = LivenessState::Passed;
                self.current = None;
                self.deadline = None;
                info!("Liveness passed");
            }
        }
    }

    fn check(&mut self, challenge: LivenessChallenge, frame: &LivenessFrame) -> bool {
        let config = &self.config;
        match challenge {
            LivenessChallenge::Blink => {
                let closed = frame.left_eye_open_probability.unwrap_or(1.0) < config.blink_threshold
                    && frame.right_eye_open_probability.unwrap_or(1.0) < config.blink_threshold;
                if closed {
                    self.blink_frames += 1;
                    false
                } else if self.blink_frames >= config.required_blink_frames {
                    true
                } else {
                    self.blink_frames = 0;
                    false
                }
            }
            LivenessChallenge::TurnLeft => {
                frame.yaw_angle.unwrap_or(0.0) > config.head_turn_threshold
            }
            LivenessChallenge::TurnRight => {
                frame.yaw_angle.unwrap_or(0.0) < -config.head_turn_threshold
            }
            LivenessChallenge::Nod => {
                frame.pitch_angle.unwrap_or(0.0).abs() > config.head_turn_threshold
            }
            LivenessChallenge::Smile => {
                frame.smiling_probability.unwrap_or(0.0) > config.smile_threshold
            }
        }
    }
}
