//! Async driver for a liveness session.

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, instrument};

use super::{
    LivenessChallenge, LivenessConfig, LivenessDetector, LivenessFrame, LivenessPass, LivenessState,
};
use crate::error::Result;

/// Runs a [`LivenessDetector`] against a live frame feed.
///
/// Frames arrive on a `watch` channel, so a slow consumer only ever sees the
/// newest frame. The deadline is a `tokio::time` sleep raced against the
/// feed; dropping the future cancels both.
#[derive(Debug, Default)]
pub struct LivenessGate {
    detector: LivenessDetector,
}

impl LivenessGate {
    pub fn new(config: LivenessConfig) -> Self {
        Self::with_detector(LivenessDetector::new(config))
    }

    pub fn with_detector(detector: LivenessDetector) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &LivenessDetector {
        &self.detector
    }

    /// Run a full session and return the pass token.
    ///
    /// Errors with `LivenessTimeout` when a challenge deadline passes, and
    /// with `LivenessFailed` when the frame sender is dropped mid-session.
    #[instrument(level = "info", skip(self, frames))]
    pub async fn run(
        &mut self,
        challenges: &[LivenessChallenge],
        mut frames: watch::Receiver<Option<LivenessFrame>>,
    ) -> Result<LivenessPass> {
        self.detector.reset();
        self.detector.start(challenges)?;

        while self.detector.state() == LivenessState::Challenging {
            let Some(deadline) = self.detector.deadline() else {
                break;
            };

            tokio::select! {
                changed = frames.changed() => {
                    if changed.is_err() {
                        self.detector.abort("Frame source closed");
                        break;
                    }
                    let frame = *frames.borrow_and_update();
                    if let Some(frame) = frame {
                        self.detector.update_at(&frame, Instant::now());
                    }
                }
                _ = sleep_until(deadline) => {
                    self.detector.expire_at(Instant::now());
                }
            }
        }

        debug!(state = ?self.detector.state(), "Liveness session finished");
        self.detector.pass()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::GlowError;

    fn gate() -> LivenessGate {
        LivenessGate::with_detector(LivenessDetector::with_seed(LivenessConfig::default(), 11))
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_frames() {
        let (_tx, rx) = watch::channel(None);
        let mut gate = gate();
        let started = Instant::now();

        let err = gate.run(&[LivenessChallenge::Smile], rx).await.unwrap_err();
        assert!(matches!(
            err,
            GlowError::LivenessTimeout { ref challenge } if challenge == "smile"
        ));
        assert_eq!(gate.detector().state(), LivenessState::Timeout);
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_passes_with_frames() {
        let (tx, rx) = watch::channel(None);
        let mut gate = gate();

        let feeder = tokio::spawn(async move {
            for frame in [
                LivenessFrame::smiling(0.95),
                LivenessFrame::yaw(30.0),
                LivenessFrame::smiling(0.95),
                LivenessFrame::yaw(30.0),
            ] {
                tokio::time::sleep(Duration::from_millis(100)).await;
                if tx.send(Some(frame)).is_err() {
                    break;
                }
            }
            // Keep the channel open until the gate finishes.
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let pass = gate
            .run(&[LivenessChallenge::Smile, LivenessChallenge::TurnLeft], rx)
            .await
            .unwrap();
        assert_eq!(pass.completed().len(), 2);
        feeder.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_feed_fails() {
        let (tx, rx) = watch::channel(None);
        drop(tx);
        let err = gate().run(&[LivenessChallenge::Nod], rx).await.unwrap_err();
        assert!(matches!(err, GlowError::LivenessFailed(_)));
    }
}
