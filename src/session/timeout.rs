use std::time::Duration;

/// Processing-deadline policy.
///
/// Pure and deterministic: given the observed audio duration, how long the
/// engines get to answer after recording stops. The deadline is
/// monotonically non-decreasing in audio duration, has a floor for
/// near-zero audio, and has no ceiling so long utterances are never
/// starved. Racing a backup engine adds fixed slack for the coordination
/// overhead.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    /// Minimum viable deadline, applied even for near-zero audio.
    pub floor: Duration,
    /// Extra allowed processing time per unit of audio time.
    pub audio_scale: f64,
    /// Additional slack when a parallel backup engine is active.
    pub parallel_slack: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            floor: Duration::from_secs(5),
            audio_scale: 1.0,
            parallel_slack: Duration::from_secs(10),
        }
    }
}

impl TimeoutPolicy {
    /// Allowed processing time for `audio` worth of recorded speech.
    pub fn deadline(&self, audio: Duration, parallel: bool) -> Duration {
        let mut deadline = self.floor + audio.mul_f64(self.audio_scale.max(0.0));
        if parallel {
            deadline += self.parallel_slack;
        }
        deadline
    }
}
