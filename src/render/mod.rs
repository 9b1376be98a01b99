//! Paced ("typewriter") text rendering
//!
//! Bursty upstream updates (streaming AI drafts, rapid partials) are
//! smoothed into a bounded-rate sequence of frames. Each frame is a
//! bounded-step advance toward the current target string; replacing the
//! target mid-animation discards the in-flight convergence toward the old
//! one.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// Cadence parameters for the renderer.
#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    /// Delay between frames at normal cadence.
    pub frame_delay: Duration,
    /// Maximum character advance per frame at normal cadence.
    pub max_step: usize,
    /// Delay between frames while rushing to the final text.
    pub rush_frame_delay: Duration,
    /// Maximum character advance per frame while rushing.
    pub rush_max_step: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frame_delay: Duration::from_millis(40),
            max_step: 3,
            rush_frame_delay: Duration::from_millis(12),
            rush_max_step: 16,
        }
    }
}

#[derive(Default)]
struct RenderState {
    target: String,
    emitted: String,
    rush: bool,
    canceled: bool,
}

/// Renders target strings as a paced sequence of growing frames.
///
/// Frames go out on the channel handed to [`PacedTextRenderer::new`]. The
/// render loop runs on its own task; all control methods are non-blocking.
/// Guarantees: no two consecutive identical frames, frame length never
/// regresses except when a new target is submitted, and nothing is emitted
/// after `cancel()`.
pub struct PacedTextRenderer {
    state: Arc<Mutex<RenderState>>,
    notify: Arc<Notify>,
    task: JoinHandle<()>,
}

impl PacedTextRenderer {
    pub fn new(config: RendererConfig, frames: mpsc::UnboundedSender<String>) -> Self {
        let state = Arc::new(Mutex::new(RenderState::default()));
        let notify = Arc::new(Notify::new());

        let task = tokio::spawn(Self::run(
            config,
            Arc::clone(&state),
            Arc::clone(&notify),
            frames,
        ));

        Self {
            state,
            notify,
            task,
        }
    }

    /// Replace the target string. In-flight convergence toward the old
    /// target is discarded.
    pub fn set_target(&self, text: impl Into<String>) {
        let mut st = self.state.lock().unwrap();
        if st.canceled {
            return;
        }
        st.target = text.into();
        st.rush = false;
        drop(st);
        self.notify.notify_one();
    }

    /// Submit the final target and converge to it at the rush cadence.
    pub fn rush(&self, text: impl Into<String>) {
        let mut st = self.state.lock().unwrap();
        if st.canceled {
            return;
        }
        st.target = text.into();
        st.rush = true;
        drop(st);
        self.notify.notify_one();
    }

    /// Character length of the most recent frame.
    pub fn rendered_len(&self) -> usize {
        self.state.lock().unwrap().emitted.chars().count()
    }

    /// Whether the last frame equals the current target.
    pub fn converged(&self) -> bool {
        let st = self.state.lock().unwrap();
        st.emitted == st.target
    }

    /// Poll until convergence or until `max_wait` elapses. Returns whether
    /// convergence was reached; callers proceed either way rather than
    /// blocking indefinitely on a stalled animation.
    pub async fn wait_converged(&self, max_wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            if self.converged() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Stop the render loop. Nothing is emitted after this returns.
    pub fn cancel(&self) {
        {
            let mut st = self.state.lock().unwrap();
            st.canceled = true;
        }
        self.task.abort();
        self.notify.notify_one();
    }

    async fn run(
        config: RendererConfig,
        state: Arc<Mutex<RenderState>>,
        notify: Arc<Notify>,
        frames: mpsc::UnboundedSender<String>,
    ) {
        loop {
            let next = {
                let mut st = state.lock().unwrap();
                if st.canceled {
                    return;
                }
                let target_chars: Vec<char> = st.target.chars().collect();
                let emitted_len = st.emitted.chars().count();
                let (step, delay) = if st.rush {
                    (config.rush_max_step, config.rush_frame_delay)
                } else {
                    (config.max_step, config.frame_delay)
                };
                let next_len = (emitted_len + step).min(target_chars.len());
                let candidate: String = target_chars[..next_len].iter().collect();
                if candidate == st.emitted {
                    None
                } else {
                    st.emitted = candidate.clone();
                    Some((candidate, delay))
                }
            };

            match next {
                Some((frame, delay)) => {
                    if frames.send(frame).is_err() {
                        return;
                    }
                    tokio::time::sleep(delay).await;
                }
                None => notify.notified().await,
            }
        }
    }
}

impl Drop for PacedTextRenderer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
