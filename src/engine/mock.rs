use super::{EngineEvent, EngineKind, RecognitionEngine};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// One entry in a mock engine script: emit `event` this long after start.
#[derive(Debug, Clone)]
pub struct ScriptedEvent {
    pub after: Duration,
    pub event: EngineEvent,
}

impl ScriptedEvent {
    pub fn new(after_ms: u64, event: EngineEvent) -> Self {
        Self {
            after: Duration::from_millis(after_ms),
            event,
        }
    }
}

/// Scripted engine used for the loopback ("mock") vendor and for tests.
///
/// Plays back a fixed event script on its own timeline. Honors the engine
/// contract by default: emission stops at the first terminal event. Tests
/// that exercise the session's post-terminal guards can disable that with
/// `allow_post_terminal()`.
pub struct MockEngine {
    name: String,
    kind: EngineKind,
    script: Vec<ScriptedEvent>,
    ready_delay: Option<Duration>,
    enforce_contract: bool,
    running: Arc<AtomicBool>,
    ready_tx: Arc<watch::Sender<bool>>,
    ready_rx: watch::Receiver<bool>,
    task: Option<JoinHandle<()>>,
}

impl MockEngine {
    pub fn new(name: impl Into<String>, script: Vec<ScriptedEvent>) -> Self {
        let (ready_tx, ready_rx) = watch::channel(true);
        Self {
            name: name.into(),
            kind: EngineKind::Streaming,
            script,
            ready_delay: None,
            enforce_contract: true,
            running: Arc::new(AtomicBool::new(false)),
            ready_tx: Arc::new(ready_tx),
            ready_rx,
            task: None,
        }
    }

    /// Engine that never produces any event. Used to exercise timeouts.
    pub fn silent(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// The loopback engine behind the "mock" vendor id: a short canned
    /// exchange that still flows through the full session event contract.
    pub fn loopback() -> Self {
        Self::new(
            "mock",
            vec![
                ScriptedEvent::new(30, EngineEvent::Partial("loopback".into())),
                ScriptedEvent::new(60, EngineEvent::Stopped),
                ScriptedEvent::new(100, EngineEvent::Final("loopback ok".into())),
            ],
        )
        .with_kind(EngineKind::Loopback)
    }

    pub fn with_kind(mut self, kind: EngineKind) -> Self {
        self.kind = kind;
        self
    }

    /// Simulate model load time: readiness flips to true this long after
    /// `start()`.
    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = Some(delay);
        let (tx, rx) = watch::channel(false);
        self.ready_tx = Arc::new(tx);
        self.ready_rx = rx;
        self
    }

    /// Keep playing the script past a terminal event. Only for tests of
    /// the session's idempotence guards.
    pub fn allow_post_terminal(mut self) -> Self {
        self.enforce_contract = false;
        self
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for MockEngine {
    async fn start(&mut self) -> Result<mpsc::Receiver<EngineEvent>> {
        let (tx, rx) = mpsc::channel(32);
        self.running.store(true, Ordering::SeqCst);

        if let Some(delay) = self.ready_delay {
            let ready_tx = Arc::clone(&self.ready_tx);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = ready_tx.send(true);
            });
        }

        let mut script = self.script.clone();
        script.sort_by_key(|s| s.after);
        let running = Arc::clone(&self.running);
        let enforce = self.enforce_contract;
        let name = self.name.clone();

        self.task = Some(tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            for entry in script {
                tokio::time::sleep_until(started + entry.after).await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let terminal = entry.event.is_terminal();
                if tx.send(entry.event).await.is_err() {
                    break;
                }
                if terminal {
                    running.store(false, Ordering::SeqCst);
                    if enforce {
                        break;
                    }
                }
            }
            info!("mock engine {} script finished", name);
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        // The script keeps playing: a real engine finishes processing the
        // audio it already has after stop().
        Ok(())
    }

    async fn cancel(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn readiness(&self) -> watch::Receiver<bool> {
        self.ready_rx.clone()
    }
}
