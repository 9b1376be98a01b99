use super::{EngineEvent, EngineKind, RecognitionEngine};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

type SharedEngine = Arc<Mutex<Box<dyn RecognitionEngine>>>;

/// Races a primary and a backup engine over the same audio source.
///
/// Both engines start together. The first usable `Final` wins and the loser
/// is canceled. Partials from the primary are preferred for early feedback;
/// the backup's events are suppressed until the primary fails. A primary
/// `Error` before any final is swallowed and makes the backup
/// authoritative. The coordinator remembers which engine answered so
/// accounting can attribute the result to the right vendor.
pub struct ParallelEngineCoordinator {
    name: String,
    primary: SharedEngine,
    backup: SharedEngine,
    primary_name: String,
    backup_name: String,
    primary_ready: watch::Receiver<bool>,
    running: Arc<AtomicBool>,
    winner: Arc<StdMutex<Option<String>>>,
    merge_task: Option<JoinHandle<()>>,
}

impl ParallelEngineCoordinator {
    pub fn new(primary: Box<dyn RecognitionEngine>, backup: Box<dyn RecognitionEngine>) -> Self {
        let primary_name = primary.name().to_string();
        let backup_name = backup.name().to_string();
        let primary_ready = primary.readiness();
        Self {
            name: format!("parallel({primary_name}+{backup_name})"),
            primary: Arc::new(Mutex::new(primary)),
            backup: Arc::new(Mutex::new(backup)),
            primary_name,
            backup_name,
            primary_ready,
            running: Arc::new(AtomicBool::new(false)),
            winner: Arc::new(StdMutex::new(None)),
            merge_task: None,
        }
    }

    /// Which engine produced the final result, once one has.
    pub fn answered_by(&self) -> Option<String> {
        self.winner.lock().ok().and_then(|w| w.clone())
    }

    fn record_winner(winner: &Arc<StdMutex<Option<String>>>, name: &str) {
        if let Ok(mut w) = winner.lock() {
            *w = Some(name.to_string());
        }
    }

    fn cancel_engine(engine: SharedEngine, name: String) {
        tokio::spawn(async move {
            if let Err(e) = engine.lock().await.cancel().await {
                warn!("failed to cancel losing engine {}: {}", name, e);
            }
        });
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for ParallelEngineCoordinator {
    async fn start(&mut self) -> Result<mpsc::Receiver<EngineEvent>> {
        let mut primary_rx = self
            .primary
            .lock()
            .await
            .start()
            .await
            .context("failed to start primary engine")?;

        // A backup that refuses to start degrades the race to primary-only.
        let backup_rx = match self.backup.lock().await.start().await {
            Ok(rx) => Some(rx),
            Err(e) => {
                warn!("backup engine {} failed to start: {}", self.backup_name, e);
                None
            }
        };

        self.running.store(true, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(64);
        let primary = Arc::clone(&self.primary);
        let backup = Arc::clone(&self.backup);
        let primary_name = self.primary_name.clone();
        let backup_name = self.backup_name.clone();
        let running = Arc::clone(&self.running);
        let winner = Arc::clone(&self.winner);

        self.merge_task = Some(tokio::spawn(async move {
            let mut backup_open = backup_rx.is_some();
            let mut backup_rx = backup_rx.unwrap_or_else(|| {
                let (_closed_tx, closed_rx) = mpsc::channel(1);
                closed_rx
            });
            let mut primary_open = true;
            let mut primary_failed = false;
            let mut backup_failed = false;
            let mut primary_error: Option<String> = None;
            let mut backup_error: Option<String> = None;
            let mut stopped_forwarded = false;

            loop {
                tokio::select! {
                    ev = primary_rx.recv(), if primary_open => match ev {
                        None => primary_open = false,
                        Some(EngineEvent::Final(text)) => {
                            Self::record_winner(&winner, &primary_name);
                            Self::cancel_engine(Arc::clone(&backup), backup_name.clone());
                            let _ = tx.send(EngineEvent::Final(text)).await;
                            break;
                        }
                        Some(EngineEvent::Error(msg)) => {
                            warn!("primary engine {} failed: {}", primary_name, msg);
                            primary_failed = true;
                            if backup_failed || !backup_open {
                                // The backup was already authoritative when
                                // it failed, so its error is the one
                                // reported.
                                let surfaced = backup_error.take().unwrap_or(msg);
                                let _ = tx.send(EngineEvent::Error(surfaced)).await;
                                break;
                            }
                            primary_error = Some(msg);
                        }
                        Some(EngineEvent::Stopped) => {
                            if !stopped_forwarded {
                                stopped_forwarded = true;
                                let _ = tx.send(EngineEvent::Stopped).await;
                            }
                        }
                        Some(ev) => {
                            if !primary_failed {
                                let _ = tx.send(ev).await;
                            }
                        }
                    },
                    ev = backup_rx.recv(), if backup_open => match ev {
                        None => backup_open = false,
                        Some(EngineEvent::Final(text)) => {
                            Self::record_winner(&winner, &backup_name);
                            Self::cancel_engine(Arc::clone(&primary), primary_name.clone());
                            let _ = tx.send(EngineEvent::Final(text)).await;
                            break;
                        }
                        Some(EngineEvent::Error(msg)) => {
                            warn!("backup engine {} failed: {}", backup_name, msg);
                            backup_failed = true;
                            if primary_failed {
                                let _ = tx.send(EngineEvent::Error(msg)).await;
                                break;
                            }
                            backup_error = Some(msg);
                        }
                        Some(EngineEvent::Stopped) => {
                            if primary_failed && !stopped_forwarded {
                                stopped_forwarded = true;
                                let _ = tx.send(EngineEvent::Stopped).await;
                            }
                        }
                        Some(ev) => {
                            if primary_failed {
                                let _ = tx.send(ev).await;
                            }
                        }
                    },
                    else => break,
                }

                // Both channels drained without a terminal event.
                if !primary_open && !backup_open {
                    let msg = primary_error
                        .take()
                        .unwrap_or_else(|| "all engines stopped without a result".to_string());
                    let _ = tx.send(EngineEvent::Error(msg)).await;
                    break;
                }

                // Primary failed and the backup is already gone.
                if primary_failed && !backup_open && !backup_failed {
                    let msg = primary_error
                        .take()
                        .unwrap_or_else(|| "primary engine failed".to_string());
                    let _ = tx.send(EngineEvent::Error(msg)).await;
                    break;
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("parallel merge task finished");
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Err(e) = self.primary.lock().await.stop().await {
            warn!("failed to stop primary engine {}: {}", self.primary_name, e);
        }
        if let Err(e) = self.backup.lock().await.stop().await {
            warn!("failed to stop backup engine {}: {}", self.backup_name, e);
        }
        Ok(())
    }

    async fn cancel(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.merge_task.take() {
            task.abort();
        }
        if let Err(e) = self.primary.lock().await.cancel().await {
            warn!("failed to cancel primary engine {}: {}", self.primary_name, e);
        }
        if let Err(e) = self.backup.lock().await.cancel().await {
            warn!("failed to cancel backup engine {}: {}", self.backup_name, e);
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
        EngineKind::Parallel
    }

    fn readiness(&self) -> watch::Receiver<bool> {
        self.primary_ready.clone()
    }

    fn winner(&self) -> Arc<StdMutex<Option<String>>> {
        Arc::clone(&self.winner)
    }
}
