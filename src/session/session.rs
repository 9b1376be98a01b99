use super::config::SessionOptions;
use super::registry::ActiveSlot;
use super::stats::{Phase, SessionStats};
use crate::adapter::{classify_message, SessionEvent, SessionEventSink};
use crate::engine::{EngineEvent, EngineKind, RecognitionEngine};
use crate::error::{ErrorKind, StartError};
use crate::postprocess::{apply_simple, PostProcessOutcome, PostProcessPipeline};
use crate::render::PacedTextRenderer;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// One in-flight recognition attempt.
///
/// Owns the engine, the deadline timer, the paced renderer, and the
/// post-processing job for a single attempt, and emits one ordered event
/// stream to the attached sink. All state transitions run on a single
/// sequencing task; engine events, caller commands, timer firings, and
/// renderer frames all arrive as messages on one channel. The first
/// terminal event wins; everything after it is dropped.
pub struct RecognitionSession {
    id: u32,
    msg_tx: mpsc::UnboundedSender<SessionMsg>,
    shared: Arc<SessionShared>,
}

impl std::fmt::Debug for RecognitionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionSession")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

struct SessionShared {
    finished: AtomicBool,
    canceled: AtomicBool,
    ready_wait_ms: AtomicU64,
    stats: StdMutex<SessionStats>,
}

enum SessionMsg {
    Engine(EngineEvent),
    Stop,
    Cancel,
    TimeoutFired(u64),
    Frame(String),
    PostProcessDone {
        original: String,
        outcome: Option<PostProcessOutcome>,
    },
    RushComplete,
}

impl RecognitionSession {
    /// Start a session: start the engine, emit `Ready`, and spawn the
    /// sequencing loop. The registry slot is released on every exit path
    /// of the loop.
    pub async fn start(
        id: u32,
        mut engine: Box<dyn RecognitionEngine>,
        pipeline: Option<Arc<dyn PostProcessPipeline>>,
        sink: Arc<dyn SessionEventSink>,
        options: SessionOptions,
        slot: ActiveSlot,
    ) -> Result<Self, StartError> {
        let mut engine_rx = engine.start().await.map_err(StartError::EngineStart)?;
        let engine_kind = engine.kind();
        let engine_name = engine.name().to_string();
        let readiness = engine.readiness();
        let winner = engine.winner();

        info!("session {} recording with engine {}", id, engine_name);

        let shared = Arc::new(SessionShared {
            finished: AtomicBool::new(false),
            canceled: AtomicBool::new(false),
            ready_wait_ms: AtomicU64::new(0),
            stats: StdMutex::new(SessionStats::new(Utc::now())),
        });
        shared.stats.lock().unwrap().phase = Phase::Recording;

        let (msg_tx, msg_rx) = mpsc::unbounded_channel();

        // Pump engine events into the sequencing loop.
        let pump_tx = msg_tx.clone();
        tokio::spawn(async move {
            while let Some(ev) = engine_rx.recv().await {
                if pump_tx.send(SessionMsg::Engine(ev)).is_err() {
                    break;
                }
            }
        });

        // Renderer frames flow through the same loop so adapter emission
        // stays ordered.
        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
        let renderer = Arc::new(PacedTextRenderer::new(options.renderer, frame_tx));
        let frame_pump_tx = msg_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                if frame_pump_tx.send(SessionMsg::Frame(frame)).is_err() {
                    break;
                }
            }
        });

        sink.emit(SessionEvent::Ready);

        let task = SessionTask {
            id,
            engine: Arc::new(Mutex::new(engine)),
            engine_kind,
            engine_name,
            readiness,
            winner,
            pipeline,
            sink,
            options,
            shared: Arc::clone(&shared),
            msg_tx: msg_tx.clone(),
            renderer,
            phase: Phase::Recording,
            recording_started: Instant::now(),
            processing_started: None,
            audio_duration: None,
            begun_speech: false,
            end_of_speech_sent: false,
            final_received: false,
            pending_final: None,
            timer: None,
            timer_gen: 0,
            post_process_task: None,
            _slot: slot,
        };
        tokio::spawn(task.run(msg_rx));

        Ok(Self {
            id,
            msg_tx,
            shared,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// End recording and start processing what was heard. Idempotent, and
    /// idempotent with an engine-initiated auto-stop racing it.
    pub fn stop(&self) {
        let _ = self.msg_tx.send(SessionMsg::Stop);
    }

    /// Abort the attempt. No further events are delivered. Idempotent.
    pub fn cancel(&self) {
        let _ = self.msg_tx.send(SessionMsg::Cancel);
    }

    /// Whether the session reached a terminal phase.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::SeqCst)
    }

    /// Whether the session ended by cancellation.
    pub fn is_canceled(&self) -> bool {
        self.shared.canceled.load(Ordering::SeqCst)
    }

    /// Accounting snapshot.
    pub fn stats(&self) -> SessionStats {
        self.shared.stats.lock().unwrap().clone()
    }
}

struct SessionTask {
    id: u32,
    engine: Arc<Mutex<Box<dyn RecognitionEngine>>>,
    engine_kind: EngineKind,
    engine_name: String,
    readiness: watch::Receiver<bool>,
    winner: Arc<StdMutex<Option<String>>>,
    pipeline: Option<Arc<dyn PostProcessPipeline>>,
    sink: Arc<dyn SessionEventSink>,
    options: SessionOptions,
    shared: Arc<SessionShared>,
    msg_tx: mpsc::UnboundedSender<SessionMsg>,
    renderer: Arc<PacedTextRenderer>,

    phase: Phase,
    recording_started: Instant,
    processing_started: Option<Instant>,
    audio_duration: Option<std::time::Duration>,
    begun_speech: bool,
    end_of_speech_sent: bool,
    final_received: bool,
    pending_final: Option<String>,
    timer: Option<JoinHandle<()>>,
    timer_gen: u64,
    post_process_task: Option<JoinHandle<()>>,

    // Released when the loop task drops, whatever the exit path.
    _slot: ActiveSlot,
}

impl SessionTask {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionMsg>) {
        while let Some(msg) = rx.recv().await {
            if self.phase.is_terminal() {
                break;
            }
            match msg {
                SessionMsg::Engine(ev) => self.on_engine_event(ev),
                SessionMsg::Stop => self.on_stop(false),
                SessionMsg::Cancel => self.on_cancel(),
                SessionMsg::TimeoutFired(gen) => self.on_timeout(gen),
                SessionMsg::Frame(text) => self.on_frame(text),
                SessionMsg::PostProcessDone { original, outcome } => {
                    self.on_post_process_done(original, outcome)
                }
                SessionMsg::RushComplete => self.on_rush_complete(),
            }
            if self.phase.is_terminal() {
                break;
            }
        }
    }

    fn on_engine_event(&mut self, ev: EngineEvent) {
        match ev {
            EngineEvent::Partial(text) => {
                // Late partials after a final are dropped.
                if self.final_received
                    || !matches!(self.phase, Phase::Recording | Phase::Processing)
                {
                    return;
                }
                if !self.begun_speech {
                    self.begun_speech = true;
                    self.sink.emit(SessionEvent::BeginningOfSpeech);
                }
                self.sink.emit(SessionEvent::Partial(text));
            }
            EngineEvent::Amplitude(level) => {
                if !self.phase.is_terminal() {
                    self.sink.amplitude(level);
                }
            }
            EngineEvent::Stopped => self.on_stop(true),
            EngineEvent::Final(text) => self.on_final(text),
            EngineEvent::Error(message) => self.on_engine_error(message),
        }
    }

    /// Recording -> Processing, from a caller `stop()` or an
    /// engine-initiated auto-stop. The two racing is fine: the second one
    /// hits the phase guard.
    fn on_stop(&mut self, engine_initiated: bool) {
        if self.phase != Phase::Recording {
            return;
        }
        let audio = *self
            .audio_duration
            .get_or_insert_with(|| self.recording_started.elapsed());
        self.processing_started = Some(Instant::now());
        self.set_phase(Phase::Processing);
        self.shared.stats.lock().unwrap().audio_ms = Some(audio.as_millis() as u64);

        if !self.end_of_speech_sent {
            self.end_of_speech_sent = true;
            self.sink.emit(SessionEvent::EndOfSpeech);
        }

        self.arm_timer();

        if !engine_initiated {
            let engine = Arc::clone(&self.engine);
            let id = self.id;
            tokio::spawn(async move {
                if let Err(e) = engine.lock().await.stop().await {
                    warn!("session {}: engine stop failed: {}", id, e);
                }
            });
        }
    }

    /// Arm the processing-deadline timer. For local-model engines the
    /// countdown is deferred until the model reports ready (bounded), so
    /// first-load latency is not charged against the deadline.
    fn arm_timer(&mut self) {
        let audio = self.audio_duration.unwrap_or_default();
        let parallel = self.engine_kind == EngineKind::Parallel;
        let deadline = self.options.timeout.deadline(audio, parallel);

        self.timer_gen += 1;
        let gen = self.timer_gen;
        let msg_tx = self.msg_tx.clone();
        let mut readiness = self.readiness.clone();
        let defer_for_model = self.engine_kind == EngineKind::LocalModel;
        let ready_wait_max = self.options.ready_wait_max;
        let shared = Arc::clone(&self.shared);

        info!(
            "session {}: processing deadline {} ms for {} ms of audio",
            self.id,
            deadline.as_millis(),
            audio.as_millis()
        );

        self.timer = Some(tokio::spawn(async move {
            if defer_for_model && !*readiness.borrow() {
                let wait_start = Instant::now();
                let _ = tokio::time::timeout(ready_wait_max, async {
                    while readiness.changed().await.is_ok() {
                        if *readiness.borrow() {
                            break;
                        }
                    }
                })
                .await;
                shared
                    .ready_wait_ms
                    .store(wait_start.elapsed().as_millis() as u64, Ordering::SeqCst);
            }
            tokio::time::sleep(deadline).await;
            let _ = msg_tx.send(SessionMsg::TimeoutFired(gen));
        }));
    }

    fn disarm_timer(&mut self) {
        self.timer_gen += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn on_final(&mut self, text: String) {
        if self.final_received || self.phase.is_terminal() {
            return;
        }
        self.final_received = true;
        self.disarm_timer();

        // Streaming engines can deliver a final without an explicit stop.
        if self.phase == Phase::Recording {
            let audio = *self
                .audio_duration
                .get_or_insert_with(|| self.recording_started.elapsed());
            self.shared.stats.lock().unwrap().audio_ms = Some(audio.as_millis() as u64);
            self.processing_started = Some(Instant::now());
        }
        if !self.end_of_speech_sent {
            self.end_of_speech_sent = true;
            self.sink.emit(SessionEvent::EndOfSpeech);
        }
        self.set_phase(Phase::Finalizing);

        // The winner cell is read lock-free from the loop; a slow engine
        // stop() holding the engine mutex must never delay the final.
        let answered_by = self
            .winner
            .lock()
            .ok()
            .and_then(|w| w.clone())
            .unwrap_or_else(|| self.engine_name.clone());
        self.shared.stats.lock().unwrap().answered_by = Some(answered_by);

        let pipeline = self
            .pipeline
            .as_ref()
            .filter(|_| self.options.post_processing)
            .map(Arc::clone);

        match pipeline {
            Some(pipeline) => {
                let msg_tx = self.msg_tx.clone();
                let id = self.id;

                // Streamed drafts retarget the renderer as they arrive.
                let (update_tx, mut update_rx) = mpsc::unbounded_channel::<String>();
                let renderer = Arc::clone(&self.renderer);
                tokio::spawn(async move {
                    while let Some(draft) = update_rx.recv().await {
                        renderer.set_target(draft);
                    }
                });

                self.post_process_task = Some(tokio::spawn(async move {
                    let outcome = match pipeline.apply_with_ai(&text, update_tx).await {
                        Ok(outcome) => Some(outcome),
                        Err(e) => {
                            warn!("session {}: post-processing failed: {}", id, e);
                            None
                        }
                    };
                    let _ = msg_tx.send(SessionMsg::PostProcessDone {
                        original: text,
                        outcome,
                    });
                }));
            }
            _ => {
                let cleaned = apply_simple(&text);
                self.sink.emit(SessionEvent::Final(cleaned));
                self.finish(Phase::Done);
            }
        }
    }

    /// The AI step finished (or failed). A blank or failed result falls
    /// back to the simple cleanup of the original recognized text; the
    /// recognition itself succeeded, so no error surfaces here.
    fn on_post_process_done(&mut self, original: String, outcome: Option<PostProcessOutcome>) {
        if self.phase.is_terminal() {
            return;
        }

        let (text, used_ai, attempted) = match outcome {
            Some(outcome) if !outcome.text.trim().is_empty() => {
                (outcome.text, outcome.used_ai, outcome.attempted)
            }
            Some(outcome) => (apply_simple(&original), false, outcome.attempted),
            None => (apply_simple(&original), false, true),
        };

        {
            let mut stats = self.shared.stats.lock().unwrap();
            stats.post_process_attempted = attempted;
            stats.post_process_used_ai = used_ai;
        }

        self.pending_final = Some(text.clone());
        self.renderer.rush(text);

        let renderer = Arc::clone(&self.renderer);
        let msg_tx = self.msg_tx.clone();
        let max_wait = self.options.converge_wait_max;
        tokio::spawn(async move {
            renderer.wait_converged(max_wait).await;
            let _ = msg_tx.send(SessionMsg::RushComplete);
        });
    }

    fn on_rush_complete(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        if let Some(text) = self.pending_final.take() {
            self.sink.emit(SessionEvent::Final(text));
            self.finish(Phase::Done);
        }
    }

    fn on_frame(&mut self, text: String) {
        if self.phase.is_terminal() {
            return;
        }
        self.sink.emit(SessionEvent::Partial(text));
    }

    fn on_engine_error(&mut self, message: String) {
        if self.final_received || self.phase.is_terminal() {
            return;
        }
        let kind = classify_message(&message);
        warn!("session {}: engine error ({:?}): {}", self.id, kind, message);
        self.disarm_timer();
        self.sink.emit(SessionEvent::Error(kind, message));
        self.finish(Phase::Error);
    }

    fn on_timeout(&mut self, gen: u64) {
        // A stale timer (disarmed, or racing a terminal event) is a no-op.
        if gen != self.timer_gen || self.final_received || self.phase.is_terminal() {
            return;
        }
        warn!("session {}: processing deadline expired", self.id);
        self.sink.emit(SessionEvent::Error(
            ErrorKind::Timeout,
            "recognition timed out".to_string(),
        ));
        self.finish(Phase::Error);
    }

    fn on_cancel(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.shared.canceled.store(true, Ordering::SeqCst);
        info!("session {} canceled", self.id);
        self.finish(Phase::Canceled);
    }

    /// Enter a terminal phase and release every subordinate resource.
    /// Runs on every exit path; nothing here can fail.
    fn finish(&mut self, phase: Phase) {
        self.set_phase(phase);
        self.disarm_timer();
        self.renderer.cancel();
        if let Some(task) = self.post_process_task.take() {
            task.abort();
        }

        // Engine teardown may involve slow I/O; keep it off the loop.
        let engine = Arc::clone(&self.engine);
        let id = self.id;
        tokio::spawn(async move {
            if let Err(e) = engine.lock().await.cancel().await {
                warn!("session {}: engine teardown failed: {}", id, e);
            }
        });

        {
            let mut stats = self.shared.stats.lock().unwrap();
            if let Some(start) = self.processing_started {
                let ready_wait = self.shared.ready_wait_ms.load(Ordering::SeqCst);
                let elapsed = start.elapsed().as_millis() as u64;
                stats.processing_ms = Some(elapsed.saturating_sub(ready_wait));
            }
        }

        self.shared.finished.store(true, Ordering::SeqCst);
        info!("session {} finished: {:?}", self.id, phase);
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.shared.stats.lock().unwrap().phase = phase;
    }
}
