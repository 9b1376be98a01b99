use super::{SessionEvent, SessionEventSink};
use crate::error::ErrorKind;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// The standard recognition-service callback contract.
///
/// One method per event, all optional. Implementations may be slow; they
/// run on the adapter's forwarding task, never on the session's sequencing
/// task.
pub trait RecognitionListener: Send + Sync {
    fn on_ready(&self) {}
    fn on_beginning_of_speech(&self) {}
    fn on_partial(&self, _text: &str) {}
    fn on_end_of_speech(&self) {}
    fn on_final(&self, _text: &str) {}
    fn on_error(&self, _kind: ErrorKind, _message: &str) {}
    fn on_amplitude(&self, _level: f32) {}
}

enum ListenerMsg {
    Event(SessionEvent),
    Amplitude(f32),
}

/// Adapter from the session event stream to a `RecognitionListener`.
///
/// Events are queued on an unbounded channel and dispatched in order by a
/// dedicated task, so a listener that blocks cannot stall cancellation or
/// timeout firing inside the session.
pub struct ListenerAdapter {
    tx: mpsc::UnboundedSender<ListenerMsg>,
}

impl ListenerAdapter {
    pub fn new(listener: Arc<dyn RecognitionListener>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    ListenerMsg::Event(event) => Self::dispatch(listener.as_ref(), event),
                    ListenerMsg::Amplitude(level) => listener.on_amplitude(level),
                }
            }
            info!("listener adapter task stopped");
        });

        Self { tx }
    }

    fn dispatch(listener: &dyn RecognitionListener, event: SessionEvent) {
        match event {
            SessionEvent::Ready => listener.on_ready(),
            SessionEvent::BeginningOfSpeech => listener.on_beginning_of_speech(),
            SessionEvent::Partial(text) => listener.on_partial(&text),
            SessionEvent::EndOfSpeech => listener.on_end_of_speech(),
            SessionEvent::Final(text) => listener.on_final(&text),
            SessionEvent::Error(kind, message) => listener.on_error(kind, &message),
        }
    }
}

impl SessionEventSink for ListenerAdapter {
    fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(ListenerMsg::Event(event));
    }

    fn amplitude(&self, level: f32) {
        let _ = self.tx.send(ListenerMsg::Amplitude(level));
    }
}
