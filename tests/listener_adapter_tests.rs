// Tests for the callback adapters: the standard listener contract and the
// channel sink, both driven through a real session.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use voxsession::{
    ChannelSink, EngineEvent, ErrorKind, ListenerAdapter, MockEngine, RecognitionListener,
    RecognitionSession, RendererConfig, ScriptedEvent, SessionEvent, SessionEventSink,
    SessionOptions, SessionRegistry,
};

struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }

    fn push(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RecognitionListener for CallLog {
    fn on_ready(&self) {
        self.push("ready");
    }
    fn on_beginning_of_speech(&self) {
        self.push("beginning_of_speech");
    }
    fn on_partial(&self, text: &str) {
        self.push(format!("partial:{text}"));
    }
    fn on_end_of_speech(&self) {
        self.push("end_of_speech");
    }
    fn on_final(&self, text: &str) {
        self.push(format!("final:{text}"));
    }
    fn on_error(&self, kind: ErrorKind, _message: &str) {
        self.push(format!("error:{kind:?}"));
    }
    fn on_amplitude(&self, level: f32) {
        self.push(format!("amplitude:{level}"));
    }
}

fn fast_options() -> SessionOptions {
    let mut options = SessionOptions::default();
    options.renderer = RendererConfig {
        frame_delay: Duration::from_millis(2),
        max_step: 4,
        rush_frame_delay: Duration::from_millis(1),
        rush_max_step: 16,
    };
    options
}

async fn run_session(engine: MockEngine, sink: Arc<dyn SessionEventSink>) {
    let registry = SessionRegistry::new();
    let (id, slot) = registry.begin().unwrap();
    let session = RecognitionSession::start(id, Box::new(engine), None, sink, fast_options(), slot)
        .await
        .expect("session must start");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !session.is_finished() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "session did not reach a terminal state in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    // Let the adapter's dispatch task drain its queue.
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn terminal_count(calls: &[String]) -> usize {
    calls
        .iter()
        .filter(|c| c.starts_with("final:") || c.starts_with("error:"))
        .count()
}

#[tokio::test]
async fn test_listener_callbacks_arrive_in_session_order() {
    let engine = MockEngine::new(
        "cloud",
        vec![
            ScriptedEvent::new(20, EngineEvent::Amplitude(0.5)),
            ScriptedEvent::new(30, EngineEvent::Partial("he".into())),
            ScriptedEvent::new(50, EngineEvent::Partial("hello".into())),
            ScriptedEvent::new(90, EngineEvent::Final("hello".into())),
        ],
    );
    let listener = CallLog::new();
    let adapter = Arc::new(ListenerAdapter::new(
        Arc::clone(&listener) as Arc<dyn RecognitionListener>
    ));

    run_session(engine, adapter as Arc<dyn SessionEventSink>).await;

    let calls = listener.calls();
    let ordered: Vec<&str> = calls
        .iter()
        .map(String::as_str)
        .filter(|c| !c.starts_with("amplitude"))
        .collect();
    assert_eq!(
        ordered,
        vec![
            "ready",
            "beginning_of_speech",
            "partial:he",
            "partial:hello",
            "end_of_speech",
            "final:Hello.",
        ]
    );
    assert!(
        calls.iter().any(|c| c.starts_with("amplitude")),
        "amplitude callback never fired"
    );
    assert_eq!(terminal_count(&calls), 1);
}

#[tokio::test]
async fn test_listener_sees_exactly_one_terminal_from_a_chatty_engine() {
    // The engine keeps talking after its final; the listener must not hear
    // any of it.
    let engine = MockEngine::new(
        "chatty",
        vec![
            ScriptedEvent::new(30, EngineEvent::Final("all good".into())),
            ScriptedEvent::new(60, EngineEvent::Partial("noise".into())),
            ScriptedEvent::new(90, EngineEvent::Error("late failure".into())),
        ],
    )
    .allow_post_terminal();
    let listener = CallLog::new();
    let adapter = Arc::new(ListenerAdapter::new(
        Arc::clone(&listener) as Arc<dyn RecognitionListener>
    ));

    run_session(engine, adapter as Arc<dyn SessionEventSink>).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let calls = listener.calls();
    assert_eq!(terminal_count(&calls), 1);
    assert_eq!(calls.last().map(String::as_str), Some("final:All good."));
}

#[tokio::test]
async fn test_listener_receives_classified_terminal_error() {
    let engine = MockEngine::new(
        "cloud",
        vec![ScriptedEvent::new(
            40,
            EngineEvent::Error("network connection refused".into()),
        )],
    );
    let listener = CallLog::new();
    let adapter = Arc::new(ListenerAdapter::new(
        Arc::clone(&listener) as Arc<dyn RecognitionListener>
    ));

    run_session(engine, adapter as Arc<dyn SessionEventSink>).await;

    let calls = listener.calls();
    assert_eq!(terminal_count(&calls), 1);
    assert_eq!(calls.last().map(String::as_str), Some("error:Network"));
}

#[tokio::test]
async fn test_channel_sink_delivers_the_ordered_stream() {
    let (sink, mut rx) = ChannelSink::new();
    let engine = MockEngine::new(
        "cloud",
        vec![
            ScriptedEvent::new(20, EngineEvent::Partial("hi".into())),
            ScriptedEvent::new(60, EngineEvent::Final("hi there".into())),
        ],
    );

    run_session(engine, Arc::new(sink)).await;

    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    assert_eq!(
        events,
        vec![
            SessionEvent::Ready,
            SessionEvent::BeginningOfSpeech,
            SessionEvent::Partial("hi".into()),
            SessionEvent::EndOfSpeech,
            SessionEvent::Final("Hi there.".into()),
        ]
    );
}
