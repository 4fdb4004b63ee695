//! Error handling and logging edge cases.

use patchbay::log::Fields;
use patchbay::{
    DebugLog, Event, Payload, Router, RouterConfig, RouterError, Subscriber, TracingLog,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};

// --- Error values ---

#[test]
fn test_error_messages() {
    assert_eq!(RouterError::handler("x").to_string(), "Handler failed: x");
    assert_eq!(
        RouterError::Panicked("boom".into()).to_string(),
        "Handler panicked: boom"
    );

    let boxed: Box<dyn std::error::Error + Send + Sync> = "custom".into();
    assert_eq!(RouterError::from(boxed).to_string(), "custom");
}

#[derive(Debug, Deserialize)]
struct Signup {
    #[allow(dead_code)]
    email: String,
}

#[test]
fn test_listener_can_use_question_mark() {
    let router = Router::new();
    router.register(
        "signup",
        Subscriber::new(|event: &Event| {
            let _signup: Signup = event.decode_json()?;
            Ok(())
        }),
    );

    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let on_failure = move |_e: &Event, err: &RouterError| {
        sink.lock()
            .unwrap()
            .push(matches!(err, RouterError::Deserialization(_)));
    };

    router.publish(
        Event::new("signup", br#"{"email":"a@b.c"}"#.to_vec()).on_failure(on_failure.clone()),
    );
    router.publish(Event::new("signup", b"garbage".to_vec()).on_failure(on_failure));

    assert_eq!(*errors.lock().unwrap(), vec![true]);
}

#[test]
fn test_serialization_failure_publishes_empty_payload() {
    let router = Router::new();
    let seen = Arc::new(Mutex::new(None));
    let s = Arc::clone(&seen);
    router.register(
        "bad",
        Subscriber::new(move |event: &Event| {
            *s.lock().unwrap() = Some(event.payload().len());
            Ok(())
        }),
    );

    let mut unserializable = std::collections::BTreeMap::new();
    unserializable.insert((1, 2), "tuple keys are not JSON");
    router.publish_by("bad", Payload::json(&unserializable));

    assert_eq!(*seen.lock().unwrap(), Some(0));
}

// --- Logging ---

#[derive(Clone, Default)]
struct CaptureLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl DebugLog for CaptureLog {
    fn debug(&self, message: &str, fields: Fields<'_>) {
        let keys: Vec<&str> = fields.iter().map(|(k, _)| *k).collect();
        self.lines
            .lock()
            .unwrap()
            .push(format!("{} {}", message, keys.join(",")));
    }
}

#[test]
fn test_logger_sees_register_unregister_publish() {
    let log = CaptureLog::default();
    let router = Router::with_config(RouterConfig::default().with_logger(log.clone()));

    router.register("x", Subscriber::named("a", |_e: &Event| Ok(())));
    router.publish(Event::empty("x"));
    router.unregister_names("x", &["a"]);
    router.unregister_all("x");

    let lines = log.lines.lock().unwrap();
    assert_eq!(
        *lines,
        vec![
            "register pattern,subscriber",
            "publish event,subscribers",
            "unregister pattern,names,removed",
            "unregister pattern,removed",
        ]
    );
}

#[test]
fn test_tracing_log_with_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    let router = Router::with_config(RouterConfig::default().with_logger(TracingLog));
    router.register("*", Subscriber::noop());
    router.publish_by("traced", "payload");
    assert_eq!(router.registry().subscriber_count("*"), 1);
}
