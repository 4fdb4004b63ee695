//! Events and payload conversion.

use crate::error::{Result, RouterError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with the original event and the error when one of its
/// listeners fails.
pub type FailureHandler = Arc<dyn Fn(&Event, &RouterError) + Send + Sync>;

/// A named event with an opaque byte payload.
///
/// Events are immutable once built. Cloning is cheap: the payload and the
/// failure handler are shared.
#[derive(Clone)]
pub struct Event {
    name: Arc<str>,
    payload: Arc<[u8]>,
    async_preferred: bool,
    on_failure: Option<FailureHandler>,
}

impl Event {
    /// Create an event with raw bytes.
    pub fn new(name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        let name: String = name.into();
        let payload: Vec<u8> = payload.into();
        Self {
            name: Arc::from(name),
            payload: Arc::from(payload),
            async_preferred: false,
            on_failure: None,
        }
    }

    /// Create an event with no payload.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Build an event from a typed payload.
    ///
    /// A payload that already is an [`Event`] is returned unchanged and `name`
    /// is ignored. Any other payload is converted to bytes; see [`Payload`].
    pub fn from_typed(name: impl Into<String>, payload: impl Into<Payload>) -> Self {
        match payload.into() {
            Payload::Event(event) => event,
            other => Self::new(name, other.into_bytes()),
        }
    }

    /// Ask for every listener to be run off the publishing thread.
    pub fn asynchronous(mut self) -> Self {
        self.async_preferred = true;
        self
    }

    /// Attach a failure handler.
    pub fn on_failure<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Event, &RouterError) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn prefers_async(&self) -> bool {
        self.async_preferred
    }

    pub fn failure_handler(&self) -> Option<&FailureHandler> {
        self.on_failure.as_ref()
    }

    /// Decode a JSON payload.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| RouterError::Deserialization(e.to_string()))
    }

    /// Decode a MessagePack payload.
    pub fn decode_msgpack<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(rmp_serde::from_slice(&self.payload)?)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("payload_len", &self.payload.len())
            .field("async", &self.async_preferred)
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// Anything that can be published by name.
///
/// Conversion to bytes is a closed set, tried in variant order:
/// an [`Event`] passes through untouched, text becomes its UTF-8 bytes,
/// bytes pass through, and JSON values are serialized.
#[derive(Debug)]
pub enum Payload {
    Event(Event),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Empty,
}

impl Payload {
    /// Serialize any value as JSON. Failure yields [`Payload::Empty`].
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => Payload::Bytes(bytes),
            Err(e) => {
                tracing::debug!(target: "patchbay", error = %e, "payload serialization failed");
                Payload::Empty
            }
        }
    }

    /// Serialize any value as MessagePack. Failure yields [`Payload::Empty`].
    pub fn msgpack<T: Serialize + ?Sized>(value: &T) -> Self {
        match rmp_serde::to_vec(value) {
            Ok(bytes) => Payload::Bytes(bytes),
            Err(e) => {
                tracing::debug!(target: "patchbay", error = %e, "payload serialization failed");
                Payload::Empty
            }
        }
    }

    /// Convert to payload bytes. An event yields its own payload.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Event(event) => event.payload.to_vec(),
            Payload::Text(text) => text.into_bytes(),
            Payload::Bytes(bytes) => bytes,
            Payload::Json(value) => match serde_json::to_vec(&value) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(target: "patchbay", error = %e, "payload serialization failed");
                    Vec::new()
                }
            },
            Payload::Empty => Vec::new(),
        }
    }
}

impl From<Event> for Payload {
    fn from(event: Event) -> Self {
        Payload::Event(event)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(bytes.to_vec())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Payload::Empty)
    }
}
