//! # Patchbay
//!
//! An in-process publish/subscribe event router.
//!
//! Producers publish named events; consumers subscribe to event-name patterns
//! and receive matching events through their listeners.
//!
//! ## Core Concepts
//!
//! - **Patterns**: Event names with an optional `*` at the start, the end, or
//!   both (`user.*`, `*.paid`, `*audit*`, `*`)
//! - **Subscribers**: Listeners with an optional name (for selective removal)
//!   and an optional preference for asynchronous delivery
//! - **Events**: A name and a byte payload, optionally asynchronous and
//!   optionally carrying a failure handler
//! - **Delivery**: Synchronous inline, or on a worker pool; listener failures
//!   and panics are isolated from the publisher and from each other
//!
//! ## Example
//!
//! ```
//! use patchbay::{Event, Router, Subscriber};
//!
//! let router = Router::new();
//!
//! router.register("user.*", Subscriber::named("welcome", |event: &Event| {
//!     println!("welcome mail for {}", event.name());
//!     Ok(())
//! }));
//!
//! router.publish(
//!     Event::new("user.created", br#"{"id":1}"#.to_vec())
//!         .on_failure(|event, err| eprintln!("{} failed: {}", event.name(), err)),
//! );
//!
//! router.unregister_names("user.*", &["welcome"]);
//! assert!(router.snapshot().is_empty());
//! ```

pub mod error;
pub mod event;
mod executor;
pub mod log;
pub mod pattern;
pub mod registry;
pub mod router;
pub mod subscriber;

// Re-exports
pub use error::{Result, RouterError};
pub use event::{Event, FailureHandler, Payload};
pub use log::{DebugLog, NoopLog, TracingLog};
pub use pattern::{Pattern, PatternKind, WILDCARD};
pub use registry::Registry;
pub use router::{Router, RouterConfig};
pub use subscriber::{Listener, Subscriber};
