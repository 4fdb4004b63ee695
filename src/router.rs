//! The router: registration front-end and delivery engine.

use crate::error::RouterError;
use crate::event::{Event, Payload};
use crate::executor::Executor;
use crate::log::{DebugLog, NoopLog};
use crate::registry::Registry;
use crate::subscriber::Subscriber;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Router configuration.
#[derive(Clone)]
pub struct RouterConfig {
    /// Sink for register/unregister/publish debug messages.
    /// Default: [`NoopLog`]
    pub logger: Arc<dyn DebugLog>,

    /// Resident worker threads for asynchronous deliveries. Zero is treated
    /// as one. The pool grows past this whenever every worker is busy.
    /// Default: available parallelism
    pub async_workers: usize,

    /// How long a worker started beyond `async_workers` waits for work
    /// before exiting.
    /// Default: 10s
    pub worker_idle_timeout: Duration,

    /// Worker thread name prefix.
    /// Default: "patchbay-worker"
    pub thread_name: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            logger: Arc::new(NoopLog),
            async_workers: thread::available_parallelism().map_or(4, |n| n.get()),
            worker_idle_timeout: Duration::from_secs(10),
            thread_name: "patchbay-worker".to_string(),
        }
    }
}

impl RouterConfig {
    pub fn with_logger(mut self, logger: impl DebugLog + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn with_async_workers(mut self, workers: usize) -> Self {
        self.async_workers = workers;
        self
    }
}

impl fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterConfig")
            .field("async_workers", &self.async_workers)
            .field("worker_idle_timeout", &self.worker_idle_timeout)
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

/// In-process publish/subscribe router.
///
/// Listeners subscribe to patterns (see [`Pattern`](crate::Pattern)); a
/// published event is delivered to the subscribers of every pattern that
/// matches its name.
///
/// Delivery is asynchronous when either the event or the subscriber prefers
/// it, and synchronous otherwise:
/// - Synchronous listeners run inline, in discovery order, before `publish`
///   returns. A failure is passed to the event's failure handler inline.
/// - Asynchronous listeners each start on a worker of their own; the pool
///   grows instead of making a delivery wait behind another. A failure is
///   passed to the failure handler in a separate job.
///
/// Listener failures and panics never reach the publisher and never stop
/// delivery to the remaining subscribers. No lock is held while a listener
/// runs, so listeners may register, unregister and publish freely.
pub struct Router {
    registry: Registry,
    executor: Executor,
    log: Arc<dyn DebugLog>,
}

impl Router {
    /// Create a router with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            registry: Registry::new(),
            executor: Executor::new(
                config.async_workers,
                &config.thread_name,
                config.worker_idle_timeout,
            ),
            log: config.logger,
        }
    }

    /// Subscribe to events whose name matches `pattern`.
    pub fn register(&self, pattern: &str, subscriber: Subscriber) {
        self.log.debug(
            "register",
            &[("pattern", &pattern), ("subscriber", &subscriber)],
        );
        self.registry.register(pattern, subscriber);
    }

    /// Drop every subscriber of `pattern`.
    pub fn unregister_all(&self, pattern: &str) -> usize {
        let removed = self.registry.unregister_all(pattern);
        self.log
            .debug("unregister", &[("pattern", &pattern), ("removed", &removed)]);
        removed
    }

    /// Drop the named subscribers of `pattern` matching the given identities.
    pub fn unregister(&self, pattern: &str, subscribers: &[Subscriber]) -> usize {
        let removed = self.registry.unregister_by_identity(pattern, subscribers);
        self.log.debug(
            "unregister",
            &[
                ("pattern", &pattern),
                ("subscribers", &subscribers),
                ("removed", &removed),
            ],
        );
        removed
    }

    /// Drop the subscribers of `pattern` with one of the given names.
    pub fn unregister_names(&self, pattern: &str, names: &[&str]) -> usize {
        let removed = self.registry.unregister_names(pattern, names);
        self.log.debug(
            "unregister",
            &[("pattern", &pattern), ("names", &names), ("removed", &removed)],
        );
        removed
    }

    /// Deliver `event` to every matching subscriber.
    ///
    /// Returns once synchronous listeners have finished and asynchronous
    /// ones have been queued.
    pub fn publish(&self, event: Event) {
        let subscribers = self.registry.matching(event.name());
        let event = Arc::new(event);

        for subscriber in &subscribers {
            if event.prefers_async() || subscriber.prefers_async() {
                self.deliver_async(&event, subscriber);
            } else {
                deliver(&event, subscriber);
            }
        }

        self.log.debug(
            "publish",
            &[("event", &event.name()), ("subscribers", &subscribers.len())],
        );
    }

    /// Publish `payload` under `name`, converting it with [`Event::from_typed`].
    pub fn publish_by(&self, name: &str, payload: impl Into<Payload>) {
        self.publish(Event::from_typed(name, payload));
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Copy of the subscription table.
    pub fn snapshot(&self) -> HashMap<String, Vec<Subscriber>> {
        self.registry.snapshot()
    }

    /// Asynchronous deliveries waiting for a worker.
    pub fn queued_deliveries(&self) -> usize {
        self.executor.queued()
    }

    fn deliver_async(&self, event: &Arc<Event>, subscriber: &Subscriber) {
        let event = Arc::clone(event);
        let subscriber = subscriber.clone();
        let failures = self.executor.clone();

        self.executor.spawn(move || {
            if let Err(err) = invoke(&event, &subscriber) {
                if event.failure_handler().is_some() {
                    failures.spawn(move || report_failure(&event, &err));
                }
            }
        });
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a listener inline and report its failure inline.
fn deliver(event: &Event, subscriber: &Subscriber) {
    if let Err(err) = invoke(event, subscriber) {
        report_failure(event, &err);
    }
}

/// Run a listener, turning a panic into [`RouterError::Panicked`].
fn invoke(event: &Event, subscriber: &Subscriber) -> Result<(), RouterError> {
    match panic::catch_unwind(AssertUnwindSafe(|| subscriber.handle(event))) {
        Ok(result) => result,
        Err(panic) => Err(RouterError::Panicked(panic_message(&*panic))),
    }
}

fn report_failure(event: &Event, err: &RouterError) {
    let Some(handler) = event.failure_handler() else {
        return;
    };
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| handler(event, err))) {
        tracing::warn!(
            target: "patchbay",
            event = event.name(),
            panic = %panic_message(&*panic),
            "failure handler panicked"
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
