//! Listeners and the subscriber handles stored in the registry.

use crate::error::Result;
use crate::event::Event;
use std::fmt;
use std::sync::Arc;

/// Something that handles events.
///
/// Closures of the shape `Fn(&Event) -> Result<()>` implement this directly.
/// Implement it on a type to also give the listener an identity or ask for
/// asynchronous delivery.
pub trait Listener: Send + Sync {
    fn handle(&self, event: &Event) -> Result<()>;

    /// Identity used by [`Registry::unregister_by_identity`](crate::Registry::unregister_by_identity).
    fn name(&self) -> Option<&str> {
        None
    }

    /// Run this listener off the publishing thread.
    fn prefers_async(&self) -> bool {
        false
    }
}

impl<F> Listener for F
where
    F: Fn(&Event) -> Result<()> + Send + Sync,
{
    fn handle(&self, event: &Event) -> Result<()> {
        self(event)
    }
}

struct Noop;

impl Listener for Noop {
    fn handle(&self, _event: &Event) -> Result<()> {
        Ok(())
    }
}

/// A registered listener with its capabilities resolved.
///
/// Name and async preference are read from the listener once, when the
/// handle is built, and are not queried again during dispatch.
#[derive(Clone)]
pub struct Subscriber {
    listener: Arc<dyn Listener>,
    name: Option<Arc<str>>,
    async_preferred: bool,
}

impl Subscriber {
    /// Anonymous subscriber. Only removable with `unregister_all`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        Self::from_listener(Arc::new(handler))
    }

    /// Subscriber with an identity.
    pub fn named<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        let name: String = name.into();
        Self {
            name: Some(Arc::from(name)),
            ..Self::new(handler)
        }
    }

    /// Subscriber whose handler may be absent; a missing handler does nothing.
    pub fn from_optional<F>(handler: Option<F>) -> Self
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        match handler {
            Some(handler) => Self::new(handler),
            None => Self::noop(),
        }
    }

    /// Subscriber that accepts every event and does nothing.
    pub fn noop() -> Self {
        Self::from_listener(Arc::new(Noop))
    }

    /// Wrap an arbitrary listener, capturing its name and async preference.
    pub fn from_listener(listener: Arc<dyn Listener>) -> Self {
        let name = listener.name().map(Arc::from);
        let async_preferred = listener.prefers_async();
        Self {
            listener,
            name,
            async_preferred,
        }
    }

    /// Ask for this subscriber to be run off the publishing thread.
    pub fn asynchronous(mut self) -> Self {
        self.async_preferred = true;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn prefers_async(&self) -> bool {
        self.async_preferred
    }

    pub(crate) fn handle(&self, event: &Event) -> Result<()> {
        self.listener.handle(event)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("name", &self.name)
            .field("async", &self.async_preferred)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;

    struct Audit;

    impl Listener for Audit {
        fn handle(&self, _event: &Event) -> Result<()> {
            Err(RouterError::handler("audit offline"))
        }

        fn name(&self) -> Option<&str> {
            Some("audit")
        }

        fn prefers_async(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_capabilities_resolved_from_listener() {
        let sub = Subscriber::from_listener(Arc::new(Audit));
        assert_eq!(sub.name(), Some("audit"));
        assert!(sub.prefers_async());
        assert!(sub.handle(&Event::empty("x")).is_err());
    }

    #[test]
    fn test_closure_subscriber() {
        let sub = Subscriber::new(|_e: &Event| Ok(()));
        assert_eq!(sub.name(), None);
        assert!(!sub.prefers_async());

        let sub = Subscriber::named("mailer", |_e: &Event| Ok(())).asynchronous();
        assert_eq!(sub.name(), Some("mailer"));
        assert!(sub.prefers_async());
    }

    #[test]
    fn test_missing_handler_is_noop() {
        let sub = Subscriber::from_optional(None::<fn(&Event) -> Result<()>>);
        assert!(sub.handle(&Event::empty("anything")).is_ok());
        assert!(Subscriber::noop().handle(&Event::empty("x")).is_ok());
    }
}
