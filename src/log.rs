//! Pluggable debug logging.
//!
//! The router reports register, unregister and publish calls through a
//! [`DebugLog`]. Logging never affects delivery; the default [`NoopLog`]
//! discards everything.

use std::fmt;

/// Key-value fields attached to a log message.
pub type Fields<'a> = &'a [(&'a str, &'a dyn fmt::Debug)];

/// Sink for the router's debug messages.
pub trait DebugLog: Send + Sync {
    fn debug(&self, message: &str, fields: Fields<'_>);
}

/// Discards every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLog;

impl DebugLog for NoopLog {
    fn debug(&self, _message: &str, _fields: Fields<'_>) {}
}

/// Forwards messages to `tracing` at debug level under the `patchbay` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl DebugLog for TracingLog {
    fn debug(&self, message: &str, fields: Fields<'_>) {
        tracing::debug!(target: "patchbay", fields = %DisplayFields(fields), "{}", message);
    }
}

struct DisplayFields<'a>(Fields<'a>);

impl fmt::Display for DisplayFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={:?}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_fields() {
        let count = 3usize;
        let name = "user.created";
        let fields: Fields<'_> = &[("event", &name), ("subscribers", &count)];
        assert_eq!(
            DisplayFields(fields).to_string(),
            "event=\"user.created\" subscribers=3"
        );
    }

    #[test]
    fn test_noop_accepts_anything() {
        NoopLog.debug("register", &[("pattern", &"x")]);
    }
}
