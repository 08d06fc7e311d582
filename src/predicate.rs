//! Injected policies: which messages to keep, and how to name queue folders

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::message::Message;

/// Decides whether a message is stored or replayed
///
/// Must be pure: it is called once per message per operation, possibly from
/// many threads at once.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&dyn Message) -> bool + Send + Sync>);

impl Predicate {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&dyn Message) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Accept every message
    #[must_use]
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Reject every message
    #[must_use]
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Evaluate against a message
    pub fn test(&self, message: &dyn Message) -> bool {
        (self.0)(message)
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Produces folder names for disk queues
#[derive(Clone)]
pub struct IdGenerator(Arc<dyn Fn() -> String + Send + Sync>);

impl IdGenerator {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Zero-padded nanosecond timestamp followed by a random UUID
    ///
    /// Lexicographic order of these ids follows capture order.
    #[must_use]
    pub fn timestamped() -> Self {
        Self::new(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
            format!("{nanos:020}{}", Uuid::new_v4().simple())
        })
    }

    /// Next id
    pub fn next_id(&self) -> String {
        (self.0)()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::timestamped()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdGenerator(..)")
    }
}
