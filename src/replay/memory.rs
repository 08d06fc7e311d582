//! Replay over an in-memory log

use super::{Messages, Replay};
use crate::message::{Request, Response};
use crate::predicate::Predicate;
use crate::storage::{MemoryQueueStore, Record};
use crate::Result;

/// Replay over a [`MemoryQueueStore`], in insertion order
///
/// Each call iterates a snapshot of the log taken when it is made, so the
/// sequence is finite even while records keep arriving. Calling again picks
/// up anything appended since.
#[derive(Debug, Clone)]
pub struct MemoryQueueReplay {
    store: MemoryQueueStore,
    predicate: Predicate,
}

impl MemoryQueueReplay {
    /// Create a replay view over a log
    #[must_use]
    pub fn new(store: MemoryQueueStore, predicate: Predicate) -> Self {
        Self { store, predicate }
    }
}

impl Replay for MemoryQueueReplay {
    fn requests(&self) -> Result<Messages<'_, Request>> {
        Ok(Box::new(
            self.store
                .snapshot()
                .into_iter()
                .map(|record| record.request)
                .filter(|request| self.predicate.test(request))
                .map(Ok),
        ))
    }

    fn responses(&self) -> Result<Messages<'_, Response>> {
        Ok(Box::new(
            self.store
                .snapshot()
                .into_iter()
                .map(|record| record.response)
                .filter(|response| self.predicate.test(response))
                .map(Ok),
        ))
    }

    fn records(&self) -> Result<Messages<'_, Record>> {
        Ok(Box::new(
            self.store
                .snapshot()
                .into_iter()
                .filter(|record| {
                    self.predicate.test(&record.request) || self.predicate.test(&record.response)
                })
                .map(Ok),
        ))
    }
}
