//! Replay over a disk queue folder

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{Messages, Replay, ReplayOrder};
use crate::message::{Message, Request, Response};
use crate::predicate::Predicate;
use crate::storage::layout::{self, REQUEST_FILE, RESPONSE_FILE};
use crate::storage::Record;
use crate::Result;

/// Replay over folders written by `DiskQueueStorage`
///
/// With [`ReplayOrder::Listing`] the order is whatever the filesystem
/// returns; the default [`ReplayOrder::Sorted`] follows folder names, which
/// for timestamped ids is capture order.
#[derive(Debug, Clone)]
pub struct DiskQueueReplay {
    base_dir: PathBuf,
    predicate: Predicate,
    order: ReplayOrder,
}

impl DiskQueueReplay {
    /// Create a replay rooted at `base_dir`, sorted by folder name
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, predicate: Predicate) -> Self {
        Self {
            base_dir: base_dir.into(),
            predicate,
            order: ReplayOrder::default(),
        }
    }

    /// Change the folder visiting order
    #[must_use]
    pub fn with_order(mut self, order: ReplayOrder) -> Self {
        self.order = order;
        self
    }

    /// Base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn folders(&self) -> Result<Vec<PathBuf>> {
        let folders = layout::record_folders(&self.base_dir, self.order)?;
        debug!(
            "Replaying {} records from {}",
            folders.len(),
            self.base_dir.display()
        );
        Ok(folders)
    }

    /// One half of every record, read lazily
    fn side<M>(&self, file: &'static str) -> Result<Messages<'_, M>>
    where
        M: Message + 'static,
    {
        let folders = self.folders()?;

        Ok(Box::new(folders.into_iter().filter_map(move |folder| {
            match layout::read_required::<M>(&folder, file) {
                Ok(message) => self.predicate.test(&message).then_some(Ok(message)),
                Err(e) => {
                    warn!("Unreadable record {}: {}", folder.display(), e);
                    Some(Err(e))
                }
            }
        })))
    }
}

impl Replay for DiskQueueReplay {
    fn requests(&self) -> Result<Messages<'_, Request>> {
        self.side(REQUEST_FILE)
    }

    fn responses(&self) -> Result<Messages<'_, Response>> {
        self.side(RESPONSE_FILE)
    }

    fn records(&self) -> Result<Messages<'_, Record>> {
        let folders = self.folders()?;

        Ok(Box::new(folders.into_iter().filter_map(move |folder| {
            let record = layout::read_required::<Request>(&folder, REQUEST_FILE).and_then(
                |request| {
                    let response = layout::read_required::<Response>(&folder, RESPONSE_FILE)?;
                    Ok(Record::new(request, response))
                },
            );

            match record {
                Ok(record) => {
                    let keep = self.predicate.test(&record.request)
                        || self.predicate.test(&record.response);
                    keep.then_some(Ok(record))
                }
                Err(e) => {
                    warn!("Unreadable record {}: {}", folder.display(), e);
                    Some(Err(e))
                }
            }
        })))
    }
}
