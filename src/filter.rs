//! Record/replay around a caller-supplied upstream call
//!
//! The upstream is any async function from request to response; these
//! helpers never perform network I/O themselves.

use std::future::Future;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::message::{Request, Response};
use crate::recall::Recall;
use crate::replay::{Messages, Replay};
use crate::storage::Storage;
use crate::{Result, RewindError};

/// Answer from `recall` when possible, otherwise call upstream and store the
/// result
///
/// # Errors
///
/// Returns error if recall, the upstream call, or storage fails
pub async fn serve_cached<R, S, F, Fut>(
    recall: &R,
    storage: &S,
    request: Request,
    upstream: F,
) -> Result<Response>
where
    R: Recall + ?Sized,
    S: Storage + ?Sized,
    F: FnOnce(Request) -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    if let Some(response) = recall.get(&request)? {
        debug!("Served from cache: {} {}", request.method(), request.uri());
        return Ok(response);
    }

    record(storage, request, upstream).await
}

/// Call upstream and store the interaction
///
/// # Errors
///
/// Returns error if the upstream call or storage fails
pub async fn record<S, F, Fut>(storage: &S, request: Request, upstream: F) -> Result<Response>
where
    S: Storage + ?Sized,
    F: FnOnce(Request) -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    let response = upstream(request.clone()).await?;
    storage.set(&request, &response)?;

    debug!(
        "Recorded: {} {} -> {}",
        request.method(),
        request.uri(),
        response.status()
    );

    Ok(response)
}

/// Serves recorded responses one at a time, in replay order, whatever the
/// incoming request
pub struct ResponsePlayer<'a> {
    responses: Mutex<Messages<'a, Response>>,
}

impl<'a> ResponsePlayer<'a> {
    /// Start playing back `replay` from its first response
    ///
    /// # Errors
    ///
    /// Returns error if the replay store cannot be scanned
    pub fn new<R: Replay + ?Sized>(replay: &'a R) -> Result<Self> {
        info!("Starting response playback");
        Ok(Self {
            responses: Mutex::new(replay.responses()?),
        })
    }

    /// Next recorded response
    ///
    /// # Errors
    ///
    /// Returns `Exhausted` once every response has been served, or the error
    /// for an unreadable entry
    pub async fn serve(&self, request: &Request) -> Result<Response> {
        let mut responses = self.responses.lock().await;
        let response = responses.next().ok_or(RewindError::Exhausted)??;

        debug!(
            "Played back {} for {} {}",
            response.status(),
            request.method(),
            request.uri()
        );

        Ok(response)
    }
}
