//! Bounded-width parallel dispatch over a URL worklist.
//!
//! [`run_bounded`] spawns one task per URL, admitting at most `width` at a
//! time through a counting semaphore. Tasks append their items to a single
//! mutex-guarded collection; the lock is held only for the append.
//!
//! Per-URL failures are logged and skipped. Cancellation of the run's token
//! stops admission and makes the whole batch fail with
//! [`PipelineError::Cancelled`] once the admitted tasks have finished.

use crate::error::PipelineError;
use futures::future::join_all;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Run `handler` over every URL of `worklist`, at most `width` at once.
///
/// Returns the items produced by all successful handlers, in completion
/// order. `width` below 1 is treated as 1.
///
/// # Errors
///
/// [`PipelineError::Cancelled`] if `cancel` fires before every URL has been
/// processed. Items collected so far are discarded.
#[instrument(level = "info", skip_all, fields(urls = worklist.len(), width = width))]
pub async fn run_bounded<T, E, F, Fut>(
    worklist: Vec<String>,
    width: usize,
    cancel: &CancellationToken,
    handler: F,
) -> Result<Vec<T>, PipelineError>
where
    T: Send + 'static,
    E: Display + Send + 'static,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
{
    let t0 = Instant::now();
    let total = worklist.len();
    let gate = Arc::new(Semaphore::new(width.max(1)));
    let results: Arc<Mutex<Vec<T>>> = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);
    let mut handles = Vec::with_capacity(total);

    for url in worklist {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&gate).acquire_owned() => permit,
        };
        let Ok(permit) = permit else {
            break;
        };

        let handler = Arc::clone(&handler);
        let results = Arc::clone(&results);
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            match handler(url.clone()).await {
                Ok(items) => {
                    let count = items.len();
                    results.lock().await.extend(items);
                    info!(%url, records = count, "Done");
                }
                Err(e) => warn!(%url, error = %e, "Failed; skipping URL"),
            }
        }));
    }

    let admitted = handles.len();
    let mut panicked = 0usize;
    for joined in join_all(handles).await {
        if let Err(e) = joined {
            panicked += 1;
            error!(error = %e, "Worker task panicked; skipping URL");
        }
    }

    if cancel.is_cancelled() {
        warn!(admitted, total, "Run cancelled; discarding collected results");
        return Err(PipelineError::Cancelled);
    }

    let collected = std::mem::take(&mut *results.lock().await);
    info!(
        admitted,
        panicked,
        items = collected.len(),
        elapsed_ms = t0.elapsed().as_millis(),
        "Worklist complete"
    );
    Ok(collected)
}
