use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::http::client::HttpClient;
use crate::http::probe::{self, ProbeCall, Sample};

/// Execute a batch of calls against one target with a fixed concurrency
/// ceiling, returning exactly one [`Sample`] per call.
///
/// At most `concurrency` probes are in flight at any moment regardless of
/// batch size; queued calls block on the semaphore until a slot frees.
/// Samples come back in completion order, not submission order. A failed
/// sample never cancels its siblings — the batch always drains.
///
/// Cancelling `cancel` stops admitting new requests immediately: calls that
/// have not yet dispatched are recorded as failed samples with a
/// cancellation error, while in-flight requests finish (or time out) on
/// their own so their latency measurements stay valid.
pub async fn run_batch(
    client: &HttpClient,
    calls: Vec<ProbeCall>,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Vec<Sample> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks: JoinSet<Sample> = JoinSet::new();

    for call in calls {
        let client = client.clone();
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();

        tasks.spawn(async move {
            let _permit = tokio::select! {
                _ = cancel.cancelled() => return Sample::cancelled(),
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return Sample::cancelled(),
                },
            };
            // Re-check after the (possibly long) wait for a slot.
            if cancel.is_cancelled() {
                return Sample::cancelled();
            }
            probe::execute(&client, &call).await
        });
    }

    let mut samples = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(sample) => samples.push(sample),
            // A panicked worker still owes the batch a sample so the
            // cardinality invariant holds.
            Err(err) => {
                tracing::error!(error = %err, "probe task failed");
                samples.push(Sample {
                    elapsed: std::time::Duration::ZERO,
                    status: 0,
                    success: false,
                    error: Some(format!("probe task failed: {err}")),
                    body: None,
                });
            }
        }
    }
    samples
}
