//! Bounded worker pool for per-item jobs.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::cancel::CancellationToken;

/// Runs `job` once per input with at most `concurrency` jobs in flight
///
/// A permit is taken before each spawn, so cancellation stops dispatching new
/// jobs while those already running finish. Results come back in completion
/// order; a panicked job is logged and dropped.
pub async fn run_bounded<I, T, F, Fut>(
    inputs: Vec<I>,
    concurrency: usize,
    cancel: &CancellationToken,
    job: F,
) -> Vec<T>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let job = Arc::new(job);
    let mut join_set = JoinSet::new();

    for input in inputs {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        if cancel.is_cancelled() {
            tracing::info!("Cancellation requested, no further jobs dispatched");
            break;
        }

        let job = job.clone();
        join_set.spawn(async move {
            let _permit = permit;
            job(input).await
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!(error = %e, "Task join error"),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_every_job() {
        let mut results = run_bounded((1..=20).collect(), 4, &CancellationToken::new(), |n: u32| async move {
            n * 2
        })
        .await;
        results.sort();

        assert_eq!(results, (1..=20).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (running.clone(), peak.clone());
        run_bounded((0..16).collect(), 3, &CancellationToken::new(), move |_: u32| {
            let (running, peak) = (r.clone(), p.clone());
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_cancelled_token_dispatches_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = run_bounded(vec![1, 2, 3], 2, &cancel, |n: u32| async move { n }).await;

        assert!(results.is_empty());
    }
}
