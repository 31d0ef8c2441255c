use std::future::Future;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Execute one group of independent work items concurrently.
///
/// # Arguments
///
/// * `items` - Work items of this group, in submission order
/// * `max_concurrency` - Maximum number of items running at once
/// * `executor_fn` - Async function executing a single item
///
/// # Returns
///
/// One outcome per item, in the order the items were given regardless of
/// completion order. Each item runs on its own task, so a panicking item
/// surfaces as a `JoinError` without disturbing its siblings.
pub async fn execute_group_parallel<T, R, F, Fut>(
    items: Vec<T>,
    max_concurrency: usize,
    executor_fn: F,
) -> Vec<Result<R, JoinError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let total = items.len();
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for (index, item) in items.into_iter().enumerate() {
        let sem = sem.clone();
        let executor = executor_fn.clone();

        let handle = tokio::spawn(async move {
            // The semaphore is never closed, so this only fails if that changes.
            let _permit = sem.acquire_owned().await.ok();
            executor(item).await
        });

        futs.push(async move { (index, handle.await) });
    }

    let mut slots: Vec<Option<Result<R, JoinError>>> = (0..total).map(|_| None).collect();

    while let Some((index, outcome)) = futs.next().await {
        slots[index] = Some(outcome);
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn results_follow_submission_order() {
        let delays = vec![30u64, 5, 15];
        let out = execute_group_parallel(delays.clone(), 3, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        })
        .await;
        let values: Vec<u64> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, delays);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let out = execute_group_parallel((0..8).collect::<Vec<_>>(), 2, {
            let running = running.clone();
            let peak = peak.clone();
            move |_i: i32| {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                }
            }
        })
        .await;

        assert_eq!(out.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn panic_is_isolated_to_its_item() {
        let out = execute_group_parallel(vec![1, 2, 3], 3, |i: i32| async move {
            if i == 2 {
                panic!("boom");
            }
            i * 10
        })
        .await;

        assert_eq!(out.len(), 3);
        assert_eq!(*out[0].as_ref().unwrap(), 10);
        assert!(out[1].as_ref().unwrap_err().is_panic());
        assert_eq!(*out[2].as_ref().unwrap(), 30);
    }
}
