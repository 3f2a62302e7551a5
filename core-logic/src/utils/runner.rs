use crate::traits::{RunStats, Task};
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

pub struct WorkerRunner;

impl WorkerRunner {
    /// Runs `task` over every item with at most `workers` items in flight,
    /// and stops taking new items on Ctrl+C.
    pub async fn run_with_shutdown<I, T>(task: Arc<T>, items: Vec<I>, workers: NonZeroUsize) -> RunStats
    where
        I: Send + 'static,
        T: Task<I> + 'static,
    {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        let listener = tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("🛑 Received Ctrl+C. Stopping workers...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        let stats = Self::run(task, items, workers, token).await;
        listener.abort();
        stats
    }

    /// Spawns a fixed pool of `workers` tasks draining a shared queue.
    ///
    /// Every item is taken by exactly one worker. Returns once the queue is
    /// empty and all workers have finished. Cancellation also abandons the
    /// items in flight; those count as skipped.
    pub async fn run<I, T>(
        task: Arc<T>,
        items: Vec<I>,
        workers: NonZeroUsize,
        token: CancellationToken,
    ) -> RunStats
    where
        I: Send + 'static,
        T: Task<I> + 'static,
    {
        let total = items.len();
        let queue = Arc::new(Mutex::new(items.into_iter().collect::<VecDeque<I>>()));
        let pool_size = workers.get().min(total.max(1));

        let start_time = std::time::Instant::now();
        info!("Starting {} workers for {} items ({})", pool_size, total, task.name());

        let mut set = JoinSet::new();
        for i in 0..pool_size {
            let id = i + 1;
            let span = tracing::info_span!("worker", worker_id = format!("{:03}", id));
            let queue = Arc::clone(&queue);
            let task = Arc::clone(&task);
            let token = token.clone();

            set.spawn(
                async move {
                    let mut done = 0u64;
                    let mut abandoned = 0u64;
                    while !token.is_cancelled() {
                        let next = match queue.lock() {
                            Ok(mut guard) => guard.pop_front(),
                            Err(poisoned) => poisoned.into_inner().pop_front(),
                        };
                        let Some(item) = next else { break };

                        tokio::select! {
                            _ = task.run(item) => done += 1,
                            _ = token.cancelled() => abandoned += 1,
                        }
                    }
                    (done, abandoned)
                }
                .instrument(span),
            );
        }

        let mut stats = RunStats::default();
        let mut abandoned = 0u64;
        while let Some(res) = set.join_next().await {
            match res {
                Ok((done, dropped)) => {
                    stats.completed += done;
                    abandoned += dropped;
                }
                Err(e) => {
                    stats.panicked += 1;
                    error!("A worker task panicked or failed to join: {:?}", e);
                }
            }
        }

        stats.skipped = abandoned
            + match queue.lock() {
                Ok(guard) => guard.len() as u64,
                Err(poisoned) => poisoned.into_inner().len() as u64,
            };
        if stats.skipped > 0 {
            warn!("{} items were not processed", stats.skipped);
        }

        info!(
            "Total Time: {:.1}s | Processed: {} | Skipped: {}",
            start_time.elapsed().as_secs_f64(),
            stats.completed,
            stats.skipped
        );

        stats
    }
}
