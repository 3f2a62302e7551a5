use async_trait::async_trait;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    /// Items handed to the task and run to completion.
    pub completed: u64,
    /// Items never started or abandoned mid-run after cancellation.
    pub skipped: u64,
    /// Worker tasks that panicked.
    pub panicked: u64,
}

/// A unit of work run once per queued item.
///
/// Implementations absorb their own failures; the runner only sees
/// completion.
#[async_trait]
pub trait Task<Item>: Send + Sync {
    /// Returns the name of the task
    fn name(&self) -> &str;

    /// Processes one item
    async fn run(&self, item: Item);
}
