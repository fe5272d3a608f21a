mod blocking_portion_queue;
mod mostly_non_blocking_portion_queue;
mod textbook_portion_queue;

pub use blocking_portion_queue::BlockingPortionQueue;
pub use mostly_non_blocking_portion_queue::MostlyNonBlockingPortionQueue;
pub use textbook_portion_queue::ParkingLotPortionQueue;
pub use textbook_portion_queue::TextbookPortionQueue;

use std::sync::Arc;

/// Portions buffered per producer/consumer pair; sizes the backpressure
/// threshold of every backend.
const MAX_SIZE_MULTIPLIER: usize = 1000;

/// Bounded MPMC handoff channel between producer and consumer threads.
///
/// Call-order contract: `ensure_all_portions_are_retrieved` is called exactly
/// once, after every producer has finished adding; `stop_consumers` is called
/// exactly once, strictly after that. The queue is not reusable afterwards.
pub trait PortionQueue<E>: Send + Sync {
    /// Blocks while the queue is at capacity.
    fn add_portion(&self, portion: E);

    /// Blocks while the queue is empty; returns `None` only after
    /// `stop_consumers` has run.
    fn retrieve_portion(&self) -> Option<E>;

    /// Blocks the caller until the queue holds no portions. Certifies removal
    /// only, not that retrieved portions have finished processing.
    fn ensure_all_portions_are_retrieved(&self);

    /// Unblocks up to `final_consumer_count` current or future retrievers
    /// with `None`.
    fn stop_consumers(&self, final_consumer_count: usize);

    fn size(&self) -> usize;

    fn max_size(&self) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueKind {
    Blocking,
    Textbook,
    TextbookParkingLot,
    MostlyNonBlocking,
}

pub fn create_portion_queue<E: Send + Sync + 'static>(
    kind: QueueKind,
    initial_consumer_count: usize,
    producer_count: usize,
) -> Arc<dyn PortionQueue<E>> {
    let max_size: usize = initial_consumer_count * producer_count * MAX_SIZE_MULTIPLIER;
    match kind {
        QueueKind::Blocking => Arc::new(BlockingPortionQueue::new(max_size)),
        QueueKind::Textbook => Arc::new(TextbookPortionQueue::new(max_size)),
        QueueKind::TextbookParkingLot => Arc::new(ParkingLotPortionQueue::new(max_size)),
        QueueKind::MostlyNonBlocking => Arc::new(MostlyNonBlockingPortionQueue::new(max_size)),
    }
}
