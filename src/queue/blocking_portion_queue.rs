use super::PortionQueue;

use crossbeam::channel;
use crossbeam::channel::Receiver;
use crossbeam::channel::Sender;
use std::thread;
use std::time::Duration;

/// Plain blocking backend: a bounded channel of `Option<E>`. Shutdown
/// enqueues one `None` sentinel per consumer, so each blocked or future
/// retriever unblocks exactly once.
pub struct BlockingPortionQueue<E> {
    max_size: usize,
    sender: Sender<Option<E>>,
    receiver: Receiver<Option<E>>,
}

impl<E> BlockingPortionQueue<E> {
    pub fn new(max_size: usize) -> Self {
        let (sender, receiver) = channel::bounded::<Option<E>>(max_size);
        Self {
            max_size,
            sender,
            receiver,
        }
    }
}

impl<E: Send + Sync> PortionQueue<E> for BlockingPortionQueue<E> {
    fn add_portion(&self, portion: E) {
        // Both channel ends live as long as self, so a send cannot fail.
        self.sender.send(Some(portion)).unwrap();
    }

    fn retrieve_portion(&self) -> Option<E> {
        self.receiver.recv().unwrap()
    }

    fn ensure_all_portions_are_retrieved(&self) {
        while !self.receiver.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn stop_consumers(&self, final_consumer_count: usize) {
        for _ in 0..final_consumer_count {
            self.sender.send(None).unwrap();
        }
    }

    fn size(&self) -> usize {
        self.receiver.len()
    }

    fn max_size(&self) -> usize {
        self.max_size
    }
}
