use super::PortionQueue;

use std::collections::VecDeque;
use std::sync::Condvar;
use std::sync::Mutex;

struct Buffer<E> {
    queue: VecDeque<E>,
    work_done: bool,
}

impl<E> Buffer<E> {
    fn new(max_size: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(max_size),
            work_done: false,
        }
    }
}

/// Textbook backend: one mutex, two condition variables. The `work_done`
/// flag is re-tested under the lock on every wake to tell spurious wakeups
/// from real shutdown.
pub struct TextbookPortionQueue<E> {
    max_size: usize,

    mutex: Mutex<Buffer<E>>,
    not_empty_condition: Condvar,
    not_full_condition: Condvar,
}

impl<E> TextbookPortionQueue<E> {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            mutex: Mutex::new(Buffer::new(max_size)),
            not_empty_condition: Condvar::new(),
            not_full_condition: Condvar::new(),
        }
    }
}

impl<E: Send + Sync> PortionQueue<E> for TextbookPortionQueue<E> {
    fn add_portion(&self, portion: E) {
        let mut buffer = self.mutex.lock().unwrap();

        while buffer.queue.len() >= self.max_size {
            buffer = self.not_full_condition.wait(buffer).unwrap();
        }

        buffer.queue.push_back(portion);

        self.not_empty_condition.notify_one();
    }

    fn retrieve_portion(&self) -> Option<E> {
        let mut buffer = self.mutex.lock().unwrap();

        while buffer.queue.is_empty() {
            if buffer.work_done {
                return None;
            }
            buffer = self.not_empty_condition.wait(buffer).unwrap();
        }

        let portion: Option<E> = buffer.queue.pop_front();

        self.not_full_condition.notify_one();

        portion
    }

    fn ensure_all_portions_are_retrieved(&self) {
        let mut buffer = self.mutex.lock().unwrap();

        while !buffer.queue.is_empty() {
            buffer = self.not_full_condition.wait(buffer).unwrap();
        }
    }

    fn stop_consumers(&self, _final_consumer_count: usize) {
        let mut buffer = self.mutex.lock().unwrap();

        buffer.work_done = true;

        self.not_empty_condition.notify_all();
    }

    fn size(&self) -> usize {
        let buffer = self.mutex.lock().unwrap();
        buffer.queue.len()
    }

    fn max_size(&self) -> usize {
        self.max_size
    }
}

/// Same bookkeeping as `TextbookPortionQueue` on `parking_lot` primitives;
/// kept to compare fairness and throughput, not for distinct semantics.
pub struct ParkingLotPortionQueue<E> {
    max_size: usize,

    mutex: parking_lot::Mutex<Buffer<E>>,
    not_empty_condition: parking_lot::Condvar,
    not_full_condition: parking_lot::Condvar,
}

impl<E> ParkingLotPortionQueue<E> {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            mutex: parking_lot::Mutex::new(Buffer::new(max_size)),
            not_empty_condition: parking_lot::Condvar::new(),
            not_full_condition: parking_lot::Condvar::new(),
        }
    }
}

impl<E: Send + Sync> PortionQueue<E> for ParkingLotPortionQueue<E> {
    fn add_portion(&self, portion: E) {
        let mut buffer = self.mutex.lock();

        while buffer.queue.len() >= self.max_size {
            self.not_full_condition.wait(&mut buffer);
        }

        buffer.queue.push_back(portion);

        self.not_empty_condition.notify_one();
    }

    fn retrieve_portion(&self) -> Option<E> {
        let mut buffer = self.mutex.lock();

        while buffer.queue.is_empty() {
            if buffer.work_done {
                return None;
            }
            self.not_empty_condition.wait(&mut buffer);
        }

        let portion: Option<E> = buffer.queue.pop_front();

        self.not_full_condition.notify_one();

        portion
    }

    fn ensure_all_portions_are_retrieved(&self) {
        let mut buffer = self.mutex.lock();

        while !buffer.queue.is_empty() {
            self.not_full_condition.wait(&mut buffer);
        }
    }

    fn stop_consumers(&self, _final_consumer_count: usize) {
        let mut buffer = self.mutex.lock();

        buffer.work_done = true;

        self.not_empty_condition.notify_all();
    }

    fn size(&self) -> usize {
        let buffer = self.mutex.lock();
        buffer.queue.len()
    }

    fn max_size(&self) -> usize {
        self.max_size
    }
}
