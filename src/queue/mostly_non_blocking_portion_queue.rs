use super::PortionQueue;

use concurrent_queue::ConcurrentQueue;
use crossbeam::utils::CachePadded;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Condvar;
use std::sync::Mutex;

struct Occupancy {
    size: AtomicUsize,
    max_size: usize,
}

struct Monitor<O> {
    mutex: Mutex<O>,
    condition: Condvar,
}

impl<O> Monitor<O> {
    fn new(value: O) -> Self {
        Self {
            mutex: Mutex::new(value),
            condition: Condvar::new(),
        }
    }
}

/// Hybrid backend: a lock-free queue carries the data; the monitors are
/// touched only when a thread must actually wait. The `*_is_waiting` flags
/// let the waking side skip the lock and notify entirely on the common,
/// non-blocking path.
pub struct MostlyNonBlockingPortionQueue<E> {
    occupancy: CachePadded<Occupancy>,

    not_full: CachePadded<Monitor<()>>,
    // The mutex value is the workDone flag.
    not_empty: CachePadded<Monitor<bool>>,
    empty: CachePadded<Monitor<()>>,

    a_producer_is_waiting: CachePadded<AtomicBool>,
    a_consumer_is_waiting: CachePadded<AtomicBool>,

    non_blocking_queue: CachePadded<ConcurrentQueue<E>>,
}

impl<E> MostlyNonBlockingPortionQueue<E> {
    pub fn new(max_size: usize) -> Self {
        Self {
            occupancy: CachePadded::new(Occupancy {
                size: AtomicUsize::new(0),
                max_size,
            }),
            not_full: CachePadded::new(Monitor::new(())),
            not_empty: CachePadded::new(Monitor::new(false)),
            empty: CachePadded::new(Monitor::new(())),
            a_producer_is_waiting: CachePadded::new(AtomicBool::new(false)),
            a_consumer_is_waiting: CachePadded::new(AtomicBool::new(false)),
            non_blocking_queue: CachePadded::new(ConcurrentQueue::bounded(max_size)),
        }
    }
}

impl<E: Send + Sync> PortionQueue<E> for MostlyNonBlockingPortionQueue<E> {
    fn add_portion(&self, portion: E) {
        let mut portion = portion;

        loop {
            if self.occupancy.size.load(Ordering::Acquire) >= self.occupancy.max_size {
                let mut lock = self.not_full.mutex.lock().unwrap();
                while self.occupancy.size.load(Ordering::Acquire) >= self.occupancy.max_size {
                    self.a_producer_is_waiting.store(true, Ordering::Release);
                    lock = self.not_full.condition.wait(lock).unwrap();
                }
            }

            match self.non_blocking_queue.push(portion) {
                Ok(()) => break,
                Err(error) => portion = error.into_inner(),
            }
        }
        self.occupancy.size.fetch_add(1, Ordering::Release);

        if self
            .a_consumer_is_waiting
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            let _lock = self.not_empty.mutex.lock().unwrap();
            self.not_empty.condition.notify_all();
        }
    }

    fn retrieve_portion(&self) -> Option<E> {
        let mut portion: Option<E> = self.non_blocking_queue.pop().ok();

        if portion.is_none() {
            let mut work_done = self.not_empty.mutex.lock().unwrap();
            loop {
                if *work_done {
                    return None;
                }

                portion = self.non_blocking_queue.pop().ok();
                if portion.is_some() {
                    break;
                }

                self.a_consumer_is_waiting.store(true, Ordering::Release);
                work_done = self.not_empty.condition.wait(work_done).unwrap();
            }
        }

        let new_size: usize = self.occupancy.size.fetch_sub(1, Ordering::AcqRel) - 1;

        if self
            .a_producer_is_waiting
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            let _lock = self.not_full.mutex.lock().unwrap();
            self.not_full.condition.notify_all();
        }

        if new_size == 0 {
            let _lock = self.empty.mutex.lock().unwrap();
            self.empty.condition.notify_one();
        }

        portion
    }

    fn ensure_all_portions_are_retrieved(&self) {
        // Wake any consumers that missed a notification on the fast path.
        {
            let _lock = self.not_empty.mutex.lock().unwrap();
            self.not_empty.condition.notify_all();
        }

        {
            let mut lock = self.empty.mutex.lock().unwrap();
            while self.occupancy.size.load(Ordering::Acquire) > 0 {
                lock = self.empty.condition.wait(lock).unwrap();
            }
        }
    }

    fn stop_consumers(&self, _final_consumer_count: usize) {
        let mut work_done = self.not_empty.mutex.lock().unwrap();
        *work_done = true;
        self.not_empty.condition.notify_all();
    }

    fn size(&self) -> usize {
        self.occupancy.size.load(Ordering::Relaxed)
    }

    fn max_size(&self) -> usize {
        self.occupancy.max_size
    }
}
