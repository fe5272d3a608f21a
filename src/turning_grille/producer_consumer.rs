use super::grille::split_into_intervals;
use super::Grille;
use super::GrilleInterval;
use super::TurningGrilleCracker;
use super::TurningGrilleCrackerImplDetails;
use crate::queue::PortionQueue;

use concurrent_queue::ConcurrentQueue;
use std::sync::atomic::AtomicIsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizingAction {
    None,
    Grow,
    Shrink,
}

/// Hill-climbing consumer-pool controller: a local, noisy-feedback optimizer
/// driven by per-milestone throughput. One improvement grows the pool by one
/// consumer; two regressions flip the direction and shrink it by one.
pub struct HillClimb {
    improving: isize,
    growing: bool,
    prev_grilles_per_second: Option<u64>,
    best_grilles_per_second: u64,
    best_consumer_count: usize,
}

impl HillClimb {
    pub fn new() -> Self {
        Self {
            improving: 0,
            growing: true,
            prev_grilles_per_second: None,
            best_grilles_per_second: 0,
            best_consumer_count: 0,
        }
    }

    pub fn on_milestone(&mut self, grilles_per_second: u64, consumer_count: usize) -> SizingAction {
        if grilles_per_second > self.best_grilles_per_second {
            self.best_grilles_per_second = grilles_per_second;
            self.best_consumer_count = consumer_count;
        }

        let prev: Option<u64> = self.prev_grilles_per_second.replace(grilles_per_second);
        let prev: u64 = match prev {
            // The first measurement has nothing to compare against.
            None => return SizingAction::None,
            Some(prev) => prev,
        };

        if grilles_per_second > prev {
            self.improving += 1;
        } else if grilles_per_second < prev {
            self.improving -= 1;
        }

        if self.improving >= 1 {
            self.improving = 0;
            SizingAction::Grow
        } else if self.improving <= -2 {
            self.growing = !self.growing;
            self.improving = 0;
            SizingAction::Shrink
        } else {
            SizingAction::None
        }
    }

    pub fn best_consumer_count(&self) -> usize {
        self.best_consumer_count
    }
}

impl Default for HillClimb {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TurningGrilleCrackerProducerConsumer {
    initial_consumer_count: usize,
    producer_count: usize,
    portion_queue: Arc<dyn PortionQueue<Grille>>,

    consumer_count: AtomicIsize, // May get negative for a short while, so don't make it unsigned.
    consumer_threads: ConcurrentQueue<JoinHandle<()>>,
    shutdown_n_consumers: AtomicIsize, // May get negative for a short while, so don't make it unsigned.

    // Uncontended: only the thread holding the milestone lock touches it.
    hill_climb: Mutex<HillClimb>,
}

impl TurningGrilleCrackerImplDetails for TurningGrilleCrackerProducerConsumer {
    fn brute_force(self: Arc<Self>, cracker: &Arc<TurningGrilleCracker>) {
        let producer_threads: Vec<JoinHandle<()>> = self.start_producer_threads(cracker);
        self.start_initial_consumer_threads(cracker);

        for producer_thread in producer_threads {
            producer_thread.join().unwrap();
        }

        self.portion_queue.ensure_all_portions_are_retrieved();
        // The queue being drained only certifies removal; wait until the
        // retrieved grilles have finished processing too.
        cracker.wait_until_fully_processed();
        cracker.close_milestones();
        self.portion_queue
            .stop_consumers(self.consumer_count.load(Ordering::SeqCst) as usize);

        while let Ok(consumer_thread) = self.consumer_threads.pop() {
            consumer_thread.join().unwrap();
        }
    }

    fn milestone(
        self: Arc<Self>,
        cracker: &Arc<TurningGrilleCracker>,
        grilles_per_second: u64,
    ) -> String {
        let queue_size: usize = self.portion_queue.size();

        if cracker.grille_count_so_far.load(Ordering::SeqCst) < cracker.grille_count {
            let action: SizingAction = self.hill_climb.lock().unwrap().on_milestone(
                grilles_per_second,
                self.consumer_count.load(Ordering::SeqCst) as usize,
            );
            match action {
                SizingAction::Grow => {
                    let _ = self.consumer_threads.push(self.start_consumer_thread(cracker));
                }
                SizingAction::Shrink => {
                    self.shutdown_n_consumers.fetch_add(1, Ordering::SeqCst);
                }
                SizingAction::None => {}
            }
        }

        if cracker.config.verbose {
            format!(
                "consumer threads: {}; queue size: {} / {}",
                self.consumer_count.load(Ordering::SeqCst),
                queue_size,
                self.portion_queue.max_size()
            )
        } else {
            String::new()
        }
    }

    fn milestones_summary(self: Arc<Self>, _cracker: &Arc<TurningGrilleCracker>) -> String {
        format!(
            "best consumer threads: {}",
            self.hill_climb.lock().unwrap().best_consumer_count()
        )
    }
}

impl TurningGrilleCrackerProducerConsumer {
    pub fn new(
        initial_consumer_count: usize,
        producer_count: usize,
        portion_queue: Arc<dyn PortionQueue<Grille>>,
    ) -> Self {
        Self {
            initial_consumer_count,
            producer_count,
            portion_queue,

            consumer_count: AtomicIsize::new(0),
            consumer_threads: ConcurrentQueue::unbounded(),
            shutdown_n_consumers: AtomicIsize::new(0),

            hill_climb: Mutex::new(HillClimb::new()),
        }
    }

    fn start_producer_threads(
        self: &Arc<Self>,
        cracker: &Arc<TurningGrilleCracker>,
    ) -> Vec<JoinHandle<()>> {
        let mut producer_threads: Vec<JoinHandle<()>> = Vec::with_capacity(self.producer_count);

        for (begin, end) in split_into_intervals(cracker.grille_count, self.producer_count) {
            let portion_queue: Arc<dyn PortionQueue<Grille>> = self.portion_queue.clone();
            let mut grille_interval: GrilleInterval =
                GrilleInterval::new(cracker.side_length / 2, begin, end);

            producer_threads.push(thread::spawn(move || {
                // Portions cross a thread boundary, so they must be owned.
                while let Some(grille) = grille_interval.clone_next() {
                    portion_queue.add_portion(grille);
                }
            }));
        }

        producer_threads
    }

    fn start_initial_consumer_threads(self: &Arc<Self>, cracker: &Arc<TurningGrilleCracker>) {
        for _ in 0..self.initial_consumer_count {
            let _ = self.consumer_threads.push(self.start_consumer_thread(cracker));
        }
    }

    fn start_consumer_thread(
        self: &Arc<Self>,
        cracker: &Arc<TurningGrilleCracker>,
    ) -> JoinHandle<()> {
        self.consumer_count.fetch_add(1, Ordering::SeqCst);

        let portion_queue: Arc<dyn PortionQueue<Grille>> = self.portion_queue.clone();
        let cracker: Arc<TurningGrilleCracker> = cracker.clone();
        let this: Arc<Self> = self.clone();
        thread::spawn(move || loop {
            let grille_count_so_far: u64 = match portion_queue.retrieve_portion() {
                None => {
                    this.consumer_count.fetch_sub(1, Ordering::SeqCst);
                    break;
                }
                Some(grille) => cracker.apply_grille(&grille),
            };
            cracker.register_one_applied_grille(grille_count_so_far);

            if this.shutdown_n_consumers.load(Ordering::SeqCst) > 0 {
                if this.shutdown_n_consumers.fetch_sub(1, Ordering::SeqCst) > 0 {
                    // There should be at least one consumer running.
                    if this.consumer_count.fetch_sub(1, Ordering::SeqCst) > 1 {
                        break;
                    }
                    this.consumer_count.fetch_add(1, Ordering::SeqCst);
                } else {
                    this.shutdown_n_consumers.fetch_add(1, Ordering::SeqCst);
                }
            }
        })
    }
}
