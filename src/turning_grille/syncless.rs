use super::grille::split_into_intervals;
use super::Grille;
use super::GrilleInterval;
use super::TurningGrilleCracker;
use super::TurningGrilleCrackerImplDetails;

use std::fmt::Write;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::available_parallelism;
use std::thread::JoinHandle;

/// Perfect parallelism: no queue, no dynamic sizing. Each worker owns one
/// disjoint interval end-to-end and runs the borrowed, allocation-free
/// `get_next` in a tight loop. Viable because the cost per grille is
/// uniform, so nothing needs rebalancing.
pub struct TurningGrilleCrackerSyncless {
    workers_count: AtomicUsize,

    // Progress counters are owned by their worker and only read here for
    // display; the race is benign.
    intervals_completion: Mutex<Vec<(Arc<AtomicU64>, u64)>>,
}

impl TurningGrilleCrackerImplDetails for TurningGrilleCrackerSyncless {
    fn brute_force(self: Arc<Self>, cracker: &Arc<TurningGrilleCracker>) {
        let cpu_count: usize = available_parallelism().unwrap().get();

        let worker_threads: Vec<JoinHandle<()>> = self.start_worker_threads(cracker, cpu_count);

        for worker_thread in worker_threads {
            worker_thread.join().unwrap();
        }
    }

    fn milestone(
        self: Arc<Self>,
        cracker: &Arc<TurningGrilleCracker>,
        _grilles_per_second: u64,
    ) -> String {
        if !cracker.config.verbose {
            return String::new();
        }

        let mut ret: String = format!(
            "worker threads: {}; completion per thread: ",
            self.workers_count.load(Ordering::SeqCst)
        );

        let intervals_completion = self.intervals_completion.lock().unwrap();
        for (i, (processed, total)) in intervals_completion.iter().enumerate() {
            if i > 0 {
                ret.push('/');
            }
            let completion: f32 =
                processed.load(Ordering::SeqCst) as f32 * 100.0 / *total as f32;
            let _ = write!(ret, "{:.1}", completion);
        }
        ret.push_str("% done");

        ret
    }
}

impl TurningGrilleCrackerSyncless {
    pub fn new() -> Self {
        Self {
            workers_count: AtomicUsize::new(0),
            intervals_completion: Mutex::new(Vec::new()),
        }
    }

    fn start_worker_threads(
        self: &Arc<Self>,
        cracker: &Arc<TurningGrilleCracker>,
        worker_count: usize,
    ) -> Vec<JoinHandle<()>> {
        let mut worker_threads: Vec<JoinHandle<()>> = Vec::with_capacity(worker_count);

        let mut intervals_completion = self.intervals_completion.lock().unwrap();
        intervals_completion.reserve_exact(worker_count);

        for (begin, end) in split_into_intervals(cracker.grille_count, worker_count) {
            self.workers_count.fetch_add(1, Ordering::SeqCst);

            let mut grille_interval: GrilleInterval =
                GrilleInterval::new(cracker.side_length / 2, begin, end);

            let processed_grilles_count: Arc<AtomicU64> = Arc::new(AtomicU64::new(0));
            intervals_completion.push((processed_grilles_count.clone(), end - begin));

            let cracker: Arc<TurningGrilleCracker> = cracker.clone();
            let this: Arc<Self> = self.clone();
            worker_threads.push(thread::spawn(move || {
                loop {
                    let grille: Option<&Grille> = grille_interval.get_next();
                    let grille_count_so_far: u64 = match grille {
                        None => break,
                        Some(grille) => cracker.apply_grille(grille),
                    };
                    cracker.register_one_applied_grille(grille_count_so_far);

                    processed_grilles_count.fetch_add(1, Ordering::SeqCst);
                }
                this.workers_count.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        worker_threads
    }
}

impl Default for TurningGrilleCrackerSyncless {
    fn default() -> Self {
        Self::new()
    }
}
