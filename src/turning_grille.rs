mod grille;
mod producer_consumer;
mod serial;
mod syncless;
mod words_trie;

pub use grille::split_into_intervals;
pub use grille::Grille;
pub use grille::GrilleInterval;
pub use producer_consumer::HillClimb;
pub use producer_consumer::SizingAction;
pub use producer_consumer::TurningGrilleCrackerProducerConsumer;
pub use serial::TurningGrilleCrackerSerial;
pub use syncless::TurningGrilleCrackerSyncless;
pub use words_trie::WordsTrie;

use regex::Regex;
use std::collections::BTreeSet;
use std::mem;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

pub static NOT_CAPITAL_ENGLISH_LETTERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z]").unwrap());

#[derive(Debug, Error)]
pub enum CrackerError {
    #[error("the ciphertext must contain only English letters")]
    NonAlphabeticCipherText,

    #[error("the ciphertext length must be the square of an even number")]
    InvalidCipherTextLength,

    #[error("the ciphertext is too long: the grille ordinal space does not fit in 64 bits")]
    CipherTextTooLong,

    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A lost or duplicated portion; always a defect in the queue or the
    /// orchestrator, never recoverable.
    #[error("grilles got lost or processed more than once: expected {expected}, processed {processed}")]
    GrilleCountMismatch { expected: u64, processed: u64 },
}

#[derive(Clone, Copy, Debug)]
pub struct CrackerConfig {
    pub verbose: bool,
    pub min_detected_word_count: usize,
}

impl Default for CrackerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            min_detected_word_count: 17, // Determined by gut feeling.
        }
    }
}

/// One brute-force strategy. `milestone` is only ever called by the single
/// thread holding the cracker's milestone lock.
pub trait TurningGrilleCrackerImplDetails: Send + Sync {
    fn brute_force(self: Arc<Self>, cracker: &Arc<TurningGrilleCracker>);

    fn milestone(
        self: Arc<Self>,
        _cracker: &Arc<TurningGrilleCracker>,
        _grilles_per_second: u64,
    ) -> String {
        String::new()
    }

    fn milestones_summary(self: Arc<Self>, _cracker: &Arc<TurningGrilleCracker>) -> String {
        String::new()
    }
}

struct MilestoneReport {
    grille_count_at_milestone_start: u64,
    start: Instant,
    milestone_start: Instant,
    best_grilles_per_second: u64,
}

struct FullyProcessed {
    mutex: Mutex<bool>,
    condition: Condvar,
}

pub struct TurningGrilleCracker {
    config: CrackerConfig,

    side_length: usize,
    grille_count: u64,
    milestone_interval: u64,
    grille_count_so_far: AtomicU64,
    milestones_closed: AtomicBool,

    cipher_text: Vec<char>,
    words_trie: Arc<WordsTrie>,
    candidates: Mutex<BTreeSet<String>>,

    milestone_report: Mutex<MilestoneReport>,
    fully_processed: FullyProcessed,

    impl_details: Arc<dyn TurningGrilleCrackerImplDetails>,
}

impl TurningGrilleCracker {
    pub fn new(
        cipher_text: &str,
        words_trie: Arc<WordsTrie>,
        config: CrackerConfig,
        impl_details: Box<dyn TurningGrilleCrackerImplDetails>,
    ) -> Result<Self, CrackerError> {
        let cipher_text: String = cipher_text.to_uppercase();
        if NOT_CAPITAL_ENGLISH_LETTERS_RE.is_match(&cipher_text) {
            return Err(CrackerError::NonAlphabeticCipherText);
        }
        let cipher_text: Vec<char> = cipher_text.chars().collect();

        let side_length: usize = (cipher_text.len() as f64).sqrt() as usize;
        if side_length == 0
            || side_length % 2 != 0
            || side_length * side_length != cipher_text.len()
        {
            return Err(CrackerError::InvalidCipherTextLength);
        }

        let mut grille_count: u64 = 1;
        for _ in 0..(side_length * side_length / 4) {
            grille_count = grille_count
                .checked_mul(4)
                .ok_or(CrackerError::CipherTextTooLong)?;
        }

        Ok(Self {
            config,
            side_length,
            grille_count,
            // A milestone every 0.1%, but at least every grille.
            milestone_interval: (grille_count / 1000).max(1),
            grille_count_so_far: AtomicU64::new(0),
            milestones_closed: AtomicBool::new(false),
            cipher_text,
            words_trie,
            candidates: Mutex::new(BTreeSet::new()),
            milestone_report: Mutex::new(MilestoneReport {
                grille_count_at_milestone_start: 0,
                start: Instant::now(),
                milestone_start: Instant::now(),
                best_grilles_per_second: 0,
            }),
            fully_processed: FullyProcessed {
                mutex: Mutex::new(false),
                condition: Condvar::new(),
            },
            impl_details: Arc::from(impl_details),
        })
    }

    pub fn side_length(&self) -> usize {
        self.side_length
    }

    pub fn grille_count(&self) -> u64 {
        self.grille_count
    }

    pub fn brute_force(self: &Arc<Self>) -> Result<BTreeSet<String>, CrackerError> {
        {
            let mut report = self.milestone_report.lock().unwrap();
            report.start = Instant::now();
            report.milestone_start = report.start;
        }

        self.impl_details.clone().brute_force(self);

        {
            let report = self.milestone_report.lock().unwrap();
            let elapsed_ns: u128 = report.start.elapsed().as_nanos().max(1);
            let grilles_per_second: u64 =
                ((self.grille_count as u128 * Duration::from_secs(1).as_nanos()) / elapsed_ns)
                    as u64;

            let mut line: String = format!(
                "average speed: {} grilles/s; best speed: {} grilles/s",
                grilles_per_second, report.best_grilles_per_second
            );
            let summary: String = self.impl_details.clone().milestones_summary(self);
            if !summary.is_empty() {
                line.push_str("; ");
                line.push_str(&summary);
            }
            info!("{}", line);
        }

        let processed: u64 = self.grille_count_so_far.load(Ordering::SeqCst);
        if processed != self.grille_count {
            return Err(CrackerError::GrilleCountMismatch {
                expected: self.grille_count,
                processed,
            });
        }

        Ok(mem::take(&mut *self.candidates.lock().unwrap()))
    }

    /// Decrypts under all 4 rotations, scores the candidate and its reverse,
    /// and counts the grille as processed. Returns the new processed count.
    fn apply_grille(self: &Arc<Self>, grille: &Grille) -> u64 {
        let cipher_text_length: usize = self.cipher_text.len();

        let mut candidate: String = String::with_capacity(cipher_text_length);
        for rotation in 0..4 {
            for y in 0..self.side_length {
                for x in 0..self.side_length {
                    if grille.is_hole(x, y, rotation) {
                        candidate.push(self.cipher_text[y * self.side_length + x]);
                    }
                }
            }
        }

        self.find_words_and_report(&candidate);
        let candidate_reversed: String = candidate.chars().rev().collect();
        self.find_words_and_report(&candidate_reversed);

        let grille_count_so_far: u64 = self.grille_count_so_far.fetch_add(1, Ordering::SeqCst) + 1;
        if grille_count_so_far == self.grille_count {
            let mut done = self.fully_processed.mutex.lock().unwrap();
            *done = true;
            self.fully_processed.condition.notify_all();
        }
        grille_count_so_far
    }

    fn register_one_applied_grille(self: &Arc<Self>, grille_count_so_far: u64) {
        if grille_count_so_far % self.milestone_interval != 0 {
            return;
        }
        let milestone_end: Instant = Instant::now();

        // Stragglers skip the milestone instead of blocking on it.
        if let Ok(mut report) = self.milestone_report.try_lock() {
            if self.milestones_closed.load(Ordering::SeqCst) {
                return;
            }

            let elapsed_ns: u128 = milestone_end.duration_since(report.milestone_start).as_nanos();
            if elapsed_ns > 0 {
                let grille_count_for_milestone: u64 =
                    grille_count_so_far - report.grille_count_at_milestone_start;
                let grilles_per_second: u64 = (grille_count_for_milestone as u128
                    * Duration::from_secs(1).as_nanos()
                    / elapsed_ns) as u64;
                if grilles_per_second > report.best_grilles_per_second {
                    report.best_grilles_per_second = grilles_per_second;
                }

                let milestone_status: String =
                    self.impl_details.clone().milestone(self, grilles_per_second);

                if self.config.verbose {
                    let done: f32 =
                        grille_count_so_far as f32 * 100.0 / self.grille_count as f32;

                    let mut line: String = format!(
                        "{:.1}% done; current speed: {} grilles/s; best speed so far: {} grilles/s",
                        done, grilles_per_second, report.best_grilles_per_second
                    );
                    if !milestone_status.is_empty() {
                        line.push_str("; ");
                        line.push_str(&milestone_status);
                    }
                    info!("{}", line);
                }

                report.milestone_start = milestone_end;
                report.grille_count_at_milestone_start = grille_count_so_far;
            }
        }
    }

    /// Blocks until every grille has finished processing, not merely left the
    /// queue. Also guarantees that no further sizing decisions are pending,
    /// since milestones only fire from processing.
    fn wait_until_fully_processed(&self) {
        let mut done = self.fully_processed.mutex.lock().unwrap();
        while !*done {
            done = self.fully_processed.condition.wait(done).unwrap();
        }
    }

    /// Forbids further milestone work. Acquiring the milestone lock here
    /// waits out a milestone that was already past the flag check, so no
    /// consumer can be spawned or shut down once this returns.
    fn close_milestones(&self) {
        self.milestones_closed.store(true, Ordering::SeqCst);
        drop(self.milestone_report.lock().unwrap());
    }

    fn find_words_and_report(&self, candidate: &str) {
        let words_found: usize = self.words_trie.count_words(candidate);
        if words_found >= self.config.min_detected_word_count {
            if self.config.verbose {
                info!("{}: {}", words_found, candidate);
            }
            self.candidates.lock().unwrap().insert(candidate.to_string());
        }
    }
}
