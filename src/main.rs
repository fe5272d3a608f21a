use anyhow::bail;
use anyhow::Context;
use clap::Parser;
use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use grille_crack::queue::create_portion_queue;
use grille_crack::queue::PortionQueue;
use grille_crack::queue::QueueKind;
use grille_crack::turning_grille::Grille;
use grille_crack::turning_grille::TurningGrilleCrackerImplDetails;
use grille_crack::turning_grille::TurningGrilleCrackerProducerConsumer;
use grille_crack::turning_grille::TurningGrilleCrackerSerial;
use grille_crack::turning_grille::TurningGrilleCrackerSyncless;
use grille_crack::turning_grille::WordsTrie;
use grille_crack::turning_grille::NOT_CAPITAL_ENGLISH_LETTERS_RE;
use grille_crack::CrackerConfig;
use grille_crack::CrackerError;
use grille_crack::TurningGrilleCracker;

use std::collections::BTreeSet;
use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::thread::available_parallelism;
use std::thread::JoinHandle;
use std::time::Duration;

// Exit code for a lost or duplicated work item, as opposed to an ordinary
// failure such as not finding the expected clear text.
const INTERNAL_CONSISTENCY_EXIT_CODE: u8 = 2;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    /// Single thread over the whole ordinal space.
    Serial,
    /// One worker per CPU, each owning a disjoint interval; no queue.
    Syncless,
    /// Producers and an adaptive consumer pool over the hybrid
    /// mostly-non-blocking queue.
    Concurrent,
    /// Same, over the mutex-and-condvar textbook queue.
    Textbook,
    /// Same, over the parking_lot variant of the textbook queue.
    TextbookPl,
    /// Same, over the sentinel-based blocking queue.
    Blocking,
}

#[derive(Parser, Debug)]
#[command(about = "Brute-forces a turning-grille transposition cipher against a dictionary")]
struct Args {
    /// Work-distribution strategy.
    #[arg(value_enum, default_value_t = Strategy::Syncless)]
    strategy: Strategy,

    /// File whose first line is the ciphertext.
    #[arg(long, default_value = "encrypted_msg.txt")]
    cipher_text: PathBuf,

    /// File whose first line is the expected clear text, for verification.
    #[arg(long, default_value = "decrypted_msg.txt")]
    clear_text: PathBuf,

    /// Dictionary used to score candidate decryptions.
    #[arg(long, default_value = "3000words.txt")]
    words: PathBuf,

    /// Log milestone progress and candidate hits.
    #[arg(short, long)]
    verbose: bool,

    /// Spin all CPUs for this long before the run, to stabilize
    /// throughput measurements on machines with frequency scaling.
    #[arg(long, default_value_t = 0)]
    warm_up_secs: u64,
}

fn read_first_line(path: &Path) -> anyhow::Result<String> {
    let contents: String =
        read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    match contents.lines().next() {
        Some(line) => Ok(line.to_string()),
        None => bail!("{} is empty", path.display()),
    }
}

fn heat_cpu(duration: Duration) {
    let cpu_count: usize = available_parallelism().unwrap().get();
    let stop: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));

    let mut worker_threads: Vec<JoinHandle<()>> = Vec::with_capacity(cpu_count);
    for _ in 0..cpu_count {
        let stop = stop.clone();
        worker_threads.push(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {}
        }));
    }

    thread::sleep(duration);
    stop.store(true, Ordering::Relaxed);

    for worker_thread in worker_threads {
        worker_thread.join().unwrap();
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let cipher_text: String = read_first_line(&args.cipher_text)?;
    let clear_text: String = read_first_line(&args.clear_text)?.to_uppercase();
    let clear_text: String = NOT_CAPITAL_ENGLISH_LETTERS_RE
        .replace_all(&clear_text, "")
        .to_string();

    let words_trie: Arc<WordsTrie> = Arc::new(WordsTrie::load(&args.words)?);

    let cpu_count: usize = available_parallelism()?.get();
    let impl_details: Box<dyn TurningGrilleCrackerImplDetails> = match args.strategy {
        Strategy::Serial => Box::new(TurningGrilleCrackerSerial::new()),
        Strategy::Syncless => Box::new(TurningGrilleCrackerSyncless::new()),
        Strategy::Concurrent | Strategy::Textbook | Strategy::TextbookPl | Strategy::Blocking => {
            let queue_kind: QueueKind = match args.strategy {
                Strategy::Concurrent => QueueKind::MostlyNonBlocking,
                Strategy::Textbook => QueueKind::Textbook,
                Strategy::TextbookPl => QueueKind::TextbookParkingLot,
                _ => QueueKind::Blocking,
            };

            let initial_consumer_count: usize = cpu_count * 3;
            let producer_count: usize = cpu_count;
            let portion_queue: Arc<dyn PortionQueue<Grille>> =
                create_portion_queue(queue_kind, initial_consumer_count, producer_count);
            Box::new(TurningGrilleCrackerProducerConsumer::new(
                initial_consumer_count,
                producer_count,
                portion_queue,
            ))
        }
    };

    let config: CrackerConfig = CrackerConfig {
        verbose: args.verbose,
        ..CrackerConfig::default()
    };
    let cracker: Arc<TurningGrilleCracker> =
        Arc::new(TurningGrilleCracker::new(&cipher_text, words_trie, config, impl_details)?);

    if args.warm_up_secs > 0 {
        heat_cpu(Duration::from_secs(args.warm_up_secs));
    }

    let candidates: BTreeSet<String> = cracker.brute_force()?;

    if !candidates.contains(&clear_text) {
        bail!("the correct clear text was not found among the decrypted candidates");
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{:#}", error);
            match error.downcast_ref::<CrackerError>() {
                Some(CrackerError::GrilleCountMismatch { .. }) => {
                    ExitCode::from(INTERNAL_CONSISTENCY_EXIT_CODE)
                }
                _ => ExitCode::FAILURE,
            }
        }
    }
}
