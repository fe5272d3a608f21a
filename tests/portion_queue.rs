use grille_crack::queue::create_portion_queue;
use grille_crack::queue::BlockingPortionQueue;
use grille_crack::queue::MostlyNonBlockingPortionQueue;
use grille_crack::queue::ParkingLotPortionQueue;
use grille_crack::queue::PortionQueue;
use grille_crack::queue::QueueKind;
use grille_crack::queue::TextbookPortionQueue;

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;

fn all_backends(max_size: usize) -> Vec<(&'static str, Arc<dyn PortionQueue<u64>>)> {
    vec![
        ("blocking", Arc::new(BlockingPortionQueue::new(max_size))),
        ("textbook", Arc::new(TextbookPortionQueue::new(max_size))),
        ("parking_lot", Arc::new(ParkingLotPortionQueue::new(max_size))),
        (
            "mostly_non_blocking",
            Arc::new(MostlyNonBlockingPortionQueue::new(max_size)),
        ),
    ]
}

/// Runs producers and consumers concurrently through the full shutdown
/// handshake and returns everything the consumers retrieved.
fn round_trip(
    queue: Arc<dyn PortionQueue<u64>>,
    producer_count: usize,
    consumer_count: usize,
    items_per_producer: u64,
) -> Vec<u64> {
    let retrieved: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));

    let mut producer_threads: Vec<JoinHandle<()>> = Vec::new();
    for p in 0..producer_count {
        let queue = queue.clone();
        producer_threads.push(thread::spawn(move || {
            let base: u64 = p as u64 * items_per_producer;
            for i in 0..items_per_producer {
                queue.add_portion(base + i);
            }
        }));
    }

    let mut consumer_threads: Vec<JoinHandle<()>> = Vec::new();
    for _ in 0..consumer_count {
        let queue = queue.clone();
        let retrieved = retrieved.clone();
        consumer_threads.push(thread::spawn(move || {
            while let Some(item) = queue.retrieve_portion() {
                retrieved.lock().unwrap().push(item);
            }
        }));
    }

    for producer_thread in producer_threads {
        producer_thread.join().unwrap();
    }
    queue.ensure_all_portions_are_retrieved();
    queue.stop_consumers(consumer_count);
    for consumer_thread in consumer_threads {
        consumer_thread.join().unwrap();
    }

    Arc::try_unwrap(retrieved).unwrap().into_inner().unwrap()
}

#[test]
fn every_backend_delivers_each_item_exactly_once() {
    const PRODUCERS: usize = 4;
    const CONSUMERS: usize = 4;
    const ITEMS_PER_PRODUCER: u64 = 500;

    // A small capacity so producers actually hit backpressure.
    for (name, queue) in all_backends(8) {
        let mut items = round_trip(queue, PRODUCERS, CONSUMERS, ITEMS_PER_PRODUCER);
        items.sort_unstable();

        let expected: Vec<u64> = (0..PRODUCERS as u64 * ITEMS_PER_PRODUCER).collect();
        assert_eq!(items, expected, "backend {}", name);
    }
}

#[test]
fn every_backend_preserves_fifo_order_for_a_single_thread() {
    for (name, queue) in all_backends(16) {
        for item in 0..10u64 {
            queue.add_portion(item);
        }
        assert_eq!(queue.size(), 10, "backend {}", name);
        for item in 0..10u64 {
            assert_eq!(queue.retrieve_portion(), Some(item), "backend {}", name);
        }
        assert_eq!(queue.size(), 0, "backend {}", name);
    }
}

#[test]
fn stopping_unblocks_every_waiting_consumer() {
    const CONSUMERS: usize = 3;

    for (name, queue) in all_backends(8) {
        let mut consumer_threads: Vec<JoinHandle<Option<u64>>> = Vec::new();
        for _ in 0..CONSUMERS {
            let queue = queue.clone();
            consumer_threads.push(thread::spawn(move || queue.retrieve_portion()));
        }

        // Empty queue, so the barrier returns at once.
        queue.ensure_all_portions_are_retrieved();
        queue.stop_consumers(CONSUMERS);

        for consumer_thread in consumer_threads {
            assert_eq!(consumer_thread.join().unwrap(), None, "backend {}", name);
        }
    }
}

#[test]
fn stopping_drains_future_retrievers_too() {
    for (name, queue) in all_backends(8) {
        queue.ensure_all_portions_are_retrieved();
        queue.stop_consumers(2);

        // Nobody was blocked; the next two retrievals observe shutdown.
        assert_eq!(queue.retrieve_portion(), None, "backend {}", name);
        assert_eq!(queue.retrieve_portion(), None, "backend {}", name);
    }
}

#[test]
fn capacity_derives_from_the_thread_counts() {
    for kind in [
        QueueKind::Blocking,
        QueueKind::Textbook,
        QueueKind::TextbookParkingLot,
        QueueKind::MostlyNonBlocking,
    ] {
        let queue = create_portion_queue::<u64>(kind, 3, 2);
        assert_eq!(queue.max_size(), 3 * 2 * 1000);
        assert_eq!(queue.size(), 0);
    }
}
