//! Scenario tests exercising the pool through the `Scheduler` trait surface,
//! the way the enclosing node consumes it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use slog::Logger;
use txpool::{
    CheckedTransaction, PriorityQueue, ScheduleTxError, Scheduler, TxHash, TxPoolConfig, Weight,
};

fn test_logger() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

fn new_scheduler(max_pool_size: u64, limits: &[(Weight, u64)]) -> Arc<dyn Scheduler> {
    let config = TxPoolConfig {
        max_pool_size,
        weight_limits: limits.iter().cloned().collect(),
    };
    Arc::new(PriorityQueue::new(&config, test_logger()))
}

fn create_tx(tag: &str, priority: u64) -> Arc<CheckedTransaction> {
    Arc::new(CheckedTransaction::new(
        tag.as_bytes().to_vec(),
        priority,
        HashMap::new(),
    ))
}

fn create_sized_tx(tag: &str, priority: u64, size: usize) -> Arc<CheckedTransaction> {
    let mut raw = vec![0u8; size];
    let tag = tag.as_bytes();
    let n = tag.len().min(size);
    raw[..n].copy_from_slice(&tag[..n]);
    Arc::new(CheckedTransaction::new(raw, priority, HashMap::new()))
}

#[test]
fn scheduler_reports_algorithm_name() {
    let scheduler = new_scheduler(16, &[]);
    assert_eq!(scheduler.name(), "priority");
}

#[test]
fn batches_are_priority_ordered_and_weight_bounded() {
    let scheduler = new_scheduler(100, &[(Weight::Count, 4), (Weight::SizeBytes, 256)]);
    for i in 0..10u64 {
        scheduler
            .add(create_sized_tx(
                &format!("t{i}"),
                i * 7 % 5 + 1,
                (i as usize + 1) * 20,
            ))
            .unwrap();
    }

    let batch = scheduler.get_batch(true);
    assert!(!batch.is_empty());

    // L3: non-increasing priority order.
    let priorities: Vec<u64> = batch.iter().map(|tx| tx.priority()).collect();
    assert!(priorities.windows(2).all(|pair| pair[0] >= pair[1]));

    // L4: every configured dimension stays within its limit.
    assert!(batch.len() as u64 <= 4);
    let total_size: u64 = batch.iter().map(|tx| tx.weight(&Weight::SizeBytes)).sum();
    assert!(total_size <= 256);
}

#[test]
fn committed_batches_leave_the_pool() {
    let scheduler = new_scheduler(100, &[]);
    for i in 0..5u64 {
        scheduler.add(create_tx(&format!("t{i}"), 10 * (i + 1))).unwrap();
    }

    let batch = scheduler.get_prioritized_batch(None, 3);
    assert_eq!(batch.len(), 3);

    // The consumer commits the batch and removes it from the pool.
    let committed: Vec<TxHash> = batch.iter().map(|tx| tx.hash()).collect();
    scheduler.remove_batch(&committed);

    assert_eq!(scheduler.size(), 2);
    for hash in &committed {
        assert!(!scheduler.is_queued(hash));
    }

    // Removing the same batch again is a no-op.
    scheduler.remove_batch(&committed);
    assert_eq!(scheduler.size(), 2);
}

#[test]
fn capacity_displacement_keeps_highest_priorities() {
    let scheduler = new_scheduler(3, &[]);
    let t1 = create_tx("t1", 10);
    let t2 = create_tx("t2", 5);
    let t3 = create_tx("t3", 20);
    scheduler.add(Arc::clone(&t1)).unwrap();
    scheduler.add(Arc::clone(&t2)).unwrap();
    scheduler.add(Arc::clone(&t3)).unwrap();

    assert_eq!(
        scheduler.add(create_tx("t4", 3)),
        Err(ScheduleTxError::PoolFull)
    );

    let t5 = create_tx("t5", 15);
    scheduler.add(Arc::clone(&t5)).unwrap();

    let remaining: Vec<TxHash> = scheduler
        .get_prioritized_batch(None, 10)
        .iter()
        .map(|tx| tx.hash())
        .collect();
    assert_eq!(remaining, vec![t3.hash(), t5.hash(), t1.hash()]);
    assert!(!scheduler.is_queued(&t2.hash()));
}

#[test]
fn reconfigured_limits_apply_lazily() {
    let scheduler = new_scheduler(100, &[(Weight::SizeBytes, 1000)]);
    let tx = create_sized_tx("t1", 10, 500);
    let hash = tx.hash();
    scheduler.add(tx).unwrap();

    let mut limits = HashMap::new();
    limits.insert(Weight::SizeBytes, 100);
    scheduler.update_weight_limits(limits);

    // Not inspected eagerly.
    assert!(scheduler.is_queued(&hash));
    assert_eq!(scheduler.size(), 1);

    // Dropped by the next traversal.
    assert!(scheduler.get_batch(true).is_empty());
    assert!(!scheduler.is_queued(&hash));
    assert_eq!(scheduler.size(), 0);
}

#[test]
fn known_batch_preserves_input_order() {
    let scheduler = new_scheduler(100, &[]);
    let t1 = create_tx("t1", 1);
    let t2 = create_tx("t2", 2);
    let t3 = create_tx("t3", 3);
    scheduler.add(Arc::clone(&t1)).unwrap();
    scheduler.add(Arc::clone(&t3)).unwrap();

    let (result, missing) = scheduler.get_known_batch(&[t3.hash(), t2.hash(), t1.hash()]);

    assert_eq!(result.len(), 3);
    assert_eq!(result[0].as_ref().map(|tx| tx.hash()), Some(t3.hash()));
    assert!(result[1].is_none());
    assert_eq!(result[2].as_ref().map(|tx| tx.hash()), Some(t1.hash()));
    assert_eq!(missing.get(&t2.hash()), Some(&1));
}

#[test]
fn clear_empties_the_pool() {
    let scheduler = new_scheduler(100, &[]);
    for i in 0..4u64 {
        scheduler.add(create_tx(&format!("t{i}"), i + 1)).unwrap();
    }

    scheduler.clear();

    assert_eq!(scheduler.size(), 0);
    assert!(scheduler.get_transactions(0).is_empty());
}

#[test]
fn concurrent_producers_and_consumers_stay_consistent() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: u64 = 200;
    const REMOVED_PER_PRODUCER: u64 = 50;

    let scheduler = new_scheduler(10_000, &[(Weight::Count, 64)]);

    let mut handles = Vec::new();
    for producer in 0..PRODUCERS {
        let scheduler = Arc::clone(&scheduler);
        handles.push(thread::spawn(move || {
            let mut own = Vec::new();
            for i in 0..PER_PRODUCER {
                let tx = create_tx(&format!("p{producer}-{i}"), i % 17 + 1);
                own.push(tx.hash());
                scheduler.add(tx).unwrap();
            }
            // Each producer retires a slice of its own transactions.
            let retired: Vec<TxHash> =
                own.into_iter().take(REMOVED_PER_PRODUCER as usize).collect();
            scheduler.remove_batch(&retired);
        }));
    }

    // A consumer polls batches concurrently; batches are snapshots and are
    // not removed here.
    let batcher = {
        let scheduler = Arc::clone(&scheduler);
        thread::spawn(move || {
            for _ in 0..100 {
                let batch = scheduler.get_batch(true);
                assert!(batch.len() as u64 <= 64);
                let _ = scheduler.get_prioritized_batch(None, 32);
            }
        })
    };

    for handle in handles {
        handle.join().unwrap();
    }
    batcher.join().unwrap();

    let expected = PRODUCERS as u64 * (PER_PRODUCER - REMOVED_PER_PRODUCER);
    assert_eq!(scheduler.size(), expected);

    // The hash index agrees with the reported size and holds no duplicates.
    let all = scheduler.get_transactions(0);
    assert_eq!(all.len() as u64, expected);
    let unique: HashSet<TxHash> = all.iter().map(|tx| tx.hash()).collect();
    assert_eq!(unique.len(), all.len());
}
