//! Priority Queue - Weight-Limited Transaction Pool
//!
//! Buffers checked transactions, orders them by caller-supplied priority and
//! produces weight-bounded batches for the next scheduling round.
//!
//! ## Features
//!
//! - **Priority ordering**: transactions sorted by priority (highest first)
//!   with the transaction hash as a deterministic tie-breaker, using `BTreeSet`
//! - **O(1) lookup**: by transaction hash via `HashMap`
//! - **Multi-dimensional packing**: batches respect every configured weight
//!   limit, with an early stop once any dimension is nearly saturated
//! - **Priority eviction**: the lowest-priority transaction is displaced when
//!   a higher-priority one arrives at capacity
//! - **Lazy re-validation**: entries oversize under reconfigured limits are
//!   dropped by the next batch traversal that encounters them
//!
//! ## Time Complexity
//!
//! | Operation              | Complexity |
//! |------------------------|------------|
//! | `add`                  | O(log n)   |
//! | `remove_batch`         | O(k log n) |
//! | `get_batch`            | O(k·d)     |
//! | `is_queued`            | O(1)       |
//! | `size`                 | O(1)       |
//!
//! Where n = pool size, k = transactions examined/removed, d = configured
//! weight dimensions.
//!
//! ## Thread Safety
//!
//! All state lives behind a single `Mutex`; every public operation locks on
//! entry and re-establishes the pool invariants before releasing. No I/O
//! happens while the lock is held; logging runs after the guard is dropped.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use slog::Logger;

use crate::config::TxPoolConfig;
use crate::error::ScheduleTxError;
use crate::transaction::{CheckedTransaction, TxHash, Weight};

use super::{Scheduler, SCHEDULER_NAME};

/// Default maximum number of pooled transactions.
pub const DEFAULT_MAX_POOL_SIZE: u64 = 50_000;

/// Minimum extra `count` weight that could still admit a transaction.
pub const MIN_FIT_COUNT: u64 = 1;

/// Minimum extra `size_bytes` weight that could still admit a transaction.
pub const MIN_FIT_SIZE_BYTES: u64 = 10;

/// Minimum extra `consensus_messages` weight that could still admit a
/// transaction.
pub const MIN_FIT_CONSENSUS_MESSAGES: u64 = 0;

/// Minimum additional weight in the given dimension that could possibly fit
/// one more transaction into a batch.
///
/// Once `limit - batch_weight` drops below this value the batch walk stops,
/// as nothing else can fit. Custom dimensions never trigger the early stop.
fn min_batch_fit(dimension: &Weight) -> u64 {
    match dimension {
        Weight::Count => MIN_FIT_COUNT,
        Weight::SizeBytes => MIN_FIT_SIZE_BYTES,
        Weight::ConsensusMessages => MIN_FIT_CONSENSUS_MESSAGES,
        Weight::Custom(_) => 0,
    }
}

/// Ordering key for the priority index.
///
/// The derived order compares priority first and breaks ties by hash, so
/// ascending iteration yields the lowest-priority transaction first.
/// Hashes are unique, which makes the order strict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct PriorityKey {
    priority: u64,
    hash: TxHash,
}

impl PriorityKey {
    fn of(tx: &CheckedTransaction) -> Self {
        Self {
            priority: tx.priority(),
            hash: tx.hash(),
        }
    }
}

/// Pool state guarded by the queue lock.
struct Inner {
    /// Priority index: ordered by (priority, hash), lowest first.
    by_priority: BTreeSet<PriorityKey>,
    /// Hash index: transaction lookup by digest.
    by_hash: HashMap<TxHash, Arc<CheckedTransaction>>,
    /// Running per-dimension totals across all pooled transactions.
    pool_weights: HashMap<Weight, u64>,
    /// Per-dimension caps for batch extraction and admission.
    weight_limits: HashMap<Weight, u64>,
    /// Cap on the number of pooled transactions (the `count` weight).
    max_pool_size: u64,
    /// Priority of the current minimum element; 0 when the pool is empty.
    lowest_priority: u64,
    /// Statistics: total transactions admitted.
    stats_added: u64,
    /// Statistics: total transactions removed (committed, evicted or dropped).
    stats_removed: u64,
}

impl Inner {
    fn count_weight(&self) -> u64 {
        self.pool_weights.get(&Weight::Count).copied().unwrap_or(0)
    }

    /// Validates a transaction against the current limits.
    fn check_tx(&self, tx: &CheckedTransaction) -> Result<(), ScheduleTxError> {
        for (dimension, limit) in &self.weight_limits {
            let weight = tx.weight(dimension);
            if weight > *limit {
                return Err(ScheduleTxError::Oversize {
                    dimension: dimension.clone(),
                    weight,
                    limit: *limit,
                });
            }
        }
        if self.by_hash.contains_key(&tx.hash()) {
            return Err(ScheduleTxError::Duplicate);
        }
        Ok(())
    }

    /// Inserts a transaction into both indices and the weight totals.
    fn insert(&mut self, tx: Arc<CheckedTransaction>) {
        let was_empty = self.by_hash.is_empty();
        self.by_priority.insert(PriorityKey::of(&tx));
        for (dimension, value) in tx.weights() {
            *self.pool_weights.entry(dimension.clone()).or_insert(0) += value;
        }
        if was_empty || tx.priority() < self.lowest_priority {
            self.lowest_priority = tx.priority();
        }
        self.by_hash.insert(tx.hash(), tx);
        self.stats_added += 1;
    }

    /// Common removal path: deletes every listed transaction that is still
    /// pooled, updates the weight totals and recomputes the cached minimum.
    ///
    /// Returns the number of transactions actually removed. Hashes missing
    /// from the pool are ignored, which also de-duplicates repeated input.
    fn remove_many(&mut self, hashes: &[TxHash]) -> usize {
        let mut removed = 0;
        for hash in hashes {
            let Some(tx) = self.by_hash.remove(hash) else {
                continue;
            };
            self.by_priority.remove(&PriorityKey::of(&tx));
            for (dimension, value) in tx.weights() {
                if let Some(total) = self.pool_weights.get_mut(dimension) {
                    *total -= value;
                }
            }
            removed += 1;
        }
        if removed > 0 {
            self.lowest_priority = self
                .by_priority
                .first()
                .map(|key| key.priority)
                .unwrap_or(0);
            self.stats_removed += removed as u64;
        }
        self.assert_sizes("removal");
        removed
    }

    /// Checks the index/weight size equalities. A mismatch means a bug in a
    /// mutation path and aborts rather than letting the corruption spread.
    fn assert_sizes(&self, operation: &str) {
        let hashes = self.by_hash.len();
        let keys = self.by_priority.len();
        assert!(
            hashes == keys,
            "txpool: inconsistent sizes of the hash index ({hashes}) and priority index ({keys}) after {operation}",
        );
        let count = self.count_weight();
        assert!(
            hashes as u64 == count,
            "txpool: inconsistent sizes of the hash index ({hashes}) and count weight ({count}) after {operation}",
        );
    }
}

/// Priority-ordered transaction pool.
///
/// See the module documentation for the full behavior. Batches hand out
/// `Arc` clones of pooled transactions; callers remove committed ones via
/// [`PriorityQueue::remove_batch`].
pub struct PriorityQueue {
    inner: Mutex<Inner>,
    logger: Logger,
}

impl PriorityQueue {
    /// Creates a pool with the given configuration.
    pub fn new(config: &TxPoolConfig, logger: Logger) -> Self {
        slog::info!(
            logger,
            "transaction pool created";
            "max_pool_size" => config.max_pool_size,
            "weight_limits" => config.weight_limits.len(),
        );
        Self {
            inner: Mutex::new(Inner {
                by_priority: BTreeSet::new(),
                by_hash: HashMap::new(),
                pool_weights: HashMap::new(),
                weight_limits: config.weight_limits.clone(),
                max_pool_size: config.max_pool_size,
                lowest_priority: 0,
                stats_added: 0,
                stats_removed: 0,
            }),
            logger,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock means a mutation path panicked mid-update; the
        // state cannot be trusted, so propagate the abort.
        self.inner.lock().expect("txpool lock poisoned")
    }

    /// Queues a transaction for scheduling.
    ///
    /// When the pool is at capacity the arrival must beat the current
    /// minimum priority; the minimum is then displaced. Equal priority is
    /// not allowed to evict. If the capacity was lowered below the current
    /// size via [`PriorityQueue::update_max_pool_size`], the pool shrinks
    /// back under the cap on the next successful add.
    pub fn add(&self, tx: Arc<CheckedTransaction>) -> Result<(), ScheduleTxError> {
        let tx_hash = tx.hash();
        let evicted = {
            let mut inner = self.lock();

            // Check if there is room in the pool.
            let full = inner.count_weight() >= inner.max_pool_size;
            if full {
                if tx.priority() <= inner.lowest_priority {
                    return Err(ScheduleTxError::PoolFull);
                }
                // A zero cap admits nothing.
                if inner.max_pool_size == 0 {
                    return Err(ScheduleTxError::PoolFull);
                }
            }

            inner.check_tx(&tx)?;

            // Displace from the minimum until the arrival fits.
            let mut evicted = Vec::new();
            while inner.count_weight() >= inner.max_pool_size {
                let Some(lowest) = inner.by_priority.first().copied() else {
                    break;
                };
                inner.remove_many(&[lowest.hash]);
                evicted.push(lowest.hash);
            }

            inner.insert(tx);
            inner.assert_sizes("add");
            let count = inner.count_weight();
            assert!(
                count <= inner.max_pool_size,
                "txpool: pool size ({count}) exceeds the configured capacity ({}) after add",
                inner.max_pool_size,
            );
            evicted
        };

        for hash in evicted {
            slog::debug!(
                self.logger,
                "evicted lowest-priority transaction";
                "evicted" => %hash,
                "admitted" => %tx_hash,
            );
        }
        Ok(())
    }

    /// Returns a batch that respects every configured weight limit, ordered
    /// by descending priority.
    ///
    /// Unless `force` is set, an empty batch is returned while no dimension
    /// has reached its limit. Transactions whose own weight exceeds a limit
    /// are dropped from the pool when encountered; this is how entries
    /// invalidated by [`PriorityQueue::update_weight_limits`] leave.
    pub fn get_batch(&self, force: bool) -> Vec<Arc<CheckedTransaction>> {
        let (batch, dropped) = {
            let mut inner = self.lock();

            // Check if a batch is ready.
            let limit_reached = inner.weight_limits.iter().any(|(dimension, limit)| {
                inner.pool_weights.get(dimension).copied().unwrap_or(0) >= *limit
            });
            if !limit_reached && !force {
                return Vec::new();
            }

            let mut batch = Vec::new();
            let mut batch_weights: HashMap<Weight, u64> = inner
                .weight_limits
                .keys()
                .cloned()
                .map(|dimension| (dimension, 0))
                .collect();
            let mut to_remove = Vec::new();

            'candidates: for key in inner.by_priority.iter().rev() {
                // Both indices stay in sync, so the lookup cannot miss.
                let Some(tx) = inner.by_hash.get(&key.hash) else {
                    continue;
                };

                for (dimension, limit) in &inner.weight_limits {
                    let tx_weight = tx.weight(dimension);

                    // Heavier than the limit itself: drop it from the pool.
                    if tx_weight > *limit {
                        to_remove.push(key.hash);
                        continue 'candidates;
                    }

                    // Stop if nothing else can possibly fit.
                    let used = batch_weights[dimension];
                    if *limit - used < min_batch_fit(dimension) {
                        break 'candidates;
                    }

                    // This transaction would overflow the batch.
                    if used + tx_weight > *limit {
                        continue 'candidates;
                    }
                }

                batch.push(Arc::clone(tx));
                for (dimension, value) in tx.weights() {
                    if let Some(used) = batch_weights.get_mut(dimension) {
                        *used += value;
                    }
                }
            }

            // Drop transactions discovered to be too big to ever fit. This
            // happens when weight limits changed after they were admitted.
            let dropped = inner.remove_many(&to_remove);
            (batch, dropped)
        };

        if dropped > 0 {
            slog::debug!(
                self.logger,
                "removed oversize transactions during batch selection";
                "count" => dropped,
            );
        }
        batch
    }

    /// Returns up to `limit` transactions in descending priority order,
    /// starting strictly after the `offset` hash when one is given.
    ///
    /// Weight limits do not bound the result, but permanently oversize
    /// entries encountered along the way are dropped from the pool. An
    /// offset that is not pooled yields an empty batch.
    pub fn get_prioritized_batch(
        &self,
        offset: Option<&TxHash>,
        limit: u32,
    ) -> Vec<Arc<CheckedTransaction>> {
        let (batch, dropped) = {
            let mut inner = self.lock();

            let start = match offset {
                Some(hash) => match inner.by_hash.get(hash) {
                    Some(tx) => Some(PriorityKey::of(tx)),
                    // Unknown offset: nothing can follow it.
                    None => return Vec::new(),
                },
                None => None,
            };

            let mut batch: Vec<Arc<CheckedTransaction>> = Vec::new();
            let mut to_remove = Vec::new();
            let descent: Box<dyn Iterator<Item = &PriorityKey> + '_> = match start {
                Some(key) => Box::new(inner.by_priority.range(..=key).rev()),
                None => Box::new(inner.by_priority.iter().rev()),
            };

            for key in descent {
                if batch.len() >= limit as usize {
                    break;
                }

                let Some(tx) = inner.by_hash.get(&key.hash) else {
                    continue;
                };

                if inner
                    .weight_limits
                    .iter()
                    .any(|(dimension, l)| tx.weight(dimension) > *l)
                {
                    to_remove.push(key.hash);
                    continue;
                }

                // The offset itself is exclusive.
                if offset == Some(&key.hash) {
                    continue;
                }

                batch.push(Arc::clone(tx));
            }

            let dropped = inner.remove_many(&to_remove);
            (batch, dropped)
        };

        if dropped > 0 {
            slog::debug!(
                self.logger,
                "removed oversize transactions during prioritized selection";
                "count" => dropped,
            );
        }
        batch
    }

    /// Looks up a known set of transactions.
    ///
    /// The output is parallel to the input: pooled transactions appear in
    /// their slot, missing ones leave `None` and are reported in the map
    /// together with their input index.
    pub fn get_known_batch(
        &self,
        hashes: &[TxHash],
    ) -> (Vec<Option<Arc<CheckedTransaction>>>, HashMap<TxHash, usize>) {
        let inner = self.lock();
        let mut result = Vec::with_capacity(hashes.len());
        let mut missing = HashMap::new();
        for (index, hash) in hashes.iter().enumerate() {
            match inner.by_hash.get(hash) {
                Some(tx) => result.push(Some(Arc::clone(tx))),
                None => {
                    result.push(None);
                    missing.insert(*hash, index);
                }
            }
        }
        (result, missing)
    }

    /// Returns up to `limit` transactions in arbitrary order; 0 means all.
    pub fn get_transactions(&self, limit: usize) -> Vec<Arc<CheckedTransaction>> {
        let inner = self.lock();
        let count = match limit {
            0 => inner.by_hash.len(),
            n => n.min(inner.by_hash.len()),
        };
        inner.by_hash.values().take(count).cloned().collect()
    }

    /// Removes every listed transaction that is still pooled. Missing
    /// hashes are silently ignored.
    pub fn remove_batch(&self, hashes: &[TxHash]) {
        let removed = {
            let mut inner = self.lock();
            inner.remove_many(hashes)
        };
        if removed > 0 {
            slog::debug!(
                self.logger,
                "removed transactions";
                "count" => removed,
                "requested" => hashes.len(),
            );
        }
    }

    /// Returns whether a transaction is currently pooled.
    pub fn is_queued(&self, hash: &TxHash) -> bool {
        self.lock().by_hash.contains_key(hash)
    }

    /// Returns the number of pooled transactions.
    pub fn size(&self) -> u64 {
        self.lock().count_weight()
    }

    /// Returns true if the pool holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.lock().by_hash.is_empty()
    }

    /// Updates the pool capacity.
    ///
    /// Existing entries are not evicted eagerly; an over-capacity pool
    /// shrinks on the next successful [`PriorityQueue::add`].
    pub fn update_max_pool_size(&self, max_pool_size: u64) {
        self.lock().max_pool_size = max_pool_size;
    }

    /// Replaces the per-dimension weight limits.
    ///
    /// Entries oversize under the new limits are not inspected eagerly;
    /// they are dropped by the next batch traversal that encounters them.
    pub fn update_weight_limits(&self, limits: HashMap<Weight, u64>) {
        self.lock().weight_limits = limits;
    }

    /// Drops all pooled transactions and resets the weight totals.
    pub fn clear(&self) {
        {
            let mut inner = self.lock();
            inner.by_priority.clear();
            inner.by_hash.clear();
            inner.pool_weights.clear();
            inner.lowest_priority = 0;
        }
        slog::debug!(self.logger, "transaction pool cleared");
    }

    /// Returns a statistics snapshot.
    pub fn stats(&self) -> PoolStats {
        let inner = self.lock();
        PoolStats {
            size: inner.count_weight(),
            max_pool_size: inner.max_pool_size,
            total_added: inner.stats_added,
            total_removed: inner.stats_removed,
        }
    }
}

impl Scheduler for PriorityQueue {
    fn name(&self) -> &'static str {
        SCHEDULER_NAME
    }

    fn add(&self, tx: Arc<CheckedTransaction>) -> Result<(), ScheduleTxError> {
        PriorityQueue::add(self, tx)
    }

    fn get_batch(&self, force: bool) -> Vec<Arc<CheckedTransaction>> {
        PriorityQueue::get_batch(self, force)
    }

    fn get_prioritized_batch(
        &self,
        offset: Option<&TxHash>,
        limit: u32,
    ) -> Vec<Arc<CheckedTransaction>> {
        PriorityQueue::get_prioritized_batch(self, offset, limit)
    }

    fn get_known_batch(
        &self,
        hashes: &[TxHash],
    ) -> (Vec<Option<Arc<CheckedTransaction>>>, HashMap<TxHash, usize>) {
        PriorityQueue::get_known_batch(self, hashes)
    }

    fn get_transactions(&self, limit: usize) -> Vec<Arc<CheckedTransaction>> {
        PriorityQueue::get_transactions(self, limit)
    }

    fn remove_batch(&self, hashes: &[TxHash]) {
        PriorityQueue::remove_batch(self, hashes)
    }

    fn is_queued(&self, hash: &TxHash) -> bool {
        PriorityQueue::is_queued(self, hash)
    }

    fn size(&self) -> u64 {
        PriorityQueue::size(self)
    }

    fn update_max_pool_size(&self, max_pool_size: u64) {
        PriorityQueue::update_max_pool_size(self, max_pool_size)
    }

    fn update_weight_limits(&self, limits: HashMap<Weight, u64>) {
        PriorityQueue::update_weight_limits(self, limits)
    }

    fn clear(&self) {
        PriorityQueue::clear(self)
    }
}

/// Statistics about the transaction pool.
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Current number of pooled transactions.
    pub size: u64,
    /// Configured capacity.
    pub max_pool_size: u64,
    /// Total transactions admitted since creation.
    pub total_added: u64,
    /// Total transactions removed since creation.
    pub total_removed: u64,
}
