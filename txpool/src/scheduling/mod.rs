//! Transaction Scheduling - Queue and Algorithm Surface
//!
//! This module owns the priority-ordered transaction pool and the
//! [`Scheduler`] trait that exposes it to the rest of the node under a
//! stable contract.
//!
//! ## Data Flow
//!
//! 1. Ingestion: validated transactions are queued via [`Scheduler::add`]
//! 2. Extraction: consumers pull weight-bounded or prioritized batches
//! 3. Commitment: committed or invalidated transactions are removed via
//!    [`Scheduler::remove_batch`]
//! 4. Reconfiguration: runtime parameter changes flow in through
//!    [`Scheduler::update_weight_limits`] and
//!    [`Scheduler::update_max_pool_size`]
//!
//! Batches are snapshots: the pool keeps ownership of its transactions and
//! hands out `Arc` clones, so a returned batch stays valid even if entries
//! are concurrently removed.

mod queue;

pub use queue::{
    PoolStats, PriorityQueue, DEFAULT_MAX_POOL_SIZE, MIN_FIT_CONSENSUS_MESSAGES, MIN_FIT_COUNT,
    MIN_FIT_SIZE_BYTES,
};

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ScheduleTxError;
use crate::transaction::{CheckedTransaction, TxHash, Weight};

/// Name of the priority scheduling algorithm.
pub const SCHEDULER_NAME: &str = "priority";

/// An algorithm for scheduling incoming transactions.
///
/// Implementations must be safe to share across threads; every operation is
/// atomic with respect to the others and non-blocking.
pub trait Scheduler: Send + Sync {
    /// Returns the scheduler algorithm name.
    fn name(&self) -> &'static str;

    /// Queues a transaction for scheduling.
    fn add(&self, tx: Arc<CheckedTransaction>) -> Result<(), ScheduleTxError>;

    /// Returns a batch of scheduled transactions, if one is available.
    ///
    /// With `force` set a batch is produced even if no configured weight
    /// limit has been reached yet.
    fn get_batch(&self, force: bool) -> Vec<Arc<CheckedTransaction>>;

    /// Returns a batch ordered by priority without enforcing weight limits
    /// on the result.
    ///
    /// `offset` names the transaction to resume after: entries are skipped
    /// until the offset is encountered and only those following it are
    /// returned.
    fn get_prioritized_batch(
        &self,
        offset: Option<&TxHash>,
        limit: u32,
    ) -> Vec<Arc<CheckedTransaction>>;

    /// Looks up a known set of transactions in the pool.
    ///
    /// Missing transactions leave `None` in their slot and are reported in
    /// the returned map together with their input index.
    fn get_known_batch(
        &self,
        hashes: &[TxHash],
    ) -> (Vec<Option<Arc<CheckedTransaction>>>, HashMap<TxHash, usize>);

    /// Returns up to `limit` transactions without regard to batch limits or
    /// priorities. A zero limit returns all of them.
    fn get_transactions(&self, limit: usize) -> Vec<Arc<CheckedTransaction>>;

    /// Removes a batch of transactions from the pool.
    fn remove_batch(&self, hashes: &[TxHash]);

    /// Returns whether a transaction is queued.
    fn is_queued(&self, hash: &TxHash) -> bool;

    /// Returns the number of unscheduled transactions.
    fn size(&self) -> u64;

    /// Updates the pool capacity.
    fn update_max_pool_size(&self, max_pool_size: u64);

    /// Updates the per-dimension scheduling weight limits.
    fn update_weight_limits(&self, limits: HashMap<Weight, u64>);

    /// Clears the transaction pool.
    fn clear(&self);
}
