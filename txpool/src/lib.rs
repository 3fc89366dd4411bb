//! Priority-ordered transaction pool.
//!
//! Buffers checked transactions submitted to a runtime, orders them by
//! caller-supplied priority, enforces a pool capacity and per-dimension
//! weight limits, and produces batches for the next scheduling round.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use txpool::{CheckedTransaction, PriorityQueue, Scheduler, TxPoolConfig};
//!
//! let config = TxPoolConfig::from_path("node.toml")?;
//! let pool: Arc<dyn Scheduler> = Arc::new(PriorityQueue::new(&config, logger));
//!
//! // Queue a validated transaction.
//! pool.add(Arc::new(CheckedTransaction::new(raw, priority, weights)))?;
//!
//! // Pull a weight-bounded batch for the next round.
//! let batch = pool.get_batch(false);
//!
//! // Remove committed transactions once the round lands.
//! let hashes: Vec<_> = batch.iter().map(|tx| tx.hash()).collect();
//! pool.remove_batch(&hashes);
//! ```

pub mod config;
pub mod error;
pub mod scheduling;
pub mod transaction;

pub use config::TxPoolConfig;
pub use error::ScheduleTxError;
pub use scheduling::{PoolStats, PriorityQueue, Scheduler, SCHEDULER_NAME};
pub use transaction::{CheckedTransaction, TxHash, Weight};
