//! Checked transactions and their scheduling weights.
//!
//! A [`CheckedTransaction`] is a transaction that has already passed
//! validation upstream. The pool never inspects the payload; it only uses
//! the digest, the caller-supplied priority and the weight vector.

use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const TX_HASH_LENGTH: usize = 32;

/// A 32-byte transaction digest.
///
/// Ordering is lexicographic over the raw bytes, which makes the digest a
/// deterministic tie-breaker for equal-priority transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash(pub [u8; TX_HASH_LENGTH]);

impl TxHash {
    /// Computes the digest of a raw transaction payload.
    pub fn digest(raw: &[u8]) -> Self {
        Self(blake3::hash(raw).into())
    }

    /// Creates a hash from raw bytes.
    pub fn from_bytes(bytes: [u8; TX_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the bytes of the hash.
    pub fn as_bytes(&self) -> &[u8; TX_HASH_LENGTH] {
        &self.0
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 8 bytes in hex (short format)
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl AsRef<[u8]> for TxHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A named axis along which transactions consume batch capacity.
///
/// Three dimensions are always tracked: [`Weight::Count`] (1 per
/// transaction), [`Weight::SizeBytes`] (serialized payload length) and
/// [`Weight::ConsensusMessages`] (messages emitted during execution).
/// Runtimes may configure additional custom dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Weight {
    /// Number of transactions (always 1 per transaction).
    Count,
    /// Serialized payload size in bytes.
    SizeBytes,
    /// Number of consensus messages emitted by the transaction.
    ConsensusMessages,
    /// A runtime-specific dimension.
    Custom(String),
}

impl Weight {
    /// Returns the canonical name of the dimension.
    pub fn as_str(&self) -> &str {
        match self {
            Weight::Count => "count",
            Weight::SizeBytes => "size_bytes",
            Weight::ConsensusMessages => "consensus_messages",
            Weight::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Weight {
    fn from(name: &str) -> Self {
        match name {
            "count" => Weight::Count,
            "size_bytes" => Weight::SizeBytes,
            "consensus_messages" => Weight::ConsensusMessages,
            other => Weight::Custom(other.to_string()),
        }
    }
}

impl FromStr for Weight {
    type Err = Infallible;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(name))
    }
}

// Weights appear as map keys in limit configuration, so they serialize as
// their canonical string names.
impl Serialize for Weight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Weight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name.as_str()))
    }
}

/// A transaction that has passed upstream validation.
///
/// Immutable once created. The pool takes exclusive ownership on admission
/// and hands out `Arc` clones in batches; consumers must treat batches as
/// snapshots.
#[derive(Debug, Clone)]
pub struct CheckedTransaction {
    /// Raw serialized payload.
    raw: Vec<u8>,
    /// Digest of the raw payload.
    hash: TxHash,
    /// Caller-supplied priority; higher is scheduled first.
    priority: u64,
    /// Per-dimension resource consumption.
    weights: HashMap<Weight, u64>,
}

impl CheckedTransaction {
    /// Creates a checked transaction from its raw payload.
    ///
    /// The `count` and `size_bytes` weights are derived here and override
    /// any caller-supplied values for those dimensions.
    pub fn new(raw: Vec<u8>, priority: u64, mut weights: HashMap<Weight, u64>) -> Self {
        let hash = TxHash::digest(&raw);
        weights.insert(Weight::Count, 1);
        weights.insert(Weight::SizeBytes, raw.len() as u64);
        Self {
            raw,
            hash,
            priority,
            weights,
        }
    }

    /// Returns the transaction digest.
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Returns the scheduling priority.
    pub fn priority(&self) -> u64 {
        self.priority
    }

    /// Returns the weight of the transaction in the given dimension.
    ///
    /// Dimensions the transaction does not consume report 0.
    pub fn weight(&self, dimension: &Weight) -> u64 {
        self.weights.get(dimension).copied().unwrap_or(0)
    }

    /// Returns the full weight vector.
    pub fn weights(&self) -> &HashMap<Weight, u64> {
        &self.weights
    }

    /// Returns the raw serialized payload.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Returns the serialized payload length in bytes.
    pub fn size(&self) -> usize {
        self.raw.len()
    }
}

impl PartialEq for CheckedTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for CheckedTransaction {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let a = TxHash::digest(b"transfer");
        let b = TxHash::digest(b"transfer");
        let c = TxHash::digest(b"mint");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash_ordering_is_lexicographic() {
        let lo = TxHash::from_bytes([0u8; 32]);
        let mut hi_bytes = [0u8; 32];
        hi_bytes[0] = 1;
        let hi = TxHash::from_bytes(hi_bytes);

        assert!(lo < hi);
    }

    #[test]
    fn test_weight_name_roundtrip() {
        let dims = [
            Weight::Count,
            Weight::SizeBytes,
            Weight::ConsensusMessages,
            Weight::Custom("storage_gas".to_string()),
        ];
        for dim in dims {
            assert_eq!(Weight::from(dim.as_str()), dim);
        }
    }

    #[test]
    fn test_weight_serde_as_string() {
        let json = serde_json::to_string(&Weight::SizeBytes).unwrap();
        assert_eq!(json, "\"size_bytes\"");

        let parsed: Weight = serde_json::from_str("\"consensus_messages\"").unwrap();
        assert_eq!(parsed, Weight::ConsensusMessages);

        let custom: Weight = serde_json::from_str("\"storage_gas\"").unwrap();
        assert_eq!(custom, Weight::Custom("storage_gas".to_string()));
    }

    #[test]
    fn test_derived_weights_override_caller_values() {
        let mut weights = HashMap::new();
        weights.insert(Weight::Count, 7);
        weights.insert(Weight::SizeBytes, 9999);
        weights.insert(Weight::ConsensusMessages, 3);

        let tx = CheckedTransaction::new(vec![0u8; 64], 10, weights);

        assert_eq!(tx.weight(&Weight::Count), 1);
        assert_eq!(tx.weight(&Weight::SizeBytes), 64);
        assert_eq!(tx.weight(&Weight::ConsensusMessages), 3);
    }

    #[test]
    fn test_unknown_dimension_reports_zero() {
        let tx = CheckedTransaction::new(b"payload".to_vec(), 1, HashMap::new());
        assert_eq!(tx.weight(&Weight::Custom("storage_gas".to_string())), 0);
    }

    #[test]
    fn test_equality_is_by_hash() {
        let a = CheckedTransaction::new(b"same".to_vec(), 1, HashMap::new());
        let b = CheckedTransaction::new(b"same".to_vec(), 999, HashMap::new());
        let c = CheckedTransaction::new(b"other".to_vec(), 1, HashMap::new());

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
