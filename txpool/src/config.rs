//! Transaction pool configuration.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::scheduling::DEFAULT_MAX_POOL_SIZE;
use crate::transaction::Weight;

/// Configuration for the transaction pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxPoolConfig {
    /// Maximum number of pooled transactions.
    pub max_pool_size: u64,
    /// Per-dimension weight limits for batch extraction and admission.
    ///
    /// Keys are canonical dimension names (`count`, `size_bytes`,
    /// `consensus_messages`, or any runtime-specific name).
    #[serde(default)]
    pub weight_limits: HashMap<Weight, u64>,
}

impl Default for TxPoolConfig {
    fn default() -> Self {
        Self {
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            weight_limits: HashMap::new(),
        }
    }
}

impl TxPoolConfig {
    /// Load configuration from a file path.
    ///
    /// Supports TOML format. Environment variables with the `TXPOOL_`
    /// prefix override file values.
    ///
    /// # Example config (TOML)
    /// ```toml
    /// [txpool]
    /// max_pool_size = 50000
    ///
    /// [txpool.weight_limits]
    /// count = 1000
    /// size_bytes = 16777216
    /// consensus_messages = 32
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut figment = Figment::new();

        // Detect file format based on extension.
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            figment = match ext {
                "toml" => figment.merge(Toml::file(path)),
                _ => {
                    return Err(anyhow::anyhow!(
                        "Unsupported config file format: {}. Use .toml",
                        ext
                    ));
                }
            };
        } else {
            return Err(anyhow::anyhow!("Config file must have an extension (.toml)"));
        }

        // Environment variables take precedence over file config.
        figment = figment.merge(Env::prefixed("TXPOOL_"));

        let config: TxPoolConfig = figment.extract_inner("txpool").map_err(anyhow::Error::msg)?;

        Ok(config)
    }
}
