//! Configuration for fork-consensus
//!
//! The staleness horizon is a consensus constant (`CUT_OFF_AGE`) and is not
//! configurable here. These settings select between the legacy behaviors that
//! the validation engine and the fork tree preserve by default and their
//! tightened alternatives.

use serde::{Deserialize, Serialize};

use crate::error::{ConsensusError, Result};

/// How the batch pre-filter in `TxHandler::handle_txs` detects conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictFilter {
    /// Two transactions conflict when any of their inputs name the same
    /// producing transaction, whatever the output index. Spending two
    /// different outputs of one transaction in the same batch drops the later
    /// spender.
    #[default]
    PrevTxHash,
    /// Two transactions conflict only when they claim the same outpoint.
    OutPoint,
}

/// Fork tree and validation engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Conflict granularity of the batch pre-filter
    /// Default: `prev_tx_hash`
    #[serde(default)]
    pub conflict_filter: ConflictFilter,

    /// Re-insert the coinbase of every accepted block into the pending pool
    /// Default: true
    #[serde(default = "default_true")]
    pub requeue_coinbase: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            conflict_filter: ConflictFilter::default(),
            requeue_coinbase: true,
        }
    }
}

impl ChainConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ConsensusError::Configuration(e.to_string()))
    }

    /// Serialize the configuration to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
