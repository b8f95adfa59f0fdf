//! Keeper configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the keeper.
///
/// Deserializes with defaults for missing fields, so hosts can embed a
/// partial object in their own configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperConfig {
    /// Module account holding escrowed validation fees.
    pub escrow_module: String,
    /// Module account backing trust deposits.
    pub trust_deposit_module: String,
    /// Page size used when a list query does not specify one.
    pub default_response_max_size: u32,
    /// Largest page size a list query may request.
    pub max_response_size: u32,
    /// Longest validator chain a walk will follow before failing.
    pub max_validator_chain_depth: usize,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            escrow_module: "perm".to_string(),
            trust_deposit_module: "td".to_string(),
            default_response_max_size: 64,
            max_response_size: 1024,
            max_validator_chain_depth: 64,
        }
    }
}
