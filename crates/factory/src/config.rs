//! Factory configuration

use multisig_wallet::WalletConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Wallets to create at deployment, plus an optional cap on clones
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfig {
    #[serde(default)]
    pub wallets: Vec<WalletConfig>,

    /// Unlimited when absent
    #[serde(default)]
    pub max_clones: Option<usize>,
}

impl FactoryConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
