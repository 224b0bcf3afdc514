//! Wallet configuration
//!
//! A wallet is described by its quorum and signer set. Configurations are
//! plain JSON so deployments can be reviewed and versioned:
//!
//! ```json
//! { "quorum": 2, "signers": ["0x11…11", "0x22…22", "0x33…33"] }
//! ```

use multisig_approval::{ApprovalError, SignerRegistry};
use multisig_core::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Approvals required before a transfer executes
    pub quorum: u32,

    /// Accounts allowed to propose and approve
    pub signers: Vec<Address>,
}

impl WalletConfig {
    pub fn new(quorum: u32, signers: impl IntoIterator<Item = Address>) -> Self {
        Self {
            quorum,
            signers: signers.into_iter().collect(),
        }
    }

    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Check the quorum/signer invariants without building a wallet
    pub fn validate(&self) -> Result<(), ApprovalError> {
        SignerRegistry::new(self.quorum, self.signers.iter().copied()).map(|_| ())
    }
}
