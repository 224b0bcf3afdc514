//! Wallet snapshots

use multisig_approval::TransactionRecord;
use multisig_core::Address;
use serde::{Deserialize, Serialize};

/// Complete persisted state of one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub account: Address,
    pub quorum: u32,
    pub signers: Vec<Address>,
    /// Records in id order, starting at 1
    pub transactions: Vec<TransactionRecord>,
}
