//! Asset ledger capability

use multisig_core::{Address, Amount};

use crate::TransferError;

/// Balance and transfer capability of an external token ledger.
///
/// Wallets never store balances themselves: every balance check and every
/// payout goes through this trait. Calls are synchronous and either succeed
/// or fail completely before returning.
pub trait AssetLedger: Send + Sync {
    /// Balance of `account` in `asset` (zero when never funded)
    fn balance_of(&self, asset: &Address, account: &Address) -> Amount;

    /// Move `amount` of `asset` from `from` to `to`
    fn transfer(
        &self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError>;
}
