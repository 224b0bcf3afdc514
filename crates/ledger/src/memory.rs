//! In-memory token ledger
//!
//! Reference `AssetLedger` holding balances for any number of assets.
//! Used by tests and local setups in place of a real token contract.

use multisig_core::{Address, Amount};
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use crate::error::TransferError;
use crate::traits::AssetLedger;

#[derive(Default)]
struct LedgerState {
    /// (asset, account) -> balance
    balances: HashMap<(Address, Address), Amount>,
    /// Accounts whose transfers are refused
    blocked: HashSet<Address>,
}

/// Thread-safe in-memory token ledger
#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit newly issued `amount` of `asset` to `account`
    pub fn mint(&self, asset: Address, account: Address, amount: Amount) -> Result<(), TransferError> {
        if asset.is_zero() || account.is_zero() {
            return Err(TransferError::InvalidAddress);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let balance = state.balances.entry((asset, account)).or_default();
        *balance = balance
            .checked_add(&amount)
            .ok_or(TransferError::Overflow(account))?;

        tracing::debug!(asset = %asset, account = %account, amount = %amount, "Minted");
        Ok(())
    }

    /// Refuse every transfer sending from or to `account`
    pub fn block(&self, account: Address) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.blocked.insert(account);
    }

    pub fn unblock(&self, account: &Address) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.blocked.remove(account);
    }

    /// Sum of all balances held in `asset`
    pub fn total_supply(&self, asset: &Address) -> Amount {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .balances
            .iter()
            .filter(|((a, _), _)| a == asset)
            .fold(Amount::ZERO, |acc, (_, balance)| {
                acc.checked_add(balance).unwrap_or(acc)
            })
    }
}

impl AssetLedger for InMemoryLedger {
    fn balance_of(&self, asset: &Address, account: &Address) -> Amount {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .balances
            .get(&(*asset, *account))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(
        &self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if asset.is_zero() || from.is_zero() || to.is_zero() {
            return Err(TransferError::InvalidAddress);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(blocked) = [from, to].into_iter().find(|a| state.blocked.contains(*a)) {
            return Err(TransferError::Blocked(*blocked));
        }

        let available = state
            .balances
            .get(&(*asset, *from))
            .copied()
            .unwrap_or_default();
        let remaining = available
            .checked_sub(&amount)
            .ok_or(TransferError::InsufficientBalance {
                account: *from,
                available,
                required: amount,
            })?;

        if from == to {
            return Ok(());
        }

        let received = state
            .balances
            .get(&(*asset, *to))
            .copied()
            .unwrap_or_default()
            .checked_add(&amount)
            .ok_or(TransferError::Overflow(*to))?;

        // Both balances are computed before either is written
        state.balances.insert((*asset, *from), remaining);
        state.balances.insert((*asset, *to), received);

        tracing::debug!(
            asset = %asset,
            from = %from,
            to = %to,
            amount = %amount,
            "Transferred"
        );
        Ok(())
    }
}
