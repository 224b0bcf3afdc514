//! Signer registry - membership and quorum authority

use multisig_core::Address;
use std::collections::HashSet;

use crate::error::ApprovalError;

/// Minimum number of distinct signers a wallet can have
pub const MIN_SIGNERS: usize = 2;

/// The set of accounts allowed to propose and approve, plus the quorum.
///
/// # Invariants
/// - at least [`MIN_SIGNERS`] distinct, non-zero signers
/// - `1 <= quorum <= signer_count()`
///
/// The signer set is fixed once constructed; only the quorum can change.
#[derive(Debug, Clone)]
pub struct SignerRegistry {
    /// Signers in the order they were configured
    signers: Vec<Address>,
    members: HashSet<Address>,
    quorum: u32,
}

impl SignerRegistry {
    /// Validate and build a registry
    pub fn new(
        quorum: u32,
        signers: impl IntoIterator<Item = Address>,
    ) -> Result<Self, ApprovalError> {
        let signers: Vec<Address> = signers.into_iter().collect();
        let mut members = HashSet::with_capacity(signers.len());

        for signer in &signers {
            if signer.is_zero() {
                return Err(ApprovalError::invalid_configuration(
                    "zero address cannot be a signer",
                ));
            }
            if !members.insert(*signer) {
                return Err(ApprovalError::invalid_configuration(format!(
                    "duplicate signer {}",
                    signer
                )));
            }
        }

        if signers.len() < MIN_SIGNERS {
            return Err(ApprovalError::invalid_configuration(format!(
                "at least {} signers required, got {}",
                MIN_SIGNERS,
                signers.len()
            )));
        }

        if !quorum_fits(quorum, signers.len()) {
            return Err(ApprovalError::invalid_configuration(format!(
                "quorum {} must be between 1 and {}",
                quorum,
                signers.len()
            )));
        }

        Ok(Self {
            signers,
            members,
            quorum,
        })
    }

    pub fn is_valid_signer(&self, account: &Address) -> bool {
        self.members.contains(account)
    }

    /// `Unauthorized` unless `account` is a signer
    pub fn ensure_signer(&self, account: &Address) -> Result<(), ApprovalError> {
        if self.is_valid_signer(account) {
            Ok(())
        } else {
            Err(ApprovalError::Unauthorized(*account))
        }
    }

    pub fn quorum(&self) -> u32 {
        self.quorum
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    /// Replace the quorum. Returns the previous value.
    ///
    /// Applies to every later approval evaluation, including transactions
    /// proposed before the change.
    pub fn update_quorum(&mut self, caller: &Address, new_quorum: u32) -> Result<u32, ApprovalError> {
        self.ensure_signer(caller)?;

        if !quorum_fits(new_quorum, self.signers.len()) {
            return Err(ApprovalError::InvalidQuorum {
                quorum: new_quorum,
                signers: self.signers.len(),
            });
        }

        Ok(std::mem::replace(&mut self.quorum, new_quorum))
    }
}

fn quorum_fits(quorum: u32, signers: usize) -> bool {
    quorum >= 1 && (quorum as usize) <= signers
}
