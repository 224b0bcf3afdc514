//! Approval outcomes

use multisig_ledger::TransferError;

/// What happened after a vote was recorded (or an execution retried)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Vote recorded, quorum not reached yet
    Pending { approval_count: u32, quorum: u32 },

    /// Quorum reached and the transfer went through; the record is completed
    Executed { approval_count: u32 },

    /// Quorum reached but the transfer failed; the vote stands and the
    /// record stays pending until a later approval or retry succeeds
    ExecutionDeferred {
        approval_count: u32,
        reason: TransferError,
    },
}

impl ApprovalOutcome {
    pub fn approval_count(&self) -> u32 {
        match self {
            ApprovalOutcome::Pending { approval_count, .. }
            | ApprovalOutcome::Executed { approval_count }
            | ApprovalOutcome::ExecutionDeferred { approval_count, .. } => *approval_count,
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, ApprovalOutcome::Executed { .. })
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, ApprovalOutcome::ExecutionDeferred { .. })
    }
}
