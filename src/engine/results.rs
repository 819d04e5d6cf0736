// 8.0.2: result types for engine operations.

use crate::account::EscrowAccount;
use crate::custody::Holder;
use crate::events::{EventId, EventPayload};
use crate::types::{Amount, Identity};
use serde::{Deserialize, Serialize};

/// Returned for every accepted instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub event_id: EventId,
    pub escrow: Identity,
    pub balance: Amount,
    pub action_nonce: u64,
}

// value movement performed after the post-state is staged
#[derive(Debug, Clone, Copy)]
pub(super) struct Transfer {
    pub from: Holder,
    pub to: Holder,
    pub amount: Amount,
}

// fully validated post-state, not yet visible to anyone
#[derive(Debug, Clone)]
pub(super) struct Staged {
    pub account: EscrowAccount,
    pub transfer: Option<Transfer>,
    pub payload: EventPayload,
}

impl Staged {
    pub fn new(account: EscrowAccount, payload: EventPayload) -> Self {
        Self {
            account,
            transfer: None,
            payload,
        }
    }

    pub fn with_transfer(mut self, from: Holder, to: Holder, amount: Amount) -> Self {
        self.transfer = Some(Transfer { from, to, amount });
        self
    }
}
