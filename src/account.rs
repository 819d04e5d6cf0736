//! Escrow account record and its invariants.
//!
//! One escrow per owner. The record is fixed-size: no collections, two
//! authority slots, a status, limits and monotonic counters. Funds only move
//! through the engine's named operations; this module holds the record, the
//! predicates those operations gate on, and the error taxonomy.

use crate::authority::{AuthorityKind, AuthoritySlot};
use crate::custody::CustodyError;
use crate::types::{Amount, Identity, Timestamp, TokenMint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EscrowStatus {
    #[default]
    Active,
    Paused,
    Closed,
}

/// Optional cumulative caps, independent of each other and of `max_balance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LifetimeLimits {
    /// Caps `total_deposited`.
    pub deposits: Option<Amount>,
    /// Caps `total_traded`.
    pub traded: Option<Amount>,
}

impl LifetimeLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAccount {
    pub owner: Identity,
    pub token_mint: TokenMint,
    pub platform: AuthoritySlot,
    pub trading: AuthoritySlot,
    pub status: EscrowStatus,
    pub balance: Amount,
    pub max_balance: Amount,
    pub lifetime_limits: LifetimeLimits,
    // seconds after created_at; None = never expires
    pub max_lifetime: Option<i64>,
    pub created_at: Timestamp,
    pub last_paused_at: Option<Timestamp>,
    pub action_nonce: u64,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    pub total_fees_paid: Amount,
    pub total_traded: Amount,
}

impl EscrowAccount {
    pub fn new(
        owner: Identity,
        token_mint: TokenMint,
        max_balance: Amount,
        lifetime_limits: LifetimeLimits,
        created_at: Timestamp,
    ) -> Self {
        Self {
            owner,
            token_mint,
            platform: AuthoritySlot::Empty,
            trading: AuthoritySlot::Empty,
            status: EscrowStatus::Active,
            balance: Amount::ZERO,
            max_balance,
            lifetime_limits,
            max_lifetime: None,
            created_at,
            last_paused_at: None,
            action_nonce: 0,
            total_deposited: Amount::ZERO,
            total_withdrawn: Amount::ZERO,
            total_fees_paid: Amount::ZERO,
            total_traded: Amount::ZERO,
        }
    }

    pub fn slot(&self, kind: AuthorityKind) -> &AuthoritySlot {
        match kind {
            AuthorityKind::Platform => &self.platform,
            AuthorityKind::Trading => &self.trading,
        }
    }

    pub fn slot_mut(&mut self, kind: AuthorityKind) -> &mut AuthoritySlot {
        match kind {
            AuthorityKind::Platform => &mut self.platform,
            AuthorityKind::Trading => &mut self.trading,
        }
    }

    // owner can't withdraw freely while either slot is occupied
    pub fn has_active_authority(&self) -> bool {
        !self.platform.is_empty() || !self.trading.is_empty()
    }

    pub fn is_paused(&self) -> bool {
        self.status == EscrowStatus::Paused
    }

    pub fn is_closed(&self) -> bool {
        self.status == EscrowStatus::Closed
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.max_lifetime {
            None | Some(0) => false,
            Some(lifetime) => now.secs_since(self.created_at) > lifetime,
        }
    }

    /// Seconds left before `unpause` is accepted; 0 when allowed.
    pub fn cooldown_remaining(&self, now: Timestamp, cooldown: i64) -> i64 {
        match self.last_paused_at {
            None => 0,
            Some(paused_at) => cooldown.saturating_sub(now.secs_since(paused_at)).max(0),
        }
    }

    /// Fails unless the escrow can still be touched at all.
    pub fn ensure_open(&self) -> Result<(), EscrowError> {
        if self.is_closed() {
            return Err(EscrowError::AccountClosed);
        }
        Ok(())
    }

    /// Fails unless the escrow is open and not paused.
    pub fn ensure_active(&self) -> Result<(), EscrowError> {
        self.ensure_open()?;
        if self.is_paused() {
            return Err(EscrowError::AccountPaused);
        }
        Ok(())
    }

    pub fn ensure_owner(&self, signer: Identity) -> Result<(), EscrowError> {
        if signer != self.owner {
            return Err(EscrowError::Unauthorized {
                signer,
                required: Role::Owner,
            });
        }
        Ok(())
    }

    /// Signer must occupy the slot and the slot's time-lock must have elapsed.
    pub fn ensure_mature_authority(
        &self,
        kind: AuthorityKind,
        signer: Identity,
        now: Timestamp,
        min_age: i64,
    ) -> Result<(), EscrowError> {
        let slot = self.slot(kind);
        let authority = slot.authority().ok_or(EscrowError::AuthorityAbsent(kind))?;
        if signer != authority {
            return Err(EscrowError::Unauthorized {
                signer,
                required: Role::Authority(kind),
            });
        }

        match slot.lock_remaining(now, min_age) {
            Some(0) => Ok(()),
            Some(remaining_secs) => Err(EscrowError::AuthorityNotYetActive {
                kind,
                remaining_secs,
            }),
            None => Err(EscrowError::AuthorityAbsent(kind)),
        }
    }

    /// Total that has left the escrow through any path.
    pub fn total_outflow(&self) -> u128 {
        u128::from(self.total_withdrawn.units())
            + u128::from(self.total_fees_paid.units())
            + u128::from(self.total_traded.units())
    }

    /// Balance bounds and the conservation law
    /// `deposited - withdrawn - fees - traded == balance`.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.balance > self.max_balance {
            return Err(InvariantViolation::BalanceAboveMax {
                balance: self.balance,
                max_balance: self.max_balance,
            });
        }

        let inflow = u128::from(self.total_deposited.units());
        let outflow = self.total_outflow();
        let expected = inflow.checked_sub(outflow);
        if expected != Some(u128::from(self.balance.units())) {
            return Err(InvariantViolation::Conservation {
                deposited: self.total_deposited,
                outflow,
                balance: self.balance,
            });
        }

        if self.is_closed() && (!self.balance.is_zero() || self.has_active_authority()) {
            return Err(InvariantViolation::ClosedNotEmpty);
        }

        Ok(())
    }
}

/// Who an operation requires as signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Authority(AuthorityKind),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => f.write_str("owner"),
            Role::Authority(kind) => write!(f, "{kind} authority"),
        }
    }
}

/// Which cap a `LimitExceeded` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitKind {
    /// Point-in-time balance cap of this escrow.
    MaxBalance,
    /// Deployment-wide ceiling on `max_balance` at initialize.
    AllowedBalance,
    SubscriptionFee,
    TransactionAmount,
    LifetimeDeposits,
    LifetimeTraded,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscrowError {
    #[error("No escrow for owner {0}")]
    EscrowNotFound(Identity),

    #[error("Escrow already initialized for owner {0}")]
    AlreadyInitialized(Identity),

    #[error("Unauthorized: {signer} is not the {required}")]
    Unauthorized { signer: Identity, required: Role },

    #[error("Invalid authority: cannot delegate to the default identity or the owner")]
    InvalidAuthority,

    #[error("{0} authority already delegated")]
    AlreadyDelegated(AuthorityKind),

    #[error("{0} authority not delegated")]
    AuthorityAbsent(AuthorityKind),

    #[error("{kind} authority not yet active: {remaining_secs}s of time-lock left")]
    AuthorityNotYetActive { kind: AuthorityKind, remaining_secs: i64 },

    #[error("Delegated authorities still active: revoke before withdrawing")]
    AuthoritiesActive,

    #[error("Stale nonce: expected {expected}, presented {presented}")]
    StaleNonce { expected: u64, presented: u64 },

    #[error("Deadline {deadline} passed at {now}")]
    DeadlineExceeded { deadline: Timestamp, now: Timestamp },

    #[error("Limit exceeded ({limit:?}): requested {requested}, cap {cap}")]
    LimitExceeded { limit: LimitKind, requested: Amount, cap: Amount },

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("Invalid amount: must be greater than 0")]
    InvalidAmount,

    #[error("Math overflow")]
    MathOverflow,

    #[error("Escrow paused")]
    AccountPaused,

    #[error("Escrow not paused")]
    AccountNotPaused,

    #[error("Unpause cooldown active: {remaining_secs}s left")]
    CooldownActive { remaining_secs: i64 },

    #[error("Escrow not empty: balance {balance}, authorities active: {authorities_active}")]
    NotEmpty { balance: Amount, authorities_active: bool },

    #[error("Escrow closed")]
    AccountClosed,

    #[error("Escrow expired")]
    EscrowExpired,

    #[error("Invalid lifetime {0}: must be non-negative")]
    InvalidLifetime(i64),

    #[error("Invalid token decimals {0}")]
    InvalidTokenDecimals(u8),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("Balance {balance} above max {max_balance}")]
    BalanceAboveMax { balance: Amount, max_balance: Amount },

    #[error("Conservation broken: deposited {deposited}, outflow {outflow}, balance {balance}")]
    Conservation { deposited: Amount, outflow: u128, balance: Amount },

    #[error("Closed escrow still holds funds or authorities")]
    ClosedNotEmpty,
}
