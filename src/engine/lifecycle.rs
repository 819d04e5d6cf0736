//! Lifecycle transitions: initialize, pause, unpause, lifetime, close.
//!
//! Active ⇄ Paused, either → Closed. Closed is terminal and the record is kept
//! as a tombstone so the owner key can never be reused for a fresh escrow.

use super::core::EscrowEngine;
use super::results::{Receipt, Staged};
use crate::account::{EscrowAccount, EscrowError, EscrowStatus, LifetimeLimits, LimitKind};
use crate::custody::{Holder, TokenCustody};
use crate::events::{ClosedEvent, EventPayload, InitializedEvent, LifetimeUpdatedEvent};
use crate::types::{Amount, Identity, TokenMint};

impl<C: TokenCustody> EscrowEngine<C> {
    /// Create the signer's escrow. `max_balance == 0` picks the deployment default.
    pub fn initialize(
        &mut self,
        owner: Identity,
        token_mint: TokenMint,
        max_balance: Amount,
        lifetime_limits: LifetimeLimits,
    ) -> Result<Receipt, EscrowError> {
        let staged = self.stage_initialize(owner, token_mint, max_balance, lifetime_limits);
        self.finish("initialize", owner, staged)
    }

    pub fn pause(&mut self, escrow: Identity, signer: Identity) -> Result<Receipt, EscrowError> {
        let staged = self.stage_pause(escrow, signer);
        self.finish("pause", signer, staged)
    }

    pub fn unpause(&mut self, escrow: Identity, signer: Identity) -> Result<Receipt, EscrowError> {
        let staged = self.stage_unpause(escrow, signer);
        self.finish("unpause", signer, staged)
    }

    /// Expire the escrow `secs` after creation. 0 removes the expiry.
    pub fn set_max_lifetime(
        &mut self,
        escrow: Identity,
        signer: Identity,
        secs: i64,
    ) -> Result<Receipt, EscrowError> {
        let staged = self.stage_set_max_lifetime(escrow, signer, secs);
        self.finish("set_max_lifetime", signer, staged)
    }

    /// Sweep dust to the owner and close for good.
    pub fn close(&mut self, escrow: Identity, signer: Identity) -> Result<Receipt, EscrowError> {
        let staged = self.stage_close(escrow, signer);
        self.finish("close", signer, staged)
    }

    fn stage_initialize(
        &self,
        owner: Identity,
        token_mint: TokenMint,
        max_balance: Amount,
        lifetime_limits: LifetimeLimits,
    ) -> Result<Staged, EscrowError> {
        let limits = self.limits();

        if self.escrows.contains_key(&owner) {
            return Err(EscrowError::AlreadyInitialized(owner));
        }
        if !limits.accepts_decimals(token_mint.decimals) {
            return Err(EscrowError::InvalidTokenDecimals(token_mint.decimals));
        }
        if max_balance > limits.max_allowed_balance {
            return Err(EscrowError::LimitExceeded {
                limit: LimitKind::AllowedBalance,
                requested: max_balance,
                cap: limits.max_allowed_balance,
            });
        }

        let max_balance = if max_balance.is_zero() {
            limits.default_max_balance
        } else {
            max_balance
        };

        let account = EscrowAccount::new(owner, token_mint, max_balance, lifetime_limits, self.time());
        Ok(Staged::new(
            account,
            EventPayload::Initialized(InitializedEvent {
                token_mint,
                max_balance,
            }),
        ))
    }

    fn stage_pause(&self, escrow: Identity, signer: Identity) -> Result<Staged, EscrowError> {
        let current = self.escrow(escrow)?;
        current.ensure_open()?;
        current.ensure_owner(signer)?;
        if current.is_paused() {
            return Err(EscrowError::AccountPaused);
        }

        let mut account = current.clone();
        account.status = EscrowStatus::Paused;
        account.last_paused_at = Some(self.time());
        Ok(Staged::new(account, EventPayload::Paused))
    }

    fn stage_unpause(&self, escrow: Identity, signer: Identity) -> Result<Staged, EscrowError> {
        let current = self.escrow(escrow)?;
        current.ensure_open()?;
        current.ensure_owner(signer)?;
        if !current.is_paused() {
            return Err(EscrowError::AccountNotPaused);
        }

        let remaining_secs = current.cooldown_remaining(self.time(), self.limits().unpause_cooldown);
        if remaining_secs > 0 {
            return Err(EscrowError::CooldownActive { remaining_secs });
        }

        let mut account = current.clone();
        account.status = EscrowStatus::Active;
        Ok(Staged::new(account, EventPayload::Unpaused))
    }

    fn stage_set_max_lifetime(
        &self,
        escrow: Identity,
        signer: Identity,
        secs: i64,
    ) -> Result<Staged, EscrowError> {
        let current = self.escrow(escrow)?;
        current.ensure_open()?;
        current.ensure_owner(signer)?;
        current.ensure_active()?;
        if secs < 0 {
            return Err(EscrowError::InvalidLifetime(secs));
        }

        let mut account = current.clone();
        account.max_lifetime = (secs > 0).then_some(secs);
        Ok(Staged::new(
            account,
            EventPayload::LifetimeUpdated(LifetimeUpdatedEvent {
                max_lifetime_secs: secs,
            }),
        ))
    }

    fn stage_close(&self, escrow: Identity, signer: Identity) -> Result<Staged, EscrowError> {
        let current = self.escrow(escrow)?;
        current.ensure_open()?;
        current.ensure_owner(signer)?;

        let authorities_active = current.has_active_authority();
        if current.balance > self.limits().dust_threshold || authorities_active {
            return Err(EscrowError::NotEmpty {
                balance: current.balance,
                authorities_active,
            });
        }

        let dust = current.balance;
        let mut account = current.clone();
        account.total_withdrawn = account
            .total_withdrawn
            .checked_add(dust)
            .ok_or(EscrowError::MathOverflow)?;
        account.balance = Amount::ZERO;
        account.status = EscrowStatus::Closed;

        let staged = Staged::new(account, EventPayload::Closed(ClosedEvent { dust_swept: dust }));
        if dust.is_zero() {
            Ok(staged)
        } else {
            Ok(staged.with_transfer(Holder::Vault(escrow), Holder::Wallet(current.owner), dust))
        }
    }
}
