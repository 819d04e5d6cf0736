//! Delegation and revocation of the platform and trading slots.

use super::core::EscrowEngine;
use super::results::{Receipt, Staged};
use crate::account::EscrowError;
use crate::authority::{AuthorityKind, AuthoritySlot};
use crate::custody::TokenCustody;
use crate::events::{AuthorityDelegatedEvent, AuthorityRevokedEvent, EventPayload};
use crate::types::Identity;

impl<C: TokenCustody> EscrowEngine<C> {
    /// Arm a slot. The delegate can't spend until the time-lock elapses.
    pub fn delegate(
        &mut self,
        escrow: Identity,
        signer: Identity,
        kind: AuthorityKind,
        authority: Identity,
    ) -> Result<Receipt, EscrowError> {
        let staged = self.stage_delegate(escrow, signer, kind, authority);
        self.finish("delegate", signer, staged)
    }

    /// Empty a slot immediately. Applies to instructions evaluated after this one.
    pub fn revoke(
        &mut self,
        escrow: Identity,
        signer: Identity,
        kind: AuthorityKind,
    ) -> Result<Receipt, EscrowError> {
        let staged = self.stage_revoke(escrow, signer, kind);
        self.finish("revoke", signer, staged)
    }

    fn stage_delegate(
        &self,
        escrow: Identity,
        signer: Identity,
        kind: AuthorityKind,
        authority: Identity,
    ) -> Result<Staged, EscrowError> {
        let now = self.time();
        let current = self.escrow(escrow)?;
        current.ensure_open()?;
        current.ensure_owner(signer)?;
        current.ensure_active()?;

        if current.is_expired(now) {
            return Err(EscrowError::EscrowExpired);
        }
        if authority.is_default() || authority == current.owner {
            return Err(EscrowError::InvalidAuthority);
        }
        if !current.slot(kind).is_empty() {
            return Err(EscrowError::AlreadyDelegated(kind));
        }

        let mut account = current.clone();
        *account.slot_mut(kind) = AuthoritySlot::Delegated {
            authority,
            activated_at: now,
        };

        Ok(Staged::new(
            account,
            EventPayload::AuthorityDelegated(AuthorityDelegatedEvent {
                kind,
                authority,
                usable_at: now.plus(self.limits().min_authority_age),
            }),
        ))
    }

    fn stage_revoke(
        &self,
        escrow: Identity,
        signer: Identity,
        kind: AuthorityKind,
    ) -> Result<Staged, EscrowError> {
        let current = self.escrow(escrow)?;
        current.ensure_open()?;
        current.ensure_owner(signer)?;
        current.ensure_active()?;

        let authority = current
            .slot(kind)
            .authority()
            .ok_or(EscrowError::AuthorityAbsent(kind))?;

        let mut account = current.clone();
        *account.slot_mut(kind) = AuthoritySlot::Empty;

        Ok(Staged::new(
            account,
            EventPayload::AuthorityRevoked(AuthorityRevokedEvent { kind, authority }),
        ))
    }
}
