// 8.0 engine/core.rs: main engine. holds every escrow, the custody port, the event log.
// each instruction runs checks → staged effects → transfer → commit → event.

use super::config::EngineConfig;
use super::results::{Receipt, Staged};
use crate::account::{EscrowAccount, EscrowError};
use crate::config::{ConfigError, EscrowConfig};
use crate::custody::{Holder, InMemoryCustody, TokenCustody};
use crate::events::{Event, EventCollector, EventEmitter, EventId, EventPayload};
use crate::types::{Identity, Timestamp};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/** 8.1: main engine struct. owns escrow records and the event log; token balances sit behind the custody port */
#[derive(Debug)]
pub struct EscrowEngine<C: TokenCustody = InMemoryCustody> {
    pub(super) config: EngineConfig,
    pub(super) escrows: HashMap<Identity, EscrowAccount>,
    pub(super) custody: C,
    pub(super) events: EventCollector,
    pub(super) current_time: Timestamp,
}

impl EscrowEngine<InMemoryCustody> {
    /// Unchecked constructor. Deployments should go through `try_new`.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_custody(config, InMemoryCustody::new())
    }

    pub fn try_new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::try_with_custody(config, InMemoryCustody::new())
    }
}

impl<C: TokenCustody> EscrowEngine<C> {
    /// Rejects inconsistent limits, e.g. a negative time-lock that would
    /// make every delegate immediately usable.
    pub fn try_with_custody(config: EngineConfig, custody: C) -> Result<Self, ConfigError> {
        if let Err(err) = config.validate() {
            warn!(error = %err, "engine config rejected");
            return Err(err);
        }
        Ok(Self::with_custody(config, custody))
    }

    pub fn with_custody(config: EngineConfig, custody: C) -> Self {
        let events = EventCollector::with_capacity_limit(config.max_events);
        Self {
            config,
            escrows: HashMap::new(),
            custody,
            events,
            current_time: Timestamp::from_secs(0),
        }
    }

    pub fn limits(&self) -> &EscrowConfig {
        &self.config.limits
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: i64) {
        self.current_time = self.current_time.plus(secs);
    }

    pub fn get_escrow(&self, owner: Identity) -> Option<&EscrowAccount> {
        self.escrows.get(&owner)
    }

    pub fn escrows_iter(&self) -> impl Iterator<Item = (&Identity, &EscrowAccount)> {
        self.escrows.iter()
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    /// True when the stored balance matches what the vault actually holds.
    pub fn reconcile(&self, owner: Identity) -> Result<bool, EscrowError> {
        let escrow = self.escrow(owner)?;
        let held = self.custody.balance_of(Holder::Vault(owner), escrow.token_mint);
        Ok(held == escrow.balance)
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.events.recent(count)
    }

    pub fn events_since(&self, after: EventId) -> &[Event] {
        self.events.since(after)
    }

    pub(super) fn escrow(&self, owner: Identity) -> Result<&EscrowAccount, EscrowError> {
        self.escrows
            .get(&owner)
            .ok_or(EscrowError::EscrowNotFound(owner))
    }

    /// Run the interaction for a staged transition and commit it. Nothing is
    /// written if staging or the transfer fails.
    pub(super) fn finish(
        &mut self,
        op: &'static str,
        signer: Identity,
        staged: Result<Staged, EscrowError>,
    ) -> Result<Receipt, EscrowError> {
        let staged = match staged {
            Ok(staged) => staged,
            Err(err) => return Err(rejected(op, signer, err)),
        };

        let mint = staged.account.token_mint;
        if let Some(transfer) = staged.transfer {
            if let Err(err) = self
                .custody
                .transfer(transfer.from, transfer.to, mint, transfer.amount)
            {
                return Err(rejected(op, signer, err.into()));
            }
        }

        debug_assert!(
            staged.account.check_invariants().is_ok(),
            "invariant broken by {op}: {:?}",
            staged.account.check_invariants()
        );

        let owner = staged.account.owner;
        let nonce = staged.account.action_nonce;
        let balance = staged.account.balance;
        self.escrows.insert(owner, staged.account);

        let event_id = self.emit_event(owner, nonce, staged.payload);
        info!(
            op,
            escrow = %owner.short(),
            nonce,
            balance = %balance,
            "transition applied"
        );

        Ok(Receipt {
            event_id,
            escrow: owner,
            balance,
            action_nonce: nonce,
        })
    }

    fn emit_event(&mut self, escrow: Identity, nonce: u64, payload: EventPayload) -> EventId {
        let id = self.events.next_id();
        let event = Event::new(id, self.current_time, escrow, nonce, payload);
        debug!(event = id.0, kind = event.payload.kind(), escrow = %escrow.short(), "event emitted");
        self.events.emit(event);
        id
    }
}

fn rejected(op: &'static str, signer: Identity, err: EscrowError) -> EscrowError {
    warn!(op, signer = %signer.short(), error = %err, "instruction rejected");
    err
}
