// 11.0: every accepted transition produces exactly one event. monitoring reads these,
// nothing in the engine reads them back. rejected instructions produce none.

use crate::authority::AuthorityKind;
use crate::types::{Amount, Identity, Timestamp, TokenMint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    // escrows are keyed by owner
    pub escrow: Identity,
    // action nonce after the transition
    pub nonce: u64,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, escrow: Identity, nonce: u64, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            escrow,
            nonce,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Lifecycle events
    Initialized(InitializedEvent),
    Paused,
    Unpaused,
    LifetimeUpdated(LifetimeUpdatedEvent),
    Closed(ClosedEvent),

    // Authority events
    AuthorityDelegated(AuthorityDelegatedEvent),
    AuthorityRevoked(AuthorityRevokedEvent),

    // Funds events
    Deposit(BalanceChangeEvent),
    Withdrawal(BalanceChangeEvent),
    EmergencyWithdrawal(BalanceChangeEvent),
    SubscriptionFee(BalanceChangeEvent),
    TradeWithdrawal(BalanceChangeEvent),
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Initialized(_) => "initialized",
            EventPayload::Paused => "paused",
            EventPayload::Unpaused => "unpaused",
            EventPayload::LifetimeUpdated(_) => "lifetime_updated",
            EventPayload::Closed(_) => "closed",
            EventPayload::AuthorityDelegated(_) => "authority_delegated",
            EventPayload::AuthorityRevoked(_) => "authority_revoked",
            EventPayload::Deposit(_) => "deposit",
            EventPayload::Withdrawal(_) => "withdrawal",
            EventPayload::EmergencyWithdrawal(_) => "emergency_withdrawal",
            EventPayload::SubscriptionFee(_) => "subscription_fee",
            EventPayload::TradeWithdrawal(_) => "trade_withdrawal",
        }
    }

    /// Balance-change alerts subscribe to these.
    pub fn balance_change(&self) -> Option<&BalanceChangeEvent> {
        match self {
            EventPayload::Deposit(e)
            | EventPayload::Withdrawal(e)
            | EventPayload::EmergencyWithdrawal(e)
            | EventPayload::SubscriptionFee(e)
            | EventPayload::TradeWithdrawal(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_authority_change(&self) -> bool {
        matches!(
            self,
            EventPayload::AuthorityDelegated(_) | EventPayload::AuthorityRevoked(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedEvent {
    pub token_mint: TokenMint,
    pub max_balance: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChangeEvent {
    pub amount: Amount,
    pub new_balance: Amount,
    // wallet that received or supplied the tokens
    pub counterparty: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityDelegatedEvent {
    pub kind: AuthorityKind,
    pub authority: Identity,
    pub usable_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityRevokedEvent {
    pub kind: AuthorityKind,
    pub authority: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeUpdatedEvent {
    pub max_lifetime_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedEvent {
    pub dust_swept: Amount,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

/// Bounded append-only log. Ids keep increasing after old events are dropped.
#[derive(Debug)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCollector {
    pub fn new() -> Self {
        Self::with_capacity_limit(usize::MAX)
    }

    pub fn with_capacity_limit(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events: max_events.max(1),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    /// Events with id strictly greater than `after`, for polling subscribers.
    pub fn since(&self, after: EventId) -> &[Event] {
        let start = self.events.partition_point(|e| e.id <= after);
        &self.events[start..]
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn last_id(&self) -> Option<EventId> {
        self.events.last().map(|e| e.id)
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);

        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
