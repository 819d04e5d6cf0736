//! Delegated authority slots.
//!
//! An escrow has two slots, platform (recurring fees) and trading (strategy
//! execution). A slot is either empty or holds exactly one delegate plus the
//! time it was armed. The only way to change the occupant is revoke, then
//! delegate again, which re-arms the time-lock.

use crate::types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which delegation slot an instruction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityKind {
    /// Platform service, recurring subscription fees only.
    Platform,
    /// Trading service, strategy execution only.
    Trading,
}

impl AuthorityKind {
    pub const ALL: [AuthorityKind; 2] = [AuthorityKind::Platform, AuthorityKind::Trading];

    pub fn label(&self) -> &'static str {
        match self {
            AuthorityKind::Platform => "platform",
            AuthorityKind::Trading => "trading",
        }
    }
}

impl fmt::Display for AuthorityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthoritySlot {
    #[default]
    Empty,
    Delegated {
        authority: Identity,
        activated_at: Timestamp,
    },
}

impl AuthoritySlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, AuthoritySlot::Empty)
    }

    pub fn authority(&self) -> Option<Identity> {
        match self {
            AuthoritySlot::Empty => None,
            AuthoritySlot::Delegated { authority, .. } => Some(*authority),
        }
    }

    pub fn activated_at(&self) -> Option<Timestamp> {
        match self {
            AuthoritySlot::Empty => None,
            AuthoritySlot::Delegated { activated_at, .. } => Some(*activated_at),
        }
    }

    /// Seconds until the delegate may spend. `None` if the slot is empty,
    /// `Some(0)` once the lock has elapsed. Boundary is inclusive.
    pub fn lock_remaining(&self, now: Timestamp, min_age: i64) -> Option<i64> {
        let activated_at = self.activated_at()?;
        let age = now.secs_since(activated_at);
        Some(min_age.saturating_sub(age).max(0))
    }

    pub fn is_mature(&self, now: Timestamp, min_age: i64) -> bool {
        self.lock_remaining(now, min_age) == Some(0)
    }
}
