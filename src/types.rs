// 1.0: all the primitives live here. identities, token amounts, timestamps, mints.
// each is a newtype so the compiler catches an owner key passed where a mint belongs.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte signer key. The all-zero key is the "unset" identity and never a valid delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(pub [u8; 32]);

impl Identity {
    pub const DEFAULT: Identity = Identity([0u8; 32]);

    /// Deterministic key for simulations and tests. Seed 0 is still non-default.
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&seed.to_le_bytes());
        bytes[31] = 0x01;
        Self(bytes)
    }

    pub fn is_default(&self) -> bool {
        self.0 == [0u8; 32]
    }

    // first 4 bytes in hex, enough to tell keys apart in logs
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

// 1.1: token amount in base units (e.g. 1 USDC = 1_000_000). never negative, so u64.
// all arithmetic is checked; callers turn None into MathOverflow / InsufficientBalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Amount(pub u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn new(units: u64) -> Self {
        Self(units)
    }

    pub fn units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    #[must_use]
    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Display value with the mint's decimals applied (1_500_000 @ 6 → 1.5).
    pub fn to_ui(&self, decimals: u8) -> Option<Decimal> {
        let mut value = Decimal::from(self.0);
        value.set_scale(u32::from(decimals)).ok()?;
        Some(value.normalize())
    }

    /// Parse a display value back into base units. Rejects negatives and
    /// anything finer than one base unit.
    pub fn from_ui(value: Decimal, decimals: u8) -> Option<Self> {
        if value.is_sign_negative() {
            return None;
        }
        let factor = 10u64.checked_pow(u32::from(decimals))?;
        let scaled = value.checked_mul(Decimal::from(factor))?;
        if !scaled.fract().is_zero() {
            return None;
        }
        scaled.to_u64().map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

// 1.2: unix timestamp in seconds, as the ledger clock reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    pub fn plus(&self, secs: i64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed from `earlier` to `self`. Negative if `earlier` is in the future.
    pub fn secs_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn to_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.0, 0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}s", self.0),
        }
    }
}

// 1.3: the fungible asset an escrow holds. fixed at initialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenMint {
    pub id: Identity,
    pub decimals: u8,
}

impl TokenMint {
    pub fn new(id: Identity, decimals: u8) -> Self {
        Self { id, decimals }
    }

    /// USDC-style 6 decimal mint for simulations.
    pub fn usdc() -> Self {
        Self::new(Identity::from_seed(0xC0FFEE), 6)
    }

    pub fn ui_amount(&self, amount: Amount) -> Option<Decimal> {
        amount.to_ui(self.decimals)
    }
}
