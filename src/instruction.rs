//! Typed instruction envelope.
//!
//! Off-chain services submit one of these plus the identity that signed it.
//! The ledger has already authenticated the signature; the engine only checks
//! that the signer is the identity the operation requires.

use crate::account::{LifetimeLimits, Role};
use crate::authority::AuthorityKind;
use crate::types::{Amount, Identity, Timestamp, TokenMint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    Initialize {
        token_mint: TokenMint,
        max_balance: Amount,
        #[serde(default)]
        lifetime_limits: LifetimeLimits,
    },
    Deposit {
        escrow: Identity,
        amount: Amount,
    },
    Withdraw {
        escrow: Identity,
        amount: Amount,
    },
    EmergencyWithdraw {
        escrow: Identity,
        amount: Amount,
    },
    PlatformFeeWithdraw {
        escrow: Identity,
        amount: Amount,
        nonce: u64,
    },
    TradeWithdraw {
        escrow: Identity,
        amount: Amount,
        nonce: u64,
        deadline: Timestamp,
    },
    Delegate {
        escrow: Identity,
        kind: AuthorityKind,
        authority: Identity,
    },
    Revoke {
        escrow: Identity,
        kind: AuthorityKind,
    },
    Pause {
        escrow: Identity,
    },
    Unpause {
        escrow: Identity,
    },
    SetMaxLifetime {
        escrow: Identity,
        secs: i64,
    },
    Close {
        escrow: Identity,
    },
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Initialize { .. } => "initialize",
            Instruction::Deposit { .. } => "deposit",
            Instruction::Withdraw { .. } => "withdraw",
            Instruction::EmergencyWithdraw { .. } => "emergency_withdraw",
            Instruction::PlatformFeeWithdraw { .. } => "platform_fee_withdraw",
            Instruction::TradeWithdraw { .. } => "trade_withdraw",
            Instruction::Delegate { .. } => "delegate",
            Instruction::Revoke { .. } => "revoke",
            Instruction::Pause { .. } => "pause",
            Instruction::Unpause { .. } => "unpause",
            Instruction::SetMaxLifetime { .. } => "set_max_lifetime",
            Instruction::Close { .. } => "close",
        }
    }

    /// The role that must sign this instruction.
    pub fn required_role(&self) -> Role {
        match self {
            Instruction::PlatformFeeWithdraw { .. } => Role::Authority(AuthorityKind::Platform),
            Instruction::TradeWithdraw { .. } => Role::Authority(AuthorityKind::Trading),
            _ => Role::Owner,
        }
    }

    /// Only authority-gated withdrawals carry and consume a nonce.
    pub fn nonce(&self) -> Option<u64> {
        match self {
            Instruction::PlatformFeeWithdraw { nonce, .. } | Instruction::TradeWithdraw { nonce, .. } => {
                Some(*nonce)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInstruction {
    pub signer: Identity,
    pub instruction: Instruction,
}

impl SignedInstruction {
    pub fn new(signer: Identity, instruction: Instruction) -> Self {
        Self { signer, instruction }
    }
}
