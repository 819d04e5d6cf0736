//! Instruction dispatch onto the named operations.

use super::core::EscrowEngine;
use super::results::Receipt;
use crate::account::EscrowError;
use crate::custody::TokenCustody;
use crate::instruction::{Instruction, SignedInstruction};
use tracing::debug;

impl<C: TokenCustody> EscrowEngine<C> {
    /// Execute one signed instruction. All or nothing.
    pub fn execute(&mut self, signed: &SignedInstruction) -> Result<Receipt, EscrowError> {
        let signer = signed.signer;
        debug!(
            op = signed.instruction.name(),
            signer = %signer.short(),
            required = %signed.instruction.required_role(),
            "dispatching instruction"
        );
        match signed.instruction.clone() {
            Instruction::Initialize {
                token_mint,
                max_balance,
                lifetime_limits,
            } => self.initialize(signer, token_mint, max_balance, lifetime_limits),
            Instruction::Deposit { escrow, amount } => self.deposit(escrow, signer, amount),
            Instruction::Withdraw { escrow, amount } => self.withdraw(escrow, signer, amount),
            Instruction::EmergencyWithdraw { escrow, amount } => self.emergency_withdraw(escrow, signer, amount),
            Instruction::PlatformFeeWithdraw { escrow, amount, nonce } => {
                self.platform_fee_withdraw(escrow, signer, amount, nonce)
            }
            Instruction::TradeWithdraw {
                escrow,
                amount,
                nonce,
                deadline,
            } => self.trade_withdraw(escrow, signer, amount, nonce, deadline),
            Instruction::Delegate { escrow, kind, authority } => self.delegate(escrow, signer, kind, authority),
            Instruction::Revoke { escrow, kind } => self.revoke(escrow, signer, kind),
            Instruction::Pause { escrow } => self.pause(escrow, signer),
            Instruction::Unpause { escrow } => self.unpause(escrow, signer),
            Instruction::SetMaxLifetime { escrow, secs } => self.set_max_lifetime(escrow, signer, secs),
            Instruction::Close { escrow } => self.close(escrow, signer),
        }
    }

    /// Execute in order, stopping at the first rejection. Earlier instructions
    /// stay applied; each one is its own atomic unit.
    pub fn execute_batch(&mut self, batch: &[SignedInstruction]) -> Result<Vec<Receipt>, (usize, EscrowError)> {
        let mut receipts = Vec::with_capacity(batch.len());
        for (index, signed) in batch.iter().enumerate() {
            let receipt = self.execute(signed).map_err(|err| (index, err))?;
            receipts.push(receipt);
        }
        Ok(receipts)
    }
}
