// 9.2 custody.rs: the interactions step. moves tokens between wallets and escrow vaults.
// the engine only calls transfer after every check passed and the post-state is staged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Amount, Identity, TokenMint};

/// Something that can hold tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Holder {
    /// A user or service wallet.
    Wallet(Identity),
    /// The token vault backing the escrow of this owner.
    Vault(Identity),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustodyError {
    #[error("Insufficient funds in {holder:?}: available {available}, requested {requested}")]
    InsufficientFunds {
        holder: Holder,
        available: Amount,
        requested: Amount,
    },

    #[error("Balance overflow crediting {0:?}")]
    Overflow(Holder),

    #[error("Transfer rejected: {reason}")]
    Rejected { reason: String },
}

// Port to whatever actually moves tokens. Implement this for the real token program.
pub trait TokenCustody {
    fn balance_of(&self, holder: Holder, mint: TokenMint) -> Amount;

    // Debit `from` and credit `to`, both or neither.
    fn transfer(
        &mut self,
        from: Holder,
        to: Holder,
        mint: TokenMint,
        amount: Amount,
    ) -> Result<(), CustodyError>;
}

/// In-memory token balances for simulations and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCustody {
    balances: HashMap<(Holder, Identity), Amount>,
    transfer_count: u64,
    // set to make the next transfer fail, for exercising rollback
    fail_next: Option<String>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit tokens out of thin air (faucet / airdrop).
    pub fn mint_to(&mut self, holder: Holder, mint: TokenMint, amount: Amount) -> Result<(), CustodyError> {
        let entry = self.balances.entry((holder, mint.id)).or_default();
        *entry = entry.checked_add(amount).ok_or(CustodyError::Overflow(holder))?;
        Ok(())
    }

    pub fn fail_next_transfer(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    pub fn transfer_count(&self) -> u64 {
        self.transfer_count
    }
}

impl TokenCustody for InMemoryCustody {
    fn balance_of(&self, holder: Holder, mint: TokenMint) -> Amount {
        self.balances
            .get(&(holder, mint.id))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn transfer(
        &mut self,
        from: Holder,
        to: Holder,
        mint: TokenMint,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        if let Some(reason) = self.fail_next.take() {
            return Err(CustodyError::Rejected { reason });
        }

        let available = self.balance_of(from, mint);
        let debited = available
            .checked_sub(amount)
            .ok_or(CustodyError::InsufficientFunds {
                holder: from,
                available,
                requested: amount,
            })?;

        if from != to {
            let credited = self
                .balance_of(to, mint)
                .checked_add(amount)
                .ok_or(CustodyError::Overflow(to))?;
            self.balances.insert((from, mint.id), debited);
            self.balances.insert((to, mint.id), credited);
        }

        self.transfer_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Holder {
        Holder::Wallet(Identity::from_seed(1))
    }

    fn vault() -> Holder {
        Holder::Vault(Identity::from_seed(1))
    }

    #[test]
    fn test_transfer_moves_funds() {
        let mint = TokenMint::usdc();
        let mut custody = InMemoryCustody::new();
        custody.mint_to(alice(), mint, Amount::new(1000)).unwrap();

        custody.transfer(alice(), vault(), mint, Amount::new(400)).unwrap();
        assert_eq!(custody.balance_of(alice(), mint), Amount::new(600));
        assert_eq!(custody.balance_of(vault(), mint), Amount::new(400));
        assert_eq!(custody.transfer_count(), 1);
    }

    #[test]
    fn test_insufficient_funds_leaves_balances() {
        let mint = TokenMint::usdc();
        let mut custody = InMemoryCustody::new();
        custody.mint_to(alice(), mint, Amount::new(100)).unwrap();

        let result = custody.transfer(alice(), vault(), mint, Amount::new(101));
        assert!(matches!(result, Err(CustodyError::InsufficientFunds { .. })));
        assert_eq!(custody.balance_of(alice(), mint), Amount::new(100));
        assert_eq!(custody.balance_of(vault(), mint), Amount::ZERO);
    }

    #[test]
    fn test_mints_are_separate() {
        let usdc = TokenMint::usdc();
        let other = TokenMint::new(Identity::from_seed(99), 9);
        let mut custody = InMemoryCustody::new();
        custody.mint_to(alice(), usdc, Amount::new(100)).unwrap();
        assert_eq!(custody.balance_of(alice(), other), Amount::ZERO);
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let mint = TokenMint::usdc();
        let mut custody = InMemoryCustody::new();
        custody.mint_to(alice(), mint, Amount::new(100)).unwrap();
        custody.fail_next_transfer("token program down");

        let result = custody.transfer(alice(), vault(), mint, Amount::new(10));
        assert!(matches!(result, Err(CustodyError::Rejected { .. })));
        assert!(custody.transfer(alice(), vault(), mint, Amount::new(10)).is_ok());
    }
}
