//! Funds movement: deposit, owner withdrawals, fee and trade withdrawals.
//!
//! Every operation validates everything first, then builds the post-state on
//! a copy of the record, and only then hands the transfer to custody. The
//! copy is committed after the transfer succeeds.

use super::core::EscrowEngine;
use super::results::{Receipt, Staged};
use crate::account::{EscrowAccount, EscrowError, LimitKind, Role};
use crate::authority::AuthorityKind;
use crate::custody::{Holder, TokenCustody};
use crate::events::{BalanceChangeEvent, EventPayload};
use crate::types::{Amount, Identity, Timestamp};

impl<C: TokenCustody> EscrowEngine<C> {
    /// Owner moves tokens from their wallet into the escrow.
    pub fn deposit(&mut self, escrow: Identity, signer: Identity, amount: Amount) -> Result<Receipt, EscrowError> {
        let staged = self.stage_deposit(escrow, signer, amount);
        self.finish("deposit", signer, staged)
    }

    /// Owner withdrawal. Only while no authority is delegated.
    pub fn withdraw(&mut self, escrow: Identity, signer: Identity, amount: Amount) -> Result<Receipt, EscrowError> {
        let staged = self.stage_owner_withdraw(escrow, signer, amount, false);
        self.finish("withdraw", signer, staged)
    }

    /// Owner withdrawal that only works while paused.
    pub fn emergency_withdraw(
        &mut self,
        escrow: Identity,
        signer: Identity,
        amount: Amount,
    ) -> Result<Receipt, EscrowError> {
        let staged = self.stage_owner_withdraw(escrow, signer, amount, true);
        self.finish("emergency_withdraw", signer, staged)
    }

    /// Platform authority collects a subscription fee.
    pub fn platform_fee_withdraw(
        &mut self,
        escrow: Identity,
        signer: Identity,
        amount: Amount,
        nonce: u64,
    ) -> Result<Receipt, EscrowError> {
        let staged = self.stage_fee_withdraw(escrow, signer, amount, nonce);
        self.finish("platform_fee_withdraw", signer, staged)
    }

    /// Trading authority pulls funds for one trade, valid until `deadline`.
    pub fn trade_withdraw(
        &mut self,
        escrow: Identity,
        signer: Identity,
        amount: Amount,
        nonce: u64,
        deadline: Timestamp,
    ) -> Result<Receipt, EscrowError> {
        let staged = self.stage_trade_withdraw(escrow, signer, amount, nonce, deadline);
        self.finish("trade_withdraw", signer, staged)
    }

    fn stage_deposit(&self, escrow: Identity, signer: Identity, amount: Amount) -> Result<Staged, EscrowError> {
        // CHECKS
        let current = self.escrow(escrow)?;
        current.ensure_open()?;
        current.ensure_owner(signer)?;
        current.ensure_active()?;
        ensure_positive(amount)?;
        if current.is_expired(self.time()) {
            return Err(EscrowError::EscrowExpired);
        }

        let new_balance = current
            .balance
            .checked_add(amount)
            .ok_or(EscrowError::MathOverflow)?;
        if new_balance > current.max_balance {
            return Err(EscrowError::LimitExceeded {
                limit: LimitKind::MaxBalance,
                requested: amount,
                cap: current.max_balance,
            });
        }

        let new_total = current
            .total_deposited
            .checked_add(amount)
            .ok_or(EscrowError::MathOverflow)?;
        if let Some(cap) = current.lifetime_limits.deposits {
            if new_total > cap {
                return Err(EscrowError::LimitExceeded {
                    limit: LimitKind::LifetimeDeposits,
                    requested: amount,
                    cap,
                });
            }
        }

        // EFFECTS
        let mut account = current.clone();
        account.balance = new_balance;
        account.total_deposited = new_total;

        let payload = EventPayload::Deposit(BalanceChangeEvent {
            amount,
            new_balance,
            counterparty: signer,
        });
        Ok(Staged::new(account, payload).with_transfer(Holder::Wallet(signer), Holder::Vault(escrow), amount))
    }

    fn stage_owner_withdraw(
        &self,
        escrow: Identity,
        signer: Identity,
        amount: Amount,
        emergency: bool,
    ) -> Result<Staged, EscrowError> {
        // CHECKS
        let current = self.escrow(escrow)?;
        current.ensure_open()?;
        current.ensure_owner(signer)?;
        if emergency {
            if !current.is_paused() {
                return Err(EscrowError::AccountNotPaused);
            }
        } else {
            current.ensure_active()?;
        }
        ensure_positive(amount)?;
        if current.has_active_authority() {
            return Err(EscrowError::AuthoritiesActive);
        }
        let new_balance = debit(current, amount)?;

        // EFFECTS
        let mut account = current.clone();
        account.balance = new_balance;
        account.total_withdrawn = account
            .total_withdrawn
            .checked_add(amount)
            .ok_or(EscrowError::MathOverflow)?;

        let change = BalanceChangeEvent {
            amount,
            new_balance,
            counterparty: signer,
        };
        let payload = if emergency {
            EventPayload::EmergencyWithdrawal(change)
        } else {
            EventPayload::Withdrawal(change)
        };
        Ok(Staged::new(account, payload).with_transfer(Holder::Vault(escrow), Holder::Wallet(signer), amount))
    }

    fn stage_fee_withdraw(
        &self,
        escrow: Identity,
        signer: Identity,
        amount: Amount,
        nonce: u64,
    ) -> Result<Staged, EscrowError> {
        let limits = self.limits();

        // CHECKS
        let current = self.escrow(escrow)?;
        self.ensure_authority_may_spend(current, AuthorityKind::Platform, signer, amount, nonce)?;
        if amount > limits.max_subscription_fee {
            return Err(EscrowError::LimitExceeded {
                limit: LimitKind::SubscriptionFee,
                requested: amount,
                cap: limits.max_subscription_fee,
            });
        }
        let new_balance = debit(current, amount)?;

        // EFFECTS
        let mut account = current.clone();
        account.balance = new_balance;
        account.total_fees_paid = account
            .total_fees_paid
            .checked_add(amount)
            .ok_or(EscrowError::MathOverflow)?;
        account.consume_nonce()?;

        let payload = EventPayload::SubscriptionFee(BalanceChangeEvent {
            amount,
            new_balance,
            counterparty: signer,
        });
        Ok(Staged::new(account, payload).with_transfer(Holder::Vault(escrow), Holder::Wallet(signer), amount))
    }

    fn stage_trade_withdraw(
        &self,
        escrow: Identity,
        signer: Identity,
        amount: Amount,
        nonce: u64,
        deadline: Timestamp,
    ) -> Result<Staged, EscrowError> {
        let limits = self.limits();
        let now = self.time();

        // CHECKS
        let current = self.escrow(escrow)?;
        self.ensure_authority_may_spend(current, AuthorityKind::Trading, signer, amount, nonce)?;
        if now > deadline {
            return Err(EscrowError::DeadlineExceeded { deadline, now });
        }
        if amount > limits.max_transaction_amount {
            return Err(EscrowError::LimitExceeded {
                limit: LimitKind::TransactionAmount,
                requested: amount,
                cap: limits.max_transaction_amount,
            });
        }

        let new_total = current
            .total_traded
            .checked_add(amount)
            .ok_or(EscrowError::MathOverflow)?;
        if let Some(cap) = current.lifetime_limits.traded {
            if new_total > cap {
                return Err(EscrowError::LimitExceeded {
                    limit: LimitKind::LifetimeTraded,
                    requested: amount,
                    cap,
                });
            }
        }
        let new_balance = debit(current, amount)?;

        // EFFECTS
        let mut account = current.clone();
        account.balance = new_balance;
        account.total_traded = new_total;
        account.consume_nonce()?;

        let payload = EventPayload::TradeWithdrawal(BalanceChangeEvent {
            amount,
            new_balance,
            counterparty: signer,
        });
        Ok(Staged::new(account, payload).with_transfer(Holder::Vault(escrow), Holder::Wallet(signer), amount))
    }

    // shared gate for both delegated withdrawals, in a fixed order.
    // pause wins over every slot or signer mismatch
    fn ensure_authority_may_spend(
        &self,
        account: &EscrowAccount,
        kind: AuthorityKind,
        signer: Identity,
        amount: Amount,
        nonce: u64,
    ) -> Result<(), EscrowError> {
        account.ensure_open()?;
        account.ensure_active()?;
        let slot = account.slot(kind);
        match slot.authority() {
            None => return Err(EscrowError::AuthorityAbsent(kind)),
            Some(authority) if authority != signer => {
                return Err(EscrowError::Unauthorized {
                    signer,
                    required: Role::Authority(kind),
                })
            }
            Some(_) => {}
        }
        ensure_positive(amount)?;
        account.ensure_mature_authority(kind, signer, self.time(), self.limits().min_authority_age)?;
        account.verify_nonce(nonce)
    }
}

fn ensure_positive(amount: Amount) -> Result<(), EscrowError> {
    if amount.is_zero() {
        return Err(EscrowError::InvalidAmount);
    }
    Ok(())
}

fn debit(account: &EscrowAccount, amount: Amount) -> Result<Amount, EscrowError> {
    account
        .balance
        .checked_sub(amount)
        .ok_or(EscrowError::InsufficientBalance {
            requested: amount,
            available: account.balance,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::LifetimeLimits;
    use crate::custody::InMemoryCustody;
    use crate::engine::EngineConfig;
    use crate::types::TokenMint;

    fn owner() -> Identity {
        Identity::from_seed(1)
    }

    fn platform() -> Identity {
        Identity::from_seed(100)
    }

    fn trader() -> Identity {
        Identity::from_seed(200)
    }

    fn setup(max_balance: u64, wallet: u64) -> EscrowEngine {
        let mut engine = EscrowEngine::new(EngineConfig::default());
        engine
            .custody_mut()
            .mint_to(Holder::Wallet(owner()), TokenMint::usdc(), Amount::new(wallet))
            .unwrap();
        engine
            .initialize(owner(), TokenMint::usdc(), Amount::new(max_balance), LifetimeLimits::unlimited())
            .unwrap();
        engine
    }

    fn wallet_balance(engine: &EscrowEngine<InMemoryCustody>, who: Identity) -> Amount {
        engine.custody().balance_of(Holder::Wallet(who), TokenMint::usdc())
    }

    #[test]
    fn deposit_moves_tokens_into_vault() {
        let mut engine = setup(1000, 5000);
        let receipt = engine.deposit(owner(), owner(), Amount::new(700)).unwrap();

        assert_eq!(receipt.balance, Amount::new(700));
        assert_eq!(wallet_balance(&engine, owner()), Amount::new(4300));
        assert!(engine.reconcile(owner()).unwrap());
        let escrow = engine.get_escrow(owner()).unwrap();
        assert_eq!(escrow.total_deposited, Amount::new(700));
        // owner operations leave the nonce alone
        assert_eq!(escrow.action_nonce, 0);
    }

    #[test]
    fn deposit_zero_rejected() {
        let mut engine = setup(1000, 5000);
        assert_eq!(engine.deposit(owner(), owner(), Amount::ZERO), Err(EscrowError::InvalidAmount));
    }

    #[test]
    fn deposit_by_stranger_rejected() {
        let mut engine = setup(1000, 5000);
        assert!(matches!(
            engine.deposit(owner(), platform(), Amount::new(10)),
            Err(EscrowError::Unauthorized { .. })
        ));
    }

    #[test]
    fn deposit_without_wallet_funds_rolls_back() {
        let mut engine = setup(10_000, 100);
        let result = engine.deposit(owner(), owner(), Amount::new(500));
        assert!(matches!(result, Err(EscrowError::Custody(_))));

        let escrow = engine.get_escrow(owner()).unwrap();
        assert_eq!(escrow.balance, Amount::ZERO);
        assert_eq!(escrow.total_deposited, Amount::ZERO);
        // only the initialize event
        assert_eq!(engine.events().len(), 1);
    }

    #[test]
    fn lifetime_deposit_cap_independent_of_balance() {
        let mut engine = EscrowEngine::new(EngineConfig::default());
        engine
            .custody_mut()
            .mint_to(Holder::Wallet(owner()), TokenMint::usdc(), Amount::new(10_000))
            .unwrap();
        let limits = LifetimeLimits {
            deposits: Some(Amount::new(1500)),
            traded: None,
        };
        engine
            .initialize(owner(), TokenMint::usdc(), Amount::new(1000), limits)
            .unwrap();

        engine.deposit(owner(), owner(), Amount::new(1000)).unwrap();
        engine.withdraw(owner(), owner(), Amount::new(1000)).unwrap();
        engine.deposit(owner(), owner(), Amount::new(500)).unwrap();

        // balance is only 500, but lifetime deposits would hit 1600
        assert!(matches!(
            engine.deposit(owner(), owner(), Amount::new(100)),
            Err(EscrowError::LimitExceeded { limit: LimitKind::LifetimeDeposits, .. })
        ));
    }

    #[test]
    fn withdraw_blocked_by_any_authority() {
        let mut engine = setup(1000, 1000);
        engine.deposit(owner(), owner(), Amount::new(500)).unwrap();
        engine.delegate(owner(), owner(), AuthorityKind::Platform, platform()).unwrap();

        assert_eq!(
            engine.withdraw(owner(), owner(), Amount::new(100)),
            Err(EscrowError::AuthoritiesActive)
        );

        engine.revoke(owner(), owner(), AuthorityKind::Platform).unwrap();
        engine.withdraw(owner(), owner(), Amount::new(100)).unwrap();
        assert_eq!(engine.get_escrow(owner()).unwrap().balance, Amount::new(400));
        assert_eq!(wallet_balance(&engine, owner()), Amount::new(600));
    }

    #[test]
    fn withdraw_more_than_balance() {
        let mut engine = setup(1000, 1000);
        engine.deposit(owner(), owner(), Amount::new(300)).unwrap();
        assert_eq!(
            engine.withdraw(owner(), owner(), Amount::new(301)),
            Err(EscrowError::InsufficientBalance {
                requested: Amount::new(301),
                available: Amount::new(300),
            })
        );
    }

    #[test]
    fn emergency_withdraw_needs_pause() {
        let mut engine = setup(1000, 1000);
        engine.deposit(owner(), owner(), Amount::new(300)).unwrap();
        assert_eq!(
            engine.emergency_withdraw(owner(), owner(), Amount::new(100)),
            Err(EscrowError::AccountNotPaused)
        );

        engine.pause(owner(), owner()).unwrap();
        engine.emergency_withdraw(owner(), owner(), Amount::new(300)).unwrap();
        let escrow = engine.get_escrow(owner()).unwrap();
        assert_eq!(escrow.balance, Amount::ZERO);
        assert_eq!(escrow.total_withdrawn, Amount::new(300));
        assert!(matches!(
            engine.recent_events(1)[0].payload,
            EventPayload::EmergencyWithdrawal(_)
        ));
    }

    #[test]
    fn fee_withdraw_flow() {
        let mut engine = setup(1_000_000_000, 1_000_000_000);
        engine.deposit(owner(), owner(), Amount::new(500_000_000)).unwrap();
        engine.delegate(owner(), owner(), AuthorityKind::Platform, platform()).unwrap();
        engine.advance_time(300);

        let receipt = engine
            .platform_fee_withdraw(owner(), platform(), Amount::new(10_000_000), 0)
            .unwrap();
        assert_eq!(receipt.action_nonce, 1);
        assert_eq!(wallet_balance(&engine, platform()), Amount::new(10_000_000));

        let escrow = engine.get_escrow(owner()).unwrap();
        assert_eq!(escrow.total_fees_paid, Amount::new(10_000_000));
        assert!(escrow.check_invariants().is_ok());
    }

    #[test]
    fn fee_cap_enforced() {
        let mut engine = setup(0, 5_000_000_000);
        engine.deposit(owner(), owner(), Amount::new(5_000_000_000)).unwrap();
        engine.delegate(owner(), owner(), AuthorityKind::Platform, platform()).unwrap();
        engine.advance_time(300);

        let cap = engine.limits().max_subscription_fee;
        assert!(matches!(
            engine.platform_fee_withdraw(owner(), platform(), Amount::new(cap.units() + 1), 0),
            Err(EscrowError::LimitExceeded { limit: LimitKind::SubscriptionFee, .. })
        ));
        assert!(engine.platform_fee_withdraw(owner(), platform(), cap, 0).is_ok());
    }

    #[test]
    fn trading_signer_cannot_collect_fees() {
        let mut engine = setup(1000, 1000);
        engine.deposit(owner(), owner(), Amount::new(1000)).unwrap();
        engine.delegate(owner(), owner(), AuthorityKind::Platform, platform()).unwrap();
        engine.delegate(owner(), owner(), AuthorityKind::Trading, trader()).unwrap();
        engine.advance_time(300);

        assert!(matches!(
            engine.platform_fee_withdraw(owner(), trader(), Amount::new(10), 0),
            Err(EscrowError::Unauthorized { .. })
        ));
        assert!(matches!(
            engine.trade_withdraw(owner(), platform(), Amount::new(10), 0, engine.time()),
            Err(EscrowError::Unauthorized { .. })
        ));
    }

    #[test]
    fn trade_without_delegate_is_absent() {
        let mut engine = setup(1000, 1000);
        assert_eq!(
            engine.trade_withdraw(owner(), trader(), Amount::new(10), 0, Timestamp::from_secs(100)),
            Err(EscrowError::AuthorityAbsent(AuthorityKind::Trading))
        );
    }

    #[test]
    fn trade_deadline_inclusive() {
        let mut engine = setup(1000, 1000);
        engine.deposit(owner(), owner(), Amount::new(1000)).unwrap();
        engine.delegate(owner(), owner(), AuthorityKind::Trading, trader()).unwrap();
        engine.set_time(Timestamp::from_secs(400));

        assert!(matches!(
            engine.trade_withdraw(owner(), trader(), Amount::new(10), 0, Timestamp::from_secs(399)),
            Err(EscrowError::DeadlineExceeded { .. })
        ));
        assert!(engine
            .trade_withdraw(owner(), trader(), Amount::new(10), 0, Timestamp::from_secs(400))
            .is_ok());
    }

    #[test]
    fn lifetime_trade_cap() {
        let mut engine = EscrowEngine::new(EngineConfig::default());
        engine
            .custody_mut()
            .mint_to(Holder::Wallet(owner()), TokenMint::usdc(), Amount::new(1000))
            .unwrap();
        let limits = LifetimeLimits {
            deposits: None,
            traded: Some(Amount::new(150)),
        };
        engine
            .initialize(owner(), TokenMint::usdc(), Amount::new(1000), limits)
            .unwrap();
        engine.deposit(owner(), owner(), Amount::new(1000)).unwrap();
        engine.delegate(owner(), owner(), AuthorityKind::Trading, trader()).unwrap();
        engine.advance_time(300);
        let deadline = engine.time().plus(60);

        engine.trade_withdraw(owner(), trader(), Amount::new(100), 0, deadline).unwrap();
        assert!(matches!(
            engine.trade_withdraw(owner(), trader(), Amount::new(51), 1, deadline),
            Err(EscrowError::LimitExceeded { limit: LimitKind::LifetimeTraded, .. })
        ));
        engine.trade_withdraw(owner(), trader(), Amount::new(50), 1, deadline).unwrap();
    }

    #[test]
    fn clock_far_behind_activation_keeps_lock() {
        let mut engine = setup(1000, 1000);
        engine.deposit(owner(), owner(), Amount::new(1000)).unwrap();
        engine.set_time(Timestamp::from_secs(1000));
        engine.delegate(owner(), owner(), AuthorityKind::Trading, trader()).unwrap();

        engine.set_time(Timestamp::from_secs(i64::MIN));
        assert!(matches!(
            engine.trade_withdraw(owner(), trader(), Amount::new(10), 0, Timestamp::from_secs(2000)),
            Err(EscrowError::AuthorityNotYetActive { remaining_secs: i64::MAX, .. })
        ));
        let escrow = engine.get_escrow(owner()).unwrap();
        assert_eq!(escrow.balance, Amount::new(1000));
        assert_eq!(escrow.action_nonce, 0);
    }

    #[test]
    fn pause_checked_before_slot_and_signer() {
        let mut engine = setup(1000, 1000);
        engine.deposit(owner(), owner(), Amount::new(1000)).unwrap();
        engine.delegate(owner(), owner(), AuthorityKind::Trading, trader()).unwrap();
        engine.advance_time(300);
        engine.pause(owner(), owner()).unwrap();

        // wrong signer on an armed slot
        assert_eq!(
            engine.trade_withdraw(owner(), platform(), Amount::new(10), 0, engine.time()),
            Err(EscrowError::AccountPaused)
        );
        // empty slot
        assert_eq!(
            engine.platform_fee_withdraw(owner(), platform(), Amount::new(10), 0),
            Err(EscrowError::AccountPaused)
        );
    }

    #[test]
    fn failed_transfer_keeps_nonce() {
        let mut engine = setup(1000, 1000);
        engine.deposit(owner(), owner(), Amount::new(1000)).unwrap();
        engine.delegate(owner(), owner(), AuthorityKind::Trading, trader()).unwrap();
        engine.advance_time(300);
        let deadline = engine.time().plus(60);

        engine.custody_mut().fail_next_transfer("destination frozen");
        assert!(matches!(
            engine.trade_withdraw(owner(), trader(), Amount::new(100), 0, deadline),
            Err(EscrowError::Custody(_))
        ));

        let escrow = engine.get_escrow(owner()).unwrap();
        assert_eq!(escrow.action_nonce, 0);
        assert_eq!(escrow.balance, Amount::new(1000));

        // same instruction goes through on retry
        engine.trade_withdraw(owner(), trader(), Amount::new(100), 0, deadline).unwrap();
    }
}
