//! Stress tests
//!
//! Many escrows sharing the same platform and trading services, driven through
//! long billing and trading runs. The vaults must stay solvent and every
//! record must reconcile with custody at the end.

use escrow_core::*;
use rust_decimal_macros::dec;

fn usdc(units: u64) -> Amount {
    Amount::new(units * 1_000_000)
}

fn platform() -> Identity {
    Identity::from_seed(10_000)
}

fn trader() -> Identity {
    Identity::from_seed(20_000)
}

// owners with different deposit sizes, both services delegated at t=0
fn onboard(engine: &mut EscrowEngine, count: u64) -> Vec<Identity> {
    let mut owners = Vec::new();
    for i in 1..=count {
        let owner = Identity::from_seed(i);
        engine
            .custody_mut()
            .mint_to(Holder::Wallet(owner), TokenMint::usdc(), usdc(10_000))
            .unwrap();
        engine
            .initialize(owner, TokenMint::usdc(), usdc(10_000), LifetimeLimits::unlimited())
            .unwrap();
        engine.deposit(owner, owner, usdc(1_000 * i)).unwrap();
        engine
            .delegate(owner, owner, AuthorityKind::Platform, platform())
            .unwrap();
        engine
            .delegate(owner, owner, AuthorityKind::Trading, trader())
            .unwrap();
        owners.push(owner);
    }
    owners
}

mod billing_tests {
    use super::*;

    #[test]
    fn monthly_fees_until_escrows_run_dry() {
        let mut engine = EscrowEngine::new(EngineConfig::default());
        let owners = onboard(&mut engine, 10);
        let fee = Amount::from_ui(dec!(499.99), 6).unwrap();
        let month = 30 * 24 * 60 * 60;

        let mut collected = 0u64;
        let mut declined = 0usize;
        for _ in 0..24 {
            engine.advance_time(month);
            for &owner in &owners {
                let nonce = engine.get_escrow(owner).unwrap().action_nonce;
                match engine.platform_fee_withdraw(owner, platform(), fee, nonce) {
                    Ok(_) => collected += fee.units(),
                    Err(EscrowError::InsufficientBalance { .. }) => declined += 1,
                    Err(other) => panic!("unexpected rejection: {other}"),
                }
            }
        }

        // smallest escrow holds $1,000 so it pays twice and then declines
        assert!(declined > 0);
        assert_eq!(
            engine.custody().balance_of(Holder::Wallet(platform()), TokenMint::usdc()),
            Amount::new(collected)
        );
        for &owner in &owners {
            let escrow = engine.get_escrow(owner).unwrap();
            assert!(escrow.check_invariants().is_ok());
            assert!(engine.reconcile(owner).unwrap());
            assert_eq!(escrow.action_nonce * fee.units(), escrow.total_fees_paid.units());
        }
    }
}

mod trading_tests {
    use super::*;

    #[test]
    fn interleaved_trades_and_fees_share_one_nonce() {
        let mut engine = EscrowEngine::new(EngineConfig::default());
        let owners = onboard(&mut engine, 5);
        engine.set_time(Timestamp::from_secs(300));

        for round in 0..50u64 {
            engine.advance_time(7);
            let deadline = engine.time().plus(30);
            for &owner in &owners {
                let nonce = engine.get_escrow(owner).unwrap().action_nonce;
                if round % 5 == 0 {
                    engine
                        .platform_fee_withdraw(owner, platform(), usdc(1), nonce)
                        .unwrap();
                } else {
                    engine
                        .trade_withdraw(owner, trader(), usdc(2), nonce, deadline)
                        .unwrap();
                }
            }
        }

        let mut outflow = Amount::ZERO;
        for &owner in &owners {
            let escrow = engine.get_escrow(owner).unwrap();
            assert_eq!(escrow.action_nonce, 50);
            assert_eq!(escrow.total_fees_paid, usdc(10));
            assert_eq!(escrow.total_traded, usdc(80));
            assert!(engine.reconcile(owner).unwrap());
            outflow = outflow.checked_add(usdc(90)).unwrap();
        }

        let paid_out = engine
            .custody()
            .balance_of(Holder::Wallet(platform()), TokenMint::usdc())
            .checked_add(engine.custody().balance_of(Holder::Wallet(trader()), TokenMint::usdc()))
            .unwrap();
        assert_eq!(paid_out, outflow);
    }

    #[test]
    fn pause_storm_freezes_delegated_spending() {
        let mut engine = EscrowEngine::new(EngineConfig::default());
        let owners = onboard(&mut engine, 8);
        engine.set_time(Timestamp::from_secs(600));

        // half the owners hit pause
        for &owner in owners.iter().step_by(2) {
            engine.pause(owner, owner).unwrap();
        }

        let deadline = engine.time().plus(60);
        for (i, &owner) in owners.iter().enumerate() {
            let result = engine.trade_withdraw(owner, trader(), usdc(5), 0, deadline);
            if i % 2 == 0 {
                assert_eq!(result, Err(EscrowError::AccountPaused));
                assert_eq!(engine.get_escrow(owner).unwrap().action_nonce, 0);
            } else {
                assert_eq!(result.unwrap().action_nonce, 1);
            }
        }

        assert_eq!(
            engine.custody().balance_of(Holder::Wallet(trader()), TokenMint::usdc()),
            usdc(20)
        );
    }

    #[test]
    fn bounded_event_log_keeps_ids_increasing() {
        let mut config = EngineConfig::default();
        config.max_events = 16;
        let mut engine = EscrowEngine::new(config);
        let owners = onboard(&mut engine, 4);
        engine.set_time(Timestamp::from_secs(300));

        let deadline = engine.time();
        for round in 0..20u64 {
            for &owner in &owners {
                engine
                    .trade_withdraw(owner, trader(), usdc(1), round, deadline)
                    .unwrap();
            }
        }

        let events = engine.events();
        assert_eq!(events.len(), 16);
        assert!(events.windows(2).all(|pair| pair[0].id < pair[1].id));
        // 4 owners x (init + deposit + 2 delegations) + 80 trades, ids from 1
        assert_eq!(events.last().unwrap().id, EventId(96));
        assert_eq!(events.first().unwrap().id, EventId(81));
    }
}
