//! Escrow Core Simulation.
//!
//! Walks an escrow through its full lifecycle: funding, delegation behind the
//! time-lock, fee and trade withdrawals, replay rejection, emergency pause and
//! close. Set RUST_LOG=debug to see every emitted event.

use escrow_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    println!("Escrow Core Simulation");
    println!("Single Owner, Dual Authority, Full Lifecycle");
    println!("Started {}\n", Timestamp::now());

    scenario_1_deposit_and_withdraw();
    scenario_2_delegated_trading();
    scenario_3_replay_rejected();
    scenario_4_emergency_pause();
    scenario_5_close();

    println!("\nAll simulations completed successfully.");
}

fn usdc(value: Decimal) -> Amount {
    Amount::from_ui(value, 6).unwrap()
}

fn ui(amount: Amount) -> Decimal {
    TokenMint::usdc().ui_amount(amount).unwrap()
}

// devnet limits, validated before use. simulated clock starts at t=0
fn engine() -> EscrowEngine {
    EscrowEngine::try_new(EngineConfig::new(Environment::Devnet.config())).unwrap()
}

// funded owner wallet, escrow created at t=0
fn setup(owner: Identity, wallet: Decimal, max_balance: Decimal) -> EscrowEngine {
    let mut engine = engine();
    engine
        .custody_mut()
        .mint_to(Holder::Wallet(owner), TokenMint::usdc(), usdc(wallet))
        .unwrap();
    engine
        .initialize(owner, TokenMint::usdc(), usdc(max_balance), LifetimeLimits::unlimited())
        .unwrap();
    engine
}

/// Owner funds the escrow and takes some back while no authority is armed.
fn scenario_1_deposit_and_withdraw() {
    println!("Scenario 1: Deposit and Withdraw\n");

    let alice = Identity::from_seed(1);
    let mut engine = setup(alice, dec!(5000), dec!(1000));

    engine.deposit(alice, alice, usdc(dec!(1000))).unwrap();
    println!("  Alice deposits $1,000 (max balance $1,000)");

    let over = engine.deposit(alice, alice, usdc(dec!(1)));
    println!("  One more dollar: {}", over.unwrap_err());

    let receipt = engine.withdraw(alice, alice, usdc(dec!(250))).unwrap();
    println!("  Alice withdraws $250, escrow balance: ${}", ui(receipt.balance));
    println!("  Vault reconciles: {}\n", engine.reconcile(alice).unwrap());
}

/// Authorities wait out the time-lock, then spend with increasing nonces.
fn scenario_2_delegated_trading() {
    println!("Scenario 2: Delegated Trading\n");

    let alice = Identity::from_seed(1);
    let platform = Identity::from_seed(100);
    let trader = Identity::from_seed(200);
    let mut engine = setup(alice, dec!(10000), dec!(10000));

    engine.deposit(alice, alice, usdc(dec!(10000))).unwrap();
    engine.delegate(alice, alice, AuthorityKind::Platform, platform).unwrap();
    engine.delegate(alice, alice, AuthorityKind::Trading, trader).unwrap();
    println!("  Alice delegates platform {} and trading {}", platform.short(), trader.short());

    engine.set_time(Timestamp::from_secs(10));
    let early = engine.trade_withdraw(alice, trader, usdc(dec!(100)), 0, Timestamp::from_secs(100));
    println!("  t=10 trade: {}", early.unwrap_err());

    let owner_blocked = engine.withdraw(alice, alice, usdc(dec!(100)));
    println!("  Owner withdraw while delegated: {}", owner_blocked.unwrap_err());

    engine.set_time(Timestamp::from_secs(300));
    let trade = engine
        .trade_withdraw(alice, trader, usdc(dec!(100)), 0, Timestamp::from_secs(360))
        .unwrap();
    println!("  t=300 trade $100 with nonce 0, next nonce {}", trade.action_nonce);

    let fee = engine
        .platform_fee_withdraw(alice, platform, usdc(dec!(25)), trade.action_nonce)
        .unwrap();
    println!("  Platform collects $25 fee, next nonce {}", fee.action_nonce);

    let escrow = engine.get_escrow(alice).unwrap();
    println!("  Traded ${}, fees ${}, balance ${}\n", ui(escrow.total_traded), ui(escrow.total_fees_paid), ui(escrow.balance));
}

/// A captured instruction replayed after it was accepted.
fn scenario_3_replay_rejected() {
    println!("Scenario 3: Replay Rejected\n");

    let alice = Identity::from_seed(1);
    let trader = Identity::from_seed(200);
    let mut engine = setup(alice, dec!(1000), dec!(1000));

    engine.deposit(alice, alice, usdc(dec!(1000))).unwrap();
    engine.delegate(alice, alice, AuthorityKind::Trading, trader).unwrap();
    engine.set_time(Timestamp::from_secs(300));

    let signed = SignedInstruction::new(
        trader,
        Instruction::TradeWithdraw {
            escrow: alice,
            amount: usdc(dec!(50)),
            nonce: 0,
            deadline: Timestamp::from_secs(400),
        },
    );

    engine.execute(&signed).unwrap();
    println!("  First submission accepted");

    engine.advance_time(1);
    let replay = engine.execute(&signed);
    println!("  Replay at t=301: {}\n", replay.unwrap_err());
}

/// Pause freezes delegated spending and unlocks the owner's emergency exit.
fn scenario_4_emergency_pause() {
    println!("Scenario 4: Emergency Pause\n");

    let alice = Identity::from_seed(1);
    let trader = Identity::from_seed(200);
    let mut engine = setup(alice, dec!(2000), dec!(2000));

    engine.deposit(alice, alice, usdc(dec!(2000))).unwrap();
    engine.delegate(alice, alice, AuthorityKind::Trading, trader).unwrap();
    engine.set_time(Timestamp::from_secs(500));
    engine.pause(alice, alice).unwrap();
    println!("  Alice pauses at t=500");

    let trade = engine.trade_withdraw(alice, trader, usdc(dec!(10)), 0, Timestamp::from_secs(600));
    println!("  Trade while paused: {}", trade.unwrap_err());

    engine.revoke(alice, alice, AuthorityKind::Trading).unwrap_err();
    engine.unpause(alice, alice).unwrap_err();
    println!("  Unpause inside cooldown rejected");

    engine.set_time(Timestamp::from_secs(800));
    engine.unpause(alice, alice).unwrap();
    engine.revoke(alice, alice, AuthorityKind::Trading).unwrap();
    engine.pause(alice, alice).unwrap();

    let receipt = engine.emergency_withdraw(alice, alice, usdc(dec!(2000))).unwrap();
    println!("  Emergency withdraw $2,000, balance ${}\n", ui(receipt.balance));
}

/// Close refuses funded or delegated escrows, then tombstones the record.
fn scenario_5_close() {
    println!("Scenario 5: Close\n");

    let alice = Identity::from_seed(1);
    let mut engine = setup(alice, dec!(100), dec!(100));

    engine.deposit(alice, alice, usdc(dec!(100))).unwrap();
    let refused = engine.close(alice, alice);
    println!("  Close with $100 inside: {}", refused.unwrap_err());

    engine
        .withdraw(alice, alice, Amount::new(usdc(dec!(100)).units() - 5))
        .unwrap();
    engine.close(alice, alice).unwrap();
    if let EventPayload::Closed(closed) = &engine.recent_events(1)[0].payload {
        println!("  Closed, {} units of dust swept back to Alice", closed.dust_swept);
    }
    println!("  Status: {:?}", engine.get_escrow(alice).unwrap().status);

    let reopen = engine.initialize(alice, TokenMint::usdc(), Amount::ZERO, LifetimeLimits::unlimited());
    println!("  Re-initialize: {}", reopen.unwrap_err());

    for (owner, escrow) in engine.escrows_iter() {
        println!("  {} {:?}, deposited {}, withdrawn {}", owner.short(), escrow.status, escrow.total_deposited, escrow.total_withdrawn);
    }
    println!("  Events generated: {}\n", engine.events().len());
}
