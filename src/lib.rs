// escrow-core: dual-authority escrow account state machine.
// custody-first architecture: every check runs before any token moves.
// all computation is deterministic; time is injected and tokens go through a custody port.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Identity, Amount, Timestamp, TokenMint
//   2.x  authority.rs: platform/trading slots and the activation time-lock
//   3.x  account.rs: escrow record, status, invariants, error taxonomy
//   4.x  replay.rs: action nonce verify/consume
//   7.x  config.rs: limits, cooldowns, env presets
//   8.x  engine/: core engine: lifecycle, authority, funds, dispatch
//   9.x  instruction.rs: signed instruction envelope
//   9.2  custody.rs: token custody port + in-memory ledger
//   11.x events.rs: state transition events for audit

// core escrow modules
pub mod account;
pub mod authority;
pub mod engine;
pub mod events;
pub mod replay;
pub mod types;

// integration modules
pub mod config;
pub mod custody;
pub mod instruction;

// re exports for convenience
pub use account::*;
pub use authority::*;
pub use engine::*;
pub use events::*;
pub use instruction::*;
pub use types::*;
pub use config::{ConfigError, Environment, EscrowConfig};
pub use custody::{CustodyError, Holder, InMemoryCustody, TokenCustody};
