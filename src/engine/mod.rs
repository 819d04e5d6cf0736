// 8.0: escrow engine. executes signed instructions against per-owner escrows.
// deterministic: time is injected and token movement goes through the custody port.

mod authority;
mod config;
mod core;
mod dispatch;
mod funds;
mod lifecycle;
mod results;

pub use config::EngineConfig;
pub use core::EscrowEngine;
pub use results::Receipt;
