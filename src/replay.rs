// 4.0 replay.rs: action nonce for authority-gated withdrawals.
// the caller echoes the nonce it expects to consume; a match is spent exactly once.

use crate::account::{EscrowAccount, EscrowError};

impl EscrowAccount {
    /// Reject anything but the current nonce. Runs with the other checks,
    /// before any state is written.
    pub fn verify_nonce(&self, presented: u64) -> Result<(), EscrowError> {
        if presented != self.action_nonce {
            return Err(EscrowError::StaleNonce {
                expected: self.action_nonce,
                presented,
            });
        }
        Ok(())
    }

    /// Final effect of an accepted instruction. Returns the new nonce.
    pub fn consume_nonce(&mut self) -> Result<u64, EscrowError> {
        self.action_nonce = self
            .action_nonce
            .checked_add(1)
            .ok_or(EscrowError::MathOverflow)?;
        Ok(self.action_nonce)
    }
}
