//! Push-then-pull payouts.
//!
//! A win triggers one immediate push through the injected [`PaymentSink`].
//! When that fails the amount is parked per-address and stays claimable
//! forever; a single uncooperative recipient never halts the game.

use crate::{
    errors::{LotteryError, Result},
    Address, Amount,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Why an immediate transfer did not go through.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("recipient cannot accept funds")]
    Rejected,
    #[error("transfer failed: {0}")]
    Failed(String),
}

/// Fallible external value transfer, injected at engine construction.
/// Implementations must not call back into the engine.
pub trait PaymentSink: Send {
    fn push(&mut self, to: &Address, amount: Amount) -> std::result::Result<(), PushError>;
}

/// Outcome of a winner payout attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    /// Paid directly on the winning reveal.
    Paid,
    /// Push failed; the amount is claimable from the vault.
    Owed,
}

/// Amounts owed to addresses whose push payment failed.
#[derive(Debug, Default)]
pub struct PayoutVault {
    pending: HashMap<Address, Amount>,
}

impl PayoutVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self, player: &Address) -> Amount {
        self.pending.get(player).copied().unwrap_or(0)
    }

    pub fn total_pending(&self) -> Amount {
        self.pending.values().sum()
    }

    /// Try the immediate push; on failure park the amount for a later claim.
    pub fn disburse(
        &mut self,
        to: &Address,
        amount: Amount,
        sink: &mut dyn PaymentSink,
    ) -> PayoutStatus {
        match sink.push(to, amount) {
            Ok(()) => PayoutStatus::Paid,
            Err(err) => {
                tracing::warn!(player = %to, amount, %err, "winner push failed, parking for claim");
                *self.pending.entry(*to).or_insert(0) += amount;
                PayoutStatus::Owed
            }
        }
    }

    /// Pull path. The entry is zeroed before the transfer is attempted, so
    /// a second claim observes nothing owed; on failure the balance is
    /// restored and the claim stays retryable.
    pub fn claim(&mut self, player: &Address, sink: &mut dyn PaymentSink) -> Result<Amount> {
        let owed = self.pending.remove(player).unwrap_or(0);
        if owed == 0 {
            return Err(LotteryError::NothingToClaim);
        }
        if let Err(err) = sink.push(player, owed) {
            self.pending.insert(*player, owed);
            return Err(err.into());
        }
        Ok(owed)
    }
}
