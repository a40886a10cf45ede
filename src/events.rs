//! Signals emitted for the off-chain layer.
//!
//! Delivery is best-effort over a broadcast channel: the core makes no
//! assumption that anything is listening, and emission never affects the
//! outcome of an operation.

use crate::{Address, Amount};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LotteryEvent {
    CommitAccepted {
        player: Address,
        amount: Amount,
        height: u64,
        pot: Amount,
    },
    RevealResolved {
        player: Address,
        won: bool,
        /// `None` when the pot could not cover a win and no roll was made.
        roll: Option<u16>,
        height: u64,
    },
    JackpotWon {
        player: Address,
        amount: Amount,
        pot: Amount,
        height: u64,
    },
    PayoutFailed {
        player: Address,
        amount: Amount,
    },
    PayoutClaimed {
        player: Address,
        amount: Amount,
    },
    CommitmentExpired {
        player: Address,
        reaper: Address,
        forfeited: Amount,
        height: u64,
    },
    SponsorAttached {
        sponsor: Address,
        name: String,
    },
    SponsorCleared,
    HouseFundsWithdrawn {
        to: Address,
        amount: Amount,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LotteryEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LotteryEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: LotteryEvent) {
        // Zero subscribers is fine; the event is dropped.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1_024)
    }
}
