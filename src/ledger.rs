//! Shared pot and house-fund accounting.
//!
//! `pot` grows only through accepted commits and is zeroed only by a
//! winning split; `house_funds` absorbs the house share, every rounding
//! remainder, and sponsorship fees.

use crate::{Amount, BP_SCALE};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    pot: Amount,
    house_funds: Amount,
}

/// Result of splitting the pot on a win.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PotSplit {
    pub winner_amount: Amount,
    pub house_amount: Amount,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pot(&self) -> Amount {
        self.pot
    }

    pub fn house_funds(&self) -> Amount {
        self.house_funds
    }

    /// The only path by which the pot grows.
    pub fn credit_stake(&mut self, amount: Amount) {
        self.pot += amount;
    }

    pub fn credit_house(&mut self, amount: Amount) {
        self.house_funds += amount;
    }

    /// Disburse the entire pot: the winner takes `win_share_bp`, rounded
    /// down, and the house takes the rest, so not a single unit is lost.
    pub fn split_pot(&mut self, win_share_bp: u32) -> PotSplit {
        let pot = self.pot;
        let winner_amount =
            (u128::from(pot) * u128::from(win_share_bp) / u128::from(BP_SCALE)) as Amount;
        let house_amount = pot - winner_amount;
        self.pot = 0;
        self.house_funds += house_amount;
        debug_assert_eq!(winner_amount + house_amount, pot);
        PotSplit {
            winner_amount,
            house_amount,
        }
    }

    /// Drain the house balance for an administrative withdrawal.
    pub fn take_house_funds(&mut self) -> Amount {
        std::mem::take(&mut self.house_funds)
    }
}
