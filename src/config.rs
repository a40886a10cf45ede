//! Immutable lottery configuration.
//!
//! Validated once before any operation can run; the engine holds it by
//! value and never mutates it.

use crate::{
    errors::{LotteryError, Result},
    Address, Amount, BP_SCALE, MAX_COOLDOWN_SECS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LotteryConfig {
    /// Exact payment required for a standard commit.
    pub stake_cost: Amount,
    /// Minimum payment accepted by the pot-starting first commit.
    pub first_stake_min: Amount,
    /// Fee for attaching round sponsorship metadata; routed to house funds.
    pub sponsor_fee: Amount,
    /// Minimum seconds between a participant's accepted commits.
    pub cooldown_secs: u64,
    /// Winner's share of the pot, in basis points.
    pub win_share_bp: u32,
    /// House share of the pot, in basis points.
    pub house_share_bp: u32,
    /// Win probability threshold, in basis points.
    pub win_chance_bp: u32,
    /// Maximum number of retained winner records.
    pub max_winner_history: usize,
    /// Pot size required before a reveal may resolve as a win.
    pub min_pot_for_win: Amount,
    /// Destination for house fund withdrawals.
    pub house_address: Address,
    /// Administrator allowed to pause and withdraw.
    pub admin_address: Address,
}

impl LotteryConfig {
    /// Production-shaped defaults: 1% win chance, 80/20 split, 60s cooldown.
    pub fn standard(house_address: Address, admin_address: Address) -> Self {
        Self {
            stake_cost: 500_000,
            first_stake_min: 500_000,
            sponsor_fee: 1_000_000,
            cooldown_secs: 60,
            win_share_bp: 8_000,
            house_share_bp: 2_000,
            win_chance_bp: 100,
            max_winner_history: 100,
            min_pot_for_win: 1_000_000,
            house_address,
            admin_address,
        }
    }

    /// Short cooldown and a high win chance so simulations resolve quickly.
    pub fn simulation(house_address: Address, admin_address: Address) -> Self {
        Self {
            cooldown_secs: 12,
            win_chance_bp: 1_500,
            ..Self::standard(house_address, admin_address)
        }
    }

    /// Check every documented numeric bound. Invalid configuration is a
    /// hard failure before any operation can run.
    pub fn validate(&self) -> Result<()> {
        if self.stake_cost == 0 {
            return Err(invalid("stake_cost", "must be > 0"));
        }
        if self.first_stake_min < self.stake_cost {
            return Err(invalid("first_stake_min", "must be >= stake_cost"));
        }
        if self.sponsor_fee == 0 {
            return Err(invalid("sponsor_fee", "must be > 0"));
        }
        if self.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(invalid(
                "cooldown_secs",
                format!("must be <= {}", MAX_COOLDOWN_SECS),
            ));
        }
        if self.win_share_bp == 0 || self.win_share_bp >= BP_SCALE {
            return Err(invalid("win_share_bp", "must be in 1..=9999"));
        }
        if self.win_share_bp + self.house_share_bp != BP_SCALE {
            return Err(invalid(
                "house_share_bp",
                "win_share_bp + house_share_bp must equal 10000",
            ));
        }
        if self.win_chance_bp == 0 || self.win_chance_bp > BP_SCALE {
            return Err(invalid("win_chance_bp", "must be in 1..=10000"));
        }
        if self.max_winner_history == 0 {
            return Err(invalid("max_winner_history", "must be > 0"));
        }
        if self.min_pot_for_win < self.stake_cost {
            return Err(invalid("min_pot_for_win", "must be >= stake_cost"));
        }
        if self.house_address.is_zero() {
            return Err(invalid("house_address", "must be non-zero"));
        }
        if self.admin_address.is_zero() {
            return Err(invalid("admin_address", "must be non-zero"));
        }
        Ok(())
    }

    /// Load and validate a TOML configuration file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LotteryError::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        let config: LotteryConfig =
            toml::from_str(&raw).map_err(|e| LotteryError::ConfigLoad(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> LotteryError {
    LotteryError::Config {
        field,
        reason: reason.into(),
    }
}
