//! Potshot - pay-to-play commit-reveal lottery core
//!
//! A single-writer ledger state machine: participants stake a fixed amount
//! into a shared pot, commit to a secret, and reveal it a few blocks later
//! to learn whether they win a configured share of the pot. The deciding
//! entropy is sealed strictly after the commitment, so an outcome is
//! unknowable at commit time and cannot be front-run.
//!
//! Everything observable by the outside world is published on the event
//! bus; the core assumes nothing is listening.

pub mod chain;
pub mod commitments;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod history;
pub mod ledger;
pub mod payout;
pub mod randomness;

pub use chain::{BlockContext, EntropySource, SimulatedChain};
pub use commitments::{CommitBook, PendingCommitment, PlayerAccount};
pub use config::LotteryConfig;
pub use engine::{LotteryEngine, RevealOutcome, RoundSponsor};
pub use errors::{LotteryError, Result};
pub use events::{EventBus, LotteryEvent};
pub use history::{WinnerHistory, WinnerRecord};
pub use ledger::{Ledger, PotSplit};
pub use payout::{PaymentSink, PayoutStatus, PayoutVault, PushError};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Indivisible base currency units.
pub type Amount = u64;

/// One-way commitment digest.
pub type Digest32 = [u8; 32];

/// Basis-point scale: 10_000 == 100%.
pub const BP_SCALE: u32 = 10_000;

/// Minimum number of blocks that must pass between commit and reveal.
pub const REVEAL_DELAY_BLOCKS: u64 = 1;

/// Maximum number of blocks after a commit during which a reveal is valid.
pub const REVEAL_WINDOW_BLOCKS: u64 = 256;

/// How far behind the head a sealed block hash can still be looked up.
pub const ENTROPY_LOOKBACK_BLOCKS: u64 = 256;

/// Upper bound on the configurable commit cooldown.
pub const MAX_COOLDOWN_SECS: u64 = 86_400;

/// Participant identity: an address-like 32-byte key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The all-zero address, reserved as invalid.
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}..)", &hex::encode(self.0)[..8])
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Address(array))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_hex_round_trip() {
        let addr = Address([0xAB; 32]);
        let encoded = addr.to_string();
        assert_eq!(encoded.len(), 64);
        assert_eq!(encoded.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn address_rejects_short_hex() {
        assert!("abcd".parse::<Address>().is_err());
    }

    #[test]
    fn zero_address_is_flagged() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address([1u8; 32]).is_zero());
    }

    #[test]
    fn address_serde_as_hex_string() {
        let addr = Address([0x11; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", "11".repeat(32)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
