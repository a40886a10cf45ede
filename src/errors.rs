//! Crate-wide error types.
//!
//! Every variant is an atomic rejection: an operation that returns an error
//! has made no state change. The one deliberate exception is documented on
//! the reveal path - a failed winner push is not an operation failure.

use crate::{payout::PushError, Amount};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LotteryError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LotteryError {
    #[error("invalid configuration: {field}: {reason}")]
    Config { field: &'static str, reason: String },

    #[error("failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("operations are paused")]
    Paused,

    #[error("caller is not the administrator")]
    Unauthorized,

    #[error("commitment digest must be non-zero")]
    ZeroCommitment,

    #[error("wrong stake: expected {expected}, paid {paid}")]
    WrongStake { expected: Amount, paid: Amount },

    #[error("first-stake commit requires an empty pot")]
    PotNotEmpty,

    #[error("cooldown active: {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: u64 },

    #[error("previous commitment still pending")]
    CommitmentPending,

    #[error("no pending commitment")]
    NoCommitment,

    #[error("reveal too early: valid from height {earliest}")]
    RevealTooEarly { earliest: u64 },

    #[error("reveal window closed at height {expired_at}")]
    RevealTooLate { expired_at: u64 },

    #[error("commitment not expired: revealable until height {expires_at}")]
    NotExpired { expires_at: u64 },

    #[error("pot below resolution minimum: {pot} < {required}")]
    PotBelowMinimum { pot: Amount, required: Amount },

    #[error("revealed secret does not match the stored commitment")]
    SecretMismatch,

    #[error("nothing to claim")]
    NothingToClaim,

    #[error("wrong sponsorship fee: expected {expected}, paid {paid}")]
    WrongSponsorFee { expected: Amount, paid: Amount },

    #[error("no house funds to withdraw")]
    NothingToWithdraw,

    #[error("payout push failed: {0}")]
    Payout(#[from] PushError),
}
