//! Commit-reveal state machine.
//!
//! One account per participant, created lazily on first commit and never
//! destroyed. The account *is* the state machine: holding the pending
//! commitment inside it makes "at most one live commitment per player"
//! structural rather than checked.

use crate::{Address, Amount, Digest32, REVEAL_DELAY_BLOCKS, REVEAL_WINDOW_BLOCKS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommitment {
    /// One-way digest of the secret bound to the committer's identity.
    pub digest: Digest32,
    /// Height of the block that carried the commit.
    pub height: u64,
    /// Amount escrowed into the pot by this commit.
    pub stake: Amount,
}

impl PendingCommitment {
    /// First height at which a reveal is accepted.
    pub fn earliest_reveal(&self) -> u64 {
        self.height + REVEAL_DELAY_BLOCKS + 1
    }

    /// Last height at which a reveal is accepted.
    pub fn last_reveal(&self) -> u64 {
        self.height + REVEAL_WINDOW_BLOCKS
    }

    /// Height of the block whose hash decides the outcome: sealed strictly
    /// after the commit, so unknowable when the secret was chosen.
    pub fn deciding_height(&self) -> u64 {
        self.height + REVEAL_DELAY_BLOCKS
    }

    pub fn is_expired(&self, height: u64) -> bool {
        height > self.last_reveal()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlayerAccount {
    /// Cumulative accepted commits.
    pub shots: u64,
    pub total_spent: Amount,
    pub total_won: Amount,
    /// Unix seconds of the last accepted commit; drives the cooldown gate.
    pub last_commit_at: u64,
    #[serde(skip)]
    pub(crate) pending: Option<PendingCommitment>,
}

impl PlayerAccount {
    pub fn pending(&self) -> Option<&PendingCommitment> {
        self.pending.as_ref()
    }
}

#[derive(Default)]
pub struct CommitBook {
    accounts: HashMap<Address, PlayerAccount>,
}

impl CommitBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, player: &Address) -> Option<&PlayerAccount> {
        self.accounts.get(player)
    }

    pub fn pending(&self, player: &Address) -> Option<&PendingCommitment> {
        self.accounts.get(player).and_then(|a| a.pending.as_ref())
    }

    /// Seconds until `player` may commit again; zero when the gate is open.
    pub fn cooldown_remaining(&self, player: &Address, now: u64, cooldown_secs: u64) -> u64 {
        self.accounts
            .get(player)
            .map(|a| (a.last_commit_at + cooldown_secs).saturating_sub(now))
            .unwrap_or(0)
    }

    /// Remove and return the player's pending commitment, if any.
    pub fn take_pending(&mut self, player: &Address) -> Option<PendingCommitment> {
        self.accounts.get_mut(player).and_then(|a| a.pending.take())
    }

    /// Record an accepted commit: store the commitment and update stats.
    /// The caller has already validated payment, cooldown, and pendency.
    pub fn record_commit(
        &mut self,
        player: Address,
        digest: Digest32,
        height: u64,
        paid: Amount,
        now: u64,
    ) {
        let account = self.accounts.entry(player).or_default();
        debug_assert!(account.pending.is_none());
        account.pending = Some(PendingCommitment {
            digest,
            height,
            stake: paid,
        });
        account.shots += 1;
        account.total_spent += paid;
        account.last_commit_at = now;
    }

    pub fn credit_win(&mut self, player: &Address, amount: Amount) {
        if let Some(account) = self.accounts.get_mut(player) {
            account.total_won += amount;
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
