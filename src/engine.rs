//! The operation surface of the lottery.
//!
//! Every entry point executes as one atomic transition on a single-writer
//! ledger: checks first, then state, then the one external effect (the
//! payment push) strictly last. An error return means nothing changed.

use crate::{
    chain::{BlockContext, EntropySource},
    commitments::{CommitBook, PendingCommitment, PlayerAccount},
    config::LotteryConfig,
    errors::{LotteryError, Result},
    events::{EventBus, LotteryEvent},
    history::{WinnerHistory, WinnerRecord},
    ledger::Ledger,
    payout::{PaymentSink, PayoutStatus, PayoutVault},
    randomness, Address, Amount, Digest32,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// How many winners the read query returns at most.
const RECENT_WINNERS_LIMIT: usize = 10;

/// Sponsorship metadata attached to the current round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSponsor {
    pub address: Address,
    pub name: String,
    pub url: String,
}

/// Result of a reveal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    /// `roll` is `None` when the pot could not cover a win and the
    /// randomness engine was never consulted.
    Loss { roll: Option<u16> },
    Win {
        roll: u16,
        amount: Amount,
        payout: PayoutStatus,
    },
}

pub struct LotteryEngine {
    config: LotteryConfig,
    ledger: Ledger,
    book: CommitBook,
    history: WinnerHistory,
    vault: PayoutVault,
    entropy: Arc<dyn EntropySource>,
    sink: Box<dyn PaymentSink>,
    events: EventBus,
    sponsor: Option<RoundSponsor>,
    paused: bool,
    /// Monotonic counter folded into every win/lose derivation.
    decision_nonce: u64,
}

impl LotteryEngine {
    pub fn new(
        config: LotteryConfig,
        entropy: Arc<dyn EntropySource>,
        sink: Box<dyn PaymentSink>,
    ) -> Result<Self> {
        config.validate()?;
        let history = WinnerHistory::new(config.max_winner_history);
        Ok(Self {
            config,
            ledger: Ledger::new(),
            book: CommitBook::new(),
            history,
            vault: PayoutVault::new(),
            entropy,
            sink,
            events: EventBus::default(),
            sponsor: None,
            paused: false,
            decision_nonce: 0,
        })
    }

    // --- mutating operations -------------------------------------------

    /// Standard commit: exact stake, cooldown elapsed, no live commitment.
    pub fn commit(
        &mut self,
        ctx: BlockContext,
        player: Address,
        digest: Digest32,
        paid: Amount,
    ) -> Result<()> {
        self.accept_commit(ctx, player, digest, paid, false)
    }

    /// Pot-starting variant: requires an empty pot and accepts any amount
    /// at or above the configured first-stake minimum, crediting it all.
    pub fn commit_first(
        &mut self,
        ctx: BlockContext,
        player: Address,
        digest: Digest32,
        paid: Amount,
    ) -> Result<()> {
        self.accept_commit(ctx, player, digest, paid, true)
    }

    fn accept_commit(
        &mut self,
        ctx: BlockContext,
        player: Address,
        digest: Digest32,
        paid: Amount,
        first: bool,
    ) -> Result<()> {
        self.ensure_unpaused()?;
        if digest == [0u8; 32] {
            return Err(LotteryError::ZeroCommitment);
        }
        let remaining =
            self.book
                .cooldown_remaining(&player, ctx.timestamp, self.config.cooldown_secs);
        if remaining > 0 {
            return Err(LotteryError::CooldownActive {
                remaining_secs: remaining,
            });
        }
        // A commitment past its reveal window no longer blocks; it is
        // reaped below, once the rest of the commit is known to succeed.
        let stale = match self.book.pending(&player) {
            Some(c) if c.is_expired(ctx.height) => Some(c.stake),
            Some(_) => return Err(LotteryError::CommitmentPending),
            None => None,
        };
        if first {
            if self.ledger.pot() != 0 {
                return Err(LotteryError::PotNotEmpty);
            }
            if paid < self.config.first_stake_min {
                return Err(LotteryError::WrongStake {
                    expected: self.config.first_stake_min,
                    paid,
                });
            }
        } else if paid != self.config.stake_cost {
            return Err(LotteryError::WrongStake {
                expected: self.config.stake_cost,
                paid,
            });
        }

        if let Some(forfeited) = stale {
            self.book.take_pending(&player);
            tracing::warn!(player = %player, forfeited, "discarding stale commitment on re-commit");
            self.events.emit(LotteryEvent::CommitmentExpired {
                player,
                reaper: player,
                forfeited,
                height: ctx.height,
            });
        }
        self.ledger.credit_stake(paid);
        self.book
            .record_commit(player, digest, ctx.height, paid, ctx.timestamp);
        tracing::info!(
            player = %player,
            paid,
            height = ctx.height,
            pot = self.ledger.pot(),
            "commit accepted"
        );
        self.events.emit(LotteryEvent::CommitAccepted {
            player,
            amount: paid,
            height: ctx.height,
            pot: self.ledger.pot(),
        });
        Ok(())
    }

    /// Reveal the secret behind a pending commitment and resolve it.
    ///
    /// The commitment is removed before the outcome is decided or any value
    /// moves; a failed winner push degrades into the claim vault and is not
    /// an operation failure.
    pub fn reveal(
        &mut self,
        ctx: BlockContext,
        player: Address,
        secret: &[u8],
    ) -> Result<RevealOutcome> {
        self.ensure_unpaused()?;
        let commitment = self
            .book
            .pending(&player)
            .cloned()
            .ok_or(LotteryError::NoCommitment)?;
        if ctx.height < commitment.earliest_reveal() {
            return Err(LotteryError::RevealTooEarly {
                earliest: commitment.earliest_reveal(),
            });
        }
        if commitment.is_expired(ctx.height) {
            return Err(LotteryError::RevealTooLate {
                expired_at: commitment.last_reveal(),
            });
        }
        // Checked here rather than at commit time so a pot-building first
        // commit is accepted and only held back from resolving.
        let pot = self.ledger.pot();
        if pot < self.config.min_pot_for_win {
            return Err(LotteryError::PotBelowMinimum {
                pot,
                required: self.config.min_pot_for_win,
            });
        }
        if randomness::commitment_digest(secret, &player) != commitment.digest {
            return Err(LotteryError::SecretMismatch);
        }

        let removed = self.book.take_pending(&player);
        debug_assert!(removed.is_some());

        // A commitment can only win a pot larger than its own contribution;
        // a pot-starting commit never wins back its own stake.
        let roll = if pot > commitment.stake {
            Some(self.roll_for(ctx, &player, &commitment))
        } else {
            None
        };

        match roll {
            Some(r) if randomness::is_winning_roll(r, self.config.win_chance_bp) => {
                Ok(self.settle_win(ctx, player, r))
            }
            _ => {
                tracing::info!(player = %player, roll = ?roll, height = ctx.height, "reveal resolved: loss");
                self.events.emit(LotteryEvent::RevealResolved {
                    player,
                    won: false,
                    roll,
                    height: ctx.height,
                });
                Ok(RevealOutcome::Loss { roll })
            }
        }
    }

    fn roll_for(
        &mut self,
        ctx: BlockContext,
        player: &Address,
        commitment: &PendingCommitment,
    ) -> u16 {
        let deciding = self
            .entropy
            .block_entropy(commitment.deciding_height())
            .unwrap_or_else(|| {
                tracing::debug!(
                    height = commitment.deciding_height(),
                    "deciding hash out of range, using fallback entropy"
                );
                self.entropy.fallback(ctx.timestamp)
            });
        let supplementary = self.entropy.supplementary();
        self.decision_nonce += 1;
        let player_nonce = self.book.account(player).map(|a| a.shots).unwrap_or(0);
        randomness::derive_roll(
            &deciding,
            &supplementary,
            self.decision_nonce,
            player_nonce,
            player,
        )
    }

    fn settle_win(&mut self, ctx: BlockContext, player: Address, roll: u16) -> RevealOutcome {
        let pot_before = self.ledger.pot();
        let split = self.ledger.split_pot(self.config.win_share_bp);
        self.book.credit_win(&player, split.winner_amount);
        self.history.push(WinnerRecord {
            address: player,
            amount: split.winner_amount,
            timestamp: ctx.timestamp,
            height: ctx.height,
        });
        if self.sponsor.take().is_some() {
            self.events.emit(LotteryEvent::SponsorCleared);
        }
        self.events.emit(LotteryEvent::RevealResolved {
            player,
            won: true,
            roll: Some(roll),
            height: ctx.height,
        });
        self.events.emit(LotteryEvent::JackpotWon {
            player,
            amount: split.winner_amount,
            pot: pot_before,
            height: ctx.height,
        });
        tracing::info!(
            player = %player,
            roll,
            amount = split.winner_amount,
            pot = pot_before,
            "jackpot won"
        );

        // Bookkeeping is complete; the push is the last thing that happens.
        let payout = self
            .vault
            .disburse(&player, split.winner_amount, self.sink.as_mut());
        if payout == PayoutStatus::Owed {
            self.events.emit(LotteryEvent::PayoutFailed {
                player,
                amount: split.winner_amount,
            });
        }
        RevealOutcome::Win {
            roll,
            amount: split.winner_amount,
            payout,
        }
    }

    /// Pull an owed payout. Deliberately reachable while paused.
    pub fn claim(&mut self, player: Address) -> Result<Amount> {
        let paid = self.vault.claim(&player, self.sink.as_mut())?;
        tracing::info!(player = %player, amount = paid, "pending payout claimed");
        self.events.emit(LotteryEvent::PayoutClaimed {
            player,
            amount: paid,
        });
        Ok(paid)
    }

    /// Public cleanup: anyone may discard another participant's commitment
    /// once its reveal window has fully elapsed. The escrowed stake stays
    /// in the pot - forfeiture, not refund.
    pub fn expire_commitment(
        &mut self,
        ctx: BlockContext,
        caller: Address,
        target: Address,
    ) -> Result<()> {
        let commitment = self
            .book
            .pending(&target)
            .cloned()
            .ok_or(LotteryError::NoCommitment)?;
        if !commitment.is_expired(ctx.height) {
            return Err(LotteryError::NotExpired {
                expires_at: commitment.last_reveal(),
            });
        }
        self.book.take_pending(&target);
        tracing::warn!(player = %target, reaper = %caller, forfeited = commitment.stake, "stale commitment expired");
        self.events.emit(LotteryEvent::CommitmentExpired {
            player: target,
            reaper: caller,
            forfeited: commitment.stake,
            height: ctx.height,
        });
        Ok(())
    }

    /// Attach display metadata to the current round for a fixed fee that
    /// routes entirely into house funds. Cleared on the next win.
    pub fn sponsor(
        &mut self,
        _ctx: BlockContext,
        player: Address,
        paid: Amount,
        name: String,
        url: String,
    ) -> Result<()> {
        self.ensure_unpaused()?;
        if paid != self.config.sponsor_fee {
            return Err(LotteryError::WrongSponsorFee {
                expected: self.config.sponsor_fee,
                paid,
            });
        }
        self.ledger.credit_house(paid);
        self.events.emit(LotteryEvent::SponsorAttached {
            sponsor: player,
            name: name.clone(),
        });
        self.sponsor = Some(RoundSponsor {
            address: player,
            name,
            url,
        });
        Ok(())
    }

    // --- administration ------------------------------------------------

    pub fn pause(&mut self, caller: Address) -> Result<()> {
        self.ensure_admin(&caller)?;
        self.paused = true;
        tracing::warn!("lottery paused");
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<()> {
        self.ensure_admin(&caller)?;
        self.paused = false;
        tracing::info!("lottery unpaused");
        Ok(())
    }

    /// Push the entire house balance to the configured house address.
    /// A failed push reverts the withdrawal.
    pub fn withdraw_house_funds(&mut self, caller: Address) -> Result<Amount> {
        self.ensure_admin(&caller)?;
        self.ensure_unpaused()?;
        let amount = self.ledger.take_house_funds();
        if amount == 0 {
            return Err(LotteryError::NothingToWithdraw);
        }
        if let Err(err) = self.sink.push(&self.config.house_address, amount) {
            self.ledger.credit_house(amount);
            return Err(err.into());
        }
        tracing::info!(amount, "house funds withdrawn");
        self.events.emit(LotteryEvent::HouseFundsWithdrawn {
            to: self.config.house_address,
            amount,
        });
        Ok(amount)
    }

    // --- read-only queries ---------------------------------------------

    pub fn pot(&self) -> Amount {
        self.ledger.pot()
    }

    pub fn house_funds(&self) -> Amount {
        self.ledger.house_funds()
    }

    pub fn player_stats(&self, player: &Address) -> Option<&PlayerAccount> {
        self.book.account(player)
    }

    pub fn cooldown_remaining(&self, player: &Address, now: u64) -> u64 {
        self.book
            .cooldown_remaining(player, now, self.config.cooldown_secs)
    }

    pub fn pending_commitment(&self, player: &Address) -> Option<&PendingCommitment> {
        self.book.pending(player)
    }

    pub fn pending_payout(&self, player: &Address) -> Amount {
        self.vault.pending(player)
    }

    pub fn total_pending_payouts(&self) -> Amount {
        self.vault.total_pending()
    }

    pub fn recent_winners(&self) -> Vec<WinnerRecord> {
        self.history.recent(RECENT_WINNERS_LIMIT)
    }

    pub fn current_sponsor(&self) -> Option<&RoundSponsor> {
        self.sponsor.as_ref()
    }

    pub fn config(&self) -> &LotteryConfig {
        &self.config
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Would a standard commit from `player` currently be accepted?
    pub fn can_commit(&self, player: &Address, ctx: BlockContext) -> bool {
        if self.paused || self.cooldown_remaining(player, ctx.timestamp) > 0 {
            return false;
        }
        match self.book.pending(player) {
            Some(c) => c.is_expired(ctx.height),
            None => true,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LotteryEvent> {
        self.events.subscribe()
    }

    // --- helpers -------------------------------------------------------

    fn ensure_unpaused(&self) -> Result<()> {
        if self.paused {
            return Err(LotteryError::Paused);
        }
        Ok(())
    }

    fn ensure_admin(&self, caller: &Address) -> Result<()> {
        if *caller != self.config.admin_address {
            return Err(LotteryError::Unauthorized);
        }
        Ok(())
    }
}
