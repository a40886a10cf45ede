//! potshot-sim: drive the lottery core over a simulated chain.
//!
//! Deterministic for a fixed seed: the chain hashes, player behaviour, and
//! therefore every outcome replay identically.

use clap::Parser;
use potshot::{
    randomness, Address, Amount, BlockContext, LotteryConfig, LotteryEngine, LotteryEvent,
    PaymentSink, PushError, RevealOutcome, SimulatedChain, WinnerRecord,
};
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "potshot-sim", about = "Simulate lottery rounds over an in-memory chain")]
struct Args {
    /// Number of simulated participants
    #[arg(long, default_value_t = 8)]
    players: usize,

    /// Number of blocks to simulate
    #[arg(long, default_value_t = 2_000)]
    blocks: u64,

    /// Seed for the chain and player behaviour
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Optional TOML configuration file; defaults to the simulation preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Every n-th player refuses push payments (0 disables)
    #[arg(long, default_value_t = 4)]
    deadbeat_every: usize,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
}

/// Sink that models recipients which cannot accept a direct transfer.
#[derive(Clone, Default)]
struct CashDesk {
    state: Arc<Mutex<DeskState>>,
}

#[derive(Default)]
struct DeskState {
    refuse: Vec<Address>,
    paid_out: Amount,
    transfers: u64,
}

impl CashDesk {
    fn refuse(&self, address: Address) {
        self.state.lock().expect("desk lock").refuse.push(address);
    }

    fn accept_everyone(&self) {
        self.state.lock().expect("desk lock").refuse.clear();
    }
}

impl PaymentSink for CashDesk {
    fn push(&mut self, to: &Address, amount: Amount) -> Result<(), PushError> {
        let mut state = self.state.lock().expect("desk lock");
        if state.refuse.contains(to) {
            return Err(PushError::Rejected);
        }
        state.paid_out += amount;
        state.transfers += 1;
        Ok(())
    }
}

struct Player {
    address: Address,
    /// Secret behind the currently pending commitment, if any.
    secret: Option<Vec<u8>>,
}

#[derive(Default, Serialize)]
struct Tally {
    commits: u64,
    reveals: u64,
    wins: u64,
    losses: u64,
    rejected: u64,
    push_failures: u64,
    expired: u64,
}

#[derive(Serialize)]
struct Summary {
    blocks: u64,
    tally: Tally,
    pot: Amount,
    house_funds: Amount,
    paid_out: Amount,
    transfers: u64,
    pending_payouts: Amount,
    recent_winners: Vec<WinnerRecord>,
}

fn derived_address(index: usize) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(b"potshot-sim-player");
    hasher.update((index as u64).to_be_bytes());
    Address(hasher.finalize().into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let house = derived_address(usize::MAX);
    let admin = derived_address(usize::MAX - 1);
    let config = match &args.config {
        Some(path) => LotteryConfig::from_toml_file(path)?,
        None => LotteryConfig::simulation(house, admin),
    };

    let genesis_timestamp = chrono::Utc::now().timestamp() as u64;
    let chain = Arc::new(SimulatedChain::new(args.seed, genesis_timestamp));
    let desk = CashDesk::default();
    let mut engine = LotteryEngine::new(config.clone(), chain.clone(), Box::new(desk.clone()))?;
    let mut events = engine.subscribe();

    let mut players: Vec<Player> = (0..args.players)
        .map(|i| Player {
            address: derived_address(i),
            secret: None,
        })
        .collect();
    if args.deadbeat_every > 0 {
        for (i, player) in players.iter().enumerate() {
            if (i + 1) % args.deadbeat_every == 0 {
                desk.refuse(player.address);
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_mul(0x9E37_79B9));
    let mut tally = Tally::default();
    let mut commit_heights: HashMap<Address, u64> = HashMap::new();

    for _ in 0..args.blocks {
        let ctx = chain.advance();

        for player in players.iter_mut() {
            if let Some(secret) = player.secret.clone() {
                if rng.gen_bool(0.01) {
                    // Wallet lost the secret; the commitment goes stale.
                    player.secret = None;
                } else {
                    try_reveal(&mut engine, ctx, player, &secret, &commit_heights, &mut tally);
                }
            } else if rng.gen_bool(0.35) {
                try_commit(&mut engine, ctx, player, &mut rng, &mut commit_heights, &mut tally);
            }
        }

        // Janitor duty: anyone may clean up someone else's stale commitment.
        if players.len() >= 2 {
            let caller = rng.gen_range(0..players.len());
            let target = rng.gen_range(0..players.len());
            if caller != target {
                let _ = engine.expire_commitment(ctx, players[caller].address, players[target].address);
            }
        }

        while let Ok(event) = events.try_recv() {
            match event {
                LotteryEvent::PayoutFailed { .. } => tally.push_failures += 1,
                LotteryEvent::CommitmentExpired { .. } => tally.expired += 1,
                _ => {}
            }
        }
    }

    // Incident over: deadbeats come back for what they are owed.
    desk.accept_everyone();
    for player in &players {
        if engine.pending_payout(&player.address) > 0 {
            let claimed = engine.claim(player.address)?;
            tracing::info!(player = %player.address, claimed, "late claim settled");
        }
    }

    let (paid_out, transfers) = {
        let state = desk.state.lock().expect("desk lock");
        (state.paid_out, state.transfers)
    };
    let summary = Summary {
        blocks: args.blocks,
        tally,
        pot: engine.pot(),
        house_funds: engine.house_funds(),
        paid_out,
        transfers,
        pending_payouts: engine.total_pending_payouts(),
        recent_winners: engine.recent_winners(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn try_commit(
    engine: &mut LotteryEngine,
    ctx: BlockContext,
    player: &mut Player,
    rng: &mut StdRng,
    commit_heights: &mut HashMap<Address, u64>,
    tally: &mut Tally,
) {
    if !engine.can_commit(&player.address, ctx) {
        return;
    }
    let mut secret = vec![0u8; 32];
    rng.fill_bytes(&mut secret);
    let digest = randomness::commitment_digest(&secret, &player.address);
    let stake = engine.config().stake_cost;

    let result = if engine.pot() == 0 {
        engine.commit_first(ctx, player.address, digest, stake)
    } else {
        engine.commit(ctx, player.address, digest, stake)
    };
    match result {
        Ok(()) => {
            player.secret = Some(secret);
            commit_heights.insert(player.address, ctx.height);
            tally.commits += 1;
        }
        Err(err) => {
            tracing::debug!(player = %player.address, %err, "commit rejected");
            tally.rejected += 1;
        }
    }
}

fn try_reveal(
    engine: &mut LotteryEngine,
    ctx: BlockContext,
    player: &mut Player,
    secret: &[u8],
    commit_heights: &HashMap<Address, u64>,
    tally: &mut Tally,
) {
    // Wait out the minimum delay before bothering the engine.
    if let Some(height) = commit_heights.get(&player.address) {
        if ctx.height <= height + potshot::REVEAL_DELAY_BLOCKS {
            return;
        }
    }
    match engine.reveal(ctx, player.address, secret) {
        Ok(RevealOutcome::Win { amount, .. }) => {
            player.secret = None;
            tally.reveals += 1;
            tally.wins += 1;
            tracing::info!(player = %player.address, amount, "simulated win");
        }
        Ok(RevealOutcome::Loss { .. }) => {
            player.secret = None;
            tally.reveals += 1;
            tally.losses += 1;
        }
        Err(err) => {
            tracing::debug!(player = %player.address, %err, "reveal rejected");
            tally.rejected += 1;
        }
    }
}

fn print_summary(summary: &Summary) {
    println!("== potshot-sim summary ==");
    println!("blocks simulated:   {}", summary.blocks);
    println!("commits accepted:   {}", summary.tally.commits);
    println!(
        "reveals resolved:   {} ({} wins, {} losses)",
        summary.tally.reveals, summary.tally.wins, summary.tally.losses
    );
    println!("operations bounced: {}", summary.tally.rejected);
    println!("push failures:      {}", summary.tally.push_failures);
    println!("stale expiries:     {}", summary.tally.expired);
    println!("pot remaining:      {}", summary.pot);
    println!("house funds:        {}", summary.house_funds);
    println!(
        "paid out via desk:  {} over {} transfers",
        summary.paid_out, summary.transfers
    );
    println!("still owed:         {}", summary.pending_payouts);
    println!("recent winners:");
    for record in &summary.recent_winners {
        let when = chrono::DateTime::from_timestamp(record.timestamp as i64, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| record.timestamp.to_string());
        println!(
            "  height {:>8}  {}  {}  {}",
            record.height, record.address, record.amount, when
        );
    }
}
