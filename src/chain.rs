//! Chain context and entropy plumbing.
//!
//! The engine never reads a clock or an RNG of its own: every operation is
//! handed a [`BlockContext`], and win/lose entropy comes from an
//! [`EntropySource`] chosen once at construction. Production wires a real
//! chain view; tests and the simulator use [`SimulatedChain`].

use crate::{Address, ENTROPY_LOOKBACK_BLOCKS};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::RwLock;

/// Position of an operation in the serialized log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockContext {
    pub height: u64,
    /// Unix seconds of the block being executed.
    pub timestamp: u64,
}

/// Source of chain entropy, selected once at engine construction.
pub trait EntropySource: Send + Sync {
    /// Hash of the sealed block at `height`, if it is still within the
    /// lookback window. `None` once the chain has moved too far past it.
    fn block_entropy(&self, height: u64) -> Option<[u8; 32]>;

    /// Supplementary entropy of the current block (beacon value).
    fn supplementary(&self) -> [u8; 32];

    /// Weak fallback when the deciding block hash is no longer available:
    /// the beacon and proposer identity folded with the caller's timestamp.
    fn fallback(&self, timestamp: u64) -> [u8; 32];
}

const DEFAULT_BLOCK_INTERVAL_SECS: u64 = 12;

/// Deterministic in-memory chain: seeded block hashes, a rolling beacon,
/// and the same lookback limit a real chain imposes.
pub struct SimulatedChain {
    inner: RwLock<ChainState>,
    block_interval_secs: u64,
}

struct ChainState {
    head: u64,
    timestamp: u64,
    /// Hashes of sealed blocks, oldest first; back() is the head block.
    hashes: VecDeque<[u8; 32]>,
    beacon: [u8; 32],
    proposer: Address,
    rng: StdRng,
}

impl ChainState {
    fn next_word(&mut self) -> [u8; 32] {
        let mut word = [0u8; 32];
        self.rng.fill_bytes(&mut word);
        word
    }
}

impl SimulatedChain {
    pub fn new(seed: u64, genesis_timestamp: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut genesis_hash = [0u8; 32];
        rng.fill_bytes(&mut genesis_hash);
        let mut beacon = [0u8; 32];
        rng.fill_bytes(&mut beacon);
        let mut proposer = [0u8; 32];
        rng.fill_bytes(&mut proposer);

        let mut hashes = VecDeque::new();
        hashes.push_back(genesis_hash);

        Self {
            inner: RwLock::new(ChainState {
                head: 0,
                timestamp: genesis_timestamp,
                hashes,
                beacon,
                proposer: Address(proposer),
                rng,
            }),
            block_interval_secs: DEFAULT_BLOCK_INTERVAL_SECS,
        }
    }

    pub fn with_block_interval(mut self, secs: u64) -> Self {
        self.block_interval_secs = secs;
        self
    }

    /// Seal the next block and return its context.
    pub fn advance(&self) -> BlockContext {
        let mut state = self.inner.write().expect("chain lock poisoned");
        state.head += 1;
        state.timestamp += self.block_interval_secs;
        let hash = state.next_word();
        state.beacon = state.next_word();
        state.hashes.push_back(hash);
        // Retain one extra entry past the lookback so the boundary case is
        // exercised rather than silently clipped.
        while state.hashes.len() as u64 > ENTROPY_LOOKBACK_BLOCKS + 2 {
            state.hashes.pop_front();
        }
        BlockContext {
            height: state.head,
            timestamp: state.timestamp,
        }
    }

    pub fn advance_by(&self, blocks: u64) -> BlockContext {
        let mut context = self.context();
        for _ in 0..blocks {
            context = self.advance();
        }
        context
    }

    pub fn context(&self) -> BlockContext {
        let state = self.inner.read().expect("chain lock poisoned");
        BlockContext {
            height: state.head,
            timestamp: state.timestamp,
        }
    }
}

impl EntropySource for SimulatedChain {
    fn block_entropy(&self, height: u64) -> Option<[u8; 32]> {
        let state = self.inner.read().expect("chain lock poisoned");
        if height >= state.head {
            return None;
        }
        let depth = state.head - height;
        if depth > ENTROPY_LOOKBACK_BLOCKS {
            return None;
        }
        let newest = state.hashes.len() - 1;
        state.hashes.get(newest - depth as usize).copied()
    }

    fn supplementary(&self) -> [u8; 32] {
        self.inner.read().expect("chain lock poisoned").beacon
    }

    fn fallback(&self, timestamp: u64) -> [u8; 32] {
        let state = self.inner.read().expect("chain lock poisoned");
        let mut hasher = Sha256::new();
        hasher.update(timestamp.to_be_bytes());
        hasher.update(state.beacon);
        hasher.update(state.proposer.as_bytes());
        hasher.finalize().into()
    }
}
