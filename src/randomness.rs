//! Win/lose derivation over chain entropy.
//!
//! Commit-reveal plus a future block's hash defeats the two cheap attacks:
//! the secret was fixed before the deciding entropy existed, and the
//! deciding entropy is the hash of a block sealed strictly after the
//! commitment, folded with a monotonic global counter, the player's own
//! counter, the player identity, and current-block supplementary entropy.

use crate::{Address, Digest32, BP_SCALE};
use sha2::{Digest, Sha256};

/// One-way digest binding a secret to a player identity. Recomputed at
/// reveal time so an overheard secret is useless to anyone else.
pub fn commitment_digest(secret: &[u8], player: &Address) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(player.as_bytes());
    hasher.finalize().into()
}

/// Fold the decision inputs into a roll in `0..BP_SCALE`.
pub fn derive_roll(
    deciding_entropy: &[u8; 32],
    supplementary: &[u8; 32],
    global_nonce: u64,
    player_nonce: u64,
    player: &Address,
) -> u16 {
    let mut hasher = Sha256::new();
    hasher.update(deciding_entropy);
    hasher.update(global_nonce.to_be_bytes());
    hasher.update(player_nonce.to_be_bytes());
    hasher.update(player.as_bytes());
    hasher.update(supplementary);
    let digest = hasher.finalize();

    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(word) % u64::from(BP_SCALE)) as u16
}

/// A roll wins when it lands strictly below the configured chance.
pub fn is_winning_roll(roll: u16, win_chance_bp: u32) -> bool {
    u32::from(roll) < win_chance_bp
}
