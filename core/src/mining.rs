//! Single-threaded proof-of-work search (spec §4.2).
//!
//! Mining runs synchronously on whatever task calls it, with no background
//! thread and no cancellation flag — a betting ledger mines one block at a
//! time behind the chain's mutex, and the short, fixed difficulty (spec
//! §4.2) keeps that hold time bounded.

use shared::Hash256;

use crate::block::Block;

/// Leading hex zero characters a mined block's hash must have.
pub const DIFFICULTY: u32 = 3;

/// The outcome of a successful search: the winning nonce and its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningResult {
    pub nonce: u64,
    pub hash: Hash256,
}

/// Searches nonces in order starting from the candidate's current nonce
/// until its hash meets `difficulty`, then returns the block with its
/// `nonce` and `hash` fields filled in.
///
/// This never fails to terminate: each nonce has an independent
/// `difficulty`-in-16 chance of meeting the target, so the loop halts with
/// probability 1.
#[must_use]
pub fn mine(mut candidate: Block, difficulty: u32) -> Block {
    candidate.difficulty = difficulty;
    let mut nonce = candidate.nonce;
    loop {
        candidate.nonce = nonce;
        let hash = candidate.recompute_hash();
        if hash.meets_difficulty(difficulty) {
            candidate.hash = hash.to_string();
            return candidate;
        }
        nonce += 1;
    }
}
