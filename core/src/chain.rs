//! The chain store (spec §4.3): an in-memory, mutex-guarded block vector,
//! plus a broadcast channel that hands freshly appended blocks to the
//! replication layer without the store knowing anything about peers.

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::block::{Block, TxKind};
use crate::error::{AppError, AppResult};
use crate::mining::{mine, DIFFICULTY};
use crate::validator::validate_chain;

/// Capacity of the broadcast channel handed to `Chain::new`. A slow or
/// absent subscriber simply misses old blocks; the replicator always reads
/// the freshest local state via `snapshot`, so lag here is harmless.
const BROADCAST_CAPACITY: usize = 256;

/// Owns the authoritative local copy of the chain.
///
/// Mining is synchronous CPU-bound work performed while `blocks` is held,
/// so this uses `std::sync::Mutex` rather than `tokio::sync::Mutex` — no
/// `.await` ever happens under the lock.
pub struct Chain {
    blocks: Mutex<Vec<Block>>,
    new_blocks: broadcast::Sender<Block>,
}

impl Chain {
    /// Builds a fresh chain containing only the genesis block.
    #[must_use]
    pub fn new() -> Self {
        let (new_blocks, _) = broadcast::channel(BROADCAST_CAPACITY);
        let genesis = mine(
            Block::candidate(0, TxKind::Genesis, &crate::block::GenesisPayload {}, String::new(), 0)
                .expect("genesis payload always serializes"),
            0,
        );
        Self {
            blocks: Mutex::new(vec![genesis]),
            new_blocks,
        }
    }

    /// Subscribes to blocks as they are appended locally.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Block> {
        self.new_blocks.subscribe()
    }

    /// Returns a clone of the full chain.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks.lock().expect("chain mutex poisoned").clone()
    }

    /// Number of blocks currently held.
    #[must_use]
    pub fn length(&self) -> usize {
        self.blocks.lock().expect("chain mutex poisoned").len()
    }

    /// Mines and appends one new block on top of the current tip, then
    /// broadcasts it to subscribers.
    pub fn append(&self, kind: TxKind, payload: &impl Serialize) -> AppResult<Block> {
        let mined = {
            let mut guard = self.blocks.lock().expect("chain mutex poisoned");
            let tip = guard.last().expect("chain always has a genesis block");
            let candidate = Block::candidate(
                tip.index + 1,
                kind,
                payload,
                tip.hash.clone(),
                DIFFICULTY,
            )?;
            let mined = mine(candidate, DIFFICULTY);
            guard.push(mined.clone());
            mined
        };
        debug!(index = mined.index, kind = %mined.kind, "appended block");
        // A send error just means nobody is currently subscribed; the block
        // is already durable in `blocks`.
        let _ = self.new_blocks.send(mined.clone());
        Ok(mined)
    }

    /// Mines and appends one new block with a raw, un-typed kind/payload
    /// pair, bypassing the `TxKind` taxonomy. Backs the `/adicionar`
    /// diagnostic endpoint (spec §6).
    pub fn append_raw(&self, kind: String, payload: String) -> Block {
        let mined = {
            let mut guard = self.blocks.lock().expect("chain mutex poisoned");
            let tip = guard.last().expect("chain always has a genesis block");
            let candidate =
                Block::candidate_raw(tip.index + 1, kind, payload, tip.hash.clone(), DIFFICULTY);
            let mined = mine(candidate, DIFFICULTY);
            guard.push(mined.clone());
            mined
        };
        debug!(index = mined.index, kind = %mined.kind, "appended raw block");
        let _ = self.new_blocks.send(mined.clone());
        mined
    }

    /// Accepts a single inbound block if it extends the current tip and is
    /// individually valid. Used for gossip of newly mined blocks; a peer
    /// that has fallen behind instead needs `replace` with a full chain.
    pub fn accept_single(&self, block: Block) -> AppResult<()> {
        let mut guard = self.blocks.lock().expect("chain mutex poisoned");
        let tip = guard.last().expect("chain always has a genesis block");
        if block.index != tip.index + 1 || block.prev_hash != tip.hash {
            return Err(AppError::IntegrityRejection(
                "block does not extend the current tip".to_string(),
            ));
        }
        if !block.hash_is_consistent() || !block.meets_own_difficulty() {
            return Err(AppError::IntegrityRejection(
                "block hash is inconsistent or under difficulty".to_string(),
            ));
        }
        guard.push(block.clone());
        drop(guard);
        info!(index = block.index, "accepted gossiped block");
        let _ = self.new_blocks.send(block);
        Ok(())
    }

    /// Replaces the local chain with `candidate` if it validates and is
    /// strictly longer (spec §4.3/§4.4 fork choice: longest valid chain).
    pub fn replace(&self, candidate: Vec<Block>) -> AppResult<bool> {
        let mut guard = self.blocks.lock().expect("chain mutex poisoned");
        if candidate.len() <= guard.len() {
            return Ok(false);
        }
        if !validate_chain(&candidate) {
            return Err(AppError::IntegrityRejection(
                "candidate chain failed validation".to_string(),
            ));
        }
        info!(
            old_len = guard.len(),
            new_len = candidate.len(),
            "replacing local chain with longer valid chain"
        );
        *guard = candidate;
        Ok(true)
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}
