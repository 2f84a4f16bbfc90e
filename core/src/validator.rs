//! Pure validation functions over blocks and chains (spec §4.4).
//!
//! Nothing here touches shared state; the chain store calls these before
//! accepting gossiped blocks or adopting a candidate chain.

use crate::block::Block;

/// Checks a single block's internal consistency: its hash matches its own
/// fields, and that hash meets the block's declared difficulty.
///
/// The genesis block (index 0) is exempt from the difficulty check, since
/// it is mined at difficulty 0 by every node independently and only needs
/// to be internally consistent.
#[must_use]
pub fn validate_block(block: &Block) -> bool {
    if !block.hash_is_consistent() {
        return false;
    }
    if block.index == 0 {
        return true;
    }
    block.meets_own_difficulty()
}

/// Checks an entire chain: non-empty, starts at index 0, each block links
/// to its predecessor by index and hash, and each block is individually
/// valid.
#[must_use]
pub fn validate_chain(blocks: &[Block]) -> bool {
    let Some(genesis) = blocks.first() else {
        return false;
    };
    if genesis.index != 0 {
        return false;
    }
    if !validate_block(genesis) {
        return false;
    }

    for pair in blocks.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if curr.index != prev.index + 1 {
            return false;
        }
        if curr.prev_hash != prev.hash {
            return false;
        }
        if !validate_block(curr) {
            return false;
        }
    }

    true
}
