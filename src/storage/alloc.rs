//! Per-context schema-id block allocation.
//!
//! Each process keeps a local `(current, ceiling)` window per context. When
//! the window is exhausted, the backend reserves the next block of ids from
//! its durable counter with one compare-and-swap; local allocations then
//! proceed without touching storage. Crashes abandon at most `block_size - 1`
//! ids, which is why per-context ids are monotonic but not necessarily
//! dense.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct Block {
    current: u32,
    ceiling: u32,
}

#[derive(Debug)]
pub struct IdBlocks {
    block_size: u32,
    blocks: Mutex<HashMap<String, Block>>,
}

impl IdBlocks {
    pub fn new(block_size: u32) -> Self {
        Self {
            block_size: block_size.max(1),
            blocks: Mutex::new(HashMap::new()),
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Take the next id from the local window, if one is left.
    pub fn take(&self, ctx: &str) -> Option<u32> {
        let mut blocks = self.blocks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let block = blocks.get_mut(ctx)?;
        if block.current >= block.ceiling {
            return None;
        }
        let id = block.current;
        block.current += 1;
        Some(id)
    }

    /// Install a freshly reserved block `[low, low + block_size)` and take
    /// its first id. A concurrently installed block is replaced; the ids it
    /// still held become a gap, which the contract allows.
    pub fn install(&self, ctx: &str, low: u32) -> u32 {
        let mut blocks = self.blocks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        blocks.insert(
            ctx.to_string(),
            Block {
                current: low + 1,
                ceiling: low + self.block_size,
            },
        );
        low
    }

    /// Drop the local window, forcing the next allocation to reserve a new
    /// block. Used after the durable counter is reseeded.
    pub fn invalidate(&self, ctx: &str) {
        let mut blocks = self.blocks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        blocks.remove(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_sequentially_within_a_block() {
        let blocks = IdBlocks::new(3);
        assert_eq!(blocks.take("."), None);

        assert_eq!(blocks.install(".", 1), 1);
        assert_eq!(blocks.take("."), Some(2));
        assert_eq!(blocks.take("."), Some(3));
        assert_eq!(blocks.take("."), None);

        assert_eq!(blocks.install(".", 51), 51);
        assert_eq!(blocks.take("."), Some(52));
    }

    #[test]
    fn contexts_have_independent_windows() {
        let blocks = IdBlocks::new(10);
        blocks.install(".", 1);
        blocks.install("tenant-a", 1);
        assert_eq!(blocks.take("."), Some(2));
        assert_eq!(blocks.take("tenant-a"), Some(2));
    }

    #[test]
    fn invalidate_forces_a_new_reservation() {
        let blocks = IdBlocks::new(10);
        blocks.install(".", 1);
        blocks.invalidate(".");
        assert_eq!(blocks.take("."), None);
    }

    #[test]
    fn block_size_is_at_least_one() {
        let blocks = IdBlocks::new(0);
        assert_eq!(blocks.block_size(), 1);
        assert_eq!(blocks.install(".", 7), 7);
        assert_eq!(blocks.take("."), None);
    }
}
