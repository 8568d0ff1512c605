//! Block cache for the server-side and infinite row models
//!
//! Rows are fetched in fixed-size blocks addressed by
//! `floor(row / block_size)`. The cache tracks loaded and pending block
//! indices so a block is fetched at most once, and stamps every fetch
//! with a generation counter: invalidation bumps the generation, so a
//! response that arrives for an earlier generation is discarded instead
//! of being written into a store it no longer describes.

use std::collections::BTreeMap;
use std::time::Duration;

use ahash::AHashSet;
use serde_json::Value;
use tracing::{debug, warn};

use grid_core::{make_row_nodes, RowIdFn, RowNode};

/// Tuning for the block cache.
#[derive(Debug, Clone)]
pub struct BlockCacheConfig {
    /// Rows per block.
    pub block_size: usize,
    /// Delay before the first fetch after an invalidation, coalescing
    /// rapid successive sort/filter changes into one request.
    pub debounce: Duration,
    /// Advisory knob for how many blocks the renderer should request at
    /// once; the cache itself enforces only per-block dedup.
    pub max_concurrent_requests: usize,
}

impl Default for BlockCacheConfig {
    fn default() -> Self {
        Self {
            block_size: 100,
            debounce: Duration::ZERO,
            max_concurrent_requests: 2,
        }
    }
}

/// A fetch ticket handed to the driver; completions must present it
/// back so stale generations can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFetch {
    pub generation: u64,
    pub block_index: usize,
    /// First row of the block.
    pub start_row: usize,
    /// One past the last row of the block.
    pub end_row: usize,
}

/// Sparse row store plus block bookkeeping.
pub struct BlockCache {
    config: BlockCacheConfig,
    store: BTreeMap<usize, Value>,
    loaded: AHashSet<usize>,
    pending: AHashSet<usize>,
    total_count: i64,
    generation: u64,
}

impl BlockCache {
    pub fn new(config: BlockCacheConfig) -> Self {
        Self {
            config,
            store: BTreeMap::new(),
            loaded: AHashSet::new(),
            pending: AHashSet::new(),
            total_count: -1,
            generation: 0,
        }
    }

    pub fn config(&self) -> &BlockCacheConfig {
        &self.config
    }

    /// Current generation; completions from earlier generations are
    /// discarded.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Total row count reported by the datasource, `-1` while unknown.
    pub fn total_count(&self) -> i64 {
        self.total_count
    }

    /// True while any block fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_block_loaded(&self, block_index: usize) -> bool {
        self.loaded.contains(&block_index)
    }

    /// Drop everything and start a new generation. Called when the
    /// datasource, sort model, or filter model changes.
    pub fn invalidate(&mut self) {
        self.store.clear();
        self.loaded.clear();
        self.pending.clear();
        self.total_count = -1;
        self.generation += 1;
        debug!(generation = self.generation, "block cache invalidated");
    }

    /// Request the block containing `row`. Returns a fetch ticket, or
    /// `None` when the block is already loaded or already in flight --
    /// concurrent requests for one block coalesce into a single fetch.
    pub fn begin_load(&mut self, row: usize) -> Option<BlockFetch> {
        let block_index = row / self.config.block_size;
        if self.loaded.contains(&block_index) || self.pending.contains(&block_index) {
            return None;
        }
        self.pending.insert(block_index);

        let start_row = block_index * self.config.block_size;
        Some(BlockFetch {
            generation: self.generation,
            block_index,
            start_row,
            end_row: start_row + self.config.block_size,
        })
    }

    /// Apply a successful fetch. Returns false when the response was
    /// stale and discarded. Rows are written at their absolute
    /// positions; the block is marked loaded only once all of them are
    /// in the store.
    pub fn complete_success(
        &mut self,
        fetch: &BlockFetch,
        rows: Vec<Value>,
        total_count: Option<i64>,
    ) -> bool {
        if fetch.generation != self.generation {
            debug!(
                block = fetch.block_index,
                stale = fetch.generation,
                current = self.generation,
                "discarding stale block response"
            );
            return false;
        }

        for (offset, row) in rows.into_iter().take(self.config.block_size).enumerate() {
            self.store.insert(fetch.start_row + offset, row);
        }
        self.pending.remove(&fetch.block_index);
        self.loaded.insert(fetch.block_index);

        if let Some(total) = total_count {
            if total >= 0 {
                self.total_count = total;
            }
        }
        debug!(block = fetch.block_index, "block loaded");
        true
    }

    /// Apply a failed fetch: the block stays unloaded so a later request
    /// can retry, and no partial rows become visible.
    pub fn complete_failure(&mut self, fetch: &BlockFetch) {
        if fetch.generation != self.generation {
            return;
        }
        self.pending.remove(&fetch.block_index);
        warn!(block = fetch.block_index, "block load failed");
    }

    pub fn row(&self, index: usize) -> Option<&Value> {
        self.store.get(&index)
    }

    /// Number of rows currently materializable from the store.
    pub fn stored_row_count(&self) -> usize {
        self.store.len()
    }

    /// Materialize row nodes from the store in position order. The
    /// server is the source of truth for ordering; no client-side sort
    /// or filter is re-applied.
    pub fn nodes(&self, id_fn: Option<&RowIdFn>) -> Vec<RowNode> {
        make_row_nodes(self.store.values().cloned(), id_fn, 0)
    }
}
