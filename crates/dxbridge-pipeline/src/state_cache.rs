//! Recording of (shader set, state) pairs so pipelines can be pre-compiled on a later run.
//!
//! The on-disk format is up to the [`StateCache`] implementation; this crate ships an
//! in-memory store that keeps entries in insertion order.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::shader::{ComputePipelineShaders, ShaderKey};
use crate::state::ComputePipelineStateInfo;

/// Identifies the shader set of a recorded pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateCacheKey {
    pub cs: Option<ShaderKey>,
}

impl StateCacheKey {
    pub fn for_compute(shaders: &ComputePipelineShaders) -> Self {
        Self {
            cs: Some(shaders.cs.key()),
        }
    }
}

/// One recorded compute pipeline state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateCacheEntry {
    pub key: StateCacheKey,
    pub state: ComputePipelineStateInfo,
}

/// Receives every compute pipeline state the cache compiles.
///
/// The same pair may be reported more than once, from any thread; implementations must
/// treat repeats as no-ops.
pub trait StateCache: Send + Sync {
    fn add_compute_pipeline(&self, key: &StateCacheKey, state: &ComputePipelineStateInfo);
}

#[derive(Debug, Default)]
struct MemoryStateCacheInner {
    entries: Vec<StateCacheEntry>,
    seen: HashSet<StateCacheEntry>,
}

/// In-memory [`StateCache`].
#[derive(Debug, Default)]
pub struct MemoryStateCache {
    inner: Mutex<MemoryStateCacheInner>,
}

impl MemoryStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cache pre-populated with `entries` (duplicates dropped), e.g. ones loaded
    /// from a previous run.
    pub fn from_entries(entries: impl IntoIterator<Item = StateCacheEntry>) -> Self {
        let cache = Self::new();
        for entry in entries {
            cache.add_compute_pipeline(&entry.key, &entry.state);
        }
        cache
    }

    /// All recorded entries in first-insertion order.
    pub fn entries(&self) -> Vec<StateCacheEntry> {
        self.inner.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateCache for MemoryStateCache {
    fn add_compute_pipeline(&self, key: &StateCacheKey, state: &ComputePipelineStateInfo) {
        let entry = StateCacheEntry {
            key: *key,
            state: state.clone(),
        };
        let mut inner = self.inner.lock();
        if inner.seen.insert(entry.clone()) {
            inner.entries.push(entry);
        }
    }
}
