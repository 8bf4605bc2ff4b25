use std::sync::atomic::{AtomicU64, Ordering};

/// Pipeline manager counters, shared by every pipeline object of one manager.
///
/// Updated with relaxed atomics; readers get a consistent view of each counter but not
/// across counters.
#[derive(Debug, Default)]
pub struct PipelineStats {
    compute_pipelines: AtomicU64,
    compile_failures: AtomicU64,
    instance_hits: AtomicU64,
    instance_misses: AtomicU64,
    state_cache_writes: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_compute_pipelines(&self) {
        self.compute_pipelines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_compile_failures(&self) {
        self.compile_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_instance_hits(&self) {
        self.instance_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_instance_misses(&self) {
        self.instance_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_state_cache_writes(&self) {
        self.state_cache_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of compute pipelines compiled successfully so far.
    pub fn compute_pipelines(&self) -> u64 {
        self.compute_pipelines.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            compute_pipelines: self.compute_pipelines.load(Ordering::Relaxed),
            compile_failures: self.compile_failures.load(Ordering::Relaxed),
            instance_hits: self.instance_hits.load(Ordering::Relaxed),
            instance_misses: self.instance_misses.load(Ordering::Relaxed),
            state_cache_writes: self.state_cache_writes.load(Ordering::Relaxed),
        }
    }

    /// Returns a JSON object as a string.
    pub fn to_json(&self) -> String {
        self.snapshot().to_json()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStatsSnapshot {
    pub compute_pipelines: u64,
    pub compile_failures: u64,
    pub instance_hits: u64,
    pub instance_misses: u64,
    pub state_cache_writes: u64,
}

impl PipelineStatsSnapshot {
    pub fn to_json(self) -> String {
        format!(
            "{{\"compute_pipelines\":{},\"compile_failures\":{},\"instance_hits\":{},\"instance_misses\":{},\"state_cache_writes\":{}}}",
            self.compute_pipelines,
            self.compile_failures,
            self.instance_hits,
            self.instance_misses,
            self.state_cache_writes,
        )
    }
}
