use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::backend::PipelineBackend;
use crate::compute::ComputePipeline;
use crate::options::PipelineOptions;
use crate::shader::{ComputePipelineShaders, ShaderKey};
use crate::state_cache::{StateCache, StateCacheEntry, StateCacheKey};
use crate::stats::PipelineStats;

/// State shared by a manager and every pipeline object it created.
pub(crate) struct PipelineContext<B: PipelineBackend> {
    pub(crate) backend: B,
    pub(crate) options: PipelineOptions,
    pub(crate) stats: PipelineStats,
    pub(crate) state_cache: Option<Arc<dyn StateCache>>,
}

/// Outcome of [`PipelineManager::replay_state_cache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    /// Entries whose shaders were found and whose pipeline now exists (or failed to compile).
    pub replayed: usize,
    /// Entries whose shaders could not be resolved.
    pub skipped: usize,
}

/// Creates and owns compute pipeline objects, one per distinct shader set.
pub struct PipelineManager<B: PipelineBackend> {
    ctx: Arc<PipelineContext<B>>,
    compute_pipelines: Mutex<HashMap<ShaderKey, Arc<ComputePipeline<B>>>>,
}

impl<B: PipelineBackend> PipelineManager<B> {
    pub fn new(backend: B, options: PipelineOptions, state_cache: Option<Arc<dyn StateCache>>) -> Self {
        Self {
            ctx: Arc::new(PipelineContext {
                backend,
                options,
                stats: PipelineStats::new(),
                state_cache,
            }),
            compute_pipelines: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.ctx.backend
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.ctx.options
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.ctx.stats
    }

    /// Returns the pipeline object for `shaders`, creating it on first use.
    ///
    /// Shader sets are identified by their shader keys, so two sets with identical code
    /// share one object.
    pub fn create_compute_pipeline(&self, shaders: ComputePipelineShaders) -> Arc<ComputePipeline<B>> {
        let key = shaders.cs.key();
        let mut pipelines = self.compute_pipelines.lock();
        pipelines
            .entry(key)
            .or_insert_with(|| {
                debug!(cs = shaders.cs.debug_name(), %key, "creating compute pipeline object");
                Arc::new(ComputePipeline::new(self.ctx.clone(), shaders))
            })
            .clone()
    }

    /// Number of distinct compute pipeline objects.
    pub fn compute_pipeline_count(&self) -> usize {
        self.compute_pipelines.lock().len()
    }

    /// Pre-compiles previously recorded pipeline states.
    ///
    /// `resolve` maps a recorded key back to the shader set it was built from; entries it
    /// cannot resolve are skipped. Work is spread over `workers` threads (`0` uses
    /// [`PipelineOptions::compiler_threads`]). Returns once every entry has been handled.
    pub fn replay_state_cache<F>(
        &self,
        entries: &[StateCacheEntry],
        resolve: F,
        workers: usize,
    ) -> ReplaySummary
    where
        F: Fn(&StateCacheKey) -> Option<ComputePipelineShaders> + Sync,
    {
        let workers = match workers {
            0 => self.ctx.options.effective_compiler_threads(),
            n => n,
        }
        .clamp(1, entries.len().max(1));

        let next = AtomicUsize::new(0);
        let replayed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(entry) = entries.get(index) else {
                        break;
                    };

                    match resolve(&entry.key) {
                        Some(shaders) => {
                            self.create_compute_pipeline(shaders)
                                .compile_pipeline(&entry.state);
                            replayed.fetch_add(1, Ordering::Relaxed);
                        }
                        None => {
                            warn!(key = ?entry.key, "skipping state cache entry with unknown shaders");
                            skipped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        ReplaySummary {
            replayed: replayed.into_inner(),
            skipped: skipped.into_inner(),
        }
    }
}
