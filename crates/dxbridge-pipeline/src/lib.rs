//! Compute pipeline cache.
//!
//! A [`PipelineManager`] owns one [`ComputePipeline`] per distinct compute shader. Each of
//! those compiles a variant per distinct [`ComputePipelineStateInfo`] on first use and
//! caches it; compiled states are reported to an optional [`StateCache`] so a later run can
//! pre-compile them with [`PipelineManager::replay_state_cache`].
//!
//! Compilation itself is delegated to a [`PipelineBackend`]. With the default `wgpu`
//! feature, [`WgpuBackend`] compiles WGSL through `wgpu`.

#![forbid(unsafe_code)]

mod backend;
mod compute;
mod error;
mod layout;
mod manager;
mod options;
mod shader;
mod spec_const;
mod state;
mod state_cache;
mod stats;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use backend::{ComputePipelineCreateInfo, DeviceFeatures, DeviceProperties, PipelineBackend};
pub use compute::{ComputePipeline, ComputePipelineInstance};
pub use error::PipelineError;
pub use layout::{
    AccessFlags, DescriptorSlotMapping, DescriptorType, PipelineLayout, ResourceSlot, ViewType,
};
pub use manager::{PipelineManager, ReplaySummary};
pub use options::PipelineOptions;
pub use shader::{ComputePipelineShaders, ComputeShader, ShaderKey};
pub use spec_const::{compute_spec_constants, get_spec_id, SpecConstants, SpecializationMapEntry};
pub use state::{
    BindingMask, ComputePipelineStateInfo, SpecConstantState, MAX_NUM_ACTIVE_BINDINGS,
    MAX_NUM_SPEC_CONSTANTS, MAX_PUSH_CONSTANT_WORDS,
};
pub use state_cache::{MemoryStateCache, StateCache, StateCacheEntry, StateCacheKey};
pub use stats::{PipelineStats, PipelineStatsSnapshot};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuBackend;
