//! Compute pipeline objects and their per-state instance cache.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::backend::{ComputePipelineCreateInfo, DeviceFeatures, DeviceProperties, PipelineBackend};
use crate::layout::{DescriptorSlotMapping, PipelineLayout};
use crate::manager::PipelineContext;
use crate::shader::{ComputePipelineShaders, ComputeShader};
use crate::spec_const::compute_spec_constants;
use crate::state::ComputePipelineStateInfo;
use crate::state_cache::StateCacheKey;

/// A compiled variant of a compute pipeline.
pub struct ComputePipelineInstance<P> {
    state: ComputePipelineStateInfo,
    pipeline: Arc<P>,
}

impl<P> ComputePipelineInstance<P> {
    pub fn state(&self) -> &ComputePipelineStateInfo {
        &self.state
    }

    pub fn pipeline(&self) -> &Arc<P> {
        &self.pipeline
    }

    pub fn is_compatible(&self, state: &ComputePipelineStateInfo) -> bool {
        self.state.is_compatible(state)
    }
}

/// One compute shader set plus every pipeline variant compiled from it.
///
/// Lookups and compiles are serialized by a single lock, which is held while a new variant
/// compiles. Two threads asking for the same missing variant therefore trigger exactly one
/// compile; threads working on different pipeline objects never wait on each other.
pub struct ComputePipeline<B: PipelineBackend> {
    ctx: Arc<PipelineContext<B>>,
    shaders: ComputePipelineShaders,
    slot_mapping: DescriptorSlotMapping,
    layout: PipelineLayout,
    instances: Mutex<Vec<ComputePipelineInstance<B::Pipeline>>>,
}

impl<B: PipelineBackend> ComputePipeline<B> {
    pub(crate) fn new(ctx: Arc<PipelineContext<B>>, shaders: ComputePipelineShaders) -> Self {
        let mut slot_mapping = DescriptorSlotMapping::new();
        shaders.cs.define_resource_slots(&mut slot_mapping);
        slot_mapping.make_descriptors_dynamic(
            ctx.options.max_dynamic_uniform_buffers,
            ctx.options.max_dynamic_storage_buffers,
        );
        let layout = PipelineLayout::new(&slot_mapping);

        Self {
            ctx,
            shaders,
            slot_mapping,
            layout,
            instances: Mutex::new(Vec::new()),
        }
    }

    pub fn shaders(&self) -> &ComputePipelineShaders {
        &self.shaders
    }

    pub fn slot_mapping(&self) -> &DescriptorSlotMapping {
        &self.slot_mapping
    }

    pub fn layout(&self) -> &PipelineLayout {
        &self.layout
    }

    /// Number of compiled variants.
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    /// Returns the pipeline for `state`, compiling it on first use.
    ///
    /// `None` means compilation failed; nothing is cached in that case, so a later call
    /// with the same state tries again.
    pub fn get_pipeline_handle(&self, state: &ComputePipelineStateInfo) -> Option<Arc<B::Pipeline>> {
        let pipeline = {
            let mut instances = self.instances.lock();

            if let Some(instance) = Self::find_instance(&instances, state) {
                self.ctx.stats.inc_instance_hits();
                return Some(instance.pipeline.clone());
            }

            self.ctx.stats.inc_instance_misses();
            self.create_instance(&mut instances, state)?
        };

        self.write_pipeline_state_to_cache(state);
        Some(pipeline)
    }

    /// Makes sure a pipeline for `state` exists, without handing it out.
    pub fn compile_pipeline(&self, state: &ComputePipelineStateInfo) {
        let mut instances = self.instances.lock();

        if Self::find_instance(&instances, state).is_none() {
            self.ctx.stats.inc_instance_misses();
            self.create_instance(&mut instances, state);
        }
    }

    fn find_instance<'a>(
        instances: &'a [ComputePipelineInstance<B::Pipeline>],
        state: &ComputePipelineStateInfo,
    ) -> Option<&'a ComputePipelineInstance<B::Pipeline>> {
        instances.iter().find(|instance| instance.is_compatible(state))
    }

    fn create_instance(
        &self,
        instances: &mut Vec<ComputePipelineInstance<B::Pipeline>>,
        state: &ComputePipelineStateInfo,
    ) -> Option<Arc<B::Pipeline>> {
        let pipeline = Arc::new(self.create_pipeline(state)?);

        self.ctx.stats.inc_compute_pipelines();
        instances.push(ComputePipelineInstance {
            state: state.clone(),
            pipeline: pipeline.clone(),
        });
        Some(pipeline)
    }

    fn create_pipeline(&self, state: &ComputePipelineStateInfo) -> Option<B::Pipeline> {
        let cs = &*self.shaders.cs;
        debug!(cs = cs.debug_name(), "compiling compute pipeline");

        let spec_constants = compute_spec_constants(self.layout.binding_count(), state);
        let (required_subgroup_size, require_full_subgroups) =
            subgroup_requirements(self.ctx.backend.features(), self.ctx.backend.properties(), cs);

        let info = ComputePipelineCreateInfo {
            shader: cs,
            layout: &self.layout,
            spec_constants: &spec_constants,
            required_subgroup_size,
            require_full_subgroups,
        };

        let t0 = Instant::now();
        match self.ctx.backend.create_compute_pipeline(&info) {
            Ok(pipeline) => {
                debug!(
                    cs = cs.debug_name(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "finished compiling compute pipeline"
                );
                Some(pipeline)
            }
            Err(err) => {
                self.ctx.stats.inc_compile_failures();
                error!(cs = cs.debug_name(), error = %err, "failed to compile compute pipeline");
                None
            }
        }
    }

    fn write_pipeline_state_to_cache(&self, state: &ComputePipelineStateInfo) {
        if !self.ctx.options.enable_state_cache {
            return;
        }
        let Some(cache) = self.ctx.state_cache.as_deref() else {
            return;
        };

        cache.add_compute_pipeline(&StateCacheKey::for_compute(&self.shaders), state);
        self.ctx.stats.inc_state_cache_writes();
    }
}

/// Decides the subgroup controls for a compute stage.
///
/// The shader's requested size is pinned only when the device supports it, the size lies in
/// `(min_subgroup_size, max_subgroup_size]` and the workgroup fits in
/// `max_compute_workgroup_subgroups` subgroups of that size. Full subgroups are required
/// whenever the device supports it and the shader requested any size.
pub(crate) fn subgroup_requirements(
    features: DeviceFeatures,
    properties: DeviceProperties,
    shader: &ComputeShader,
) -> (Option<u32>, bool) {
    let size = shader.min_subgroup_size();

    let pin = features.subgroup_size_control
        && size > properties.min_subgroup_size
        && size <= properties.max_subgroup_size
        && shader.workgroup_invocations()
            <= u64::from(size) * u64::from(properties.max_compute_workgroup_subgroups);
    let full = features.compute_full_subgroups && size != 0;

    (pin.then_some(size), full)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURES: DeviceFeatures = DeviceFeatures {
        subgroup_size_control: true,
        compute_full_subgroups: true,
    };
    const PROPERTIES: DeviceProperties = DeviceProperties {
        min_subgroup_size: 8,
        max_subgroup_size: 64,
        max_compute_workgroup_subgroups: 4,
    };

    fn shader(subgroup: u32, workgroup: [u32; 3]) -> ComputeShader {
        ComputeShader::new("cs", "", "main")
            .with_min_subgroup_size(subgroup)
            .with_workgroup_size(workgroup)
    }

    #[test]
    fn pins_supported_subgroup_size() {
        assert_eq!(
            subgroup_requirements(FEATURES, PROPERTIES, &shader(32, [64, 1, 1])),
            (Some(32), true)
        );
        // Upper bound is inclusive.
        assert_eq!(
            subgroup_requirements(FEATURES, PROPERTIES, &shader(64, [16, 16, 1])),
            (Some(64), true)
        );
    }

    #[test]
    fn minimum_subgroup_size_is_never_pinned() {
        assert_eq!(
            subgroup_requirements(FEATURES, PROPERTIES, &shader(8, [8, 1, 1])),
            (None, true)
        );
    }

    #[test]
    fn oversized_workgroups_and_sizes_are_not_pinned() {
        // 32 * 4 = 128 < 256 invocations.
        assert_eq!(
            subgroup_requirements(FEATURES, PROPERTIES, &shader(32, [16, 16, 1])),
            (None, true)
        );
        assert_eq!(
            subgroup_requirements(FEATURES, PROPERTIES, &shader(128, [1, 1, 1])),
            (None, true)
        );
    }

    #[test]
    fn no_request_means_no_controls() {
        assert_eq!(
            subgroup_requirements(FEATURES, PROPERTIES, &shader(0, [1, 1, 1])),
            (None, false)
        );
        assert_eq!(
            subgroup_requirements(DeviceFeatures::default(), PROPERTIES, &shader(32, [1, 1, 1])),
            (None, false)
        );
    }
}
