//! The seam between the pipeline cache and the GPU API that actually compiles pipelines.

use crate::error::PipelineError;
use crate::layout::PipelineLayout;
use crate::shader::ComputeShader;
use crate::spec_const::SpecConstants;

/// Optional device features the compute pipeline compiler cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceFeatures {
    /// A pipeline may pin the subgroup size of its compute stage.
    pub subgroup_size_control: bool,
    /// A pipeline may require full subgroups in its compute stage.
    pub compute_full_subgroups: bool,
}

/// Device limits related to subgroup size control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceProperties {
    pub min_subgroup_size: u32,
    pub max_subgroup_size: u32,
    pub max_compute_workgroup_subgroups: u32,
}

/// Everything needed to compile one compute pipeline variant.
#[derive(Debug, Clone, Copy)]
pub struct ComputePipelineCreateInfo<'a> {
    pub shader: &'a ComputeShader,
    pub layout: &'a PipelineLayout,
    pub spec_constants: &'a SpecConstants,
    /// Subgroup size the compute stage must run with, if pinned.
    pub required_subgroup_size: Option<u32>,
    pub require_full_subgroups: bool,
}

/// A GPU API capable of compiling compute pipelines.
///
/// Implementations are shared between threads; `create_compute_pipeline` may be called
/// concurrently for different pipeline objects.
pub trait PipelineBackend: Send + Sync {
    /// Compiled pipeline handle.
    type Pipeline: Send + Sync;

    fn features(&self) -> DeviceFeatures;

    fn properties(&self) -> DeviceProperties;

    /// Compiles a pipeline. May block for a long time.
    fn create_compute_pipeline(
        &self,
        info: &ComputePipelineCreateInfo<'_>,
    ) -> Result<Self::Pipeline, PipelineError>;
}
