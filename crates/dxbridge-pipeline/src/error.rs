use thiserror::Error;

/// Errors reported by a [`PipelineBackend`](crate::PipelineBackend).
///
/// These never cross the pipeline cache boundary: [`ComputePipeline`](crate::ComputePipeline)
/// logs them and hands out a null handle instead.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("shader module for {shader} failed to compile: {message}")]
    ShaderModule { shader: String, message: String },
    #[error("compute pipeline for {shader} failed to compile: {message}")]
    Compile { shader: String, message: String },
    #[error("pipeline backend unavailable: {0}")]
    Backend(String),
}
