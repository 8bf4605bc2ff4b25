//! Shared helpers for `dxbridge-pipeline` integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dxbridge_pipeline::{
    ComputePipelineCreateInfo, ComputePipelineShaders, ComputeShader, DeviceFeatures,
    DeviceProperties, PipelineBackend, PipelineError, SpecConstants,
};

/// What the mock backend was asked to build.
#[derive(Debug)]
pub struct MockPipeline {
    pub serial: usize,
    pub shader: String,
    pub spec_constants: SpecConstants,
    pub required_subgroup_size: Option<u32>,
    pub require_full_subgroups: bool,
}

/// Backend that "compiles" by recording the request, optionally slowly or unsuccessfully.
#[derive(Default)]
pub struct MockBackend {
    pub features: DeviceFeatures,
    pub properties: DeviceProperties,
    pub delay: Duration,
    compiles: AtomicUsize,
    fail: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn with_device(features: DeviceFeatures, properties: DeviceProperties) -> Self {
        Self {
            features,
            properties,
            ..Self::default()
        }
    }

    /// Number of compile requests seen, successful or not.
    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl PipelineBackend for MockBackend {
    type Pipeline = MockPipeline;

    fn features(&self) -> DeviceFeatures {
        self.features
    }

    fn properties(&self) -> DeviceProperties {
        self.properties
    }

    fn create_compute_pipeline(
        &self,
        info: &ComputePipelineCreateInfo<'_>,
    ) -> Result<Self::Pipeline, PipelineError> {
        let serial = self.compiles.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::Compile {
                shader: info.shader.debug_name().to_owned(),
                message: "injected failure".into(),
            });
        }

        Ok(MockPipeline {
            serial,
            shader: info.shader.debug_name().to_owned(),
            spec_constants: info.spec_constants.clone(),
            required_subgroup_size: info.required_subgroup_size,
            require_full_subgroups: info.require_full_subgroups,
        })
    }
}

pub fn shaders(name: &str, wgsl: &str) -> ComputePipelineShaders {
    shaders_from(ComputeShader::new(name, wgsl, "main"))
}

pub fn shaders_from(cs: ComputeShader) -> ComputePipelineShaders {
    ComputePipelineShaders::new(Arc::new(cs))
}

/// Installs a `tracing` subscriber that writes through the test harness's capture.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
