//! [`PipelineBackend`] on top of `wgpu`.
//!
//! Specialization constants are passed as WGSL pipeline-overridable constants: a shader lists
//! the constant ids it declares (`@id(n) override ...`) and only those are forwarded. Subgroup
//! size control is not exposed by `wgpu`, so the backend reports it as unsupported.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::backend::{ComputePipelineCreateInfo, DeviceFeatures, DeviceProperties, PipelineBackend};
use crate::error::PipelineError;
use crate::shader::{ComputeShader, ShaderKey};
use crate::spec_const::SpecConstants;

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    modules: Mutex<HashMap<ShaderKey, Arc<wgpu::ShaderModule>>>,
    // Error scopes are device-wide; scoped sections must not interleave between threads.
    scope_lock: Mutex<()>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            modules: Mutex::new(HashMap::new()),
            scope_lock: Mutex::new(()),
        }
    }

    /// Creates a backend on a freshly requested device with no presentation surface.
    pub async fn new_headless() -> Result<Self, PipelineError> {
        // GL first on Linux: some Vulkan software adapters are unstable in CI.
        let adapter = if cfg!(target_os = "linux") {
            match request_adapter(wgpu::Backends::GL).await {
                Some(adapter) => Some(adapter),
                None => request_adapter(wgpu::Backends::PRIMARY).await,
            }
        } else {
            request_adapter(wgpu::Backends::PRIMARY).await
        }
        .ok_or_else(|| PipelineError::Backend("no suitable wgpu adapter found".into()))?;

        if !adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(PipelineError::Backend(
                "adapter does not support compute shaders".into(),
            ));
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("dxbridge pipeline backend"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await
            .map_err(|err| PipelineError::Backend(err.to_string()))?;

        Ok(Self::new(device, queue))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn shader_module(&self, shader: &ComputeShader) -> Result<Arc<wgpu::ShaderModule>, PipelineError> {
        if let Some(module) = self.modules.lock().get(&shader.key()) {
            return Ok(module.clone());
        }

        let module = {
            let _scope = self.scope_lock.lock();
            self.device.push_error_scope(wgpu::ErrorFilter::Validation);
            let module = self
                .device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(shader.debug_name()),
                    source: wgpu::ShaderSource::Wgsl(shader.wgsl().into()),
                });
            if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
                return Err(PipelineError::ShaderModule {
                    shader: shader.debug_name().to_owned(),
                    message: err.to_string(),
                });
            }
            Arc::new(module)
        };

        Ok(self
            .modules
            .lock()
            .entry(shader.key())
            .or_insert(module)
            .clone())
    }
}

async fn request_adapter(backends: wgpu::Backends) -> Option<wgpu::Adapter> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    });
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
}

/// Values for the override constants `shader` declares, keyed the way WGSL names numeric ids.
///
/// Ids with no value keep the default written in the shader.
fn override_constants(shader: &ComputeShader, spec_constants: &SpecConstants) -> HashMap<String, f64> {
    shader
        .override_ids()
        .iter()
        .filter_map(|&id| Some((id.to_string(), f64::from(spec_constants.get(id)?))))
        .collect()
}

impl PipelineBackend for WgpuBackend {
    type Pipeline = wgpu::ComputePipeline;

    fn features(&self) -> DeviceFeatures {
        DeviceFeatures::default()
    }

    fn properties(&self) -> DeviceProperties {
        DeviceProperties::default()
    }

    fn create_compute_pipeline(
        &self,
        info: &ComputePipelineCreateInfo<'_>,
    ) -> Result<Self::Pipeline, PipelineError> {
        let shader = info.shader;
        let module = self.shader_module(shader)?;
        let constants = override_constants(shader, info.spec_constants);
        debug!(
            cs = shader.debug_name(),
            overrides = constants.len(),
            "creating wgpu compute pipeline"
        );

        let _scope = self.scope_lock.lock();
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(shader.debug_name()),
                // Bind group layouts are derived from the shader.
                layout: None,
                module: &module,
                entry_point: shader.entry_point(),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(PipelineError::Compile {
                shader: shader.debug_name().to_owned(),
                message: err.to_string(),
            });
        }

        Ok(pipeline)
    }
}
