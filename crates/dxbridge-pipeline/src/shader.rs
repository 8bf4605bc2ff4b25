use core::fmt;
use std::sync::Arc;

use dxbridge_dxbc::ShaderStage;

use crate::layout::{DescriptorSlotMapping, ResourceSlot};

/// Stable identity of a shader: its stage plus a BLAKE3 hash of its code.
///
/// Keys are identical across processes for identical code, which makes them usable as
/// persisted state cache keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    stage: ShaderStage,
    hash: [u8; 32],
}

impl ShaderKey {
    pub fn new(stage: ShaderStage, code: &[u8]) -> Self {
        Self {
            stage,
            hash: *blake3::hash(code).as_bytes(),
        }
    }

    pub fn from_parts(stage: ShaderStage, hash: [u8; 32]) -> Self {
        Self { stage, hash }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }
}

fn stage_prefix(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Pixel => "ps",
        ShaderStage::Vertex => "vs",
        ShaderStage::Geometry => "gs",
        ShaderStage::Hull => "hs",
        ShaderStage::Domain => "ds",
        ShaderStage::Compute => "cs",
        ShaderStage::Unknown(_) => "xs",
    }
}

impl fmt::Display for ShaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_", stage_prefix(self.stage))?;
        for b in self.hash {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ShaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShaderKey({self})")
    }
}

/// A translated compute shader, ready to be specialized into pipelines.
#[derive(Debug, Clone)]
pub struct ComputeShader {
    key: ShaderKey,
    debug_name: String,
    wgsl: String,
    entry_point: String,
    workgroup_size: [u32; 3],
    min_subgroup_size: u32,
    slots: Vec<ResourceSlot>,
    override_ids: Vec<u32>,
}

impl ComputeShader {
    /// Creates a shader from WGSL source.
    ///
    /// The key covers the code plus everything that shapes the pipeline interface (entry
    /// point, workgroup size, subgroup size, resource slots, override ids) and is refreshed
    /// by every builder below. The debug name is not part of it.
    pub fn new(debug_name: impl Into<String>, wgsl: impl Into<String>, entry_point: &str) -> Self {
        let mut shader = Self {
            key: ShaderKey::from_parts(ShaderStage::Compute, [0; 32]),
            debug_name: debug_name.into(),
            wgsl: wgsl.into(),
            entry_point: entry_point.to_owned(),
            workgroup_size: [1, 1, 1],
            min_subgroup_size: 0,
            slots: Vec::new(),
            override_ids: Vec::new(),
        };
        shader.rehash();
        shader
    }

    pub fn with_workgroup_size(mut self, size: [u32; 3]) -> Self {
        self.workgroup_size = size;
        self.rehash();
        self
    }

    /// Requests a fixed subgroup size (`0` = no preference).
    pub fn with_min_subgroup_size(mut self, size: u32) -> Self {
        self.min_subgroup_size = size;
        self.rehash();
        self
    }

    pub fn with_resource_slots(mut self, slots: impl IntoIterator<Item = ResourceSlot>) -> Self {
        self.slots.extend(slots);
        self.rehash();
        self
    }

    /// Pipeline-overridable constant ids declared by the shader code (`@id(n) override`).
    pub fn with_override_ids(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.override_ids.extend(ids);
        self.rehash();
        self
    }

    fn rehash(&mut self) {
        let mut hasher = blake3::Hasher::new();
        let mut put_bytes = |bytes: &[u8]| {
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };
        put_bytes(self.wgsl.as_bytes());
        put_bytes(self.entry_point.as_bytes());

        for v in self.workgroup_size {
            hasher.update(&v.to_le_bytes());
        }
        hasher.update(&self.min_subgroup_size.to_le_bytes());

        hasher.update(&(self.slots.len() as u64).to_le_bytes());
        for slot in &self.slots {
            hasher.update(&slot.slot.to_le_bytes());
            hasher.update(&[slot.descriptor_type as u8, slot.view as u8]);
            hasher.update(&slot.access.bits().to_le_bytes());
        }

        hasher.update(&(self.override_ids.len() as u64).to_le_bytes());
        for id in &self.override_ids {
            hasher.update(&id.to_le_bytes());
        }

        self.key = ShaderKey::from_parts(ShaderStage::Compute, *hasher.finalize().as_bytes());
    }

    pub fn key(&self) -> ShaderKey {
        self.key
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    pub fn wgsl(&self) -> &str {
        &self.wgsl
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn workgroup_size(&self) -> [u32; 3] {
        self.workgroup_size
    }

    pub fn workgroup_invocations(&self) -> u64 {
        self.workgroup_size.iter().map(|&d| u64::from(d)).product()
    }

    pub fn min_subgroup_size(&self) -> u32 {
        self.min_subgroup_size
    }

    pub fn override_ids(&self) -> &[u32] {
        &self.override_ids
    }

    pub fn define_resource_slots(&self, mapping: &mut DescriptorSlotMapping) {
        for &slot in &self.slots {
            mapping.define_slot(slot);
        }
    }
}

/// The shader set a compute pipeline is built from.
#[derive(Debug, Clone)]
pub struct ComputePipelineShaders {
    pub cs: Arc<ComputeShader>,
}

impl ComputePipelineShaders {
    pub fn new(cs: Arc<ComputeShader>) -> Self {
        Self { cs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{AccessFlags, DescriptorType};

    #[test]
    fn key_depends_on_stage_and_code() {
        let a = ShaderKey::new(ShaderStage::Compute, b"code");
        assert_eq!(a, ShaderKey::new(ShaderStage::Compute, b"code"));
        assert_ne!(a, ShaderKey::new(ShaderStage::Compute, b"code2"));
        assert_ne!(a, ShaderKey::new(ShaderStage::Pixel, b"code"));

        let text = a.to_string();
        assert!(text.starts_with("cs_"));
        assert_eq!(text.len(), 3 + 64);
        assert_eq!(ShaderKey::from_parts(a.stage(), *a.hash()), a);
    }

    #[test]
    fn shader_defines_its_slots() {
        let shader = ComputeShader::new("cs", "@compute @workgroup_size(8, 8) fn main() {}", "main")
            .with_workgroup_size([8, 8, 1])
            .with_resource_slots([
                ResourceSlot::new(4, DescriptorType::StorageBuffer, AccessFlags::WRITE),
                ResourceSlot::new(1, DescriptorType::UniformBuffer, AccessFlags::READ),
            ]);
        assert_eq!(shader.workgroup_invocations(), 64);

        let mut mapping = DescriptorSlotMapping::new();
        shader.define_resource_slots(&mut mapping);
        assert_eq!(mapping.get_binding_id(4), Some(0));
        assert_eq!(mapping.get_binding_id(1), Some(1));
    }

    #[test]
    fn key_covers_the_pipeline_interface() {
        let base = ComputeShader::new("a", "fn main() {}", "main");
        assert_eq!(base.key(), ComputeShader::new("b", "fn main() {}", "main").key());

        let variants = [
            ComputeShader::new("a", "fn main() {}", "entry"),
            base.clone().with_workgroup_size([64, 1, 1]),
            base.clone().with_min_subgroup_size(32),
            base.clone().with_resource_slots([ResourceSlot::new(
                0,
                DescriptorType::StorageBuffer,
                AccessFlags::WRITE,
            )]),
            base.clone().with_resource_slots([ResourceSlot::new(
                0,
                DescriptorType::StorageBuffer,
                AccessFlags::READ,
            )]),
            base.clone().with_override_ids([384]),
        ];
        for (i, a) in variants.iter().enumerate() {
            assert_ne!(a.key(), base.key(), "variant {i}");
            for b in &variants[i + 1..] {
                assert_ne!(a.key(), b.key());
            }
        }
    }
}
