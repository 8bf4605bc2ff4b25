//! Resource slot to binding mapping and the pipeline layout built from it.
//!
//! Shaders address resources by *slot* (a stable number assigned at translation time).
//! A [`DescriptorSlotMapping`] collects the slots a pipeline's shaders use and assigns them
//! dense binding indices in definition order; the binding index doubles as the
//! specialization constant id of the slot's "is bound" flag.

use bitflags::bitflags;

/// Kind of descriptor bound at a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Sampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    UniformBufferDynamic,
    StorageBufferDynamic,
}

impl DescriptorType {
    fn dynamic_variant(self) -> Self {
        match self {
            Self::UniformBuffer => Self::UniformBufferDynamic,
            Self::StorageBuffer => Self::StorageBufferDynamic,
            other => other,
        }
    }
}

/// View dimension of an image or texel buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewType {
    /// Buffers and samplers.
    #[default]
    None,
    D1,
    D1Array,
    D2,
    D2Array,
    Cube,
    CubeArray,
    D3,
    Buffer,
}

bitflags! {
    /// How a shader accesses a slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const ATOMIC = 1 << 2;
    }
}

/// A resource slot used by a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceSlot {
    pub slot: u32,
    pub descriptor_type: DescriptorType,
    pub view: ViewType,
    pub access: AccessFlags,
}

impl ResourceSlot {
    pub fn new(slot: u32, descriptor_type: DescriptorType, access: AccessFlags) -> Self {
        Self {
            slot,
            descriptor_type,
            view: ViewType::None,
            access,
        }
    }

    pub fn with_view(mut self, view: ViewType) -> Self {
        self.view = view;
        self
    }
}

/// Slots of one pipeline, in binding order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorSlotMapping {
    descriptor_slots: Vec<ResourceSlot>,
}

impl DescriptorSlotMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `slot`, or merges its access flags into an existing definition of the same slot.
    pub fn define_slot(&mut self, slot: ResourceSlot) {
        match self.descriptor_slots.iter_mut().find(|s| s.slot == slot.slot) {
            Some(existing) => existing.access |= slot.access,
            None => self.descriptor_slots.push(slot),
        }
    }

    pub fn binding_count(&self) -> u32 {
        self.descriptor_slots.len() as u32
    }

    pub fn bindings(&self) -> &[ResourceSlot] {
        &self.descriptor_slots
    }

    /// Binding index of `slot`, if it was defined.
    pub fn get_binding_id(&self, slot: u32) -> Option<u32> {
        self.descriptor_slots
            .iter()
            .position(|s| s.slot == slot)
            .map(|index| index as u32)
    }

    /// Switches uniform and storage buffers to their dynamic-offset variants.
    ///
    /// Each class is converted only when every buffer of that class fits in the device limit
    /// given for it; otherwise that class is left untouched.
    pub fn make_descriptors_dynamic(&mut self, max_uniform_buffers: u32, max_storage_buffers: u32) {
        let count = |ty: DescriptorType| {
            self.descriptor_slots
                .iter()
                .filter(|s| s.descriptor_type == ty)
                .count() as u32
        };
        let convert_uniform = count(DescriptorType::UniformBuffer) <= max_uniform_buffers;
        let convert_storage = count(DescriptorType::StorageBuffer) <= max_storage_buffers;

        for slot in &mut self.descriptor_slots {
            let convert = match slot.descriptor_type {
                DescriptorType::UniformBuffer => convert_uniform,
                DescriptorType::StorageBuffer => convert_storage,
                _ => false,
            };
            if convert {
                slot.descriptor_type = slot.descriptor_type.dynamic_variant();
            }
        }
    }
}

/// The binding interface of a pipeline, fixed for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineLayout {
    bindings: Vec<ResourceSlot>,
}

impl PipelineLayout {
    pub fn new(mapping: &DescriptorSlotMapping) -> Self {
        Self {
            bindings: mapping.bindings().to_vec(),
        }
    }

    pub fn binding_count(&self) -> u32 {
        self.bindings.len() as u32
    }

    pub fn binding(&self, id: u32) -> Option<&ResourceSlot> {
        self.bindings.get(id as usize)
    }

    pub fn bindings(&self) -> &[ResourceSlot] {
        &self.bindings
    }

    /// Number of bindings that take a dynamic offset at bind time.
    pub fn dynamic_binding_count(&self) -> u32 {
        self.bindings
            .iter()
            .filter(|b| {
                matches!(
                    b.descriptor_type,
                    DescriptorType::UniformBufferDynamic | DescriptorType::StorageBufferDynamic
                )
            })
            .count() as u32
    }
}
