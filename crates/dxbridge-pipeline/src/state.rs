//! The render-state vector a compute pipeline variant is keyed by.

use core::fmt;

/// Upper bound on resource bindings a single pipeline layout may have.
pub const MAX_NUM_ACTIVE_BINDINGS: usize = 384;
/// Number of user specialization constants carried in the state vector.
pub const MAX_NUM_SPEC_CONSTANTS: usize = 8;
/// Size of the per-dispatch push constant block, in DWORDs.
pub const MAX_PUSH_CONSTANT_WORDS: usize = 32;

const BINDING_MASK_WORDS: usize = MAX_NUM_ACTIVE_BINDINGS / 64;

/// One bit per binding slot: set if a resource is bound there.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BindingMask {
    words: [u64; BINDING_MASK_WORDS],
}

impl BindingMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` for slots past [`MAX_NUM_ACTIVE_BINDINGS`].
    pub fn test(&self, slot: u32) -> bool {
        let slot = slot as usize;
        self.words
            .get(slot / 64)
            .is_some_and(|word| word & (1u64 << (slot % 64)) != 0)
    }

    /// Sets or clears a slot. Slots past [`MAX_NUM_ACTIVE_BINDINGS`] are ignored.
    pub fn set(&mut self, slot: u32, bound: bool) {
        let slot = slot as usize;
        if let Some(word) = self.words.get_mut(slot / 64) {
            if bound {
                *word |= 1u64 << (slot % 64);
            } else {
                *word &= !(1u64 << (slot % 64));
            }
        }
    }

    pub fn clear(&mut self) {
        self.words = [0; BINDING_MASK_WORDS];
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Bound slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..MAX_NUM_ACTIVE_BINDINGS as u32).filter(|&slot| self.test(slot))
    }
}

impl FromIterator<u32> for BindingMask {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut mask = Self::new();
        for slot in iter {
            mask.set(slot, true);
        }
        mask
    }
}

impl fmt::Debug for BindingMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// User specialization constant values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpecConstantState {
    pub spec_constants: [u32; MAX_NUM_SPEC_CONSTANTS],
}

/// Dynamic state that selects one compute pipeline variant.
///
/// Only `binding_mask` and `sc` participate in variant selection; `push_constants` is
/// recorded alongside so state cache entries replay the exact dispatch state they came
/// from, but never forces a new pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComputePipelineStateInfo {
    pub binding_mask: BindingMask,
    pub sc: SpecConstantState,
    pub push_constants: [u32; MAX_PUSH_CONSTANT_WORDS],
}

impl Default for ComputePipelineStateInfo {
    fn default() -> Self {
        Self {
            binding_mask: BindingMask::default(),
            sc: SpecConstantState::default(),
            push_constants: [0; MAX_PUSH_CONSTANT_WORDS],
        }
    }
}

impl ComputePipelineStateInfo {
    /// Whether a pipeline built for `self` can be used for `other`.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.binding_mask == other.binding_mask && self.sc == other.sc
    }
}
