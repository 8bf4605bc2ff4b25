//! Specialization constants passed to the pipeline compiler.

use crate::state::{ComputePipelineStateInfo, MAX_NUM_ACTIVE_BINDINGS};

/// Constant id of user specialization constant `index`.
///
/// Ids below [`MAX_NUM_ACTIVE_BINDINGS`] are reserved for per-binding "is bound" flags.
pub const fn get_spec_id(index: u32) -> u32 {
    MAX_NUM_ACTIVE_BINDINGS as u32 + index
}

/// One entry of the specialization map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecializationMapEntry {
    pub constant_id: u32,
    /// Byte offset into [`SpecConstants::data`].
    pub offset: u32,
    pub size: u32,
}

/// An ordered list of `(constant id, 32-bit value)` pairs.
///
/// Setting an id twice overwrites the earlier value in place, so the order reflects first
/// insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecConstants {
    map: Vec<SpecializationMapEntry>,
    data: Vec<u32>,
}

impl SpecConstants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, constant_id: u32, value: u32) {
        match self.map.iter().position(|e| e.constant_id == constant_id) {
            Some(index) => self.data[index] = value,
            None => {
                self.map.push(SpecializationMapEntry {
                    constant_id,
                    offset: (self.data.len() * 4) as u32,
                    size: 4,
                });
                self.data.push(value);
            }
        }
    }

    pub fn set_bool(&mut self, constant_id: u32, value: bool) {
        self.set(constant_id, u32::from(value));
    }

    pub fn get(&self, constant_id: u32) -> Option<u32> {
        self.iter()
            .find_map(|(id, value)| (id == constant_id).then_some(value))
    }

    pub fn map_entries(&self) -> &[SpecializationMapEntry] {
        &self.map
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.map
            .iter()
            .zip(self.data.iter())
            .map(|(entry, &value)| (entry.constant_id, value))
    }
}

/// Derives the specialization constants of a compute pipeline variant.
///
/// Emits one "is bound" flag per layout binding `0..binding_count` (id = binding index,
/// capped at [`MAX_NUM_ACTIVE_BINDINGS`]), then the user constants from `state` (ids from
/// [`get_spec_id`]).
pub fn compute_spec_constants(
    binding_count: u32,
    state: &ComputePipelineStateInfo,
) -> SpecConstants {
    let mut spec = SpecConstants::new();
    for binding in 0..binding_count.min(MAX_NUM_ACTIVE_BINDINGS as u32) {
        spec.set_bool(binding, state.binding_mask.test(binding));
    }
    for (index, &value) in state.sc.spec_constants.iter().enumerate() {
        spec.set(get_spec_id(index as u32), value);
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn binding_flags_precede_user_constants() {
        let mut state = ComputePipelineStateInfo::default();
        state.binding_mask.set(1, true);
        state.sc.spec_constants[2] = 0xdead;

        let spec = compute_spec_constants(3, &state);
        let pairs: Vec<_> = spec.iter().collect();
        assert_eq!(
            pairs,
            vec![
                (0, 0),
                (1, 1),
                (2, 0),
                (384, 0),
                (385, 0),
                (386, 0xdead),
                (387, 0),
                (388, 0),
                (389, 0),
                (390, 0),
                (391, 0),
            ]
        );
        assert_eq!(spec.map_entries()[3].offset, 12);
        assert!(spec.map_entries().iter().all(|e| e.size == 4));
    }

    #[test]
    fn output_is_deterministic() {
        let mut state = ComputePipelineStateInfo::default();
        state.binding_mask.set(4, true);
        state.sc.spec_constants = [1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(
            compute_spec_constants(8, &state),
            compute_spec_constants(8, &state)
        );
    }

    #[test]
    fn set_overwrites_existing_id() {
        let mut spec = SpecConstants::new();
        spec.set(7, 1);
        spec.set(3, 2);
        spec.set(7, 9);
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.get(7), Some(9));
        assert_eq!(spec.get(5), None);
        assert_eq!(spec.data(), &[9, 2]);
    }
}
