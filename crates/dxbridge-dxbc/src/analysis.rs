//! Single-pass analysis of a decoded SM4/SM5 instruction stream.
//!
//! The analyzer walks instructions in program order and records the metadata a shader
//! translator needs before it can declare its interface: clip/cull plane counts, implicit
//! texture/sampler pairings, per-UAV access kinds and whether the shader uses derivatives or
//! `discard`.

use tracing::trace;

use crate::signature::{SignatureChunk, SystemValue};
use crate::sm4::{DxbcInstClass, DxbcOpcode, DxbcOperandType, DxbcRegister, DxbcShaderInstruction};

/// Number of `t#` slots tracked for texture/sampler pairing.
pub const MAX_TEXTURE_SLOTS: usize = 128;
/// Number of `s#` slots tracked for texture/sampler pairing.
pub const MAX_SAMPLER_SLOTS: usize = 16;
/// Number of `u#` slots tracked for UAV access flags.
pub const MAX_UAV_SLOTS: usize = 64;

/// The slot has not been used in any sample/gather instruction yet.
pub const PAIRING_UNASSIGNED: i32 = -1;
/// The slot has been used with more than one partner. Once set, it never changes.
pub const PAIRING_AMBIGUOUS: i32 = -2;

/// Number of active clip and cull distance components in one signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipCullInfo {
    pub num_clip_planes: u32,
    pub num_cull_planes: u32,
}

/// How a shader accesses one UAV slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UavInfo {
    pub access_atomic_op: bool,
    pub access_typed_load: bool,
}

/// Everything the analyzer learned about a shader.
///
/// Pairing arrays hold the partner slot (`>= 0`), [`PAIRING_UNASSIGNED`] or
/// [`PAIRING_AMBIGUOUS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisInfo {
    pub clip_cull_in: ClipCullInfo,
    pub clip_cull_out: ClipCullInfo,
    pub texture_sampler_ids: [i32; MAX_TEXTURE_SLOTS],
    pub sampler_texture_ids: [i32; MAX_SAMPLER_SLOTS],
    pub uav_infos: [UavInfo; MAX_UAV_SLOTS],
    pub uses_derivatives: bool,
    pub uses_kill: bool,
}

impl Default for AnalysisInfo {
    fn default() -> Self {
        Self {
            clip_cull_in: ClipCullInfo::default(),
            clip_cull_out: ClipCullInfo::default(),
            texture_sampler_ids: [PAIRING_UNASSIGNED; MAX_TEXTURE_SLOTS],
            sampler_texture_ids: [PAIRING_UNASSIGNED; MAX_SAMPLER_SLOTS],
            uav_infos: [UavInfo::default(); MAX_UAV_SLOTS],
            uses_derivatives: false,
            uses_kill: false,
        }
    }
}

impl AnalysisInfo {
    /// The one sampler texture `t#` is always used with, if it is unambiguous.
    pub fn paired_sampler(&self, texture: usize) -> Option<u32> {
        let id = *self.texture_sampler_ids.get(texture)?;
        u32::try_from(id).ok()
    }

    /// The one texture sampler `s#` is always used with, if it is unambiguous.
    pub fn paired_texture(&self, sampler: usize) -> Option<u32> {
        let id = *self.sampler_texture_ids.get(sampler)?;
        u32::try_from(id).ok()
    }
}

/// Incremental analyzer over one shader's instruction stream.
pub struct DxbcAnalyzer<'a> {
    isgn: Option<&'a SignatureChunk>,
    osgn: Option<&'a SignatureChunk>,
    psgn: Option<&'a SignatureChunk>,
    info: AnalysisInfo,
}

impl<'a> DxbcAnalyzer<'a> {
    /// Creates an analyzer for a shader with the given input, output and patch constant
    /// signatures. Clip/cull counts are computed here; a missing signature counts as empty.
    pub fn new(
        isgn: Option<&'a SignatureChunk>,
        osgn: Option<&'a SignatureChunk>,
        psgn: Option<&'a SignatureChunk>,
    ) -> Self {
        let info = AnalysisInfo {
            clip_cull_in: clip_cull_info(isgn),
            clip_cull_out: clip_cull_info(osgn),
            ..AnalysisInfo::default()
        };
        Self {
            isgn,
            osgn,
            psgn,
            info,
        }
    }

    pub fn input_signature(&self) -> Option<&'a SignatureChunk> {
        self.isgn
    }

    pub fn output_signature(&self) -> Option<&'a SignatureChunk> {
        self.osgn
    }

    /// Kept for hull/domain shader translation; the analysis itself never reads it.
    pub fn patch_constant_signature(&self) -> Option<&'a SignatureChunk> {
        self.psgn
    }

    /// Feeds the next instruction in program order.
    pub fn process_instruction(&mut self, ins: &DxbcShaderInstruction) {
        match ins.op_class {
            DxbcInstClass::Atomic => {
                let Some(dst) = ins.dst.last() else {
                    trace!(op = ?ins.op, "atomic without destination operand");
                    return;
                };
                if dst.ty == DxbcOperandType::UnorderedAccessView {
                    if let Some(uav) = self.uav_mut(dst) {
                        uav.access_atomic_op = true;
                    }
                }
            }
            DxbcInstClass::TextureSample | DxbcInstClass::TextureQueryLod => {
                self.info.uses_derivatives = true;
                self.handle_texture_access(ins);
            }
            DxbcInstClass::TextureGather => self.handle_texture_access(ins),
            DxbcInstClass::VectorDeriv => self.info.uses_derivatives = true,
            DxbcInstClass::ControlFlow => {
                if ins.op == DxbcOpcode::DISCARD {
                    self.info.uses_kill = true;
                }
            }
            DxbcInstClass::TypedUavLoad => {
                let Some(src) = ins.src.get(1) else {
                    trace!(op = ?ins.op, "typed UAV load without resource operand");
                    return;
                };
                if let Some(uav) = self.uav_mut(src) {
                    uav.access_typed_load = true;
                }
            }
            _ => {}
        }
    }

    pub fn info(&self) -> &AnalysisInfo {
        &self.info
    }

    pub fn finish(self) -> AnalysisInfo {
        self.info
    }

    fn uav_mut(&mut self, reg: &DxbcRegister) -> Option<&mut UavInfo> {
        let slot = reg.slot();
        let uav = slot.and_then(|slot| self.info.uav_infos.get_mut(slot));
        if uav.is_none() {
            trace!(?slot, "ignoring UAV operand outside the tracked slot range");
        }
        uav
    }

    fn handle_texture_access(&mut self, ins: &DxbcShaderInstruction) {
        // gather4_po* carry an extra offset operand before the resource.
        let base = match ins.op {
            DxbcOpcode::GATHER4_PO | DxbcOpcode::GATHER4_PO_C => 2,
            _ => 1,
        };
        match (ins.src.get(base), ins.src.get(base + 1)) {
            (Some(texture), Some(sampler)) => self.handle_texture_sampler_pair(texture, sampler),
            _ => trace!(op = ?ins.op, "texture access without resource/sampler operands"),
        }
    }

    fn handle_texture_sampler_pair(&mut self, texture: &DxbcRegister, sampler: &DxbcRegister) {
        let (Some(texture_id), Some(sampler_id)) = (texture.slot(), sampler.slot()) else {
            trace!("ignoring dynamically indexed texture/sampler pair");
            return;
        };
        if texture_id >= MAX_TEXTURE_SLOTS || sampler_id >= MAX_SAMPLER_SLOTS {
            trace!(texture_id, sampler_id, "ignoring texture/sampler pair outside tracked range");
            return;
        }

        let info = &mut self.info;
        let texture_sampler_id = info.texture_sampler_ids[texture_id];
        let sampler_texture_id = info.sampler_texture_ids[sampler_id];

        // Both indices are bounded by the array sizes above, so they fit in i32.
        let (t, s) = (texture_id as i32, sampler_id as i32);

        if texture_sampler_id == PAIRING_UNASSIGNED && sampler_texture_id == PAIRING_UNASSIGNED {
            info.texture_sampler_ids[texture_id] = s;
            info.sampler_texture_ids[sampler_id] = t;
        } else if texture_sampler_id != s || sampler_texture_id != t {
            if texture_sampler_id >= 0 {
                info.sampler_texture_ids[texture_sampler_id as usize] = PAIRING_AMBIGUOUS;
            }
            if sampler_texture_id >= 0 {
                info.texture_sampler_ids[sampler_texture_id as usize] = PAIRING_AMBIGUOUS;
            }
            info.texture_sampler_ids[texture_id] = PAIRING_AMBIGUOUS;
            info.sampler_texture_ids[sampler_id] = PAIRING_AMBIGUOUS;
        }
    }
}

fn clip_cull_info(sig: Option<&SignatureChunk>) -> ClipCullInfo {
    let mut result = ClipCullInfo::default();
    for entry in sig.into_iter().flat_map(SignatureChunk::iter) {
        let count = entry.mask.component_count();
        match entry.system_value {
            SystemValue::ClipDistance => result.num_clip_planes += count,
            SystemValue::CullDistance => result.num_cull_planes += count,
            _ => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{ComponentMask, SignatureEntry};
    use pretty_assertions::assert_eq;

    fn reg(ty: DxbcOperandType, slot: u64) -> DxbcRegister {
        let mut reg = DxbcRegister::new(ty);
        reg.idx_dim = 1;
        reg.idx[0].offset = slot;
        reg
    }

    fn sample(texture: u64, sampler: u64) -> DxbcShaderInstruction {
        let mut ins = DxbcShaderInstruction::new(DxbcOpcode::SAMPLE, DxbcInstClass::TextureSample);
        ins.dst.push(reg(DxbcOperandType::Temp, 0));
        ins.src.push(reg(DxbcOperandType::Input, 0));
        ins.src.push(reg(DxbcOperandType::Resource, texture));
        ins.src.push(reg(DxbcOperandType::Sampler, sampler));
        ins
    }

    fn entry(system_value: SystemValue, mask: u8) -> SignatureEntry {
        SignatureEntry {
            semantic_name: String::new(),
            semantic_index: 0,
            system_value,
            component_type: 3,
            register: 0,
            mask: ComponentMask::from_bits_truncate(mask),
            read_write_mask: ComponentMask::empty(),
            stream: 0,
        }
    }

    #[test]
    fn fresh_analyzer_has_no_pairings() {
        let info = DxbcAnalyzer::new(None, None, None).finish();
        assert!(info.texture_sampler_ids.iter().all(|&id| id == PAIRING_UNASSIGNED));
        assert!(info.sampler_texture_ids.iter().all(|&id| id == PAIRING_UNASSIGNED));
        assert_eq!(info.clip_cull_in, ClipCullInfo::default());
        assert!(!info.uses_derivatives && !info.uses_kill);
    }

    #[test]
    fn clip_cull_counts_are_per_signature() {
        let isgn = SignatureChunk {
            entries: vec![
                entry(SystemValue::ClipDistance, 0b0111),
                entry(SystemValue::ClipDistance, 0b0001),
                entry(SystemValue::Position, 0b1111),
            ],
        };
        let osgn = SignatureChunk {
            entries: vec![entry(SystemValue::CullDistance, 0b0011)],
        };

        let analyzer = DxbcAnalyzer::new(Some(&isgn), Some(&osgn), None);
        assert_eq!(
            analyzer.info().clip_cull_in,
            ClipCullInfo {
                num_clip_planes: 4,
                num_cull_planes: 0
            }
        );
        assert_eq!(
            analyzer.info().clip_cull_out,
            ClipCullInfo {
                num_clip_planes: 0,
                num_cull_planes: 2
            }
        );
    }

    #[test]
    fn conflicting_pairs_poison_every_participant() {
        let mut analyzer = DxbcAnalyzer::new(None, None, None);
        analyzer.process_instruction(&sample(0, 0));
        assert_eq!(analyzer.info().paired_sampler(0), Some(0));
        assert_eq!(analyzer.info().paired_texture(0), Some(0));

        analyzer.process_instruction(&sample(1, 0));
        let info = analyzer.info();
        assert_eq!(info.texture_sampler_ids[0], PAIRING_AMBIGUOUS);
        assert_eq!(info.texture_sampler_ids[1], PAIRING_AMBIGUOUS);
        assert_eq!(info.sampler_texture_ids[0], PAIRING_AMBIGUOUS);

        let before = analyzer.info().clone();
        analyzer.process_instruction(&sample(0, 0));
        assert_eq!(analyzer.info(), &before);
    }

    #[test]
    fn repeated_pair_is_stable() {
        let mut analyzer = DxbcAnalyzer::new(None, None, None);
        analyzer.process_instruction(&sample(5, 3));
        analyzer.process_instruction(&sample(5, 3));
        assert_eq!(analyzer.info().texture_sampler_ids[5], 3);
        assert_eq!(analyzer.info().sampler_texture_ids[3], 5);
    }

    #[test]
    fn gather_po_skips_offset_operand() {
        let mut ins =
            DxbcShaderInstruction::new(DxbcOpcode::GATHER4_PO, DxbcInstClass::TextureGather);
        ins.dst.push(reg(DxbcOperandType::Temp, 0));
        ins.src.push(reg(DxbcOperandType::Temp, 1));
        ins.src.push(reg(DxbcOperandType::Temp, 2));
        ins.src.push(reg(DxbcOperandType::Resource, 7));
        ins.src.push(reg(DxbcOperandType::Sampler, 2));

        let mut analyzer = DxbcAnalyzer::new(None, None, None);
        analyzer.process_instruction(&ins);
        assert_eq!(analyzer.info().paired_sampler(7), Some(2));
        // Gathers do not imply derivatives.
        assert!(!analyzer.info().uses_derivatives);
    }

    #[test]
    fn flags_are_set_by_their_instruction_classes() {
        let mut analyzer = DxbcAnalyzer::new(None, None, None);

        let mut atomic = DxbcShaderInstruction::new(DxbcOpcode::ATOMIC_IADD, DxbcInstClass::Atomic);
        atomic.dst.push(reg(DxbcOperandType::UnorderedAccessView, 4));
        analyzer.process_instruction(&atomic);

        let mut load =
            DxbcShaderInstruction::new(DxbcOpcode::LD_UAV_TYPED, DxbcInstClass::TypedUavLoad);
        load.dst.push(reg(DxbcOperandType::Temp, 0));
        load.src.push(reg(DxbcOperandType::Temp, 1));
        load.src.push(reg(DxbcOperandType::UnorderedAccessView, 9));
        analyzer.process_instruction(&load);

        analyzer.process_instruction(&DxbcShaderInstruction::new(
            DxbcOpcode::DERIV_RTX_FINE,
            DxbcInstClass::VectorDeriv,
        ));
        analyzer.process_instruction(&DxbcShaderInstruction::new(
            DxbcOpcode::DISCARD,
            DxbcInstClass::ControlFlow,
        ));

        let info = analyzer.finish();
        assert!(info.uav_infos[4].access_atomic_op);
        assert!(!info.uav_infos[4].access_typed_load);
        assert!(info.uav_infos[9].access_typed_load);
        assert!(info.uses_derivatives);
        assert!(info.uses_kill);
    }

    fn atomic(uav: u64) -> DxbcShaderInstruction {
        let mut ins = DxbcShaderInstruction::new(DxbcOpcode::ATOMIC_IADD, DxbcInstClass::Atomic);
        ins.dst.push(reg(DxbcOperandType::UnorderedAccessView, uav));
        ins.src.push(reg(DxbcOperandType::Temp, 0));
        ins.src.push(reg(DxbcOperandType::Temp, 1));
        ins
    }

    fn typed_load(uav: u64) -> DxbcShaderInstruction {
        let mut ins =
            DxbcShaderInstruction::new(DxbcOpcode::LD_UAV_TYPED, DxbcInstClass::TypedUavLoad);
        ins.dst.push(reg(DxbcOperandType::Temp, 0));
        ins.src.push(reg(DxbcOperandType::InputThreadId, 0));
        ins.src.push(reg(DxbcOperandType::UnorderedAccessView, uav));
        ins
    }

    #[test]
    fn flags_never_clear() {
        let mut analyzer = DxbcAnalyzer::new(None, None, None);
        for ins in [
            DxbcShaderInstruction::new(DxbcOpcode::DISCARD, DxbcInstClass::ControlFlow),
            DxbcShaderInstruction::new(DxbcOpcode::DERIV_RTX, DxbcInstClass::VectorDeriv),
            atomic(1),
            typed_load(2),
        ] {
            analyzer.process_instruction(&ins);
        }

        let check = |info: &AnalysisInfo| {
            assert!(info.uses_kill);
            assert!(info.uses_derivatives);
            assert!(info.uav_infos[1].access_atomic_op);
            assert!(info.uav_infos[2].access_typed_load);
        };
        check(analyzer.info());

        for ins in [
            DxbcShaderInstruction::new(DxbcOpcode::RET, DxbcInstClass::ControlFlow),
            DxbcShaderInstruction::new(DxbcOpcode::MOV, DxbcInstClass::VectorAlu),
            atomic(5),
            typed_load(6),
            DxbcShaderInstruction::new(DxbcOpcode(207), DxbcInstClass::Undefined),
        ] {
            analyzer.process_instruction(&ins);
            check(analyzer.info());
        }

        let info = analyzer.finish();
        check(&info);
        assert!(!info.uav_infos[1].access_typed_load);
        assert!(!info.uav_infos[2].access_atomic_op);
        assert!(info.uav_infos[5].access_atomic_op);
        assert!(info.uav_infos[6].access_typed_load);
    }

    #[test]
    fn out_of_range_and_missing_operands_are_ignored() {
        let mut analyzer = DxbcAnalyzer::new(None, None, None);

        analyzer.process_instruction(&sample(MAX_TEXTURE_SLOTS as u64, 0));
        analyzer.process_instruction(&sample(0, MAX_SAMPLER_SLOTS as u64));
        analyzer.process_instruction(&sample(u64::MAX, 0));

        let mut atomic = DxbcShaderInstruction::new(DxbcOpcode::ATOMIC_OR, DxbcInstClass::Atomic);
        atomic.dst.push(reg(DxbcOperandType::UnorderedAccessView, 64));
        analyzer.process_instruction(&atomic);
        analyzer.process_instruction(&DxbcShaderInstruction::new(
            DxbcOpcode::ATOMIC_OR,
            DxbcInstClass::Atomic,
        ));
        analyzer.process_instruction(&DxbcShaderInstruction::new(
            DxbcOpcode::SAMPLE,
            DxbcInstClass::TextureSample,
        ));

        let info = analyzer.finish();
        let expected = AnalysisInfo {
            uses_derivatives: true,
            ..AnalysisInfo::default()
        };
        assert_eq!(info, expected);
    }
}
