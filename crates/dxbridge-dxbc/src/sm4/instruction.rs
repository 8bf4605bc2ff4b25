use super::opcode::{DxbcInstClass, DxbcOpcode};

/// Operand register file (`D3D10_SB_OPERAND_TYPE` / `D3D11_SB_OPERAND_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DxbcOperandType {
    Temp,
    Input,
    Output,
    IndexableTemp,
    Imm32,
    Imm64,
    Sampler,
    Resource,
    ConstantBuffer,
    ImmediateConstantBuffer,
    Label,
    InputPrimitiveId,
    OutputDepth,
    Null,
    Rasterizer,
    OutputCoverageMask,
    Stream,
    FunctionBody,
    FunctionTable,
    Interface,
    FunctionInput,
    FunctionOutput,
    OutputControlPointId,
    InputForkInstanceId,
    InputJoinInstanceId,
    InputControlPoint,
    OutputControlPoint,
    InputPatchConstant,
    InputDomainPoint,
    ThisPointer,
    UnorderedAccessView,
    ThreadGroupSharedMemory,
    InputThreadId,
    InputThreadGroupId,
    InputThreadIdInGroup,
    InputCoverageMask,
    InputThreadIndexInGroup,
    InputGsInstanceId,
    OutputDepthGe,
    OutputDepthLe,
    CycleCounter,
    Other(u32),
}

/// Operand types in encoding order.
const OPERAND_TYPES: [DxbcOperandType; 41] = [
    DxbcOperandType::Temp,
    DxbcOperandType::Input,
    DxbcOperandType::Output,
    DxbcOperandType::IndexableTemp,
    DxbcOperandType::Imm32,
    DxbcOperandType::Imm64,
    DxbcOperandType::Sampler,
    DxbcOperandType::Resource,
    DxbcOperandType::ConstantBuffer,
    DxbcOperandType::ImmediateConstantBuffer,
    DxbcOperandType::Label,
    DxbcOperandType::InputPrimitiveId,
    DxbcOperandType::OutputDepth,
    DxbcOperandType::Null,
    DxbcOperandType::Rasterizer,
    DxbcOperandType::OutputCoverageMask,
    DxbcOperandType::Stream,
    DxbcOperandType::FunctionBody,
    DxbcOperandType::FunctionTable,
    DxbcOperandType::Interface,
    DxbcOperandType::FunctionInput,
    DxbcOperandType::FunctionOutput,
    DxbcOperandType::OutputControlPointId,
    DxbcOperandType::InputForkInstanceId,
    DxbcOperandType::InputJoinInstanceId,
    DxbcOperandType::InputControlPoint,
    DxbcOperandType::OutputControlPoint,
    DxbcOperandType::InputPatchConstant,
    DxbcOperandType::InputDomainPoint,
    DxbcOperandType::ThisPointer,
    DxbcOperandType::UnorderedAccessView,
    DxbcOperandType::ThreadGroupSharedMemory,
    DxbcOperandType::InputThreadId,
    DxbcOperandType::InputThreadGroupId,
    DxbcOperandType::InputThreadIdInGroup,
    DxbcOperandType::InputCoverageMask,
    DxbcOperandType::InputThreadIndexInGroup,
    DxbcOperandType::InputGsInstanceId,
    DxbcOperandType::OutputDepthGe,
    DxbcOperandType::OutputDepthLe,
    DxbcOperandType::CycleCounter,
];

impl DxbcOperandType {
    pub fn from_raw(raw: u32) -> Self {
        OPERAND_TYPES
            .get(raw as usize)
            .copied()
            .unwrap_or(Self::Other(raw))
    }

    /// The `D3D10_SB_OPERAND_TYPE` value this type is encoded as.
    pub fn raw(self) -> u32 {
        match self {
            Self::Other(raw) => raw,
            ty => OPERAND_TYPES
                .iter()
                .position(|&known| known == ty)
                .map_or(u32::MAX, |pos| pos as u32),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DxbcOperandModifier {
    #[default]
    None,
    Neg,
    Abs,
    AbsNeg,
}

/// Immediate operand payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxbcImmediate {
    /// One or four 32-bit values; single-component immediates are splatted.
    U32([u32; 4]),
    /// One or two 64-bit values; single-component immediates are splatted.
    U64([u64; 2]),
}

/// One component of an operand's index chain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DxbcRegIndex {
    /// Immediate part of the index.
    pub offset: u64,
    /// Register added to `offset` for relative addressing.
    pub relative: Option<Box<DxbcRegister>>,
}

/// A decoded operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxbcRegister {
    pub ty: DxbcOperandType,
    /// 0, 1 or 4.
    pub component_count: u8,
    /// Raw selection mode + component selection bits (mask / swizzle / select-1).
    pub component_bits: u32,
    pub modifier: DxbcOperandModifier,
    pub idx_dim: u8,
    pub idx: [DxbcRegIndex; 3],
    pub imm: Option<DxbcImmediate>,
}

impl DxbcRegister {
    pub fn new(ty: DxbcOperandType) -> Self {
        Self {
            ty,
            component_count: 0,
            component_bits: 0,
            modifier: DxbcOperandModifier::None,
            idx_dim: 0,
            idx: Default::default(),
            imm: None,
        }
    }

    /// Register / slot number from the first index, when it is a plain immediate that
    /// fits in `usize`.
    pub fn slot(&self) -> Option<usize> {
        let first = self.idx.first().filter(|_| self.idx_dim >= 1)?;
        if first.relative.is_some() {
            return None;
        }
        usize::try_from(first.offset).ok()
    }
}

/// One decoded SM4/SM5 instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxbcShaderInstruction {
    pub op: DxbcOpcode,
    pub op_class: DxbcInstClass,
    /// Opcode-specific control bits (bits 11..=23 of the opcode token).
    pub controls: u32,
    pub saturate: bool,
    pub dst: Vec<DxbcRegister>,
    pub src: Vec<DxbcRegister>,
}

impl DxbcShaderInstruction {
    pub fn new(op: DxbcOpcode, op_class: DxbcInstClass) -> Self {
        Self {
            op,
            op_class,
            controls: 0,
            saturate: false,
            dst: Vec::new(),
            src: Vec::new(),
        }
    }
}
