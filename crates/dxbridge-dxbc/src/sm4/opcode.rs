//! SM4/SM5 opcode numbering and the per-opcode operand layout table.
//!
//! Opcode values follow `D3D10_SB_OPCODE_TYPE` / `D3D11_SB_OPCODE_TYPE` from the Windows SDK
//! tokenized program format headers.

use core::fmt;

/// Low 11 bits of an opcode token.
pub(crate) const OPCODE_MASK: u32 = 0x7ff;
/// Opcode-specific control bits.
pub(crate) const OPCODE_CONTROLS_SHIFT: u32 = 11;
pub(crate) const OPCODE_CONTROLS_MASK: u32 = 0x1fff;
/// Instruction length in DWORDs, including the opcode token.
pub(crate) const OPCODE_LEN_SHIFT: u32 = 24;
pub(crate) const OPCODE_LEN_MASK: u32 = 0x7f;
/// One or more extended opcode tokens follow.
pub(crate) const OPCODE_EXTENDED_BIT: u32 = 0x8000_0000;

/// A raw SM4/SM5 opcode.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DxbcOpcode(pub u32);

impl DxbcOpcode {
    pub const ADD: Self = Self(0);
    pub const AND: Self = Self(1);
    pub const BREAK: Self = Self(2);
    pub const BREAKC: Self = Self(3);
    pub const CALL: Self = Self(4);
    pub const CALLC: Self = Self(5);
    pub const CASE: Self = Self(6);
    pub const CONTINUE: Self = Self(7);
    pub const CONTINUEC: Self = Self(8);
    pub const CUT: Self = Self(9);
    pub const DEFAULT: Self = Self(10);
    pub const DERIV_RTX: Self = Self(11);
    pub const DERIV_RTY: Self = Self(12);
    pub const DISCARD: Self = Self(13);
    pub const DIV: Self = Self(14);
    pub const DP2: Self = Self(15);
    pub const DP3: Self = Self(16);
    pub const DP4: Self = Self(17);
    pub const ELSE: Self = Self(18);
    pub const EMIT: Self = Self(19);
    pub const EMIT_THEN_CUT: Self = Self(20);
    pub const END_IF: Self = Self(21);
    pub const END_LOOP: Self = Self(22);
    pub const END_SWITCH: Self = Self(23);
    pub const EQ: Self = Self(24);
    pub const EXP: Self = Self(25);
    pub const FRC: Self = Self(26);
    pub const FTOI: Self = Self(27);
    pub const FTOU: Self = Self(28);
    pub const GE: Self = Self(29);
    pub const IADD: Self = Self(30);
    pub const IF: Self = Self(31);
    pub const IEQ: Self = Self(32);
    pub const IGE: Self = Self(33);
    pub const ILT: Self = Self(34);
    pub const IMAD: Self = Self(35);
    pub const IMAX: Self = Self(36);
    pub const IMIN: Self = Self(37);
    pub const IMUL: Self = Self(38);
    pub const INE: Self = Self(39);
    pub const INEG: Self = Self(40);
    pub const ISHL: Self = Self(41);
    pub const ISHR: Self = Self(42);
    pub const ITOF: Self = Self(43);
    pub const LABEL: Self = Self(44);
    pub const LD: Self = Self(45);
    pub const LD_MS: Self = Self(46);
    pub const LOG: Self = Self(47);
    pub const LOOP: Self = Self(48);
    pub const LT: Self = Self(49);
    pub const MAD: Self = Self(50);
    pub const MIN: Self = Self(51);
    pub const MAX: Self = Self(52);
    pub const CUSTOM_DATA: Self = Self(53);
    pub const MOV: Self = Self(54);
    pub const MOVC: Self = Self(55);
    pub const MUL: Self = Self(56);
    pub const NE: Self = Self(57);
    pub const NOP: Self = Self(58);
    pub const NOT: Self = Self(59);
    pub const OR: Self = Self(60);
    pub const RES_INFO: Self = Self(61);
    pub const RET: Self = Self(62);
    pub const RETC: Self = Self(63);
    pub const ROUND_NE: Self = Self(64);
    pub const ROUND_NI: Self = Self(65);
    pub const ROUND_PI: Self = Self(66);
    pub const ROUND_Z: Self = Self(67);
    pub const RSQ: Self = Self(68);
    pub const SAMPLE: Self = Self(69);
    pub const SAMPLE_C: Self = Self(70);
    pub const SAMPLE_C_LZ: Self = Self(71);
    pub const SAMPLE_L: Self = Self(72);
    pub const SAMPLE_D: Self = Self(73);
    pub const SAMPLE_B: Self = Self(74);
    pub const SQRT: Self = Self(75);
    pub const SWITCH: Self = Self(76);
    pub const SINCOS: Self = Self(77);
    pub const UDIV: Self = Self(78);
    pub const ULT: Self = Self(79);
    pub const UGE: Self = Self(80);
    pub const UMUL: Self = Self(81);
    pub const UMAD: Self = Self(82);
    pub const UMAX: Self = Self(83);
    pub const UMIN: Self = Self(84);
    pub const USHR: Self = Self(85);
    pub const UTOF: Self = Self(86);
    pub const XOR: Self = Self(87);
    pub const LOD: Self = Self(108);
    pub const GATHER4: Self = Self(109);
    pub const SAMPLE_POS: Self = Self(110);
    pub const SAMPLE_INFO: Self = Self(111);
    pub const HS_DECLS: Self = Self(113);
    pub const HS_CONTROL_POINT_PHASE: Self = Self(114);
    pub const HS_FORK_PHASE: Self = Self(115);
    pub const HS_JOIN_PHASE: Self = Self(116);
    pub const EMIT_STREAM: Self = Self(117);
    pub const CUT_STREAM: Self = Self(118);
    pub const EMIT_THEN_CUT_STREAM: Self = Self(119);
    pub const BUF_INFO: Self = Self(121);
    pub const DERIV_RTX_COARSE: Self = Self(122);
    pub const DERIV_RTX_FINE: Self = Self(123);
    pub const DERIV_RTY_COARSE: Self = Self(124);
    pub const DERIV_RTY_FINE: Self = Self(125);
    pub const GATHER4_C: Self = Self(126);
    pub const GATHER4_PO: Self = Self(127);
    pub const GATHER4_PO_C: Self = Self(128);
    pub const RCP: Self = Self(129);
    pub const F32_TO_F16: Self = Self(130);
    pub const F16_TO_F32: Self = Self(131);
    pub const UADDC: Self = Self(132);
    pub const USUBB: Self = Self(133);
    pub const COUNT_BITS: Self = Self(134);
    pub const FIRST_BIT_HI: Self = Self(135);
    pub const FIRST_BIT_LO: Self = Self(136);
    pub const FIRST_BIT_SHI: Self = Self(137);
    pub const UBFE: Self = Self(138);
    pub const IBFE: Self = Self(139);
    pub const BFI: Self = Self(140);
    pub const BFREV: Self = Self(141);
    pub const SWAPC: Self = Self(142);
    pub const LD_UAV_TYPED: Self = Self(163);
    pub const STORE_UAV_TYPED: Self = Self(164);
    pub const LD_RAW: Self = Self(165);
    pub const STORE_RAW: Self = Self(166);
    pub const LD_STRUCTURED: Self = Self(167);
    pub const STORE_STRUCTURED: Self = Self(168);
    pub const ATOMIC_AND: Self = Self(169);
    pub const ATOMIC_OR: Self = Self(170);
    pub const ATOMIC_XOR: Self = Self(171);
    pub const ATOMIC_CMP_STORE: Self = Self(172);
    pub const ATOMIC_IADD: Self = Self(173);
    pub const ATOMIC_IMAX: Self = Self(174);
    pub const ATOMIC_IMIN: Self = Self(175);
    pub const ATOMIC_UMAX: Self = Self(176);
    pub const ATOMIC_UMIN: Self = Self(177);
    pub const IMM_ATOMIC_ALLOC: Self = Self(178);
    pub const IMM_ATOMIC_CONSUME: Self = Self(179);
    pub const IMM_ATOMIC_IADD: Self = Self(180);
    pub const IMM_ATOMIC_AND: Self = Self(181);
    pub const IMM_ATOMIC_OR: Self = Self(182);
    pub const IMM_ATOMIC_XOR: Self = Self(183);
    pub const IMM_ATOMIC_EXCH: Self = Self(184);
    pub const IMM_ATOMIC_CMP_EXCH: Self = Self(185);
    pub const IMM_ATOMIC_IMAX: Self = Self(186);
    pub const IMM_ATOMIC_IMIN: Self = Self(187);
    pub const IMM_ATOMIC_UMAX: Self = Self(188);
    pub const IMM_ATOMIC_UMIN: Self = Self(189);
    pub const SYNC: Self = Self(190);
    pub const DCL_GS_INSTANCE_COUNT: Self = Self(206);

    /// `dcl_*` opcodes. Their payloads use per-declaration layouts and are skipped by the
    /// instruction decoder.
    pub fn is_declaration(self) -> bool {
        matches!(self.0, 88..=106 | 143..=162) || self == Self::DCL_GS_INSTANCE_COUNT
    }

    /// Operand layout and class for this opcode, if the decoder models it.
    pub fn format(self) -> Option<InstructionFormat> {
        use DxbcInstClass as C;

        let f = |class, dst, src| Some(InstructionFormat { class, dst, src });
        match self {
            Self::ADD | Self::AND | Self::DIV | Self::IADD | Self::IMAX | Self::IMIN
            | Self::ISHL | Self::ISHR | Self::MIN | Self::MAX | Self::MUL | Self::OR
            | Self::UMAX | Self::UMIN | Self::USHR | Self::XOR => f(C::VectorAlu, 1, 2),
            Self::EXP | Self::FRC | Self::FTOI | Self::FTOU | Self::INEG | Self::ITOF
            | Self::LOG | Self::MOV | Self::NOT | Self::ROUND_NE | Self::ROUND_NI
            | Self::ROUND_PI | Self::ROUND_Z | Self::RSQ | Self::SQRT | Self::UTOF
            | Self::RCP => f(C::VectorAlu, 1, 1),
            Self::IMAD | Self::MAD | Self::UMAD => f(C::VectorAlu, 1, 3),
            Self::DP2 | Self::DP3 | Self::DP4 => f(C::VectorDot, 1, 2),
            Self::EQ | Self::GE | Self::IEQ | Self::IGE | Self::ILT | Self::INE | Self::LT
            | Self::NE | Self::ULT | Self::UGE => f(C::VectorCmp, 1, 2),
            Self::MOVC => f(C::VectorCmov, 1, 3),
            Self::SWAPC => f(C::VectorCmov, 2, 3),
            Self::IMUL | Self::UMUL => f(C::VectorImul, 2, 2),
            Self::UDIV => f(C::VectorIdiv, 2, 2),
            Self::UADDC | Self::USUBB => f(C::VectorAlu, 2, 2),
            Self::SINCOS => f(C::VectorSinCos, 2, 1),
            Self::F32_TO_F16 | Self::F16_TO_F32 => f(C::ConvertFloat16, 1, 1),
            Self::COUNT_BITS | Self::FIRST_BIT_HI | Self::FIRST_BIT_LO | Self::FIRST_BIT_SHI
            | Self::BFREV => f(C::BitScan, 1, 1),
            Self::UBFE | Self::IBFE => f(C::BitExtract, 1, 3),
            Self::BFI => f(C::BitInsert, 1, 4),

            Self::DERIV_RTX | Self::DERIV_RTY | Self::DERIV_RTX_COARSE | Self::DERIV_RTX_FINE
            | Self::DERIV_RTY_COARSE | Self::DERIV_RTY_FINE => f(C::VectorDeriv, 1, 1),

            Self::BREAK | Self::CONTINUE | Self::DEFAULT | Self::ELSE | Self::END_IF
            | Self::END_LOOP | Self::END_SWITCH | Self::LOOP | Self::RET => f(C::ControlFlow, 0, 0),
            Self::BREAKC | Self::CALL | Self::CASE | Self::CONTINUEC | Self::DISCARD | Self::IF
            | Self::LABEL | Self::RETC | Self::SWITCH => f(C::ControlFlow, 0, 1),
            Self::CALLC => f(C::ControlFlow, 0, 2),

            Self::EMIT | Self::CUT | Self::EMIT_THEN_CUT => f(C::GeometryEmit, 0, 0),
            Self::EMIT_STREAM | Self::CUT_STREAM | Self::EMIT_THEN_CUT_STREAM => {
                f(C::GeometryEmit, 0, 1)
            }
            Self::HS_DECLS | Self::HS_CONTROL_POINT_PHASE | Self::HS_FORK_PHASE
            | Self::HS_JOIN_PHASE => f(C::HullShaderPhase, 0, 0),

            Self::LD => f(C::TextureFetch, 1, 2),
            Self::LD_MS => f(C::TextureFetch, 1, 3),
            Self::RES_INFO => f(C::TextureQuery, 1, 2),
            Self::SAMPLE => f(C::TextureSample, 1, 3),
            Self::SAMPLE_C | Self::SAMPLE_C_LZ | Self::SAMPLE_L | Self::SAMPLE_B => {
                f(C::TextureSample, 1, 4)
            }
            Self::SAMPLE_D => f(C::TextureSample, 1, 5),
            Self::LOD => f(C::TextureQueryLod, 1, 3),
            Self::GATHER4 => f(C::TextureGather, 1, 3),
            Self::GATHER4_C | Self::GATHER4_PO => f(C::TextureGather, 1, 4),
            Self::GATHER4_PO_C => f(C::TextureGather, 1, 5),
            Self::SAMPLE_INFO => f(C::TextureQueryMs, 1, 1),
            Self::SAMPLE_POS => f(C::TextureQueryMsPos, 1, 2),
            Self::BUF_INFO => f(C::BufferQuery, 1, 1),

            Self::LD_UAV_TYPED => f(C::TypedUavLoad, 1, 2),
            Self::STORE_UAV_TYPED => f(C::TypedUavStore, 1, 2),
            Self::LD_RAW => f(C::BufferLoad, 1, 2),
            Self::LD_STRUCTURED => f(C::BufferLoad, 1, 3),
            Self::STORE_RAW => f(C::BufferStore, 1, 2),
            Self::STORE_STRUCTURED => f(C::BufferStore, 1, 3),

            Self::ATOMIC_AND | Self::ATOMIC_OR | Self::ATOMIC_XOR | Self::ATOMIC_IADD
            | Self::ATOMIC_IMAX | Self::ATOMIC_IMIN | Self::ATOMIC_UMAX | Self::ATOMIC_UMIN => {
                f(C::Atomic, 1, 2)
            }
            Self::ATOMIC_CMP_STORE => f(C::Atomic, 1, 3),
            Self::IMM_ATOMIC_IADD | Self::IMM_ATOMIC_AND | Self::IMM_ATOMIC_OR
            | Self::IMM_ATOMIC_XOR | Self::IMM_ATOMIC_EXCH | Self::IMM_ATOMIC_IMAX
            | Self::IMM_ATOMIC_IMIN | Self::IMM_ATOMIC_UMAX | Self::IMM_ATOMIC_UMIN => {
                f(C::Atomic, 2, 2)
            }
            Self::IMM_ATOMIC_CMP_EXCH => f(C::Atomic, 2, 3),
            // `imm_atomic_alloc dst, u#`: both operands are destinations.
            Self::IMM_ATOMIC_ALLOC | Self::IMM_ATOMIC_CONSUME => f(C::AtomicCounter, 2, 0),

            Self::SYNC => f(C::Barrier, 0, 0),
            Self::NOP => f(C::NoOperation, 0, 0),
            _ => None,
        }
    }
}

impl fmt::Debug for DxbcOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DxbcOpcode({})", self.0)
    }
}

/// Coarse instruction category used to dispatch analysis and translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DxbcInstClass {
    Declaration,
    CustomData,
    NoOperation,
    Atomic,
    AtomicCounter,
    Barrier,
    BitExtract,
    BitInsert,
    BitScan,
    BufferQuery,
    BufferLoad,
    BufferStore,
    ConvertFloat16,
    ControlFlow,
    GeometryEmit,
    HullShaderPhase,
    TextureQuery,
    TextureQueryLod,
    TextureQueryMs,
    TextureQueryMsPos,
    TextureFetch,
    TextureGather,
    TextureSample,
    TypedUavLoad,
    TypedUavStore,
    VectorAlu,
    VectorCmov,
    VectorCmp,
    VectorDeriv,
    VectorDot,
    VectorIdiv,
    VectorImul,
    VectorSinCos,
    Undefined,
}

/// Operand layout of an opcode: destination operands precede source operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionFormat {
    pub class: DxbcInstClass,
    pub dst: u8,
    pub src: u8,
}
