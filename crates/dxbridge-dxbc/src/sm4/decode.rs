use thiserror::Error;

use super::instruction::{
    DxbcImmediate, DxbcOperandModifier, DxbcOperandType, DxbcRegIndex, DxbcRegister,
    DxbcShaderInstruction,
};
use super::opcode::*;
use super::Sm4Program;

// ---- Operand token layout ----

const OPERAND_NUM_COMPONENTS_MASK: u32 = 0x3;
const OPERAND_COMPONENT_BITS_SHIFT: u32 = 2;
const OPERAND_COMPONENT_BITS_MASK: u32 = 0x3ff;
const OPERAND_TYPE_SHIFT: u32 = 12;
const OPERAND_TYPE_MASK: u32 = 0xff;
const OPERAND_INDEX_DIMENSION_SHIFT: u32 = 20;
const OPERAND_INDEX_DIMENSION_MASK: u32 = 0x3;
const OPERAND_INDEX_REP_SHIFT: u32 = 22;
const OPERAND_INDEX_REP_BITS: u32 = 3;
const OPERAND_EXTENDED_BIT: u32 = 0x8000_0000;

const INDEX_REP_IMMEDIATE32: u32 = 0;
const INDEX_REP_IMMEDIATE64: u32 = 1;
const INDEX_REP_RELATIVE: u32 = 2;
const INDEX_REP_IMMEDIATE32_PLUS_RELATIVE: u32 = 3;
const INDEX_REP_IMMEDIATE64_PLUS_RELATIVE: u32 = 4;

const EXTENDED_OPERAND_MODIFIER: u32 = 1;
/// Saturate is part of the opcode controls for ALU instructions.
const OPCODE_SATURATE_BIT: u32 = 1 << 13;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SM4/5 decode error at dword {at_dword}: {kind}")]
pub struct Sm4DecodeError {
    pub at_dword: usize,
    pub kind: Sm4DecodeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Sm4DecodeErrorKind {
    #[error("instruction length is zero")]
    InstructionLengthZero,
    #[error("instruction at {start} with length {len} overruns program (available {available})")]
    InstructionOutOfBounds {
        start: usize,
        len: usize,
        available: usize,
    },
    #[error("operand runs past the end of its instruction")]
    TruncatedOperand,
    #[error("unsupported operand component count encoding {0}")]
    UnsupportedComponentCount(u32),
    #[error("unsupported operand index dimension {0}")]
    UnsupportedIndexDimension(u32),
    #[error("unsupported operand index representation {0}")]
    UnsupportedIndexRepresentation(u32),
}

/// Decodes a whole program into its executable instruction stream.
///
/// Declarations, `customdata` blocks and `nop`s are skipped. Opcodes without an operand
/// format are returned as [`DxbcInstClass::Undefined`] instructions with no operands.
pub fn decode_instructions(
    program: &Sm4Program,
) -> Result<Vec<DxbcShaderInstruction>, Sm4DecodeError> {
    Sm4Decoder::new(program).collect()
}

/// Streaming decoder yielding one instruction at a time in program order.
///
/// After the first error the decoder is fused and yields `None`.
pub struct Sm4Decoder<'a> {
    toks: &'a [u32],
    pos: usize,
    failed: bool,
}

impl<'a> Sm4Decoder<'a> {
    pub fn new(program: &'a Sm4Program) -> Self {
        Self {
            toks: &program.tokens,
            pos: 2,
            failed: false,
        }
    }

    fn next_instruction(&mut self) -> Option<Result<DxbcShaderInstruction, Sm4DecodeError>> {
        while self.pos < self.toks.len() {
            let start = self.pos;
            let opcode_token = self.toks[start];
            let op = DxbcOpcode(opcode_token & OPCODE_MASK);

            let len = if op == DxbcOpcode::CUSTOM_DATA {
                // customdata: class in the opcode token, total length in the next DWORD.
                match self.toks.get(start + 1) {
                    Some(&len) => len as usize,
                    None => {
                        return Some(Err(Sm4DecodeError {
                            at_dword: start,
                            kind: Sm4DecodeErrorKind::InstructionOutOfBounds {
                                start,
                                len: 2,
                                available: self.toks.len(),
                            },
                        }))
                    }
                }
            } else {
                ((opcode_token >> OPCODE_LEN_SHIFT) & OPCODE_LEN_MASK) as usize
            };

            if len == 0 {
                return Some(Err(Sm4DecodeError {
                    at_dword: start,
                    kind: Sm4DecodeErrorKind::InstructionLengthZero,
                }));
            }
            let Some(end) = start.checked_add(len).filter(|&end| end <= self.toks.len()) else {
                return Some(Err(Sm4DecodeError {
                    at_dword: start,
                    kind: Sm4DecodeErrorKind::InstructionOutOfBounds {
                        start,
                        len,
                        available: self.toks.len(),
                    },
                }));
            };
            self.pos = end;

            if op == DxbcOpcode::CUSTOM_DATA || op == DxbcOpcode::NOP || op.is_declaration() {
                continue;
            }

            let inst_toks = &self.toks[start..end];
            return Some(match op.format() {
                Some(format) => decode_instruction(op, format, inst_toks, start),
                None => {
                    let mut ins = DxbcShaderInstruction::new(op, DxbcInstClass::Undefined);
                    ins.controls = (opcode_token >> OPCODE_CONTROLS_SHIFT) & OPCODE_CONTROLS_MASK;
                    Ok(ins)
                }
            });
        }
        None
    }
}

impl Iterator for Sm4Decoder<'_> {
    type Item = Result<DxbcShaderInstruction, Sm4DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_instruction();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

fn decode_instruction(
    op: DxbcOpcode,
    format: InstructionFormat,
    inst_toks: &[u32],
    at: usize,
) -> Result<DxbcShaderInstruction, Sm4DecodeError> {
    let mut r = InstrReader::new(inst_toks, at);
    let opcode_token = r.read_u32()?;

    let mut ins = DxbcShaderInstruction::new(op, format.class);
    ins.controls = (opcode_token >> OPCODE_CONTROLS_SHIFT) & OPCODE_CONTROLS_MASK;
    ins.saturate = (opcode_token & OPCODE_SATURATE_BIT) != 0;

    // Extended opcode tokens (sample offsets, resource dimension / return type) carry
    // nothing the analysis needs.
    let mut extended = (opcode_token & OPCODE_EXTENDED_BIT) != 0;
    while extended {
        extended = (r.read_u32()? & OPCODE_EXTENDED_BIT) != 0;
    }

    for _ in 0..format.dst {
        ins.dst.push(decode_operand(&mut r)?);
    }
    for _ in 0..format.src {
        ins.src.push(decode_operand(&mut r)?);
    }

    Ok(ins)
}

fn decode_operand(r: &mut InstrReader<'_>) -> Result<DxbcRegister, Sm4DecodeError> {
    let token = r.read_u32()?;

    let component_count = match token & OPERAND_NUM_COMPONENTS_MASK {
        0 => 0u8,
        1 => 1,
        2 => 4,
        other => return Err(r.error(Sm4DecodeErrorKind::UnsupportedComponentCount(other))),
    };

    let mut reg = DxbcRegister::new(DxbcOperandType::from_raw(
        (token >> OPERAND_TYPE_SHIFT) & OPERAND_TYPE_MASK,
    ));
    reg.component_count = component_count;
    reg.component_bits = (token >> OPERAND_COMPONENT_BITS_SHIFT) & OPERAND_COMPONENT_BITS_MASK;

    let mut extended = (token & OPERAND_EXTENDED_BIT) != 0;
    while extended {
        let ext = r.read_u32()?;
        extended = (ext & OPERAND_EXTENDED_BIT) != 0;
        if ext & 0x3f == EXTENDED_OPERAND_MODIFIER {
            reg.modifier = match (ext >> 6) & 0xff {
                1 => DxbcOperandModifier::Neg,
                2 => DxbcOperandModifier::Abs,
                3 => DxbcOperandModifier::AbsNeg,
                _ => DxbcOperandModifier::None,
            };
        }
    }

    // 0D..3D; the two-bit field cannot encode more.
    let idx_dim = (token >> OPERAND_INDEX_DIMENSION_SHIFT) & OPERAND_INDEX_DIMENSION_MASK;
    reg.idx_dim = idx_dim as u8;
    for i in 0..idx_dim as usize {
        let rep = (token >> (OPERAND_INDEX_REP_SHIFT + i as u32 * OPERAND_INDEX_REP_BITS)) & 0x7;
        reg.idx[i] = decode_index(r, rep)?;
    }

    reg.imm = match reg.ty {
        DxbcOperandType::Imm32 => Some(DxbcImmediate::U32(match component_count {
            1 => [r.read_u32()?; 4],
            4 => [r.read_u32()?, r.read_u32()?, r.read_u32()?, r.read_u32()?],
            _ => [0; 4],
        })),
        DxbcOperandType::Imm64 => Some(DxbcImmediate::U64(match component_count {
            1 => [r.read_u64()?; 2],
            4 => [r.read_u64()?, r.read_u64()?],
            _ => [0; 2],
        })),
        _ => None,
    };

    Ok(reg)
}

fn decode_index(r: &mut InstrReader<'_>, rep: u32) -> Result<DxbcRegIndex, Sm4DecodeError> {
    let offset = match rep {
        INDEX_REP_IMMEDIATE32 | INDEX_REP_IMMEDIATE32_PLUS_RELATIVE => u64::from(r.read_u32()?),
        INDEX_REP_IMMEDIATE64 | INDEX_REP_IMMEDIATE64_PLUS_RELATIVE => r.read_u64()?,
        INDEX_REP_RELATIVE => 0,
        other => return Err(r.error(Sm4DecodeErrorKind::UnsupportedIndexRepresentation(other))),
    };

    let relative = match rep {
        INDEX_REP_RELATIVE
        | INDEX_REP_IMMEDIATE32_PLUS_RELATIVE
        | INDEX_REP_IMMEDIATE64_PLUS_RELATIVE => Some(Box::new(decode_operand(r)?)),
        _ => None,
    };

    Ok(DxbcRegIndex { offset, relative })
}

// ---- Token reader ----

struct InstrReader<'a> {
    toks: &'a [u32],
    pos: usize,
    base_at: usize,
}

impl<'a> InstrReader<'a> {
    fn new(toks: &'a [u32], base_at: usize) -> Self {
        Self {
            toks,
            pos: 0,
            base_at,
        }
    }

    fn read_u32(&mut self) -> Result<u32, Sm4DecodeError> {
        let v = self
            .toks
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error(Sm4DecodeErrorKind::TruncatedOperand))?;
        self.pos += 1;
        Ok(v)
    }

    /// 64-bit values are stored high DWORD first.
    fn read_u64(&mut self) -> Result<u64, Sm4DecodeError> {
        let hi = u64::from(self.read_u32()?);
        let lo = u64::from(self.read_u32()?);
        Ok((hi << 32) | lo)
    }

    fn error(&self, kind: Sm4DecodeErrorKind) -> Sm4DecodeError {
        Sm4DecodeError {
            at_dword: self.base_at + self.pos,
            kind,
        }
    }
}
