//! SM4/SM5 token streams (`SHDR`/`SHEX` chunks).

mod decode;
mod instruction;
mod opcode;

pub use decode::{decode_instructions, Sm4DecodeError, Sm4DecodeErrorKind, Sm4Decoder};
pub use instruction::{
    DxbcImmediate, DxbcOperandModifier, DxbcOperandType, DxbcRegIndex, DxbcRegister,
    DxbcShaderInstruction,
};
pub use opcode::{DxbcInstClass, DxbcOpcode, InstructionFormat};

use thiserror::Error;

use crate::{DxbcError, DxbcFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Pixel,
    Vertex,
    Geometry,
    Hull,
    Domain,
    Compute,
    Unknown(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderModel {
    pub major: u8,
    pub minor: u8,
}

#[derive(Debug, Error)]
pub enum Sm4Error {
    #[error(transparent)]
    Dxbc(#[from] DxbcError),
    #[error("container has no SHEX or SHDR chunk")]
    MissingShaderChunk,
    #[error("program chunk is {len} bytes, not a whole number of tokens")]
    MisalignedTokens { len: usize },
    #[error("program chunk holds {dwords} tokens, fewer than the version and length header")]
    TooShort { dwords: usize },
    #[error("program length token says {declared} tokens, chunk holds {available}")]
    DeclaredLengthOutOfBounds { declared: usize, available: usize },
}

/// An SM4/SM5 program: version, declared length and the raw token stream.
#[derive(Debug, Clone)]
pub struct Sm4Program {
    pub stage: ShaderStage,
    pub model: ShaderModel,
    /// Program tokens (DWORDs) truncated to the declared length, including the version and
    /// length tokens.
    pub tokens: Vec<u32>,
}

impl Sm4Program {
    pub fn parse_from_dxbc(dxbc: &DxbcFile<'_>) -> Result<Self, Sm4Error> {
        let chunk = dxbc.shader_chunk().ok_or(Sm4Error::MissingShaderChunk)?;
        Self::parse_program_tokens(chunk.data)
    }

    /// Parses a raw `SHDR`/`SHEX` payload. Tokens past the declared length are dropped.
    pub fn parse_program_tokens(bytes: &[u8]) -> Result<Self, Sm4Error> {
        if bytes.len() % 4 != 0 {
            return Err(Sm4Error::MisalignedTokens { len: bytes.len() });
        }
        let mut tokens: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();

        let [version, length, ..] = tokens[..] else {
            return Err(Sm4Error::TooShort {
                dwords: tokens.len(),
            });
        };
        let declared = length as usize;
        if !(2..=tokens.len()).contains(&declared) {
            return Err(Sm4Error::DeclaredLengthOutOfBounds {
                declared,
                available: tokens.len(),
            });
        }
        tokens.truncate(declared);

        let (stage, model) = decode_version_token(version);
        Ok(Self {
            stage,
            model,
            tokens,
        })
    }

    /// Tokens following the version and length tokens.
    pub fn body(&self) -> &[u32] {
        &self.tokens[2..]
    }
}

const STAGES: [ShaderStage; 6] = [
    ShaderStage::Pixel,
    ShaderStage::Vertex,
    ShaderStage::Geometry,
    ShaderStage::Hull,
    ShaderStage::Domain,
    ShaderStage::Compute,
];

/// Splits a version token: program type in the high half, model major/minor in the low
/// two nibbles.
pub fn decode_version_token(version: u32) -> (ShaderStage, ShaderModel) {
    let program_type = (version >> 16) as u16;
    let stage = STAGES
        .get(usize::from(program_type))
        .copied()
        .unwrap_or(ShaderStage::Unknown(program_type));
    let model = ShaderModel {
        major: ((version >> 4) & 0xf) as u8,
        minor: (version & 0xf) as u8,
    };
    (stage, model)
}
