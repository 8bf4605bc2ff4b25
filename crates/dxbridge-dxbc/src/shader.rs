use thiserror::Error;

use crate::analysis::{AnalysisInfo, DxbcAnalyzer};
use crate::signature::SignatureChunk;
use crate::sm4::{Sm4DecodeError, Sm4Decoder, Sm4Error, Sm4Program};
use crate::{DxbcError, DxbcFile, FourCC};

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error(transparent)]
    Dxbc(#[from] DxbcError),
    #[error(transparent)]
    Program(#[from] Sm4Error),
    #[error(transparent)]
    Decode(#[from] Sm4DecodeError),
}

/// Signatures of one shader, as found in its container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSignatures {
    pub isgn: Option<SignatureChunk>,
    pub osgn: Option<SignatureChunk>,
    pub psgn: Option<SignatureChunk>,
}

impl ShaderSignatures {
    pub fn from_dxbc(dxbc: &DxbcFile<'_>) -> Result<Self, DxbcError> {
        Ok(Self {
            isgn: dxbc.get_signature(FourCC::ISGN).transpose()?,
            osgn: dxbc.get_signature(FourCC::OSGN).transpose()?,
            psgn: dxbc.get_signature(FourCC::PCSG).transpose()?,
        })
    }

    pub fn analyzer(&self) -> DxbcAnalyzer<'_> {
        DxbcAnalyzer::new(self.isgn.as_ref(), self.osgn.as_ref(), self.psgn.as_ref())
    }
}

/// Parses a DXBC blob and runs the analysis pass over its program.
///
/// Instructions are streamed into the analyzer as they are decoded; a decode error aborts
/// the whole analysis.
pub fn analyze_shader(bytes: &[u8]) -> Result<(Sm4Program, AnalysisInfo), ShaderError> {
    let dxbc = DxbcFile::parse(bytes)?;
    let signatures = ShaderSignatures::from_dxbc(&dxbc)?;
    let program = Sm4Program::parse_from_dxbc(&dxbc)?;

    let mut analyzer = signatures.analyzer();
    for ins in Sm4Decoder::new(&program) {
        analyzer.process_instruction(&ins?);
    }
    let info = analyzer.finish();

    tracing::debug!(
        stage = ?program.stage,
        uses_derivatives = info.uses_derivatives,
        uses_kill = info.uses_kill,
        "analyzed shader"
    );
    Ok((program, info))
}
