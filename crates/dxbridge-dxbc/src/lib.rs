//! DXBC shader containers, SM4/SM5 instruction decoding and the per-shader analysis pass.
//!
//! Inputs are treated as untrusted: every parser here is bounds-checked and reports
//! malformed data through its error type instead of panicking.
//!
//! - [`DxbcFile`] splits a container into chunks.
//! - [`signature`] parses `ISGN`/`OSGN`/`PCSG` (and `*SG1`) interface signatures.
//! - [`sm4`] decodes `SHDR`/`SHEX` token streams into [`sm4::DxbcShaderInstruction`]s.
//! - [`analysis`] derives clip/cull counts, texture/sampler pairings and UAV access flags.

#![forbid(unsafe_code)]

pub mod analysis;
mod bytes;
mod container;
mod error;
mod fourcc;
mod shader;
pub mod signature;
pub mod sm4;

/// Builders for synthetic DXBC blobs, signatures and SM4 token streams.
///
/// Only compiled for this crate's tests or with the `test-utils` feature.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::analysis::{AnalysisInfo, ClipCullInfo, DxbcAnalyzer, UavInfo};
pub use crate::container::{DxbcChunk, DxbcFile, DxbcHeader};
pub use crate::error::DxbcError;
pub use crate::fourcc::FourCC;
pub use crate::shader::{analyze_shader, ShaderError, ShaderSignatures};
pub use crate::signature::{
    parse_signature_chunk, ComponentMask, SignatureChunk, SignatureEntry, SystemValue,
};
pub use crate::sm4::{
    decode_instructions, decode_version_token, ShaderModel, ShaderStage, Sm4Error, Sm4Program,
};
