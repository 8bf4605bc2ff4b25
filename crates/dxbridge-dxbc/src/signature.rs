//! Parsers for DXBC signature chunks (`ISGN`, `OSGN`, `PCSG`, `PSGN` and their `*SG1`
//! variants).
//!
//! Signature chunks describe the shader stage interface: which registers carry which
//! semantics, which components are written, and which system value (if any) each element
//! represents.

use bitflags::bitflags;

use crate::bytes::{read_cstring, read_u32_le, read_u8};
use crate::{DxbcError, FourCC};

const SIGNATURE_HEADER_LEN: usize = 8;
const SIGNATURE_ENTRY_LEN_V0: usize = 24;
const SIGNATURE_ENTRY_LEN_V1: usize = 32;

bitflags! {
    /// Component presence / write mask of a signature element.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentMask: u8 {
        const X = 0b0001;
        const Y = 0b0010;
        const Z = 0b0100;
        const W = 0b1000;
        const XYZW = 0b1111;
    }
}

impl ComponentMask {
    /// Number of components covered by the mask.
    pub fn component_count(self) -> u32 {
        self.bits().count_ones()
    }
}

/// System value semantic of a signature element (`D3D_NAME`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemValue {
    None,
    Position,
    ClipDistance,
    CullDistance,
    RenderTargetArrayIndex,
    ViewportArrayIndex,
    VertexId,
    PrimitiveId,
    InstanceId,
    IsFrontFace,
    SampleIndex,
    FinalQuadEdgeTessFactor,
    FinalQuadInsideTessFactor,
    FinalTriEdgeTessFactor,
    FinalTriInsideTessFactor,
    FinalLineDetailTessFactor,
    FinalLineDensityTessFactor,
    Target,
    Depth,
    Coverage,
    DepthGreaterEqual,
    DepthLessEqual,
    Other(u32),
}

impl SystemValue {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Position,
            2 => Self::ClipDistance,
            3 => Self::CullDistance,
            4 => Self::RenderTargetArrayIndex,
            5 => Self::ViewportArrayIndex,
            6 => Self::VertexId,
            7 => Self::PrimitiveId,
            8 => Self::InstanceId,
            9 => Self::IsFrontFace,
            10 => Self::SampleIndex,
            11 => Self::FinalQuadEdgeTessFactor,
            12 => Self::FinalQuadInsideTessFactor,
            13 => Self::FinalTriEdgeTessFactor,
            14 => Self::FinalTriInsideTessFactor,
            15 => Self::FinalLineDetailTessFactor,
            16 => Self::FinalLineDensityTessFactor,
            64 => Self::Target,
            65 => Self::Depth,
            66 => Self::Coverage,
            67 => Self::DepthGreaterEqual,
            68 => Self::DepthLessEqual,
            other => Self::Other(other),
        }
    }
}

/// A parsed DXBC signature chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureChunk {
    pub entries: Vec<SignatureEntry>,
}

impl SignatureChunk {
    pub fn iter(&self) -> impl Iterator<Item = &SignatureEntry> {
        self.entries.iter()
    }

    /// Finds the element bound to `register` whose mask overlaps `mask`.
    pub fn find_by_register(&self, register: u32, mask: ComponentMask) -> Option<&SignatureEntry> {
        self.entries
            .iter()
            .find(|e| e.register == register && e.mask.intersects(mask))
    }
}

/// A single signature element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    /// The semantic name (e.g. `"SV_ClipDistance"` or `"TEXCOORD"`).
    pub semantic_name: String,
    pub semantic_index: u32,
    pub system_value: SystemValue,
    /// Register component type (`D3D_REGISTER_COMPONENT_TYPE`) as a raw value.
    pub component_type: u32,
    pub register: u32,
    pub mask: ComponentMask,
    pub read_write_mask: ComponentMask,
    pub stream: u32,
}

/// Parses a signature chunk payload (the bytes following the chunk's FourCC and size).
///
/// `fourcc` selects the entry layout: `*SG1`/`PCG1` chunks use 32-byte entries, everything
/// else the 24-byte layout.
pub fn parse_signature_chunk(fourcc: FourCC, bytes: &[u8]) -> Result<SignatureChunk, DxbcError> {
    if bytes.len() < SIGNATURE_HEADER_LEN {
        return Err(DxbcError::invalid_chunk(format!(
            "signature chunk is truncated: need {SIGNATURE_HEADER_LEN} bytes for header, got {}",
            bytes.len()
        )));
    }

    let param_count = read_u32_le(bytes, 0, "param_count")? as usize;
    let param_offset = read_u32_le(bytes, 4, "param_offset")? as usize;
    if param_count == 0 {
        return Ok(SignatureChunk::default());
    }
    if param_offset < SIGNATURE_HEADER_LEN {
        return Err(DxbcError::invalid_chunk(format!(
            "param_offset {param_offset} points into signature header"
        )));
    }

    let entry_len = if fourcc.is_v1_signature() {
        SIGNATURE_ENTRY_LEN_V1
    } else {
        SIGNATURE_ENTRY_LEN_V0
    };

    let table_end = param_count
        .checked_mul(entry_len)
        .and_then(|len| len.checked_add(param_offset))
        .ok_or_else(|| DxbcError::invalid_chunk("signature table size overflows"))?;
    if table_end > bytes.len() {
        return Err(DxbcError::invalid_chunk(format!(
            "signature table at {param_offset}..{table_end} is outside chunk length {}",
            bytes.len()
        )));
    }

    let mut entries = Vec::with_capacity(param_count);
    for index in 0..param_count {
        let base = param_offset + index * entry_len;
        entries.push(
            parse_entry(bytes, base, entry_len)
                .map_err(|e| DxbcError::invalid_chunk(format!("entry {index}: {}", e.context())))?,
        );
    }

    Ok(SignatureChunk { entries })
}

fn parse_entry(bytes: &[u8], base: usize, entry_len: usize) -> Result<SignatureEntry, DxbcError> {
    let name_offset = read_u32_le(bytes, base, "semantic_name_offset")? as usize;
    let semantic_index = read_u32_le(bytes, base + 4, "semantic_index")?;
    let system_value = SystemValue::from_raw(read_u32_le(bytes, base + 8, "system_value_type")?);
    let component_type = read_u32_le(bytes, base + 12, "component_type")?;
    let register = read_u32_le(bytes, base + 16, "register")?;
    let mask = read_u8(bytes, base + 20, "mask")?;
    let read_write_mask = read_u8(bytes, base + 21, "read_write_mask")?;

    // v0 packs the stream into the third byte of the mask DWORD; v1 stores it as a DWORD.
    let stream = if entry_len == SIGNATURE_ENTRY_LEN_V1 {
        read_u32_le(bytes, base + 24, "stream")?
    } else {
        u32::from(read_u8(bytes, base + 22, "stream")?)
    };

    if name_offset < SIGNATURE_HEADER_LEN {
        return Err(DxbcError::invalid_chunk(format!(
            "semantic_name_offset {name_offset} points into signature header"
        )));
    }
    let semantic_name = read_cstring(bytes, name_offset, "semantic_name")?.to_owned();

    Ok(SignatureEntry {
        semantic_name,
        semantic_index,
        system_value,
        component_type,
        register,
        mask: ComponentMask::from_bits_truncate(mask),
        read_write_mask: ComponentMask::from_bits_truncate(read_write_mask),
        stream,
    })
}
