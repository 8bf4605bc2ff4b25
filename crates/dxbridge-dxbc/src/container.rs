use core::fmt;

use crate::bytes::read_u32_le;
use crate::signature::{parse_signature_chunk, SignatureChunk};
use crate::{DxbcError, FourCC};

/// magic + checksum + reserved + total_size + chunk_count
const DXBC_HEADER_LEN: usize = 4 + 16 + 4 + 4 + 4;
/// Real containers hold a handful of chunks; this only bounds work on hostile input.
const MAX_DXBC_CHUNK_COUNT: u32 = 4096;

/// The fixed header of a `DXBC` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DxbcHeader {
    /// The checksum stored in the container header (MD5, not validated).
    pub checksum: [u8; 16],
    /// Declared total size, in bytes.
    pub total_size: u32,
    /// Number of chunks.
    pub chunk_count: u32,
}

/// A single chunk within a `DXBC` container.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct DxbcChunk<'a> {
    pub fourcc: FourCC,
    pub data: &'a [u8],
}

impl fmt::Debug for DxbcChunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DxbcChunk")
            .field("fourcc", &self.fourcc)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// A parsed, bounds-validated `DXBC` container.
///
/// Every chunk range is validated up front in [`DxbcFile::parse`], so the accessors below
/// never fail.
#[derive(Debug, Clone)]
pub struct DxbcFile<'a> {
    header: DxbcHeader,
    chunks: Vec<DxbcChunk<'a>>,
}

impl<'a> DxbcFile<'a> {
    /// Parses a `DXBC` container from untrusted `bytes`.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, DxbcError> {
        if bytes.len() < DXBC_HEADER_LEN {
            return Err(DxbcError::malformed_header(format!(
                "need at least {DXBC_HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let magic = FourCC([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != FourCC::DXBC {
            return Err(DxbcError::malformed_header(format!(
                "bad magic {magic:?}, expected {:?}",
                FourCC::DXBC
            )));
        }

        let mut checksum = [0u8; 16];
        checksum.copy_from_slice(&bytes[4..20]);
        let total_size = read_u32_le(bytes, 24, "total_size")?;
        let chunk_count = read_u32_le(bytes, 28, "chunk_count")?;

        if chunk_count > MAX_DXBC_CHUNK_COUNT {
            return Err(DxbcError::malformed_offsets(format!(
                "chunk_count {chunk_count} exceeds maximum {MAX_DXBC_CHUNK_COUNT}"
            )));
        }
        if (total_size as usize) < DXBC_HEADER_LEN {
            return Err(DxbcError::malformed_header(format!(
                "total_size {total_size} is smaller than header size {DXBC_HEADER_LEN}"
            )));
        }
        if total_size as usize > bytes.len() {
            return Err(DxbcError::out_of_bounds(format!(
                "total_size {total_size} exceeds buffer length {}",
                bytes.len()
            )));
        }

        // Everything past the declared size is ignored.
        let bytes = &bytes[..total_size as usize];

        let offset_table_end = DXBC_HEADER_LEN + chunk_count as usize * 4;
        if offset_table_end > bytes.len() {
            return Err(DxbcError::malformed_offsets(format!(
                "chunk offset table ends at {offset_table_end}, but total_size is {}",
                bytes.len()
            )));
        }

        let chunks = (0..chunk_count as usize)
            .map(|index| read_chunk(bytes, index, offset_table_end))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            header: DxbcHeader {
                checksum,
                total_size,
                chunk_count,
            },
            chunks,
        })
    }

    pub fn header(&self) -> &DxbcHeader {
        &self.header
    }

    /// Iterates over all chunks in file order.
    pub fn chunks(&self) -> impl Iterator<Item = DxbcChunk<'a>> + '_ {
        self.chunks.iter().copied()
    }

    /// Returns the first chunk matching `fourcc`, if any.
    pub fn get_chunk(&self, fourcc: FourCC) -> Option<DxbcChunk<'a>> {
        self.chunks().find(|chunk| chunk.fourcc == fourcc)
    }

    /// Returns the shader bytecode chunk, preferring `SHEX` (SM5) over `SHDR` (SM4).
    pub fn shader_chunk(&self) -> Option<DxbcChunk<'a>> {
        self.get_chunk(FourCC::SHEX)
            .or_else(|| self.get_chunk(FourCC::SHDR))
    }

    /// Returns and parses the signature chunk of the given kind.
    ///
    /// Chunks spelled exactly `kind` are tried first in file order; if none parses, the
    /// `*SG1`/`*SGN` counterpart is tried. `None` means neither spelling is present.
    pub fn get_signature(&self, kind: FourCC) -> Option<Result<SignatureChunk, DxbcError>> {
        let primary = self.parse_first_signature(kind);
        if matches!(primary, Some(Ok(_))) {
            return primary;
        }

        let Some(variant) = kind.signature_variant() else {
            return primary;
        };

        match self.parse_first_signature(variant) {
            ok @ Some(Ok(_)) => ok,
            Some(Err(err)) if primary.is_none() => Some(Err(err)),
            _ => primary,
        }
    }

    fn parse_first_signature(&self, kind: FourCC) -> Option<Result<SignatureChunk, DxbcError>> {
        let mut first_err = None;
        for chunk in self.chunks().filter(|chunk| chunk.fourcc == kind) {
            match parse_signature_chunk(chunk.fourcc, chunk.data) {
                Ok(sig) => return Some(Ok(sig)),
                Err(err) => {
                    first_err.get_or_insert(DxbcError::invalid_chunk(format!(
                        "{} signature chunk: {}",
                        chunk.fourcc,
                        err.context()
                    )));
                }
            }
        }
        first_err.map(Err)
    }
}

/// Reads chunk `index` through the offset table, checking its header and payload stay inside
/// `bytes` and after the offset table.
fn read_chunk(bytes: &[u8], index: usize, offset_table_end: usize) -> Result<DxbcChunk<'_>, DxbcError> {
    let start = read_u32_le(bytes, DXBC_HEADER_LEN + index * 4, "chunk offset")? as usize;
    if start < offset_table_end {
        return Err(DxbcError::malformed_offsets(format!(
            "chunk #{index} starts at {start}, inside the offset table ending at {offset_table_end}"
        )));
    }

    let payload_start = start.saturating_add(8);
    let fourcc_and_len = bytes.get(start..payload_start).ok_or_else(|| {
        DxbcError::out_of_bounds(format!(
            "chunk #{index} header {start}..{payload_start} exceeds container size {}",
            bytes.len()
        ))
    })?;
    let fourcc = FourCC([
        fourcc_and_len[0],
        fourcc_and_len[1],
        fourcc_and_len[2],
        fourcc_and_len[3],
    ]);
    let len = read_u32_le(fourcc_and_len, 4, "chunk size")? as usize;

    let data = payload_start
        .checked_add(len)
        .and_then(|payload_end| bytes.get(payload_start..payload_end))
        .ok_or_else(|| {
            DxbcError::out_of_bounds(format!(
                "chunk #{index} ({fourcc}) declares {len} bytes at {payload_start}, past container size {}",
                bytes.len()
            ))
        })?;

    Ok(DxbcChunk { fourcc, data })
}
