use thiserror::Error;

/// Errors produced while parsing a `DXBC` container or one of its chunks.
///
/// Each variant carries a human-readable context string describing which field or
/// range was malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DxbcError {
    /// The fixed container header is truncated or inconsistent.
    #[error("malformed DXBC header: {0}")]
    MalformedHeader(String),
    /// The chunk offset table is inconsistent.
    #[error("malformed DXBC chunk offsets: {0}")]
    MalformedOffsets(String),
    /// A chunk or header field points outside the container.
    #[error("DXBC data out of bounds: {0}")]
    OutOfBounds(String),
    /// A chunk payload could not be parsed.
    #[error("invalid DXBC chunk: {0}")]
    InvalidChunk(String),
}

impl DxbcError {
    pub(crate) fn malformed_header(context: impl Into<String>) -> Self {
        Self::MalformedHeader(context.into())
    }

    pub(crate) fn malformed_offsets(context: impl Into<String>) -> Self {
        Self::MalformedOffsets(context.into())
    }

    pub(crate) fn out_of_bounds(context: impl Into<String>) -> Self {
        Self::OutOfBounds(context.into())
    }

    pub(crate) fn invalid_chunk(context: impl Into<String>) -> Self {
        Self::InvalidChunk(context.into())
    }

    /// Returns the context string without the variant prefix.
    pub fn context(&self) -> &str {
        match self {
            Self::MalformedHeader(ctx)
            | Self::MalformedOffsets(ctx)
            | Self::OutOfBounds(ctx)
            | Self::InvalidChunk(ctx) => ctx,
        }
    }
}
