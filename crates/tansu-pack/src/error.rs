//! Pack archive error types.

use std::io;
use thiserror::Error;

/// Errors produced while parsing or decoding a pack archive.
///
/// Archive-level errors (`BadSignature`, `UnsupportedVersion`,
/// `TruncatedIndex`) make the whole archive unusable; the remaining
/// variants are scoped to a single entry.
#[derive(Debug, Error)]
pub enum PackError {
    /// File too small to hold a header, or signature mismatch.
    #[error("not a pack archive")]
    BadSignature,

    /// Header version this reader does not understand.
    #[error("unsupported pack version {0}")]
    UnsupportedVersion(u32),

    /// Index region ended in the middle of a record.
    #[error("truncated index record at offset {0}")]
    TruncatedIndex(u64),

    /// Entry payload region is shorter than the index claims.
    #[error("truncated entry data at offset {0}")]
    TruncatedData(u64),

    /// Compression kind byte this reader does not understand.
    #[error("unknown compression kind {0}")]
    UnknownCompression(u8),

    /// Entry payload failed to inflate.
    #[error("entry failed to decompress: {0}")]
    Decompress(#[source] io::Error),

    /// I/O error against the archive file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Pack result type.
pub type PackResult<T> = Result<T, PackError>;
