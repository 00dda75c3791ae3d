//! VFS error types.

use std::io;
use tansu_pack::PackError;
use thiserror::Error;

/// VFS error type.
///
/// Backends and the router report failure through these values; nothing
/// panics across the router boundary.
#[derive(Debug, Error)]
pub enum VfsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Write attempted where only read-only coverage exists.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Path failed normalization or lacks a required name.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// `..` segments walked above the virtual root.
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Expected a file, got a directory path.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// File still referenced by open streams.
    #[error("file is in use: {0}")]
    InUse(String),

    /// Mutating operation against a read-only backend.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Stream used after close.
    #[error("stream is closed")]
    Closed,

    /// Malformed pack archive or undecodable entry.
    #[error("pack error: {0}")]
    Pack(#[from] PackError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a PermissionDenied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an InUse error.
    pub fn in_use(path: impl Into<String>) -> Self {
        Self::InUse(path.into())
    }

    /// Create an Unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
