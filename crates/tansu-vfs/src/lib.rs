//! tansu: a union virtual filesystem for asset pipelines and game
//! runtimes.
//!
//! Heterogeneous storage backends — loose files on disk, an in-memory
//! scratch store, and read-only pack archives — mount into one
//! hierarchical virtual namespace. Backends may share or nest mount
//! points; the resulting overlay resolves deterministically by mount
//! order. Key components:
//!
//! - [`VfsRouter`] — ordered mount table; the public surface for
//!   application code
//! - [`NativeBackend`], [`MemoryBackend`], [`PackBackend`] — the three
//!   storage engines behind the [`FsOps`] contract
//! - [`FileStream`] — byte-level read/write/seek over one open entry
//! - [`path`] — virtual path normalization and helpers
//!
//! ## Design decisions
//!
//! - **First match wins**: overlap resolution walks mounts in mount
//!   order and the earliest backend holding an entry serves it, which
//!   makes patch-over-base layering a matter of mount sequence.
//! - **Fully synchronous**: every operation blocks until it completes
//!   or fails; there is no async machinery anywhere.
//! - **Streams outlive mounts**: an open stream holds shared storage or
//!   a private handle, never a reference to its backend, so unmounting
//!   cannot dangle.

pub mod backends;
mod error;
mod ops;
pub mod path;
mod router;
mod stream;
#[cfg(test)]
mod testutil;
mod types;

pub use backends::{MemoryBackend, NativeBackend, PackBackend};
pub use error::{VfsError, VfsResult};
pub use ops::FsOps;
pub use router::{MountId, MountInfo, VfsRouter};
pub use stream::FileStream;
pub use types::{BackendKind, FileFlags, FileInfo, OpenMode};
