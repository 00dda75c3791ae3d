//! Backend capability contract consumed by the router.

use crate::error::VfsResult;
use crate::stream::FileStream;
use crate::types::{BackendKind, FileInfo, OpenMode};

/// The capability set every mounted backend implements over one storage
/// root attached at one mount point.
///
/// Paths handed to a backend are backend-local: the remainder of the
/// virtual path after the backend's mount point, with no leading slash.
/// `""` names the backend root; directory paths keep their trailing
/// slash (`"a/b/"`), file paths do not (`"a/b.txt"`).
pub trait FsOps: Send + Sync {
    /// Prepare the backend for mounting. The router calls this exactly
    /// once; a failure keeps the backend out of the mount list.
    fn init(&mut self) -> VfsResult<()>;

    /// Visit the entries one level below `dir`. Records carry full
    /// virtual paths (the backend knows its own mount point). The
    /// visitor returns `true` to stop early.
    fn enumerate(&self, dir: &str, visit: &mut dyn FnMut(&FileInfo) -> bool);

    /// Open one entry as a stream.
    fn open(&self, path: &str, mode: OpenMode) -> VfsResult<Box<dyn FileStream>>;

    /// Remove a file.
    fn remove_file(&self, path: &str) -> VfsResult<()>;

    /// True when `path` names an existing file.
    fn is_file(&self, path: &str) -> bool;

    /// True when `dir` names an existing directory.
    fn is_dir(&self, dir: &str) -> bool;

    /// Create `dir`, including any missing intermediate directories.
    fn create_dir(&self, dir: &str) -> VfsResult<()>;

    /// Normalized mount point in the virtual namespace, always ending in
    /// `/`. Valid after `init`.
    fn mount_point(&self) -> &str;

    /// Where the backing storage lives: a directory for native backends,
    /// an archive file for pack backends, `"/"` for memory backends.
    fn location(&self) -> &str;

    /// True when the backend refuses all mutation.
    fn read_only(&self) -> bool;

    /// Which storage engine this backend wraps.
    fn kind(&self) -> BackendKind;
}
