//! Ordered mount table routing virtual paths to backends.

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{VfsError, VfsResult};
use crate::ops::FsOps;
use crate::path;
use crate::stream::FileStream;
use crate::types::{BackendKind, FileFlags, FileInfo, OpenMode};

/// Token identifying one mounted backend instance.
///
/// Returned by [`VfsRouter::mount`]; the only way to address a backend
/// afterwards, since the router owns the backend outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(u64);

/// Snapshot of one mount, for diagnostics and tooling.
#[derive(Debug, Clone)]
pub struct MountInfo {
    pub id: MountId,
    pub mount_point: String,
    pub location: String,
    pub read_only: bool,
    pub kind: BackendKind,
}

struct Mount {
    id: MountId,
    backend: Box<dyn FsOps>,
}

/// Routes every virtual-path operation to the owning backend(s).
///
/// Mount order encodes precedence: when several backends cover an
/// overlapping region, the earliest-mounted one whose rewritten local
/// path names an existing entry services the call. Writes prefer an
/// existing file, then fall back to the earliest writable covering
/// backend.
///
/// The mount list sits behind a single always-on reader/writer lock, so
/// mounting and unmounting are safe against concurrent path operations.
/// Every call is synchronous and runs to completion or failure.
pub struct VfsRouter {
    mounts: RwLock<Vec<Mount>>,
    next_id: AtomicU64,
}

impl Default for VfsRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VfsRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mounts = self.mounts.read();
        f.debug_struct("VfsRouter")
            .field(
                "mounts",
                &mounts
                    .iter()
                    .map(|m| m.backend.mount_point().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl VfsRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            mounts: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Mount a backend, taking ownership of it.
    ///
    /// The backend's `init` runs first; on failure the backend is
    /// dropped and the error reported — it never joins the mount list.
    pub fn mount(&self, mut backend: Box<dyn FsOps>) -> VfsResult<MountId> {
        if let Err(e) = backend.init() {
            warn!(error = %e, "backend init failed, discarding mount");
            return Err(e);
        }
        let id = MountId(self.next_id.fetch_add(1, Ordering::Relaxed));
        info!(
            mount = backend.mount_point(),
            kind = ?backend.kind(),
            "mounted backend"
        );
        self.mounts.write().push(Mount { id, backend });
        Ok(id)
    }

    /// Unmount and destroy a backend. Returns `false` when the id is
    /// unknown. Streams already open on the backend stay valid; they
    /// hold their own storage references.
    pub fn unmount(&self, id: MountId) -> bool {
        let mut mounts = self.mounts.write();
        match mounts.iter().position(|m| m.id == id) {
            Some(i) => {
                let m = mounts.remove(i);
                info!(mount = m.backend.mount_point(), "unmounted backend");
                true
            }
            None => false,
        }
    }

    /// Snapshot all current mounts in precedence order.
    pub fn list_mounts(&self) -> Vec<MountInfo> {
        self.mounts
            .read()
            .iter()
            .map(|m| MountInfo {
                id: m.id,
                mount_point: m.backend.mount_point().to_string(),
                location: m.backend.location().to_string(),
                read_only: m.backend.read_only(),
                kind: m.backend.kind(),
            })
            .collect()
    }

    /// Open `path` as a stream.
    ///
    /// An existing entry wins in mount order; Write/Append against a
    /// read-only owner fails outright. When nothing owns the entry yet,
    /// Read fails and writing modes try to create it on each writable
    /// covering backend, first success winning.
    pub fn open(&self, virtual_path: &str, mode: OpenMode) -> VfsResult<Box<dyn FileStream>> {
        let file_path = path::normalize(&path::to_unix_style(virtual_path))?;
        if file_path.ends_with('/') {
            return Err(VfsError::is_a_directory(file_path));
        }

        let mounts = self.mounts.read();
        let mut writable = Vec::new();

        for m in mounts.iter() {
            let Some(local) = local_path(m.backend.as_ref(), &file_path) else {
                continue;
            };
            if m.backend.is_file(local) {
                if mode.writes() && m.backend.read_only() {
                    return Err(VfsError::permission_denied(file_path));
                }
                return m.backend.open(local, mode);
            }
            if !m.backend.read_only() {
                writable.push(m);
            }
        }

        if mode == OpenMode::Read {
            return Err(VfsError::not_found(file_path));
        }

        for m in writable {
            let Some(local) = local_path(m.backend.as_ref(), &file_path) else {
                continue;
            };
            match m.backend.open(local, mode) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(
                        mount = m.backend.mount_point(),
                        error = %e,
                        "create candidate refused, trying next"
                    );
                }
            }
        }
        Err(VfsError::not_found(file_path))
    }

    /// Enumerate `dir` across all covering mounts, in mount order. No
    /// virtual path is yielded twice even when several backends expose
    /// it. The visitor returns `true` to stop; the stop applies across
    /// backends.
    pub fn enumerate(&self, dir: &str, mut visit: impl FnMut(&FileInfo) -> bool) {
        let dir_path = match path::normalize(&path::convert_dir_path(dir)) {
            Ok(p) => p,
            Err(e) => {
                debug!(dir, error = %e, "enumerate of invalid directory");
                return;
            }
        };

        let mounts = self.mounts.read();
        let mut seen: HashSet<String> = HashSet::new();
        let mut stopped = false;

        for m in mounts.iter() {
            if stopped {
                break;
            }
            let backend = m.backend.as_ref();
            let mnt = backend.mount_point();

            if let Some(rest) = mnt.strip_prefix(dir_path.as_str()) {
                if rest.is_empty() {
                    // The directory is the mount point itself.
                    backend.enumerate("", &mut |record| {
                        if seen.insert(record.path.clone()) && visit(record) {
                            stopped = true;
                        }
                        stopped
                    });
                } else {
                    // Something is mounted strictly below: the first
                    // segment toward it is a directory, even if no
                    // backend stores one there.
                    let name = path::first_segment(rest);
                    let virtual_path = format!("{dir_path}{name}");
                    let mut flags = FileFlags::DIR | FileFlags::READ;
                    if !backend.read_only() && mnt.strip_suffix('/') == Some(&virtual_path) {
                        flags |= FileFlags::WRITE;
                    }
                    if seen.insert(virtual_path.clone()) {
                        let record = FileInfo {
                            path: virtual_path,
                            flags,
                        };
                        if visit(&record) {
                            stopped = true;
                        }
                    }
                }
            } else if let Some(rest) = dir_path.strip_prefix(mnt) {
                // The directory lives inside this mount.
                backend.enumerate(rest, &mut |record| {
                    if seen.insert(record.path.clone()) && visit(record) {
                        stopped = true;
                    }
                    stopped
                });
            }
        }
    }

    /// Remove the file at `path` from the first covering backend that
    /// owns it.
    pub fn remove_file(&self, virtual_path: &str) -> VfsResult<()> {
        let file_path = path::normalize(&path::to_unix_style(virtual_path))?;
        if file_path.ends_with('/') {
            return Err(VfsError::is_a_directory(file_path));
        }

        let mounts = self.mounts.read();
        for m in mounts.iter() {
            if let Some(local) = local_path(m.backend.as_ref(), &file_path) {
                if m.backend.is_file(local) {
                    return m.backend.remove_file(local);
                }
            }
        }
        Err(VfsError::not_found(file_path))
    }

    /// True when `path` names an existing file in any covering backend.
    pub fn is_file(&self, virtual_path: &str) -> bool {
        let Ok(file_path) = path::normalize(&path::to_unix_style(virtual_path)) else {
            return false;
        };
        if file_path.ends_with('/') {
            return false;
        }
        self.mounts.read().iter().any(|m| {
            local_path(m.backend.as_ref(), &file_path)
                .is_some_and(|local| m.backend.is_file(local))
        })
    }

    /// True when `dir` names a directory — a real one in some backend,
    /// or a virtual one implied purely by a mount nested beneath it.
    pub fn is_dir(&self, dir: &str) -> bool {
        let Ok(dir_path) = path::normalize(&path::convert_dir_path(dir)) else {
            return false;
        };
        self.mounts
            .read()
            .iter()
            .any(|m| covers_dir(m.backend.as_ref(), &dir_path))
    }

    /// Create `dir` on the first writable backend whose mount point
    /// covers it. That backend's verdict is final; later candidates are
    /// not consulted.
    pub fn create_dir(&self, dir: &str) -> VfsResult<()> {
        let dir_path = path::normalize(&path::convert_dir_path(dir))?;

        let mounts = self.mounts.read();
        for m in mounts.iter() {
            if m.backend.read_only() {
                continue;
            }
            if let Some(local) = dir_path.strip_prefix(m.backend.mount_point()) {
                return m.backend.create_dir(local);
            }
        }
        Err(VfsError::not_found(dir_path))
    }

    /// Copy `src` to `dst` through whole-file buffering.
    ///
    /// Any open failure, short read, or short write fails the copy; a
    /// partially written destination is left as-is.
    pub fn copy_file(&self, src: &str, dst: &str) -> VfsResult<()> {
        let mut src_stream = self.open(src, OpenMode::Read)?;
        let size = src_stream.size() as usize;

        if size == 0 {
            self.open(dst, OpenMode::Write)?;
            return Ok(());
        }

        let mut data = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            let n = src_stream.read(&mut data[filled..])?;
            if n == 0 {
                return Err(VfsError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("short read copying {src}"),
                )));
            }
            filled += n;
        }

        let mut dst_stream = self.open(dst, OpenMode::Write)?;
        let mut written = 0;
        while written < size {
            let n = dst_stream.write(&data[written..])?;
            if n == 0 {
                return Err(VfsError::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write copying to {dst}"),
                )));
            }
            written += n;
        }
        Ok(())
    }
}

/// Rewrite a virtual path into a backend's local coordinates, when the
/// backend's mount point covers it.
fn local_path<'a>(backend: &dyn FsOps, virtual_path: &'a str) -> Option<&'a str> {
    virtual_path.strip_prefix(backend.mount_point())
}

/// Directory-existence check against one backend, honoring virtual
/// directories implied by nested mount points.
fn covers_dir(backend: &dyn FsOps, dir_path: &str) -> bool {
    let mnt = backend.mount_point();
    if let Some(rest) = mnt.strip_prefix(dir_path) {
        if rest.is_empty() {
            backend.is_dir("")
        } else {
            true
        }
    } else if let Some(rest) = dir_path.strip_prefix(mnt) {
        backend.is_dir(rest)
    } else {
        false
    }
}
