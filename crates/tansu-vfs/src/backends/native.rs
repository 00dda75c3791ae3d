//! Native directory-tree backend: a thin adapter over `std::fs`.
//!
//! Local paths join onto the configured root directory. Metadata is
//! queried fresh on every call; nothing is cached between operations.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{VfsError, VfsResult};
use crate::ops::FsOps;
use crate::path;
use crate::stream::FileStream;
use crate::types::{BackendKind, FileFlags, FileInfo, OpenMode};

/// Backend exposing a real directory tree.
pub struct NativeBackend {
    root: PathBuf,
    location: String,
    mount_point: String,
    read_only: bool,
}

impl NativeBackend {
    /// Backend rooted at `root`, to be mounted at `mount_point`.
    pub fn new(root: impl Into<PathBuf>, mount_point: impl Into<String>) -> Self {
        let root = root.into();
        let location = path::convert_dir_path(&root.to_string_lossy());
        Self {
            root,
            location,
            mount_point: mount_point.into(),
            read_only: false,
        }
    }

    /// Toggle the write capability surfaced to the router.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// The backing directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, local: &str) -> PathBuf {
        if local.is_empty() {
            self.root.clone()
        } else {
            self.root.join(local)
        }
    }

    fn check_writable(&self) -> VfsResult<()> {
        if self.read_only {
            Err(VfsError::unsupported("backend is read-only"))
        } else {
            Ok(())
        }
    }
}

impl FsOps for NativeBackend {
    fn init(&mut self) -> VfsResult<()> {
        self.mount_point = path::mount_point_path(&self.mount_point)?;
        if !self.root.is_dir() {
            return Err(VfsError::not_a_directory(self.location.clone()));
        }
        Ok(())
    }

    fn enumerate(&self, dir: &str, visit: &mut dyn FnMut(&FileInfo) -> bool) {
        let Ok(entries) = fs::read_dir(self.full_path(dir)) else {
            return;
        };

        let mut base = FileFlags::READ;
        if !self.read_only {
            base |= FileFlags::WRITE;
        }

        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let flags = base
                | if file_type.is_dir() {
                    FileFlags::DIR
                } else {
                    FileFlags::FILE
                };
            let name = entry.file_name();
            let info = FileInfo {
                path: format!(
                    "{}{}{}",
                    self.mount_point,
                    dir,
                    name.to_string_lossy()
                ),
                flags,
            };
            if visit(&info) {
                break;
            }
        }
    }

    fn open(&self, local: &str, mode: OpenMode) -> VfsResult<Box<dyn FileStream>> {
        let full = self.full_path(local);
        let file = match mode {
            OpenMode::Read => OpenOptions::new().read(true).open(&full)?,
            // Existing bytes are preserved so Write supports in-place
            // overwrite after a seek, as well as creating new files.
            OpenMode::Write => {
                self.check_writable()?;
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(&full)?
            }
            OpenMode::Append => {
                self.check_writable()?;
                OpenOptions::new()
                    .read(true)
                    .append(true)
                    .create(true)
                    .open(&full)?
            }
        };

        let mut stream = NativeStream { file: Some(file) };
        if mode == OpenMode::Append {
            stream.seek(SeekFrom::End(0))?;
        }
        Ok(Box::new(stream))
    }

    fn remove_file(&self, local: &str) -> VfsResult<()> {
        self.check_writable()?;
        fs::remove_file(self.full_path(local))?;
        Ok(())
    }

    fn is_file(&self, local: &str) -> bool {
        self.full_path(local).is_file()
    }

    fn is_dir(&self, dir: &str) -> bool {
        self.full_path(dir).is_dir()
    }

    fn create_dir(&self, dir: &str) -> VfsResult<()> {
        self.check_writable()?;
        let full = self.full_path(dir);
        if full.is_dir() {
            return Err(VfsError::already_exists(dir));
        }
        fs::create_dir_all(full)?;
        Ok(())
    }

    fn mount_point(&self) -> &str {
        &self.mount_point
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }
}

/// Stream over one OS file handle.
struct NativeStream {
    file: Option<File>,
}

impl FileStream for NativeStream {
    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        let file = self.file.as_mut().ok_or(VfsError::Closed)?;
        Ok(file.seek(pos)?)
    }

    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        let file = self.file.as_mut().ok_or(VfsError::Closed)?;
        Ok(file.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> VfsResult<usize> {
        let file = self.file.as_mut().ok_or(VfsError::Closed)?;
        Ok(file.write(buf)?)
    }

    fn tell(&mut self) -> u64 {
        self.file
            .as_mut()
            .and_then(|f| f.stream_position().ok())
            .unwrap_or(0)
    }

    fn size(&mut self) -> u64 {
        self.file
            .as_ref()
            .and_then(|f| f.metadata().ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn close(&mut self) {
        self.file = None;
    }
}
