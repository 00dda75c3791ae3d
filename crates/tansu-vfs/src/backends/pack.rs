//! Read-only pack archive backend.
//!
//! Wraps [`PackArchive`]: the index is parsed once at mount time and
//! never changes. Compressed or obfuscated entries materialize fully in
//! memory when opened; plaintext entries are served straight from the
//! archive file through a private handle.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use tansu_pack::{Compression, PackArchive};
use tracing::warn;

use crate::error::{VfsError, VfsResult};
use crate::ops::FsOps;
use crate::path;
use crate::stream::FileStream;
use crate::types::{BackendKind, FileFlags, FileInfo, OpenMode};

/// Backend serving one pack archive. Permanently read-only.
pub struct PackBackend {
    location: String,
    mount_point: String,
    archive: Option<PackArchive>,
}

impl PackBackend {
    /// Backend for the archive at `location`, to be mounted at
    /// `mount_point`. The archive is parsed by `init`.
    pub fn new(location: impl Into<String>, mount_point: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            mount_point: mount_point.into(),
            archive: None,
        }
    }
}

impl FsOps for PackBackend {
    fn init(&mut self) -> VfsResult<()> {
        self.mount_point = path::mount_point_path(&self.mount_point)?;
        if self.location.is_empty() {
            return Err(VfsError::invalid_path("empty archive location"));
        }
        match PackArchive::open(&self.location) {
            Ok(archive) => {
                self.archive = Some(archive);
                Ok(())
            }
            Err(e) => {
                warn!(archive = %self.location, error = %e, "pack archive mount failed");
                Err(e.into())
            }
        }
    }

    fn enumerate(&self, dir: &str, visit: &mut dyn FnMut(&FileInfo) -> bool) {
        let Some(archive) = &self.archive else {
            return;
        };

        let mut seen_dirs = HashSet::new();
        for (name, _) in archive.entries() {
            let Some(rest) = name.strip_prefix(dir) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            match rest.find('/') {
                None => {
                    let info = FileInfo {
                        path: format!("{}{}{}", self.mount_point, dir, rest),
                        flags: FileFlags::FILE | FileFlags::READ,
                    };
                    if visit(&info) {
                        break;
                    }
                }
                Some(p) => {
                    let virtual_path = format!("{}{}{}", self.mount_point, dir, &rest[..p]);
                    if seen_dirs.insert(virtual_path.clone()) {
                        let info = FileInfo {
                            path: virtual_path,
                            flags: FileFlags::DIR | FileFlags::READ,
                        };
                        if visit(&info) {
                            break;
                        }
                    }
                }
            }
        }
    }

    fn open(&self, local: &str, mode: OpenMode) -> VfsResult<Box<dyn FileStream>> {
        if mode.writes() {
            return Err(VfsError::unsupported("pack archives are read-only"));
        }
        let archive = self
            .archive
            .as_ref()
            .ok_or_else(|| VfsError::not_found(local))?;
        let entry = archive
            .entry(local)
            .ok_or_else(|| VfsError::not_found(local))?;

        let data = if entry.length == 0 {
            // Empty entries never touch the archive file.
            PackData::Inline(Vec::new())
        } else if entry.compression == Compression::None && archive.data_key() == 0 {
            // Plaintext entries stream straight from the file.
            let file = File::open(archive.location())?;
            PackData::Raw {
                file,
                base: entry.offset,
                len: entry.length as u64,
            }
        } else {
            PackData::Inline(archive.read_entry(entry)?)
        };

        Ok(Box::new(PackStream {
            data: Some(data),
            offset: 0,
        }))
    }

    fn remove_file(&self, _local: &str) -> VfsResult<()> {
        Err(VfsError::unsupported("pack archives are read-only"))
    }

    fn is_file(&self, local: &str) -> bool {
        self.archive
            .as_ref()
            .is_some_and(|a| a.entry(local).is_some())
    }

    fn is_dir(&self, dir: &str) -> bool {
        let Some(archive) = &self.archive else {
            return false;
        };
        archive
            .entries()
            .any(|(name, _)| name.len() > dir.len() && name.starts_with(dir))
    }

    fn create_dir(&self, _dir: &str) -> VfsResult<()> {
        Err(VfsError::unsupported("pack archives are read-only"))
    }

    fn mount_point(&self) -> &str {
        &self.mount_point
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn read_only(&self) -> bool {
        true
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Pack
    }
}

enum PackData {
    /// Fully materialized (decoded) entry bytes.
    Inline(Vec<u8>),
    /// Plaintext entry served from the archive file itself.
    Raw { file: File, base: u64, len: u64 },
}

impl PackData {
    fn len(&self) -> u64 {
        match self {
            PackData::Inline(data) => data.len() as u64,
            PackData::Raw { len, .. } => *len,
        }
    }
}

/// Stream over one archive entry.
struct PackStream {
    data: Option<PackData>,
    offset: u64,
}

impl FileStream for PackStream {
    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        let data = self.data.as_ref().ok_or(VfsError::Closed)?;
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(d) => self.offset as i128 + d as i128,
            SeekFrom::End(d) => data.len() as i128 + d as i128,
        };
        if target < 0 {
            return Err(VfsError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            )));
        }
        self.offset = target as u64;
        Ok(self.offset)
    }

    fn read(&mut self, out: &mut [u8]) -> VfsResult<usize> {
        let data = self.data.as_mut().ok_or(VfsError::Closed)?;
        let len = data.len();
        if out.is_empty() || self.offset >= len {
            return Ok(0);
        }
        let n = (out.len() as u64).min(len - self.offset) as usize;
        match data {
            PackData::Inline(bytes) => {
                let start = self.offset as usize;
                out[..n].copy_from_slice(&bytes[start..start + n]);
                self.offset += n as u64;
                Ok(n)
            }
            PackData::Raw { file, base, .. } => {
                file.seek(SeekFrom::Start(*base + self.offset))?;
                let read = file.read(&mut out[..n])?;
                self.offset += read as u64;
                Ok(read)
            }
        }
    }

    fn write(&mut self, _buf: &[u8]) -> VfsResult<usize> {
        Err(VfsError::unsupported("pack streams are read-only"))
    }

    fn tell(&mut self) -> u64 {
        self.offset
    }

    fn size(&mut self) -> u64 {
        self.data.as_ref().map(PackData::len).unwrap_or(0)
    }

    fn is_open(&self) -> bool {
        self.data.is_some()
    }

    fn close(&mut self) {
        self.data = None;
        self.offset = 0;
    }
}
