//! In-memory scratch backend.
//!
//! File contents live in reference-counted shared buffers, so every
//! stream open on one logical path observes the same bytes. All data is
//! lost when the backend is dropped.

use std::io::{self, SeekFrom};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;

use crate::error::{VfsError, VfsResult};
use crate::ops::FsOps;
use crate::path;
use crate::stream::FileStream;
use crate::types::{BackendKind, FileFlags, FileInfo, OpenMode};

/// Growable byte store shared by every stream open on one logical file.
///
/// Each call takes the buffer's lock, so concurrent readers and writers
/// interleave safely and a reader sees the length at the instant of its
/// call. Writers are not serialized against each other beyond that:
/// overlapping writes are last-write-wins, by policy.
struct SharedBuf {
    data: Mutex<Vec<u8>>,
}

impl SharedBuf {
    fn new() -> Self {
        Self {
            data: Mutex::new(Vec::with_capacity(8192)),
        }
    }

    /// Copy `data` in at `offset`, growing the buffer as needed. Gap
    /// bytes introduced by growth are zeroed.
    fn write(&self, offset: u64, data: &[u8]) -> u64 {
        if data.is_empty() {
            return 0;
        }
        let mut buf = self.data.lock();
        let start = offset as usize;
        let end = start + data.len();
        if end > buf.len() {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(data);
        data.len() as u64
    }

    /// Copy out up to `out.len()` bytes starting at `offset`. Reads past
    /// the current length come back short or empty, never as errors.
    fn read(&self, offset: u64, out: &mut [u8]) -> u64 {
        if out.is_empty() {
            return 0;
        }
        let buf = self.data.lock();
        let len = buf.len() as u64;
        if offset >= len {
            return 0;
        }
        let n = (out.len() as u64).min(len - offset) as usize;
        let start = offset as usize;
        out[..n].copy_from_slice(&buf[start..start + n]);
        n as u64
    }

    fn len(&self) -> u64 {
        self.data.lock().len() as u64
    }
}

/// In-memory filesystem backend.
///
/// A name → shared-buffer table plus the set of known directory paths.
/// The backend root always exists. Buffers are created lazily on the
/// first write to a new path and die with their last reference.
pub struct MemoryBackend {
    mount_point: String,
    files: DashMap<String, Arc<SharedBuf>>,
    dirs: DashSet<String>,
}

impl MemoryBackend {
    /// Create a backend to be mounted at `mount_point`.
    pub fn new(mount_point: impl Into<String>) -> Self {
        let dirs = DashSet::new();
        dirs.insert(String::new());
        Self {
            mount_point: mount_point.into(),
            files: DashMap::new(),
            dirs,
        }
    }
}

impl FsOps for MemoryBackend {
    fn init(&mut self) -> VfsResult<()> {
        self.mount_point = path::mount_point_path(&self.mount_point)?;
        Ok(())
    }

    fn enumerate(&self, dir: &str, visit: &mut dyn FnMut(&FileInfo) -> bool) {
        if !self.dirs.contains(dir) {
            return;
        }

        // Snapshot before visiting: the visitor may call back into this
        // backend, and dashmap iteration holds shard locks.
        let mut records = Vec::new();
        for d in self.dirs.iter() {
            if let Some(rest) = d.key().strip_prefix(dir) {
                if !rest.is_empty() && rest.find('/') == Some(rest.len() - 1) {
                    records.push(FileInfo {
                        path: format!("{}{}{}", self.mount_point, dir, &rest[..rest.len() - 1]),
                        flags: FileFlags::DIR | FileFlags::READ | FileFlags::WRITE,
                    });
                }
            }
        }
        for f in self.files.iter() {
            if let Some(rest) = f.key().strip_prefix(dir) {
                if !rest.is_empty() && !rest.contains('/') {
                    records.push(FileInfo {
                        path: format!("{}{}{}", self.mount_point, dir, rest),
                        flags: FileFlags::FILE | FileFlags::READ | FileFlags::WRITE,
                    });
                }
            }
        }

        for info in &records {
            if visit(info) {
                break;
            }
        }
    }

    fn open(&self, local: &str, mode: OpenMode) -> VfsResult<Box<dyn FileStream>> {
        if let Some(buf) = self.files.get(local) {
            return Ok(Box::new(MemoryStream::open(Arc::clone(buf.value()), mode)));
        }

        if mode == OpenMode::Read {
            return Err(VfsError::not_found(local));
        }

        // New files require their containing directory to already exist.
        if !self.dirs.contains(path::parent_dir(local)) {
            return Err(VfsError::not_found(format!(
                "no containing directory for {local}"
            )));
        }

        let buf = self
            .files
            .entry(local.to_string())
            .or_insert_with(|| Arc::new(SharedBuf::new()));
        Ok(Box::new(MemoryStream::open(Arc::clone(buf.value()), mode)))
    }

    fn remove_file(&self, local: &str) -> VfsResult<()> {
        // Only the table's own reference may remain; live streams block
        // removal.
        match self
            .files
            .remove_if(local, |_, buf| Arc::strong_count(buf) == 1)
        {
            Some(_) => Ok(()),
            None if self.files.contains_key(local) => Err(VfsError::in_use(local)),
            None => Err(VfsError::not_found(local)),
        }
    }

    fn is_file(&self, local: &str) -> bool {
        self.files.contains_key(local)
    }

    fn is_dir(&self, dir: &str) -> bool {
        self.dirs.contains(dir)
    }

    fn create_dir(&self, dir: &str) -> VfsResult<()> {
        if self.dirs.contains(dir) {
            return Err(VfsError::already_exists(dir));
        }
        let mut cur = String::with_capacity(dir.len());
        for seg in dir.split('/').filter(|s| !s.is_empty()) {
            cur.push_str(seg);
            cur.push('/');
            self.dirs.insert(cur.clone());
        }
        Ok(())
    }

    fn mount_point(&self) -> &str {
        &self.mount_point
    }

    fn location(&self) -> &str {
        "/"
    }

    fn read_only(&self) -> bool {
        false
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}

/// Stream over one shared in-memory buffer.
struct MemoryStream {
    buf: Option<Arc<SharedBuf>>,
    offset: u64,
    mode: OpenMode,
}

impl MemoryStream {
    fn open(buf: Arc<SharedBuf>, mode: OpenMode) -> Self {
        let offset = match mode {
            OpenMode::Append => buf.len(),
            _ => 0,
        };
        Self {
            buf: Some(buf),
            offset,
            mode,
        }
    }
}

impl FileStream for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        let buf = self.buf.as_ref().ok_or(VfsError::Closed)?;
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(d) => self.offset as i128 + d as i128,
            SeekFrom::End(d) => buf.len() as i128 + d as i128,
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
        let buf = self.buf.as_ref().ok_or(VfsError::Closed)?;
        let n = buf.read(self.offset, out);
        self.offset += n;
        Ok(n as usize)
    }

    fn write(&mut self, data: &[u8]) -> VfsResult<usize> {
        let buf = self.buf.as_ref().ok_or(VfsError::Closed)?;
        if !self.mode.writes() {
            return Err(VfsError::unsupported("stream opened read-only"));
        }
        let n = buf.write(self.offset, data);
        self.offset += n;
        Ok(n as usize)
    }

    fn tell(&mut self) -> u64 {
        self.offset
    }

    fn size(&mut self) -> u64 {
        self.buf.as_ref().map(|b| b.len()).unwrap_or(0)
    }

    fn is_open(&self) -> bool {
        self.buf.is_some()
    }

    fn close(&mut self) {
        self.buf = None;
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MemoryBackend {
        let mut fs = MemoryBackend::new("/mem");
        fs.init().unwrap();
        fs
    }

    #[test]
    fn roundtrip_exact_sizes() {
        let fs = backend();
        for n in [0usize, 1, 8192, 1_000_000] {
            let name = format!("blob-{n}");
            let data: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();

            let mut w = fs.open(&name, OpenMode::Write).unwrap();
            assert_eq!(w.write(&data).unwrap(), n);
            w.close();

            let mut r = fs.open(&name, OpenMode::Read).unwrap();
            assert_eq!(r.size(), n as u64);
            let mut out = vec![0u8; n + 16];
            let read = r.read(&mut out).unwrap();
            assert_eq!(read, n);
            assert_eq!(&out[..read], &data[..]);
        }
    }

    #[test]
    fn read_of_missing_file_fails_then_write_creates() {
        let fs = backend();
        assert!(matches!(
            fs.open("fresh.txt", OpenMode::Read),
            Err(VfsError::NotFound(_))
        ));
        let mut w = fs.open("fresh.txt", OpenMode::Write).unwrap();
        w.write(b"now it exists").unwrap();
        drop(w);
        assert!(fs.is_file("fresh.txt"));
        let mut r = fs.open("fresh.txt", OpenMode::Read).unwrap();
        let mut out = [0u8; 32];
        let n = r.read(&mut out).unwrap();
        assert_eq!(&out[..n], b"now it exists");
    }

    #[test]
    fn new_file_requires_containing_directory() {
        let fs = backend();
        assert!(fs.open("no/such/dir.txt", OpenMode::Write).is_err());
        fs.create_dir("no/such/").unwrap();
        assert!(fs.open("no/such/dir.txt", OpenMode::Write).is_ok());
    }

    #[test]
    fn create_dir_makes_intermediates() {
        let fs = backend();
        fs.create_dir("a/b/c/").unwrap();
        assert!(fs.is_dir("a/"));
        assert!(fs.is_dir("a/b/"));
        assert!(fs.is_dir("a/b/c/"));
        assert!(matches!(
            fs.create_dir("a/b/c/"),
            Err(VfsError::AlreadyExists(_))
        ));
    }

    #[test]
    fn remove_refused_while_stream_open() {
        let fs = backend();
        let mut w = fs.open("held.bin", OpenMode::Write).unwrap();
        w.write(b"x").unwrap();

        assert!(matches!(
            fs.remove_file("held.bin"),
            Err(VfsError::InUse(_))
        ));
        // The file is still there and still readable.
        assert!(fs.is_file("held.bin"));

        drop(w);
        fs.remove_file("held.bin").unwrap();
        assert!(!fs.is_file("held.bin"));
        assert!(matches!(
            fs.remove_file("held.bin"),
            Err(VfsError::NotFound(_))
        ));
    }

    #[test]
    fn shared_buffer_between_streams() {
        let fs = backend();
        let mut w = fs.open("shared.txt", OpenMode::Write).unwrap();
        let mut r = fs.open("shared.txt", OpenMode::Read).unwrap();

        w.write(b"first").unwrap();
        let mut out = [0u8; 16];
        let n = r.read(&mut out).unwrap();
        assert_eq!(&out[..n], b"first");

        // The writer keeps the buffer alive even after removal is
        // attempted elsewhere; both handles stay coherent.
        w.write(b" second").unwrap();
        let n = r.read(&mut out).unwrap();
        assert_eq!(&out[..n], b" second");
    }

    #[test]
    fn append_starts_at_end() {
        let fs = backend();
        let mut w = fs.open("log.txt", OpenMode::Write).unwrap();
        w.write(b"line one\n").unwrap();
        drop(w);

        let mut a = fs.open("log.txt", OpenMode::Append).unwrap();
        assert_eq!(a.tell(), 9);
        a.write(b"line two\n").unwrap();
        drop(a);

        let mut r = fs.open("log.txt", OpenMode::Read).unwrap();
        let mut out = vec![0u8; 64];
        let n = r.read(&mut out).unwrap();
        assert_eq!(&out[..n], b"line one\nline two\n");
    }

    #[test]
    fn sparse_write_zero_fills_gap() {
        let fs = backend();
        let mut w = fs.open("gap.bin", OpenMode::Write).unwrap();
        w.seek(SeekFrom::Start(4)).unwrap();
        w.write(b"zz").unwrap();
        drop(w);

        let mut r = fs.open("gap.bin", OpenMode::Read).unwrap();
        let mut out = [0u8; 8];
        let n = r.read(&mut out).unwrap();
        assert_eq!(&out[..n], &[0, 0, 0, 0, b'z', b'z']);
    }

    #[test]
    fn read_mode_stream_refuses_writes() {
        let fs = backend();
        fs.open("ro.txt", OpenMode::Write).unwrap().close();
        let mut r = fs.open("ro.txt", OpenMode::Read).unwrap();
        assert!(matches!(
            r.write(b"nope"),
            Err(VfsError::Unsupported(_))
        ));
    }

    #[test]
    fn closed_stream_fails() {
        let fs = backend();
        let mut s = fs.open("c.txt", OpenMode::Write).unwrap();
        s.write(b"x").unwrap();
        s.close();
        assert!(!s.is_open());
        assert!(matches!(s.read(&mut [0u8; 4]), Err(VfsError::Closed)));
        assert!(matches!(s.write(b"y"), Err(VfsError::Closed)));
    }

    #[test]
    fn enumerate_lists_immediate_children() {
        let fs = backend();
        fs.create_dir("sub/deeper/").unwrap();
        fs.open("top.txt", OpenMode::Write).unwrap().close();
        fs.open("sub/inner.txt", OpenMode::Write).unwrap().close();

        let mut seen = Vec::new();
        fs.enumerate("", &mut |info| {
            seen.push((info.path.clone(), info.is_dir()));
            false
        });
        seen.sort();
        assert_eq!(
            seen,
            vec![
                ("/mem/sub".to_string(), true),
                ("/mem/top.txt".to_string(), false),
            ]
        );

        let mut nested = Vec::new();
        fs.enumerate("sub/", &mut |info| {
            nested.push(info.path.clone());
            false
        });
        nested.sort();
        assert_eq!(nested, vec!["/mem/sub/deeper", "/mem/sub/inner.txt"]);
    }

    #[test]
    fn concurrent_writers_and_reader() {
        let fs = std::sync::Arc::new(backend());
        fs.open("hot.bin", OpenMode::Write).unwrap().close();

        let mut handles = Vec::new();
        for t in 0..4u8 {
            let fs = std::sync::Arc::clone(&fs);
            handles.push(std::thread::spawn(move || {
                let mut w = fs.open("hot.bin", OpenMode::Write).unwrap();
                w.seek(SeekFrom::Start(t as u64 * 1024)).unwrap();
                w.write(&vec![t + 1; 1024]).unwrap();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut r = fs.open("hot.bin", OpenMode::Read).unwrap();
        assert_eq!(r.size(), 4 * 1024);
        let mut out = vec![0u8; 4 * 1024];
        assert_eq!(r.read(&mut out).unwrap(), 4 * 1024);
        for t in 0..4usize {
            assert!(out[t * 1024..(t + 1) * 1024].iter().all(|&b| b == t as u8 + 1));
        }
    }
}
