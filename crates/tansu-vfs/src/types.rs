//! Core VFS types.

use bitflags::bitflags;

bitflags! {
    /// Kind and capability bits attached to a directory-listing record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileFlags: u8 {
        /// Regular file.
        const FILE = 0x01;
        /// Directory.
        const DIR = 0x02;
        /// Entry can be written through its backend.
        const WRITE = 0x04;
        /// Entry can be read.
        const READ = 0x08;
    }
}

/// One record produced by directory enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Full virtual path of the entry, without a trailing slash.
    pub path: String,
    pub flags: FileFlags,
}

impl FileInfo {
    pub fn is_file(&self) -> bool {
        self.flags.contains(FileFlags::FILE)
    }

    pub fn is_dir(&self) -> bool {
        self.flags.contains(FileFlags::DIR)
    }

    pub fn writable(&self) -> bool {
        self.flags.contains(FileFlags::WRITE)
    }
}

/// Stream open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    /// Like Write, with the cursor starting at the end of existing data.
    Append,
}

impl OpenMode {
    /// True for modes that mutate the entry.
    pub fn writes(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

/// Which storage engine a backend wraps. A closed set: overlay routing
/// only ever dispatches over these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Native,
    Memory,
    Pack,
}
