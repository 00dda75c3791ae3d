//! On-disk pack format: header layout, index records, XOR obfuscation.
//!
//! All multi-byte fields are big-endian. The layout is the one bit-exact
//! wire contract of this crate:
//!
//! ```text
//! Header (28 bytes):
//!   signature   [4]   "PACK"
//!   version     u32   only 0 is supported
//!   index_key   u32   XOR key for index entry names
//!   data_key    u32   XOR key for entry payloads, 0 = plaintext
//!   index_off   u64   byte offset of the index region
//!   crc32       u32   stored checksum, parsed but not verified
//! Index region (index_off .. EOF), repeated records:
//!   data_off    u64
//!   data_len    u32
//!   name_len    u8
//!   kind        u8    compression kind
//!   name        [name_len]   XOR-obfuscated with index_key
//! ```

use crate::error::{PackError, PackResult};

/// Magic bytes at the start of every archive.
pub const SIGNATURE: [u8; 4] = *b"PACK";

/// Fixed header size in bytes.
pub const HEADER_LEN: usize = 28;

/// The only format version this reader understands.
pub const VERSION: u32 = 0;

/// Per-entry payload encoding, as stored in the index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Raw bytes (still XOR-obfuscated when the data key is nonzero).
    None,
    /// Gzip member, inflated fully into memory on open.
    Gzip,
    /// A kind byte this reader does not recognize. Kept so the rest of
    /// the index stays usable; opening such an entry fails.
    Unknown(u8),
}

impl Compression {
    /// Decode the raw kind byte from an index record.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Compression::None,
            1 => Compression::Gzip,
            other => Compression::Unknown(other),
        }
    }
}

/// Parsed archive header.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub version: u32,
    pub index_key: u32,
    pub data_key: u32,
    pub index_offset: u64,
    /// Stored checksum. Parsed for format compatibility; never checked
    /// against content, so it does not detect corruption here.
    pub crc32: u32,
}

impl Header {
    /// Parse and validate the fixed-size header.
    pub fn parse(buf: &[u8]) -> PackResult<Self> {
        if buf.len() < HEADER_LEN || buf[..4] != SIGNATURE {
            return Err(PackError::BadSignature);
        }
        let mut r = Reader::new(&buf[4..HEADER_LEN]);
        let version = r.read_u32().ok_or(PackError::BadSignature)?;
        let index_key = r.read_u32().ok_or(PackError::BadSignature)?;
        let data_key = r.read_u32().ok_or(PackError::BadSignature)?;
        let index_offset = r.read_u64().ok_or(PackError::BadSignature)?;
        let crc32 = r.read_u32().ok_or(PackError::BadSignature)?;

        if version != VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        Ok(Self {
            version,
            index_key,
            data_key,
            index_offset,
            crc32,
        })
    }
}

/// XOR `buf` with the repeating little-endian bytes of `key`.
///
/// Applying the same key twice restores the original bytes. A zero key
/// leaves the buffer untouched.
pub fn xor_in_place(key: u32, buf: &mut [u8]) {
    if key == 0 {
        return;
    }
    let k = key.to_le_bytes();
    for (i, b) in buf.iter_mut().enumerate() {
        *b ^= k[i % 4];
    }
}

/// Bounds-checked big-endian cursor over an in-memory region.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub(crate) fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.buf.len() {
            return None;
        }
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Some(out)
    }

    pub(crate) fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub(crate) fn read_u32(&mut self) -> Option<u32> {
        let b = self.take(4)?;
        Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_u64(&mut self) -> Option<u64> {
        let b = self.take(8)?;
        Some(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }
}
