//! Byte-level stream contract implemented by every backend kind.

use std::io::SeekFrom;

use crate::error::VfsResult;

/// An open handle over one entry in one backend.
///
/// Streams never borrow the backend that opened them: they hold shared
/// storage references (memory), private OS handles (native), or a
/// decoded buffer (pack). Unmounting a backend therefore leaves its
/// already-open streams readable.
pub trait FileStream: Send {
    /// Move the cursor. Returns the new position measured from the start
    /// of the stream. Seeking before the start is an error; seeking past
    /// the end is allowed (reads come back short, writes grow the data
    /// where the backend permits it).
    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64>;

    /// Read into `buf`, returning the number of bytes read. Short reads
    /// at the end of data are normal, not errors.
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize>;

    /// Write from `buf` at the cursor, returning the number of bytes
    /// written. Read-mode streams and read-only backends refuse.
    fn write(&mut self, buf: &[u8]) -> VfsResult<usize>;

    /// Current cursor position.
    fn tell(&mut self) -> u64;

    /// Total length of the underlying data right now.
    fn size(&mut self) -> u64;

    /// True while the stream still has live backing storage.
    fn is_open(&self) -> bool;

    /// Release backing storage early. Subsequent calls fail with
    /// [`VfsError::Closed`](crate::VfsError::Closed); dropping the stream
    /// closes it implicitly.
    fn close(&mut self);
}
