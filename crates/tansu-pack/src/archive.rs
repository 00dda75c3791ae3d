//! Pack archive reader: header validation, index parsing, entry decode.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use libflate::gzip;
use tracing::debug;

use crate::error::{PackError, PackResult};
use crate::format::{self, Compression, HEADER_LEN, Header, Reader};

/// One file inside a pack archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackEntry {
    /// Byte offset of the stored payload inside the archive file.
    pub offset: u64,
    /// Stored payload length. The u32 width is a format property: entries
    /// cap at 4 GiB.
    pub length: u32,
    /// How the payload is encoded.
    pub compression: Compression,
}

/// A parsed pack archive: the decode keys plus an immutable name → entry
/// index built once when the archive is opened.
///
/// The archive file itself is reopened per entry read; the index never
/// changes after construction.
pub struct PackArchive {
    location: PathBuf,
    header: Header,
    entries: HashMap<String, PackEntry>,
}

impl PackArchive {
    /// Open and parse the archive at `location`.
    ///
    /// A bad signature, undersized file, unsupported version, or
    /// truncated index record fails the whole archive. An archive whose
    /// index region is empty is valid and holds no entries.
    pub fn open(location: impl Into<PathBuf>) -> PackResult<Self> {
        let location = location.into();
        let mut file = File::open(&location)?;
        let file_len = file.metadata()?.len();
        if file_len < HEADER_LEN as u64 {
            return Err(PackError::BadSignature);
        }

        let mut head = [0u8; HEADER_LEN];
        file.read_exact(&mut head)?;
        let header = Header::parse(&head)?;

        if header.index_offset < HEADER_LEN as u64 || header.index_offset > file_len {
            return Err(PackError::TruncatedIndex(header.index_offset));
        }

        let mut entries = HashMap::new();
        if header.index_offset < file_len {
            let mut index = vec![0u8; (file_len - header.index_offset) as usize];
            file.seek(SeekFrom::Start(header.index_offset))?;
            file.read_exact(&mut index)?;
            parse_index(&index, &header, &mut entries)?;
        }

        debug!(
            archive = %location.display(),
            entries = entries.len(),
            "parsed pack index"
        );

        Ok(Self {
            location,
            header,
            entries,
        })
    }

    /// Look up one entry by its de-obfuscated name.
    pub fn entry(&self, name: &str) -> Option<&PackEntry> {
        self.entries.get(name)
    }

    /// Iterate all (name, entry) pairs, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &PackEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// XOR key applied to entry payloads; zero means plaintext.
    pub fn data_key(&self) -> u32 {
        self.header.data_key
    }

    /// Format version from the header.
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Stored checksum from the header. Not verified against content.
    pub fn crc32(&self) -> u32 {
        self.header.crc32
    }

    /// Path of the archive file.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Read and fully decode one entry's payload.
    ///
    /// The stored bytes are XOR-decoded with the data key, then inflated
    /// when the entry is Gzip-compressed. A failure here is scoped to the
    /// entry; the archive stays usable.
    pub fn read_entry(&self, entry: &PackEntry) -> PackResult<Vec<u8>> {
        if entry.length == 0 {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.location)?;
        file.seek(SeekFrom::Start(entry.offset))?;
        let mut data = vec![0u8; entry.length as usize];
        file.read_exact(&mut data).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                PackError::TruncatedData(entry.offset)
            } else {
                PackError::Io(e)
            }
        })?;

        format::xor_in_place(self.header.data_key, &mut data);

        match entry.compression {
            Compression::None => Ok(data),
            Compression::Gzip => {
                let mut decoder = gzip::Decoder::new(&data[..]).map_err(PackError::Decompress)?;
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(PackError::Decompress)?;
                Ok(out)
            }
            Compression::Unknown(raw) => Err(PackError::UnknownCompression(raw)),
        }
    }
}

impl std::fmt::Debug for PackArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackArchive")
            .field("location", &self.location)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Parse the raw index region into the entry map.
///
/// Duplicate names keep the first record, matching the writer's layout
/// where the earliest record wins.
fn parse_index(
    buf: &[u8],
    header: &Header,
    entries: &mut HashMap<String, PackEntry>,
) -> PackResult<()> {
    let mut r = Reader::new(buf);
    while !r.is_empty() {
        let at = header.index_offset + r.pos() as u64;
        let truncated = || PackError::TruncatedIndex(at);

        let offset = r.read_u64().ok_or_else(truncated)?;
        let length = r.read_u32().ok_or_else(truncated)?;
        let name_len = r.read_u8().ok_or_else(truncated)? as usize;
        let kind = r.read_u8().ok_or_else(truncated)?;
        let mut name = r.take(name_len).ok_or_else(truncated)?.to_vec();
        format::xor_in_place(header.index_key, &mut name);

        entries
            .entry(String::from_utf8_lossy(&name).into_owned())
            .or_insert(PackEntry {
                offset,
                length,
                compression: Compression::from_raw(kind),
            });
    }
    Ok(())
}
