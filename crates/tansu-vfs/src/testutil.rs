//! Test fixtures: a minimal pack archive builder.
//!
//! Mirrors the wire format in `tansu_pack::format` so backend and router
//! tests can mount real archives without an authoring tool.

use std::io::Write;
use std::path::PathBuf;

use libflate::gzip;
use tansu_pack::{format, xor_in_place};

pub struct PackFile {
    pub name: &'static str,
    pub data: Vec<u8>,
    pub gzip: bool,
}

impl PackFile {
    pub fn plain(name: &'static str, data: Vec<u8>) -> Self {
        Self {
            name,
            data,
            gzip: false,
        }
    }

    pub fn gzip(name: &'static str, data: Vec<u8>) -> Self {
        Self {
            name,
            data,
            gzip: true,
        }
    }
}

/// Serialize an archive and write it into a fresh temp directory.
pub fn write_pack(
    index_key: u32,
    data_key: u32,
    files: &[PackFile],
) -> (tempfile::TempDir, PathBuf) {
    let mut payloads = Vec::new();
    let mut records = Vec::new();
    for file in files {
        let mut stored = if file.gzip {
            let mut enc = gzip::Encoder::new(Vec::new()).unwrap();
            enc.write_all(&file.data).unwrap();
            enc.finish().into_result().unwrap()
        } else {
            file.data.clone()
        };
        xor_in_place(data_key, &mut stored);
        let offset = format::HEADER_LEN as u64 + payloads.len() as u64;
        records.push((file.name, offset, stored.len() as u32, file.gzip));
        payloads.extend_from_slice(&stored);
    }

    let index_offset = format::HEADER_LEN as u64 + payloads.len() as u64;
    let mut out = Vec::new();
    out.extend_from_slice(&format::SIGNATURE);
    out.extend_from_slice(&format::VERSION.to_be_bytes());
    out.extend_from_slice(&index_key.to_be_bytes());
    out.extend_from_slice(&data_key.to_be_bytes());
    out.extend_from_slice(&index_offset.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&payloads);

    for (name, offset, length, gzip) in &records {
        out.extend_from_slice(&offset.to_be_bytes());
        out.extend_from_slice(&length.to_be_bytes());
        out.push(name.len() as u8);
        out.push(if *gzip { 1 } else { 0 });
        let mut name = name.as_bytes().to_vec();
        xor_in_place(index_key, &mut name);
        out.extend_from_slice(&name);
    }

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("fixture.pack");
    std::fs::write(&path, &out).unwrap();
    (dir, path)
}
