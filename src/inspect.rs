//! Read-only structural inspection ("peek").
//!
//! Only the header and the index are read.  Payload bytes are never touched
//! and the archive is opened read-only.

use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::archive::open_archive;
use crate::codec::CodecId;
use crate::error::Result;
use crate::header::MAGIC;
use crate::index::{Entry, FileType};

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub path:         PathBuf,
    pub magic:        String,
    pub version:      u8,
    pub file_count:   u32,
    pub index_offset: u64,
    pub flags:        u8,
    pub entries:      Vec<EntryReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub name:              String,
    pub file_type:         FileType,
    pub compression:       CodecId,
    pub offset:            u64,
    /// Present only when the entry is compressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_size:   Option<u64>,
    pub uncompressed_size: u64,
}

impl From<&Entry> for EntryReport {
    fn from(e: &Entry) -> Self {
        EntryReport {
            name:              e.name().to_owned(),
            file_type:         e.file_type,
            compression:       e.codec,
            offset:            e.offset,
            compressed_size:   (e.codec != CodecId::None).then_some(e.compressed_size),
            uncompressed_size: e.uncompressed_size,
        }
    }
}

pub fn peek(archive: &Path) -> Result<ArchiveReport> {
    let reader = open_archive(archive)?;
    let h = reader.header();
    let magic = String::from_utf8_lossy(&MAGIC).trim_end_matches('\0').to_owned();
    Ok(ArchiveReport {
        path:         archive.to_path_buf(),
        magic,
        version:      h.version,
        file_count:   h.file_count,
        index_offset: h.index_offset,
        flags:        h.flags,
        entries:      reader.entries().iter().map(EntryReport::from).collect(),
    })
}

impl ArchiveReport {
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = writeln!(out, "Packed File Structure: {}", self.path.display());
        let _ = writeln!(out, "+-- Header");
        let _ = writeln!(out, "|   +-- Magic: {}", self.magic);
        let _ = writeln!(out, "|   +-- Version: {}", self.version);
        let _ = writeln!(out, "|   +-- File Count: {}", self.file_count);
        let _ = writeln!(out, "|   +-- Index Offset: {}", self.index_offset);
        let _ = writeln!(out, "+-- Files");
        for e in &self.entries {
            let _ = writeln!(out, "|   +-- {}", e.name);
            let _ = writeln!(out, "|   |   +-- Type: {}", e.file_type);
            let _ = writeln!(out, "|   |   +-- Compression: {}", e.compression);
            let _ = writeln!(out, "|   |   +-- Offset: {}", e.offset);
            if let Some(c) = e.compressed_size {
                let _ = writeln!(out, "|   |   +-- Compressed Size: {}", format_size(c));
            }
            let _ = writeln!(out, "|   |   +-- Uncompressed Size: {}", format_size(e.uncompressed_size));
        }
        out
    }
}

/// `N bytes` below 1 KiB, otherwise `X.XX KiB|MiB|GiB (N bytes)`.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    let (unit, div) = match bytes {
        b if b >= GB => ("GiB", GB),
        b if b >= MB => ("MiB", MB),
        b if b >= KB => ("KiB", KB),
        _ => return format!("{bytes} bytes"),
    };
    format!("{:.2} {unit} ({bytes} bytes)", bytes as f64 / div as f64)
}
