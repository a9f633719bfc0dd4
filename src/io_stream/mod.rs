//! Streaming archive engine: writer and reader.
//!
//! # Writer
//! [`OrgPackWriter`] reserves the header at offset 0, appends each file's
//! (optionally compressed) payload at the current cursor, then on
//! [`finalize`](OrgPackWriter::finalize) writes the index and patches the
//! header in place.
//!
//! # Reader
//! [`OrgPackReader`] validates the header and the full index up front: magic,
//! version, index bounds against the real stream length, and every entry's
//! payload range.  Payload bytes are only touched by
//! [`read_payload`](OrgPackReader::read_payload) /
//! [`unpack_entry`](OrgPackReader::unpack_entry).

use std::collections::HashSet;
use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::codec::{self, CodecId};
use crate::error::{FormatError, OrgPackError, PathError, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::index::{check_name, Entry, ENTRY_SIZE};

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct OrgPackWriter<W: Write + Seek> {
    writer:  W,
    header:  Header,
    entries: Vec<Entry>,
    names:   HashSet<String>,
    level:   i32,
}

impl<W: Write + Seek> OrgPackWriter<W> {
    pub fn new(writer: W) -> io::Result<Self> {
        Self::with_level(writer, codec::DEFAULT_ZSTD_LEVEL)
    }

    pub fn with_level(mut writer: W, level: i32) -> io::Result<Self> {
        let header = Header::default();
        writer.seek(SeekFrom::Start(0))?;
        header.write(&mut writer)?; // placeholder; patched on finalize
        Ok(Self {
            writer,
            header,
            entries: Vec::new(),
            names:   HashSet::new(),
            level,
        })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Compress and append one file.  Nothing is written when the name is
    /// rejected or compression fails, so the caller may skip and carry on.
    pub fn add_file(&mut self, name: &str, data: &[u8], codec: CodecId) -> Result<&Entry> {
        if self.names.contains(name) {
            return Err(PathError::DuplicateName(name.to_owned()).into());
        }
        if self.entries.len() >= u32::MAX as usize {
            return Err(FormatError::TooManyEntries(self.entries.len() + 1).into());
        }
        let invalid = |reason| PathError::InvalidName { name: name.to_owned(), reason };
        check_name(name).map_err(invalid)?;

        let payload = codec::compress_with_level(codec, data, self.level)?;
        let offset = self.writer.stream_position()?;
        let entry = Entry::new(name, offset, data.len() as u64, payload.len() as u64, codec)
            .map_err(invalid)?;

        self.writer.write_all(&payload)?;
        debug!(name, offset, raw = data.len(), stored = payload.len(), "payload written");

        self.names.insert(name.to_owned());
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Write the index, patch the header at offset 0 and flush.  Consumes the
    /// writer: an archive is write-once.
    pub fn finalize(mut self) -> Result<W> {
        let index_offset = self.writer.stream_position()?;
        for entry in &self.entries {
            self.writer.write_all(&entry.encode())?;
        }

        self.header.file_count = u32::try_from(self.entries.len())
            .map_err(|_| FormatError::TooManyEntries(self.entries.len()))?;
        self.header.index_offset = index_offset;

        self.writer.seek(SeekFrom::Start(0))?;
        self.header.write(&mut self.writer)?;
        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;
        debug!(file_count = self.header.file_count, index_offset, "header patched");
        Ok(self.writer)
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct OrgPackReader<R: Read + Seek> {
    reader:  R,
    header:  Header,
    entries: Vec<Entry>,
    len:     u64,
}

impl<R: Read + Seek> OrgPackReader<R> {
    /// Open and validate an archive.  Any structural problem is a
    /// [`FormatError`]; no partial opening.
    pub fn new(mut reader: R) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let mut head = Vec::with_capacity(HEADER_SIZE);
        (&mut reader).take(HEADER_SIZE as u64).read_to_end(&mut head)?;
        let header = Header::decode(&head)?;

        let index_len = u64::from(header.file_count) * ENTRY_SIZE as u64;
        let index_end = header.index_offset.checked_add(index_len);
        if header.index_offset < HEADER_SIZE as u64 || index_end.map_or(true, |end| end > len) {
            return Err(FormatError::IndexOutOfBounds {
                index_offset: header.index_offset,
                file_count:   header.file_count,
                len,
            }
            .into());
        }

        reader.seek(SeekFrom::Start(header.index_offset))?;
        let mut raw = vec![0u8; index_len as usize];
        reader.read_exact(&mut raw)?;

        let mut entries = Vec::with_capacity(header.file_count as usize);
        let mut names = HashSet::with_capacity(header.file_count as usize);
        for chunk in raw.chunks_exact(ENTRY_SIZE) {
            let entry = Entry::decode(chunk)?;
            let in_bounds = entry.offset >= HEADER_SIZE as u64
                && entry.payload_end().map_or(false, |end| end <= header.index_offset);
            if !in_bounds {
                return Err(FormatError::EntryOutOfBounds {
                    name:   entry.name().to_owned(),
                    offset: entry.offset,
                    size:   entry.compressed_size,
                }
                .into());
            }
            if !names.insert(entry.name().to_owned()) {
                return Err(FormatError::DuplicateName(entry.name().to_owned()).into());
            }
            entries.push(entry);
        }
        debug!(file_count = header.file_count, index_offset = header.index_offset, len, "index loaded");

        Ok(Self { reader, header, entries, len })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Total archive length in bytes.
    pub fn archive_len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw stored bytes of one entry, still compressed.
    pub fn read_payload(&mut self, entry: &Entry) -> io::Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let mut buf = vec![0u8; entry.compressed_size as usize];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Decoded bytes of one entry, exactly `uncompressed_size` long.
    pub fn unpack_entry(&mut self, entry: &Entry) -> Result<Vec<u8>> {
        let payload = self.read_payload(entry)?;
        codec::decompress(entry.codec, &payload, entry.uncompressed_size).map_err(OrgPackError::from)
    }

    /// Decoded bytes of the entry named `name`.
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name() == name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("File not found: {name}")))?;
        self.unpack_entry(&entry)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn build(files: &[(&str, &[u8], CodecId)]) -> Vec<u8> {
        let mut w = OrgPackWriter::new(Cursor::new(Vec::new())).unwrap();
        for (name, data, codec) in files {
            w.add_file(name, data, *codec).unwrap();
        }
        w.finalize().unwrap().into_inner()
    }

    #[test]
    fn offsets_are_contiguous_after_header() {
        let bytes = build(&[("a.png", &[1u8; 10], CodecId::None), ("sub/b.txt", &[2u8; 20], CodecId::None)]);
        let r = OrgPackReader::new(Cursor::new(bytes.clone())).unwrap();
        assert_eq!(r.header().file_count, 2);
        assert_eq!(r.entries()[0].offset, HEADER_SIZE as u64);
        assert_eq!(r.entries()[1].offset, HEADER_SIZE as u64 + 10);
        assert_eq!(r.header().index_offset, HEADER_SIZE as u64 + 30);
        assert_eq!(bytes.len(), HEADER_SIZE + 30 + 2 * ENTRY_SIZE);
    }

    #[test]
    fn empty_archive_is_valid() {
        let bytes = build(&[]);
        let r = OrgPackReader::new(Cursor::new(bytes)).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.header().index_offset, HEADER_SIZE as u64);
    }

    #[test]
    fn placeholder_header_is_rejected() {
        let mut w = OrgPackWriter::new(Cursor::new(Vec::new())).unwrap();
        w.add_file("a.txt", b"unfinished", CodecId::None).unwrap();
        // simulate a crash before finalize: take the bytes as they are
        let bytes = {
            let OrgPackWriter { writer, .. } = w;
            writer.into_inner()
        };
        let err = OrgPackReader::new(Cursor::new(bytes)).err().unwrap();
        assert!(matches!(err, OrgPackError::Format(FormatError::IndexOutOfBounds { index_offset: 0, .. })));
    }

    #[test]
    fn duplicate_name_rejected_without_writing() {
        let mut w = OrgPackWriter::new(Cursor::new(Vec::new())).unwrap();
        w.add_file("a.txt", b"one", CodecId::None).unwrap();
        let err = w.add_file("a.txt", b"two", CodecId::None).unwrap_err();
        assert!(matches!(err, OrgPackError::Path(PathError::DuplicateName(_))));
        assert_eq!(w.entries().len(), 1);
        let bytes = w.finalize().unwrap().into_inner();
        assert_eq!(bytes.len(), HEADER_SIZE + 3 + ENTRY_SIZE);
    }

    #[test]
    fn long_name_rejected() {
        let mut w = OrgPackWriter::new(Cursor::new(Vec::new())).unwrap();
        let name = "x".repeat(200);
        let err = w.add_file(&name, b"data", CodecId::None).unwrap_err();
        assert!(matches!(err, OrgPackError::Path(PathError::InvalidName { .. })));
    }

    #[test]
    fn truncated_index_rejected() {
        let mut bytes = build(&[("a.txt", b"abc", CodecId::None)]);
        bytes.truncate(bytes.len() - 1);
        let err = OrgPackReader::new(Cursor::new(bytes)).err().unwrap();
        assert!(matches!(err, OrgPackError::Format(FormatError::IndexOutOfBounds { .. })));
    }

    #[test]
    fn payload_overlapping_index_rejected() {
        let mut bytes = build(&[("a.txt", b"abc", CodecId::None)]);
        let index_offset = HEADER_SIZE + 3;
        // compressed_size field of the only entry
        bytes[index_offset + 16..index_offset + 24].copy_from_slice(&100u64.to_le_bytes());
        let err = OrgPackReader::new(Cursor::new(bytes)).err().unwrap();
        assert!(matches!(err, OrgPackError::Format(FormatError::EntryOutOfBounds { .. })));
    }

    #[test]
    fn read_file_by_name() {
        let bytes = build(&[("x.json", br#"{"k":1}"#, CodecId::Zstd)]);
        let mut r = OrgPackReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(r.read_file("x.json").unwrap(), br#"{"k":1}"#);
        assert!(r.read_file("missing").is_err());
    }
}
