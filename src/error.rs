//! Error taxonomy shared by the packer, unpacker and inspector.
//!
//! Archive-level failures surface as [`OrgPackError`] and abort the whole
//! operation.  Per-entry failures are caught inside the operation loops,
//! logged, and recorded in the returned summary instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;

/// A source or target path is unusable.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("source directory contains no regular files: {}", .0.display())]
    EmptySource(PathBuf),
    #[error("archive is empty: {}", .0.display())]
    EmptyArchive(PathBuf),
    #[error("file name is not valid UTF-8: {}", .0.display())]
    NonUtf8(PathBuf),
    #[error("path is outside the source directory: {}", .0.display())]
    Outside(PathBuf),
    #[error("invalid entry name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("duplicate entry name '{0}'")]
    DuplicateName(String),
}

/// The container bytes do not describe a valid archive.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Invalid magic number")]
    InvalidMagic,
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("truncated {what}: need {needed} bytes, have {available}")]
    Truncated { what: &'static str, needed: u64, available: u64 },
    #[error("index at {index_offset} with {file_count} entries does not fit in {len} bytes")]
    IndexOutOfBounds { index_offset: u64, file_count: u32, len: u64 },
    #[error("payload of '{name}' ({offset}+{size}) overlaps the header or index")]
    EntryOutOfBounds { name: String, offset: u64, size: u64 },
    #[error("invalid entry name: {0}")]
    InvalidName(&'static str),
    #[error("duplicate entry name '{0}'")]
    DuplicateName(String),
    #[error("unknown file type byte {0}")]
    UnknownFileType(u8),
    #[error("unknown compression byte {0}")]
    UnknownCodec(u8),
    #[error("too many entries for one archive: {0}")]
    TooManyEntries(usize),
}

#[derive(Error, Debug)]
pub enum OrgPackError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Compression(#[from] CodecError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, OrgPackError>;
