//! Codec registry: a closed set of compression identifiers.
//!
//! # Identity rules
//! Every entry in the index carries one codec byte.  The byte values are part
//! of the wire contract and are never reused:
//!
//! | byte | codec |
//! |------|-------|
//! | 0    | LZ4 (declared; backed only with the `lz4` feature) |
//! | 1    | Zstandard |
//! | 2    | none (payload stored verbatim) |
//!
//! A codec that is declared but not backed by this build fails with
//! [`CodecError::Unsupported`].  It is never silently treated as "none".

use serde::Serialize;
use std::fmt;
use std::io::Read;
use thiserror::Error;

/// Zstd level used when [`compress`] is called without an explicit level.
pub const DEFAULT_ZSTD_LEVEL: i32 = 19;

// ── CodecId enum ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CodecId {
    Lz4  = 0,
    Zstd = 1,
    None = 2,
}

impl CodecId {
    pub const ALL: [CodecId; 3] = [CodecId::Lz4, CodecId::Zstd, CodecId::None];

    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Resolve a wire byte.  Returns `None` for bytes outside the closed set.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(CodecId::Lz4),
            1 => Some(CodecId::Zstd),
            2 => Some(CodecId::None),
            _ => None,
        }
    }

    /// CLI spelling.
    pub fn name(self) -> &'static str {
        match self {
            CodecId::Lz4  => "lz4",
            CodecId::Zstd => "zstd",
            CodecId::None => "none",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lz4"  => Some(CodecId::Lz4),
            "zstd" => Some(CodecId::Zstd),
            "none" => Some(CodecId::None),
            _      => None,
        }
    }

    /// Whether this build can actually compress and decompress with the codec.
    pub fn is_available(self) -> bool {
        match self {
            CodecId::None | CodecId::Zstd => true,
            CodecId::Lz4 => cfg!(feature = "lz4"),
        }
    }

    pub fn ensure_available(self) -> Result<(), CodecError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(CodecError::Unsupported { codec: self.name() })
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CodecId::Lz4  => "LZ4",
            CodecId::Zstd => "ZSTD",
            CodecId::None => "None",
        })
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("unsupported codec '{codec}': not available in this build")]
    Unsupported { codec: &'static str },
    #[error("decompressed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn codec_id(&self) -> CodecId;
    fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>, CodecError>;
    /// Produce at most `expected_size + 1` bytes; the caller checks the length.
    fn decompress(&self, data: &[u8], expected_size: u64) -> Result<Vec<u8>, CodecError>;
}

// ── Built-in codec implementations ──────────────────────────────────────────

pub struct NoneCodec;
impl Codec for NoneCodec {
    fn codec_id(&self) -> CodecId { CodecId::None }
    fn compress(&self, data: &[u8], _: i32) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
    fn decompress(&self, data: &[u8], _: u64) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
}

pub struct ZstdCodec;
impl Codec for ZstdCodec {
    fn codec_id(&self) -> CodecId { CodecId::Zstd }
    fn compress(&self, data: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
        zstd::encode_all(data, level).map_err(|e| CodecError::Compression(e.to_string()))
    }
    fn decompress(&self, data: &[u8], expected_size: u64) -> Result<Vec<u8>, CodecError> {
        let decoder = zstd::stream::read::Decoder::new(data)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        let mut out = Vec::new();
        decoder
            .take(expected_size.saturating_add(1))
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(out)
    }
}

#[cfg(feature = "lz4")]
pub struct Lz4Codec;
#[cfg(feature = "lz4")]
impl Codec for Lz4Codec {
    fn codec_id(&self) -> CodecId { CodecId::Lz4 }
    fn compress(&self, data: &[u8], _: i32) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::block::compress(data))
    }
    fn decompress(&self, data: &[u8], expected_size: u64) -> Result<Vec<u8>, CodecError> {
        // the output buffer is sized up front, so cap it at what the block can yield
        let ceiling = lz4_max_decoded_len(data.len());
        if expected_size > ceiling {
            return Err(CodecError::SizeMismatch { expected: expected_size, actual: ceiling });
        }
        let size = usize::try_from(expected_size)
            .map_err(|_| CodecError::Decompression("declared size exceeds address space".into()))?;
        lz4_flex::block::decompress(data, size)
            .map_err(|e| CodecError::Decompression(e.to_string()))
    }
}

/// Largest output an LZ4 block of `compressed_len` bytes can decode to.  Each
/// input byte yields at most 255 literal or match bytes, plus a short tail.
#[cfg(feature = "lz4")]
fn lz4_max_decoded_len(compressed_len: usize) -> u64 {
    (compressed_len as u64).saturating_mul(255).saturating_add(16)
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Resolve a CodecId to a built-in codec.
///
/// Returns `Err(CodecError::Unsupported)` for declared codecs this build does
/// not back.  The caller MUST NOT fall back to any other codec.
pub fn get_codec(id: CodecId) -> Result<Box<dyn Codec>, CodecError> {
    match id {
        CodecId::None => Ok(Box::new(NoneCodec)),
        CodecId::Zstd => Ok(Box::new(ZstdCodec)),
        #[cfg(feature = "lz4")]
        CodecId::Lz4  => Ok(Box::new(Lz4Codec)),
        #[cfg(not(feature = "lz4"))]
        CodecId::Lz4  => Err(CodecError::Unsupported { codec: id.name() }),
    }
}

pub fn compress(codec: CodecId, data: &[u8]) -> Result<Vec<u8>, CodecError> {
    compress_with_level(codec, data, DEFAULT_ZSTD_LEVEL)
}

pub fn compress_with_level(codec: CodecId, data: &[u8], level: i32) -> Result<Vec<u8>, CodecError> {
    get_codec(codec)?.compress(data, level)
}

/// Decompress to exactly `expected_size` bytes.  A short or long result is a
/// [`CodecError::SizeMismatch`], never a silent truncation.
pub fn decompress(codec: CodecId, data: &[u8], expected_size: u64) -> Result<Vec<u8>, CodecError> {
    let out = get_codec(codec)?.decompress(data, expected_size)?;
    if out.len() as u64 != expected_size {
        return Err(CodecError::SizeMismatch { expected: expected_size, actual: out.len() as u64 });
    }
    Ok(out)
}
