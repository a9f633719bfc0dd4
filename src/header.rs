//! Fixed 32-byte archive header.
//!
//! ```text
//! 0   magic        [u8; 8]  "ORGPACK\0"
//! 8   version      u8
//! 9   (pad)        [u8; 3]
//! 12  file_count   u32 LE
//! 16  index_offset u64 LE
//! 24  flags        u8       reserved
//! 25  (pad)        [u8; 7]
//! ```
//!
//! The header is written twice per archive: a placeholder at offset 0 before
//! any payload, then the final values once the index has been written.

use byteorder::{ByteOrder, LittleEndian};
use std::io::{self, Read, Write};

use crate::error::FormatError;

pub const MAGIC: [u8; 8] = *b"ORGPACK\0";
pub const VERSION: u8 = 1;
pub const HEADER_SIZE: usize = 32;

const OFF_VERSION:      usize = 8;
const OFF_FILE_COUNT:   usize = 12;
const OFF_INDEX_OFFSET: usize = 16;
const OFF_FLAGS:        usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version:      u8,
    pub file_count:   u32,
    pub index_offset: u64,
    pub flags:        u8,
}

impl Default for Header {
    fn default() -> Self {
        Self { version: VERSION, file_count: 0, index_offset: 0, flags: 0 }
    }
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..MAGIC.len()].copy_from_slice(&MAGIC);
        buf[OFF_VERSION] = self.version;
        LittleEndian::write_u32(&mut buf[OFF_FILE_COUNT..OFF_FILE_COUNT + 4], self.file_count);
        LittleEndian::write_u64(&mut buf[OFF_INDEX_OFFSET..OFF_INDEX_OFFSET + 8], self.index_offset);
        buf[OFF_FLAGS] = self.flags;
        buf
    }

    /// Magic is checked before any other field is looked at.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
            return Err(FormatError::InvalidMagic);
        }
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                what:      "header",
                needed:    HEADER_SIZE as u64,
                available: bytes.len() as u64,
            });
        }
        let version = bytes[OFF_VERSION];
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }
        Ok(Self {
            version,
            file_count:   LittleEndian::read_u32(&bytes[OFF_FILE_COUNT..OFF_FILE_COUNT + 4]),
            index_offset: LittleEndian::read_u64(&bytes[OFF_INDEX_OFFSET..OFF_INDEX_OFFSET + 8]),
            flags:        bytes[OFF_FLAGS],
        })
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.encode())
    }
}

/// True when `bytes` starts with the archive magic.
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.len() >= MAGIC.len() && bytes[..MAGIC.len()] == MAGIC
}

/// Read just enough of `reader` to tell whether it is an archive.
/// Short inputs are reported as "not an archive", not as an error.
pub fn sniff<R: Read>(reader: R) -> io::Result<bool> {
    let mut buf = Vec::with_capacity(MAGIC.len());
    reader.take(MAGIC.len() as u64).read_to_end(&mut buf)?;
    Ok(has_magic(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_wire_contract() {
        let h = Header { version: 1, file_count: 2, index_offset: 0x0102_0304_0506_0708, flags: 0 };
        let b = h.encode();
        assert_eq!(b.len(), 32);
        assert_eq!(&b[..8], b"ORGPACK\0");
        assert_eq!(b[8], 1);
        assert_eq!(&b[9..12], &[0, 0, 0]);
        assert_eq!(&b[12..16], &[2, 0, 0, 0]);
        assert_eq!(&b[16..24], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert!(b[24..].iter().all(|&x| x == 0));
    }

    #[test]
    fn decode_reads_back_fields() {
        let h = Header { version: 1, file_count: 7, index_offset: 4096, flags: 3 };
        assert_eq!(Header::decode(&h.encode()).unwrap(), h);
    }

    #[test]
    fn bad_magic_rejected_first() {
        let mut b = Header::default().encode();
        b[0] = b'X';
        b[8] = 99; // bad version too; magic must win
        assert!(matches!(Header::decode(&b), Err(FormatError::InvalidMagic)));
    }

    #[test]
    fn other_version_rejected() {
        let mut b = Header::default().encode();
        b[8] = 2;
        assert!(matches!(Header::decode(&b), Err(FormatError::UnsupportedVersion(2))));
    }

    #[test]
    fn short_buffer_rejected() {
        let b = Header::default().encode();
        assert!(matches!(
            Header::decode(&b[..20]),
            Err(FormatError::Truncated { needed: 32, available: 20, .. })
        ));
        assert!(matches!(Header::decode(&b[..3]), Err(FormatError::InvalidMagic)));
    }

    #[test]
    fn sniff_short_input() {
        assert!(!sniff(&b"ORG"[..]).unwrap());
        assert!(sniff(&Header::default().encode()[..]).unwrap());
    }
}
