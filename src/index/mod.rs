//! Fixed 128-byte index records.
//!
//! ```text
//! 0    offset             u64 LE   absolute payload position
//! 8    uncompressed_size  u64 LE
//! 16   compressed_size    u64 LE
//! 24   name               [u8; 96] UTF-8, NUL-terminated, NUL-padded
//! 120  type               u8
//! 121  compression        u8
//! 122  (pad)              [u8; 6]
//! ```
//!
//! The index is the contiguous run of `file_count` records starting at the
//! header's `index_offset`.

mod file_type;

pub use file_type::FileType;

use byteorder::{ByteOrder, LittleEndian};

use crate::codec::CodecId;
use crate::error::FormatError;

pub const ENTRY_SIZE: usize = 128;
/// Capacity of the name field, terminator included.
pub const NAME_CAPACITY: usize = 96;
pub const MAX_NAME_LEN: usize = NAME_CAPACITY - 1;

const OFF_UNCOMPRESSED: usize = 8;
const OFF_COMPRESSED:   usize = 16;
const OFF_NAME:         usize = 24;
const OFF_TYPE:         usize = OFF_NAME + NAME_CAPACITY;
const OFF_CODEC:        usize = OFF_TYPE + 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub offset:            u64,
    pub uncompressed_size: u64,
    pub compressed_size:   u64,
    name:                  String,
    pub file_type:         FileType,
    pub codec:             CodecId,
}

impl Entry {
    /// Build a record, rejecting names that could not be stored or safely
    /// extracted.  The type is classified from the name.
    pub fn new(
        name:              &str,
        offset:            u64,
        uncompressed_size: u64,
        compressed_size:   u64,
        codec:             CodecId,
    ) -> Result<Self, &'static str> {
        check_name(name)?;
        Ok(Self {
            offset,
            uncompressed_size,
            compressed_size,
            name: name.to_owned(),
            file_type: FileType::classify(name),
            codec,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First byte past this entry's payload, `None` on overflow.
    pub fn payload_end(&self) -> Option<u64> {
        self.offset.checked_add(self.compressed_size)
    }

    pub fn encode(&self) -> [u8; ENTRY_SIZE] {
        let mut buf = [0u8; ENTRY_SIZE];
        LittleEndian::write_u64(&mut buf[..8], self.offset);
        LittleEndian::write_u64(&mut buf[OFF_UNCOMPRESSED..OFF_UNCOMPRESSED + 8], self.uncompressed_size);
        LittleEndian::write_u64(&mut buf[OFF_COMPRESSED..OFF_COMPRESSED + 8], self.compressed_size);
        let name = self.name.as_bytes();
        buf[OFF_NAME..OFF_NAME + name.len()].copy_from_slice(name);
        buf[OFF_TYPE] = self.file_type.to_u8();
        buf[OFF_CODEC] = self.codec.to_u8();
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < ENTRY_SIZE {
            return Err(FormatError::Truncated {
                what:      "index entry",
                needed:    ENTRY_SIZE as u64,
                available: bytes.len() as u64,
            });
        }
        let raw_name = &bytes[OFF_NAME..OFF_TYPE];
        let nul = raw_name
            .iter()
            .position(|&b| b == 0)
            .ok_or(FormatError::InvalidName("name is not NUL-terminated"))?;
        let name = std::str::from_utf8(&raw_name[..nul])
            .map_err(|_| FormatError::InvalidName("name is not valid UTF-8"))?;
        check_name(name).map_err(FormatError::InvalidName)?;

        let file_type = FileType::from_u8(bytes[OFF_TYPE])
            .ok_or(FormatError::UnknownFileType(bytes[OFF_TYPE]))?;
        let codec = CodecId::from_u8(bytes[OFF_CODEC])
            .ok_or(FormatError::UnknownCodec(bytes[OFF_CODEC]))?;

        Ok(Self {
            offset:            LittleEndian::read_u64(&bytes[..8]),
            uncompressed_size: LittleEndian::read_u64(&bytes[OFF_UNCOMPRESSED..OFF_UNCOMPRESSED + 8]),
            compressed_size:   LittleEndian::read_u64(&bytes[OFF_COMPRESSED..OFF_COMPRESSED + 8]),
            name:              name.to_owned(),
            file_type,
            codec,
        })
    }
}

/// Name rules shared by the packer and the decoder.  Returns the reason a
/// name is rejected.
pub fn check_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    if name.len() > MAX_NAME_LEN {
        return Err("name exceeds 95 bytes");
    }
    if name.contains('\0') {
        return Err("name contains NUL");
    }
    if name.contains('\\') {
        return Err("name contains a backslash");
    }
    if name.starts_with('/') {
        return Err("name is absolute");
    }
    for comp in name.split('/') {
        match comp {
            ""        => return Err("name has an empty component"),
            "." | ".." => return Err("name has a relative component"),
            _         => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry::new("sub/b.txt", 42, 20, 11, CodecId::Zstd).unwrap()
    }

    #[test]
    fn layout_matches_wire_contract() {
        let b = sample().encode();
        assert_eq!(b.len(), 128);
        assert_eq!(&b[0..8], &42u64.to_le_bytes());
        assert_eq!(&b[8..16], &20u64.to_le_bytes());
        assert_eq!(&b[16..24], &11u64.to_le_bytes());
        assert_eq!(&b[24..33], b"sub/b.txt");
        assert!(b[33..120].iter().all(|&x| x == 0));
        assert_eq!(b[120], FileType::Script.to_u8());
        assert_eq!(b[121], CodecId::Zstd.to_u8());
        assert!(b[122..].iter().all(|&x| x == 0));
    }

    #[test]
    fn decode_reads_back_fields() {
        let e = sample();
        let d = Entry::decode(&e.encode()).unwrap();
        assert_eq!(d, e);
        assert_eq!(d.file_type, FileType::Script);
    }

    #[test]
    fn longest_name_fits() {
        let name = "n".repeat(MAX_NAME_LEN);
        let e = Entry::new(&name, 0, 0, 0, CodecId::None).unwrap();
        let b = e.encode();
        assert_eq!(b[OFF_TYPE - 2], b'n');
        assert_eq!(b[OFF_TYPE - 1], 0);
        assert_eq!(Entry::decode(&b).unwrap().name(), name);
    }

    #[test]
    fn name_rules() {
        assert!(check_name("a.png").is_ok());
        assert!(check_name("deep/er/file").is_ok());
        assert!(check_name("").is_err());
        assert!(check_name(&"x".repeat(96)).is_err());
        assert!(check_name("a\\b").is_err());
        assert!(check_name("/etc/passwd").is_err());
        assert!(check_name("../escape").is_err());
        assert!(check_name("a/./b").is_err());
        assert!(check_name("a//b").is_err());
        assert!(check_name("trailing/").is_err());
    }

    #[test]
    fn unterminated_name_rejected() {
        let mut b = sample().encode();
        b[OFF_NAME..OFF_TYPE].fill(b'a');
        assert!(matches!(Entry::decode(&b), Err(FormatError::InvalidName(_))));
    }

    #[test]
    fn traversal_name_rejected() {
        let mut b = sample().encode();
        b[OFF_NAME..OFF_NAME + 6].copy_from_slice(b"../x\0\0");
        assert!(matches!(Entry::decode(&b), Err(FormatError::InvalidName(_))));
    }

    #[test]
    fn unknown_enum_bytes_rejected() {
        let mut b = sample().encode();
        b[OFF_TYPE] = 9;
        assert!(matches!(Entry::decode(&b), Err(FormatError::UnknownFileType(9))));
        let mut b = sample().encode();
        b[OFF_CODEC] = 7;
        assert!(matches!(Entry::decode(&b), Err(FormatError::UnknownCodec(7))));
    }

    #[test]
    fn short_buffer_rejected() {
        let b = sample().encode();
        assert!(matches!(Entry::decode(&b[..100]), Err(FormatError::Truncated { .. })));
    }
}
