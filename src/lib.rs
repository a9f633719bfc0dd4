pub mod header;
pub mod codec;
pub mod index;
pub mod io_stream;
pub mod error;
pub mod path;
pub mod archive;
pub mod inspect;

pub use header::Header;
pub use codec::{CodecId, get_codec};
pub use index::{Entry, FileType};
pub use io_stream::{OrgPackReader, OrgPackWriter};
pub use error::{FormatError, OrgPackError, PathError, Result};
pub use archive::{pack, pack_stream, unpack, PackOptions, PackSummary, UnpackSummary};
pub use inspect::{peek, ArchiveReport};
