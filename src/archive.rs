//! High-level pack / unpack over filesystem paths: the primary embedding
//! surface.
//!
//! ```no_run
//! use orgpack::archive::{pack, unpack, PackOptions};
//! use orgpack::codec::CodecId;
//! use std::path::Path;
//!
//! let opts = PackOptions { codec: CodecId::Zstd, ..PackOptions::default() };
//! let packed = pack(Path::new("assets"), Path::new("assets.pak"), &opts)?;
//! println!("packed {} files", packed.files_written);
//!
//! let unpacked = unpack(Path::new("assets.pak"), Path::new("restored"))?;
//! assert_eq!(unpacked.files_extracted, packed.files_written);
//! # Ok::<(), orgpack::OrgPackError>(())
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::codec::{CodecId, DEFAULT_ZSTD_LEVEL};
use crate::error::{OrgPackError, PathError, Result};
use crate::header;
use crate::index::{check_name, Entry};
use crate::io_stream::{OrgPackReader, OrgPackWriter};
use crate::path::{collect_sources, metadata, require_dir};

// ── PackOptions ───────────────────────────────────────────────────────────────

/// Configuration for [`pack`] and [`pack_stream`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub codec: CodecId,
    /// Zstd level; ignored by the other codecs.
    pub level: i32,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self { codec: CodecId::None, level: DEFAULT_ZSTD_LEVEL }
    }
}

// ── Summaries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct PackSummary {
    pub files_written: u32,
    /// Names of sources that could not be read or compressed.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UnpackSummary {
    pub files_extracted: u32,
    /// Names of entries that could not be decoded or written.
    pub skipped: Vec<String>,
}

// ── Pack ──────────────────────────────────────────────────────────────────────

/// Pack every regular file under `source_dir` into a new archive at `output`.
///
/// The codec, the source directory and every entry name are validated before
/// `output` is created.
pub fn pack(source_dir: &Path, output: &Path, opts: &PackOptions) -> Result<PackSummary> {
    opts.codec.ensure_available()?;
    require_dir(source_dir)?;

    let tree = collect_sources(source_dir, Some(output))?;
    if tree.files.is_empty() {
        return Err(PathError::EmptySource(source_dir.to_path_buf()).into());
    }
    for src in &tree.files {
        check_name(&src.name)
            .map_err(|reason| PathError::InvalidName { name: src.name.clone(), reason })?;
    }

    let out = BufWriter::new(File::create(output)?);
    let mut summary = pack_stream(
        out,
        tree.files.into_iter().map(|s| {
            let file = File::open(&s.path);
            (s.name, file)
        }),
        opts,
    )?;
    let mut skipped = tree.skipped;
    skipped.append(&mut summary.skipped);
    summary.skipped = skipped;
    info!(files = summary.files_written, output = %output.display(), "archive written");
    Ok(summary)
}

/// Pack `(name, open result)` pairs into `out` in iteration order.
///
/// A source that failed to open, fails mid-read, or fails to compress is
/// logged and skipped; everything else aborts.
pub fn pack_stream<W, R, I>(out: W, sources: I, opts: &PackOptions) -> Result<PackSummary>
where
    W: Write + Seek,
    R: Read,
    I: IntoIterator<Item = (String, io::Result<R>)>,
{
    opts.codec.ensure_available()?;
    let mut writer = OrgPackWriter::with_level(out, opts.level)?;
    let mut summary = PackSummary::default();

    for (name, source) in sources {
        let data = match source.and_then(read_all) {
            Ok(d) => d,
            Err(e) => {
                warn!(name = %name, error = %e, "could not read file, skipping");
                summary.skipped.push(name);
                continue;
            }
        };
        match writer.add_file(&name, &data, opts.codec) {
            Ok(entry) => {
                info!(name = %name, raw = entry.uncompressed_size, stored = entry.compressed_size, "packed");
                summary.files_written += 1;
            }
            Err(OrgPackError::Compression(e)) => {
                warn!(name = %name, error = %e, "compression failed, skipping");
                summary.skipped.push(name);
            }
            Err(e) => return Err(e),
        }
    }

    writer.finalize()?;
    Ok(summary)
}

fn read_all<R: Read>(mut r: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    Ok(buf)
}

// ── Unpack ────────────────────────────────────────────────────────────────────

/// Open an archive file for reading; missing and zero-length paths are
/// [`PathError`]s.
pub fn open_archive(path: &Path) -> Result<OrgPackReader<BufReader<File>>> {
    let meta = metadata(path)?;
    if meta.len() == 0 {
        return Err(PathError::EmptyArchive(path.to_path_buf()).into());
    }
    OrgPackReader::new(BufReader::new(File::open(path)?))
}

/// Restore every entry of `archive` under `output_dir`.
///
/// The archive is fully validated before `output_dir` is created.  Entries
/// that fail to decode or write are logged and skipped.
pub fn unpack(archive: &Path, output_dir: &Path) -> Result<UnpackSummary> {
    let mut reader = open_archive(archive)?;
    fs::create_dir_all(output_dir)?;

    let mut summary = UnpackSummary::default();
    let entries = reader.entries().to_vec();
    for entry in &entries {
        match extract_entry(&mut reader, entry, output_dir) {
            Ok(dest) => {
                info!(name = entry.name(), size = entry.uncompressed_size, dest = %dest.display(), "extracted");
                summary.files_extracted += 1;
            }
            Err(e) => {
                warn!(name = entry.name(), error = %e, "could not extract entry, skipping");
                summary.skipped.push(entry.name().to_owned());
            }
        }
    }
    Ok(summary)
}

fn extract_entry<R: Read + Seek>(
    reader:     &mut OrgPackReader<R>,
    entry:      &Entry,
    output_dir: &Path,
) -> Result<PathBuf> {
    // decode first so a corrupt entry leaves no partial file behind
    let data = reader.unpack_entry(entry)?;
    let dest = entry
        .name()
        .split('/')
        .fold(output_dir.to_path_buf(), |p, part| p.join(part));
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&dest, &data)?;
    Ok(dest)
}

// ── Intent detection ─────────────────────────────────────────────────────────

/// What the command surface should do with a bare path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Pack,
    Unpack,
    Skip,
}

/// Directories are packed, files starting with the archive magic are
/// unpacked, everything else is skipped.
pub fn detect_intent(path: &Path) -> Result<Intent> {
    let meta = metadata(path)?;
    if meta.is_dir() {
        return Ok(Intent::Pack);
    }
    if meta.is_file() && header::sniff(File::open(path)?)? {
        return Ok(Intent::Unpack);
    }
    Ok(Intent::Skip)
}
