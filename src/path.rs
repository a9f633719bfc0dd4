//! Source-tree enumeration and relative path normalisation.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{OrgPackError, PathError, Result};

/// One regular file found under the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Forward-slash path relative to the source root.
    pub name: String,
    pub path: PathBuf,
}

/// Relative path of `file` under `root`, joined with `/`.
pub fn normalize_rel_path(root: &Path, file: &Path) -> Result<String> {
    let rel = file
        .strip_prefix(root)
        .map_err(|_| PathError::Outside(file.to_path_buf()))?;

    let mut parts = Vec::new();
    for comp in rel.components() {
        match comp {
            Component::Normal(os) => {
                let s = os.to_str().ok_or_else(|| PathError::NonUtf8(file.to_path_buf()))?;
                parts.push(s);
            }
            Component::CurDir => {}
            _ => return Err(PathError::Outside(file.to_path_buf()).into()),
        }
    }
    Ok(parts.join("/"))
}

/// Result of walking a source directory.
#[derive(Debug, Default)]
pub struct SourceTree {
    /// Regular files, sorted byte-wise by name.
    pub files: Vec<SourceFile>,
    /// Entries below the root that could not be read.
    pub skipped: Vec<String>,
}

/// Every regular file under `root`, sorted by normalised name.  Symlinks are
/// not followed.  `exclude` (typically the output archive) is left out when it
/// resolves to a file inside the tree.
///
/// Failing to read `root` itself is an error; an unreadable entry below it is
/// logged and recorded in [`SourceTree::skipped`].
pub fn collect_sources(root: &Path, exclude: Option<&Path>) -> Result<SourceTree> {
    let exclude = exclude.and_then(|p| fs::canonicalize(p).ok());

    let mut tree = SourceTree::default();
    for ent in WalkDir::new(root).follow_links(false) {
        let ent = match ent {
            Ok(ent) => ent,
            Err(e) if e.depth() > 0 => {
                let name = e
                    .path()
                    .map(|p| normalize_rel_path(root, p).unwrap_or_else(|_| p.display().to_string()))
                    .unwrap_or_default();
                warn!(name = %name, error = %e, "could not read directory entry, skipping");
                tree.skipped.push(name);
                continue;
            }
            Err(e) => {
                let msg = e.to_string();
                return Err(e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, msg))
                    .into());
            }
        };
        if !ent.file_type().is_file() {
            continue;
        }
        if let Some(ex) = &exclude {
            if fs::canonicalize(ent.path()).map_or(false, |p| &p == ex) {
                continue;
            }
        }
        let name = normalize_rel_path(root, ent.path())?;
        tree.files.push(SourceFile { name, path: ent.into_path() });
    }

    tree.files.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    Ok(tree)
}

/// `fs::metadata`, with a missing path reported as [`PathError::NotFound`].
pub fn metadata(path: &Path) -> Result<fs::Metadata> {
    fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => OrgPackError::from(PathError::NotFound(path.to_path_buf())),
        _ => OrgPackError::from(e),
    })
}

/// Reject missing paths and non-directories as [`PathError`].
pub fn require_dir(path: &Path) -> Result<()> {
    let meta = metadata(path)?;
    if !meta.is_dir() {
        return Err(PathError::NotADirectory(path.to_path_buf()).into());
    }
    Ok(())
}
