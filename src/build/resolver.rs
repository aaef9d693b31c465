/// Content fingerprinting for the paths a step mentions
///
/// Every whitespace-separated token of a step is checked against the build
/// root, then against the secondary source root. Tokens that name an
/// existing file or directory become a `ReferencedObject` carrying a SHA-256
/// over the content.
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use super::ReferencedObject;
use crate::error::BuildError;

/// Resolves step text into referenced objects relative to a build root
#[derive(Debug, Clone)]
pub struct Resolver {
    build_root: PathBuf,
    source_root: PathBuf,
}

/// Kind of filesystem entry a token resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Directory,
}

impl Resolver {
    pub fn new(build_root: impl Into<PathBuf>, source_root: impl Into<PathBuf>) -> Self {
        Self {
            build_root: build_root.into(),
            source_root: source_root.into(),
        }
    }

    /// Resolve every path-like token of `step` into a `ReferencedObject`.
    ///
    /// Missing paths are skipped. An existing path that cannot be read is a
    /// `FileHash` error. Output follows token order and keeps duplicates.
    pub fn resolve(&self, step: &str) -> Result<Vec<ReferencedObject>, BuildError> {
        let mut objects = Vec::new();

        for token in step.split_whitespace() {
            let Some((path, full_path, kind)) = self.locate(token)? else {
                trace!(token = %token, "token is not a path");
                continue;
            };

            let sha = match kind {
                EntryKind::File => hash_file(&full_path),
                EntryKind::Directory => hash_directory(&full_path),
            }
            .map_err(|e| BuildError::FileHash {
                path: path.clone(),
                message: e.to_string(),
            })?;

            debug!(operation = "hash", path = %path, sha = %sha, "resolved reference");
            objects.push(ReferencedObject { path, sha });
        }

        Ok(objects)
    }

    /// Find the first candidate location for `token` that exists.
    ///
    /// Returns the reported path (relative form as resolved), the path to
    /// read, and the entry kind. A candidate that exists but cannot be
    /// inspected is a `FileHash` error rather than a miss.
    fn locate(&self, token: &str) -> Result<Option<(String, PathBuf, EntryKind)>, BuildError> {
        let direct = Path::new(token).to_path_buf();
        let fallback = self.source_root.join(token);

        for candidate in [direct, fallback] {
            let full_path = self.absolute(&candidate);
            let path = candidate.to_string_lossy().into_owned();

            match entry_kind(&full_path) {
                Ok(Some(kind)) => return Ok(Some((path, full_path, kind))),
                Ok(None) => continue,
                Err(e) if is_missing(&e) => continue,
                Err(e) => {
                    return Err(BuildError::FileHash {
                        path,
                        message: e.to_string(),
                    })
                }
            }
        }

        Ok(None)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.build_root.join(path)
        }
    }
}

/// Regular files and directories count; other existing entries are ignored
fn entry_kind(path: &Path) -> io::Result<Option<EntryKind>> {
    let metadata = fs::metadata(path)?;
    if metadata.is_file() {
        Ok(Some(EntryKind::File))
    } else if metadata.is_dir() {
        Ok(Some(EntryKind::Directory))
    } else {
        Ok(None)
    }
}

fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// SHA-256 over the raw bytes of a file, hex-encoded
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    stream_into(&mut hasher, path)?;
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 over the concatenated bytes of every regular file under `path`.
///
/// Entries are visited in file-name order. Hidden entries (base name starting
/// with `.`) are skipped along with everything beneath them.
pub fn hash_directory(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();

    let walker = WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;

        if entry.file_type().is_dir() {
            continue;
        }

        // Symlinks count when they point at a regular file
        if entry.file_type().is_file() || entry.path().is_file() {
            stream_into(&mut hasher, entry.path())?;
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

fn stream_into(hasher: &mut Sha256, path: &Path) -> io::Result<()> {
    let mut file = File::open(path)?;
    io::copy(&mut file, hasher)?;
    Ok(())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
