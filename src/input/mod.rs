mod entry;
mod error;


pub use entry::ImageEntry;
pub use error::InputError;

use crate::security::PathSanitizer;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Extensions picked up when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Default per-file size cap: 50 MB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// What [`InputScanner::scan`] found
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Accepted photos in file-name order
    pub images: Vec<ImageEntry>,
    /// Entries skipped because they could not be read or named
    pub unreadable: Vec<PathBuf>,
}

/// Lists the photos to classify, in a stable order
#[derive(Debug, Clone)]
pub struct InputScanner {
    /// Lowercase extensions without the dot
    extensions: Vec<String>,
    /// Descend into subdirectories
    recursive: bool,
    /// Files above this size are skipped
    max_file_size: u64,
}

impl InputScanner {
    /// Create a scanner with default extensions and limits
    pub fn new() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            recursive: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Replace the accepted extensions (case-insensitive, leading dot optional)
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set maximum individual file size
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Whether `path` has one of the accepted extensions
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|x| *x == e))
    }

    /// Collect every accepted file under `dir`, sorted by name.
    ///
    /// Without `recursive` only the top level is listed. Nested files get
    /// their relative path flattened into the file name (`trip/a.jpg` becomes
    /// `trip_a.jpg`) so copies never collide inside a cluster folder.
    ///
    /// Only a missing or unlistable `dir` fails the scan. Entries that cannot
    /// be read or named are logged and returned in [`ScanResult::unreadable`].
    pub fn scan(&self, dir: &Path) -> Result<ScanResult, InputError> {
        if !dir.is_dir() {
            return Err(InputError::MissingDirectory(dir.to_path_buf()));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut result = ScanResult::default();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => return Err(err.into()),
                Err(err) => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                    result.unreadable.push(path);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.accepts(entry.path()) {
                continue;
            }

            match self.read_entry(dir, &entry) {
                Ok(Some(image)) => result.images.push(image),
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "skipping unreadable photo");
                    result.unreadable.push(entry.path().to_path_buf());
                }
            }
        }

        debug!(
            dir = %dir.display(),
            count = result.images.len(),
            unreadable = result.unreadable.len(),
            "scanned input directory"
        );
        Ok(result)
    }

    /// `None` for files over the size cap
    fn read_entry(&self, dir: &Path, entry: &DirEntry) -> Result<Option<ImageEntry>, InputError> {
        let path = entry.path();
        let size_bytes = entry.metadata()?.len();
        if size_bytes > self.max_file_size {
            warn!(
                path = %path.display(),
                size = size_bytes,
                max = self.max_file_size,
                "skipping oversized file"
            );
            return Ok(None);
        }

        let relative = path
            .strip_prefix(dir)
            .map_err(|_| InputError::InvalidPath(path.display().to_string()))?;
        let file_name = PathSanitizer::flatten(relative)?;

        let bytes = std::fs::read(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        Ok(Some(ImageEntry {
            path: path.to_path_buf(),
            file_name,
            size_bytes,
            sha256,
        }))
    }
}

impl Default for InputScanner {
    fn default() -> Self {
        Self::new()
    }
}
