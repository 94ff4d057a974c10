use std::path::PathBuf;

/// A photo selected for classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Full path on disk
    pub path: PathBuf,
    /// Sanitized file name, also used as the source identifier
    pub file_name: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}
