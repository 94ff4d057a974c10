use crate::input::InputError;
use std::path::{is_separator, Component, Path};

/// Keeps names taken from the input tree inside the output directory.
pub struct PathSanitizer;

impl PathSanitizer {
    /// Turn a path relative to the input directory into a single photo name,
    /// joining nested components with `_` (`trip/a.jpg` becomes `trip_a.jpg`).
    ///
    /// Rejects absolute paths, `..`, non UTF-8 components and paths that are
    /// empty once `.` components are dropped.
    pub fn flatten(relative: &Path) -> Result<String, InputError> {
        let mut parts = Vec::new();

        for component in relative.components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => {
                    let part = part.to_str().ok_or_else(|| {
                        InputError::InvalidPath(format!("Invalid UTF-8 in path: {:?}", relative))
                    })?;
                    parts.push(part);
                }
                Component::ParentDir => {
                    return Err(InputError::InvalidPath(format!(
                        "Parent directory traversal not allowed: {}",
                        relative.display()
                    )));
                }
                Component::Prefix(_) | Component::RootDir => {
                    return Err(InputError::InvalidPath(format!(
                        "Absolute path not allowed: {}",
                        relative.display()
                    )));
                }
            }
        }

        if parts.is_empty() {
            return Err(InputError::InvalidPath(format!(
                "Empty path: {:?}",
                relative
            )));
        }

        Ok(parts.join("_"))
    }

    /// Validate a name that will become a single entry inside an output folder
    /// (cluster labels, copied photo names, the representative crop name).
    ///
    /// Only the platform's own separators count, so `b\c.png` is a plain
    /// name on Unix.
    pub fn file_name(raw_name: &str) -> Result<&str, InputError> {
        let mut components = Path::new(raw_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None)
                if part == raw_name && !raw_name.chars().any(is_separator) =>
            {
                Ok(raw_name)
            }
            _ => Err(InputError::InvalidPath(format!(
                "Expected a plain file name: {}",
                raw_name
            ))),
        }
    }
}
