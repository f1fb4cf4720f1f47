//! Resolution of file paths mentioned inside a configuration file

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathResolutionError {
    #[error("path is empty")]
    Empty,

    #[error("'{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("cannot resolve configuration file '{}': {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot resolve '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Resolve `file_path` to an absolute path.
///
/// Absolute inputs are canonicalized as-is. Relative inputs are anchored at the
/// directory containing `config_file`. Either way the target must exist.
pub fn resolve_config_relative(
    config_file: &Path,
    file_path: &str,
) -> Result<PathBuf, PathResolutionError> {
    let file_path = file_path.trim();
    if file_path.is_empty() {
        return Err(PathResolutionError::Empty);
    }

    let candidate = Path::new(file_path);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        let config_file = config_file
            .canonicalize()
            .map_err(|source| PathResolutionError::ConfigFile {
                path: config_file.to_path_buf(),
                source,
            })?;
        let dir = config_file.parent().unwrap_or_else(|| Path::new("/"));
        dir.join(candidate)
    };

    match joined.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(_) if joined.exists() => Ok(joined),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(PathResolutionError::NotFound(joined)),
        Err(source) => Err(PathResolutionError::Io {
            path: joined,
            source,
        }),
    }
}

/// Anchor a possibly relative configuration file path at `base`.
pub fn anchor(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() || base.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
