//! Section-based `key=value` files, read through [`glib::KeyFile`]
//!
//! ```text
//! [property]
//! enable=1
//! object_ids=1;2;3
//! ```
//!
//! Groups and keys come back in file order. The list separator is set before
//! the file is loaded and stays fixed for every list read from it.

use std::path::Path;

use glib::KeyFileFlags;
use thiserror::Error;

/// Separator used for list values unless the caller picks another one
pub const DEFAULT_LIST_SEPARATOR: char = ';';

/// Errors raised while opening a configuration file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    #[error("list separator '{0}' must be a single ASCII character")]
    InvalidSeparator(char),

    #[error("{0}")]
    Load(String),
}

/// A value that is missing or cannot be read as the requested type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValueError(String);

impl From<glib::Error> for ValueError {
    fn from(err: glib::Error) -> Self {
        ValueError(err.message().to_string())
    }
}

pub struct KeyFile {
    inner: glib::KeyFile,
}

impl KeyFile {
    pub fn open(path: &Path, list_separator: char) -> Result<Self, OpenError> {
        if !list_separator.is_ascii() {
            return Err(OpenError::InvalidSeparator(list_separator));
        }

        let inner = glib::KeyFile::new();
        inner.set_list_separator(glib::Char::from(list_separator as u8));
        inner
            .load_from_file(path, KeyFileFlags::NONE)
            .map_err(|e| OpenError::Load(e.message().to_string()))?;
        Ok(Self { inner })
    }

    /// Group names; a repeated header merges into its first occurrence
    pub fn groups(&self) -> Vec<String> {
        self.inner
            .groups()
            .iter()
            .map(|group| group.as_str().to_owned())
            .collect()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.inner.has_group(group)
    }

    /// Keys of `group`. A repeated key is listed once and reads as its last value.
    pub fn keys(&self, group: &str) -> Result<Vec<String>, ValueError> {
        let mut keys: Vec<String> = Vec::new();
        for key in self.inner.keys(group)?.iter() {
            let key = key.as_str();
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_owned());
            }
        }
        Ok(keys)
    }

    /// String value with escape sequences decoded
    pub fn string(&self, group: &str, key: &str) -> Result<String, ValueError> {
        Ok(self.inner.string(group, key)?.to_string())
    }

    /// Accepts `0`/`1` and `true`/`false`
    pub fn boolean(&self, group: &str, key: &str) -> Result<bool, ValueError> {
        Ok(self.inner.boolean(group, key)?)
    }

    pub fn integer(&self, group: &str, key: &str) -> Result<i32, ValueError> {
        Ok(self.inner.integer(group, key)?)
    }

    pub fn double(&self, group: &str, key: &str) -> Result<f64, ValueError> {
        Ok(self.inner.double(group, key)?)
    }

    pub fn integer_list(&self, group: &str, key: &str) -> Result<Vec<i32>, ValueError> {
        Ok(self.inner.integer_list(group, key)?)
    }
}
