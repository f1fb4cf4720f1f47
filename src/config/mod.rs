//! Configuration management
//!
//! A configuration file describes which object classes are processed, which
//! custom library handles them, and for every video source a list of zone
//! polygons with their colors and counting approach. [`load_config`] turns the
//! file into a validated [`GlobalConfig`]; nothing is returned unless the whole
//! file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod active;
pub mod keyfile;
mod loader;
pub mod paths;

pub use active::ActiveConfig;
pub use keyfile::DEFAULT_LIST_SEPARATOR;
pub use loader::{load_config, load_config_with};

/// Section holding the element-wide properties
pub const PROPERTY_SECTION: &str = "property";
/// Prefix of the per-source sections, followed by the source id
pub const SOURCE_SECTION_PREFIX: &str = "source-";
/// Section of opaque string pairs handed to the custom library
pub const USER_CONFIGS_SECTION: &str = "user-configs1";

pub const KEY_ENABLE: &str = "enable";
pub const KEY_OBJECT_IDS: &str = "object_ids";
pub const KEY_CUSTOM_LIB_PATH: &str = "custom-lib-path";
pub const KEY_TENSOR_PREPARATION_FUNCTION: &str = "custom-tensor-preparation-function";

pub const KEY_ZONE_IDS: &str = "zone_ids";
pub const KEY_CUSTOM_INPUT_TRANSFORMATION_FUNCTION: &str = "custom-input-transformation-function";
pub const KEY_ZONE_CORDS_PREFIX: &str = "zone_cords-";
pub const KEY_ZONE_APPROACH_PREFIX: &str = "zone_approach-";
pub const KEY_REMOVE_UNCOUNTED: &str = "remove_uncounted";
pub const KEY_FCM_FACTOR: &str = "fcm_factor";

/// Number of trailing color channels in a `zone_cords-<n>` list
pub const COLOR_CHANNELS: usize = 3;

/// Options fixed before the file is parsed
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Separator between list elements
    pub list_separator: char,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            list_separator: DEFAULT_LIST_SEPARATOR,
        }
    }
}

/// Polygon vertex in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Display color of a zone, each channel normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ZoneColor {
    /// Builds a color from raw 0-255 channel values
    pub fn from_raw(red: i32, green: i32, blue: i32) -> Self {
        Self {
            red: f64::from(red) / 255.0,
            green: f64::from(green) / 255.0,
            blue: f64::from(blue) / 255.0,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.red, self.green, self.blue]
    }
}

/// Region of interest inside one source's frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Taken from the `<n>` suffix of `zone_cords-<n>`
    pub index: u32,
    pub points: Vec<Point>,
    pub color: ZoneColor,
    /// Counting-direction policy code, interpreted by the custom library
    pub approach: i32,
}

/// Raw `zone_approach-<n>` entry, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneApproach {
    pub index: u32,
    pub approach: i32,
}

/// Per-source processing settings from a `source-<id>` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingGroup {
    pub source_id: u64,
    pub enabled: bool,
    pub zone_ids: Vec<i32>,
    pub custom_transform_function_name: Option<String>,
    pub remove_uncounted: bool,
    pub fcm_factor: f64,
    pub zone_approaches: Vec<ZoneApproach>,
    /// Only populated when the group is enabled
    pub zones: Vec<Zone>,
}

impl ProcessingGroup {
    pub fn new(source_id: u64) -> Self {
        Self {
            source_id,
            enabled: false,
            zone_ids: Vec::new(),
            custom_transform_function_name: None,
            remove_uncounted: false,
            fcm_factor: 0.0,
            zone_approaches: Vec::new(),
            zones: Vec::new(),
        }
    }
}

/// Validated configuration for one element instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Absolute path of the file this configuration was read from
    pub config_file: PathBuf,
    /// When false the element passes all data through unmodified
    pub enabled: bool,
    pub object_ids: Vec<i32>,
    pub custom_lib_path: PathBuf,
    pub tensor_preparation_function_name: String,
    /// One entry per `source-<id>` section, in file order
    pub groups: Vec<ProcessingGroup>,
    /// `user-configs1` pairs, in file order
    pub user_configs: Vec<(String, String)>,
    /// Number of zones across all groups
    pub total_zones: usize,
}

impl GlobalConfig {
    /// First group configured for `source_id`
    pub fn group_for_source(&self, source_id: u64) -> Option<&ProcessingGroup> {
        self.groups.iter().find(|g| g.source_id == source_id)
    }

    pub fn enabled_groups(&self) -> impl Iterator<Item = &ProcessingGroup> {
        self.groups.iter().filter(|g| g.enabled)
    }
}

/// Broad category of a [`ConfigError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    File,
    MissingSection,
    IncompleteProperty,
    Range,
    MalformedZone,
    PathResolution,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file path not specified")]
    EmptyPath,

    #[error("Failed to parse config file {}: {reason}", .file.display())]
    File { file: PathBuf, reason: String },

    #[error("Failed to parse config file {}: group '{section}' not specified", .file.display())]
    MissingSection { file: PathBuf, section: String },

    #[error(
        "Failed to parse config file {}: property '{key}' not set in group '{section}'",
        .file.display()
    )]
    IncompleteProperty {
        file: PathBuf,
        section: String,
        key: String,
    },

    #[error(
        "Failed to parse config file {}: property '{key}' in group '{section}' {reason}",
        .file.display()
    )]
    Range {
        file: PathBuf,
        section: String,
        key: String,
        reason: String,
    },

    #[error(
        "Failed to parse config file {}: '{key}' in group '{section}' has {len} values, \
         expected point pairs followed by 3 color channels",
        .file.display()
    )]
    MalformedZone {
        file: PathBuf,
        section: String,
        key: String,
        len: usize,
    },

    #[error(
        "Failed to parse config file {}: could not resolve '{key}' in group '{section}': {source}",
        .file.display()
    )]
    PathResolution {
        file: PathBuf,
        section: String,
        key: String,
        #[source]
        source: paths::PathResolutionError,
    },
}

impl ConfigError {
    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            ConfigError::EmptyPath | ConfigError::File { .. } => ConfigErrorKind::File,
            ConfigError::MissingSection { .. } => ConfigErrorKind::MissingSection,
            ConfigError::IncompleteProperty { .. } => ConfigErrorKind::IncompleteProperty,
            ConfigError::Range { .. } => ConfigErrorKind::Range,
            ConfigError::MalformedZone { .. } => ConfigErrorKind::MalformedZone,
            ConfigError::PathResolution { .. } => ConfigErrorKind::PathResolution,
        }
    }

    /// Offending section, if the error is tied to one
    pub fn section(&self) -> Option<&str> {
        match self {
            ConfigError::EmptyPath | ConfigError::File { .. } => None,
            ConfigError::MissingSection { section, .. }
            | ConfigError::IncompleteProperty { section, .. }
            | ConfigError::Range { section, .. }
            | ConfigError::MalformedZone { section, .. }
            | ConfigError::PathResolution { section, .. } => Some(section),
        }
    }

    /// Offending key, if the error is tied to one
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigError::IncompleteProperty { key, .. }
            | ConfigError::Range { key, .. }
            | ConfigError::MalformedZone { key, .. }
            | ConfigError::PathResolution { key, .. } => Some(key),
            _ => None,
        }
    }
}
