//! Zone post-processing for multi-stream video analytics
//!
//! Loads a per-source zone configuration (polygons, colors, counting approach)
//! and hands each batch to a custom processing library. With the `gst-plugin`
//! feature the crate also builds the `zonepostprocess` GStreamer element.

pub mod config;
pub mod error;
pub mod library;

// GStreamer plugins
#[cfg(feature = "gst-plugin")]
pub mod gst_plugins;

// Re-export commonly used types
pub use config::{
    load_config, load_config_with, ActiveConfig, ConfigError, ConfigErrorKind, GlobalConfig,
    LoadOptions, Point, ProcessingGroup, Zone, ZoneApproach, ZoneColor,
};
pub use error::{PostProcessError, PostProcessResult};
pub use library::{Batch, CustomLibrary, FrameInfo, LibraryError, PassthroughLibrary, ProcessStatus};

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
