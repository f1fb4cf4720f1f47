//! Custom processing library abstraction
//!
//! The element hands every batch to a [`CustomLibrary`]. Counting algorithms
//! live behind this trait; the crate itself ships only [`PassthroughLibrary`].

use crate::config::{GlobalConfig, ProcessingGroup};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One frame inside a batched buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub source_id: u64,
    pub frame_num: u64,
}

/// A batch of frames together with the configuration it is processed under
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub batch_num: u64,
    pub frames: &'a [FrameInfo],
    pub config: &'a GlobalConfig,
}

impl<'a> Batch<'a> {
    pub fn new(batch_num: u64, frames: &'a [FrameInfo], config: &'a GlobalConfig) -> Self {
        Self {
            batch_num,
            frames,
            config,
        }
    }

    /// Frames whose source has an enabled group, paired with that group
    pub fn groups(&self) -> impl Iterator<Item = (&'a FrameInfo, &'a ProcessingGroup)> + 'a {
        let config = self.config;
        let frames = self.frames;
        frames.iter().filter_map(move |frame| {
            config
                .group_for_source(frame.source_id)
                .filter(|group| group.enabled)
                .map(|group| (frame, group))
        })
    }
}

/// Outcome of processing one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The library analysed at least one frame
    Processed { frames: usize },
    /// Nothing was done; buffers go downstream untouched
    Passthrough,
}

/// Custom library errors
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),
}

/// Capability the element resolves from the configured library
pub trait CustomLibrary: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Process one batch of frames
    fn process_tensor(&self, batch: &Batch<'_>) -> Result<ProcessStatus, LibraryError>;
}

/// Library that never touches a batch
#[derive(Debug, Clone)]
pub struct PassthroughLibrary {
    library_path: PathBuf,
    function_name: String,
}

impl PassthroughLibrary {
    pub fn new(library_path: impl Into<PathBuf>, function_name: impl Into<String>) -> Self {
        Self {
            library_path: library_path.into(),
            function_name: function_name.into(),
        }
    }

    pub fn for_config(config: &GlobalConfig) -> Self {
        Self::new(
            config.custom_lib_path.clone(),
            config.tensor_preparation_function_name.clone(),
        )
    }

    pub fn library_path(&self) -> &Path {
        &self.library_path
    }
}

impl CustomLibrary for PassthroughLibrary {
    fn name(&self) -> &str {
        &self.function_name
    }

    fn process_tensor(&self, batch: &Batch<'_>) -> Result<ProcessStatus, LibraryError> {
        if let Some(frame) = batch
            .frames
            .iter()
            .find(|frame| batch.config.group_for_source(frame.source_id).is_none())
        {
            return Err(LibraryError::InvalidBatch(format!(
                "batch {} has a frame from unconfigured source {}",
                batch.batch_num, frame.source_id
            )));
        }
        tracing::trace!(
            "{} skipping batch {} ({} of {} frames in enabled groups)",
            self.function_name,
            batch.batch_num,
            batch.groups().count(),
            batch.frames.len()
        );
        Ok(ProcessStatus::Passthrough)
    }
}
