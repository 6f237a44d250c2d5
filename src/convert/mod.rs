// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

//! Conversion pipeline drivers
//!
//! One driver per source layout: delimited box listings, VOC-style XML
//! sets, paired image/mask directories, and the synthetic renderer tree.
//! Each driver owns its bundle and id counters for the duration of a job,
//! so independent jobs can run concurrently without shared state.

mod lines;
mod masks;
mod synthetic;
mod voc;

pub use lines::LineRecordConverter;
pub use masks::{MaskConverter, MaskMode};
pub use synthetic::{SyntheticConverter, SyntheticMetadata};
pub use voc::VocXmlConverter;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SorrelError;
use crate::im::SourceImage;
use crate::ut::path::numeric_file_id;

/// Policy for assigning image ids within a conversion job
///
/// The chosen policy must stay fixed across reruns of a job for the output
/// to be reproducible against the same source listing.
#[derive(Debug, Clone, Default)]
pub enum ImageIdPolicy {
    /// Ids supplied by the caller, one per processed image in order
    Explicit(Vec<u32>),
    /// Ids built from the digits of the file name, stable under listing
    /// re-ordering
    FilenameDigits,
    /// Ids assigned as index into the processed list + 1
    #[default]
    Sequential,
}

impl ImageIdPolicy {
    /// Resolve the image id for the item at `index` named `file_name`
    pub fn image_id(&self, index: usize, file_name: &str) -> Result<u32, SorrelError> {
        match self {
            ImageIdPolicy::Explicit(ids) => ids.get(index).copied().ok_or_else(|| {
                SorrelError::RecordError(format!(
                    "Explicit image id list has no entry for index {}",
                    index
                ))
            }),
            ImageIdPolicy::FilenameDigits => numeric_file_id(file_name).ok_or_else(|| {
                SorrelError::RecordError(format!(
                    "No digits to derive an image id from {}",
                    file_name
                ))
            }),
            ImageIdPolicy::Sequential => Ok(index as u32 + 1),
        }
    }
}

/// Cooperative cancellation handle for a running conversion job
///
/// Drivers check the flag between per-image iterations; a cancelled job
/// stops with `JobCancelled` before the output JSON is written, so no
/// partial bundle ever reaches disk.
///
/// # Examples
///
/// ```
/// use sorrel::convert::CancelFlag;
///
/// let flag = CancelFlag::new();
/// assert!(!flag.is_cancelled());
///
/// flag.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a new, unset cancellation flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the job holding this flag
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub(crate) fn check_cancelled(cancel: Option<&CancelFlag>) -> Result<(), SorrelError> {
    if cancel.is_some_and(|flag| flag.is_cancelled()) {
        return Err(SorrelError::JobCancelled);
    }

    Ok(())
}

/// Emit one converted image into the output directory
///
/// A byte-identical copy when the job did not resize, a re-encode of the
/// in-memory pixels otherwise.
pub(crate) fn emit_image(
    source: &Path,
    image: &SourceImage,
    destination: &Path,
    resized: bool,
) -> Result<(), SorrelError> {
    if resized {
        image.save(destination)
    } else {
        std::fs::copy(source, destination)
            .map(|_| ())
            .map_err(|_| SorrelError::ImageWriteError)
    }
}
