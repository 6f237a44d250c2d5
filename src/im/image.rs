// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::Path;

use image::{DynamicImage, RgbImage, open as open_dynamic};

use crate::coco::CocoImage;
use crate::constant;
use crate::cv::transform::resize_rgb8_fast;
use crate::error::SorrelError;

/// An RGB8 source image loaded for conversion
///
/// Every supported on-disk format is normalized to RGB8 on open so the
/// resize and re-encode paths only ever deal with one pixel layout.
///
/// # Examples
///
/// ```no_run
/// use sorrel::im::SourceImage;
/// let image = SourceImage::open("image.png");
/// ```
#[derive(Debug, Clone)]
pub struct SourceImage {
    data: RgbImage,
}

impl SourceImage {
    /// Open a new image from a provided path
    ///
    /// # Arguments
    ///
    /// * `path` - A path to an image with a valid extension
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SourceImage, SorrelError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if let Some(ext) = extension {
            if constant::SUPPORTED_IMAGE_FORMATS.iter().any(|e| e == &ext) {
                if let Ok(image) = open_dynamic(&path) {
                    return Ok(SourceImage {
                        data: image.to_rgb8(),
                    });
                }

                return Err(SorrelError::ImageReadError);
            }
        }

        Err(SorrelError::ImageExtensionError)
    }

    /// Initialize an image from an RGB8 buffer
    pub fn from_rgb8(data: RgbImage) -> SourceImage {
        SourceImage { data }
    }

    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.data.width()
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.data.height()
    }

    /// Return a reference to the underlying RGB8 buffer
    pub fn as_rgb8(&self) -> &RgbImage {
        &self.data
    }

    /// Scale both image dimensions by a factor
    ///
    /// # Arguments
    ///
    /// * `factor` - Multiplier applied to width and height
    pub fn resize(&self, factor: f32) -> SourceImage {
        let new_width = ((self.width() as f32 * factor) as u32).max(1);
        let new_height = ((self.height() as f32 * factor) as u32).max(1);

        let source = DynamicImage::ImageRgb8(self.data.clone());
        let buffer = resize_rgb8_fast(&source, new_width, new_height);

        SourceImage {
            // Buffer length always matches the requested dimensions
            data: RgbImage::from_raw(new_width, new_height, buffer).unwrap(),
        }
    }

    /// Re-encode the image at the provided path
    ///
    /// # Arguments
    ///
    /// * `path` - Destination path with a valid image extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SorrelError> {
        self.data
            .save(path)
            .map_err(|_| SorrelError::ImageWriteError)
    }
}

/// Resolve a source image into its bundle record and pixel buffer
///
/// On any read or decode failure the error is returned for the caller to
/// log; a failed image is a per-image recoverable condition that excludes
/// the image and its annotations from the output rather than aborting the
/// job.
///
/// # Arguments
///
/// * `path` - Path to the source image
/// * `id` - Caller-assigned image id
/// * `resize` - Scale factor; reported dimensions are post-resize
/// * `composite_filename` - Prefix the file name with the two directory
///   components above the file, for sources that reuse base names across
///   sub-folders
pub fn resolve_image<P: AsRef<Path>>(
    path: P,
    id: u32,
    resize: f32,
    composite_filename: bool,
) -> Result<(CocoImage, SourceImage), SorrelError> {
    let path = path.as_ref();

    let mut image = SourceImage::open(path)?;

    if resize != 1.0 {
        image = image.resize(resize);
    }

    let file_name = if composite_filename {
        composite_file_name(path)
    } else {
        base_file_name(path)
    };

    let record = CocoImage {
        file_name,
        height: image.height(),
        width: image.width(),
        id,
    };

    Ok((record, image))
}

fn base_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Join the two path components above the file into its emitted name
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sorrel::im::image::composite_file_name;
///
/// let path = Path::new("plots/plot_3/view_1/render.png");
/// assert_eq!(composite_file_name(path), "plot_3_view_1_render.png");
///
/// let path = Path::new("view_1/render.png");
/// assert_eq!(composite_file_name(path), "view_1_render.png");
/// ```
pub fn composite_file_name(path: &Path) -> String {
    let base = base_file_name(path);

    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().to_string());

    let grandparent = path
        .parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().to_string());

    match (grandparent, parent) {
        (Some(grandparent), Some(parent)) => format!("{}_{}_{}", grandparent, parent, base),
        (None, Some(parent)) => format!("{}_{}", parent, base),
        _ => base,
    }
}
