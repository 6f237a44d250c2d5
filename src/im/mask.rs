// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::BTreeMap;
use std::path::Path;

use image::{RgbImage, open as open_dynamic};

use crate::constant;
use crate::cv::trace_contours;
use crate::error::SorrelError;

/// A colored instance-label mask
///
/// Every distinct non-black RGB color marks the pixels of one labeled
/// instance (or one group of same-category instances, depending on how the
/// upstream annotation tool painted the mask).
///
/// # Examples
///
/// ```no_run
/// use sorrel::im::ColorMask;
/// let mask = ColorMask::open("mask.png");
/// ```
#[derive(Debug, Clone)]
pub struct ColorMask {
    data: RgbImage,
}

impl ColorMask {
    /// Open a new mask from a provided path
    ///
    /// # Arguments
    ///
    /// * `path` - A path to a mask image with a valid extension
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ColorMask, SorrelError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if let Some(ext) = extension {
            if constant::SUPPORTED_IMAGE_FORMATS.iter().any(|e| e == &ext) {
                if let Ok(image) = open_dynamic(&path) {
                    return Ok(ColorMask {
                        data: image.to_rgb8(),
                    });
                }

                return Err(SorrelError::ImageReadError);
            }
        }

        Err(SorrelError::ImageExtensionError)
    }

    /// Initialize a mask from an RGB8 buffer
    pub fn from_rgb8(data: RgbImage) -> ColorMask {
        ColorMask { data }
    }

    /// Mask width in pixels
    pub fn width(&self) -> u32 {
        self.data.width()
    }

    /// Mask height in pixels
    pub fn height(&self) -> u32 {
        self.data.height()
    }

    /// Partition the mask into one binary sub-mask per distinct color
    ///
    /// Sub-masks are padded by one pixel on every side so regions bleeding
    /// to the mask edge still produce closed boundary contours. Colors are
    /// returned in ascending RGB order so repeated runs enumerate instances
    /// identically.
    pub fn sub_masks(&self) -> Vec<SubMask> {
        let width = self.data.width() as usize;
        let height = self.data.height() as usize;

        let padded_width = width + 2;
        let padded_height = height + 2;

        let mut partition: BTreeMap<[u8; 3], Vec<u8>> = BTreeMap::new();

        for (x, y, pixel) in self.data.enumerate_pixels() {
            let color = [pixel[0], pixel[1], pixel[2]];

            if color == [0, 0, 0] {
                continue;
            }

            let buffer = partition
                .entry(color)
                .or_insert_with(|| vec![0u8; padded_width * padded_height]);

            buffer[(y as usize + 1) * padded_width + (x as usize + 1)] = 1;
        }

        partition
            .into_iter()
            .map(|(color, data)| SubMask {
                color,
                width: padded_width,
                height: padded_height,
                data,
            })
            .collect()
    }
}

/// A binary raster isolating the pixels of one mask color
///
/// The raster is padded by one pixel on every side and only lives long
/// enough for its contours to be extracted.
#[derive(Debug, Clone)]
pub struct SubMask {
    color: [u8; 3],
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl SubMask {
    /// The mask color isolated by this sub-mask
    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    /// Trace the outer boundaries of every island of this color
    ///
    /// Points are mapped back to the unpadded mask coordinate space.
    pub fn contours(&self) -> Vec<Vec<[f64; 2]>> {
        trace_contours(self.width, self.height, &self.data)
            .into_iter()
            .map(|contour| {
                contour
                    .into_iter()
                    .map(|[x, y]| [x - 1.0, y - 1.0])
                    .collect()
            })
            .collect()
    }
}
