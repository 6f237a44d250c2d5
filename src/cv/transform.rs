// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use fast_image_resize;
use fast_image_resize::{FilterType, PixelType, images::Image};
use image::DynamicImage;

/// Resize an RGB8 image using the SIMD-accelerated fast-image-resize crate
///
/// # Arguments
///
/// * `source` - A DynamicImage with u8 RGB subpixels
/// * `new_width` - New width following resizing
/// * `new_height` - New height following resizing
pub fn resize_rgb8_fast(source: &DynamicImage, new_width: u32, new_height: u32) -> Vec<u8> {
    let mut destination = Image::new(new_width, new_height, PixelType::U8x3);

    let mut resizer = fast_image_resize::Resizer::new();
    let option = fast_image_resize::ResizeOptions {
        algorithm: fast_image_resize::ResizeAlg::Convolution(FilterType::Bilinear),
        cropping: fast_image_resize::SrcCropping::None,
        mul_div_alpha: false,
    };

    resizer.resize(source, &mut destination, &option).unwrap();

    destination.into_vec()
}

#[cfg(test)]
mod test {

    use super::*;
    use image::RgbImage;

    #[test]
    fn test_resize_rgb8_dimensions() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 6));

        let buffer = resize_rgb8_fast(&image, 4, 3);
        assert_eq!(buffer.len(), 4 * 3 * 3);

        let buffer = resize_rgb8_fast(&image, 16, 12);
        assert_eq!(buffer.len(), 16 * 12 * 3);
    }
}
