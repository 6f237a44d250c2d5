pub mod image;
mod mask;

pub use image::SourceImage;
pub use image::resolve_image;

pub use mask::ColorMask;
pub use mask::SubMask;
