// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

// All currently supported image formats
pub const SUPPORTED_IMAGE_FORMATS: [&str; 17] = [
    "avif", "bmp", "dds", "hdr", "ico", "jpeg", "jpg", "exr", "png", "pbm", "pgm", "ppm", "qoi",
    "tga", "tif", "tiff", "webp",
];

// Tolerance in pixels used when simplifying traced polygon rings
pub const SIMPLIFY_TOLERANCE: f64 = 1.0;

// Minimum number of vertices for an already-vectorized polygon
pub const MIN_POLYGON_POINTS: usize = 4;

// Alternate names a label file may be stored under in synthetic renders
pub const LABEL_ALIASES: [(&str, &str); 1] = [("fruits", "clusters")];

// Canonical names for converted dataset output
pub const ANNOTATION_FILE_NAME: &str = "annotations.json";
pub const IMAGE_DIR_NAME: &str = "images";

// Supercategory emitted for every category record
pub const SUPERCATEGORY: &str = "none";

// Fixed locations inside a synthetic render dataset
pub const METADATA_DIR_NAME: &str = ".metadata";
pub const STAGING_DIR_NAME: &str = ".staging";
pub const SYNTHETIC_LABEL_FILE_PREFIX: &str = "rectangular_labels_";
