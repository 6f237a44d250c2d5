// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::Path;

use crate::coco::{CocoAnnotation, LabelRegistry};
use crate::error::SorrelError;

/// Extract a box annotation from flat line-record tokens
///
/// Tokens are `[x1, y1, x2, y2, category_id]` corner coordinates in
/// absolute pixel units. The emitted box uses the inclusive pixel
/// convention (`width = x2 - x1 + 1`), matching how these listing files
/// were annotated; the XML extractor deliberately differs.
///
/// A degenerate box is a hard error rather than a skip since it marks
/// malformed upstream annotation data the caller must fix.
///
/// # Arguments
///
/// * `tokens` - Per-box record tokens
/// * `resize` - Scale factor applied to the coordinates
/// * `category_override` - Category id to use instead of the token payload
/// * `image_id` - Id of the image this box belongs to
/// * `id` - Job-wide annotation id
///
/// # Examples
///
/// ```
/// use sorrel::ex::line::from_tokens;
///
/// let tokens: Vec<String> = ["10", "10", "50", "50", "2"]
///     .iter()
///     .map(|t| t.to_string())
///     .collect();
///
/// let annotation = from_tokens(&tokens, 1.0, None, 1, 1).unwrap();
///
/// assert_eq!(annotation.bbox, [10.0, 10.0, 41.0, 41.0]);
/// assert_eq!(annotation.area, 1681.0);
/// assert_eq!(annotation.category_id, 2);
/// ```
pub fn from_tokens(
    tokens: &[String],
    resize: f32,
    category_override: Option<u32>,
    image_id: u32,
    id: u32,
) -> Result<CocoAnnotation, SorrelError> {
    if tokens.len() < 4 {
        return Err(SorrelError::RecordError(format!(
            "Expected at least 4 box tokens, found {}",
            tokens.len()
        )));
    }

    let coordinate = |index: usize| -> Result<i64, SorrelError> {
        tokens[index]
            .parse::<f64>()
            .map(|value| (value * resize as f64) as i64)
            .map_err(|_| {
                SorrelError::RecordError(format!("Invalid box coordinate: {}", tokens[index]))
            })
    };

    let x_min = coordinate(0)?;
    let y_min = coordinate(1)?;
    let x_max = coordinate(2)?;
    let y_max = coordinate(3)?;

    if x_max <= x_min || y_max <= y_min {
        return Err(SorrelError::BoxError(format!(
            "(x_min, y_min, x_max, y_max): ({}, {}, {}, {})",
            x_min, y_min, x_max, y_max
        )));
    }

    let category_id = match category_override {
        Some(category_id) => category_id,
        None => {
            let token = tokens.get(4).ok_or_else(|| {
                SorrelError::RecordError("Box record is missing a category id".to_string())
            })?;

            token.parse::<u32>().map_err(|_| {
                SorrelError::RecordError(format!("Invalid category id: {}", token))
            })?
        }
    };

    let width = x_max - x_min + 1;
    let height = y_max - y_min + 1;

    Ok(CocoAnnotation {
        area: (width * height) as f64,
        iscrowd: 0,
        bbox: [x_min as f64, y_min as f64, width as f64, height as f64],
        category_id,
        image_id,
        id,
        segmentation: Vec::new(),
    })
}

/// Resolve a category id from the directories enclosing an image
///
/// Tries the grandparent directory name first, then the parent. Listing
/// layouts that sort images into per-class folders carry the class either
/// one or two levels above the file; an unresolvable name is a hard error.
///
/// # Arguments
///
/// * `image_ref` - The image path from the annotation record
/// * `registry` - The job's label vocabulary
///
/// # Examples
///
/// ```
/// use sorrel::coco::LabelRegistry;
/// use sorrel::ex::line::category_from_folder;
///
/// let registry = LabelRegistry::new(["capsicum", "rockmelon"]).unwrap();
///
/// let id = category_from_folder("rockmelon/TRAIN_RGB/img_1.png", &registry);
/// assert_eq!(id.unwrap(), 2);
///
/// let id = category_from_folder("melon/TRAIN_RGB/img_1.png", &registry);
/// assert!(id.is_err());
/// ```
pub fn category_from_folder(
    image_ref: &str,
    registry: &LabelRegistry,
) -> Result<u32, SorrelError> {
    let path = Path::new(image_ref);

    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().to_string());

    let grandparent = path
        .parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().to_string());

    for candidate in [grandparent, parent].into_iter().flatten() {
        if let Some(category_id) = registry.get(&candidate) {
            return Ok(category_id);
        }
    }

    Err(SorrelError::LabelError(format!(
        "No enclosing folder of {} names a known label",
        image_ref
    )))
}
