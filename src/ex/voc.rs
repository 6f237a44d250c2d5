// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::HashMap;

use crate::coco::{CocoAnnotation, LabelRegistry};
use crate::error::SorrelError;

/// Extract a box annotation from a VOC-style `<object>` node
///
/// The label is taken from a `subname` child when one is present, falling
/// back to `name` with an optional remap applied. Objects whose resolved
/// label is outside the vocabulary are dropped silently (`Ok(None)`) so a
/// partially-labeled source set converts without aborting; this is the one
/// deliberate asymmetry with the folder-derived labels of the line-record
/// path, which hard-fail instead.
///
/// The emitted box inset-corrects the corner by one pixel and uses the
/// exclusive convention (`width = xmax - xmin` on the values as given).
///
/// # Arguments
///
/// * `object` - An `<object>` element
/// * `registry` - The job's label vocabulary
/// * `name_remap` - Optional source-name to vocabulary-name mapping
/// * `image_id` - Id of the image this object belongs to
/// * `id` - Job-wide annotation id
///
/// # Examples
///
/// ```
/// use sorrel::coco::LabelRegistry;
/// use sorrel::ex::voc::from_object;
///
/// let registry = LabelRegistry::new(["leaf"]).unwrap();
///
/// let xml = "<object><name>leaf</name><bndbox>\
///     <xmin>10</xmin><ymin>10</ymin><xmax>50</xmax><ymax>50</ymax>\
///     </bndbox></object>";
///
/// let document = roxmltree::Document::parse(xml).unwrap();
///
/// let annotation = from_object(document.root_element(), &registry, None, 1, 1)
///     .unwrap()
///     .unwrap();
///
/// assert_eq!(annotation.bbox, [9.0, 9.0, 40.0, 40.0]);
/// assert_eq!(annotation.category_id, 1);
/// ```
pub fn from_object(
    object: roxmltree::Node,
    registry: &LabelRegistry,
    name_remap: Option<&HashMap<String, String>>,
    image_id: u32,
    id: u32,
) -> Result<Option<CocoAnnotation>, SorrelError> {
    let label = match child_text(object, "subname") {
        Some(subname) => subname.to_string(),
        None => {
            let Some(name) = child_text(object, "name") else {
                return Ok(None);
            };

            match name_remap.and_then(|remap| remap.get(name)) {
                Some(renamed) => renamed.clone(),
                None => name.to_string(),
            }
        }
    };

    let Some(category_id) = registry.get(&label) else {
        return Ok(None);
    };

    let bndbox = object
        .descendants()
        .find(|node| node.has_tag_name("bndbox") || node.has_tag_name("bbox"));

    let Some(bndbox) = bndbox else {
        return Ok(None);
    };

    let corner = |tag: &str| -> Result<i64, SorrelError> {
        child_text(bndbox, tag)
            .and_then(|text| text.parse::<f64>().ok())
            .map(|value| value as i64)
            .ok_or_else(|| SorrelError::XmlError(format!("Missing or invalid <{}> value", tag)))
    };

    let x_min = corner("xmin")?;
    let y_min = corner("ymin")?;
    let x_max = corner("xmax")?;
    let y_max = corner("ymax")?;

    if x_max <= x_min || y_max <= y_min {
        return Err(SorrelError::BoxError(format!(
            "(x_min, y_min, x_max, y_max): ({}, {}, {}, {})",
            x_min, y_min, x_max, y_max
        )));
    }

    let width = x_max - x_min;
    let height = y_max - y_min;

    Ok(Some(CocoAnnotation {
        area: (width * height) as f64,
        iscrowd: 0,
        bbox: [
            (x_min - 1) as f64,
            (y_min - 1) as f64,
            width as f64,
            height as f64,
        ],
        category_id,
        image_id,
        id,
        segmentation: Vec::new(),
    }))
}

fn child_text<'a>(node: roxmltree::Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.descendants()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
