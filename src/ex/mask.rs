// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use crate::coco::CocoAnnotation;
use crate::constant::SIMPLIFY_TOLERANCE;
use crate::cv::points::{ring_area, ring_bounds, simplify_ring};
use crate::im::SubMask;

/// Extract one merged annotation from a sub-mask
///
/// Every island of the color is traced and simplified, and the islands are
/// combined into a single record: the bounding box is the union of all
/// contour bounds and the area is the total polygon area. A color whose
/// simplified rings all collapse to zero area yields no annotation.
///
/// # Arguments
///
/// * `sub_mask` - The binary raster for one mask color
/// * `image_id` - Id of the image the mask belongs to
/// * `category_id` - Category id for every region of this color
/// * `id` - Job-wide annotation id
/// * `iscrowd` - COCO crowd flag for the merged record
pub fn merged_annotation(
    sub_mask: &SubMask,
    image_id: u32,
    category_id: u32,
    id: u32,
    iscrowd: u32,
) -> Option<CocoAnnotation> {
    let mut segmentations = Vec::new();
    let mut bounds: Option<[f64; 4]> = None;
    let mut area = 0.0;

    for contour in sub_mask.contours() {
        let ring = simplify_ring(&contour, SIMPLIFY_TOLERANCE);

        let Some(ring_b) = ring_bounds(&ring) else {
            continue;
        };

        bounds = Some(match bounds {
            Some(merged) => [
                merged[0].min(ring_b[0]),
                merged[1].min(ring_b[1]),
                merged[2].max(ring_b[2]),
                merged[3].max(ring_b[3]),
            ],
            None => ring_b,
        });

        area += ring_area(&ring);
        segmentations.push(flatten(&ring));
    }

    let bounds = bounds?;

    if area == 0.0 {
        return None;
    }

    Some(CocoAnnotation {
        area,
        iscrowd,
        bbox: [
            bounds[0],
            bounds[1],
            bounds[2] - bounds[0],
            bounds[3] - bounds[1],
        ],
        category_id,
        image_id,
        id,
        segmentation: segmentations,
    })
}

/// Extract one annotation per island of a sub-mask
///
/// Each traced contour becomes its own independent record with ids
/// assigned sequentially from `first_id`. Islands whose simplified ring
/// has zero area are dropped as degenerate noise rather than errors, and
/// consume no id.
///
/// # Arguments
///
/// * `sub_mask` - The binary raster for one mask color
/// * `image_id` - Id of the image the mask belongs to
/// * `category_id` - Category id for every region of this color
/// * `first_id` - Job-wide annotation id of the first emitted record
/// * `iscrowd` - COCO crowd flag for each record
pub fn instance_annotations(
    sub_mask: &SubMask,
    image_id: u32,
    category_id: u32,
    first_id: u32,
    iscrowd: u32,
) -> Vec<CocoAnnotation> {
    let mut annotations = Vec::new();

    for contour in sub_mask.contours() {
        let ring = simplify_ring(&contour, SIMPLIFY_TOLERANCE);
        let area = ring_area(&ring);

        if area == 0.0 {
            continue;
        }

        let Some(bounds) = ring_bounds(&ring) else {
            continue;
        };

        annotations.push(CocoAnnotation {
            area,
            iscrowd,
            bbox: [
                bounds[0],
                bounds[1],
                bounds[2] - bounds[0],
                bounds[3] - bounds[1],
            ],
            category_id,
            image_id,
            id: first_id + annotations.len() as u32,
            segmentation: vec![flatten(&ring)],
        });
    }

    annotations
}

fn flatten(ring: &[[f64; 2]]) -> Vec<f64> {
    ring.iter().flat_map(|&[x, y]| [x, y]).collect()
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::im::ColorMask;
    use image::{Rgb, RgbImage};

    fn two_island_mask() -> ColorMask {
        let mut mask = RgbImage::new(12, 12);

        for y in 1..4 {
            for x in 1..4 {
                mask.put_pixel(x, y, Rgb([200, 0, 0]));
            }
        }

        for y in 7..11 {
            for x in 7..11 {
                mask.put_pixel(x, y, Rgb([200, 0, 0]));
            }
        }

        ColorMask::from_rgb8(mask)
    }

    #[test]
    fn test_per_instance_yields_two_records() {
        let sub_masks = two_island_mask().sub_masks();
        assert_eq!(sub_masks.len(), 1);

        let annotations = instance_annotations(&sub_masks[0], 1, 3, 10, 0);

        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].id, 10);
        assert_eq!(annotations[1].id, 11);
        assert!(annotations.iter().all(|a| a.category_id == 3));
        assert!(annotations.iter().all(|a| a.area > 0.0));
        assert!(annotations.iter().all(|a| a.segmentation.len() == 1));
    }

    #[test]
    fn test_merged_yields_union_record() {
        let sub_masks = two_island_mask().sub_masks();

        let merged = merged_annotation(&sub_masks[0], 1, 3, 10, 0).unwrap();

        // Union of both island bounding boxes
        assert_eq!(merged.bbox, [1.0, 1.0, 9.0, 9.0]);
        assert_eq!(merged.segmentation.len(), 2);

        let instances = instance_annotations(&sub_masks[0], 1, 3, 10, 0);
        let split_area: f64 = instances.iter().map(|a| a.area).sum();
        assert_eq!(merged.area, split_area);
    }

    #[test]
    fn test_zero_area_islands_dropped() {
        let mut mask = RgbImage::new(6, 6);
        mask.put_pixel(2, 2, Rgb([0, 0, 200]));

        let sub_masks = ColorMask::from_rgb8(mask).sub_masks();

        let annotations = instance_annotations(&sub_masks[0], 1, 1, 1, 0);
        assert!(annotations.is_empty());

        let merged = merged_annotation(&sub_masks[0], 1, 1, 1, 0);
        assert!(merged.is_none());
    }

    #[test]
    fn test_iscrowd_propagates() {
        let sub_masks = two_island_mask().sub_masks();

        let merged = merged_annotation(&sub_masks[0], 1, 1, 1, 1).unwrap();
        assert_eq!(merged.iscrowd, 1);
    }
}
