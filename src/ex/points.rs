// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use crate::coco::CocoAnnotation;
use crate::constant::{MIN_POLYGON_POINTS, SIMPLIFY_TOLERANCE};
use crate::cv::points::{ring_area, ring_bounds, simplify_ring};

/// Extract an annotation from an already-vectorized point list
///
/// Polygon-drawing annotation tools emit vertices directly, so the raster
/// tracing step is bypassed entirely. Fewer than four points cannot form a
/// simplifiable polygon and silently yield no annotation, as does a point
/// list whose simplified ring collapses to zero area. The emitted
/// segmentation keeps the vertices exactly as the tool wrote them; only
/// the bounding box and area are derived from the simplified ring.
///
/// # Arguments
///
/// * `points` - Polygon vertices in (x, y) pixel units
/// * `image_id` - Id of the image the polygon belongs to
/// * `category_id` - Category id for the polygon
/// * `id` - Job-wide annotation id
/// * `iscrowd` - COCO crowd flag
///
/// # Examples
///
/// ```
/// use sorrel::ex::points::from_points;
///
/// let square = [[0., 0.], [0., 4.], [4., 4.], [4., 0.]];
/// let annotation = from_points(&square, 1, 2, 1, 0).unwrap();
///
/// assert_eq!(annotation.bbox, [0.0, 0.0, 4.0, 4.0]);
/// assert_eq!(annotation.area, 16.0);
///
/// let triangle = [[0., 0.], [0., 4.], [4., 4.]];
/// assert!(from_points(&triangle, 1, 2, 1, 0).is_none());
/// ```
pub fn from_points(
    points: &[[f64; 2]],
    image_id: u32,
    category_id: u32,
    id: u32,
    iscrowd: u32,
) -> Option<CocoAnnotation> {
    if points.len() < MIN_POLYGON_POINTS {
        return None;
    }

    let ring = simplify_ring(points, SIMPLIFY_TOLERANCE);
    let area = ring_area(&ring);

    if area == 0.0 {
        return None;
    }

    let bounds = ring_bounds(&ring)?;

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
        segmentation: vec![points.iter().flat_map(|&[x, y]| [x, y]).collect()],
    })
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_three_points_yield_nothing() {
        let triangle = [[0., 0.], [0., 10.], [10., 10.]];
        assert!(from_points(&triangle, 1, 1, 1, 0).is_none());
    }

    #[test]
    fn test_segmentation_keeps_raw_vertices() {
        let jagged = [
            [0., 0.],
            [0., 5.],
            [2.4, 5.2],
            [5., 5.],
            [5., 0.],
            [2.5, 0.1],
        ];

        let annotation = from_points(&jagged, 1, 1, 1, 0).unwrap();

        assert_eq!(annotation.segmentation.len(), 1);
        assert_eq!(annotation.segmentation[0].len(), jagged.len() * 2);
        assert_eq!(annotation.segmentation[0][4], 2.4);
    }

    #[test]
    fn test_collinear_points_yield_nothing() {
        let line = [[0., 0.], [1., 0.], [2., 0.], [3., 0.]];
        assert!(from_points(&line, 1, 1, 1, 0).is_none());
    }
}
