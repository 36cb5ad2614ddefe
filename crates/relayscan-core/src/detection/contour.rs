//! Contour-density strategy: outer contours of the binary page filtered by
//! size, aspect ratio and enclosed area.

use super::{DetectorParams, Region};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;

#[derive(Debug, Clone)]
pub struct ContourDensity {
    pub params: DetectorParams,
}

impl ContourDensity {
    pub fn new(params: DetectorParams) -> Self {
        ContourDensity { params }
    }

    /// Bounding boxes of outer contours that look like a checkbox border.
    pub fn candidates(&self, binary: &GrayImage) -> Vec<Region> {
        let contours: Vec<Contour<u32>> = find_contours(binary);
        contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .filter_map(|c| {
                let region = bounding_region(&c.points)?;
                if !self.params.fits(region.width, region.height) {
                    return None;
                }
                if polygon_area(&c.points) < self.params.min_area {
                    return None;
                }
                Some(region)
            })
            .collect()
    }
}

fn bounding_region(points: &[Point<u32>]) -> Option<Region> {
    let first = points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Some(Region::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

/// Shoelace area of the traced border.
fn polygon_area(points: &[Point<u32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice += i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y);
    }
    twice.unsigned_abs() as f32 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::binarize::binarize;
    use crate::detection::fixtures::*;
    use crate::profiles::schema::ScanProfile;

    fn strategy() -> ContourDensity {
        ContourDensity::new(DetectorParams::from_profile(&ScanProfile::default()))
    }

    #[test]
    fn test_polygon_area_of_square() {
        let square = [
            Point::new(0u32, 0u32),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(polygon_area(&square), 100.0);
        assert_eq!(polygon_area(&square[..2]), 0.0);
    }

    #[test]
    fn test_outline_found_once() {
        let mut img = blank(100, 100);
        draw_box(&mut img, 30, 30, 18);
        let binary = binarize(&img, 11, 2.0);
        let found = strategy().candidates(&binary);
        assert_eq!(found, vec![Region::new(30, 30, 18, 18)]);
    }

    #[test]
    fn test_small_box_rejected_by_area() {
        // 8 px passes the size filter but encloses only 7 x 7 = 49 square pixels.
        let mut img = blank(60, 60);
        draw_box(&mut img, 20, 20, 8);
        let binary = binarize(&img, 11, 2.0);
        assert!(strategy().candidates(&binary).is_empty());
    }
}
