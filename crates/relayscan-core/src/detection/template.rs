//! Template strategy: slide hollow-square windows over the binary page.
//!
//! A window of side `s` scores `(1 - border ink) + halo ink`, where the
//! border is its outermost pixel ring and the halo is the ring just outside
//! it. A perfect isolated box outline scores 0. Windows scoring at most
//! `template_max_score` survive greedy non-maximum suppression.

use super::binarize::{IntegralImage, INK};
use super::{DetectorParams, Region};
use image::GrayImage;

#[derive(Debug, Clone)]
pub struct TemplateMatch {
    pub params: DetectorParams,
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    region: Region,
    score: f32,
}

impl TemplateMatch {
    pub fn new(params: DetectorParams) -> Self {
        TemplateMatch { params }
    }

    pub fn candidates(&self, binary: &GrayImage) -> Vec<Region> {
        let (w, h) = binary.dimensions();
        let ink = IntegralImage::of_ink(binary);
        let min = self.params.min_size.ceil().max(3.0) as u32;
        let max = self.params.max_size.floor() as u32;

        let mut hits = Vec::new();
        for size in min..=max {
            if size > w || size > h {
                break;
            }
            if (size as f32 - 1.0).powi(2) < self.params.min_area {
                continue;
            }
            for y in 0..=h - size {
                for x in 0..=w - size {
                    // The top-left corner of a matching window is always ink.
                    if binary.get_pixel(x, y)[0] != INK {
                        continue;
                    }
                    let score = window_score(&ink, x, y, size);
                    if score <= self.params.template_max_score {
                        hits.push(Hit {
                            region: Region::new(x, y, size, size),
                            score,
                        });
                    }
                }
            }
        }

        suppress_overlaps(hits)
    }
}

fn window_score(ink: &IntegralImage, x: u32, y: u32, size: u32) -> f32 {
    let (x1, y1) = (x + size, y + size);
    let window = ink.sum(x, y, x1, y1);
    let inner = ink.sum(x + 1, y + 1, x1 - 1, y1 - 1);
    let ring_area = u64::from(4 * size - 4);
    let ring = (window - inner) as f32 / ring_area as f32;

    let (hx0, hy0) = (x.saturating_sub(1), y.saturating_sub(1));
    let (hx1, hy1) = ((x1 + 1).min(ink.width()), (y1 + 1).min(ink.height()));
    let outer_area = u64::from(hx1 - hx0) * u64::from(hy1 - hy0);
    let halo_area = outer_area - u64::from(size) * u64::from(size);
    let halo = if halo_area == 0 {
        0.0
    } else {
        (ink.sum(hx0, hy0, hx1, hy1) - window) as f32 / halo_area as f32
    };

    (1.0 - ring) + halo
}

/// Best score first; ties prefer the larger window, then reading order.
fn suppress_overlaps(mut hits: Vec<Hit>) -> Vec<Region> {
    hits.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then(b.region.area().cmp(&a.region.area()))
            .then(a.region.cmp(&b.region))
    });
    let mut kept: Vec<Region> = Vec::new();
    for hit in hits {
        if !kept.iter().any(|k| k.intersects(&hit.region)) {
            kept.push(hit.region);
        }
    }
    kept
}
