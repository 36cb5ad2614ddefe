//! Paint text-layer word boxes white before checkbox detection.
//!
//! Letters such as "O" or "0" otherwise pass the geometric
//! filters. Coordinates are converted with the page scale and clamped; spans
//! that fall outside the raster are ignored.

use super::Region;
use crate::extraction::{BBox, PageText};
use crate::profiles::schema::ScanProfile;
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

const BACKGROUND: Luma<u8> = Luma([255]);

/// Glyphs the text layer emits for the boxes themselves.
const CHECKBOX_GLYPHS: &[char] = &['☐', '☑', '☒', '□', '■', '▢', '▣'];

pub fn is_checkbox_glyph(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.chars().all(|c| CHECKBOX_GLYPHS.contains(&c))
}

/// Mask every word of `page` on `image`, returning the painted regions.
///
/// `scale` is pixels per point of `image`. Lines without word boxes are
/// masked by their line box. Returns an empty list when masking is disabled
/// in the profile.
pub fn mask_text(
    image: &mut GrayImage,
    page: &PageText,
    profile: &ScanProfile,
    scale: f32,
) -> Vec<Region> {
    if !profile.masking.enabled {
        return Vec::new();
    }
    let padding = profile.px(profile.masking.padding_px as f32).round() as u32;
    let skip_glyphs = profile.masking.skip_checkbox_glyphs;

    let mut painted = Vec::new();
    for line in &page.lines {
        if line.words.is_empty() {
            if skip_glyphs && is_checkbox_glyph(&line.text) {
                continue;
            }
            painted.extend(paint(image, &line.bbox, scale, padding));
            continue;
        }
        for word in &line.words {
            if skip_glyphs && is_checkbox_glyph(&word.text) {
                continue;
            }
            painted.extend(paint(image, &word.bbox, scale, padding));
        }
    }

    tracing::debug!(
        page = page.page_number,
        spans = painted.len(),
        "masked text spans"
    );
    painted
}

/// Pixel region covered by `bbox` plus `padding`, clamped to `width × height`.
pub fn to_pixel_region(
    bbox: &BBox,
    scale: f32,
    padding: u32,
    width: u32,
    height: u32,
) -> Option<Region> {
    if !(bbox.x_min.is_finite()
        && bbox.y_min.is_finite()
        && bbox.x_max.is_finite()
        && bbox.y_max.is_finite())
    {
        return None;
    }
    let pad = padding as f32;
    let x0 = ((bbox.x_min * scale).floor() - pad).max(0.0);
    let y0 = ((bbox.y_min * scale).floor() - pad).max(0.0);
    let x1 = ((bbox.x_max * scale).ceil() + pad).min(width as f32);
    let y1 = ((bbox.y_max * scale).ceil() + pad).min(height as f32);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let (x0, y0) = (x0 as u32, y0 as u32);
    Some(Region::new(x0, y0, x1 as u32 - x0, y1 as u32 - y0))
}

fn paint(image: &mut GrayImage, bbox: &BBox, scale: f32, padding: u32) -> Option<Region> {
    let (w, h) = image.dimensions();
    let region = to_pixel_region(bbox, scale, padding, w, h)?;
    let rect = Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);
    draw_filled_rect_mut(image, rect, BACKGROUND);
    Some(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::fixtures::*;
    use crate::detection::DetectionStrategy;
    use crate::extraction::{TextLine, WordSpan};

    fn page_with_words(words: &[(&str, BBox)]) -> PageText {
        PageText {
            page_number: 1,
            width_pt: 100.0,
            height_pt: 100.0,
            lines: vec![TextLine {
                line_index: 0,
                text: words.iter().map(|(t, _)| *t).collect::<Vec<_>>().join(" "),
                bbox: BBox::new(0.0, 0.0, 100.0, 20.0),
                words: words
                    .iter()
                    .map(|(t, b)| WordSpan {
                        text: t.to_string(),
                        bbox: *b,
                    })
                    .collect(),
            }],
        }
    }

    // At 300 DPI, 9..14 pt plus padding covers pixels 36..60.
    fn glyph_bbox() -> BBox {
        BBox::new(9.0, 9.0, 14.0, 14.0)
    }

    #[test]
    fn test_pixel_region_scaling_and_clamping() {
        let bbox = BBox::new(10.0, 10.0, 20.0, 14.0);
        assert_eq!(
            to_pixel_region(&bbox, 2.0, 1, 100, 100),
            Some(Region::new(19, 19, 22, 10))
        );
        let off_page = BBox::new(-30.0, -30.0, -10.0, -10.0);
        assert_eq!(to_pixel_region(&off_page, 1.0, 0, 100, 100), None);
        let partial = BBox::new(95.0, 95.0, 120.0, 120.0);
        assert_eq!(
            to_pixel_region(&partial, 1.0, 0, 100, 100),
            Some(Region::new(95, 95, 5, 5))
        );
        let degenerate = BBox::new(10.0, 10.0, 10.0, 10.0);
        assert_eq!(to_pixel_region(&degenerate, 1.0, 0, 100, 100), None);
    }

    #[test]
    fn test_masked_glyph_is_not_detected() {
        // A 15 x 15 "O"-like glyph inside a text span.
        let mut img = blank(100, 100);
        draw_box(&mut img, 40, 40, 15);
        let page = page_with_words(&[("O", glyph_bbox())]);
        let profile = ScanProfile::default();
        let strategy = DetectionStrategy::from_profile(&profile);

        assert_eq!(strategy.detect(&img, 1, &[]).len(), 1);

        let masked = mask_text(&mut img, &page, &profile, profile.scale());
        assert_eq!(masked.len(), 1);
        assert!(img.get_pixel(40, 40)[0] == 255);
        assert!(strategy.detect(&img, 1, &masked).is_empty());
    }

    #[test]
    fn test_checkbox_glyph_spans_left_alone() {
        let mut img = blank(100, 100);
        draw_box(&mut img, 40, 40, 15);
        let page = page_with_words(&[("☐", glyph_bbox())]);
        let profile = ScanProfile::default();
        let masked = mask_text(&mut img, &page, &profile, profile.scale());
        assert!(masked.is_empty());
        assert_eq!(img.get_pixel(40, 40)[0], 0);
    }

    #[test]
    fn test_disabled_masking() {
        let mut img = blank(100, 100);
        draw_box(&mut img, 40, 40, 15);
        let page = page_with_words(&[("O", glyph_bbox())]);
        let mut profile = ScanProfile::default();
        profile.masking.enabled = false;
        assert!(mask_text(&mut img, &page, &profile, profile.scale()).is_empty());
        assert_eq!(img.get_pixel(40, 40)[0], 0);
    }

    #[test]
    fn test_mask_follows_raster_scale() {
        // Rendered at 144 DPI although the profile asks for 300.
        let mut img = blank(100, 100);
        draw_box(&mut img, 19, 19, 8);
        let page = page_with_words(&[("O", glyph_bbox())]);
        let profile = ScanProfile::default();

        let masked = mask_text(&mut img, &page, &profile, 2.0);
        assert_eq!(masked.len(), 1);
        assert!(masked[0].x <= 19 && masked[0].x + masked[0].width >= 27);
        assert_eq!(img.get_pixel(19, 19)[0], 255);
        assert_eq!(img.get_pixel(26, 26)[0], 255);
    }

    #[test]
    fn test_checkbox_glyph_detection() {
        assert!(is_checkbox_glyph("☐"));
        assert!(is_checkbox_glyph(" ☒☐ "));
        assert!(!is_checkbox_glyph("O"));
        assert!(!is_checkbox_glyph(""));
    }
}
