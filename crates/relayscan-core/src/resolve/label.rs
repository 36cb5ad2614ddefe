use crate::detection::mask::is_checkbox_glyph;
use crate::extraction::{PageText, WordSpan};
use crate::model::Checkbox;
use crate::profiles::schema::ScanProfile;

/// Words allowed to start slightly left of the box edge, in points.
const LEFT_SLACK_PT: f32 = 1.0;

/// Text printed to the right of a checkbox on the same row.
///
/// `scale` is pixels per point of the raster the boxes were found on. The
/// strip ends at the configured search width or at the next checkbox of the
/// row, whichever is closer. Glyph-only spans are skipped.
pub fn label_right_of(
    cb: &Checkbox,
    row: &[Checkbox],
    page: &PageText,
    profile: &ScanProfile,
    scale: f32,
) -> Option<String> {
    let top = cb.y_px as f32 / scale;
    let bottom = (cb.y_px + cb.height_px) as f32 / scale;
    let reach = (bottom - top) / 2.0;

    let x0 = cb.right_px() as f32 / scale;
    let search_pt = profile.px(profile.labels.search_width_px as f32) / profile.scale();
    let mut x1 = x0 + search_pt;
    for other in row {
        let overlaps = other.y_px < cb.y_px + cb.height_px && cb.y_px < other.y_px + other.height_px;
        if other.x_px > cb.x_px && overlaps {
            x1 = x1.min(other.x_px as f32 / scale);
        }
    }

    let mut words: Vec<&WordSpan> = page
        .words()
        .filter(|w| !is_checkbox_glyph(&w.text))
        .filter(|w| {
            let centre = (w.bbox.y_min + w.bbox.y_max) / 2.0;
            centre >= top - reach && centre <= bottom + reach
        })
        .filter(|w| w.bbox.x_min >= x0 - LEFT_SLACK_PT && w.bbox.x_min < x1)
        .collect();
    words.sort_by(|a, b| a.bbox.x_min.total_cmp(&b.bbox.x_min));

    let joined = words
        .iter()
        .take(profile.labels.max_words)
        .map(|w| w.text.trim())
        .collect::<Vec<_>>()
        .join(" ");
    let label: String = joined.chars().take(profile.labels.max_chars).collect();
    let label = label.trim();
    (!label.is_empty()).then(|| label.to_string())
}
