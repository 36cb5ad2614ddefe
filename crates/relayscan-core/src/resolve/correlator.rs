use crate::model::{
    Checkbox, CorrelationGroup, CorrelationRegime, ParameterLine, UnattributedCheckbox,
};
use crate::profiles::schema::CorrelationConfig;
use serde::{Deserialize, Serialize};

/// A logical record: a head line plus the multi-part lines continuing it.
///
/// Indices point into the page's parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub head: usize,
    pub members: Vec<usize>,
}

/// Correlation result for one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageCorrelation {
    pub sections: Vec<Section>,
    /// One group per section that received at least one checkbox, in line order.
    pub groups: Vec<CorrelationGroup>,
    pub unattributed: Vec<UnattributedCheckbox>,
}

impl PageCorrelation {
    pub fn attributed_count(&self) -> usize {
        self.groups.iter().map(|g| g.checkboxes.len()).sum()
    }

    pub fn group_for(&self, head: usize) -> Option<&CorrelationGroup> {
        self.groups.iter().find(|g| g.line_index == head)
    }
}

/// Fold parameter lines into sections.
///
/// A line continues the open section when it is a later part of the head's
/// multi-part base name; every other line opens a new section.
pub fn build_sections(lines: &[ParameterLine]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let continues = sections.last().is_some_and(|open| {
            lines[open.head]
                .multipart
                .as_ref()
                .is_some_and(|mp| line.continues(&mp.base_name))
        });
        match sections.last_mut() {
            Some(open) if continues => open.members.push(idx),
            _ => sections.push(Section {
                head: idx,
                members: vec![idx],
            }),
        }
    }
    sections
}

struct Nearest {
    line: usize,
    distance: f32,
}

/// Attribute each checkbox of a page to the section of its nearest preceding line.
///
/// `lines` and `checkboxes` must belong to the same page. Every checkbox
/// ends up in exactly one group or in `unattributed`.
pub fn correlate(
    lines: &[ParameterLine],
    checkboxes: &[Checkbox],
    scale: f32,
    config: &CorrelationConfig,
) -> PageCorrelation {
    let sections = build_sections(lines);
    let mut section_of = vec![0usize; lines.len()];
    for (s, section) in sections.iter().enumerate() {
        for &m in &section.members {
            section_of[m] = s;
        }
    }

    let nearest: Vec<Option<Nearest>> = checkboxes
        .iter()
        .map(|cb| nearest_line(lines, cb, scale, config.row_slack_pt))
        .collect();

    // Tight attributions settle before any wide one is considered.
    let mut assigned: Vec<Option<(usize, CorrelationRegime)>> = vec![None; checkboxes.len()];
    let mut owns_tight = vec![false; sections.len()];
    for (i, n) in nearest.iter().enumerate() {
        if let Some(n) = n {
            if n.distance <= config.tight_tolerance_pt {
                let s = section_of[n.line];
                assigned[i] = Some((s, CorrelationRegime::Tight));
                owns_tight[s] = true;
            }
        }
    }
    for (i, n) in nearest.iter().enumerate() {
        if assigned[i].is_some() {
            continue;
        }
        if let Some(n) = n {
            let s = section_of[n.line];
            if n.distance <= config.wide_tolerance_pt
                && is_composite(lines, &sections[s], owns_tight[s])
            {
                assigned[i] = Some((s, CorrelationRegime::Wide));
            }
        }
    }

    let mut per_section: Vec<Vec<(usize, CorrelationRegime)>> = vec![Vec::new(); sections.len()];
    let mut unattributed = Vec::new();
    for (i, cb) in checkboxes.iter().enumerate() {
        match assigned[i] {
            Some((s, regime)) => per_section[s].push((i, regime)),
            None => {
                let n = nearest[i].as_ref();
                tracing::warn!(
                    page = cb.page,
                    x_px = cb.x_px,
                    y_px = cb.y_px,
                    nearest = n.map(|n| lines[n.line].code.as_str()),
                    distance_pt = n.map(|n| n.distance),
                    "checkbox not attributed to any parameter"
                );
                unattributed.push(UnattributedCheckbox {
                    checkbox: cb.clone(),
                    nearest_code: n.map(|n| lines[n.line].code.clone()),
                    nearest_distance_pt: n.map(|n| n.distance),
                });
            }
        }
    }

    let groups = sections
        .iter()
        .zip(per_section)
        .filter(|(_, members)| !members.is_empty())
        .map(|(section, members)| {
            let regime = if members.iter().any(|(_, r)| *r == CorrelationRegime::Wide) {
                CorrelationRegime::Wide
            } else {
                CorrelationRegime::Tight
            };
            CorrelationGroup {
                code: lines[section.head].code.clone(),
                line_index: section.head,
                regime,
                checkboxes: members.iter().map(|(i, _)| checkboxes[*i].clone()).collect(),
            }
        })
        .collect();

    PageCorrelation {
        sections,
        groups,
        unattributed,
    }
}

/// Sections that head a run of sub-item checkboxes may reach further down.
fn is_composite(lines: &[ParameterLine], section: &Section, owns_tight: bool) -> bool {
    let head = &lines[section.head];
    !head.has_value() || head.multipart.is_some() || section.members.len() > 1 || owns_tight
}

/// Closest line starting at or above the checkbox centre (plus slack).
///
/// Ties break on horizontal distance, then on line order.
fn nearest_line(
    lines: &[ParameterLine],
    cb: &Checkbox,
    scale: f32,
    row_slack_pt: f32,
) -> Option<Nearest> {
    let cb_y = cb.y_point(scale);
    let cb_x = cb.x_point(scale);
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.page == cb.page && l.y_point <= cb_y + row_slack_pt)
        .map(|(i, l)| {
            let dy = (cb_y - l.y_point).abs();
            let dx = (cb_x - l.x_point).abs();
            (i, dy, dx)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)).then(a.0.cmp(&b.0)))
        .map(|(line, distance, _)| Nearest { line, distance })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::PageText;
    use crate::model::VendorFamily;
    use crate::parsing::multipart::parse_multipart;
    use crate::profiles::schema::ScanProfile;
    use crate::resolve::resolver::{merge_records, resolve};

    // Scale 1.0 keeps pixel and point coordinates identical.
    const SCALE: f32 = 1.0;

    fn line(idx: usize, code: &str, description: &str, value: &str, y: f32) -> ParameterLine {
        ParameterLine {
            code: code.into(),
            description: description.into(),
            raw_value: value.into(),
            y_point: y,
            x_point: 50.0,
            page: 1,
            vendor_family: VendorFamily::HexCode,
            line_index: idx,
            multipart: parse_multipart(description),
            value: None,
        }
    }

    /// A 10 x 10 box whose centre is at `y_centre`.
    fn checkbox(x: u32, y_centre: u32, marked: bool) -> Checkbox {
        Checkbox {
            x_px: x,
            y_px: y_centre - 5,
            width_px: 10,
            height_px: 10,
            density: if marked { 0.55 } else { 0.02 },
            is_marked: marked,
            ambiguous: false,
            page: 1,
        }
    }

    fn config() -> CorrelationConfig {
        CorrelationConfig::default()
    }

    #[test]
    fn test_sections_fold_multipart_runs() {
        let lines = vec![
            line(0, "0150", "Binary input part 1", "", 100.0),
            line(1, "0151", "Binary input part 2", "", 112.0),
            line(2, "0152", "Binary input part 3", "", 124.0),
            line(3, "0162", "Rated frequency", "60Hz", 136.0),
            line(4, "0163", "Binary input part 2", "", 148.0),
        ];
        let sections = build_sections(&lines);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].members, vec![0, 1, 2]);
        assert_eq!(sections[1].head, 3);
        // the stray part correlates on its own and joins its record afterwards
        assert_eq!(sections[2].members, vec![4]);

        let page = PageText {
            page_number: 1,
            width_pt: 595.0,
            height_pt: 842.0,
            lines: Vec::new(),
        };
        let correlation = correlate(&lines, &[], SCALE, &config());
        let records = resolve(&lines, &correlation, &page, &[], &ScanProfile::default(), SCALE);
        let merged = merge_records(records);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].member_codes, vec!["0150", "0151", "0152", "0163"]);
    }

    #[test]
    fn test_composite_head_collects_wide_run() {
        let lines = vec![line(0, "0150", "Binary inputs", "", 300.0)];
        let boxes = vec![
            checkbox(400, 305, true),
            checkbox(400, 312, false),
            checkbox(400, 340, true),
        ];
        let result = correlate(&lines, &boxes, SCALE, &config());
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].checkboxes.len(), 3);
        assert_eq!(result.groups[0].regime, CorrelationRegime::Wide);
        assert!(result.unattributed.is_empty());
    }

    #[test]
    fn test_single_valued_head_stays_tight() {
        let lines = vec![line(0, "0162", "Rated frequency", "60Hz", 300.0)];
        let boxes = vec![checkbox(400, 330, true)];
        let result = correlate(&lines, &boxes, SCALE, &config());
        assert!(result.groups.is_empty());
        assert_eq!(result.unattributed.len(), 1);
        assert_eq!(result.unattributed[0].nearest_code.as_deref(), Some("0162"));
        assert_eq!(result.unattributed[0].nearest_distance_pt, Some(30.0));
    }

    #[test]
    fn test_valued_head_with_tight_box_becomes_composite() {
        let lines = vec![line(0, "0162", "Trip outputs", "K1", 300.0)];
        let boxes = vec![checkbox(400, 304, true), checkbox(400, 330, false)];
        let result = correlate(&lines, &boxes, SCALE, &config());
        assert_eq!(result.groups[0].checkboxes.len(), 2);
    }

    #[test]
    fn test_far_checkbox_unattributed() {
        let lines = vec![line(0, "0150", "Binary inputs", "", 300.0)];
        let boxes = vec![checkbox(400, 420, true)];
        let result = correlate(&lines, &boxes, SCALE, &config());
        assert!(result.groups.is_empty());
        assert_eq!(result.unattributed.len(), 1);
    }

    #[test]
    fn test_checkbox_above_every_line_unattributed() {
        let lines = vec![line(0, "0150", "Binary inputs", "", 300.0)];
        let boxes = vec![checkbox(400, 200, true)];
        let result = correlate(&lines, &boxes, SCALE, &config());
        assert_eq!(result.unattributed.len(), 1);
        assert!(result.unattributed[0].nearest_code.is_none());
    }

    #[test]
    fn test_nearest_preceding_line_wins() {
        let lines = vec![
            line(0, "0150", "Binary inputs", "", 300.0),
            line(1, "0160", "Output relays", "", 320.0),
        ];
        let boxes = vec![checkbox(400, 306, true), checkbox(400, 325, true)];
        let result = correlate(&lines, &boxes, SCALE, &config());
        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.groups[0].code, "0150");
        assert_eq!(result.groups[1].code, "0160");
        assert_eq!(result.groups[1].line_index, 1);
    }

    #[test]
    fn test_row_slack_admits_line_just_below_centre() {
        let lines = vec![line(0, "0150", "Binary inputs", "", 301.5)];
        let boxes = vec![checkbox(400, 300, true)];
        let result = correlate(&lines, &boxes, SCALE, &config());
        assert_eq!(result.attributed_count(), 1);
    }

    #[test]
    fn test_continuation_part_routes_to_head() {
        let lines = vec![
            line(0, "0150", "Binary input part 1", "", 300.0),
            line(1, "0151", "Binary input part 2", "", 340.0),
        ];
        let boxes = vec![checkbox(400, 303, true), checkbox(400, 343, false)];
        let result = correlate(&lines, &boxes, SCALE, &config());
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].code, "0150");
        assert_eq!(result.groups[0].checkboxes.len(), 2);
    }

    #[test]
    fn test_equal_distance_breaks_on_horizontal() {
        let mut left = line(0, "0150", "Binary inputs", "", 300.0);
        left.x_point = 10.0;
        let mut right = line(1, "0160", "Output relays", "", 300.0);
        right.x_point = 380.0;
        let boxes = vec![checkbox(400, 303, true)];
        let result = correlate(&[left, right], &boxes, SCALE, &config());
        assert_eq!(result.groups[0].code, "0160");
    }

    #[test]
    fn test_accounting() {
        let lines = vec![
            line(0, "0150", "Binary inputs", "", 300.0),
            line(1, "0162", "Rated frequency", "60Hz", 500.0),
        ];
        let boxes = vec![
            checkbox(400, 100, false),
            checkbox(400, 305, true),
            checkbox(400, 330, true),
            checkbox(400, 503, true),
            checkbox(400, 600, false),
        ];
        let result = correlate(&lines, &boxes, SCALE, &config());
        assert_eq!(
            result.attributed_count() + result.unattributed.len(),
            boxes.len()
        );
        assert_eq!(result.unattributed.len(), 2);
    }
}
