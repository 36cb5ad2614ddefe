use crate::error::RelayScanError;
use crate::extraction::{BBox, PageText, TextLayer, TextLine, WordSpan};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Write;
use std::process::Command;

/// Text layer backend using pdftotext (from poppler-utils).
///
/// Uses `pdftotext -bbox-layout` so every word carries its box in points.
pub struct PdftotextLayer;

impl PdftotextLayer {
    pub fn new() -> Self {
        PdftotextLayer
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayer for PdftotextLayer {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, RelayScanError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| RelayScanError::TextLayer(e.to_string()))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| RelayScanError::TextLayer(e.to_string()))?;

        let output = Command::new("pdftotext")
            .arg("-bbox-layout")
            .arg(tmpfile.path())
            .arg("-")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RelayScanError::PdftotextNotFound
                } else {
                    RelayScanError::TextLayer(format!("pdftotext -bbox-layout failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(RelayScanError::ToolFailed {
                tool: "pdftotext",
                code,
                stderr,
            });
        }

        let xml = String::from_utf8_lossy(&output.stdout);
        let pages = parse_bbox_xml(&xml)?;
        tracing::debug!(pages = pages.len(), "extracted text layer");
        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

struct OpenLine {
    bbox: BBox,
    words: Vec<WordSpan>,
}

/// Parse `pdftotext -bbox-layout` XHTML into per-page text layers.
pub fn parse_bbox_xml(xml: &str) -> Result<Vec<PageText>, RelayScanError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pages = Vec::new();
    let mut page: Option<PageText> = None;
    let mut line: Option<OpenLine> = None;
    let mut word: Option<(BBox, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => page = Some(open_page(&e, pages.len() + 1)),
                b"line" => {
                    line = parse_bbox(&e).map(|bbox| OpenLine {
                        bbox,
                        words: Vec::new(),
                    })
                }
                b"word" => word = parse_bbox(&e).map(|bbox| (bbox, String::new())),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"page" => {
                pages.push(open_page(&e, pages.len() + 1));
            }
            Ok(Event::Text(t)) => {
                if let Some((_, text)) = word.as_mut() {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| RelayScanError::TextLayer(format!("bad word text: {e}")))?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"word" => {
                    if let (Some((bbox, text)), Some(open)) = (word.take(), line.as_mut()) {
                        let text = text.trim().to_string();
                        if !text.is_empty() {
                            open.words.push(WordSpan { text, bbox });
                        }
                    }
                }
                b"line" => {
                    if let (Some(open), Some(p)) = (line.take(), page.as_mut()) {
                        if !open.words.is_empty() {
                            let text = open
                                .words
                                .iter()
                                .map(|w| w.text.as_str())
                                .collect::<Vec<_>>()
                                .join(" ");
                            p.lines.push(TextLine {
                                line_index: p.lines.len(),
                                text,
                                bbox: open.bbox,
                                words: open.words,
                            });
                        }
                    }
                }
                b"page" => {
                    if let Some(p) = page.take() {
                        pages.push(p);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(RelayScanError::TextLayer(format!(
                    "malformed bbox layout at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(pages)
}

fn open_page(tag: &BytesStart<'_>, fallback_number: usize) -> PageText {
    PageText {
        page_number: attr_f32(tag, b"number")
            .map(|n| n as usize)
            .unwrap_or(fallback_number),
        width_pt: attr_f32(tag, b"width").unwrap_or(0.0),
        height_pt: attr_f32(tag, b"height").unwrap_or(0.0),
        lines: Vec::new(),
    }
}

fn parse_bbox(tag: &BytesStart<'_>) -> Option<BBox> {
    Some(BBox {
        x_min: attr_f32(tag, b"xMin")?,
        y_min: attr_f32(tag, b"yMin")?,
        x_max: attr_f32(tag, b"xMax")?,
        y_max: attr_f32(tag, b"yMax")?,
    })
}

fn attr_f32(tag: &BytesStart<'_>, name: &[u8]) -> Option<f32> {
    tag.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| std::str::from_utf8(a.value.as_ref()).ok()?.trim().parse().ok())
}
