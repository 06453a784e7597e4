//! Template Renderer — lays a `CvDocument` out as a flat visual tree.
//!
//! The output is a `RenderedRegion`: a fixed-width canvas description whose
//! height grows to fit the content. The renderer knows nothing about pages;
//! pagination happens later on the captured raster.
//!
//! Rendering is a pure function of `(CvDocument, Theme)`. No clock, no
//! randomness, no hash-ordered iteration.

use std::str::FromStr;

use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::{line_height, measure_str, wrap_paragraphs, wrap_text};
use crate::layout::page::template_width_px;
use crate::models::CvDocument;

// ────────────────────────────────────────────────────────────────────────────
// Visual tree
// ────────────────────────────────────────────────────────────────────────────

/// A single drawing instruction in CSS px, origin top-left.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VisualNode {
    /// One line of already-wrapped text. `y` is the top of the glyph cells.
    Text {
        x: u32,
        y: u32,
        dot: u32,
        color: Rgb<u8>,
        bold: bool,
        text: String,
    },
    /// A filled rectangle (section rules, accent bars).
    Rule {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        color: Rgb<u8>,
    },
}

/// The laid-out template, ready for capture.
///
/// A region with zero width or height has not been laid out and cannot be
/// captured.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderedRegion {
    pub width: u32,
    pub height: u32,
    pub background: Rgb<u8>,
    pub nodes: Vec<VisualNode>,
}

impl RenderedRegion {
    pub fn is_laid_out(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Themes
// ────────────────────────────────────────────────────────────────────────────

/// Colour scheme of the template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Black headings, grey rules.
    #[default]
    Classic,
    /// Blue headings and rules.
    Modern,
}

impl Theme {
    fn palette(self) -> Palette {
        match self {
            Theme::Classic => Palette {
                text: Rgb([17, 17, 17]),
                muted: Rgb([96, 96, 96]),
                heading: Rgb([17, 17, 17]),
                rule: Rgb([160, 160, 160]),
            },
            Theme::Modern => Palette {
                text: Rgb([28, 28, 36]),
                muted: Rgb([90, 98, 112]),
                heading: Rgb([31, 78, 161]),
                rule: Rgb([31, 78, 161]),
            },
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(Theme::Classic),
            "modern" => Ok(Theme::Modern),
            other => Err(format!("unknown theme '{other}' (expected classic or modern)")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    text: Rgb<u8>,
    muted: Rgb<u8>,
    heading: Rgb<u8>,
    rule: Rgb<u8>,
}

// ────────────────────────────────────────────────────────────────────────────
// Layout constants (CSS px)
// ────────────────────────────────────────────────────────────────────────────

const MARGIN_X: u32 = 48;
const MARGIN_TOP: u32 = 48;
const MARGIN_BOTTOM: u32 = 48;

const NAME_DOT: u32 = 4;
const HEADING_DOT: u32 = 3;
const BODY_DOT: u32 = 2;

const SECTION_GAP: u32 = 18;
const ENTRY_GAP: u32 = 10;
const RULE_GAP: u32 = 6;
const DATE_GUTTER: u32 = 24;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

// ────────────────────────────────────────────────────────────────────────────
// Renderer
// ────────────────────────────────────────────────────────────────────────────

/// Lays out the whole document. Never fails: an empty document yields a blank
/// region made of the page margins.
pub fn render_template(doc: &CvDocument, theme: Theme) -> RenderedRegion {
    let mut builder = RegionBuilder::new(template_width_px(), theme.palette());

    builder.header(doc);
    builder.text_section("Summary", &doc.summary);

    if !doc.experience.is_empty() {
        builder.section_heading("Experience");
        for entry in &doc.experience {
            builder.entry(&entry.heading(), entry.dates().as_deref(), &entry.description);
        }
    }

    if !doc.education.is_empty() {
        builder.section_heading("Education");
        for entry in &doc.education {
            builder.entry(&entry.heading(), entry.dates().as_deref(), &entry.description);
        }
    }

    let skills: Vec<&str> = doc
        .skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !skills.is_empty() {
        builder.text_section("Skills", &skills.join(" · "));
    }

    builder.text_section("Projects", &doc.projects);
    builder.text_section("Certifications", &doc.certifications);
    builder.text_section("Languages", &doc.languages);
    builder.text_section("Activities", &doc.activities);
    builder.text_section("Additional Information", &doc.additional_info);

    let custom: Vec<_> = doc
        .custom_fields
        .iter()
        .filter(|f| !f.label.trim().is_empty() || !f.value.trim().is_empty())
        .collect();
    if !custom.is_empty() {
        builder.section_gap();
        for field in custom {
            builder.labelled_line(field.label.trim(), field.value.trim());
        }
    }

    builder.finish()
}

/// Accumulates nodes while tracking the vertical cursor.
struct RegionBuilder {
    width: u32,
    cursor_y: u32,
    palette: Palette,
    nodes: Vec<VisualNode>,
    /// True once anything has been placed; suppresses the gap before the first block.
    has_content: bool,
}

impl RegionBuilder {
    fn new(width: u32, palette: Palette) -> Self {
        Self {
            width,
            cursor_y: MARGIN_TOP,
            palette,
            nodes: Vec::new(),
            has_content: false,
        }
    }

    fn content_width(&self) -> u32 {
        self.width - 2 * MARGIN_X
    }

    fn header(&mut self, doc: &CvDocument) {
        let Some(info) = &doc.personal_info else {
            return;
        };

        let width = self.content_width();
        let palette = self.palette;

        let name = info.full_name();
        if !name.is_empty() {
            self.lines(&wrap_text(&name, NAME_DOT, width), NAME_DOT, palette.heading, true);
        }
        if !info.title.trim().is_empty() {
            self.lines(&wrap_text(&info.title, HEADING_DOT, width), HEADING_DOT, palette.muted, false);
        }

        let contact = info.contact_parts().join(" | ");
        if !contact.is_empty() {
            self.lines(&wrap_text(&contact, BODY_DOT, width), BODY_DOT, palette.text, false);
        }
        for link in info.links.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            self.lines(&wrap_text(link, BODY_DOT, width), BODY_DOT, palette.muted, false);
        }

        if self.has_content {
            self.cursor_y += RULE_GAP;
            self.rule(2, self.palette.rule);
        }
    }

    fn section_gap(&mut self) {
        if self.has_content {
            self.cursor_y += SECTION_GAP;
        }
    }

    fn section_heading(&mut self, title: &str) {
        self.section_gap();
        let color = self.palette.heading;
        self.lines(&[title.to_uppercase()], HEADING_DOT, color, true);
        self.cursor_y += RULE_GAP / 2;
        self.rule(1, self.palette.rule);
        self.cursor_y += RULE_GAP;
    }

    /// Heading plus wrapped body, skipped entirely when the body is blank.
    fn text_section(&mut self, title: &str, body: &str) {
        let lines = wrap_paragraphs(body, BODY_DOT, self.content_width());
        if lines.is_empty() {
            return;
        }
        self.section_heading(title);
        let color = self.palette.text;
        self.lines(&lines, BODY_DOT, color, false);
    }

    /// An experience or education entry: bold heading with right-aligned dates,
    /// then the wrapped description.
    fn entry(&mut self, heading: &str, dates: Option<&str>, description: &str) {
        if self.nodes.last().is_some_and(|n| matches!(n, VisualNode::Text { .. })) {
            self.cursor_y += ENTRY_GAP;
        }

        let dates = dates.map(|d| wrap_text(d, BODY_DOT, self.content_width()).join(" "));
        let date_width = dates.as_deref().map(|d| measure_str(d, BODY_DOT)).unwrap_or(0);
        let heading_width = if date_width > 0 && date_width + DATE_GUTTER < self.content_width() {
            self.content_width() - date_width - DATE_GUTTER
        } else {
            self.content_width()
        };

        let heading_lines = wrap_text(heading, BODY_DOT, heading_width);
        let first_line_y = self.cursor_y;
        let text = self.palette.text;
        self.lines(&heading_lines, BODY_DOT, text, true);

        if let Some(dates) = dates.filter(|d| !d.is_empty()) {
            let muted = self.palette.muted;
            if heading_width < self.content_width() && !heading_lines.is_empty() {
                // Right-aligned on the first heading line.
                let x = MARGIN_X + self.content_width() - date_width;
                self.push_text(x, first_line_y, BODY_DOT, muted, false, dates);
            } else {
                let lines = wrap_text(&dates, BODY_DOT, self.content_width());
                self.lines(&lines, BODY_DOT, muted, false);
            }
        }

        let body = wrap_paragraphs(description, BODY_DOT, self.content_width());
        self.lines(&body, BODY_DOT, text, false);
    }

    fn labelled_line(&mut self, label: &str, value: &str) {
        let line = match (label.is_empty(), value.is_empty()) {
            (false, false) => format!("{label}: {value}"),
            (false, true) => label.to_string(),
            _ => value.to_string(),
        };
        let color = self.palette.text;
        let lines = wrap_text(&line, BODY_DOT, self.content_width());
        self.lines(&lines, BODY_DOT, color, false);
    }

    fn lines(&mut self, lines: &[String], dot: u32, color: Rgb<u8>, bold: bool) {
        for line in lines {
            self.push_text(MARGIN_X, self.cursor_y, dot, color, bold, line.clone());
            self.cursor_y += line_height(dot);
        }
    }

    fn push_text(&mut self, x: u32, y: u32, dot: u32, color: Rgb<u8>, bold: bool, text: String) {
        self.nodes.push(VisualNode::Text {
            x,
            y,
            dot,
            color,
            bold,
            text,
        });
        self.has_content = true;
    }

    fn rule(&mut self, thickness: u32, color: Rgb<u8>) {
        self.nodes.push(VisualNode::Rule {
            x: MARGIN_X,
            y: self.cursor_y,
            width: self.content_width(),
            height: thickness,
            color,
        });
        self.cursor_y += thickness;
        self.has_content = true;
    }

    fn finish(self) -> RenderedRegion {
        RenderedRegion {
            width: self.width,
            height: self.cursor_y + MARGIN_BOTTOM,
            background: WHITE,
            nodes: self.nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::page::{PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
    use crate::models::cv::{CustomField, EducationEntry, ExperienceEntry, PersonalInfo};

    fn texts(region: &RenderedRegion) -> Vec<&str> {
        region
            .nodes
            .iter()
            .filter_map(|n| match n {
                VisualNode::Text { text, .. } => Some(text.as_str()),
                VisualNode::Rule { .. } => None,
            })
            .collect()
    }

    fn sample_document() -> CvDocument {
        CvDocument {
            personal_info: Some(PersonalInfo {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                title: "Analyst".to_string(),
                email: "ada@example.com".to_string(),
                location: "London".to_string(),
                links: vec!["github.com/ada".to_string()],
                ..Default::default()
            }),
            summary: "Writes the first published algorithm for a machine.".to_string(),
            experience: vec![ExperienceEntry {
                title: "Translator".to_string(),
                company: "Taylor's Scientific Memoirs".to_string(),
                start_date: "1842".to_string(),
                end_date: "1843".to_string(),
                is_present: true,
                description: "Annotated Menabrea's paper.\nAdded Note G.".to_string(),
            }],
            education: vec![EducationEntry {
                degree: "Private tutoring".to_string(),
                institution: "Augustus De Morgan".to_string(),
                ..Default::default()
            }],
            skills: vec!["Mathematics".to_string(), "  ".to_string(), "Poetry".to_string()],
            custom_fields: vec![CustomField {
                label: "Notable".to_string(),
                value: "Note G".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_document_renders_blank_region() {
        let region = render_template(&CvDocument::default(), Theme::Classic);
        assert!(region.nodes.is_empty());
        assert_eq!(region.width, 794);
        assert_eq!(region.height, MARGIN_TOP + MARGIN_BOTTOM);
        assert!(region.is_laid_out());
    }

    #[test]
    fn test_render_is_deterministic() {
        let doc = sample_document();
        assert_eq!(
            render_template(&doc, Theme::Modern),
            render_template(&doc, Theme::Modern)
        );
    }

    #[test]
    fn test_present_entry_omits_end_date() {
        let region = render_template(&sample_document(), Theme::Classic);
        let all = texts(&region);
        assert!(all.contains(&"1842 - Present"));
        assert!(!all.iter().any(|t| t.contains("1843")));
    }

    #[test]
    fn test_sections_render_in_order() {
        let region = render_template(&sample_document(), Theme::Classic);
        let all = texts(&region);
        let pos = |needle: &str| all.iter().position(|t| *t == needle).unwrap();
        assert!(pos("Ada Lovelace") < pos("SUMMARY"));
        assert!(pos("SUMMARY") < pos("EXPERIENCE"));
        assert!(pos("EXPERIENCE") < pos("EDUCATION"));
        assert!(pos("EDUCATION") < pos("SKILLS"));
        assert!(all.contains(&"Mathematics · Poetry"));
        assert!(all.contains(&"Notable: Note G"));
    }

    #[test]
    fn test_blank_sections_are_omitted() {
        let region = render_template(&sample_document(), Theme::Classic);
        let all = texts(&region);
        assert!(!all.contains(&"PROJECTS"));
        assert!(!all.contains(&"LANGUAGES"));
    }

    #[test]
    fn test_nodes_stay_inside_region() {
        let region = render_template(&sample_document(), Theme::Classic);
        for node in &region.nodes {
            match node {
                VisualNode::Text { x, y, dot, text, .. } => {
                    assert!(x + measure_str(text, *dot) <= region.width, "text overflows: {text}");
                    assert!(y + line_height(*dot) <= region.height);
                }
                VisualNode::Rule { x, y, width, height, .. } => {
                    assert!(x + width <= region.width);
                    assert!(y + height <= region.height);
                }
            }
        }
    }

    #[test]
    fn test_long_document_exceeds_one_page() {
        let mut doc = sample_document();
        doc.experience = (0..40)
            .map(|i| ExperienceEntry {
                title: format!("Role {i}"),
                company: "Analytical Engines Ltd".to_string(),
                description: "Designed and documented punched-card programs. ".repeat(4),
                ..Default::default()
            })
            .collect();
        let region = render_template(&doc, Theme::Classic);
        let page_height_px = (region.width as f64 * PAGE_HEIGHT_MM / PAGE_WIDTH_MM) as u32;
        assert!(region.height > 2 * page_height_px);
    }

    #[test]
    fn test_theme_changes_heading_colour_only() {
        let doc = sample_document();
        let classic = render_template(&doc, Theme::Classic);
        let modern = render_template(&doc, Theme::Modern);
        assert_eq!(classic.height, modern.height);
        assert_ne!(classic, modern);
    }

    #[test]
    fn test_theme_from_str() {
        assert_eq!("Modern".parse::<Theme>().unwrap(), Theme::Modern);
        assert_eq!(" classic ".parse::<Theme>().unwrap(), Theme::Classic);
        assert!("fancy".parse::<Theme>().is_err());
    }
}
