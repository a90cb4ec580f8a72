use crate::calc::TermAggregate;
use crate::grading::{grade_for, GradeBand, RemarkPolicy};
use crate::models::{Student, Tenant};
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use serde::Serialize;
use std::ops::Range;

pub const REPORT_TITLE: &str = "OFFICIAL REPORT CARD";
pub const SIGNATURE_LABEL: &str = "Principal Signature";
pub const DEFAULT_ACADEMIC_YEAR: &str = "2024/2025";
pub const DEFAULT_HEADER_COLOR: &str = "#1E3A8A";
const FILE_SUFFIX: &str = "_Report_Card.pdf";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub remark_policy: RemarkPolicy,
    pub academic_year: String,
    pub header_color: String,
    pub show_generated_at: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            remark_policy: RemarkPolicy::Tiered,
            academic_year: DEFAULT_ACADEMIC_YEAR.to_string(),
            header_color: DEFAULT_HEADER_COLOR.to_string(),
            show_generated_at: true,
        }
    }
}

impl ReportSettings {
    /// Reads the stored `setup.reports` object. Missing or malformed fields keep defaults.
    pub fn from_json(v: &serde_json::Value) -> Self {
        let mut out = Self::default();
        if let Some(p) = v
            .get("remarkPolicy")
            .and_then(|v| v.as_str())
            .and_then(RemarkPolicy::parse)
        {
            out.remark_policy = p;
        }
        if let Some(y) = v.get("academicYear").and_then(|v| v.as_str()) {
            out.academic_year = y.to_string();
        }
        if let Some(c) = v
            .get("headerColor")
            .and_then(|v| v.as_str())
            .filter(|c| parse_hex_color(c).is_some())
        {
            out.header_color = c.to_string();
        }
        if let Some(b) = v.get("showGeneratedAt").and_then(|v| v.as_bool()) {
            out.show_generated_at = b;
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "remarkPolicy": self.remark_policy.as_str(),
            "academicYear": self.academic_year,
            "headerColor": self.header_color,
            "showGeneratedAt": self.show_generated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentityRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub subject: String,
    pub score_text: String,
    pub grade: GradeBand,
    pub remark: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCardModel {
    pub school_name: String,
    pub header_color: String,
    pub title: &'static str,
    pub identity: Vec<IdentityRow>,
    pub rows: Vec<ReportRow>,
    pub total_text: String,
    pub average_text: String,
    pub signature_label: &'static str,
    pub remark_policy: &'static str,
    pub generated_at: Option<String>,
    pub file_name: String,
}

impl ReportCardModel {
    pub fn build(
        tenant: &Tenant,
        student: &Student,
        agg: &TermAggregate,
        settings: &ReportSettings,
        generated_at: Option<String>,
    ) -> Self {
        let header_color = tenant
            .theme_color
            .as_deref()
            .filter(|c| parse_hex_color(c).is_some())
            .unwrap_or(settings.header_color.as_str())
            .to_string();

        let identity = vec![
            IdentityRow {
                label: "Student Name",
                value: student.full_name.clone(),
            },
            IdentityRow {
                label: "Index Number",
                value: student.index_number.clone(),
            },
            IdentityRow {
                label: "Class",
                value: student.class_name.clone(),
            },
            IdentityRow {
                label: "Term",
                value: agg.term.clone(),
            },
            IdentityRow {
                label: "Academic Year",
                value: settings.academic_year.clone(),
            },
        ];

        let rows = agg
            .filtered
            .iter()
            .map(|s| ReportRow {
                subject: s.subject.clone(),
                score_text: format!("{}%", s.score),
                grade: grade_for(s.score),
                remark: settings.remark_policy.remark(s.score),
            })
            .collect();

        Self {
            school_name: tenant.name.clone(),
            header_color,
            title: REPORT_TITLE,
            identity,
            rows,
            total_text: agg.total_label(),
            average_text: agg.average_label(),
            signature_label: SIGNATURE_LABEL,
            remark_policy: settings.remark_policy.as_str(),
            generated_at: if settings.show_generated_at {
                generated_at
            } else {
                None
            },
            file_name: report_file_name(&student.full_name),
        }
    }
}

/// `<name>_Report_Card.pdf` with anything other than letters, digits, `-` and `_`
/// folded to `_`. Non-ASCII letters are kept.
pub fn report_file_name(full_name: &str) -> String {
    let mut safe = String::with_capacity(full_name.len());
    for c in full_name.chars() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            safe.push(c);
        } else if !safe.ends_with('_') {
            safe.push('_');
        }
    }
    let safe = safe.trim_matches('_');
    let stem = if safe.is_empty() { "student" } else { safe };
    format!("{}{}", stem, FILE_SUFFIX)
}

pub fn parse_hex_color(s: &str) -> Option<[f32; 3]> {
    let hex = s.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([
        channel(0)? as f32 / 255.0,
        channel(2)? as f32 / 255.0,
        channel(4)? as f32 / 255.0,
    ])
}

// A4 portrait, points.
const PAGE_W: f32 = 595.0;
const PAGE_H: f32 = 842.0;
const MARGIN_X: f32 = 50.0;
const BAND_H: f32 = 80.0;
const IDENTITY_TOP_Y: f32 = 735.0;
const IDENTITY_ROW_H: f32 = 18.0;
const ROW_H: f32 = 20.0;
const FIRST_HEADER_Y: f32 = 620.0;
const NEXT_HEADER_Y: f32 = 782.0;
const BOTTOM_Y: f32 = 80.0;
// Room below the last row for the aggregate row and signature block.
const CLOSING_MIN_Y: f32 = 160.0;
const COL_X: [f32; 4] = [MARGIN_X, 280.0, 360.0, 420.0];
const COLUMNS: [&str; 4] = ["Subject", "Score%", "Grade", "Remarks"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice {
    pub rows: Range<usize>,
    pub first: bool,
    pub closing: bool,
}

fn row_capacity(header_y: f32) -> usize {
    (((header_y - ROW_H) - BOTTOM_Y) / ROW_H) as usize + 1
}

/// Splits `row_count` table rows across pages. The last page carries the
/// aggregate row and signature; it may hold no table rows at all.
pub fn layout_pages(row_count: usize) -> Vec<PageSlice> {
    let mut pages = Vec::new();
    let mut start = 0;
    let mut first = true;
    loop {
        let header_y = if first { FIRST_HEADER_Y } else { NEXT_HEADER_Y };
        let end = (start + row_capacity(header_y)).min(row_count);
        let next_y = header_y - ROW_H - (end - start) as f32 * ROW_H;
        if end == row_count {
            if next_y >= CLOSING_MIN_Y {
                pages.push(PageSlice {
                    rows: start..end,
                    first,
                    closing: true,
                });
            } else {
                pages.push(PageSlice {
                    rows: start..end,
                    first,
                    closing: false,
                });
                pages.push(PageSlice {
                    rows: end..end,
                    first: false,
                    closing: true,
                });
            }
            return pages;
        }
        pages.push(PageSlice {
            rows: start..end,
            first,
            closing: false,
        });
        start = end;
        first = false;
    }
}

const FONT_REGULAR: Name<'static> = Name(b"F1");
const FONT_BOLD: Name<'static> = Name(b"F2");

/// Helvetica is set up with WinAnsiEncoding; Latin-1 maps straight through,
/// anything else prints as `?`.
fn win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            0x00..=0x1F => b' ',
            _ => b'?',
        })
        .collect()
}

fn text(content: &mut Content, font: Name<'_>, size: f32, x: f32, y: f32, s: &str) {
    let bytes = win_ansi(s);
    content.begin_text();
    content.set_font(font, size);
    content.next_line(x, y);
    content.show(Str(&bytes));
    content.end_text();
}

fn rule(content: &mut Content, x1: f32, x2: f32, y: f32, width: f32) {
    content.set_line_width(width);
    content.move_to(x1, y);
    content.line_to(x2, y);
    content.stroke();
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn draw_header_band(content: &mut Content, model: &ReportCardModel) {
    let [r, g, b] = parse_hex_color(&model.header_color)
        .or_else(|| parse_hex_color(DEFAULT_HEADER_COLOR))
        .unwrap_or([0.0, 0.0, 0.0]);
    content.save_state();
    content.set_fill_rgb(r, g, b);
    content.rect(0.0, PAGE_H - BAND_H, PAGE_W, BAND_H);
    content.fill_nonzero();
    content.set_fill_rgb(1.0, 1.0, 1.0);
    // Two cells: school on the left, title on the right.
    text(
        content,
        FONT_BOLD,
        18.0,
        MARGIN_X,
        PAGE_H - 48.0,
        &clip(&model.school_name, 28),
    );
    text(content, FONT_BOLD, 14.0, 360.0, PAGE_H - 46.0, model.title);
    content.restore_state();
}

fn draw_identity(content: &mut Content, model: &ReportCardModel) {
    let mut y = IDENTITY_TOP_Y;
    for row in &model.identity {
        text(content, FONT_BOLD, 11.0, MARGIN_X, y, row.label);
        text(content, FONT_REGULAR, 11.0, 200.0, y, &clip(&row.value, 50));
        y -= IDENTITY_ROW_H;
    }
}

fn draw_column_header(content: &mut Content, y: f32) {
    content.save_state();
    content.set_fill_gray(0.9);
    content.rect(MARGIN_X - 4.0, y - 6.0, PAGE_W - 2.0 * MARGIN_X + 8.0, ROW_H);
    content.fill_nonzero();
    content.restore_state();
    for (x, label) in COL_X.iter().zip(COLUMNS.iter()) {
        text(content, FONT_BOLD, 11.0, *x, y, label);
    }
    rule(content, MARGIN_X - 4.0, PAGE_W - MARGIN_X + 4.0, y - 6.0, 0.75);
}

fn draw_row(content: &mut Content, row: &ReportRow, y: f32) {
    text(content, FONT_REGULAR, 10.0, COL_X[0], y, &clip(&row.subject, 36));
    text(content, FONT_REGULAR, 10.0, COL_X[1], y, &row.score_text);
    text(content, FONT_REGULAR, 10.0, COL_X[2], y, row.grade.label());
    text(content, FONT_REGULAR, 10.0, COL_X[3], y, row.remark);
    rule(content, MARGIN_X - 4.0, PAGE_W - MARGIN_X + 4.0, y - 6.0, 0.25);
}

fn draw_closing(content: &mut Content, model: &ReportCardModel, y: f32) {
    text(content, FONT_BOLD, 10.0, COL_X[0], y, "Total");
    text(content, FONT_BOLD, 10.0, COL_X[1], y, &model.total_text);
    text(content, FONT_BOLD, 10.0, COL_X[2], y, "Average");
    text(content, FONT_BOLD, 10.0, COL_X[3], y, &model.average_text);
    rule(content, MARGIN_X - 4.0, PAGE_W - MARGIN_X + 4.0, y - 6.0, 0.75);

    text(content, FONT_REGULAR, 10.0, MARGIN_X, y - 50.0, model.signature_label);
    rule(content, MARGIN_X, MARGIN_X + 200.0, y - 80.0, 0.5);
}

fn draw_footer(content: &mut Content, model: &ReportCardModel, page: usize, total: usize) {
    content.save_state();
    content.set_fill_gray(0.4);
    if let Some(ts) = &model.generated_at {
        text(content, FONT_REGULAR, 8.0, MARGIN_X, 40.0, &format!("Generated {}", ts));
    }
    text(
        content,
        FONT_REGULAR,
        8.0,
        PAGE_W - MARGIN_X - 50.0,
        40.0,
        &format!("Page {} of {}", page, total),
    );
    content.restore_state();
}

/// Renders the report card as PDF bytes.
pub fn render_pdf(model: &ReportCardModel) -> Vec<u8> {
    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let regular_id = Ref::new(3);
    let bold_id = Ref::new(4);
    let info_id = Ref::new(5);
    let mut next_id = 6;

    let slices = layout_pages(model.rows.len());
    let page_count = slices.len();
    let mut page_ids = Vec::with_capacity(page_count);
    let mut contents = Vec::with_capacity(page_count);

    for (i, slice) in slices.iter().enumerate() {
        let mut content = Content::new();
        draw_header_band(&mut content, model);

        let mut y = if slice.first {
            draw_identity(&mut content, model);
            FIRST_HEADER_Y
        } else {
            NEXT_HEADER_Y
        };
        if slice.first || !slice.rows.is_empty() {
            draw_column_header(&mut content, y);
            y -= ROW_H;
        }
        for row in &model.rows[slice.rows.clone()] {
            draw_row(&mut content, row, y);
            y -= ROW_H;
        }
        if slice.closing {
            draw_closing(&mut content, model, y);
        }
        draw_footer(&mut content, model, i + 1, page_count);

        let page_id = Ref::new(next_id);
        let content_id = Ref::new(next_id + 1);
        next_id += 2;
        page_ids.push(page_id);
        contents.push((page_id, content_id, content.finish()));
    }

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().copied())
        .count(page_count as i32);

    for (page_id, content_id, data) in &contents {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_W, PAGE_H));
        page.parent(page_tree_id);
        page.contents(*content_id);
        let mut resources = page.resources();
        let mut fonts = resources.fonts();
        fonts.pair(FONT_REGULAR, regular_id);
        fonts.pair(FONT_BOLD, bold_id);
        fonts.finish();
        resources.finish();
        page.finish();
        pdf.stream(*content_id, data);
    }

    pdf.type1_font(regular_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    pdf.type1_font(bold_id)
        .base_font(Name(b"Helvetica-Bold"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    let doc_title = format!("{} - {}", model.school_name, model.title);
    pdf.document_info(info_id)
        .title(TextStr(&doc_title))
        .producer(TextStr("resultsd"));

    pdf.finish()
}
