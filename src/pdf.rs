//! Contribution report rendering.
//!
//! A small PDF 1.4 writer: uncompressed content streams, the two standard
//! Helvetica faces and WinAnsi text. That is all the report needs.

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::models::{ContributionRecord, RecordTotals, Signatories};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 40.0;
const ROW_HEIGHT: f32 = 14.0;
const TABLE_FONT: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Escape text for a PDF literal string, mapping to WinAnsi bytes.
/// Characters outside Latin-1 become `?`.
fn pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('(');
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", ch as u32);
            }
            _ => out.push('?'),
        }
    }
    out.push(')');
    out
}

/// Approximate Helvetica advance width in points.
fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            '0'..='9' => 556,
            '.' | ',' | ' ' | 'i' | 'l' | 'I' => 278,
            '-' => 333,
            'm' | 'w' | 'M' | 'W' => 833,
            'A'..='Z' => 667,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Cut `text` so it fits `width`, marking truncation with `..`.
fn fit(text: &str, width: f32, size: f32) -> String {
    if text_width(text, size) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        if text_width(&out, size) + text_width("..", size) > width {
            out.pop();
            break;
        }
    }
    out.push_str("..");
    out
}

/// Drawing operations for one page.
#[derive(Debug, Default)]
pub struct Page {
    ops: String,
}

impl Page {
    pub fn text(&mut self, x: f32, y: f32, size: f32, font: Font, text: &str) {
        let _ = writeln!(
            self.ops,
            "BT /{} {} Tf {:.2} {:.2} Td {} Tj ET",
            font.resource(),
            size,
            x,
            y,
            pdf_string(text)
        );
    }

    pub fn text_right(&mut self, right: f32, y: f32, size: f32, font: Font, text: &str) {
        self.text(right - text_width(text, size), y, size, font, text);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let _ = writeln!(self.ops, "0.5 w {:.2} {:.2} m {:.2} {:.2} l S", x1, y1, x2, y2);
    }
}

/// A multi-page A4 document.
#[derive(Debug, Default)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialize to PDF bytes with a valid cross-reference table.
    pub fn to_bytes(&self) -> Vec<u8> {
        let blank = Page::default();
        let pages: Vec<&Page> = if self.pages.is_empty() {
            vec![&blank]
        } else {
            self.pages.iter().collect()
        };

        // 1 catalog, 2 page tree, 3-4 fonts, then a (page, content) pair per page.
        let first_page_obj = 5;
        let page_ids: Vec<usize> = (0..pages.len()).map(|i| first_page_obj + i * 2).collect();

        let mut objects: Vec<Vec<u8>> = Vec::new();
        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
        objects.push(
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                pages.len()
            )
            .into_bytes(),
        );
        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );
        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );
        for (page, id) in pages.iter().zip(&page_ids) {
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                     /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                    PAGE_WIDTH,
                    PAGE_HEIGHT,
                    id + 1
                )
                .into_bytes(),
            );
            let mut stream = format!("<< /Length {} >>\nstream\n", page.ops.len()).into_bytes();
            stream.extend_from_slice(page.ops.as_bytes());
            stream.extend_from_slice(b"\nendstream");
            objects.push(stream);
        }

        let mut out: Vec<u8> = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_at = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in &offsets {
            let _ = writeln!(xref, "{:010} 00000 n ", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

// ============ Contribution report ============

/// Header text for the report.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub display_name: Option<String>,
    pub display_sss_no: Option<String>,
    pub display_coverage: Option<String>,
    pub generated_on: Option<NaiveDate>,
}

struct TableColumn {
    title: &'static str,
    width: f32,
    right_aligned: bool,
}

const COLUMNS: [TableColumn; 8] = [
    TableColumn { title: "Batch", width: 48.0, right_aligned: false },
    TableColumn { title: "SSS No", width: 72.0, right_aligned: false },
    TableColumn { title: "Name", width: 135.0, right_aligned: false },
    TableColumn { title: "SS", width: 50.0, right_aligned: true },
    TableColumn { title: "EC", width: 45.0, right_aligned: true },
    TableColumn { title: "Total", width: 55.0, right_aligned: true },
    TableColumn { title: "SBR No", width: 60.0, right_aligned: false },
    TableColumn { title: "SBR Date", width: 50.0, right_aligned: false },
];

const CELL_PAD: f32 = 3.0;

fn draw_row(page: &mut Page, y: f32, cells: &[String; 8], font: Font) {
    let mut x = MARGIN;
    for (column, value) in COLUMNS.iter().zip(cells) {
        let text = fit(value, column.width - CELL_PAD * 2.0, TABLE_FONT);
        if column.right_aligned {
            page.text_right(x + column.width - CELL_PAD, y, TABLE_FONT, font, &text);
        } else {
            page.text(x + CELL_PAD, y, TABLE_FONT, font, &text);
        }
        x += column.width;
    }
}

fn draw_table_header(page: &mut Page, y: f32) -> f32 {
    let titles = COLUMNS.each_ref().map(|c| c.title.to_string());
    draw_row(page, y, &titles, Font::Bold);
    page.line(MARGIN, y - 4.0, PAGE_WIDTH - MARGIN, y - 4.0);
    y - ROW_HEIGHT
}

fn record_cells(record: &ContributionRecord) -> [String; 8] {
    [
        record.batch_date.short_label(),
        record.sss_no.clone(),
        record.name.clone(),
        record.ss.to_string(),
        record.ec.to_string(),
        record.total.to_string(),
        record.sbr_no.clone().unwrap_or_default(),
        record
            .sbr_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    ]
}

/// Space below the last row for totals and the signature block.
const CLOSING_HEIGHT: f32 = 110.0;
const BOTTOM: f32 = MARGIN + 20.0;

/// Render the contribution report for `records`.
pub fn render_contribution_report(
    records: &[ContributionRecord],
    signatories: &Signatories,
    options: &ReportOptions,
) -> Vec<u8> {
    let mut doc = Document::new();
    let mut page = Page::default();
    let mut y = PAGE_HEIGHT - MARGIN;

    page.text(MARGIN, y - 14.0, 14.0, Font::Bold, "SSS Contribution Report");
    y -= 34.0;
    let header_lines = [
        ("Employee", options.display_name.as_deref()),
        ("SSS No", options.display_sss_no.as_deref()),
        ("Coverage", options.display_coverage.as_deref()),
    ];
    for (label, value) in header_lines {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            page.text(MARGIN, y, 10.0, Font::Bold, &format!("{}:", label));
            page.text(MARGIN + 60.0, y, 10.0, Font::Regular, value);
            y -= 14.0;
        }
    }
    if let Some(day) = options.generated_on {
        page.text(MARGIN, y, 8.0, Font::Regular, &format!("Generated {}", day.format("%B %-d, %Y")));
        y -= 14.0;
    }
    y -= 8.0;
    y = draw_table_header(&mut page, y);

    for record in records {
        if y < BOTTOM {
            doc.push(std::mem::take(&mut page));
            y = draw_table_header(&mut page, PAGE_HEIGHT - MARGIN - 10.0);
        }
        draw_row(&mut page, y, &record_cells(record), Font::Regular);
        y -= ROW_HEIGHT;
    }

    if y - CLOSING_HEIGHT < BOTTOM {
        doc.push(std::mem::take(&mut page));
        y = PAGE_HEIGHT - MARGIN - 10.0;
    }

    let totals = RecordTotals::of(records);
    page.line(MARGIN, y + ROW_HEIGHT - 4.0, PAGE_WIDTH - MARGIN, y + ROW_HEIGHT - 4.0);
    page.text(MARGIN + CELL_PAD, y, TABLE_FONT, Font::Bold, &format!("{} record(s)", totals.count));
    let total_right: f32 = MARGIN + COLUMNS.iter().take(6).map(|c| c.width).sum::<f32>() - CELL_PAD;
    page.text_right(total_right, y, TABLE_FONT, Font::Bold, &totals.total.to_string());

    let sign_y = y - 70.0;
    let half = (PAGE_WIDTH - MARGIN * 2.0) / 2.0;
    for (i, (role, name)) in [
        ("Prepared by", &signatories.payroll_incharge),
        ("Noted by", &signatories.vp_finance),
    ]
    .into_iter()
    .enumerate()
    {
        let x = MARGIN + half * i as f32;
        page.text(x, sign_y + 36.0, 9.0, Font::Regular, role);
        page.line(x, sign_y + 10.0, x + half - 40.0, sign_y + 10.0);
        page.text(x, sign_y, 9.0, Font::Bold, name);
        let title = if i == 0 { "Payroll In-Charge" } else { "VP Finance" };
        page.text(x, sign_y - 12.0, 8.0, Font::Regular, title);
    }
    doc.push(page);

    let count = doc.page_count();
    for (i, page) in doc.pages.iter_mut().enumerate() {
        page.text_right(
            PAGE_WIDTH - MARGIN,
            MARGIN - 15.0,
            8.0,
            Font::Regular,
            &format!("Page {} of {}", i + 1, count),
        );
    }

    doc.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, BatchMonth};

    fn record(i: i64) -> ContributionRecord {
        ContributionRecord {
            id: i,
            batch_date: BatchMonth::new(2024, 5).unwrap(),
            sss_no: format!("34-{:07}-0", i),
            name: format!("Employee (No. {})", i),
            ss: Amount::from_centavos(100_000),
            ec: Amount::from_centavos(3_000),
            total: Amount::from_centavos(103_000),
            sbr_no: None,
            sbr_date: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    #[test]
    fn escapes_and_encodes_text() {
        assert_eq!(pdf_string("a(b)\\"), "(a\\(b\\)\\\\)");
        assert_eq!(pdf_string("Peña"), "(Pe\\361a)");
        assert_eq!(pdf_string("₱5"), "(?5)");
    }

    #[test]
    fn fit_truncates_long_text() {
        let long = "Maximiliano Bartolome Dela Cruz Santos";
        let cut = fit(long, 60.0, TABLE_FONT);
        assert!(cut.ends_with(".."));
        assert!(text_width(&cut, TABLE_FONT) <= 60.0);
        assert_eq!(fit("Ana", 60.0, TABLE_FONT), "Ana");
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let mut doc = Document::new();
        let mut page = Page::default();
        page.text(10.0, 10.0, 12.0, Font::Regular, "hello");
        doc.push(page);
        let bytes = doc.to_bytes();

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));

        let text = String::from_utf8_lossy(&bytes);
        let xref = text.find("xref\n").unwrap();
        let entries: Vec<usize> = text[xref..]
            .lines()
            .skip(3)
            .take(6)
            .map(|l| l[..10].parse().unwrap())
            .collect();
        for (i, offset) in entries.iter().enumerate() {
            let expected = format!("{} 0 obj", i + 1);
            assert_eq!(&bytes[*offset..*offset + expected.len()], expected.as_bytes());
        }
    }

    #[test]
    fn report_includes_rows_totals_and_signatories() {
        let records: Vec<_> = (1..=3).map(record).collect();
        let signatories = Signatories {
            payroll_incharge: "Liza Ramos".into(),
            vp_finance: "Carlos Tan".into(),
        };
        let bytes = render_contribution_report(
            &records,
            &signatories,
            &ReportOptions {
                display_coverage: Some("May 2024".into()),
                ..Default::default()
            },
        );
        assert!(contains(&bytes, "/Count 1"));
        assert!(contains(&bytes, "(Employee \\(No. 2\\))"));
        assert!(contains(&bytes, "(3090.00)"));
        assert!(contains(&bytes, "(Liza Ramos)"));
        assert!(contains(&bytes, "(Carlos Tan)"));
        assert!(contains(&bytes, "(May 2024)"));
        assert!(contains(&bytes, "(Page 1 of 1)"));
    }

    #[test]
    fn long_reports_span_pages() {
        let records: Vec<_> = (1..=60).map(record).collect();
        let bytes =
            render_contribution_report(&records, &Signatories::default(), &ReportOptions::default());
        assert!(contains(&bytes, "/Count 2"));
        assert!(contains(&bytes, "(Page 2 of 2)"));
    }
}
