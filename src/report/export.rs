//! Excel and PDF renderings of the report records.

use std::{fmt, ops::Range};

use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rgb};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};
use serde::Deserialize;
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

use super::{DailyReport, DailySummary, DefaulterReport, MonthlyReport};
use crate::error::AppError;

const SHEET_NAME: &str = "Attendance";

// A4 portrait, in millimetres
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 14.0;
const ROW_H: f32 = 7.0;
const FIRST_TABLE_TOP: f32 = PAGE_H - 45.0;
const TABLE_TOP: f32 = PAGE_H - 20.0;
const TABLE_BOTTOM: f32 = 20.0;

const HEADER_RGB: (f32, f32, f32) = (99.0 / 255.0, 102.0 / 255.0, 241.0 / 255.0);
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(u32),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A report that can be laid out as a titled table.
pub trait Tabular {
    fn title(&self) -> &str;
    fn file_stem(&self) -> &str;
    fn columns(&self) -> &'static [&'static str];
    fn rows(&self) -> Vec<Vec<Cell>>;

    /// Daily head counts printed above the table.
    fn summary(&self) -> Option<&DailySummary> {
        None
    }
}

impl Tabular for DailyReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn file_stem(&self) -> &str {
        &self.file_stem
    }

    fn columns(&self) -> &'static [&'static str] {
        &["Sr. No.", "Student Name", "RFID", "Time In", "Time Out", "Status"]
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    Cell::Number(r.sr_no),
                    Cell::Text(r.student_name.clone()),
                    Cell::Text(r.rfid_uid.clone()),
                    Cell::Text(r.time_in.clone()),
                    Cell::Text(r.time_out.clone()),
                    Cell::Text(r.status.to_string()),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Option<&DailySummary> {
        Some(&self.summary)
    }
}

impl Tabular for MonthlyReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn file_stem(&self) -> &str {
        &self.file_stem
    }

    fn columns(&self) -> &'static [&'static str] {
        &["Sr. No.", "Name", "Present", "Total", "Percentage"]
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    Cell::Number(r.sr_no),
                    Cell::Text(r.name.clone()),
                    Cell::Number(r.present),
                    Cell::Number(r.total),
                    Cell::Text(r.percentage.clone()),
                ]
            })
            .collect()
    }
}

impl Tabular for DefaulterReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn file_stem(&self) -> &str {
        &self.file_stem
    }

    fn columns(&self) -> &'static [&'static str] {
        &["Sr. No.", "Name", "Attendance %"]
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    Cell::Number(r.sr_no),
                    Cell::Text(r.name.clone()),
                    Cell::Text(r.percentage.clone()),
                ]
            })
            .collect()
    }
}

fn summary_line(summary: &DailySummary) -> String {
    format!(
        "Present: {}, Absent: {}, Not Checked Out: {}",
        summary.present, summary.absent, summary.not_checked_out
    )
}

fn xlsx_error(e: XlsxError) -> AppError {
    AppError::Internal(format!("xlsx export: {e}"))
}

fn pdf_error(e: printpdf::Error) -> AppError {
    AppError::Internal(format!("pdf export: {e}"))
}

/// One "Attendance" sheet: bold header, one line per row, then the daily
/// summary line if the report has one.
pub fn to_xlsx(report: &impl Tabular) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold().set_align(FormatAlign::Center);
    let columns = report.columns();
    let rows = report.rows();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(xlsx_error)?;

    for (col, name) in columns.iter().enumerate() {
        let col = col as u16;
        sheet
            .write_string_with_format(0, col, *name, &header)
            .map_err(xlsx_error)?;
        sheet
            .set_column_width(col, (name.len() + 2).max(12) as f64)
            .map_err(xlsx_error)?;
    }

    for (idx, cells) in rows.iter().enumerate() {
        let row = idx as u32 + 1;
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(s) => sheet.write_string(row, col, s),
                Cell::Number(n) => sheet.write_number(row, col, f64::from(*n)),
            }
            .map_err(xlsx_error)?;
        }
    }

    if let Some(summary) = report.summary() {
        let row = rows.len() as u32 + 1;
        let last = columns.len().saturating_sub(1) as u16;
        sheet.write_string(row, 1, "Summary").map_err(xlsx_error)?;
        sheet
            .write_string(row, last, summary_line(summary))
            .map_err(xlsx_error)?;
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

/// Splits `len` rows over pages holding `first` rows, then `rest` each.
/// Always yields at least one page.
fn page_ranges(len: usize, first: usize, rest: usize) -> Vec<Range<usize>> {
    let rest = rest.max(1);
    let mut ranges = vec![0..len.min(first)];
    let mut start = len.min(first);
    while start < len {
        let end = (start + rest).min(len);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// Rows that fit under a table top, header row excluded.
fn capacity(top: f32) -> usize {
    (((top - TABLE_BOTTOM) / ROW_H) as usize).saturating_sub(1)
}

/// Left edge and character budget of each column, sized by content.
fn column_layout(columns: &[&str], rows: &[Vec<Cell>]) -> Vec<(f32, usize)> {
    let widths: Vec<usize> = (0..columns.len())
        .map(|col| {
            rows.iter()
                .filter_map(|r| r.get(col))
                .map(|c| c.to_string().chars().count())
                .chain([columns[col].chars().count()])
                .max()
                .unwrap_or_default()
                .max(4)
        })
        .collect();

    let total: usize = widths.iter().sum();
    let usable = PAGE_W - 2.0 * MARGIN;
    let mut x = MARGIN;
    widths
        .iter()
        .map(|w| {
            let span = usable * *w as f32 / total.max(1) as f32;
            let left = x;
            x += span;
            // Helvetica 10pt averages about 1.9mm per glyph
            (left, ((span / 1.9) as usize).max(3))
        })
        .collect()
}

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn draw_row(
    layer: &PdfLayerReference,
    cells: impl Iterator<Item = String>,
    layout: &[(f32, usize)],
    y: f32,
    font: &IndirectFontRef,
    color: (f32, f32, f32),
) {
    layer.set_fill_color(rgb(color));
    for (text, (x, budget)) in cells.zip(layout) {
        let text: String = text.chars().take(*budget).collect();
        layer.use_text(text, 10.0, Mm(*x), Mm(y), font);
    }
}

fn draw_summary(layer: &PdfLayerReference, summary: &DailySummary, font: &IndirectFontRef) {
    let y = PAGE_H - 37.0;
    layer.use_text("Summary:", 12.0, Mm(MARGIN), Mm(PAGE_H - 30.0), font);

    let parts = [
        (format!("Present: {}", summary.present), 20.0, (0.0, 0.5, 0.0)),
        (format!("Absent: {}", summary.absent), 70.0, (1.0, 0.0, 0.0)),
        (
            format!("Not Checked Out: {}", summary.not_checked_out),
            140.0,
            (1.0, 0.65, 0.0),
        ),
    ];
    for (text, x, color) in parts {
        layer.set_fill_color(rgb(color));
        layer.use_text(text, 12.0, Mm(x), Mm(y), font);
    }
    layer.set_fill_color(rgb(BLACK));
}

/// A4 table with the title on the first page and the header repeated on
/// every page.
pub fn to_pdf(report: &impl Tabular) -> Result<Vec<u8>, AppError> {
    let (doc, page, layer) = PdfDocument::new(report.title(), Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    let columns = report.columns();
    let rows = report.rows();
    let layout = column_layout(columns, &rows);

    let mut layer = doc.get_page(page).get_layer(layer);
    layer.use_text(report.title(), 16.0, Mm(MARGIN), Mm(PAGE_H - 20.0), &bold);
    if let Some(summary) = report.summary() {
        draw_summary(&layer, summary, &bold);
    }

    let pages = page_ranges(rows.len(), capacity(FIRST_TABLE_TOP), capacity(TABLE_TOP));
    for (n, range) in pages.into_iter().enumerate() {
        let top = if n == 0 {
            FIRST_TABLE_TOP
        } else {
            let (page, id) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
            layer = doc.get_page(page).get_layer(id);
            TABLE_TOP
        };

        draw_row(&layer, columns.iter().map(|c| c.to_string()), &layout, top, &bold, HEADER_RGB);
        for (i, cells) in rows[range].iter().enumerate() {
            let y = top - ROW_H * (i as f32 + 1.0);
            draw_row(&layer, cells.iter().map(Cell::to_string), &layout, y, &regular, BLACK);
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}
