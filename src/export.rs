use anyhow::{Context, Result};
use chrono::Local;
use printpdf::path::PaintMode;
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb};
use rust_xlsxwriter::{Format, Workbook};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::warn;

use crate::models::Record;

/// Output forms offered by every list page. All four receive the filtered
/// and sorted list covering every page, and none of them mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Clipboard,
    Csv,
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "clipboard" => Some(Self::Clipboard),
            "csv" => Some(Self::Csv),
            "xlsx" | "excel" => Some(Self::Xlsx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn default_filename(&self, label: &str) -> String {
        let stem = label.to_lowercase();
        match self {
            Self::Clipboard => String::new(),
            Self::Csv => format!("{stem}.csv"),
            Self::Xlsx => format!("{stem}.xlsx"),
            Self::Pdf => format!("{stem}.pdf"),
        }
    }
}

/// One line per record, 1-indexed, fields joined by " - ".
pub fn clipboard_text<R: Record>(records: &[R]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut cells = vec![(i + 1).to_string()];
            cells.extend(record.export_row());
            cells.join(" - ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write to the system clipboard, degrading to stdout when no clipboard is
/// available (headless sessions).
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text.to_string())) {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!(%err, "clipboard unavailable, printing instead");
            println!("{}", text);
            Ok(())
        }
    }
}

/// Header row plus comma-joined rows. Values are assumed comma-free; no
/// quoting or escaping is applied, matching the dashboard's exports.
pub fn csv_text<R: Record>(records: &[R]) -> String {
    let mut lines = vec![R::HEADERS.join(",")];
    for (i, record) in records.iter().enumerate() {
        let mut cells = vec![(i + 1).to_string()];
        cells.extend(record.export_row());
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

pub fn write_csv<R: Record>(records: &[R], path: &Path) -> Result<()> {
    std::fs::write(path, csv_text(records))
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Single-sheet workbook named after the entity.
pub fn write_workbook<R: Record>(records: &[R], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(R::LABEL)?;

    for (col, header) in R::HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (row, record) in records.iter().enumerate() {
        let row_index = (row + 1) as u32;
        sheet.write_number(row_index, 0, (row + 1) as f64)?;
        for (col, cell) in record.export_row().iter().enumerate() {
            sheet.write_string(row_index, (col + 1) as u16, cell)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 14.0;
const ROW_HEIGHT: f32 = 7.0;

struct PdfWriter {
    doc: printpdf::PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self { doc, layer, font, bold, y: PAGE_HEIGHT - MARGIN })
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn fill_row(&mut self, color: Color) {
        self.layer.set_fill_color(color);
        let rect = Rect::new(
            Mm(MARGIN),
            Mm(self.y - ROW_HEIGHT + 2.0),
            Mm(PAGE_WIDTH - MARGIN),
            Mm(self.y + 2.0),
        )
        .with_mode(PaintMode::Fill);
        self.layer.add_rect(rect);
    }

    fn text_row(&mut self, cells: &[String], widths: &[f32], font: &IndirectFontRef, color: Color) {
        self.layer.set_fill_color(color);
        let mut x = MARGIN + 1.0;
        for (cell, width) in cells.iter().zip(widths) {
            let width = *width;
            // Roughly two characters per millimeter at 9pt Helvetica.
            let max_chars = (width / 2.0) as usize;
            let shown = truncate_cell(cell, max_chars.max(3));
            self.layer.use_text(shown, 9.0, Mm(x), Mm(self.y - 3.0), font);
            x += width;
        }
        self.y -= ROW_HEIGHT;
    }

    fn save(self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.doc.save(&mut BufWriter::new(file))?;
        Ok(())
    }
}

/// Page-flowing table: bold title, generation-date caption, filled header
/// row, zebra body rows, trailing summary block.
pub fn write_pdf<R: Record>(records: &[R], path: &Path) -> Result<()> {
    let mut writer = PdfWriter::new(&format!("{} Report", R::LABEL))?;
    let header_fill = Color::Rgb(Rgb::new(0.16, 0.35, 0.61, None));
    let zebra_fill = Color::Rgb(Rgb::new(0.93, 0.95, 0.97, None));
    let black = Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None));
    let white = Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None));

    let bold = writer.bold.clone();
    let font = writer.font.clone();
    let headers: Vec<String> = R::HEADERS.iter().map(|h| h.to_string()).collect();

    writer.layer.set_fill_color(black.clone());
    writer
        .layer
        .use_text(format!("{} Report", R::LABEL), 16.0, Mm(MARGIN), Mm(writer.y - 4.0), &bold);
    writer.y -= 9.0;
    writer.layer.use_text(
        format!("Generated on {}", Local::now().format("%Y-%m-%d")),
        9.0,
        Mm(MARGIN),
        Mm(writer.y - 3.0),
        &font,
    );
    writer.y -= 9.0;

    let draw_header = |writer: &mut PdfWriter| {
        writer.fill_row(header_fill.clone());
        writer.text_row(&headers, R::COLUMN_WIDTHS, &bold, white.clone());
    };
    draw_header(&mut writer);

    for (i, record) in records.iter().enumerate() {
        writer.ensure_room(ROW_HEIGHT);
        if writer.y >= PAGE_HEIGHT - MARGIN {
            // Fresh page; repeat the header row.
            draw_header(&mut writer);
        }
        if i % 2 == 1 {
            writer.fill_row(zebra_fill.clone());
        }
        let mut cells = vec![(i + 1).to_string()];
        cells.extend(record.export_row());
        writer.text_row(&cells, R::COLUMN_WIDTHS, &font, black.clone());
    }

    writer.ensure_room(ROW_HEIGHT * (R::summary_lines(records).len() as f32 + 2.0));
    writer.y -= 4.0;
    writer.layer.set_fill_color(black.clone());
    writer
        .layer
        .use_text("Summary", 11.0, Mm(MARGIN), Mm(writer.y - 3.0), &bold);
    writer.y -= ROW_HEIGHT;
    for line in R::summary_lines(records) {
        writer.layer.use_text(line, 9.0, Mm(MARGIN), Mm(writer.y - 3.0), &font);
        writer.y -= 6.0;
    }

    writer.save(path)
}

fn truncate_cell(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Circular, Grievance};
    use serde_json::json;

    fn circulars() -> Vec<Circular> {
        vec![Circular::from_raw(
            0,
            &json!({"id": 1, "circular_number": "C-1", "subject": "Holiday", "date": "2024-01-01"}),
        )]
    }

    #[test]
    fn test_csv_golden_output() {
        let records = circulars();
        assert_eq!(
            csv_text(&records),
            "Sr No,Circular No,Subject,Date\n1,C-1,Holiday,2024-01-01"
        );
    }

    #[test]
    fn test_clipboard_lines_are_one_indexed() {
        let mut records = circulars();
        records.push(Circular::from_raw(
            1,
            &json!({"id": 2, "circular_number": "C-2", "subject": "Audit", "date": "2024-02-01"}),
        ));
        assert_eq!(
            clipboard_text(&records),
            "1 - C-1 - Holiday - 2024-01-01\n2 - C-2 - Audit - 2024-02-01"
        );
    }

    #[test]
    fn test_all_formats_cover_every_filtered_record() {
        let records: Vec<Circular> = (1..=30)
            .map(|i| {
                Circular::from_raw(
                    (i - 1) as usize,
                    &json!({"id": i, "circular_number": format!("C-{i}"),
                            "subject": format!("Subject {i}"), "date": "2024-01-01"}),
                )
            })
            .collect();

        // Text formats: one row per record, same order.
        let csv = csv_text(&records);
        assert_eq!(csv.lines().count(), records.len() + 1);
        let clip = clipboard_text(&records);
        assert_eq!(clip.lines().count(), records.len());
        for (i, line) in clip.lines().enumerate() {
            assert!(line.starts_with(&format!("{} - C-{}", i + 1, i + 1)));
        }

        // Binary formats: written artifacts exist and are non-trivial.
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("circulars.xlsx");
        write_workbook(&records, &xlsx).unwrap();
        assert!(xlsx.metadata().unwrap().len() > 0);

        let pdf = dir.path().join("circulars.pdf");
        write_pdf(&records, &pdf).unwrap();
        assert!(pdf.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_pdf_flows_across_pages() {
        // Enough rows to overflow an A4 page and force the header repeat.
        let records: Vec<Circular> = (1..=80)
            .map(|i| {
                Circular::from_raw(
                    (i - 1) as usize,
                    &json!({"id": i, "circular_number": format!("C-{i}"),
                            "subject": format!("Subject {i}"), "date": "2024-01-01"}),
                )
            })
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("one-page.pdf");
        write_pdf(&records[..1], &single).unwrap();
        let multi = dir.path().join("many-pages.pdf");
        write_pdf(&records, &multi).unwrap();
        assert!(multi.metadata().unwrap().len() > single.metadata().unwrap().len());
    }

    #[test]
    fn test_export_does_not_mutate_input() {
        let records = circulars();
        let before: Vec<String> = records.iter().map(|r| r.subject.clone()).collect();
        let _ = csv_text(&records);
        let _ = clipboard_text(&records);
        let after: Vec<String> = records.iter().map(|r| r.subject.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_grievance_pdf_summary_has_status_breakdown() {
        let records: Vec<Grievance> = [
            json!({"id": 1, "subject": "a", "status": "Active"}),
            json!({"id": 2, "subject": "b", "status": "Pending"}),
        ]
        .iter()
        .enumerate()
        .map(|(i, raw)| Grievance::from_raw(i, raw))
        .collect();

        let lines = Grievance::summary_lines(&records);
        assert!(lines.contains(&"Total grievances: 2".to_string()));
        assert!(lines.contains(&"Active: 1".to_string()));

        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("grievances.pdf");
        write_pdf(&records, &pdf).unwrap();
        assert!(pdf.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ExportFormat::parse("CSV"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("excel"), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::parse("pdf"), Some(ExportFormat::Pdf));
        assert_eq!(ExportFormat::parse("clipboard"), Some(ExportFormat::Clipboard));
        assert_eq!(ExportFormat::parse("docx"), None);
    }
}
