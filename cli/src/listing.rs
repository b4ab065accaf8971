//! Auxiliary table of the filtered records.
//!
//! Column widths are measured in terminal cells so Hangul names line up.

use poimap_core::PoiRecord;
use unicode_width::UnicodeWidthStr;

const HEADERS: [&str; 4] = ["category", "name", "rating", "capacity"];

fn row(record: &PoiRecord) -> [String; 4] {
    [
        record.category.clone(),
        record.name.clone(),
        record.rating.map(|r| r.to_string()).unwrap_or_default(),
        record.capacity.map(|c| c.to_string()).unwrap_or_default(),
    ]
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(cell.width());
    format!("{cell}{}", " ".repeat(fill))
}

/// Render `records` as an aligned plain-text table, header first.
pub fn render_table(records: &[&PoiRecord]) -> String {
    let rows: Vec<[String; 4]> = records.iter().map(|r| row(r)).collect();

    let mut widths = HEADERS.map(UnicodeWidthStr::width);
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.width());
        }
    }

    let line = |cells: [&str; 4]| -> String {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| pad(cell, width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = line(HEADERS);
    out.push('\n');
    for cells in &rows {
        out.push_str(&line(cells.each_ref().map(String::as_str)));
        out.push('\n');
    }
    out
}
