//! Delimited tabular codec for the local dataset and the export artifact
//!
//! ```text
//! category,name,rating,lat,lng,capacity,link
//! 카페,Cafe Onion,4.5,37.5447,127.056,80,https://example.com/onion
//! ```
//!
//! Fields are read by header name, so column order in the source file does
//! not matter and the `link` column may be missing entirely. Numeric cells
//! that do not parse are treated as absent.

use serde::{Deserialize, Serialize};

use crate::errors::{PoiError, Result};
use crate::model::{PoiRecord, parse_f64, parse_u32};

/// Column order used when writing.
pub const HEADER: [&str; 7] = ["category", "name", "rating", "lat", "lng", "capacity", "link"];

/// Output of a lenient parse: usable records plus what was skipped.
#[derive(Debug, Default)]
pub struct ParseReport {
    pub records: Vec<PoiRecord>,
    /// `PoiError::MalformedRow` entries, one per skipped row.
    pub skipped: Vec<PoiError>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    rating: Option<String>,
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lng: Option<String>,
    #[serde(default)]
    capacity: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

impl RawRow {
    fn is_blank(&self) -> bool {
        [
            &self.category,
            &self.name,
            &self.rating,
            &self.lat,
            &self.lng,
            &self.capacity,
            &self.link,
        ]
        .iter()
        .all(|cell| cell.as_deref().is_none_or(str::is_empty))
    }

    fn into_record(self) -> std::result::Result<PoiRecord, &'static str> {
        let name = self.name.unwrap_or_default();
        if name.is_empty() {
            return Err("missing name");
        }
        let mut record = PoiRecord {
            name,
            category: self.category.unwrap_or_default(),
            rating: self.rating.as_deref().and_then(parse_f64),
            capacity: self.capacity.as_deref().and_then(parse_u32),
            lat: self.lat.as_deref().and_then(parse_f64),
            lng: self.lng.as_deref().and_then(parse_f64),
            link: self.link.filter(|l| !l.is_empty()),
        };
        record.sanitize_coordinates();
        Ok(record)
    }
}

#[derive(Debug, Serialize)]
struct OutRow<'a> {
    category: &'a str,
    name: &'a str,
    rating: Option<f64>,
    lat: Option<f64>,
    lng: Option<f64>,
    capacity: Option<u32>,
    link: Option<&'a str>,
}

impl<'a> From<&'a PoiRecord> for OutRow<'a> {
    fn from(record: &'a PoiRecord) -> Self {
        Self {
            category: &record.category,
            name: &record.name,
            rating: record.rating,
            lat: record.lat,
            lng: record.lng,
            capacity: record.capacity,
            link: record.link.as_deref(),
        }
    }
}

/// Parse a dataset, skipping rows that cannot become a record.
///
/// Entirely blank rows (a trailing newline in a hand-edited file) are
/// dropped silently; other unusable rows are reported in `skipped`.
pub fn parse(input: &str) -> ParseReport {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let mut report = ParseReport::default();
    for (idx, row) in reader.deserialize::<RawRow>().enumerate() {
        // header is line 1
        let fallback_line = idx as u64 + 2;
        match row {
            Ok(raw) if raw.is_blank() => {}
            Ok(raw) => match raw.into_record() {
                Ok(record) => report.records.push(record),
                Err(reason) => report.skipped.push(PoiError::MalformedRow {
                    line: fallback_line,
                    reason: reason.to_string(),
                }),
            },
            Err(err) => {
                let line = err
                    .position()
                    .map(csv::Position::line)
                    .unwrap_or(fallback_line);
                report.skipped.push(PoiError::MalformedRow {
                    line,
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}

/// Serialize a directory with the canonical header.
pub fn serialize(directory: &[PoiRecord]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(HEADER)
        .map_err(|e| PoiError::export_with_source("failed to write header", e))?;
    for record in directory {
        writer
            .serialize(OutRow::from(record))
            .map_err(|e| PoiError::export_with_source("failed to write row", e))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PoiError::export_with_source("failed to flush export", e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| PoiError::export_with_source("export is not UTF-8", e))
}
