//! Directory record model
//!
//! `PoiRecord` is the canonical directory entry. Coordinates are optional at
//! the type level: a record without usable coordinates stays in the
//! directory (and in listings) but is never handed to the map.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{PoiError, Result};

/// A point with valid, finite WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Returns `None` unless both values are finite and inside WGS84 range.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Self::new(lat, lng),
            _ => None,
        }
    }
}

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Empty when the source had no category; such records are left out of
    /// the category index.
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub capacity: Option<u32>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl PoiRecord {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            rating: None,
            capacity: None,
            lat: None,
            lng: None,
            link: None,
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.lat, self.lng)
    }

    pub fn is_map_eligible(&self) -> bool {
        self.coordinates().is_some()
    }

    /// Drop coordinates that are non-finite or out of range, so the record
    /// carries either both valid values or nothing map-relevant.
    pub(crate) fn sanitize_coordinates(&mut self) {
        if self.coordinates().is_none() {
            self.lat = None;
            self.lng = None;
        }
    }
}

/// Ordered directory. Insertion order is display and iteration order.
pub type Directory = Vec<PoiRecord>;

/// A result row returned by the external search service.
///
/// `external_x`/`external_y` are fixed-point longitude/latitude scaled by the
/// search provider's factor (see `SearchConfig::coordinate_scale`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub external_x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub external_y: Option<f64>,
}

impl Candidate {
    /// Convert into a pending record, dividing the external fixed-point
    /// coordinates by `scale` to obtain decimal degrees.
    pub fn to_pending(&self, scale: f64) -> PendingCandidate {
        let name = self.name.trim();
        PendingCandidate {
            name: (!name.is_empty()).then(|| name.to_string()),
            category: self.category.clone(),
            address: (!self.address.is_empty()).then(|| self.address.clone()),
            lat: self.external_y.map(|y| y / scale),
            lng: self.external_x.map(|x| x / scale),
            link: self.link.clone().filter(|l| !l.trim().is_empty()),
            ..PendingCandidate::default()
        }
    }
}

/// A partially filled record waiting for confirmation.
///
/// Lives only for the duration of one add flow and is never persisted as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingCandidate {
    pub name: Option<String>,
    pub category: String,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub capacity: Option<u32>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub link: Option<String>,
}

impl PendingCandidate {
    /// Validate and turn the candidate into a directory record.
    ///
    /// # Errors
    /// - `MissingName` when the name is absent or blank.
    /// - `MissingCoordinates` when lat/lng are absent, non-finite or out of range.
    pub fn validate(&self) -> Result<PoiRecord> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(PoiError::MissingName)?;
        let coords =
            Coordinates::from_parts(self.lat, self.lng).ok_or(PoiError::MissingCoordinates)?;

        Ok(PoiRecord {
            name: name.to_string(),
            category: self.category.trim().to_string(),
            rating: self.rating.filter(|r| r.is_finite()),
            capacity: self.capacity,
            lat: Some(coords.lat),
            lng: Some(coords.lng),
            link: self.link.clone(),
        })
    }
}

/// Parse a numeric cell the lenient way: malformed or non-finite is absent.
pub(crate) fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn parse_u32(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    raw.parse::<u32>().ok().or_else(|| {
        // "120.0" style integers from spreadsheet exports
        parse_f64(raw)
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX))
            .map(|v| v as u32)
    })
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_f64(s),
        _ => None,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_f64))
}

fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| n.as_f64().and_then(|f| parse_u32(&f.to_string()))),
        Some(Value::String(s)) => parse_u32(&s),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}
