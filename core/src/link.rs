//! Coordinates from a pasted map link
//!
//! Older add flows asked the user to paste a map URL and pulled the position
//! out of it. The search bridge replaces that; this parser remains as an
//! alternate way to fill a pending candidate by hand.
//!
//! Recognised forms:
//! - query parameters: `...?lat=37.5665&lng=126.978` (`lon`/`long` accepted)
//! - path segment: `.../@37.5665,126.978,17z`

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::model::{Coordinates, parse_f64};

static QUERY_RE: OnceLock<Option<(Regex, Regex)>> = OnceLock::new();
static AT_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn query_patterns() -> Option<&'static (Regex, Regex)> {
    QUERY_RE
        .get_or_init(|| {
            let lat = Regex::new(r"[?&#]lat=(-?[0-9]+(?:\.[0-9]+)?)").ok()?;
            let lng = Regex::new(r"[?&#](?:lng|lon|long)=(-?[0-9]+(?:\.[0-9]+)?)").ok()?;
            Some((lat, lng))
        })
        .as_ref()
}

fn at_pattern() -> Option<&'static Regex> {
    AT_RE
        .get_or_init(|| Regex::new(r"@(-?[0-9]+(?:\.[0-9]+)?),(-?[0-9]+(?:\.[0-9]+)?)").ok())
        .as_ref()
}

fn capture_f64(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_f64(m.as_str()))
}

/// Extract a valid position from a map URL, if it carries one.
pub fn parse_map_link(link: &str) -> Option<Coordinates> {
    let link = link.trim();

    if let Some((lat_re, lng_re)) = query_patterns()
        && let (Some(lat), Some(lng)) = (capture_f64(lat_re, link), capture_f64(lng_re, link))
    {
        return Coordinates::new(lat, lng);
    }

    let caps = at_pattern()?.captures(link)?;
    let lat = parse_f64(caps.get(1)?.as_str())?;
    let lng = parse_f64(caps.get(2)?.as_str())?;
    Coordinates::new(lat, lng)
}
