//! Two-line element set parsing and orbital parameter derivation.
//!
//! Pure text processing; the fetchers hand the raw feed text in here.
//! A malformed element set yields `None`/`Err` and the surrounding import
//! continues — one bad record never aborts a feed.

use serde_json::{Map, Number, Value};

/// Standard gravitational parameter of Earth, km^3/s^2.
const GM: f64 = 398600.4418;

/// Mean equatorial radius, km.
const EARTH_RADIUS_KM: f64 = 6378.137;

/// One named element set from a 3-line feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSet {
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub international_designator: String,
}

/// Parse a 3-line TLE feed: name line, then element lines starting
/// `"1 "` / `"2 "`, both at least 69 characters. Records failing those
/// checks or lacking an international designator (line 1, columns 9..17)
/// are dropped silently, matching the feed's own tolerance for blank
/// trailing groups.
pub fn parse_feed(content: &str) -> Vec<ElementSet> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i + 2 < lines.len() {
        let name = lines[i].trim();
        let line1 = lines[i + 1].trim();
        let line2 = lines[i + 2].trim();
        if line1.starts_with("1 ")
            && line1.len() >= 69
            && line2.starts_with("2 ")
            && line2.len() >= 69
        {
            if let Some(designator) = designator_from_line1(line1) {
                out.push(ElementSet {
                    name: name.to_string(),
                    line1: line1.to_string(),
                    line2: line2.to_string(),
                    international_designator: designator,
                });
            }
        }
        i += 3;
    }
    out
}

/// International designator field of line 1 (columns 9..17), trimmed.
fn designator_from_line1(line1: &str) -> Option<String> {
    let field = line1.get(9..17)?.trim();
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

/// Orbital parameters derivable from line 2 alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalParameters {
    pub apogee_km: f64,
    pub perigee_km: f64,
    pub inclination_degrees: f64,
    pub period_minutes: f64,
    pub semi_major_axis_km: f64,
    pub eccentricity: f64,
    pub mean_motion_rev_day: f64,
}

/// Derive orbital parameters from TLE line 2: inclination at columns
/// 8..16, eccentricity (implied leading `0.`) at 26..33, mean motion at
/// 52..63. `None` when any field fails to parse.
pub fn derive_parameters(line2: &str) -> Option<OrbitalParameters> {
    let inclination: f64 = line2.get(8..16)?.trim().parse().ok()?;
    let eccentricity: f64 = format!("0.{}", line2.get(26..33)?.trim()).parse().ok()?;
    let mean_motion: f64 = line2.get(52..63)?.trim().parse().ok()?;
    if mean_motion <= 0.0 {
        return None;
    }

    let period_minutes = 1440.0 / mean_motion;
    let n_rad_per_sec = mean_motion * 2.0 * std::f64::consts::PI / 86400.0;
    let semi_major_axis = (GM / (n_rad_per_sec * n_rad_per_sec)).cbrt();
    let apogee = semi_major_axis * (1.0 + eccentricity) - EARTH_RADIUS_KM;
    let perigee = semi_major_axis * (1.0 - eccentricity) - EARTH_RADIUS_KM;

    Some(OrbitalParameters {
        apogee_km: round(apogee, 2),
        perigee_km: round(perigee, 2),
        inclination_degrees: round(inclination, 2),
        period_minutes: round(period_minutes, 2),
        semi_major_axis_km: round(semi_major_axis, 2),
        eccentricity: round(eccentricity, 6),
        mean_motion_rev_day: round(mean_motion, 6),
    })
}

fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

impl OrbitalParameters {
    /// Merge the parameters into a source record under their feed names.
    pub fn write_into(&self, fields: &mut Map<String, Value>) {
        let pairs = [
            ("apogee_km", self.apogee_km),
            ("perigee_km", self.perigee_km),
            ("inclination_degrees", self.inclination_degrees),
            ("period_minutes", self.period_minutes),
            ("semi_major_axis_km", self.semi_major_axis_km),
            ("eccentricity", self.eccentricity),
            ("mean_motion_rev_day", self.mean_motion_rev_day),
        ];
        for (key, value) in pairs {
            if let Some(number) = Number::from_f64(value) {
                fields.insert(key.to_string(), Value::Number(number));
            }
        }
    }
}
