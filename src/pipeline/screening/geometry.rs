//! Source-location normalization.
//!
//! The extraction service anchors values either with structured records or
//! with a packed polygon string: `D(page,x1,y1,x2,y2,x3,y3,x4,y4)` segments
//! joined by `;`, coordinates in page-local inches. Polygons are not assumed
//! axis-aligned; each one is reduced to its enclosing axis-aligned box and
//! scaled to points.

use std::sync::LazyLock;

use regex::Regex;

use super::payload::RawSource;
use super::types::{BoundingBox, SourceLocation};

pub const POINTS_PER_INCH: f64 = 72.0;

/// Prefix of every polygon segment in the packed encoding.
pub const SEGMENT_MARKER: &str = "D(";

/// Text used for structured records that carry none.
pub const DEFAULT_SOURCE_TEXT: &str = "source";

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)").expect("valid regex"));

/// Conversion from the service's page unit to points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryScale {
    points_per_unit: f64,
}

impl GeometryScale {
    pub const INCH: Self = Self {
        points_per_unit: POINTS_PER_INCH,
    };

    pub fn points_per_unit(&self) -> f64 {
        self.points_per_unit
    }

    /// Scale for a reported page unit. Absent means inches; any unit other
    /// than inches is unknown and yields `None` rather than a guess.
    pub fn for_unit(unit: Option<&str>) -> Option<Self> {
        match unit.map(|u| u.trim().to_ascii_lowercase()) {
            None => Some(Self::INCH),
            Some(u) if u == "inch" || u == "inches" || u == "in" => Some(Self::INCH),
            Some(_) => None,
        }
    }
}

/// Normalize with the default inch scale.
pub fn normalize_sources(source: Option<&RawSource>) -> Vec<SourceLocation> {
    normalize_sources_scaled(source, Some(GeometryScale::INCH))
}

/// Normalize a raw source into locations. Never fails: absent input yields
/// an empty list; unparseable non-empty text yields one page-1 fallback.
///
/// With `scale == None` encoded polygons keep their page and text but get
/// no bounding box.
pub fn normalize_sources_scaled(
    source: Option<&RawSource>,
    scale: Option<GeometryScale>,
) -> Vec<SourceLocation> {
    match source {
        None => Vec::new(),
        Some(RawSource::Records(records)) => records
            .iter()
            .map(|record| SourceLocation {
                page: record.page.filter(|p| *p > 0).unwrap_or(1),
                bounding_box: record.bounding_box,
                text: record
                    .text
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SOURCE_TEXT.to_string()),
            })
            .collect(),
        Some(RawSource::Encoded(encoded)) => parse_encoded(encoded, scale),
    }
}

fn parse_encoded(encoded: &str, scale: Option<GeometryScale>) -> Vec<SourceLocation> {
    if encoded.trim().is_empty() {
        return Vec::new();
    }

    let locations: Vec<SourceLocation> = encoded
        .split(';')
        .map(str::trim)
        .filter(|segment| segment.starts_with(SEGMENT_MARKER))
        .filter_map(|segment| parse_segment(segment, scale))
        .collect();

    if locations.is_empty() {
        tracing::debug!(source = encoded, "No parseable polygon segment, using fallback location");
        return vec![SourceLocation {
            page: 1,
            bounding_box: None,
            text: encoded.to_string(),
        }];
    }
    locations
}

fn parse_segment(segment: &str, scale: Option<GeometryScale>) -> Option<SourceLocation> {
    let numbers: Vec<f64> = NUMBER_RE
        .find_iter(segment)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .collect();

    if numbers.len() < 9 {
        return None;
    }

    let page = if numbers[0] >= 1.0 && numbers[0] <= f64::from(u32::MAX) {
        numbers[0].trunc() as u32
    } else {
        1
    };

    let xs = [numbers[1], numbers[3], numbers[5], numbers[7]];
    let ys = [numbers[2], numbers[4], numbers[6], numbers[8]];

    Some(SourceLocation {
        page,
        bounding_box: scale.map(|scale| enclosing_box(&xs, &ys, scale)),
        text: segment.to_string(),
    })
}

/// Axis-aligned box enclosing the polygon, in points. The origin is clamped
/// to the page edge; width and height are the exact scaled extent.
fn enclosing_box(xs: &[f64; 4], ys: &[f64; 4], scale: GeometryScale) -> BoundingBox {
    let (min_x, max_x) = min_max(xs);
    let (min_y, max_y) = min_max(ys);
    let k = scale.points_per_unit();
    BoundingBox {
        x: (min_x * k).max(0.0),
        y: (min_y * k).max(0.0),
        w: (max_x - min_x) * k,
        h: (max_y - min_y) * k,
    }
}

fn min_max(values: &[f64; 4]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}
