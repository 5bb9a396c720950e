//! Tolerant `<area>` extraction.
//!
//! Each `<area>` element is checked independently; a bad element is recorded
//! as a [`SkippedArea`] and never affects its neighbours.

use std::num::IntErrorKind;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::region::{Coordinates, Region, DEFAULT_HREF, RECT_SHAPE};

/// Why an `<area>` element was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("area tag is missing its coords attribute")]
    MissingCoords,

    #[error("coordinate '{token}' is not an integer")]
    InvalidCoordinate { token: String },

    #[error("expected 4 coordinates, got {count}")]
    WrongCoordinateCount { count: usize },

    #[error("unsupported shape '{shape}', only 'rect' is supported")]
    UnsupportedShape { shape: String },
}

/// An `<area>` element that did not produce a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedArea {
    /// Zero-based position among all `<area>` elements in the input
    pub position: usize,
    pub reason: SkipReason,
}

/// Result of parsing a map: the usable regions plus what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MapParseReport {
    pub regions: Vec<Region>,
    pub skipped: Vec<SkippedArea>,
}

impl MapParseReport {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn accept(mut self, position: usize, area: Result<Region, SkipReason>) -> Self {
        match area {
            Ok(region) => {
                debug!(position, coords = %region.coords, "Parsed area tag");
                self.regions.push(region);
            }
            Err(reason) => {
                warn!(position, %reason, "Skipping area tag");
                self.skipped.push(SkippedArea { position, reason });
            }
        }
        self
    }
}

/// Parse image-map markup into regions, in document order.
///
/// Never fails: input without any usable `<area>` yields an empty vector.
pub fn parse_map(html: &str) -> Vec<Region> {
    parse_map_report(html).regions
}

/// Parse image-map markup, keeping track of skipped `<area>` elements.
pub fn parse_map_report(html: &str) -> MapParseReport {
    let content = html.trim();
    if content.is_empty() {
        return MapParseReport::default();
    }

    // Bare <area> fragments are accepted by wrapping them in a map
    let wrapped;
    let content = if starts_with_map_tag(content) {
        content
    } else {
        wrapped = format!(r#"<map name="temp">{content}</map>"#);
        wrapped.as_str()
    };

    let selector = match Selector::parse("area") {
        Ok(selector) => selector,
        Err(e) => {
            error!("Failed to build area selector: {}", e);
            return MapParseReport::default();
        }
    };

    let fragment = Html::parse_fragment(content);
    let report = fragment
        .select(&selector)
        .map(parse_area)
        .enumerate()
        .fold(MapParseReport::default(), |report, (position, area)| {
            report.accept(position, area)
        });

    info!(
        regions = report.regions.len(),
        skipped = report.skipped.len(),
        "Parsed HTML map"
    );
    report
}

/// Check that coordinates describe a non-empty rectangle inside an image.
pub fn validate_coordinates(coords: &Coordinates, image_width: u32, image_height: u32) -> bool {
    coords.fits_within(image_width, image_height) && !coords.is_degenerate()
}

fn starts_with_map_tag(content: &str) -> bool {
    content
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("<map"))
}

fn parse_area(area: ElementRef<'_>) -> Result<Region, SkipReason> {
    let element = area.value();

    let raw_coords = element
        .attr("coords")
        .map(str::trim)
        .filter(|coords| !coords.is_empty())
        .ok_or(SkipReason::MissingCoords)?;
    let coords = parse_coords(raw_coords)?;

    // Compared as written: a padded " rect " is not a rectangle
    let shape = element.attr("shape").unwrap_or(RECT_SHAPE);
    if !shape.eq_ignore_ascii_case(RECT_SHAPE) {
        return Err(SkipReason::UnsupportedShape {
            shape: shape.to_string(),
        });
    }

    let attr = |name: &str| element.attr(name).unwrap_or_default().to_string();

    Ok(Region {
        coords,
        href: element.attr("href").unwrap_or(DEFAULT_HREF).to_string(),
        alt: attr("alt"),
        title: attr("title"),
        shape: RECT_SHAPE.to_string(),
    })
}

fn parse_coords(raw: &str) -> Result<Coordinates, SkipReason> {
    let values = raw
        .split(',')
        .map(|token| {
            let token = token.trim();
            token.parse::<i64>().or_else(|e| match e.kind() {
                // Huge values stay in the batch and fail the bounds check there
                IntErrorKind::PosOverflow => Ok(i64::MAX),
                IntErrorKind::NegOverflow => Ok(i64::MIN),
                _ => Err(SkipReason::InvalidCoordinate {
                    token: token.to_string(),
                }),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let values: [i64; 4] = values
        .try_into()
        .map_err(|values: Vec<i64>| SkipReason::WrongCoordinateCount {
            count: values.len(),
        })?;

    Ok(Coordinates::from(values))
}
