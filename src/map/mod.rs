//! HTML image-map parsing.
//!
//! Turns pasted `<map>`/`<area>` markup into an ordered list of rectangular
//! [`Region`]s. Parsing is tolerant: bare `<area>` fragments are accepted,
//! malformed areas are skipped and logged, and unparseable input yields an
//! empty list rather than an error.
//!
//! ```text
//!  "<area coords=.. href=..>"                     Vec<Region>
//!          │                                           ▲
//!          ▼                                           │
//!   wrap in <map> ──▶ scraper (html5ever) ──▶ fold over <area> elements
//!                                               (valid, skipped)
//! ```
//!
//! # Example
//!
//! ```
//! use imagemapper::map::parse_map;
//!
//! let regions = parse_map(r#"<area coords="0,0,100,50" href="/a" alt="A">"#);
//! assert_eq!(regions.len(), 1);
//! assert_eq!(regions[0].coords.width(), 100);
//! assert_eq!(regions[0].href, "/a");
//! ```

mod parser;
mod region;

pub use parser::{
    parse_map, parse_map_report, validate_coordinates, MapParseReport, SkipReason, SkippedArea,
};
pub use region::{Coordinates, Region, DEFAULT_HREF, RECT_SHAPE};
