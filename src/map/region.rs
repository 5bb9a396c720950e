use std::fmt;

use serde::Serialize;

/// Link used when an area has no `href`.
pub const DEFAULT_HREF: &str = "#";

/// The only supported area shape.
pub const RECT_SHAPE: &str = "rect";

/// Rectangle corners in source-image pixel space, origin top-left.
///
/// Values are kept signed so that negative coordinates in a map survive
/// parsing and are rejected by the slicer with a bounds error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Coordinates {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl Coordinates {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Horizontal extent (`x2 - x1`), negative for inverted rectangles.
    pub fn width(&self) -> i64 {
        self.x2.saturating_sub(self.x1)
    }

    /// Vertical extent (`y2 - y1`), negative for inverted rectangles.
    pub fn height(&self) -> i64 {
        self.y2.saturating_sub(self.y1)
    }

    /// True when the rectangle lies inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x1 >= 0
            && self.y1 >= 0
            && self.x2 <= i64::from(width)
            && self.y2 <= i64::from(height)
    }

    /// True when the rectangle has no area.
    pub fn is_degenerate(&self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }
}

impl From<[i64; 4]> for Coordinates {
    fn from([x1, y1, x2, y2]: [i64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// One `<area>` of an image map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub coords: Coordinates,

    /// Link target, `"#"` when the area had none
    pub href: String,

    /// Accessibility text, empty when absent
    pub alt: String,

    /// Tooltip text, empty when absent
    pub title: String,

    /// Always `"rect"`
    pub shape: String,
}

impl Region {
    /// Create a rectangle region with default link metadata.
    pub fn rect(coords: Coordinates) -> Self {
        Self {
            coords,
            href: DEFAULT_HREF.to_string(),
            alt: String::new(),
            title: String::new(),
            shape: RECT_SHAPE.to_string(),
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = href.into();
        self
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = alt.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}
