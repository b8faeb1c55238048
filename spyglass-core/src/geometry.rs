//! Screen geometry and highlight colors shared by both engines.
//!
//! Two rectangle shapes are used: [`Rectangle`] (`x, y, width, height`),
//! which is what the controller and UI Automation speak, and [`ScreenRect`]
//! (`left, top, right, bottom`), which is what Win32 window and invalidation
//! calls speak.

use serde::{Deserialize, Serialize};

/// Highlight rectangle in device pixels.
///
/// Equality is structural: two rectangles are "the same highlight" only when
/// all four fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from edge coordinates (e.g. a UIA bounding `RECT`).
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(
            left,
            top,
            right.saturating_sub(left),
            bottom.saturating_sub(top),
        )
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Zero or negative extent: nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Edge form of this rectangle grown by `margin` pixels on every side.
    pub fn inflate(&self, margin: i32) -> ScreenRect {
        ScreenRect {
            left: self.x.saturating_sub(margin),
            top: self.y.saturating_sub(margin),
            right: self.right().saturating_add(margin),
            bottom: self.bottom().saturating_add(margin),
        }
    }
}

/// Rectangle in edge form, as returned by `GetWindowRect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Point containment, inclusive on all four edges.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.left <= x && x <= self.right && self.top <= y && y <= self.bottom
    }

    /// True when `other` lies entirely inside `self`.
    pub fn covers(&self, other: &ScreenRect) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }
}

/// The closed set of highlight colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorId {
    #[default]
    Green,
    Red,
    Blue,
    Orange,
    Purple,
}

impl ColorId {
    /// Resolve a color name; anything unrecognised is green.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "red" => ColorId::Red,
            "blue" => ColorId::Blue,
            "orange" => ColorId::Orange,
            "purple" => ColorId::Purple,
            _ => ColorId::Green,
        }
    }

    /// Tracker coloring: green for interactive elements, blue otherwise.
    pub fn for_interactivity(interactive: bool) -> Self {
        if interactive {
            ColorId::Green
        } else {
            ColorId::Blue
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ColorId::Green => "green",
            ColorId::Red => "red",
            ColorId::Blue => "blue",
            ColorId::Orange => "orange",
            ColorId::Purple => "purple",
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            ColorId::Green => (34, 197, 94),
            ColorId::Red => (255, 0, 0),
            ColorId::Blue => (59, 130, 246),
            ColorId::Orange => (255, 165, 0),
            ColorId::Purple => (139, 92, 246),
        }
    }

    /// Win32 `COLORREF` layout: `0x00BBGGRR`.
    pub fn colorref(self) -> u32 {
        let (r, g, b) = self.rgb();
        (r as u32) | ((g as u32) << 8) | ((b as u32) << 16)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_edges() {
        let r = Rectangle::new(10, 20, 50, 30);
        assert_eq!(r.right(), 60);
        assert_eq!(r.bottom(), 50);
        assert_eq!(Rectangle::from_edges(10, 20, 60, 50), r);
    }

    #[test]
    fn test_empty_rectangles() {
        assert!(Rectangle::new(0, 0, 0, 10).is_empty());
        assert!(Rectangle::new(0, 0, 10, 0).is_empty());
        assert!(Rectangle::new(5, 5, -3, 10).is_empty());
        assert!(!Rectangle::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn test_inflate_grows_every_side() {
        let r = Rectangle::new(10, 20, 50, 30).inflate(5);
        assert_eq!(r, ScreenRect::new(5, 15, 65, 55));
    }

    #[test]
    fn test_inflate_saturates() {
        let r = Rectangle::new(i32::MIN, 0, 10, 10).inflate(5);
        assert_eq!(r.left, i32::MIN);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let r = ScreenRect::new(0, 0, 100, 50);
        assert!(r.contains(0, 0));
        assert!(r.contains(100, 50));
        assert!(!r.contains(101, 50));
        assert!(!r.contains(-1, 10));
    }

    #[test]
    fn test_covers() {
        let outer = ScreenRect::new(0, 0, 100, 100);
        assert!(outer.covers(&ScreenRect::new(10, 10, 90, 90)));
        assert!(outer.covers(&outer));
        assert!(!outer.covers(&ScreenRect::new(-1, 10, 90, 90)));
    }

    #[test]
    fn test_color_names_fall_back_to_green() {
        assert_eq!(ColorId::from_name("red"), ColorId::Red);
        assert_eq!(ColorId::from_name("PURPLE"), ColorId::Purple);
        assert_eq!(ColorId::from_name("magenta"), ColorId::Green);
        assert_eq!(ColorId::from_name(""), ColorId::Green);
    }

    #[test]
    fn test_color_for_interactivity() {
        assert_eq!(ColorId::for_interactivity(true), ColorId::Green);
        assert_eq!(ColorId::for_interactivity(false), ColorId::Blue);
    }

    #[test]
    fn test_colorref_is_bgr() {
        assert_eq!(ColorId::Red.colorref(), 0x0000_00FF);
        assert_eq!(ColorId::Blue.colorref(), 0x00F6_823B);
    }

    #[test]
    fn test_rectangle_serialization() {
        let json = serde_json::to_string(&Rectangle::new(1, 2, 3, 4)).unwrap();
        assert_eq!(json, r#"{"x":1,"y":2,"width":3,"height":4}"#);
    }
}
