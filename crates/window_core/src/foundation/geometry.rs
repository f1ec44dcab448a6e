//! Integer geometry value types used for window placement
//!
//! All coordinates are in screen pixels with a top-left origin. Window
//! positions and sizes describe the client area, i.e. they exclude the
//! decoration [`Insets`].

use serde::{Deserialize, Serialize};

/// A point in screen or window space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: i32,
    /// Vertical coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate this point by the given offset
    pub const fn translated(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A width/height pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Size {
    /// Create a new size
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True if both dimensions are strictly positive
    pub const fn has_area(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Clamp each dimension so it does not exceed `bounds`
    pub fn clamped_to(self, bounds: Self) -> Self {
        Self::new(self.width.min(bounds.width), self.height.min(bounds.height))
    }
}

/// An axis aligned rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a rectangle from a position and a size
    pub const fn from_parts(position: Point, size: Size) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    /// Top-left corner
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Width and height
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Right edge (exclusive)
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive)
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Area in square pixels, zero for degenerate rectangles
    pub fn area(&self) -> i64 {
        if self.width <= 0 || self.height <= 0 {
            0
        } else {
            i64::from(self.width) * i64::from(self.height)
        }
    }

    /// True if `other` lies completely inside this rectangle
    pub const fn contains_rect(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Intersection of two rectangles; empty (zero sized) if disjoint
    pub fn intersection(&self, other: &Self) -> Self {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            Self::new(x1, y1, 0, 0)
        } else {
            Self::new(x1, y1, x2 - x1, y2 - y1)
        }
    }

    /// Smallest rectangle covering both rectangles
    pub fn union(&self, other: &Self) -> Self {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Bounding box of all rectangles, `None` for an empty iterator
    pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Self>) -> Option<Self> {
        rects
            .into_iter()
            .fold(None, |acc: Option<Self>, r| Some(acc.map_or(*r, |u| u.union(r))))
    }
}

/// Decoration border thickness around the client area
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Insets {
    /// Left border width
    pub left: i32,
    /// Right border width
    pub right: i32,
    /// Top border height (usually includes the title bar)
    pub top: i32,
    /// Bottom border height
    pub bottom: i32,
}

impl Insets {
    /// Insets of an undecorated window
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Create new insets
    pub const fn new(left: i32, right: i32, top: i32, bottom: i32) -> Self {
        Self { left, right, top, bottom }
    }

    /// `left + right`
    pub const fn total_width(&self) -> i32 {
        self.left + self.right
    }

    /// `top + bottom`
    pub const fn total_height(&self) -> i32 {
        self.top + self.bottom
    }

    /// True if every border is non-negative
    pub const fn is_valid(&self) -> bool {
        self.left >= 0 && self.right >= 0 && self.top >= 0 && self.bottom >= 0
    }
}
