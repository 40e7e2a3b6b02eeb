#![forbid(unsafe_code)]

//! Geometric primitives in viewport (CSS pixel) coordinates.

/// An axis-aligned rectangle in viewport coordinates.
///
/// Origin at top-left, `y` grows downward. Width and height are never
/// negative once constructed through [`ViewportRect::new`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportRect {
    /// Create a new rectangle. Negative sizes are clamped to zero.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Rectangle at the origin with the given size.
    #[inline]
    #[must_use]
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Same rectangle moved by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Grow each side outward by the given amounts. Negative amounts shrink.
    #[must_use]
    pub fn outset(&self, top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self::new(
            self.x - left,
            self.y - top,
            self.width + left + right,
            self.height + top + bottom,
        )
    }

    /// Overlap with another rectangle, or `None` if they do not overlap.
    #[must_use]
    pub fn intersection_opt(&self, other: &ViewportRect) -> Option<ViewportRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if x < right && y < bottom {
            Some(ViewportRect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Fraction of this rectangle's area that lies inside `root`, in `[0, 1]`.
    ///
    /// An empty target has ratio 0.
    #[must_use]
    pub fn visible_ratio(&self, root: &ViewportRect) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.intersection_opt(root)
            .map_or(0.0, |overlap| (overlap.area() / self.area()).clamp(0.0, 1.0))
    }
}
