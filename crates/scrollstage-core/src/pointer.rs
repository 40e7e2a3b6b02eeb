#![forbid(unsafe_code)]

//! Pointer coordinates.

/// Viewport-relative pointer coordinates, as reported by the host.
///
/// No smoothing or clamping is applied at this layer; values may be
/// negative or exceed the viewport if the host reports them that way.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    /// Position before any pointer movement has been observed.
    pub const ORIGIN: PointerPosition = PointerPosition { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset from the center of a viewport of the given size, normalized to
    /// `[-1, 1]` on each axis when the pointer is inside the viewport.
    ///
    /// Returns `(0, 0)` for a degenerate viewport.
    #[must_use]
    pub fn normalized_offset(&self, width: f64, height: f64) -> (f64, f64) {
        if width <= 0.0 || height <= 0.0 {
            return (0.0, 0.0);
        }
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        ((self.x - half_w) / half_w, (self.y - half_h) / half_h)
    }
}

impl From<(f64, f64)> for PointerPosition {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for PointerPosition {
    fn from((x, y): (i32, i32)) -> Self {
        Self {
            x: f64::from(x),
            y: f64::from(y),
        }
    }
}
