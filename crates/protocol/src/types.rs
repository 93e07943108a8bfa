use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in CSS pixels (document or viewport space).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f64 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    /// Overlapping region, or `None` when the rectangles do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.w).min(other.x + other.w);
        let y1 = (self.y + self.h).min(other.y + other.h);
        if x1 > x0 && y1 > y0 {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        } else {
            None
        }
    }

    /// Fraction of `self` covered by `bounds`, in `[0, 1]`.
    ///
    /// A zero-area rectangle reports 1.0 when it lies inside `bounds`
    /// (browsers treat an empty target on screen as fully visible).
    pub fn visible_ratio(&self, bounds: &Rect) -> f64 {
        let area = self.area();
        if area <= 0.0 {
            let inside = self.x >= bounds.x
                && self.y >= bounds.y
                && self.x <= bounds.x + bounds.w
                && self.y <= bounds.y + bounds.h;
            return if inside { 1.0 } else { 0.0 };
        }
        self.intersect(bounds)
            .map_or(0.0, |overlap| (overlap.area() / area).clamp(0.0, 1.0))
    }
}
