use serde::{Deserialize, Serialize};

/// A face box in normalized frame coordinates (0.0 to 1.0).
///
/// Edges are stored the way the annotation files publish them:
/// `top`/`bottom` on the vertical axis, `left`/`right` on the horizontal one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    /// Top edge (0.0 = top of frame)
    pub top: f64,
    /// Bottom edge (1.0 = bottom of frame)
    pub bottom: f64,
    /// Left edge (0.0 = left of frame)
    pub left: f64,
    /// Right edge (1.0 = right of frame)
    pub right: f64,
}

impl NormalizedBox {
    /// Create a new normalized box.
    pub fn new(top: f64, bottom: f64, left: f64, right: f64) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Height in normalized units.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Width in normalized units.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Vertical center in normalized units.
    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Horizontal center in normalized units.
    pub fn center_x(&self) -> f64 {
        (self.left + self.right) / 2.0
    }

    /// Check that every edge is a finite value inside `[0, 1]`.
    pub fn is_in_unit_range(&self) -> bool {
        [self.top, self.bottom, self.left, self.right]
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }

    /// Check if the box is valid (in range, with positive height and width).
    pub fn is_valid(&self) -> bool {
        self.is_in_unit_range() && self.top < self.bottom && self.left < self.right
    }

    /// True when the box has no area on at least one axis.
    pub fn is_degenerate(&self) -> bool {
        self.top >= self.bottom || self.left >= self.right
    }

    /// Grow every side by `ratio`, clamping to the frame.
    pub fn expand(&self, ratio: f64) -> Self {
        Self {
            top: (self.top - ratio).max(0.0),
            bottom: (self.bottom + ratio).min(1.0),
            left: (self.left - ratio).max(0.0),
            right: (self.right + ratio).min(1.0),
        }
    }
}

/// A pixel-space square crop window.
///
/// Produced per clip from the source's frame dimensions; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRectangle {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl CropRectangle {
    /// Create a new crop rectangle.
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_square(&self) -> bool {
        self.width() == self.height()
    }

    /// Check that the rectangle is non-empty and lies inside a frame of the given size.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.top < self.bottom
            && self.left < self.right
            && self.bottom <= frame_height
            && self.right <= frame_width
    }

    /// FFmpeg `crop` filter for this rectangle.
    pub fn ffmpeg_crop_filter(&self) -> String {
        format!(
            "crop=w={}:h={}:x={}:y={}",
            self.width(),
            self.height(),
            self.left,
            self.top
        )
    }
}
