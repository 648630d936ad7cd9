//! Screen layout and NDC transforms.
//!
//! Row heights are derived from a physical size in centimeters. Backing-store
//! pixels are assumed to be `dpi` per inch, so a higher device pixel ratio yields
//! more centimeters of surface and therefore shorter rows in NDC.

use crate::{CM_PER_INCH, DEFAULT_DPI};

/// Drawing surface dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screen {
    /// Logical width in pixels.
    pub width: u32,
    /// Logical height in pixels.
    pub height: u32,
    /// Backing-store pixels per logical pixel.
    pub pixel_ratio: f32,
    /// Backing-store pixels per inch.
    pub dpi: f32,
}

impl Screen {
    /// Creates a screen, clamping sizes to at least one pixel and non-positive
    /// ratios to 1.
    #[must_use]
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        Self {
            width: width.max(1),
            height: height.max(1),
            pixel_ratio,
            dpi: DEFAULT_DPI,
        }
    }

    #[must_use]
    pub fn with_dpi(mut self, dpi: f32) -> Self {
        if dpi.is_finite() && dpi > 0.0 {
            self.dpi = dpi;
        }
        self
    }

    /// Physical backing-store size.
    pub fn backing_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.pixel_ratio).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    /// Surface size in centimeters.
    pub fn size_cm(&self) -> (f32, f32) {
        let to_cm = |v: u32| v as f32 * self.pixel_ratio / self.dpi * CM_PER_INCH;
        (to_cm(self.width), to_cm(self.height))
    }

    /// NDC units per centimeter on each axis.
    pub fn cm_scale(&self) -> [f32; 2] {
        let (w, h) = self.size_cm();
        [2.0 / w, 2.0 / h]
    }

    /// Height of one channel row in NDC.
    pub fn row_height(&self, channel_height_cm: f32) -> f32 {
        self.cm_scale()[1] * channel_height_cm
    }

    /// Logical height needed to show `rows` rows of `channel_height_cm` each.
    pub fn height_for_rows(&self, rows: usize, channel_height_cm: f32) -> u32 {
        let backing = rows as f32 * channel_height_cm / CM_PER_INCH * self.dpi;
        (backing / self.pixel_ratio).ceil() as u32
    }

    /// NDC width of one backing-store pixel.
    pub fn ndc_per_backing_pixel(&self) -> [f32; 2] {
        let (w, h) = self.backing_size();
        [2.0 / w as f32, 2.0 / h as f32]
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new(1, 1, 1.0)
    }
}

/// Vertical NDC center of row `row_index`.
pub fn row_center(row_height: f32, row_index: usize) -> f32 {
    1.0 - row_height * (row_index as f32 + 0.5)
}

/// Vertical NDC position of the separator below row `row_index`.
pub fn separator_y(row_height: f32, row_index: usize) -> f32 {
    1.0 - (row_index as f32 + 1.0) * row_height
}

/// Placement of one visible channel row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    /// Rank among visible channels, top to bottom.
    pub index: usize,
    /// Row height in NDC.
    pub height: f32,
    /// NDC units per sample unit.
    pub scale: f32,
}

impl Row {
    pub fn center(&self) -> f32 {
        row_center(self.height, self.index)
    }
}

/// Column-major 4x4 affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    cols: [[f32; 4]; 4],
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// `p' = (sx * x + tx, sy * y + ty)`.
    #[must_use]
    pub fn scale_translate(sx: f32, sy: f32, tx: f32, ty: f32) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [tx, ty, 0.0, 1.0],
            ],
        }
    }

    /// Maps `[0, history_len - 1] x amplitude` into a horizontal strip spanning the
    /// full NDC width, centred at `center_y` with vertical scale `row_scale`.
    #[must_use]
    pub fn strip(history_len: usize, center_y: f32, row_scale: f32) -> Self {
        let span = history_len.saturating_sub(1).max(1) as f32;
        Self::scale_translate(2.0 / span, row_scale, -1.0, center_y)
    }

    /// Maps the unit square onto an NDC rectangle with bottom-left `origin`.
    #[must_use]
    pub fn rect(origin: [f32; 2], size: [f32; 2]) -> Self {
        Self::scale_translate(size[0], size[1], origin[0], origin[1])
    }

    /// Apply to a 2D point (z = 0, w = 1).
    pub fn apply(&self, p: [f32; 2]) -> [f32; 2] {
        let c = &self.cols;
        [
            c[0][0] * p[0] + c[1][0] * p[1] + c[3][0],
            c[0][1] * p[0] + c[1][1] * p[1] + c[3][1],
        ]
    }

    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        self.cols
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Transform> for [[f32; 4]; 4] {
    fn from(t: Transform) -> Self {
        t.cols
    }
}
