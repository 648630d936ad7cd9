//! Label badge geometry.

/// Pixel layout of a rounded-rectangle badge around a block of text.
///
/// All values are in backing-store pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeGeometry {
    pub width: u32,
    pub height: u32,
    pub padding_x: u32,
    pub padding_y: u32,
    pub radius: f32,
}

impl BadgeGeometry {
    /// Lay out a badge around text of the given size. Padding and radius are in
    /// logical pixels and are scaled by `pixel_ratio`.
    #[must_use]
    pub fn around_text(
        text_width: u32,
        text_height: u32,
        padding: [f32; 2],
        radius: f32,
        pixel_ratio: f32,
    ) -> Self {
        let scale = |v: f32| (v.max(0.0) * pixel_ratio).round() as u32;
        let padding_x = scale(padding[0]);
        let padding_y = scale(padding[1]);
        let width = (text_width + 2 * padding_x).max(1);
        let height = (text_height + 2 * padding_y).max(1);
        let radius = (radius.max(0.0) * pixel_ratio)
            .min(width as f32 / 2.0)
            .min(height as f32 / 2.0);
        Self {
            width,
            height,
            padding_x,
            padding_y,
            radius,
        }
    }

    /// Top-left pixel where text starts.
    pub fn text_origin(&self) -> (u32, u32) {
        (self.padding_x, self.padding_y)
    }

    /// Anti-aliased rounded-rectangle coverage (0.0-1.0) of pixel `(x, y)`.
    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        let half_w = self.width as f32 / 2.0;
        let half_h = self.height as f32 / 2.0;
        let px = x as f32 + 0.5 - half_w;
        let py = y as f32 + 0.5 - half_h;

        let qx = px.abs() - (half_w - self.radius);
        let qy = py.abs() - (half_h - self.radius);
        let outside = qx.max(0.0).hypot(qy.max(0.0));
        let inside = qx.max(qy).min(0.0);
        let distance = outside + inside - self.radius;

        (0.5 - distance).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_includes_scaled_padding() {
        let g = BadgeGeometry::around_text(40, 16, [6.0, 2.0], 4.0, 2.0);
        assert_eq!((g.width, g.height), (64, 24));
        assert_eq!(g.text_origin(), (12, 4));
        assert_eq!(g.radius, 8.0);
    }

    #[test]
    fn test_radius_clamped_to_half_height() {
        let g = BadgeGeometry::around_text(40, 6, [0.0, 0.0], 20.0, 1.0);
        assert_eq!(g.radius, 3.0);
    }

    #[test]
    fn test_coverage() {
        let g = BadgeGeometry::around_text(40, 16, [6.0, 2.0], 4.0, 1.0);
        assert_eq!(g.coverage(g.width / 2, g.height / 2), 1.0);
        // middle of the left edge is inside the straight part of the outline
        assert_eq!(g.coverage(0, g.height / 2), 1.0);
        // the very corner is cut away by the radius
        assert!(g.coverage(0, 0) < 0.5);
    }
}
