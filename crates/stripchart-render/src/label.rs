//! Channel name badges.
//!
//! A badge is rasterized on the CPU into an [`RgbaImage`], uploaded once as a
//! texture and drawn as a unit quad. It is rebuilt only when the pixel ratio
//! changes.

use image::{Rgba, RgbaImage};
use stripchart_config::LabelConfig;
use stripchart_core::{BadgeGeometry, Rgb, Transform};

use crate::backend::{BufferId, RenderBackend, TextureId, Topology};
use crate::frame::Frame;
use crate::gpu_types::LABEL_QUAD;
use crate::program::ProgramKind;
use crate::text::{GlyphMask, TextRasterizer};

/// Badge appearance, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    pub font_size: f32,
    pub left_offset: f32,
    pub padding: [f32; 2],
    pub corner_radius: f32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self::from(&LabelConfig::default())
    }
}

impl From<&LabelConfig> for LabelStyle {
    fn from(config: &LabelConfig) -> Self {
        Self {
            font_size: config.font_size,
            left_offset: config.left_offset,
            padding: [config.padding_x, config.padding_y],
            corner_radius: config.corner_radius,
        }
    }
}

/// Composite text coverage over a rounded badge in `background`.
///
/// Text is drawn in the background's contrasting color; pixels outside the
/// rounded outline are transparent.
pub fn compose_badge(mask: &GlyphMask, geometry: &BadgeGeometry, background: Rgb) -> RgbaImage {
    let foreground = background.contrasting_text();
    let (text_x, text_y) = geometry.text_origin();
    let mut image = RgbaImage::new(geometry.width, geometry.height);

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let shape = geometry.coverage(x, y);
        let ink = if x >= text_x && y >= text_y {
            mask.get(x - text_x, y - text_y) as f32 / 255.0
        } else {
            0.0
        };
        let mix = |bg: f32, fg: f32| bg + (fg - bg) * ink;
        let color = Rgb::new(
            mix(background.r, foreground.r),
            mix(background.g, foreground.g),
            mix(background.b, foreground.b),
        );
        *pixel = Rgba(color.to_rgba8((shape * 255.0).round() as u8));
    }
    image
}

/// Rasterize a complete badge for `text` at `pixel_ratio`.
pub fn rasterize_badge(
    rasterizer: &mut dyn TextRasterizer,
    text: &str,
    color: Rgb,
    style: &LabelStyle,
    pixel_ratio: f32,
) -> RgbaImage {
    let mask = rasterizer.rasterize(text, style.font_size * pixel_ratio);
    let geometry = BadgeGeometry::around_text(
        mask.width,
        mask.height,
        style.padding,
        style.corner_radius,
        pixel_ratio,
    );
    compose_badge(&mask, &geometry, color)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BadgeTexture {
    texture: TextureId,
    width: u32,
    height: u32,
    pixel_ratio: f32,
}

/// Draws one channel's name badge.
#[derive(Debug)]
pub struct LabelRenderer {
    text: String,
    color: Rgb,
    quad: BufferId,
    badge: Option<BadgeTexture>,
}

impl LabelRenderer {
    pub fn new<B: RenderBackend>(backend: &mut B, text: &str, color: Rgb) -> Self {
        let quad = backend.create_buffer(&format!("{text} label quad"));
        backend.upload_buffer(quad, bytemuck::cast_slice(&LABEL_QUAD));
        Self {
            text: text.to_string(),
            color,
            quad,
            badge: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Texture currently holding the badge, if it has been rasterized.
    pub fn texture(&self) -> Option<TextureId> {
        self.badge.map(|b| b.texture)
    }

    /// Draw the badge left-aligned and vertically centred on `center_y` (NDC).
    pub fn render<B: RenderBackend>(&mut self, frame: &mut Frame<'_, B>, center_y: f32) {
        let screen = frame.screen;
        let badge = self.ensure_badge(
            frame.backend,
            frame.rasterizer,
            frame.label_style,
            screen.pixel_ratio,
        );

        let [ndc_x, ndc_y] = screen.ndc_per_backing_pixel();
        let size = [badge.width as f32 * ndc_x, badge.height as f32 * ndc_y];
        let left = (frame.label_style.left_offset * screen.pixel_ratio).round();
        let origin = [-1.0 + left * ndc_x, center_y - size[1] / 2.0];

        let program = frame.programs.get_mut(ProgramKind::Label);
        frame.backend.bind_buffer(self.quad);
        frame.backend.bind_texture(0, badge.texture);
        program.activate(frame.backend);
        program.set_uniform(frame.backend, "transform", Transform::rect(origin, size));
        program.set_uniform(frame.backend, "t_label", 0i32);
        frame.backend.draw_arrays(Topology::TriangleStrip, 0, 4);
        program.deactivate(frame.backend);
    }

    fn ensure_badge<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        rasterizer: &mut dyn TextRasterizer,
        style: &LabelStyle,
        pixel_ratio: f32,
    ) -> BadgeTexture {
        if let Some(badge) = self.badge.filter(|b| b.pixel_ratio == pixel_ratio) {
            return badge;
        }
        if let Some(stale) = self.badge.take() {
            backend.delete_texture(stale.texture);
        }

        let image = rasterize_badge(rasterizer, &self.text, self.color, style, pixel_ratio);
        let texture = backend.create_texture(&format!("{} label", self.text), &image);
        log::debug!(
            "Rasterized label {} at {}x{} (ratio {pixel_ratio})",
            self.text,
            image.width(),
            image.height()
        );

        let badge = BadgeTexture {
            texture,
            width: image.width(),
            height: image.height(),
            pixel_ratio,
        };
        self.badge = Some(badge);
        badge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ProgramRegistry;
    use crate::recording::{Command, RecordingBackend};
    use crate::text::BlockRasterizer;
    use stripchart_core::{parse_hex, Screen};

    fn texture_creations(commands: &[Command]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, Command::CreateTexture { .. }))
            .count()
    }

    #[test]
    fn test_text_contrasts_with_badge() {
        let mut raster = BlockRasterizer;
        let style = LabelStyle::default();

        let light = rasterize_badge(&mut raster, "A", parse_hex("#F5B455"), &style, 1.0);
        let dark = rasterize_badge(&mut raster, "A", parse_hex("#3C5FD6"), &style, 1.0);

        // centre of the single glyph block
        let (x, y) = (6 + 4, light.height() / 2);
        assert_eq!(light.get_pixel(x, y).0, [0, 0, 0, 255]);
        assert_eq!(dark.get_pixel(x, y).0, [255, 255, 255, 255]);

        // padding shows the channel color
        assert_eq!(light.get_pixel(2, y).0, [0xF5, 0xB4, 0x55, 255]);
        // rounded corner is transparent
        assert_eq!(light.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_badge_scales_with_pixel_ratio() {
        let mut raster = BlockRasterizer;
        let style = LabelStyle::default();
        let one = rasterize_badge(&mut raster, "Cz", Rgb::WHITE, &style, 1.0);
        let two = rasterize_badge(&mut raster, "Cz", Rgb::WHITE, &style, 2.0);
        assert!(two.width() > one.width() * 3 / 2);
        assert!(two.height() > one.height() * 3 / 2);
    }

    #[test]
    fn test_rasterized_once_per_pixel_ratio() {
        let mut backend = RecordingBackend::new();
        let mut programs = ProgramRegistry::compile(&mut backend).unwrap();
        let mut raster = BlockRasterizer;
        let style = LabelStyle::default();
        let mut label = LabelRenderer::new(&mut backend, "Fp1", Rgb::WHITE);

        for ratio in [1.0, 1.0, 2.0, 2.0] {
            let mut frame = Frame {
                backend: &mut backend,
                programs: &mut programs,
                rasterizer: &mut raster,
                label_style: &style,
                screen: Screen::new(800, 600, ratio),
            };
            label.render(&mut frame, 0.5);
        }

        let commands = backend.take_pending();
        assert_eq!(texture_creations(&commands), 2);
        assert_eq!(backend.live_textures(), 1);
        assert_eq!(label.texture(), Some(TextureId(1)));
    }

    #[test]
    fn test_quad_centred_on_row() {
        let mut backend = RecordingBackend::new();
        let mut programs = ProgramRegistry::compile(&mut backend).unwrap();
        let mut raster = BlockRasterizer;
        let style = LabelStyle::default();
        let mut label = LabelRenderer::new(&mut backend, "O1", Rgb::BLACK);
        backend.take_pending();

        let mut frame = Frame {
            backend: &mut backend,
            programs: &mut programs,
            rasterizer: &mut raster,
            label_style: &style,
            screen: Screen::new(400, 300, 1.0),
        };
        label.render(&mut frame, 0.25);

        let draws = RecordingBackend::draw_calls(backend.pending());
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].topology, Topology::TriangleStrip);
        assert_eq!(draws[0].count, 4);

        let transform = draws[0]
            .uniforms
            .iter()
            .find_map(|(_, v)| match v {
                crate::backend::UniformValue::Mat4(m) => Some(*m),
                _ => None,
            })
            .unwrap();
        // x starts left_offset pixels in, and the quad straddles the row centre
        let left = -1.0 + 8.0 * 2.0 / 400.0;
        assert!((transform[3][0] - left).abs() < 1e-6);
        let bottom = transform[3][1];
        let top = bottom + transform[1][1];
        assert!(((bottom + top) / 2.0 - 0.25).abs() < 1e-6);
    }
}
