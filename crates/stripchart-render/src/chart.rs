//! Top-level strip chart.

use std::collections::HashMap;

use stripchart_config::Config;
use stripchart_core::{parse_hex, Palette, Rgb, Row, Screen, CHANNEL_HEIGHT_CM, DEFAULT_DPI};

use crate::backend::RenderBackend;
use crate::channel::{ChannelBuffer, DrawMode};
use crate::error::ChartError;
use crate::frame::Frame;
use crate::grid::GridRenderer;
use crate::label::LabelStyle;
use crate::program::{ProgramKind, ProgramRegistry};
use crate::text::TextRasterizer;

/// Chart settings resolved from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub history_length: usize,
    pub channel_height_cm: f32,
    pub dpi: f32,
    /// Sample value that reaches the edge of a row.
    pub amplitude: f32,
    pub background: Rgb,
    pub grid_color: Rgb,
    pub palette: Palette,
    /// Grow the surface as channels are discovered.
    pub dynamic_rows: bool,
    pub mode: DrawMode,
    pub label: LabelStyle,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            history_length: 1000,
            channel_height_cm: CHANNEL_HEIGHT_CM,
            dpi: DEFAULT_DPI,
            amplitude: 1.0,
            background: Rgb::WHITE,
            grid_color: Rgb::new(0.6, 0.6, 0.6),
            palette: Palette::default(),
            dynamic_rows: false,
            mode: DrawMode::Continuous,
            label: LabelStyle::default(),
        }
    }
}

impl ChartOptions {
    /// Reject settings no chart can be laid out or drawn with.
    pub fn validate(&self) -> Result<(), ChartError> {
        let invalid = |message: String| Err(ChartError::InvalidOptions(message));
        if self.history_length < 2 {
            return invalid(format!(
                "history_length must be at least 2, got {}",
                self.history_length
            ));
        }
        for (name, value) in [
            ("amplitude", self.amplitude),
            ("channel_height_cm", self.channel_height_cm),
            ("dpi", self.dpi),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{name} must be positive, got {value}"));
            }
        }
        Ok(())
    }
}

impl From<&Config> for ChartOptions {
    fn from(config: &Config) -> Self {
        let chart = &config.chart;
        Self {
            history_length: chart.history_length,
            channel_height_cm: chart.channel_height_cm,
            dpi: chart.dpi,
            amplitude: chart.amplitude,
            background: parse_hex(&chart.background),
            grid_color: parse_hex(&chart.grid_color),
            palette: Palette::from_hex(chart.palette.as_slice()),
            dynamic_rows: chart.dynamic_rows,
            mode: if config.segments.enabled {
                DrawMode::Segmented {
                    threshold: config.segments.threshold,
                }
            } else {
                DrawMode::Continuous
            },
            label: LabelStyle::from(&config.label),
        }
    }
}

struct GpuState<B: RenderBackend> {
    backend: B,
    programs: ProgramRegistry,
    grid: GridRenderer,
    rasterizer: Box<dyn TextRasterizer>,
}

/// Multi-channel strip chart.
///
/// Channels are created on first data, colored by discovery order and stacked
/// top to bottom. Hidden channels give up their row.
///
/// A chart built with [`StripChart::disabled`] has no drawing surface: data is
/// dropped and rendering does nothing.
pub struct StripChart<B: RenderBackend> {
    options: ChartOptions,
    screen: Screen,
    row_height: f32,
    channels: Vec<ChannelBuffer>,
    index: HashMap<String, usize>,
    gpu: Option<GpuState<B>>,
}

impl<B: RenderBackend> StripChart<B> {
    /// Compile the chart's programs on `backend` and lay out a `width` x `height`
    /// logical surface.
    pub fn new(
        mut backend: B,
        options: ChartOptions,
        rasterizer: Box<dyn TextRasterizer>,
        width: u32,
        height: u32,
    ) -> Result<Self, ChartError> {
        options.validate()?;
        let programs = ProgramRegistry::compile(&mut backend)?;
        let grid = GridRenderer::new(&mut backend, options.grid_color);

        let mut chart = Self {
            screen: Screen::default().with_dpi(options.dpi),
            row_height: 0.0,
            channels: Vec::new(),
            index: HashMap::new(),
            gpu: Some(GpuState {
                backend,
                programs,
                grid,
                rasterizer,
            }),
            options,
        };
        chart.reshape(width, height);
        Ok(chart)
    }

    /// A chart without a drawing surface.
    pub fn disabled(options: ChartOptions) -> Self {
        Self {
            screen: Screen::default().with_dpi(options.dpi),
            row_height: 0.0,
            channels: Vec::new(),
            index: HashMap::new(),
            gpu: None,
            options,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.gpu.is_some()
    }

    /// Append samples, oldest first, to channel `name`, creating it on first
    /// sight. Empty batches are ignored. With dynamic rows, only a new channel
    /// can grow the surface.
    pub fn append_channel_data(&mut self, name: &str, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let (slot, discovered) = match self.index.get(name) {
            Some(&slot) => (slot, false),
            None => {
                let slot = self.channels.len();
                let color = self.options.palette.color_for(slot);
                self.channels.push(ChannelBuffer::new(
                    &mut gpu.backend,
                    name,
                    color,
                    self.options.history_length,
                    self.options.mode,
                ));
                self.index.insert(name.to_string(), slot);
                log::info!("New channel {name} (#{slot})");
                (slot, true)
            }
        };
        self.channels[slot].append_data(&mut gpu.backend, samples);

        if discovered && self.options.dynamic_rows {
            self.fit_rows();
        }
    }

    /// Flip a channel's visibility and redraw. Unknown names are ignored.
    pub fn toggle_visibility(&mut self, name: &str) -> Result<(), B::Error> {
        let Some(&slot) = self.index.get(name) else {
            return Ok(());
        };
        if self.gpu.is_none() {
            return Ok(());
        }
        self.channels[slot].toggle_visibility();
        self.render()
    }

    /// Lay out a `width` x `height` logical surface at the backend's current
    /// pixel ratio.
    pub fn reshape(&mut self, width: u32, height: u32) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        self.screen = Screen::new(width, height, gpu.backend.pixel_ratio()).with_dpi(self.options.dpi);
        let (backing_w, backing_h) = self.screen.backing_size();
        gpu.backend.resize_surface(backing_w, backing_h);
        gpu.backend.viewport(backing_w, backing_h);

        self.row_height = self.screen.row_height(self.options.channel_height_cm);
        gpu.grid.set_row_height(self.row_height);
        log::info!(
            "Reshaped to {}x{} (backing {backing_w}x{backing_h}), row height {:.4}",
            self.screen.width,
            self.screen.height,
            self.row_height
        );
    }

    /// Draw one frame.
    pub fn render(&mut self) -> Result<(), B::Error> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };

        gpu.backend.clear(self.options.background.to_rgba(1.0));

        let visible = self.channels.iter().filter(|c| c.is_visible()).count();
        gpu.grid
            .render(&mut gpu.backend, gpu.programs.get_mut(ProgramKind::Grid), visible);

        let scale = self.row_height * 0.5 / self.options.amplitude;
        let mut frame = Frame {
            backend: &mut gpu.backend,
            programs: &mut gpu.programs,
            rasterizer: gpu.rasterizer.as_mut(),
            label_style: &self.options.label,
            screen: self.screen,
        };
        for (rank, channel) in self.channels.iter_mut().filter(|c| c.is_visible()).enumerate() {
            let row = Row {
                index: rank,
                height: self.row_height,
                scale,
            };
            channel.render(&mut frame, row);
        }

        gpu.backend.end_frame()
    }

    /// Logical height that fits every channel at its physical row height.
    pub fn content_height(&self) -> u32 {
        self.screen
            .height_for_rows(self.channels.len(), self.options.channel_height_cm)
    }

    fn fit_rows(&mut self) {
        let needed = self.content_height();
        if needed > self.screen.height {
            log::info!("Growing surface to {needed}px for {} rows", self.channels.len());
            self.reshape(self.screen.width, needed);
        }
    }

    /// Row height in NDC.
    pub fn row_height(&self) -> f32 {
        self.row_height
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelBuffer> {
        self.index.get(name).map(|&slot| &self.channels[slot])
    }

    /// Channels in discovery order.
    pub fn channels(&self) -> &[ChannelBuffer] {
        &self.channels
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(ChannelBuffer::name)
    }

    pub fn visible_count(&self) -> usize {
        self.channels.iter().filter(|c| c.is_visible()).count()
    }

    pub fn backend(&self) -> Option<&B> {
        self.gpu.as_ref().map(|gpu| &gpu.backend)
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.gpu.as_mut().map(|gpu| &mut gpu.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;
    use crate::text::BlockRasterizer;

    fn chart(options: ChartOptions) -> StripChart<RecordingBackend> {
        StripChart::new(
            RecordingBackend::new(),
            options,
            Box::new(BlockRasterizer),
            800,
            600,
        )
        .unwrap()
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.segments.enabled = true;
        config.segments.threshold = 0.2;
        config.chart.background = "#000000".to_string();
        config.chart.palette = vec!["#FF0000".to_string(), "bad".to_string()];

        let options = ChartOptions::from(&config);
        assert_eq!(options.mode, DrawMode::Segmented { threshold: 0.2 });
        assert_eq!(options.background, Rgb::BLACK);
        assert_eq!(options.palette.color_for(0), Rgb::new(1.0, 0.0, 0.0));
        assert_eq!(options.palette.color_for(1), Rgb::BLACK);
        assert_eq!(options.label.padding, [6.0, 2.0]);
    }

    #[test]
    fn test_empty_batch_does_not_create_channel() {
        let mut chart = chart(ChartOptions::default());
        chart.append_channel_data("A", &[]);
        assert!(chart.channel("A").is_none());
    }

    #[test]
    fn test_reshape_uses_backend_pixel_ratio() {
        let mut chart = StripChart::new(
            RecordingBackend::with_pixel_ratio(2.0),
            ChartOptions::default(),
            Box::new(BlockRasterizer),
            400,
            300,
        )
        .unwrap();
        assert_eq!(chart.screen().pixel_ratio, 2.0);
        assert_eq!(chart.backend().unwrap().surface_size(), (800, 600));

        chart.backend_mut().unwrap().set_pixel_ratio(1.0);
        chart.reshape(400, 300);
        assert_eq!(chart.backend().unwrap().surface_size(), (400, 300));
    }

    #[test]
    fn test_dynamic_rows_grow_surface() {
        let options = ChartOptions {
            dynamic_rows: true,
            ..ChartOptions::default()
        };
        let mut chart = chart(options);
        // 600 px at 96 dpi is ~15.9 cm: five 3 cm rows fit
        for name in ["a", "b", "c", "d", "e"] {
            chart.append_channel_data(name, &[0.0]);
        }
        assert_eq!(chart.screen().height, 600);

        chart.append_channel_data("f", &[0.0]);
        assert_eq!(chart.screen().height, chart.content_height());
        assert!(chart.screen().height > 600);
        assert!(chart.row_height() * 6.0 <= 2.0 + 1e-4);
    }

    #[test]
    fn test_disabled_chart_is_inert() {
        let mut chart: StripChart<RecordingBackend> = StripChart::disabled(ChartOptions::default());
        assert!(!chart.is_enabled());
        chart.append_channel_data("A", &[1.0]);
        chart.reshape(100, 100);
        chart.render().unwrap();
        chart.toggle_visibility("A").unwrap();
        assert!(chart.channel("A").is_none());
        assert!(chart.backend().is_none());
    }

    #[test]
    fn test_existing_channel_data_keeps_reshaped_height() {
        let options = ChartOptions {
            dynamic_rows: true,
            ..ChartOptions::default()
        };
        let mut chart = chart(options);
        for name in ["a", "b", "c", "d", "e", "f"] {
            chart.append_channel_data(name, &[0.0]);
        }
        assert!(chart.screen().height > 600);

        chart.reshape(800, 600);
        chart.append_channel_data("a", &[1.0]);
        assert_eq!(chart.screen().height, 600);

        chart.append_channel_data("g", &[1.0]);
        assert_eq!(chart.screen().height, chart.content_height());
    }

    fn rejected(options: ChartOptions) -> bool {
        matches!(
            StripChart::new(
                RecordingBackend::new(),
                options,
                Box::new(BlockRasterizer),
                800,
                600,
            ),
            Err(ChartError::InvalidOptions(_))
        )
    }

    #[test]
    fn test_new_rejects_short_history() {
        for history_length in [0, 1] {
            assert!(rejected(ChartOptions {
                history_length,
                ..ChartOptions::default()
            }));
        }
        assert!(ChartOptions {
            history_length: 2,
            ..ChartOptions::default()
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_new_rejects_non_positive_amplitude() {
        for amplitude in [0.0, -1.0, f32::NAN] {
            assert!(rejected(ChartOptions {
                amplitude,
                ..ChartOptions::default()
            }));
        }
    }

    #[test]
    fn test_new_rejects_non_positive_channel_height() {
        assert!(rejected(ChartOptions {
            channel_height_cm: 0.0,
            ..ChartOptions::default()
        }));
    }

    #[test]
    fn test_new_rejects_non_positive_dpi() {
        assert!(rejected(ChartOptions {
            dpi: -96.0,
            ..ChartOptions::default()
        }));
    }
}
