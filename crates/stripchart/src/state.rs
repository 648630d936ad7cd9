//! Window-bound chart state.

use std::sync::Arc;
use std::time::Instant;

use stripchart_config::Config;
use stripchart_render::{ChartOptions, CosmicRasterizer, GpuContext, StripChart, WgpuBackend};
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event_loop::ActiveEventLoop,
    keyboard::KeyCode,
    window::Window,
};

use crate::source::SignalSource;

pub struct State {
    pub window: Arc<Window>,
    chart: StripChart<WgpuBackend>,
    source: SignalSource,
    last_tick: Instant,
    /// Last logical height asked of the window for dynamic rows.
    requested_height: u32,
}

impl State {
    /// Falls back to a disabled chart when no GPU surface can be set up, so
    /// the window still opens and closes normally.
    pub async fn new(window: Arc<Window>, config: &Config) -> Self {
        let size = window.inner_size();
        let scale_factor = window.scale_factor();
        let logical: LogicalSize<u32> = size.to_logical(scale_factor);
        let options = ChartOptions::from(config);

        let chart = match GpuContext::for_target(window.clone(), size.width, size.height).await {
            Ok(context) => {
                let backend = WgpuBackend::new(context, scale_factor as f32);
                match StripChart::new(
                    backend,
                    options.clone(),
                    Box::new(CosmicRasterizer::new()),
                    logical.width,
                    logical.height,
                ) {
                    Ok(chart) => chart,
                    Err(e) => {
                        log::error!("Chart unavailable: {e}");
                        StripChart::disabled(options)
                    }
                }
            }
            Err(e) => {
                log::error!("No drawing surface: {e}");
                StripChart::disabled(options)
            }
        };

        Self {
            window,
            chart,
            source: SignalSource::new(config.demo.channels, config.demo.sample_rate),
            last_tick: Instant::now(),
            requested_height: logical.height,
        }
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        let scale_factor = self.window.scale_factor();
        if let Some(backend) = self.chart.backend_mut() {
            backend.set_pixel_ratio(scale_factor as f32);
        }
        let logical: LogicalSize<u32> = size.to_logical(scale_factor);
        self.chart.reshape(logical.width, logical.height);
    }

    /// Rebuild the surface after it was lost or went stale.
    pub fn reconfigure(&mut self) {
        if let Some(backend) = self.chart.backend() {
            backend.reconfigure();
        }
    }

    /// Feed the chart everything the source produced since the last tick.
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;

        for (name, samples) in self.source.advance(elapsed) {
            self.chart.append_channel_data(&name, &samples);
        }

        let screen = self.chart.screen();
        if screen.height > self.requested_height {
            self.requested_height = screen.height;
            let requested = LogicalSize::new(screen.width, screen.height);
            // `Some` means the size was applied right away and no resize event follows
            if let Some(applied) = self.window.request_inner_size(requested) {
                self.check_applied_size(applied);
            }
        }
    }

    fn check_applied_size(&mut self, applied: PhysicalSize<u32>) {
        let logical: LogicalSize<u32> = applied.to_logical(self.window.scale_factor());
        let needed = self.chart.screen().height;
        match rows_cut_off(logical.height, needed) {
            Some(missing) => log::warn!(
                "Window capped at {}px, chart needs {needed}px; {missing}px of rows are cut off",
                logical.height
            ),
            None => log::debug!("Window grown to {}x{}", logical.width, logical.height),
        }
        self.resize(applied);
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.chart.render()
    }

    pub fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode, pressed: bool) {
        if !pressed {
            return;
        }
        let slot = match code {
            KeyCode::Escape => {
                event_loop.exit();
                return;
            }
            KeyCode::Digit1 => 0,
            KeyCode::Digit2 => 1,
            KeyCode::Digit3 => 2,
            KeyCode::Digit4 => 3,
            KeyCode::Digit5 => 4,
            KeyCode::Digit6 => 5,
            KeyCode::Digit7 => 6,
            KeyCode::Digit8 => 7,
            KeyCode::Digit9 => 8,
            _ => return,
        };

        let Some(name) = self.chart.channel_names().nth(slot).map(str::to_owned) else {
            return;
        };
        match self.chart.toggle_visibility(&name) {
            Ok(()) => log::debug!("Toggled {name}"),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => self.reconfigure(),
            Err(e) => log::error!("Unable to render {e}"),
        }
    }
}

/// Logical pixels of chart content a window of `window_height` cannot show.
fn rows_cut_off(window_height: u32, chart_height: u32) -> Option<u32> {
    chart_height.checked_sub(window_height).filter(|missing| *missing > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_cut_off_when_window_capped() {
        assert_eq!(rows_cut_off(600, 681), Some(81));
    }

    #[test]
    fn test_nothing_cut_off_when_window_fits() {
        assert_eq!(rows_cut_off(681, 681), None);
        assert_eq!(rows_cut_off(900, 681), None);
    }
}
