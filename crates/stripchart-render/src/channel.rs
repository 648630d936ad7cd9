//! Per-channel sample history and its polyline.

use stripchart_core::{History, Rgb, Row, RunTable, Transform};

use crate::backend::{BufferId, RenderBackend, Topology};
use crate::frame::Frame;
use crate::label::LabelRenderer;
use crate::program::ProgramKind;

/// How a channel turns its history into line strips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawMode {
    /// One continuous strip across the whole window.
    Continuous,
    /// Only runs whose batches led at or above `threshold`, as disjoint strips.
    Segmented { threshold: f32 },
}

/// One named channel: rolling history, GPU vertex buffer and label.
///
/// The vertex buffer always mirrors the history as `2 * H` interleaved
/// `(index, value)` scalars. Channels are never destroyed; hiding one only
/// stops it from drawing.
#[derive(Debug)]
pub struct ChannelBuffer {
    name: String,
    color: Rgb,
    history: History,
    runs: Option<RunTable>,
    visible: bool,
    buffer: BufferId,
    vertices: Vec<f32>,
    label: LabelRenderer,
}

impl ChannelBuffer {
    /// Allocate the channel and upload its zero-filled window.
    pub fn new<B: RenderBackend>(
        backend: &mut B,
        name: &str,
        color: Rgb,
        history_length: usize,
        mode: DrawMode,
    ) -> Self {
        let history = History::new(history_length);
        let runs = match mode {
            DrawMode::Continuous => None,
            DrawMode::Segmented { threshold } => Some(RunTable::new(threshold)),
        };

        let buffer = backend.create_buffer(&format!("{name} Vertex Buffer"));
        let mut vertices = Vec::new();
        history.write_vertices(&mut vertices);
        backend.upload_buffer(buffer, &vertices);

        Self {
            name: name.to_string(),
            color,
            history,
            runs,
            visible: true,
            buffer,
            vertices,
            label: LabelRenderer::new(backend, name, color),
        }
    }

    /// Shift `samples` into the window and re-upload the whole vertex buffer.
    pub fn append_data<B: RenderBackend>(&mut self, backend: &mut B, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        self.history.append(samples);
        if let Some(runs) = &mut self.runs {
            runs.observe(samples);
        }
        self.history.write_vertices(&mut self.vertices);
        backend.upload_buffer(self.buffer, &self.vertices);
    }

    /// Draw the polyline and label into `row`. Hidden channels draw nothing.
    pub fn render<B: RenderBackend>(&mut self, frame: &mut Frame<'_, B>, row: Row) {
        if !self.visible {
            return;
        }

        let center = row.center();
        let mvp = Transform::strip(self.history.capacity(), center, row.scale);

        frame.backend.bind_buffer(self.buffer);
        let program = frame.programs.get_mut(ProgramKind::Trace);
        program.activate(frame.backend);
        program.set_uniform(frame.backend, "mvp", mvp);
        program.set_uniform(frame.backend, "color", self.color);
        for strip in self.strips() {
            frame
                .backend
                .draw_arrays(Topology::LineStrip, strip.start, strip.len() as u32);
        }
        program.deactivate(frame.backend);

        self.label.render(frame, center);
    }

    /// Vertex ranges drawn as separate line strips.
    pub fn strips(&self) -> Vec<std::ops::Range<u32>> {
        let capacity = self.history.capacity();
        match &self.runs {
            None => vec![0..capacity as u32],
            Some(runs) => runs.visible_strips(self.history.window_start(), capacity),
        }
    }

    pub fn toggle_visibility(&mut self) {
        self.visible = !self.visible;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Window contents, oldest first.
    pub fn history(&self) -> &[f32] {
        self.history.values()
    }

    pub fn history_length(&self) -> usize {
        self.history.capacity()
    }

    pub fn total_samples(&self) -> u64 {
        self.history.total_samples()
    }

    pub fn runs(&self) -> Option<&RunTable> {
        self.runs.as_ref()
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn label(&self) -> &LabelRenderer {
        &self.label
    }
}
