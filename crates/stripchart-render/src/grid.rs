//! Row separator lines.

use stripchart_core::{separator_y, Rgb};

use crate::backend::{BufferId, RenderBackend, Topology};
use crate::program::ShaderProgram;

/// Line-list vertices for `rows` separators, one per row, each spanning the
/// full NDC width.
pub fn separator_lines(rows: usize, row_height: f32) -> Vec<f32> {
    let mut vertices = Vec::with_capacity(rows * 4);
    for i in 0..rows {
        let y = separator_y(row_height, i);
        vertices.extend_from_slice(&[-1.0, y, 1.0, y]);
    }
    vertices
}

/// Draws one horizontal line below each visible row.
///
/// The vertex buffer is rebuilt only when the row count or row height differs
/// from the last build.
#[derive(Debug)]
pub struct GridRenderer {
    buffer: BufferId,
    color: Rgb,
    row_height: f32,
    built: Option<(usize, f32)>,
}

impl GridRenderer {
    pub fn new<B: RenderBackend>(backend: &mut B, color: Rgb) -> Self {
        Self {
            buffer: backend.create_buffer("Grid Vertex Buffer"),
            color,
            row_height: 0.0,
            built: None,
        }
    }

    pub fn set_row_height(&mut self, row_height: f32) {
        self.row_height = row_height;
    }

    pub fn row_height(&self) -> f32 {
        self.row_height
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn render<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        program: &mut ShaderProgram,
        rows: usize,
    ) {
        if self.built != Some((rows, self.row_height)) {
            backend.upload_buffer(self.buffer, &separator_lines(rows, self.row_height));
            self.built = Some((rows, self.row_height));
            log::debug!("Rebuilt grid: {rows} rows at {:.4} NDC", self.row_height);
        }
        if rows == 0 {
            return;
        }

        backend.bind_buffer(self.buffer);
        program.activate(backend);
        program.set_uniform(backend, "color", self.color);
        backend.draw_arrays(Topology::LineList, 0, (rows * 2) as u32);
        program.deactivate(backend);
    }
}
