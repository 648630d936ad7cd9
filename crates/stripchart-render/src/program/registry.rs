use crate::backend::RenderBackend;
use crate::error::ShaderError;
use crate::gpu_types::{LabelVertex, LineVertex};

use super::{builtin, ShaderProgram};

/// The programs a chart draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Channel polylines.
    Trace,
    /// Row separators.
    Grid,
    /// Channel name badges.
    Label,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 3] = [ProgramKind::Trace, ProgramKind::Grid, ProgramKind::Label];
}

/// One compiled program per [`ProgramKind`], shared by every renderer of a
/// chart and dropped with it.
#[derive(Debug)]
pub struct ProgramRegistry {
    trace: ShaderProgram,
    grid: ShaderProgram,
    label: ShaderProgram,
}

impl ProgramRegistry {
    /// Compile the built-in programs and declare their vertex layouts.
    pub fn compile<B: RenderBackend>(backend: &mut B) -> Result<Self, ShaderError> {
        let line_stride = LineVertex::STRIDE;
        let label_stride = LabelVertex::STRIDE;

        let (vs, fs) = builtin::TRACE;
        let mut trace = ShaderProgram::new(backend, "Trace Program", vs, fs)?;
        trace.attribute("a_position", 2, 0, line_stride)?;

        let (vs, fs) = builtin::GRID;
        let mut grid = ShaderProgram::new(backend, "Grid Program", vs, fs)?;
        grid.attribute("a_position", 2, 0, line_stride)?;

        let (vs, fs) = builtin::LABEL;
        let mut label = ShaderProgram::new(backend, "Label Program", vs, fs)?;
        label.attribute("a_position", 2, 0, label_stride)?;
        label.attribute("a_uv", 2, LabelVertex::UV_OFFSET, label_stride)?;

        Ok(Self { trace, grid, label })
    }

    pub fn get(&self, kind: ProgramKind) -> &ShaderProgram {
        match kind {
            ProgramKind::Trace => &self.trace,
            ProgramKind::Grid => &self.grid,
            ProgramKind::Label => &self.label,
        }
    }

    pub fn get_mut(&mut self, kind: ProgramKind) -> &mut ShaderProgram {
        match kind {
            ProgramKind::Trace => &mut self.trace,
            ProgramKind::Grid => &mut self.grid,
            ProgramKind::Label => &mut self.label,
        }
    }
}
