use stripchart_core::Screen;

use crate::backend::RenderBackend;
use crate::label::LabelStyle;
use crate::program::ProgramRegistry;
use crate::text::TextRasterizer;

/// Everything a renderer needs while drawing one frame.
pub struct Frame<'a, B: RenderBackend> {
    pub backend: &'a mut B,
    pub programs: &'a mut ProgramRegistry,
    pub rasterizer: &'a mut dyn TextRasterizer,
    pub label_style: &'a LabelStyle,
    pub screen: Screen,
}
