//! GPU rendering for stripchart.
//!
//! [`StripChart`] owns the channels and drives each frame through a
//! [`RenderBackend`]: [`WgpuBackend`] for a window, [`RecordingBackend`] for
//! headless use.

pub mod backend;
pub mod channel;
pub mod chart;
pub mod error;
pub mod frame;
pub mod gpu_context;
pub mod gpu_types;
pub mod grid;
pub mod label;
pub mod program;
pub mod recording;
pub mod text;
pub mod wgpu_backend;

pub use backend::{
    BufferId, ProgramId, ProgramSource, RenderBackend, TextureId, Topology, UniformKind,
    UniformLocation, UniformValue, VertexLayout,
};
pub use channel::{ChannelBuffer, DrawMode};
pub use chart::{ChartOptions, StripChart};
pub use error::{ChartError, GpuError, ShaderError, ShaderStage};
pub use frame::Frame;
pub use gpu_context::GpuContext;
pub use gpu_types::{LabelVertex, LineVertex, LABEL_QUAD};
pub use grid::{separator_lines, GridRenderer};
pub use label::{compose_badge, rasterize_badge, LabelRenderer, LabelStyle};
pub use program::{ProgramInterface, ProgramKind, ProgramRegistry, ShaderProgram};
pub use recording::{Command, DrawCall, RecordingBackend, DEFAULT_FRAME_LIMIT};
pub use text::{BlockRasterizer, CosmicRasterizer, GlyphMask, TextRasterizer};
pub use wgpu_backend::WgpuBackend;
