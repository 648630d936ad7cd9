//! The drawing surface seam.
//!
//! [`RenderBackend`] is a small, ordering-based command interface: a buffer is
//! bound, a program is selected, attributes are enabled against whatever buffer
//! is bound at that moment, uniforms are set, then a draw is issued. Everything
//! above this module talks to the GPU only through it, which lets the chart run
//! unchanged against [`crate::WgpuBackend`] or the headless
//! [`crate::RecordingBackend`].

use image::RgbaImage;
use stripchart_core::{Rgb, Transform};

use crate::error::ShaderError;
use crate::program::ProgramInterface;

/// Handle to a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Handle to a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Handle to a 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Primitive assembly for a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    LineStrip,
    LineList,
    TriangleStrip,
}

/// How one attribute reads `f32` components out of the bound buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub components: u32,
    /// Byte offset of the first component.
    pub offset: u32,
    /// Bytes between consecutive vertices; 0 means tightly packed.
    pub stride: u32,
}

impl VertexLayout {
    #[must_use]
    pub fn new(components: u32, offset: u32, stride: u32) -> Self {
        Self {
            components,
            offset,
            stride,
        }
    }

    /// Stride with the tightly packed case resolved.
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            self.components * 4
        } else {
            self.stride
        }
    }
}

/// Shape of a settable uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Mat4,
    Vec3,
    Vec4,
    Float,
    Int,
}

impl UniformKind {
    /// Size in bytes inside a uniform block.
    pub fn size(self) -> u32 {
        match self {
            UniformKind::Mat4 => 64,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Float | UniformKind::Int => 4,
        }
    }
}

/// A uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4([[f32; 4]; 4]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Float(f32),
    /// Integers double as texture unit selectors.
    Int(i32),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
        }
    }

    /// Raw bytes as laid out in a uniform block.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Mat4(m) => bytemuck::bytes_of(m),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v),
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Int(v) => bytemuck::bytes_of(v),
        }
    }
}

impl From<Transform> for UniformValue {
    fn from(t: Transform) -> Self {
        UniformValue::Mat4(t.to_cols_array_2d())
    }
}

impl From<Rgb> for UniformValue {
    fn from(c: Rgb) -> Self {
        UniformValue::Vec3(c.to_array())
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

/// Resolved location of a uniform within a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformLocation {
    /// Member of the program's uniform block.
    Block { offset: u32, kind: UniformKind },
    /// Texture binding; its value is the texture unit to sample.
    Texture { binding: u32 },
}

impl UniformLocation {
    /// Whether `value` can be written here.
    pub fn accepts(&self, value: &UniformValue) -> bool {
        match self {
            UniformLocation::Block { kind, .. } => *kind == value.kind(),
            UniformLocation::Texture { .. } => matches!(value, UniformValue::Int(_)),
        }
    }
}

/// Source text of a program, one module per stage.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
}

/// GPU-capable drawing surface.
///
/// State is implicit and sticky: a bound buffer, the active program, enabled
/// attributes and bound textures stay in effect until changed. A frame begins
/// with [`clear`](RenderBackend::clear) and ends with
/// [`end_frame`](RenderBackend::end_frame).
pub trait RenderBackend {
    /// Error returned when a finished frame cannot be presented.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Register a program whose interface has already been reflected and linked.
    fn create_program(
        &mut self,
        source: &ProgramSource<'_>,
        interface: &ProgramInterface,
    ) -> Result<ProgramId, ShaderError>;

    fn create_buffer(&mut self, label: &str) -> BufferId;

    /// Replace the whole contents of `buffer`.
    fn upload_buffer(&mut self, buffer: BufferId, data: &[f32]);

    fn bind_buffer(&mut self, buffer: BufferId);

    fn create_texture(&mut self, label: &str, image: &RgbaImage) -> TextureId;

    fn delete_texture(&mut self, texture: TextureId);

    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    fn use_program(&mut self, program: Option<ProgramId>);

    /// Read attribute `location` from the currently bound buffer.
    fn enable_attribute(&mut self, location: u32, layout: VertexLayout);

    fn disable_attribute(&mut self, location: u32);

    /// Set a uniform on the active program.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32);

    /// Start a frame cleared to `color`.
    fn clear(&mut self, color: [f32; 4]);

    fn viewport(&mut self, width: u32, height: u32);

    /// Resize the backing store, in physical pixels.
    fn resize_surface(&mut self, width: u32, height: u32);

    /// Backing-store pixels per logical pixel.
    fn pixel_ratio(&self) -> f32;

    /// Submit and present everything drawn since [`clear`](RenderBackend::clear).
    fn end_frame(&mut self) -> Result<(), Self::Error>;
}
