//! Headless backend that records commands instead of drawing.
//!
//! Buffer and texture contents are kept so callers can inspect exactly what
//! would have reached the GPU. Commands issued between [`RenderBackend::clear`]
//! and [`RenderBackend::end_frame`] are filed as one frame.

use std::collections::HashMap;
use std::convert::Infallible;

use image::RgbaImage;

use crate::backend::{
    BufferId, ProgramId, ProgramSource, RenderBackend, TextureId, Topology, UniformLocation,
    UniformValue, VertexLayout,
};
use crate::error::ShaderError;
use crate::program::ProgramInterface;

/// Completed frames kept by default before the oldest are dropped.
pub const DEFAULT_FRAME_LIMIT: usize = 120;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateProgram {
        program: ProgramId,
        label: String,
    },
    CreateBuffer {
        buffer: BufferId,
        label: String,
    },
    UploadBuffer {
        buffer: BufferId,
        len: usize,
    },
    BindBuffer(BufferId),
    CreateTexture {
        texture: TextureId,
        label: String,
        width: u32,
        height: u32,
    },
    DeleteTexture(TextureId),
    BindTexture {
        unit: u32,
        texture: TextureId,
    },
    UseProgram(Option<ProgramId>),
    /// Attribute enabled against `buffer`, the buffer bound at the time.
    EnableAttribute {
        location: u32,
        layout: VertexLayout,
        buffer: Option<BufferId>,
    },
    DisableAttribute(u32),
    SetUniform {
        location: UniformLocation,
        value: UniformValue,
    },
    Draw {
        topology: Topology,
        first: u32,
        count: u32,
    },
    Clear([f32; 4]),
    Viewport {
        width: u32,
        height: u32,
    },
    ResizeSurface {
        width: u32,
        height: u32,
    },
}

/// A draw call with the state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: Option<ProgramId>,
    pub topology: Topology,
    pub first: u32,
    pub count: u32,
    /// Buffers feeding the enabled attributes, by location.
    pub buffers: Vec<(u32, BufferId)>,
    pub uniforms: Vec<(UniformLocation, UniformValue)>,
}

#[derive(Debug)]
pub struct RecordingBackend {
    pixel_ratio: f32,
    next_program: u32,
    next_buffer: u32,
    next_texture: u32,
    bound_buffer: Option<BufferId>,
    pending: Vec<Command>,
    frames: Vec<Vec<Command>>,
    frame_limit: usize,
    buffers: HashMap<BufferId, Vec<f32>>,
    textures: HashMap<TextureId, RgbaImage>,
    surface: (u32, u32),
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_pixel_ratio(1.0)
    }

    pub fn with_pixel_ratio(pixel_ratio: f32) -> Self {
        Self {
            pixel_ratio,
            next_program: 0,
            next_buffer: 0,
            next_texture: 0,
            bound_buffer: None,
            pending: Vec::new(),
            frames: Vec::new(),
            frame_limit: DEFAULT_FRAME_LIMIT,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            surface: (0, 0),
        }
    }

    /// Simulate moving to a display with a different density.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.pixel_ratio = pixel_ratio;
    }

    /// Keep at most `limit` completed frames (at least one), dropping the
    /// oldest.
    pub fn with_frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = limit.max(1);
        self
    }

    /// Completed frames still held, oldest first.
    pub fn frames(&self) -> &[Vec<Command>] {
        &self.frames
    }

    /// Hand over every completed frame, leaving none behind.
    pub fn take_frames(&mut self) -> Vec<Vec<Command>> {
        std::mem::take(&mut self.frames)
    }

    pub fn last_frame(&self) -> Option<&[Command]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Commands issued since the last completed frame.
    pub fn pending(&self) -> &[Command] {
        &self.pending
    }

    pub fn take_pending(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending)
    }

    /// Last uploaded contents of `buffer`.
    pub fn buffer(&self, buffer: BufferId) -> Option<&[f32]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn texture(&self, texture: TextureId) -> Option<&RgbaImage> {
        self.textures.get(&texture)
    }

    /// Textures created and not yet deleted.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Backing-store size from the last resize.
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    /// Replay `commands` and list their draw calls with the state in effect.
    pub fn draw_calls(commands: &[Command]) -> Vec<DrawCall> {
        let mut program = None;
        let mut enabled: Vec<(u32, BufferId)> = Vec::new();
        let mut uniforms: Vec<(UniformLocation, UniformValue)> = Vec::new();
        let mut draws = Vec::new();

        for command in commands {
            match command {
                Command::UseProgram(p) => {
                    if *p != program {
                        uniforms.clear();
                    }
                    program = *p;
                }
                Command::EnableAttribute {
                    location,
                    buffer: Some(buffer),
                    ..
                } => {
                    enabled.retain(|(l, _)| l != location);
                    enabled.push((*location, *buffer));
                }
                Command::DisableAttribute(location) => enabled.retain(|(l, _)| l != location),
                Command::SetUniform { location, value } => {
                    uniforms.retain(|(l, _)| l != location);
                    uniforms.push((*location, *value));
                }
                Command::Draw {
                    topology,
                    first,
                    count,
                } => {
                    let mut buffers = enabled.clone();
                    buffers.sort_by_key(|(l, _)| *l);
                    draws.push(DrawCall {
                        program,
                        topology: *topology,
                        first: *first,
                        count: *count,
                        buffers,
                        uniforms: uniforms.clone(),
                    });
                }
                _ => {}
            }
        }
        draws
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for RecordingBackend {
    type Error = Infallible;

    fn create_program(
        &mut self,
        source: &ProgramSource<'_>,
        _interface: &ProgramInterface,
    ) -> Result<ProgramId, ShaderError> {
        let program = ProgramId(self.next_program);
        self.next_program += 1;
        self.pending.push(Command::CreateProgram {
            program,
            label: source.label.to_string(),
        });
        Ok(program)
    }

    fn create_buffer(&mut self, label: &str) -> BufferId {
        let buffer = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(buffer, Vec::new());
        self.pending.push(Command::CreateBuffer {
            buffer,
            label: label.to_string(),
        });
        buffer
    }

    fn upload_buffer(&mut self, buffer: BufferId, data: &[f32]) {
        let stored = self.buffers.entry(buffer).or_default();
        stored.clear();
        stored.extend_from_slice(data);
        self.pending.push(Command::UploadBuffer {
            buffer,
            len: data.len(),
        });
    }

    fn bind_buffer(&mut self, buffer: BufferId) {
        self.bound_buffer = Some(buffer);
        self.pending.push(Command::BindBuffer(buffer));
    }

    fn create_texture(&mut self, label: &str, image: &RgbaImage) -> TextureId {
        let texture = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(texture, image.clone());
        self.pending.push(Command::CreateTexture {
            texture,
            label: label.to_string(),
            width: image.width(),
            height: image.height(),
        });
        texture
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.pending.push(Command::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.pending.push(Command::BindTexture { unit, texture });
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.pending.push(Command::UseProgram(program));
    }

    fn enable_attribute(&mut self, location: u32, layout: VertexLayout) {
        self.pending.push(Command::EnableAttribute {
            location,
            layout,
            buffer: self.bound_buffer,
        });
    }

    fn disable_attribute(&mut self, location: u32) {
        self.pending.push(Command::DisableAttribute(location));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.pending.push(Command::SetUniform { location, value });
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        self.pending.push(Command::Draw {
            topology,
            first,
            count,
        });
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.pending.push(Command::Clear(color));
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.pending.push(Command::Viewport { width, height });
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface = (width, height);
        self.pending.push(Command::ResizeSurface { width, height });
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn end_frame(&mut self) -> Result<(), Infallible> {
        // setup issued before the frame's clear stays out of the frame
        let start = self
            .pending
            .iter()
            .rposition(|c| matches!(c, Command::Clear(_)))
            .unwrap_or(0);
        let frame = self.pending.split_off(start);
        self.pending.clear();
        self.frames.push(frame);
        if self.frames.len() > self.frame_limit {
            let excess = self.frames.len() - self.frame_limit;
            self.frames.drain(..excess);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_split_at_clear() {
        let mut backend = RecordingBackend::new();
        let buffer = backend.create_buffer("b");
        backend.upload_buffer(buffer, &[1.0, 2.0]);

        backend.clear([0.0; 4]);
        backend.draw_arrays(Topology::LineStrip, 0, 2);
        backend.end_frame().unwrap();

        assert_eq!(backend.frames().len(), 1);
        assert_eq!(backend.frames()[0].len(), 2);
        assert!(backend.pending().is_empty());
        assert_eq!(backend.buffer(buffer), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_draw_calls_track_state() {
        let mut backend = RecordingBackend::new();
        let a = backend.create_buffer("a");
        let b = backend.create_buffer("b");
        let layout = VertexLayout::new(2, 0, 8);

        backend.clear([0.0; 4]);
        backend.bind_buffer(a);
        backend.use_program(Some(ProgramId(0)));
        backend.enable_attribute(0, layout);
        backend.draw_arrays(Topology::LineStrip, 0, 4);
        backend.bind_buffer(b);
        backend.enable_attribute(0, layout);
        backend.draw_arrays(Topology::LineStrip, 1, 2);
        backend.end_frame().unwrap();

        let draws = RecordingBackend::draw_calls(backend.last_frame().unwrap());
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].buffers, vec![(0, a)]);
        assert_eq!(draws[1].buffers, vec![(0, b)]);
        assert_eq!((draws[1].first, draws[1].count), (1, 2));
    }

    #[test]
    fn test_textures_are_tracked() {
        let mut backend = RecordingBackend::new();
        let texture = backend.create_texture("t", &RgbaImage::new(3, 2));
        assert_eq!(backend.texture(texture).map(|i| i.dimensions()), Some((3, 2)));
        backend.delete_texture(texture);
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_frame_limit_drops_oldest() {
        let mut backend = RecordingBackend::new().with_frame_limit(3);
        for i in 0..5 {
            backend.clear([i as f32, 0.0, 0.0, 1.0]);
            backend.end_frame().unwrap();
        }
        assert_eq!(backend.frames().len(), 3);
        assert_eq!(backend.frames()[0], vec![Command::Clear([2.0, 0.0, 0.0, 1.0])]);
        assert_eq!(backend.last_frame(), Some(&[Command::Clear([4.0, 0.0, 0.0, 1.0])][..]));
    }

    #[test]
    fn test_default_frame_limit_bounds_history() {
        let mut backend = RecordingBackend::new();
        for _ in 0..DEFAULT_FRAME_LIMIT + 10 {
            backend.clear([0.0; 4]);
            backend.end_frame().unwrap();
        }
        assert_eq!(backend.frames().len(), DEFAULT_FRAME_LIMIT);
    }

    #[test]
    fn test_take_frames_drains() {
        let mut backend = RecordingBackend::new();
        backend.clear([0.0; 4]);
        backend.end_frame().unwrap();
        backend.clear([1.0; 4]);
        backend.end_frame().unwrap();

        let frames = backend.take_frames();
        assert_eq!(frames.len(), 2);
        assert!(backend.frames().is_empty());
        assert!(backend.last_frame().is_none());
    }
}
