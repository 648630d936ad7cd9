//! GPU-compatible vertex types.

use bytemuck::{Pod, Zeroable};

/// A polyline or separator vertex in its own coordinate space.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 2],
}

impl LineVertex {
    pub const STRIDE: u32 = std::mem::size_of::<LineVertex>() as u32;
}

/// Label quad vertex: unit-square position plus texture coordinate.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LabelVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl LabelVertex {
    pub const STRIDE: u32 = std::mem::size_of::<LabelVertex>() as u32;
    pub const UV_OFFSET: u32 = 8;
}

/// Unit square as a triangle strip. Texture rows run top to bottom.
pub const LABEL_QUAD: [LabelVertex; 4] = [
    LabelVertex { position: [0.0, 0.0], uv: [0.0, 1.0] },
    LabelVertex { position: [1.0, 0.0], uv: [1.0, 1.0] },
    LabelVertex { position: [0.0, 1.0], uv: [0.0, 0.0] },
    LabelVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides() {
        assert_eq!(LineVertex::STRIDE, 8);
        assert_eq!(LabelVertex::STRIDE, 16);
        let quad: &[f32] = bytemuck::cast_slice(&LABEL_QUAD);
        assert_eq!(quad.len(), 16);
        assert_eq!(&quad[4..8], &[1.0, 0.0, 1.0, 1.0]);
    }
}
