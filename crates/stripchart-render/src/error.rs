//! Error types for stripchart-render.

use std::fmt;

use thiserror::Error;

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Failure to build or use a shader program.
///
/// A program that failed to build never receives a handle, so there is no way to
/// activate it afterwards.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShaderError {
    #[error("{label}: {stage} stage failed to compile: {message}")]
    Compile {
        label: String,
        stage: ShaderStage,
        message: String,
    },
    #[error("{label}: program failed to link: {message}")]
    Link { label: String, message: String },
    #[error("{label}: no vertex attribute named `{name}`")]
    UnknownAttribute { label: String, name: String },
    #[error("{label}: rejected by the GPU: {message}")]
    Backend { label: String, message: String },
}

/// Failure to acquire a drawing surface.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("Surface reports no supported texture formats")]
    UnsupportedSurface,
}

/// Failure to bring up a chart.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error("Invalid chart options: {0}")]
    InvalidOptions(String),
}
