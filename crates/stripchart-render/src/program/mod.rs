//! Shader programs.
//!
//! [`ProgramInterface`] reflects and links WGSL stages, [`ShaderProgram`] wraps a
//! linked program with attribute declarations and a uniform location cache, and
//! [`ProgramRegistry`] owns the programs shared by every renderer of a chart.

pub mod builtin;
mod interface;
mod registry;
mod shader;

pub use interface::{
    AttributeInfo, ProgramInterface, FRAGMENT_ENTRY, TEXTURE_GROUP, UNIFORM_GROUP, VERTEX_ENTRY,
};
pub use registry::{ProgramKind, ProgramRegistry};
pub use shader::ShaderProgram;
