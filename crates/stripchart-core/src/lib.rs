//! Core types for the strip chart renderer.
//!
//! This crate provides the GPU-independent data model with no external dependencies:
//! - `Rgb`, `Palette` - channel colors and hex parsing
//! - `History` - fixed-capacity rolling sample window per channel
//! - `RunTable` - run-length segments for the gated drawing mode
//! - `Screen`, `Transform` - layout and NDC transforms
//! - `BadgeGeometry` - label badge sizing and rounded-rectangle coverage

pub mod badge;
pub mod color;
pub mod history;
pub mod layout;
pub mod runs;

pub use badge::BadgeGeometry;
pub use color::{parse_hex, Palette, Rgb, DEFAULT_PALETTE};
pub use history::History;
pub use layout::{row_center, separator_y, Row, Screen, Transform};
pub use runs::{Level, Run, RunState, RunTable};

/// Physical height of one channel row.
pub const CHANNEL_HEIGHT_CM: f32 = 3.0;

/// Pixel density assumed for backing-store pixels.
pub const DEFAULT_DPI: f32 = 96.0;

/// Centimeters per inch.
pub const CM_PER_INCH: f32 = 2.54;
