//! WGSL sources for the chart's programs, as `(vertex, fragment)` pairs.

pub const TRACE: (&str, &str) = (
    include_str!("../shaders/trace.vert.wgsl"),
    include_str!("../shaders/trace.frag.wgsl"),
);

pub const GRID: (&str, &str) = (
    include_str!("../shaders/grid.vert.wgsl"),
    include_str!("../shaders/grid.frag.wgsl"),
);

pub const LABEL: (&str, &str) = (
    include_str!("../shaders/label.vert.wgsl"),
    include_str!("../shaders/label.frag.wgsl"),
);
