use image::RgbaImage;
use stripchart_core::{parse_hex, Palette, Rgb, Screen, DEFAULT_PALETTE};
use stripchart_render::{
    BlockRasterizer, BufferId, ChartError, ChartOptions, DrawCall, DrawMode, ProgramId,
    ProgramInterface, ProgramSource, RecordingBackend, RenderBackend, ShaderError, StripChart,
    TextureId, Topology, UniformLocation, UniformValue, VertexLayout,
};

fn chart_with(options: ChartOptions) -> StripChart<RecordingBackend> {
    StripChart::new(
        RecordingBackend::new(),
        options,
        Box::new(BlockRasterizer),
        800,
        600,
    )
    .unwrap()
}

fn chart(history_length: usize) -> StripChart<RecordingBackend> {
    chart_with(ChartOptions {
        history_length,
        ..ChartOptions::default()
    })
}

fn last_draws(chart: &StripChart<RecordingBackend>) -> Vec<DrawCall> {
    let frame = chart.backend().unwrap().last_frame().unwrap();
    RecordingBackend::draw_calls(frame)
}

/// The polyline draw for `name` in the last frame.
fn trace_draw(chart: &StripChart<RecordingBackend>, name: &str) -> Option<DrawCall> {
    let buffer = chart.channel(name)?.buffer();
    last_draws(chart)
        .into_iter()
        .find(|d| d.topology == Topology::LineStrip && d.buffers.iter().any(|(_, b)| *b == buffer))
}

fn mvp(draw: &DrawCall) -> [[f32; 4]; 4] {
    draw.uniforms
        .iter()
        .find_map(|(_, v)| match v {
            UniformValue::Mat4(m) => Some(*m),
            _ => None,
        })
        .unwrap()
}

fn interleaved(values: &[f32]) -> Vec<f32> {
    values
        .iter()
        .enumerate()
        .flat_map(|(i, v)| [i as f32, *v])
        .collect()
}

#[test]
fn test_two_channel_scenario() {
    let mut chart = chart(4);
    chart.append_channel_data("A", &[1.0, 2.0, 3.0]);
    chart.append_channel_data("B", &[5.0]);

    let a = chart.channel("A").unwrap();
    let b = chart.channel("B").unwrap();
    assert_eq!(a.history(), &[0.0, 1.0, 2.0, 3.0]);
    assert_eq!(b.history(), &[0.0, 0.0, 0.0, 5.0]);

    let palette = Palette::default();
    assert_eq!(a.color(), palette.color_for(0));
    assert_eq!(b.color(), palette.color_for(1));

    let backend = chart.backend().unwrap();
    assert_eq!(backend.buffer(a.buffer()), Some(&interleaved(a.history())[..]));
    assert_eq!(backend.buffer(b.buffer()).map(<[f32]>::len), Some(8));
}

#[test]
fn test_palette_follows_discovery_order() {
    let mut chart = chart(8);
    let names: Vec<String> = (0..23).map(|i| format!("ch{}", 22 - i)).collect();
    for name in &names {
        chart.append_channel_data(name, &[0.0]);
        // repeat appends never reassign colors
        chart.append_channel_data(&names[0], &[1.0]);
    }

    for (n, name) in names.iter().enumerate() {
        let expected = parse_hex(DEFAULT_PALETTE[n % DEFAULT_PALETTE.len()]);
        assert_eq!(chart.channel(name).unwrap().color(), expected, "channel {name}");
    }
    assert_eq!(
        chart.channel_names().collect::<Vec<_>>(),
        names.iter().map(String::as_str).collect::<Vec<_>>()
    );
}

#[test]
fn test_history_tail_after_every_append() {
    let capacity = 16;
    let mut chart = chart(capacity);
    let mut arrived: Vec<f32> = Vec::new();
    let mut next = 0.0f32;

    for batch_len in [3usize, 0, 1, 7, 20, 2, 16, 5] {
        let batch: Vec<f32> = (0..batch_len)
            .map(|_| {
                next += 0.5;
                next
            })
            .collect();
        chart.append_channel_data("X", &batch);
        arrived.extend_from_slice(&batch);

        let Some(channel) = chart.channel("X") else {
            assert!(arrived.is_empty());
            continue;
        };
        let kept = arrived.len().min(capacity);
        let history = channel.history();
        assert!(history[..capacity - kept].iter().all(|v| *v == 0.0));
        assert_eq!(&history[capacity - kept..], &arrived[arrived.len() - kept..]);

        let uploaded = chart.backend().unwrap().buffer(channel.buffer()).unwrap();
        assert_eq!(uploaded, &interleaved(history)[..]);
    }
}

#[test]
fn test_render_is_idempotent() {
    let mut chart = chart(32);
    chart.append_channel_data("Fp1", &[0.1, 0.2, 0.3]);
    chart.append_channel_data("Fp2", &[-0.4]);

    chart.render().unwrap();
    chart.render().unwrap();
    chart.render().unwrap();

    let frames = chart.backend().unwrap().frames();
    assert_eq!(frames.len(), 3);
    // the first frame also rasterizes labels; draw calls match from the start
    assert_eq!(
        RecordingBackend::draw_calls(&frames[0]),
        RecordingBackend::draw_calls(&frames[1])
    );
    assert_eq!(frames[1], frames[2]);
}

#[test]
fn test_frame_layout() {
    let mut chart = chart(10);
    chart.append_channel_data("A", &[1.0]);
    chart.append_channel_data("B", &[1.0]);
    chart.render().unwrap();

    let draws = last_draws(&chart);
    // grid, then polyline and label for each channel
    let topologies: Vec<_> = draws.iter().map(|d| d.topology).collect();
    assert_eq!(
        topologies,
        vec![
            Topology::LineList,
            Topology::LineStrip,
            Topology::TriangleStrip,
            Topology::LineStrip,
            Topology::TriangleStrip,
        ]
    );
    assert_eq!(draws[0].count, 4);
    assert_eq!((draws[1].first, draws[1].count), (0, 10));

    let frame = chart.backend().unwrap().last_frame().unwrap();
    assert!(matches!(frame[0], stripchart_render::Command::Clear(c) if c == [1.0, 1.0, 1.0, 1.0]));
}

#[test]
fn test_row_height_independent_of_width() {
    let mut chart = chart(8);
    chart.reshape(640, 480);
    let narrow = chart.row_height();
    chart.reshape(2560, 480);
    assert_eq!(chart.row_height(), narrow);

    chart.reshape(640, 960);
    assert!((chart.row_height() * 2.0 - narrow).abs() < 1e-6);

    // matches the physical definition: 3 cm of a 480 px, 96 dpi surface
    let expected = Screen::new(1, 480, 1.0).row_height(3.0);
    chart.reshape(1, 480);
    assert_eq!(chart.row_height(), expected);
}

#[test]
fn test_hidden_channels_give_up_their_row() {
    let mut chart = chart(8);
    for name in ["A", "B", "C"] {
        chart.append_channel_data(name, &[1.0, 2.0]);
    }
    chart.render().unwrap();
    let before_c = mvp(&trace_draw(&chart, "C").unwrap());
    let before_draws = last_draws(&chart);
    let b_history = chart.channel("B").unwrap().history().to_vec();

    chart.toggle_visibility("B").unwrap();
    assert_eq!(chart.visible_count(), 2);
    assert!(trace_draw(&chart, "B").is_none());
    // C moves up into B's row and the grid shrinks
    let hidden_c = mvp(&trace_draw(&chart, "C").unwrap());
    let row_height = chart.row_height();
    assert!((hidden_c[3][1] - (1.0 - row_height * 1.5)).abs() < 1e-6);
    assert_eq!(last_draws(&chart)[0].count, 4);
    assert_ne!(hidden_c, before_c);

    chart.toggle_visibility("B").unwrap();
    assert_eq!(last_draws(&chart), before_draws);
    assert_eq!(chart.channel("B").unwrap().history(), &b_history[..]);
}

#[test]
fn test_toggle_unknown_channel_is_ignored() {
    let mut chart = chart(8);
    chart.append_channel_data("A", &[1.0]);
    chart.toggle_visibility("a").unwrap();
    assert!(chart.backend().unwrap().frames().is_empty());
    assert!(chart.channel("A").unwrap().is_visible());
}

#[test]
fn test_amplitude_sets_row_scale() {
    let mut chart = chart_with(ChartOptions {
        history_length: 8,
        amplitude: 4.0,
        ..ChartOptions::default()
    });
    chart.append_channel_data("A", &[4.0]);
    chart.render().unwrap();

    let m = mvp(&trace_draw(&chart, "A").unwrap());
    // a sample equal to the amplitude reaches the top of its row
    let top = m[1][1] * 4.0 + m[3][1];
    assert!((top - 1.0).abs() < 1e-5);
    // the last sample sits on the right edge
    assert!((m[0][0] * 7.0 + m[3][0] - 1.0).abs() < 1e-6);
}

#[test]
fn test_segmented_chart_draws_high_runs_only() {
    let mut chart = chart_with(ChartOptions {
        history_length: 8,
        mode: DrawMode::Segmented { threshold: 0.5 },
        ..ChartOptions::default()
    });
    chart.append_channel_data("G", &[0.0, 0.0, 0.0]);
    chart.append_channel_data("G", &[1.0, 0.2, 0.2]);
    chart.append_channel_data("G", &[0.9, 0.1]);
    chart.render().unwrap();

    let buffer = chart.channel("G").unwrap().buffer();
    let strips: Vec<_> = last_draws(&chart)
        .into_iter()
        .filter(|d| d.topology == Topology::LineStrip && d.buffers.iter().any(|(_, b)| *b == buffer))
        .map(|d| (d.first, d.count))
        .collect();
    // logical 3..8 is one high run; the window is logical 0..8
    assert_eq!(strips, vec![(3, 5)]);
}

#[test]
fn test_label_follows_pixel_ratio() {
    let mut chart = chart(8);
    chart.append_channel_data("A", &[1.0]);
    chart.render().unwrap();
    chart.render().unwrap();
    assert_eq!(chart.backend().unwrap().live_textures(), 1);
    let first = chart.channel("A").unwrap().label().texture();

    chart.backend_mut().unwrap().set_pixel_ratio(2.0);
    chart.reshape(800, 600);
    chart.render().unwrap();

    let second = chart.channel("A").unwrap().label().texture();
    assert_ne!(first, second);
    assert_eq!(chart.backend().unwrap().live_textures(), 1);
    let texture = chart.backend().unwrap().texture(second.unwrap()).unwrap();
    let expected = stripchart_render::rasterize_badge(
        &mut BlockRasterizer,
        "A",
        chart.channel("A").unwrap().color(),
        &chart.options().label,
        2.0,
    );
    assert_eq!(texture, &expected);
}

#[test]
fn test_hex_parsing() {
    let c = parse_hex("#F2645A");
    assert!((c.r - 0.949).abs() < 1e-3);
    assert!((c.g - 0.392).abs() < 1e-3);
    assert!((c.b - 0.353).abs() < 1e-3);
    assert_eq!(parse_hex("#zzzzzz"), Rgb::BLACK);
    assert_eq!(parse_hex("F2645A"), Rgb::BLACK);
    assert_eq!(parse_hex("#F2645A0"), Rgb::BLACK);
}

/// Rejects every program, as a driver would on a broken shader.
struct RejectingBackend(RecordingBackend);

impl RenderBackend for RejectingBackend {
    type Error = std::convert::Infallible;

    fn create_program(
        &mut self,
        source: &ProgramSource<'_>,
        _interface: &ProgramInterface,
    ) -> Result<ProgramId, ShaderError> {
        Err(ShaderError::Backend {
            label: source.label.to_string(),
            message: "unsupported".to_string(),
        })
    }

    fn create_buffer(&mut self, label: &str) -> BufferId {
        self.0.create_buffer(label)
    }

    fn upload_buffer(&mut self, buffer: BufferId, data: &[f32]) {
        self.0.upload_buffer(buffer, data);
    }

    fn bind_buffer(&mut self, buffer: BufferId) {
        self.0.bind_buffer(buffer);
    }

    fn create_texture(&mut self, label: &str, image: &RgbaImage) -> TextureId {
        self.0.create_texture(label, image)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.0.delete_texture(texture);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.0.bind_texture(unit, texture);
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.0.use_program(program);
    }

    fn enable_attribute(&mut self, location: u32, layout: VertexLayout) {
        self.0.enable_attribute(location, layout);
    }

    fn disable_attribute(&mut self, location: u32) {
        self.0.disable_attribute(location);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.0.set_uniform(location, value);
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        self.0.draw_arrays(topology, first, count);
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.0.clear(color);
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.0.viewport(width, height);
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.0.resize_surface(width, height);
    }

    fn pixel_ratio(&self) -> f32 {
        self.0.pixel_ratio()
    }

    fn end_frame(&mut self) -> Result<(), Self::Error> {
        self.0.end_frame()
    }
}

#[test]
fn test_program_failure_fails_construction() {
    let result = StripChart::new(
        RejectingBackend(RecordingBackend::new()),
        ChartOptions::default(),
        Box::new(BlockRasterizer),
        800,
        600,
    );
    assert!(matches!(
        result,
        Err(ChartError::Shader(ShaderError::Backend { .. }))
    ));
}
