//! Channel colors.

/// Default channel palette, consumed in discovery order.
pub const DEFAULT_PALETTE: [&str; 20] = [
    "#F2645A", "#1DAAB2", "#F5B455", "#88D9F2", "#C0A141",
    "#AE79F3", "#C4CD5C", "#3C5FD6", "#86C558", "#B94296",
    "#809549", "#5693D6", "#2DAA31", "#C569CD", "#54B075",
    "#9F5A8F", "#2D8764", "#ADADE9", "#65B1A1", "#A030CB",
];

/// Luminance at or above which black text is used on a badge.
pub const LIGHT_BACKGROUND_LUMINANCE: f32 = 0.6;

/// Linear RGB color with components in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Relative luminance `0.2126R + 0.7152G + 0.0722B`.
    #[must_use]
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    /// Text color that stays legible on top of this color.
    #[must_use]
    pub fn contrasting_text(self) -> Rgb {
        if self.luminance() >= LIGHT_BACKGROUND_LUMINANCE {
            Rgb::BLACK
        } else {
            Rgb::WHITE
        }
    }

    #[must_use]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    #[must_use]
    pub fn to_rgba(self, alpha: f32) -> [f32; 4] {
        [self.r, self.g, self.b, alpha]
    }

    /// Quantize to 8-bit channels.
    #[must_use]
    pub fn to_rgba8(self, alpha: u8) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), alpha]
    }
}

impl From<Rgb> for [f32; 3] {
    fn from(c: Rgb) -> Self {
        c.to_array()
    }
}

/// Parse a `#RRGGBB` string.
///
/// Anything that is not exactly seven characters, does not start with `#`, or
/// contains a non-hex digit yields black.
#[must_use]
pub fn parse_hex(hex: &str) -> Rgb {
    let bytes = hex.as_bytes();
    if bytes.len() != 7 || bytes[0] != b'#' {
        return Rgb::BLACK;
    }

    let mut channels = [0u8; 3];
    for (channel, pair) in channels.iter_mut().zip(bytes[1..].chunks(2)) {
        let (Some(hi), Some(lo)) = (hex_digit(pair[0]), hex_digit(pair[1])) else {
            return Rgb::BLACK;
        };
        *channel = (hi << 4) | lo;
    }

    Rgb::new(
        f32::from(channels[0]) / 255.0,
        f32::from(channels[1]) / 255.0,
        f32::from(channels[2]) / 255.0,
    )
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Ordered set of colors handed out cyclically by discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Build a palette from hex strings. Malformed entries become black; an empty
    /// list falls back to [`DEFAULT_PALETTE`].
    pub fn from_hex<S: AsRef<str>>(entries: &[S]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }
        Self {
            colors: entries.iter().map(|e| parse_hex(e.as_ref())).collect(),
        }
    }

    /// Color for the channel discovered at `index` (0-based).
    #[must_use]
    pub fn color_for(&self, index: usize) -> Rgb {
        self.colors[index % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_hex(&DEFAULT_PALETTE[..])
    }
}
