//! Colors, line styles, markers and the shared color palette.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable RGBA color (since peniko::Color doesn't impl Serialize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Parse a color name.
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, the single letters
    /// `k r g b w` and the matching English names.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        if let Some(hex) = name.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let color = match name.as_str() {
            "k" | "black" => Self::black(),
            "w" | "white" => Self::white(),
            "r" | "red" => Self::new(255, 0, 0, 255),
            "g" | "green" => Self::new(0, 128, 0, 255),
            "b" | "blue" => Self::new(0, 0, 255, 255),
            _ => return None,
        };
        Some(color)
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
                Some(Self::new(digit(0)?, digit(1)?, digit(2)?, 255))
            }
            6 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// `#rrggbb` form (alpha omitted when opaque).
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Dash pattern of polylines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// Marker drawn at point artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkerSymbol {
    /// Filled square dot.
    #[default]
    Dot,
    /// Hollow square outline.
    Circle,
    /// Filled square.
    Square,
    /// Plus sign.
    Plus,
}

/// Drawing attributes of one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    pub color: SerializableColor,
    pub line_style: LineStyle,
    pub line_width: f64,
    pub marker: MarkerSymbol,
    /// Marker size in pixels.
    pub marker_size: f64,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            line_style: LineStyle::Solid,
            line_width: 1.0,
            marker: MarkerSymbol::Dot,
            marker_size: 5.0,
        }
    }
}

impl Paint {
    /// Paint for point markers.
    pub fn marker(color: SerializableColor, marker: MarkerSymbol, size: f64) -> Self {
        Self {
            color,
            marker,
            marker_size: size,
            ..Self::default()
        }
    }

    /// Paint for polylines.
    pub fn stroke(color: SerializableColor, style: LineStyle, width: f64) -> Self {
        Self {
            color,
            line_style: style,
            line_width: width,
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: SerializableColor) -> Self {
        self.color = color;
        self
    }
}

/// Ordered list of colors new objects pick from.
///
/// Colors named at construction are appended when not present yet, so the
/// palette grows with usage and keyboard color cycling can reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<SerializableColor>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![
                SerializableColor::new(0x11, 0x11, 0x11, 255),
                SerializableColor::new(255, 0, 0, 255),
                SerializableColor::new(0, 0, 255, 255),
                SerializableColor::new(0, 128, 0, 255),
                SerializableColor::new(0xee, 0xee, 0xee, 255),
            ],
        }
    }
}

impl Palette {
    /// Palette with the given colors; an empty list falls back to the default.
    pub fn new(colors: Vec<SerializableColor>) -> Self {
        if colors.is_empty() {
            Self::default()
        } else {
            Self { colors }
        }
    }

    pub fn colors(&self) -> &[SerializableColor] {
        &self.colors
    }

    /// First color of the palette.
    pub fn default_color(&self) -> SerializableColor {
        self.colors.first().copied().unwrap_or_else(SerializableColor::black)
    }

    /// Resolve a requested color name.
    ///
    /// `None` gives the default color. Valid colors missing from the palette
    /// are appended; unparseable names are logged and replaced by the default.
    pub fn resolve(&mut self, name: Option<&str>) -> SerializableColor {
        let Some(name) = name else {
            return self.default_color();
        };
        match SerializableColor::parse(name) {
            Some(color) => {
                if !self.colors.contains(&color) {
                    self.colors.push(color);
                }
                color
            }
            None => {
                log::warn!("Unknown color {:?}, using palette default", name);
                self.default_color()
            }
        }
    }

    /// Color `step` positions away from `current`, wrapping around.
    ///
    /// A color not in the palette is treated as sitting at index 0.
    pub fn cycle(&self, current: SerializableColor, step: isize) -> SerializableColor {
        let len = self.colors.len() as isize;
        if len == 0 {
            return current;
        }
        let index = self.colors.iter().position(|c| *c == current).unwrap_or(0) as isize;
        self.colors[(index + step).rem_euclid(len) as usize]
    }
}
