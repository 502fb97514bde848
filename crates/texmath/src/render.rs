//! Math Rendering - Record a display tree as render primitives
//!
//! The [`Renderer`] is a [`DrawContext`] that stores every draw call, so a
//! host can paint the primitives later with any backend.

use crate::display::{Display, DrawContext, GlyphRun, Point, Rect};
use crate::error::MathResult;
use crate::font::MathFont;
use crate::model::LineStyle;
use crate::typesetter::layout_latex;
use serde::{Deserialize, Serialize};

// =============================================================================
// Colors
// =============================================================================

/// A color in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    /// Parse `#RRGGBB`, `#RGB` or a CSS color name
    pub fn parse(value: &str) -> Option<Color> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let lower = value.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, color)| *color)
    }

    fn parse_hex(hex: &str) -> Option<Color> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
        match hex.len() {
            6 => Some(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            3 => {
                let short = |i: usize| channel(i..i + 1).map(|v| v * 17);
                Some(Color::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::BLACK),
    ("white", Color::WHITE),
    ("red", Color::RED),
    ("green", Color::rgb(0, 128, 0)),
    ("lime", Color::rgb(0, 255, 0)),
    ("blue", Color::BLUE),
    ("yellow", Color::rgb(255, 255, 0)),
    ("cyan", Color::rgb(0, 255, 255)),
    ("aqua", Color::rgb(0, 255, 255)),
    ("magenta", Color::rgb(255, 0, 255)),
    ("fuchsia", Color::rgb(255, 0, 255)),
    ("gray", Color::rgb(128, 128, 128)),
    ("grey", Color::rgb(128, 128, 128)),
    ("lightgray", Color::rgb(211, 211, 211)),
    ("darkgray", Color::rgb(169, 169, 169)),
    ("orange", Color::rgb(255, 165, 0)),
    ("purple", Color::rgb(128, 0, 128)),
    ("brown", Color::rgb(165, 42, 42)),
    ("pink", Color::rgb(255, 192, 203)),
    ("navy", Color::rgb(0, 0, 128)),
    ("teal", Color::rgb(0, 128, 128)),
    ("olive", Color::rgb(128, 128, 0)),
    ("maroon", Color::rgb(128, 0, 0)),
    ("silver", Color::rgb(192, 192, 192)),
];

// =============================================================================
// Render Primitives
// =============================================================================

/// A render primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderPrimitive {
    /// One glyph with its baseline origin
    Glyph {
        glyph: String,
        position: Point,
        size: f32,
        color: Color,
    },
    /// Fraction bars, radical overbars, over/underlines
    Line {
        start: Point,
        end: Point,
        thickness: f32,
        color: Color,
    },
    /// Colorbox backgrounds
    Rectangle { rect: Rect, fill: Color },
}

// =============================================================================
// Render Output
// =============================================================================

/// The complete render output for a math expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOutput {
    pub primitives: Vec<RenderPrimitive>,
    /// Bounding box of the display, y up from the baseline
    pub bounds: Rect,
    /// Distance from the top of `bounds` to the baseline
    pub baseline: f32,
}

impl RenderOutput {
    pub fn new(primitives: Vec<RenderPrimitive>, bounds: Rect, baseline: f32) -> Self {
        Self {
            primitives,
            bounds,
            baseline,
        }
    }

    pub fn glyphs(&self) -> impl Iterator<Item = &str> {
        self.primitives.iter().filter_map(|p| match p {
            RenderPrimitive::Glyph { glyph, .. } => Some(glyph.as_str()),
            _ => None,
        })
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Configuration for the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Color for glyphs and rules without a local color
    pub text_color: Color,
    /// Color for placeholder glyphs
    pub placeholder_color: Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            text_color: Color::BLACK,
            placeholder_color: Color::BLUE,
        }
    }
}

/// Records draw calls as primitives
#[derive(Debug, Default)]
pub struct Renderer {
    config: RenderConfig,
    primitives: Vec<RenderPrimitive>,
}

impl Renderer {
    /// Create a new renderer with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: RenderConfig) -> Self {
        Self {
            config,
            primitives: Vec::new(),
        }
    }

    /// Render a display tree to primitives
    pub fn render(mut self, display: &Display) -> RenderOutput {
        display.draw(&mut self);
        RenderOutput::new(self.primitives, display.bounds(), display.ascent)
    }
}

impl DrawContext for Renderer {
    fn draw_glyphs(&mut self, run: &GlyphRun<'_>) {
        let color = if run.placeholder {
            self.config.placeholder_color
        } else {
            run.color.unwrap_or(self.config.text_color)
        };
        for (glyph, position) in run.glyphs.iter().zip(run.positions) {
            self.primitives.push(RenderPrimitive::Glyph {
                glyph: glyph.clone(),
                position: *position,
                size: run.font_size,
                color,
            });
        }
    }

    fn draw_line(&mut self, from: Point, to: Point, thickness: f32, color: Option<Color>) {
        self.primitives.push(RenderPrimitive::Line {
            start: from,
            end: to,
            thickness,
            color: color.unwrap_or(self.config.text_color),
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.primitives.push(RenderPrimitive::Rectangle { rect, fill: color });
    }
}

/// Parse, lay out and record a LaTeX string
pub fn render_latex(latex: &str, font: &MathFont, style: LineStyle) -> MathResult<RenderOutput> {
    let display = layout_latex(latex, font, style)?;
    Ok(Renderer::new().render(&display))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory;
    use crate::model::MathList;
    use crate::typesetter::layout;

    fn render(latex: &str) -> RenderOutput {
        render_latex(latex, &MathFont::default(), LineStyle::Display).unwrap()
    }

    #[test]
    fn test_color_creation() {
        let c = Color::rgb(255, 128, 64);
        assert_eq!(c.r, 255);
        assert_eq!(c.g, 128);
        assert_eq!(c.b, 64);
        assert_eq!(c.a, 255);
    }

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::parse("#ff8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(Color::parse("#F80"), Some(Color::rgb(255, 136, 0)));
        assert_eq!(Color::parse("Red"), Some(Color::RED));
        assert_eq!(Color::parse("blue"), Some(Color::BLUE));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("#gg0000"), None);
        assert_eq!(Color::parse("notacolor"), None);
    }

    #[test]
    fn test_render_simple_text() {
        let output = render("x");
        assert_eq!(output.glyphs().collect::<Vec<_>>(), vec!["\u{1D465}"]);
        assert!(output.bounds.width() > 0.0);
        assert!(output.bounds.height() > 0.0);
    }

    #[test]
    fn test_render_fraction() {
        let output = render("\\frac{a}{b}");
        let lines = output
            .primitives
            .iter()
            .filter(|p| matches!(p, RenderPrimitive::Line { .. }))
            .count();
        assert_eq!(lines, 1);
        assert_eq!(output.glyphs().count(), 2);
    }

    #[test]
    fn test_render_sqrt() {
        let output = render("\\sqrt{x}");
        assert!(output.glyphs().any(|g| g.starts_with('\u{221A}')));
        let Some(RenderPrimitive::Line { start, end, .. }) = output
            .primitives
            .iter()
            .find(|p| matches!(p, RenderPrimitive::Line { .. }))
        else {
            panic!("radical should draw its overbar");
        };
        assert!(end.x > start.x);
    }

    #[test]
    fn test_render_glyph_positions_advance() {
        let output = render("abc");
        let xs: Vec<f32> = output
            .primitives
            .iter()
            .filter_map(|p| match p {
                RenderPrimitive::Glyph { position, .. } => Some(position.x),
                _ => None,
            })
            .collect();
        assert_eq!(xs.len(), 3);
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_render_colors() {
        let output = render("\\color{red}{x}y");
        let colors: Vec<Color> = output
            .primitives
            .iter()
            .filter_map(|p| match p {
                RenderPrimitive::Glyph { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(colors, vec![Color::RED, Color::BLACK]);
    }

    #[test]
    fn test_render_colorbox_fills_first() {
        let output = render("\\colorbox{yellow}{x}");
        assert!(matches!(
            output.primitives.first(),
            Some(RenderPrimitive::Rectangle { fill, .. }) if *fill == Color::rgb(255, 255, 0)
        ));
    }

    #[test]
    fn test_render_config_colors() {
        let config = RenderConfig {
            text_color: Color::WHITE,
            placeholder_color: Color::RED,
        };
        let mut list = MathList::new();
        list.add_atom(factory::placeholder()).unwrap();
        let display = layout(&list.finalized(), &MathFont::default(), LineStyle::Text).unwrap();
        let output = Renderer::with_config(config).render(&display);
        assert!(matches!(
            output.primitives.as_slice(),
            [RenderPrimitive::Glyph { color, .. }] if *color == Color::RED
        ));
    }

    #[test]
    fn test_render_output_serializes() {
        let output = render("x^2");
        let json = serde_json::to_string(&output.primitives).unwrap();
        assert!(json.contains("Glyph"));
    }
}
