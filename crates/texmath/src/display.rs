//! Math Displays - The positioned tree produced by the typesetter
//!
//! Every node carries its extent around its own baseline (`ascent` above,
//! `descent` below, `width` to the right) and a `position` relative to the
//! origin of its parent. The y axis points up, so a superscript has a
//! positive `position.y` and a subscript a negative one.
//!
//! A tree is painted by walking it onto a [`DrawContext`]; the recording
//! [`Renderer`](crate::render::Renderer) is one such context.

use crate::render::Color;
use serde::{Deserialize, Serialize};
use std::ops::Range;

// =============================================================================
// Geometry
// =============================================================================

/// A position in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// A size with width and height
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle; `origin` is its lowest-leftmost corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn x(&self) -> f32 {
        self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.origin.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn top(&self) -> f32 {
        self.origin.y + self.size.height
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x().min(other.x());
        let y = self.y().min(other.y());
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.top().max(other.top()) - y,
        )
    }
}

// =============================================================================
// Display Tree
// =============================================================================

/// Role of a math list display inside its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LinePosition {
    #[default]
    Regular,
    Subscript,
    Superscript,
    /// The contents between `\left` and `\right`
    Inner,
}

/// A horizontal rule; `origin` is the left end of its center line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub origin: Point,
    pub length: f32,
    pub thickness: f32,
}

/// What a display node draws
///
/// Children are positioned relative to the node that owns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DisplayKind {
    /// A run of glyphs on the baseline
    TextLine {
        text: String,
        glyphs: Vec<String>,
        /// Advance after each glyph, including inter-element kerning
        advances: Vec<f32>,
        font_size: f32,
        placeholder: bool,
    },
    /// A laid out math list
    List {
        children: Vec<Display>,
        line_position: LinePosition,
        /// Index of the scripted atom in the parent list, for scripts
        index: Option<usize>,
    },
    Fraction {
        numerator: Box<Display>,
        denominator: Box<Display>,
        rule: Option<Rule>,
    },
    Radical {
        sign: Box<Display>,
        radicand: Box<Display>,
        degree: Option<Box<Display>>,
        rule: Rule,
    },
    /// A single glyph lowered by `shift_down`
    Glyph {
        glyph: String,
        font_size: f32,
        shift_down: f32,
    },
    /// Glyph parts stacked upwards from the baseline at the given offsets
    GlyphConstruction {
        glyphs: Vec<String>,
        offsets: Vec<f32>,
        font_size: f32,
        shift_down: f32,
    },
    LargeOpLimits {
        nucleus: Box<Display>,
        upper: Option<Box<Display>>,
        lower: Option<Box<Display>>,
    },
    /// Overline or underline
    Line { inner: Box<Display>, rule: Rule },
    Accent {
        accent: Box<Display>,
        accentee: Box<Display>,
    },
    /// Contents wrapped in delimiter glyphs
    Inner {
        left: Option<Box<Display>>,
        inner: Box<Display>,
        right: Option<Box<Display>>,
    },
}

/// A positioned node of the display tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Display {
    pub kind: DisplayKind,
    pub position: Point,
    pub ascent: f32,
    pub descent: f32,
    pub width: f32,
    /// Atoms of the source list covered by this node
    pub range: Range<usize>,
    pub has_script: bool,
    pub text_color: Option<Color>,
    pub background_color: Option<Color>,
}

impl Display {
    pub fn new(kind: DisplayKind, ascent: f32, descent: f32, width: f32) -> Self {
        Self {
            kind,
            position: Point::origin(),
            ascent,
            descent,
            width,
            range: 0..0,
            has_script: false,
            text_color: None,
            background_color: None,
        }
    }

    /// A regular list display sized to cover its children
    pub fn list(children: Vec<Display>, range: Range<usize>) -> Self {
        let mut display = Self::new(
            DisplayKind::List {
                children,
                line_position: LinePosition::Regular,
                index: None,
            },
            0.0,
            0.0,
            0.0,
        );
        display.range = range;
        display.recompute_dimensions();
        display
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn with_range(mut self, range: Range<usize>) -> Self {
        self.range = range;
        self
    }

    /// Fit a list display around its children
    ///
    /// Nothing below the baseline or above it is counted negatively, so an
    /// empty list has zero extent.
    pub(crate) fn recompute_dimensions(&mut self) {
        let DisplayKind::List { children, .. } = &self.kind else {
            return;
        };
        let (mut ascent, mut descent, mut width) = (0.0f32, 0.0f32, 0.0f32);
        for child in children {
            ascent = ascent.max(child.position.y + child.ascent);
            descent = descent.max(child.descent - child.position.y);
            width = width.max(child.position.x + child.width);
        }
        self.ascent = ascent;
        self.descent = descent;
        self.width = width;
    }

    /// Mark a list display as a script or inner list
    pub(crate) fn set_line_position(&mut self, position: LinePosition, parent_index: Option<usize>) {
        if let DisplayKind::List {
            line_position,
            index,
            ..
        } = &mut self.kind
        {
            *line_position = position;
            *index = parent_index;
        }
    }

    pub fn line_position(&self) -> Option<LinePosition> {
        match &self.kind {
            DisplayKind::List { line_position, .. } => Some(*line_position),
            _ => None,
        }
    }

    /// Extent in the parent's coordinates
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y - self.descent,
            self.width,
            self.ascent + self.descent,
        )
    }

    /// Direct children, in drawing order
    pub fn children(&self) -> Vec<&Display> {
        match &self.kind {
            DisplayKind::TextLine { .. }
            | DisplayKind::Glyph { .. }
            | DisplayKind::GlyphConstruction { .. } => Vec::new(),
            DisplayKind::List { children, .. } => children.iter().collect(),
            DisplayKind::Fraction {
                numerator,
                denominator,
                ..
            } => vec![numerator.as_ref(), denominator.as_ref()],
            DisplayKind::Radical {
                sign,
                radicand,
                degree,
                ..
            } => {
                let mut children = vec![sign.as_ref(), radicand.as_ref()];
                children.extend(degree.as_deref());
                children
            }
            DisplayKind::LargeOpLimits {
                nucleus,
                upper,
                lower,
            } => {
                let mut children = vec![nucleus.as_ref()];
                children.extend(upper.as_deref());
                children.extend(lower.as_deref());
                children
            }
            DisplayKind::Line { inner, .. } => vec![inner.as_ref()],
            DisplayKind::Accent { accent, accentee } => vec![accentee.as_ref(), accent.as_ref()],
            DisplayKind::Inner { left, inner, right } => {
                let mut children: Vec<&Display> = left.as_deref().into_iter().collect();
                children.push(inner.as_ref());
                children.extend(right.as_deref());
                children
            }
        }
    }

    /// Depth-first search for the first node matching `predicate`
    pub fn find(&self, predicate: &impl Fn(&Display) -> bool) -> Option<&Display> {
        if predicate(self) {
            return Some(self);
        }
        self.children()
            .into_iter()
            .find_map(|child| child.find(predicate))
    }

    /// Paint the tree with its origin on the context origin
    pub fn draw(&self, ctx: &mut dyn DrawContext) {
        self.draw_at(Point::origin(), None, ctx);
    }

    fn draw_at(&self, parent: Point, inherited: Option<Color>, ctx: &mut dyn DrawContext) {
        let origin = parent.offset(self.position.x, self.position.y);
        if let Some(background) = self.background_color {
            ctx.fill_rect(
                Rect::new(
                    origin.x,
                    origin.y - self.descent,
                    self.width,
                    self.ascent + self.descent,
                ),
                background,
            );
        }
        let color = self.text_color.or(inherited);

        match &self.kind {
            DisplayKind::TextLine {
                glyphs,
                advances,
                font_size,
                placeholder,
                ..
            } => {
                let mut x = origin.x;
                let positions: Vec<Point> = advances
                    .iter()
                    .map(|advance| {
                        let position = Point::new(x, origin.y);
                        x += advance;
                        position
                    })
                    .collect();
                ctx.draw_glyphs(&GlyphRun {
                    glyphs,
                    positions: &positions,
                    font_size: *font_size,
                    color,
                    placeholder: *placeholder,
                });
            }
            DisplayKind::Glyph {
                glyph,
                font_size,
                shift_down,
            } => {
                let positions = [Point::new(origin.x, origin.y - shift_down)];
                ctx.draw_glyphs(&GlyphRun {
                    glyphs: std::slice::from_ref(glyph),
                    positions: &positions,
                    font_size: *font_size,
                    color,
                    placeholder: false,
                });
            }
            DisplayKind::GlyphConstruction {
                glyphs,
                offsets,
                font_size,
                shift_down,
            } => {
                let positions: Vec<Point> = offsets
                    .iter()
                    .map(|offset| Point::new(origin.x, origin.y - shift_down + offset))
                    .collect();
                ctx.draw_glyphs(&GlyphRun {
                    glyphs,
                    positions: &positions,
                    font_size: *font_size,
                    color,
                    placeholder: false,
                });
            }
            _ => {
                for child in self.children() {
                    child.draw_at(origin, color, ctx);
                }
                if let Some(rule) = self.rule() {
                    ctx.draw_line(
                        rule.origin.offset(origin.x, origin.y),
                        rule.origin.offset(origin.x + rule.length, origin.y),
                        rule.thickness,
                        color,
                    );
                }
            }
        }
    }

    fn rule(&self) -> Option<&Rule> {
        match &self.kind {
            DisplayKind::Fraction { rule, .. } => rule.as_ref(),
            DisplayKind::Radical { rule, .. } | DisplayKind::Line { rule, .. } => Some(rule),
            _ => None,
        }
    }
}

// =============================================================================
// Drawing Context
// =============================================================================

/// Glyphs to paint, with one absolute baseline origin per glyph
#[derive(Debug, Clone, Copy)]
pub struct GlyphRun<'a> {
    pub glyphs: &'a [String],
    pub positions: &'a [Point],
    pub font_size: f32,
    /// Inherited text color, `None` for the context default
    pub color: Option<Color>,
    pub placeholder: bool,
}

/// A 2D surface the display tree paints onto
///
/// Coordinates are y-up with the root baseline at y = 0.
pub trait DrawContext {
    fn draw_glyphs(&mut self, run: &GlyphRun<'_>);

    fn draw_line(&mut self, from: Point, to: Point, thickness: f32, color: Option<Color>);

    fn fill_rect(&mut self, rect: Rect, color: Color);
}

// =============================================================================
// Tests
// =============================================================================
