//! Typesetter - Lay out math lists into display trees
//!
//! The rules follow Appendix G of the TeXbook, with every distance taken
//! from the OpenType MATH constants of a [`MathFont`]. Input lists must be
//! finalized; anything else is reported as a [`TypesetError`].

use crate::builder::try_build_from_string;
use crate::display::{Display, DisplayKind, LinePosition, Point, Rule};
use crate::error::{MathResult, TypesetError};
use crate::factory;
use crate::font::{GlyphBounds, GlyphPart, MathFont};
use crate::model::{Atom, AtomKind, AtomType, ColumnAlignment, Fraction, Inner, LineStyle, MathList, Table};
use crate::render::Color;
use crate::unicode::styled_string;
use std::ops::Range;
use tracing::{debug, trace, warn};

/// `\left`/`\right` delimiters cover at least 901/1000 of the formula
const DELIMITER_FACTOR: f32 = 901.0;
/// ...or fall at most 5pt short of it
const DELIMITER_SHORTFALL_POINTS: f32 = 5.0;
/// Height of generalized fraction delimiters, in em
const FRACTION_DELIMITER_SIZE: f32 = 1.01;
const FRACTION_DELIMITER_DISPLAY_STYLE_SIZE: f32 = 2.39;
/// Table row spacing, in em
const BASELINE_SKIP_MULTIPLIER: f32 = 1.2;
const LINE_SKIP_MULTIPLIER: f32 = 0.1;
const LINE_SKIP_LIMIT_MULTIPLIER: f32 = 0.0;
const JOT_MULTIPLIER: f32 = 0.3;
const MAX_ASSEMBLY_EXTENDERS: usize = 256;
const RADICAL_SIGN: char = '\u{221A}';

// =============================================================================
// Inter-element Spacing
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum InterSpace {
    Zero,
    Thin,
    /// Only outside script styles
    NsThin,
    NsMedium,
    NsThick,
    Invalid,
}

use InterSpace::{Invalid as XX, NsMedium as NM, NsThick as NK, NsThin as NT, Thin as TH, Zero as ZZ};

/// Rows are the left atom, columns the right atom:
/// ordinary, operator, binary, relation, open, close, punct, inner, radical
#[rustfmt::skip]
const SPACING: [[InterSpace; 9]; 9] = [
    [ZZ, TH, NM, NK, ZZ, ZZ, ZZ, NT, ZZ], // ordinary
    [TH, TH, XX, NK, ZZ, ZZ, ZZ, NT, TH], // operator
    [NM, NM, XX, XX, NM, XX, XX, NM, NM], // binary
    [NK, NK, XX, ZZ, NK, ZZ, ZZ, NK, NK], // relation
    [ZZ, ZZ, XX, ZZ, ZZ, ZZ, ZZ, ZZ, ZZ], // open
    [ZZ, TH, NM, NK, ZZ, ZZ, ZZ, NT, ZZ], // close
    [NT, NT, XX, NT, NT, NT, NT, NT, NT], // punct
    [NT, TH, NM, NK, NT, ZZ, NT, NT, NT], // inner
    [NM, NT, NM, NK, ZZ, ZZ, ZZ, NT, ZZ], // radical
];

/// Radicals only have their own row; on the right they act as ordinary
fn spacing_index(atom_type: AtomType, left: bool) -> Option<usize> {
    let index = match atom_type {
        AtomType::Ordinary | AtomType::Placeholder | AtomType::Color | AtomType::Colorbox => 0,
        AtomType::LargeOperator => 1,
        AtomType::BinaryOperator => 2,
        AtomType::Relation => 3,
        AtomType::Open => 4,
        AtomType::Close => 5,
        AtomType::Punctuation => 6,
        AtomType::Fraction | AtomType::Inner => 7,
        AtomType::Radical if left => 8,
        AtomType::Radical => 0,
        _ => return None,
    };
    Some(index)
}

fn style_size(style: LineStyle, font: &MathFont) -> f32 {
    match style {
        LineStyle::Display | LineStyle::Text => font.size(),
        LineStyle::Script => font.size() * font.script_scale_down(),
        LineStyle::ScriptScript => font.size() * font.script_script_scale_down(),
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Lay out a finalized math list at `style`
pub fn layout(list: &MathList, font: &MathFont, style: LineStyle) -> Result<Display, TypesetError> {
    Typesetter::create_line(list, font, style, false, false)
}

/// Parse, finalize and lay out a LaTeX string
pub fn layout_latex(latex: &str, font: &MathFont, style: LineStyle) -> MathResult<Display> {
    let list = try_build_from_string(latex)?.finalized();
    Ok(layout(&list, font, style)?)
}

/// Rule 14 of Appendix G plus the conversions the parser leaves to layout
///
/// Variables and numbers become ordinary atoms with a styled nucleus,
/// unary operators become ordinary, and adjacent unscripted ordinaries are
/// fused.
fn preprocess(list: &MathList) -> Vec<Atom> {
    let mut atoms: Vec<Atom> = Vec::with_capacity(list.len());
    for atom in list.atoms() {
        let mut atom = atom.clone();
        match atom.atom_type() {
            AtomType::Variable | AtomType::Number => {
                atom.nucleus = styled_string(&atom.nucleus, atom.font_style);
                atom.set_atom_type(AtomType::Ordinary);
            }
            AtomType::UnaryOperator => atom.set_atom_type(AtomType::Ordinary),
            _ => {}
        }
        if atom.atom_type() == AtomType::Ordinary {
            if let Some(prev) = atoms.last_mut() {
                if prev.atom_type() == AtomType::Ordinary
                    && !prev.has_scripts()
                    && prev.fuse(atom.clone()).is_ok()
                {
                    continue;
                }
            }
        }
        atoms.push(atom);
    }
    atoms
}

// =============================================================================
// Pending Text Line
// =============================================================================

/// Characters collected for the next text line display
#[derive(Debug, Default)]
struct PendingLine {
    text: String,
    glyphs: Vec<String>,
    advances: Vec<f32>,
    ascent: f32,
    descent: f32,
    range: Option<Range<usize>>,
    placeholder: bool,
}

impl PendingLine {
    fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    fn push_text(&mut self, text: &str, font: &MathFont) {
        for ch in text.chars() {
            let glyph = font.glyph_for_char(ch);
            let bounds = font.glyph_bounds(&glyph);
            self.ascent = self.ascent.max(bounds.ascent);
            self.descent = self.descent.max(bounds.descent);
            self.glyphs.push(glyph);
            self.advances.push(bounds.advance);
        }
        self.text.push_str(text);
    }

    fn cover(&mut self, range: &Range<usize>) {
        self.range = Some(match self.range.take() {
            Some(current) => current.start.min(range.start)..current.end.max(range.end),
            None => range.clone(),
        });
    }

    /// Widen the last glyph; false when there is none
    fn add_kern(&mut self, space: f32) -> bool {
        match self.advances.last_mut() {
            Some(advance) => {
                *advance += space;
                true
            }
            None => false,
        }
    }

    fn into_display(self, font_size: f32) -> Display {
        let width = self.advances.iter().sum();
        let range = self.range.unwrap_or(0..0);
        Display::new(
            DisplayKind::TextLine {
                text: self.text,
                glyphs: self.glyphs,
                advances: self.advances,
                font_size,
                placeholder: self.placeholder,
            },
            self.ascent,
            self.descent,
            width,
        )
        .with_range(range)
    }
}

// =============================================================================
// Typesetter
// =============================================================================

/// Lays out one math list at one style
struct Typesetter<'a> {
    /// Font the list was requested at; sub-lists scale from it
    font: &'a MathFont,
    /// `font` scaled for the current style
    style_font: MathFont,
    style: LineStyle,
    cramped: bool,
    /// Spacing as if the list sat between an open and a close atom
    spaced: bool,
    displays: Vec<Display>,
    position: Point,
    line: PendingLine,
}

impl<'a> Typesetter<'a> {
    fn new(font: &'a MathFont, style: LineStyle, cramped: bool, spaced: bool) -> Self {
        Self {
            font,
            style_font: font.with_size(style_size(style, font)),
            style,
            cramped,
            spaced,
            displays: Vec::new(),
            position: Point::origin(),
            line: PendingLine::default(),
        }
    }

    fn create_line(
        list: &MathList,
        font: &MathFont,
        style: LineStyle,
        cramped: bool,
        spaced: bool,
    ) -> Result<Display, TypesetError> {
        let atoms = preprocess(list);
        let mut typesetter = Typesetter::new(font, style, cramped, spaced);
        typesetter.layout_atoms(atoms)?;
        let end = list.last().map_or(0, |atom| atom.index_range.end);
        let line_display = Display::list(typesetter.displays, 0..end);
        trace!(
            target: "texmath::typesetter",
            atoms = list.len(),
            width = line_display.width,
            ascent = line_display.ascent,
            descent = line_display.descent,
            "laid out math list"
        );
        Ok(line_display)
    }

    fn set_style(&mut self, style: LineStyle) {
        self.style = style;
        self.style_font = self.font.with_size(style_size(style, self.font));
    }

    fn script_style(&self) -> LineStyle {
        match self.style {
            LineStyle::Display | LineStyle::Text => LineStyle::Script,
            LineStyle::Script | LineStyle::ScriptScript => LineStyle::ScriptScript,
        }
    }

    fn fraction_style(&self) -> LineStyle {
        match self.style {
            LineStyle::Display => LineStyle::Text,
            LineStyle::Text => LineStyle::Script,
            LineStyle::Script | LineStyle::ScriptScript => LineStyle::ScriptScript,
        }
    }

    fn is_display(&self) -> bool {
        self.style == LineStyle::Display
    }

    fn inter_element_space(&self, left: AtomType, right: AtomType) -> Result<f32, TypesetError> {
        let invalid = TypesetError::InvalidSpacing { left, right };
        let row = spacing_index(left, true).ok_or_else(|| invalid.clone())?;
        let column = spacing_index(right, false).ok_or_else(|| invalid.clone())?;
        let script = self.style >= LineStyle::Script;
        let multiplier = match SPACING[row][column] {
            InterSpace::Zero => 0.0,
            InterSpace::Thin => 3.0,
            InterSpace::NsThin if !script => 3.0,
            InterSpace::NsMedium if !script => 4.0,
            InterSpace::NsThick if !script => 5.0,
            InterSpace::NsThin | InterSpace::NsMedium | InterSpace::NsThick => 0.0,
            InterSpace::Invalid => return Err(invalid),
        };
        Ok(multiplier * self.style_font.mu_unit())
    }

    /// Space before a non-text atom; the first atom of a spaced list
    /// is spaced as if it followed an open atom
    fn add_inter_element_space(&mut self, prev: Option<AtomType>, current: AtomType) -> Result<(), TypesetError> {
        let space = match prev {
            Some(prev) => self.inter_element_space(prev, current)?,
            None if self.spaced => self.inter_element_space(AtomType::Open, current)?,
            None => 0.0,
        };
        self.position.x += space;
        Ok(())
    }

    /// Turn the pending characters into a text line display
    ///
    /// With `force`, an empty line is emitted too so scripts have a nucleus.
    fn flush_line(&mut self, force: bool) {
        if self.line.is_empty() && !force {
            return;
        }
        let line = std::mem::take(&mut self.line);
        let display = line
            .into_display(self.style_font.size())
            .with_position(self.position);
        self.position.x += display.width;
        self.displays.push(display);
    }

    /// Place a display at the cursor, followed by the atom's scripts
    fn add_display(&mut self, mut display: Display, atom: &Atom) -> Result<(), TypesetError> {
        display.position = self.position;
        display.has_script = atom.has_scripts();
        self.position.x += display.width;
        let nucleus = (display.ascent, display.descent);
        self.displays.push(display);
        if atom.has_scripts() {
            self.make_scripts(atom, Some(nucleus), atom.index_range.start, 0.0)?;
        }
        Ok(())
    }

    fn layout_atoms(&mut self, atoms: Vec<Atom>) -> Result<(), TypesetError> {
        let mut prev_type: Option<AtomType> = None;

        for atom in atoms {
            let atom_type = atom.atom_type();
            let spacing_type = match (&atom.kind, atom_type) {
                (AtomKind::Space { space }, _) => {
                    self.flush_line(false);
                    self.position.x += space * self.style_font.mu_unit();
                    continue;
                }
                (AtomKind::Style { style }, _) => {
                    self.flush_line(false);
                    self.set_style(*style);
                    continue;
                }
                (AtomKind::Color { color, inner_list }, _) => {
                    self.flush_line(false);
                    self.add_inter_element_space(prev_type, atom_type)?;
                    let mut display = Self::create_line(inner_list, self.font, self.style, self.cramped, false)?;
                    display.text_color = parse_color(color);
                    self.add_display(display.with_range(atom.index_range.clone()), &atom)?;
                    atom_type
                }
                (AtomKind::Colorbox { color, inner_list }, _) => {
                    self.flush_line(false);
                    self.add_inter_element_space(prev_type, atom_type)?;
                    let mut display = Self::create_line(inner_list, self.font, self.style, self.cramped, false)?;
                    display.background_color = parse_color(color);
                    self.add_display(display.with_range(atom.index_range.clone()), &atom)?;
                    atom_type
                }
                (AtomKind::Radical(radical), _) => {
                    self.flush_line(false);
                    // an ordinary on the right, per rule 16
                    self.add_inter_element_space(prev_type, AtomType::Ordinary)?;
                    let display = self.make_radical(&radical.radicand, radical.degree.as_ref())?;
                    self.add_display(display.with_range(atom.index_range.clone()), &atom)?;
                    AtomType::Radical
                }
                (AtomKind::Fraction(fraction), _) => {
                    self.flush_line(false);
                    self.add_inter_element_space(prev_type, AtomType::Fraction)?;
                    let display = self.make_fraction(fraction, atom.index_range.clone())?;
                    self.add_display(display, &atom)?;
                    AtomType::Fraction
                }
                (AtomKind::LargeOperator { limits }, _) => {
                    self.flush_line(false);
                    self.add_inter_element_space(prev_type, AtomType::LargeOperator)?;
                    self.make_large_op(&atom, *limits)?;
                    AtomType::LargeOperator
                }
                (AtomKind::Inner(inner), _) => {
                    self.flush_line(false);
                    self.add_inter_element_space(prev_type, AtomType::Inner)?;
                    let display = if inner.left_boundary.is_some() || inner.right_boundary.is_some() {
                        self.make_left_right(inner)?
                    } else {
                        Self::create_line(&inner.inner_list, self.font, self.style, self.cramped, false)?
                    };
                    self.add_display(display.with_range(atom.index_range.clone()), &atom)?;
                    AtomType::Inner
                }
                (AtomKind::Overline { inner_list }, _) => {
                    self.flush_line(false);
                    self.add_inter_element_space(prev_type, AtomType::Ordinary)?;
                    let display = self.make_overline(inner_list)?;
                    self.add_display(display.with_range(atom.index_range.clone()), &atom)?;
                    AtomType::Ordinary
                }
                (AtomKind::Underline { inner_list }, _) => {
                    self.flush_line(false);
                    self.add_inter_element_space(prev_type, AtomType::Ordinary)?;
                    let display = self.make_underline(inner_list)?;
                    self.add_display(display.with_range(atom.index_range.clone()), &atom)?;
                    AtomType::Ordinary
                }
                (AtomKind::Accent { inner_list }, _) => {
                    self.flush_line(false);
                    self.add_inter_element_space(prev_type, AtomType::Ordinary)?;
                    let (display, scripts_moved) = self.make_accent(&atom, inner_list)?;
                    let display = display.with_range(atom.index_range.clone());
                    if scripts_moved {
                        let mut unscripted = atom.clone();
                        unscripted.take_scripts();
                        self.add_display(display, &unscripted)?;
                    } else {
                        self.add_display(display, &atom)?;
                    }
                    AtomType::Ordinary
                }
                (AtomKind::Table(table), _) => {
                    self.flush_line(false);
                    self.add_inter_element_space(prev_type, AtomType::Inner)?;
                    let display = self.make_table(table, atom.index_range.clone())?;
                    self.add_display(display, &atom)?;
                    AtomType::Inner
                }
                (
                    AtomKind::Plain,
                    AtomType::Ordinary
                    | AtomType::BinaryOperator
                    | AtomType::Relation
                    | AtomType::Open
                    | AtomType::Close
                    | AtomType::Placeholder
                    | AtomType::Punctuation,
                ) => {
                    self.add_text_atom(&atom, prev_type)?;
                    atom_type
                }
                (_, other) => return Err(TypesetError::UnexpectedAtom(other)),
            };
            prev_type = Some(spacing_type);
        }

        self.flush_line(false);
        if self.spaced {
            if let Some(last_type) = prev_type {
                let space = self.inter_element_space(last_type, AtomType::Close)?;
                if let Some(last) = self.displays.last_mut() {
                    last.width += space;
                }
            }
        }
        Ok(())
    }

    /// Characters join the pending line; spacing becomes kerning
    fn add_text_atom(&mut self, atom: &Atom, prev_type: Option<AtomType>) -> Result<(), TypesetError> {
        let atom_type = atom.atom_type();
        if let Some(prev) = prev_type {
            let space = self.inter_element_space(prev, atom_type)?;
            if !self.line.add_kern(space) {
                self.position.x += space;
            }
        }

        let placeholder = atom_type == AtomType::Placeholder;
        if self.line.placeholder != placeholder {
            self.flush_line(false);
        }
        self.line.placeholder = placeholder;
        self.line.push_text(&atom.nucleus, &self.style_font);
        self.line.cover(&atom.index_range);

        if atom.has_scripts() {
            self.flush_line(true);
            if let Some(line) = self.displays.last_mut() {
                line.has_script = true;
            }
            let delta = atom
                .nucleus
                .chars()
                .last()
                .map(|ch| {
                    let glyph = self.style_font.glyph_for_char(ch);
                    self.style_font.italic_correction(&glyph)
                })
                .unwrap_or(0.0);
            if delta > 0.0 && atom.subscript().is_none() {
                self.position.x += delta;
            }
            let index = atom.index_range.end.saturating_sub(1);
            self.make_scripts(atom, None, index, delta)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Scripts
    // -------------------------------------------------------------------------

    /// Attach the scripts of `atom` after the cursor
    ///
    /// `nucleus` is the ascent and descent of a boxed nucleus; text lines
    /// pass `None` and use the font shifts alone. `delta` is the italic
    /// correction that moves the superscript right.
    fn make_scripts(
        &mut self,
        atom: &Atom,
        nucleus: Option<(f32, f32)>,
        index: usize,
        delta: f32,
    ) -> Result<(), TypesetError> {
        let script_style = self.script_style();
        let mut superscript_shift_up = 0.0f32;
        let mut subscript_shift_down = 0.0f32;
        if let Some((ascent, descent)) = nucleus {
            let script_font = self.font.with_size(style_size(script_style, self.font));
            superscript_shift_up = ascent - script_font.constant(|c| c.superscript_baseline_drop_max);
            subscript_shift_down = descent + script_font.constant(|c| c.subscript_baseline_drop_min);
        }
        let font = self.style_font.clone();
        let space_after_script = font.constant(|c| c.space_after_script);

        let Some(superscript_list) = atom.superscript() else {
            let Some(subscript_list) = atom.subscript() else {
                return Ok(());
            };
            let mut subscript = Self::create_line(subscript_list, self.font, script_style, true, false)?;
            subscript.set_line_position(LinePosition::Subscript, Some(index));
            subscript_shift_down = subscript_shift_down
                .max(font.constant(|c| c.subscript_shift_down))
                .max(subscript.ascent - font.constant(|c| c.subscript_top_max));
            subscript.position = self.position.offset(0.0, -subscript_shift_down);
            self.position.x += subscript.width + space_after_script;
            self.displays.push(subscript);
            return Ok(());
        };

        let mut superscript =
            Self::create_line(superscript_list, self.font, script_style, self.cramped, false)?;
        superscript.set_line_position(LinePosition::Superscript, Some(index));
        let shift_up = if self.cramped {
            font.constant(|c| c.superscript_shift_up_cramped)
        } else {
            font.constant(|c| c.superscript_shift_up)
        };
        superscript_shift_up = superscript_shift_up
            .max(shift_up)
            .max(superscript.descent + font.constant(|c| c.superscript_bottom_min));

        let Some(subscript_list) = atom.subscript() else {
            superscript.position = self.position.offset(0.0, superscript_shift_up);
            self.position.x += superscript.width + space_after_script;
            self.displays.push(superscript);
            return Ok(());
        };

        let mut subscript = Self::create_line(subscript_list, self.font, script_style, true, false)?;
        subscript.set_line_position(LinePosition::Subscript, Some(index));
        subscript_shift_down = subscript_shift_down.max(font.constant(|c| c.subscript_shift_down));

        let gap = (superscript_shift_up - superscript.descent) + (subscript_shift_down - subscript.ascent);
        let gap_min = font.constant(|c| c.sub_superscript_gap_min);
        if gap < gap_min {
            subscript_shift_down += gap_min - gap;
            let bottom_delta = font.constant(|c| c.superscript_bottom_max_with_subscript)
                - (superscript_shift_up - superscript.descent);
            if bottom_delta > 0.0 {
                superscript_shift_up += bottom_delta;
                subscript_shift_down -= bottom_delta;
            }
        }

        superscript.position = self.position.offset(delta, superscript_shift_up);
        subscript.position = self.position.offset(0.0, -subscript_shift_down);
        self.position.x += (superscript.width + delta).max(subscript.width) + space_after_script;
        self.displays.push(superscript);
        self.displays.push(subscript);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Fractions
    // -------------------------------------------------------------------------

    fn make_fraction(&self, fraction: &Fraction, range: Range<usize>) -> Result<Display, TypesetError> {
        let style = self.fraction_style();
        let numerator = Self::create_line(&fraction.numerator, self.font, style, false, false)?;
        let denominator = Self::create_line(&fraction.denominator, self.font, style, true, false)?;
        let font = &self.style_font;
        let display = self.is_display();

        let (mut numerator_up, mut denominator_down) = match (fraction.has_rule, display) {
            (true, true) => (
                font.constant(|c| c.fraction_numerator_display_style_shift_up),
                font.constant(|c| c.fraction_denominator_display_style_shift_down),
            ),
            (true, false) => (
                font.constant(|c| c.fraction_numerator_shift_up),
                font.constant(|c| c.fraction_denominator_shift_down),
            ),
            (false, true) => (
                font.constant(|c| c.stack_top_display_style_shift_up),
                font.constant(|c| c.stack_bottom_display_style_shift_down),
            ),
            (false, false) => (
                font.constant(|c| c.stack_top_shift_up),
                font.constant(|c| c.stack_bottom_shift_down),
            ),
        };
        let bar_location = font.constant(|c| c.axis_height);
        let bar_thickness = if fraction.has_rule {
            font.constant(|c| c.fraction_rule_thickness)
        } else {
            0.0
        };

        if fraction.has_rule {
            let numerator_gap = (numerator_up - numerator.descent) - (bar_location + bar_thickness / 2.0);
            let numerator_gap_min = if display {
                font.constant(|c| c.fraction_num_display_style_gap_min)
            } else {
                font.constant(|c| c.fraction_numerator_gap_min)
            };
            if numerator_gap < numerator_gap_min {
                numerator_up += numerator_gap_min - numerator_gap;
            }

            let denominator_gap = (bar_location - bar_thickness / 2.0) - (denominator.ascent - denominator_down);
            let denominator_gap_min = if display {
                font.constant(|c| c.fraction_denom_display_style_gap_min)
            } else {
                font.constant(|c| c.fraction_denominator_gap_min)
            };
            if denominator_gap < denominator_gap_min {
                denominator_down += denominator_gap_min - denominator_gap;
            }
        } else {
            let clearance = (numerator_up - numerator.descent) - (denominator.ascent - denominator_down);
            let gap_min = if display {
                font.constant(|c| c.stack_display_style_gap_min)
            } else {
                font.constant(|c| c.stack_gap_min)
            };
            if clearance < gap_min {
                numerator_up += (gap_min - clearance) / 2.0;
                denominator_down += (gap_min - clearance) / 2.0;
            }
        }

        let width = numerator.width.max(denominator.width);
        let ascent = numerator.ascent + numerator_up;
        let descent = denominator.descent + denominator_down;
        let numerator_x = (width - numerator.width) / 2.0;
        let numerator = numerator.with_position(Point::new(numerator_x, numerator_up));
        let denominator_x = (width - denominator.width) / 2.0;
        let denominator = denominator.with_position(Point::new(denominator_x, -denominator_down));
        let rule = fraction.has_rule.then(|| Rule {
            origin: Point::new(0.0, bar_location),
            length: width,
            thickness: bar_thickness,
        });
        let display = Display::new(
            DisplayKind::Fraction {
                numerator: Box::new(numerator),
                denominator: Box::new(denominator),
                rule,
            },
            ascent,
            descent,
            width,
        )
        .with_range(range.clone());

        if fraction.left_delimiter.is_none() && fraction.right_delimiter.is_none() {
            return Ok(display);
        }
        let em = if self.is_display() {
            FRACTION_DELIMITER_DISPLAY_STYLE_SIZE
        } else {
            FRACTION_DELIMITER_SIZE
        };
        let height = em * self.style_font.size();
        let left = self.delimiter_for_name(fraction.left_delimiter.as_deref(), height);
        let right = self.delimiter_for_name(fraction.right_delimiter.as_deref(), height);
        Ok(delimited(left, display, right, range))
    }

    fn delimiter_for_name(&self, name: Option<&str>, height: f32) -> Option<Display> {
        let boundary = factory::boundary_atom_for_delimiter_name(name?)?;
        self.find_glyph_for_boundary(&boundary.nucleus, height)
    }

    // -------------------------------------------------------------------------
    // Delimiters and Glyph Assembly
    // -------------------------------------------------------------------------

    /// A delimiter glyph at least `height` tall, centered on the axis
    ///
    /// `None` for the empty (`.`) delimiter.
    fn find_glyph_for_boundary(&self, delimiter: &str, height: f32) -> Option<Display> {
        let ch = delimiter.chars().next()?;
        let glyph = self.style_font.glyph_for_char(ch);
        let mut display = self.stretched_glyph(&glyph, height);
        let shift_down = 0.5 * (display.ascent - display.descent) - self.style_font.constant(|c| c.axis_height);
        shift_glyph(&mut display, shift_down);
        Some(display)
    }

    /// The smallest variant of `glyph` reaching `height`, or an assembly
    fn stretched_glyph(&self, glyph: &str, height: f32) -> Display {
        let (variant, bounds) = self.find_vertical_variant(glyph, height);
        if bounds.height() < height {
            if let Some(construction) = self.construct_glyph(glyph, height) {
                return construction;
            }
        }
        Display::new(
            DisplayKind::Glyph {
                glyph: variant,
                font_size: self.style_font.size(),
                shift_down: 0.0,
            },
            bounds.ascent,
            bounds.descent,
            bounds.advance,
        )
    }

    fn find_vertical_variant(&self, glyph: &str, height: f32) -> (String, GlyphBounds) {
        let mut last = (glyph.to_string(), self.style_font.glyph_bounds(glyph));
        for variant in self.style_font.vertical_variants(glyph) {
            let bounds = self.style_font.glyph_bounds(&variant);
            if bounds.height() >= height {
                return (variant, bounds);
            }
            last = (variant, bounds);
        }
        last
    }

    /// The widest horizontal variant no wider than `max_width`, else the first
    fn find_horizontal_variant(&self, glyph: &str, max_width: f32) -> (String, GlyphBounds) {
        let mut chosen: Option<(String, GlyphBounds)> = None;
        for variant in self.style_font.horizontal_variants(glyph) {
            let bounds = self.style_font.glyph_bounds(&variant);
            if bounds.advance > max_width {
                return chosen.unwrap_or((variant, bounds));
            }
            chosen = Some((variant, bounds));
        }
        chosen.unwrap_or_else(|| (glyph.to_string(), self.style_font.glyph_bounds(glyph)))
    }

    fn construct_glyph(&self, glyph: &str, height: f32) -> Option<Display> {
        let parts = self.style_font.vertical_assembly(glyph);
        if parts.is_empty() {
            return None;
        }
        let (glyphs, offsets, total) = self.assemble(&parts, height)?;
        debug!(glyph, height, pieces = glyphs.len(), "assembling delimiter from parts");
        let width = self.style_font.glyph_bounds(glyphs.first()?).advance;
        Some(Display::new(
            DisplayKind::GlyphConstruction {
                glyphs,
                offsets,
                font_size: self.style_font.size(),
                shift_down: 0.0,
            },
            total,
            0.0,
            width,
        ))
    }

    /// Stack parts bottom to top, repeating extenders until `target` fits
    ///
    /// Connector overlaps shrink evenly to reach the exact height once the
    /// extender count allows it. Returns the glyphs, their offsets from the
    /// baseline and the total height.
    fn assemble(&self, parts: &[GlyphPart], target: f32) -> Option<(Vec<String>, Vec<f32>, f32)> {
        let min_overlap = self.style_font.constant(|c| c.min_connector_overlap);
        let has_extender = parts.iter().any(|part| part.extender);

        for extenders in 0..=MAX_ASSEMBLY_EXTENDERS {
            let mut glyphs = Vec::new();
            let mut offsets = Vec::new();
            let mut prev: Option<&GlyphPart> = None;
            let mut min_offset = 0.0f32;
            let mut max_delta = f32::MAX;

            for part in parts {
                let repeats = if part.extender { extenders } else { 1 };
                for _ in 0..repeats {
                    glyphs.push(part.glyph.clone());
                    if let Some(prev) = prev {
                        let max_overlap = prev.end_connector.min(part.start_connector);
                        let min_offset_delta = prev.advance - max_overlap;
                        let max_offset_delta = prev.advance - min_overlap;
                        max_delta = max_delta.min(max_offset_delta - min_offset_delta);
                        min_offset += min_offset_delta;
                    }
                    offsets.push(min_offset);
                    prev = Some(part);
                }
            }

            let Some(last) = prev else {
                continue;
            };
            let min_height = min_offset + last.advance;
            let max_height = min_height + max_delta * (glyphs.len() - 1) as f32;
            if min_height >= target {
                return Some((glyphs, offsets, min_height));
            }
            if target <= max_height {
                let increase = (target - min_height) / (glyphs.len() - 1) as f32;
                for (i, offset) in offsets.iter_mut().enumerate() {
                    *offset += i as f32 * increase;
                }
                let last_offset = offsets.last().copied().unwrap_or(0.0);
                return Some((glyphs, offsets, last_offset + last.advance));
            }
            if !has_extender {
                return Some((glyphs, offsets, min_height));
            }
        }
        None
    }

    fn make_left_right(&self, inner: &Inner) -> Result<Display, TypesetError> {
        let mut list = Self::create_line(&inner.inner_list, self.font, self.style, self.cramped, true)?;
        list.set_line_position(LinePosition::Inner, None);
        let axis = self.style_font.constant(|c| c.axis_height);
        let delta = (list.ascent - axis).max(list.descent + axis);
        let covering = delta / 500.0 * DELIMITER_FACTOR;
        let shortfall = 2.0 * delta - DELIMITER_SHORTFALL_POINTS;
        let height = covering.max(shortfall);

        let left = inner
            .left_boundary
            .as_ref()
            .and_then(|boundary| self.find_glyph_for_boundary(&boundary.nucleus, height));
        let right = inner
            .right_boundary
            .as_ref()
            .and_then(|boundary| self.find_glyph_for_boundary(&boundary.nucleus, height));
        let range = list.range.clone();
        Ok(delimited(left, list, right, range))
    }

    // -------------------------------------------------------------------------
    // Radicals
    // -------------------------------------------------------------------------

    fn make_radical(&self, radicand: &MathList, degree: Option<&MathList>) -> Result<Display, TypesetError> {
        let inner = Self::create_line(radicand, self.font, self.style, true, false)?;
        let font = &self.style_font;
        let mut clearance = if self.is_display() {
            font.constant(|c| c.radical_display_style_vertical_gap)
        } else {
            font.constant(|c| c.radical_vertical_gap)
        };
        let thickness = font.constant(|c| c.radical_rule_thickness);
        let extra_ascender = font.constant(|c| c.radical_extra_ascender);
        let radical_height = inner.ascent + inner.descent + clearance + thickness;

        let glyph = font.glyph_for_char(RADICAL_SIGN);
        let mut sign = self.stretched_glyph(&glyph, radical_height);
        let delta = (sign.ascent + sign.descent) - radical_height;
        if delta > 0.0 {
            clearance += delta / 2.0;
        }
        // the top of the sign meets the rule above the radicand
        let radical_ascent = thickness + clearance + inner.ascent;
        let shift_up = radical_ascent - sign.ascent;
        shift_glyph(&mut sign, -shift_up);

        let mut ascent = radical_ascent + extra_ascender;
        let descent = (sign.ascent + sign.descent - radical_ascent).max(inner.descent);

        let mut radical_shift = 0.0f32;
        let degree = match degree {
            Some(degree) => {
                let degree = Self::create_line(degree, self.font, LineStyle::ScriptScript, false, false)?;
                let mut kern_before = font.constant(|c| c.radical_kern_before_degree);
                let kern_after = font.constant(|c| c.radical_kern_after_degree);
                let raise = font.radical_degree_bottom_raise() * (ascent - descent);
                radical_shift = kern_before + degree.width + kern_after;
                if radical_shift < 0.0 {
                    kern_before -= radical_shift;
                    radical_shift = 0.0;
                }
                ascent = ascent.max(raise + degree.ascent);
                Some(Box::new(degree.with_position(Point::new(kern_before, raise))))
            }
            None => None,
        };

        let sign = sign.with_position(Point::new(radical_shift, 0.0));
        let radicand_x = radical_shift + sign.width;
        let width = radicand_x + inner.width;
        let rule = Rule {
            origin: Point::new(radicand_x, radical_ascent - thickness / 2.0),
            length: inner.width,
            thickness,
        };
        let inner = inner.with_position(Point::new(radicand_x, 0.0));
        Ok(Display::new(
            DisplayKind::Radical {
                sign: Box::new(sign),
                radicand: Box::new(inner),
                degree,
                rule,
            },
            ascent,
            descent,
            width,
        ))
    }

    // -------------------------------------------------------------------------
    // Large Operators
    // -------------------------------------------------------------------------

    fn make_large_op(&mut self, atom: &Atom, limits: bool) -> Result<(), TypesetError> {
        let limits = limits && self.is_display();
        let font = self.style_font.clone();
        let mut chars = atom.nucleus.chars();
        let (nucleus, delta) = match (chars.next(), chars.next()) {
            (Some(ch), None) => {
                let mut glyph = font.glyph_for_char(ch);
                if self.is_display() {
                    glyph = font.larger_glyph(&glyph);
                }
                let delta = font.italic_correction(&glyph);
                let bounds = font.glyph_bounds(&glyph);
                let shift_down = 0.5 * (bounds.ascent - bounds.descent) - font.constant(|c| c.axis_height);
                let mut width = bounds.advance;
                if atom.subscript().is_some() && !limits {
                    width -= delta;
                }
                let display = Display::new(
                    DisplayKind::Glyph {
                        glyph,
                        font_size: font.size(),
                        shift_down,
                    },
                    bounds.ascent - shift_down,
                    bounds.descent + shift_down,
                    width,
                );
                (display, delta)
            }
            _ => {
                let mut line = PendingLine::default();
                line.push_text(&atom.nucleus, &font);
                (line.into_display(font.size()), 0.0)
            }
        };
        let nucleus = nucleus.with_range(atom.index_range.clone());

        if !atom.has_scripts() || !limits {
            return self.add_display_with_delta(nucleus, atom, delta);
        }

        let script_style = self.script_style();
        let upper = atom
            .superscript()
            .map(|list| Self::create_line(list, self.font, script_style, self.cramped, false))
            .transpose()?;
        let lower = atom
            .subscript()
            .map(|list| Self::create_line(list, self.font, script_style, true, false))
            .transpose()?;
        let limit_shift = delta / 2.0;
        let width = [Some(&nucleus), upper.as_ref(), lower.as_ref()]
            .into_iter()
            .flatten()
            .map(|display| display.width)
            .fold(0.0f32, f32::max);

        let mut ascent = nucleus.ascent;
        let mut descent = nucleus.descent;
        let upper = match upper {
            Some(upper) => {
                let gap = font
                    .constant(|c| c.upper_limit_gap_min)
                    .max(font.constant(|c| c.upper_limit_baseline_rise_min) - upper.descent);
                let y = nucleus.ascent + gap + upper.descent;
                ascent = y + upper.ascent;
                let x = limit_shift + (width - upper.width) / 2.0;
                Some(Box::new(upper.with_position(Point::new(x, y))))
            }
            None => None,
        };
        let lower = match lower {
            Some(lower) => {
                let gap = font
                    .constant(|c| c.lower_limit_gap_min)
                    .max(font.constant(|c| c.lower_limit_baseline_drop_min) - lower.ascent);
                let y = -(nucleus.descent + gap + lower.ascent);
                descent = lower.descent - y;
                let x = -limit_shift + (width - lower.width) / 2.0;
                Some(Box::new(lower.with_position(Point::new(x, y))))
            }
            None => None,
        };
        let nucleus_x = (width - nucleus.width) / 2.0;
        let mut display = Display::new(
            DisplayKind::LargeOpLimits {
                nucleus: Box::new(nucleus.with_position(Point::new(nucleus_x, 0.0))),
                upper,
                lower,
            },
            ascent,
            descent,
            width,
        )
        .with_range(atom.index_range.clone())
        .with_position(self.position);
        display.has_script = true;
        self.position.x += width;
        self.displays.push(display);
        Ok(())
    }

    /// Like [`Self::add_display`], with the italic correction of an operator
    fn add_display_with_delta(&mut self, mut display: Display, atom: &Atom, delta: f32) -> Result<(), TypesetError> {
        display.position = self.position;
        display.has_script = atom.has_scripts();
        self.position.x += display.width;
        let nucleus = (display.ascent, display.descent);
        self.displays.push(display);
        if atom.has_scripts() {
            self.make_scripts(atom, Some(nucleus), atom.index_range.start, delta)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Over/Underlines and Accents
    // -------------------------------------------------------------------------

    fn make_overline(&self, inner_list: &MathList) -> Result<Display, TypesetError> {
        let inner = Self::create_line(inner_list, self.font, self.style, true, false)?;
        let font = &self.style_font;
        let gap = font.constant(|c| c.overbar_vertical_gap);
        let thickness = font.constant(|c| c.overbar_rule_thickness);
        let ascent = inner.ascent + gap + thickness + font.constant(|c| c.overbar_extra_ascender);
        let rule = Rule {
            origin: Point::new(0.0, inner.ascent + gap),
            length: inner.width,
            thickness,
        };
        let (descent, width) = (inner.descent, inner.width);
        Ok(Display::new(
            DisplayKind::Line {
                inner: Box::new(inner),
                rule,
            },
            ascent,
            descent,
            width,
        ))
    }

    fn make_underline(&self, inner_list: &MathList) -> Result<Display, TypesetError> {
        let inner = Self::create_line(inner_list, self.font, self.style, self.cramped, false)?;
        let font = &self.style_font;
        let gap = font.constant(|c| c.underbar_vertical_gap);
        let thickness = font.constant(|c| c.underbar_rule_thickness);
        let descent = inner.descent + gap + thickness + font.constant(|c| c.underbar_extra_descender);
        let rule = Rule {
            origin: Point::new(0.0, -(inner.descent + gap)),
            length: inner.width,
            thickness,
        };
        let (ascent, width) = (inner.ascent, inner.width);
        Ok(Display::new(
            DisplayKind::Line {
                inner: Box::new(inner),
                rule,
            },
            ascent,
            descent,
            width,
        ))
    }

    /// The accent display, and whether the atom's scripts moved onto a
    /// single-character accentee
    fn make_accent(&self, atom: &Atom, inner_list: &MathList) -> Result<(Display, bool), TypesetError> {
        let mut accentee = Self::create_line(inner_list, self.font, self.style, true, false)?;
        let Some(ch) = atom.nucleus.chars().next() else {
            return Ok((accentee, false));
        };
        let font = &self.style_font;
        let glyph = font.glyph_for_char(ch);
        let (glyph, bounds) = self.find_horizontal_variant(&glyph, accentee.width);
        let delta = accentee.ascent.min(font.constant(|c| c.accent_base_height));
        let skew = self.accent_skew(inner_list, accentee.width, &glyph);
        let height = accentee.ascent - delta;

        let accent = Display::new(
            DisplayKind::Glyph {
                glyph,
                font_size: font.size(),
                shift_down: 0.0,
            },
            bounds.ascent,
            bounds.descent,
            bounds.advance,
        )
        .with_position(Point::new(skew, height))
        .with_range(atom.index_range.clone());

        let mut scripts_moved = false;
        if single_char_accentee(inner_list) && atom.has_scripts() {
            let mut scripted = inner_list.clone();
            if let Some(base) = scripted.atom_mut(0) {
                scripts_moved = base.set_superscript(atom.superscript().cloned()).is_ok()
                    && base.set_subscript(atom.subscript().cloned()).is_ok();
            }
            if scripts_moved {
                accentee = Self::create_line(&scripted, self.font, self.style, self.cramped, false)?;
            }
        }

        let width = accentee.width;
        let descent = accentee.descent;
        let ascent = accentee.ascent.max(accentee.ascent - delta + bounds.ascent);
        let display = Display::new(
            DisplayKind::Accent {
                accent: Box::new(accent),
                accentee: Box::new(accentee),
            },
            ascent,
            descent,
            width,
        );
        Ok((display, scripts_moved))
    }

    /// Horizontal offset aligning the accent's attachment point with the
    /// accentee's
    fn accent_skew(&self, inner_list: &MathList, accentee_width: f32, accent_glyph: &str) -> f32 {
        let font = &self.style_font;
        let accent_adjustment = font.top_accent_adjustment(accent_glyph);
        let accentee_adjustment = match inner_list.atoms().first() {
            Some(base) if single_char_accentee(inner_list) => {
                let nucleus = match base.atom_type() {
                    AtomType::Variable | AtomType::Number => styled_string(&base.nucleus, base.font_style),
                    _ => base.nucleus.clone(),
                };
                match nucleus.chars().last() {
                    Some(ch) => font.top_accent_adjustment(&font.glyph_for_char(ch)),
                    None => accentee_width / 2.0,
                }
            }
            _ => accentee_width / 2.0,
        };
        accentee_adjustment - accent_adjustment
    }

    // -------------------------------------------------------------------------
    // Tables
    // -------------------------------------------------------------------------

    fn make_table(&self, table: &Table, range: Range<usize>) -> Result<Display, TypesetError> {
        let columns = table.num_columns();
        if columns == 0 || table.num_rows() == 0 {
            return Ok(Display::list(Vec::new(), range));
        }

        let mut widths = vec![0.0f32; columns];
        let mut cells: Vec<Vec<Display>> = Vec::with_capacity(table.num_rows());
        for row in table.cells() {
            let mut displays = Vec::with_capacity(row.len());
            for (column, cell) in row.iter().enumerate() {
                let display = Self::create_line(cell, self.font, self.style, false, false)?;
                if let Some(width) = widths.get_mut(column) {
                    *width = width.max(display.width);
                }
                displays.push(display);
            }
            cells.push(displays);
        }

        let column_spacing = table.inter_column_spacing * self.style_font.mu_unit();
        let mut rows: Vec<Display> = cells
            .into_iter()
            .map(|row| make_row(row, table, &widths, column_spacing))
            .collect();
        self.position_rows(&mut rows, table);
        Ok(Display::list(rows, range))
    }

    /// Stack rows downwards, then center the block on the math axis
    fn position_rows(&self, rows: &mut [Display], table: &Table) {
        let size = self.style_font.size();
        let openup = table.inter_row_additional_spacing * JOT_MULTIPLIER * size;
        let baseline_skip = openup + BASELINE_SKIP_MULTIPLIER * size;
        let line_skip = openup + LINE_SKIP_MULTIPLIER * size;

        let mut current = 0.0f32;
        let mut prev_descent = 0.0f32;
        let mut ascent = 0.0f32;
        for (i, row) in rows.iter_mut().enumerate() {
            if i == 0 {
                row.position = Point::origin();
                ascent = row.ascent;
            } else {
                let mut skip = baseline_skip;
                if skip - (prev_descent + row.ascent) < LINE_SKIP_LIMIT_MULTIPLIER * size {
                    skip = prev_descent + row.ascent + line_skip;
                }
                current -= skip;
                row.position = Point::new(0.0, current);
            }
            prev_descent = row.descent;
        }

        let descent = prev_descent - current;
        let shift_down = 0.5 * (ascent - descent) - self.style_font.constant(|c| c.axis_height);
        for row in rows.iter_mut() {
            row.position.y -= shift_down;
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Lower a glyph display, keeping its extent in sync
fn shift_glyph(display: &mut Display, amount: f32) {
    if let DisplayKind::Glyph { shift_down, .. } | DisplayKind::GlyphConstruction { shift_down, .. } =
        &mut display.kind
    {
        *shift_down += amount;
        display.ascent -= amount;
        display.descent += amount;
    }
}

/// Lay out optional delimiters around `inner`, left to right on the baseline
fn delimited(left: Option<Display>, inner: Display, right: Option<Display>, range: Range<usize>) -> Display {
    let mut x = 0.0f32;
    let mut place = |display: Display| {
        let display = display.with_position(Point::new(x, 0.0));
        x += display.width;
        display
    };
    let left = left.map(&mut place);
    let inner = place(inner);
    let right = right.map(&mut place);

    let parts = [left.as_ref(), Some(&inner), right.as_ref()];
    let ascent = parts.iter().flatten().map(|d| d.ascent).fold(0.0f32, f32::max);
    let descent = parts.iter().flatten().map(|d| d.descent).fold(0.0f32, f32::max);
    Display::new(
        DisplayKind::Inner {
            left: left.map(Box::new),
            inner: Box::new(inner),
            right: right.map(Box::new),
        },
        ascent,
        descent,
        x,
    )
    .with_range(range)
}

fn make_row(cells: Vec<Display>, table: &Table, widths: &[f32], column_spacing: f32) -> Display {
    let mut column_start = 0.0f32;
    let mut range: Option<Range<usize>> = None;
    let mut placed = Vec::with_capacity(cells.len());
    for (column, cell) in cells.into_iter().enumerate() {
        let width = widths.get(column).copied().unwrap_or(cell.width);
        let x = match table.alignment(column) {
            ColumnAlignment::Left => column_start,
            ColumnAlignment::Center => column_start + (width - cell.width) / 2.0,
            ColumnAlignment::Right => column_start + width - cell.width,
        };
        range = Some(match range {
            Some(current) => current.start.min(cell.range.start)..current.end.max(cell.range.end),
            None => cell.range.clone(),
        });
        placed.push(cell.with_position(Point::new(x, 0.0)));
        column_start += width + column_spacing;
    }
    Display::list(placed, range.unwrap_or(0..0))
}

fn single_char_accentee(inner_list: &MathList) -> bool {
    match inner_list.atoms() {
        [atom] => atom.nucleus.chars().count() == 1 && !atom.has_scripts(),
        _ => false,
    }
}

fn parse_color(color: &str) -> Option<Color> {
    let parsed = Color::parse(color);
    if parsed.is_none() {
        warn!(color, "unparsable color, falling back to the inherited color");
    }
    parsed
}

// =============================================================================
// Tests
// =============================================================================
