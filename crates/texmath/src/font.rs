//! Math Fonts - Font metrics used by the typesetter
//!
//! The typesetter never talks to a font file. It asks a [`FontMetrics`]
//! provider for OpenType MATH constants, glyph bounds, size variants and
//! glyph assemblies, all in font units. [`MathTable`] is the stock provider:
//! it can be loaded from a JSON document or used as a built-in approximation
//! of a Latin Modern style math font. [`MathFont`] pairs a provider with a
//! point size and hands out scaled values.

use crate::error::FontError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

// =============================================================================
// Metrics Types
// =============================================================================

/// The OpenType MATH constants, in font units unless named `*Percent*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MathConstants {
    pub script_percent_scale_down: f32,
    pub script_script_percent_scale_down: f32,
    pub delimited_sub_formula_min_height: f32,
    pub display_operator_min_height: f32,
    pub math_leading: f32,
    pub axis_height: f32,
    pub accent_base_height: f32,
    pub flattened_accent_base_height: f32,
    pub subscript_shift_down: f32,
    pub subscript_top_max: f32,
    pub subscript_baseline_drop_min: f32,
    pub superscript_shift_up: f32,
    pub superscript_shift_up_cramped: f32,
    pub superscript_bottom_min: f32,
    pub superscript_baseline_drop_max: f32,
    pub sub_superscript_gap_min: f32,
    pub superscript_bottom_max_with_subscript: f32,
    pub space_after_script: f32,
    pub upper_limit_gap_min: f32,
    pub upper_limit_baseline_rise_min: f32,
    pub lower_limit_gap_min: f32,
    pub lower_limit_baseline_drop_min: f32,
    pub stack_top_shift_up: f32,
    pub stack_top_display_style_shift_up: f32,
    pub stack_bottom_shift_down: f32,
    pub stack_bottom_display_style_shift_down: f32,
    pub stack_gap_min: f32,
    pub stack_display_style_gap_min: f32,
    pub fraction_numerator_shift_up: f32,
    pub fraction_numerator_display_style_shift_up: f32,
    pub fraction_denominator_shift_down: f32,
    pub fraction_denominator_display_style_shift_down: f32,
    pub fraction_numerator_gap_min: f32,
    pub fraction_num_display_style_gap_min: f32,
    pub fraction_rule_thickness: f32,
    pub fraction_denominator_gap_min: f32,
    pub fraction_denom_display_style_gap_min: f32,
    pub overbar_vertical_gap: f32,
    pub overbar_rule_thickness: f32,
    pub overbar_extra_ascender: f32,
    pub underbar_vertical_gap: f32,
    pub underbar_rule_thickness: f32,
    pub underbar_extra_descender: f32,
    pub radical_vertical_gap: f32,
    pub radical_display_style_vertical_gap: f32,
    pub radical_rule_thickness: f32,
    pub radical_extra_ascender: f32,
    pub radical_kern_before_degree: f32,
    pub radical_kern_after_degree: f32,
    pub radical_degree_bottom_raise_percent: f32,
    pub min_connector_overlap: f32,
}

impl Default for MathConstants {
    /// Latin Modern Math values at 1000 units per em
    fn default() -> Self {
        Self {
            script_percent_scale_down: 70.0,
            script_script_percent_scale_down: 50.0,
            delimited_sub_formula_min_height: 1300.0,
            display_operator_min_height: 1300.0,
            math_leading: 154.0,
            axis_height: 250.0,
            accent_base_height: 450.0,
            flattened_accent_base_height: 664.0,
            subscript_shift_down: 247.0,
            subscript_top_max: 344.0,
            subscript_baseline_drop_min: 200.0,
            superscript_shift_up: 363.0,
            superscript_shift_up_cramped: 289.0,
            superscript_bottom_min: 108.0,
            superscript_baseline_drop_max: 250.0,
            sub_superscript_gap_min: 160.0,
            superscript_bottom_max_with_subscript: 344.0,
            space_after_script: 56.0,
            upper_limit_gap_min: 200.0,
            upper_limit_baseline_rise_min: 111.0,
            lower_limit_gap_min: 167.0,
            lower_limit_baseline_drop_min: 600.0,
            stack_top_shift_up: 444.0,
            stack_top_display_style_shift_up: 677.0,
            stack_bottom_shift_down: 345.0,
            stack_bottom_display_style_shift_down: 686.0,
            stack_gap_min: 120.0,
            stack_display_style_gap_min: 280.0,
            fraction_numerator_shift_up: 394.0,
            fraction_numerator_display_style_shift_up: 677.0,
            fraction_denominator_shift_down: 345.0,
            fraction_denominator_display_style_shift_down: 686.0,
            fraction_numerator_gap_min: 40.0,
            fraction_num_display_style_gap_min: 120.0,
            fraction_rule_thickness: 40.0,
            fraction_denominator_gap_min: 40.0,
            fraction_denom_display_style_gap_min: 120.0,
            overbar_vertical_gap: 120.0,
            overbar_rule_thickness: 40.0,
            overbar_extra_ascender: 40.0,
            underbar_vertical_gap: 120.0,
            underbar_rule_thickness: 40.0,
            underbar_extra_descender: 40.0,
            radical_vertical_gap: 50.0,
            radical_display_style_vertical_gap: 148.0,
            radical_rule_thickness: 40.0,
            radical_extra_ascender: 40.0,
            radical_kern_before_degree: 278.0,
            radical_kern_after_degree: -556.0,
            radical_degree_bottom_raise_percent: 60.0,
            min_connector_overlap: 20.0,
        }
    }
}

/// Advance width and vertical extent of a glyph
///
/// `ascent` and `descent` are both measured away from the baseline, so a
/// glyph sitting on the baseline has a descent of zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GlyphBounds {
    pub advance: f32,
    pub ascent: f32,
    pub descent: f32,
}

impl GlyphBounds {
    pub fn new(advance: f32, ascent: f32, descent: f32) -> Self {
        Self {
            advance,
            ascent,
            descent,
        }
    }

    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }

    fn scaled(self, factor: f32) -> Self {
        Self::new(self.advance * factor, self.ascent * factor, self.descent * factor)
    }
}

/// One piece of a vertical glyph assembly, bottom to top
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphPart {
    pub glyph: String,
    #[serde(default)]
    pub start_connector: f32,
    #[serde(default)]
    pub end_connector: f32,
    /// Full advance of the part along the assembly direction
    pub advance: f32,
    #[serde(default)]
    pub extender: bool,
}

impl GlyphPart {
    fn scaled(&self, factor: f32) -> Self {
        Self {
            glyph: self.glyph.clone(),
            start_connector: self.start_connector * factor,
            end_connector: self.end_connector * factor,
            advance: self.advance * factor,
            extender: self.extender,
        }
    }
}

/// A vertical glyph assembly
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlyphAssembly {
    pub parts: Vec<GlyphPart>,
}

// =============================================================================
// Metrics Provider
// =============================================================================

/// Source of math font metrics, in font units
///
/// Glyphs are identified by name. Variant lists start with the glyph itself
/// and grow in size.
pub trait FontMetrics: Send + Sync {
    fn units_per_em(&self) -> f32;

    fn constants(&self) -> &MathConstants;

    /// The glyph that renders `ch`
    fn glyph_name(&self, ch: char) -> String;

    fn glyph_bounds(&self, glyph: &str) -> GlyphBounds;

    fn italic_correction(&self, _glyph: &str) -> f32 {
        0.0
    }

    fn top_accent_attachment(&self, _glyph: &str) -> Option<f32> {
        None
    }

    fn vertical_variants(&self, glyph: &str) -> Vec<String> {
        vec![glyph.to_string()]
    }

    fn horizontal_variants(&self, glyph: &str) -> Vec<String> {
        vec![glyph.to_string()]
    }

    /// Parts of the vertical assembly for `glyph`, empty when it has none
    fn vertical_assembly(&self, _glyph: &str) -> Vec<GlyphPart> {
        Vec::new()
    }
}

// =============================================================================
// Math Table
// =============================================================================

/// A math font described as data
///
/// Every section is optional in the JSON form. Missing constants fall back
/// to the Latin Modern values of [`MathConstants::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathTable {
    #[serde(default = "default_units_per_em")]
    pub units_per_em: f32,
    #[serde(default)]
    pub constants: MathConstants,
    #[serde(default)]
    pub glyphs: HashMap<String, GlyphBounds>,
    /// Character to glyph name; unmapped characters use the character itself
    #[serde(default)]
    pub cmap: HashMap<String, String>,
    #[serde(default = "default_glyph")]
    pub default_glyph: GlyphBounds,
    #[serde(default)]
    pub v_variants: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub h_variants: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub italic: HashMap<String, f32>,
    #[serde(default)]
    pub accents: HashMap<String, f32>,
    #[serde(default)]
    pub v_assembly: HashMap<String, GlyphAssembly>,
    /// Estimate glyphs missing from `glyphs` from their character class and
    /// synthesize size variants for delimiters, radicals and large operators
    #[serde(default)]
    pub synthesize_missing: bool,
}

fn default_units_per_em() -> f32 {
    1000.0
}

fn default_glyph() -> GlyphBounds {
    GlyphBounds::new(500.0, 683.0, 0.0)
}

impl Default for MathTable {
    /// The built-in Latin Modern approximation
    fn default() -> Self {
        Self {
            units_per_em: default_units_per_em(),
            constants: MathConstants::default(),
            glyphs: HashMap::new(),
            cmap: HashMap::new(),
            default_glyph: default_glyph(),
            v_variants: HashMap::new(),
            h_variants: HashMap::new(),
            italic: HashMap::new(),
            accents: HashMap::new(),
            v_assembly: HashMap::new(),
            synthesize_missing: true,
        }
    }
}

impl MathTable {
    /// Load a math table from its JSON form
    pub fn from_json(json: &str) -> Result<Self, FontError> {
        let table: MathTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a math table from a reader producing JSON
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, FontError> {
        let table: MathTable = serde_json::from_reader(reader)?;
        table.validate()?;
        Ok(table)
    }

    pub fn to_json(&self) -> Result<String, FontError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), FontError> {
        if self.units_per_em.is_nan() || self.units_per_em <= 0.0 {
            return Err(FontError::Invalid(format!(
                "units_per_em must be positive, got {}",
                self.units_per_em
            )));
        }
        for (glyph, assembly) in &self.v_assembly {
            if assembly.parts.iter().any(|part| part.advance <= 0.0) {
                return Err(FontError::Invalid(format!(
                    "assembly for {glyph} has a part without advance"
                )));
            }
        }
        Ok(())
    }
}

impl FontMetrics for MathTable {
    fn units_per_em(&self) -> f32 {
        self.units_per_em
    }

    fn constants(&self) -> &MathConstants {
        &self.constants
    }

    fn glyph_name(&self, ch: char) -> String {
        let mut buf = [0u8; 4];
        let key: &str = ch.encode_utf8(&mut buf);
        self.cmap
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    fn glyph_bounds(&self, glyph: &str) -> GlyphBounds {
        if let Some(bounds) = self.glyphs.get(glyph) {
            return *bounds;
        }
        if self.synthesize_missing {
            return synthetic::bounds(glyph, self.constants.axis_height)
                .unwrap_or(self.default_glyph);
        }
        warn!(glyph, "glyph missing from math table, using default bounds");
        self.default_glyph
    }

    fn italic_correction(&self, glyph: &str) -> f32 {
        match self.italic.get(glyph) {
            Some(value) => *value,
            None if self.synthesize_missing => synthetic::italic_correction(glyph),
            None => 0.0,
        }
    }

    fn top_accent_attachment(&self, glyph: &str) -> Option<f32> {
        self.accents.get(glyph).copied()
    }

    fn vertical_variants(&self, glyph: &str) -> Vec<String> {
        match self.v_variants.get(glyph) {
            Some(variants) if !variants.is_empty() => variants.clone(),
            _ if self.synthesize_missing => synthetic::vertical_variants(glyph),
            _ => vec![glyph.to_string()],
        }
    }

    fn horizontal_variants(&self, glyph: &str) -> Vec<String> {
        match self.h_variants.get(glyph) {
            Some(variants) if !variants.is_empty() => variants.clone(),
            _ if self.synthesize_missing => synthetic::horizontal_variants(glyph),
            _ => vec![glyph.to_string()],
        }
    }

    fn vertical_assembly(&self, glyph: &str) -> Vec<GlyphPart> {
        match self.v_assembly.get(glyph) {
            Some(assembly) => assembly.parts.clone(),
            None if self.synthesize_missing => synthetic::vertical_assembly(glyph),
            None => Vec::new(),
        }
    }
}

/// Character-class estimates for the built-in table
///
/// Variant glyphs are named `<base>.v<n>` (vertical) and `<base>.h<n>`
/// (horizontal); assembly parts are `<base>.bt`, `<base>.ex` and `<base>.tp`.
mod synthetic {
    use super::{GlyphBounds, GlyphPart};

    const DELIMITERS: &str = "()[]{}|/\\\u{2016}\u{2308}\u{2309}\u{230A}\u{230B}\u{2329}\u{232A}\u{27E8}\u{27E9}\u{2191}\u{2193}\u{21D1}\u{21D3}";
    const SUMMATIONS: &str = "\u{2211}\u{220F}\u{2210}\u{22C0}\u{22C1}\u{22C2}\u{22C3}\u{2A00}\u{2A01}\u{2A02}\u{2A04}\u{2A06}";
    const INTEGRALS: &str = "\u{222B}\u{222C}\u{222D}\u{222E}\u{222F}\u{2230}";
    const RADICAL: char = '\u{221A}';
    const DELIMITER_GROWTH: [f32; 4] = [1.2, 1.8, 2.4, 3.0];
    const DISPLAY_OPERATOR_GROWTH: f32 = 1.4;
    const ACCENT_GROWTH: [f32; 3] = [1.5, 2.2, 3.0];

    enum Piece {
        Base,
        Vertical(usize),
        Horizontal(usize),
        Bottom,
        Extender,
        Top,
    }

    fn split(glyph: &str) -> Option<(char, Piece)> {
        let (base, piece) = match glyph.rsplit_once('.') {
            Some((base, suffix)) if !base.is_empty() => match suffix {
                "bt" => (base, Piece::Bottom),
                "ex" => (base, Piece::Extender),
                "tp" => (base, Piece::Top),
                _ => {
                    let vertical = suffix.strip_prefix('v').and_then(|n| n.parse::<usize>().ok());
                    let horizontal = suffix.strip_prefix('h').and_then(|n| n.parse::<usize>().ok());
                    match (vertical, horizontal) {
                        (Some(n), _) if n > 0 => (base, Piece::Vertical(n)),
                        (_, Some(n)) if n > 0 => (base, Piece::Horizontal(n)),
                        _ => (glyph, Piece::Base),
                    }
                }
            },
            _ => (glyph, Piece::Base),
        };
        let mut chars = base.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some((ch, piece)),
            _ => None,
        }
    }

    /// Undo math alphanumeric styling so letters can be classified
    fn plain_form(ch: char) -> char {
        let code = ch as u32;
        let plain = match code {
            0x1D400..=0x1D6A3 => {
                let offset = (code - 0x1D400) % 52;
                if offset < 26 {
                    'A' as u32 + offset
                } else {
                    'a' as u32 + offset - 26
                }
            }
            0x1D6A8..=0x1D7C9 => {
                let offset = (code - 0x1D6A8) % 58;
                if offset < 25 {
                    0x391 + offset
                } else if offset >= 26 && offset < 51 {
                    0x3B1 + offset - 26
                } else {
                    0x3B1
                }
            }
            0x1D7CE..=0x1D7FF => '0' as u32 + (code - 0x1D7CE) % 10,
            0x210E => 'h' as u32,
            _ => code,
        };
        char::from_u32(plain).unwrap_or(ch)
    }

    fn base_bounds(ch: char) -> Option<GlyphBounds> {
        let ch = plain_form(ch);
        let bounds = match ch {
            '0'..='9' => GlyphBounds::new(500.0, 666.0, 22.0),
            'A'..='Z' => GlyphBounds::new(750.0, 683.0, 0.0),
            'a'..='z' => {
                let advance = match ch {
                    'i' | 'j' | 'l' => 345.0,
                    'm' => 878.0,
                    'w' => 716.0,
                    _ => 529.0,
                };
                let ascent = if "bdfhklt".contains(ch) {
                    694.0
                } else if ch == 'i' || ch == 'j' {
                    669.0
                } else {
                    431.0
                };
                let descent = if "fgjpqy".contains(ch) { 194.0 } else { 0.0 };
                GlyphBounds::new(advance, ascent, descent)
            }
            '\u{391}'..='\u{3A9}' => GlyphBounds::new(750.0, 683.0, 0.0),
            '\u{3B1}'..='\u{3C9}' | '\u{3D1}' | '\u{3D5}' | '\u{3D6}' | '\u{3F5}' => {
                let ascent = if "βδζθλξϑ".contains(ch) { 694.0 } else { 431.0 };
                let descent = if "βγζημξρςφχψϕ".contains(ch) { 194.0 } else { 0.0 };
                GlyphBounds::new(570.0, ascent, descent)
            }
            ' ' => GlyphBounds::new(333.0, 0.0, 0.0),
            ',' | ';' => GlyphBounds::new(278.0, if ch == ',' { 106.0 } else { 431.0 }, 194.0),
            '.' => GlyphBounds::new(278.0, 106.0, 0.0),
            ':' | '!' | '?' | '\'' | '\u{2032}' => GlyphBounds::new(278.0, 694.0, 0.0),
            RADICAL => GlyphBounds::new(833.0, 40.0, 960.0),
            '\u{0300}'..='\u{036F}' => GlyphBounds::new(500.0, 694.0, 0.0),
            _ if SUMMATIONS.contains(ch) => GlyphBounds::new(1056.0, 750.0, 250.0),
            _ if INTEGRALS.contains(ch) => GlyphBounds::new(556.0, 805.0, 306.0),
            '|' | '\u{2016}' => GlyphBounds::new(278.0, 750.0, 250.0),
            _ if DELIMITERS.contains(ch) => GlyphBounds::new(389.0, 750.0, 250.0),
            '+' | '-' | '=' | '<' | '>' | '*' | '\u{00B1}' | '\u{00D7}' | '\u{00F7}'
            | '\u{00B7}' | '\u{2190}'..='\u{22FF}' | '\u{27F5}'..='\u{27FF}' => {
                GlyphBounds::new(778.0, 583.0, 83.0)
            }
            _ => return None,
        };
        Some(bounds)
    }

    fn centered(bounds: GlyphBounds, height: f32, axis: f32) -> GlyphBounds {
        GlyphBounds::new(bounds.advance, height / 2.0 + axis, height / 2.0 - axis)
    }

    pub(super) fn bounds(glyph: &str, axis: f32) -> Option<GlyphBounds> {
        let (ch, piece) = split(glyph)?;
        let base = base_bounds(ch)?;
        let bounds = match piece {
            Piece::Base => base,
            Piece::Vertical(n) if ch == RADICAL => {
                let growth = *DELIMITER_GROWTH.get(n - 1)?;
                GlyphBounds::new(base.advance, base.ascent, base.height() * growth - base.ascent)
            }
            Piece::Vertical(n) if SUMMATIONS.contains(ch) || INTEGRALS.contains(ch) => {
                if n != 1 {
                    return None;
                }
                base.scaled(DISPLAY_OPERATOR_GROWTH)
            }
            Piece::Vertical(n) => {
                let growth = *DELIMITER_GROWTH.get(n - 1)?;
                let widened = GlyphBounds {
                    advance: base.advance * (1.0 + (growth - 1.0) / 4.0),
                    ..base
                };
                centered(widened, base.height() * growth, axis)
            }
            Piece::Horizontal(n) => {
                let growth = *ACCENT_GROWTH.get(n - 1)?;
                GlyphBounds {
                    advance: base.advance * growth,
                    ..base
                }
            }
            Piece::Bottom | Piece::Top => GlyphBounds::new(base.advance, 600.0, 0.0),
            Piece::Extender => GlyphBounds::new(base.advance, 400.0, 0.0),
        };
        Some(bounds)
    }

    pub(super) fn italic_correction(glyph: &str) -> f32 {
        match split(glyph) {
            Some((ch, Piece::Base)) if INTEGRALS.contains(ch) => 306.0,
            Some((ch, Piece::Vertical(_))) if INTEGRALS.contains(ch) => 428.0,
            // math italic small f
            Some(('\u{1D453}', Piece::Base)) => 108.0,
            _ => 0.0,
        }
    }

    pub(super) fn vertical_variants(glyph: &str) -> Vec<String> {
        let mut variants = vec![glyph.to_string()];
        if let Some((ch, Piece::Base)) = split(glyph) {
            let count = if SUMMATIONS.contains(ch) || INTEGRALS.contains(ch) {
                1
            } else if ch == RADICAL || DELIMITERS.contains(ch) {
                DELIMITER_GROWTH.len()
            } else {
                0
            };
            variants.extend((1..=count).map(|n| format!("{glyph}.v{n}")));
        }
        variants
    }

    pub(super) fn horizontal_variants(glyph: &str) -> Vec<String> {
        let mut variants = vec![glyph.to_string()];
        if let Some(('\u{0302}' | '\u{0303}' | '\u{030C}', Piece::Base)) = split(glyph) {
            variants.extend((1..=ACCENT_GROWTH.len()).map(|n| format!("{glyph}.h{n}")));
        }
        variants
    }

    pub(super) fn vertical_assembly(glyph: &str) -> Vec<GlyphPart> {
        let ch = match split(glyph) {
            Some((ch, Piece::Base)) if ch == RADICAL || DELIMITERS.contains(ch) => ch,
            _ => return Vec::new(),
        };
        let part = |suffix: &str, advance: f32, start: f32, end: f32, extender: bool| GlyphPart {
            glyph: format!("{ch}.{suffix}"),
            start_connector: start,
            end_connector: end,
            advance,
            extender,
        };
        vec![
            part("bt", 600.0, 0.0, 200.0, false),
            part("ex", 400.0, 200.0, 200.0, true),
            part("tp", 600.0, 200.0, 0.0, false),
        ]
    }
}

// =============================================================================
// Scaled Font
// =============================================================================

/// A metrics provider at a point size
///
/// Cloning is cheap; the provider is shared.
#[derive(Clone)]
pub struct MathFont {
    metrics: Arc<dyn FontMetrics>,
    size: f32,
}

impl fmt::Debug for MathFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MathFont")
            .field("size", &self.size)
            .field("units_per_em", &self.metrics.units_per_em())
            .finish()
    }
}

impl Default for MathFont {
    fn default() -> Self {
        Self::from_table(MathTable::default(), 20.0)
    }
}

impl MathFont {
    pub fn new(metrics: Arc<dyn FontMetrics>, size: f32) -> Self {
        Self { metrics, size }
    }

    pub fn from_table(table: MathTable, size: f32) -> Self {
        Self::new(Arc::new(table), size)
    }

    /// Same metrics at another point size
    pub fn with_size(&self, size: f32) -> Self {
        Self {
            metrics: Arc::clone(&self.metrics),
            size,
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn metrics(&self) -> &dyn FontMetrics {
        self.metrics.as_ref()
    }

    fn scale(&self) -> f32 {
        self.size / self.metrics.units_per_em()
    }

    /// A font-unit constant converted to points
    pub fn constant(&self, select: impl FnOnce(&MathConstants) -> f32) -> f32 {
        select(self.metrics.constants()) * self.scale()
    }

    /// One math unit, 1/18 em
    pub fn mu_unit(&self) -> f32 {
        self.size / 18.0
    }

    pub fn script_scale_down(&self) -> f32 {
        self.metrics.constants().script_percent_scale_down / 100.0
    }

    pub fn script_script_scale_down(&self) -> f32 {
        self.metrics.constants().script_script_percent_scale_down / 100.0
    }

    pub fn radical_degree_bottom_raise(&self) -> f32 {
        self.metrics.constants().radical_degree_bottom_raise_percent / 100.0
    }

    pub fn glyph_for_char(&self, ch: char) -> String {
        self.metrics.glyph_name(ch)
    }

    pub fn glyph_bounds(&self, glyph: &str) -> GlyphBounds {
        self.metrics.glyph_bounds(glyph).scaled(self.scale())
    }

    pub fn italic_correction(&self, glyph: &str) -> f32 {
        self.metrics.italic_correction(glyph) * self.scale()
    }

    /// Horizontal attachment point for accents, the glyph center by default
    pub fn top_accent_adjustment(&self, glyph: &str) -> f32 {
        match self.metrics.top_accent_attachment(glyph) {
            Some(value) => value * self.scale(),
            None => self.glyph_bounds(glyph).advance / 2.0,
        }
    }

    pub fn vertical_variants(&self, glyph: &str) -> Vec<String> {
        self.metrics.vertical_variants(glyph)
    }

    pub fn horizontal_variants(&self, glyph: &str) -> Vec<String> {
        self.metrics.horizontal_variants(glyph)
    }

    /// The next larger vertical variant, or the glyph itself
    pub fn larger_glyph(&self, glyph: &str) -> String {
        let variants = self.vertical_variants(glyph);
        variants
            .iter()
            .position(|variant| variant == glyph)
            .and_then(|index| variants.get(index + 1))
            .cloned()
            .unwrap_or_else(|| glyph.to_string())
    }

    pub fn vertical_assembly(&self, glyph: &str) -> Vec<GlyphPart> {
        let scale = self.scale();
        self.metrics
            .vertical_assembly(glyph)
            .iter()
            .map(|part| part.scaled(scale))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
