//! Math List Model - Atoms and math lists
//!
//! A math list is an ordered sequence of atoms. Atoms share a common set of
//! fields (type, nucleus, scripts, font style, index range) and carry a
//! type-specific payload in [`AtomKind`]. Sub-lists (scripts, numerators,
//! radicands, table cells ...) are owned by their atom; there are no back
//! references.

use crate::error::EditError;
use crate::index::{MathListIndex, MathListRange, SubIndexType};
use serde::{Deserialize, Serialize};
use std::ops::Range;

// =============================================================================
// Enumerations
// =============================================================================

/// The type of an atom, following the TeX atom classes
///
/// The declaration order matters: every type from [`AtomType::Boundary`]
/// onwards does not accept scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AtomType {
    Ordinary,
    Number,
    Variable,
    LargeOperator,
    BinaryOperator,
    UnaryOperator,
    Relation,
    Open,
    Close,
    Fraction,
    Radical,
    Punctuation,
    Placeholder,
    Inner,
    Underline,
    Overline,
    Accent,
    Boundary,
    Space,
    Style,
    Color,
    Colorbox,
    Table,
}

impl AtomType {
    /// Whether atoms of this type may carry a subscript or superscript
    pub fn scripts_allowed(self) -> bool {
        self < AtomType::Boundary
    }
}

/// Font style applied to the characters of an atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FontStyle {
    /// Italic letters, upright digits and capital Greek
    #[default]
    Default,
    Roman,
    Bold,
    Caligraphic,
    Typewriter,
    Italic,
    SansSerif,
    Fraktur,
    Blackboard,
    BoldItalic,
}

/// TeX math styles, from largest to smallest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum LineStyle {
    #[default]
    Display,
    Text,
    Script,
    ScriptScript,
}

/// Horizontal alignment of a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ColumnAlignment {
    Left,
    #[default]
    Center,
    Right,
}

// =============================================================================
// Atom Payloads
// =============================================================================

/// A fraction, with or without a rule, optionally wrapped in delimiters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: MathList,
    pub denominator: MathList,
    pub has_rule: bool,
    pub left_delimiter: Option<String>,
    pub right_delimiter: Option<String>,
}

impl Fraction {
    pub fn new(has_rule: bool) -> Self {
        Self {
            numerator: MathList::new(),
            denominator: MathList::new(),
            has_rule,
            left_delimiter: None,
            right_delimiter: None,
        }
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::new(true)
    }
}

/// A radical with an optional degree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Radical {
    pub radicand: MathList,
    pub degree: Option<MathList>,
}

/// An inner list, optionally delimited by `\left` and `\right` boundaries
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Inner {
    pub inner_list: MathList,
    pub left_boundary: Option<Box<Atom>>,
    pub right_boundary: Option<Box<Atom>>,
}

/// A grid of math lists produced by an environment
///
/// Setting a cell or an alignment outside the current grid grows it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Environment name, `None` for the implicit `&`/`\\` table
    pub environment: Option<String>,
    cells: Vec<Vec<MathList>>,
    alignments: Vec<ColumnAlignment>,
    /// Space between columns in mu
    pub inter_column_spacing: f32,
    /// Additional space between rows in jots
    pub inter_row_additional_spacing: f32,
}

impl Table {
    pub fn new(environment: Option<String>) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    /// Set the cell at `row`/`column`, growing the grid as needed
    pub fn set_cell(&mut self, row: usize, column: usize, list: MathList) {
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if cells.len() <= column {
            cells.resize_with(column + 1, MathList::new);
        }
        cells[column] = list;
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&MathList> {
        self.cells.get(row).and_then(|r| r.get(column))
    }

    pub fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut MathList> {
        self.cells.get_mut(row).and_then(|r| r.get_mut(column))
    }

    pub fn cells(&self) -> &[Vec<MathList>] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut MathList> {
        self.cells.iter_mut().flatten()
    }

    /// Set the alignment of a column; unset columns are centered
    pub fn set_alignment(&mut self, column: usize, alignment: ColumnAlignment) {
        if self.alignments.len() <= column {
            self.alignments.resize(column + 1, ColumnAlignment::Center);
        }
        self.alignments[column] = alignment;
    }

    pub fn alignment(&self, column: usize) -> ColumnAlignment {
        self.alignments.get(column).copied().unwrap_or_default()
    }

    pub fn num_rows(&self) -> usize {
        self.cells.len()
    }

    /// The length of the longest row
    pub fn num_columns(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Type-specific payload of an atom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AtomKind {
    /// Symbols and operators that carry nothing beyond the nucleus
    Plain,
    LargeOperator { limits: bool },
    Fraction(Fraction),
    Radical(Radical),
    Inner(Inner),
    Underline { inner_list: MathList },
    Overline { inner_list: MathList },
    /// The accent character is the atom's nucleus
    Accent { inner_list: MathList },
    /// Explicit space in mu
    Space { space: f32 },
    Style { style: LineStyle },
    Color { color: String, inner_list: MathList },
    Colorbox { color: String, inner_list: MathList },
    Table(Table),
}

// =============================================================================
// Atom
// =============================================================================

/// A single unit of a math list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    atom_type: AtomType,
    /// The characters this atom stands for
    pub nucleus: String,
    superscript: Option<MathList>,
    subscript: Option<MathList>,
    pub font_style: FontStyle,
    fused_atoms: Vec<Atom>,
    /// Span of the original (unfused) list covered by this atom
    pub index_range: Range<usize>,
    pub kind: AtomKind,
}

impl Atom {
    /// Create an atom of the given type with an empty payload
    pub fn new(atom_type: AtomType, nucleus: impl Into<String>) -> Self {
        let kind = match atom_type {
            AtomType::LargeOperator => AtomKind::LargeOperator { limits: false },
            AtomType::Fraction => AtomKind::Fraction(Fraction::default()),
            AtomType::Radical => AtomKind::Radical(Radical::default()),
            AtomType::Inner => AtomKind::Inner(Inner::default()),
            AtomType::Underline => AtomKind::Underline {
                inner_list: MathList::new(),
            },
            AtomType::Overline => AtomKind::Overline {
                inner_list: MathList::new(),
            },
            AtomType::Accent => AtomKind::Accent {
                inner_list: MathList::new(),
            },
            AtomType::Space => AtomKind::Space { space: 0.0 },
            AtomType::Style => AtomKind::Style {
                style: LineStyle::Display,
            },
            AtomType::Color => AtomKind::Color {
                color: String::new(),
                inner_list: MathList::new(),
            },
            AtomType::Colorbox => AtomKind::Colorbox {
                color: String::new(),
                inner_list: MathList::new(),
            },
            AtomType::Table => AtomKind::Table(Table::default()),
            _ => AtomKind::Plain,
        };
        Self::with_kind(atom_type, nucleus, kind)
    }

    fn with_kind(atom_type: AtomType, nucleus: impl Into<String>, kind: AtomKind) -> Self {
        Self {
            atom_type,
            nucleus: nucleus.into(),
            superscript: None,
            subscript: None,
            font_style: FontStyle::Default,
            fused_atoms: Vec::new(),
            index_range: 0..0,
            kind,
        }
    }

    pub fn fraction(numerator: MathList, denominator: MathList, has_rule: bool) -> Self {
        Self::with_kind(
            AtomType::Fraction,
            "",
            AtomKind::Fraction(Fraction {
                numerator,
                denominator,
                ..Fraction::new(has_rule)
            }),
        )
    }

    pub fn radical(radicand: MathList, degree: Option<MathList>) -> Self {
        Self::with_kind(
            AtomType::Radical,
            "",
            AtomKind::Radical(Radical { radicand, degree }),
        )
    }

    pub fn large_operator(name: impl Into<String>, limits: bool) -> Self {
        Self::with_kind(AtomType::LargeOperator, name, AtomKind::LargeOperator { limits })
    }

    pub fn inner(inner_list: MathList, left: Option<Atom>, right: Option<Atom>) -> Self {
        Self::with_kind(
            AtomType::Inner,
            "",
            AtomKind::Inner(Inner {
                inner_list,
                left_boundary: left.map(Box::new),
                right_boundary: right.map(Box::new),
            }),
        )
    }

    pub fn overline(inner_list: MathList) -> Self {
        Self::with_kind(AtomType::Overline, "", AtomKind::Overline { inner_list })
    }

    pub fn underline(inner_list: MathList) -> Self {
        Self::with_kind(AtomType::Underline, "", AtomKind::Underline { inner_list })
    }

    pub fn accent(accent: impl Into<String>, inner_list: MathList) -> Self {
        Self::with_kind(AtomType::Accent, accent, AtomKind::Accent { inner_list })
    }

    /// Explicit space, measured in mu
    pub fn space(space: f32) -> Self {
        Self::with_kind(AtomType::Space, "", AtomKind::Space { space })
    }

    pub fn style(style: LineStyle) -> Self {
        Self::with_kind(AtomType::Style, "", AtomKind::Style { style })
    }

    pub fn color(color: impl Into<String>, inner_list: MathList) -> Self {
        Self::with_kind(
            AtomType::Color,
            "",
            AtomKind::Color {
                color: color.into(),
                inner_list,
            },
        )
    }

    pub fn colorbox(color: impl Into<String>, inner_list: MathList) -> Self {
        Self::with_kind(
            AtomType::Colorbox,
            "",
            AtomKind::Colorbox {
                color: color.into(),
                inner_list,
            },
        )
    }

    pub fn table(table: Table) -> Self {
        Self::with_kind(AtomType::Table, "", AtomKind::Table(table))
    }

    pub fn atom_type(&self) -> AtomType {
        self.atom_type
    }

    /// Reclassify the atom. Only operator and ordinary reclassification keeps
    /// the payload consistent, so this stays crate-private.
    pub(crate) fn set_atom_type(&mut self, atom_type: AtomType) {
        self.atom_type = atom_type;
    }

    pub fn scripts_allowed(&self) -> bool {
        self.atom_type.scripts_allowed()
    }

    pub fn superscript(&self) -> Option<&MathList> {
        self.superscript.as_ref()
    }

    pub fn subscript(&self) -> Option<&MathList> {
        self.subscript.as_ref()
    }

    pub fn superscript_mut(&mut self) -> Option<&mut MathList> {
        self.superscript.as_mut()
    }

    pub fn subscript_mut(&mut self) -> Option<&mut MathList> {
        self.subscript.as_mut()
    }

    pub fn set_superscript(&mut self, list: Option<MathList>) -> Result<(), EditError> {
        if list.is_some() && !self.scripts_allowed() {
            return Err(EditError::ScriptsNotAllowed(self.atom_type));
        }
        self.superscript = list;
        Ok(())
    }

    pub fn set_subscript(&mut self, list: Option<MathList>) -> Result<(), EditError> {
        if list.is_some() && !self.scripts_allowed() {
            return Err(EditError::ScriptsNotAllowed(self.atom_type));
        }
        self.subscript = list;
        Ok(())
    }

    pub(crate) fn take_scripts(&mut self) -> (Option<MathList>, Option<MathList>) {
        (self.superscript.take(), self.subscript.take())
    }

    pub fn has_scripts(&self) -> bool {
        self.superscript.is_some() || self.subscript.is_some()
    }

    /// The original atoms this atom replaced during fusion
    pub fn fused_atoms(&self) -> &[Atom] {
        &self.fused_atoms
    }

    /// The inner list of inner, over/underline, accent and color atoms
    pub fn inner_list(&self) -> Option<&MathList> {
        match &self.kind {
            AtomKind::Inner(inner) => Some(&inner.inner_list),
            AtomKind::Underline { inner_list }
            | AtomKind::Overline { inner_list }
            | AtomKind::Accent { inner_list }
            | AtomKind::Color { inner_list, .. }
            | AtomKind::Colorbox { inner_list, .. } => Some(inner_list),
            _ => None,
        }
    }

    pub fn inner_list_mut(&mut self) -> Option<&mut MathList> {
        match &mut self.kind {
            AtomKind::Inner(inner) => Some(&mut inner.inner_list),
            AtomKind::Underline { inner_list }
            | AtomKind::Overline { inner_list }
            | AtomKind::Accent { inner_list }
            | AtomKind::Color { inner_list, .. }
            | AtomKind::Colorbox { inner_list, .. } => Some(inner_list),
            _ => None,
        }
    }

    /// The sub-list addressed by a sub-index type
    pub fn branch(&self, sub_index_type: SubIndexType) -> Option<&MathList> {
        match (sub_index_type, &self.kind) {
            (SubIndexType::Superscript, _) => self.superscript.as_ref(),
            (SubIndexType::Subscript, _) => self.subscript.as_ref(),
            (SubIndexType::Numerator, AtomKind::Fraction(f)) => Some(&f.numerator),
            (SubIndexType::Denominator, AtomKind::Fraction(f)) => Some(&f.denominator),
            (SubIndexType::Radicand, AtomKind::Radical(r)) => Some(&r.radicand),
            (SubIndexType::Degree, AtomKind::Radical(r)) => r.degree.as_ref(),
            (SubIndexType::Inner, _) => self.inner_list(),
            _ => None,
        }
    }

    pub fn branch_mut(&mut self, sub_index_type: SubIndexType) -> Option<&mut MathList> {
        match sub_index_type {
            SubIndexType::Superscript => self.superscript.as_mut(),
            SubIndexType::Subscript => self.subscript.as_mut(),
            SubIndexType::Inner => self.inner_list_mut(),
            _ => match (sub_index_type, &mut self.kind) {
                (SubIndexType::Numerator, AtomKind::Fraction(f)) => Some(&mut f.numerator),
                (SubIndexType::Denominator, AtomKind::Fraction(f)) => Some(&mut f.denominator),
                (SubIndexType::Radicand, AtomKind::Radical(r)) => Some(&mut r.radicand),
                (SubIndexType::Degree, AtomKind::Radical(r)) => r.degree.as_mut(),
                _ => None,
            },
        }
    }

    /// A copy of this atom with every nested list finalized
    pub fn finalized(&self) -> Atom {
        let mut atom = self.clone();
        atom.superscript = self.superscript.as_ref().map(MathList::finalized);
        atom.subscript = self.subscript.as_ref().map(MathList::finalized);
        match &mut atom.kind {
            AtomKind::Fraction(f) => {
                f.numerator = f.numerator.finalized();
                f.denominator = f.denominator.finalized();
            }
            AtomKind::Radical(r) => {
                r.radicand = r.radicand.finalized();
                r.degree = r.degree.as_ref().map(MathList::finalized);
            }
            AtomKind::Table(table) => {
                for cell in table.cells_mut() {
                    *cell = cell.finalized();
                }
            }
            _ => {
                if let Some(inner) = atom.inner_list_mut() {
                    *inner = inner.finalized();
                }
            }
        }
        atom
    }

    /// Fuse `other` into this atom: the nuclei are concatenated, the index
    /// ranges joined and `other`'s scripts become this atom's scripts.
    pub fn fuse(&mut self, other: Atom) -> Result<(), EditError> {
        if self.has_scripts() {
            return Err(EditError::InvalidFusion(
                "the first atom already has scripts".to_string(),
            ));
        }
        if self.atom_type != other.atom_type {
            return Err(EditError::InvalidFusion(format!(
                "{:?} with {:?}",
                self.atom_type, other.atom_type
            )));
        }

        if self.fused_atoms.is_empty() {
            self.fused_atoms.push(self.clone());
        }
        let Atom {
            nucleus,
            superscript,
            subscript,
            fused_atoms,
            index_range,
            ..
        } = other;
        if fused_atoms.is_empty() {
            let mut original = Atom::with_kind(self.atom_type, nucleus.clone(), AtomKind::Plain);
            original.font_style = self.font_style;
            original.index_range = index_range.clone();
            self.fused_atoms.push(original);
        } else {
            self.fused_atoms.extend(fused_atoms);
        }

        self.nucleus.push_str(&nucleus);
        self.index_range = self.index_range.start..self.index_range.end + index_range.len();
        self.superscript = superscript;
        self.subscript = subscript;
        Ok(())
    }
}

// =============================================================================
// Math List
// =============================================================================

/// An ordered sequence of atoms
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MathList {
    atoms: Vec<Atom>,
}

impl MathList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list from atoms, rejecting boundary atoms
    pub fn from_atoms(atoms: Vec<Atom>) -> Result<Self, EditError> {
        if atoms.iter().any(|a| a.atom_type == AtomType::Boundary) {
            return Err(EditError::BoundaryAtom);
        }
        Ok(Self { atoms })
    }

    /// Create a list from atoms built by constructors that never yield
    /// boundary atoms
    pub(crate) fn from_non_boundary(atoms: Vec<Atom>) -> Self {
        debug_assert!(atoms.iter().all(|a| a.atom_type != AtomType::Boundary));
        Self { atoms }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn last(&self) -> Option<&Atom> {
        self.atoms.last()
    }

    pub fn add_atom(&mut self, atom: Atom) -> Result<(), EditError> {
        if atom.atom_type == AtomType::Boundary {
            return Err(EditError::BoundaryAtom);
        }
        self.atoms.push(atom);
        Ok(())
    }

    pub fn insert_atom(&mut self, atom: Atom, index: usize) -> Result<(), EditError> {
        if atom.atom_type == AtomType::Boundary {
            return Err(EditError::BoundaryAtom);
        }
        if index > self.atoms.len() {
            return Err(EditError::IndexOutOfBounds {
                index,
                len: self.atoms.len(),
            });
        }
        self.atoms.insert(index, atom);
        Ok(())
    }

    /// Move all atoms of `other` to the end of this list
    pub fn append(&mut self, other: MathList) {
        self.atoms.extend(other.atoms);
    }

    pub fn remove_last_atom(&mut self) -> Option<Atom> {
        self.atoms.pop()
    }

    pub fn remove_atom(&mut self, index: usize) -> Result<Atom, EditError> {
        if index >= self.atoms.len() {
            return Err(EditError::IndexOutOfBounds {
                index,
                len: self.atoms.len(),
            });
        }
        Ok(self.atoms.remove(index))
    }

    pub fn remove_atoms_in_range(&mut self, range: Range<usize>) -> Result<Vec<Atom>, EditError> {
        if range.start > range.end || range.end > self.atoms.len() {
            return Err(EditError::IndexOutOfBounds {
                index: range.end,
                len: self.atoms.len(),
            });
        }
        Ok(self.atoms.drain(range).collect())
    }

    /// Normalize the list into a new one.
    ///
    /// Every atom receives an index range into this list, adjacent unscripted
    /// numbers of the same font style are fused, and binary/unary operators
    /// are reclassified from their context: an operator is unary when it
    /// starts the list, or follows another operator, a relation, an open
    /// bracket, punctuation or a large operator; an operator directly before
    /// a relation, punctuation, a close bracket or the end of the list is
    /// unary as well. Spaces and style changes are transparent to this rule.
    pub fn finalized(&self) -> MathList {
        let mut finalized = MathList::new();
        let mut prev: Option<usize> = None;

        for atom in &self.atoms {
            let mut new_atom = atom.finalized();
            if new_atom.index_range.is_empty() {
                let index = finalized.atoms.last().map_or(0, |p| p.index_range.end);
                new_atom.index_range = index..index + 1;
            }

            let prev_type = prev.map(|p| finalized.atoms[p].atom_type);
            match new_atom.atom_type {
                AtomType::Space | AtomType::Style => {
                    finalized.atoms.push(new_atom);
                    continue;
                }
                AtomType::BinaryOperator => {
                    if starts_operand(prev_type) {
                        new_atom.atom_type = AtomType::UnaryOperator;
                    }
                }
                AtomType::UnaryOperator => {
                    if !starts_operand(prev_type) {
                        new_atom.atom_type = AtomType::BinaryOperator;
                    }
                }
                AtomType::Relation | AtomType::Punctuation | AtomType::Close => {
                    if let Some(p) = prev {
                        if finalized.atoms[p].atom_type == AtomType::BinaryOperator {
                            finalized.atoms[p].atom_type = AtomType::UnaryOperator;
                        }
                    }
                }
                AtomType::Number => {
                    if let Some(p) = prev.filter(|&p| p + 1 == finalized.atoms.len()) {
                        let target = &mut finalized.atoms[p];
                        if target.atom_type == AtomType::Number
                            && !target.has_scripts()
                            && target.font_style == new_atom.font_style
                            && target.fuse(new_atom.clone()).is_ok()
                        {
                            continue;
                        }
                    }
                }
                _ => {}
            }

            finalized.atoms.push(new_atom);
            prev = Some(finalized.atoms.len() - 1);
        }

        if let Some(p) = prev {
            if finalized.atoms[p].atom_type == AtomType::BinaryOperator {
                finalized.atoms[p].atom_type = AtomType::UnaryOperator;
            }
        }
        finalized
    }

    // -------------------------------------------------------------------------
    // Index addressed access
    // -------------------------------------------------------------------------

    /// The atom addressed by `index`, descending through its sub-indexes
    pub fn atom_at_index(&self, index: &MathListIndex) -> Option<&Atom> {
        let atom = self.atoms.get(index.atom_index())?;
        match (index.sub_index_type(), index.sub_index()) {
            (SubIndexType::None | SubIndexType::Nucleus, _) => Some(atom),
            (branch, Some(sub_index)) => atom.branch(branch)?.atom_at_index(sub_index),
            (_, None) => None,
        }
    }

    /// Insert `atom` at the position addressed by `index`.
    ///
    /// Inserting at a nucleus sub-index moves the scripts of the addressed
    /// atom onto the inserted one.
    pub fn insert_atom_at_index(
        &mut self,
        mut atom: Atom,
        index: &MathListIndex,
    ) -> Result<(), EditError> {
        let position = index.atom_index();
        match (index.sub_index_type(), index.sub_index()) {
            (SubIndexType::None, _) => self.insert_atom(atom, position),
            (SubIndexType::Nucleus, Some(sub_index)) => {
                let len = self.atoms.len();
                let current = self
                    .atoms
                    .get_mut(position)
                    .ok_or(EditError::IndexOutOfBounds { index: position, len })?;
                if !current.has_scripts() {
                    return Err(EditError::InvalidFusion(
                        "the addressed atom has no scripts to move".to_string(),
                    ));
                }
                if atom.has_scripts() {
                    return Err(EditError::InvalidFusion(
                        "the inserted atom already has scripts".to_string(),
                    ));
                }
                let (superscript, subscript) = current.take_scripts();
                atom.set_superscript(superscript)?;
                atom.set_subscript(subscript)?;
                self.insert_atom(atom, position + sub_index.atom_index())
            }
            (branch, Some(sub_index)) => self
                .branch_at(position, branch)?
                .insert_atom_at_index(atom, sub_index),
            (branch, None) => Err(missing_branch(branch, position)),
        }
    }

    /// Remove the atom addressed by `index`.
    ///
    /// Removing at a nucleus sub-index hands the scripts to the previous atom
    /// when it can take them, and otherwise empties the nucleus.
    pub fn remove_atom_at_index(&mut self, index: &MathListIndex) -> Result<Atom, EditError> {
        let position = index.atom_index();
        match (index.sub_index_type(), index.sub_index()) {
            (SubIndexType::None, _) => self.remove_atom(position),
            (SubIndexType::Nucleus, _) => {
                let len = self.atoms.len();
                if position >= len {
                    return Err(EditError::IndexOutOfBounds { index: position, len });
                }
                let previous_takes_scripts = position > 0 && {
                    let previous = &self.atoms[position - 1];
                    !previous.has_scripts() && previous.scripts_allowed()
                };
                if previous_takes_scripts {
                    let mut removed = self.atoms.remove(position);
                    let (superscript, subscript) = removed.take_scripts();
                    let previous = &mut self.atoms[position - 1];
                    previous.set_superscript(superscript)?;
                    previous.set_subscript(subscript)?;
                    Ok(removed)
                } else {
                    let current = &mut self.atoms[position];
                    let mut removed = Atom::new(current.atom_type, std::mem::take(&mut current.nucleus));
                    removed.font_style = current.font_style;
                    Ok(removed)
                }
            }
            (branch, Some(sub_index)) => self
                .branch_at(position, branch)?
                .remove_atom_at_index(sub_index),
            (branch, None) => Err(missing_branch(branch, position)),
        }
    }

    /// Remove every atom covered by `range`
    pub fn remove_atoms_in_index_range(&mut self, range: &MathListRange) -> Result<Vec<Atom>, EditError> {
        let start = range.start();
        let position = start.atom_index();
        match start.sub_index_type() {
            SubIndexType::None => self.remove_atoms_in_range(position..position + range.length()),
            SubIndexType::Nucleus => Err(EditError::InvalidFusion(
                "cannot remove a range starting inside a nucleus".to_string(),
            )),
            branch => {
                let sub_range = range
                    .sub_index_range()
                    .ok_or_else(|| missing_branch(branch, position))?;
                self.branch_at(position, branch)?
                    .remove_atoms_in_index_range(&sub_range)
            }
        }
    }

    fn branch_at(&mut self, position: usize, branch: SubIndexType) -> Result<&mut MathList, EditError> {
        let len = self.atoms.len();
        self.atoms
            .get_mut(position)
            .ok_or(EditError::IndexOutOfBounds { index: position, len })?
            .branch_mut(branch)
            .ok_or_else(|| missing_branch(branch, position))
    }
}

/// Whether an operator following `prev` starts a new operand (and so is unary)
fn starts_operand(prev: Option<AtomType>) -> bool {
    matches!(
        prev,
        None | Some(
            AtomType::BinaryOperator
                | AtomType::Relation
                | AtomType::Open
                | AtomType::Punctuation
                | AtomType::LargeOperator
        )
    )
}

fn missing_branch(branch: SubIndexType, index: usize) -> EditError {
    EditError::MissingBranch {
        branch: format!("{:?}", branch),
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(atoms: Vec<Atom>) -> MathList {
        MathList::from_atoms(atoms).unwrap()
    }

    fn types(list: &MathList) -> Vec<AtomType> {
        list.atoms().iter().map(Atom::atom_type).collect()
    }

    #[test]
    fn test_scripts_allowed_threshold() {
        assert!(AtomType::Accent.scripts_allowed());
        assert!(AtomType::Ordinary.scripts_allowed());
        assert!(!AtomType::Boundary.scripts_allowed());
        assert!(!AtomType::Space.scripts_allowed());
        assert!(!AtomType::Table.scripts_allowed());
    }

    #[test]
    fn test_boundary_atom_rejected() {
        let mut ml = MathList::new();
        let err = ml.add_atom(Atom::new(AtomType::Boundary, "(")).unwrap_err();
        assert_eq!(err, EditError::BoundaryAtom);
        assert!(ml
            .insert_atom(Atom::new(AtomType::Boundary, ")"), 0)
            .is_err());
        assert!(MathList::from_atoms(vec![Atom::new(AtomType::Boundary, "|")]).is_err());
        assert!(ml.is_empty());
    }

    #[test]
    fn test_scripts_on_space_rejected() {
        let mut space = Atom::space(3.0);
        let err = space.set_superscript(Some(MathList::new())).unwrap_err();
        assert_eq!(err, EditError::ScriptsNotAllowed(AtomType::Space));
        assert!(space.set_superscript(None).is_ok());
    }

    #[test]
    fn test_insert_and_remove() {
        let mut ml = list(vec![
            Atom::new(AtomType::Variable, "x"),
            Atom::new(AtomType::Variable, "z"),
        ]);
        ml.insert_atom(Atom::new(AtomType::Variable, "y"), 1).unwrap();
        assert_eq!(ml.len(), 3);
        assert_eq!(ml.atoms()[1].nucleus, "y");

        assert!(ml.insert_atom(Atom::new(AtomType::Variable, "w"), 9).is_err());

        let removed = ml.remove_atoms_in_range(0..2).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(ml.atoms()[0].nucleus, "z");
        assert_eq!(ml.remove_last_atom().unwrap().nucleus, "z");
        assert!(ml.remove_atom(0).is_err());
    }

    #[test]
    fn test_table_grows() {
        let mut table = Table::new(Some("matrix".to_string()));
        table.set_cell(1, 2, list(vec![Atom::new(AtomType::Number, "1")]));
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_columns(), 3);
        assert!(table.cell(0, 0).is_none());
        assert!(table.cell(1, 0).unwrap().is_empty());

        assert_eq!(table.alignment(4), ColumnAlignment::Center);
        table.set_alignment(2, ColumnAlignment::Left);
        assert_eq!(table.alignment(2), ColumnAlignment::Left);
        assert_eq!(table.alignment(0), ColumnAlignment::Center);
    }

    #[test]
    fn test_finalize_fuses_numbers() {
        let ml = list(vec![
            Atom::new(AtomType::Number, "1"),
            Atom::new(AtomType::Number, "2"),
            Atom::new(AtomType::Number, "3"),
        ]);
        let finalized = ml.finalized();
        assert_eq!(finalized.len(), 1);
        let atom = &finalized.atoms()[0];
        assert_eq!(atom.nucleus, "123");
        assert_eq!(atom.index_range, 0..3);
        assert_eq!(atom.fused_atoms().len(), 3);
        assert_eq!(atom.fused_atoms()[2].index_range, 2..3);
    }

    #[test]
    fn test_finalize_keeps_scripted_number_apart() {
        let mut one = Atom::new(AtomType::Number, "1");
        one.set_superscript(Some(list(vec![Atom::new(AtomType::Number, "2")])))
            .unwrap();
        let ml = list(vec![one, Atom::new(AtomType::Number, "3")]);
        let finalized = ml.finalized();
        assert_eq!(finalized.len(), 2);
        assert_eq!(finalized.atoms()[1].index_range, 1..2);
    }

    #[test]
    fn test_finalize_moves_scripts_of_fused_atom() {
        let mut two = Atom::new(AtomType::Number, "2");
        two.set_subscript(Some(list(vec![Atom::new(AtomType::Variable, "i")])))
            .unwrap();
        let ml = list(vec![Atom::new(AtomType::Number, "1"), two]);
        let finalized = ml.finalized();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized.atoms()[0].nucleus, "12");
        assert!(finalized.atoms()[0].subscript().is_some());
    }

    #[test]
    fn test_finalize_unary_at_start() {
        let ml = list(vec![
            Atom::new(AtomType::BinaryOperator, "\u{2212}"),
            Atom::new(AtomType::Number, "2"),
        ]);
        assert_eq!(
            types(&ml.finalized()),
            vec![AtomType::UnaryOperator, AtomType::Number]
        );
    }

    #[test]
    fn test_finalize_binary_after_operand() {
        let ml = list(vec![
            Atom::new(AtomType::Number, "3"),
            Atom::new(AtomType::UnaryOperator, "\u{2212}"),
            Atom::new(AtomType::Number, "2"),
        ]);
        assert_eq!(
            types(&ml.finalized()),
            vec![AtomType::Number, AtomType::BinaryOperator, AtomType::Number]
        );
    }

    #[test]
    fn test_finalize_binary_before_relation() {
        let ml = list(vec![
            Atom::new(AtomType::Variable, "x"),
            Atom::new(AtomType::BinaryOperator, "+"),
            Atom::new(AtomType::Relation, "="),
            Atom::new(AtomType::Variable, "y"),
            Atom::new(AtomType::BinaryOperator, "+"),
        ]);
        assert_eq!(
            types(&ml.finalized()),
            vec![
                AtomType::Variable,
                AtomType::UnaryOperator,
                AtomType::Relation,
                AtomType::Variable,
                AtomType::UnaryOperator,
            ]
        );
    }

    #[test]
    fn test_finalize_skips_spaces_for_operator_context() {
        let ml = list(vec![
            Atom::new(AtomType::Open, "("),
            Atom::space(3.0),
            Atom::new(AtomType::BinaryOperator, "+"),
            Atom::new(AtomType::Variable, "x"),
        ]);
        let finalized = ml.finalized();
        assert_eq!(finalized.atoms()[2].atom_type(), AtomType::UnaryOperator);
        assert_eq!(finalized.atoms()[1].index_range, 1..2);
    }

    #[test]
    fn test_finalize_recurses_into_branches() {
        let numerator = list(vec![
            Atom::new(AtomType::Number, "1"),
            Atom::new(AtomType::Number, "0"),
        ]);
        let ml = list(vec![Atom::fraction(numerator, MathList::new(), true)]);
        let finalized = ml.finalized();
        let AtomKind::Fraction(frac) = &finalized.atoms()[0].kind else {
            panic!("Expected fraction");
        };
        assert_eq!(frac.numerator.len(), 1);
        assert_eq!(frac.numerator.atoms()[0].nucleus, "10");
    }

    #[test]
    fn test_finalize_idempotent() {
        let ml = list(vec![
            Atom::new(AtomType::BinaryOperator, "\u{2212}"),
            Atom::new(AtomType::Number, "1"),
            Atom::new(AtomType::Number, "2"),
            Atom::new(AtomType::BinaryOperator, "+"),
            Atom::new(AtomType::Variable, "x"),
            Atom::new(AtomType::BinaryOperator, "+"),
        ]);
        let once = ml.finalized();
        assert_eq!(once.finalized(), once);
    }

    #[test]
    fn test_fuse_rejects_mismatched_types() {
        let mut a = Atom::new(AtomType::Number, "1");
        assert!(a.fuse(Atom::new(AtomType::Variable, "x")).is_err());
        let mut b = Atom::new(AtomType::Number, "1");
        b.set_superscript(Some(MathList::new())).unwrap();
        assert!(b.fuse(Atom::new(AtomType::Number, "2")).is_err());
    }

    #[test]
    fn test_atom_at_index() {
        let mut x = Atom::new(AtomType::Variable, "x");
        x.set_superscript(Some(list(vec![Atom::new(AtomType::Number, "2")])))
            .unwrap();
        let frac = Atom::fraction(
            list(vec![Atom::new(AtomType::Variable, "a")]),
            list(vec![Atom::new(AtomType::Variable, "b")]),
            true,
        );
        let ml = list(vec![x, frac]);

        let sup = MathListIndex::level0(0)
            .level_up(MathListIndex::level0(0), SubIndexType::Superscript);
        assert_eq!(ml.atom_at_index(&sup).unwrap().nucleus, "2");

        let den = MathListIndex::level0(1)
            .level_up(MathListIndex::level0(0), SubIndexType::Denominator);
        assert_eq!(ml.atom_at_index(&den).unwrap().nucleus, "b");

        let bad = MathListIndex::level0(1)
            .level_up(MathListIndex::level0(0), SubIndexType::Radicand);
        assert!(ml.atom_at_index(&bad).is_none());
        assert!(ml.atom_at_index(&MathListIndex::level0(5)).is_none());
    }

    #[test]
    fn test_insert_at_nucleus_moves_scripts() {
        let mut x = Atom::new(AtomType::Variable, "x");
        x.set_superscript(Some(list(vec![Atom::new(AtomType::Number, "2")])))
            .unwrap();
        let mut ml = list(vec![x]);

        let index = MathListIndex::level0(0)
            .level_up(MathListIndex::level0(1), SubIndexType::Nucleus);
        ml.insert_atom_at_index(Atom::new(AtomType::Variable, "y"), &index)
            .unwrap();

        assert_eq!(ml.len(), 2);
        assert!(ml.atoms()[0].superscript().is_none());
        assert_eq!(ml.atoms()[1].nucleus, "y");
        assert!(ml.atoms()[1].superscript().is_some());
    }

    #[test]
    fn test_insert_and_remove_in_branch() {
        let mut ml = list(vec![Atom::radical(MathList::new(), None)]);
        let radicand = MathListIndex::level0(0)
            .level_up(MathListIndex::level0(0), SubIndexType::Radicand);
        ml.insert_atom_at_index(Atom::new(AtomType::Variable, "x"), &radicand)
            .unwrap();
        assert_eq!(ml.atom_at_index(&radicand).unwrap().nucleus, "x");

        let degree = MathListIndex::level0(0)
            .level_up(MathListIndex::level0(0), SubIndexType::Degree);
        assert!(matches!(
            ml.insert_atom_at_index(Atom::new(AtomType::Number, "3"), &degree),
            Err(EditError::MissingBranch { .. })
        ));

        let removed = ml.remove_atom_at_index(&radicand).unwrap();
        assert_eq!(removed.nucleus, "x");
        assert!(ml.atom_at_index(&radicand).is_none());
    }

    #[test]
    fn test_remove_nucleus_hands_scripts_to_previous() {
        let mut y = Atom::new(AtomType::Variable, "y");
        y.set_subscript(Some(list(vec![Atom::new(AtomType::Variable, "i")])))
            .unwrap();
        let mut ml = list(vec![Atom::new(AtomType::Variable, "x"), y]);

        let index = MathListIndex::level0(1)
            .level_up(MathListIndex::level0(0), SubIndexType::Nucleus);
        ml.remove_atom_at_index(&index).unwrap();
        assert_eq!(ml.len(), 1);
        assert!(ml.atoms()[0].subscript().is_some());
    }

    #[test]
    fn test_remove_nucleus_without_previous_empties_nucleus() {
        let mut y = Atom::new(AtomType::Variable, "y");
        y.set_subscript(Some(MathList::new())).unwrap();
        let mut ml = list(vec![y]);
        let index = MathListIndex::level0(0)
            .level_up(MathListIndex::level0(0), SubIndexType::Nucleus);
        let removed = ml.remove_atom_at_index(&index).unwrap();
        assert_eq!(removed.nucleus, "y");
        assert_eq!(ml.len(), 1);
        assert!(ml.atoms()[0].nucleus.is_empty());
    }

    #[test]
    fn test_remove_index_range_in_numerator() {
        let numerator = list(vec![
            Atom::new(AtomType::Variable, "a"),
            Atom::new(AtomType::Variable, "b"),
            Atom::new(AtomType::Variable, "c"),
        ]);
        let mut ml = list(vec![Atom::fraction(numerator, MathList::new(), true)]);
        let start = MathListIndex::level0(0)
            .level_up(MathListIndex::level0(1), SubIndexType::Numerator);
        let removed = ml
            .remove_atoms_in_index_range(&MathListRange::new(start, 2))
            .unwrap();
        assert_eq!(removed.len(), 2);
        let AtomKind::Fraction(frac) = &ml.atoms()[0].kind else {
            panic!("Expected fraction");
        };
        assert_eq!(frac.numerator.len(), 1);
    }

    #[test]
    fn test_serde_roundtrip() {
        let ml = list(vec![
            Atom::new(AtomType::Variable, "x"),
            Atom::large_operator("\u{2211}", true),
            Atom::space(3.0),
        ])
        .finalized();
        let json = serde_json::to_string(&ml).unwrap();
        let parsed: MathList = serde_json::from_str(&json).unwrap();
        assert_eq!(ml, parsed);
    }
}
