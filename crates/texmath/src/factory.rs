//! Atom Factory - Symbol tables and canonical atom construction
//!
//! Maps LaTeX command names and single characters to atoms and back. The
//! command table is a [`SymbolTable`]; a process-wide instance lives behind
//! [`global_symbols`] and can be extended with [`add_latex_symbol`]. Tables
//! can also be built standalone and handed to the builder directly.
//!
//! Delimiter, accent, font style, space and style names are fixed tables.
//! Where several names map to the same value, the reverse lookup returns
//! the shortest name (ties broken alphabetically).

use crate::error::TableError;
use crate::model::*;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard};

// =============================================================================
// Name Tables
// =============================================================================

/// A fixed bidirectional name table
struct NameTable<V: 'static> {
    forward: HashMap<&'static str, V>,
    reverse: HashMap<V, &'static str>,
}

impl<V: Copy + Eq + std::hash::Hash> NameTable<V> {
    fn new(entries: &[(&'static str, V)]) -> Self {
        let mut forward = HashMap::new();
        let mut reverse: HashMap<V, &'static str> = HashMap::new();
        for &(name, value) in entries {
            forward.insert(name, value);
            reverse
                .entry(value)
                .and_modify(|existing| {
                    if is_preferred_name(name, existing) {
                        *existing = name;
                    }
                })
                .or_insert(name);
        }
        Self { forward, reverse }
    }
}

/// Shorter names win; equal lengths fall back to alphabetical order
fn is_preferred_name(candidate: &str, existing: &str) -> bool {
    (candidate.len(), candidate) < (existing.len(), existing)
}

const DELIMITERS: &[(&str, &str)] = &[
    (".", ""),
    ("(", "("),
    (")", ")"),
    ("[", "["),
    ("]", "]"),
    ("<", "\u{2329}"),
    (">", "\u{232A}"),
    ("/", "/"),
    ("\\", "\\"),
    ("|", "|"),
    ("lgroup", "\u{27EE}"),
    ("rgroup", "\u{27EF}"),
    ("||", "\u{2016}"),
    ("Vert", "\u{2016}"),
    ("vert", "|"),
    ("uparrow", "\u{2191}"),
    ("downarrow", "\u{2193}"),
    ("updownarrow", "\u{2195}"),
    ("Uparrow", "\u{21D1}"),
    ("Downarrow", "\u{21D3}"),
    ("Updownarrow", "\u{21D5}"),
    ("backslash", "\\"),
    ("rangle", "\u{232A}"),
    ("langle", "\u{2329}"),
    ("rbrace", "}"),
    ("}", "}"),
    ("{", "{"),
    ("lbrace", "{"),
    ("lceil", "\u{2308}"),
    ("rceil", "\u{2309}"),
    ("lfloor", "\u{230A}"),
    ("rfloor", "\u{230B}"),
];

const ACCENTS: &[(&str, &str)] = &[
    ("grave", "\u{0300}"),
    ("acute", "\u{0301}"),
    ("hat", "\u{0302}"),
    ("tilde", "\u{0303}"),
    ("bar", "\u{0304}"),
    ("breve", "\u{0306}"),
    ("dot", "\u{0307}"),
    ("ddot", "\u{0308}"),
    ("check", "\u{030C}"),
    ("vec", "\u{20D7}"),
    ("widehat", "\u{0302}"),
    ("widetilde", "\u{0303}"),
];

const FONT_STYLES: &[(&str, FontStyle)] = &[
    ("mathnormal", FontStyle::Default),
    ("mathrm", FontStyle::Roman),
    ("textrm", FontStyle::Roman),
    ("rm", FontStyle::Roman),
    ("mathbf", FontStyle::Bold),
    ("bf", FontStyle::Bold),
    ("textbf", FontStyle::Bold),
    ("mathcal", FontStyle::Caligraphic),
    ("cal", FontStyle::Caligraphic),
    ("mathtt", FontStyle::Typewriter),
    ("texttt", FontStyle::Typewriter),
    ("mathit", FontStyle::Italic),
    ("textit", FontStyle::Italic),
    ("mit", FontStyle::Italic),
    ("mathsf", FontStyle::SansSerif),
    ("textsf", FontStyle::SansSerif),
    ("mathfrak", FontStyle::Fraktur),
    ("frak", FontStyle::Fraktur),
    ("mathbb", FontStyle::Blackboard),
    ("mathbfit", FontStyle::BoldItalic),
    ("bm", FontStyle::BoldItalic),
    ("text", FontStyle::Roman),
];

/// Explicit spaces in mu
const SPACES: &[(&str, f32)] = &[
    (",", 3.0),
    (":", 4.0),
    (">", 4.0),
    (";", 5.0),
    ("!", -3.0),
    ("quad", 18.0),
    ("qquad", 36.0),
];

const STYLES: &[(&str, LineStyle)] = &[
    ("displaystyle", LineStyle::Display),
    ("textstyle", LineStyle::Text),
    ("scriptstyle", LineStyle::Script),
    ("scriptscriptstyle", LineStyle::ScriptScript),
];

fn delimiters() -> &'static NameTable<&'static str> {
    static TABLE: OnceLock<NameTable<&'static str>> = OnceLock::new();
    TABLE.get_or_init(|| NameTable::new(DELIMITERS))
}

fn accents() -> &'static NameTable<&'static str> {
    static TABLE: OnceLock<NameTable<&'static str>> = OnceLock::new();
    TABLE.get_or_init(|| NameTable::new(ACCENTS))
}

fn font_styles() -> &'static HashMap<&'static str, FontStyle> {
    static TABLE: OnceLock<HashMap<&'static str, FontStyle>> = OnceLock::new();
    TABLE.get_or_init(|| FONT_STYLES.iter().copied().collect())
}

// =============================================================================
// Symbol Table
// =============================================================================

/// LaTeX commands that resolve to a single atom
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: HashMap<String, Atom>,
    aliases: HashMap<String, String>,
    /// (type, nucleus) -> preferred command name
    names: HashMap<(AtomType, String), String>,
    /// nucleus -> preferred command name, for classifying input characters
    characters: HashMap<String, String>,
}

/// Reverse lookup key. Finalize may turn a binary operator unary, so both
/// share one key.
fn name_key(atom: &Atom) -> (AtomType, String) {
    let atom_type = match atom.atom_type() {
        AtomType::UnaryOperator => AtomType::BinaryOperator,
        other => other,
    };
    (atom_type, atom.nucleus.clone())
}

fn insert_preferred<K: Eq + std::hash::Hash>(map: &mut HashMap<K, String>, key: K, name: &str) {
    let preferred = match map.get(&key) {
        Some(existing) => is_preferred_name(name, existing),
        None => true,
    };
    if preferred {
        map.insert(key, name.to_string());
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table holding every built-in command
    pub fn new() -> Self {
        let mut table = Self::empty();
        for &(name, atom_type, nucleus) in BUILTIN_SYMBOLS {
            table.insert_builtin(name, Atom::new(atom_type, nucleus));
        }
        for &(name, nucleus, limits) in BUILTIN_OPERATORS {
            table.insert_builtin(name, Atom::large_operator(nucleus, limits));
        }
        for &(name, amount) in SPACES {
            table.insert_builtin(name, Atom::space(amount));
        }
        for &(name, style) in STYLES {
            table.insert_builtin(name, Atom::style(style));
        }
        for &(alias, canonical) in BUILTIN_ALIASES {
            table.aliases.insert(alias.to_string(), canonical.to_string());
        }
        table
    }

    /// A table with no commands at all
    pub fn empty() -> Self {
        Self {
            symbols: HashMap::new(),
            aliases: HashMap::new(),
            names: HashMap::new(),
            characters: HashMap::new(),
        }
    }

    fn insert_builtin(&mut self, name: &str, atom: Atom) {
        if !atom.nucleus.is_empty() {
            insert_preferred(&mut self.names, name_key(&atom), name);
            insert_preferred(&mut self.characters, atom.nucleus.clone(), name);
        }
        self.symbols.insert(name.to_string(), atom);
    }

    /// Add or replace a command. The new name becomes the reverse lookup
    /// for atoms of the same type and nucleus.
    pub fn add_latex_symbol(&mut self, name: impl Into<String>, atom: Atom) {
        let name = name.into();
        tracing::debug!(name = %name, nucleus = %atom.nucleus, "registering latex symbol");
        if self.symbols.contains_key(&name) {
            self.names.retain(|_, existing| *existing != name);
            self.characters.retain(|_, existing| *existing != name);
        }
        if !atom.nucleus.is_empty() {
            self.names.insert(name_key(&atom), name.clone());
            self.characters.insert(atom.nucleus.clone(), name.clone());
        }
        self.aliases.remove(&name);
        self.symbols.insert(name, atom);
    }

    /// The atom for a command name or alias
    pub fn atom_for_latex_symbol_name(&self, name: &str) -> Option<Atom> {
        let canonical = self.aliases.get(name).map_or(name, String::as_str);
        self.symbols.get(canonical).cloned()
    }

    /// Best-effort reverse lookup matching type and nucleus; aliases
    /// resolve to their canonical name
    pub fn latex_symbol_name_for_atom(&self, atom: &Atom) -> Option<&str> {
        if atom.nucleus.is_empty() {
            return None;
        }
        self.names.get(&name_key(atom)).map(String::as_str)
    }

    /// The command atom whose nucleus is exactly `nucleus`, of any type
    pub fn atom_for_nucleus(&self, nucleus: &str) -> Option<Atom> {
        let name = self.characters.get(nucleus)?;
        self.symbols.get(name).cloned()
    }

    /// Every command name, without aliases
    pub fn supported_latex_symbol_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

static GLOBAL_SYMBOLS: OnceLock<RwLock<SymbolTable>> = OnceLock::new();

/// The process-wide symbol table
pub fn global_symbols() -> &'static RwLock<SymbolTable> {
    GLOBAL_SYMBOLS.get_or_init(|| RwLock::new(SymbolTable::new()))
}

/// Read access to the process-wide table
pub fn read_symbols() -> RwLockReadGuard<'static, SymbolTable> {
    global_symbols().read().unwrap_or_else(PoisonError::into_inner)
}

/// Register a command in the process-wide table
pub fn add_latex_symbol(name: impl Into<String>, atom: Atom) {
    global_symbols()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add_latex_symbol(name, atom);
}

pub fn atom_for_latex_symbol_name(name: &str) -> Option<Atom> {
    read_symbols().atom_for_latex_symbol_name(name)
}

pub fn latex_symbol_name_for_atom(atom: &Atom) -> Option<String> {
    read_symbols().latex_symbol_name_for_atom(atom).map(str::to_string)
}

// =============================================================================
// Characters
// =============================================================================

/// Classify a single ASCII character by TeX convention
pub fn atom_for_character(ch: char) -> Option<Atom> {
    let atom = match ch {
        _ if !('\u{21}'..='\u{7E}').contains(&ch) => return None,
        '$' | '%' | '#' | '&' | '~' | '\'' => return None,
        '^' | '_' | '{' | '}' | '\\' => return None,
        '(' | '[' => Atom::new(AtomType::Open, ch.to_string()),
        ')' | ']' | '!' | '?' => Atom::new(AtomType::Close, ch.to_string()),
        ',' | ';' => Atom::new(AtomType::Punctuation, ch.to_string()),
        '=' | '>' | '<' => Atom::new(AtomType::Relation, ch.to_string()),
        ':' => Atom::new(AtomType::Relation, "\u{2236}"),
        '-' => Atom::new(AtomType::BinaryOperator, "\u{2212}"),
        '+' | '*' => Atom::new(AtomType::BinaryOperator, ch.to_string()),
        '.' | '0'..='9' => Atom::new(AtomType::Number, ch.to_string()),
        'a'..='z' | 'A'..='Z' => Atom::new(AtomType::Variable, ch.to_string()),
        _ => Atom::new(AtomType::Ordinary, ch.to_string()),
    };
    Some(atom)
}

/// A list of the atoms for each classifiable character of `chars`
pub fn math_list_for_characters(chars: &str) -> MathList {
    MathList::from_non_boundary(chars.chars().filter_map(atom_for_character).collect())
}

// =============================================================================
// Named Values
// =============================================================================

/// A large operator; `limits` places scripts above and below in display style
pub fn operator_with_name(name: &str, limits: bool) -> Atom {
    Atom::large_operator(name, limits)
}

/// A large operator without limits
pub fn operator(name: &str) -> Atom {
    operator_with_name(name, false)
}

/// An empty accent atom for an accent command name
pub fn accent_with_name(name: &str) -> Option<Atom> {
    accents()
        .forward
        .get(name)
        .map(|&accent| Atom::accent(accent, MathList::new()))
}

pub fn accent_name(accent: &Atom) -> Option<&'static str> {
    accents().reverse.get(accent.nucleus.as_str()).copied()
}

/// A boundary atom for a `\left`/`\right` delimiter name
pub fn boundary_atom_for_delimiter_name(name: &str) -> Option<Atom> {
    delimiters()
        .forward
        .get(name)
        .map(|&delim| Atom::new(AtomType::Boundary, delim))
}

pub fn delimiter_name_for_boundary_atom(boundary: &Atom) -> Option<&'static str> {
    if boundary.atom_type() != AtomType::Boundary {
        return None;
    }
    delimiters().reverse.get(boundary.nucleus.as_str()).copied()
}

pub fn font_style_with_name(name: &str) -> Option<FontStyle> {
    font_styles().get(name).copied()
}

/// The canonical command for a font style
pub fn font_name_for_style(style: FontStyle) -> &'static str {
    match style {
        FontStyle::Default => "mathnormal",
        FontStyle::Roman => "mathrm",
        FontStyle::Bold => "mathbf",
        FontStyle::Fraktur => "mathfrak",
        FontStyle::Caligraphic => "mathcal",
        FontStyle::Italic => "mathit",
        FontStyle::SansSerif => "mathsf",
        FontStyle::Blackboard => "mathbb",
        FontStyle::Typewriter => "mathtt",
        FontStyle::BoldItalic => "bm",
    }
}

/// The command for an explicit space, if one has exactly this width
pub fn space_name(amount: f32) -> Option<&'static str> {
    SPACES
        .iter()
        .filter(|(_, width)| *width == amount)
        .map(|&(name, _)| name)
        .min_by(|a, b| (a.len(), a).cmp(&(b.len(), b)))
}

pub fn style_name(style: LineStyle) -> &'static str {
    STYLES
        .iter()
        .find(|(_, s)| *s == style)
        .map_or("displaystyle", |&(name, _)| name)
}

// =============================================================================
// Convenience Constructors
// =============================================================================

pub fn times() -> Atom {
    Atom::new(AtomType::BinaryOperator, "\u{00D7}")
}

pub fn divide() -> Atom {
    Atom::new(AtomType::BinaryOperator, "\u{00F7}")
}

/// An empty box shown where the user still has to type
pub fn placeholder() -> Atom {
    Atom::new(AtomType::Placeholder, "\u{25A1}")
}

fn placeholder_list() -> MathList {
    MathList::from_non_boundary(vec![placeholder()])
}

pub fn placeholder_fraction() -> Atom {
    Atom::fraction(placeholder_list(), placeholder_list(), true)
}

pub fn placeholder_radical() -> Atom {
    Atom::radical(placeholder_list(), Some(placeholder_list()))
}

pub fn placeholder_square_root() -> Atom {
    Atom::radical(placeholder_list(), None)
}

pub fn open_parens() -> Atom {
    Atom::new(AtomType::Open, "(")
}

pub fn close_parens() -> Atom {
    Atom::new(AtomType::Close, ")")
}

pub fn fraction_with_numerator(numerator: MathList, denominator: MathList) -> Atom {
    Atom::fraction(numerator, denominator, true)
}

pub fn fraction_with_strings(numerator: &str, denominator: &str) -> Atom {
    fraction_with_numerator(
        math_list_for_characters(numerator),
        math_list_for_characters(denominator),
    )
}

// =============================================================================
// Environments
// =============================================================================

/// Delimiters of the matrix environments
fn matrix_delimiters(env: &str) -> Option<Option<(&'static str, &'static str)>> {
    match env {
        "matrix" => Some(None),
        "pmatrix" => Some(Some(("(", ")"))),
        "bmatrix" => Some(Some(("[", "]"))),
        "Bmatrix" => Some(Some(("{", "}"))),
        "vmatrix" => Some(Some(("vert", "vert"))),
        "Vmatrix" => Some(Some(("Vert", "Vert"))),
        _ => None,
    }
}

fn require_columns(table: &Table, env: &str, expected: usize) -> Result<(), TableError> {
    if table.num_columns() != expected {
        return Err(TableError::InvalidNumColumns {
            env: env.to_string(),
            expected,
        });
    }
    Ok(())
}

fn insert_in_cells(table: &mut Table, atom: &Atom) -> Result<(), TableError> {
    for cell in table.cells_mut() {
        cell.insert_atom(atom.clone(), 0)?;
    }
    Ok(())
}

fn wrap_in_inner(atoms: Vec<Atom>, left: &str, right: &str) -> Result<Atom, TableError> {
    Ok(Atom::inner(
        MathList::from_atoms(atoms)?,
        boundary_atom_for_delimiter_name(left),
        boundary_atom_for_delimiter_name(right),
    ))
}

/// Build the table atom for an environment from its rows of cells.
///
/// `None` is the implicit environment created by a bare `&` or `\\`.
/// Matrix and `cases` environments come back wrapped in an inner atom
/// carrying their delimiters.
pub fn table_with_environment(
    environment: Option<&str>,
    rows: Vec<Vec<MathList>>,
) -> Result<Atom, TableError> {
    let mut table = Table::new(environment.map(str::to_string));
    for (i, row) in rows.into_iter().enumerate() {
        for (j, cell) in row.into_iter().enumerate() {
            table.set_cell(i, j, cell);
        }
    }

    let Some(env) = environment else {
        table.inter_row_additional_spacing = 1.0;
        table.inter_column_spacing = 0.0;
        for column in 0..table.num_columns() {
            table.set_alignment(column, ColumnAlignment::Left);
        }
        return Ok(Atom::table(table));
    };

    if let Some(delimiters) = matrix_delimiters(env) {
        if let Some(first) = table.cells().first() {
            let expected = first.len();
            if let Some(row) = table.cells().iter().find(|row| row.len() != expected) {
                return Err(TableError::RaggedRows {
                    env: env.to_string(),
                    expected,
                    found: row.len(),
                });
            }
        }
        table.environment = Some("matrix".to_string());
        table.inter_row_additional_spacing = 0.0;
        table.inter_column_spacing = 18.0;
        insert_in_cells(&mut table, &Atom::style(LineStyle::Text))?;
        return match delimiters {
            Some((left, right)) => wrap_in_inner(vec![Atom::table(table)], left, right),
            None => Ok(Atom::table(table)),
        };
    }

    match env {
        "eqalign" | "split" | "aligned" => {
            require_columns(&table, env, 2)?;
            let spacer = Atom::new(AtomType::Ordinary, "");
            for row in 0..table.num_rows() {
                if let Some(cell) = table.cell_mut(row, 1) {
                    cell.insert_atom(spacer.clone(), 0)?;
                }
            }
            table.inter_row_additional_spacing = 1.0;
            table.inter_column_spacing = 0.0;
            table.set_alignment(0, ColumnAlignment::Right);
            table.set_alignment(1, ColumnAlignment::Left);
            Ok(Atom::table(table))
        }
        "displaylines" | "gather" => {
            require_columns(&table, env, 1)?;
            table.inter_row_additional_spacing = 1.0;
            table.inter_column_spacing = 0.0;
            table.set_alignment(0, ColumnAlignment::Center);
            Ok(Atom::table(table))
        }
        "eqnarray" => {
            require_columns(&table, env, 3)?;
            table.inter_row_additional_spacing = 1.0;
            table.inter_column_spacing = 18.0;
            table.set_alignment(0, ColumnAlignment::Right);
            table.set_alignment(1, ColumnAlignment::Center);
            table.set_alignment(2, ColumnAlignment::Left);
            Ok(Atom::table(table))
        }
        "cases" => {
            require_columns(&table, env, 2)?;
            table.inter_row_additional_spacing = 0.0;
            table.inter_column_spacing = 18.0;
            table.set_alignment(0, ColumnAlignment::Left);
            table.set_alignment(1, ColumnAlignment::Left);
            insert_in_cells(&mut table, &Atom::style(LineStyle::Text))?;
            wrap_in_inner(vec![Atom::space(3.0), Atom::table(table)], "{", ".")
        }
        _ => Err(TableError::UnknownEnvironment(env.to_string())),
    }
}

// =============================================================================
// Built-in Commands
// =============================================================================

use AtomType::{
    BinaryOperator as Bin, Close, Open, Ordinary, Punctuation as Punct, Relation as Rel,
    Variable as Var,
};

const BUILTIN_SYMBOLS: &[(&str, AtomType, &str)] = &[
    // Escaped characters
    ("{", Open, "{"),
    ("}", Close, "}"),
    ("$", Ordinary, "$"),
    ("&", Ordinary, "&"),
    ("#", Ordinary, "#"),
    ("%", Ordinary, "%"),
    ("_", Ordinary, "_"),
    (" ", Ordinary, " "),
    ("backslash", Ordinary, "\\"),
    // Punctuation
    ("colon", Punct, ":"),
    ("cdotp", Punct, "\u{00B7}"),
    // Lowercase Greek
    ("alpha", Var, "\u{03B1}"),
    ("beta", Var, "\u{03B2}"),
    ("gamma", Var, "\u{03B3}"),
    ("delta", Var, "\u{03B4}"),
    ("varepsilon", Var, "\u{03B5}"),
    ("zeta", Var, "\u{03B6}"),
    ("eta", Var, "\u{03B7}"),
    ("theta", Var, "\u{03B8}"),
    ("iota", Var, "\u{03B9}"),
    ("kappa", Var, "\u{03BA}"),
    ("lambda", Var, "\u{03BB}"),
    ("mu", Var, "\u{03BC}"),
    ("nu", Var, "\u{03BD}"),
    ("xi", Var, "\u{03BE}"),
    ("omicron", Var, "\u{03BF}"),
    ("pi", Var, "\u{03C0}"),
    ("rho", Var, "\u{03C1}"),
    ("varsigma", Var, "\u{03C2}"),
    ("sigma", Var, "\u{03C3}"),
    ("tau", Var, "\u{03C4}"),
    ("upsilon", Var, "\u{03C5}"),
    ("varphi", Var, "\u{03C6}"),
    ("chi", Var, "\u{03C7}"),
    ("psi", Var, "\u{03C8}"),
    ("omega", Var, "\u{03C9}"),
    ("vartheta", Var, "\u{03D1}"),
    ("phi", Var, "\u{03D5}"),
    ("varpi", Var, "\u{03D6}"),
    ("varkappa", Var, "\u{03F0}"),
    ("varrho", Var, "\u{03F1}"),
    ("epsilon", Var, "\u{03F5}"),
    // Uppercase Greek
    ("Gamma", Var, "\u{0393}"),
    ("Delta", Var, "\u{0394}"),
    ("Theta", Var, "\u{0398}"),
    ("Lambda", Var, "\u{039B}"),
    ("Xi", Var, "\u{039E}"),
    ("Pi", Var, "\u{03A0}"),
    ("Sigma", Var, "\u{03A3}"),
    ("Upsilon", Var, "\u{03A5}"),
    ("Phi", Var, "\u{03A6}"),
    ("Psi", Var, "\u{03A8}"),
    ("Omega", Var, "\u{03A9}"),
    // Open and close
    ("lceil", Open, "\u{2308}"),
    ("lfloor", Open, "\u{230A}"),
    ("langle", Open, "\u{2329}"),
    ("lgroup", Open, "\u{27EE}"),
    ("rceil", Close, "\u{2309}"),
    ("rfloor", Close, "\u{230B}"),
    ("rangle", Close, "\u{232A}"),
    ("rgroup", Close, "\u{27EF}"),
    // Arrows
    ("leftarrow", Rel, "\u{2190}"),
    ("uparrow", Rel, "\u{2191}"),
    ("rightarrow", Rel, "\u{2192}"),
    ("downarrow", Rel, "\u{2193}"),
    ("leftrightarrow", Rel, "\u{2194}"),
    ("updownarrow", Rel, "\u{2195}"),
    ("nwarrow", Rel, "\u{2196}"),
    ("nearrow", Rel, "\u{2197}"),
    ("searrow", Rel, "\u{2198}"),
    ("swarrow", Rel, "\u{2199}"),
    ("mapsto", Rel, "\u{21A6}"),
    ("hookleftarrow", Rel, "\u{21A9}"),
    ("hookrightarrow", Rel, "\u{21AA}"),
    ("leftharpoonup", Rel, "\u{21BC}"),
    ("leftharpoondown", Rel, "\u{21BD}"),
    ("rightharpoonup", Rel, "\u{21C0}"),
    ("rightharpoondown", Rel, "\u{21C1}"),
    ("Leftarrow", Rel, "\u{21D0}"),
    ("Uparrow", Rel, "\u{21D1}"),
    ("Rightarrow", Rel, "\u{21D2}"),
    ("Downarrow", Rel, "\u{21D3}"),
    ("Leftrightarrow", Rel, "\u{21D4}"),
    ("Updownarrow", Rel, "\u{21D5}"),
    ("longleftarrow", Rel, "\u{27F5}"),
    ("longrightarrow", Rel, "\u{27F6}"),
    ("longleftrightarrow", Rel, "\u{27F7}"),
    ("Longleftarrow", Rel, "\u{27F8}"),
    ("Longrightarrow", Rel, "\u{27F9}"),
    ("Longleftrightarrow", Rel, "\u{27FA}"),
    ("longmapsto", Rel, "\u{27FC}"),
    // Relations
    ("leq", Rel, "\u{2264}"),
    ("geq", Rel, "\u{2265}"),
    ("neq", Rel, "\u{2260}"),
    ("in", Rel, "\u{2208}"),
    ("notin", Rel, "\u{2209}"),
    ("ni", Rel, "\u{220B}"),
    ("propto", Rel, "\u{221D}"),
    ("mid", Rel, "\u{2223}"),
    ("parallel", Rel, "\u{2225}"),
    ("sim", Rel, "\u{223C}"),
    ("simeq", Rel, "\u{2243}"),
    ("cong", Rel, "\u{2245}"),
    ("approx", Rel, "\u{2248}"),
    ("asymp", Rel, "\u{224D}"),
    ("doteq", Rel, "\u{2250}"),
    ("equiv", Rel, "\u{2261}"),
    ("ll", Rel, "\u{226A}"),
    ("gg", Rel, "\u{226B}"),
    ("prec", Rel, "\u{227A}"),
    ("succ", Rel, "\u{227B}"),
    ("subset", Rel, "\u{2282}"),
    ("supset", Rel, "\u{2283}"),
    ("subseteq", Rel, "\u{2286}"),
    ("supseteq", Rel, "\u{2287}"),
    ("sqsubset", Rel, "\u{228F}"),
    ("sqsupset", Rel, "\u{2290}"),
    ("sqsubseteq", Rel, "\u{2291}"),
    ("sqsupseteq", Rel, "\u{2292}"),
    ("models", Rel, "\u{22A7}"),
    ("vdash", Rel, "\u{22A2}"),
    ("dashv", Rel, "\u{22A3}"),
    ("bowtie", Rel, "\u{22C8}"),
    ("frown", Rel, "\u{2322}"),
    ("smile", Rel, "\u{2323}"),
    ("perp", Rel, "\u{27C2}"),
    ("preceq", Rel, "\u{2AAF}"),
    ("succeq", Rel, "\u{2AB0}"),
    // Binary operators
    ("times", Bin, "\u{00D7}"),
    ("div", Bin, "\u{00F7}"),
    ("pm", Bin, "\u{00B1}"),
    ("dagger", Bin, "\u{2020}"),
    ("ddagger", Bin, "\u{2021}"),
    ("mp", Bin, "\u{2213}"),
    ("setminus", Bin, "\u{2216}"),
    ("ast", Bin, "\u{2217}"),
    ("circ", Bin, "\u{2218}"),
    ("bullet", Bin, "\u{2219}"),
    ("wedge", Bin, "\u{2227}"),
    ("vee", Bin, "\u{2228}"),
    ("cap", Bin, "\u{2229}"),
    ("cup", Bin, "\u{222A}"),
    ("wr", Bin, "\u{2240}"),
    ("uplus", Bin, "\u{228E}"),
    ("sqcap", Bin, "\u{2293}"),
    ("sqcup", Bin, "\u{2294}"),
    ("oplus", Bin, "\u{2295}"),
    ("ominus", Bin, "\u{2296}"),
    ("otimes", Bin, "\u{2297}"),
    ("oslash", Bin, "\u{2298}"),
    ("odot", Bin, "\u{2299}"),
    ("star", Bin, "\u{22C6}"),
    ("cdot", Bin, "\u{22C5}"),
    ("amalg", Bin, "\u{2A3F}"),
    // Miscellaneous
    ("neg", Ordinary, "\u{00AC}"),
    ("degree", Ordinary, "\u{00B0}"),
    ("angstrom", Ordinary, "\u{00C5}"),
    ("|", Ordinary, "\u{2016}"),
    ("ldots", Ordinary, "\u{2026}"),
    ("prime", Ordinary, "\u{2032}"),
    ("hbar", Ordinary, "\u{210F}"),
    ("Im", Ordinary, "\u{2111}"),
    ("ell", Ordinary, "\u{2113}"),
    ("wp", Ordinary, "\u{2118}"),
    ("Re", Ordinary, "\u{211C}"),
    ("mho", Ordinary, "\u{2127}"),
    ("aleph", Ordinary, "\u{2135}"),
    ("forall", Ordinary, "\u{2200}"),
    ("exists", Ordinary, "\u{2203}"),
    ("emptyset", Ordinary, "\u{2205}"),
    ("nabla", Ordinary, "\u{2207}"),
    ("infty", Ordinary, "\u{221E}"),
    ("angle", Ordinary, "\u{2220}"),
    ("top", Ordinary, "\u{22A4}"),
    ("bot", Ordinary, "\u{22A5}"),
    ("vdots", Ordinary, "\u{22EE}"),
    ("cdots", Ordinary, "\u{22EF}"),
    ("ddots", Ordinary, "\u{22F1}"),
    ("triangle", Ordinary, "\u{25B3}"),
    ("clubsuit", Ordinary, "\u{2663}"),
    ("diamondsuit", Ordinary, "\u{2662}"),
    ("heartsuit", Ordinary, "\u{2661}"),
    ("spadesuit", Ordinary, "\u{2660}"),
    ("flat", Ordinary, "\u{266D}"),
    ("natural", Ordinary, "\u{266E}"),
    ("sharp", Ordinary, "\u{266F}"),
    ("imath", Ordinary, "\u{1D6A4}"),
    ("jmath", Ordinary, "\u{1D6A5}"),
    ("partial", Ordinary, "\u{1D715}"),
];

/// Large operators and named functions with their default limits
const BUILTIN_OPERATORS: &[(&str, &str, bool)] = &[
    ("sum", "\u{2211}", true),
    ("prod", "\u{220F}", true),
    ("coprod", "\u{2210}", true),
    ("bigcap", "\u{22C2}", true),
    ("bigcup", "\u{22C3}", true),
    ("bigvee", "\u{22C1}", true),
    ("bigwedge", "\u{22C0}", true),
    ("bigodot", "\u{2A00}", true),
    ("bigoplus", "\u{2A01}", true),
    ("bigotimes", "\u{2A02}", true),
    ("biguplus", "\u{2A04}", true),
    ("bigsqcup", "\u{2A06}", true),
    ("int", "\u{222B}", false),
    ("iint", "\u{222C}", false),
    ("iiint", "\u{222D}", false),
    ("oint", "\u{222E}", false),
    ("arccos", "arccos", false),
    ("arcsin", "arcsin", false),
    ("arctan", "arctan", false),
    ("arg", "arg", false),
    ("cos", "cos", false),
    ("cosh", "cosh", false),
    ("cot", "cot", false),
    ("coth", "coth", false),
    ("csc", "csc", false),
    ("deg", "deg", false),
    ("dim", "dim", false),
    ("exp", "exp", false),
    ("hom", "hom", false),
    ("ker", "ker", false),
    ("lg", "lg", false),
    ("ln", "ln", false),
    ("log", "log", false),
    ("sec", "sec", false),
    ("sin", "sin", false),
    ("sinh", "sinh", false),
    ("tan", "tan", false),
    ("tanh", "tanh", false),
    ("det", "det", true),
    ("gcd", "gcd", true),
    ("inf", "inf", true),
    ("lim", "lim", true),
    ("liminf", "lim inf", true),
    ("limsup", "lim sup", true),
    ("max", "max", true),
    ("min", "min", true),
    ("Pr", "Pr", true),
    ("sup", "sup", true),
];

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("lnot", "neg"),
    ("land", "wedge"),
    ("lor", "vee"),
    ("ne", "neq"),
    ("le", "leq"),
    ("ge", "geq"),
    ("lbrace", "{"),
    ("rbrace", "}"),
    ("Vert", "|"),
    ("gets", "leftarrow"),
    ("to", "rightarrow"),
    ("iff", "Longleftrightarrow"),
    ("AA", "angstrom"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_for_character_classes() {
        let cases = [
            ('(', AtomType::Open),
            (']', AtomType::Close),
            ('!', AtomType::Close),
            (';', AtomType::Punctuation),
            ('<', AtomType::Relation),
            ('*', AtomType::BinaryOperator),
            ('7', AtomType::Number),
            ('.', AtomType::Number),
            ('q', AtomType::Variable),
            ('|', AtomType::Ordinary),
            ('@', AtomType::Ordinary),
        ];
        for (ch, expected) in cases {
            assert_eq!(atom_for_character(ch).unwrap().atom_type(), expected, "{ch}");
        }
    }

    #[test]
    fn test_atom_for_character_substitutions() {
        let minus = atom_for_character('-').unwrap();
        assert_eq!(minus.nucleus, "\u{2212}");
        assert_eq!(minus.atom_type(), AtomType::BinaryOperator);
        let colon = atom_for_character(':').unwrap();
        assert_eq!(colon.nucleus, "\u{2236}");
        assert_eq!(colon.atom_type(), AtomType::Relation);
    }

    #[test]
    fn test_atom_for_character_rejects() {
        for ch in ['$', '%', '#', '&', '~', '\'', '^', '_', '{', '}', '\\', ' ', '\n', '\u{00E9}', '\u{03B1}'] {
            assert!(atom_for_character(ch).is_none(), "{ch:?}");
        }
    }

    #[test]
    fn test_symbol_lookup_and_alias() {
        let table = SymbolTable::new();
        let neq = table.atom_for_latex_symbol_name("neq").unwrap();
        let ne = table.atom_for_latex_symbol_name("ne").unwrap();
        assert_eq!(neq, ne);
        assert_eq!(table.latex_symbol_name_for_atom(&ne), Some("neq"));
        assert!(table.atom_for_latex_symbol_name("notacommand").is_none());
    }

    #[test]
    fn test_reverse_lookup_empty_nucleus() {
        let table = SymbolTable::new();
        assert!(table
            .latex_symbol_name_for_atom(&Atom::new(AtomType::Ordinary, ""))
            .is_none());
    }

    #[test]
    fn test_operators_carry_limits() {
        let table = SymbolTable::new();
        let sum = table.atom_for_latex_symbol_name("sum").unwrap();
        assert!(matches!(sum.kind, AtomKind::LargeOperator { limits: true }));
        let sin = table.atom_for_latex_symbol_name("sin").unwrap();
        assert!(matches!(sin.kind, AtomKind::LargeOperator { limits: false }));
        assert_eq!(sin.nucleus, "sin");
        assert!(matches!(operator("foo").kind, AtomKind::LargeOperator { limits: false }));
    }

    #[test]
    fn test_add_symbol_overrides_reverse() {
        let mut table = SymbolTable::new();
        table.add_latex_symbol("lcm", operator_with_name("lcm", false));
        assert!(table.atom_for_latex_symbol_name("lcm").is_some());

        table.add_latex_symbol("notequal", Atom::new(AtomType::Relation, "\u{2260}"));
        let atom = table.atom_for_latex_symbol_name("neq").unwrap();
        assert_eq!(table.latex_symbol_name_for_atom(&atom), Some("notequal"));
    }

    #[test]
    fn test_reverse_lookup_matches_type() {
        let mut table = SymbolTable::empty();
        table.add_latex_symbol("snowrel", Atom::new(AtomType::Relation, "\u{2603}"));
        let ordinary = Atom::new(AtomType::Ordinary, "\u{2603}");
        assert!(table.latex_symbol_name_for_atom(&ordinary).is_none());
        let relation = Atom::new(AtomType::Relation, "\u{2603}");
        assert_eq!(table.latex_symbol_name_for_atom(&relation), Some("snowrel"));
        assert_eq!(
            table.atom_for_nucleus("\u{2603}").map(|a| a.atom_type()),
            Some(AtomType::Relation)
        );

        // a reclassified binary operator keeps its name
        let table = SymbolTable::new();
        let mut pm = table.atom_for_latex_symbol_name("pm").unwrap();
        pm.set_atom_type(AtomType::UnaryOperator);
        assert_eq!(table.latex_symbol_name_for_atom(&pm), Some("pm"));
    }

    #[test]
    fn test_replaced_symbol_drops_stale_name() {
        let mut table = SymbolTable::empty();
        table.add_latex_symbol("snow", Atom::new(AtomType::Ordinary, "\u{2603}"));
        table.add_latex_symbol("snow", Atom::new(AtomType::Ordinary, "\u{2744}"));
        assert!(table
            .latex_symbol_name_for_atom(&Atom::new(AtomType::Ordinary, "\u{2603}"))
            .is_none());
        assert!(table.atom_for_nucleus("\u{2603}").is_none());
        assert_eq!(
            table.latex_symbol_name_for_atom(&Atom::new(AtomType::Ordinary, "\u{2744}")),
            Some("snow")
        );
    }

    #[test]
    fn test_isolated_tables() {
        let mut empty = SymbolTable::empty();
        assert!(empty.atom_for_latex_symbol_name("alpha").is_none());
        empty.add_latex_symbol("alpha", Atom::new(AtomType::Variable, "a"));
        assert!(empty.atom_for_latex_symbol_name("alpha").is_some());
        assert_eq!(
            SymbolTable::new().atom_for_latex_symbol_name("alpha").unwrap().nucleus,
            "\u{03B1}"
        );
    }

    #[test]
    fn test_global_table() {
        add_latex_symbol("texmathtestsymbol", Atom::new(AtomType::Ordinary, "\u{2603}"));
        let atom = atom_for_latex_symbol_name("texmathtestsymbol").unwrap();
        assert_eq!(
            latex_symbol_name_for_atom(&atom).as_deref(),
            Some("texmathtestsymbol")
        );
    }

    #[test]
    fn test_delimiters_shortest_name() {
        let langle = boundary_atom_for_delimiter_name("langle").unwrap();
        assert_eq!(langle.atom_type(), AtomType::Boundary);
        assert_eq!(langle.nucleus, "\u{2329}");
        assert_eq!(delimiter_name_for_boundary_atom(&langle), Some("<"));

        let vert = boundary_atom_for_delimiter_name("Vert").unwrap();
        assert_eq!(delimiter_name_for_boundary_atom(&vert), Some("||"));

        let backslash = boundary_atom_for_delimiter_name("backslash").unwrap();
        assert_eq!(delimiter_name_for_boundary_atom(&backslash), Some("\\"));

        let none = boundary_atom_for_delimiter_name(".").unwrap();
        assert_eq!(none.nucleus, "");
        assert_eq!(delimiter_name_for_boundary_atom(&none), Some("."));
        assert!(boundary_atom_for_delimiter_name("foo").is_none());
    }

    #[test]
    fn test_accents() {
        let hat = accent_with_name("widehat").unwrap();
        assert_eq!(hat.atom_type(), AtomType::Accent);
        assert_eq!(accent_name(&hat), Some("hat"));
        assert_eq!(accent_name(&accent_with_name("vec").unwrap()), Some("vec"));
        assert!(accent_with_name("nope").is_none());
    }

    #[test]
    fn test_font_styles() {
        assert_eq!(font_style_with_name("bf"), Some(FontStyle::Bold));
        assert_eq!(font_style_with_name("text"), Some(FontStyle::Roman));
        assert_eq!(font_style_with_name("bm"), Some(FontStyle::BoldItalic));
        assert_eq!(font_name_for_style(FontStyle::Bold), "mathbf");
        assert_eq!(font_name_for_style(FontStyle::BoldItalic), "bm");
        for &(_, style) in FONT_STYLES {
            let name = font_name_for_style(style);
            assert_eq!(font_style_with_name(name), Some(style));
        }
    }

    #[test]
    fn test_space_and_style_names() {
        assert_eq!(space_name(4.0), Some(":"));
        assert_eq!(space_name(18.0), Some("quad"));
        assert_eq!(space_name(7.0), None);
        assert_eq!(style_name(LineStyle::Script), "scriptstyle");
    }

    #[test]
    fn test_convenience_constructors() {
        assert_eq!(times().nucleus, "\u{00D7}");
        assert_eq!(divide().atom_type(), AtomType::BinaryOperator);
        let AtomKind::Radical(radical) = placeholder_radical().kind else {
            panic!("Expected radical");
        };
        assert!(radical.degree.is_some());
        let AtomKind::Fraction(frac) = fraction_with_strings("1", "x+2").kind else {
            panic!("Expected fraction");
        };
        assert!(frac.has_rule);
        assert_eq!(frac.denominator.len(), 3);
        assert_eq!(math_list_for_characters("a b$").len(), 2);
        let AtomKind::Fraction(frac) = placeholder_fraction().kind else {
            panic!("Expected fraction");
        };
        assert_eq!(frac.numerator.atoms(), &[placeholder()]);
        assert_eq!(frac.denominator.atoms(), &[placeholder()]);
    }

    fn cells(shape: &[usize]) -> Vec<Vec<MathList>> {
        shape
            .iter()
            .map(|&n| (0..n).map(|_| math_list_for_characters("x")).collect())
            .collect()
    }

    #[test]
    fn test_pmatrix_wrapped_in_inner() {
        let atom = table_with_environment(Some("pmatrix"), cells(&[2, 2])).unwrap();
        let AtomKind::Inner(inner) = &atom.kind else {
            panic!("Expected inner");
        };
        assert_eq!(inner.left_boundary.as_ref().unwrap().nucleus, "(");
        assert_eq!(inner.right_boundary.as_ref().unwrap().nucleus, ")");
        let AtomKind::Table(table) = &inner.inner_list.atoms()[0].kind else {
            panic!("Expected table");
        };
        assert_eq!(table.environment.as_deref(), Some("matrix"));
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.inter_column_spacing, 18.0);
        let first = table.cell(0, 0).unwrap();
        assert_eq!(first.atoms()[0].atom_type(), AtomType::Style);
    }

    #[test]
    fn test_plain_matrix_not_wrapped() {
        let atom = table_with_environment(Some("matrix"), cells(&[1, 1])).unwrap();
        assert_eq!(atom.atom_type(), AtomType::Table);
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let err = table_with_environment(Some("pmatrix"), cells(&[2, 1])).unwrap_err();
        assert!(matches!(err, TableError::RaggedRows { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_matrix_style_in_every_cell() {
        let atom = table_with_environment(Some("bmatrix"), cells(&[3, 3])).unwrap();
        let AtomKind::Inner(inner) = &atom.kind else {
            panic!("Expected inner");
        };
        let AtomKind::Table(table) = &inner.inner_list.atoms()[0].kind else {
            panic!("Expected table");
        };
        for row in table.cells() {
            for cell in row {
                assert_eq!(cell.len(), 2);
                assert_eq!(cell.atoms()[0].kind, AtomKind::Style { style: LineStyle::Text });
            }
        }
    }

    #[test]
    fn test_boundary_cells_are_reported() {
        let boundary = Atom::new(AtomType::Boundary, "(");
        assert_eq!(
            wrap_in_inner(vec![boundary.clone()], "(", ")").unwrap_err(),
            TableError::Cell(crate::error::EditError::BoundaryAtom)
        );

        let mut table = Table::new(None);
        table.set_cell(0, 0, math_list_for_characters("x"));
        assert!(insert_in_cells(&mut table, &boundary).is_err());
        assert_eq!(table.cell(0, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_aligned_columns() {
        let atom = table_with_environment(Some("aligned"), cells(&[2, 2])).unwrap();
        let AtomKind::Table(table) = &atom.kind else {
            panic!("Expected table");
        };
        assert_eq!(table.alignment(0), ColumnAlignment::Right);
        assert_eq!(table.alignment(1), ColumnAlignment::Left);
        let spacer = &table.cell(1, 1).unwrap().atoms()[0];
        assert_eq!(spacer.atom_type(), AtomType::Ordinary);
        assert!(spacer.nucleus.is_empty());

        let err = table_with_environment(Some("split"), cells(&[3])).unwrap_err();
        assert_eq!(
            err,
            TableError::InvalidNumColumns {
                env: "split".to_string(),
                expected: 2
            }
        );
    }

    #[test]
    fn test_cases_environment() {
        let atom = table_with_environment(Some("cases"), cells(&[2, 2])).unwrap();
        let AtomKind::Inner(inner) = &atom.kind else {
            panic!("Expected inner");
        };
        assert_eq!(inner.left_boundary.as_ref().unwrap().nucleus, "{");
        assert_eq!(inner.right_boundary.as_ref().unwrap().nucleus, "");
        assert_eq!(inner.inner_list.atoms()[0].atom_type(), AtomType::Space);
        assert_eq!(inner.inner_list.atoms()[1].atom_type(), AtomType::Table);
    }

    #[test]
    fn test_implicit_environment() {
        let atom = table_with_environment(None, cells(&[2, 3])).unwrap();
        let AtomKind::Table(table) = &atom.kind else {
            panic!("Expected table");
        };
        assert_eq!(table.num_columns(), 3);
        assert_eq!(table.alignment(2), ColumnAlignment::Left);
        assert_eq!(table.inter_row_additional_spacing, 1.0);
    }

    #[test]
    fn test_other_environments() {
        assert!(table_with_environment(Some("gather"), cells(&[1, 1])).is_ok());
        assert!(table_with_environment(Some("eqnarray"), cells(&[3])).is_ok());
        assert!(table_with_environment(Some("eqnarray"), cells(&[2])).is_err());
        assert_eq!(
            table_with_environment(Some("tabular"), cells(&[1])).unwrap_err(),
            TableError::UnknownEnvironment("tabular".to_string())
        );
    }
}
