//! LaTeX Writer - Serialize math lists back to LaTeX
//!
//! The output parses back into an equivalent list: font styles become
//! `\mathxx{...}` runs, scripts are always braced, and commands are
//! followed by a space so they never run into the next letter.

use crate::factory::{self, SymbolTable};
use crate::model::*;

/// Environments that wrap a `matrix` table in delimiters
const MATRIX_DELIMITERS: &[(&str, &str, &str)] = &[
    ("(", ")", "pmatrix"),
    ("[", "]", "bmatrix"),
    ("{", "}", "Bmatrix"),
    ("|", "|", "vmatrix"),
    ("\u{2016}", "\u{2016}", "Vmatrix"),
];

/// Writer for converting math lists to LaTeX
pub struct Unparser<'a> {
    symbols: &'a SymbolTable,
    out: String,
}

impl<'a> Unparser<'a> {
    /// Create a writer resolving command names against `symbols`
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            out: String::new(),
        }
    }

    /// Write a list and return the LaTeX
    pub fn write(mut self, list: &MathList) -> String {
        self.write_list(list);
        self.out
    }

    fn write_list(&mut self, list: &MathList) {
        self.write_atoms(list.atoms());
    }

    fn write_atoms(&mut self, atoms: &[Atom]) {
        let mut font_style = FontStyle::Default;
        for atom in atoms {
            if atom.font_style != font_style {
                if font_style != FontStyle::Default {
                    self.out.push('}');
                }
                if atom.font_style != FontStyle::Default {
                    self.out
                        .push_str(&format!("\\{}{{", factory::font_name_for_style(atom.font_style)));
                }
                font_style = atom.font_style;
            }
            self.write_body(atom);
            // scripts carry their own styles, so they go outside the run
            if font_style != FontStyle::Default && atom.has_scripts() {
                self.out.push('}');
                font_style = FontStyle::Default;
            }
            self.write_scripts(atom);
        }
        if font_style != FontStyle::Default {
            self.out.push('}');
        }
    }

    fn write_group(&mut self, list: &MathList) {
        self.out.push('{');
        self.write_list(list);
        self.out.push('}');
    }

    fn write_body(&mut self, atom: &Atom) {
        match &atom.kind {
            AtomKind::Plain => self.write_nucleus(atom),
            AtomKind::LargeOperator { limits } => self.write_large_operator(atom, *limits),
            AtomKind::Fraction(fraction) => self.write_fraction(fraction),
            AtomKind::Radical(radical) => {
                self.out.push_str("\\sqrt");
                if let Some(degree) = &radical.degree {
                    self.out.push('[');
                    self.write_list(degree);
                    self.out.push(']');
                }
                self.write_group(&radical.radicand);
            }
            AtomKind::Inner(inner) => self.write_inner(inner),
            AtomKind::Underline { inner_list } => {
                self.out.push_str("\\underline");
                self.write_group(inner_list);
            }
            AtomKind::Overline { inner_list } => {
                self.out.push_str("\\overline");
                self.write_group(inner_list);
            }
            AtomKind::Accent { inner_list } => {
                if let Some(name) = factory::accent_name(atom) {
                    self.out.push_str(&format!("\\{}", name));
                }
                self.write_group(inner_list);
            }
            AtomKind::Space { space } => match factory::space_name(*space) {
                Some(name) => self.out.push_str(&format!("\\{} ", name)),
                None => self.out.push_str(&format!("\\mkern{}mu", space)),
            },
            AtomKind::Style { style } => {
                self.out.push_str(&format!("\\{} ", factory::style_name(*style)));
            }
            AtomKind::Color { color, inner_list } => {
                self.out.push_str(&format!("\\color{{{}}}", color));
                self.write_group(inner_list);
            }
            AtomKind::Colorbox { color, inner_list } => {
                self.out.push_str(&format!("\\colorbox{{{}}}", color));
                self.write_group(inner_list);
            }
            AtomKind::Table(table) => self.write_table(table, table.environment.as_deref()),
        }
    }

    fn write_scripts(&mut self, atom: &Atom) {
        if let Some(superscript) = atom.superscript() {
            self.out.push('^');
            self.write_group(superscript);
        }
        if let Some(subscript) = atom.subscript() {
            self.out.push('_');
            self.write_group(subscript);
        }
    }

    fn write_nucleus(&mut self, atom: &Atom) {
        match atom.nucleus.as_str() {
            "" => self.out.push_str("{}"),
            "\u{2236}" => self.out.push(':'),
            "\u{2212}" => self.out.push('-'),
            nucleus => match self.symbols.latex_symbol_name_for_atom(atom) {
                Some(name) => self.out.push_str(&format!("\\{} ", name)),
                None => self.out.push_str(nucleus),
            },
        }
    }

    fn write_large_operator(&mut self, atom: &Atom, limits: bool) {
        let name = self.symbols.latex_symbol_name_for_atom(atom);
        let default_limits = name
            .and_then(|name| self.symbols.atom_for_latex_symbol_name(name))
            .map_or(false, |op| matches!(op.kind, AtomKind::LargeOperator { limits: true }));
        match name {
            Some(name) => self.out.push_str(&format!("\\{} ", name)),
            None => self
                .out
                .push_str(&format!("\\operatorname{{{}}}", atom.nucleus)),
        }
        if limits != default_limits {
            self.out
                .push_str(if limits { "\\limits " } else { "\\nolimits " });
        }
    }

    fn write_fraction(&mut self, fraction: &Fraction) {
        if fraction.has_rule {
            self.out.push_str("\\frac");
            self.write_group(&fraction.numerator);
            self.write_group(&fraction.denominator);
            return;
        }

        let command = match (
            fraction.left_delimiter.as_deref(),
            fraction.right_delimiter.as_deref(),
        ) {
            (None, None) => "atop".to_string(),
            (Some("("), Some(")")) => "choose".to_string(),
            (Some("["), Some("]")) => "brack".to_string(),
            (Some("{"), Some("}")) => "brace".to_string(),
            (left, right) => format!(
                "atopwithdelims{}{}",
                delimiter_token(left.unwrap_or(".")),
                delimiter_token(right.unwrap_or("."))
            ),
        };
        self.out.push('{');
        self.write_list(&fraction.numerator);
        self.out.push_str(&format!(" \\{} ", command));
        self.write_list(&fraction.denominator);
        self.out.push('}');
    }

    fn write_inner(&mut self, inner: &Inner) {
        if let Some(env) = self.wrapped_environment(inner) {
            if let Some(table) = inner.inner_list.atoms().iter().find_map(|atom| match &atom.kind {
                AtomKind::Table(table) => Some(table),
                _ => None,
            }) {
                self.write_table(table, Some(env));
                return;
            }
        }

        if inner.left_boundary.is_none() && inner.right_boundary.is_none() {
            self.write_group(&inner.inner_list);
            return;
        }
        let left = boundary_name(inner.left_boundary.as_deref());
        let right = boundary_name(inner.right_boundary.as_deref());
        self.out.push_str(&format!("\\left{} ", delimiter_token(left)));
        self.write_list(&inner.inner_list);
        self.out.push_str(&format!("\\right{} ", delimiter_token(right)));
    }

    /// The environment that builds exactly this inner atom, if any
    fn wrapped_environment(&self, inner: &Inner) -> Option<&'static str> {
        let left = inner.left_boundary.as_deref()?.nucleus.as_str();
        let right = inner.right_boundary.as_deref()?.nucleus.as_str();
        let table_env = |atom: &Atom| match &atom.kind {
            AtomKind::Table(table) if !atom.has_scripts() => table.environment.clone(),
            _ => None,
        };

        match inner.inner_list.atoms() {
            [space, table]
                if left == "{"
                    && right.is_empty()
                    && matches!(space.kind, AtomKind::Space { space: width } if width == 3.0)
                    && table_env(table).as_deref() == Some("cases") =>
            {
                Some("cases")
            }
            [table] if table_env(table).as_deref() == Some("matrix") => MATRIX_DELIMITERS
                .iter()
                .find(|(l, r, _)| *l == left && *r == right)
                .map(|&(_, _, env)| env),
            _ => None,
        }
    }

    /// `env` names the environment to write, which differs from the
    /// table's own for the delimited matrix forms
    fn write_table(&mut self, table: &Table, env: Option<&str>) {
        if let Some(env) = env {
            self.out.push_str(&format!("\\begin{{{}}}", env));
        }
        let strips_style = matches!(table.environment.as_deref(), Some("matrix" | "cases"));
        let strips_spacer = matches!(env, Some("eqalign" | "split" | "aligned"));

        let rows = table.cells();
        for (i, row) in rows.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                let atoms = cell.atoms();
                let skip = match atoms.first() {
                    Some(first) if strips_style && first.atom_type() == AtomType::Style => 1,
                    Some(first)
                        if strips_spacer
                            && j == 1
                            && first.atom_type() == AtomType::Ordinary
                            && first.nucleus.is_empty()
                            && !first.has_scripts() =>
                    {
                        1
                    }
                    _ => 0,
                };
                self.write_atoms(&atoms[skip..]);
                if j + 1 < row.len() {
                    self.out.push('&');
                }
            }
            if i + 1 < rows.len() {
                self.out.push_str("\\\\ ");
            }
        }
        // a lone cell needs a row break to parse back into a table
        if env.is_none() && rows.len() == 1 && table.num_columns() <= 1 {
            self.out.push_str("\\\\ ");
        }

        if let Some(env) = env {
            self.out.push_str(&format!("\\end{{{}}}", env));
        }
    }
}

fn boundary_name(boundary: Option<&Atom>) -> &'static str {
    boundary
        .and_then(factory::delimiter_name_for_boundary_atom)
        .unwrap_or(".")
}

/// The characters `\left` needs to read back the delimiter `name`
fn delimiter_token(name: &str) -> String {
    match name {
        "||" => "\\|".to_string(),
        "\\" => "\\\\".to_string(),
        _ if name.chars().count() == 1 => name.to_string(),
        _ => format!("\\{}", name),
    }
}

/// Convert a math list to LaTeX using the process-wide symbol table
pub fn math_list_to_string(list: &MathList) -> String {
    let symbols = factory::read_symbols();
    Unparser::new(&symbols).write(list)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::try_build_from_string;

    fn roundtrip(input: &str) -> String {
        math_list_to_string(&try_build_from_string(input).unwrap())
    }

    fn assert_reparses(input: &str) {
        let parsed = try_build_from_string(input).unwrap().finalized();
        let latex = math_list_to_string(&parsed);
        let reparsed = try_build_from_string(&latex).unwrap().finalized();
        assert_eq!(parsed, reparsed, "{} -> {}", input, latex);
    }

    #[test]
    fn test_write_simple() {
        assert_eq!(roundtrip("x+2"), "x+2");
        assert_eq!(roundtrip("a-b"), "a-b");
        assert_eq!(roundtrip("x:y"), "x:y");
    }

    #[test]
    fn test_write_commands_with_space() {
        assert_eq!(roundtrip("\\alpha\\beta"), "\\alpha \\beta ");
        assert_eq!(roundtrip("\\neq"), "\\neq ");
        assert_eq!(roundtrip("\\ne"), "\\neq ");
    }

    #[test]
    fn test_write_scripts() {
        assert_eq!(roundtrip("x^2_3"), "x^{2}_{3}");
        assert_eq!(roundtrip("^2"), "{}^{2}");
    }

    #[test]
    fn test_write_fractions() {
        assert_eq!(roundtrip("\\frac12"), "\\frac{1}{2}");
        assert_eq!(roundtrip("\\binom{n}{k}"), "{n \\choose k}");
        assert_eq!(roundtrip("a\\atop b"), "{a \\atop b}");
        assert_eq!(roundtrip("{a\\brack b}"), "{a \\brack b}");
        assert_eq!(
            roundtrip("{a \\atopwithdelims\\langle\\rangle b}"),
            "{a \\atopwithdelims<> b}"
        );
    }

    #[test]
    fn test_write_radicals() {
        assert_eq!(roundtrip("\\sqrt2"), "\\sqrt{2}");
        assert_eq!(roundtrip("\\sqrt[3]{x}"), "\\sqrt[3]{x}");
    }

    #[test]
    fn test_write_left_right() {
        assert_eq!(roundtrip("\\left(x\\right)"), "\\left( x\\right) ");
        assert_eq!(roundtrip("\\left\\{x\\right."), "\\left{ x\\right. ");
        assert_eq!(roundtrip("\\left\\lgroup x\\right\\|"), "\\left\\lgroup x\\right\\| ");
    }

    #[test]
    fn test_write_large_operators() {
        assert_eq!(roundtrip("\\sum_{i}"), "\\sum _{i}");
        assert_eq!(roundtrip("\\sum\\nolimits"), "\\sum \\nolimits ");
        assert_eq!(roundtrip("\\int\\limits"), "\\int \\limits ");
        assert_eq!(roundtrip("\\operatorname{lcm}"), "\\operatorname{lcm}");
    }

    #[test]
    fn test_write_font_styles() {
        assert_eq!(roundtrip("\\mathbf{xy}z"), "\\mathbf{xy}z");
        assert_eq!(roundtrip("\\bf x"), "\\mathbf{x}");
        assert_eq!(roundtrip("\\text{a b}"), "\\mathrm{a\\  b}");
    }

    #[test]
    fn test_scripts_leave_font_runs() {
        assert_eq!(roundtrip("\\mathbf{x}^2"), "\\mathbf{x}^{2}");
        assert_eq!(roundtrip("\\mathbf{x}_1+\\mathbf{y}^2"), "\\mathbf{x}_{1}+\\mathbf{y}^{2}");
        assert_eq!(roundtrip("\\mathbf{12}^2"), "\\mathbf{12}^{2}");
        assert_eq!(roundtrip("\\text{a}_b"), "\\mathrm{a}_{b}");
        assert_eq!(roundtrip("\\mathbf{x^{2}y}"), "\\mathbf{x}^{\\mathbf{2}}\\mathbf{y}");
        for input in [
            "\\mathbf{x}^2",
            "\\mathbf{x}_1+\\mathbf{y}^2",
            "\\mathbf{12}^2",
            "\\text{a}_b",
            "\\mathcal{F}_{n}^{2}x",
        ] {
            assert_reparses(input);
        }
    }

    #[test]
    fn test_write_spaces_and_styles() {
        assert_eq!(roundtrip("a\\quad b"), "a\\quad b");
        assert_eq!(roundtrip("\\>"), "\\: ");
        assert_eq!(roundtrip("\\mkern2.5mu"), "\\mkern2.5mu");
        assert_eq!(roundtrip("\\displaystyle x"), "\\displaystyle x");
    }

    #[test]
    fn test_write_decorations() {
        assert_eq!(roundtrip("\\hat x"), "\\hat{x}");
        assert_eq!(roundtrip("\\widehat{x}"), "\\hat{x}");
        assert_eq!(roundtrip("\\overline{ab}"), "\\overline{ab}");
        assert_eq!(roundtrip("\\color{red}{x}"), "\\color{red}{x}");
        assert_eq!(roundtrip("\\colorbox{#ffff00}{x}"), "\\colorbox{#ffff00}{x}");
    }

    #[test]
    fn test_write_environments() {
        assert_eq!(
            roundtrip("\\begin{pmatrix}1&2\\\\3&4\\end{pmatrix}"),
            "\\begin{pmatrix}1&2\\\\ 3&4\\end{pmatrix}"
        );
        assert_eq!(
            roundtrip("\\begin{aligned}x&=1\\end{aligned}"),
            "\\begin{aligned}x&=1\\end{aligned}"
        );
        assert_eq!(
            roundtrip("\\begin{cases}1&x\\\\0&y\\end{cases}"),
            "\\begin{cases}1&x\\\\ 0&y\\end{cases}"
        );
        assert_eq!(roundtrip("a&b\\\\c&d"), "a&b\\\\ c&d");
    }

    #[test]
    fn test_reparse_equivalence() {
        let inputs = [
            "12+x^2",
            "-3\\cdot 4",
            "\\frac{a}{b}+\\sqrt[3]{x}",
            "\\left(\\frac{1}{2}\\right)^2",
            "\\sum\\limits_{i=0}^{n}i",
            "\\lim_{x\\to\\infty}\\frac{1}{x}",
            "\\mathbf{v}\\cdot\\mathcal{F}",
            "\\text{if } x \\ge 0",
            "\\begin{bmatrix}a&b\\\\c&d\\end{bmatrix}",
            "\\begin{vmatrix}a&b\\\\c&d\\end{vmatrix}",
            "\\begin{Vmatrix}a\\end{Vmatrix}",
            "\\begin{cases}1&x>0\\\\-1&x<0\\end{cases}",
            "\\begin{eqnarray}a&=&b\\end{eqnarray}",
            "x\\\\",
            "{n \\choose k}{a \\brace b}",
            "\\color{#ff0000}{x}\\colorbox{blue}{y}",
            "\\underline{x}\\vec{v}\\mkern-1.5mu",
            "\\left\\langle x\\right|",
            "\\mathbf{x^{2}}",
            "\\operatorname{lcm}\\limits_{n}",
        ];
        for input in inputs {
            assert_reparses(input);
        }
    }

    #[test]
    fn test_custom_symbol_table() {
        let mut symbols = SymbolTable::empty();
        symbols.add_latex_symbol("snowman", Atom::new(AtomType::Ordinary, "\u{2603}"));
        let list = MathList::from_atoms(vec![Atom::new(AtomType::Ordinary, "\u{2603}")]).unwrap();
        assert_eq!(Unparser::new(&symbols).write(&list), "\\snowman ");
        assert_eq!(Unparser::new(&SymbolTable::empty()).write(&list), "\u{2603}");
    }
}
