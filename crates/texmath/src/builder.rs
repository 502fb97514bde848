//! LaTeX Builder - Parse LaTeX math into math lists
//!
//! A [`Builder`] walks one input string character by character and builds
//! the math list it describes. Braces group without creating atoms, `^` and
//! `_` attach to the previous atom, and commands resolve against a
//! [`SymbolTable`] before falling back to the structural commands
//! (`\frac`, `\sqrt`, `\left`, `\begin` ...). Parsing stops at the first
//! error.

use crate::error::{ParseError, ParseErrorKind, TableError};
use crate::factory::{self, SymbolTable};
use crate::model::*;

/// Commands made of a single non-letter character
const SINGLE_CHAR_COMMANDS: &[char] = &[
    '{', '}', '$', '#', '%', '_', '|', ' ', ',', '>', ';', '!', '\\', ':', '&',
];

/// Commands that end the list being built
const STOP_COMMANDS: &[&str] = &[
    "right",
    "over",
    "atop",
    "choose",
    "brack",
    "brace",
    "atopwithdelims",
    "\\",
    "cr",
    "end",
];

/// State of the environment currently being parsed
#[derive(Debug)]
struct Environment {
    /// `None` for the implicit table started by `&` or `\\`
    name: Option<String>,
    ended: bool,
    num_rows: usize,
}

/// Single-use LaTeX parser
pub struct Builder<'a> {
    chars: Vec<char>,
    position: usize,
    symbols: &'a SymbolTable,
    font_style: FontStyle,
    spaces_allowed: bool,
    /// Right boundaries of the open `\left` groups, innermost last
    open_lefts: Vec<Option<Atom>>,
    environment: Option<Environment>,
}

impl<'a> Builder<'a> {
    /// Create a parser for `input` resolving commands against `symbols`
    pub fn new(input: &str, symbols: &'a SymbolTable) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
            symbols,
            font_style: FontStyle::Default,
            spaces_allowed: false,
            open_lefts: Vec::new(),
            environment: None,
        }
    }

    /// Parse the whole input
    pub fn build(mut self) -> Result<MathList, ParseError> {
        let result = self.build_internal(false, None).and_then(|list| {
            if self.has_characters() {
                Err(error(ParseErrorKind::MismatchBraces, "Mismatched braces."))
            } else {
                Ok(list)
            }
        });
        if let Err(err) = &result {
            tracing::debug!(kind = ?err.kind, message = %err.message, "latex parse failed");
        }
        result
    }

    // -------------------------------------------------------------------------
    // Character access
    // -------------------------------------------------------------------------

    fn has_characters(&self) -> bool {
        self.position < self.chars.len()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.chars.get(self.position).copied()?;
        self.position += 1;
        Some(ch)
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn unlook(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    /// Skip spaces and anything outside printable ASCII
    fn skip_spaces(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ('\u{21}'..='\u{7E}').contains(&ch) {
                return;
            }
            self.position += 1;
        }
    }

    fn expect_character(&mut self, expected: char) -> bool {
        self.skip_spaces();
        if self.peek_char() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn read_string(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek_char().filter(char::is_ascii_alphabetic) {
            text.push(ch);
            self.position += 1;
        }
        text
    }

    /// Read the name following a backslash
    fn read_command(&mut self) -> String {
        match self.peek_char() {
            Some(ch) if SINGLE_CHAR_COMMANDS.contains(&ch) => {
                self.position += 1;
                ch.to_string()
            }
            _ => self.read_string(),
        }
    }

    /// Read `{name}`
    fn read_braced_name(&mut self) -> Result<String, ParseError> {
        if !self.expect_character('{') {
            return Err(error(ParseErrorKind::CharacterNotFound, "Missing {"));
        }
        self.skip_spaces();
        let name = self.read_string();
        if !self.expect_character('}') {
            return Err(error(ParseErrorKind::CharacterNotFound, "Missing }"));
        }
        Ok(name)
    }

    fn read_environment(&mut self) -> Result<String, ParseError> {
        let name = self.read_braced_name()?;
        if name.is_empty() {
            return Err(error(ParseErrorKind::MissingEnv, "Missing environment name"));
        }
        Ok(name)
    }

    /// Read `{color}`, a `#RRGGBB` value or a color name
    fn read_color(&mut self) -> Result<String, ParseError> {
        if !self.expect_character('{') {
            return Err(error(ParseErrorKind::CharacterNotFound, "Missing {"));
        }
        self.skip_spaces();
        let mut color = String::new();
        while let Some(ch) = self
            .peek_char()
            .filter(|c| *c == '#' || c.is_ascii_alphanumeric())
        {
            color.push(ch);
            self.position += 1;
        }
        if !self.expect_character('}') {
            return Err(error(ParseErrorKind::CharacterNotFound, "Missing }"));
        }
        Ok(color)
    }

    fn read_delimiter(&mut self) -> Option<String> {
        self.skip_spaces();
        let ch = self.next_char()?;
        if ch == '\\' {
            let command = self.read_command();
            if command == "|" {
                return Some("||".to_string());
            }
            return Some(command);
        }
        Some(ch.to_string())
    }

    fn boundary_atom(&mut self, delimiter_type: &str) -> Result<Atom, ParseError> {
        let Some(name) = self.read_delimiter() else {
            return Err(error(
                ParseErrorKind::MissingDelimiter,
                format!("Missing delimiter for \\{}", delimiter_type),
            ));
        };
        factory::boundary_atom_for_delimiter_name(&name).ok_or_else(|| {
            error(
                ParseErrorKind::InvalidDelimiter,
                format!("Invalid delimiter for \\{}: {}", delimiter_type, name),
            )
        })
    }

    /// Read the amount of `\mkern<amount>mu`
    fn read_kern(&mut self) -> Result<f32, ParseError> {
        self.skip_spaces();
        let mut number = String::new();
        while let Some(ch) = self
            .peek_char()
            .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
        {
            number.push(ch);
            self.position += 1;
        }
        let amount = number.parse::<f32>().map_err(|_| {
            error(
                ParseErrorKind::InvalidCommand,
                format!("Invalid amount for \\mkern: {}", number),
            )
        })?;
        for expected in ['m', 'u'] {
            if self.next_char() != Some(expected) {
                return Err(error(ParseErrorKind::CharacterNotFound, "Missing mu"));
            }
        }
        Ok(amount)
    }

    // -------------------------------------------------------------------------
    // Lists
    // -------------------------------------------------------------------------

    /// Build atoms until the input ends, `stop` is read, or a stop command
    /// ends the list. With `one_char_only` a single atom (or group) is read.
    fn build_internal(&mut self, one_char_only: bool, stop: Option<char>) -> Result<MathList, ParseError> {
        let mut list = MathList::new();
        // whether the last atom of `list` can take scripts from `^` and `_`
        let mut has_prev = false;

        while let Some(ch) = self.next_char() {
            if one_char_only && matches!(ch, '^' | '}' | '_' | '&') {
                self.unlook();
                return Ok(list);
            }
            if stop == Some(ch) {
                return Ok(list);
            }

            let atom = match ch {
                '^' | '_' => {
                    let superscript = ch == '^';
                    let needs_placeholder = !has_prev
                        || list.last().map_or(true, |prev| {
                            !prev.scripts_allowed()
                                || if superscript {
                                    prev.superscript().is_some()
                                } else {
                                    prev.subscript().is_some()
                                }
                        });
                    if needs_placeholder {
                        list.add_atom(Atom::new(AtomType::Placeholder, ""))
                            .map_err(internal_error)?;
                    }
                    let script = self.build_internal(true, None)?;
                    let last = list.len() - 1;
                    if let Some(prev) = list.atom_mut(last) {
                        let result = if superscript {
                            prev.set_superscript(Some(script))
                        } else {
                            prev.set_subscript(Some(script))
                        };
                        result.map_err(internal_error)?;
                    }
                    has_prev = true;
                    continue;
                }
                '{' => {
                    let sublist = self.build_internal(false, Some('}'))?;
                    has_prev = !sublist.is_empty();
                    list.append(sublist);
                    if one_char_only {
                        return Ok(list);
                    }
                    continue;
                }
                '}' => {
                    return Err(error(ParseErrorKind::MismatchBraces, "Mismatched braces."));
                }
                '\\' => {
                    let command = self.read_command();
                    if STOP_COMMANDS.contains(&command.as_str()) {
                        return self.stop_command(&command, list, stop);
                    }

                    if command == "limits" || command == "nolimits" {
                        let limits = command == "limits";
                        let last = list.len().wrapping_sub(1);
                        let op = if has_prev { list.atom_mut(last) } else { None };
                        match op.map(|atom| &mut atom.kind) {
                            Some(AtomKind::LargeOperator { limits: current }) => *current = limits,
                            _ => {
                                let message = if limits {
                                    "Limits can only be applied to an operator."
                                } else {
                                    "No limits can only be applied to an operator."
                                };
                                return Err(error(ParseErrorKind::InvalidLimits, message));
                            }
                        }
                        continue;
                    }

                    if let Some(font_style) = factory::font_style_with_name(&command) {
                        let old_spaces_allowed = self.spaces_allowed;
                        self.spaces_allowed = command == "text";
                        let old_font_style = std::mem::replace(&mut self.font_style, font_style);
                        let sublist = self.build_internal(true, None);
                        self.font_style = old_font_style;
                        self.spaces_allowed = old_spaces_allowed;

                        let sublist = sublist?;
                        has_prev = !sublist.is_empty();
                        list.append(sublist);
                        if one_char_only {
                            return Ok(list);
                        }
                        continue;
                    }

                    self.atom_for_command(&command)?
                }
                '&' => {
                    if self.environment.is_some() {
                        return Ok(list);
                    }
                    let table = self.build_table(None, Some(list), false)?;
                    return single(table);
                }
                ' ' if self.spaces_allowed => self
                    .symbols
                    .atom_for_latex_symbol_name(" ")
                    .unwrap_or_else(|| Atom::new(AtomType::Ordinary, " ")),
                _ => match self.atom_for_char(ch) {
                    Some(atom) => atom,
                    None => continue,
                },
            };

            let mut atom = atom;
            atom.font_style = self.font_style;
            list.add_atom(atom).map_err(internal_error)?;
            has_prev = true;
            if one_char_only {
                return Ok(list);
            }
        }

        match stop {
            Some('}') => Err(error(ParseErrorKind::MismatchBraces, "Missing closing brace")),
            Some(stop) => Err(error(
                ParseErrorKind::CharacterNotFound,
                format!("Expected character not found: {}", stop),
            )),
            None => Ok(list),
        }
    }

    /// Classify a raw input character
    fn atom_for_char(&self, ch: char) -> Option<Atom> {
        if ch.is_ascii() {
            return factory::atom_for_character(ch);
        }
        let mut buf = [0u8; 4];
        if let Some(atom) = self.symbols.atom_for_nucleus(ch.encode_utf8(&mut buf)) {
            return Some(atom);
        }
        ch.is_alphabetic()
            .then(|| Atom::new(AtomType::Variable, ch.to_string()))
    }

    fn stop_command(&mut self, command: &str, list: MathList, stop: Option<char>) -> Result<MathList, ParseError> {
        match command {
            "right" => {
                if self.open_lefts.is_empty() {
                    return Err(error(ParseErrorKind::MissingLeft, "Missing \\left"));
                }
                let boundary = self.boundary_atom("right")?;
                if let Some(slot) = self.open_lefts.last_mut() {
                    *slot = Some(boundary);
                }
                Ok(list)
            }
            "\\" | "cr" => match self.environment.as_mut() {
                Some(env) => {
                    env.num_rows += 1;
                    Ok(list)
                }
                None => {
                    let table = self.build_table(None, Some(list), true)?;
                    single(table)
                }
            },
            "end" => {
                if self.environment.is_none() {
                    return Err(error(ParseErrorKind::MissingBegin, "Missing \\begin"));
                }
                let name = self.read_environment()?;
                let Some(env) = self.environment.as_mut() else {
                    return Err(error(ParseErrorKind::MissingBegin, "Missing \\begin"));
                };
                if env.name.as_deref() != Some(name.as_str()) {
                    return Err(error(
                        ParseErrorKind::InvalidEnv,
                        format!(
                            "Begin environment name {} does not match end name: {}",
                            env.name.as_deref().unwrap_or_default(),
                            name
                        ),
                    ));
                }
                env.ended = true;
                Ok(list)
            }
            _ => {
                // infix fractions: everything so far is the numerator
                let delimiters = match command {
                    "choose" => Some(("(".to_string(), ")".to_string())),
                    "brack" => Some(("[".to_string(), "]".to_string())),
                    "brace" => Some(("{".to_string(), "}".to_string())),
                    "atopwithdelims" => {
                        let left = self.boundary_atom(command)?;
                        let right = self.boundary_atom(command)?;
                        Some((delimiter_name(&left), delimiter_name(&right)))
                    }
                    _ => None,
                };
                let denominator = self.build_internal(false, stop)?;
                let mut fraction = Atom::fraction(list, denominator, command == "over");
                if let (AtomKind::Fraction(frac), Some((left, right))) = (&mut fraction.kind, delimiters) {
                    frac.left_delimiter = Some(left);
                    frac.right_delimiter = Some(right);
                }
                single(fraction)
            }
        }
    }

    fn atom_for_command(&mut self, command: &str) -> Result<Atom, ParseError> {
        if let Some(atom) = self.symbols.atom_for_latex_symbol_name(command) {
            return Ok(atom);
        }
        if let Some(accent) = factory::accent_with_name(command) {
            let inner_list = self.build_internal(true, None)?;
            return Ok(Atom::accent(accent.nucleus, inner_list));
        }

        let atom = match command {
            "frac" => {
                let numerator = self.build_internal(true, None)?;
                let denominator = self.build_internal(true, None)?;
                Atom::fraction(numerator, denominator, true)
            }
            "binom" => {
                let numerator = self.build_internal(true, None)?;
                let denominator = self.build_internal(true, None)?;
                let mut atom = Atom::fraction(numerator, denominator, false);
                if let AtomKind::Fraction(frac) = &mut atom.kind {
                    frac.left_delimiter = Some("(".to_string());
                    frac.right_delimiter = Some(")".to_string());
                }
                atom
            }
            "sqrt" => {
                let degree = if self.peek_char() == Some('[') {
                    self.position += 1;
                    Some(self.build_internal(false, Some(']'))?)
                } else {
                    None
                };
                let radicand = self.build_internal(true, None)?;
                Atom::radical(radicand, degree)
            }
            "left" => {
                let left = self.boundary_atom("left")?;
                self.open_lefts.push(None);
                let inner_list = self.build_internal(false, None);
                let right = self.open_lefts.pop().flatten();
                let inner_list = inner_list?;
                let Some(right) = right else {
                    return Err(error(ParseErrorKind::MissingRight, "Missing \\right"));
                };
                Atom::inner(inner_list, Some(left), Some(right))
            }
            "overline" => Atom::overline(self.build_internal(true, None)?),
            "underline" => Atom::underline(self.build_internal(true, None)?),
            "begin" => {
                let env = self.read_environment()?;
                self.build_table(Some(env), None, false)?
            }
            "color" => {
                let color = self.read_color()?;
                Atom::color(color, self.build_internal(true, None)?)
            }
            "colorbox" => {
                let color = self.read_color()?;
                Atom::colorbox(color, self.build_internal(true, None)?)
            }
            "mkern" => Atom::space(self.read_kern()?),
            "operatorname" => {
                let name = self.read_braced_name()?;
                if name.is_empty() {
                    return Err(error(ParseErrorKind::InvalidCommand, "Missing operator name"));
                }
                factory::operator(&name)
            }
            _ => {
                return Err(error(
                    ParseErrorKind::InvalidCommand,
                    format!("Invalid command \\{}", command),
                ));
            }
        };
        Ok(atom)
    }

    // -------------------------------------------------------------------------
    // Tables
    // -------------------------------------------------------------------------

    /// Parse the rows of an environment. `first_list` is the cell already
    /// read when an implicit table starts at `&` (`is_row` false) or `\\`.
    fn build_table(
        &mut self,
        name: Option<String>,
        first_list: Option<MathList>,
        is_row: bool,
    ) -> Result<Atom, ParseError> {
        let outer = self.environment.replace(Environment {
            name: name.clone(),
            ended: false,
            num_rows: 0,
        });
        let rows = self.build_rows(first_list, is_row);
        let env = std::mem::replace(&mut self.environment, outer);
        let mut rows = rows?;

        let ended = env.is_some_and(|e| e.ended);
        if name.is_some() && !ended {
            return Err(error(ParseErrorKind::MissingEnd, "Missing \\end"));
        }

        // a trailing \\ does not open a new row
        if rows.len() > 1 {
            if let Some(last) = rows.last() {
                if last.is_empty() || (last.len() == 1 && last[0].is_empty()) {
                    rows.pop();
                }
            }
        }

        factory::table_with_environment(name.as_deref(), rows).map_err(|err| {
            let kind = match err {
                TableError::UnknownEnvironment(_) => ParseErrorKind::InvalidEnv,
                TableError::InvalidNumColumns { .. } | TableError::RaggedRows { .. } => {
                    ParseErrorKind::InvalidNumColumns
                }
                TableError::Cell(_) => ParseErrorKind::InternalError,
            };
            error(kind, err.to_string())
        })
    }

    fn build_rows(&mut self, first_list: Option<MathList>, is_row: bool) -> Result<Vec<Vec<MathList>>, ParseError> {
        let mut rows: Vec<Vec<MathList>> = vec![Vec::new()];
        let mut current_row = 0;

        if let Some(first) = first_list {
            rows[0].push(first);
            if is_row {
                if let Some(env) = self.environment.as_mut() {
                    env.num_rows += 1;
                }
                current_row = 1;
                rows.push(Vec::new());
            }
        }

        while self.has_characters() && !self.environment.as_ref().is_some_and(|e| e.ended) {
            let cell = self.build_internal(false, None)?;
            rows[current_row].push(cell);

            let num_rows = self.environment.as_ref().map_or(0, |e| e.num_rows);
            if num_rows > current_row {
                current_row = num_rows;
                while rows.len() <= current_row {
                    rows.push(Vec::new());
                }
            }
        }
        Ok(rows)
    }
}

fn error(kind: ParseErrorKind, message: impl Into<String>) -> ParseError {
    ParseError::new(kind, message)
}

fn internal_error(err: crate::error::EditError) -> ParseError {
    error(ParseErrorKind::InternalError, err.to_string())
}

fn single(atom: Atom) -> Result<MathList, ParseError> {
    MathList::from_atoms(vec![atom]).map_err(internal_error)
}

fn delimiter_name(boundary: &Atom) -> String {
    factory::delimiter_name_for_boundary_atom(boundary)
        .unwrap_or(".")
        .to_string()
}

/// Parse `input` with the process-wide symbol table, discarding the error
pub fn build_from_string(input: &str) -> Option<MathList> {
    try_build_from_string(input).ok()
}

/// Parse `input` with the process-wide symbol table
pub fn try_build_from_string(input: &str) -> Result<MathList, ParseError> {
    let symbols = factory::read_symbols();
    Builder::new(input, &symbols).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> MathList {
        try_build_from_string(input).unwrap()
    }

    fn parse_err(input: &str) -> ParseError {
        try_build_from_string(input).unwrap_err()
    }

    fn types(list: &MathList) -> Vec<AtomType> {
        list.atoms().iter().map(Atom::atom_type).collect()
    }

    #[test]
    fn test_parse_number_fuses_on_finalize() {
        let list = parse("12");
        assert_eq!(list.len(), 2);
        let finalized = list.finalized();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized.atoms()[0].atom_type(), AtomType::Number);
        assert_eq!(finalized.atoms()[0].nucleus, "12");
    }

    #[test]
    fn test_parse_binary_between_operands() {
        let finalized = parse("1+2").finalized();
        assert_eq!(
            types(&finalized),
            vec![AtomType::Number, AtomType::BinaryOperator, AtomType::Number]
        );
    }

    #[test]
    fn test_parse_unary_minus() {
        let leading = parse("-2").finalized();
        assert_eq!(leading.atoms()[0].atom_type(), AtomType::UnaryOperator);
        assert_eq!(leading.atoms()[0].nucleus, "\u{2212}");

        let infix = parse("3-2").finalized();
        assert_eq!(infix.atoms()[1].atom_type(), AtomType::BinaryOperator);
    }

    #[test]
    fn test_parse_spaces_ignored() {
        assert_eq!(types(&parse("x + y")), types(&parse("x+y")));
    }

    #[test]
    fn test_brace_mismatch() {
        let err = parse_err("{1+2");
        assert_eq!(err.kind, ParseErrorKind::MismatchBraces);
        assert_eq!(err.message, "Missing closing brace");

        let err = parse_err("1+2}");
        assert_eq!(err.kind, ParseErrorKind::MismatchBraces);
        assert_eq!(err.message, "Mismatched braces.");
    }

    #[test]
    fn test_braces_flatten() {
        let list = parse("{a{b}}c");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_scripts() {
        let list = parse("x^2_{i+1}");
        assert_eq!(list.len(), 1);
        let x = &list.atoms()[0];
        assert_eq!(x.superscript().unwrap().len(), 1);
        assert_eq!(x.subscript().unwrap().len(), 3);
    }

    #[test]
    fn test_script_without_base_inserts_placeholder() {
        let list = parse("^2");
        assert_eq!(list.len(), 1);
        assert_eq!(list.atoms()[0].atom_type(), AtomType::Placeholder);
        assert!(list.atoms()[0].nucleus.is_empty());
        assert!(list.atoms()[0].superscript().is_some());

        let doubled = parse("x^2^3");
        assert_eq!(doubled.len(), 2);
        assert_eq!(doubled.atoms()[1].atom_type(), AtomType::Placeholder);

        let after_group = parse("x{}^2");
        assert_eq!(after_group.len(), 2);
        assert!(after_group.atoms()[0].superscript().is_none());
    }

    #[test]
    fn test_left_right() {
        let list = parse("\\left(x\\right)");
        assert_eq!(list.len(), 1);
        let AtomKind::Inner(inner) = &list.atoms()[0].kind else {
            panic!("Expected inner");
        };
        assert_eq!(inner.left_boundary.as_ref().unwrap().nucleus, "(");
        assert_eq!(inner.right_boundary.as_ref().unwrap().nucleus, ")");
        assert_eq!(inner.inner_list.len(), 1);
    }

    #[test]
    fn test_nested_left_right() {
        let list = parse("\\left( \\left[ x \\right] + 1 \\right\\rangle");
        let AtomKind::Inner(outer) = &list.atoms()[0].kind else {
            panic!("Expected inner");
        };
        assert_eq!(outer.right_boundary.as_ref().unwrap().nucleus, "\u{232A}");
        assert_eq!(outer.inner_list.atoms()[0].atom_type(), AtomType::Inner);
    }

    #[test]
    fn test_left_right_errors() {
        assert_eq!(parse_err("\\left(x").kind, ParseErrorKind::MissingRight);
        assert_eq!(parse_err("x\\right)").kind, ParseErrorKind::MissingLeft);
        assert_eq!(parse_err("\\left").kind, ParseErrorKind::MissingDelimiter);
        let err = parse_err("\\left x \\right)");
        assert_eq!(err.kind, ParseErrorKind::InvalidDelimiter);
        assert_eq!(err.message, "Invalid delimiter for \\left: x");
    }

    #[test]
    fn test_frac_and_binom() {
        let list = parse("\\frac12");
        let AtomKind::Fraction(frac) = &list.atoms()[0].kind else {
            panic!("Expected fraction");
        };
        assert!(frac.has_rule);
        assert_eq!(frac.numerator.atoms()[0].nucleus, "1");
        assert_eq!(frac.denominator.atoms()[0].nucleus, "2");

        let list = parse("\\binom{n}{k}");
        let AtomKind::Fraction(frac) = &list.atoms()[0].kind else {
            panic!("Expected fraction");
        };
        assert!(!frac.has_rule);
        assert_eq!(frac.left_delimiter.as_deref(), Some("("));
    }

    #[test]
    fn test_infix_fractions() {
        let list = parse("a + b \\over c");
        assert_eq!(list.len(), 1);
        let AtomKind::Fraction(frac) = &list.atoms()[0].kind else {
            panic!("Expected fraction");
        };
        assert_eq!(frac.numerator.len(), 3);
        assert_eq!(frac.denominator.len(), 1);

        let list = parse("x{n \\choose k}");
        assert_eq!(list.len(), 2);
        let AtomKind::Fraction(frac) = &list.atoms()[1].kind else {
            panic!("Expected fraction");
        };
        assert!(!frac.has_rule);
        assert_eq!(frac.right_delimiter.as_deref(), Some(")"));

        let list = parse("{a \\atopwithdelims\\langle\\rangle b}");
        let AtomKind::Fraction(frac) = &list.atoms()[0].kind else {
            panic!("Expected fraction");
        };
        assert_eq!(frac.left_delimiter.as_deref(), Some("<"));
        assert_eq!(frac.right_delimiter.as_deref(), Some(">"));
    }

    #[test]
    fn test_sqrt() {
        let list = parse("\\sqrt[3]{x}");
        let AtomKind::Radical(radical) = &list.atoms()[0].kind else {
            panic!("Expected radical");
        };
        assert_eq!(radical.degree.as_ref().unwrap().atoms()[0].nucleus, "3");
        assert_eq!(radical.radicand.atoms()[0].nucleus, "x");

        let err = parse_err("\\sqrt[3");
        assert_eq!(err.kind, ParseErrorKind::CharacterNotFound);
        assert_eq!(err.message, "Expected character not found: ]");
    }

    #[test]
    fn test_limits_modifiers() {
        let list = parse("\\int\\limits_0^1");
        assert!(matches!(list.atoms()[0].kind, AtomKind::LargeOperator { limits: true }));
        assert!(list.atoms()[0].subscript().is_some());

        let list = parse("\\sum\\nolimits");
        assert!(matches!(list.atoms()[0].kind, AtomKind::LargeOperator { limits: false }));

        assert_eq!(parse_err("x\\limits").kind, ParseErrorKind::InvalidLimits);
        assert_eq!(parse_err("\\nolimits").kind, ParseErrorKind::InvalidLimits);
    }

    #[test]
    fn test_font_styles() {
        let list = parse("\\mathbf{xy}z");
        assert_eq!(list.atoms()[0].font_style, FontStyle::Bold);
        assert_eq!(list.atoms()[1].font_style, FontStyle::Bold);
        assert_eq!(list.atoms()[2].font_style, FontStyle::Default);

        let text = parse("\\text{a b}");
        assert_eq!(text.len(), 3);
        assert_eq!(text.atoms()[1].nucleus, " ");
        assert!(text.atoms().iter().all(|a| a.font_style == FontStyle::Roman));

        assert_eq!(parse("\\mathrm{a b}").len(), 2);
        assert_eq!(parse("\\bf x").atoms()[0].font_style, FontStyle::Bold);
    }

    #[test]
    fn test_symbols_and_invalid_command() {
        let list = parse("\\alpha\\le\\infty");
        assert_eq!(list.atoms()[0].nucleus, "\u{03B1}");
        assert_eq!(list.atoms()[1].atom_type(), AtomType::Relation);

        let err = parse_err("\\notacommand");
        assert_eq!(err.kind, ParseErrorKind::InvalidCommand);
        assert_eq!(err.message, "Invalid command \\notacommand");
    }

    #[test]
    fn test_spaces_and_styles() {
        let list = parse("a\\,b\\quad c\\mkern-2.5mu d\\scriptstyle e");
        let spaces: Vec<f32> = list
            .atoms()
            .iter()
            .filter_map(|a| match a.kind {
                AtomKind::Space { space } => Some(space),
                _ => None,
            })
            .collect();
        assert_eq!(spaces, vec![3.0, 18.0, -2.5]);
        assert!(list
            .atoms()
            .iter()
            .any(|a| matches!(a.kind, AtomKind::Style { style: LineStyle::Script })));
        assert_eq!(parse_err("\\mkern3pt").kind, ParseErrorKind::CharacterNotFound);
    }

    #[test]
    fn test_accents_and_lines() {
        let list = parse("\\hat{x}\\overline{ab}\\underline c");
        assert_eq!(
            types(&list),
            vec![AtomType::Accent, AtomType::Overline, AtomType::Underline]
        );
        assert_eq!(list.atoms()[0].nucleus, "\u{0302}");
        assert_eq!(list.atoms()[1].inner_list().unwrap().len(), 2);
    }

    #[test]
    fn test_color() {
        let list = parse("\\color{#ff0000}{x+y}\\colorbox{yellow}{z}");
        let AtomKind::Color { color, inner_list } = &list.atoms()[0].kind else {
            panic!("Expected color");
        };
        assert_eq!(color, "#ff0000");
        assert_eq!(inner_list.len(), 3);
        assert!(matches!(&list.atoms()[1].kind, AtomKind::Colorbox { color, .. } if color == "yellow"));

        let err = parse_err("\\color red");
        assert_eq!(err.kind, ParseErrorKind::CharacterNotFound);
        assert_eq!(err.message, "Missing {");
    }

    #[test]
    fn test_environments() {
        let list = parse("\\begin{pmatrix}1&2\\\\3&4\\end{pmatrix}");
        let AtomKind::Inner(inner) = &list.atoms()[0].kind else {
            panic!("Expected inner");
        };
        let AtomKind::Table(table) = &inner.inner_list.atoms()[0].kind else {
            panic!("Expected table");
        };
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_columns(), 2);
    }

    #[test]
    fn test_trailing_row_dropped() {
        let list = parse("\\begin{matrix}1&2\\\\3&4\\\\\\end{matrix}");
        let AtomKind::Table(table) = &list.atoms()[0].kind else {
            panic!("Expected table");
        };
        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn test_environment_errors() {
        assert_eq!(
            parse_err("\\begin{matrix}1\\end{pmatrix}").kind,
            ParseErrorKind::InvalidEnv
        );
        assert_eq!(parse_err("\\begin{matrix}1").kind, ParseErrorKind::MissingEnd);
        assert_eq!(parse_err("x\\end{matrix}").kind, ParseErrorKind::MissingBegin);
        assert_eq!(parse_err("\\begin{}x").kind, ParseErrorKind::MissingEnv);
        assert_eq!(
            parse_err("\\begin{pmatrix}1&2\\\\3\\end{pmatrix}").kind,
            ParseErrorKind::InvalidNumColumns
        );
        assert_eq!(
            parse_err("\\begin{aligned}a&b&c\\end{aligned}").kind,
            ParseErrorKind::InvalidNumColumns
        );
        assert_eq!(parse_err("\\begin{foo}x\\end{foo}").kind, ParseErrorKind::InvalidEnv);
    }

    #[test]
    fn test_implicit_table() {
        let list = parse("a&b\\\\c&d");
        assert_eq!(list.len(), 1);
        let AtomKind::Table(table) = &list.atoms()[0].kind else {
            panic!("Expected table");
        };
        assert!(table.environment.is_none());
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.alignment(0), ColumnAlignment::Left);
    }

    #[test]
    fn test_non_ascii_input() {
        let list = parse("\u{03B1}+\u{2211}\u{00E9}\u{2603}");
        assert_eq!(list.atoms()[0].nucleus, "\u{03B1}");
        assert_eq!(list.atoms()[0].atom_type(), AtomType::Variable);
        assert_eq!(list.atoms()[2].atom_type(), AtomType::LargeOperator);
        assert_eq!(list.atoms()[3].atom_type(), AtomType::Variable);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_operatorname() {
        let list = parse("\\operatorname{lcm}(a,b)");
        assert_eq!(list.atoms()[0].atom_type(), AtomType::LargeOperator);
        assert_eq!(list.atoms()[0].nucleus, "lcm");
    }

    #[test]
    fn test_isolated_symbol_table() {
        let mut symbols = SymbolTable::empty();
        assert!(Builder::new("\\alpha", &symbols).build().is_err());
        symbols.add_latex_symbol("alpha", Atom::new(AtomType::Variable, "a"));
        let list = Builder::new("\\alpha", &symbols).build().unwrap();
        assert_eq!(list.atoms()[0].nucleus, "a");
    }

    #[test]
    fn test_build_from_string_discards_error() {
        assert!(build_from_string("x^2").is_some());
        assert!(build_from_string("\\frac{1").is_none());
    }
}
