//! Unicode math alphanumeric styling
//!
//! Maps plain Latin letters, digits and Greek letters to the characters of
//! the Mathematical Alphanumeric Symbols block for a given [`FontStyle`].
//! Characters without a styled form are returned unchanged.

use crate::model::FontStyle;

const GREEK_LOWER_START: u32 = 0x03B1;
const GREEK_LOWER_END: u32 = 0x03C9;
const GREEK_UPPER_START: u32 = 0x0391;
const GREEK_UPPER_END: u32 = 0x03A9;

/// Greek variants that follow the lowercase letters in every math alphabet
const GREEK_SYMBOLS: [char; 7] = [
    '\u{2202}', '\u{03F5}', '\u{03D1}', '\u{03F0}', '\u{03D5}', '\u{03F1}', '\u{03D6}',
];

/// First code points of one styled alphabet
struct Alphabet {
    upper: u32,
    lower: u32,
    digits: Option<u32>,
    greek_upper: Option<u32>,
    greek_lower: Option<u32>,
    exceptions: &'static [(char, char)],
}

const BOLD: Alphabet = Alphabet {
    upper: 0x1D400,
    lower: 0x1D41A,
    digits: Some(0x1D7CE),
    greek_upper: Some(0x1D6A8),
    greek_lower: Some(0x1D6C2),
    exceptions: &[],
};

const ITALIC: Alphabet = Alphabet {
    upper: 0x1D434,
    lower: 0x1D44E,
    digits: None,
    greek_upper: Some(0x1D6E2),
    greek_lower: Some(0x1D6FC),
    exceptions: &[('h', '\u{210E}'), ('\u{0131}', '\u{1D6A4}'), ('\u{0237}', '\u{1D6A5}')],
};

const BOLD_ITALIC: Alphabet = Alphabet {
    upper: 0x1D468,
    lower: 0x1D482,
    digits: Some(0x1D7CE),
    greek_upper: Some(0x1D71C),
    greek_lower: Some(0x1D736),
    exceptions: &[],
};

const SCRIPT: Alphabet = Alphabet {
    upper: 0x1D49C,
    lower: 0x1D4B6,
    digits: None,
    greek_upper: None,
    greek_lower: None,
    exceptions: &[
        ('B', '\u{212C}'),
        ('E', '\u{2130}'),
        ('F', '\u{2131}'),
        ('H', '\u{210B}'),
        ('I', '\u{2110}'),
        ('L', '\u{2112}'),
        ('M', '\u{2133}'),
        ('R', '\u{211B}'),
        ('e', '\u{212F}'),
        ('g', '\u{210A}'),
        ('o', '\u{2134}'),
    ],
};

const FRAKTUR: Alphabet = Alphabet {
    upper: 0x1D504,
    lower: 0x1D51E,
    digits: None,
    greek_upper: None,
    greek_lower: None,
    exceptions: &[
        ('C', '\u{212D}'),
        ('H', '\u{210C}'),
        ('I', '\u{2111}'),
        ('R', '\u{211C}'),
        ('Z', '\u{2128}'),
    ],
};

const BLACKBOARD: Alphabet = Alphabet {
    upper: 0x1D538,
    lower: 0x1D552,
    digits: Some(0x1D7D8),
    greek_upper: None,
    greek_lower: None,
    exceptions: &[
        ('C', '\u{2102}'),
        ('H', '\u{210D}'),
        ('N', '\u{2115}'),
        ('P', '\u{2119}'),
        ('Q', '\u{211A}'),
        ('R', '\u{211D}'),
        ('Z', '\u{2124}'),
    ],
};

const SANS_SERIF: Alphabet = Alphabet {
    upper: 0x1D5A0,
    lower: 0x1D5BA,
    digits: Some(0x1D7E2),
    greek_upper: None,
    greek_lower: None,
    exceptions: &[],
};

const MONOSPACE: Alphabet = Alphabet {
    upper: 0x1D670,
    lower: 0x1D68A,
    digits: Some(0x1D7F6),
    greek_upper: None,
    greek_lower: None,
    exceptions: &[],
};

impl Alphabet {
    fn map(&self, ch: char) -> char {
        if let Some(&(_, styled)) = self.exceptions.iter().find(|(plain, _)| *plain == ch) {
            return styled;
        }
        let code = ch as u32;
        let styled = match ch {
            'A'..='Z' => Some(self.upper + (code - 'A' as u32)),
            'a'..='z' => Some(self.lower + (code - 'a' as u32)),
            '0'..='9' => self.digits.map(|start| start + (code - '0' as u32)),
            _ if (GREEK_UPPER_START..=GREEK_UPPER_END).contains(&code) => {
                self.greek_upper.map(|start| start + (code - GREEK_UPPER_START))
            }
            _ if (GREEK_LOWER_START..=GREEK_LOWER_END).contains(&code) => {
                self.greek_lower.map(|start| start + (code - GREEK_LOWER_START))
            }
            _ => GREEK_SYMBOLS
                .iter()
                .position(|&symbol| symbol == ch)
                .and_then(|offset| {
                    let count = GREEK_LOWER_END - GREEK_LOWER_START + 1;
                    self.greek_lower.map(|start| start + count + offset as u32)
                }),
        };
        styled.and_then(char::from_u32).unwrap_or(ch)
    }
}

pub fn is_greek_lower(ch: char) -> bool {
    (GREEK_LOWER_START..=GREEK_LOWER_END).contains(&(ch as u32)) || GREEK_SYMBOLS.contains(&ch)
}

pub fn is_greek_upper(ch: char) -> bool {
    (GREEK_UPPER_START..=GREEK_UPPER_END).contains(&(ch as u32))
}

/// Map a character to its math alphanumeric form for `style`
///
/// The default style italicizes Latin letters and lowercase Greek while
/// keeping digits and capital Greek upright.
pub fn styled_char(ch: char, style: FontStyle) -> char {
    match style {
        FontStyle::Default => {
            if ch.is_ascii_alphabetic() || is_greek_lower(ch) || ch == '\u{0131}' || ch == '\u{0237}' {
                ITALIC.map(ch)
            } else {
                ch
            }
        }
        FontStyle::Roman => ch,
        FontStyle::Bold => BOLD.map(ch),
        FontStyle::Italic => ITALIC.map(ch),
        FontStyle::BoldItalic => BOLD_ITALIC.map(ch),
        FontStyle::Caligraphic => SCRIPT.map(ch),
        FontStyle::Fraktur => FRAKTUR.map(ch),
        FontStyle::Blackboard => BLACKBOARD.map(ch),
        FontStyle::SansSerif => SANS_SERIF.map(ch),
        FontStyle::Typewriter => MONOSPACE.map(ch),
    }
}

/// Style every character of `text`
pub fn styled_string(text: &str, style: FontStyle) -> String {
    text.chars().map(|ch| styled_char(ch, style)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style() {
        assert_eq!(styled_char('x', FontStyle::Default), '\u{1D465}');
        assert_eq!(styled_char('A', FontStyle::Default), '\u{1D434}');
        assert_eq!(styled_char('h', FontStyle::Default), '\u{210E}');
        assert_eq!(styled_char('2', FontStyle::Default), '2');
        assert_eq!(styled_char('\u{03B1}', FontStyle::Default), '\u{1D6FC}');
        assert_eq!(styled_char('\u{0393}', FontStyle::Default), '\u{0393}');
        assert_eq!(styled_char('.', FontStyle::Default), '.');
    }

    #[test]
    fn test_greek_symbols_follow_lowercase() {
        // italic partial differential and italic phi symbol
        assert_eq!(styled_char('\u{2202}', FontStyle::Italic), '\u{1D715}');
        assert_eq!(styled_char('\u{03D5}', FontStyle::Default), '\u{1D719}');
        assert_eq!(styled_char('\u{2202}', FontStyle::Bold), '\u{1D6DB}');
    }

    #[test]
    fn test_roman_is_identity() {
        assert_eq!(styled_string("sin", FontStyle::Roman), "sin");
    }

    #[test]
    fn test_bold_digits_and_greek() {
        assert_eq!(styled_char('0', FontStyle::Bold), '\u{1D7CE}');
        assert_eq!(styled_char('\u{03A9}', FontStyle::Bold), '\u{1D6C0}');
        assert_eq!(styled_char('a', FontStyle::BoldItalic), '\u{1D482}');
    }

    #[test]
    fn test_exceptions() {
        assert_eq!(styled_char('R', FontStyle::Blackboard), '\u{211D}');
        assert_eq!(styled_char('A', FontStyle::Blackboard), '\u{1D538}');
        assert_eq!(styled_char('1', FontStyle::Blackboard), '\u{1D7D9}');
        assert_eq!(styled_char('H', FontStyle::Fraktur), '\u{210C}');
        assert_eq!(styled_char('e', FontStyle::Caligraphic), '\u{212F}');
        assert_eq!(styled_char('A', FontStyle::Caligraphic), '\u{1D49C}');
    }

    #[test]
    fn test_unstyled_characters_pass_through() {
        assert_eq!(styled_char('\u{03B1}', FontStyle::Fraktur), '\u{03B1}');
        assert_eq!(styled_char('5', FontStyle::Caligraphic), '5');
        assert_eq!(styled_char('+', FontStyle::Bold), '+');
        assert_eq!(styled_char('z', FontStyle::Typewriter), '\u{1D6A3}');
        assert_eq!(styled_char('9', FontStyle::SansSerif), '\u{1D7EB}');
    }
}
