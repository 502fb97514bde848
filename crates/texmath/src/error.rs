//! Error types for the texmath crate

use crate::model::AtomType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of a LaTeX parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseErrorKind {
    /// A `{` without its `}` or the other way round
    MismatchBraces,
    /// Unknown `\command`
    InvalidCommand,
    /// An expected character (such as `]` or `{`) was not found
    CharacterNotFound,
    /// `\left` or `\right` without a delimiter
    MissingDelimiter,
    /// `\left` or `\right` with an unknown delimiter
    InvalidDelimiter,
    /// `\left` without a matching `\right`
    MissingRight,
    /// `\right` without a matching `\left`
    MissingLeft,
    /// Unknown environment or mismatched `\begin`/`\end` names
    InvalidEnv,
    /// `\begin{}` with an empty environment name
    MissingEnv,
    /// `\end` without a `\begin`
    MissingBegin,
    /// `\begin` without an `\end`
    MissingEnd,
    /// Row/column shape incompatible with the environment
    InvalidNumColumns,
    /// The parser reached a state it should never be in
    InternalError,
    /// `\limits` or `\nolimits` not following a large operator
    InvalidLimits,
}

/// A structured parse error: the kind plus a human readable message
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors raised while building a table atom for an environment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The environment requires an exact number of columns
    #[error("{env} environment can only have {expected} columns")]
    InvalidNumColumns { env: String, expected: usize },

    /// Matrix rows disagree on their number of columns
    #[error("{env} rows must all have the same number of columns, found {found} and {expected}")]
    RaggedRows {
        env: String,
        expected: usize,
        found: usize,
    },

    /// The environment name is not known
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    /// A cell edit made while shaping the table failed
    #[error("Invalid table cell: {0}")]
    Cell(#[from] EditError),
}

/// Errors raised by structural edits on a math list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Cannot add a boundary atom to a math list")]
    BoundaryAtom,

    #[error("Index {index} out of bounds for a list of {len} atoms")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The index points into a branch the atom does not have
    #[error("No {branch} at atom {index}")]
    MissingBranch { branch: String, index: usize },

    #[error("Cannot fuse atoms: {0}")]
    InvalidFusion(String),

    #[error("Scripts are not allowed on {0:?} atoms")]
    ScriptsNotAllowed(AtomType),
}

/// Errors raised while loading font metrics
#[derive(Error, Debug)]
pub enum FontError {
    /// The math table document could not be decoded
    #[error("Invalid math table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid math table: {0}")]
    Invalid(String),
}

/// Contract violations detected by the typesetter
///
/// These indicate a list that was not produced by `finalized()` on a
/// successful parse, never bad user input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypesetError {
    #[error("Invalid inter-element space between {left:?} and {right:?}")]
    InvalidSpacing { left: AtomType, right: AtomType },

    #[error("Unexpected {0:?} atom in a finalized math list")]
    UnexpectedAtom(AtomType),
}

/// Umbrella error for every layer of the crate
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("Font error: {0}")]
    Font(#[from] FontError),

    #[error("Layout error: {0}")]
    Typeset(#[from] TypesetError),
}

/// Result type for texmath operations
pub type MathResult<T> = Result<T, MathError>;
