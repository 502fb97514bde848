//! texmath - LaTeX math parsing and typesetting
//!
//! This crate turns a LaTeX math expression into a positioned box tree:
//! - A math list model of typed atoms, with finalize (fusion and
//!   unary/binary reclassification) and path-based indexing
//! - A symbol table and atom factory for the supported commands
//! - A LaTeX builder (parser) and unparser
//! - A typesetter implementing the TeX math layout rules on top of
//!   OpenType MATH style font metrics
//! - A display tree that draws onto any drawing context, plus a recording
//!   renderer

pub mod builder;
pub mod display;
pub mod error;
pub mod factory;
pub mod font;
pub mod index;
pub mod model;
pub mod render;
pub mod typesetter;
pub mod unicode;
pub mod unparser;

pub use builder::{build_from_string, try_build_from_string, Builder};
pub use display::{Display, DisplayKind, DrawContext, GlyphRun, LinePosition, Point, Rect, Rule, Size};
pub use error::*;
pub use factory::SymbolTable;
pub use font::{FontMetrics, GlyphBounds, GlyphPart, MathConstants, MathFont, MathTable};
pub use index::{MathListIndex, MathListRange, SubIndexType};
pub use model::*;
pub use render::{render_latex, Color, RenderConfig, RenderOutput, RenderPrimitive, Renderer};
pub use typesetter::{layout, layout_latex};
pub use unparser::{math_list_to_string, Unparser};
