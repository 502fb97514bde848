//! Math List Index - Path addressing into nested math lists
//!
//! A [`MathListIndex`] is an immutable linked path. Each level names an atom
//! in a list and, optionally, a branch of that atom (a script, a numerator
//! ...) together with the index inside that branch. Every operation returns a
//! new index; shared tails are reference counted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// The branch of an atom a sub-index points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubIndexType {
    /// The index addresses the atom itself
    None,
    /// Position within the nucleus (0 before, 1 after)
    Nucleus,
    Superscript,
    Subscript,
    Numerator,
    Denominator,
    Radicand,
    Degree,
    Inner,
}

/// An immutable path to an atom in a nested math list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MathListIndex {
    atom_index: usize,
    sub_index_type: SubIndexType,
    sub_index: Option<Arc<MathListIndex>>,
}

impl MathListIndex {
    /// Index of an atom in the root list
    pub fn level0(atom_index: usize) -> Self {
        Self {
            atom_index,
            sub_index_type: SubIndexType::None,
            sub_index: None,
        }
    }

    /// Index pointing into the `sub_index_type` branch of the atom at
    /// `atom_index`. A `None` type ignores the sub-index.
    pub fn at_location(atom_index: usize, sub_index: MathListIndex, sub_index_type: SubIndexType) -> Self {
        if sub_index_type == SubIndexType::None {
            return Self::level0(atom_index);
        }
        Self {
            atom_index,
            sub_index_type,
            sub_index: Some(Arc::new(sub_index)),
        }
    }

    pub fn atom_index(&self) -> usize {
        self.atom_index
    }

    pub fn sub_index_type(&self) -> SubIndexType {
        self.sub_index_type
    }

    pub fn sub_index(&self) -> Option<&MathListIndex> {
        self.sub_index.as_deref()
    }

    /// Extend the path one level deeper, at its innermost level
    pub fn level_up(&self, sub_index: MathListIndex, sub_index_type: SubIndexType) -> Self {
        match &self.sub_index {
            Some(current) if self.sub_index_type != SubIndexType::None => Self {
                atom_index: self.atom_index,
                sub_index_type: self.sub_index_type,
                sub_index: Some(Arc::new(current.level_up(sub_index, sub_index_type))),
            },
            _ => Self::at_location(self.atom_index, sub_index, sub_index_type),
        }
    }

    /// Drop the innermost level; `None` for a root level index
    pub fn level_down(&self) -> Option<Self> {
        let sub_index = self.sub_index.as_ref()?;
        Some(match sub_index.level_down() {
            Some(down) => Self::at_location(self.atom_index, down, self.sub_index_type),
            None => Self::level0(self.atom_index),
        })
    }

    /// The next position at the innermost level
    pub fn next(&self) -> Self {
        match (self.sub_index_type, &self.sub_index) {
            (SubIndexType::None, _) | (_, None) => Self::level0(self.atom_index + 1),
            (SubIndexType::Nucleus, Some(_)) => Self {
                atom_index: self.atom_index + 1,
                ..self.clone()
            },
            (_, Some(sub_index)) => Self {
                atom_index: self.atom_index,
                sub_index_type: self.sub_index_type,
                sub_index: Some(Arc::new(sub_index.next())),
            },
        }
    }

    /// The previous position at the innermost level, `None` at the start
    pub fn previous(&self) -> Option<Self> {
        match &self.sub_index {
            Some(sub_index) if self.sub_index_type != SubIndexType::None => {
                let previous = sub_index.previous()?;
                Some(Self::at_location(self.atom_index, previous, self.sub_index_type))
            }
            _ => self.atom_index.checked_sub(1).map(Self::level0),
        }
    }

    /// The atom index at the innermost level
    pub fn final_index(&self) -> usize {
        match &self.sub_index {
            Some(sub_index) if self.sub_index_type != SubIndexType::None => sub_index.final_index(),
            _ => self.atom_index,
        }
    }

    /// The branch type of the innermost level that has a branch
    pub fn final_sub_index_type(&self) -> SubIndexType {
        match &self.sub_index {
            Some(sub_index) if sub_index.sub_index.is_some() => sub_index.final_sub_index_type(),
            _ => self.sub_index_type,
        }
    }

    pub fn has_sub_index_of_type(&self, sub_index_type: SubIndexType) -> bool {
        self.sub_index_type == sub_index_type
            || self
                .sub_index
                .as_ref()
                .is_some_and(|s| s.has_sub_index_of_type(sub_index_type))
    }

    /// Whether both indexes address the same list
    pub fn is_at_same_level(&self, other: &MathListIndex) -> bool {
        if self.sub_index_type != other.sub_index_type {
            return false;
        }
        if self.sub_index_type == SubIndexType::None {
            return true;
        }
        if self.atom_index != other.atom_index {
            return false;
        }
        match (&self.sub_index, &other.sub_index) {
            (Some(a), Some(b)) => a.is_at_same_level(b),
            (None, None) => true,
            _ => false,
        }
    }

    pub fn is_at_beginning_of_line(&self) -> bool {
        self.final_index() == 0
    }
}

impl fmt::Display for MathListIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_index {
            Some(sub_index) => write!(
                f,
                "[{}, {:?}:{}]",
                self.atom_index, self.sub_index_type, sub_index
            ),
            None => write!(f, "[{}]", self.atom_index),
        }
    }
}

/// A span of atoms in one list, starting at `start`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MathListRange {
    start: MathListIndex,
    length: usize,
}

impl MathListRange {
    pub fn new(start: MathListIndex, length: usize) -> Self {
        Self { start, length }
    }

    /// A range of atoms in the root list
    pub fn from_flat(range: Range<usize>) -> Self {
        Self::new(MathListIndex::level0(range.start), range.len())
    }

    pub fn start(&self) -> &MathListIndex {
        &self.start
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// The flat range, only defined for root level ranges
    pub fn to_flat(&self) -> Option<Range<usize>> {
        if self.start.sub_index_type != SubIndexType::None {
            return None;
        }
        Some(self.start.atom_index..self.start.atom_index + self.length)
    }

    /// The same span expressed one level deeper
    pub fn sub_index_range(&self) -> Option<MathListRange> {
        if self.start.sub_index_type == SubIndexType::None {
            return None;
        }
        let sub_index = self.start.sub_index()?;
        Some(Self::new(sub_index.clone(), self.length))
    }

    /// The span at the innermost level
    pub fn final_range(&self) -> Range<usize> {
        let start = self.start.final_index();
        start..start + self.length
    }

    /// The smallest range covering both, when they share a level
    pub fn union(&self, other: &MathListRange) -> Option<MathListRange> {
        if !self.start.is_at_same_level(&other.start) {
            return None;
        }
        let r1 = self.final_range();
        let r2 = other.final_range();
        let start = r1.start.min(r2.start);
        let end = r1.end.max(r2.end);
        let start_index = if start == r1.start {
            self.start.clone()
        } else {
            other.start.clone()
        };
        Some(Self::new(start_index, end - start))
    }

    /// Union of every range; `None` if empty or the levels differ
    pub fn union_ranges(ranges: &[MathListRange]) -> Option<MathListRange> {
        let (first, rest) = ranges.split_first()?;
        rest.iter()
            .try_fold(first.clone(), |acc, range| acc.union(range))
    }
}

impl fmt::Display for MathListRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.start, self.length)
    }
}
