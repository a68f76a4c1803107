//! Core editor types: positions and selections.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in the document: block index plus char offset inside that block.
///
/// Offsets count chars, not bytes; an inline image counts as one unit. Leaf
/// blocks (rules, images) only have offset 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub block: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }

    /// Start of the given block.
    pub fn block_start(block: usize) -> Self {
        Self { block, offset: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.offset)
    }
}

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    /// Where selection started
    pub anchor: Position,
    /// Where cursor is now
    pub head: Position,
}

impl Selection {
    pub fn new(anchor: Position, head: Position) -> Self {
        Self { anchor, head }
    }

    /// A collapsed selection (cursor position).
    pub fn collapsed(at: Position) -> Self {
        Self {
            anchor: at,
            head: at,
        }
    }

    /// Convenience for a selection inside one block.
    pub fn in_block(block: usize, anchor: usize, head: usize) -> Self {
        Self::new(Position::new(block, anchor), Position::new(block, head))
    }

    pub fn start(&self) -> Position {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> Position {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Check if the selection is backwards (head before anchor).
    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }

    /// Indices of every block the selection touches, in order.
    pub fn blocks(&self) -> std::ops::RangeInclusive<usize> {
        self.start().block..=self.end().block
    }

    /// Check if a position is within the selection (end exclusive).
    pub fn contains(&self, pos: Position) -> bool {
        pos >= self.start() && pos < self.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_bounds() {
        // Forward selection
        let sel = Selection::in_block(0, 5, 10);
        assert_eq!(sel.start(), Position::new(0, 5));
        assert_eq!(sel.end(), Position::new(0, 10));
        assert!(!sel.is_backwards());

        // Backward selection across blocks
        let sel = Selection::new(Position::new(2, 1), Position::new(0, 7));
        assert_eq!(sel.start(), Position::new(0, 7));
        assert_eq!(sel.end(), Position::new(2, 1));
        assert!(sel.is_backwards());
        assert_eq!(sel.blocks(), 0..=2);
    }

    #[test]
    fn test_selection_collapsed() {
        let sel = Selection::collapsed(Position::new(1, 7));
        assert!(sel.is_collapsed());
        assert_eq!(sel.start(), sel.end());
        assert_eq!(sel.blocks(), 1..=1);
    }

    #[test]
    fn test_selection_contains() {
        let sel = Selection::new(Position::new(0, 5), Position::new(1, 2));
        assert!(!sel.contains(Position::new(0, 4)));
        assert!(sel.contains(Position::new(0, 5)));
        assert!(sel.contains(Position::new(0, 40)));
        assert!(sel.contains(Position::new(1, 1)));
        assert!(!sel.contains(Position::new(1, 2))); // end is exclusive
    }
}
