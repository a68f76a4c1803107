use crate::document::{Block, Document};
use crate::marks::MarkSet;
use crate::types::Selection;

/// Document, selection and stored marks: everything a transaction reads and
/// replaces as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub doc: Document,
    pub selection: Selection,
    /// Marks the next typed character receives. Only meaningful while the
    /// selection is collapsed.
    pub stored_marks: Option<MarkSet>,
}

impl EditorState {
    /// State with the cursor at the end of the document.
    pub fn new(doc: Document) -> Self {
        let end = doc.end_position();
        Self {
            doc,
            selection: Selection::collapsed(end),
            stored_marks: None,
        }
    }

    /// State with the given selection, clamped into the document.
    pub fn with_selection(doc: Document, selection: Selection) -> Self {
        let selection = doc.clamp_selection(selection);
        Self {
            doc,
            selection,
            stored_marks: None,
        }
    }

    /// The block holding the selection head.
    pub fn head_block(&self) -> Option<&Block> {
        self.doc.block(self.selection.head.block)
    }
}
