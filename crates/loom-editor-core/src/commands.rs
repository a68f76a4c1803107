//! The closed set of editor commands.
//!
//! Commands are plain data. The transaction engine dispatches on them with a
//! single `match`; chains are built from them by [`crate::chain::ChainBuilder`].

use smol_str::SmolStr;

use crate::content::ImageAttrs;
use crate::document::{BlockType, TextAlign};
use crate::marks::{Mark, MarkKind, TextStyleAttr};
use crate::types::Selection;

/// A leaf node that can be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSpec {
    Image(ImageAttrs),
    HorizontalRule,
}

/// Where an inserted node goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertTarget {
    /// Replace the selection and land on the new node.
    #[default]
    Cursor,
    /// Append after the last block, keeping the selection.
    End,
}

/// Block attributes settable by command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAttribute {
    TextAlign(TextAlign),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Remove the mark where the whole range already carries it, apply it otherwise.
    ToggleMark(Mark),
    SetMark(Mark),
    UnsetMark(MarkKind),
    /// Set or clear one attribute of the text-style carrier.
    UpdateTextStyle {
        attr: TextStyleAttr,
        value: Option<SmolStr>,
    },
    UnsetAllMarks,
    SetBlockType(BlockType),
    /// Set the type, or revert to paragraph if every touched block already has it.
    ToggleBlockType(BlockType),
    SetBlockAttribute(BlockAttribute),
    InsertNode {
        node: NodeSpec,
        target: InsertTarget,
    },
    InsertText(String),
    DeleteSelection,
    DeleteBackward,
    SplitBlock,
    SetSelection(Selection),
    SelectAll,
    Undo,
    Redo,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ToggleMark(_) => "toggleMark",
            Command::SetMark(_) => "setMark",
            Command::UnsetMark(_) => "unsetMark",
            Command::UpdateTextStyle { .. } => "updateTextStyle",
            Command::UnsetAllMarks => "unsetAllMarks",
            Command::SetBlockType(_) => "setBlockType",
            Command::ToggleBlockType(_) => "toggleBlockType",
            Command::SetBlockAttribute(_) => "setBlockAttribute",
            Command::InsertNode { .. } => "insertNode",
            Command::InsertText(_) => "insertText",
            Command::DeleteSelection => "deleteSelection",
            Command::DeleteBackward => "deleteBackward",
            Command::SplitBlock => "splitBlock",
            Command::SetSelection(_) => "setSelection",
            Command::SelectAll => "selectAll",
            Command::Undo => "undo",
            Command::Redo => "redo",
        }
    }

    pub fn is_history(&self) -> bool {
        matches!(self, Command::Undo | Command::Redo)
    }
}
