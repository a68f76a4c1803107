//! Chained command builders.
//!
//! ```ignore
//! editor.chain().toggle_bold().set_text_align(TextAlign::Center).run();
//! if editor.can().chain().undo().run() { /* enable the button */ }
//! ```

use smol_str::SmolStr;

use crate::commands::{BlockAttribute, Command, InsertTarget, NodeSpec};
use crate::content::ImageAttrs;
use crate::document::{BlockType, TextAlign};
use crate::editor::Editor;
use crate::error::CommandError;
use crate::marks::{Mark, MarkKind, TextStyleAttr};
use crate::types::Selection;

/// Shared builder surface of [`Chain`] and [`CanChain`].
pub trait ChainBuilder: Sized {
    fn command(self, command: Command) -> Self;

    fn toggle_mark(self, mark: Mark) -> Self {
        self.command(Command::ToggleMark(mark))
    }

    fn toggle_bold(self) -> Self {
        self.toggle_mark(Mark::Bold)
    }

    fn toggle_italic(self) -> Self {
        self.toggle_mark(Mark::Italic)
    }

    fn toggle_strike(self) -> Self {
        self.toggle_mark(Mark::Strike)
    }

    fn toggle_code(self) -> Self {
        self.toggle_mark(Mark::Code)
    }

    fn set_mark(self, mark: Mark) -> Self {
        self.command(Command::SetMark(mark))
    }

    fn unset_mark(self, kind: MarkKind) -> Self {
        self.command(Command::UnsetMark(kind))
    }

    fn set_font_size(self, size: impl Into<SmolStr>) -> Self {
        self.set_mark(Mark::font_size(size))
    }

    fn unset_font_size(self) -> Self {
        self.unset_mark(MarkKind::FontSize)
    }

    fn update_text_style(self, attr: TextStyleAttr, value: Option<SmolStr>) -> Self {
        self.command(Command::UpdateTextStyle { attr, value })
    }

    fn set_color(self, color: impl Into<SmolStr>) -> Self {
        self.update_text_style(TextStyleAttr::Color, Some(color.into()))
    }

    fn unset_color(self) -> Self {
        self.update_text_style(TextStyleAttr::Color, None)
    }

    fn unset_all_marks(self) -> Self {
        self.command(Command::UnsetAllMarks)
    }

    fn set_block_type(self, ty: BlockType) -> Self {
        self.command(Command::SetBlockType(ty))
    }

    fn set_paragraph(self) -> Self {
        self.set_block_type(BlockType::Paragraph)
    }

    fn toggle_block_type(self, ty: BlockType) -> Self {
        self.command(Command::ToggleBlockType(ty))
    }

    fn toggle_bullet_list(self) -> Self {
        self.toggle_block_type(BlockType::BulletListItem)
    }

    fn toggle_ordered_list(self) -> Self {
        self.toggle_block_type(BlockType::OrderedListItem)
    }

    fn toggle_code_block(self) -> Self {
        self.toggle_block_type(BlockType::CodeBlock)
    }

    fn set_text_align(self, align: TextAlign) -> Self {
        self.command(Command::SetBlockAttribute(BlockAttribute::TextAlign(align)))
    }

    fn insert_node(self, node: NodeSpec, target: InsertTarget) -> Self {
        self.command(Command::InsertNode { node, target })
    }

    fn set_image(self, image: ImageAttrs) -> Self {
        self.insert_node(NodeSpec::Image(image), InsertTarget::Cursor)
    }

    fn set_horizontal_rule(self) -> Self {
        self.insert_node(NodeSpec::HorizontalRule, InsertTarget::Cursor)
    }

    fn insert_text(self, text: impl Into<String>) -> Self {
        self.command(Command::InsertText(text.into()))
    }

    fn delete_selection(self) -> Self {
        self.command(Command::DeleteSelection)
    }

    fn delete_backward(self) -> Self {
        self.command(Command::DeleteBackward)
    }

    fn split_block(self) -> Self {
        self.command(Command::SplitBlock)
    }

    fn set_selection(self, selection: Selection) -> Self {
        self.command(Command::SetSelection(selection))
    }

    fn select_all(self) -> Self {
        self.command(Command::SelectAll)
    }

    fn undo(self) -> Self {
        self.command(Command::Undo)
    }

    fn redo(self) -> Self {
        self.command(Command::Redo)
    }
}

/// A chain that commits on [`Chain::run`].
#[must_use = "a chain does nothing until `run` is called"]
pub struct Chain<'e> {
    editor: &'e mut Editor,
    commands: Vec<Command>,
}

impl<'e> Chain<'e> {
    pub(crate) fn new(editor: &'e mut Editor) -> Self {
        Self {
            editor,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Commit every step, or nothing. Returns whether the chain committed.
    pub fn run(self) -> bool {
        self.try_run().is_ok()
    }

    pub fn try_run(self) -> Result<(), CommandError> {
        self.editor.run(&self.commands)
    }
}

impl ChainBuilder for Chain<'_> {
    fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }
}

/// Dry-run entry point returned by [`Editor::can`].
pub struct Can<'e> {
    editor: &'e Editor,
}

impl<'e> Can<'e> {
    pub(crate) fn new(editor: &'e Editor) -> Self {
        Self { editor }
    }

    pub fn chain(self) -> CanChain<'e> {
        CanChain {
            editor: self.editor,
            commands: Vec::new(),
        }
    }
}

/// A chain validated against a scratch copy; never commits.
#[must_use = "a chain does nothing until `run` is called"]
pub struct CanChain<'e> {
    editor: &'e Editor,
    commands: Vec<Command>,
}

impl CanChain<'_> {
    pub fn run(self) -> bool {
        self.editor.check(&self.commands).is_ok()
    }

    pub fn try_run(self) -> Result<(), CommandError> {
        self.editor.check(&self.commands)
    }
}

impl ChainBuilder for CanChain<'_> {
    fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }
}
