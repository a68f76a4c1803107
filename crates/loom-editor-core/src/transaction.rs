//! The transaction engine.
//!
//! A [`Transaction`] works on its own copy of the editor state and history.
//! Commands are applied one at a time; the first failing command abandons the
//! whole transaction, so the caller either commits every step or none.

use std::ops::Range;

use smol_str::SmolStr;

use crate::commands::{BlockAttribute, Command, InsertTarget, NodeSpec};
use crate::content::{self, Inline};
use crate::document::{Block, BlockAttrs, BlockKind, BlockType, Document};
use crate::error::CommandError;
use crate::history::{History, HistoryEntry};
use crate::marks::{Mark, MarkKind, MarkSet, TextStyleAttr, css_value};
use crate::state::EditorState;
use crate::tracker;
use crate::types::{Position, Selection};

/// What a step did to stored marks.
enum StoredMarks {
    /// Apply the selection-change rules.
    Track,
    /// The step decided them explicitly.
    Set(Option<MarkSet>),
}

/// Outcome of a finished transaction.
#[derive(Debug, Clone)]
pub struct Applied {
    pub state: EditorState,
    pub history: History,
    pub doc_changed: bool,
    pub steps: usize,
}

pub struct Transaction {
    state: EditorState,
    history: History,
    /// State the next history entry restores. Taken once the segment records.
    checkpoint: Option<HistoryEntry>,
    doc_changed: bool,
    steps: usize,
}

impl Transaction {
    pub fn new(state: &EditorState, history: &History) -> Self {
        Self {
            checkpoint: Some(HistoryEntry {
                doc: state.doc.clone(),
                selection: state.selection,
            }),
            state: state.clone(),
            history: history.clone(),
            doc_changed: false,
            steps: 0,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn apply(&mut self, command: &Command) -> Result<(), CommandError> {
        self.steps += 1;
        match command {
            Command::Undo => return self.history_step(true),
            Command::Redo => return self.history_step(false),
            _ => {}
        }

        let before_doc = self.state.doc.clone();
        let before_sel = self.state.selection;

        let stored = match command {
            Command::ToggleMark(mark) => self.toggle_mark(&checked_mark(mark)?)?,
            Command::SetMark(mark) => self.set_mark(&checked_mark(mark)?)?,
            Command::UnsetMark(kind) => self.unset_mark(*kind)?,
            Command::UpdateTextStyle { attr, value } => {
                let value = value
                    .as_deref()
                    .map(|value| {
                        css_value(value).ok_or_else(|| CommandError::InvalidMarkValue {
                            kind: MarkKind::TextStyle,
                            value: value.into(),
                        })
                    })
                    .transpose()?;
                self.update_text_style(*attr, value)?
            }
            Command::UnsetAllMarks => self.unset_all_marks()?,
            Command::SetBlockType(ty) => self.set_block_type(*ty, "setBlockType")?,
            Command::ToggleBlockType(ty) => self.toggle_block_type(*ty)?,
            Command::SetBlockAttribute(attr) => self.set_block_attribute(*attr)?,
            Command::InsertNode { node, target } => self.insert_node(node, *target)?,
            Command::InsertText(text) => self.insert_text(text)?,
            Command::DeleteSelection => {
                if self.state.selection.is_collapsed() {
                    return Err(CommandError::CollapsedSelection);
                }
                self.delete_range();
                StoredMarks::Track
            }
            Command::DeleteBackward => self.delete_backward()?,
            Command::SplitBlock => self.split_block()?,
            Command::SetSelection(selection) => {
                if !self.state.doc.is_valid_selection(selection) {
                    return Err(CommandError::InvalidSelection {
                        anchor: selection.anchor,
                        head: selection.head,
                    });
                }
                self.state.selection = *selection;
                StoredMarks::Track
            }
            Command::SelectAll => {
                self.state.selection = Selection::new(
                    self.state.doc.start_position(),
                    self.state.doc.end_position(),
                );
                StoredMarks::Track
            }
            Command::Undo | Command::Redo => StoredMarks::Track,
        };

        self.state.selection = self.state.doc.clamp_selection(self.state.selection);
        self.state.stored_marks = match stored {
            StoredMarks::Set(marks) => marks.filter(|_| self.state.selection.is_collapsed()),
            StoredMarks::Track => tracker::carry_stored_marks(
                (&before_doc, before_sel),
                (&self.state.doc, self.state.selection),
                self.state.stored_marks.take(),
            ),
        };

        if self.state.doc != before_doc {
            self.doc_changed = true;
            if let Some(entry) = self.checkpoint.take() {
                self.history.record(entry);
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Applied {
        Applied {
            state: self.state,
            history: self.history,
            doc_changed: self.doc_changed,
            steps: self.steps,
        }
    }

    fn snapshot(&self) -> HistoryEntry {
        HistoryEntry {
            doc: self.state.doc.clone(),
            selection: self.state.selection,
        }
    }

    fn history_step(&mut self, undo: bool) -> Result<(), CommandError> {
        let current = self.snapshot();
        let entry = if undo {
            self.history.undo(current)
        } else {
            self.history.redo(current)
        };
        let entry = entry.ok_or(CommandError::HistoryEmpty {
            op: if undo { "undo" } else { "redo" },
        })?;
        self.state.doc = entry.doc;
        self.state.selection = entry.selection;
        self.state.stored_marks = None;
        self.doc_changed = true;
        self.checkpoint = Some(self.snapshot());
        Ok(())
    }

    fn doc(&self) -> &Document {
        &self.state.doc
    }

    fn block(&self, index: usize) -> Result<&Block, CommandError> {
        let selection = self.state.selection;
        self.state
            .doc
            .block(index)
            .ok_or(CommandError::InvalidSelection {
                anchor: selection.anchor,
                head: selection.head,
            })
    }

    fn block_mut(&mut self, index: usize) -> Result<&mut Block, CommandError> {
        let selection = self.state.selection;
        self.state
            .doc
            .block_mut(index)
            .ok_or(CommandError::InvalidSelection {
                anchor: selection.anchor,
                head: selection.head,
            })
    }

    fn collapse_to(&mut self, pos: Position) {
        self.state.selection = Selection::collapsed(pos);
    }

    // --- marks ---

    /// Non-empty selected ranges inside blocks that take marks.
    fn markable_ranges(&self) -> Vec<(usize, Range<usize>)> {
        self.doc()
            .selection_ranges(&self.state.selection)
            .into_iter()
            .filter(|(index, range)| {
                range.start < range.end
                    && self
                        .doc()
                        .block(*index)
                        .is_some_and(|block| block.kind.accepts_marks())
            })
            .collect()
    }

    fn touches_markable(&self) -> bool {
        self.state
            .selection
            .blocks()
            .any(|index| self.doc().block(index).is_some_and(|b| b.kind.accepts_marks()))
    }

    /// Mark sets of text runs that can take a mark of `kind` (code runs refuse
    /// everything but code).
    fn eligible_runs(&self, ranges: &[(usize, Range<usize>)], kind: MarkKind) -> Vec<MarkSet> {
        ranges
            .iter()
            .filter_map(|(index, range)| {
                let block = self.doc().block(*index)?;
                Some(content::text_marks_in(&block.content, range.clone()))
            })
            .flatten()
            .map(|(marks, _)| marks)
            .filter(|marks| kind == MarkKind::Code || !marks.has_kind(MarkKind::Code))
            .cloned()
            .collect()
    }

    /// Marks at a collapsed cursor, failing where marks cannot go.
    fn cursor_marks(&self) -> Result<MarkSet, CommandError> {
        let head = self.state.selection.head;
        match self.doc().block(head.block) {
            Some(block) if block.kind.accepts_marks() => Ok(tracker::cursor_marks(&self.state)),
            _ => Err(CommandError::NothingToMark),
        }
    }

    fn map_ranges(&mut self, ranges: &[(usize, Range<usize>)], mut f: impl FnMut(&mut MarkSet)) {
        for (index, range) in ranges {
            if let Some(block) = self.state.doc.block_mut(*index) {
                block.content = content::map_marks(&block.content, range.clone(), &mut f);
            }
        }
    }

    fn toggle_mark(&mut self, mark: &Mark) -> Result<StoredMarks, CommandError> {
        if self.state.selection.is_collapsed() {
            let marks = self.cursor_marks()?;
            let next = if marks.contains(mark) {
                marks.without(mark.kind())
            } else {
                marks.with(mark.clone())
            };
            return Ok(StoredMarks::Set(Some(next)));
        }
        let ranges = self.markable_ranges();
        let runs = self.eligible_runs(&ranges, mark.kind());
        if runs.is_empty() {
            return Err(CommandError::NothingToMark);
        }
        if runs.iter().all(|marks| marks.contains(mark)) {
            let kind = mark.kind();
            self.map_ranges(&ranges, |marks| {
                marks.remove(kind);
            });
        } else {
            self.map_ranges(&ranges, |marks| {
                marks.insert(mark.clone());
            });
        }
        Ok(StoredMarks::Set(None))
    }

    fn set_mark(&mut self, mark: &Mark) -> Result<StoredMarks, CommandError> {
        if self.state.selection.is_collapsed() {
            let marks = self.cursor_marks()?;
            return Ok(StoredMarks::Set(Some(marks.with(mark.clone()))));
        }
        let ranges = self.markable_ranges();
        if self.eligible_runs(&ranges, mark.kind()).is_empty() {
            return Err(CommandError::NothingToMark);
        }
        self.map_ranges(&ranges, |marks| {
            marks.insert(mark.clone());
        });
        Ok(StoredMarks::Set(None))
    }

    fn unset_mark(&mut self, kind: MarkKind) -> Result<StoredMarks, CommandError> {
        if self.state.selection.is_collapsed() {
            let marks = self.cursor_marks()?;
            return Ok(StoredMarks::Set(Some(marks.without(kind))));
        }
        if !self.touches_markable() {
            return Err(CommandError::NothingToMark);
        }
        let ranges = self.markable_ranges();
        self.map_ranges(&ranges, |marks| {
            marks.remove(kind);
        });
        Ok(StoredMarks::Set(None))
    }

    fn update_text_style(
        &mut self,
        attr: TextStyleAttr,
        value: Option<SmolStr>,
    ) -> Result<StoredMarks, CommandError> {
        if self.state.selection.is_collapsed() {
            let mut marks = self.cursor_marks()?;
            marks.update_text_style(attr, value);
            return Ok(StoredMarks::Set(Some(marks)));
        }
        let ranges = self.markable_ranges();
        let possible = match value {
            Some(_) => !self.eligible_runs(&ranges, MarkKind::TextStyle).is_empty(),
            None => self.touches_markable(),
        };
        if !possible {
            return Err(CommandError::NothingToMark);
        }
        self.map_ranges(&ranges, |marks| marks.update_text_style(attr, value.clone()));
        Ok(StoredMarks::Set(None))
    }

    fn unset_all_marks(&mut self) -> Result<StoredMarks, CommandError> {
        if self.state.selection.is_collapsed() {
            self.cursor_marks()?;
            return Ok(StoredMarks::Set(Some(MarkSet::new())));
        }
        if !self.touches_markable() {
            return Err(CommandError::NothingToMark);
        }
        let ranges = self.markable_ranges();
        self.map_ranges(&ranges, |marks| *marks = MarkSet::new());
        Ok(StoredMarks::Set(None))
    }

    // --- blocks ---

    fn touched_blocks(&self, pred: impl Fn(&Block) -> bool) -> Vec<usize> {
        self.state
            .selection
            .blocks()
            .filter(|index| self.doc().block(*index).is_some_and(&pred))
            .collect()
    }

    fn set_block_type(
        &mut self,
        ty: BlockType,
        command: &'static str,
    ) -> Result<StoredMarks, CommandError> {
        let targets = self.touched_blocks(Block::is_textblock);
        if targets.is_empty() {
            return Err(CommandError::UnsupportedBlock { command });
        }
        for index in targets {
            let block = self.block(index)?;
            if block.kind.block_type() == Some(ty) {
                continue;
            }
            if ty == BlockType::CodeBlock {
                // inline images are dropped; pull positions in this block back
                let inline = block.content.clone();
                let remap = |pos: Position| {
                    if pos.block == index {
                        Position::new(index, content::offset_without_images(&inline, pos.offset))
                    } else {
                        pos
                    }
                };
                let selection = self.state.selection;
                self.state.selection =
                    Selection::new(remap(selection.anchor), remap(selection.head));
            }
            self.block_mut(index)?.convert(ty.kind());
        }
        Ok(StoredMarks::Track)
    }

    fn toggle_block_type(&mut self, ty: BlockType) -> Result<StoredMarks, CommandError> {
        let targets = self.touched_blocks(Block::is_textblock);
        let all_match = !targets.is_empty()
            && targets
                .iter()
                .all(|index| self.doc().block(*index).and_then(|b| b.kind.block_type()) == Some(ty));
        if all_match {
            self.set_block_type(BlockType::Paragraph, "toggleBlockType")
        } else {
            self.set_block_type(ty, "toggleBlockType")
        }
    }

    fn set_block_attribute(&mut self, attr: BlockAttribute) -> Result<StoredMarks, CommandError> {
        let targets = self.touched_blocks(|block| block.kind.supports_alignment());
        if targets.is_empty() {
            return Err(CommandError::UnsupportedBlock {
                command: "setBlockAttribute",
            });
        }
        for index in targets {
            let block = self.block_mut(index)?;
            match attr {
                BlockAttribute::TextAlign(align) => block.attrs.text_align = align,
            }
        }
        Ok(StoredMarks::Track)
    }

    /// Split the text block at `pos`; the second half gets a fresh id.
    fn split_at(&mut self, pos: Position) -> Result<(), CommandError> {
        let block = self.block(pos.block)?;
        let (left, right) = content::split_content(&block.content, pos.offset);
        let kind = block.kind.clone();
        let attrs = block.attrs;
        self.block_mut(pos.block)?.content = left;
        self.state.doc.insert_block(pos.block + 1, kind, attrs, right);
        Ok(())
    }

    fn insert_node(&mut self, node: &NodeSpec, target: InsertTarget) -> Result<StoredMarks, CommandError> {
        let kind = match node {
            NodeSpec::Image(attrs) => BlockKind::Image(attrs.clone()),
            NodeSpec::HorizontalRule => BlockKind::HorizontalRule,
        };

        if target == InsertTarget::End {
            let end = self.doc().len();
            self.state
                .doc
                .insert_block(end, kind, BlockAttrs::default(), Vec::new());
            return Ok(StoredMarks::Track);
        }

        if !self.state.selection.is_collapsed() {
            self.delete_range();
        }
        let pos = self.state.selection.head;
        let block = self.block(pos.block)?;
        let index = if block.kind.is_leaf() {
            pos.block + 1
        } else if block.is_empty() {
            // the new node takes the empty block's place
            self.state
                .doc
                .insert_block(pos.block, kind, BlockAttrs::default(), Vec::new());
            self.state.doc.remove_blocks(pos.block + 1..pos.block + 2);
            self.collapse_to(Position::block_start(pos.block));
            return Ok(StoredMarks::Track);
        } else if pos.offset == 0 {
            pos.block
        } else if pos.offset >= block.len() {
            pos.block + 1
        } else {
            self.split_at(pos)?;
            pos.block + 1
        };
        self.state
            .doc
            .insert_block(index, kind, BlockAttrs::default(), Vec::new());
        self.collapse_to(Position::block_start(index));
        Ok(StoredMarks::Track)
    }

    // --- text ---

    /// Make sure the cursor sits in a text block, opening a paragraph after a
    /// leaf if needed.
    fn ensure_textblock(&mut self) -> Result<Position, CommandError> {
        let pos = self.state.selection.head;
        if self.block(pos.block)?.kind.is_leaf() {
            self.state
                .doc
                .insert_block(pos.block + 1, BlockKind::Paragraph, BlockAttrs::default(), Vec::new());
            let pos = Position::block_start(pos.block + 1);
            self.collapse_to(pos);
            return Ok(pos);
        }
        Ok(pos)
    }

    fn insert_text(&mut self, text: &str) -> Result<StoredMarks, CommandError> {
        let text = text.replace('\r', "");
        if text.is_empty() {
            return Ok(StoredMarks::Track);
        }
        let marks = if self.state.selection.is_collapsed() {
            tracker::cursor_marks(&self.state)
        } else {
            tracker::ambient_marks(self.doc(), self.state.selection.start())
        };
        if !self.state.selection.is_collapsed() {
            self.delete_range();
        }
        let mut pos = self.ensure_textblock()?;

        if self.block(pos.block)?.kind.is_code() {
            let block = self.block_mut(pos.block)?;
            block.content = content::insert_at(&block.content, pos.offset, vec![Inline::plain(text.as_str())]);
            self.collapse_to(Position::new(pos.block, pos.offset + text.chars().count()));
            return Ok(StoredMarks::Set(None));
        }

        let marks = if self.block(pos.block)?.kind.accepts_marks() {
            marks
        } else {
            MarkSet::new()
        };
        for (i, segment) in text.split('\n').enumerate() {
            if i > 0 {
                self.split_at(pos)?;
                pos = Position::block_start(pos.block + 1);
            }
            let block = self.block_mut(pos.block)?;
            block.content = content::insert_at(
                &block.content,
                pos.offset,
                vec![Inline::text(segment, marks.clone())],
            );
            pos.offset += segment.chars().count();
        }
        self.collapse_to(pos);
        Ok(StoredMarks::Set(None))
    }

    /// Remove the selected range, joining the blocks at its edges. A leaf at
    /// the start of the range is removed; a leaf at its end is kept.
    fn delete_range(&mut self) {
        let start = self.state.selection.start();
        let end = self.state.selection.end();
        self.collapse_to(start);

        if start.block == end.block {
            if let Some(block) = self.state.doc.block_mut(start.block) {
                if block.is_textblock() {
                    block.content = content::remove_range(&block.content, start.offset..end.offset);
                }
            }
            return;
        }

        let (start_text, start_kind) = match self.doc().block(start.block) {
            Some(block) => (block.is_textblock(), block.kind.clone()),
            None => return,
        };
        let tail = self
            .doc()
            .block(end.block)
            .filter(|block| block.is_textblock())
            .map(|block| content::slice_content(&block.content, end.offset..block.len()));

        if start_text {
            let remove_to = if tail.is_some() { end.block + 1 } else { end.block };
            if let Some(block) = self.state.doc.block_mut(start.block) {
                let (mut head, _) = content::split_content(&block.content, start.offset);
                if let Some(tail) = tail {
                    head.extend(Block::content_for(tail, &start_kind));
                }
                block.content = content::normalize(head);
            }
            self.state.doc.remove_blocks(start.block + 1..remove_to);
        } else {
            if let Some(tail) = tail {
                if let Some(block) = self.state.doc.block_mut(end.block) {
                    block.content = tail;
                }
            }
            self.state.doc.remove_blocks(start.block..end.block);
            self.collapse_to(Position::block_start(start.block));
        }
    }

    fn delete_backward(&mut self) -> Result<StoredMarks, CommandError> {
        if !self.state.selection.is_collapsed() {
            self.delete_range();
            return Ok(StoredMarks::Track);
        }
        let pos = self.state.selection.head;
        let block = self.block(pos.block)?;

        if block.kind.is_leaf() {
            self.state.doc.remove_blocks(pos.block..pos.block + 1);
            let target = match pos.block.checked_sub(1) {
                Some(prev) => Position::new(prev, self.block(prev)?.len()),
                None => Position::block_start(0),
            };
            self.collapse_to(target);
            return Ok(StoredMarks::Track);
        }

        if pos.offset > 0 {
            let block = self.block_mut(pos.block)?;
            block.content = content::remove_range(&block.content, pos.offset - 1..pos.offset);
            self.collapse_to(Position::new(pos.block, pos.offset - 1));
            return Ok(StoredMarks::Track);
        }

        let lift = match &block.kind {
            BlockKind::BulletListItem | BlockKind::OrderedListItem => true,
            BlockKind::CodeBlock { .. } => block.is_empty(),
            _ => false,
        };
        if lift {
            self.block_mut(pos.block)?.convert(BlockKind::Paragraph);
            return Ok(StoredMarks::Track);
        }

        let Some(prev_index) = pos.block.checked_sub(1) else {
            return Err(CommandError::NothingToDelete);
        };
        let prev = self.block(prev_index)?;
        if prev.kind.is_leaf() {
            self.state.doc.remove_blocks(prev_index..pos.block);
            self.collapse_to(Position::block_start(prev_index));
            return Ok(StoredMarks::Track);
        }

        let prev_len = prev.len();
        let moved = Block::content_for(block.content.clone(), &prev.kind);
        let prev = self.block_mut(prev_index)?;
        let mut joined = prev.content.clone();
        joined.extend(moved);
        prev.content = content::normalize(joined);
        self.state.doc.remove_blocks(pos.block..pos.block + 1);
        self.collapse_to(Position::new(prev_index, prev_len));
        Ok(StoredMarks::Track)
    }

    fn split_block(&mut self) -> Result<StoredMarks, CommandError> {
        if !self.state.selection.is_collapsed() {
            self.delete_range();
        }
        let pos = self.state.selection.head;
        let block = self.block(pos.block)?;

        if block.kind.is_leaf() {
            self.ensure_textblock()?;
            return Ok(StoredMarks::Track);
        }
        if block.kind.is_code() {
            let block = self.block_mut(pos.block)?;
            block.content = content::insert_at(&block.content, pos.offset, vec![Inline::plain("\n")]);
            self.collapse_to(Position::new(pos.block, pos.offset + 1));
            return Ok(StoredMarks::Track);
        }
        if matches!(block.kind, BlockKind::BulletListItem | BlockKind::OrderedListItem)
            && block.is_empty()
        {
            // an empty item leaves the list
            self.block_mut(pos.block)?.convert(BlockKind::Paragraph);
            return Ok(StoredMarks::Track);
        }

        let marks = tracker::cursor_marks(&self.state);
        self.split_at(pos)?;
        self.collapse_to(Position::block_start(pos.block + 1));
        Ok(StoredMarks::Set((!marks.is_empty()).then_some(marks)))
    }
}

fn checked_mark(mark: &Mark) -> Result<Mark, CommandError> {
    mark.normalized().ok_or_else(|| {
        let value = match mark {
            Mark::FontSize { size } => size.clone(),
            Mark::TextStyle(style) => style
                .iter()
                .map(|(_, value)| value)
                .find(|value| css_value(value).is_none())
                .cloned()
                .unwrap_or_default(),
            _ => SmolStr::default(),
        };
        CommandError::InvalidMarkValue {
            kind: mark.kind(),
            value,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ImageAttrs;

    fn run(state: EditorState, commands: &[Command]) -> Result<Applied, CommandError> {
        let mut tx = Transaction::new(&state, &History::default());
        for command in commands {
            tx.apply(command)?;
        }
        Ok(tx.finish())
    }

    fn text_state(text: &str, anchor: usize, head: usize) -> EditorState {
        EditorState::with_selection(
            Document::builder().text(text).build(),
            Selection::in_block(0, anchor, head),
        )
    }

    fn texts(doc: &Document) -> Vec<String> {
        doc.blocks().map(Block::text).collect()
    }

    #[test]
    fn test_toggle_bold_range() {
        let applied = run(text_state("hello world", 0, 5), &[Command::ToggleMark(Mark::Bold)])
            .expect("toggle");
        let block = applied.state.doc.block(0).expect("block");
        assert_eq!(
            block.content,
            vec![
                Inline::text("hello", MarkSet::new().with(Mark::Bold)),
                Inline::plain(" world"),
            ]
        );
        assert!(applied.doc_changed);
        assert_eq!(applied.history.undo_depth(), 1);
    }

    #[test]
    fn test_toggle_collapsed_sets_stored_marks_only() {
        let state = text_state("hello", 5, 5);
        let applied = run(state.clone(), &[Command::ToggleMark(Mark::Italic)]).expect("toggle");
        assert_eq!(applied.state.doc, state.doc);
        assert_eq!(
            applied.state.stored_marks,
            Some(MarkSet::new().with(Mark::Italic))
        );
        assert!(!applied.doc_changed);
        assert!(!applied.history.can_undo());
    }

    #[test]
    fn test_blank_mark_values_are_rejected() {
        let result = run(text_state("ab", 0, 2), &[Command::SetMark(Mark::font_size(""))]);
        assert_eq!(
            result.err(),
            Some(CommandError::InvalidMarkValue {
                kind: MarkKind::FontSize,
                value: "".into(),
            })
        );

        let result = run(
            text_state("ab", 1, 1),
            &[Command::UpdateTextStyle {
                attr: TextStyleAttr::Color,
                value: Some("  ".into()),
            }],
        );
        assert!(matches!(result, Err(CommandError::InvalidMarkValue { .. })));

        let applied = run(
            text_state("ab", 0, 2),
            &[Command::ToggleMark(Mark::font_size(" 20px "))],
        )
        .expect("trimmed size");
        let block = applied.state.doc.block(0).expect("block");
        assert_eq!(
            block.content,
            vec![Inline::text("ab", MarkSet::new().with(Mark::font_size("20px")))]
        );
    }

    #[test]
    fn test_mark_in_code_block_fails() {
        let state = EditorState::with_selection(
            Document::builder().code_block(None, "let x").build(),
            Selection::in_block(0, 0, 3),
        );
        assert_eq!(
            run(state, &[Command::ToggleMark(Mark::Bold)]).err(),
            Some(CommandError::NothingToMark)
        );
    }

    #[test]
    fn test_insert_text_uses_stored_then_clears() {
        let state = text_state("ab", 2, 2);
        let applied = run(
            state,
            &[
                Command::SetMark(Mark::font_size("24px")),
                Command::InsertText("c".into()),
                Command::InsertText("d".into()),
            ],
        )
        .expect("typing");
        let block = applied.state.doc.block(0).expect("block");
        // "d" inherits from the char before it, which is the sized "c"
        assert_eq!(
            block.content,
            vec![
                Inline::plain("ab"),
                Inline::text("cd", MarkSet::new().with(Mark::font_size("24px"))),
            ]
        );
        assert_eq!(applied.state.stored_marks, None);
        // one entry for the whole transaction
        assert_eq!(applied.history.undo_depth(), 1);
    }

    #[test]
    fn test_insert_text_newline_splits_paragraph() {
        let applied = run(text_state("ab", 1, 1), &[Command::InsertText("x\ny".into())])
            .expect("insert");
        assert_eq!(texts(&applied.state.doc), vec!["ax", "yb"]);
        assert_eq!(applied.state.selection, Selection::in_block(1, 1, 1));
    }

    #[test]
    fn test_insert_image_splits_block() {
        let attrs = ImageAttrs::new("a.png").with_alt("a.png");
        let applied = run(
            text_state("abcd", 2, 2),
            &[Command::InsertNode {
                node: NodeSpec::Image(attrs.clone()),
                target: InsertTarget::Cursor,
            }],
        )
        .expect("insert");
        let doc = &applied.state.doc;
        assert_eq!(texts(doc), vec!["ab", "", "cd"]);
        assert_eq!(doc.block(1).map(|b| &b.kind), Some(&BlockKind::Image(attrs)));
        assert_eq!(applied.state.selection, Selection::collapsed(Position::new(1, 0)));
    }

    #[test]
    fn test_insert_image_into_empty_paragraph_replaces_it() {
        let applied = run(
            EditorState::new(Document::new()),
            &[Command::InsertNode {
                node: NodeSpec::HorizontalRule,
                target: InsertTarget::Cursor,
            }],
        )
        .expect("insert");
        assert_eq!(applied.state.doc.len(), 1);
        assert_eq!(
            applied.state.doc.block(0).map(|b| &b.kind),
            Some(&BlockKind::HorizontalRule)
        );
    }

    #[test]
    fn test_insert_at_end_keeps_selection() {
        let state = text_state("abc", 1, 2);
        let applied = run(
            state.clone(),
            &[Command::InsertNode {
                node: NodeSpec::HorizontalRule,
                target: InsertTarget::End,
            }],
        )
        .expect("insert");
        assert_eq!(applied.state.doc.len(), 2);
        assert_eq!(applied.state.selection, state.selection);
    }

    #[test]
    fn test_delete_across_blocks_joins() {
        let state = EditorState::with_selection(
            Document::builder().text("hello").rule().text("world").build(),
            Selection::new(Position::new(0, 2), Position::new(2, 3)),
        );
        let applied = run(state, &[Command::DeleteSelection]).expect("delete");
        assert_eq!(texts(&applied.state.doc), vec!["held"]);
        assert_eq!(applied.state.selection, Selection::in_block(0, 2, 2));
    }

    #[test]
    fn test_delete_backward_joins_and_lifts() {
        let doc = Document::builder()
            .text("ab")
            .bullet_item(vec![Inline::plain("cd")])
            .build();
        let state = EditorState::with_selection(doc, Selection::in_block(1, 0, 0));
        let applied = run(state, &[Command::DeleteBackward]).expect("lift");
        assert_eq!(
            applied.state.doc.block(1).map(|b| &b.kind),
            Some(&BlockKind::Paragraph)
        );

        let applied = run(applied.state, &[Command::DeleteBackward]).expect("join");
        assert_eq!(texts(&applied.state.doc), vec!["abcd"]);
        assert_eq!(applied.state.selection, Selection::in_block(0, 2, 2));

        let at_start = EditorState::with_selection(applied.state.doc, Selection::in_block(0, 0, 0));
        assert_eq!(
            run(at_start, &[Command::DeleteBackward]).err(),
            Some(CommandError::NothingToDelete)
        );
    }

    #[test]
    fn test_split_empty_list_item_exits_list() {
        let doc = Document::builder()
            .bullet_item(vec![Inline::plain("one")])
            .bullet_item(vec![])
            .build();
        let state = EditorState::with_selection(doc, Selection::in_block(1, 0, 0));
        let applied = run(state, &[Command::SplitBlock]).expect("split");
        assert_eq!(applied.state.doc.len(), 2);
        assert_eq!(
            applied.state.doc.block(1).map(|b| &b.kind),
            Some(&BlockKind::Paragraph)
        );
    }

    #[test]
    fn test_split_keeps_marks_for_next_line() {
        let doc = Document::builder()
            .paragraph(vec![Inline::text("bold", MarkSet::new().with(Mark::Bold))])
            .build();
        let state = EditorState::with_selection(doc, Selection::in_block(0, 4, 4));
        let applied = run(state, &[Command::SplitBlock, Command::InsertText("x".into())])
            .expect("split");
        let block = applied.state.doc.block(1).expect("new block");
        assert_eq!(block.content, vec![Inline::text("x", MarkSet::new().with(Mark::Bold))]);
        assert_ne!(applied.state.doc.block(0).map(|b| b.id), Some(block.id));
    }

    #[test]
    fn test_to_code_block_drops_images_and_remaps() {
        let doc = Document::builder()
            .paragraph(vec![
                Inline::plain("a"),
                Inline::Image(ImageAttrs::new("x.png")),
                Inline::plain("bc"),
            ])
            .build();
        let state = EditorState::with_selection(doc, Selection::in_block(0, 4, 4));
        let applied = run(state, &[Command::SetBlockType(BlockType::CodeBlock)]).expect("code");
        assert_eq!(texts(&applied.state.doc), vec!["abc"]);
        assert_eq!(applied.state.selection, Selection::in_block(0, 3, 3));
    }

    #[test]
    fn test_failed_step_aborts_everything() {
        let state = text_state("abc", 0, 3);
        let result = run(
            state,
            &[
                Command::ToggleMark(Mark::Bold),
                Command::SetSelection(Selection::in_block(4, 0, 0)),
            ],
        );
        assert!(matches!(result, Err(CommandError::InvalidSelection { .. })));
    }

    #[test]
    fn test_undo_within_chain_then_edit_records_new_entry() {
        let state = text_state("abc", 0, 3);
        let mut tx = Transaction::new(&state, &History::default());
        tx.apply(&Command::ToggleMark(Mark::Bold)).expect("bold");
        let after_bold = tx.finish();

        let mut tx = Transaction::new(&after_bold.state, &after_bold.history);
        tx.apply(&Command::Undo).expect("undo");
        tx.apply(&Command::ToggleMark(Mark::Italic)).expect("italic");
        let applied = tx.finish();
        assert!(!applied.history.can_redo());
        assert_eq!(applied.history.undo_depth(), 1);
    }
}
