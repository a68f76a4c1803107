//! Selection and stored-mark tracking.
//!
//! Stored marks are the marks the next typed character receives while the
//! cursor is collapsed. They survive a selection change only when the cursor
//! stays where it was or lands somewhere with the same surrounding marks.
//! Everything else here derives the formatting state a control surface shows.

use smol_str::SmolStr;

use crate::content;
use crate::document::Document;
use crate::marks::{MarkKind, MarkSet, TextStyleAttr};
use crate::state::EditorState;
use crate::types::{Position, Selection};

/// Formatting state of one attribute over the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkState<T> {
    /// Every character carries this value.
    Uniform(T),
    /// Values differ, or only part of the range carries one.
    Mixed,
    /// No character carries a value.
    Absent,
}

impl<T> MarkState<T> {
    pub fn uniform(&self) -> Option<&T> {
        match self {
            MarkState::Uniform(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, MarkState::Mixed)
    }
}

/// Marks of the character before `pos`. Empty at block start and outside
/// blocks that take marks.
pub fn ambient_marks(doc: &Document, pos: Position) -> MarkSet {
    match doc.block(pos.block) {
        Some(block) if block.kind.accepts_marks() => content::marks_before(&block.content, pos.offset),
        _ => MarkSet::new(),
    }
}

/// Decide whether stored marks survive a move from `before` to `after`.
pub fn carry_stored_marks(
    before: (&Document, Selection),
    after: (&Document, Selection),
    stored: Option<MarkSet>,
) -> Option<MarkSet> {
    let stored = stored?;
    let (old_doc, old_sel) = before;
    let (new_doc, new_sel) = after;
    if !new_sel.is_collapsed() {
        return None;
    }
    if old_sel.is_collapsed() && old_sel.head == new_sel.head {
        return Some(stored);
    }
    if ambient_marks(old_doc, old_sel.head) == ambient_marks(new_doc, new_sel.head) {
        return Some(stored);
    }
    None
}

/// Marks at a collapsed cursor: stored marks when present, else ambient.
pub fn cursor_marks(state: &EditorState) -> MarkSet {
    match &state.stored_marks {
        Some(stored) => stored.clone(),
        None => ambient_marks(&state.doc, state.selection.head),
    }
}

/// Mark sets of every text run the selection covers in blocks that take marks.
fn range_runs(state: &EditorState) -> Vec<&MarkSet> {
    state
        .doc
        .selection_ranges(&state.selection)
        .into_iter()
        .filter_map(|(index, range)| {
            let block = state.doc.block(index)?;
            block
                .kind
                .accepts_marks()
                .then(|| content::text_marks_in(&block.content, range))
        })
        .flatten()
        .map(|(marks, _)| marks)
        .collect()
}

pub fn is_active(state: &EditorState, kind: MarkKind) -> bool {
    if state.selection.is_collapsed() {
        return cursor_marks(state).has_kind(kind);
    }
    let runs = range_runs(state);
    !runs.is_empty() && runs.iter().all(|marks| marks.has_kind(kind))
}

/// Kinds active over the whole selection, in canonical order.
pub fn active_marks(state: &EditorState) -> Vec<MarkKind> {
    if state.selection.is_collapsed() {
        return cursor_marks(state).kinds().collect();
    }
    let runs = range_runs(state);
    if runs.is_empty() {
        return Vec::new();
    }
    MarkKind::ALL
        .into_iter()
        .filter(|kind| runs.iter().all(|marks| marks.has_kind(*kind)))
        .collect()
}

fn value_state(state: &EditorState, value: impl Fn(&MarkSet) -> Option<SmolStr>) -> MarkState<SmolStr> {
    if state.selection.is_collapsed() {
        return match value(&cursor_marks(state)) {
            Some(value) => MarkState::Uniform(value),
            None => MarkState::Absent,
        };
    }
    let mut values = range_runs(state).into_iter().map(value);
    let Some(first) = values.next() else {
        return MarkState::Absent;
    };
    if values.any(|other| other != first) {
        return MarkState::Mixed;
    }
    match first {
        Some(value) => MarkState::Uniform(value),
        None => MarkState::Absent,
    }
}

pub fn font_size(state: &EditorState) -> MarkState<SmolStr> {
    value_state(state, |marks| marks.font_size().cloned())
}

pub fn text_style(state: &EditorState, attr: TextStyleAttr) -> MarkState<SmolStr> {
    value_state(state, |marks| marks.text_style(attr).cloned())
}
