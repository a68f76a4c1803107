//! Reactive view binding.
//!
//! A control surface subscribes to the editor and receives a [`ViewSnapshot`]
//! synchronously after every committed transaction. Listeners cannot reach
//! the editor while they run; anything they want to do to it goes through the
//! [`DeferQueue`] and runs on the next [`crate::Editor::flush_deferred`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use smol_str::SmolStr;

use crate::commands::Command;
use crate::document::{BlockType, TextAlign};
use crate::history::History;
use crate::marks::{MarkKind, TextStyleAttr};
use crate::state::EditorState;
use crate::tracker::{self, MarkState};

/// Everything a toolbar needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub active_marks: Vec<MarkKind>,
    pub font_size: MarkState<SmolStr>,
    pub color: MarkState<SmolStr>,
    /// Alignment of the block under the cursor, if it can be aligned.
    pub text_align: Option<TextAlign>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub in_code_block: bool,
    /// `None` when the cursor is on a rule or image.
    pub block_type: Option<BlockType>,
}

impl ViewSnapshot {
    pub fn capture(state: &EditorState, history: &History) -> Self {
        let head = state.head_block();
        Self {
            active_marks: tracker::active_marks(state),
            font_size: tracker::font_size(state),
            color: tracker::text_style(state, TextStyleAttr::Color),
            text_align: head
                .filter(|block| block.kind.supports_alignment())
                .map(|block| block.attrs.text_align),
            can_undo: history.can_undo(),
            can_redo: history.can_redo(),
            in_code_block: head.is_some_and(|block| block.kind.is_code()),
            block_type: head.and_then(|block| block.kind.block_type()),
        }
    }

    pub fn is_active(&self, kind: MarkKind) -> bool {
        self.active_marks.contains(&kind)
    }
}

type Listener = dyn Fn(&ViewSnapshot, &DeferQueue);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Rc<Listener>)>,
}

/// Listener registry owned by one editor.
#[derive(Clone, Default)]
pub struct ViewBinder {
    listeners: Rc<RefCell<Listeners>>,
}

impl fmt::Debug for ViewBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewBinder")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ViewBinder {
    pub fn subscribe(&self, listener: impl Fn(&ViewSnapshot, &DeferQueue) + 'static) -> Subscription {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Rc::new(listener)));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener. The list is copied first so listeners may
    /// unsubscribe (themselves or others) while being notified.
    pub fn notify(&self, snapshot: &ViewSnapshot, defer: &DeferQueue) {
        let listeners: Vec<Rc<Listener>> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(snapshot, defer);
        }
    }
}

/// Handle to a registered listener.
///
/// Dropping the handle unsubscribes. Call [`Subscription::detach`] to keep
/// the listener registered for the editor's whole lifetime instead.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<RefCell<Listeners>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Leave the listener registered until the editor is dropped.
    pub fn detach(mut self) {
        self.listeners = Weak::new();
    }

    pub fn is_active(&self) -> bool {
        self.listeners
            .upgrade()
            .is_some_and(|listeners| listeners.borrow().entries.iter().any(|(id, _)| *id == self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .borrow_mut()
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

/// Commands listeners want run after notification finishes.
#[derive(Clone, Default)]
pub struct DeferQueue {
    queue: Rc<RefCell<VecDeque<Vec<Command>>>>,
}

impl fmt::Debug for DeferQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferQueue").field("pending", &self.len()).finish()
    }
}

impl DeferQueue {
    /// Queue a chain of commands, run as one transaction on the next flush.
    pub fn defer(&self, commands: impl IntoIterator<Item = Command>) {
        self.queue.borrow_mut().push_back(commands.into_iter().collect());
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Everything queued so far. Chains deferred after this call wait for the
    /// next one.
    pub(crate) fn take_all(&self) -> Vec<Vec<Command>> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn snapshot() -> ViewSnapshot {
        ViewSnapshot::capture(&EditorState::new(crate::Document::new()), &History::default())
    }

    #[test]
    fn test_drop_unsubscribes() {
        let binder = ViewBinder::default();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let sub = binder.subscribe(move |_, _| counter.set(counter.get() + 1));
        binder.notify(&snapshot(), &DeferQueue::default());
        assert!(sub.is_active());
        drop(sub);
        binder.notify(&snapshot(), &DeferQueue::default());
        assert_eq!(calls.get(), 1);
        assert!(binder.is_empty());
    }

    #[test]
    fn test_detach_keeps_listener() {
        let binder = ViewBinder::default();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        binder
            .subscribe(move |_, _| counter.set(counter.get() + 1))
            .detach();
        binder.notify(&snapshot(), &DeferQueue::default());
        binder.notify(&snapshot(), &DeferQueue::default());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_listener_can_unsubscribe_during_notify() {
        let binder = ViewBinder::default();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::default();
        let inner = slot.clone();
        let sub = binder.subscribe(move |_, _| {
            inner.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(sub);
        binder.notify(&snapshot(), &DeferQueue::default());
        assert!(binder.is_empty());
    }

    #[test]
    fn test_empty_document_snapshot() {
        let snap = snapshot();
        assert_eq!(snap.block_type, Some(BlockType::Paragraph));
        assert_eq!(snap.text_align, Some(TextAlign::Left));
        assert_eq!(snap.font_size, MarkState::Absent);
        assert!(!snap.can_undo);
        assert!(!snap.in_code_block);
    }
}
