//! The editor: state, history and the view binding behind one mutation gate.

use serde_json::Value;

use crate::chain::{Can, Chain};
use crate::commands::Command;
use crate::config::EditorConfig;
use crate::document::{BlockAttrs, BlockKind, Document};
use crate::error::{CommandError, JsonError};
use crate::extensions::ExtensionRegistry;
use crate::history::History;
use crate::html::{self, ParseFallback};
use crate::json;
use crate::state::EditorState;
use crate::transaction::Transaction;
use crate::types::Selection;
use crate::view::{DeferQueue, Subscription, ViewBinder, ViewSnapshot};

/// A single-threaded editor instance.
///
/// Every change goes through [`Editor::chain`]. Listeners registered with
/// [`Editor::subscribe`] see a fresh [`ViewSnapshot`] after each committed
/// chain.
#[derive(Debug)]
pub struct Editor {
    state: EditorState,
    history: History,
    registry: ExtensionRegistry,
    binder: ViewBinder,
    defer: DeferQueue,
    config: EditorConfig,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    /// An editor holding the configured initial content, or one empty
    /// paragraph with the configured alignment.
    pub fn new(config: EditorConfig) -> Self {
        let registry = ExtensionRegistry::default();
        let doc = match &config.initial_content {
            Some(content) => html::parse(content, &registry),
            None => Document::builder()
                .block(
                    BlockKind::Paragraph,
                    BlockAttrs {
                        text_align: config.default_alignment,
                    },
                    Vec::new(),
                )
                .build(),
        };
        Self::with_parts(doc, registry, config)
    }

    pub fn with_document(doc: Document, config: EditorConfig) -> Self {
        Self::with_parts(doc, ExtensionRegistry::default(), config)
    }

    fn with_parts(doc: Document, registry: ExtensionRegistry, config: EditorConfig) -> Self {
        Self {
            state: EditorState::new(doc),
            history: History::new(config.history_limit),
            registry,
            binder: ViewBinder::default(),
            defer: DeferQueue::default(),
            config,
        }
    }

    /// Replace the mark registry used for HTML parsing and serialization.
    pub fn with_registry(mut self, registry: ExtensionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn document(&self) -> &Document {
        &self.state.doc
    }

    pub fn selection(&self) -> Selection {
        self.state.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn chain(&mut self) -> Chain<'_> {
        Chain::new(self)
    }

    pub fn can(&self) -> Can<'_> {
        Can::new(self)
    }

    /// Apply `commands` as one transaction and commit it, or commit nothing.
    pub fn run(&mut self, commands: &[Command]) -> Result<(), CommandError> {
        if commands.is_empty() {
            return Ok(());
        }
        let applied = self.dry_run(commands)?;
        tracing::trace!(
            steps = applied.steps,
            doc_changed = applied.doc_changed,
            undo_depth = applied.history.undo_depth(),
            "transaction committed"
        );
        self.state = applied.state;
        self.history = applied.history;
        self.notify();
        Ok(())
    }

    /// Validate `commands` against a scratch copy without committing.
    pub fn check(&self, commands: &[Command]) -> Result<(), CommandError> {
        self.dry_run(commands).map(|_| ())
    }

    fn dry_run(&self, commands: &[Command]) -> Result<crate::transaction::Applied, CommandError> {
        let mut tx = Transaction::new(&self.state, &self.history);
        for command in commands {
            if let Err(err) = tx.apply(command) {
                tracing::debug!(command = command.name(), %err, "command rejected");
                return Err(err);
            }
        }
        Ok(tx.finish())
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot::capture(&self.state, &self.history)
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&ViewSnapshot, &DeferQueue) + 'static,
    ) -> Subscription {
        self.binder.subscribe(listener)
    }

    /// Queue for chains to run on the next [`Editor::flush_deferred`].
    pub fn defer_queue(&self) -> &DeferQueue {
        &self.defer
    }

    fn notify(&self) {
        if self.binder.is_empty() {
            return;
        }
        self.binder.notify(&self.snapshot(), &self.defer);
    }

    /// Run the chains deferred so far, each as its own transaction.
    ///
    /// Chains that listeners defer while this runs wait for the next call.
    /// Returns how many chains committed.
    pub fn flush_deferred(&mut self) -> usize {
        let pending = self.defer.take_all();
        let mut committed = 0;
        for commands in pending {
            if self.run(&commands).is_ok() {
                committed += 1;
            }
        }
        committed
    }

    pub fn to_html(&self) -> String {
        html::serialize(&self.state.doc, &self.registry)
    }

    pub fn to_json(&self) -> Value {
        json::to_json(&self.state.doc)
    }

    /// Replace the document with parsed HTML. Clears history and notifies.
    pub fn set_content(&mut self, html: &str) -> Vec<ParseFallback> {
        let (doc, fallbacks) = html::parse_with_report(html, &self.registry);
        self.replace_document(doc);
        fallbacks
    }

    pub fn set_json(&mut self, value: Value) -> Result<(), JsonError> {
        let doc = json::from_json(value)?;
        self.replace_document(doc);
        Ok(())
    }

    fn replace_document(&mut self, doc: Document) {
        self.state = EditorState::new(doc);
        self.history.clear();
        self.notify();
    }

    /// Text of the code block under the cursor.
    pub fn code_block_text(&self) -> Option<String> {
        self.state
            .head_block()
            .filter(|block| block.kind.is_code())
            .map(|block| block.text())
    }
}
