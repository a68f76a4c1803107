//! loom-editor-core: the rich-text editing engine without any I/O.
//!
//! This crate provides:
//! - `Document` - blocks of marked inline runs, with HTML and JSON codecs
//! - `ExtensionRegistry` - per-mark parse and serialize rules
//! - `Transaction` / `Editor` - atomic command chains with undo and redo
//! - `tracker` - stored marks and the formatting state of the selection
//! - `ViewBinder` / `Toolbar` - keeping a control surface in step with the editor

pub mod chain;
pub mod commands;
pub mod config;
pub mod content;
pub mod document;
pub mod editor;
pub mod error;
pub mod extensions;
pub mod history;
pub mod html;
pub mod json;
pub mod marks;
pub mod state;
pub mod toolbar;
pub mod tracker;
pub mod transaction;
pub mod types;
pub mod view;

pub use chain::{Can, CanChain, Chain, ChainBuilder};
pub use commands::{BlockAttribute, Command, InsertTarget, NodeSpec};
pub use config::{EditorConfig, FileStore, Loader, LoomConfig, MediaConfig, PaletteColor, Saver};
pub use content::{ImageAttrs, Inline};
pub use document::{Block, BlockAttrs, BlockId, BlockKind, BlockType, Document, TextAlign};
pub use editor::Editor;
pub use error::{CommandError, ConfigError, JsonError};
pub use extensions::{ExtensionRegistry, HtmlElement, HtmlTag, MarkExtension};
pub use history::{History, HistoryEntry};
pub use html::{FallbackKind, ParseFallback, from_html, to_html};
pub use json::{from_json, to_json};
pub use marks::{Mark, MarkKind, MarkSet, TextStyle, TextStyleAttr};
pub use smol_str::SmolStr;
pub use state::EditorState;
pub use toolbar::{
    ControlState, FontSizeDisplay, Toolbar, ToolbarAction, ToolbarFeatures, ToolbarOutcome,
    ToolbarState,
};
pub use tracker::MarkState;
pub use types::{Position, Selection};
pub use view::{DeferQueue, Subscription, ViewBinder, ViewSnapshot};
