//! Error types for the editor core.

use std::path::PathBuf;

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

use crate::marks::MarkKind;
use crate::types::Position;

/// Why a transaction was rejected.
///
/// Nothing is committed when a command fails; the editor keeps the state it
/// had before the chain started.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[non_exhaustive]
pub enum CommandError {
    /// Undo or redo with nothing on the stack.
    #[error("nothing to {op}")]
    #[diagnostic(code(loom::command::history_empty))]
    HistoryEmpty { op: &'static str },

    /// A mark command found no text that can carry marks.
    #[error("no markable text in the selection")]
    #[diagnostic(
        code(loom::command::nothing_to_mark),
        help("marks apply to paragraphs and list items, not code blocks or rules")
    )]
    NothingToMark,

    /// A selection that does not resolve inside the document.
    #[error("selection {anchor}..{head} is outside the document")]
    #[diagnostic(code(loom::command::invalid_selection))]
    InvalidSelection { anchor: Position, head: Position },

    /// The command does not apply to any block the selection touches.
    #[error("{command} does not apply to the selected blocks")]
    #[diagnostic(code(loom::command::unsupported_block))]
    UnsupportedBlock { command: &'static str },

    /// The command needs a non-empty selection.
    #[error("selection is collapsed")]
    #[diagnostic(code(loom::command::collapsed_selection))]
    CollapsedSelection,

    /// A mark attribute value that could not be read back from HTML, such as
    /// an empty font size.
    #[error("{} mark value `{value}` cannot be stored", kind.name())]
    #[diagnostic(
        code(loom::command::invalid_mark_value),
        help("mark values must be non-empty and must not contain `;`")
    )]
    InvalidMarkValue { kind: MarkKind, value: SmolStr },

    /// Delete at the very start of the document.
    #[error("nothing to delete")]
    #[diagnostic(code(loom::command::nothing_to_delete))]
    NothingToDelete,
}

/// Errors reading the JSON tree representation.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum JsonError {
    #[error("malformed document JSON")]
    #[diagnostic(code(loom::json::shape))]
    Shape(#[from] serde_json::Error),

    #[error("expected a `doc` root node, found `{found}`")]
    #[diagnostic(code(loom::json::root))]
    UnexpectedRoot { found: SmolStr },

    #[error("unknown node type `{kind}`")]
    #[diagnostic(code(loom::json::unknown_node))]
    UnknownNode { kind: SmolStr },

    #[error("`{node}` node is missing attribute `{attr}`")]
    #[diagnostic(code(loom::json::missing_attribute))]
    MissingAttribute { node: SmolStr, attr: &'static str },

    #[error("`{node}` cannot appear inside `{parent}`")]
    #[diagnostic(code(loom::json::misplaced))]
    Misplaced { node: SmolStr, parent: SmolStr },
}

/// Errors loading or saving configuration.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to access {}", path.display())]
    #[diagnostic(code(loom::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON configuration")]
    #[diagnostic(code(loom::config::json))]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML configuration")]
    #[diagnostic(code(loom::config::toml))]
    Toml(#[from] toml::de::Error),

    #[error("could not encode configuration as TOML")]
    #[diagnostic(code(loom::config::toml_encode))]
    TomlEncode(#[from] toml::ser::Error),

    #[error("unsupported configuration format: {}", path.display())]
    #[diagnostic(code(loom::config::format), help("use a .toml or .json file"))]
    UnsupportedFormat { path: PathBuf },
}
