//! Error types for uploads and persistence.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Why an upload job produced no URL.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum UploadError {
    /// The upload service answered with an error status.
    #[error("upload rejected ({status}): {message}")]
    #[diagnostic(code(loom::upload::rejected))]
    Rejected { status: u16, message: String },

    #[error("upload failed: {0}")]
    #[diagnostic(code(loom::upload::transport))]
    Transport(String),

    #[error("could not store {}", path.display())]
    #[diagnostic(code(loom::upload::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The job ended without reporting, e.g. because the uploader panicked.
    #[error("upload job ended without a result")]
    #[diagnostic(code(loom::upload::abandoned))]
    Abandoned,
}

/// Why a persister did not accept the document.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum PersistError {
    #[error("save rejected ({status}): {message}")]
    #[diagnostic(code(loom::persist::rejected))]
    Rejected { status: u16, message: String },

    #[error("could not reach the save endpoint: {0}")]
    #[diagnostic(code(loom::persist::transport))]
    Transport(String),

    #[error("could not write {}", path.display())]
    #[diagnostic(code(loom::persist::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode the document")]
    #[diagnostic(code(loom::persist::encode))]
    Encode(#[from] serde_json::Error),
}

impl PersistError {
    /// Response status, when the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PersistError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A failed save. The document stays in the editor untouched.
#[derive(Error, Debug, Diagnostic)]
#[error("failed to save document{}", status_suffix(.status))]
#[diagnostic(
    code(loom::save::failed),
    help("the document is still open in the editor; retry once the problem is fixed")
)]
pub struct SaveError {
    pub status: Option<u16>,
    #[source]
    pub source: PersistError,
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|status| format!(" (status {status})"))
        .unwrap_or_default()
}

impl From<PersistError> for SaveError {
    fn from(source: PersistError) -> Self {
        Self {
            status: source.status(),
            source,
        }
    }
}
