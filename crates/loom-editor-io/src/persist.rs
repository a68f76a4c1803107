use std::future::Future;
use std::path::{Path, PathBuf};

use loom_editor_core::Editor;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PersistError, SaveError};

/// Both serializations of a document, as sent to a persister.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavePayload {
    pub html: String,
    pub json: Value,
}

impl SavePayload {
    pub fn from_editor(editor: &Editor) -> Self {
        Self {
            html: editor.to_html(),
            json: editor.to_json(),
        }
    }
}

pub trait Persister {
    fn persist(&self, payload: &SavePayload) -> impl Future<Output = Result<(), PersistError>> + Send;
}

/// Writes `<base>.html` and `<base>.json`.
#[derive(Debug, Clone)]
pub struct FilePersister {
    base: PathBuf,
}

impl FilePersister {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    pub fn html_path(&self) -> PathBuf {
        self.base.with_extension("html")
    }

    pub fn json_path(&self) -> PathBuf {
        self.base.with_extension("json")
    }
}

async fn write(path: PathBuf, contents: String) -> Result<(), PersistError> {
    tokio::fs::write(&path, contents)
        .await
        .map_err(|source| PersistError::Io { path, source })
}

impl Persister for FilePersister {
    async fn persist(&self, payload: &SavePayload) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(&payload.json)?;
        write(self.html_path(), payload.html.clone()).await?;
        write(self.json_path(), json).await
    }
}

/// Serialize the editor's document and hand it to `persister`.
///
/// The editor is only read; on failure the document stays as it was.
pub async fn save(editor: &Editor, persister: &impl Persister) -> Result<SavePayload, SaveError> {
    let payload = SavePayload::from_editor(editor);
    match persister.persist(&payload).await {
        Ok(()) => {
            tracing::info!(bytes = payload.html.len(), "document saved");
            Ok(payload)
        }
        Err(error) => {
            tracing::warn!(%error, "save failed");
            Err(error.into())
        }
    }
}
