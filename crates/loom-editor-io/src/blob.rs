//! Temporary preview URLs for files still uploading.

use std::collections::HashMap;

use bytes::Bytes;
use smol_str::{SmolStr, format_smolstr};

use crate::input::FileInput;

/// Hands out short-lived URLs that render a local file until its upload
/// resolves.
pub trait BlobStore {
    fn create(&mut self, batch: u64, ordinal: usize, file: &FileInput) -> SmolStr;
    /// Release a URL. Returns false if it was not live.
    fn revoke(&mut self, url: &str) -> bool;
    fn live(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime: SmolStr,
    pub data: Bytes,
}

/// In-memory previews with `blob:loom-<batch>-<ordinal>` URLs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<SmolStr, Blob>,
}

impl MemoryBlobStore {
    pub fn get(&self, url: &str) -> Option<&Blob> {
        self.blobs.get(url)
    }
}

impl BlobStore for MemoryBlobStore {
    fn create(&mut self, batch: u64, ordinal: usize, file: &FileInput) -> SmolStr {
        let url = format_smolstr!("blob:loom-{batch}-{ordinal}");
        self.blobs.insert(
            url.clone(),
            Blob {
                mime: file.mime.clone(),
                data: file.data.clone(),
            },
        );
        url
    }

    fn revoke(&mut self, url: &str) -> bool {
        self.blobs.remove(url).is_some()
    }

    fn live(&self) -> usize {
        self.blobs.len()
    }
}
