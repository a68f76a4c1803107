//! Normalizing files from pickers, paste and drop.

use bytes::Bytes;
use loom_editor_core::MediaConfig;
use mime_sniffer::MimeTypeSniffer;
use smol_str::SmolStr;

/// Where a batch of files came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Picker,
    Paste,
    Drop,
}

/// One file with a known MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    pub name: String,
    pub mime: SmolStr,
    pub data: Bytes,
}

impl FileInput {
    /// Build a file, sniffing the MIME type from the bytes when the source
    /// did not provide one.
    pub fn new(name: impl Into<String>, mime: Option<&str>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let mime = match mime.map(str::trim).filter(|mime| !mime.is_empty()) {
            Some(mime) => SmolStr::new(mime),
            None => SmolStr::new(
                data.sniff_mime_type()
                    .unwrap_or("application/octet-stream"),
            ),
        };
        Self {
            name: name.into(),
            mime,
            data,
        }
    }
}

/// Files delivered by one picker selection, paste or drop.
#[derive(Debug, Clone)]
pub struct AttachmentEvent {
    pub source: InputSource,
    pub files: Vec<FileInput>,
}

impl AttachmentEvent {
    pub fn new(source: InputSource, files: impl IntoIterator<Item = FileInput>) -> Self {
        Self {
            source,
            files: files.into_iter().collect(),
        }
    }
}

/// What the host should do with the originating event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventClaim {
    /// Suppress the host's default paste or drop handling.
    pub prevent_default: bool,
    pub accepted: usize,
    pub rejected: usize,
}

/// Keep the files the configuration accepts, in their original order.
pub fn accepted_files(event: AttachmentEvent, config: &MediaConfig) -> (Vec<FileInput>, EventClaim) {
    let total = event.files.len();
    let accepted: Vec<FileInput> = event
        .files
        .into_iter()
        .filter(|file| {
            let keep = config.accepts(&file.mime);
            if !keep {
                tracing::debug!(name = %file.name, mime = %file.mime, "skipping non-image file");
            }
            keep
        })
        .collect();
    let claim = EventClaim {
        // the picker has no default action to suppress
        prevent_default: event.source != InputSource::Picker && !accepted.is_empty(),
        accepted: accepted.len(),
        rejected: total - accepted.len(),
    };
    (accepted, claim)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_missing_mime_is_sniffed() {
        let file = FileInput::new("pic", None, Bytes::from_static(PNG));
        assert_eq!(file.mime, "image/png");
        let file = FileInput::new("notes", Some(""), Bytes::from_static(b"just text"));
        assert!(!file.mime.starts_with("image/"));
    }

    #[test]
    fn test_paste_with_any_image_is_claimed() {
        let event = AttachmentEvent::new(
            InputSource::Paste,
            [
                FileInput::new("a.png", Some("image/png"), Bytes::from_static(PNG)),
                FileInput::new("b.txt", Some("text/plain"), Bytes::from_static(b"b")),
            ],
        );
        let (files, claim) = accepted_files(event, &MediaConfig::default());
        assert_eq!(files.len(), 1);
        assert_eq!(
            claim,
            EventClaim {
                prevent_default: true,
                accepted: 1,
                rejected: 1
            }
        );
    }

    #[test]
    fn test_drop_without_images_is_not_claimed() {
        let event = AttachmentEvent::new(
            InputSource::Drop,
            [FileInput::new("b.txt", Some("text/plain"), Bytes::from_static(b"b"))],
        );
        let (files, claim) = accepted_files(event, &MediaConfig::default());
        assert!(files.is_empty());
        assert!(!claim.prevent_default);
    }
}
