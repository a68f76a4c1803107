use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use loom_editor_core::{ChainBuilder, Editor, EditorConfig, InsertTarget, MediaConfig, Selection};
use loom_editor_io::{
    AttachmentEvent, BlobStore, FileInput, InputSource, MediaEvent, MediaPipeline, UploadError,
    Uploader,
};
use smol_str::{SmolStr, format_smolstr};
use tokio::sync::Notify;

/// Uploads finish only when the test releases them, in whatever order it
/// chooses.
struct ScriptedUploader {
    scripts: HashMap<String, (Arc<Notify>, bool)>,
}

impl ScriptedUploader {
    fn new<'a>(files: impl IntoIterator<Item = (&'a str, bool)>) -> Self {
        Self {
            scripts: files
                .into_iter()
                .map(|(name, fails)| (name.to_owned(), (Arc::new(Notify::new()), fails)))
                .collect(),
        }
    }

    fn gate(&self, name: &str) -> Arc<Notify> {
        self.scripts[name].0.clone()
    }
}

impl Uploader for ScriptedUploader {
    async fn upload(&self, _data: Bytes, filename: &str) -> Result<SmolStr, UploadError> {
        let Some((gate, fails)) = self.scripts.get(filename) else {
            return Err(UploadError::Transport(format!("unscripted file {filename}")));
        };
        gate.notified().await;
        if *fails {
            Err(UploadError::Rejected {
                status: 500,
                message: "storage full".into(),
            })
        } else {
            Ok(format_smolstr!("https://cdn.test/{filename}"))
        }
    }
}

fn image(name: &str) -> FileInput {
    FileInput::new(name, Some("image/png"), Bytes::from_static(b"\x89PNG"))
}

fn text(name: &str) -> FileInput {
    FileInput::new(name, Some("text/plain"), Bytes::from_static(b"notes"))
}

fn editor(html: &str) -> Editor {
    Editor::new(EditorConfig {
        initial_content: Some(html.to_owned()),
        ..EditorConfig::default()
    })
}

fn inserted(events: &[MediaEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            MediaEvent::Inserted { filename, .. } => Some(filename.as_str()),
            _ => None,
        })
        .collect()
}

async fn let_jobs_run() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn paste_inserts_images_in_order_regardless_of_completion() {
    let uploader = ScriptedUploader::new([("a.png", false), ("c.jpg", false)]);
    let (gate_a, gate_c) = (uploader.gate("a.png"), uploader.gate("c.jpg"));
    let mut editor = editor("<p>text</p>");
    let mut pipeline = MediaPipeline::new(uploader, MediaConfig::default());

    let attachment = pipeline.attach(AttachmentEvent::new(
        InputSource::Paste,
        [image("a.png"), text("b.txt"), image("c.jpg")],
    ));
    assert!(attachment.claim.prevent_default);
    assert_eq!(attachment.claim.rejected, 1);
    assert_eq!(attachment.previews, ["blob:loom-0-0", "blob:loom-0-1"]);
    assert_eq!(pipeline.blobs().live(), 2);

    // c finishes first but waits for a
    gate_c.notify_one();
    let_jobs_run().await;
    assert!(pipeline.pump(&mut editor).is_empty());
    assert_eq!(editor.to_html(), "<p>text</p>");

    gate_a.notify_one();
    let events = pipeline.settle(&mut editor).await;
    assert_eq!(inserted(&events), ["a.png", "c.jpg"]);
    assert_eq!(
        editor.to_html(),
        r#"<p>text</p><img src="https://cdn.test/a.png" alt="a.png"><img src="https://cdn.test/c.jpg" alt="c.jpg">"#
    );
    assert_eq!(pipeline.blobs().live(), 0);
    assert_eq!(pipeline.pending(), 0);
}

#[tokio::test]
async fn failed_upload_leaves_siblings_inserted() {
    let uploader = ScriptedUploader::new([("a.png", false), ("b.png", true), ("c.png", false)]);
    let gates = [uploader.gate("c.png"), uploader.gate("b.png"), uploader.gate("a.png")];
    let mut editor = editor("<p>text</p>");
    let mut pipeline = MediaPipeline::new(uploader, MediaConfig::default());

    pipeline.attach(AttachmentEvent::new(
        InputSource::Drop,
        [image("a.png"), image("b.png"), image("c.png")],
    ));
    for gate in gates {
        gate.notify_one();
    }
    let events = pipeline.settle(&mut editor).await;

    assert_eq!(inserted(&events), ["a.png", "c.png"]);
    let failures: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            MediaEvent::Failed(failure) => Some(failure),
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].filename, "b.png");
    assert_eq!(failures[0].ordinal, 1);
    assert!(matches!(
        failures[0].error,
        UploadError::Rejected { status: 500, .. }
    ));
    assert_eq!(editor.document().len(), 3);
    assert_eq!(pipeline.blobs().live(), 0);
}

#[tokio::test]
async fn end_target_keeps_the_selection() {
    let uploader = ScriptedUploader::new([("a.png", false)]);
    uploader.gate("a.png").notify_one();
    let mut editor = editor("<p>one</p><p>two</p>");
    assert!(editor.chain().set_selection(Selection::in_block(0, 1, 1)).run());
    let config = MediaConfig {
        insert_target: InsertTarget::End,
        ..MediaConfig::default()
    };
    let mut pipeline = MediaPipeline::new(uploader, config);

    pipeline.attach(AttachmentEvent::new(InputSource::Picker, [image("a.png")]));
    let events = pipeline.settle(&mut editor).await;

    assert_eq!(inserted(&events), ["a.png"]);
    assert_eq!(editor.selection(), Selection::in_block(0, 1, 1));
    assert_eq!(
        editor.to_html(),
        r#"<p>one</p><p>two</p><img src="https://cdn.test/a.png" alt="a.png">"#
    );
}

#[tokio::test]
async fn dispose_aborts_jobs_and_revokes_previews() {
    let uploader = ScriptedUploader::new([("a.png", false), ("b.png", false)]);
    let gate = uploader.gate("a.png");
    let mut editor = editor("<p>text</p>");
    let mut pipeline = MediaPipeline::new(uploader, MediaConfig::default());

    pipeline.attach(AttachmentEvent::new(
        InputSource::Picker,
        [image("a.png"), image("b.png")],
    ));
    assert_eq!(pipeline.pending(), 2);
    pipeline.dispose();
    assert_eq!(pipeline.pending(), 0);
    assert_eq!(pipeline.blobs().live(), 0);

    gate.notify_one();
    let_jobs_run().await;
    assert!(pipeline.pump(&mut editor).is_empty());
    assert!(pipeline.settle(&mut editor).await.is_empty());
    assert_eq!(editor.to_html(), "<p>text</p>");

    let late = pipeline.attach(AttachmentEvent::new(InputSource::Picker, [image("a.png")]));
    assert_eq!(late.batch, None);
}

/// Blob store whose live set outlives the pipeline that owns it.
#[derive(Default, Clone)]
struct SharedBlobs {
    live: Arc<Mutex<HashSet<SmolStr>>>,
}

impl BlobStore for SharedBlobs {
    fn create(&mut self, batch: u64, ordinal: usize, _file: &FileInput) -> SmolStr {
        let url = format_smolstr!("blob:shared-{batch}-{ordinal}");
        self.live.lock().unwrap().insert(url.clone());
        url
    }

    fn revoke(&mut self, url: &str) -> bool {
        self.live.lock().unwrap().remove(url)
    }

    fn live(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}

#[tokio::test]
async fn dropping_the_pipeline_revokes_previews() {
    let uploader = ScriptedUploader::new([("a.png", false), ("b.png", false)]);
    let blobs = SharedBlobs::default();
    let mut pipeline =
        MediaPipeline::with_blob_store(uploader, blobs.clone(), MediaConfig::default());

    pipeline.attach(AttachmentEvent::new(
        InputSource::Drop,
        [image("a.png"), image("b.png")],
    ));
    assert_eq!(blobs.live(), 2);

    drop(pipeline);
    assert_eq!(blobs.live(), 0);
}
