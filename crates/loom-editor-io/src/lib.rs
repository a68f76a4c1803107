//! loom-editor-io: everything in the loom editor that waits on the outside
//! world.
//!
//! - `MediaPipeline` - concurrent image uploads applied to the editor in order
//! - `Uploader` / `DirectoryUploader` - where uploaded bytes go
//! - `BlobStore` - preview URLs while uploads are in flight
//! - `Persister` / `save` - handing a finished document off

pub mod blob;
pub mod error;
pub mod input;
pub mod persist;
pub mod pipeline;
pub mod upload;

pub use blob::{Blob, BlobStore, MemoryBlobStore};
pub use error::{PersistError, SaveError, UploadError};
pub use input::{AttachmentEvent, EventClaim, FileInput, InputSource, accepted_files};
pub use persist::{FilePersister, Persister, SavePayload, save};
pub use pipeline::{Attachment, MediaEvent, MediaPipeline, UploadFailure};
pub use upload::{DirectoryUploader, Uploader};
