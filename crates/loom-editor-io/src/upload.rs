use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use smol_str::{SmolStr, format_smolstr};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::UploadError;

/// Stores one file somewhere addressable and returns its URL.
///
/// Called once per file; failures are reported, never retried.
pub trait Uploader: Send + Sync + 'static {
    fn upload(
        &self,
        data: Bytes,
        filename: &str,
    ) -> impl Future<Output = Result<SmolStr, UploadError>> + Send;
}

/// Copies uploads into a local directory and returns `file://` URLs.
#[derive(Debug, Clone)]
pub struct DirectoryUploader {
    dir: PathBuf,
}

impl DirectoryUploader {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// The last path component only, so a crafted name cannot leave the directory.
fn stored_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("upload")
}

/// `name`, or `stem-N.ext` for the first N that is still free.
fn candidate_name(name: &str, n: usize) -> String {
    if n == 0 {
        return name.to_owned();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{stem}-{n}.{ext}"),
        None => format!("{stem}-{n}"),
    }
}

/// Create a file that did not exist before, so concurrent uploads of the same
/// name never share a path.
async fn create_unique(dir: &Path, name: &str) -> Result<(PathBuf, File), UploadError> {
    let mut n = 0;
    loop {
        let path = dir.join(candidate_name(name, n));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(source) => return Err(UploadError::Io { path, source }),
        }
    }
}

impl Uploader for DirectoryUploader {
    async fn upload(&self, data: Bytes, filename: &str) -> Result<SmolStr, UploadError> {
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source| UploadError::Io { path, source }
        };
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io(&self.dir))?;
        let dir = tokio::fs::canonicalize(&self.dir)
            .await
            .map_err(io(&self.dir))?;
        let (path, mut file) = create_unique(&dir, stored_name(filename)).await?;
        file.write_all(&data).await.map_err(io(&path))?;
        file.flush().await.map_err(io(&path))?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "stored upload");
        Ok(format_smolstr!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_strips_directories() {
        assert_eq!(stored_name("../../etc/passwd"), "passwd");
        assert_eq!(stored_name("cat.png"), "cat.png");
        assert_eq!(stored_name(""), "upload");
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate_name("image.png", 0), "image.png");
        assert_eq!(candidate_name("image.png", 2), "image-2.png");
        assert_eq!(candidate_name("README", 1), "README-1");
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_overwrite() {
        let dir = std::env::temp_dir().join(format!("loom-dup-uploads-{}", std::process::id()));
        let uploader = DirectoryUploader::new(&dir);
        let (first, second) = tokio::join!(
            uploader.upload(Bytes::from_static(b"FIRST"), "image.png"),
            uploader.upload(Bytes::from_static(b"SECOND"), "image.png"),
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_ne!(first, second);

        let mut stored = vec![
            std::fs::read(dir.join("image.png")).unwrap(),
            std::fs::read(dir.join("image-1.png")).unwrap(),
        ];
        std::fs::remove_dir_all(&dir).ok();
        stored.sort();
        assert_eq!(stored, vec![b"FIRST".to_vec(), b"SECOND".to_vec()]);
    }

    #[tokio::test]
    async fn test_directory_uploader_writes_file() {
        let dir = std::env::temp_dir().join(format!("loom-uploads-{}", std::process::id()));
        let uploader = DirectoryUploader::new(&dir);
        let url = uploader
            .upload(Bytes::from_static(b"pixels"), "cat.png")
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("cat.png"));
        let stored = std::fs::read(dir.join("cat.png")).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(stored, b"pixels");
    }
}
