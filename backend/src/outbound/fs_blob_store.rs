//! Filesystem-backed blob store scoped to a single directory capability.
//!
//! Keys are relative slash-separated paths (`og/<id>.png`). Writes land in a
//! staging file first and are renamed into place so readers never observe a
//! partially written snapshot.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use uuid::Uuid;

use crate::domain::ports::{Blob, BlobStore, BlobStoreError};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Blob store writing objects beneath one root directory.
#[derive(Clone)]
pub struct FsBlobStore {
    root: Arc<Dir>,
}

impl FsBlobStore {
    /// Open (creating if necessary) the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the directory cannot be created
    /// or opened.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        Dir::create_ambient_dir_all(path, ambient_authority())?;
        let root = Dir::open_ambient_dir(path, ambient_authority())?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T, BlobStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> Result<T, BlobStoreError> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || op(&root))
            .await
            .map_err(|err| BlobStoreError::io(format!("blob task failed: {err}")))?
    }
}

fn validate_key(key: &str) -> Result<PathBuf, BlobStoreError> {
    let invalid = || BlobStoreError::invalid_key(key.to_owned());
    if key.is_empty() || key.starts_with('/') || key.contains('\\') {
        return Err(invalid());
    }
    let mut path = PathBuf::new();
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
        path.push(segment);
    }
    Ok(path)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

fn io_error(path: &Path, error: io::Error) -> BlobStoreError {
    BlobStoreError::io(format!("{}: {error}", path.display()))
}

fn write_replacing(root: &Dir, path: &Path, bytes: &[u8]) -> Result<(), BlobStoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        root.create_dir_all(parent).map_err(|err| io_error(parent, err))?;
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = path.with_file_name(format!(".tmp-{}-{file_name}", Uuid::new_v4().simple()));
    root.write(&staging, bytes)
        .map_err(|err| io_error(&staging, err))?;
    root.rename(&staging, root, path).map_err(|err| {
        let _cleanup = root.remove_file(&staging);
        io_error(path, err)
    })
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, blob: Blob) -> Result<(), BlobStoreError> {
        let path = validate_key(key)?;
        if blob.content_type != content_type_for(&path) {
            tracing::debug!(
                key,
                content_type = %blob.content_type,
                "content type is derived from the key extension on read"
            );
        }
        self.run(move |root| write_replacing(root, &path, &blob.bytes))
            .await
    }

    async fn get(&self, key: &str) -> Result<Option<Blob>, BlobStoreError> {
        let path = validate_key(key)?;
        self.run(move |root| match root.read(&path) {
            Ok(bytes) => Ok(Some(Blob {
                bytes,
                content_type: content_type_for(&path).to_owned(),
            })),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path, err)),
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        let path = validate_key(key)?;
        self.run(move |root| match root.remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path, err)),
        })
        .await
    }
}
