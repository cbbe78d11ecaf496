use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::documents::extension_of;

/// Result type used by the shared upload helpers.
pub type UploadResult<T> = Result<T, UploadError>;

/// Error returned when reading or persisting an uploaded file.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The multipart body could not be read.
    #[error("{0}")]
    Form(String),

    /// The upload could not be written to local storage.
    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    fn form(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Form(format!("{context}: {err}"))
    }

    fn storage(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Storage { context, source }
    }
}

/// An uploaded file parked on disk for the lifetime of one request.
///
/// The file is removed exactly once: by [`TempUpload::discard`], or on drop if
/// the handler bailed out (or was cancelled) before discarding it.
#[derive(Debug)]
pub struct TempUpload {
    pub original_name: String,
    pub extension: String,
    pub file_size: u64,
    path: PathBuf,
    armed: bool,
}

impl TempUpload {
    fn new(original_name: String, path: PathBuf) -> Self {
        Self {
            extension: extension_of(&original_name),
            original_name,
            file_size: 0,
            path,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now and disarm the drop hook.
    pub async fn discard(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "removed temporary upload"),
            Err(err) => warn!(?err, path = %self.path.display(), "failed to remove temporary upload"),
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(?err, path = %self.path.display(), "failed to remove temporary upload");
        }
    }
}

/// Ensures the destination directory exists.
pub async fn ensure_directory(path: &Path) -> UploadResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(UploadError::storage("failed to prepare upload directory"))
}

/// Stream the first file part named `field_name` into `dest_dir`.
///
/// Text fields, file parts under other names and repeated parts are read and
/// dropped without touching disk. Returns `Ok(None)` when no matching file part
/// was sent.
pub async fn receive_single_file(
    mut multipart: Multipart,
    dest_dir: &Path,
    field_name: &str,
) -> UploadResult<Option<TempUpload>> {
    ensure_directory(dest_dir).await?;

    let mut saved: Option<TempUpload> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| UploadError::form("Failed to read upload form", err))?
    {
        let is_target = field.name() == Some(field_name) && field.file_name().is_some();

        if !is_target || saved.is_some() {
            while field
                .chunk()
                .await
                .map_err(|err| UploadError::form("Failed to read upload data", err))?
                .is_some()
            {}
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload.bin").to_string();
        let stored_path = dest_dir.join(stored_name(&original_name));
        let mut file = File::create(&stored_path)
            .await
            .map_err(UploadError::storage("failed to create upload file"))?;

        // From here on the guard owns the file, so any early return removes it.
        let mut upload = TempUpload::new(original_name, stored_path);

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| UploadError::form("Failed to read upload data", err))?
        {
            upload.file_size += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(UploadError::storage("failed to write upload"))?;
        }
        file.flush()
            .await
            .map_err(UploadError::storage("failed to flush upload"))?;

        saved = Some(upload);
    }

    Ok(saved)
}

/// Unique on-disk name: a fresh UUID plus the sanitized original name.
fn stored_name(original_name: &str) -> String {
    let sanitized = sanitize_filename::sanitize(original_name);
    if sanitized.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        format!("{}_{}", Uuid::new_v4(), sanitized)
    }
}
