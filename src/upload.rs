use std::ffi::OsStr;
use std::path::Path;

use axum::extract::{ContentLengthLimit, Multipart};
use axum::{Extension, Json};
use chrono::Utc;
use rand::{thread_rng, Rng};
use serde::Serialize;
use tokio::fs::{create_dir_all, File};
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::err::Error;

pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;
const PDF_FIELD: &str = "pdf";
const PDF_MIME: &str = "application/pdf";

pub async fn prepare_upload_dir(dir: &Path) -> anyhow::Result<()> {
    create_dir_all(dir).await?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: StoredFile,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub filename: String,
    pub path: String,
}

/// Accepts exactly one `pdf` multipart field. Size is capped before this
/// handler runs; everything else is validated before any byte is written.
pub async fn upload_pdf(
    Extension(config): Extension<Config>,
    ContentLengthLimit(mut parts): ContentLengthLimit<Multipart, MAX_UPLOAD_BYTES>,
) -> Result<Json<UploadResponse>, Error> {
    while let Some(field) = parts.next_field().await.map_err(|err| {
        log::debug!("Malformed multipart body: {}", err);
        Error::InvalidPayload {
            message: "No file uploaded or invalid file type".to_string(),
        }
    })? {
        if field.name() != Some(PDF_FIELD) {
            continue;
        }

        if field.content_type() != Some(PDF_MIME) {
            return Err(Error::UnsupportedMedia {
                message: "Only PDF files are allowed".to_string(),
            });
        }

        let original = field.file_name().unwrap_or("upload.pdf").to_string();
        let bytes = field.bytes().await.map_err(|err| {
            log::debug!("Upload stream ended early: {}", err);
            Error::InvalidPayload {
                message: "No file uploaded or invalid file type".to_string(),
            }
        })?;

        let filename = storage_name(&original);
        let path = config.upload_dir.join(&filename);
        if let Err(err) = write_upload(&path, &bytes).await {
            log::error!("Failed to persist upload {}: {}", path.display(), err);
            // never leave a truncated file behind
            let _ = tokio::fs::remove_file(&path).await;
            return Err(Error::server_error("IOError"));
        }

        log::info!("Stored upload {} ({} bytes)", filename, bytes.len());
        return Ok(Json(UploadResponse {
            message: "File uploaded successfully!".to_string(),
            file: StoredFile {
                filename,
                path: path.display().to_string(),
            },
        }));
    }

    Err(Error::InvalidPayload {
        message: "No file uploaded or invalid file type".to_string(),
    })
}

// Only the extension of the client-supplied name survives; the rest of the
// storage name is generated to dodge collisions between concurrent uploads.
fn storage_name(original: &str) -> String {
    let stamp = Utc::now().timestamp_millis();
    let suffix: u32 = thread_rng().gen_range(0..1_000_000_000);
    match Path::new(original).extension().and_then(OsStr::to_str) {
        Some(ext) => format!("{}-{}.{}", stamp, suffix, ext),
        None => format!("{}-{}", stamp, suffix),
    }
}

async fn write_upload(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_name_keeps_only_the_extension() {
        let name = storage_name("My Thesis (final) v2.pdf");
        assert!(name.ends_with(".pdf"));
        assert!(!name.contains("Thesis"));
    }

    #[test]
    fn storage_name_without_extension_stays_bare() {
        let name = storage_name("README");
        assert!(!name.contains('.'));
    }

    #[test]
    fn identical_originals_get_distinct_storage_names() {
        let a = storage_name("thesis.pdf");
        let b = storage_name("thesis.pdf");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn write_upload_persists_the_exact_bytes() {
        let path = std::env::temp_dir().join(storage_name("roundtrip.pdf"));
        write_upload(&path, b"%PDF-1.4 test").await.unwrap();
        let read_back = tokio::fs::read(&path).await.unwrap();
        assert_eq!(read_back, b"%PDF-1.4 test");
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn write_upload_surfaces_io_errors() {
        let path = std::env::temp_dir()
            .join("does-not-exist")
            .join("nested")
            .join("upload.pdf");
        assert!(write_upload(&path, b"data").await.is_err());
    }
}
