use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};

use crate::session::PhotoSessionId;

uuid_id!(ImageId, "ImageId");

const ALLOWED_SCHEMES: [&str; 4] = ["gs://", "s3://", "https://", "http://"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
}

impl ImageStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, ImageStatus::Processed | ImageStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: ImageId,
    pub session_id: PhotoSessionId,
    pub storage_url: String,
    pub thumbnail_url: Option<String>,
    pub original_filename: Option<String>,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
    pub status: ImageStatus,
    /// Worker task name, once dispatched.
    pub task_id: Option<String>,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Record for Image {
    type Id = ImageId;
    const KIND: &'static str = "images";
    const ENTITY: &'static str = "Image";

    fn id(&self) -> ImageId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateImageRequest {
    pub storage_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

fn storage_url(field: &str, url: &str) -> DomainResult<String> {
    let url = validate::required_text(field, url, 2048)?;
    let lower = url.to_ascii_lowercase();
    match ALLOWED_SCHEMES.iter().find(|s| lower.starts_with(*s)) {
        Some(scheme) if url.len() > scheme.len() => Ok(url),
        _ => Err(DomainError::validation(format!(
            "{field} must be a gs://, s3:// or http(s):// URL"
        ))),
    }
}

impl Image {
    pub fn create(session_id: PhotoSessionId, req: CreateImageRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        if let Some(mime) = req.mime_type.as_deref() {
            if !mime.trim().to_ascii_lowercase().starts_with("image/") {
                return Err(DomainError::validation("mimeType must be an image type"));
            }
        }
        Ok(Self {
            id: ImageId::new(),
            session_id,
            storage_url: storage_url("storageUrl", &req.storage_url)?,
            thumbnail_url: req
                .thumbnail_url
                .as_deref()
                .map(|u| storage_url("thumbnailUrl", u))
                .transpose()?,
            original_filename: validate::optional_text("originalFilename", req.original_filename.as_deref(), 255)?,
            file_size: req.file_size,
            mime_type: validate::optional_text("mimeType", req.mime_type.as_deref(), 100)?,
            status: ImageStatus::Uploaded,
            task_id: None,
            error_message: None,
            processed_at: None,
            created_at: now,
        })
    }

    /// The worker accepted the task. Ignored once results are in.
    pub fn mark_processing(&mut self, task_id: Option<String>) {
        if self.status == ImageStatus::Uploaded {
            self.status = ImageStatus::Processing;
            self.task_id = task_id;
        }
    }

    pub(crate) fn settle(&mut self, error: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_settled() {
            return Err(DomainError::conflict(format!(
                "image {} already has results",
                self.id
            )));
        }
        self.status = if error.is_some() {
            ImageStatus::Failed
        } else {
            ImageStatus::Processed
        };
        self.error_message = error;
        self.processed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(url: &str) -> CreateImageRequest {
        CreateImageRequest {
            storage_url: url.into(),
            thumbnail_url: None,
            original_filename: Some("IMG_0001.jpg".into()),
            file_size: Some(2_048_000),
            mime_type: Some("image/jpeg".into()),
        }
    }

    #[test]
    fn accepts_supported_schemes() {
        for url in ["gs://bucket/a.jpg", "s3://bucket/a.jpg", "https://cdn.example.com/a.jpg", "HTTP://x/a"] {
            assert!(Image::create(PhotoSessionId::new(), req(url), Utc::now()).is_ok(), "{url}");
        }
    }

    #[test]
    fn rejects_other_schemes_and_bare_scheme() {
        for url in ["file:///etc/passwd", "ftp://x/a.jpg", "gs://", "bucket/a.jpg"] {
            assert!(Image::create(PhotoSessionId::new(), req(url), Utc::now()).is_err(), "{url}");
        }
    }

    #[test]
    fn rejects_non_image_mime() {
        let mut r = req("gs://b/a.pdf");
        r.mime_type = Some("application/pdf".into());
        assert!(Image::create(PhotoSessionId::new(), r, Utc::now()).is_err());
    }

    #[test]
    fn settles_once() {
        let mut image = Image::create(PhotoSessionId::new(), req("gs://b/a.jpg"), Utc::now()).unwrap();
        image.mark_processing(Some("tasks/1".into()));
        assert_eq!(image.status, ImageStatus::Processing);
        image.settle(None, Utc::now()).unwrap();
        assert_eq!(image.status, ImageStatus::Processed);
        assert!(matches!(image.settle(None, Utc::now()), Err(DomainError::Conflict(_))));

        image.mark_processing(None);
        assert_eq!(image.status, ImageStatus::Processed);
    }
}
