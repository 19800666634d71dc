use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demeter_core::{DomainResult, Record, uuid_id, validate};
use demeter_locations::WarehouseId;
use demeter_products::ProductId;

uuid_id!(PhotoSessionId, "PhotoSessionId");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A batch of photos taken together (one greenhouse walk, one bench).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoSession {
    pub id: PhotoSessionId,
    pub name: Option<String>,
    pub warehouse_id: Option<WarehouseId>,
    pub product_id: Option<ProductId>,
    pub status: SessionStatus,
    pub total_images: u32,
    pub processed_images: u32,
    pub failed_images: u32,
    pub created_by: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for PhotoSession {
    type Id = PhotoSessionId;
    const KIND: &'static str = "photo_sessions";
    const ENTITY: &'static str = "PhotoProcessingSession";

    fn id(&self) -> PhotoSessionId {
        self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
}

/// Progress view returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub session_id: PhotoSessionId,
    pub status: SessionStatus,
    pub total_images: u32,
    pub processed_images: u32,
    pub failed_images: u32,
    pub pending_images: u32,
    pub progress_percent: f64,
}

impl PhotoSession {
    pub fn create(req: CreateSessionRequest, created_by: Option<String>, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: PhotoSessionId::new(),
            name: validate::optional_text("name", req.name.as_deref(), 255)?,
            warehouse_id: req.warehouse_id,
            product_id: req.product_id,
            status: SessionStatus::Pending,
            total_images: 0,
            processed_images: 0,
            failed_images: 0,
            created_by,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Count a newly uploaded image. A settled session reopens.
    pub fn register_image(&mut self, now: DateTime<Utc>) {
        self.total_images += 1;
        self.status = SessionStatus::Processing;
        self.started_at.get_or_insert(now);
        self.completed_at = None;
        self.updated_at = now;
    }

    /// Count one image outcome and settle the session once every image has one.
    pub(crate) fn record_outcome(&mut self, success: bool, now: DateTime<Utc>) {
        if success {
            self.processed_images += 1;
        } else {
            self.failed_images += 1;
        }
        if self.is_settled() {
            self.status = if self.processed_images == 0 {
                SessionStatus::Failed
            } else {
                SessionStatus::Completed
            };
            self.completed_at = Some(now);
        }
        self.updated_at = now;
    }

    pub fn settled_images(&self) -> u32 {
        self.processed_images + self.failed_images
    }

    pub fn is_settled(&self) -> bool {
        self.total_images > 0 && self.settled_images() >= self.total_images
    }

    pub fn progress(&self) -> SessionProgress {
        let progress_percent = if self.total_images == 0 {
            0.0
        } else {
            let pct = f64::from(self.settled_images()) * 100.0 / f64::from(self.total_images);
            (pct * 100.0).round() / 100.0
        };
        SessionProgress {
            session_id: self.id,
            status: self.status,
            total_images: self.total_images,
            processed_images: self.processed_images,
            failed_images: self.failed_images,
            pending_images: self.total_images.saturating_sub(self.settled_images()),
            progress_percent,
        }
    }
}
