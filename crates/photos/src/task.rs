use serde::{Deserialize, Serialize};
use uuid::Uuid;

use demeter_core::TenantId;

use crate::image::Image;

/// Pipeline used when the tenant does not configure one.
pub const DEFAULT_PIPELINE: &str = "DETECTION";

/// Payload posted to the ML worker's `/tasks/process` endpoint.
///
/// Field names are snake_case to match the worker's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTaskRequest {
    pub tenant_id: String,
    pub session_id: Uuid,
    pub image_id: Uuid,
    pub image_url: String,
    pub pipeline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ProcessingTaskRequest {
    pub fn for_image(tenant_id: &TenantId, image: &Image, pipeline: Option<&str>) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            session_id: image.session_id.into(),
            image_id: image.id.into(),
            image_url: image.storage_url.clone(),
            pipeline: pipeline
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(DEFAULT_PIPELINE)
                .to_string(),
            options: None,
        }
    }

    pub fn with_options(mut self, options: serde_json::Map<String, serde_json::Value>) -> Self {
        self.options = Some(options);
        self
    }
}
