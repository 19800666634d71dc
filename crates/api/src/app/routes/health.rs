use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use demeter_infra::Store;

#[derive(Debug, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub checks: Vec<Check>,
}

pub fn router() -> Router {
    Router::new()
        .route("/health", get(ready))
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
}

pub async fn live() -> Json<Health> {
    Json(Health {
        status: "UP",
        checks: Vec::new(),
    })
}

/// 503 while the store does not answer.
pub async fn ready(Extension(store): Extension<Arc<dyn Store>>) -> Response {
    let (status, check) = match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Check {
                name: store.backend(),
                status: "UP",
                detail: None,
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, backend = store.backend(), "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Check {
                    name: store.backend(),
                    status: "DOWN",
                    detail: Some("store did not respond".to_string()),
                },
            )
        }
    };
    let body = Health {
        status: check.status,
        checks: vec![check],
    };
    (status, Json(body)).into_response()
}
