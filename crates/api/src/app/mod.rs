//! HTTP application wiring (Axum router + service wiring).
//!
//! - `routes/`: handlers, one file per module
//! - `extract.rs`: body/query extractors with JSON rejections
//! - `errors.rs`: `{status, error, message}` error responses

use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use demeter_auth::{Hs256JwtValidator, JwtValidator};
use demeter_infra::{
    HttpTaskDispatcher, InMemoryStore, NoopTaskDispatcher, PgStore, Services, Settings, Store, TaskDispatcher,
    TenantRegistry,
};

use crate::middleware::{self, AuthState};

pub mod errors;
pub mod extract;
pub mod routes;

/// Build the router with backends chosen from `settings`.
///
/// `database.url` selects Postgres (in-memory otherwise); `photos.worker_url`
/// enables task dispatch to the ML worker.
pub async fn build_app(settings: &Settings) -> anyhow::Result<Router> {
    let store: Arc<dyn Store> = match &settings.database.url {
        Some(url) => Arc::new(
            PgStore::connect(url, settings.database.max_connections)
                .await
                .context("connecting to the database")?,
        ),
        None => {
            tracing::warn!("database.url not set; using the in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let dispatcher: Arc<dyn TaskDispatcher> = match &settings.photos.worker_url {
        Some(url) => Arc::new(
            HttpTaskDispatcher::new(url, settings.photos.worker_token.clone())
                .context("building the ML worker client")?,
        ),
        None => {
            tracing::info!("photos.worker_url not set; processing tasks are not dispatched");
            Arc::new(NoopTaskDispatcher)
        }
    };

    build_app_with(store, dispatcher, settings)
}

/// Build the router over explicit backends (tests, embedding).
pub fn build_app_with(
    store: Arc<dyn Store>,
    dispatcher: Arc<dyn TaskDispatcher>,
    settings: &Settings,
) -> anyhow::Result<Router> {
    let tenants = TenantRegistry::new(settings.tenant_configs());
    let mut services = Services::new(store.clone(), dispatcher, tenants.clone());
    services.photos = services
        .photos
        .with_default_pipeline(settings.photos.default_pipeline.clone());

    let jwt: Option<Arc<dyn JwtValidator>> = if settings.auth.enabled {
        let secret = settings
            .auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("auth.jwt_secret is required when auth.enabled is true")?;
        let validator: Arc<dyn JwtValidator> = Arc::new(Hs256JwtValidator::with_constraints(
            secret.as_bytes(),
            settings.auth.issuer.as_deref(),
            settings.auth.audience.as_deref(),
        ));
        Some(validator)
    } else {
        tracing::warn!("authentication disabled; tenant is taken from X-Tenant-ID");
        None
    };
    let auth_state = AuthState {
        jwt,
        dev_roles: settings.auth.dev_roles.clone(),
    };

    let api = routes::router(&tenants)
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Ok(Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(store)),
        ))
}
