use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use demeter_auth::JwtClaims;
use demeter_core::{Module, TenantId};
use demeter_infra::config::TenantSettings;
use demeter_infra::{InMemoryStore, NoopTaskDispatcher, Settings};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const SECRET: &str = "black-box-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as production, over the in-memory store, on an ephemeral port.
    async fn spawn(settings: Settings) -> Self {
        let app = demeter_api::app::build_app_with(
            Arc::new(InMemoryStore::new()),
            Arc::new(NoopTaskDispatcher),
            &settings,
        )
        .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn with_auth() -> Self {
        Self::spawn(authenticated_settings(Vec::new())).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn authenticated_settings(tenants: Vec<TenantSettings>) -> Settings {
    let mut settings = Settings::default();
    settings.auth.enabled = true;
    settings.auth.jwt_secret = Some(SECRET.to_string());
    settings.tenants = tenants;
    settings
}

fn mint_jwt(tenant: &str, user: &str, groups: &[&str]) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user.to_string(),
        tenant_id: TenantId::parse(tenant).unwrap(),
        email: Some(format!("{user}@example.com")),
        name: Some(user.to_string()),
        groups: groups.iter().map(|g| g.to_string()).collect(),
        iat: now.timestamp(),
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
        iss: None,
        aud: None,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn admin(tenant: &str) -> String {
    mint_jwt(tenant, "admin-1", &["ADMIN"])
}

async fn create_product(server: &TestServer, token: &str, sku: &str) -> reqwest::Response {
    server
        .client
        .post(server.api("/products"))
        .bearer_auth(token)
        .json(&json!({ "sku": sku, "name": format!("Plant {sku}") }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let server = TestServer::with_auth().await;

    let res = server.client.get(server.api("/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], 401);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn forged_token_is_unauthorized() {
    let server = TestServer::with_auth().await;
    let now = Utc::now();
    let claims = json!({
        "sub": "mallory",
        "tenant_id": "tenant-alpha",
        "groups": ["ADMIN"],
        "iat": now.timestamp(),
        "exp": (now + ChronoDuration::minutes(10)).timestamp(),
    });
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();

    let res = server
        .client
        .get(server.api("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reports_token_principal() {
    let server = TestServer::with_auth().await;
    let token = mint_jwt("tenant-alpha", "ana", &["supervisor", "unrelated-group"]);

    let res = server
        .client
        .get(server.api("/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["tenantId"], "tenant-alpha");
    assert_eq!(body["userId"], "ana");
    assert_eq!(body["roles"], json!(["SUPERVISOR"]));
}

#[tokio::test]
async fn conflicting_tenant_header_is_forbidden() {
    let server = TestServer::with_auth().await;
    let token = admin("tenant-alpha");

    let res = server
        .client
        .get(server.api("/products"))
        .bearer_auth(&token)
        .header("X-Tenant-ID", "tenant-beta")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let matching = server
        .client
        .get(server.api("/products"))
        .bearer_auth(&token)
        .header("X-Tenant-ID", "tenant-alpha")
        .send()
        .await
        .unwrap();
    assert_eq!(matching.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_disabled_requires_tenant_header() {
    let server = TestServer::spawn(Settings::default()).await;

    let res = server.client.get(server.api("/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .post(server.api("/products"))
        .header("X-Tenant-ID", "tenant-dev")
        .json(&json!({ "sku": "DEV-1", "name": "Dev plant" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let whoami: Value = server
        .client
        .get(server.api("/whoami"))
        .header("X-Tenant-ID", "tenant-dev")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(whoami["tenantId"], "tenant-dev");
    assert_eq!(whoami["roles"], json!(["ADMIN"]));
}

#[tokio::test]
async fn tenants_cannot_see_each_other() {
    let server = TestServer::with_auth().await;
    let alpha = admin("tenant-alpha");
    let beta = admin("tenant-beta");

    let created: Value = create_product(&server, &alpha, "ROSE-1").await.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let own = server
        .client
        .get(server.api(&format!("/products/{id}")))
        .bearer_auth(&alpha)
        .send()
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::OK);

    let other = server
        .client
        .get(server.api(&format!("/products/{id}")))
        .bearer_auth(&beta)
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::NOT_FOUND);

    let listing: Value = server
        .client
        .get(server.api("/products"))
        .bearer_auth(&beta)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["totalElements"], 0);

    let delete = server
        .client
        .delete(server.api(&format!("/products/{id}")))
        .bearer_auth(&beta)
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);

    let batch: Value = server
        .client
        .post(server.api("/stock-batches"))
        .bearer_auth(&alpha)
        .json(&json!({ "productId": id, "batchCode": "R-1", "quantity": "10", "unit": "pots" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sale: Value = server
        .client
        .post(server.api("/sales"))
        .bearer_auth(&alpha)
        .json(&json!({ "items": [{ "productId": id, "quantity": "1", "unitPrice": "5" }] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    for (collection, record) in [("stock-batches", &batch), ("sales", &sale)] {
        let record_id = record["id"].as_str().unwrap();
        let own = server
            .client
            .get(server.api(&format!("/{collection}/{record_id}")))
            .bearer_auth(&alpha)
            .send()
            .await
            .unwrap();
        assert_eq!(own.status(), StatusCode::OK, "{collection}");

        let other = server
            .client
            .get(server.api(&format!("/{collection}/{record_id}")))
            .bearer_auth(&beta)
            .send()
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::NOT_FOUND, "{collection}");

        let listing: Value = server
            .client
            .get(server.api(&format!("/{collection}")))
            .bearer_auth(&beta)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listing["totalElements"], 0, "{collection}");
    }
}

#[tokio::test]
async fn sku_is_unique_per_tenant_only() {
    let server = TestServer::with_auth().await;
    let alpha = admin("tenant-alpha");
    let beta = admin("tenant-beta");

    assert_eq!(create_product(&server, &alpha, "FERN").await.status(), StatusCode::CREATED);
    assert_eq!(create_product(&server, &beta, "FERN").await.status(), StatusCode::CREATED);

    let duplicate = create_product(&server, &alpha, "FERN").await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    let body: Value = duplicate.json().await.unwrap();
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let server = TestServer::with_auth().await;
    let token = admin("tenant-alpha");

    let bad_id = server
        .client
        .get(server.api("/products/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);

    let bad_body = server
        .client
        .post(server.api("/products"))
        .bearer_auth(&token)
        .json(&json!({ "name": "no sku" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_body.status(), StatusCode::BAD_REQUEST);

    let bad_page = server
        .client
        .get(server.api("/products?size=1000"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(bad_page.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn viewer_cannot_write() {
    let server = TestServer::with_auth().await;
    let viewer = mint_jwt("tenant-alpha", "vera", &["VIEWER"]);

    let res = create_product(&server, &viewer, "TULIP").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let read = server
        .client
        .get(server.api("/products"))
        .bearer_auth(&viewer)
        .send()
        .await
        .unwrap();
    assert_eq!(read.status(), StatusCode::OK);
}

#[tokio::test]
async fn worker_cannot_record_movements_or_open_photo_sessions() {
    let server = TestServer::with_auth().await;
    let token = admin("tenant-alpha");
    let worker = mint_jwt("tenant-alpha", "wes", &["WORKER"]);

    let product: Value = create_product(&server, &token, "IVY").await.json().await.unwrap();
    let batch: Value = server
        .client
        .post(server.api("/stock-batches"))
        .bearer_auth(&token)
        .json(&json!({
            "productId": product["id"],
            "batchCode": "IV-1",
            "quantity": "10",
            "unit": "pots",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let movement = server
        .client
        .post(server.api("/stock-movements"))
        .bearer_auth(&worker)
        .json(&json!({ "movementType": "ENTRY", "batchId": batch["id"], "quantity": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(movement.status(), StatusCode::FORBIDDEN);
    let body: Value = movement.json().await.unwrap();
    assert_eq!(body["error"], "Forbidden");

    let session = server
        .client
        .post(server.api("/photo-sessions"))
        .bearer_auth(&worker)
        .json(&json!({ "name": "morning count" }))
        .send()
        .await
        .unwrap();
    assert_eq!(session.status(), StatusCode::FORBIDDEN);

    let supervisor = mint_jwt("tenant-alpha", "sue", &["SUPERVISOR"]);
    let allowed = server
        .client
        .post(server.api("/stock-movements"))
        .bearer_auth(&supervisor)
        .json(&json!({ "movementType": "ENTRY", "batchId": batch["id"], "quantity": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn disabled_module_is_forbidden() {
    let tenants = vec![TenantSettings {
        id: TenantId::parse("tenant-alpha").unwrap(),
        name: "Alpha Nursery".to_string(),
        industry: None,
        enabled_modules: Some(BTreeSet::from([Module::Products, Module::Inventory])),
        pipeline: None,
    }];
    let server = TestServer::spawn(authenticated_settings(tenants)).await;
    let alpha = admin("tenant-alpha");

    let products = server
        .client
        .get(server.api("/products"))
        .bearer_auth(&alpha)
        .send()
        .await
        .unwrap();
    assert_eq!(products.status(), StatusCode::OK);

    let sales = server
        .client
        .get(server.api("/sales"))
        .bearer_auth(&alpha)
        .send()
        .await
        .unwrap();
    assert_eq!(sales.status(), StatusCode::FORBIDDEN);

    // Tenants absent from configuration get every module.
    let beta_sales = server
        .client
        .get(server.api("/sales"))
        .bearer_auth(admin("tenant-beta"))
        .send()
        .await
        .unwrap();
    assert_eq!(beta_sales.status(), StatusCode::OK);
}

#[tokio::test]
async fn completing_a_sale_draws_down_stock() {
    let server = TestServer::with_auth().await;
    let token = admin("tenant-alpha");

    let product: Value = create_product(&server, &token, "OLIVE").await.json().await.unwrap();
    let product_id = product["id"].as_str().unwrap().to_string();

    let batch = server
        .client
        .post(server.api("/stock-batches"))
        .bearer_auth(&token)
        .json(&json!({
            "productId": product_id,
            "batchCode": "OL-1",
            "quantity": "10",
            "unit": "pots",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(batch.status(), StatusCode::CREATED);
    let batch: Value = batch.json().await.unwrap();
    let batch_id = batch["id"].as_str().unwrap().to_string();

    let sale = server
        .client
        .post(server.api("/sales"))
        .bearer_auth(&token)
        .json(&json!({
            "customerName": "Garden Co",
            "items": [{ "productId": product_id, "quantity": "4", "unitPrice": "12.50" }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(sale.status(), StatusCode::CREATED);
    let sale: Value = sale.json().await.unwrap();
    assert_eq!(sale["status"], "PENDING");
    let sale_id = sale["id"].as_str().unwrap().to_string();

    let completed = server
        .client
        .post(server.api(&format!("/sales/{sale_id}/complete")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(completed.status(), StatusCode::OK);
    let completed: Value = completed.json().await.unwrap();
    assert_eq!(completed["status"], "COMPLETED");

    let batch: Value = server
        .client
        .get(server.api(&format!("/stock-batches/{batch_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(batch["quantity"], "6");

    let movements: Value = server
        .client
        .get(server.api(&format!("/stock-movements/by-reference/{sale_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(movements["totalElements"], 1);
    assert_eq!(movements["content"][0]["movementType"], "SALE");

    let again = server
        .client
        .post(server.api(&format!("/sales/{sale_id}/complete")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn oversold_sale_is_rejected() {
    let server = TestServer::with_auth().await;
    let token = admin("tenant-alpha");
    let product: Value = create_product(&server, &token, "FICUS").await.json().await.unwrap();

    let sale: Value = server
        .client
        .post(server.api("/sales"))
        .bearer_auth(&token)
        .json(&json!({
            "items": [{ "productId": product["id"], "quantity": "3", "unitPrice": "20" }],
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let res = server
        .client
        .post(server.api(&format!("/sales/{}/complete", sale["id"].as_str().unwrap())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Unprocessable Entity");
}

#[tokio::test]
async fn chat_answers_with_tenant_stock() {
    let server = TestServer::with_auth().await;
    let worker = mint_jwt("tenant-alpha", "wes", &["WORKER"]);
    let token = admin("tenant-alpha");

    let product: Value = create_product(&server, &token, "PALM").await.json().await.unwrap();
    server
        .client
        .post(server.api("/stock-batches"))
        .bearer_auth(&token)
        .json(&json!({
            "productId": product["id"],
            "batchCode": "P-1",
            "quantity": "17",
            "unit": "pots",
        }))
        .send()
        .await
        .unwrap();

    let session = server
        .client
        .post(server.api("/chat/sessions"))
        .bearer_auth(&worker)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(session.status(), StatusCode::CREATED);
    let session: Value = session.json().await.unwrap();
    let session_id = session["id"].as_str().unwrap().to_string();

    let exchange: Value = server
        .client
        .post(server.api(&format!("/chat/sessions/{session_id}/messages")))
        .bearer_auth(&worker)
        .json(&json!({ "content": "what is our stock level?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(exchange["assistantMessage"]["content"].as_str().unwrap().contains("17"));

    // Another user of the same tenant cannot read the conversation.
    let peek = server
        .client
        .get(server.api(&format!("/chat/sessions/{session_id}/messages")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(peek.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoints_need_no_auth() {
    let server = TestServer::with_auth().await;

    for path in ["/health", "/health/live", "/health/ready"] {
        let res = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status"], "UP", "{path}");
    }
}
