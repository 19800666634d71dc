use axum::{Extension, Json};

use demeter_auth::Principal;

use crate::context::PrincipalContext;

/// The resolved caller of this request.
pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> Json<Principal> {
    Json(principal.principal().clone())
}
