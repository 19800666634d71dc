use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demeter_auth::{Principal, Role};
use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};

uuid_id!(UserId, "UserId");

/// Local user profile keyed by the identity-provider subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for User {
    type Id = UserId;
    const KIND: &'static str = "users";
    const ENTITY: &'static str = "User";
    const UNIQUE: &'static [&'static [&'static str]] = &[&["externalId"], &["email"]];

    fn id(&self) -> UserId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

/// Lower-cased, trimmed address with exactly one `@` and text on both sides.
fn validate_email(email: &str) -> DomainResult<String> {
    let email = validate::required_text("email", email, 255)?.to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(email),
        _ => Err(DomainError::validation(format!("'{email}' is not a valid email address"))),
    }
}

impl User {
    pub fn create(req: CreateUserRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: UserId::new(),
            external_id: validate::required_text("externalId", &req.external_id, 255)?,
            email: validate_email(&req.email)?,
            name: validate::required_text("name", &req.name, 255)?,
            role: req.role,
            active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// First-login provisioning from token claims.
    ///
    /// The stored role is the most privileged one the token carries; a token
    /// without application roles provisions a `VIEWER`.
    pub fn provision(principal: &Principal, now: DateTime<Utc>) -> DomainResult<Self> {
        let email = principal
            .email
            .as_deref()
            .ok_or_else(|| DomainError::validation("token carries no email claim"))?;
        let name = principal.name.as_deref().unwrap_or(email);
        let mut user = Self::create(
            CreateUserRequest {
                external_id: principal.user_id.clone(),
                email: email.to_string(),
                name: name.to_string(),
                role: principal.highest_role().unwrap_or(Role::Viewer),
            },
            now,
        )?;
        user.last_login_at = Some(now);
        Ok(user)
    }

    pub fn apply_update(&mut self, req: UpdateUserRequest, now: DateTime<Utc>) -> DomainResult<()> {
        let name = req
            .name
            .as_deref()
            .map(|n| validate::required_text("name", n, 255))
            .transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(role) = req.role {
            self.role = role;
        }
        if let Some(active) = req.active {
            self.active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
        self.updated_at = now;
    }
}
