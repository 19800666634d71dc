use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};

use crate::CategoryId;

pub const SKU_MAX_LEN: usize = 64;
pub const NAME_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 2000;

uuid_id!(
    /// Product identifier (tenant-scoped by the store).
    ProductId,
    "ProductId"
);

/// Product lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductState {
    #[default]
    Active,
    Inactive,
    Discontinued,
}

impl ProductState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductState::Active => "ACTIVE",
            ProductState::Inactive => "INACTIVE",
            ProductState::Discontinued => "DISCONTINUED",
        }
    }
}

impl core::str::FromStr for ProductState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(ProductState::Active),
            "INACTIVE" => Ok(ProductState::Inactive),
            "DISCONTINUED" => Ok(ProductState::Discontinued),
            other => Err(DomainError::validation(format!("unknown product state '{other}'"))),
        }
    }
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub state: ProductState,
    pub custom_attributes: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Product {
    type Id = ProductId;
    const KIND: &'static str = "products";
    const ENTITY: &'static str = "Product";
    const UNIQUE: &'static [&'static [&'static str]] = &[&["sku"]];

    fn id(&self) -> ProductId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub state: Option<ProductState>,
    #[serde(default)]
    pub custom_attributes: Option<serde_json::Value>,
}

/// Partial update: absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub state: Option<ProductState>,
    pub custom_attributes: Option<serde_json::Value>,
}

fn validate_sku(sku: &str) -> DomainResult<String> {
    let sku = validate::required_text("sku", sku, SKU_MAX_LEN)?;
    if sku.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("sku cannot contain whitespace"));
    }
    Ok(sku)
}

impl Product {
    pub fn create(req: CreateProductRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: ProductId::new(),
            sku: validate_sku(&req.sku)?,
            name: validate::required_text("name", &req.name, NAME_MAX_LEN)?,
            description: validate::optional_text(
                "description",
                req.description.as_deref(),
                DESCRIPTION_MAX_LEN,
            )?,
            category_id: req.category_id,
            state: req.state.unwrap_or_default(),
            custom_attributes: validate::attributes(req.custom_attributes)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, req: UpdateProductRequest, now: DateTime<Utc>) -> DomainResult<()> {
        // Validate everything before touching state so a failed update is a no-op.
        let sku = req.sku.as_deref().map(validate_sku).transpose()?;
        let name = req
            .name
            .as_deref()
            .map(|n| validate::required_text("name", n, NAME_MAX_LEN))
            .transpose()?;
        let description = match req.description.as_deref() {
            Some(d) => Some(validate::optional_text("description", Some(d), DESCRIPTION_MAX_LEN)?),
            None => None,
        };
        let attributes = match req.custom_attributes {
            Some(a) => Some(validate::attributes(Some(a))?),
            None => None,
        };

        if let Some(sku) = sku {
            self.sku = sku;
        }
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(category_id) = req.category_id {
            self.category_id = Some(category_id);
        }
        if let Some(state) = req.state {
            self.state = state;
        }
        if let Some(attributes) = attributes {
            self.custom_attributes = attributes;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Only active products can appear on new sales.
    pub fn can_be_sold(&self) -> bool {
        self.state == ProductState::Active
    }
}
