use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};

uuid_id!(PackagingId, "PackagingId");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackagingType {
    Pot,
    Tray,
    Box,
    Bag,
    Other,
}

/// A packaging option (pot, tray, bag) products can ship in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packaging {
    pub id: PackagingId,
    pub name: String,
    pub packaging_type: PackagingType,
    pub material: Option<String>,
    pub color: Option<String>,
    pub capacity: Option<Decimal>,
    pub capacity_unit: Option<String>,
    pub units_per_package: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Packaging {
    type Id = PackagingId;
    const KIND: &'static str = "packaging";
    const ENTITY: &'static str = "Packaging";
    const UNIQUE: &'static [&'static [&'static str]] = &[&["name"]];

    fn id(&self) -> PackagingId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePackagingRequest {
    pub name: String,
    pub packaging_type: PackagingType,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub capacity: Option<Decimal>,
    #[serde(default)]
    pub capacity_unit: Option<String>,
    #[serde(default)]
    pub units_per_package: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePackagingRequest {
    pub name: Option<String>,
    pub packaging_type: Option<PackagingType>,
    pub material: Option<String>,
    pub color: Option<String>,
    pub capacity: Option<Decimal>,
    pub capacity_unit: Option<String>,
    pub units_per_package: Option<u32>,
    pub active: Option<bool>,
}

fn units_per_package(value: u32) -> DomainResult<u32> {
    if value == 0 {
        return Err(DomainError::validation("unitsPerPackage must be at least 1"));
    }
    Ok(value)
}

impl Packaging {
    pub fn create(req: CreatePackagingRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: PackagingId::new(),
            name: validate::required_text("name", &req.name, 120)?,
            packaging_type: req.packaging_type,
            material: validate::optional_text("material", req.material.as_deref(), 80)?,
            color: validate::optional_text("color", req.color.as_deref(), 40)?,
            capacity: req.capacity.map(|c| validate::positive("capacity", c)).transpose()?,
            capacity_unit: validate::optional_text("capacityUnit", req.capacity_unit.as_deref(), 20)?,
            units_per_package: units_per_package(req.units_per_package.unwrap_or(1))?,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, req: UpdatePackagingRequest, now: DateTime<Utc>) -> DomainResult<()> {
        let name = req
            .name
            .as_deref()
            .map(|n| validate::required_text("name", n, 120))
            .transpose()?;
        let material = req
            .material
            .as_deref()
            .map(|m| validate::optional_text("material", Some(m), 80))
            .transpose()?;
        let color = req
            .color
            .as_deref()
            .map(|c| validate::optional_text("color", Some(c), 40))
            .transpose()?;
        let capacity = req.capacity.map(|c| validate::positive("capacity", c)).transpose()?;
        let capacity_unit = req
            .capacity_unit
            .as_deref()
            .map(|u| validate::optional_text("capacityUnit", Some(u), 20))
            .transpose()?;
        let units = req.units_per_package.map(units_per_package).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(packaging_type) = req.packaging_type {
            self.packaging_type = packaging_type;
        }
        if let Some(material) = material {
            self.material = material;
        }
        if let Some(color) = color {
            self.color = color;
        }
        if capacity.is_some() {
            self.capacity = capacity;
        }
        if let Some(capacity_unit) = capacity_unit {
            self.capacity_unit = capacity_unit;
        }
        if let Some(units) = units {
            self.units_per_package = units;
        }
        if let Some(active) = req.active {
            self.active = active;
        }
        self.updated_at = now;
        Ok(())
    }
}
