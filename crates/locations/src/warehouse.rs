use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};

uuid_id!(WarehouseId, "WarehouseId");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Warehouse {
    type Id = WarehouseId;
    const KIND: &'static str = "warehouses";
    const ENTITY: &'static str = "Warehouse";
    const UNIQUE: &'static [&'static [&'static str]] = &[&["name"]];

    fn id(&self) -> WarehouseId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWarehouseRequest {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWarehouseRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub active: Option<bool>,
}

fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> DomainResult<()> {
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(DomainError::validation("latitude must be between -90 and 90"));
        }
    }
    if let Some(lng) = longitude {
        if !(-180.0..=180.0).contains(&lng) {
            return Err(DomainError::validation("longitude must be between -180 and 180"));
        }
    }
    Ok(())
}

impl Warehouse {
    pub fn create(req: CreateWarehouseRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        check_coordinates(req.latitude, req.longitude)?;
        Ok(Self {
            id: WarehouseId::new(),
            name: validate::required_text("name", &req.name, 120)?,
            address: validate::optional_text("address", req.address.as_deref(), 500)?,
            latitude: req.latitude,
            longitude: req.longitude,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, req: UpdateWarehouseRequest, now: DateTime<Utc>) -> DomainResult<()> {
        check_coordinates(req.latitude, req.longitude)?;
        let name = req
            .name
            .as_deref()
            .map(|n| validate::required_text("name", n, 120))
            .transpose()?;
        let address = match req.address.as_deref() {
            Some(a) => Some(validate::optional_text("address", Some(a), 500)?),
            None => None,
        };

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(address) = address {
            self.address = address;
        }
        if req.latitude.is_some() {
            self.latitude = req.latitude;
        }
        if req.longitude.is_some() {
            self.longitude = req.longitude;
        }
        if let Some(active) = req.active {
            self.active = active;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        let req = CreateWarehouseRequest {
            name: "North".into(),
            address: None,
            latitude: Some(91.0),
            longitude: None,
        };
        assert!(Warehouse::create(req, Utc::now()).is_err());
    }

    #[test]
    fn update_can_deactivate() {
        let mut w = Warehouse::create(
            CreateWarehouseRequest {
                name: "North".into(),
                address: Some("Ruta 5 km 12".into()),
                latitude: Some(-33.4),
                longitude: Some(-70.6),
            },
            Utc::now(),
        )
        .unwrap();
        assert!(w.active);
        w.apply_update(
            UpdateWarehouseRequest {
                active: Some(false),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert!(!w.active);
        assert_eq!(w.address.as_deref(), Some("Ruta 5 km 12"));
    }
}
