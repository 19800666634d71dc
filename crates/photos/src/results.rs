use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use demeter_core::{DomainError, DomainResult, Record, uuid_id, validate};
use demeter_products::ProductId;

use crate::image::{Image, ImageId};
use crate::session::{PhotoSession, PhotoSessionId};

uuid_id!(DetectionId, "DetectionId");
uuid_id!(ClassificationId, "ClassificationId");
uuid_id!(EstimationId, "EstimationId");

/// Pixel-space box; origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    fn validate(self) -> DomainResult<Self> {
        let finite = [self.x, self.y, self.width, self.height].iter().all(|v| v.is_finite());
        if !finite || self.width < 0.0 || self.height < 0.0 {
            return Err(DomainError::validation("boundingBox must be finite with non-negative size"));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub id: DetectionId,
    pub image_id: ImageId,
    pub session_id: PhotoSessionId,
    pub label: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    pub created_at: DateTime<Utc>,
}

impl Record for Detection {
    type Id = DetectionId;
    const KIND: &'static str = "detections";
    const ENTITY: &'static str = "Detection";

    fn id(&self) -> DetectionId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub id: ClassificationId,
    pub image_id: ImageId,
    pub session_id: PhotoSessionId,
    pub label: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl Record for Classification {
    type Id = ClassificationId;
    const KIND: &'static str = "classifications";
    const ENTITY: &'static str = "Classification";

    fn id(&self) -> ClassificationId {
        self.id
    }
}

/// Quantitative estimate derived from an image (plant count, coverage, height).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimation {
    pub id: EstimationId,
    pub image_id: ImageId,
    pub session_id: PhotoSessionId,
    pub product_id: Option<ProductId>,
    pub estimation_type: String,
    pub value: Decimal,
    pub unit: Option<String>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl Record for Estimation {
    type Id = EstimationId;
    const KIND: &'static str = "estimations";
    const ENTITY: &'static str = "Estimation";

    fn id(&self) -> EstimationId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionInput {
    pub label: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationInput {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationInput {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub estimation_type: String,
    pub value: Decimal,
    #[serde(default)]
    pub unit: Option<String>,
    pub confidence: f64,
}

/// Callback body from the ML worker for one image.
///
/// A non-empty `error` marks the image failed; any results sent alongside an
/// error are discarded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResultsRequest {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detections: Vec<DetectionInput>,
    #[serde(default)]
    pub classifications: Vec<ClassificationInput>,
    #[serde(default)]
    pub estimations: Vec<EstimationInput>,
}

/// Records produced by [`apply_results`], ready to be stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedResults {
    pub detections: Vec<Detection>,
    pub classifications: Vec<Classification>,
    pub estimations: Vec<Estimation>,
}

/// Settle `image` with the worker's results and advance `session`.
///
/// Everything is validated before either record is touched.
pub fn apply_results(
    session: &mut PhotoSession,
    image: &mut Image,
    req: ImageResultsRequest,
    now: DateTime<Utc>,
) -> DomainResult<RecordedResults> {
    if image.session_id != session.id {
        return Err(DomainError::validation("image does not belong to this session"));
    }
    if image.status.is_settled() {
        return Err(DomainError::conflict(format!("image {} already has results", image.id)));
    }

    let error = validate::optional_text("error", req.error.as_deref(), 2000)?;
    let mut recorded = RecordedResults::default();
    if error.is_none() {
        for d in req.detections {
            recorded.detections.push(Detection {
                id: DetectionId::new(),
                image_id: image.id,
                session_id: session.id,
                label: validate::required_text("label", &d.label, 120)?,
                confidence: validate::confidence("confidence", d.confidence)?,
                bounding_box: d.bounding_box.validate()?,
                created_at: now,
            });
        }
        for c in req.classifications {
            recorded.classifications.push(Classification {
                id: ClassificationId::new(),
                image_id: image.id,
                session_id: session.id,
                label: validate::required_text("label", &c.label, 120)?,
                confidence: validate::confidence("confidence", c.confidence)?,
                created_at: now,
            });
        }
        for e in req.estimations {
            recorded.estimations.push(Estimation {
                id: EstimationId::new(),
                image_id: image.id,
                session_id: session.id,
                product_id: e.product_id,
                estimation_type: validate::required_text("estimationType", &e.estimation_type, 60)?,
                value: validate::non_negative("value", e.value)?,
                unit: validate::optional_text("unit", e.unit.as_deref(), 20)?,
                confidence: validate::confidence("confidence", e.confidence)?,
                created_at: now,
            });
        }
    }

    let success = error.is_none();
    image.settle(error, now)?;
    session.record_outcome(success, now);
    Ok(recorded)
}
