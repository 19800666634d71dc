//! Photo processing domain: sessions of uploaded images, the ML results
//! attached to them, and the task payload sent to the ML worker.
//!
//! Session counters and statuses only move through [`apply_results`] and
//! [`PhotoSession::register_image`], so `processed + failed <= total` holds for
//! every stored session.

pub mod image;
pub mod results;
pub mod session;
pub mod task;

pub use image::{CreateImageRequest, Image, ImageId, ImageStatus};
pub use results::{
    BoundingBox, Classification, ClassificationId, ClassificationInput, Detection, DetectionId,
    DetectionInput, Estimation, EstimationId, EstimationInput, ImageResultsRequest, RecordedResults,
    apply_results,
};
pub use session::{CreateSessionRequest, PhotoSession, PhotoSessionId, SessionProgress, SessionStatus};
pub use task::{DEFAULT_PIPELINE, ProcessingTaskRequest};
