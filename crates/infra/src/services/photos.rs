use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use demeter_core::{Page, PageRequest, Record, TenantId};
use demeter_locations::Warehouse;
use demeter_photos::{
    Classification, CreateImageRequest, CreateSessionRequest, Detection, Estimation, Image, ImageId,
    ImageResultsRequest, PhotoSession, PhotoSessionId, ProcessingTaskRequest, RecordedResults, SessionProgress,
    apply_results,
};
use demeter_products::Product;

use super::{ServiceError, ServiceResult};
use crate::store::{Filter, Store, Tx};
use crate::tasks::TaskDispatcher;
use crate::tenants::TenantRegistry;

/// Photo sessions, their images, and the ML results written back by the worker.
#[derive(Clone)]
pub struct PhotoService {
    store: Arc<dyn Store>,
    dispatcher: Arc<dyn TaskDispatcher>,
    tenants: TenantRegistry,
    default_pipeline: Option<String>,
}

async fn delete_all<T: Record>(tx: &mut Tx, filters: Vec<Filter>) -> ServiceResult<usize> {
    let records = tx.find_all::<T>(filters).await?;
    for record in &records {
        tx.delete::<T>(record.id()).await?;
    }
    Ok(records.len())
}

impl PhotoService {
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<dyn TaskDispatcher>, tenants: TenantRegistry) -> Self {
        Self {
            store,
            dispatcher,
            tenants,
            default_pipeline: None,
        }
    }

    /// Pipeline used for tenants without their own override.
    pub fn with_default_pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.default_pipeline = Some(pipeline.into());
        self
    }

    fn pipeline_for(&self, tenant: &TenantId) -> Option<&str> {
        self.tenants
            .pipeline(tenant)
            .or(self.default_pipeline.as_deref())
    }

    pub async fn list_sessions(&self, tenant: &TenantId, page: PageRequest) -> ServiceResult<Page<PhotoSession>> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.page::<PhotoSession>(Vec::new(), page).await?)
    }

    pub async fn get_session(&self, tenant: &TenantId, id: PhotoSessionId) -> ServiceResult<PhotoSession> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<PhotoSession>(id).await?)
    }

    pub async fn progress(&self, tenant: &TenantId, id: PhotoSessionId) -> ServiceResult<SessionProgress> {
        Ok(self.get_session(tenant, id).await?.progress())
    }

    #[instrument(skip(self, req), fields(tenant_id = %tenant), err)]
    pub async fn create_session(
        &self,
        tenant: &TenantId,
        req: CreateSessionRequest,
        created_by: Option<String>,
    ) -> ServiceResult<PhotoSession> {
        let mut tx = self.store.begin(tenant).await?;
        if let Some(warehouse_id) = req.warehouse_id {
            tx.require::<Warehouse>(warehouse_id).await?;
        }
        if let Some(product_id) = req.product_id {
            tx.require::<Product>(product_id).await?;
        }
        let session = PhotoSession::create(req, created_by, Utc::now())?;
        tx.insert(&session).await?;
        tx.commit().await?;
        Ok(session)
    }

    /// Removes the session with its images and every result attached to them.
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    pub async fn delete_session(&self, tenant: &TenantId, id: PhotoSessionId) -> ServiceResult<()> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<PhotoSession>(id).await?;
        let by_session = || vec![Filter::eq("sessionId", id)];
        let detections = delete_all::<Detection>(&mut tx, by_session()).await?;
        let classifications = delete_all::<Classification>(&mut tx, by_session()).await?;
        let estimations = delete_all::<Estimation>(&mut tx, by_session()).await?;
        let images = delete_all::<Image>(&mut tx, by_session()).await?;
        tx.delete::<PhotoSession>(id).await?;
        tx.commit().await?;
        tracing::debug!(images, detections, classifications, estimations, "photo session removed");
        Ok(())
    }

    pub async fn list_images(&self, tenant: &TenantId, session_id: PhotoSessionId) -> ServiceResult<Vec<Image>> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<PhotoSession>(session_id).await?;
        Ok(tx.find_all::<Image>(vec![Filter::eq("sessionId", session_id)]).await?)
    }

    /// Store the image, count it on the session, then hand it to the ML worker.
    ///
    /// The upload is committed before dispatch. A worker that cannot be
    /// reached leaves the image `UPLOADED`.
    #[instrument(skip(self, req), fields(tenant_id = %tenant, image_id), err)]
    pub async fn add_image(
        &self,
        tenant: &TenantId,
        session_id: PhotoSessionId,
        req: CreateImageRequest,
    ) -> ServiceResult<Image> {
        let now = Utc::now();
        let mut tx = self.store.begin(tenant).await?;
        let mut session = tx.require::<PhotoSession>(session_id).await?;
        let mut image = Image::create(session.id, req, now)?;
        session.register_image(now);
        tx.insert(&image).await?;
        tx.update(&session).await?;
        tx.commit().await?;
        tracing::Span::current().record("image_id", tracing::field::display(image.id));

        let task = ProcessingTaskRequest::for_image(tenant, &image, self.pipeline_for(tenant));
        match self.dispatcher.dispatch(&task).await {
            Ok(task_id) => {
                let mut tx = self.store.begin(tenant).await?;
                if let Some(mut stored) = tx.get::<Image>(image.id).await? {
                    stored.mark_processing(task_id);
                    tx.update(&stored).await?;
                    tx.commit().await?;
                    image = stored;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, pipeline = %task.pipeline, "processing task dispatch failed");
            }
        }
        Ok(image)
    }

    pub async fn get_image(&self, tenant: &TenantId, id: ImageId) -> ServiceResult<Image> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.require::<Image>(id).await?)
    }

    pub async fn detections(&self, tenant: &TenantId, image_id: ImageId) -> ServiceResult<Vec<Detection>> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<Image>(image_id).await?;
        Ok(tx.find_all::<Detection>(vec![Filter::eq("imageId", image_id)]).await?)
    }

    pub async fn classifications(&self, tenant: &TenantId, image_id: ImageId) -> ServiceResult<Vec<Classification>> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<Image>(image_id).await?;
        Ok(tx.find_all::<Classification>(vec![Filter::eq("imageId", image_id)]).await?)
    }

    pub async fn estimations(&self, tenant: &TenantId, session_id: PhotoSessionId) -> ServiceResult<Vec<Estimation>> {
        let mut tx = self.store.begin(tenant).await?;
        tx.require::<PhotoSession>(session_id).await?;
        Ok(tx.find_all::<Estimation>(vec![Filter::eq("sessionId", session_id)]).await?)
    }

    /// Results callback from the ML worker.
    #[instrument(skip(self, req), fields(tenant_id = %tenant, failed = req.error.is_some()), err)]
    pub async fn record_results(
        &self,
        tenant: &TenantId,
        image_id: ImageId,
        req: ImageResultsRequest,
    ) -> ServiceResult<RecordedResults> {
        let now = Utc::now();
        let mut tx = self.store.begin(tenant).await?;
        let mut image = tx.require::<Image>(image_id).await?;
        let mut session = tx.get::<PhotoSession>(image.session_id).await?.ok_or_else(|| {
            ServiceError::Invariant(format!("image {image_id} references a missing session"))
        })?;
        let recorded = apply_results(&mut session, &mut image, req, now)?;
        for detection in &recorded.detections {
            tx.insert(detection).await?;
        }
        for classification in &recorded.classifications {
            tx.insert(classification).await?;
        }
        for estimation in &recorded.estimations {
            tx.insert(estimation).await?;
        }
        tx.update(&image).await?;
        tx.update(&session).await?;
        tx.commit().await?;
        tracing::info!(
            session_id = %session.id,
            status = ?session.status,
            detections = recorded.detections.len(),
            "image results recorded"
        );
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{store, tenant};
    use crate::tasks::InMemoryTaskDispatcher;
    use demeter_core::{Module, TenantConfig};
    use demeter_photos::{BoundingBox, DetectionInput, ImageStatus, SessionStatus};
    use std::collections::BTreeSet;

    fn upload(name: &str) -> CreateImageRequest {
        CreateImageRequest {
            storage_url: format!("https://cdn.example.com/{name}.jpg"),
            thumbnail_url: None,
            original_filename: Some(format!("{name}.jpg")),
            file_size: Some(1024),
            mime_type: Some("image/jpeg".into()),
        }
    }

    fn detection() -> ImageResultsRequest {
        ImageResultsRequest {
            detections: vec![DetectionInput {
                label: "succulent".into(),
                confidence: 0.92,
                bounding_box: BoundingBox {
                    x: 0.1,
                    y: 0.1,
                    width: 0.3,
                    height: 0.3,
                },
            }],
            ..Default::default()
        }
    }

    fn service(dispatcher: Arc<InMemoryTaskDispatcher>, tenants: TenantRegistry) -> PhotoService {
        PhotoService::new(store(), dispatcher, tenants)
    }

    #[tokio::test]
    async fn upload_dispatches_with_tenant_pipeline() {
        let dispatcher = Arc::new(InMemoryTaskDispatcher::new());
        let t = tenant("tenant-alpha");
        let tenants = TenantRegistry::new([TenantConfig {
            id: t.clone(),
            name: "Alpha".into(),
            industry: None,
            enabled_modules: Module::ALL.iter().copied().collect::<BTreeSet<_>>(),
            pipeline: Some("SEGMENTATION".into()),
        }]);
        let photos = service(dispatcher.clone(), tenants).with_default_pipeline("DETECTION");

        let session = photos.create_session(&t, CreateSessionRequest::default(), None).await.unwrap();
        let image = photos.add_image(&t, session.id, upload("a")).await.unwrap();
        assert_eq!(image.status, ImageStatus::Processing);
        assert_eq!(image.task_id.as_deref(), Some("task-1"));

        let sent = dispatcher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].pipeline, "SEGMENTATION");
        assert_eq!(sent[0].tenant_id, "tenant-alpha");

        let other = tenant("tenant-beta");
        let s2 = photos.create_session(&other, CreateSessionRequest::default(), None).await.unwrap();
        photos.add_image(&other, s2.id, upload("b")).await.unwrap();
        assert_eq!(dispatcher.sent()[1].pipeline, "DETECTION");
    }

    #[tokio::test]
    async fn dispatch_failure_keeps_the_upload() {
        let photos = service(Arc::new(InMemoryTaskDispatcher::failing()), TenantRegistry::default());
        let t = tenant("tenant-alpha");
        let session = photos.create_session(&t, CreateSessionRequest::default(), None).await.unwrap();
        let image = photos.add_image(&t, session.id, upload("a")).await.unwrap();
        assert_eq!(image.status, ImageStatus::Uploaded);

        let progress = photos.progress(&t, session.id).await.unwrap();
        assert_eq!(progress.total_images, 1);
        assert_eq!(progress.status, SessionStatus::Processing);
    }

    #[tokio::test]
    async fn results_settle_session() {
        let photos = service(Arc::new(InMemoryTaskDispatcher::new()), TenantRegistry::default());
        let t = tenant("tenant-alpha");
        let session = photos.create_session(&t, CreateSessionRequest::default(), None).await.unwrap();
        let first = photos.add_image(&t, session.id, upload("a")).await.unwrap();
        let second = photos.add_image(&t, session.id, upload("b")).await.unwrap();

        let recorded = photos.record_results(&t, first.id, detection()).await.unwrap();
        assert_eq!(recorded.detections.len(), 1);
        assert_eq!(photos.detections(&t, first.id).await.unwrap().len(), 1);
        assert_eq!(photos.get_session(&t, session.id).await.unwrap().status, SessionStatus::Processing);

        let failed = ImageResultsRequest {
            error: Some("blurry".into()),
            ..Default::default()
        };
        photos.record_results(&t, second.id, failed).await.unwrap();
        let progress = photos.progress(&t, session.id).await.unwrap();
        assert_eq!(progress.status, SessionStatus::Completed);
        assert_eq!(progress.processed_images, 1);
        assert_eq!(progress.failed_images, 1);

        let again = photos.record_results(&t, first.id, detection()).await.unwrap_err();
        assert!(matches!(again, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_session_cascades() {
        let photos = service(Arc::new(InMemoryTaskDispatcher::new()), TenantRegistry::default());
        let t = tenant("tenant-alpha");
        let session = photos.create_session(&t, CreateSessionRequest::default(), None).await.unwrap();
        let image = photos.add_image(&t, session.id, upload("a")).await.unwrap();
        photos.record_results(&t, image.id, detection()).await.unwrap();

        photos.delete_session(&t, session.id).await.unwrap();
        assert!(matches!(photos.get_image(&t, image.id).await, Err(ServiceError::NotFound { .. })));
        assert!(matches!(
            photos.get_session(&t, session.id).await,
            Err(ServiceError::NotFound { entity: "PhotoProcessingSession", .. })
        ));
    }
}
