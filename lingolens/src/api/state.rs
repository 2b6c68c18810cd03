use std::sync::Arc;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::pipeline::ImagePipeline;
use crate::services::RetrievalService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub pipeline: Arc<ImagePipeline>,
    pub retrieval: RetrievalService,
    /// Provider availability, captured at startup for the health report.
    pub ocr_available: bool,
    pub translation_available: bool,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        pipeline: ImagePipeline,
        retrieval: RetrievalService,
        ocr_available: bool,
        translation_available: bool,
    ) -> Self {
        Self {
            config: Arc::new(config),
            db,
            pipeline: Arc::new(pipeline),
            retrieval,
            ocr_available,
            translation_available,
        }
    }
}
