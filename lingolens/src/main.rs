mod api;
mod config;
mod db;
mod embeddings;
mod error;
mod models;
mod ocr;
mod overlay;
mod pipeline;
mod services;
mod storage;
mod translation;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::db::{Database, DatabaseBackend, LibSqlBackend};
use crate::embeddings::EmbeddingProvider;
use crate::ocr::OcrProvider;
use crate::overlay::TextOverlayRenderer;
use crate::pipeline::ImagePipeline;
use crate::services::RetrievalService;
use crate::storage::LocalFsStore;
use crate::translation::TranslationProvider;

#[derive(Parser)]
#[command(name = "lingolens")]
#[command(about = "Self-hostable image translation service with searchable history")]
struct Args {
    /// Override the image storage directory
    #[arg(long)]
    storage_root: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lingolens=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(root) = args.storage_root {
        config.storage.root = root;
    }

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database, config.embeddings.dimensions).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embeddings = Arc::new(EmbeddingProvider::new(&config.embeddings)?);

    tracing::info!("Initializing OCR provider: {}...", config.ocr.model);
    let ocr = OcrProvider::new(&config.ocr)?;
    let ocr_available = ocr.is_available();
    if !ocr_available {
        tracing::warn!("OCR unavailable - uploaded images will yield no extracted text");
    }

    let translation = TranslationProvider::new(&config.translation);
    let translation_available = translation.is_available();
    if !translation_available {
        tracing::warn!("Translation unavailable - overlays will use the raw extracted text");
    }

    let renderer = TextOverlayRenderer::new(&config.overlay);
    if !renderer.has_scalable_font() {
        tracing::warn!("No scalable font found - overlay text uses the built-in bitmap font");
    }

    let store = LocalFsStore::new(&config.storage)?;

    let pipeline = ImagePipeline::new(
        Arc::new(ocr),
        Arc::new(translation),
        embeddings.clone(),
        Arc::new(renderer),
        Arc::new(store),
        db.clone(),
        config.translation.from_lang.clone(),
        config.translation.to_lang.clone(),
    );

    let retrieval = RetrievalService::new(db.clone(), embeddings, &config.retrieval);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(
        config,
        db,
        pipeline,
        retrieval,
        ocr_available,
        translation_available,
    );

    let app = create_router(state);

    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
