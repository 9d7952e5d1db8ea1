use std::sync::Arc;

use vibe_service::VibeService;
use vibe_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<VibeService>,
}
impl AppState {
	pub async fn new(config: vibe_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collection().await?;

		let service = VibeService::new(config, db, qdrant);

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: VibeService) -> Self {
		Self { service: Arc::new(service) }
	}
}
