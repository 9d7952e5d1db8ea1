use std::collections::HashMap;

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		CreateCollectionBuilder, Distance, PointStruct, Query, QueryPointsBuilder,
		UpsertPointsBuilder, Vector, VectorParamsBuilder, VectorsConfigBuilder, value::Kind,
	},
};
use uuid::Uuid;

use crate::{Error, Result};

pub const DENSE_VECTOR_NAME: &str = "dense";
pub const SHOW_ID_FIELD: &str = "show_id";

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &vibe_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(vectors_config),
			)
			.await?;

		Ok(())
	}

	pub async fn upsert_title_vector(&self, show_id: &str, vector: Vec<f32>) -> Result<()> {
		self.check_dim(&vector)?;

		let mut payload = Payload::new();

		payload.insert(SHOW_ID_FIELD, show_id.to_string());

		let mut vectors = HashMap::new();

		vectors.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vector));

		let point = PointStruct::new(point_id(show_id).to_string(), vectors, payload);

		self.client
			.upsert_points(
				UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true),
			)
			.await?;

		Ok(())
	}

	/// Nearest titles by cosine similarity, best first.
	pub async fn nearest(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<(String, f32)>> {
		self.check_dim(&vector)?;

		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.with_payload(true)
			.limit(limit);
		let response = self.client.query(search).await?;
		let hits = response
			.result
			.into_iter()
			.filter_map(|point| {
				let show_id = match point.payload.get(SHOW_ID_FIELD).and_then(|v| v.kind.as_ref())
				{
					Some(Kind::StringValue(show_id)) => show_id.clone(),
					_ => return None,
				};

				Some((show_id, point.score))
			})
			.collect();

		Ok(hits)
	}

	fn check_dim(&self, vector: &[f32]) -> Result<()> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Vector has {} dimensions; the collection expects {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		Ok(())
	}
}

/// Stable point id for a show, so re-ingesting a title overwrites its vector.
pub fn point_id(show_id: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, show_id.as_bytes())
}
