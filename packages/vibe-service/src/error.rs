#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("A user id or session token is required.")]
	MissingOwner,
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
}
impl From<vibe_storage::Error> for Error {
	fn from(err: vibe_storage::Error) -> Self {
		match err {
			vibe_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			vibe_storage::Error::NotFound(message) => Self::NotFound { message },
			vibe_storage::Error::Qdrant(err) => Self::Qdrant { message: err.to_string() },
			vibe_storage::Error::Sqlx(err) => Self::Storage { message: err.to_string() },
		}
	}
}
impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
