#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider responded with status {status}.")]
	Status { status: u16 },
	#[error("{message}")]
	InvalidResponse { message: String },
}
