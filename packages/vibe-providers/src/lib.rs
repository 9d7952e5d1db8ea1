pub mod embedding;
pub mod posters;
pub mod rerank;
pub mod rewrite;

mod error;

pub use error::Error;

use color_eyre::{Report, Result, eyre};
use reqwest::{
	Response,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header values must be strings."));
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// HTTP status carried by a provider failure, when the failure came from a response.
pub fn status_of(err: &Report) -> Option<u16> {
	if let Some(Error::Status { status }) = err.downcast_ref::<Error>() {
		return Some(*status);
	}

	err.downcast_ref::<reqwest::Error>().and_then(reqwest::Error::status).map(|s| s.as_u16())
}

/// A `429` or `5xx` failure. These pause the provider instead of being retried per request.
pub fn is_throttled(err: &Report) -> bool {
	status_of(err).is_some_and(|status| status == 429 || status >= 500)
}

async fn read_json(res: Response) -> Result<Value> {
	let status = res.status();

	if !status.is_success() {
		return Err(Error::Status { status: status.as_u16() }.into());
	}

	Ok(res.json().await?)
}
