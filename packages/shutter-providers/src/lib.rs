pub mod chat;
pub mod links;
pub mod ranked;

mod error;

pub use error::{Error, Result};

use reqwest::{
	Response,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

const MAX_ERROR_BODY_CHARS: usize = 512;

pub fn auth_headers(
	api_key: Option<&str>,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if let Some(api_key) = api_key {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Converts a non-success response into [`Error::Status`], keeping a bounded slice of the body.
pub(crate) async fn check_status(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	let body = res.text().await.unwrap_or_default();
	let message = if body.trim().is_empty() {
		status.canonical_reason().unwrap_or("unknown status").to_string()
	} else {
		body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect()
	};

	Err(Error::Status { status: status.as_u16(), message })
}
