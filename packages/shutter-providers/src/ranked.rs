use std::time::Duration;

use reqwest::{
	Client,
	multipart::{Form, Part},
};
use serde_json::Value;

use shutter_config::{RankedSearchConfig, SearchWeights};
use shutter_domain::{ImagePayload, RankedItem};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub enum RankedQuery<'a> {
	Text(&'a str),
	Image(&'a ImagePayload),
}

/// Scoring knobs forwarded verbatim to the ranked search service.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
	pub certainty_threshold: f32,
	pub exact_match_threshold: f32,
	pub similarity_weight: f32,
	pub recency_weight: f32,
	pub source_weight: f32,
	pub include_vectors: bool,
	pub limit: u32,
}
impl SearchParams {
	pub fn new(certainty_threshold: f32, weights: &SearchWeights, limit: u32) -> Self {
		Self {
			certainty_threshold,
			exact_match_threshold: weights.exact_match_threshold,
			similarity_weight: weights.similarity_weight,
			recency_weight: weights.recency_weight,
			source_weight: weights.source_weight,
			include_vectors: weights.include_vectors,
			limit,
		}
	}

	fn query_pairs(&self) -> Vec<(&'static str, String)> {
		vec![
			("limit", self.limit.to_string()),
			("certainty_threshold", self.certainty_threshold.to_string()),
			("exact_match_threshold", self.exact_match_threshold.to_string()),
			("similarity_weight", self.similarity_weight.to_string()),
			("recency_weight", self.recency_weight.to_string()),
			("source_weight", self.source_weight.to_string()),
			("include_vectors", self.include_vectors.to_string()),
		]
	}
}

pub async fn search(
	cfg: &RankedSearchConfig,
	query: RankedQuery<'_>,
	params: &SearchParams,
) -> Result<Vec<RankedItem>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let headers = crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?;
	let mut pairs = params.query_pairs();
	let req = match query {
		RankedQuery::Text(text) => {
			pairs.push(("query", text.to_string()));

			client.get(format!("{}{}", cfg.api_base, cfg.text_path)).query(&pairs)
		},
		RankedQuery::Image(image) => client
			.post(format!("{}{}", cfg.api_base, cfg.image_path))
			.query(&pairs)
			.multipart(Form::new().part("file", image_part(image)?)),
	};
	let res = crate::check_status(req.headers(headers).send().await?).await?;
	let json: Value = res.json().await?;

	parse_ranked_response(json)
}

fn image_part(image: &ImagePayload) -> Result<Part> {
	let part = Part::bytes(image.bytes.to_vec()).file_name(image.file_name.clone());

	match image.content_type.as_deref() {
		Some(content_type) => Ok(part.mime_str(content_type)?),
		None => Ok(part),
	}
}

/// Accepts either a bare array or an object wrapping it under `results`.
fn parse_ranked_response(json: Value) -> Result<Vec<RankedItem>> {
	let items = match json {
		Value::Array(items) => Value::Array(items),
		Value::Object(mut map) => map.remove("results").ok_or_else(|| Error::InvalidResponse {
			message: "Ranked search response is missing results array.".to_string(),
		})?,
		_ =>
			return Err(Error::InvalidResponse {
				message: "Ranked search response must be an array.".to_string(),
			}),
	};

	Ok(serde_json::from_value(items)?)
}
