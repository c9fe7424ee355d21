use std::collections::BTreeMap;

use serde_json::Value;

use crate::request::DateRange;

pub const SEARCH_RESULTS_PREFIX: &str = "search:results:";
pub const IMAGE_PREVIEW_PREFIX: &str = "image:preview:";

const SEARCH_RESULTS_SCHEMA_VERSION: i32 = 2;

/// Key for a cached text-search working set.
///
/// Fields are serialized through a sorted map before hashing, so the key depends only on the
/// normalized values and never on construction order.
pub fn search_results_key(query: &str, date_range: &DateRange, certainty_threshold: f32) -> String {
	let mut payload = BTreeMap::new();

	payload.insert("kind", Value::from("search_results"));
	payload.insert("schema_version", Value::from(SEARCH_RESULTS_SCHEMA_VERSION));
	payload.insert("query", Value::from(query.trim()));
	payload.insert("date_start", day_value(date_range.start));
	payload.insert("date_end", day_value(date_range.end));
	payload.insert("certainty_threshold", Value::from(certainty_threshold.to_string()));

	format!("{SEARCH_RESULTS_PREFIX}{}", hash_payload(&payload))
}

pub fn image_preview_key(item_id: &str) -> String {
	format!("{IMAGE_PREVIEW_PREFIX}{item_id}")
}

pub fn cache_key_prefix(key: &str) -> &str {
	let hash = key.rsplit(':').next().unwrap_or(key);
	let len = hash.len().min(12);

	&hash[..len]
}

fn day_value(day: Option<time::Date>) -> Value {
	match day {
		Some(day) => Value::from(day.to_string()),
		None => Value::Null,
	}
}

fn hash_payload(payload: &BTreeMap<&str, Value>) -> String {
	// A BTreeMap of JSON values always serializes.
	let raw = serde_json::to_vec(payload).unwrap_or_default();

	blake3::hash(&raw).to_hex().to_string()
}
