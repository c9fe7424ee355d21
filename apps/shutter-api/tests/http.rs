use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use shutter_api::{routes, state::AppState};
use shutter_testkit::{Harness, RecordedQuery, ranked_items, test_config};

const BOUNDARY: &str = "shutter-test-boundary";

fn app(harness: &Harness) -> Router {
	routes::router(AppState::from_service(harness.service.clone()))
}

/// `(name, file_name, bytes)`; a `None` file name makes a plain text field.
fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
	let mut body = Vec::new();

	for (name, file_name, bytes) in parts {
		body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());

		match file_name {
			Some(file_name) => body.extend_from_slice(
				format!(
					"Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
Content-Type: image/jpeg\r\n\r\n"
				)
				.as_bytes(),
			),
			None => body.extend_from_slice(
				format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
			),
		}

		body.extend_from_slice(bytes);
		body.extend_from_slice(b"\r\n");
	}

	body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

	body
}

fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
		.body(Body::from(multipart_body(parts)))
		.expect("Failed to build request.")
}

fn get_request(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).expect("Failed to build request.")
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
	let response = app.oneshot(request).await.expect("Failed to call the router.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = if body.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&body).expect("Failed to parse response.")
	};

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let harness = Harness::new(Vec::new());
	let (status, _) = call(app(&harness), get_request("/health")).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn text_search_returns_a_page_envelope() {
	let harness = Harness::new(ranked_items(25));
	let (status, json) =
		call(app(&harness), get_request("/api/search?query=misty%20forest&page=2&limit=10")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["total"], 25);
	assert_eq!(json["page"], 2);
	assert_eq!(json["total_pages"], 3);
	assert_eq!(json["has_more"], true);
	assert_eq!(json["items"].as_array().map(Vec::len), Some(10));
	assert_eq!(json["items"][0]["id"], "/photos/img-010.jpg");
	assert_eq!(json["items"][0]["resolved_link"], "https://links.test/photos/img-010.jpg");
	assert_eq!(json["items"][0]["modified_date"], "2024-01-11T12:00:00Z");
	assert_eq!(harness.ranked.last_query(), Some(RecordedQuery::Text("misty forest".to_string())));
}

#[tokio::test]
async fn failed_links_are_null_in_the_response() {
	let harness = Harness::new(ranked_items(2));

	harness.links.fail_for("/photos/img-001.jpg");

	let (status, json) = call(app(&harness), get_request("/api/search?query=forest")).await;

	assert_eq!(status, StatusCode::OK);
	assert!(json["items"][0]["resolved_link"].is_string());
	assert!(json["items"][1]["resolved_link"].is_null());
}

#[tokio::test]
async fn missing_query_is_a_bad_request() {
	let harness = Harness::new(Vec::new());
	let (status, json) = call(app(&harness), get_request("/api/search")).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid_request");
	assert_eq!(harness.ranked.calls(), 0);
}

#[tokio::test]
async fn oversized_limit_is_a_bad_request() {
	let harness = Harness::new(Vec::new());
	let (status, json) = call(app(&harness), get_request("/api/search?query=a&limit=500")).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "invalid_request");
}

#[tokio::test]
async fn provider_outage_is_a_bad_gateway() {
	let harness = Harness::new(ranked_items(3));

	harness.ranked.set_failing(true);

	let (status, json) = call(app(&harness), get_request("/api/search?query=forest")).await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(json["error_code"], "upstream_error");
}

#[tokio::test]
async fn image_search_accepts_a_multipart_file() {
	let harness = Harness::new(ranked_items(5));
	let request = multipart_request("/api/search/image?limit=2", &[(
		"file",
		Some("reference.jpg"),
		&[0xff, 0xd8, 0xff, 0xe0],
	)]);
	let (status, json) = call(app(&harness), request).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["total"], 5);
	assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
	assert_eq!(
		harness.ranked.last_query(),
		Some(RecordedQuery::Image { file_name: "reference.jpg".to_string(), len: 4 })
	);
}

#[tokio::test]
async fn image_search_without_a_file_is_a_bad_request() {
	let harness = Harness::new(ranked_items(5));
	let request = multipart_request("/api/search/image", &[("query", None, b"forest")]);
	let (status, json) = call(app(&harness), request).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["fields"][0], "file");
	assert_eq!(harness.ranked.calls(), 0);
}

#[tokio::test]
async fn suggestions_for_a_text_query() {
	let harness = Harness::new(Vec::new());
	let request = multipart_request("/api/suggestions", &[("query", None, b"forest")]);
	let (status, json) = call(app(&harness), request).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(
		json["suggestions"],
		serde_json::json!(["misty forest", "river at dawn", "old oak"])
	);
}

#[tokio::test]
async fn suggestions_without_llm_config_are_a_config_error() {
	let mut cfg = test_config();

	cfg.providers.llm = None;

	let harness = Harness::with_config(cfg, Vec::new());
	let request = multipart_request("/api/suggestions", &[("query", None, b"forest")]);
	let (status, json) = call(app(&harness), request).await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json["error_code"], "config_error");
}

#[tokio::test]
async fn describe_image_returns_the_description() {
	let harness = Harness::new(Vec::new());

	harness.chat.set_reply("A wooden barn under snow.");

	let request =
		multipart_request("/api/describe-image", &[("file", Some("barn.jpg"), &[1, 2, 3])]);
	let (status, json) = call(app(&harness), request).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["description"], "A wooden barn under snow.");
}
