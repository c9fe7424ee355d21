use std::{sync::Arc, time::Duration};

use shutter_domain::{ImagePayload, SearchRequest};
use shutter_service::{Error, SearchQuery};
use shutter_storage::CacheStore;
use shutter_testkit::{FailingCache, Harness, RecordedQuery, link_for, ranked_items, test_config};

fn text_query(query: &str) -> SearchQuery {
	SearchQuery { query: Some(query.to_string()), ..SearchQuery::default() }
}

fn image() -> ImagePayload {
	ImagePayload::new(vec![0xff_u8, 0xd8, 0xff], "reference.jpg").with_content_type("image/jpeg")
}

#[tokio::test]
async fn first_page_carries_links_and_pagination() {
	let harness = Harness::new(ranked_items(25));
	let req = harness.service.text_request(&text_query("forest")).expect("request must build");
	let page = harness.service.resolve_page(&req).await.expect("search must succeed");

	assert_eq!(page.items.len(), 12);
	assert_eq!(page.total, 25);
	assert_eq!(page.page, 1);
	assert_eq!(page.total_pages, 3);
	assert!(page.has_more);
	assert_eq!(page.items[0].item.id, "/photos/img-000.jpg");
	assert_eq!(page.items[11].item.id, "/photos/img-011.jpg");
	assert!(
		page.items
			.iter()
			.all(|item| item.resolved_link.as_deref() == Some(link_for(&item.item.id).as_str()))
	);
}

#[tokio::test]
async fn request_defaults_and_knobs_reach_the_provider() {
	let harness = Harness::new(ranked_items(3));
	let req =
		harness.service.text_request(&text_query("  red   car ")).expect("request must build");

	assert_eq!(req.page, 1);
	assert_eq!(req.page_size, 12);
	assert_eq!(req.max_fetch, 144);
	assert_eq!(req.certainty_threshold, 0.5);

	harness.service.resolve_page(&req).await.expect("search must succeed");

	let params = harness.ranked.last_params().expect("provider must be called");

	assert_eq!(harness.ranked.last_query(), Some(RecordedQuery::Text("red car".to_string())));
	assert_eq!(params.limit, 144);
	assert_eq!(params.certainty_threshold, 0.5);
	assert_eq!(params.exact_match_threshold, 0.95);
	assert_eq!(params.similarity_weight, 0.6);
	assert!(!params.include_vectors);
}

#[tokio::test]
async fn later_pages_and_equivalent_queries_are_served_from_cache() {
	let harness = Harness::new(ranked_items(25));
	let first = harness.service.text_request(&text_query("red car")).expect("request must build");
	let mut second_params = text_query(" red  car");

	second_params.page = Some("2".to_string());

	let second = harness.service.text_request(&second_params).expect("request must build");

	harness.service.resolve_page(&first).await.expect("search must succeed");

	let page = harness.service.resolve_page(&second).await.expect("search must succeed");

	assert_eq!(harness.ranked.calls(), 1);
	assert_eq!(page.items[0].item.id, "/photos/img-012.jpg");
}

#[tokio::test]
async fn threshold_changes_the_cache_key() {
	let harness = Harness::new(ranked_items(5));
	let mut stricter = text_query("river");

	stricter.certainty_threshold = Some("0.8".to_string());

	for params in [text_query("river"), stricter] {
		let req = harness.service.text_request(&params).expect("request must build");

		harness.service.resolve_page(&req).await.expect("search must succeed");
	}

	assert_eq!(harness.ranked.calls(), 2);
	assert_eq!(harness.ranked.last_params().map(|params| params.certainty_threshold), Some(0.8));
}

#[tokio::test]
async fn thresholds_closer_than_display_precision_do_not_share_results() {
	let harness = Harness::new(ranked_items(5));
	let mut nudged = text_query("river");

	nudged.certainty_threshold = Some("0.50001".to_string());

	for params in [text_query("river"), nudged] {
		let req = harness.service.text_request(&params).expect("request must build");

		harness.service.resolve_page(&req).await.expect("search must succeed");
	}

	assert_eq!(harness.ranked.calls(), 2);
	assert_eq!(
		harness.ranked.last_params().map(|params| params.certainty_threshold),
		Some(0.50001)
	);
}

#[tokio::test]
async fn working_set_is_stored_under_the_request_cache_key() {
	let harness = Harness::new(ranked_items(4));
	let req =
		harness.service.text_request(&text_query("  old   oak ")).expect("request must build");
	let key = req.cache_key().expect("text requests are keyed");

	harness.service.resolve_page(&req).await.expect("search must succeed");

	let cached = harness.cache.get(&key).await.expect("cache read must succeed");

	assert!(cached.is_some_and(|raw| raw.contains("/photos/img-003.jpg")));
}

#[tokio::test]
async fn walking_every_page_yields_each_item_once() {
	let harness = Harness::new(ranked_items(25));
	let mut seen = Vec::new();

	for page in 1..=3 {
		let mut params = text_query("forest");

		params.page = Some(page.to_string());

		let req = harness.service.text_request(&params).expect("request must build");
		let envelope = harness.service.resolve_page(&req).await.expect("search must succeed");

		seen.extend(envelope.items.into_iter().map(|item| item.item.id));
	}

	let expected: Vec<String> = ranked_items(25).into_iter().map(|item| item.id).collect();

	assert_eq!(seen, expected);
}

#[tokio::test]
async fn disabled_cache_always_calls_the_provider() {
	let mut cfg = test_config();

	cfg.cache.enabled = false;

	let harness = Harness::with_config(cfg, ranked_items(5));
	let req = harness.service.text_request(&text_query("river")).expect("request must build");

	harness.service.resolve_page(&req).await.expect("search must succeed");
	harness.service.resolve_page(&req).await.expect("search must succeed");

	assert_eq!(harness.ranked.calls(), 2);
	assert_eq!(harness.links.calls(), 10);
}

#[tokio::test]
async fn image_searches_are_never_cached() {
	let harness = Harness::new(ranked_items(5));
	let req = harness
		.service
		.image_request(&SearchQuery::default(), image())
		.expect("request must build");

	harness.service.resolve_page(&req).await.expect("search must succeed");
	harness.service.resolve_page(&req).await.expect("search must succeed");

	assert_eq!(harness.ranked.calls(), 2);
	assert_eq!(
		harness.ranked.last_query(),
		Some(RecordedQuery::Image { file_name: "reference.jpg".to_string(), len: 3 })
	);
}

#[tokio::test]
async fn date_range_filters_in_provider_order() {
	let harness = Harness::new(ranked_items(25));
	let mut params = text_query("forest");

	params.start_date = Some("2024-01-05".to_string());
	params.end_date = Some("2024-01-10".to_string());

	let req = harness.service.text_request(&params).expect("request must build");
	let page = harness.service.resolve_page(&req).await.expect("search must succeed");
	let ids: Vec<_> = page.items.iter().map(|item| item.item.id.as_str()).collect();

	assert_eq!(page.total, 6);
	assert_eq!(page.total_pages, 1);
	assert!(!page.has_more);
	assert_eq!(ids, vec![
		"/photos/img-004.jpg",
		"/photos/img-005.jpg",
		"/photos/img-006.jpg",
		"/photos/img-007.jpg",
		"/photos/img-008.jpg",
		"/photos/img-009.jpg",
	]);
}

#[tokio::test]
async fn date_range_also_filters_image_searches() {
	let harness = Harness::new(ranked_items(10));
	let params = SearchQuery { end_date: Some("2024-01-02".to_string()), ..SearchQuery::default() };
	let req = harness.service.image_request(&params, image()).expect("request must build");
	let page = harness.service.resolve_page(&req).await.expect("search must succeed");

	assert_eq!(page.total, 2);
}

#[tokio::test]
async fn inverted_date_range_is_empty_without_calling_the_provider() {
	let harness = Harness::new(ranked_items(25));
	let mut params = text_query("forest");

	params.start_date = Some("2024-02-01".to_string());
	params.end_date = Some("2024-01-01".to_string());

	let req = harness.service.text_request(&params).expect("request must build");
	let page = harness.service.resolve_page(&req).await.expect("search must succeed");

	assert!(page.items.is_empty());
	assert_eq!(page.total, 0);
	assert!(!page.has_more);
	assert_eq!(harness.ranked.calls(), 0);
}

#[tokio::test]
async fn page_past_the_end_is_empty_not_an_error() {
	let harness = Harness::new(ranked_items(25));
	let mut params = text_query("forest");

	params.page = Some("4".to_string());

	let req = harness.service.text_request(&params).expect("request must build");
	let page = harness.service.resolve_page(&req).await.expect("search must succeed");

	assert!(page.items.is_empty());
	assert_eq!(page.total, 25);
	assert_eq!(page.page, 4);
	assert_eq!(page.total_pages, 3);
	assert!(!page.has_more);
	assert_eq!(harness.links.calls(), 0);
}

#[tokio::test]
async fn last_page_holds_the_remainder() {
	let harness = Harness::new(ranked_items(25));
	let mut params = text_query("forest");

	params.page = Some("3".to_string());

	let req = harness.service.text_request(&params).expect("request must build");
	let page = harness.service.resolve_page(&req).await.expect("search must succeed");

	assert_eq!(page.items.len(), 1);
	assert_eq!(page.items[0].item.id, "/photos/img-024.jpg");
	assert!(!page.has_more);
}

#[tokio::test]
async fn failed_links_degrade_per_item() {
	let harness = Harness::new(ranked_items(5));

	harness.links.fail_for("/photos/img-001.jpg");
	harness.links.fail_for("/photos/img-003.jpg");

	let req = harness.service.text_request(&text_query("forest")).expect("request must build");
	let page = harness.service.resolve_page(&req).await.expect("search must succeed");
	let resolved: Vec<bool> = page.items.iter().map(|item| item.resolved_link.is_some()).collect();

	assert_eq!(page.items.len(), 5);
	assert_eq!(resolved, vec![true, false, true, false, true]);
}

#[tokio::test]
async fn panicking_resolution_only_nulls_its_item() {
	let harness = Harness::new(ranked_items(3));

	harness.links.panic_for("/photos/img-002.jpg");

	let req = harness.service.text_request(&text_query("forest")).expect("request must build");
	let page = harness.service.resolve_page(&req).await.expect("search must succeed");

	assert!(page.items[0].resolved_link.is_some());
	assert!(page.items[1].resolved_link.is_some());
	assert!(page.items[2].resolved_link.is_none());
}

#[tokio::test(start_paused = true)]
async fn links_resolve_concurrently() {
	let harness = Harness::new(ranked_items(12));

	harness.links.set_delay(Duration::from_millis(200));

	let req = harness.service.text_request(&text_query("forest")).expect("request must build");
	let started = tokio::time::Instant::now();
	let page = harness.service.resolve_page(&req).await.expect("search must succeed");

	assert_eq!(page.items.len(), 12);
	assert!(started.elapsed() < Duration::from_millis(400), "elapsed {:?}", started.elapsed());
}

#[tokio::test]
async fn resolved_links_are_cached() {
	let harness = Harness::new(ranked_items(5));
	let req = harness.service.text_request(&text_query("forest")).expect("request must build");

	harness.service.resolve_page(&req).await.expect("search must succeed");
	harness.service.resolve_page(&req).await.expect("search must succeed");

	assert_eq!(harness.links.calls(), 5);
}

#[tokio::test]
async fn provider_failure_is_an_upstream_error() {
	let harness = Harness::new(ranked_items(5));

	harness.ranked.set_failing(true);

	let req = harness.service.text_request(&text_query("forest")).expect("request must build");
	let err = harness.service.resolve_page(&req).await.expect_err("Expected upstream error.");

	assert!(matches!(err, Error::Upstream { .. }), "Unexpected error: {err}");
}

#[tokio::test]
async fn failed_searches_are_not_cached() {
	let harness = Harness::new(ranked_items(5));
	let req = harness.service.text_request(&text_query("forest")).expect("request must build");

	harness.ranked.set_failing(true);
	harness.service.resolve_page(&req).await.expect_err("Expected upstream error.");
	harness.ranked.set_failing(false);

	let page = harness.service.resolve_page(&req).await.expect("search must succeed");

	assert_eq!(page.total, 5);
	assert_eq!(harness.ranked.calls(), 2);
}

#[tokio::test]
async fn cache_faults_fall_back_to_the_provider() {
	let harness = Harness::with_cache(test_config(), Arc::new(FailingCache), ranked_items(5));
	let req = harness.service.text_request(&text_query("forest")).expect("request must build");

	for _ in 0..2 {
		let page = harness.service.resolve_page(&req).await.expect("search must succeed");

		assert_eq!(page.items.len(), 5);
		assert!(page.items.iter().all(|item| item.resolved_link.is_some()));
	}

	assert_eq!(harness.ranked.calls(), 2);
}

#[tokio::test]
async fn blank_endpoint_is_a_config_error() {
	let mut cfg = test_config();

	cfg.providers.search.api_base = String::new();

	let harness = Harness::with_config(cfg, ranked_items(5));
	let req = SearchRequest::text("forest").build().expect("request must build");
	let err = harness.service.resolve_page(&req).await.expect_err("Expected config error.");

	assert!(matches!(err, Error::Config { .. }), "Unexpected error: {err}");
}

#[test]
fn malformed_parameters_are_invalid_requests() {
	let harness = Harness::new(Vec::new());
	let cases = [
		SearchQuery::default(),
		SearchQuery { page: Some("0".to_string()), ..text_query("a") },
		SearchQuery { page: Some("two".to_string()), ..text_query("a") },
		SearchQuery { limit: Some("49".to_string()), ..text_query("a") },
		SearchQuery { limit: Some("0".to_string()), ..text_query("a") },
		SearchQuery { certainty_threshold: Some("1.5".to_string()), ..text_query("a") },
		SearchQuery { certainty_threshold: Some("high".to_string()), ..text_query("a") },
		SearchQuery { start_date: Some("01/02/2024".to_string()), ..text_query("a") },
	];

	for params in cases {
		let err = harness.service.text_request(&params).expect_err("Expected invalid request.");

		assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error for {params:?}");
	}
}

#[test]
fn empty_image_is_an_invalid_request() {
	let harness = Harness::new(Vec::new());
	let empty = ImagePayload::new(Vec::<u8>::new(), "empty.png");
	let err = harness
		.service
		.image_request(&SearchQuery::default(), empty)
		.expect_err("Expected invalid request.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}
