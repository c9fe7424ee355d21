//! Fixtures and in-memory provider doubles shared by the service, API, and client tests.

use std::{
	collections::HashSet,
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::Value;
use time::{Duration as TimeDuration, OffsetDateTime, macros::datetime};

use shutter_config::{Config, LlmProviderConfig, RankedSearchConfig};
use shutter_domain::RankedItem;
use shutter_providers::{
	Error as ProviderError,
	chat::ChatOptions,
	ranked::{RankedQuery, SearchParams},
};
use shutter_service::{
	BoxFuture, ChatProvider, LinkResolver, Providers, RankedSearchProvider, ShutterService,
};
use shutter_storage::{CacheStore, MemoryCache};

const TEST_CONFIG_TOML: &str = r#"
[service]
http_bind = "127.0.0.1:0"

[providers.search]
api_base = "http://ranked.test"

[providers.links]
access_token = "test-token"

[providers.llm]
api_base = "http://llm.test"
api_key = "llm-key"
model = "text-model"
vision_model = "vision-model"
max_suggestions = 3
context = "A test photo collection."
"#;

/// A fully defaulted configuration pointing at unreachable hosts.
pub fn test_config() -> Config {
	let cfg: Config = toml::from_str(TEST_CONFIG_TOML).unwrap_or_else(|err| {
		panic!("Test config must parse: {err}.");
	});

	shutter_config::validate(&cfg)
		.unwrap_or_else(|err| panic!("Test config must validate: {err}."));

	cfg
}

pub fn ranked_item(index: usize, modified_date: OffsetDateTime) -> RankedItem {
	RankedItem {
		id: format!("/photos/img-{index:03}.jpg"),
		source_tag: "catalog.csv".to_string(),
		modified_date,
		similarity_score: 0.9 - index as f32 * 0.001,
		is_exact_match: index == 0,
		vector_distance: None,
		source_weight: 0.5,
		recency_score: 0.5,
		combined_score: 0.8 - index as f32 * 0.001,
	}
}

/// `count` items in provider order, modified one day apart starting 2024-01-01 UTC.
pub fn ranked_items(count: usize) -> Vec<RankedItem> {
	let start = datetime!(2024-01-01 12:00 UTC);

	(0..count).map(|index| ranked_item(index, start + TimeDuration::days(index as i64))).collect()
}

pub fn link_for(item_id: &str) -> String {
	format!("https://links.test{item_id}")
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedQuery {
	Text(String),
	Image { file_name: String, len: usize },
}

#[derive(Default)]
pub struct StubRankedSearch {
	items: Mutex<Vec<RankedItem>>,
	calls: AtomicUsize,
	fail: AtomicBool,
	last_query: Mutex<Option<RecordedQuery>>,
	last_params: Mutex<Option<SearchParams>>,
}
impl StubRankedSearch {
	pub fn new(items: Vec<RankedItem>) -> Self {
		Self { items: Mutex::new(items), ..Self::default() }
	}

	pub fn set_items(&self, items: Vec<RankedItem>) {
		*lock(&self.items) = items;
	}

	/// Makes every following call fail with a 503.
	pub fn set_failing(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn last_query(&self) -> Option<RecordedQuery> {
		lock(&self.last_query).clone()
	}

	pub fn last_params(&self) -> Option<SearchParams> {
		lock(&self.last_params).clone()
	}
}
impl RankedSearchProvider for StubRankedSearch {
	fn search<'a>(
		&'a self,
		_cfg: &'a RankedSearchConfig,
		query: RankedQuery<'a>,
		params: &'a SearchParams,
	) -> BoxFuture<'a, shutter_providers::Result<Vec<RankedItem>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		*lock(&self.last_query) = Some(match query {
			RankedQuery::Text(text) => RecordedQuery::Text(text.to_string()),
			RankedQuery::Image(image) =>
				RecordedQuery::Image { file_name: image.file_name.clone(), len: image.bytes.len() },
		});
		*lock(&self.last_params) = Some(params.clone());

		let result = if self.fail.load(Ordering::SeqCst) {
			Err(ProviderError::Status { status: 503, message: "ranked search is down".to_string() })
		} else {
			Ok(lock(&self.items).clone())
		};

		Box::pin(async move { result })
	}
}

/// Resolves `id` to [`link_for`]`(id)` unless the id was marked as failing.
#[derive(Default)]
pub struct StubLinkResolver {
	failing: Mutex<HashSet<String>>,
	panicking: Mutex<HashSet<String>>,
	calls: AtomicUsize,
	delay: Mutex<Option<Duration>>,
}
impl StubLinkResolver {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fail_for(&self, item_id: &str) {
		lock(&self.failing).insert(item_id.to_string());
	}

	pub fn panic_for(&self, item_id: &str) {
		lock(&self.panicking).insert(item_id.to_string());
	}

	/// Delays every resolution, to observe concurrent fan-out.
	pub fn set_delay(&self, delay: Duration) {
		*lock(&self.delay) = Some(delay);
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl LinkResolver for StubLinkResolver {
	fn resolve<'a>(&'a self, item_id: &'a str) -> BoxFuture<'a, shutter_providers::Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let fail = lock(&self.failing).contains(item_id);
		let panics = lock(&self.panicking).contains(item_id);
		let delay = *lock(&self.delay);

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}
			if panics {
				panic!("link resolver panicked for {item_id}");
			}
			if fail {
				return Err(ProviderError::Status {
					status: 409,
					message: format!("path/not_found for {item_id}"),
				});
			}

			Ok(link_for(item_id))
		})
	}
}

/// Returns a canned chat reply and records the model and messages it was called with.
pub struct StubChat {
	reply: Mutex<String>,
	fail: AtomicBool,
	calls: AtomicUsize,
	last_model: Mutex<Option<String>>,
	last_messages: Mutex<Vec<Value>>,
}
impl StubChat {
	pub fn new(reply: &str) -> Self {
		Self {
			reply: Mutex::new(reply.to_string()),
			fail: AtomicBool::new(false),
			calls: AtomicUsize::new(0),
			last_model: Mutex::new(None),
			last_messages: Mutex::new(Vec::new()),
		}
	}

	pub fn set_reply(&self, reply: &str) {
		*lock(&self.reply) = reply.to_string();
	}

	pub fn set_failing(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn last_model(&self) -> Option<String> {
		lock(&self.last_model).clone()
	}

	pub fn last_messages(&self) -> Vec<Value> {
		lock(&self.last_messages).clone()
	}
}
impl ChatProvider for StubChat {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		options: ChatOptions<'a>,
		messages: &'a [Value],
	) -> BoxFuture<'a, shutter_providers::Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		*lock(&self.last_model) = Some(options.model.to_string());
		*lock(&self.last_messages) = messages.to_vec();

		let result = if self.fail.load(Ordering::SeqCst) {
			Err(ProviderError::Status { status: 500, message: "model overloaded".to_string() })
		} else {
			Ok(lock(&self.reply).clone())
		};

		Box::pin(async move { result })
	}
}

/// Cache whose every operation fails.
pub struct FailingCache;
impl CacheStore for FailingCache {
	fn get<'a>(
		&'a self,
		_key: &'a str,
	) -> shutter_storage::BoxFuture<'a, shutter_storage::Result<Option<String>>> {
		Box::pin(async {
			Err(shutter_storage::Error::Backend { message: "cache offline".to_string() })
		})
	}

	fn set<'a>(
		&'a self,
		_key: &'a str,
		_value: String,
		_ttl: Duration,
	) -> shutter_storage::BoxFuture<'a, shutter_storage::Result<()>> {
		Box::pin(async {
			Err(shutter_storage::Error::Backend { message: "cache offline".to_string() })
		})
	}
}

/// A service wired to stub providers, with handles for inspecting them.
pub struct Harness {
	pub service: Arc<ShutterService>,
	pub ranked: Arc<StubRankedSearch>,
	pub links: Arc<StubLinkResolver>,
	pub chat: Arc<StubChat>,
	pub cache: Arc<dyn CacheStore>,
}
impl Harness {
	pub fn new(items: Vec<RankedItem>) -> Self {
		Self::with_config(test_config(), items)
	}

	pub fn with_config(cfg: Config, items: Vec<RankedItem>) -> Self {
		let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new(cfg.cache.max_capacity));

		Self::with_cache(cfg, cache, items)
	}

	pub fn with_cache(cfg: Config, cache: Arc<dyn CacheStore>, items: Vec<RankedItem>) -> Self {
		let ranked = Arc::new(StubRankedSearch::new(items));
		let links = Arc::new(StubLinkResolver::new());
		let chat = Arc::new(StubChat::new("misty forest\nriver at dawn\nold oak"));
		let providers = Providers::new(ranked.clone(), links.clone(), chat.clone());
		let service = Arc::new(ShutterService::with_providers(cfg, cache.clone(), providers));

		Self { service, ranked, links, chat, cache }
	}
}
