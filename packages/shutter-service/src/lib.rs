pub mod search;
pub mod suggest;

mod error;

pub use error::{Error, Result};
pub use search::SearchQuery;

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;

use shutter_config::{Config, LlmProviderConfig, RankedSearchConfig};
use shutter_domain::RankedItem;
use shutter_providers::{
	chat::{self, ChatOptions},
	links::LinkClient,
	ranked::{self, RankedQuery, SearchParams},
};
use shutter_storage::{CacheStore, MemoryCache};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait RankedSearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a RankedSearchConfig,
		query: RankedQuery<'a>,
		params: &'a SearchParams,
	) -> BoxFuture<'a, shutter_providers::Result<Vec<RankedItem>>>;
}

/// Maps a stored item identifier to a short-lived URL.
pub trait LinkResolver
where
	Self: Send + Sync,
{
	fn resolve<'a>(&'a self, item_id: &'a str) -> BoxFuture<'a, shutter_providers::Result<String>>;
}

pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		options: ChatOptions<'a>,
		messages: &'a [Value],
	) -> BoxFuture<'a, shutter_providers::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub ranked: Arc<dyn RankedSearchProvider>,
	pub links: Arc<dyn LinkResolver>,
	pub chat: Arc<dyn ChatProvider>,
}
impl Providers {
	pub fn new(
		ranked: Arc<dyn RankedSearchProvider>,
		links: Arc<dyn LinkResolver>,
		chat: Arc<dyn ChatProvider>,
	) -> Self {
		Self { ranked, links, chat }
	}

	/// HTTP-backed providers built from the configured endpoints.
	pub fn from_config(cfg: &Config) -> Result<Self> {
		let links = LinkClient::new(cfg.providers.links.clone())?;
		let defaults = Arc::new(DefaultProviders);

		Ok(Self { ranked: defaults.clone(), links: Arc::new(DefaultLinks(links)), chat: defaults })
	}
}

struct DefaultProviders;
impl RankedSearchProvider for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a RankedSearchConfig,
		query: RankedQuery<'a>,
		params: &'a SearchParams,
	) -> BoxFuture<'a, shutter_providers::Result<Vec<RankedItem>>> {
		Box::pin(ranked::search(cfg, query, params))
	}
}

impl ChatProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		options: ChatOptions<'a>,
		messages: &'a [Value],
	) -> BoxFuture<'a, shutter_providers::Result<String>> {
		Box::pin(chat::complete(cfg, options, messages))
	}
}

struct DefaultLinks(LinkClient);
impl LinkResolver for DefaultLinks {
	fn resolve<'a>(&'a self, item_id: &'a str) -> BoxFuture<'a, shutter_providers::Result<String>> {
		Box::pin(self.0.temporary_link(item_id))
	}
}

pub struct ShutterService {
	pub cfg: Arc<Config>,
	pub cache: Arc<dyn CacheStore>,
	pub providers: Providers,
}
impl ShutterService {
	pub fn new(cfg: Config) -> Result<Self> {
		let providers = Providers::from_config(&cfg)?;
		let cache = Arc::new(MemoryCache::new(cfg.cache.max_capacity));

		Ok(Self { cfg: Arc::new(cfg), cache, providers })
	}

	pub fn with_providers(cfg: Config, cache: Arc<dyn CacheStore>, providers: Providers) -> Self {
		Self { cfg: Arc::new(cfg), cache, providers }
	}
}
