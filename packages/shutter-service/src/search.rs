use std::{sync::Arc, time::Duration};

use serde::Deserialize;
use tokio::task::JoinSet;

use shutter_domain::{
	DateRange, ImagePayload, PageEnvelope, RankedItem, ResolvedItem, SearchInput, SearchRequest,
	cache_key::{self, cache_key_prefix},
	filter, paging,
	request::SearchRequestBuilder,
};
use shutter_providers::ranked::{RankedQuery, SearchParams};
use shutter_storage::CacheStore;

use crate::{Error, LinkResolver, Result, ShutterService};

/// Search parameters as they arrive in a query string. Every field is optional and parsed here so
/// that malformed values surface as [`Error::InvalidRequest`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
	pub query: Option<String>,
	pub page: Option<String>,
	pub limit: Option<String>,
	pub start_date: Option<String>,
	pub end_date: Option<String>,
	pub certainty_threshold: Option<String>,
}

#[derive(Clone)]
struct LinkCache {
	store: Arc<dyn CacheStore>,
	ttl: Duration,
}

impl ShutterService {
	pub fn text_request(&self, params: &SearchQuery) -> Result<SearchRequest> {
		let query = params.query.as_deref().unwrap_or_default();

		self.finish_request(SearchRequest::text(query), params)
	}

	pub fn image_request(
		&self,
		params: &SearchQuery,
		image: ImagePayload,
	) -> Result<SearchRequest> {
		self.finish_request(SearchRequest::image(image), params)
	}

	/// Produces one page of link-resolved results for `req`.
	pub async fn resolve_page(&self, req: &SearchRequest) -> Result<PageEnvelope> {
		if self.cfg.providers.search.api_base.trim().is_empty() {
			return Err(Error::Config {
				message: "providers.search.api_base is not configured.".to_string(),
			});
		}
		if req.date_range.is_inverted() {
			tracing::debug!(
				mode = req.mode().as_str(),
				"Inverted date range. Returning no results."
			);

			return Ok(PageEnvelope::empty(req.page));
		}

		let ranked = self.working_set(req).await?;
		let fetched = ranked.len();
		let filtered = filter::filter_by_date(ranked, &req.date_range);
		let window = paging::page_window(filtered.len(), req.page, req.page_size);
		let items = self.resolve_links(paging::slice_page(&filtered, &window)).await;

		tracing::info!(
			mode = req.mode().as_str(),
			fetched,
			total = window.total,
			page = req.page,
			returned = items.len(),
			"Search page resolved."
		);

		Ok(PageEnvelope {
			items,
			total: window.total,
			page: req.page,
			total_pages: window.total_pages,
			has_more: window.has_more,
		})
	}

	fn finish_request(
		&self,
		builder: SearchRequestBuilder,
		params: &SearchQuery,
	) -> Result<SearchRequest> {
		let search = &self.cfg.search;
		let page = parse_field::<u32>(params.page.as_deref(), "page")?.unwrap_or(1);
		let page_size =
			parse_field::<u32>(params.limit.as_deref(), "limit")?.unwrap_or(search.page_size);

		if page_size == 0 || page_size > search.max_page_size {
			return Err(Error::InvalidRequest {
				message: format!("limit must be between 1 and {}.", search.max_page_size),
			});
		}

		let certainty_threshold =
			parse_field::<f32>(params.certainty_threshold.as_deref(), "certainty_threshold")?
				.unwrap_or(search.default_certainty_threshold);
		let date_range =
			DateRange::parse(params.start_date.as_deref(), params.end_date.as_deref())?;

		Ok(builder
			.certainty_threshold(certainty_threshold)
			.date_range(date_range)
			.page(page)
			.page_size(page_size)
			.max_fetch(search.max_fetch)
			.build()?)
	}

	async fn working_set(&self, req: &SearchRequest) -> Result<Vec<RankedItem>> {
		let params =
			SearchParams::new(req.certainty_threshold, &self.cfg.search.weights, req.max_fetch);
		let query = match &req.input {
			SearchInput::Text(text) => text,
			SearchInput::Image(image) => {
				let items = self
					.providers
					.ranked
					.search(&self.cfg.providers.search, RankedQuery::Image(image), &params)
					.await?;

				return Ok(items);
			},
		};
		let key = if self.cfg.cache.enabled { req.cache_key() } else { None };

		if let Some(key) = key.as_deref()
			&& let Some(items) = self.cached_results(key).await
		{
			return Ok(items);
		}

		let items = self
			.providers
			.ranked
			.search(&self.cfg.providers.search, RankedQuery::Text(query), &params)
			.await?;

		if let Some(key) = key.as_deref() {
			self.store_results(key, &items).await;
		}

		Ok(items)
	}

	async fn cached_results(&self, key: &str) -> Option<Vec<RankedItem>> {
		match shutter_storage::get_json::<Vec<RankedItem>>(self.cache.as_ref(), key).await {
			Ok(Some(items)) => {
				tracing::debug!(
					cache_key_prefix = cache_key_prefix(key),
					hit = true,
					items = items.len(),
					"Cache hit."
				);

				Some(items)
			},
			Ok(None) => {
				tracing::debug!(
					cache_key_prefix = cache_key_prefix(key),
					hit = false,
					"Cache miss."
				);

				None
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_key_prefix = cache_key_prefix(key),
					"Cache read failed."
				);

				None
			},
		}
	}

	async fn store_results(&self, key: &str, items: &[RankedItem]) {
		let ttl = Duration::from_secs(self.cfg.cache.results_ttl_seconds);

		if let Err(err) = shutter_storage::set_json(self.cache.as_ref(), key, items, ttl).await {
			tracing::warn!(
				error = %err,
				cache_key_prefix = cache_key_prefix(key),
				"Cache write failed."
			);
		}
	}

	/// Resolves every item concurrently. A failed or panicked resolution leaves that item's link
	/// empty and never affects its siblings.
	async fn resolve_links(&self, items: Vec<RankedItem>) -> Vec<ResolvedItem> {
		let link_cache = self.cfg.cache.enabled.then(|| LinkCache {
			store: self.cache.clone(),
			ttl: Duration::from_secs(self.cfg.cache.link_ttl_seconds),
		});
		let mut tasks = JoinSet::new();

		for (index, item) in items.iter().enumerate() {
			let resolver = self.providers.links.clone();
			let link_cache = link_cache.clone();
			let item_id = item.id.clone();

			tasks.spawn(async move { (index, resolve_link(resolver, link_cache, item_id).await) });
		}

		let mut links = vec![None; items.len()];

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((index, link)) =>
					if let Some(slot) = links.get_mut(index) {
						*slot = link;
					},
				Err(err) => {
					tracing::warn!(error = %err, "Link resolution task failed.");
				},
			}
		}

		items
			.into_iter()
			.zip(links)
			.map(|(item, resolved_link)| ResolvedItem { item, resolved_link })
			.collect()
	}
}

async fn resolve_link(
	resolver: Arc<dyn LinkResolver>,
	link_cache: Option<LinkCache>,
	item_id: String,
) -> Option<String> {
	let key = cache_key::image_preview_key(&item_id);

	if let Some(cache) = link_cache.as_ref() {
		match cache.store.get(&key).await {
			Ok(Some(link)) => return Some(link),
			Ok(None) => {},
			Err(err) => {
				tracing::warn!(error = %err, item_id = %item_id, "Link cache read failed.");
			},
		}
	}

	match resolver.resolve(&item_id).await {
		Ok(link) => {
			if let Some(cache) = link_cache.as_ref()
				&& let Err(err) = cache.store.set(&key, link.clone(), cache.ttl).await
			{
				tracing::warn!(error = %err, item_id = %item_id, "Link cache write failed.");
			}

			Some(link)
		},
		Err(err) => {
			tracing::warn!(error = %err, item_id = %item_id, "Failed to resolve temporary link.");

			None
		},
	}
}

fn parse_field<T>(raw: Option<&str>, field: &str) -> Result<Option<T>>
where
	T: std::str::FromStr,
{
	match raw.map(str::trim).filter(|value| !value.is_empty()) {
		Some(value) => value.parse().map(Some).map_err(|_| Error::InvalidRequest {
			message: format!("{field} has an invalid value {value:?}."),
		}),
		None => Ok(None),
	}
}
