use std::time::{Duration, Instant};

use moka::{Expiry, future::Cache};

use crate::{BoxFuture, CacheStore, Result};

#[derive(Clone)]
struct Entry {
	value: String,
	ttl: Duration,
}

struct EntryExpiry;
impl Expiry<String, Entry> for EntryExpiry {
	fn expire_after_create(
		&self,
		_key: &String,
		entry: &Entry,
		_created_at: Instant,
	) -> Option<Duration> {
		Some(entry.ttl)
	}

	fn expire_after_update(
		&self,
		_key: &String,
		entry: &Entry,
		_updated_at: Instant,
		_duration_until_expiry: Option<Duration>,
	) -> Option<Duration> {
		Some(entry.ttl)
	}
}

/// In-process cache. Each entry expires after the TTL it was written with.
#[derive(Clone)]
pub struct MemoryCache {
	inner: Cache<String, Entry>,
}
impl MemoryCache {
	pub fn new(max_capacity: u64) -> Self {
		let inner = Cache::builder().max_capacity(max_capacity).expire_after(EntryExpiry).build();

		Self { inner }
	}
}
impl CacheStore for MemoryCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move { Ok(self.inner.get(key).await.map(|entry| entry.value)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if ttl.is_zero() {
				self.inner.invalidate(key).await;

				return Ok(());
			}

			tracing::trace!(key, ttl_ms = ttl.as_millis() as u64, "Cache write.");
			self.inner.insert(key.to_string(), Entry { value, ttl }).await;

			Ok(())
		})
	}
}
