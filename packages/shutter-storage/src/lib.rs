pub mod memory;

mod error;

pub use error::Error;
pub use memory::MemoryCache;

use std::{future::Future, pin::Pin, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Key/value store with per-key expiry. Writes replace the whole value.
pub trait CacheStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

	fn set<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> BoxFuture<'a, Result<()>>;
}

pub async fn get_json<T>(store: &dyn CacheStore, key: &str) -> Result<Option<T>>
where
	T: DeserializeOwned,
{
	let Some(raw) = store.get(key).await? else {
		return Ok(None);
	};
	let value = serde_json::from_str(&raw)
		.map_err(|err| Error::Decode { key: key.to_string(), source: err })?;

	Ok(Some(value))
}

pub async fn set_json<T>(store: &dyn CacheStore, key: &str, value: &T, ttl: Duration) -> Result<()>
where
	T: Serialize + ?Sized,
{
	let raw = serde_json::to_string(value)?;

	store.set(key, raw, ttl).await
}
