use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::{sync::Mutex, time::Instant};

use shutter_config::LinkResolverConfig;

use crate::{Error, Result};

const REFRESH_MARGIN: Duration = Duration::from_secs(300);
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
	value: String,
	refresh_at: Instant,
}

/// Issues temporary download links for stored files.
///
/// A static `access_token` is used as-is. Otherwise a short-lived token is obtained through the
/// OAuth refresh-token grant and reused until shortly before it expires.
pub struct LinkClient {
	cfg: LinkResolverConfig,
	client: Client,
	token: Mutex<Option<CachedToken>>,
}
impl LinkClient {
	pub fn new(cfg: LinkResolverConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { cfg, client, token: Mutex::new(None) })
	}

	pub async fn temporary_link(&self, path: &str) -> Result<String> {
		match self.request_link(path).await {
			Err(Error::Status { status, .. })
				if status == StatusCode::UNAUTHORIZED.as_u16() && self.cfg.access_token.is_none() =>
			{
				tracing::debug!(path, "Access token rejected. Refreshing once.");
				self.token.lock().await.take();

				self.request_link(path).await
			},
			other => other,
		}
	}

	async fn request_link(&self, path: &str) -> Result<String> {
		let token = self.access_token().await?;
		let res = self
			.client
			.post(format!("{}{}", self.cfg.api_base, self.cfg.path))
			.bearer_auth(token)
			.json(&serde_json::json!({ "path": path }))
			.send()
			.await?;
		let json: Value = crate::check_status(res).await?.json().await?;

		parse_link_response(json)
	}

	async fn access_token(&self) -> Result<String> {
		if let Some(token) = self.cfg.access_token.as_ref() {
			return Ok(token.clone());
		}

		let mut cached = self.token.lock().await;

		if let Some(token) = cached.as_ref()
			&& Instant::now() < token.refresh_at
		{
			return Ok(token.value.clone());
		}

		let fresh = self.refresh_token().await?;
		let value = fresh.value.clone();

		*cached = Some(fresh);

		Ok(value)
	}

	async fn refresh_token(&self) -> Result<CachedToken> {
		let (Some(app_key), Some(app_secret), Some(refresh_token)) = (
			self.cfg.app_key.as_deref(),
			self.cfg.app_secret.as_deref(),
			self.cfg.refresh_token.as_deref(),
		) else {
			return Err(Error::InvalidConfig {
				message: "Link resolver credentials are not configured.".to_string(),
			});
		};
		let res = self
			.client
			.post(&self.cfg.token_url)
			.form(&[
				("grant_type", "refresh_token"),
				("refresh_token", refresh_token),
				("client_id", app_key),
				("client_secret", app_secret),
			])
			.send()
			.await?;
		let body: TokenResponse = crate::check_status(res).await?.json().await?;
		let lifetime = body.expires_in.map(Duration::from_secs).unwrap_or(DEFAULT_TOKEN_LIFETIME);

		tracing::debug!(expires_in_secs = lifetime.as_secs(), "Refreshed link resolver token.");

		Ok(CachedToken {
			value: body.access_token,
			refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
		})
	}
}

fn parse_link_response(json: Value) -> Result<String> {
	json.get("link")
		.and_then(Value::as_str)
		.filter(|link| !link.trim().is_empty())
		.map(str::to_string)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Temporary link response is missing link.".to_string(),
		})
}
