mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Client, Config, LinkResolverConfig, LlmProviderConfig, Providers, RankedSearchConfig,
	Search, SearchWeights, Service,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.max_upload_bytes == 0 {
		return Err(Error::Validation {
			message: "service.max_upload_bytes must be greater than zero.".to_string(),
		});
	}

	validate_endpoints(cfg)?;
	validate_search(cfg)?;

	if cfg.cache.enabled {
		if cfg.cache.max_capacity == 0 {
			return Err(Error::Validation {
				message: "cache.max_capacity must be greater than zero.".to_string(),
			});
		}
		if cfg.cache.results_ttl_seconds == 0 {
			return Err(Error::Validation {
				message: "cache.results_ttl_seconds must be greater than zero.".to_string(),
			});
		}
		if cfg.cache.link_ttl_seconds == 0 {
			return Err(Error::Validation {
				message: "cache.link_ttl_seconds must be greater than zero.".to_string(),
			});
		}
	}
	if cfg.client.debounce_ms == 0 {
		return Err(Error::Validation {
			message: "client.debounce_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

/// Base URL the terminal client talks to.
pub fn client_api_base(cfg: &Config) -> String {
	let raw = cfg.client.api_base.as_deref().unwrap_or(cfg.service.http_bind.as_str());

	normalize_api_base(raw)
}

fn validate_endpoints(cfg: &Config) -> Result<()> {
	if cfg.providers.search.api_base.trim().is_empty() {
		return Err(Error::MissingEndpoint { field: "providers.search.api_base" });
	}
	if cfg.providers.links.api_base.trim().is_empty() {
		return Err(Error::MissingEndpoint { field: "providers.links.api_base" });
	}

	let links = &cfg.providers.links;

	if links.access_token.is_none() {
		for (field, value) in [
			("providers.links.app_key", &links.app_key),
			("providers.links.app_secret", &links.app_secret),
			("providers.links.refresh_token", &links.refresh_token),
		] {
			if value.is_none() {
				return Err(Error::Validation {
					message: format!(
						"{field} must be non-empty when providers.links.access_token is absent."
					),
				});
			}
		}
	}
	if let Some(llm) = cfg.providers.llm.as_ref() {
		if llm.api_base.trim().is_empty() {
			return Err(Error::MissingEndpoint { field: "providers.llm.api_base" });
		}
		if llm.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.llm.api_key must be non-empty.".to_string(),
			});
		}
		if llm.max_suggestions == 0 {
			return Err(Error::Validation {
				message: "providers.llm.max_suggestions must be greater than zero.".to_string(),
			});
		}
	}

	Ok(())
}

fn validate_search(cfg: &Config) -> Result<()> {
	let search = &cfg.search;

	for (label, value) in [
		("search.default_certainty_threshold", search.default_certainty_threshold),
		("search.weights.exact_match_threshold", search.weights.exact_match_threshold),
		("search.weights.similarity_weight", search.weights.similarity_weight),
		("search.weights.recency_weight", search.weights.recency_weight),
		("search.weights.source_weight", search.weights.source_weight),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if search.page_size == 0 {
		return Err(Error::Validation {
			message: "search.page_size must be greater than zero.".to_string(),
		});
	}
	if search.max_page_size < search.page_size {
		return Err(Error::Validation {
			message: "search.max_page_size must be greater than or equal to search.page_size."
				.to_string(),
		});
	}
	if search.max_fetch < search.max_page_size {
		return Err(Error::Validation {
			message: "search.max_fetch must be greater than or equal to search.max_page_size."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for value in [
		&mut cfg.providers.search.api_key,
		&mut cfg.providers.links.app_key,
		&mut cfg.providers.links.app_secret,
		&mut cfg.providers.links.refresh_token,
		&mut cfg.providers.links.access_token,
		&mut cfg.client.api_base,
	] {
		if value.as_deref().map(|raw| raw.trim().is_empty()).unwrap_or(false) {
			*value = None;
		}
	}

	cfg.providers.search.api_base = cfg.providers.search.api_base.trim_end_matches('/').to_string();
	cfg.providers.links.api_base = cfg.providers.links.api_base.trim_end_matches('/').to_string();

	if let Some(llm) = cfg.providers.llm.as_mut() {
		llm.api_base = llm.api_base.trim_end_matches('/').to_string();
	}
}

fn normalize_api_base(raw: &str) -> String {
	let trimmed = raw.trim().trim_end_matches('/');
	let (scheme, rest) = if let Some(value) = trimmed.strip_prefix("http://") {
		("http://", value)
	} else if let Some(value) = trimmed.strip_prefix("https://") {
		("https://", value)
	} else {
		("http://", trimmed)
	};
	// Wildcard binds are reachable through loopback on the same host.
	let rest = if let Some(value) = rest.strip_prefix("0.0.0.0:") {
		format!("127.0.0.1:{value}")
	} else if let Some(value) = rest.strip_prefix("[::]:") {
		format!("127.0.0.1:{value}")
	} else {
		rest.to_string()
	};

	format!("{scheme}{rest}")
}
