use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub client: Client,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	#[serde(default = "default_max_upload_bytes")]
	pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub search: RankedSearchConfig,
	pub links: LinkResolverConfig,
	/// Optional. Suggestions are unavailable when absent.
	pub llm: Option<LlmProviderConfig>,
}

/// Endpoint of the ranked vector search service.
#[derive(Debug, Clone, Deserialize)]
pub struct RankedSearchConfig {
	pub api_base: String,
	#[serde(default = "default_text_path")]
	pub text_path: String,
	#[serde(default = "default_image_path")]
	pub image_path: String,
	pub api_key: Option<String>,
	#[serde(default = "default_search_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Storage provider issuing temporary links. Either `access_token` or the refresh-token triple
/// must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkResolverConfig {
	#[serde(default = "default_links_api_base")]
	pub api_base: String,
	#[serde(default = "default_links_path")]
	pub path: String,
	#[serde(default = "default_links_token_url")]
	pub token_url: String,
	pub app_key: Option<String>,
	pub app_secret: Option<String>,
	pub refresh_token: Option<String>,
	pub access_token: Option<String>,
	#[serde(default = "default_links_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub api_base: String,
	#[serde(default = "default_llm_path")]
	pub path: String,
	pub api_key: String,
	pub model: String,
	pub vision_model: String,
	#[serde(default = "default_llm_temperature")]
	pub temperature: f32,
	#[serde(default = "default_llm_max_tokens")]
	pub max_tokens: u32,
	#[serde(default = "default_max_suggestions")]
	pub max_suggestions: u32,
	/// Collection description prepended to every system prompt.
	#[serde(default)]
	pub context: String,
	#[serde(default = "default_llm_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_certainty_threshold: f32,
	pub page_size: u32,
	pub max_page_size: u32,
	/// Upstream fetch size. Every provider call asks for this many candidates so later pages are
	/// served without re-querying.
	pub max_fetch: u32,
	pub weights: SearchWeights,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_certainty_threshold: 0.5,
			page_size: 12,
			max_page_size: 48,
			max_fetch: 144,
			weights: SearchWeights::default(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchWeights {
	pub exact_match_threshold: f32,
	pub similarity_weight: f32,
	pub recency_weight: f32,
	pub source_weight: f32,
	pub include_vectors: bool,
}
impl Default for SearchWeights {
	fn default() -> Self {
		Self {
			exact_match_threshold: 0.95,
			similarity_weight: 0.6,
			recency_weight: 0.2,
			source_weight: 0.2,
			include_vectors: false,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub enabled: bool,
	pub max_capacity: u64,
	pub results_ttl_seconds: u64,
	pub link_ttl_seconds: u64,
}
impl Default for Cache {
	fn default() -> Self {
		Self {
			enabled: true,
			max_capacity: 10_000,
			results_ttl_seconds: 300,
			link_ttl_seconds: 3_600,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Client {
	/// Defaults to `http://` + `service.http_bind`.
	pub api_base: Option<String>,
	pub debounce_ms: u64,
}
impl Default for Client {
	fn default() -> Self {
		Self { api_base: None, debounce_ms: 300 }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_max_upload_bytes() -> usize {
	10 * 1_024 * 1_024
}

fn default_text_path() -> String {
	"/search/text".to_string()
}

fn default_image_path() -> String {
	"/search/image".to_string()
}

fn default_search_timeout_ms() -> u64 {
	15_000
}

fn default_links_api_base() -> String {
	"https://api.dropboxapi.com".to_string()
}

fn default_links_path() -> String {
	"/2/files/get_temporary_link".to_string()
}

fn default_links_token_url() -> String {
	"https://api.dropbox.com/oauth2/token".to_string()
}

fn default_links_timeout_ms() -> u64 {
	10_000
}

fn default_llm_path() -> String {
	"/v1/chat/completions".to_string()
}

fn default_llm_temperature() -> f32 {
	0.7
}

fn default_llm_max_tokens() -> u32 {
	150
}

fn default_max_suggestions() -> u32 {
	5
}

fn default_llm_timeout_ms() -> u64 {
	20_000
}
