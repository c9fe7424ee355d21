use shutter_domain::{DateRange, ImagePayload, PageEnvelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
	Idle,
	Searching,
	Error,
}
impl SearchStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Searching => "searching",
			Self::Error => "error",
		}
	}
}

/// Everything a view needs to render the current search.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSearchState {
	/// Id of the latest dispatched request. Completions carrying any other id are dropped.
	pub active_request_id: u64,
	pub query: String,
	pub image: Option<ImagePayload>,
	pub threshold: f32,
	pub date_range: DateRange,
	pub page: u32,
	pub status: SearchStatus,
	/// Last successful page. Kept while a newer request is in flight or has failed.
	pub results: Option<PageEnvelope>,
	pub error: Option<String>,
}
impl ClientSearchState {
	pub fn new(threshold: f32) -> Self {
		Self {
			active_request_id: 0,
			query: String::new(),
			image: None,
			threshold,
			date_range: DateRange::default(),
			page: 1,
			status: SearchStatus::Idle,
			results: None,
			error: None,
		}
	}
}
