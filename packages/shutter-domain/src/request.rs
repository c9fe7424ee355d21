use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, UtcOffset};

use crate::{cache_key, time_serde};

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum RequestError {
	#[error("query must be non-empty.")]
	EmptyQuery,
	#[error("image file must be non-empty.")]
	EmptyImage,
	#[error("page must be 1 or greater.")]
	InvalidPage,
	#[error("page size must be between 1 and {max}.")]
	InvalidPageSize { max: u32 },
	#[error("certainty threshold must be in the range 0.0-1.0.")]
	ThresholdOutOfRange,
	#[error("{field} must be a YYYY-MM-DD date.")]
	InvalidDate { field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
	Text,
	Image,
}
impl SearchMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::Image => "image",
		}
	}
}

/// Uploaded reference image. Never cached or keyed.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
	pub bytes: Arc<[u8]>,
	pub file_name: String,
	pub content_type: Option<String>,
}
impl ImagePayload {
	pub fn new(bytes: impl Into<Arc<[u8]>>, file_name: impl Into<String>) -> Self {
		Self { bytes: bytes.into(), file_name: file_name.into(), content_type: None }
	}

	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());

		self
	}
}
impl fmt::Debug for ImagePayload {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ImagePayload")
			.field("file_name", &self.file_name)
			.field("content_type", &self.content_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchInput {
	Text(String),
	Image(ImagePayload),
}

/// Inclusive UTC calendar-day bounds; an absent bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
	pub start: Option<Date>,
	pub end: Option<Date>,
}
impl DateRange {
	pub fn new(start: Option<Date>, end: Option<Date>) -> Self {
		Self { start, end }
	}

	pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, RequestError> {
		Ok(Self {
			start: parse_bound(start, "start_date")?,
			end: parse_bound(end, "end_date")?,
		})
	}

	pub fn is_bounded(&self) -> bool {
		self.start.is_some() || self.end.is_some()
	}

	/// True when both bounds are present and `start > end`. Such a range matches nothing.
	pub fn is_inverted(&self) -> bool {
		matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
	}

	pub fn contains(&self, timestamp: OffsetDateTime) -> bool {
		let day = timestamp.to_offset(UtcOffset::UTC).date();

		self.start.is_none_or(|start| day >= start) && self.end.is_none_or(|end| day <= end)
	}
}

/// A normalized search intent.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
	pub input: SearchInput,
	pub certainty_threshold: f32,
	pub date_range: DateRange,
	pub page: u32,
	pub page_size: u32,
	pub max_fetch: u32,
}
impl SearchRequest {
	pub fn text(query: &str) -> SearchRequestBuilder {
		SearchRequestBuilder::new(SearchInput::Text(normalize_query(query)))
	}

	pub fn image(image: ImagePayload) -> SearchRequestBuilder {
		SearchRequestBuilder::new(SearchInput::Image(image))
	}

	pub fn mode(&self) -> SearchMode {
		match self.input {
			SearchInput::Text(_) => SearchMode::Text,
			SearchInput::Image(_) => SearchMode::Image,
		}
	}

	pub fn query_text(&self) -> Option<&str> {
		match &self.input {
			SearchInput::Text(query) => Some(query.as_str()),
			SearchInput::Image(_) => None,
		}
	}

	/// Cache key for text searches; image searches are never keyed.
	pub fn cache_key(&self) -> Option<String> {
		self.query_text().map(|query| {
			cache_key::search_results_key(query, &self.date_range, self.certainty_threshold)
		})
	}
}

#[derive(Debug, Clone)]
pub struct SearchRequestBuilder {
	input: SearchInput,
	certainty_threshold: f32,
	date_range: DateRange,
	page: u32,
	page_size: u32,
	max_fetch: u32,
}
impl SearchRequestBuilder {
	fn new(input: SearchInput) -> Self {
		Self {
			input,
			certainty_threshold: 0.5,
			date_range: DateRange::default(),
			page: 1,
			page_size: 12,
			max_fetch: 144,
		}
	}

	pub fn certainty_threshold(mut self, value: f32) -> Self {
		self.certainty_threshold = value;

		self
	}

	pub fn date_range(mut self, value: DateRange) -> Self {
		self.date_range = value;

		self
	}

	pub fn page(mut self, value: u32) -> Self {
		self.page = value;

		self
	}

	pub fn page_size(mut self, value: u32) -> Self {
		self.page_size = value;

		self
	}

	pub fn max_fetch(mut self, value: u32) -> Self {
		self.max_fetch = value;

		self
	}

	pub fn build(self) -> Result<SearchRequest, RequestError> {
		match &self.input {
			SearchInput::Text(query) if query.is_empty() => return Err(RequestError::EmptyQuery),
			SearchInput::Image(image) if image.bytes.is_empty() =>
				return Err(RequestError::EmptyImage),
			_ => {},
		}

		if self.page == 0 {
			return Err(RequestError::InvalidPage);
		}
		if self.page_size == 0 || self.page_size > self.max_fetch {
			return Err(RequestError::InvalidPageSize { max: self.max_fetch });
		}
		if !self.certainty_threshold.is_finite() || !(0.0..=1.0).contains(&self.certainty_threshold)
		{
			return Err(RequestError::ThresholdOutOfRange);
		}

		Ok(SearchRequest {
			input: self.input,
			certainty_threshold: self.certainty_threshold,
			date_range: self.date_range,
			page: self.page,
			page_size: self.page_size,
			max_fetch: self.max_fetch,
		})
	}
}

/// Trims and collapses internal whitespace.
pub fn normalize_query(raw: &str) -> String {
	raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_bound(raw: Option<&str>, field: &'static str) -> Result<Option<Date>, RequestError> {
	match raw.map(str::trim).filter(|value| !value.is_empty()) {
		Some(value) =>
			time_serde::parse_day(value).map(Some).ok_or(RequestError::InvalidDate { field }),
		None => Ok(None),
	}
}
