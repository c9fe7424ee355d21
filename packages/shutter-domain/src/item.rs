use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One candidate returned by the ranked search provider, in provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
	#[serde(alias = "dropbox_path")]
	pub id: String,
	#[serde(alias = "source_csv", default)]
	pub source_tag: String,
	#[serde(with = "crate::time_serde")]
	pub modified_date: OffsetDateTime,
	pub similarity_score: f32,
	#[serde(alias = "exact_match", default)]
	pub is_exact_match: bool,
	#[serde(default)]
	pub vector_distance: Option<f32>,
	#[serde(default)]
	pub source_weight: f32,
	#[serde(default)]
	pub recency_score: f32,
	pub combined_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedItem {
	#[serde(flatten)]
	pub item: RankedItem,
	/// `None` when the link could not be resolved for this item only.
	pub resolved_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope {
	pub items: Vec<ResolvedItem>,
	pub total: usize,
	pub page: u32,
	pub total_pages: u32,
	pub has_more: bool,
}
impl PageEnvelope {
	pub fn empty(page: u32) -> Self {
		Self { items: Vec::new(), total: 0, page, total_pages: 0, has_more: false }
	}
}
