use crate::{item::RankedItem, request::DateRange};

/// Keeps items whose modified day falls within `range`, in their original order.
pub fn filter_by_date(items: Vec<RankedItem>, range: &DateRange) -> Vec<RankedItem> {
	if range.is_inverted() {
		return Vec::new();
	}
	if !range.is_bounded() {
		return items;
	}

	items.into_iter().filter(|item| range.contains(item.modified_date)).collect()
}
