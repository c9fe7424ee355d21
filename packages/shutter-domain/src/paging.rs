use std::ops::Range;

/// Position of one page inside a filtered result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
	pub range: Range<usize>,
	pub total: usize,
	pub total_pages: u32,
	pub has_more: bool,
}

/// Computes the slice for `page` (1-based). Pages past the end yield an empty range.
pub fn page_window(total: usize, page: u32, page_size: u32) -> PageWindow {
	let page_size = page_size.max(1) as usize;
	let page = page.max(1) as usize;
	let start = page.saturating_sub(1).saturating_mul(page_size).min(total);
	let end = page.saturating_mul(page_size).min(total);
	let total_pages = total.div_ceil(page_size);

	PageWindow {
		range: start..end,
		total,
		total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
		has_more: page.saturating_mul(page_size) < total,
	}
}

pub fn slice_page<T: Clone>(items: &[T], window: &PageWindow) -> Vec<T> {
	items.get(window.range.clone()).map(<[T]>::to_vec).unwrap_or_default()
}
