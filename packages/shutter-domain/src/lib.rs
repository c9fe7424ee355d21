pub mod cache_key;
pub mod filter;
pub mod item;
pub mod paging;
pub mod request;
pub mod time_serde;

pub use item::{PageEnvelope, RankedItem, ResolvedItem};
pub use request::{DateRange, ImagePayload, SearchInput, SearchMode, SearchRequest};
