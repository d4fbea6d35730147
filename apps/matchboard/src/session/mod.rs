// Session state: per-view UI state cached in memory and persisted, debounced,
// to a pluggable backing store. Cleared as a whole on logout.

pub mod cache;
pub mod store;
pub mod view_state;

pub use cache::{CacheConfig, CacheEntry, CachedValue, SessionStateCache};
pub use store::{BackingStore, FileStore, MemoryStore, StoreError};
pub use view_state::{Staleness, StalenessPolicy, ViewState};
