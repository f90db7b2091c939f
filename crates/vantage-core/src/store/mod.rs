// ── Object storage ──
//
// One `ObjectCache` per controller: lock-free lookups, atomic per-object
// replacement and a version counter for watchers.

mod cache;
mod refresh;

pub use cache::ObjectCache;
pub use refresh::CatalogDelta;
