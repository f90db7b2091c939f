// ── Filters and live views over controller caches ──

mod filter;
mod view;

pub use filter::ObjectFilter;
pub use view::QueryView;
