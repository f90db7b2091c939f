// ── Domain model ──
//
// Catalog entries, cached system objects and the change sets emitted when
// their attributes move.

mod change;
mod object;

pub use change::{ChangeSet, ObjectEvent};
pub use object::{ObjectInfo, SystemObject, parse_catalog};

/// System-wide object id assigned by discovery.
pub type ObjectId = u32;
