// ── Filter predicates for object subscriptions ──

use std::collections::BTreeSet;

use crate::model::{ObjectId, SystemObject};

/// Which objects a subscription cares about.
#[derive(Default)]
pub enum ObjectFilter {
    #[default]
    All,
    Ids(BTreeSet<ObjectId>),
    ObjectType(String),
    Custom(Box<dyn Fn(&SystemObject) -> bool + Send + Sync>),
}

impl ObjectFilter {
    pub fn id(id: ObjectId) -> Self {
        Self::Ids(BTreeSet::from([id]))
    }

    pub fn ids(ids: impl IntoIterator<Item = ObjectId>) -> Self {
        Self::Ids(ids.into_iter().collect())
    }

    pub fn object_type(object_type: impl Into<String>) -> Self {
        Self::ObjectType(object_type.into())
    }

    pub fn custom(predicate: impl Fn(&SystemObject) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Box::new(predicate))
    }

    pub fn matches(&self, object: &SystemObject) -> bool {
        match self {
            Self::All => true,
            Self::Ids(ids) => ids.contains(&object.id),
            Self::ObjectType(t) => object.object_type == *t,
            Self::Custom(f) => f(object),
        }
    }
}

impl std::fmt::Debug for ObjectFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Ids(ids) => f.debug_tuple("Ids").field(ids).finish(),
            Self::ObjectType(t) => f.debug_tuple("ObjectType").field(t).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
