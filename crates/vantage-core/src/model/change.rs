use std::sync::Arc;

use vantage_api::Value;

use super::SystemObject;

/// Attributes whose value actually changed in one update, in the order the
/// update named them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<(String, Value)>,
}

impl ChangeSet {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// What a controller subscriber is told.
#[derive(Debug, Clone)]
pub enum ObjectEvent {
    /// A catalog load introduced the object.
    Added(Arc<SystemObject>),
    /// At least one attribute changed value.
    Updated {
        object: Arc<SystemObject>,
        changes: ChangeSet,
    },
    /// A catalog load no longer lists the object.
    Removed(Arc<SystemObject>),
}

impl ObjectEvent {
    pub fn object(&self) -> &Arc<SystemObject> {
        match self {
            Self::Added(object) | Self::Removed(object) | Self::Updated { object, .. } => object,
        }
    }

    pub fn changes(&self) -> Option<&ChangeSet> {
        match self {
            Self::Updated { changes, .. } => Some(changes),
            Self::Added(_) | Self::Removed(_) => None,
        }
    }
}
