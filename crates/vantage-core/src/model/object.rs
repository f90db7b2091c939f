use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vantage_api::{FixedPoint, Value};

use super::{ChangeSet, ObjectId};
use crate::error::CoreError;

// ── ObjectInfo ──────────────────────────────────────────────────────

/// One catalog entry as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: ObjectId,
    #[serde(rename = "type", alias = "object_type")]
    pub object_type: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Static configuration such as `load_type`.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ObjectInfo {
    pub fn new(id: ObjectId, object_type: impl Into<String>) -> Self {
        Self {
            id,
            object_type: object_type.into(),
            name: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Parse a JSON array of catalog entries.
pub fn parse_catalog(json: &str) -> Result<Vec<ObjectInfo>, CoreError> {
    Ok(serde_json::from_str(json)?)
}

// ── SystemObject ────────────────────────────────────────────────────

/// An addressable object owned by exactly one controller.
///
/// Instances are immutable once cached; an update swaps in a new `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemObject {
    pub id: ObjectId,
    pub object_type: String,
    pub name: Option<String>,
    pub properties: BTreeMap<String, String>,
    /// When the last successful state fetch completed.
    pub fetched_at: Option<DateTime<Utc>>,
    attributes: BTreeMap<String, Value>,
}

impl SystemObject {
    pub fn from_info(info: ObjectInfo) -> Self {
        Self {
            id: info.id,
            object_type: info.object_type,
            name: info.name,
            properties: info.properties,
            fetched_at: None,
            attributes: BTreeMap::new(),
        }
    }

    /// The name if discovery supplied one, else `<type> <id>`.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.object_type, self.id))
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// `None` until the attribute has been set by a fetch or an event.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn fixed(&self, name: &str) -> Option<FixedPoint> {
        self.attribute(name).and_then(Value::as_fixed)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.attribute(name).and_then(Value::as_int)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    /// Replace catalog metadata, keeping every attribute already known.
    pub(crate) fn refreshed(&self, info: ObjectInfo) -> Self {
        Self {
            attributes: self.attributes.clone(),
            fetched_at: self.fetched_at,
            ..Self::from_info(info)
        }
    }

    /// Apply `updates` in order and report which attributes ended up
    /// different from their current value.
    pub(crate) fn merged<I>(&self, updates: I) -> (Self, ChangeSet)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut next = self.clone();
        let mut touched: Vec<String> = Vec::new();
        for (name, value) in updates {
            if !touched.contains(&name) {
                touched.push(name.clone());
            }
            next.attributes.insert(name, value);
        }

        let changes = touched
            .into_iter()
            .filter_map(|name| {
                let value = next.attributes.get(&name)?;
                let changed = self.attributes.get(&name) != Some(value);
                changed.then(|| (name, value.clone()))
            })
            .collect();

        (next, changes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attrs(pairs: &[(&str, i64)]) -> Vec<(String, Value)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), Value::Int(*v)))
            .collect()
    }

    #[test]
    fn merged_reports_only_real_changes() {
        let obj = SystemObject::from_info(ObjectInfo::new(1, "Load"));
        let (obj, changes) = obj.merged(attrs(&[("a", 1), ("b", 2)]));
        assert_eq!(changes.names().collect::<Vec<_>>(), vec!["a", "b"]);

        let (same, changes) = obj.merged(attrs(&[("a", 1)]));
        assert!(changes.is_empty());
        assert_eq!(same, obj);

        let (_, changes) = obj.merged(attrs(&[("a", 5), ("b", 2)]));
        assert_eq!(changes.names().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(changes.get("a"), Some(&Value::Int(5)));
    }

    #[test]
    fn merged_collapses_repeated_names() {
        let obj = SystemObject::from_info(ObjectInfo::new(1, "Load"));
        let (obj, _) = obj.merged(attrs(&[("a", 1)]));

        // Moved away and back within one update: nothing changed.
        let (_, changes) = obj.merged(attrs(&[("a", 9), ("a", 1)]));
        assert!(changes.is_empty());
    }

    #[test]
    fn refreshed_keeps_attributes() {
        let obj = SystemObject::from_info(ObjectInfo::new(3, "Load"));
        let (obj, _) = obj.merged(attrs(&[("level", 40)]));

        let renamed = obj.refreshed(ObjectInfo::new(3, "Load").with_name("Kitchen"));
        assert_eq!(renamed.display_name(), "Kitchen");
        assert_eq!(renamed.int("level"), Some(40));
    }

    #[test]
    fn parse_catalog_accepts_type_field() {
        let catalog = parse_catalog(
            r#"[
                {"id": 10, "type": "Temperature", "name": "Hall"},
                {"id": 12, "type": "Load", "properties": {"load_type": "Motor"}}
            ]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].name.as_deref(), Some("Hall"));
        assert_eq!(
            catalog[1].properties.get("load_type").map(String::as_str),
            Some("Motor")
        );
        assert!(parse_catalog("{").is_err());
    }
}
