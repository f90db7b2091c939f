use std::sync::Arc;

use crate::model::{ObjectId, SystemObject};
use crate::store::ObjectCache;

type Predicate = Arc<dyn Fn(&SystemObject) -> bool + Send + Sync>;

/// A restartable filtered view over a live cache.
///
/// Nothing is captured at construction: every iteration re-scans the
/// cache, so two passes separated by an update can disagree.
#[derive(Clone)]
pub struct QueryView {
    cache: Arc<ObjectCache>,
    predicates: Vec<Predicate>,
}

impl QueryView {
    pub fn new(cache: Arc<ObjectCache>) -> Self {
        Self {
            cache,
            predicates: Vec::new(),
        }
    }

    /// Narrow the view further. The original view is unchanged.
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&SystemObject) -> bool + Send + Sync + 'static,
    {
        let mut predicates = self.predicates.clone();
        predicates.push(Arc::new(predicate));
        Self {
            cache: Arc::clone(&self.cache),
            predicates,
        }
    }

    fn accepts(&self, object: &SystemObject) -> bool {
        self.predicates.iter().all(|p| p(object))
    }

    /// Matching objects in id order, scanned now.
    pub fn iter(&self) -> std::vec::IntoIter<Arc<SystemObject>> {
        let mut matched = self.cache.snapshot();
        matched.retain(|o| self.accepts(o));
        matched.into_iter()
    }

    pub fn get(&self, id: ObjectId) -> Option<Arc<SystemObject>> {
        self.cache.get(id).filter(|o| self.accepts(o))
    }

    pub fn first(&self) -> Option<Arc<SystemObject>> {
        self.iter().next()
    }

    pub fn count(&self) -> usize {
        self.iter().len()
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.iter().map(|o| o.id).collect()
    }
}

impl IntoIterator for &QueryView {
    type Item = Arc<SystemObject>;
    type IntoIter = std::vec::IntoIter<Arc<SystemObject>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::ObjectInfo;
    use pretty_assertions::assert_eq;
    use vantage_api::Value;

    fn cache_with(ids: &[ObjectId]) -> Arc<ObjectCache> {
        let cache = Arc::new(ObjectCache::new());
        cache.apply_catalog(ids.iter().map(|id| ObjectInfo::new(*id, "Load")).collect());
        cache
    }

    fn set_on(cache: &ObjectCache, id: ObjectId, on: bool) {
        cache.apply(id, [("on".to_owned(), Value::from(on))], None);
    }

    #[test]
    fn view_rescans_on_every_iteration() {
        let cache = cache_with(&[1, 2, 3]);
        let on = QueryView::new(Arc::clone(&cache))
            .filter(|o| o.attribute("on") == Some(&Value::from(true)));
        assert!(on.is_empty());

        set_on(&cache, 2, true);
        assert_eq!(on.ids(), vec![2]);

        set_on(&cache, 3, true);
        set_on(&cache, 2, false);
        assert_eq!(on.ids(), vec![3]);
        assert_eq!(on.count(), 1);
    }

    #[test]
    fn chained_filters_compose() {
        let cache = cache_with(&[1, 2, 3, 4]);
        let all = QueryView::new(cache);
        let even = all.filter(|o| o.id % 2 == 0);
        let big_even = even.filter(|o| o.id > 2);

        assert_eq!(all.count(), 4);
        assert_eq!(even.ids(), vec![2, 4]);
        assert_eq!(big_even.ids(), vec![4]);
        assert_eq!(big_even.first().unwrap().id, 4);
        assert!(big_even.get(2).is_none());
        assert_eq!((&even).into_iter().count(), 2);
    }
}
