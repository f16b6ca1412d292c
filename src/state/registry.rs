// Identifier registry - runner-local id to remote provisional id

use crate::model::{Attribute, FinishItemRq, ItemStatus};
use std::collections::HashMap;

/// Remote counterpart of a started entity
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackedItem {
    pub remote_id: String,
    pub finish_sent: bool,
    pub status: Option<ItemStatus>,
    pub attributes: Option<Vec<Attribute>>,
    pub description: Option<String>,
    pub test_case_id: Option<String>,
}

impl TrackedItem {
    pub fn new(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            ..Self::default()
        }
    }
}

/// Owns every tracked item for the lifetime of a run
#[derive(Debug, Default)]
pub struct ItemRegistry {
    items: HashMap<String, TrackedItem>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, local_id: &str) -> bool {
        self.items.contains_key(local_id)
    }

    /// Register a started entity. Overwrites an existing entry, so callers
    /// check `contains` first.
    pub fn register(
        &mut self,
        local_id: impl Into<String>,
        remote_id: impl Into<String>,
    ) -> Option<TrackedItem> {
        self.items
            .insert(local_id.into(), TrackedItem::new(remote_id))
    }

    pub fn lookup(&self, local_id: &str) -> Option<&TrackedItem> {
        self.items.get(local_id)
    }

    pub fn remote_id(&self, local_id: &str) -> Option<&str> {
        self.items.get(local_id).map(|item| item.remote_id.as_str())
    }

    /// Flip `finish_sent`. Returns false when the item is unknown or already finished.
    pub fn mark_finished(&mut self, local_id: &str) -> bool {
        match self.items.get_mut(local_id) {
            Some(item) if !item.finish_sent => {
                item.finish_sent = true;
                true
            }
            _ => false,
        }
    }

    /// Remember what was sent in the finish request
    pub fn cache_finish(&mut self, local_id: &str, rq: &FinishItemRq) {
        if let Some(item) = self.items.get_mut(local_id) {
            item.status = Some(rq.status);
            item.attributes = rq.attributes.clone();
            item.description = rq.description.clone();
            item.test_case_id = rq.test_case_id.clone();
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ItemRegistry::new();
        assert!(registry.register("t1", "remote-1").is_none());

        let item = registry.lookup("t1").unwrap();
        assert_eq!(item.remote_id, "remote-1");
        assert!(!item.finish_sent);
        assert_eq!(registry.remote_id("t1"), Some("remote-1"));
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn test_register_twice_overwrites() {
        let mut registry = ItemRegistry::new();
        registry.register("t1", "remote-1");
        let previous = registry.register("t1", "remote-2");

        assert_eq!(previous.map(|p| p.remote_id), Some("remote-1".to_string()));
        assert_eq!(registry.remote_id("t1"), Some("remote-2"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_mark_finished_flips_once() {
        let mut registry = ItemRegistry::new();
        registry.register("t1", "remote-1");

        assert!(registry.mark_finished("t1"));
        assert!(!registry.mark_finished("t1"));
        assert!(registry.lookup("t1").unwrap().finish_sent);
        assert!(!registry.mark_finished("unknown"));
    }

    #[test]
    fn test_cache_finish_and_clear() {
        let mut registry = ItemRegistry::new();
        registry.register("t1", "remote-1");

        let mut rq = FinishItemRq::new(ItemStatus::Failed, 10);
        rq.test_case_id = Some("case".to_string());
        registry.cache_finish("t1", &rq);

        let item = registry.lookup("t1").unwrap();
        assert_eq!(item.status, Some(ItemStatus::Failed));
        assert_eq!(item.test_case_id.as_deref(), Some("case"));

        registry.clear();
        assert!(registry.is_empty());
    }
}
