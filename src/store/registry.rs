// Registry of versioned partitions. The lifecycle manager owns creation
// and destruction; the dispatcher only borrows partitions per request.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::store::partition::CachePartition;

#[derive(Default)]
pub struct PartitionRegistry {
    partitions: RwLock<HashMap<String, Arc<CachePartition>>>,
}

impl PartitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the named partition if absent; returns the live handle
    /// either way. Quota is fixed at creation.
    pub fn ensure(&self, name: &str, quota: u64) -> Arc<CachePartition> {
        let mut partitions = self.partitions.write();
        Arc::clone(
            partitions
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(CachePartition::new(name, quota))),
        )
    }

    pub fn get(&self, name: &str) -> Option<Arc<CachePartition>> {
        self.partitions.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> bool {
        self.partitions.write().remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.partitions.read().keys().cloned().collect()
    }

    /// Partitions belonging to one version namespace, by name prefix.
    pub fn with_prefix(&self, prefix: &str) -> Vec<Arc<CachePartition>> {
        let mut matched: Vec<Arc<CachePartition>> = self
            .partitions
            .read()
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(_, partition)| Arc::clone(partition))
            .collect();
        matched.sort_by(|a, b| a.name().cmp(b.name()));
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_is_idempotent() {
        let registry = PartitionRegistry::new();
        let a = registry.ensure("v2-static", 100);
        let b = registry.ensure("v2-static", 999);
        assert!(Arc::ptr_eq(&a, &b));
        // Quota fixed at creation; the second call does not resize.
        assert_eq!(b.quota(), 100);
    }

    #[test]
    fn test_prefix_selection() {
        let registry = PartitionRegistry::new();
        registry.ensure("v1-static", 100);
        registry.ensure("v2-static", 100);
        registry.ensure("v2-dynamic", 100);

        let v2 = registry.with_prefix("v2-");
        assert_eq!(v2.len(), 2);
        assert!(registry.remove("v1-static"));
        assert!(!registry.remove("v1-static"));
        assert_eq!(registry.names().len(), 2);
    }
}
