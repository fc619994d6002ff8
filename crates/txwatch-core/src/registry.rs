//! Subscription registry — the set of watched addresses.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::types::Address;

/// Thread-safe set of watched addresses.
///
/// The scheduler works from [`SubscriptionRegistry::snapshot`] so a whole
/// block can be filtered without holding the lock.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    addresses: RwLock<HashSet<Address>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address. Returns `true` if it was not already watched.
    pub fn add(&self, address: impl Into<Address>) -> bool {
        self.addresses.write().insert(address.into())
    }

    /// Remove an address. Returns `true` if it was watched.
    pub fn remove(&self, address: &str) -> bool {
        self.addresses.write().remove(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.read().contains(address)
    }

    /// Point-in-time copy of the watched set, detached from later mutations.
    pub fn snapshot(&self) -> HashSet<Address> {
        self.addresses.read().clone()
    }

    pub fn len(&self) -> usize {
        self.addresses.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let reg = SubscriptionRegistry::new();
        assert!(reg.add("0xaaa"));
        assert!(!reg.add("0xaaa"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_only_members() {
        let reg = SubscriptionRegistry::new();
        assert!(!reg.remove("0xaaa"));
        reg.add("0xaaa");
        assert!(reg.remove("0xaaa"));
        assert!(!reg.remove("0xaaa"));
        assert!(reg.is_empty());
    }

    #[test]
    fn snapshot_is_detached() {
        let reg = SubscriptionRegistry::new();
        reg.add("0xaaa");
        let snap = reg.snapshot();
        reg.add("0xbbb");
        reg.remove("0xaaa");
        assert!(snap.contains("0xaaa"));
        assert!(!snap.contains("0xbbb"));
        assert!(reg.contains("0xbbb"));
    }

    #[test]
    fn concurrent_adds_count_once() {
        use std::sync::Arc;

        let reg = Arc::new(SubscriptionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.add("0xaaa"))
            })
            .collect();
        let added = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|added| *added)
            .count();
        assert_eq!(added, 1);
    }
}
