//! In-process implementation of every storage collaborator.
//!
//! Suitable for a single server instance. Counters live in this process, so
//! running several instances against one campaign needs a shared store
//! instead.

use crate::clock::Clock;
use crate::store::{
    PhonePool, RotationCounter, StickyMapping, StickyStore, StoreError, UsageRecorder,
};
use crate::types::{CampaignId, PhoneEntry, PhoneId, PhoneStatus};
use async_trait::async_trait;
use chrono::Duration;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

struct StoredPhone {
    campaign_id: CampaignId,
    entry: PhoneEntry,
}

pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    // Insertion order is the pool order.
    phones: RwLock<IndexMap<PhoneId, StoredPhone>>,
    counters: RwLock<HashMap<CampaignId, AtomicU64>>,
    sticky: RwLock<HashMap<(CampaignId, String), StickyMapping>>,
    usage: Mutex<HashMap<PhoneId, u64>>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryStore {
            clock,
            phones: RwLock::new(IndexMap::new()),
            counters: RwLock::new(HashMap::new()),
            sticky: RwLock::new(HashMap::new()),
            usage: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a phone to the end of the campaign pool, replacing any phone
    /// with the same id.
    pub fn add_phone(&self, campaign_id: &str, entry: PhoneEntry) {
        let mut phones = self.phones.write();
        phones.shift_remove(&entry.id);
        phones.insert(
            entry.id.clone(),
            StoredPhone {
                campaign_id: campaign_id.to_string(),
                entry,
            },
        );
    }

    /// Returns false if the phone does not exist.
    pub fn set_phone_status(&self, phone_id: &str, status: PhoneStatus) -> bool {
        match self.phones.write().get_mut(phone_id) {
            Some(stored) => {
                stored.entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn remove_phone(&self, phone_id: &str) -> bool {
        self.phones.write().shift_remove(phone_id).is_some()
    }

    pub fn counter_value(&self, campaign_id: &str) -> u64 {
        self.counters
            .read()
            .get(campaign_id)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn usage_count(&self, phone_id: &str) -> u64 {
        self.usage.lock().get(phone_id).copied().unwrap_or(0)
    }

    /// Number of stored sticky mappings, expired ones included.
    pub fn sticky_len(&self) -> usize {
        self.sticky.read().len()
    }
}

#[async_trait]
impl PhonePool for MemoryStore {
    async fn eligible_phones(&self, campaign_id: &str) -> Result<Vec<PhoneEntry>, StoreError> {
        Ok(self
            .phones
            .read()
            .values()
            .filter(|p| p.campaign_id == campaign_id && p.entry.is_active())
            .map(|p| p.entry.clone())
            .collect())
    }

    async fn is_phone_active(&self, phone_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .phones
            .read()
            .get(phone_id)
            .is_some_and(|p| p.entry.is_active()))
    }
}

#[async_trait]
impl RotationCounter for MemoryStore {
    async fn increment(&self, campaign_id: &str) -> Result<u64, StoreError> {
        if let Some(counter) = self.counters.read().get(campaign_id) {
            return Ok(counter.fetch_add(1, Ordering::SeqCst) + 1);
        }

        let mut counters = self.counters.write();
        let counter = counters
            .entry(campaign_id.to_string())
            .or_insert_with(|| AtomicU64::new(0));
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl StickyStore for MemoryStore {
    async fn get(
        &self,
        campaign_id: &str,
        fingerprint: &str,
    ) -> Result<Option<StickyMapping>, StoreError> {
        let now = self.clock.now();
        let key = (campaign_id.to_string(), fingerprint.to_string());
        Ok(self
            .sticky
            .read()
            .get(&key)
            .filter(|m| m.expires_at > now)
            .cloned())
    }

    async fn set(
        &self,
        campaign_id: &str,
        fingerprint: &str,
        phone_id: &str,
        ttl_hours: u32,
    ) -> Result<(), StoreError> {
        let mapping = StickyMapping {
            phone_id: phone_id.to_string(),
            expires_at: self.clock.now() + Duration::hours(i64::from(ttl_hours)),
        };
        self.sticky
            .write()
            .insert((campaign_id.to_string(), fingerprint.to_string()), mapping);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut sticky = self.sticky.write();
        let before = sticky.len();
        sticky.retain(|_, m| m.expires_at > now);
        Ok(before - sticky.len())
    }
}

#[async_trait]
impl UsageRecorder for MemoryStore {
    async fn record_phone_usage(&self, phone_id: &str) -> Result<(), StoreError> {
        *self.usage.lock().entry(phone_id.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn store() -> (ManualClock, Arc<MemoryStore>) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap());
        let store = Arc::new(MemoryStore::new(Arc::new(clock.clone())));
        (clock, store)
    }

    #[tokio::test]
    async fn test_eligible_phones_keep_insertion_order() {
        let (_clock, store) = store();
        store.add_phone("c1", PhoneEntry::new("p1", "+1001"));
        store.add_phone("c2", PhoneEntry::new("other", "+2001"));
        store.add_phone("c1", PhoneEntry::new("p2", "+1002"));
        store.add_phone("c1", PhoneEntry::new("p3", "+1003"));

        let ids = |phones: Vec<PhoneEntry>| phones.into_iter().map(|p| p.id).collect::<Vec<_>>();

        assert_eq!(
            ids(store.eligible_phones("c1").await.unwrap()),
            vec!["p1", "p2", "p3"]
        );

        assert!(store.set_phone_status("p2", PhoneStatus::Paused));
        assert_eq!(
            ids(store.eligible_phones("c1").await.unwrap()),
            vec!["p1", "p3"]
        );
        assert!(!store.is_phone_active("p2").await.unwrap());
        assert!(store.is_phone_active("p3").await.unwrap());
        assert!(!store.is_phone_active("missing").await.unwrap());

        assert!(store.remove_phone("p1"));
        assert_eq!(ids(store.eligible_phones("c1").await.unwrap()), vec!["p3"]);
        assert!(store.eligible_phones("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counter_starts_at_one() {
        let (_clock, store) = store();
        assert_eq!(store.counter_value("c1"), 0);
        assert_eq!(store.increment("c1").await.unwrap(), 1);
        assert_eq!(store.increment("c1").await.unwrap(), 2);
        assert_eq!(store.increment("c2").await.unwrap(), 1);
        assert_eq!(store.counter_value("c1"), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_unique() {
        let (_clock, store) = store();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..250 {
                    seen.push(store.increment("c1").await.unwrap());
                }
                seen
            }));
        }

        let mut all = HashSet::new();
        for handle in handles {
            for value in handle.await.unwrap() {
                assert!(all.insert(value), "duplicate counter value {value}");
            }
        }
        assert_eq!(all.len(), 2000);
        assert_eq!(all.iter().max(), Some(&2000));
    }

    #[tokio::test]
    async fn test_sticky_mappings_expire() {
        let (clock, store) = store();
        store.set("c1", "fp", "p1", 24).await.unwrap();

        let mapping = store.get("c1", "fp").await.unwrap().unwrap();
        assert_eq!(mapping.phone_id, "p1");
        assert!(store.get("c2", "fp").await.unwrap().is_none());

        clock.advance(Duration::hours(23));
        assert!(store.get("c1", "fp").await.unwrap().is_some());

        clock.advance(Duration::hours(1));
        assert!(store.get("c1", "fp").await.unwrap().is_none());
        // Expired but not yet swept.
        assert_eq!(store.sticky_len(), 1);
    }

    #[tokio::test]
    async fn test_sticky_set_overwrites() {
        let (clock, store) = store();
        store.set("c1", "fp", "p1", 1).await.unwrap();
        clock.advance(Duration::minutes(30));
        store.set("c1", "fp", "p2", 1).await.unwrap();

        let mapping = store.get("c1", "fp").await.unwrap().unwrap();
        assert_eq!(mapping.phone_id, "p2");
        assert_eq!(mapping.expires_at, clock.now() + Duration::hours(1));
        assert_eq!(store.sticky_len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let (clock, store) = store();
        store.set("c1", "short", "p1", 1).await.unwrap();
        store.set("c1", "long", "p1", 48).await.unwrap();
        store.set("c2", "short", "p2", 2).await.unwrap();

        assert_eq!(store.cleanup_expired().await.unwrap(), 0);

        clock.advance(Duration::hours(3));
        assert_eq!(store.cleanup_expired().await.unwrap(), 2);
        assert_eq!(store.sticky_len(), 1);
        assert!(store.get("c1", "long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_usage_recording() {
        let (_clock, store) = store();
        store.record_phone_usage("p1").await.unwrap();
        store.record_phone_usage("p1").await.unwrap();
        assert_eq!(store.usage_count("p1"), 2);
        assert_eq!(store.usage_count("p2"), 0);
    }
}
