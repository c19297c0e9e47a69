//! Sticky sessions: pinning a returning visitor to the phone they were given
//! last time.
//!
//! A mapping is advisory. It is only honored while its phone is still active
//! and still part of the eligible pool; otherwise the lookup reports a miss
//! and the next rotation decision overwrites it.

use crate::metrics_defs::{STICKY_LOOKUP, STICKY_WRITE_FAILED};
use crate::store::{PhonePool, StickyStore, StoreError};
use crate::types::{Campaign, PhoneEntry};
use shared::counter;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StickyLookup {
    Hit(PhoneEntry),
    /// No unexpired mapping for this visitor.
    Miss,
    /// A mapping exists but its phone can no longer take leads.
    Stale,
}

impl StickyLookup {
    fn outcome(&self) -> &'static str {
        match self {
            StickyLookup::Hit(_) => "hit",
            StickyLookup::Miss => "miss",
            StickyLookup::Stale => "stale",
        }
    }
}

#[derive(Clone)]
pub struct StickySessions {
    store: Arc<dyn StickyStore>,
    phones: Arc<dyn PhonePool>,
}

impl StickySessions {
    pub fn new(store: Arc<dyn StickyStore>, phones: Arc<dyn PhonePool>) -> Self {
        StickySessions { store, phones }
    }

    /// Resolves the visitor's mapping against the current eligible pool.
    ///
    /// Phone status is re-read with `is_phone_active` rather than trusted from
    /// `eligible`, so a phone paused after the pool was fetched is caught in
    /// most cases. The remaining window is accepted.
    pub async fn lookup(
        &self,
        campaign_id: &str,
        fingerprint: &str,
        eligible: &[PhoneEntry],
    ) -> Result<StickyLookup, StoreError> {
        let result = match self.store.get(campaign_id, fingerprint).await? {
            None => StickyLookup::Miss,
            Some(mapping) => {
                let in_pool = eligible.iter().find(|p| p.id == mapping.phone_id);
                let active = match in_pool {
                    Some(entry) => self.phones.is_phone_active(&entry.id).await?,
                    None => false,
                };
                match in_pool {
                    Some(entry) if active => StickyLookup::Hit(entry.clone()),
                    _ => {
                        tracing::debug!(
                            campaign_id,
                            phone_id = %mapping.phone_id,
                            "ignoring sticky mapping to ineligible phone"
                        );
                        StickyLookup::Stale
                    }
                }
            }
        };

        counter!(STICKY_LOOKUP, "outcome" => result.outcome()).increment(1);
        Ok(result)
    }

    /// Pins the visitor to `phone_id` for the campaign's TTL. A failed write
    /// only costs stickiness for the next click, so it is logged and dropped.
    pub async fn remember(&self, campaign: &Campaign, fingerprint: &str, phone_id: &str) {
        if let Err(e) = self
            .store
            .set(&campaign.id, fingerprint, phone_id, campaign.sticky.ttl_hours)
            .await
        {
            counter!(STICKY_WRITE_FAILED).increment(1);
            tracing::warn!(
                campaign_id = %campaign.id,
                phone_id,
                error = %e,
                "failed to store sticky mapping"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;
    use crate::types::{PhoneStatus, RotationMode, StickyPolicy};
    use chrono::{TimeZone, Utc};

    fn setup() -> (Arc<MemoryStore>, StickySessions) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap());
        let store = Arc::new(MemoryStore::new(Arc::new(clock)));
        store.add_phone("c1", PhoneEntry::new("a", "+1"));
        store.add_phone("c1", PhoneEntry::new("b", "+2"));
        let sessions = StickySessions::new(store.clone(), store.clone());
        (store, sessions)
    }

    fn campaign() -> Campaign {
        Campaign {
            id: "c1".into(),
            slug: "promo".into(),
            default_phone: "+0".into(),
            rotation_mode: RotationMode::RoundRobinShuffled,
            sticky: StickyPolicy {
                enabled: true,
                ttl_hours: 24,
            },
            message: None,
        }
    }

    #[tokio::test]
    async fn test_lookup_outcomes() {
        let (store, sessions) = setup();
        let eligible = store.eligible_phones("c1").await.unwrap();

        assert_eq!(
            sessions.lookup("c1", "fp", &eligible).await.unwrap(),
            StickyLookup::Miss
        );

        sessions.remember(&campaign(), "fp", "b").await;
        assert_eq!(
            sessions.lookup("c1", "fp", &eligible).await.unwrap(),
            StickyLookup::Hit(PhoneEntry::new("b", "+2"))
        );

        // Paused after the pool snapshot was taken.
        store.set_phone_status("b", PhoneStatus::Paused);
        assert_eq!(
            sessions.lookup("c1", "fp", &eligible).await.unwrap(),
            StickyLookup::Stale
        );

        // Mapped phone missing from the pool.
        let eligible = store.eligible_phones("c1").await.unwrap();
        assert_eq!(
            sessions.lookup("c1", "fp", &eligible).await.unwrap(),
            StickyLookup::Stale
        );
    }

    #[tokio::test]
    async fn test_stale_mapping_is_kept_until_overwritten() {
        let (store, sessions) = setup();
        sessions.remember(&campaign(), "fp", "b").await;
        store.remove_phone("b");

        let eligible = store.eligible_phones("c1").await.unwrap();
        assert_eq!(
            sessions.lookup("c1", "fp", &eligible).await.unwrap(),
            StickyLookup::Stale
        );
        assert_eq!(store.sticky_len(), 1);

        sessions.remember(&campaign(), "fp", "a").await;
        assert_eq!(
            sessions.lookup("c1", "fp", &eligible).await.unwrap(),
            StickyLookup::Hit(PhoneEntry::new("a", "+1"))
        );
        assert_eq!(store.sticky_len(), 1);
    }
}
