//! Contracts for the storage collaborators the selection engine depends on.
//!
//! Implementations own all shared state and its consistency. In particular
//! `RotationCounter::increment` must be an atomic increment-and-return: two
//! concurrent callers never observe the same value.

use crate::types::{PhoneEntry, PhoneId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage operation timed out")]
    Timeout,
}

/// A fingerprint to phone binding, as returned by `StickyStore::get`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StickyMapping {
    pub phone_id: PhoneId,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait PhonePool: Send + Sync {
    /// Active phones of the campaign, in a stable (insertion) order.
    async fn eligible_phones(&self, campaign_id: &str) -> Result<Vec<PhoneEntry>, StoreError>;

    async fn is_phone_active(&self, phone_id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait RotationCounter: Send + Sync {
    /// Atomically increments the campaign counter and returns the new value.
    /// The first call for a campaign returns 1.
    async fn increment(&self, campaign_id: &str) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait StickyStore: Send + Sync {
    /// Returns the mapping only if it has not expired.
    async fn get(
        &self,
        campaign_id: &str,
        fingerprint: &str,
    ) -> Result<Option<StickyMapping>, StoreError>;

    /// Inserts or replaces the mapping for `(campaign_id, fingerprint)`.
    async fn set(
        &self,
        campaign_id: &str,
        fingerprint: &str,
        phone_id: &str,
        ttl_hours: u32,
    ) -> Result<(), StoreError>;

    /// Deletes expired mappings and returns how many were removed.
    async fn cleanup_expired(&self) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait UsageRecorder: Send + Sync {
    async fn record_phone_usage(&self, phone_id: &str) -> Result<(), StoreError>;
}
