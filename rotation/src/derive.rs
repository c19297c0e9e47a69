//! Seed and visitor fingerprint derivation. Both are pure SHA-256 digests,
//! hex encoded.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;

pub const STABLE_BUCKET: &str = "stable";

const SEED_DELIMITER: &str = ":";
const FINGERPRINT_DELIMITER: &str = "|";

/// Granularity of the time bucket used by epoch rotation.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BucketGranularity {
    #[default]
    Day,
    Hour,
}

/// Which time token goes into a shuffle seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeBucket {
    /// Never changes, the order is fixed for the campaign.
    Stable,
    /// Changes at every UTC day or hour boundary.
    Epoch(BucketGranularity),
}

impl TimeBucket {
    pub fn token(&self, now: DateTime<Utc>) -> Cow<'static, str> {
        match self {
            TimeBucket::Stable => Cow::Borrowed(STABLE_BUCKET),
            TimeBucket::Epoch(BucketGranularity::Day) => {
                Cow::Owned(now.format("%Y-%m-%d").to_string())
            }
            TimeBucket::Epoch(BucketGranularity::Hour) => {
                Cow::Owned(now.format("%Y-%m-%dT%H").to_string())
            }
        }
    }
}

fn sha256_hex(parts: &[&str], delimiter: &str) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(delimiter.as_bytes());
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub fn rotation_seed(campaign_id: &str, bucket: &str, secret: &str) -> String {
    sha256_hex(&[campaign_id, bucket, secret], SEED_DELIMITER)
}

pub fn fingerprint(ip: &str, user_agent: &str, campaign_id: &str, salt: &str) -> String {
    sha256_hex(&[ip, user_agent, campaign_id, salt], FINGERPRINT_DELIMITER)
}
