//! The selection engine: decides which phone of a campaign receives a click.
//!
//! Decision order, each step short-circuiting:
//!
//! 1. bots get the campaign default phone
//! 2. an empty eligible pool gives the default phone
//! 3. a valid sticky mapping gives the mapped phone
//! 4. otherwise the rotation counter is incremented and indexes into the
//!    seeded shuffle of the pool, and the result is written back as the
//!    visitor's sticky mapping
//!
//! Any storage error before a phone has been chosen yields the default phone
//! with `Provenance::Fallback`. `Selector::select` never fails.

use crate::clock::Clock;
use crate::config::RotationConfig;
use crate::derive::{self, BucketGranularity, TimeBucket};
use crate::metrics_defs::{SELECTION_DURATION, SELECTIONS, STORE_ERRORS};
use crate::shuffle::shuffle;
use crate::sticky::{StickyLookup, StickySessions};
use crate::store::{PhonePool, RotationCounter, StickyStore, StoreError};
use crate::sweeper::Sweeper;
use crate::types::{Campaign, MAX_WEIGHT, PhoneEntry, Provenance, RotationMode, Selection};
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

/// The storage collaborators used by a `Selector`.
#[derive(Clone)]
pub struct Collaborators {
    pub phones: Arc<dyn PhonePool>,
    pub counter: Arc<dyn RotationCounter>,
    pub sticky: Arc<dyn StickyStore>,
}

impl Collaborators {
    /// Uses a single store for every collaborator.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PhonePool + RotationCounter + StickyStore + 'static,
    {
        Collaborators {
            phones: store.clone(),
            counter: store.clone(),
            sticky: store,
        }
    }
}

/// The click being routed.
#[derive(Clone, Copy, Debug)]
pub struct Visitor<'a> {
    pub ip: &'a str,
    pub user_agent: &'a str,
    pub is_bot: bool,
}

pub struct Selector {
    phones: Arc<dyn PhonePool>,
    counter: Arc<dyn RotationCounter>,
    sticky: StickySessions,
    sweeper: Sweeper,
    clock: Arc<dyn Clock>,
    secret: String,
    fingerprint_salt: String,
    epoch_bucket: BucketGranularity,
}

impl Selector {
    /// Builds a selector and spawns its sweeper; needs a tokio runtime.
    pub fn new(config: &RotationConfig, collaborators: Collaborators, clock: Arc<dyn Clock>) -> Self {
        let sweeper = Sweeper::spawn(collaborators.sticky.clone(), config.cleanup_probability);

        Selector {
            sticky: StickySessions::new(collaborators.sticky, collaborators.phones.clone()),
            phones: collaborators.phones,
            counter: collaborators.counter,
            sweeper,
            clock,
            secret: config.secret.clone(),
            fingerprint_salt: config.fingerprint_salt().to_string(),
            epoch_bucket: config.epoch_bucket,
        }
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    pub async fn select(&self, campaign: &Campaign, visitor: &Visitor<'_>) -> Selection {
        let start = Instant::now();

        let selection = if visitor.is_bot {
            Selection::campaign_default(campaign, Provenance::Default)
        } else {
            match self.select_for_human(campaign, visitor).await {
                Ok(selection) => selection,
                Err(e) => {
                    counter!(STORE_ERRORS).increment(1);
                    tracing::warn!(
                        campaign_id = %campaign.id,
                        error = %e,
                        "rotation unavailable, using default phone"
                    );
                    Selection::campaign_default(campaign, Provenance::Fallback)
                }
            }
        };

        counter!(SELECTIONS, "provenance" => selection.provenance.as_str()).increment(1);
        histogram!(SELECTION_DURATION).record(start.elapsed().as_secs_f64());
        tracing::debug!(
            campaign_id = %campaign.id,
            phone_id = ?selection.phone_id,
            provenance = selection.provenance.as_str(),
            "selected phone"
        );
        selection
    }

    async fn select_for_human(
        &self,
        campaign: &Campaign,
        visitor: &Visitor<'_>,
    ) -> Result<Selection, StoreError> {
        let eligible = self.phones.eligible_phones(&campaign.id).await?;
        if eligible.is_empty() {
            return Ok(Selection::campaign_default(campaign, Provenance::Default));
        }

        let fingerprint = campaign.sticky.enabled.then(|| {
            derive::fingerprint(
                visitor.ip,
                visitor.user_agent,
                &campaign.id,
                &self.fingerprint_salt,
            )
        });

        if let Some(fingerprint) = &fingerprint
            && let StickyLookup::Hit(entry) =
                self.sticky.lookup(&campaign.id, fingerprint, &eligible).await?
        {
            return Ok(Selection::from_entry(&entry, Provenance::Sticky));
        }

        let position = self.counter.increment(&campaign.id).await?;
        let order = self.rotation_order(campaign, &eligible);
        let chosen = order[slot(position, order.len())];

        if let Some(fingerprint) = &fingerprint {
            self.sticky.remember(campaign, fingerprint, &chosen.id).await;
        }

        self.sweeper.maybe_request();

        Ok(Selection::from_entry(chosen, Provenance::Rotation))
    }

    /// The cycle the rotation counter walks through for this campaign.
    /// `eligible` must not be empty.
    pub fn rotation_order<'a>(
        &self,
        campaign: &Campaign,
        eligible: &'a [PhoneEntry],
    ) -> Vec<&'a PhoneEntry> {
        let bucket = match campaign.rotation_mode {
            RotationMode::RoundRobinShuffled | RotationMode::Weighted => TimeBucket::Stable,
            RotationMode::RandomNoRepeatEpoch => TimeBucket::Epoch(self.epoch_bucket),
        };
        let seed = derive::rotation_seed(
            &campaign.id,
            &bucket.token(self.clock.now()),
            &self.secret,
        );

        let pool: Vec<&PhoneEntry> = match campaign.rotation_mode {
            RotationMode::Weighted => expand_by_weight(eligible),
            RotationMode::RoundRobinShuffled | RotationMode::RandomNoRepeatEpoch => {
                eligible.iter().collect()
            }
        };

        shuffle(&pool, &seed)
    }
}

/// Repeats each entry `weight` times, in pool order. With all weights at 1
/// this is the pool itself, so weighted campaigns with equal weights rotate
/// exactly like round robin ones. Weights are clamped to `1..=MAX_WEIGHT`.
fn expand_by_weight(eligible: &[PhoneEntry]) -> Vec<&PhoneEntry> {
    eligible
        .iter()
        .flat_map(|entry| {
            std::iter::repeat_n(entry, entry.weight.clamp(1, MAX_WEIGHT) as usize)
        })
        .collect()
}

/// Maps a 1-based rotation counter onto a slot of a cycle of length `len`.
fn slot(position: u64, len: usize) -> usize {
    (position.saturating_sub(1) % len as u64) as usize
}
