use serde::Deserialize;
use std::fmt;

pub type CampaignId = String;
pub type PhoneId = String;

/// Upper bound on a phone's weight. Weighted rotation materializes one slot
/// per unit of weight on every decision.
pub const MAX_WEIGHT: u32 = 1000;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PhoneStatus {
    #[default]
    Active,
    Paused,
}

/// A destination phone number within a campaign's pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhoneEntry {
    pub id: PhoneId,
    pub number: String,
    pub status: PhoneStatus,
    /// Share of the rotation in weighted mode, within `1..=MAX_WEIGHT`.
    pub weight: u32,
}

impl PhoneEntry {
    pub fn new<I, N>(id: I, number: N) -> Self
    where
        I: Into<String>,
        N: Into<String>,
    {
        PhoneEntry {
            id: id.into(),
            number: number.into(),
            status: PhoneStatus::Active,
            weight: 1,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_status(mut self, status: PhoneStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == PhoneStatus::Active
    }
}

/// How successive clicks are spread over a campaign's pool.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Fixed shuffled order, walked by the rotation counter.
    RoundRobinShuffled,
    /// Like round robin, but the order is reshuffled every time bucket.
    RandomNoRepeatEpoch,
    /// Each phone occupies `weight` slots of the shuffled order.
    Weighted,
}

impl RotationMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RotationMode::RoundRobinShuffled => "round_robin_shuffled",
            RotationMode::RandomNoRepeatEpoch => "random_no_repeat_epoch",
            RotationMode::Weighted => "weighted",
        }
    }
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct StickyPolicy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
}

fn default_ttl_hours() -> u32 {
    24
}

impl Default for StickyPolicy {
    fn default() -> Self {
        StickyPolicy {
            enabled: false,
            ttl_hours: default_ttl_hours(),
        }
    }
}

/// The parts of a campaign the selection engine reads. The phone pool itself
/// is served by a `PhonePool` so that status changes are seen immediately.
#[derive(Clone, Debug, PartialEq)]
pub struct Campaign {
    pub id: CampaignId,
    pub slug: String,
    pub default_phone: String,
    pub rotation_mode: RotationMode,
    pub sticky: StickyPolicy,
    pub message: Option<String>,
}

/// Why a phone was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provenance {
    Default,
    Sticky,
    Rotation,
    Fallback,
}

impl Provenance {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Provenance::Default => "default",
            Provenance::Sticky => "sticky",
            Provenance::Rotation => "rotation",
            Provenance::Fallback => "fallback",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub phone_number: String,
    /// `None` when the campaign default phone was used.
    pub phone_id: Option<PhoneId>,
    pub provenance: Provenance,
}

impl Selection {
    pub fn campaign_default(campaign: &Campaign, provenance: Provenance) -> Self {
        Selection {
            phone_number: campaign.default_phone.clone(),
            phone_id: None,
            provenance,
        }
    }

    pub fn from_entry(entry: &PhoneEntry, provenance: Provenance) -> Self {
        Selection {
            phone_number: entry.number.clone(),
            phone_id: Some(entry.id.clone()),
            provenance,
        }
    }
}
