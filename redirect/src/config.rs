use rotation::config::{RotationConfig, ValidationError as RotationValidationError};
use rotation::types::{Campaign, MAX_WEIGHT, PhoneEntry, PhoneStatus, RotationMode, StickyPolicy};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Invalid campaign slug: {0:?}")]
    InvalidSlug(String),

    #[error("Duplicate campaign slug: {0}")]
    DuplicateSlug(String),

    #[error("Duplicate campaign id: {0}")]
    DuplicateCampaign(String),

    #[error("Campaign {0} has no default phone")]
    MissingDefaultPhone(String),

    #[error("Duplicate phone id: {0}")]
    DuplicatePhone(String),

    #[error("Phone {0} has an empty number")]
    EmptyPhoneNumber(String),

    #[error("Phone {0} has weight 0")]
    ZeroWeight(String),

    #[error("Phone {0} has weight {1}, above the maximum of {max}", max = MAX_WEIGHT)]
    WeightTooLarge(String, u32),

    #[error("Campaign {0} enables sticky sessions with a zero TTL")]
    ZeroStickyTtl(String),

    #[error(transparent)]
    Rotation(#[from] RotationValidationError),
}

/// Redirect service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Public listener serving campaign links
    #[serde(default)]
    pub listener: Listener,
    /// Listener for health and readiness probes
    #[serde(default = "Listener::admin_default")]
    pub admin_listener: Listener,
    pub rotation: RotationConfig,
    pub campaigns: Vec<CampaignConfig>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.rotation.validate()?;

        let mut slugs = HashSet::new();
        let mut campaign_ids = HashSet::new();
        let mut phone_ids = HashSet::new();

        for campaign in &self.campaigns {
            campaign.validate()?;

            if !slugs.insert(&campaign.slug) {
                return Err(ValidationError::DuplicateSlug(campaign.slug.clone()));
            }
            if !campaign_ids.insert(&campaign.id) {
                return Err(ValidationError::DuplicateCampaign(campaign.id.clone()));
            }
            // Phone status is looked up by id alone, so ids are global.
            for phone in &campaign.phones {
                if !phone_ids.insert(&phone.id) {
                    return Err(ValidationError::DuplicatePhone(phone.id.clone()));
                }
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

impl Listener {
    fn admin_default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3001,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CampaignConfig {
    pub id: String,
    /// Path segment of the public link, e.g. `promo` for `/promo`
    pub slug: String,
    /// Used for bots, empty pools and whenever rotation is unavailable
    pub default_phone: String,
    pub rotation_mode: RotationMode,
    #[serde(default)]
    pub sticky: StickyPolicy,
    /// Prefilled chat message
    pub message: Option<String>,
    /// Phones in rotation order; order matters for determinism
    #[serde(default)]
    pub phones: Vec<PhoneConfig>,
}

impl CampaignConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let slug_ok = !self.slug.is_empty()
            && self
                .slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !slug_ok {
            return Err(ValidationError::InvalidSlug(self.slug.clone()));
        }

        if self.default_phone.trim().is_empty() {
            return Err(ValidationError::MissingDefaultPhone(self.id.clone()));
        }

        if self.sticky.enabled && self.sticky.ttl_hours == 0 {
            return Err(ValidationError::ZeroStickyTtl(self.id.clone()));
        }

        for phone in &self.phones {
            if phone.number.trim().is_empty() {
                return Err(ValidationError::EmptyPhoneNumber(phone.id.clone()));
            }
            if phone.weight == 0 {
                return Err(ValidationError::ZeroWeight(phone.id.clone()));
            }
            if phone.weight > MAX_WEIGHT {
                return Err(ValidationError::WeightTooLarge(phone.id.clone(), phone.weight));
            }
        }

        Ok(())
    }

    pub fn campaign(&self) -> Campaign {
        Campaign {
            id: self.id.clone(),
            slug: self.slug.clone(),
            default_phone: self.default_phone.clone(),
            rotation_mode: self.rotation_mode,
            sticky: self.sticky,
            message: self.message.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PhoneConfig {
    pub id: String,
    pub number: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub status: PhoneStatus,
}

fn default_weight() -> u32 {
    1
}

impl PhoneConfig {
    pub fn entry(&self) -> PhoneEntry {
        PhoneEntry::new(self.id.clone(), self.number.clone())
            .with_weight(self.weight)
            .with_status(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
listener:
    host: "0.0.0.0"
    port: 8080
admin_listener:
    host: "127.0.0.1"
    port: 8081
rotation:
    secret: s3cret
    epoch_bucket: hour
campaigns:
    - id: c1
      slug: promo
      default_phone: "+55 11 90000-0000"
      rotation_mode: weighted
      sticky:
        enabled: true
        ttl_hours: 12
      message: "Hi there"
      phones:
        - id: p1
          number: "+55 11 90000-0001"
          weight: 3
        - id: p2
          number: "+55 11 90000-0002"
          status: paused
    - id: c2
      slug: black-friday
      default_phone: "+1 555 0100"
      rotation_mode: round_robin_shuffled
"#;

    #[test]
    fn test_parse_valid_config() {
        let config: Config = serde_yaml::from_str(VALID_CONFIG).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.campaigns.len(), 2);

        let c1 = &config.campaigns[0];
        assert_eq!(c1.rotation_mode, RotationMode::Weighted);
        assert_eq!(c1.sticky.ttl_hours, 12);
        assert_eq!(c1.phones[0].weight, 3);
        assert_eq!(c1.phones[1].weight, 1);
        assert_eq!(c1.phones[1].status, PhoneStatus::Paused);

        let c2 = &config.campaigns[1];
        assert!(!c2.sticky.enabled);
        assert!(c2.phones.is_empty());
        assert_eq!(c2.message, None);

        let campaign = c1.campaign();
        assert_eq!(campaign.slug, "promo");
        assert_eq!(campaign.message.as_deref(), Some("Hi there"));
        assert!(!c1.phones[1].entry().is_active());
    }

    #[test]
    fn test_listener_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
rotation: {secret: s}
campaigns: []
"#,
        )
        .unwrap();
        assert_eq!(config.listener.port, 3000);
        assert_eq!(config.admin_listener.port, 3001);
    }

    #[test]
    fn test_unknown_rotation_mode_is_rejected() {
        let yaml = VALID_CONFIG.replace("rotation_mode: weighted", "rotation_mode: sequential");
        assert!(serde_yaml::from_str::<Config>(&yaml).is_err());
    }

    #[test]
    fn test_validation_errors() {
        let base: Config = serde_yaml::from_str(VALID_CONFIG).unwrap();

        let mut config = base.clone();
        config.admin_listener.port = 0;
        assert_eq!(config.validate(), Err(ValidationError::InvalidPort));

        let mut config = base.clone();
        config.campaigns[1].slug = "promo".into();
        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateSlug("promo".into()))
        );

        let mut config = base.clone();
        config.campaigns[1].id = "c1".into();
        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateCampaign("c1".into()))
        );

        let mut config = base.clone();
        let duplicate = config.campaigns[0].phones[0].clone();
        config.campaigns[1].phones.push(duplicate);
        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicatePhone("p1".into()))
        );

        let mut config = base.clone();
        config.campaigns[0].slug = "has/slash".into();
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidSlug("has/slash".into()))
        );

        let mut config = base.clone();
        config.campaigns[0].default_phone = " ".into();
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingDefaultPhone("c1".into()))
        );

        let mut config = base.clone();
        config.campaigns[0].phones[0].weight = 0;
        assert_eq!(
            config.validate(),
            Err(ValidationError::ZeroWeight("p1".into()))
        );

        let mut config = base.clone();
        config.campaigns[0].phones[0].weight = 4_000_000_000;
        assert_eq!(
            config.validate(),
            Err(ValidationError::WeightTooLarge("p1".into(), 4_000_000_000))
        );

        let mut config = base.clone();
        config.campaigns[0].phones[0].weight = MAX_WEIGHT;
        assert!(config.validate().is_ok());

        let mut config = base.clone();
        config.campaigns[0].phones[1].number = "".into();
        assert_eq!(
            config.validate(),
            Err(ValidationError::EmptyPhoneNumber("p2".into()))
        );

        let mut config = base.clone();
        config.campaigns[0].sticky.ttl_hours = 0;
        assert_eq!(
            config.validate(),
            Err(ValidationError::ZeroStickyTtl("c1".into()))
        );

        let mut config = base;
        config.rotation.secret = "".into();
        assert_eq!(
            config.validate(),
            Err(ValidationError::Rotation(RotationValidationError::EmptySecret))
        );
    }
}
