use crate::derive::BucketGranularity;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("rotation secret cannot be empty")]
    EmptySecret,

    #[error("cleanup probability must be within [0, 1], got {0}")]
    InvalidCleanupProbability(f64),
}

/// Server-side settings shared by every campaign.
#[derive(Clone, Deserialize, PartialEq)]
pub struct RotationConfig {
    /// Mixed into every shuffle seed, so orders can't be predicted from the
    /// campaign id alone.
    pub secret: String,
    /// Salt for visitor fingerprints. Defaults to `secret`.
    #[serde(default)]
    pub fingerprint_salt: Option<String>,
    /// Reshuffle period for `random_no_repeat_epoch` campaigns.
    #[serde(default)]
    pub epoch_bucket: BucketGranularity,
    /// Chance that a rotation decision also queues an expired-mapping sweep.
    #[serde(default = "default_cleanup_probability")]
    pub cleanup_probability: f64,
}

fn default_cleanup_probability() -> f64 {
    0.01
}

impl RotationConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        RotationConfig {
            secret: secret.into(),
            fingerprint_salt: None,
            epoch_bucket: BucketGranularity::default(),
            cleanup_probability: default_cleanup_probability(),
        }
    }

    pub fn fingerprint_salt(&self) -> &str {
        self.fingerprint_salt.as_deref().unwrap_or(&self.secret)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secret.is_empty() {
            return Err(ValidationError::EmptySecret);
        }

        if !(0.0..=1.0).contains(&self.cleanup_probability) {
            return Err(ValidationError::InvalidCleanupProbability(
                self.cleanup_probability,
            ));
        }

        Ok(())
    }
}

// Keeps the secret and salt out of logs.
impl std::fmt::Debug for RotationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationConfig")
            .field("secret", &"<redacted>")
            .field(
                "fingerprint_salt",
                &self.fingerprint_salt.as_ref().map(|_| "<redacted>"),
            )
            .field("epoch_bucket", &self.epoch_bucket)
            .field("cleanup_probability", &self.cleanup_probability)
            .finish()
    }
}
