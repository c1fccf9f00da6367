use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use log::{error, warn};

/// Work factor used for new secrets unless configured otherwise.
///
/// Changing it is not retroactive. Stored secrets keep the cost they were hashed with.
pub const DEFAULT_COST: u32 = 13;

/// Lowest work factor bcrypt accepts.
pub const MIN_COST: u32 = 4;
/// Highest work factor bcrypt accepts.
pub const MAX_COST: u32 = 31;

/// Non-critical information about a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("current secret does not match")]
    Mismatch,
    #[error("new secret is empty")]
    Empty,
    #[error("cannot hash secret: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// A user allowed to upload content.
#[derive(Debug, Clone)]
pub struct User {
    /// Lowercase name of the user.
    pub name: String,
    secret: String,
    pub profile: UserProfile,
}

impl User {

    /// A new user without a secret. Such a user can never authenticate.
    pub fn new(name: &str) -> User {
        User {
            name: name.to_lowercase(),
            secret: String::new(),
            profile: UserProfile::default(),
        }
    }

    pub(crate) fn from_parts(name: String, secret: String, profile: UserProfile) -> User {
        User {
            name,
            secret,
            profile,
        }
    }

    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }

    pub(crate) fn secret_hash(&self) -> &str {
        &self.secret
    }

    /// Compare a plaintext secret against the stored hash.
    ///
    /// This is deliberately slow. An empty stored or supplied secret is always a rejection.
    pub fn compare_secret(&self, secret: &str) -> bool {
        if self.secret.is_empty() || secret.is_empty() {
            return false;
        }
        match bcrypt::verify(secret, &self.secret) {
            Ok(v) => v,
            Err(e) => {
                warn!("stored secret for {} is unusable: {}", &self.name, e);
                false
            },
        }
    }

    /// Set a new secret.
    ///
    /// If the user already has a secret, `current` must match it. Otherwise `current` is
    /// ignored.
    ///
    /// # Arguments
    ///
    /// * `current` - The current plaintext secret.
    /// * `new` - The new plaintext secret.
    /// * `cost` - bcrypt work factor for the new hash.
    pub fn set_secret(&mut self, current: &str, new: &str, cost: u32) -> Result<(), SecretError> {
        if self.has_secret() && !self.compare_secret(current) {
            return Err(SecretError::Mismatch);
        }
        if new.is_empty() {
            return Err(SecretError::Empty);
        }
        self.secret = bcrypt::hash(new, cost).map_err(|e| {
            error!("failed to generate bcrypt hash: {}", e);
            SecretError::from(e)
        })?;
        Ok(())
    }
}
