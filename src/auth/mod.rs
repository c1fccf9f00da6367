//! Upload authentication.
//!
//! Clients authenticate every upload with the HTTP `Basic` scheme:
//!
//! ``` ignore,
//! Authorization: Basic base64(<name>:<secret>)
//! ```
//!
//! The secret is checked against the user record with one of two [Authenticate] policies,
//! chosen when the server starts:
//!
//! * [cache::CachedAuth] remembers the plaintext secret of each user after the first successful
//! check, and compares later attempts against it directly. This avoids the cost of the slow
//! hash comparison for repeat uploads, at the price of holding plaintext secrets in memory for
//! the lifetime of the process. Nothing is ever written to disk.
//! * [crypt::CryptAuth] always performs the slow hash comparison.
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::user::User;

/// In-memory cache of verified secrets.
pub mod cache;

/// Verification against the stored hash only.
pub mod crypt;

/// Credentials submitted by the client.
pub struct AuthSpec {
    pub name: String,
    secret: String,
}

#[derive(Debug, Error)]
#[error("auth string malformed")]
pub struct AuthSpecError;

impl AuthSpec {
    pub fn new(name: &str, secret: &str) -> AuthSpec {
        AuthSpec {
            name: name.to_string(),
            secret: secret.to_string(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl FromStr for AuthSpec {
    type Err = AuthSpecError;

    fn from_str(s: &str) -> Result<AuthSpec, AuthSpecError> {
        let (scheme, v) = s.trim().split_once(' ').ok_or(AuthSpecError)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(AuthSpecError);
        }
        let decoded = base64::decode(v.trim()).map_err(|_| AuthSpecError)?;
        let credentials = String::from_utf8(decoded).map_err(|_| AuthSpecError)?;
        let (name, secret) = credentials.split_once(':').ok_or(AuthSpecError)?;
        if name.is_empty() {
            return Err(AuthSpecError);
        }
        Ok(AuthSpec::new(name, secret))
    }
}

impl fmt::Debug for AuthSpec {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "basic {}", self.name)
    }
}

/// Checks a plaintext secret against a user record.
pub trait Authenticate: Send + Sync {

    /// Returns `true` if `secret` is the secret of `user`.
    ///
    /// A user without a secret never authenticates.
    fn authenticate(&self, user: &User, secret: &str) -> bool;

    /// Drop anything remembered about the named user.
    fn forget(&self, _name: &str) {
    }
}

/// Select the authentication policy.
pub fn policy(use_cache: bool) -> Box<dyn Authenticate> {
    if use_cache {
        Box::new(cache::CachedAuth::new())
    } else {
        Box::new(crypt::CryptAuth)
    }
}


#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::AuthSpec;

    #[test]
    fn test_auth_spec_basic() {
        let v = format!("Basic {}", base64::encode("moradi:hunter2"));
        let spec = AuthSpec::from_str(&v).unwrap();
        assert_eq!(spec.name, "moradi");
        assert_eq!(spec.secret(), "hunter2");

        let v = format!("basic {}", base64::encode("moradi:hun:ter2"));
        let spec = AuthSpec::from_str(&v).unwrap();
        assert_eq!(spec.secret(), "hun:ter2");
    }

    #[test]
    fn test_auth_spec_empty_secret() {
        let v = format!("Basic {}", base64::encode("moradi:"));
        let spec = AuthSpec::from_str(&v).unwrap();
        assert_eq!(spec.secret(), "");
    }

    #[test]
    fn test_auth_spec_malformed() {
        assert!(AuthSpec::from_str("PUBSIG foo:bar:baz").is_err());
        assert!(AuthSpec::from_str("Basic").is_err());
        assert!(AuthSpec::from_str("Basic !!!").is_err());
        let v = format!("Basic {}", base64::encode("moradi"));
        assert!(AuthSpec::from_str(&v).is_err());
        let v = format!("Basic {}", base64::encode(":hunter2"));
        assert!(AuthSpec::from_str(&v).is_err());
    }

    #[test]
    fn test_auth_spec_debug_hides_secret() {
        let spec = AuthSpec::new("moradi", "hunter2");
        assert!(!format!("{:?}", spec).contains("hunter2"));
    }
}
