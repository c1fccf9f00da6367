use std::collections::HashMap;

use parking_lot::RwLock;

use crate::auth::Authenticate;
use crate::user::User;

use log::debug;

/// Remembers the last secret that passed the slow comparison for each user.
///
/// A supplied secret equal to the remembered one is accepted without hashing. Anything else
/// goes through the slow comparison, and only a successful comparison updates the cache.
pub struct CachedAuth {
    cache: RwLock<HashMap<String, String>>,
}

impl CachedAuth {
    pub fn new() -> CachedAuth {
        CachedAuth {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, name: &str, secret: &str) -> bool {
        let cache = self.cache.read();
        match cache.get(name) {
            Some(v) => v == secret,
            None => false,
        }
    }
}

impl Default for CachedAuth {
    fn default() -> CachedAuth {
        CachedAuth::new()
    }
}

impl Authenticate for CachedAuth {
    fn authenticate(&self, user: &User, secret: &str) -> bool {
        if !user.has_secret() || secret.is_empty() {
            return false;
        }
        if self.cached(&user.name, secret) {
            debug!("authenticate {}: using fast path", &user.name);
            return true;
        }

        debug!("authenticate {}: using slow path", &user.name);
        if !user.compare_secret(secret) {
            return false;
        }
        self.cache.write().insert(user.name.clone(), secret.to_string());
        true
    }

    fn forget(&self, name: &str) {
        self.cache.write().remove(name);
    }
}
