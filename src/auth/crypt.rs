use crate::auth::Authenticate;
use crate::user::User;

/// Always performs the slow comparison against the stored hash. No secret is retained.
pub struct CryptAuth;

impl Authenticate for CryptAuth {
    fn authenticate(&self, user: &User, secret: &str) -> bool {
        user.compare_secret(secret)
    }
}
