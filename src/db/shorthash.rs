//! A short hash is the shortest prefix of the hex digest that is not taken by another digest,
//! and never shorter than a configured minimum.
//!
//! Each candidate length is checked and claimed inside its own write transaction. Write
//! transactions are serialized by the database, so of two digests racing for the same prefix
//! exactly one wins it and the other moves on to the next length. The claim also records the
//! short hash under the digest, which is checked first, so a digest keeps its first short hash.
use redb::ReadableTable;

use crate::db::{
    Database,
    StoreError,
    DIGEST_SHORT,
    SHORT_HASHES,
};

use log::{debug, info};

enum Claim {
    Claimed,
    Existing(String),
    Collision,
}

impl Database {

    fn claim(&self, candidate: &str, digest: &[u8]) -> Result<Claim, StoreError> {
        let txn = self.db.begin_write()?;
        let claim = {
            let mut reverse = txn.open_table(DIGEST_SHORT)?;
            let known = reverse.get(digest)?.map(|v| v.value().to_string());
            match known {
                Some(v) => Claim::Existing(v),
                None => {
                    let mut table = txn.open_table(SHORT_HASHES)?;
                    let existing = table.get(candidate)?.map(|v| v.value().to_vec());
                    match existing {
                        Some(v) if v != digest => Claim::Collision,
                        _ => {
                            table.insert(candidate, digest)?;
                            reverse.insert(digest, candidate)?;
                            Claim::Claimed
                        },
                    }
                },
            }
        };
        match claim {
            Claim::Claimed => txn.commit()?,
            _ => txn.abort()?,
        };
        Ok(claim)
    }

    /// Return the short hash for a digest, allocating one if the digest has none yet.
    ///
    /// A digest has at most one short hash. Calling this again with the same digest returns the
    /// same short hash, also when `min_len` has changed since it was allocated.
    ///
    /// # Arguments
    ///
    /// * `digest` - Content digest to allocate for.
    /// * `min_len` - Minimum number of hex characters in a newly allocated short hash.
    pub fn short_hash(&self, digest: &[u8], min_len: usize) -> Result<String, StoreError> {
        if digest.is_empty() {
            return Err(StoreError::Invalid("empty digest"));
        }
        if min_len == 0 {
            return Err(StoreError::Invalid("zero short hash length"));
        }
        let digest_hex = hex::encode(digest);
        if let Some(v) = self.digest_short_hash(digest)? {
            debug!("reusing short hash {} for {}", &v, &digest_hex);
            return Ok(v);
        }
        for l in min_len..=digest_hex.len() {
            let candidate = &digest_hex[..l];
            match self.claim(candidate, digest)? {
                Claim::Claimed => {
                    info!("allocated short hash {} for {}", candidate, &digest_hex);
                    return Ok(candidate.to_string());
                },
                Claim::Existing(v) => {
                    debug!("reusing short hash {} for {}", &v, &digest_hex);
                    return Ok(v);
                },
                Claim::Collision => {
                    debug!("short hash {} taken, trying length {}", candidate, l + 1);
                },
            }
        }
        Err(StoreError::Exhausted(digest_hex))
    }

    fn digest_short_hash(&self, digest: &[u8]) -> Result<Option<String>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DIGEST_SHORT)?;
        let r = table.get(digest)?.map(|v| v.value().to_string());
        Ok(r)
    }

    /// Look up the digest a short hash denotes.
    pub fn long_hash(&self, short: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SHORT_HASHES)?;
        let r = table.get(short)?.map(|v| v.value().to_vec());
        Ok(r)
    }
}
