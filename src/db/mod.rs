//! Persisted user, file and short hash records.
//!
//! Database layout:
//!
//! ``` ignore,
//! users:         <name>      -> { secret, profile }
//! files:         <digest>    -> { path, info }
//! short_hashes:  <hexprefix> -> <digest>
//! digest_short:  <digest>    -> <hexprefix>
//! ```
//!
//! Every table is created when the database is opened, so that lookups never have to handle a
//! missing table.
use std::path::Path;

use redb::{
    Database as Redb,
    ReadableTable,
    TableDefinition,
};
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::meta::FileInfo;
use crate::user::{
    User,
    UserProfile,
};

use log::{debug, info};

/// Short hash allocation and lookup.
pub mod shorthash;

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const FILES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("files");
pub(crate) const SHORT_HASHES: TableDefinition<&str, &[u8]> = TableDefinition::new("short_hashes");
const DIGEST_SHORT: TableDefinition<&[u8], &str> = TableDefinition::new("digest_short");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("transaction: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("table: {0}")]
    Table(#[from] redb::TableError),
    #[error("storage: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("commit: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("record encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("user does not exist")]
    NoUser,
    #[error("file does not exist")]
    NoFile,
    #[error("no free short hash for {0}")]
    Exhausted(String),
    #[error("invalid record: {0}")]
    Invalid(&'static str),
}

impl StoreError {
    /// The database file is held open by another process, usually a running server.
    pub fn is_locked(&self) -> bool {
        matches!(self, StoreError::Database(redb::DatabaseError::DatabaseAlreadyOpen))
    }
}

#[derive(Serialize, Deserialize)]
struct UserEntry {
    secret: String,
    #[serde(default)]
    profile: UserProfile,
}

#[derive(Serialize, Deserialize)]
struct FileEntry {
    path: String,
    #[serde(default)]
    info: FileInfo,
}

/// Metadata of stored content.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Digest of the content.
    pub digest: Vec<u8>,
    /// Location of the content relative to the storage directory.
    pub path: String,
    pub info: FileInfo,
}

pub struct Database {
    db: Redb,
}

impl Database {

    /// Open or create the database file at `path` and make sure all tables exist.
    pub fn open(path: &Path) -> Result<Database, StoreError> {
        let db = Redb::create(path)?;
        let txn = db.begin_write()?;
        {
            txn.open_table(USERS)?;
            txn.open_table(FILES)?;
            txn.open_table(SHORT_HASHES)?;
            txn.open_table(DIGEST_SHORT)?;
        }
        txn.commit()?;
        info!("opened database {:?}", path);
        Ok(Database {
            db,
        })
    }

    /// Retrieve a user by name. Names are case-insensitive.
    pub fn user(&self, name: &str) -> Result<User, StoreError> {
        let name = name.to_lowercase();
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USERS)?;
        let entry: UserEntry = match table.get(name.as_str())? {
            Some(v) => serde_json::from_slice(v.value())?,
            None => {
                return Err(StoreError::NoUser);
            },
        };
        Ok(User::from_parts(name, entry.secret, entry.profile))
    }

    /// Create or replace a user. The user must have a name and a secret.
    pub fn save_user(&self, user: &User) -> Result<(), StoreError> {
        if user.name.is_empty() {
            return Err(StoreError::Invalid("empty user name"));
        }
        if !user.has_secret() {
            return Err(StoreError::Invalid("empty secret"));
        }
        let entry = UserEntry {
            secret: user.secret_hash().to_string(),
            profile: user.profile.clone(),
        };
        let v = serde_json::to_vec(&entry)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(USERS)?;
            table.insert(user.name.as_str(), v.as_slice())?;
        }
        txn.commit()?;
        debug!("saved user {}", &user.name);
        Ok(())
    }

    /// Retrieve the record of stored content by digest.
    pub fn file(&self, digest: &[u8]) -> Result<FileRecord, StoreError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FILES)?;
        let entry: FileEntry = match table.get(digest)? {
            Some(v) => serde_json::from_slice(v.value())?,
            None => {
                return Err(StoreError::NoFile);
            },
        };
        Ok(FileRecord {
            digest: digest.to_vec(),
            path: entry.path,
            info: entry.info,
        })
    }

    /// Store a content record unless one already exists for the digest.
    ///
    /// Returns `true` if the record was written. An existing record is left unchanged.
    pub fn put_file(&self, file: &FileRecord) -> Result<bool, StoreError> {
        if file.digest.is_empty() {
            return Err(StoreError::Invalid("empty file digest"));
        }
        if file.path.is_empty() {
            return Err(StoreError::Invalid("empty file path"));
        }
        let entry = FileEntry {
            path: file.path.clone(),
            info: file.info.clone(),
        };
        let v = serde_json::to_vec(&entry)?;
        let txn = self.db.begin_write()?;
        let exists = {
            let mut table = txn.open_table(FILES)?;
            let exists = table.get(file.digest.as_slice())?.is_some();
            if !exists {
                table.insert(file.digest.as_slice(), v.as_slice())?;
            }
            exists
        };
        if exists {
            txn.abort()?;
            debug!("file record for {} already exists", hex::encode(&file.digest));
            return Ok(false);
        }
        txn.commit()?;
        Ok(true)
    }
}


#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{
        Database,
        FileRecord,
        StoreError,
    };
    use crate::meta::FileInfo;
    use crate::user::User;

    #[test]
    fn test_user_roundtrip() {
        let d = tempdir().unwrap();
        let db = Database::open(&d.path().join("test.redb")).unwrap();

        let mut u = User::new("Moradi");
        u.set_secret("", "hunter2", 4).unwrap();
        db.save_user(&u).unwrap();

        let r = db.user("MORADI").unwrap();
        assert_eq!(r.name, "moradi");
        assert!(r.compare_secret("hunter2"));
        assert!(!r.compare_secret("2hunter"));
    }

    #[test]
    fn test_user_missing() {
        let d = tempdir().unwrap();
        let db = Database::open(&d.path().join("test.redb")).unwrap();
        assert!(matches!(db.user("nobody"), Err(StoreError::NoUser)));
    }

    #[test]
    fn test_user_save_requires_secret() {
        let d = tempdir().unwrap();
        let db = Database::open(&d.path().join("test.redb")).unwrap();
        let u = User::new("moradi");
        assert!(matches!(db.save_user(&u), Err(StoreError::Invalid(_))));
        assert!(matches!(db.user("moradi"), Err(StoreError::NoUser)));

        let mut u = User::new("");
        u.set_secret("", "hunter2", 4).unwrap();
        assert!(matches!(db.save_user(&u), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn test_file_first_record_kept() {
        let d = tempdir().unwrap();
        let db = Database::open(&d.path().join("test.redb")).unwrap();
        let digest = hex::decode("a9993e364706816aba3e25717850c26c9cd0d89d").unwrap();
        let mut f = FileRecord {
            digest: digest.clone(),
            path: "a9993e364706816aba3e25717850c26c9cd0d89d".to_string(),
            info: FileInfo {
                filename: "abc.txt".to_string(),
                content_type: None,
            },
        };
        assert!(db.put_file(&f).unwrap());

        f.info.filename = "other.bin".to_string();
        assert!(!db.put_file(&f).unwrap());

        let r = db.file(&digest).unwrap();
        assert_eq!(r.info.filename, "abc.txt");
        assert_eq!(r.path, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert!(matches!(db.file(b"nope"), Err(StoreError::NoFile)));
    }

    #[test]
    fn test_open_locked() {
        let d = tempdir().unwrap();
        let path = d.path().join("test.redb");
        let _db = Database::open(&path).unwrap();
        match Database::open(&path) {
            Err(e) => {
                assert!(e.is_locked());
            },
            Ok(_) => {
                panic!("database opened twice");
            },
        }
        assert!(!StoreError::NoUser.is_locked());
    }

    #[test]
    fn test_reopen_keeps_records() {
        let d = tempdir().unwrap();
        let p = d.path().join("test.redb");
        {
            let db = Database::open(&p).unwrap();
            let mut u = User::new("moradi");
            u.set_secret("", "hunter2", 4).unwrap();
            db.save_user(&u).unwrap();
        }
        let db = Database::open(&p).unwrap();
        assert!(db.user("moradi").unwrap().compare_secret("hunter2"));
    }
}
