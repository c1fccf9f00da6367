use std::fs::{
    create_dir_all,
    File,
};
use std::io::{
    self,
    Read,
};
use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;

use crate::auth::{
    policy,
    Authenticate,
};
use crate::db::{
    Database,
    FileRecord,
    StoreError,
};
use crate::digest::HashAlgorithm;
use crate::meta::{
    ext,
    FileInfo,
};
use crate::record::{
    get as get_record,
    put_immutable,
    record_name,
    Record,
    RecordError,
};
use crate::user::{
    SecretError,
    User,
    DEFAULT_COST,
    MAX_COST,
    MIN_COST,
};

use log::{debug, info, warn};

const TMP_DIR: &str = "tmp";
const DB_DIR: &str = "db";
const DB_FILE: &str = "hashdrop.redb";

/// Default minimum number of hex characters in a short hash.
pub const SHORT_HASH_MIN: usize = 4;

/// Values the service core is configured with.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory to store uploaded content in.
    pub storage_dir: PathBuf,
    /// Prefix of the URL sent to the uploading client.
    pub url_prefix: String,
    /// Digest used for content addressing.
    pub hash: HashAlgorithm,
    /// Minimum short hash length.
    pub short_hash_min: usize,
    /// Work factor for new secrets.
    pub cost: u32,
    /// Use the in-memory secret cache.
    pub user_cache: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            storage_dir: PathBuf::from("store"),
            url_prefix: String::new(),
            hash: HashAlgorithm::default(),
            short_hash_min: SHORT_HASH_MIN,
            cost: DEFAULT_COST,
            user_cache: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("authentication failed")]
    Auth,
    #[error("no such file")]
    NotFound,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cannot prepare {0:?}: {1}")]
    Setup(PathBuf, #[source] io::Error),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Secret(#[from] SecretError),
}

/// Result of a successful upload.
#[derive(Debug)]
pub struct Upload {
    pub record: Record,
    pub short_hash: String,
    /// URL to hand back to the client.
    pub url: String,
}

/// Shared state of the service: storage locations, the database and the authentication policy.
pub struct State {
    db: Database,
    auth: Box<dyn Authenticate>,
    storage_dir: PathBuf,
    tmp_dir: PathBuf,
    url_prefix: String,
    hash: HashAlgorithm,
    short_hash_min: usize,
    cost: u32,
}

/// Location of the database inside a storage directory.
pub fn db_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join(DB_DIR).join(DB_FILE)
}

fn prepare_dir(p: &Path) -> Result<(), StateError> {
    create_dir_all(p).map_err(|e| StateError::Setup(p.to_path_buf(), e))
}

impl State {

    /// Prepare the storage directory and open the database.
    ///
    /// Any failure here leaves the service unusable and must abort startup.
    pub fn new(config: Config) -> Result<State, StateError> {
        if config.short_hash_min == 0 || config.short_hash_min > config.hash.hex_len() {
            return Err(StateError::Config(format!("short hash length must be between 1 and {} for {}", config.hash.hex_len(), config.hash)));
        }
        if !(MIN_COST..=MAX_COST).contains(&config.cost) {
            return Err(StateError::Config(format!("cost must be between {} and {}", MIN_COST, MAX_COST)));
        }

        prepare_dir(&config.storage_dir)?;
        let storage_dir = config.storage_dir.canonicalize()
            .map_err(|e| StateError::Setup(config.storage_dir.clone(), e))?;
        let tmp_dir = storage_dir.join(TMP_DIR);
        prepare_dir(&tmp_dir)?;
        let db_dir = storage_dir.join(DB_DIR);
        prepare_dir(&db_dir)?;

        let db = Database::open(&db_path(&storage_dir))?;

        if config.user_cache {
            info!("using in-memory user cache");
        } else {
            info!("not using in-memory user cache");
        }

        Ok(State {
            db,
            auth: policy(config.user_cache),
            storage_dir,
            tmp_dir,
            url_prefix: config.url_prefix,
            hash: config.hash,
            short_hash_min: config.short_hash_min,
            cost: config.cost,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Look up a user and check the secret.
    ///
    /// An unknown user and a wrong secret produce the same error.
    pub fn authenticate(&self, name: &str, secret: &str) -> Result<User, StateError> {
        let user = match self.db.user(name) {
            Ok(v) => v,
            Err(StoreError::NoUser) => {
                warn!("authenticate: invalid user: {}", name);
                return Err(StateError::Auth);
            },
            Err(e) => {
                return Err(e.into());
            },
        };
        if !self.auth.authenticate(&user, secret) {
            warn!("authenticate: failed authenticate user: {}", &user.name);
            return Err(StateError::Auth);
        }
        Ok(user)
    }

    /// Change the secret of an existing user, proving the current one unless none is set.
    pub fn set_secret(&self, name: &str, current: &str, new: &str) -> Result<(), StateError> {
        let mut user = match self.db.user(name) {
            Ok(v) => v,
            Err(StoreError::NoUser) => {
                return Err(StateError::Auth);
            },
            Err(e) => {
                return Err(e.into());
            },
        };
        user.set_secret(current, new, self.cost)?;
        self.db.save_user(&user)?;
        self.auth.forget(&user.name);
        info!("secret changed for user {}", &user.name);
        Ok(())
    }

    /// Authenticate, store content and hand out its short hash.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the uploading user.
    /// * `secret` - Secret of the uploading user.
    /// * `info` - Uploader supplied metadata.
    /// * `f` - Content body.
    /// * `expected_size` - Size hint for content body, `0` if unknown.
    pub fn upload(&self, name: &str, secret: &str, info: FileInfo, f: impl Read, expected_size: usize) -> Result<Upload, StateError> {
        let user = self.authenticate(name, secret)?;

        let record = put_immutable(&self.storage_dir, &self.tmp_dir, f, expected_size, self.hash)?;

        let file = FileRecord {
            digest: record.digest.clone(),
            path: record_name(&record.digest),
            info,
        };
        if !self.db.put_file(&file)? {
            debug!("content {} already known", &file.path);
        }

        let short_hash = self.db.short_hash(&record.digest, self.short_hash_min)?;
        let url = format!("{}{}{}", &self.url_prefix, &short_hash, ext(&file.info.filename));
        info!("{} stored {:?} --> {} as {}", &user.name, &file.info.filename, &file.path, &short_hash);

        Ok(Upload {
            record,
            short_hash,
            url,
        })
    }

    /// Resolve a short hash to its content record and open the content.
    pub fn download(&self, short_hash: &str) -> Result<(FileRecord, File), StateError> {
        let digest = match self.db.long_hash(short_hash)? {
            Some(v) => v,
            None => {
                debug!("no such short hash: {}", short_hash);
                return Err(StateError::NotFound);
            },
        };
        let file = match self.db.file(&digest) {
            Ok(v) => v,
            Err(StoreError::NoFile) => {
                warn!("short hash {} has no file record", short_hash);
                return Err(StateError::NotFound);
            },
            Err(e) => {
                return Err(e.into());
            },
        };
        match get_record(&self.storage_dir, &file.path) {
            Some(f) => Ok((file, f)),
            None => {
                warn!("content for {} missing at {}", short_hash, &file.path);
                Err(StateError::NotFound)
            },
        }
    }
}
