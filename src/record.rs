use std::fs::{
    create_dir_all,
    File,
};
use std::io::{
    self,
    copy,
    Read,
};
use std::path::{
    Path,
    PathBuf,
};

use tempfile::Builder as TempBuilder;
use thiserror::Error;

use crate::digest::{
    HashAlgorithm,
    HashReader,
};

use log::{debug, info};


/// Durable copy of uploaded content, addressed by its digest.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub digest: Vec<u8>,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("cannot open temporary file: {0}")]
    TempFile(#[source] io::Error),
    #[error("cannot copy content to temporary file: {0}")]
    Copy(#[source] io::Error),
    #[error("content length mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        expected: usize,
        actual: u64,
    },
    #[error("cannot create directory for content: {0}")]
    Directory(#[source] io::Error),
    #[error("cannot move content into place: {0}")]
    Persist(#[source] io::Error),
}

/// Storage location of content relative to the storage root.
pub fn record_name(digest: &[u8]) -> String {
    hex::encode(digest)
}

/// Store content from a reader under the hex of its digest.
///
/// The content is staged in a temporary file inside `tmp_path`, which must be on the same
/// filesystem as `path`, and moved into place by rename once the digest is known. The final
/// path is never written partially. The temporary file is removed on every failure.
///
/// # Arguments
///
/// * `path` - Absolute path to storage directory.
/// * `tmp_path` - Staging directory for content being received.
/// * `f` - Content body.
/// * `expected_size` - Size hint for content body. `0` disables the length check.
/// * `algo` - Digest used for addressing.
pub fn put_immutable(path: &Path, tmp_path: &Path, f: impl Read, expected_size: usize, algo: HashAlgorithm) -> Result<Record, RecordError> {
    let mut tempfile = TempBuilder::new()
        .prefix("hashdrop")
        .tempfile_in(tmp_path)
        .map_err(RecordError::TempFile)?;
    debug!("writing to tempfile {:?} expected size {}", tempfile.path(), expected_size);

    let mut hr = HashReader::new(algo, f);
    let total_size = copy(&mut hr, tempfile.as_file_mut()).map_err(RecordError::Copy)?;
    if expected_size > 0 && expected_size as u64 != total_size {
        return Err(RecordError::SizeMismatch {
            expected: expected_size,
            actual: total_size,
        });
    }
    tempfile.as_file().sync_all().map_err(RecordError::Copy)?;

    let digest = hr.sum();
    let final_path = path.join(record_name(&digest));
    info!("storing content as {:?}", final_path);

    if let Some(parent) = final_path.parent() {
        create_dir_all(parent).map_err(RecordError::Directory)?;
    }

    // an existing file at the final path has the same digest, so it is overwritten
    tempfile.persist(&final_path).map_err(|e| RecordError::Persist(e.error))?;

    Ok(Record {
        digest,
        path: final_path,
        size: total_size,
    })
}

/// Open stored content by its name relative to the storage directory.
pub fn get(path: &Path, name: &str) -> Option<File> {
    let path_canon = match path.join(name).canonicalize() {
        Ok(v) => v,
        Err(e) => {
            debug!("content {} not found: {}", name, e);
            return None;
        },
    };
    File::open(path_canon).ok()
}
