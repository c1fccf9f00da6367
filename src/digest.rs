//! Digest selection and the hashing stream wrapper used during upload.
//!
//! Content is addressed by the digest of its bytes. The digest is accumulated while the upload
//! body is copied to storage, so the payload is never buffered in memory as a whole.
use std::fmt;
use std::io::{
    self,
    Read,
};
use std::str::FromStr;

use sha1::Sha1;
use sha2::digest::DynDigest;
use sha2::{
    Sha256,
    Sha512,
};
use thiserror::Error;


/// Digest algorithms available for content addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha512,
}

#[derive(Debug, Error)]
#[error("unsupported hash function: {0}")]
pub struct HashChoiceError(pub String);

impl HashAlgorithm {
    fn hasher(&self) -> Box<dyn DynDigest + Send> {
        match self {
            HashAlgorithm::Sha1 => Box::new(Sha1::default()),
            HashAlgorithm::Sha256 => Box::new(Sha256::default()),
            HashAlgorithm::Sha512 => Box::new(Sha512::default()),
        }
    }

    /// Length of the digest in bytes.
    pub fn output_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Length of the lowercase hex encoding of the digest.
    pub fn hex_len(&self) -> usize {
        self.output_size() * 2
    }

    /// Digest of an in-memory buffer.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut h = self.hasher();
        h.update(data);
        h.finalize().to_vec()
    }
}

impl Default for HashAlgorithm {
    fn default() -> HashAlgorithm {
        HashAlgorithm::Sha1
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashChoiceError;

    fn from_str(s: &str) -> Result<HashAlgorithm, HashChoiceError> {
        match s.to_lowercase().as_str() {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(HashChoiceError(s.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        };
        fmt.write_str(s)
    }
}


/// Wraps a reader so that every byte handed to the caller is also fed to a running digest.
///
/// The value returned by [HashReader::sum] only covers the whole content once the wrapped
/// reader has been drained to EOF. Calling it earlier yields the digest of the prefix read so
/// far.
pub struct HashReader<R> {
    inner: R,
    hasher: Box<dyn DynDigest + Send>,
    count: usize,
}

impl<R: Read> HashReader<R> {
    pub fn new(algo: HashAlgorithm, inner: R) -> HashReader<R> {
        HashReader {
            inner,
            hasher: algo.hasher(),
            count: 0,
        }
    }

    /// Digest over all bytes read so far. Does not consume the accumulator.
    pub fn sum(&self) -> Vec<u8> {
        self.hasher.box_clone().finalize().to_vec()
    }

    /// Number of bytes read so far.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl<R: Read> Read for HashReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.count += n;
        Ok(n)
    }
}


#[cfg(test)]
mod tests {
    use std::io::{
        copy,
        sink,
        Read,
    };
    use std::str::FromStr;

    use hex;

    use super::{
        HashAlgorithm,
        HashReader,
    };

    #[test]
    fn test_hash_choice() {
        assert_eq!(HashAlgorithm::from_str("SHA256").unwrap(), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::from_str("sha1").unwrap(), HashAlgorithm::Sha1);
        assert_eq!(HashAlgorithm::from_str("sha512").unwrap(), HashAlgorithm::Sha512);
        assert!(HashAlgorithm::from_str("md5").is_err());
        assert_eq!(HashAlgorithm::default().to_string(), "sha1");
    }

    #[test]
    fn test_reader_sum_after_drain() {
        let b = b"foo";
        let mut r = HashReader::new(HashAlgorithm::Sha256, &b[..]);
        let n = copy(&mut r, &mut sink()).unwrap();
        assert_eq!(n, 3);
        assert_eq!(r.count(), 3);
        assert_eq!(hex::encode(r.sum()), "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae");
    }

    #[test]
    fn test_reader_passes_bytes_through() {
        let b = b"abc";
        let mut r = HashReader::new(HashAlgorithm::Sha1, &b[..]);
        let mut out = vec!();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b.to_vec());
        assert_eq!(hex::encode(r.sum()), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(r.sum(), HashAlgorithm::Sha1.digest(b));
    }

    #[test]
    fn test_reader_sum_before_drain_is_prefix() {
        let b = b"foobar";
        let mut r = HashReader::new(HashAlgorithm::Sha256, &b[..]);
        let mut buf = [0u8; 3];
        r.read_exact(&mut buf).unwrap();
        assert_eq!(r.sum(), HashAlgorithm::Sha256.digest(b"foo"));
        assert_ne!(r.sum(), HashAlgorithm::Sha256.digest(b));
    }

    #[test]
    fn test_hex_len() {
        assert_eq!(HashAlgorithm::Sha1.hex_len(), 40);
        assert_eq!(HashAlgorithm::Sha256.digest(b"").len(), HashAlgorithm::Sha256.output_size());
        assert_eq!(HashAlgorithm::Sha512.hex_len(), 128);
    }
}
