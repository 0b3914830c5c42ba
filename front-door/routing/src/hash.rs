//! Consistent-hash destination selection.
//!
//! A request's tenant and path are hashed with a per-process secret onto the tenant's full,
//! ordered host list. The chosen host therefore stays stable while other hosts come and go; only
//! when the chosen host itself is unavailable is the hash extended to probe for another.

use rand::{rngs::OsRng, RngCore};
use ring::hmac;
use std::{fmt, fs, io::Read, path::Path};

/// The size of the secret hash key, in bytes.
pub const HASH_KEY_LEN: usize = 32;

/// The number of candidates probed before selection gives up.
pub const MAX_ITERATIONS: usize = 25;

/// The secret mixed into every destination hash.
#[derive(Clone, PartialEq, Eq)]
pub struct HashKey([u8; HASH_KEY_LEN]);

#[derive(Debug, thiserror::Error)]
pub enum HashKeyError {
    #[error("failed to read hash key from {}: {error}", path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("hash key file {} holds {len} bytes; {} are required", path.display(), HASH_KEY_LEN)]
    TooShort { path: std::path::PathBuf, len: usize },
}

/// Selects destinations with an HMAC-SHA256 keyed by a [`HashKey`].
#[derive(Clone)]
pub struct ConsistentHash {
    key: hmac::Key,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    #[error("no hosts to select from")]
    NoHosts,

    #[error("unable to find an available host after {} iterations", MAX_ITERATIONS)]
    Exhausted,
}

// === impl HashKey ===

impl HashKey {
    /// Draws a key from the operating system's random number generator.
    pub fn generate() -> Self {
        let mut key = [0; HASH_KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Reads the key from the first [`HASH_KEY_LEN`] bytes of the file at
    /// `path`. Any trailing content is ignored.
    pub fn from_file(path: &Path) -> Result<Self, HashKeyError> {
        let read_err = |error| HashKeyError::Read {
            path: path.to_path_buf(),
            error,
        };

        let file = fs::File::open(path).map_err(read_err)?;
        let mut buf = Vec::with_capacity(HASH_KEY_LEN);
        file.take(HASH_KEY_LEN as u64)
            .read_to_end(&mut buf)
            .map_err(read_err)?;

        let key = <[u8; HASH_KEY_LEN]>::try_from(buf.as_slice()).map_err(|_| {
            HashKeyError::TooShort {
                path: path.to_path_buf(),
                len: buf.len(),
            }
        })?;
        tracing::debug!(path = %path.display(), "Loaded destination hash key");
        Ok(Self(key))
    }
}

impl From<[u8; HASH_KEY_LEN]> for HashKey {
    fn from(key: [u8; HASH_KEY_LEN]) -> Self {
        Self(key)
    }
}

impl fmt::Debug for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashKey(<redacted>)")
    }
}

// === impl ConsistentHash ===

impl ConsistentHash {
    pub fn new(key: &HashKey) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, &key.0),
        }
    }

    /// Selects an available host for the tenant's path.
    ///
    /// `hosts` must be the tenant's full host list, in a stable order. Each
    /// iteration picks a candidate from `hosts`; if it is not `available`, the
    /// candidate and the iteration number are appended to the hashed input
    /// and the digest is recomputed.
    pub fn select<'h>(
        &self,
        tenant: &str,
        path: &str,
        hosts: &'h [String],
        available: &[String],
    ) -> Result<&'h str, HashError> {
        if hosts.is_empty() {
            return Err(HashError::NoHosts);
        }

        let mut ctx = hmac::Context::with_key(&self.key);
        ctx.update(tenant.as_bytes());
        ctx.update(path.as_bytes());

        for i in 0..MAX_ITERATIONS {
            let digest = ctx.clone().sign();
            let candidate = hosts[index_for(digest.as_ref(), hosts.len())].as_str();
            if available.iter().any(|h| h == candidate) {
                tracing::trace!(%tenant, %path, %candidate, iteration = i, "Selected");
                return Ok(candidate);
            }

            tracing::trace!(%tenant, %path, %candidate, iteration = i, "Candidate unavailable");
            ctx.update(candidate.as_bytes());
            ctx.update(i.to_string().as_bytes());
        }

        Err(HashError::Exhausted)
    }
}

impl fmt::Debug for ConsistentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsistentHash").finish_non_exhaustive()
    }
}

/// Reduces a big-endian unsigned integer modulo `n`.
fn index_for(digest: &[u8], n: usize) -> usize {
    let n = n as u128;
    let rem = digest
        .iter()
        .fold(0u128, |rem, &b| ((rem << 8) | u128::from(b)) % n);
    rem as usize
}
