//! Hash algorithm domain type.
//!
//! Provides the `HashAlgorithm` enumeration supporting SHA-256, SHA-384 and
//! SHA-512 for Authenticode digests, together with an incremental hasher so
//! callers can feed discontiguous file ranges.

use std::fmt;
use std::str::FromStr;

use der::asn1::ObjectIdentifier;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::DigestBytes;
use crate::domain::constants::{
    ID_ECDSA_WITH_SHA256, ID_ECDSA_WITH_SHA384, ID_ECDSA_WITH_SHA512, ID_SHA256, ID_SHA384,
    ID_SHA512,
};

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    #[must_use]
    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Digest algorithm OID as used in `AlgorithmIdentifier`.
    #[must_use]
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha256 => ID_SHA256,
            HashAlgorithm::Sha384 => ID_SHA384,
            HashAlgorithm::Sha512 => ID_SHA512,
        }
    }

    /// `ecdsa-with-SHA*` signature algorithm matching this digest.
    #[must_use]
    pub fn ecdsa_signature_oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha256 => ID_ECDSA_WITH_SHA256,
            HashAlgorithm::Sha384 => ID_ECDSA_WITH_SHA384,
            HashAlgorithm::Sha512 => ID_ECDSA_WITH_SHA512,
        }
    }

    #[must_use]
    pub fn hasher(&self) -> AuthenticodeHasher {
        AuthenticodeHasher::new(*self)
    }

    /// One-shot digest of `data`.
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize_vec()
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(format!(
                "unsupported hash algorithm '{other}' (expected sha256, sha384 or sha512)"
            )),
        }
    }
}

/// Incremental SHA-2 hasher over one of the supported algorithms.
#[derive(Clone)]
pub enum AuthenticodeHasher {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl AuthenticodeHasher {
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => AuthenticodeHasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => AuthenticodeHasher::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => AuthenticodeHasher::Sha512(Sha512::new()),
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            AuthenticodeHasher::Sha256(_) => HashAlgorithm::Sha256,
            AuthenticodeHasher::Sha384(_) => HashAlgorithm::Sha384,
            AuthenticodeHasher::Sha512(_) => HashAlgorithm::Sha512,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            AuthenticodeHasher::Sha256(h) => h.update(data),
            AuthenticodeHasher::Sha384(h) => h.update(data),
            AuthenticodeHasher::Sha512(h) => h.update(data),
        }
    }

    fn finalize_vec(self) -> Vec<u8> {
        match self {
            AuthenticodeHasher::Sha256(h) => h.finalize().to_vec(),
            AuthenticodeHasher::Sha384(h) => h.finalize().to_vec(),
            AuthenticodeHasher::Sha512(h) => h.finalize().to_vec(),
        }
    }

    /// Finish hashing. The output length always matches the algorithm.
    #[must_use]
    pub fn finalize(self) -> DigestBytes {
        let algorithm = self.algorithm();
        DigestBytes::from_hasher_output(algorithm, self.finalize_vec())
    }
}

impl fmt::Debug for AuthenticodeHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthenticodeHasher({})", self.algorithm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm_properties() {
        assert_eq!(HashAlgorithm::Sha256.as_str(), "sha256");
        assert_eq!(HashAlgorithm::Sha256.digest_size(), 32);
        assert_eq!(HashAlgorithm::Sha384.digest_size(), 48);
        assert_eq!(HashAlgorithm::Sha512.digest_size(), 64);
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha256);
        assert_eq!(
            HashAlgorithm::Sha384.oid().to_string(),
            "2.16.840.1.101.3.4.2.2"
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("SHA-256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
        assert_eq!("sha512".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha512));
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = HashAlgorithm::Sha384.hasher();
        hasher.update(b"hello ");
        hasher.update(b"world");
        let digest = hasher.finalize();
        assert_eq!(digest.as_slice(), HashAlgorithm::Sha384.digest(b"hello world"));
        assert_eq!(digest.algorithm(), HashAlgorithm::Sha384);
    }

    #[test]
    fn test_known_sha256_vector() {
        assert_eq!(
            hex::encode(HashAlgorithm::Sha256.digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
