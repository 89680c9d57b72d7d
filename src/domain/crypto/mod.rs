//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for cryptographic artifacts including:
//! - Hash algorithms, incremental hashers and length-checked digests
//! - Certificate chains and signer key classification
//! - Signature values tagged with their digest algorithm

mod cert;
mod digest_bytes;
mod hash;
mod signature;

pub use cert::{key_kind, CertChain, KeyKind};
pub use digest_bytes::{DigestBytes, DigestBytesError};
pub use hash::{AuthenticodeHasher, HashAlgorithm};
pub use signature::CmsSignature;
