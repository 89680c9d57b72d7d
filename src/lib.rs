//! PE Signer Library
//!
//! Authenticode signing engine for PE/COFF images. Parses the image,
//! computes the Authenticode digest, wraps it in a PKCS#7 `SignedData`
//! produced through a pluggable [`CertificateSigner`], and embeds the result
//! in the certificate table.
//!
//! Layout:
//! - `domain`: PE model, SPC and CMS types, digests
//! - `services`: stateless hashing, encoding and embedding steps
//! - `pipelines`: the signing workflow
//! - `adapters`: signing capabilities and file I/O
//! - `infra`: errors and configuration

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

use std::time::SystemTime;

pub use adapters::backend::CertificateSigner;
pub use adapters::file_io::sign_pe_file;
pub use adapters::openssl_signer::OpenSslKeySigner;
pub use domain::crypto::HashAlgorithm;
pub use infra::config::{ConfigManager, SigningConfiguration};
pub use infra::error::{ErrorKind, SigningError, SigningResult};
pub use pipelines::sign::{SignStage, SignWorkflow};

/// Per-run signing options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningOptions {
    /// Digest algorithm for the image hash and the signature
    pub hash_algorithm: HashAlgorithm,
    /// Value of the signingTime attribute; omitted when `None`
    pub signing_time: Option<SystemTime>,
    /// Program name for the SpcSpOpusInfo attribute
    pub program_name: Option<String>,
    /// Embed intermediate certificates supplied by the signer
    pub embed_chain: bool,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Sha256,
            signing_time: None,
            program_name: None,
            embed_chain: true,
        }
    }
}

impl SigningOptions {
    #[must_use]
    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }
}

/// Sign an in-memory PE image.
///
/// Pure function of its inputs: no files are touched and no global state is
/// kept, so distinct images may be signed concurrently.
pub fn sign_pe_bytes<S>(input: &[u8], signer: &S, options: SigningOptions) -> SigningResult<Vec<u8>>
where
    S: CertificateSigner + ?Sized,
{
    SignWorkflow::new(options).sign(input, signer)
}
