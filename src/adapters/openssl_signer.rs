//! OpenSSL-backed signing capability.
//!
//! Loads a PEM private key and certificate (plus optional intermediates) and
//! signs with `openssl::sign::Signer`.

use std::fmt;
use std::path::Path;

use der::Decode;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::sign::Signer;
use openssl::x509::X509;
use x509_cert::Certificate;

use crate::adapters::backend::CertificateSigner;
use crate::{HashAlgorithm, SigningError, SigningResult};

fn message_digest(hash: HashAlgorithm) -> MessageDigest {
    match hash {
        HashAlgorithm::Sha256 => MessageDigest::sha256(),
        HashAlgorithm::Sha384 => MessageDigest::sha384(),
        HashAlgorithm::Sha512 => MessageDigest::sha512(),
    }
}

fn to_certificate(x509: &X509) -> SigningResult<Certificate> {
    let der = x509.to_der()?;
    Certificate::from_der(&der)
        .map_err(|e| SigningError::CertificateError(format!("Failed to decode certificate: {e}")))
}

/// Private key held in process memory, paired with its certificate.
pub struct OpenSslKeySigner {
    key: PKey<Private>,
    certificate: Certificate,
    chain: Vec<Certificate>,
}

impl OpenSslKeySigner {
    /// Pair `key` with `certificate`, checking that they belong together.
    pub fn new(key: PKey<Private>, certificate: &X509) -> SigningResult<Self> {
        if !certificate.public_key()?.public_eq(&key) {
            return Err(SigningError::CertificateError(
                "private key does not match certificate public key".to_string(),
            ));
        }
        Ok(Self {
            key,
            certificate: to_certificate(certificate)?,
            chain: Vec::new(),
        })
    }

    pub fn from_pem(key_pem: &[u8], cert_pem: &[u8]) -> SigningResult<Self> {
        let key = PKey::private_key_from_pem(key_pem).map_err(|e| {
            SigningError::CertificateError(format!("Failed to load private key: {e}"))
        })?;
        let certificate = X509::from_pem(cert_pem).map_err(|e| {
            SigningError::CertificateError(format!("Failed to load certificate: {e}"))
        })?;
        Self::new(key, &certificate)
    }

    /// Load key, certificate and optional chain from PEM files.
    pub fn from_pem_files(
        key_path: &Path,
        cert_path: &Path,
        chain_path: Option<&Path>,
    ) -> SigningResult<Self> {
        let read = |path: &Path| {
            std::fs::read(path).map_err(|e| {
                SigningError::IoError(format!("Failed to read {}: {e}", path.display()))
            })
        };
        let signer = Self::from_pem(&read(key_path)?, &read(cert_path)?)?;
        match chain_path {
            Some(path) => Ok(signer.with_chain(Self::chain_from_pem(&read(path)?)?)),
            None => Ok(signer),
        }
    }

    /// Decode every certificate in a PEM bundle, in file order.
    pub fn chain_from_pem(pem: &[u8]) -> SigningResult<Vec<Certificate>> {
        X509::stack_from_pem(pem)
            .map_err(|e| SigningError::CertificateError(format!("Failed to load chain: {e}")))?
            .iter()
            .map(|x509| to_certificate(x509))
            .collect()
    }

    #[must_use]
    pub fn with_chain(mut self, chain: Vec<Certificate>) -> Self {
        self.chain = chain;
        self
    }
}

impl CertificateSigner for OpenSslKeySigner {
    fn sign(&self, message: &[u8], hash: HashAlgorithm) -> SigningResult<Vec<u8>> {
        let failed = |e: openssl::error::ErrorStack| SigningError::SigningFailed(e.to_string());
        let mut signer = Signer::new(message_digest(hash), &self.key).map_err(failed)?;
        signer.update(message).map_err(failed)?;
        signer.sign_to_vec().map_err(failed)
    }

    fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    fn chain(&self) -> &[Certificate] {
        &self.chain
    }
}

impl fmt::Debug for OpenSslKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OpenSslKeySigner(key={:?}, subject={}, chain={})",
            self.key.id(),
            self.certificate.tbs_certificate.subject,
            self.chain.len()
        )
    }
}
