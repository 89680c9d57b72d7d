//! Signing capability consumed by the Authenticode engine.
//!
//! The engine never touches key material directly. Anything that can produce
//! a signature over arbitrary bytes and present the matching X.509
//! certificate can sign images: an OpenSSL key on disk, a hardware token,
//! or a deterministic double in tests.

use x509_cert::Certificate;

use crate::infra::error::SigningResult;
use crate::HashAlgorithm;

/// Signing key plus the certificate that identifies it.
pub trait CertificateSigner {
    /// Sign `message` with the private key, hashing it with `hash` first.
    ///
    /// For RSA keys the result is a PKCS#1 v1.5 signature; for EC keys it is
    /// a DER encoded `Ecdsa-Sig-Value`.
    ///
    /// # Errors
    ///
    /// Returns error if the key is unavailable or rejects the operation.
    fn sign(&self, message: &[u8], hash: HashAlgorithm) -> SigningResult<Vec<u8>>;

    /// The signer certificate to embed in the signature.
    fn certificate(&self) -> &Certificate;

    /// Intermediate certificates to embed after the signer certificate.
    fn chain(&self) -> &[Certificate] {
        &[]
    }
}

impl<T: CertificateSigner + ?Sized> CertificateSigner for &T {
    fn sign(&self, message: &[u8], hash: HashAlgorithm) -> SigningResult<Vec<u8>> {
        (**self).sign(message, hash)
    }

    fn certificate(&self) -> &Certificate {
        (**self).certificate()
    }

    fn chain(&self) -> &[Certificate] {
        (**self).chain()
    }
}

impl<T: CertificateSigner + ?Sized> CertificateSigner for Box<T> {
    fn sign(&self, message: &[u8], hash: HashAlgorithm) -> SigningResult<Vec<u8>> {
        (**self).sign(message, hash)
    }

    fn certificate(&self) -> &Certificate {
        (**self).certificate()
    }

    fn chain(&self) -> &[Certificate] {
        (**self).chain()
    }
}
