use std::fmt;

use der::Encode;
use x509_cert::Certificate;

use crate::domain::constants::{ID_EC_PUBLIC_KEY, ID_RSA_ENCRYPTION};

/// Public key family of a signing certificate, which selects the CMS
/// signature algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Rsa,
    Ec,
}

/// Ordered certificate chain (signer first, then intermediates). Root excluded.
#[derive(Clone)]
pub struct CertChain {
    leaf: Certificate,
    intermediates: Vec<Certificate>,
}

impl CertChain {
    #[must_use]
    pub fn new(leaf: Certificate) -> Self {
        Self {
            leaf,
            intermediates: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_intermediates(mut self, list: Vec<Certificate>) -> Self {
        self.intermediates = list;
        self
    }

    #[must_use]
    pub fn leaf(&self) -> &Certificate {
        &self.leaf
    }
    #[must_use]
    pub fn intermediates(&self) -> &[Certificate] {
        &self.intermediates
    }

    /// All certificates to embed, signer first.
    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        std::iter::once(&self.leaf).chain(self.intermediates.iter())
    }

    /// Key family of the signer certificate, or `None` for unsupported keys.
    #[must_use]
    pub fn leaf_key_kind(&self) -> Option<KeyKind> {
        key_kind(&self.leaf)
    }
}

#[must_use]
pub fn key_kind(certificate: &Certificate) -> Option<KeyKind> {
    let oid = certificate
        .tbs_certificate
        .subject_public_key_info
        .algorithm
        .oid;
    if oid == ID_RSA_ENCRYPTION {
        Some(KeyKind::Rsa)
    } else if oid == ID_EC_PUBLIC_KEY {
        Some(KeyKind::Ec)
    } else {
        None
    }
}

impl fmt::Debug for CertChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CertChain(subject={}, leaf_len={}, intermediates={})",
            self.leaf.tbs_certificate.subject,
            self.leaf.encoded_len().map_or(0, u32::from),
            self.intermediates.len()
        )
    }
}
