//! `SpcBuilderService` constructs `SpcIndirectData` from an Authenticode digest.

use crate::{
    domain::{crypto::DigestBytes, spc::SpcIndirectData},
    HashAlgorithm, SigningError, SigningResult,
};

pub struct SpcBuilderService {
    hash_algorithm: HashAlgorithm,
}

impl SpcBuilderService {
    #[must_use]
    pub fn new(hash_algorithm: HashAlgorithm) -> Self {
        Self { hash_algorithm }
    }

    /// Build the `SpcIndirectDataContent` carrying `digest`.
    pub fn build(&self, digest: &DigestBytes) -> SigningResult<SpcIndirectData> {
        if digest.algorithm() != self.hash_algorithm {
            return Err(SigningError::HashRangeError(format!(
                "digest computed with {} but SPC content expects {}",
                digest.algorithm(),
                self.hash_algorithm
            )));
        }
        let spc = SpcIndirectData::from_pe_digest(digest)?;
        log::debug!("Built SpcIndirectDataContent ({} bytes)", spc.as_der().len());
        Ok(spc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let digest = DigestBytes::new(HashAlgorithm::Sha384, vec![0; 48]).unwrap();
        let err = SpcBuilderService::new(HashAlgorithm::Sha256)
            .build(&digest)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::HashRange);
    }

    #[test]
    fn test_build_embeds_digest() {
        let digest = DigestBytes::new(HashAlgorithm::Sha256, vec![7; 32]).unwrap();
        let spc = SpcBuilderService::new(HashAlgorithm::Sha256)
            .build(&digest)
            .unwrap();
        assert!(spc
            .as_der()
            .windows(34)
            .any(|w| w[0] == 0x04 && w[1] == 32 && w[2..].iter().all(|b| *b == 7)));
        assert_eq!(spc.hash_algorithm(), HashAlgorithm::Sha256);
    }
}
