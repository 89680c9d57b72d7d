//! `PeHasher` service: produces the Authenticode digest of a parsed image.
//!
//! Feeds the ranges reported by `PeHashView` into the selected hasher,
//! followed by the zero padding up to the next 8-byte boundary.

use crate::{
    domain::{
        crypto::DigestBytes,
        pe::{PeHashView, PeImage},
    },
    HashAlgorithm, SigningError, SigningResult,
};

const ZERO_PADDING: [u8; 8] = [0u8; 8];

pub struct PeHasher {
    algo: HashAlgorithm,
}

impl PeHasher {
    #[must_use]
    pub fn new(algo: HashAlgorithm) -> Self {
        Self { algo }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algo
    }

    /// Digest of an already parsed image.
    pub fn hash(&self, image: &PeImage<'_>) -> SigningResult<DigestBytes> {
        let view = PeHashView::new(image);
        let ranges = view
            .ranges()
            .map_err(|e| SigningError::HashRangeError(e.to_string()))?;
        log::debug!(
            "Authenticode ranges {:x?} + {} padding bytes ({} bytes hashed)",
            ranges.included,
            ranges.padding,
            ranges.hashed_len()
        );

        let bytes = view.as_bytes();
        let mut hasher = self.algo.hasher();
        for range in &ranges.included {
            hasher.update(&bytes[range.clone()]);
        }
        hasher.update(&ZERO_PADDING[..ranges.padding]);

        let digest = hasher.finalize();
        log::debug!("Authenticode {} digest: {}", self.algo, digest.to_hex());
        Ok(digest)
    }

    /// Parse `pe_bytes` and return its digest.
    pub fn hash_bytes(&self, pe_bytes: &[u8]) -> SigningResult<DigestBytes> {
        let image = PeImage::parse(pe_bytes)?;
        self.hash(&image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pe::layout::{
        OptionalHeaderKind, COFF_HEADER_SIZE, DATA_DIRECTORY_SIZE, DOS_E_LFANEW_OFFSET,
        OPTIONAL_HEADER_MAGIC_PE32_PLUS, PE_SIGNATURE,
    };

    const PE: usize = 0x40;
    const OPT: usize = PE + 4 + COFF_HEADER_SIZE;

    fn image(len: usize) -> Vec<u8> {
        let opt_size =
            OptionalHeaderKind::Pe32Plus.data_directories_offset() + 16 * DATA_DIRECTORY_SIZE;
        let mut data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        data[0..2].copy_from_slice(b"MZ");
        data[DOS_E_LFANEW_OFFSET..DOS_E_LFANEW_OFFSET + 4]
            .copy_from_slice(&(PE as u32).to_le_bytes());
        data[PE..PE + 4].copy_from_slice(PE_SIGNATURE);
        data[PE + 6..PE + 8].copy_from_slice(&0u16.to_le_bytes());
        data[PE + 20..PE + 22].copy_from_slice(&(opt_size as u16).to_le_bytes());
        data[OPT..OPT + 2].copy_from_slice(&OPTIONAL_HEADER_MAGIC_PE32_PLUS.to_le_bytes());
        data[OPT + 108..OPT + 112].copy_from_slice(&16u32.to_le_bytes());
        data[OPT + 144..OPT + 152].fill(0);
        data
    }

    #[test]
    fn test_digest_matches_manual_concatenation() {
        let data = image(0x401);
        let digest = PeHasher::new(HashAlgorithm::Sha256).hash_bytes(&data).unwrap();

        let mut manual = Vec::new();
        manual.extend_from_slice(&data[..OPT + 64]);
        manual.extend_from_slice(&data[OPT + 68..OPT + 144]);
        manual.extend_from_slice(&data[OPT + 152..]);
        manual.extend_from_slice(&[0u8; 7]);
        assert_eq!(digest.as_slice(), HashAlgorithm::Sha256.digest(&manual));
    }

    #[test]
    fn test_checksum_does_not_affect_digest() {
        let mut data = image(0x400);
        let hasher = PeHasher::new(HashAlgorithm::Sha512);
        let before = hasher.hash_bytes(&data).unwrap();
        data[OPT + 64..OPT + 68].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(hasher.hash_bytes(&data).unwrap(), before);
        assert_eq!(before.algorithm(), HashAlgorithm::Sha512);
    }

    #[test]
    fn test_malformed_input_is_reported() {
        let err = PeHasher::new(HashAlgorithm::Sha256)
            .hash_bytes(b"MZ")
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::MalformedImage);
    }
}
