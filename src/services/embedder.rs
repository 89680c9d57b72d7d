//! PE Signature Embedder Service
//!
//! Embeds PKCS#7 as `WIN_CERTIFICATE` and points the certificate table
//! directory at it. The checksum field is left as found.

use crate::{
    domain::pe::{
        layout::align_to_certificate_boundary, DataDirectory, PeImage, WinCertificate,
    },
    domain::pkcs7::Pkcs7SignedData,
    infra::error::{SigningError, SigningResult},
};

#[derive(Default)]
pub struct PeSignatureEmbedderService;

impl PeSignatureEmbedderService {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Produce the signed image bytes.
    ///
    /// Content up to the start of any existing certificate table is kept,
    /// zero-padded to an 8-byte boundary, and followed by a single new
    /// `WIN_CERTIFICATE`. Anything at or after the old table is dropped.
    pub fn embed(&self, image: &PeImage<'_>, pkcs7: &Pkcs7SignedData) -> SigningResult<Vec<u8>> {
        let content_end = image.content_end();
        let signature_offset = align_to_certificate_boundary(content_end);

        if let Some(table) = image.certificate_table() {
            log::info!(
                "Replacing existing certificate table at 0x{:x} ({} bytes)",
                table.start,
                table.len()
            );
            if table.end < image.len() {
                log::warn!(
                    "Dropping {} bytes that followed the old certificate table",
                    image.len() - table.end
                );
            }
        }

        let entry = WinCertificate::pkcs_signed_data(pkcs7.as_der()).ok_or_else(|| {
            SigningError::WriteFailed(format!(
                "signature of {} bytes does not fit a WIN_CERTIFICATE length",
                pkcs7.len()
            ))
        })?;
        let directory = Self::certificate_directory(signature_offset, &entry)?;
        let total_len = signature_offset
            .checked_add(entry.encoded_len())
            .ok_or_else(|| SigningError::WriteFailed("output length overflow".into()))?;

        let mut signed = Vec::with_capacity(total_len);
        signed.extend_from_slice(&image.bytes()[..content_end]);
        signed.resize(signature_offset, 0);
        signed.extend_from_slice(&entry.to_bytes());

        let dir_range = image.certificate_directory_range();
        signed[dir_range].copy_from_slice(&directory.to_bytes());

        log::debug!(
            "Embedded WIN_CERTIFICATE at 0x{:x}, dwLength={}, output {} bytes",
            directory.virtual_address,
            directory.size,
            signed.len()
        );
        Ok(signed)
    }

    /// Directory entry for a `WIN_CERTIFICATE` placed at `signature_offset`.
    fn certificate_directory(
        signature_offset: usize,
        entry: &WinCertificate,
    ) -> SigningResult<DataDirectory> {
        let virtual_address = u32::try_from(signature_offset).map_err(|_| {
            SigningError::WriteFailed(format!(
                "certificate table offset 0x{signature_offset:x} exceeds 32 bits"
            ))
        })?;
        virtual_address.checked_add(entry.length).ok_or_else(|| {
            SigningError::WriteFailed(format!(
                "certificate table end 0x{signature_offset:x}+0x{:x} exceeds 32 bits",
                entry.length
            ))
        })?;
        Ok(DataDirectory {
            virtual_address,
            size: entry.length,
        })
    }
}
