//! PE file layout constants and fixed-size structures.
//! Contains the on-disk records the signer reads and writes.

/// `IMAGE_DOS_HEADER.e_lfanew` position.
pub const DOS_E_LFANEW_OFFSET: usize = 0x3C;
/// Minimum size of the DOS header.
pub const DOS_HEADER_SIZE: usize = 64;
/// `PE\0\0`
pub const PE_SIGNATURE: &[u8; 4] = b"PE\0\0";
pub const PE_SIGNATURE_SIZE: usize = 4;
pub const COFF_HEADER_SIZE: usize = 20;
pub const SECTION_HEADER_SIZE: usize = 40;
/// Loader limit on the number of sections.
pub const MAX_SECTIONS: u16 = 96;
/// Highest number of data directories defined by the format.
pub const MAX_DATA_DIRECTORIES: u32 = 16;

pub const OPTIONAL_HEADER_MAGIC_PE32: u16 = 0x10b;
pub const OPTIONAL_HEADER_MAGIC_PE32_PLUS: u16 = 0x20b;

/// `CheckSum` offset from the start of the optional header (PE32 and PE32+).
pub const CHECKSUM_OFFSET: usize = 64;
pub const CHECKSUM_SIZE: usize = 4;

/// Data directory index of the certificate table (`IMAGE_DIRECTORY_ENTRY_SECURITY`).
pub const CERTIFICATE_TABLE_INDEX: usize = 4;
pub const DATA_DIRECTORY_SIZE: usize = 8;

/// `WIN_CERTIFICATE` header size (dwLength + wRevision + wCertificateType).
pub const WIN_CERTIFICATE_HEADER_SIZE: usize = 8;
/// `WIN_CERT_REVISION_2_0`
pub const WIN_CERT_REVISION_2_0: u16 = 0x0200;
/// `WIN_CERT_TYPE_PKCS_SIGNED_DATA`
pub const WIN_CERT_TYPE_PKCS_SIGNED_DATA: u16 = 0x0002;
/// Certificate table entries start on 8-byte boundaries.
pub const CERTIFICATE_ALIGNMENT: usize = 8;

/// Round `value` up to the next multiple of [`CERTIFICATE_ALIGNMENT`].
#[must_use]
pub fn align_to_certificate_boundary(value: usize) -> usize {
    value.div_ceil(CERTIFICATE_ALIGNMENT) * CERTIFICATE_ALIGNMENT
}

/// Optional header flavour, selected by its magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalHeaderKind {
    Pe32,
    Pe32Plus,
}

impl OptionalHeaderKind {
    /// Offset of the data directory array from the start of the optional header.
    #[must_use]
    pub fn data_directories_offset(self) -> usize {
        match self {
            OptionalHeaderKind::Pe32 => 96,
            OptionalHeaderKind::Pe32Plus => 112,
        }
    }

    /// Offset of `NumberOfRvaAndSizes` from the start of the optional header.
    #[must_use]
    pub fn rva_count_offset(self) -> usize {
        self.data_directories_offset() - 4
    }
}

/// A data directory entry. For the certificate table `virtual_address`
/// holds a file offset rather than an RVA.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

impl DataDirectory {
    #[must_use]
    pub fn to_bytes(&self) -> [u8; DATA_DIRECTORY_SIZE] {
        let mut bytes = [0u8; DATA_DIRECTORY_SIZE];
        bytes[..4].copy_from_slice(&self.virtual_address.to_le_bytes());
        bytes[4..].copy_from_slice(&self.size.to_le_bytes());
        bytes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// `WIN_CERTIFICATE` structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinCertificate {
    pub length: u32,
    pub revision: u16,
    pub cert_type: u16,
    pub certificate: Vec<u8>,
}

impl WinCertificate {
    /// Wrap a PKCS#7 `SignedData` blob, zero-padding the entry to an 8-byte boundary.
    ///
    /// `length` covers the header, the blob and the padding, so it equals the
    /// number of bytes the entry occupies in the certificate table.
    ///
    /// Returns `None` when the padded entry does not fit the 32-bit length field.
    #[must_use]
    pub fn pkcs_signed_data(blob: &[u8]) -> Option<Self> {
        let unpadded = WIN_CERTIFICATE_HEADER_SIZE.checked_add(blob.len())?;
        let padded = align_to_certificate_boundary(unpadded);
        let length = u32::try_from(padded).ok()?;
        let mut certificate = Vec::with_capacity(padded - WIN_CERTIFICATE_HEADER_SIZE);
        certificate.extend_from_slice(blob);
        certificate.resize(padded - WIN_CERTIFICATE_HEADER_SIZE, 0);
        Some(Self {
            length,
            revision: WIN_CERT_REVISION_2_0,
            cert_type: WIN_CERT_TYPE_PKCS_SIGNED_DATA,
            certificate,
        })
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(WIN_CERTIFICATE_HEADER_SIZE + self.certificate.len());
        bytes.extend_from_slice(&self.length.to_le_bytes());
        bytes.extend_from_slice(&self.revision.to_le_bytes());
        bytes.extend_from_slice(&self.cert_type.to_le_bytes());
        bytes.extend_from_slice(&self.certificate);
        bytes
    }

    /// Size of the serialized entry.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        WIN_CERTIFICATE_HEADER_SIZE + self.certificate.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment() {
        assert_eq!(align_to_certificate_boundary(0), 0);
        assert_eq!(align_to_certificate_boundary(1), 8);
        assert_eq!(align_to_certificate_boundary(8), 8);
        assert_eq!(align_to_certificate_boundary(1021), 1024);
    }

    #[test]
    fn test_data_directory_bytes() {
        let dir = DataDirectory {
            virtual_address: 0x1000,
            size: 0x238,
        };
        let bytes = dir.to_bytes();
        assert_eq!(bytes, [0x00, 0x10, 0x00, 0x00, 0x38, 0x02, 0x00, 0x00]);
        assert!(DataDirectory::default().is_empty());
    }

    #[test]
    fn test_win_certificate_padding() {
        let cert = WinCertificate::pkcs_signed_data(&[0x30, 0x03, 0x02, 0x01, 0x01]).unwrap();
        assert_eq!(cert.length, 16);
        assert_eq!(cert.encoded_len(), 16);
        let bytes = cert.to_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &16u32.to_le_bytes());
        assert_eq!(&bytes[4..6], &WIN_CERT_REVISION_2_0.to_le_bytes());
        assert_eq!(&bytes[6..8], &WIN_CERT_TYPE_PKCS_SIGNED_DATA.to_le_bytes());
        assert_eq!(&bytes[8..13], &[0x30, 0x03, 0x02, 0x01, 0x01]);
        assert!(bytes[13..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_win_certificate_already_aligned() {
        let cert = WinCertificate::pkcs_signed_data(&[0u8; 16]).unwrap();
        assert_eq!(cert.length, 24);
        assert_eq!(cert.certificate.len(), 16);
    }

    #[test]
    fn test_optional_header_offsets() {
        assert_eq!(OptionalHeaderKind::Pe32.data_directories_offset(), 96);
        assert_eq!(OptionalHeaderKind::Pe32Plus.data_directories_offset(), 112);
        assert_eq!(OptionalHeaderKind::Pe32.rva_count_offset(), 92);
        assert_eq!(OptionalHeaderKind::Pe32Plus.rva_count_offset(), 108);
    }
}
