//! SPC (Software Publisher Certificate) domain module.
//! Provides strongly-typed representation of `SpcIndirectDataContent` used in Authenticode.

use std::fmt;

use der::asn1::{ObjectIdentifier, OctetString};
use der::{Any, Decode, Encode, EncodeValue, Sequence};
use spki::AlgorithmIdentifierOwned;

use crate::domain::constants::{SPC_PE_IMAGE_DATA_OBJID, SPC_PE_IMAGE_DATA_OBSOLETE};
use crate::domain::crypto::DigestBytes;
use crate::HashAlgorithm;

/// `SpcIndirectDataContent ::= SEQUENCE { data, messageDigest }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SpcIndirectDataContent {
    pub data: SpcAttributeTypeAndOptionalValue,
    pub message_digest: DigestInfo,
}

/// Image data: `SPC_PE_IMAGE_DATAOBJ` plus the `SpcPeImageData` value.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SpcAttributeTypeAndOptionalValue {
    pub value_type: ObjectIdentifier,
    pub value: Any,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct DigestInfo {
    pub digest_algorithm: AlgorithmIdentifierOwned,
    pub digest: OctetString,
}

/// `SpcSpOpusInfo ::= SEQUENCE { programName [0] SpcString OPTIONAL, moreInfo [1] SpcLink OPTIONAL }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SpcSpOpusInfo {
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub program_name: Option<Any>,
    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", optional = "true")]
    pub more_info: Option<Any>,
}

impl SpcSpOpusInfo {
    /// Opus info carrying `name` as an `SpcString` unicode choice.
    pub fn with_program_name(name: Option<&str>) -> der::Result<Self> {
        let program_name = name.map(spc_unicode_string).transpose()?;
        Ok(Self {
            program_name,
            more_info: None,
        })
    }
}

/// `SpcString.unicode`: `[0] IMPLICIT BMPString`, UTF-16BE content.
pub fn spc_unicode_string(text: &str) -> der::Result<Any> {
    let utf16: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
    let tagged = der::asn1::ContextSpecific {
        tag_number: der::TagNumber::N0,
        tag_mode: der::TagMode::Implicit,
        value: OctetString::new(utf16)?,
    };
    Any::from_der(&tagged.to_der()?)
}

/// `AlgorithmIdentifier` for a digest algorithm with explicit NULL parameters.
pub fn digest_algorithm_identifier(
    algorithm: HashAlgorithm,
) -> der::Result<AlgorithmIdentifierOwned> {
    Ok(AlgorithmIdentifierOwned {
        oid: algorithm.oid(),
        parameters: Some(Any::from_der(&[0x05, 0x00])?),
    })
}

/// Encoded `SpcIndirectDataContent` for one image digest.
///
/// Keeps both the full DER (embedded as eContent) and the value octets
/// without the outer SEQUENCE header, which is what the messageDigest
/// signed attribute covers.
pub struct SpcIndirectData {
    der: Vec<u8>,
    value: Vec<u8>,
    hash_algorithm: HashAlgorithm,
}

impl SpcIndirectData {
    /// Build the content for a PE image digest.
    pub fn from_pe_digest(digest: &DigestBytes) -> der::Result<Self> {
        let content = SpcIndirectDataContent {
            data: SpcAttributeTypeAndOptionalValue {
                value_type: SPC_PE_IMAGE_DATA_OBJID,
                value: Any::from_der(SPC_PE_IMAGE_DATA_OBSOLETE)?,
            },
            message_digest: DigestInfo {
                digest_algorithm: digest_algorithm_identifier(digest.algorithm())?,
                digest: OctetString::new(digest.as_slice())?,
            },
        };
        Self::from_content(&content, digest.algorithm())
    }

    fn from_content(
        content: &SpcIndirectDataContent,
        hash_algorithm: HashAlgorithm,
    ) -> der::Result<Self> {
        let der = content.to_der()?;
        let mut value = Vec::new();
        content.encode_value(&mut value)?;
        Ok(Self {
            der,
            value,
            hash_algorithm,
        })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
    /// Content octets without the outer tag and length.
    #[must_use]
    pub fn value_octets(&self) -> &[u8] {
        &self.value
    }
    #[must_use]
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }
    /// Content as an ASN.1 `Any`, ready for `EncapsulatedContentInfo`.
    pub fn to_any(&self) -> der::Result<Any> {
        Any::from_der(&self.der)
    }
}

impl fmt::Debug for SpcIndirectData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SpcIndirectData(algo={:?}, len={})",
            self.hash_algorithm,
            self.der.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(algo: HashAlgorithm, byte: u8) -> DigestBytes {
        DigestBytes::new(algo, vec![byte; algo.digest_size()]).unwrap()
    }

    #[test]
    fn test_spc_content_decodes_back() {
        let spc = SpcIndirectData::from_pe_digest(&digest(HashAlgorithm::Sha256, 0x5a)).unwrap();
        let decoded = SpcIndirectDataContent::from_der(spc.as_der()).unwrap();
        assert_eq!(decoded.data.value_type, SPC_PE_IMAGE_DATA_OBJID);
        assert_eq!(decoded.data.value.to_der().unwrap(), SPC_PE_IMAGE_DATA_OBSOLETE);
        assert_eq!(
            decoded.message_digest.digest_algorithm.oid,
            HashAlgorithm::Sha256.oid()
        );
        assert_eq!(decoded.message_digest.digest.as_bytes(), &[0x5a; 32]);
    }

    #[test]
    fn test_value_octets_strip_outer_header() {
        let spc = SpcIndirectData::from_pe_digest(&digest(HashAlgorithm::Sha256, 1)).unwrap();
        let der = spc.as_der();
        assert_eq!(der[0], 0x30);
        assert!(der.ends_with(spc.value_octets()));
        assert_eq!(der.len() - spc.value_octets().len(), 2);
    }

    #[test]
    fn test_digest_algorithm_has_null_parameters() {
        let id = digest_algorithm_identifier(HashAlgorithm::Sha384).unwrap();
        assert_eq!(id.parameters.unwrap().to_der().unwrap(), vec![0x05, 0x00]);
    }

    #[test]
    fn test_opus_info_program_name() {
        let info = SpcSpOpusInfo::with_program_name(Some("Ab")).unwrap();
        assert_eq!(
            info.to_der().unwrap(),
            vec![0x30, 0x08, 0xa0, 0x06, 0x80, 0x04, 0x00, 0x41, 0x00, 0x62]
        );
        let empty = SpcSpOpusInfo::with_program_name(None).unwrap();
        assert_eq!(empty.to_der().unwrap(), vec![0x30, 0x00]);
    }
}
