//! Service for constructing and canonicalizing the authenticated attributes
//! of an Authenticode `SignerInfo`.

use std::time::SystemTime;

use der::asn1::{ObjectIdentifier, OctetString, UtcTime};
use der::Sequence;

use crate::{
    domain::{
        constants::{
            ID_CONTENT_TYPE, ID_MESSAGE_DIGEST, ID_SIGNING_TIME, SPC_INDIRECT_DATA_OBJID,
            SPC_INDIVIDUAL_SP_KEY_PURPOSE_OBJID, SPC_SP_OPUS_INFO_OBJID, SPC_STATEMENT_TYPE_OBJID,
        },
        pkcs7::{SignedAttributeLogical, SignedAttributesCanonical},
        spc::{SpcIndirectData, SpcSpOpusInfo},
    },
    SigningError, SigningResult,
};

/// `SpcStatementType ::= SEQUENCE OF OBJECT IDENTIFIER`, always the single
/// individual code signing purpose here.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct SpcStatementType {
    purpose: ObjectIdentifier,
}

#[derive(Default)]
pub struct SignedAttributesBuilder {
    program_name: Option<String>,
    signing_time: Option<SystemTime>,
}

impl SignedAttributesBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_program_name(mut self, name: Option<String>) -> Self {
        self.program_name = name;
        self
    }

    #[must_use]
    pub fn with_signing_time(mut self, time: Option<SystemTime>) -> Self {
        self.signing_time = time;
        self
    }

    /// Assemble the attribute list for `spc`.
    ///
    /// messageDigest covers the SPC content octets without their SEQUENCE
    /// header, as Authenticode verifiers expect.
    pub fn build_logical(
        &self,
        spc: &SpcIndirectData,
    ) -> SigningResult<Vec<SignedAttributeLogical>> {
        let content_digest = spc.hash_algorithm().digest(spc.value_octets());
        let mut attrs = vec![
            SignedAttributeLogical::encode(ID_CONTENT_TYPE, &SPC_INDIRECT_DATA_OBJID)?,
            SignedAttributeLogical::encode(
                SPC_STATEMENT_TYPE_OBJID,
                &SpcStatementType {
                    purpose: SPC_INDIVIDUAL_SP_KEY_PURPOSE_OBJID,
                },
            )?,
            SignedAttributeLogical::encode(
                SPC_SP_OPUS_INFO_OBJID,
                &SpcSpOpusInfo::with_program_name(self.program_name.as_deref())?,
            )?,
            SignedAttributeLogical::encode(ID_MESSAGE_DIGEST, &OctetString::new(content_digest)?)?,
        ];
        if let Some(time) = self.signing_time {
            let utc = UtcTime::from_system_time(time).map_err(|e| {
                SigningError::Asn1Error(format!("signing time not representable as UTCTime: {e}"))
            })?;
            attrs.push(SignedAttributeLogical::encode(ID_SIGNING_TIME, &utc)?);
        }
        Ok(attrs)
    }

    /// Build the DER-sorted attribute set ready for signing.
    pub fn build(&self, spc: &SpcIndirectData) -> SigningResult<SignedAttributesCanonical> {
        let canonical = self.canonicalize(&self.build_logical(spc)?)?;
        log::debug!(
            "Signed attributes: {} entries, {} bytes",
            canonical.len(),
            canonical.to_signing_input().len()
        );
        Ok(canonical)
    }

    pub fn canonicalize(
        &self,
        raw_attributes: &[SignedAttributeLogical],
    ) -> SigningResult<SignedAttributesCanonical> {
        Ok(SignedAttributesCanonical::new(raw_attributes)?)
    }
}
