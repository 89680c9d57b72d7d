//! PKCS#7 builder service.
//! Assembles the CMS `SignedData` container for an Authenticode signature.
//!
//! The container holds the SPC content as eContent, the signer certificate
//! (plus any intermediates), and one `SignerInfo` whose authenticated
//! attributes were signed by the signing capability.

use cms::{
    cert::{CertificateChoices, IssuerAndSerialNumber},
    content_info::{CmsVersion, ContentInfo},
    signed_data::{
        CertificateSet, DigestAlgorithmIdentifiers, EncapsulatedContentInfo, SignatureValue,
        SignedData, SignerIdentifier, SignerInfo, SignerInfos,
    },
};
use der::{asn1::SetOfVec, Any, Decode, Encode};
use spki::AlgorithmIdentifierOwned;

use crate::{
    domain::{
        constants::{ID_RSA_ENCRYPTION, ID_SIGNED_DATA, SPC_INDIRECT_DATA_OBJID},
        crypto::{CertChain, CmsSignature, KeyKind},
        pkcs7::{Pkcs7SignedData, SignedAttributesCanonical},
        spc::{digest_algorithm_identifier, SpcIndirectData},
    },
    HashAlgorithm, SigningError, SigningResult,
};

pub struct Pkcs7BuilderService {
    chain: CertChain,
    hash_algorithm: HashAlgorithm,
    embed_chain: bool,
}

impl Pkcs7BuilderService {
    #[must_use]
    pub fn new(chain: CertChain, hash_algorithm: HashAlgorithm) -> Self {
        Self {
            chain,
            hash_algorithm,
            embed_chain: true,
        }
    }

    /// Whether intermediate certificates are embedded. The signer
    /// certificate is always embedded.
    #[must_use]
    pub fn with_embedded_chain(mut self, embed: bool) -> Self {
        self.embed_chain = embed;
        self
    }

    /// Signature algorithm identifier for the signer key.
    pub fn signature_algorithm(&self) -> SigningResult<AlgorithmIdentifierOwned> {
        match self.chain.leaf_key_kind() {
            Some(KeyKind::Rsa) => Ok(AlgorithmIdentifierOwned {
                oid: ID_RSA_ENCRYPTION,
                parameters: Some(Any::from_der(&[0x05, 0x00])?),
            }),
            Some(KeyKind::Ec) => Ok(AlgorithmIdentifierOwned {
                oid: self.hash_algorithm.ecdsa_signature_oid(),
                parameters: None,
            }),
            None => Err(SigningError::CertificateError(format!(
                "unsupported public key algorithm {}",
                self.chain
                    .leaf()
                    .tbs_certificate
                    .subject_public_key_info
                    .algorithm
                    .oid
            ))),
        }
    }

    fn certificate_set(&self) -> SigningResult<CertificateSet> {
        let certs: Vec<CertificateChoices> = if self.embed_chain {
            self.chain
                .iter()
                .cloned()
                .map(CertificateChoices::Certificate)
                .collect()
        } else {
            vec![CertificateChoices::Certificate(self.chain.leaf().clone())]
        };
        Ok(CertificateSet(SetOfVec::try_from(certs)?))
    }

    fn signer_info(
        &self,
        signed_attrs: SignedAttributesCanonical,
        signature: &CmsSignature,
    ) -> SigningResult<SignerInfo> {
        let leaf = self.chain.leaf();
        Ok(SignerInfo {
            version: CmsVersion::V1,
            sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer: leaf.tbs_certificate.issuer.clone(),
                serial_number: leaf.tbs_certificate.serial_number.clone(),
            }),
            digest_alg: digest_algorithm_identifier(self.hash_algorithm)?,
            signed_attrs: Some(signed_attrs.into_set()),
            signature_algorithm: self.signature_algorithm()?,
            signature: SignatureValue::new(signature.as_slice())?,
            unsigned_attrs: None,
        })
    }

    /// Build the DER `ContentInfo` wrapping `SignedData`.
    pub fn build_signed(
        &self,
        spc: &SpcIndirectData,
        signed_attrs: SignedAttributesCanonical,
        signature: &CmsSignature,
    ) -> SigningResult<Pkcs7SignedData> {
        if spc.hash_algorithm() != self.hash_algorithm || signature.algorithm() != self.hash_algorithm
        {
            return Err(SigningError::HashRangeError(format!(
                "inconsistent digest algorithms: builder {}, content {}, signature {}",
                self.hash_algorithm,
                spc.hash_algorithm(),
                signature.algorithm()
            )));
        }
        if signature.is_empty() {
            return Err(SigningError::SigningFailed(
                "signing capability returned an empty signature".into(),
            ));
        }

        let signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: DigestAlgorithmIdentifiers::try_from(vec![
                digest_algorithm_identifier(self.hash_algorithm)?,
            ])?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: SPC_INDIRECT_DATA_OBJID,
                econtent: Some(spc.to_any()?),
            },
            certificates: Some(self.certificate_set()?),
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(vec![
                self.signer_info(signed_attrs, signature)?,
            ])?),
        };

        let content_info = ContentInfo {
            content_type: ID_SIGNED_DATA,
            content: Any::encode_from(&signed_data)?,
        };
        let der = content_info.to_der()?;
        log::debug!("Built PKCS#7 SignedData ({} bytes)", der.len());
        Ok(Pkcs7SignedData::from_der(der))
    }
}
