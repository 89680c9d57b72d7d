//! `SignWorkflow` orchestrates core signing steps.
//!
//! Linear pipeline: parse → hash → build signature → rewrite. Each run starts
//! at [`SignStage::Start`] and ends in either [`SignStage::Done`] or
//! [`SignStage::Failed`]. The output buffer is only returned once complete.

use crate::{
    adapters::backend::CertificateSigner,
    domain::{
        crypto::{CertChain, CmsSignature, DigestBytes},
        pe::PeImage,
        pkcs7::Pkcs7SignedData,
    },
    infra::error::ErrorKind,
    services::{
        embedder::PeSignatureEmbedderService, pe_hasher::PeHasher,
        pkcs7_builder::Pkcs7BuilderService, signed_attributes_builder::SignedAttributesBuilder,
        spc_builder::SpcBuilderService,
    },
    HashAlgorithm, SigningError, SigningOptions, SigningResult,
};

/// Progress of a single signing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignStage {
    Start,
    Parsed,
    Hashed,
    SignatureBuilt,
    Rewritten,
    Done,
    Failed(ErrorKind),
}

pub struct SignWorkflow {
    options: SigningOptions,
    stage: SignStage,
}

impl SignWorkflow {
    #[must_use]
    pub fn new(options: SigningOptions) -> Self {
        Self {
            options,
            stage: SignStage::Start,
        }
    }

    #[must_use]
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.options.hash_algorithm
    }

    /// Stage reached by the most recent run.
    #[must_use]
    pub fn stage(&self) -> SignStage {
        self.stage
    }

    fn advance(&mut self, next: SignStage) {
        log::debug!("Signing stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    /// Sign an in-memory PE image, returning the complete signed image.
    pub fn sign<S>(&mut self, input: &[u8], signer: &S) -> SigningResult<Vec<u8>>
    where
        S: CertificateSigner + ?Sized,
    {
        self.stage = SignStage::Start;
        match self.run(input, signer) {
            Ok(signed) => {
                self.advance(SignStage::Done);
                log::info!(
                    "Signed image: {} -> {} bytes ({})",
                    input.len(),
                    signed.len(),
                    self.options.hash_algorithm
                );
                Ok(signed)
            }
            Err(e) => {
                log::error!("Signing failed in stage {:?}: {e}", self.stage);
                self.advance(SignStage::Failed(e.kind()));
                Err(e)
            }
        }
    }

    fn run<S>(&mut self, input: &[u8], signer: &S) -> SigningResult<Vec<u8>>
    where
        S: CertificateSigner + ?Sized,
    {
        let image = PeImage::parse(input)?;
        log::info!(
            "Parsed {} image: machine=0x{:04x}, {} sections, certificate table {:?}",
            if image.is_pe32_plus() { "PE32+" } else { "PE32" },
            image.coff_header().machine,
            image.sections().len(),
            image.certificate_table()
        );
        if image.overlay_len() > 0 {
            log::debug!(
                "Image carries {} overlay bytes after end of image",
                image.overlay_len()
            );
        }
        self.advance(SignStage::Parsed);

        let hasher = PeHasher::new(self.options.hash_algorithm);
        let digest = hasher.hash(&image)?;
        self.advance(SignStage::Hashed);

        let pkcs7 = self.build_signature(&digest, signer)?;
        self.advance(SignStage::SignatureBuilt);

        let signed = PeSignatureEmbedderService::new().embed(&image, &pkcs7)?;
        let rehashed = hasher.hash_bytes(&signed)?;
        if rehashed != digest {
            return Err(SigningError::HashRangeError(format!(
                "signed image digest {} differs from signed digest {}",
                rehashed.to_hex(),
                digest.to_hex()
            )));
        }
        self.advance(SignStage::Rewritten);
        Ok(signed)
    }

    fn build_signature<S>(&self, digest: &DigestBytes, signer: &S) -> SigningResult<Pkcs7SignedData>
    where
        S: CertificateSigner + ?Sized,
    {
        let algorithm = self.options.hash_algorithm;
        let chain = CertChain::new(signer.certificate().clone())
            .with_intermediates(signer.chain().to_vec());
        log::debug!("Signer certificate chain: {chain:?}");

        let pkcs7_builder =
            Pkcs7BuilderService::new(chain, algorithm).with_embedded_chain(self.options.embed_chain);
        // Reject unsupported keys before invoking the signing capability.
        pkcs7_builder.signature_algorithm()?;

        let spc = SpcBuilderService::new(algorithm).build(digest)?;
        let attrs = SignedAttributesBuilder::new()
            .with_program_name(self.options.program_name.clone())
            .with_signing_time(self.options.signing_time)
            .build(&spc)?;

        let raw = signer
            .sign(attrs.to_signing_input(), algorithm)
            .map_err(|e| match e {
                SigningError::SigningFailed(_) => e,
                other => SigningError::SigningFailed(other.to_string()),
            })?;
        let signature = CmsSignature::new(algorithm, raw);
        log::debug!("Signing capability returned {signature:?}");

        pkcs7_builder.build_signed(&spc, attrs, &signature)
    }
}
