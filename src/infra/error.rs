//! Error types for Authenticode signing operations.
//! Error handling types and result definitions for the signing engine.

use thiserror::Error;

use crate::domain::pe::PeParseError;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Coarse classification of a [`SigningError`], recorded by the signing
/// workflow when it transitions into its failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedImage,
    HashRange,
    SigningFailed,
    WriteFailed,
    Certificate,
    Asn1,
    Io,
    Configuration,
}

/// Error types for signing operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    #[error("Malformed PE image: {0}")]
    #[diagnostic(code(pe_signer::malformed_image))]
    MalformedImage(#[from] PeParseError),

    #[error("Authenticode hash range error: {0}")]
    #[diagnostic(
        code(pe_signer::hash_range),
        help("the parsed layout and the digest ranges disagree; this is a bug")
    )]
    HashRangeError(String),

    #[error("Signing operation failed: {0}")]
    #[diagnostic(code(pe_signer::signing_failed))]
    SigningFailed(String),

    #[error("Failed to build signed image: {0}")]
    #[diagnostic(code(pe_signer::write_failed))]
    WriteFailed(String),

    #[error("Certificate error: {0}")]
    #[diagnostic(code(pe_signer::certificate))]
    CertificateError(String),

    #[error("ASN.1 encoding/decoding error: {0}")]
    #[diagnostic(code(pe_signer::asn1))]
    Asn1Error(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(pe_signer::io))]
    IoError(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(pe_signer::configuration))]
    ConfigurationError(String),
}

impl SigningError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SigningError::MalformedImage(_) => ErrorKind::MalformedImage,
            SigningError::HashRangeError(_) => ErrorKind::HashRange,
            SigningError::SigningFailed(_) => ErrorKind::SigningFailed,
            SigningError::WriteFailed(_) => ErrorKind::WriteFailed,
            SigningError::CertificateError(_) => ErrorKind::Certificate,
            SigningError::Asn1Error(_) => ErrorKind::Asn1,
            SigningError::IoError(_) => ErrorKind::Io,
            SigningError::ConfigurationError(_) => ErrorKind::Configuration,
        }
    }
}

impl From<der::Error> for SigningError {
    fn from(error: der::Error) -> Self {
        SigningError::Asn1Error(error.to_string())
    }
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::IoError(error.to_string())
    }
}

impl From<openssl::error::ErrorStack> for SigningError {
    fn from(error: openssl::error::ErrorStack) -> Self {
        SigningError::CertificateError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SigningError::SigningFailed("token removed".to_string());
        assert_eq!(error.to_string(), "Signing operation failed: token removed");

        let error = SigningError::MalformedImage(PeParseError::MissingMz);
        assert_eq!(error.to_string(), "Malformed PE image: missing MZ signature");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            SigningError::WriteFailed("x".into()).kind(),
            ErrorKind::WriteFailed
        );
        assert_eq!(
            SigningError::from(PeParseError::TooShort { len: 3 }).kind(),
            ErrorKind::MalformedImage
        );
        assert_eq!(
            SigningError::HashRangeError("x".into()).kind(),
            ErrorKind::HashRange
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SigningError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
