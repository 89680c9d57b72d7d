//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - The signing capability trait consumed by the engine
//! - OpenSSL private keys and PEM certificates
//! - Path-based input and atomic output

pub mod backend;
pub mod file_io;
pub mod openssl_signer;
