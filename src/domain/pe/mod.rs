//! PE (Portable Executable) domain types and operations.
//!
//! Provides structured representations of PE/COFF images with:
//! - Validated header parsing over borrowed bytes
//! - Canonical hash views for Authenticode digest computation
//! - `WIN_CERTIFICATE` and data directory records for embedding

mod hash_view;
pub mod layout;
mod parse;

pub use hash_view::{AuthenticodeRanges, HashViewError, PeHashView};
pub use layout::{DataDirectory, OptionalHeaderKind, WinCertificate};
pub use parse::{CoffHeader, HeaderLayout, OptionalHeader, PeImage, PeParseError, SectionHeader};
