//! Service layer module root.
//! Contains the stateless hashing, encoding and embedding services.

pub mod embedder;
pub mod pe_hasher;
pub mod pkcs7_builder;
pub mod signed_attributes_builder;
pub mod spc_builder;

pub use embedder::PeSignatureEmbedderService;
pub use pe_hasher::PeHasher;
pub use pkcs7_builder::Pkcs7BuilderService;
pub use signed_attributes_builder::SignedAttributesBuilder;
pub use spc_builder::SpcBuilderService;
