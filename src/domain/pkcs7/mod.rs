//! PKCS#7 `SignedData` domain wrapper.
//! Newtype around the DER `ContentInfo` that ends up inside `WIN_CERTIFICATE`.

use std::fmt;

use cms::content_info::ContentInfo;
use cms::signed_data::SignedData;
use der::Decode;

use crate::domain::constants::ID_SIGNED_DATA;

pub mod attributes;

pub struct Pkcs7SignedData {
    der: Vec<u8>,
}

impl Pkcs7SignedData {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
    #[must_use]
    pub fn into_der(self) -> Vec<u8> {
        self.der
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.der.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.der.is_empty()
    }

    /// Decode the structured `SignedData` back out of the blob.
    pub fn decode(&self) -> der::Result<SignedData> {
        let content_info = ContentInfo::from_der(&self.der)?;
        if content_info.content_type != ID_SIGNED_DATA {
            return Err(der::Tag::ObjectIdentifier.value_error());
        }
        content_info.content.decode_as::<SignedData>()
    }
}

impl fmt::Debug for Pkcs7SignedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pkcs7SignedData(len={})", self.der.len())
    }
}

pub use attributes::{SignedAttributeLogical, SignedAttributesCanonical};
