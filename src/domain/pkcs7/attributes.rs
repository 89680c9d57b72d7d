//! Signed attributes domain types.

use std::fmt;

use der::asn1::{ObjectIdentifier, SetOfVec};
use der::{Any, Decode, Encode};
use x509_cert::attr::Attribute;

/// One authenticated attribute with a single value.
#[derive(Clone)]
pub struct SignedAttributeLogical {
    pub oid: ObjectIdentifier,
    pub value_der: Vec<u8>,
}

impl SignedAttributeLogical {
    /// Attribute holding the DER of `value`.
    pub fn encode<T: Encode>(oid: ObjectIdentifier, value: &T) -> der::Result<Self> {
        Ok(Self {
            oid,
            value_der: value.to_der()?,
        })
    }

    pub fn to_attribute(&self) -> der::Result<Attribute> {
        let value = Any::from_der(&self.value_der)?;
        Ok(Attribute {
            oid: self.oid,
            values: SetOfVec::try_from(vec![value])?,
        })
    }
}

impl fmt::Debug for SignedAttributeLogical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignedAttributeLogical(oid={}, len={})",
            self.oid,
            self.value_der.len()
        )
    }
}

/// Canonically ordered `SET OF Attribute`.
///
/// The signature covers the DER of this set with the universal SET tag,
/// while `SignerInfo` carries the same content under `[0] IMPLICIT`.
pub struct SignedAttributesCanonical {
    set: SetOfVec<Attribute>,
    der: Vec<u8>,
}

impl SignedAttributesCanonical {
    pub fn new(attrs: &[SignedAttributeLogical]) -> der::Result<Self> {
        let attributes = attrs
            .iter()
            .map(SignedAttributeLogical::to_attribute)
            .collect::<der::Result<Vec<_>>>()?;
        let set = SetOfVec::try_from(attributes)?;
        let der = set.to_der()?;
        Ok(Self { set, der })
    }

    /// DER of the `SET OF` (tag 0x31), the exact bytes that get signed.
    #[must_use]
    pub fn to_signing_input(&self) -> &[u8] {
        &self.der
    }
    #[must_use]
    pub fn as_set(&self) -> &SetOfVec<Attribute> {
        &self.set
    }
    #[must_use]
    pub fn into_set(self) -> SetOfVec<Attribute> {
        self.set
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl fmt::Debug for SignedAttributesCanonical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignedAttributesCanonical(count={}, total_len={})",
            self.set.len(),
            self.der.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{ID_CONTENT_TYPE, ID_MESSAGE_DIGEST, SPC_INDIRECT_DATA_OBJID};
    use der::asn1::OctetString;

    #[test]
    fn test_set_is_sorted_and_tagged() {
        let digest = OctetString::new(vec![0xAB; 32]).unwrap();
        let attrs = vec![
            SignedAttributeLogical::encode(ID_MESSAGE_DIGEST, &digest).unwrap(),
            SignedAttributeLogical::encode(ID_CONTENT_TYPE, &SPC_INDIRECT_DATA_OBJID).unwrap(),
        ];
        let canonical = SignedAttributesCanonical::new(&attrs).unwrap();
        assert_eq!(canonical.len(), 2);
        assert_eq!(canonical.to_signing_input()[0], 0x31);
        let oids: Vec<_> = canonical.as_set().iter().map(|a| a.oid).collect();
        // contentType (…9.3) sorts before messageDigest (…9.4)
        assert_eq!(oids, vec![ID_CONTENT_TYPE, ID_MESSAGE_DIGEST]);
    }
}
