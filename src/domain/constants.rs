//! Object identifiers and fixed DER fragments shared by the CMS and SPC builders.

use der::asn1::ObjectIdentifier;

// === PKCS#7 / CMS ===

/// PKCS#7 `SignedData` (1.2.840.113549.1.7.2)
pub const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

// === PKCS#9 attributes ===

/// contentType (1.2.840.113549.1.9.3)
pub const ID_CONTENT_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");

/// messageDigest (1.2.840.113549.1.9.4)
pub const ID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// signingTime (1.2.840.113549.1.9.5)
pub const ID_SIGNING_TIME: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");

// === Hash algorithms ===

pub const ID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
pub const ID_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
pub const ID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

// === Public key and signature algorithms ===

/// rsaEncryption (1.2.840.113549.1.1.1)
pub const ID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// id-ecPublicKey (1.2.840.10045.2.1)
pub const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

pub const ID_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
pub const ID_ECDSA_WITH_SHA384: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
pub const ID_ECDSA_WITH_SHA512: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");

// === Microsoft Authenticode ===

/// `SPC_INDIRECT_DATA_OBJID` (1.3.6.1.4.1.311.2.1.4)
pub const SPC_INDIRECT_DATA_OBJID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.2.1.4");

/// `SPC_STATEMENT_TYPE_OBJID` (1.3.6.1.4.1.311.2.1.11)
pub const SPC_STATEMENT_TYPE_OBJID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.2.1.11");

/// `SPC_SP_OPUS_INFO_OBJID` (1.3.6.1.4.1.311.2.1.12)
pub const SPC_SP_OPUS_INFO_OBJID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.2.1.12");

/// `SPC_PE_IMAGE_DATAOBJ` (1.3.6.1.4.1.311.2.1.15)
pub const SPC_PE_IMAGE_DATA_OBJID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.2.1.15");

/// Individual code signing purpose (1.3.6.1.4.1.311.2.1.21)
pub const SPC_INDIVIDUAL_SP_KEY_PURPOSE_OBJID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.2.1.21");

/// DER of the fixed `SpcPeImageData` value: flags with only
/// `includeResources` set and a file link holding the unicode string
/// `<<<Obsolete>>>`.
pub const SPC_PE_IMAGE_DATA_OBSOLETE: &[u8] = &[
    0x30, 0x26, // SEQUENCE
    0x03, 0x02, 0x07, 0x80, // BIT STRING flags: bit 0 (includeResources)
    0xa0, 0x20, // [0] EXPLICIT SpcLink
    0xa2, 0x1e, // [2] file
    0x80, 0x1c, // [0] IMPLICIT unicode (BMPString)
    0x00, 0x3c, 0x00, 0x3c, 0x00, 0x3c, 0x00, 0x4f, 0x00, 0x62, 0x00, 0x73, 0x00, 0x6f, 0x00,
    0x6c, 0x00, 0x65, 0x00, 0x74, 0x00, 0x65, 0x00, 0x3e, 0x00, 0x3e, 0x00, 0x3e,
];
