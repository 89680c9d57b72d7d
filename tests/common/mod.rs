//! Shared fixtures for the integration tests.
//!
//! Builds small but structurally complete PE32/PE32+ images in memory and
//! provides signing capabilities backed by throwaway OpenSSL keys, so none
//! of the tests need files or hardware.

#![allow(dead_code)]

use std::ops::Range;

use der::Decode;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use sha2::{Digest, Sha256};
use x509_cert::Certificate;

use pe_signer::domain::pe::layout::{
    align_to_certificate_boundary, COFF_HEADER_SIZE, DATA_DIRECTORY_SIZE, DOS_E_LFANEW_OFFSET,
    OPTIONAL_HEADER_MAGIC_PE32, OPTIONAL_HEADER_MAGIC_PE32_PLUS, PE_SIGNATURE,
    SECTION_HEADER_SIZE,
};
use pe_signer::domain::pe::{OptionalHeaderKind, PeImage, WinCertificate};
use pe_signer::{CertificateSigner, HashAlgorithm, OpenSslKeySigner, SigningError, SigningResult};

pub const PE_OFFSET: usize = 0x80;
pub const HEADERS_SIZE: usize = 0x400;
pub const SECTION_SIZE: usize = 0x200;

/// Build a PE image with `sections` raw sections of [`SECTION_SIZE`] bytes
/// each, filled with a position-dependent pattern. No certificate table.
pub fn build_pe(kind: OptionalHeaderKind, sections: usize) -> Vec<u8> {
    let opt_size = kind.data_directories_offset() + 16 * DATA_DIRECTORY_SIZE;
    let opt = PE_OFFSET + 4 + COFF_HEADER_SIZE;
    let table = opt + opt_size;
    let mut data = vec![0u8; HEADERS_SIZE + SECTION_SIZE * sections];

    data[0..2].copy_from_slice(b"MZ");
    put_u32(&mut data, DOS_E_LFANEW_OFFSET, PE_OFFSET as u32);
    data[PE_OFFSET..PE_OFFSET + 4].copy_from_slice(PE_SIGNATURE);

    // COFF header
    let machine: u16 = match kind {
        OptionalHeaderKind::Pe32 => 0x014c,
        OptionalHeaderKind::Pe32Plus => 0x8664,
    };
    put_u16(&mut data, PE_OFFSET + 4, machine);
    put_u16(&mut data, PE_OFFSET + 6, sections as u16);
    put_u16(&mut data, PE_OFFSET + 20, opt_size as u16);
    put_u16(&mut data, PE_OFFSET + 22, 0x0022);

    // Optional header
    let magic = match kind {
        OptionalHeaderKind::Pe32 => OPTIONAL_HEADER_MAGIC_PE32,
        OptionalHeaderKind::Pe32Plus => OPTIONAL_HEADER_MAGIC_PE32_PLUS,
    };
    put_u16(&mut data, opt, magic);
    put_u32(&mut data, opt + 16, 0x1000);
    put_u32(&mut data, opt + 32, 0x1000);
    put_u32(&mut data, opt + 36, SECTION_SIZE as u32);
    put_u32(&mut data, opt + 56, (0x1000 * (sections + 1)) as u32);
    put_u32(&mut data, opt + 60, HEADERS_SIZE as u32);
    put_u32(&mut data, opt + 64, 0x1234_5678);
    put_u16(&mut data, opt + 68, 10);
    put_u32(&mut data, opt + kind.rva_count_offset(), 16);

    for index in 0..sections {
        let header = table + index * SECTION_HEADER_SIZE;
        let name = format!(".sec{index}");
        data[header..header + name.len()].copy_from_slice(name.as_bytes());
        let raw = HEADERS_SIZE + index * SECTION_SIZE;
        put_u32(&mut data, header + 8, SECTION_SIZE as u32);
        put_u32(&mut data, header + 12, (0x1000 * (index + 1)) as u32);
        put_u32(&mut data, header + 16, SECTION_SIZE as u32);
        put_u32(&mut data, header + 20, raw as u32);
        put_u32(&mut data, header + 36, 0x6000_0020);
        for (offset, byte) in data[raw..raw + SECTION_SIZE].iter_mut().enumerate() {
            *byte = ((offset * 31 + index * 7 + 1) % 251) as u8;
        }
    }
    data
}

/// Append an 8-byte aligned certificate table holding one PKCS#7 entry per
/// blob and point the certificate directory at it.
pub fn append_certificate_table(image: &mut Vec<u8>, blobs: &[&[u8]]) -> Range<usize> {
    let start = align_to_certificate_boundary(image.len());
    image.resize(start, 0);
    for blob in blobs {
        let entry = WinCertificate::pkcs_signed_data(blob).expect("entry fits");
        image.extend_from_slice(&entry.to_bytes());
    }
    let end = image.len();
    set_certificate_directory(image, start as u32, (end - start) as u32);
    start..end
}

pub fn set_certificate_directory(image: &mut [u8], offset: u32, size: u32) {
    let range = PeImage::parse(image)
        .expect("fixture parses")
        .certificate_directory_range();
    put_u32(image, range.start, offset);
    put_u32(image, range.start + 4, size);
}

pub fn certificate_directory(image: &[u8]) -> (u32, u32) {
    let dir = PeImage::parse(image)
        .expect("image parses")
        .certificate_directory();
    (dir.virtual_address, dir.size)
}

pub fn set_checksum(image: &mut [u8], value: u32) {
    let range = PeImage::parse(image).expect("fixture parses").checksum_range();
    put_u32(image, range.start, value);
}

pub fn put_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// The single PKCS#7 blob embedded in a signed image, without padding.
pub fn embedded_pkcs7(signed: &[u8]) -> Vec<u8> {
    let image = PeImage::parse(signed).expect("signed image parses");
    let entries = image.win_certificates().expect("certificate table parses");
    assert_eq!(entries.len(), 1, "exactly one WIN_CERTIFICATE expected");
    let blob = &entries[0].certificate;
    blob[..der_tlv_len(blob)].to_vec()
}

/// Length of the outermost DER TLV at the start of `blob`.
pub fn der_tlv_len(blob: &[u8]) -> usize {
    let first = blob[1] as usize;
    if first < 0x80 {
        return 2 + first;
    }
    let count = first & 0x7f;
    let len = blob[2..2 + count]
        .iter()
        .fold(0usize, |acc, byte| (acc << 8) | *byte as usize);
    2 + count + len
}

fn x509_name(common_name: &str) -> openssl::x509::X509Name {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, "PE Signer Tests")
        .unwrap();
    name.build()
}

/// Self-signed certificate for `key`.
pub fn self_signed(key: &PKey<Private>, common_name: &str, serial: u32) -> X509 {
    let name = x509_name(common_name);
    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    let digest = if key.id() == openssl::pkey::Id::ED25519 {
        MessageDigest::null()
    } else {
        MessageDigest::sha256()
    };
    builder.sign(key, digest).unwrap();
    builder.build()
}

pub fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

pub fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

pub struct TestKey {
    pub key: PKey<Private>,
    pub x509: X509,
}

impl TestKey {
    pub fn rsa(common_name: &str) -> Self {
        let key = rsa_key();
        let x509 = self_signed(&key, common_name, 0x1001);
        Self { key, x509 }
    }

    pub fn ec(common_name: &str) -> Self {
        let key = ec_key();
        let x509 = self_signed(&key, common_name, 0x2002);
        Self { key, x509 }
    }

    pub fn signer(&self) -> OpenSslKeySigner {
        OpenSslKeySigner::new(self.key.clone(), &self.x509).expect("key matches certificate")
    }

    pub fn certificate(&self) -> Certificate {
        to_certificate(&self.x509)
    }
}

pub fn to_certificate(x509: &X509) -> Certificate {
    Certificate::from_der(&x509.to_der().unwrap()).unwrap()
}

pub fn rsa_signer() -> OpenSslKeySigner {
    TestKey::rsa("PE Signer Test RSA").signer()
}

pub fn ec_signer() -> OpenSslKeySigner {
    TestKey::ec("PE Signer Test EC").signer()
}

/// Deterministic signing double: the "signature" is SHA-256 of the message.
pub struct FakeSigner {
    pub certificate: Certificate,
    pub chain: Vec<Certificate>,
}

impl FakeSigner {
    pub fn new(certificate: Certificate) -> Self {
        Self {
            certificate,
            chain: Vec::new(),
        }
    }

    pub fn rsa() -> Self {
        Self::new(TestKey::rsa("PE Signer Fake").certificate())
    }
}

impl CertificateSigner for FakeSigner {
    fn sign(&self, message: &[u8], _hash: HashAlgorithm) -> SigningResult<Vec<u8>> {
        Ok(Sha256::digest(message).to_vec())
    }

    fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    fn chain(&self) -> &[Certificate] {
        &self.chain
    }
}

/// Signing double whose key is always unavailable.
pub struct FailingSigner {
    pub certificate: Certificate,
    pub error: fn() -> SigningError,
}

impl FailingSigner {
    pub fn new(certificate: Certificate) -> Self {
        Self {
            certificate,
            error: || SigningError::SigningFailed("token removed".into()),
        }
    }
}

impl CertificateSigner for FailingSigner {
    fn sign(&self, _message: &[u8], _hash: HashAlgorithm) -> SigningResult<Vec<u8>> {
        Err((self.error)())
    }

    fn certificate(&self) -> &Certificate {
        &self.certificate
    }
}
