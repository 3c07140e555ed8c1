#![forbid(unsafe_code)]

//! In-memory certificates for tests.
//!
//! Certificates built here are structurally valid X.509 but carry a
//! placeholder signature; nothing in keyshare verifies signatures.

use std::str::FromStr;
use std::time::Duration;

use der::asn1::{BitString, ObjectIdentifier, OctetString, UtcTime};
use der::{Any, AnyRef, Encode};
use keyshare_core::oid;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::certificate::{TbsCertificate, Version};
use x509_cert::ext::pkix::certpolicy::PolicyInformation;
use x509_cert::ext::pkix::{BasicConstraints, CertificatePolicies, ExtendedKeyUsage, KeyUsage};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::Certificate;

const TEN_YEARS: u64 = 10 * 365 * 24 * 60 * 60;

/// Builder for test certificates.
pub struct TestCert {
    serial: Vec<u8>,
    not_before: u64,
    spki: SubjectPublicKeyInfoOwned,
    signature_algorithm: ObjectIdentifier,
    extensions: Vec<Extension>,
}

impl TestCert {
    /// Start a certificate for the given public key.
    pub fn new(spki: SubjectPublicKeyInfoOwned) -> Self {
        Self {
            serial: vec![0x01],
            not_before: 1_700_000_000,
            spki,
            signature_algorithm: oid::ECDSA_WITH_SHA256,
            extensions: Vec::new(),
        }
    }

    /// Start a certificate with a P-256 shaped placeholder public key.
    pub fn placeholder() -> Self {
        let mut point = vec![0x04];
        point.extend_from_slice(&[0x42; 64]);
        let spki = SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned {
                oid: oid::EC_PUBLIC_KEY,
                parameters: Some(Any::from(AnyRef::from(&oid::SECP256R1))),
            },
            subject_public_key: BitString::from_bytes(&point).expect("bit string"),
        };
        Self::new(spki)
    }

    /// Content octets of the serial number INTEGER, used verbatim.
    pub fn serial(mut self, bytes: &[u8]) -> Self {
        self.serial = bytes.to_vec();
        self
    }

    pub fn not_before(mut self, epoch_seconds: u64) -> Self {
        self.not_before = epoch_seconds;
        self
    }

    pub fn signature_algorithm(mut self, algorithm: ObjectIdentifier) -> Self {
        self.signature_algorithm = algorithm;
        self
    }

    pub fn key_usage(self, usage: KeyUsage) -> Self {
        let value = usage.to_der().expect("encode keyUsage");
        self.raw_extension(oid::KEY_USAGE, true, value)
    }

    pub fn ext_key_usage(self, purposes: &[ObjectIdentifier]) -> Self {
        let value = ExtendedKeyUsage(purposes.to_vec())
            .to_der()
            .expect("encode extKeyUsage");
        self.raw_extension(oid::EXT_KEY_USAGE, false, value)
    }

    pub fn policies(self, policies: &[ObjectIdentifier]) -> Self {
        let info = policies
            .iter()
            .map(|p| PolicyInformation {
                policy_identifier: *p,
                policy_qualifiers: None,
            })
            .collect();
        let value = CertificatePolicies(info)
            .to_der()
            .expect("encode certificatePolicies");
        self.raw_extension(oid::CERTIFICATE_POLICIES, false, value)
    }

    pub fn basic_constraints(self, ca: bool) -> Self {
        let value = BasicConstraints {
            ca,
            path_len_constraint: None,
        }
        .to_der()
        .expect("encode basicConstraints");
        self.raw_extension(oid::BASIC_CONSTRAINTS, true, value)
    }

    /// Add an extension with arbitrary (possibly malformed) contents.
    pub fn raw_extension(mut self, id: ObjectIdentifier, critical: bool, value: Vec<u8>) -> Self {
        self.extensions.push(Extension {
            extn_id: id,
            critical,
            extn_value: OctetString::new(value).expect("octet string"),
        });
        self
    }

    pub fn build(self) -> Certificate {
        let mut serial_tlv = vec![0x02, self.serial.len() as u8];
        serial_tlv.extend_from_slice(&self.serial);
        let serial_number = <SerialNumber as der::Decode>::from_der(&serial_tlv).expect("serial");

        let not_before = Duration::from_secs(self.not_before);
        let validity = Validity {
            not_before: Time::UtcTime(UtcTime::from_unix_duration(not_before).expect("notBefore")),
            not_after: Time::UtcTime(
                UtcTime::from_unix_duration(not_before + Duration::from_secs(TEN_YEARS))
                    .expect("notAfter"),
            ),
        };

        let algorithm = AlgorithmIdentifierOwned {
            oid: self.signature_algorithm,
            parameters: None,
        };
        let name = Name::from_str("CN=keyshare test,O=keyshare").expect("name");

        let tbs_certificate = TbsCertificate {
            version: Version::V3,
            serial_number,
            signature: algorithm.clone(),
            issuer: name.clone(),
            validity,
            subject: name,
            subject_public_key_info: self.spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!self.extensions.is_empty()).then_some(self.extensions),
        };

        Certificate {
            tbs_certificate,
            signature_algorithm: algorithm,
            signature: BitString::from_bytes(&[0u8; 8]).expect("signature"),
        }
    }

    pub fn to_der(self) -> Vec<u8> {
        self.build().to_der().expect("encode certificate")
    }
}
