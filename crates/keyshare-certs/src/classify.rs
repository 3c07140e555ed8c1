#![forbid(unsafe_code)]

//! Certificate role classification.
//!
//! Roles are derived from four extensions, checked in priority order:
//!
//! 1. certificatePolicies naming a device policy → [`CertRole::Device`]
//! 2. keyUsage asserting nonRepudiation without encipherment → [`CertRole::Signature`]
//! 3. keyUsage limited to encipherment / key agreement → [`CertRole::Encryption`]
//! 4. digitalSignature-only keyUsage with a client authentication purpose,
//!    a PIV authentication policy, or no extKeyUsage → [`CertRole::Authentication`]
//!
//! CA certificates and certificates whose relevant extensions fail to decode
//! are [`CertRole::Unknown`].

use der::asn1::ObjectIdentifier;
use der::Decode;
use keyshare_core::oid;
use x509_cert::ext::pkix::{BasicConstraints, CertificatePolicies, ExtendedKeyUsage, KeyUsage};

use crate::fields::CertificateFields;
use crate::role::CertRole;

/// Policies issued to device identities.
const DEVICE_POLICIES: &[ObjectIdentifier] =
    &[oid::FPKI_COMMON_DEVICES, oid::FPKI_COMMON_DEVICES_HARDWARE];

/// Policies issued to PIV and derived PIV authentication identities.
const AUTHENTICATION_POLICIES: &[ObjectIdentifier] = &[
    oid::FPKI_COMMON_AUTHENTICATION,
    oid::FPKI_COMMON_DERIVED_PIV_AUTH,
    oid::FPKI_COMMON_DERIVED_PIV_AUTH_HARDWARE,
];

const AUTHENTICATION_PURPOSES: &[ObjectIdentifier] = &[
    oid::KP_CLIENT_AUTH,
    oid::MS_SMARTCARD_LOGON,
    oid::PIV_AUTH,
    oid::ANY_EXTENDED_KEY_USAGE,
];

/// Classify a certificate. Never fails.
pub fn classify<C>(cert: &C) -> CertRole
where
    C: CertificateFields + ?Sized,
{
    let markers = match Markers::read(cert) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("certificate extension failed to decode, classifying as unknown: {e}");
            return CertRole::Unknown;
        }
    };
    let role = markers.role();
    tracing::debug!(%role, "classified certificate");
    role
}

/// The extension content classification looks at.
struct Markers {
    ca: bool,
    policies: Vec<ObjectIdentifier>,
    key_usage: Option<Usage>,
    purposes: Option<Vec<ObjectIdentifier>>,
}

/// keyUsage bits folded into the three groups that matter here.
#[derive(Clone, Copy)]
struct Usage {
    sign: bool,
    commit: bool,
    encipher: bool,
}

impl From<&KeyUsage> for Usage {
    fn from(ku: &KeyUsage) -> Self {
        Self {
            sign: ku.digital_signature(),
            commit: ku.non_repudiation(),
            encipher: ku.key_encipherment() || ku.data_encipherment() || ku.key_agreement(),
        }
    }
}

impl Markers {
    fn read<C>(cert: &C) -> Result<Self, der::Error>
    where
        C: CertificateFields + ?Sized,
    {
        let ca = match cert.extension_value(&oid::BASIC_CONSTRAINTS) {
            Some(v) => BasicConstraints::from_der(v)?.ca,
            None => false,
        };
        let policies = match cert.extension_value(&oid::CERTIFICATE_POLICIES) {
            Some(v) => CertificatePolicies::from_der(v)?
                .0
                .into_iter()
                .map(|p| p.policy_identifier)
                .collect(),
            None => Vec::new(),
        };
        let key_usage = cert
            .extension_value(&oid::KEY_USAGE)
            .map(KeyUsage::from_der)
            .transpose()?
            .map(|ku| Usage::from(&ku));
        let purposes = cert
            .extension_value(&oid::EXT_KEY_USAGE)
            .map(ExtendedKeyUsage::from_der)
            .transpose()?
            .map(|eku| eku.0);

        Ok(Self {
            ca,
            policies,
            key_usage,
            purposes,
        })
    }

    fn role(&self) -> CertRole {
        if self.ca {
            return CertRole::Unknown;
        }
        if self.has_policy(DEVICE_POLICIES) {
            return CertRole::Device;
        }

        match self.key_usage {
            Some(u) if u.commit && !u.encipher => return CertRole::Signature,
            Some(u) if u.encipher && !u.sign && !u.commit => return CertRole::Encryption,
            _ => {}
        }

        let signing_only = match self.key_usage {
            Some(u) => u.sign && !u.commit && !u.encipher,
            None => true,
        };
        if !signing_only {
            return CertRole::Unknown;
        }

        let auth_purpose = self
            .purposes
            .as_ref()
            .is_some_and(|p| p.iter().any(|oid| AUTHENTICATION_PURPOSES.contains(oid)));
        let bare_signing_key = self.key_usage.is_some() && self.purposes.is_none();

        if auth_purpose || bare_signing_key || self.has_policy(AUTHENTICATION_POLICIES) {
            CertRole::Authentication
        } else {
            CertRole::Unknown
        }
    }

    fn has_policy(&self, wanted: &[ObjectIdentifier]) -> bool {
        self.policies.iter().any(|p| wanted.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testcert::TestCert;
    use x509_cert::ext::pkix::KeyUsages;

    #[test]
    fn test_device_policy() {
        let cert = TestCert::placeholder()
            .policies(&[oid::FPKI_COMMON_DEVICES_HARDWARE])
            .key_usage(KeyUsage(KeyUsages::DigitalSignature.into()))
            .build();
        assert_eq!(classify(&cert), CertRole::Device);
    }

    #[test]
    fn test_device_wins_over_key_usage() {
        let cert = TestCert::placeholder()
            .policies(&[oid::FPKI_COMMON_DEVICES])
            .key_usage(KeyUsage(
                KeyUsages::DigitalSignature | KeyUsages::NonRepudiation,
            ))
            .build();
        assert_eq!(classify(&cert), CertRole::Device);
    }

    #[test]
    fn test_signature() {
        let cert = TestCert::placeholder()
            .key_usage(KeyUsage(
                KeyUsages::DigitalSignature | KeyUsages::NonRepudiation,
            ))
            .ext_key_usage(&[oid::KP_EMAIL_PROTECTION])
            .build();
        assert_eq!(classify(&cert), CertRole::Signature);
    }

    #[test]
    fn test_non_repudiation_alone_is_signature() {
        let cert = TestCert::placeholder()
            .key_usage(KeyUsage(KeyUsages::NonRepudiation.into()))
            .build();
        assert_eq!(classify(&cert), CertRole::Signature);
    }

    #[test]
    fn test_encryption() {
        let cert = TestCert::placeholder()
            .key_usage(KeyUsage(KeyUsages::KeyEncipherment.into()))
            .build();
        assert_eq!(classify(&cert), CertRole::Encryption);

        let cert = TestCert::placeholder()
            .key_usage(KeyUsage(KeyUsages::KeyAgreement.into()))
            .ext_key_usage(&[oid::KP_EMAIL_PROTECTION])
            .build();
        assert_eq!(classify(&cert), CertRole::Encryption);
    }

    #[test]
    fn test_authentication_by_purpose() {
        let cert = TestCert::placeholder()
            .key_usage(KeyUsage(KeyUsages::DigitalSignature.into()))
            .ext_key_usage(&[oid::KP_CLIENT_AUTH, oid::MS_SMARTCARD_LOGON])
            .build();
        assert_eq!(classify(&cert), CertRole::Authentication);
    }

    #[test]
    fn test_authentication_by_policy() {
        let cert = TestCert::placeholder()
            .policies(&[oid::FPKI_COMMON_DERIVED_PIV_AUTH_HARDWARE])
            .build();
        assert_eq!(classify(&cert), CertRole::Authentication);
    }

    #[test]
    fn test_bare_digital_signature_is_authentication() {
        let cert = TestCert::placeholder()
            .key_usage(KeyUsage(KeyUsages::DigitalSignature.into()))
            .build();
        assert_eq!(classify(&cert), CertRole::Authentication);
    }

    #[test]
    fn test_no_extensions_is_unknown() {
        let cert = TestCert::placeholder().build();
        assert_eq!(classify(&cert), CertRole::Unknown);
    }

    #[test]
    fn test_conflicting_usage_is_unknown() {
        let cert = TestCert::placeholder()
            .key_usage(KeyUsage(
                KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment,
            ))
            .build();
        assert_eq!(classify(&cert), CertRole::Unknown);

        let cert = TestCert::placeholder()
            .key_usage(KeyUsage(
                KeyUsages::NonRepudiation | KeyUsages::DataEncipherment,
            ))
            .build();
        assert_eq!(classify(&cert), CertRole::Unknown);
    }

    #[test]
    fn test_signing_key_without_auth_purpose_is_unknown() {
        let cert = TestCert::placeholder()
            .key_usage(KeyUsage(KeyUsages::DigitalSignature.into()))
            .ext_key_usage(&[oid::KP_EMAIL_PROTECTION])
            .build();
        assert_eq!(classify(&cert), CertRole::Unknown);
    }

    #[test]
    fn test_server_auth_is_not_authentication() {
        let cert = TestCert::placeholder()
            .key_usage(KeyUsage(KeyUsages::DigitalSignature.into()))
            .ext_key_usage(&[oid::KP_SERVER_AUTH])
            .build();
        assert_eq!(classify(&cert), CertRole::Unknown);
    }

    #[test]
    fn test_hardware_policy_alone_is_unknown() {
        let cert = TestCert::placeholder()
            .policies(&[oid::FPKI_COMMON_HARDWARE])
            .build();
        assert_eq!(classify(&cert), CertRole::Unknown);
    }

    #[test]
    fn test_ca_is_unknown() {
        let cert = TestCert::placeholder()
            .basic_constraints(true)
            .key_usage(KeyUsage(KeyUsages::KeyCertSign.into()))
            .policies(&[oid::FPKI_COMMON_DEVICES])
            .build();
        assert_eq!(classify(&cert), CertRole::Unknown);
    }

    #[test]
    fn test_end_entity_basic_constraints_allowed() {
        let cert = TestCert::placeholder()
            .basic_constraints(false)
            .key_usage(KeyUsage(KeyUsages::KeyEncipherment.into()))
            .build();
        assert_eq!(classify(&cert), CertRole::Encryption);
    }

    #[test]
    fn test_malformed_extension_is_unknown() {
        let cert = TestCert::placeholder()
            .policies(&[oid::FPKI_COMMON_DEVICES])
            .raw_extension(oid::KEY_USAGE, true, vec![0x04, 0x01, 0xFF])
            .build();
        assert_eq!(classify(&cert), CertRole::Unknown);
    }

    #[test]
    fn test_classification_survives_der_round_trip() {
        let der = TestCert::placeholder()
            .key_usage(KeyUsage(
                KeyUsages::DigitalSignature | KeyUsages::NonRepudiation,
            ))
            .to_der();
        let cert = crate::fields::decode_certificate(&der).unwrap();
        assert_eq!(classify(&cert), CertRole::Signature);
    }
}
