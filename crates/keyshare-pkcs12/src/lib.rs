#![forbid(unsafe_code)]

//! PKCS#12 export for keyshare.
//!
//! Turns a DER certificate plus the raw key buffer a platform key store
//! hands out into a password-protected PKCS#12 container, and reads such
//! containers back. Writes PBES2 (PBKDF2 + AES-256-CBC) by default and the
//! legacy SHA-1 + 3DES scheme on request; reads both.

mod kdf;
mod keybuf;
mod mac;
mod oids;
mod parse;
mod password;
mod pfx;
mod scheme;

use der::Decode;
use keyshare_core::Error;
use x509_cert::Certificate;

pub use keybuf::{key_kind, EcCurve, KeyKind};
pub use password::{generate_password, DEFAULT_PASSWORD_LEN};
pub use scheme::EncryptionScheme;

/// Options for building a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkcs12Options {
    /// Encryption for both bags; also selects the MAC hash.
    pub scheme: EncryptionScheme,
    /// Key derivation iterations for bag encryption.
    pub iterations: u32,
    /// Key derivation iterations for the integrity MAC.
    pub mac_iterations: u32,
    /// `friendlyName` attribute for both bags.
    pub friendly_name: Option<String>,
}

impl Default for Pkcs12Options {
    fn default() -> Self {
        Self {
            scheme: EncryptionScheme::default(),
            iterations: 2048,
            mac_iterations: 2048,
            friendly_name: None,
        }
    }
}

impl Pkcs12Options {
    /// Defaults with the legacy SHA-1 + 3DES scheme.
    pub fn legacy() -> Self {
        Self {
            scheme: EncryptionScheme::PbeSha1And3Des,
            ..Self::default()
        }
    }
}

/// One certificate or private key from a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkcs12Entry {
    /// DER certificate, or DER PKCS#8 PrivateKeyInfo for keys.
    pub der: Vec<u8>,
    pub local_key_id: Option<Vec<u8>>,
    pub friendly_name: Option<String>,
}

impl Pkcs12Entry {
    fn new(der: Vec<u8>, attributes: pfx::BagAttributes) -> Self {
        Self {
            der,
            local_key_id: attributes.local_key_id,
            friendly_name: attributes.friendly_name,
        }
    }
}

/// Contents extracted from a PKCS#12 file.
#[derive(Debug, Clone, Default)]
pub struct Pkcs12Contents {
    pub private_keys: Vec<Pkcs12Entry>,
    pub certificates: Vec<Pkcs12Entry>,
}

/// Build a PKCS#12 container from a certificate and its raw key buffer
/// with the default options.
///
/// Fails with [`Error::KeyFormat`] when the certificate does not decode,
/// its key type is unsupported, or `raw_key` does not fit it, and with
/// [`Error::Encoding`] when the container cannot be produced.
pub fn assemble(cert_der: &[u8], raw_key: &[u8], password: &str) -> Result<Vec<u8>, Error> {
    assemble_with_options(cert_der, raw_key, password, &Pkcs12Options::default())
}

/// [`assemble`] with explicit options.
pub fn assemble_with_options(
    cert_der: &[u8],
    raw_key: &[u8],
    password: &str,
    options: &Pkcs12Options,
) -> Result<Vec<u8>, Error> {
    let cert = Certificate::from_der(cert_der)
        .map_err(|e| Error::KeyFormat(format!("failed to parse X.509 certificate: {e}")))?;
    let spki = &cert.tbs_certificate.subject_public_key_info;

    let (kind, pkcs8_der) = keybuf::private_key_info(spki, raw_key)?;
    let pfx = pfx::encode_pfx(cert_der, &pkcs8_der, password, options)?;

    tracing::debug!(
        scheme = ?options.scheme,
        key = %kind,
        size = pfx.len(),
        "assembled PKCS#12 container"
    );
    Ok(pfx)
}

/// Open a PKCS#12 file, verifying its MAC and decrypting with `password`.
pub fn open_pkcs12(data: &[u8], password: &str) -> Result<Pkcs12Contents, Error> {
    parse::parse_pfx(data, password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyshare_certs::testcert::TestCert;
    use p256::elliptic_curve::sec1::ToEncodedPoint;
    use p256::pkcs8::{DecodePrivateKey, EncodePublicKey};
    use rsa::traits::{PrivateKeyParts, PublicKeyParts};
    use sha1::{Digest, Sha1};
    use spki::SubjectPublicKeyInfoOwned;

    fn spki_of(doc: der::Document) -> SubjectPublicKeyInfoOwned {
        SubjectPublicKeyInfoOwned::from_der(doc.as_bytes()).unwrap()
    }

    /// A P-256 certificate and its raw key buffer.
    fn p256_identity() -> (Vec<u8>, Vec<u8>, p256::SecretKey) {
        let secret = p256::SecretKey::from_slice(&[0x3C; 32]).unwrap();
        let cert = TestCert::new(spki_of(secret.public_key().to_public_key_der().unwrap()))
            .serial(&[0x00, 0x9A, 0x01])
            .to_der();
        let point = secret.public_key().to_encoded_point(false);
        let raw = [point.as_bytes(), &secret.to_bytes()[..]].concat();
        (cert, raw, secret)
    }

    #[test]
    fn test_ec_round_trip() {
        let (cert, raw, secret) = p256_identity();
        let p12 = assemble(&cert, &raw, "correct horse").unwrap();

        let contents = open_pkcs12(&p12, "correct horse").unwrap();
        assert_eq!(contents.certificates.len(), 1);
        assert_eq!(contents.private_keys.len(), 1);
        assert_eq!(contents.certificates[0].der, cert);

        let key = p256::SecretKey::from_pkcs8_der(&contents.private_keys[0].der).unwrap();
        assert_eq!(key.public_key(), secret.public_key());
    }

    #[test]
    fn test_rsa_round_trip() {
        let key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let spki = spki_of(
            rsa::pkcs8::EncodePublicKey::to_public_key_der(&key.to_public_key()).unwrap(),
        );
        let cert = TestCert::new(spki)
            .signature_algorithm(keyshare_core::oid::SHA256_WITH_RSA)
            .to_der();

        let k = key.size();
        let pad = |x: &rsa::BigUint| {
            let bytes = x.to_bytes_be();
            [vec![0u8; k - bytes.len()], bytes].concat()
        };
        let raw = [pad(key.n()), pad(key.d())].concat();

        let p12 = assemble(&cert, &raw, "pw").unwrap();
        let contents = open_pkcs12(&p12, "pw").unwrap();
        assert_eq!(contents.certificates[0].der, cert);
        let back = rsa::RsaPrivateKey::from_pkcs8_der(&contents.private_keys[0].der).unwrap();
        assert_eq!(back.to_public_key(), key.to_public_key());
    }

    #[test]
    fn test_legacy_round_trip() {
        let (cert, raw, secret) = p256_identity();
        let p12 = assemble_with_options(&cert, &raw, "pw", &Pkcs12Options::legacy()).unwrap();
        let contents = open_pkcs12(&p12, "pw").unwrap();
        assert_eq!(contents.certificates[0].der, cert);
        let key = p256::SecretKey::from_pkcs8_der(&contents.private_keys[0].der).unwrap();
        assert_eq!(key.to_bytes(), secret.to_bytes());
    }

    #[test]
    fn test_bag_attributes() {
        let (cert, raw, _) = p256_identity();
        let options = Pkcs12Options {
            friendly_name: Some("Signature 009A01".into()),
            ..Pkcs12Options::default()
        };
        let p12 = assemble_with_options(&cert, &raw, "pw", &options).unwrap();
        let contents = open_pkcs12(&p12, "pw").unwrap();

        let local_key_id = Sha1::digest(&cert).to_vec();
        for entry in contents.certificates.iter().chain(&contents.private_keys) {
            assert_eq!(entry.local_key_id.as_deref(), Some(&local_key_id[..]));
            assert_eq!(entry.friendly_name.as_deref(), Some("Signature 009A01"));
        }
    }

    #[test]
    fn test_empty_password() {
        let (cert, raw, _) = p256_identity();
        let p12 = assemble(&cert, &raw, "").unwrap();
        assert_eq!(open_pkcs12(&p12, "").unwrap().private_keys.len(), 1);
    }

    #[test]
    fn test_wrong_password_fails_mac() {
        let (cert, raw, _) = p256_identity();
        let p12 = assemble(&cert, &raw, "right").unwrap();
        let err = open_pkcs12(&p12, "wrong").unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
        assert!(err.to_string().contains("MAC verification failed"), "{err}");
    }

    #[test]
    fn test_salts_are_fresh() {
        let (cert, raw, _) = p256_identity();
        let a = assemble(&cert, &raw, "pw").unwrap();
        let b = assemble(&cert, &raw, "pw").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_off_by_one_buffers_rejected() {
        let (cert, raw, _) = p256_identity();
        assert_eq!(raw.len(), 97);
        let short = &raw[..96];
        let mut long = raw.clone();
        long.push(0);
        for buf in [short, &long[..]] {
            let err = assemble(&cert, buf, "pw").unwrap_err();
            assert!(matches!(err, Error::KeyFormat(_)), "{err}");
        }
    }

    #[test]
    fn test_undecodable_certificate_rejected() {
        let (_, raw, _) = p256_identity();
        let err = assemble(&[0x30, 0x00], &raw, "pw").unwrap_err();
        assert!(matches!(err, Error::KeyFormat(_)));
    }

    #[test]
    fn test_key_for_another_certificate_rejected() {
        let (_, raw, _) = p256_identity();
        let other = p256::SecretKey::from_slice(&[0x55; 32]).unwrap();
        let cert = TestCert::new(spki_of(other.public_key().to_public_key_der().unwrap())).to_der();
        let err = assemble(&cert, &raw, "pw").unwrap_err();
        assert!(matches!(err, Error::KeyFormat(_)));
    }

    #[test]
    fn test_expected_buffer_length() {
        let (cert, _, _) = p256_identity();
        let cert = Certificate::from_der(&cert).unwrap();
        let kind = key_kind(&cert.tbs_certificate.subject_public_key_info).unwrap();
        assert_eq!(kind, KeyKind::Ec(EcCurve::P256));
        assert_eq!(kind.buffer_len(), 97);
        assert_eq!(kind.to_string(), "EC P-256");
    }
}
