#![forbid(unsafe_code)]

//! Raw private key buffers and their conversion to PKCS#8.
//!
//! A raw key buffer is the platform export of a key pair: the public part
//! followed by the private part, both fixed-width for the key size.
//!
//! | Key        | Public part          | Private part | Total  |
//! |------------|----------------------|--------------|--------|
//! | EC P-256   | `04 ‖ X ‖ Y` (65)    | scalar (32)  | 97     |
//! | EC P-384   | `04 ‖ X ‖ Y` (97)    | scalar (48)  | 145    |
//! | EC P-521   | `04 ‖ X ‖ Y` (133)   | scalar (66)  | 199    |
//! | RSA k-byte | modulus n (k)        | exponent d (k) | 2k   |
//!
//! The layout is inferred from the certificate's public key, and the public
//! part must equal the certificate's key. RSA primes are recovered from
//! `n`, `e`, and `d`.

use std::fmt;

use der::asn1::ObjectIdentifier;
use der::{AnyRef, Encode};
use keyshare_core::{oid, Error};
use pkcs8::{AlgorithmIdentifierRef, PrivateKeyInfo};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sec1::EcPrivateKey;
use spki::SubjectPublicKeyInfoOwned;

/// Supported elliptic curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    fn from_oid(curve: &ObjectIdentifier) -> Option<Self> {
        [EcCurve::P256, EcCurve::P384, EcCurve::P521]
            .into_iter()
            .find(|c| c.oid() == *curve)
    }

    pub fn oid(self) -> ObjectIdentifier {
        match self {
            EcCurve::P256 => oid::SECP256R1,
            EcCurve::P384 => oid::SECP384R1,
            EcCurve::P521 => oid::SECP521R1,
        }
    }

    /// Byte length of a field element and of the private scalar.
    pub fn field_len(self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }

    /// Uncompressed public point for `scalar`.
    fn public_point(self, scalar: &[u8]) -> Result<Vec<u8>, Error> {
        macro_rules! point {
            ($curve:ident, $name:expr) => {{
                use $curve::elliptic_curve::sec1::ToEncodedPoint;
                let secret = $curve::SecretKey::from_slice(scalar).map_err(|e| {
                    Error::KeyFormat(format!("invalid {} private scalar: {e}", $name))
                })?;
                secret.public_key().to_encoded_point(false).as_bytes().to_vec()
            }};
        }
        Ok(match self {
            EcCurve::P256 => point!(p256, self),
            EcCurve::P384 => point!(p384, self),
            EcCurve::P521 => point!(p521, self),
        })
    }
}

impl fmt::Display for EcCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
            EcCurve::P521 => "P-521",
        })
    }
}

/// Kind and size of a certificate's key, which fixes the raw buffer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Ec(EcCurve),
    /// RSA with a `modulus_len`-byte modulus.
    Rsa { modulus_len: usize },
}

impl KeyKind {
    /// Length of the public part of the raw buffer.
    pub fn public_len(self) -> usize {
        match self {
            KeyKind::Ec(curve) => 1 + 2 * curve.field_len(),
            KeyKind::Rsa { modulus_len } => modulus_len,
        }
    }

    /// Length of the private part of the raw buffer.
    pub fn private_len(self) -> usize {
        match self {
            KeyKind::Ec(curve) => curve.field_len(),
            KeyKind::Rsa { modulus_len } => modulus_len,
        }
    }

    /// Total raw buffer length.
    pub fn buffer_len(self) -> usize {
        self.public_len() + self.private_len()
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Ec(curve) => write!(f, "EC {curve}"),
            KeyKind::Rsa { modulus_len } => write!(f, "RSA-{}", modulus_len * 8),
        }
    }
}

/// A certificate public key, parsed.
enum CertKey<'a> {
    Ec { curve: EcCurve, point: &'a [u8] },
    Rsa(RsaPublicKey),
}

impl<'a> CertKey<'a> {
    fn from_spki(spki: &'a SubjectPublicKeyInfoOwned) -> Result<Self, Error> {
        let key_bits = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| Error::KeyFormat("certificate public key is not octet aligned".into()))?;

        let algorithm = spki.algorithm.oid;
        if algorithm == oid::EC_PUBLIC_KEY {
            let curve_oid = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|p| p.decode_as::<ObjectIdentifier>().ok())
                .ok_or_else(|| Error::KeyFormat("EC public key has no named curve".into()))?;
            let curve = EcCurve::from_oid(&curve_oid)
                .ok_or_else(|| Error::KeyFormat(format!("unsupported EC curve: {curve_oid}")))?;
            Ok(CertKey::Ec {
                curve,
                point: key_bits,
            })
        } else if algorithm == oid::RSA_ENCRYPTION {
            RsaPublicKey::from_pkcs1_der(key_bits)
                .map(CertKey::Rsa)
                .map_err(|e| Error::KeyFormat(format!("invalid RSA public key: {e}")))
        } else {
            Err(Error::KeyFormat(format!(
                "unsupported public key algorithm: {algorithm}"
            )))
        }
    }

    fn kind(&self) -> KeyKind {
        match self {
            CertKey::Ec { curve, .. } => KeyKind::Ec(*curve),
            CertKey::Rsa(key) => KeyKind::Rsa {
                modulus_len: key.size(),
            },
        }
    }
}

/// Key kind of the certificate's subject public key.
pub fn key_kind(spki: &SubjectPublicKeyInfoOwned) -> Result<KeyKind, Error> {
    Ok(CertKey::from_spki(spki)?.kind())
}

/// Convert `raw` into a PKCS#8 PrivateKeyInfo for the key in `spki`.
/// Also returns the key kind the buffer was read as.
pub(crate) fn private_key_info(
    spki: &SubjectPublicKeyInfoOwned,
    raw: &[u8],
) -> Result<(KeyKind, Vec<u8>), Error> {
    let cert_key = CertKey::from_spki(spki)?;
    let kind = cert_key.kind();
    if raw.len() != kind.buffer_len() {
        return Err(Error::KeyFormat(format!(
            "{kind} key buffer must be {} bytes ({} public + {} private), got {}",
            kind.buffer_len(),
            kind.public_len(),
            kind.private_len(),
            raw.len()
        )));
    }
    let (public, private) = raw.split_at(kind.public_len());

    let der = match cert_key {
        CertKey::Ec { curve, point } => {
            if public != point {
                return Err(Error::KeyFormat(
                    "public key in buffer does not match the certificate".into(),
                ));
            }
            ec_private_key_info(curve, public, private)?
        }
        CertKey::Rsa(cert_key) => rsa_private_key_info(&cert_key, public, private)?,
    };
    Ok((kind, der))
}

fn ec_private_key_info(curve: EcCurve, public: &[u8], scalar: &[u8]) -> Result<Vec<u8>, Error> {
    if curve.public_point(scalar)? != public {
        return Err(Error::KeyFormat(format!(
            "{curve} private scalar does not match the public key"
        )));
    }

    let ec_key = EcPrivateKey {
        private_key: scalar,
        parameters: None,
        public_key: Some(public),
    }
    .to_der()
    .map_err(|e| Error::Encoding(format!("failed to encode EC private key: {e}")))?;

    let curve_oid = curve.oid();
    let algorithm = AlgorithmIdentifierRef {
        oid: oid::EC_PUBLIC_KEY,
        parameters: Some(AnyRef::from(&curve_oid)),
    };
    PrivateKeyInfo::new(algorithm, &ec_key)
        .to_der()
        .map_err(|e| Error::Encoding(format!("failed to encode PKCS#8 key: {e}")))
}

fn rsa_private_key_info(
    cert_key: &RsaPublicKey,
    modulus: &[u8],
    exponent: &[u8],
) -> Result<Vec<u8>, Error> {
    let n = BigUint::from_bytes_be(modulus);
    if &n != cert_key.n() {
        return Err(Error::KeyFormat(
            "RSA modulus in buffer does not match the certificate".into(),
        ));
    }
    let d = BigUint::from_bytes_be(exponent);

    let key = RsaPrivateKey::from_components(n, cert_key.e().clone(), d, Vec::new())
        .map_err(|e| Error::KeyFormat(format!("RSA private exponent does not fit the key: {e}")))?;
    key.validate()
        .map_err(|e| Error::KeyFormat(format!("RSA private key is inconsistent: {e}")))?;

    let doc = key
        .to_pkcs8_der()
        .map_err(|e| Error::Encoding(format!("failed to encode PKCS#8 key: {e}")))?;
    Ok(doc.as_bytes().to_vec())
}
