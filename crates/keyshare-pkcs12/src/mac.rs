#![forbid(unsafe_code)]

//! Password integrity MAC over the authenticated safe.

use hmac::{Hmac, Mac};
use keyshare_core::Error;
use sha1::Sha1;
use sha2::Sha256;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, DERWriter};

use crate::kdf::{self, KdfHash};
use crate::oids::{self, oid};
use crate::scheme::random_bytes;

const MAC_SALT_LEN: usize = 16;

/// The `MacData` of a PFX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MacData {
    hash: KdfHash,
    digest: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
}

impl MacData {
    /// MAC `auth_safe` under `password` with a fresh salt.
    pub(crate) fn compute(
        hash: KdfHash,
        iterations: u32,
        auth_safe: &[u8],
        password: &str,
    ) -> Result<Self, Error> {
        let salt = random_bytes(MAC_SALT_LEN);
        let digest = hmac(hash, &salt, iterations, password, auth_safe, Error::Encoding)?
            .finalize_vec();
        Ok(Self {
            hash,
            digest,
            salt,
            iterations,
        })
    }

    /// Check the MAC over `auth_safe`, in constant time.
    pub(crate) fn verify(&self, auth_safe: &[u8], password: &str) -> Result<(), Error> {
        hmac(
            self.hash,
            &self.salt,
            self.iterations,
            password,
            auth_safe,
            Error::Decryption,
        )?
        .verify(&self.digest)
        .map_err(|_| Error::Decryption("PKCS#12 MAC verification failed (wrong password?)".into()))
    }

    pub(crate) fn write(&self, w: DERWriter) {
        w.write_sequence(|w| {
            // DigestInfo
            w.next().write_sequence(|w| {
                w.next().write_sequence(|w| {
                    let alg = match self.hash {
                        KdfHash::Sha1 => oids::SHA1,
                        KdfHash::Sha256 => oids::SHA256,
                    };
                    w.next().write_oid(&oid(alg));
                    w.next().write_null();
                });
                w.next().write_bytes(&self.digest);
            });
            w.next().write_bytes(&self.salt);
            w.next().write_u32(self.iterations);
        })
    }

    pub(crate) fn read(r: BERReader) -> Result<Self, ASN1Error> {
        r.read_sequence(|r| {
            let (hash, digest) = r.next().read_sequence(|r| {
                let hash = r.next().read_sequence(|r| {
                    let alg = r.next().read_oid()?;
                    r.read_optional(|r| r.read_null())?;
                    if alg == oid(oids::SHA256) {
                        Ok(KdfHash::Sha256)
                    } else if alg == oid(oids::SHA1) {
                        Ok(KdfHash::Sha1)
                    } else {
                        Err(ASN1Error::new(ASN1ErrorKind::Invalid))
                    }
                })?;
                let digest = r.next().read_bytes()?;
                Ok((hash, digest))
            })?;
            let salt = r.next().read_bytes()?;
            // iterations DEFAULT 1
            let iterations = r.read_optional(|r| r.read_u32())?.unwrap_or(1);
            Ok(Self {
                hash,
                digest,
                salt,
                iterations,
            })
        })
    }
}

/// Keyed HMAC state over `data`, ready to finalize or verify.
enum Keyed {
    Sha1(Hmac<Sha1>),
    Sha256(Hmac<Sha256>),
}

impl Keyed {
    fn finalize_vec(self) -> Vec<u8> {
        match self {
            Keyed::Sha1(m) => m.finalize().into_bytes().to_vec(),
            Keyed::Sha256(m) => m.finalize().into_bytes().to_vec(),
        }
    }

    fn verify(self, expected: &[u8]) -> Result<(), hmac::digest::MacError> {
        match self {
            Keyed::Sha1(m) => m.verify_slice(expected),
            Keyed::Sha256(m) => m.verify_slice(expected),
        }
    }
}

fn hmac(
    hash: KdfHash,
    salt: &[u8],
    iterations: u32,
    password: &str,
    data: &[u8],
    err: fn(String) -> Error,
) -> Result<Keyed, Error> {
    let key = hash.derive(
        kdf::ID_MAC,
        &kdf::bmp_password(password),
        salt,
        iterations,
        hash.output_len(),
    );
    let init_err = |e: hmac::digest::InvalidLength| err(format!("HMAC init failed: {e}"));
    Ok(match hash {
        KdfHash::Sha1 => {
            let mut m = Hmac::<Sha1>::new_from_slice(&key).map_err(init_err)?;
            m.update(data);
            Keyed::Sha1(m)
        }
        KdfHash::Sha256 => {
            let mut m = Hmac::<Sha256>::new_from_slice(&key).map_err(init_err)?;
            m.update(data);
            Keyed::Sha256(m)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_accepts_right_password() {
        for hash in [KdfHash::Sha1, KdfHash::Sha256] {
            let mac = MacData::compute(hash, 2048, b"auth safe", "pw").unwrap();
            assert_eq!(mac.digest.len(), hash.output_len());
            mac.verify(b"auth safe", "pw").unwrap();
        }
    }

    #[test]
    fn test_verify_rejects_wrong_password_or_data() {
        let mac = MacData::compute(KdfHash::Sha256, 10, b"auth safe", "pw").unwrap();
        assert!(matches!(mac.verify(b"auth safe", "pW"), Err(Error::Decryption(_))));
        assert!(matches!(mac.verify(b"auth safe!", "pw"), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_mac_data_encoding_round_trip() {
        let mac = MacData::compute(KdfHash::Sha256, 2048, b"x", "pw").unwrap();
        let der = yasna::construct_der(|w| mac.write(w));
        let back = yasna::parse_der(&der, MacData::read).unwrap();
        assert_eq!(back, mac);
    }

    #[test]
    fn test_missing_iterations_default_to_one() {
        let mac = MacData::compute(KdfHash::Sha1, 1, b"data", "pw").unwrap();
        let der = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_sequence(|w| {
                        w.next().write_oid(&oid(oids::SHA1));
                    });
                    w.next().write_bytes(&mac.digest);
                });
                w.next().write_bytes(&mac.salt);
            })
        });
        let back = yasna::parse_der(&der, MacData::read).unwrap();
        assert_eq!(back.iterations, 1);
        back.verify(b"data", "pw").unwrap();
    }
}
