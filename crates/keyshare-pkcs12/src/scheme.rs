#![forbid(unsafe_code)]

//! Password-based encryption of bag contents.
//!
//! Two schemes are written and read:
//! 1. PBES2 with PBKDF2 and AES-256-CBC (the default)
//! 2. pbeWithSHAAnd3-KeyTripleDES-CBC using the PKCS#12 KDF, for older readers

use cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use keyshare_core::Error;
use rand::RngCore;
use sha1::Sha1;
use sha2::Sha256;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, DERWriter};

use crate::kdf::{self, KdfHash};
use crate::oids::{self, oid};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type TdesCbcEnc = cbc::Encryptor<des::TdesEde3>;
type TdesCbcDec = cbc::Decryptor<des::TdesEde3>;

const PBES2_SALT_LEN: usize = 16;
const LEGACY_SALT_LEN: usize = 8;
const AES_KEY_LEN: usize = 32;
const AES_IV_LEN: usize = 16;
const TDES_KEY_LEN: usize = 24;
const TDES_IV_LEN: usize = 8;

/// Encryption scheme for the key and certificate bags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionScheme {
    /// PBES2: PBKDF2-HMAC-SHA256 with AES-256-CBC, integrity MAC over SHA-256.
    #[default]
    Pbes2Aes256Cbc,
    /// pbeWithSHAAnd3-KeyTripleDES-CBC, integrity MAC over SHA-1.
    PbeSha1And3Des,
}

impl EncryptionScheme {
    /// Hash used for the integrity MAC written alongside this scheme.
    pub(crate) fn mac_hash(self) -> KdfHash {
        match self {
            EncryptionScheme::Pbes2Aes256Cbc => KdfHash::Sha256,
            EncryptionScheme::PbeSha1And3Des => KdfHash::Sha1,
        }
    }
}

/// PRF of a PBKDF2 derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prf {
    HmacSha1,
    HmacSha256,
}

/// Concrete parameters of one encryption: algorithm, salt, iterations, IV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PbeParams {
    PbeSha1And3Des {
        salt: Vec<u8>,
        iterations: u32,
    },
    Pbes2 {
        salt: Vec<u8>,
        iterations: u32,
        prf: Prf,
        iv: Vec<u8>,
    },
}

impl PbeParams {
    /// Fresh parameters with a random salt (and IV, for PBES2).
    pub(crate) fn generate(scheme: EncryptionScheme, iterations: u32) -> Self {
        match scheme {
            EncryptionScheme::Pbes2Aes256Cbc => PbeParams::Pbes2 {
                salt: random_bytes(PBES2_SALT_LEN),
                iterations,
                prf: Prf::HmacSha256,
                iv: random_bytes(AES_IV_LEN),
            },
            EncryptionScheme::PbeSha1And3Des => PbeParams::PbeSha1And3Des {
                salt: random_bytes(LEGACY_SALT_LEN),
                iterations,
            },
        }
    }

    pub(crate) fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>, Error> {
        match self {
            PbeParams::PbeSha1And3Des { salt, iterations } => {
                let (key, iv) = legacy_key_iv(password, salt, *iterations);
                let enc = TdesCbcEnc::new_from_slices(&key, &iv)
                    .map_err(|e| Error::Encoding(format!("3DES-CBC init failed: {e}")))?;
                Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
            }
            PbeParams::Pbes2 {
                salt,
                iterations,
                prf,
                iv,
            } => {
                let key = pbkdf2_key(*prf, password, salt, *iterations);
                let enc = Aes256CbcEnc::new_from_slices(&key, iv)
                    .map_err(|e| Error::Encoding(format!("AES-256-CBC init failed: {e}")))?;
                Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
            }
        }
    }

    pub(crate) fn decrypt(&self, ciphertext: &[u8], password: &str) -> Result<Vec<u8>, Error> {
        match self {
            PbeParams::PbeSha1And3Des { salt, iterations } => {
                let (key, iv) = legacy_key_iv(password, salt, *iterations);
                TdesCbcDec::new_from_slices(&key, &iv)
                    .map_err(|e| Error::Decryption(format!("3DES-CBC init failed: {e}")))?
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|e| Error::Decryption(format!("3DES-CBC decrypt/unpad failed: {e}")))
            }
            PbeParams::Pbes2 {
                salt,
                iterations,
                prf,
                iv,
            } => {
                let key = pbkdf2_key(*prf, password, salt, *iterations);
                Aes256CbcDec::new_from_slices(&key, iv)
                    .map_err(|e| Error::Decryption(format!("AES-256-CBC init failed: {e}")))?
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|e| {
                        Error::Decryption(format!("AES-256-CBC decrypt/unpad failed: {e}"))
                    })
            }
        }
    }

    /// Write the AlgorithmIdentifier describing these parameters.
    pub(crate) fn write(&self, w: DERWriter) {
        w.write_sequence(|w| match self {
            PbeParams::PbeSha1And3Des { salt, iterations } => {
                w.next().write_oid(&oid(oids::PBE_SHA1_3DES));
                w.next().write_sequence(|w| {
                    w.next().write_bytes(salt);
                    w.next().write_u32(*iterations);
                });
            }
            PbeParams::Pbes2 {
                salt,
                iterations,
                prf,
                iv,
            } => {
                w.next().write_oid(&oid(oids::PBES2));
                w.next().write_sequence(|w| {
                    // keyDerivationFunc
                    w.next().write_sequence(|w| {
                        w.next().write_oid(&oid(oids::PBKDF2));
                        w.next().write_sequence(|w| {
                            w.next().write_bytes(salt);
                            w.next().write_u32(*iterations);
                            w.next().write_sequence(|w| {
                                w.next().write_oid(&oid(prf.oid()));
                                w.next().write_null();
                            });
                        });
                    });
                    // encryptionScheme
                    w.next().write_sequence(|w| {
                        w.next().write_oid(&oid(oids::AES_256_CBC));
                        w.next().write_bytes(iv);
                    });
                });
            }
        })
    }

    /// Read an AlgorithmIdentifier naming one of the supported schemes.
    pub(crate) fn read(r: BERReader) -> Result<Self, ASN1Error> {
        r.read_sequence(|r| {
            let alg = r.next().read_oid()?;
            if alg == oid(oids::PBE_SHA1_3DES) {
                r.next().read_sequence(|r| {
                    let salt = r.next().read_bytes()?;
                    let iterations = r.next().read_u32()?;
                    Ok(PbeParams::PbeSha1And3Des { salt, iterations })
                })
            } else if alg == oid(oids::PBES2) {
                r.next().read_sequence(|r| {
                    let (salt, iterations, prf) = r.next().read_sequence(|r| {
                        if r.next().read_oid()? != oid(oids::PBKDF2) {
                            return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                        }
                        r.next().read_sequence(read_pbkdf2_params)
                    })?;
                    let iv = r.next().read_sequence(|r| {
                        if r.next().read_oid()? != oid(oids::AES_256_CBC) {
                            return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                        }
                        r.next().read_bytes()
                    })?;
                    Ok(PbeParams::Pbes2 {
                        salt,
                        iterations,
                        prf,
                        iv,
                    })
                })
            } else {
                Err(ASN1Error::new(ASN1ErrorKind::Invalid))
            }
        })
    }
}

impl Prf {
    fn oid(self) -> &'static [u64] {
        match self {
            Prf::HmacSha1 => oids::HMAC_SHA1,
            Prf::HmacSha256 => oids::HMAC_SHA256,
        }
    }
}

/// PBKDF2-params: salt, iterationCount, then optional keyLength and prf.
fn read_pbkdf2_params(
    r: &mut yasna::BERReaderSeq,
) -> Result<(Vec<u8>, u32, Prf), ASN1Error> {
    let salt = r.next().read_bytes()?;
    let iterations = r.next().read_u32()?;
    // The PRF defaults to HMAC-SHA1; keyLength is implied by the cipher.
    let mut prf = Prf::HmacSha1;
    while let Some(der) = r.read_optional(|r| r.read_der())? {
        if der.first() == Some(&0x30) {
            prf = read_prf(&der)?;
        }
    }
    Ok((salt, iterations, prf))
}

fn read_prf(der: &[u8]) -> Result<Prf, ASN1Error> {
    yasna::parse_der(der, |r| {
        r.read_sequence(|r| {
            let alg = r.next().read_oid()?;
            r.read_optional(|r| r.read_null())?;
            if alg == oid(oids::HMAC_SHA256) {
                Ok(Prf::HmacSha256)
            } else if alg == oid(oids::HMAC_SHA1) {
                Ok(Prf::HmacSha1)
            } else {
                Err(ASN1Error::new(ASN1ErrorKind::Invalid))
            }
        })
    })
}

fn pbkdf2_key(prf: Prf, password: &str, salt: &[u8], iterations: u32) -> [u8; AES_KEY_LEN] {
    let mut key = [0u8; AES_KEY_LEN];
    match prf {
        Prf::HmacSha1 => {
            pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, iterations, &mut key)
        }
        Prf::HmacSha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key)
        }
    }
    key
}

fn legacy_key_iv(password: &str, salt: &[u8], iterations: u32) -> (Vec<u8>, Vec<u8>) {
    let bmp = kdf::bmp_password(password);
    let key = KdfHash::Sha1.derive(kdf::ID_KEY, &bmp, salt, iterations, TDES_KEY_LEN);
    let iv = KdfHash::Sha1.derive(kdf::ID_IV, &bmp, salt, iterations, TDES_IV_LEN);
    (key, iv)
}

pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}
