#![forbid(unsafe_code)]

//! Object identifiers for the PFX structure, in the form `yasna` reads and writes.

use yasna::models::ObjectIdentifier;

// PKCS#7 content types
pub(crate) const DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
pub(crate) const ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];

// PKCS#12 bag types
pub(crate) const PKCS8_SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
pub(crate) const CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];
pub(crate) const X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];

// PKCS#9 bag attributes
pub(crate) const FRIENDLY_NAME: &[u64] = &[1, 2, 840, 113549, 1, 9, 20];
pub(crate) const LOCAL_KEY_ID: &[u64] = &[1, 2, 840, 113549, 1, 9, 21];

// Password-based encryption
pub(crate) const PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
pub(crate) const PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
pub(crate) const PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];
pub(crate) const AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];

// Digests and PRFs
pub(crate) const SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
pub(crate) const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
pub(crate) const HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
pub(crate) const HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];

pub(crate) fn oid(components: &[u64]) -> ObjectIdentifier {
    ObjectIdentifier::from_slice(components)
}
