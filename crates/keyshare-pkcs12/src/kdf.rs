#![forbid(unsafe_code)]

//! The PKCS#12 key derivation function (RFC 7292 Appendix B).
//!
//! Used for the integrity MAC key and for the key and IV of the legacy
//! triple-DES scheme. PBES2 derives its key with PBKDF2 instead.

use sha1::Sha1;
use sha2::digest::FixedOutputReset;
use sha2::{Digest, Sha256};

/// Diversifier for a cipher key.
pub(crate) const ID_KEY: u8 = 1;
/// Diversifier for a cipher IV.
pub(crate) const ID_IV: u8 = 2;
/// Diversifier for a MAC key.
pub(crate) const ID_MAC: u8 = 3;

/// Block size of SHA-1 and SHA-256.
const V: usize = 64;

/// Hash underlying a derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KdfHash {
    Sha1,
    Sha256,
}

impl KdfHash {
    pub(crate) fn output_len(self) -> usize {
        match self {
            KdfHash::Sha1 => 20,
            KdfHash::Sha256 => 32,
        }
    }

    /// Derive `len` bytes from a BMP-encoded password.
    pub(crate) fn derive(
        self,
        id: u8,
        bmp_password: &[u8],
        salt: &[u8],
        iterations: u32,
        len: usize,
    ) -> Vec<u8> {
        match self {
            KdfHash::Sha1 => derive::<Sha1>(id, bmp_password, salt, iterations, len),
            KdfHash::Sha256 => derive::<Sha256>(id, bmp_password, salt, iterations, len),
        }
    }
}

fn derive<D>(id: u8, password: &[u8], salt: &[u8], iterations: u32, len: usize) -> Vec<u8>
where
    D: Digest + FixedOutputReset,
{
    let u = <D as Digest>::output_size();
    let diversifier = [id; V];

    // I = S || P, each stretched to a multiple of v
    let mut input = repeat_to_block(salt);
    input.extend_from_slice(&repeat_to_block(password));

    let blocks = len.div_ceil(u);
    let mut out = Vec::with_capacity(blocks * u);

    for block in 0..blocks {
        let mut hasher = D::new();
        Digest::update(&mut hasher, diversifier);
        Digest::update(&mut hasher, &input);
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }
        out.extend_from_slice(&a);

        if block + 1 < blocks {
            let b = repeat_to_block(&a);
            for chunk in input.chunks_exact_mut(V) {
                add_with_carry(chunk, &b);
            }
        }
    }

    out.truncate(len);
    out
}

/// Repeat `data` to the next multiple of the block size. Empty stays empty.
fn repeat_to_block(data: &[u8]) -> Vec<u8> {
    let len = data.len().div_ceil(V) * V;
    data.iter().copied().cycle().take(len).collect()
}

/// `chunk = (chunk + b + 1) mod 2^(8v)`, big-endian.
fn add_with_carry(chunk: &mut [u8], b: &[u8]) {
    let mut carry = 1u16;
    for (x, y) in chunk.iter_mut().zip(b).rev() {
        let sum = u16::from(*x) + u16::from(*y) + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}

/// UTF-16BE encoding of `password` followed by two zero bytes.
///
/// The empty password encodes as just the terminator.
pub(crate) fn bmp_password(password: &str) -> Vec<u8> {
    let mut bmp: Vec<u8> = password.encode_utf16().flat_map(u16::to_be_bytes).collect();
    bmp.extend_from_slice(&[0, 0]);
    bmp
}
