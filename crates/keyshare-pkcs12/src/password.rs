#![forbid(unsafe_code)]

//! Random passwords for exported containers.

use rand::Rng;

/// Length of passwords generated when the caller does not choose one.
pub const DEFAULT_PASSWORD_LEN: usize = 32;

const CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+-=[]{};':,./<>?`~";

/// A random password of `len` printable ASCII characters.
pub fn generate_password(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(CHARSET[rng.gen_range(0..CHARSET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_charset() {
        let pw = generate_password(DEFAULT_PASSWORD_LEN);
        assert_eq!(pw.len(), DEFAULT_PASSWORD_LEN);
        assert!(pw.bytes().all(|b| CHARSET.contains(&b)));
        assert!(generate_password(0).is_empty());
    }

    #[test]
    fn test_passwords_differ() {
        assert_ne!(generate_password(32), generate_password(32));
    }
}
