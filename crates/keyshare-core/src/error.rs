#![forbid(unsafe_code)]

/// Errors produced by the keyshare crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Certificate or key material is malformed, absent, or inconsistent.
    #[error("key format error: {0}")]
    KeyFormat(String),

    /// Building or serializing a PKCS#12 container failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Opening a PKCS#12 container failed (bad MAC, wrong password, unsupported scheme).
    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
