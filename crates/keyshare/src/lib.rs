#![forbid(unsafe_code)]

pub use keyshare_certs as certs;
pub use keyshare_core as core;
pub use keyshare_pkcs12 as pkcs12;

pub use keyshare_certs::{
    certificate_requested, classify, not_before_epoch_seconds, role_requested, serial_number_hex,
    CertRole,
};
pub use keyshare_core::{Error, Result};
pub use keyshare_pkcs12::{assemble, open_pkcs12, Pkcs12Options};
