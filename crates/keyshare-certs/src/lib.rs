#![forbid(unsafe_code)]

//! Certificate handling for keyshare.
//!
//! Classifies identity certificates into the roles a key-sharing workflow
//! cares about (device, signature, encryption, authentication), matches
//! those roles against caller-supplied content type identifiers, and picks
//! which identities of a store should be offered for a given request.

pub mod classify;
pub mod fields;
pub mod identifiers;
pub mod role;
pub mod selection;

#[cfg(any(test, feature = "test-util"))]
pub mod testcert;

pub use classify::classify;
pub use fields::{decode_certificate, not_before_epoch_seconds, serial_number_hex, CertificateFields};
pub use identifiers::{
    certificate_requested, certificate_zip_requested, is_no_filter, role_requested,
    zip_role_requested,
};
pub use role::{pkcs12_file_name, CertRole};
pub use selection::{select_identities, Candidate};
