#![forbid(unsafe_code)]

//! Core types for keyshare: the error type and object identifier constants.

pub mod error;
pub mod oid;

pub use error::{Error, Result};
