#![forbid(unsafe_code)]

//! Read-only accessors over a decoded certificate.
//!
//! The classifier and the accessor functions below never look at a
//! certificate structure directly. They go through [`CertificateFields`],
//! which the `x509-cert` [`Certificate`] implements and which callers with
//! their own decoder (a platform certificate store, for instance) can
//! implement as well.

use std::time::Duration;

use der::asn1::ObjectIdentifier;
use der::Decode;
use keyshare_core::Error;
use x509_cert::Certificate;

/// Accessors the classifier and the certificate helpers need.
pub trait CertificateFields {
    /// DER contents of the `extnValue` of the first extension with `oid`.
    fn extension_value(&self, oid: &ObjectIdentifier) -> Option<&[u8]>;

    /// `notBefore` as a duration since the UNIX epoch.
    fn not_before(&self) -> Option<Duration>;

    /// Content octets of the serial number INTEGER, as encoded.
    fn serial_bytes(&self) -> Option<&[u8]>;
}

impl CertificateFields for Certificate {
    fn extension_value(&self, oid: &ObjectIdentifier) -> Option<&[u8]> {
        self.tbs_certificate
            .extensions
            .as_ref()?
            .iter()
            .find(|ext| ext.extn_id == *oid)
            .map(|ext| ext.extn_value.as_bytes())
    }

    fn not_before(&self) -> Option<Duration> {
        Some(self.tbs_certificate.validity.not_before.to_unix_duration())
    }

    fn serial_bytes(&self) -> Option<&[u8]> {
        let bytes = self.tbs_certificate.serial_number.as_bytes();
        (!bytes.is_empty()).then_some(bytes)
    }
}

/// Decode a DER certificate.
pub fn decode_certificate(der: &[u8]) -> Result<Certificate, Error> {
    Certificate::from_der(der)
        .map_err(|e| Error::KeyFormat(format!("failed to parse X.509 certificate: {e}")))
}

/// Validity start of `cert` in seconds since the UNIX epoch.
pub fn not_before_epoch_seconds<C>(cert: &C) -> Result<f64, Error>
where
    C: CertificateFields + ?Sized,
{
    cert.not_before()
        .map(|d| d.as_secs_f64())
        .ok_or_else(|| Error::KeyFormat("certificate has no notBefore time".into()))
}

/// Serial number of `cert` as uppercase hex, one pair per encoded byte.
///
/// Leading zero bytes of the encoding are kept, so a serial encoded as
/// `00 8F` renders as `"008F"`.
pub fn serial_number_hex<C>(cert: &C) -> Result<String, Error>
where
    C: CertificateFields + ?Sized,
{
    cert.serial_bytes()
        .map(hex::encode_upper)
        .ok_or_else(|| Error::KeyFormat("certificate has no serial number".into()))
}
