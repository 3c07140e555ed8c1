#![forbid(unsafe_code)]

//! Content type identifiers and the roles they request.
//!
//! Two fixed tables map identifiers to roles: one for requests that select
//! individual containers and one for requests that bundle them into a zip
//! archive. An identifier missing from a table requests nothing.

use crate::classify::classify;
use crate::fields::CertificateFields;
use crate::role::CertRole;

use CertRole::{Authentication, Device, Encryption, Signature};

const ALL_ROLES: &[CertRole] = &[Device, Signature, Encryption, Authentication];
const USER_ROLES: &[CertRole] = &[Signature, Encryption, Authentication];

/// Generic PKCS#12 identifier used by the key sharing extension.
pub const PKCS12: &str = "purebred2025.rsa.pkcs-12";
/// System PKCS#12 identifier.
pub const SYSTEM_PKCS12: &str = "com.rsa.pkcs-12";
/// Select every identity without the latest-only filtering.
pub const SELECT_NO_FILTER: &str = "purebred2025.select.no-filter";
/// Zip every identity without the latest-only filtering.
pub const ZIP_NO_FILTER: &str = "purebred2025.zip.no-filter";

/// Identifiers that select individual containers.
pub static SELECT_IDENTIFIERS: &[(&str, &[CertRole])] = &[
    ("purebred2025.select.all", ALL_ROLES),
    ("purebred2025.select.all-p12", ALL_ROLES),
    ("purebred2025.select.all-user", USER_ROLES),
    ("purebred2025.select.all-user-p12", USER_ROLES),
    ("purebred2025.select.signature", &[Signature]),
    ("purebred2025.select.signature-p12", &[Signature]),
    ("purebred2025.select.encryption", &[Encryption]),
    ("purebred2025.select.encryption-p12", &[Encryption]),
    ("purebred2025.select.authentication", &[Authentication]),
    ("purebred2025.select.authentication-p12", &[Authentication]),
    ("purebred2025.select.device", &[Device]),
    (SELECT_NO_FILTER, ALL_ROLES),
    ("purebred2025.select.no_filter", ALL_ROLES),
    (PKCS12, ALL_ROLES),
    (SYSTEM_PKCS12, ALL_ROLES),
];

/// Identifiers that request a zip archive of containers.
pub static ZIP_IDENTIFIERS: &[(&str, &[CertRole])] = &[
    ("purebred2025.zip.all", ALL_ROLES),
    ("purebred2025.zip.all-user", USER_ROLES),
    ("purebred2025.zip.signature", &[Signature]),
    ("purebred2025.zip.encryption", &[Encryption]),
    ("purebred2025.zip.authentication", &[Authentication]),
    ("purebred2025.zip.piv", &[Authentication]),
    ("purebred2025.zip.device", &[Device]),
    (ZIP_NO_FILTER, ALL_ROLES),
    ("purebred2025.zip.no_filter", ALL_ROLES),
];

fn requested_in<I, S>(table: &[(&str, &[CertRole])], role: CertRole, ids: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if role == CertRole::Unknown {
        return false;
    }
    ids.into_iter().any(|id| {
        table
            .iter()
            .any(|(known, roles)| *known == id.as_ref() && roles.contains(&role))
    })
}

/// True if any identifier in `ids` selects `role`.
///
/// `Unknown` is never requested and an empty set requests nothing.
pub fn role_requested<I, S>(role: CertRole, ids: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    requested_in(SELECT_IDENTIFIERS, role, ids)
}

/// True if any identifier in `ids` asks for `role` in a zip archive.
pub fn zip_role_requested<I, S>(role: CertRole, ids: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    requested_in(ZIP_IDENTIFIERS, role, ids)
}

/// Classify `cert` and check whether `ids` selects its role.
pub fn certificate_requested<C, I, S>(cert: &C, ids: I) -> bool
where
    C: CertificateFields + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    role_requested(classify(cert), ids)
}

/// Classify `cert` and check whether `ids` asks for its role in a zip archive.
pub fn certificate_zip_requested<C, I, S>(cert: &C, ids: I) -> bool
where
    C: CertificateFields + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    zip_role_requested(classify(cert), ids)
}

/// Select identifiers that request `role`.
pub fn identifiers_for(role: CertRole) -> impl Iterator<Item = &'static str> {
    SELECT_IDENTIFIERS
        .iter()
        .filter(move |(_, roles)| roles.contains(&role))
        .map(|(id, _)| *id)
}

/// True if `ids` disables the latest-only filtering.
pub fn is_no_filter<I, S>(ids: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .any(|id| matches!(id.as_ref(), SELECT_NO_FILTER | ZIP_NO_FILTER))
}
