#![forbid(unsafe_code)]

//! Certificate roles.

use std::fmt;

/// The role a certificate plays in the key-sharing workflow.
///
/// Every certificate maps to exactly one role; `Unknown` is the closed
/// default when no marker matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertRole {
    Unknown,
    /// Identity bound to a physical device enrollment.
    Device,
    /// Derived signature identity.
    Signature,
    /// Recovered encryption identity.
    Encryption,
    /// Derived PIV authentication identity.
    Authentication,
}

impl CertRole {
    /// Every role that can be requested, in presentation order.
    pub const REQUESTABLE: [CertRole; 4] = [
        CertRole::Device,
        CertRole::Signature,
        CertRole::Encryption,
        CertRole::Authentication,
    ];

    /// Short lowercase label used when naming exported files.
    pub fn file_label(self) -> &'static str {
        match self {
            CertRole::Unknown => "unknown",
            CertRole::Device => "device",
            CertRole::Signature => "signature",
            CertRole::Encryption => "encryption",
            CertRole::Authentication => "piv",
        }
    }

    /// Human readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            CertRole::Unknown => "Unknown",
            CertRole::Device => "Device",
            CertRole::Signature => "Signature",
            CertRole::Encryption => "Encryption",
            CertRole::Authentication => "PIV",
        }
    }
}

impl fmt::Display for CertRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// File name for an exported container: `{label}_{serial}.p12`.
pub fn pkcs12_file_name(role: CertRole, serial_hex: &str) -> String {
    format!("{}_{serial_hex}.p12", role.file_label())
}
