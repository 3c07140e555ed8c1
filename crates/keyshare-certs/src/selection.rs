#![forbid(unsafe_code)]

//! Choosing which identities of a store to offer for a request.
//!
//! A store can hold several generations of the same kind of identity. For
//! device, signature, and authentication identities only the newest
//! generation is offered: the group of candidates sharing the latest
//! `notBefore`. Encryption identities are always offered in full. The
//! no-filter identifiers turn the generation filter off for every role.

use crate::identifiers::{is_no_filter, role_requested, zip_role_requested, PKCS12, SELECT_NO_FILTER};
use crate::role::CertRole;

/// An identity as seen by the selection step.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Store label of the identity.
    pub label: String,
    pub role: CertRole,
    /// Validity start in seconds since the UNIX epoch.
    pub not_before: f64,
}

impl Candidate {
    pub fn new(label: impl Into<String>, role: CertRole, not_before: f64) -> Self {
        Self {
            label: label.into(),
            role,
            not_before,
        }
    }
}

/// Candidates sharing the latest `notBefore` seen so far.
#[derive(Default)]
struct LatestGroup {
    not_before: f64,
    labels: Vec<String>,
}

impl LatestGroup {
    fn offer(&mut self, candidate: &Candidate) {
        if self.labels.is_empty() || candidate.not_before > self.not_before {
            self.labels.clear();
            self.not_before = candidate.not_before;
            self.labels.push(candidate.label.clone());
        } else if candidate.not_before == self.not_before {
            self.labels.push(candidate.label.clone());
        }
    }
}

/// Labels of the candidates to offer for `ids`, in presentation order.
///
/// An empty `ids` behaves like the generic PKCS#12 identifier together with
/// the select no-filter identifier. Candidates kept in full come first in
/// store order, followed by the newest device, signature, and authentication
/// groups.
pub fn select_identities<S>(candidates: &[Candidate], ids: &[S]) -> Vec<String>
where
    S: AsRef<str>,
{
    let mut ids: Vec<&str> = ids.iter().map(|id| id.as_ref()).collect();
    if ids.is_empty() {
        ids = vec![PKCS12, SELECT_NO_FILTER];
    }
    let no_filter = is_no_filter(&ids);

    let mut kept = Vec::new();
    let mut device = LatestGroup::default();
    let mut signature = LatestGroup::default();
    let mut authentication = LatestGroup::default();

    for candidate in candidates {
        let role = candidate.role;
        if !role_requested(role, &ids) && !zip_role_requested(role, &ids) {
            continue;
        }
        if no_filter {
            kept.push(candidate.label.clone());
            continue;
        }
        match role {
            CertRole::Encryption => kept.push(candidate.label.clone()),
            CertRole::Device => device.offer(candidate),
            CertRole::Signature => signature.offer(candidate),
            CertRole::Authentication => authentication.offer(candidate),
            CertRole::Unknown => {}
        }
    }

    tracing::debug!(
        offered = kept.len()
            + device.labels.len()
            + signature.labels.len()
            + authentication.labels.len(),
        total = candidates.len(),
        "selected identities"
    );

    kept.extend(device.labels);
    kept.extend(signature.labels);
    kept.extend(authentication.labels);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: [&str; 0] = [];

    fn store() -> Vec<Candidate> {
        vec![
            Candidate::new("sig-old", CertRole::Signature, 100.0),
            Candidate::new("enc-1", CertRole::Encryption, 50.0),
            Candidate::new("auth-new", CertRole::Authentication, 300.0),
            Candidate::new("sig-new", CertRole::Signature, 200.0),
            Candidate::new("dev", CertRole::Device, 10.0),
            Candidate::new("enc-2", CertRole::Encryption, 400.0),
            Candidate::new("auth-old", CertRole::Authentication, 250.0),
            Candidate::new("mystery", CertRole::Unknown, 999.0),
        ]
    }

    #[test]
    fn test_latest_generation_only() {
        let picked = select_identities(&store(), &["purebred2025.select.all"]);
        assert_eq!(picked, ["enc-1", "enc-2", "dev", "sig-new", "auth-new"]);
    }

    #[test]
    fn test_ties_are_all_kept() {
        let candidates = vec![
            Candidate::new("a", CertRole::Signature, 5.0),
            Candidate::new("b", CertRole::Signature, 7.0),
            Candidate::new("c", CertRole::Signature, 7.0),
            Candidate::new("d", CertRole::Signature, 6.0),
        ];
        let picked = select_identities(&candidates, &["purebred2025.select.signature"]);
        assert_eq!(picked, ["b", "c"]);
    }

    #[test]
    fn test_role_filter() {
        let picked = select_identities(&store(), &["purebred2025.select.encryption"]);
        assert_eq!(picked, ["enc-1", "enc-2"]);

        let picked = select_identities(&store(), &["purebred2025.select.all-user"]);
        assert_eq!(picked, ["enc-1", "enc-2", "sig-new", "auth-new"]);
    }

    #[test]
    fn test_zip_identifiers_also_select() {
        let picked = select_identities(&store(), &["purebred2025.zip.piv"]);
        assert_eq!(picked, ["auth-new"]);
    }

    #[test]
    fn test_no_filter_keeps_store_order() {
        let picked = select_identities(&store(), &["purebred2025.zip.no-filter"]);
        assert_eq!(
            picked,
            ["sig-old", "enc-1", "auth-new", "sig-new", "dev", "enc-2", "auth-old"]
        );
    }

    #[test]
    fn test_empty_request_means_everything() {
        let picked = select_identities(&store(), &EMPTY);
        assert_eq!(picked.len(), 7);
        assert!(!picked.iter().any(|l| l == "mystery"));
    }

    #[test]
    fn test_unrecognized_request_selects_nothing() {
        assert!(select_identities(&store(), &["public.data"]).is_empty());
    }
}
