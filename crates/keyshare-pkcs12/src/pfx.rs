#![forbid(unsafe_code)]

//! DER encoding of a PFX holding one certificate and its private key.
//!
//! Layout:
//!
//! ```text
//! PFX v3
//! ├── authSafe: data
//! │   ├── encryptedData ── SafeContents [ certBag ]
//! │   └── data ─────────── SafeContents [ pkcs8ShroudedKeyBag ]
//! └── macData
//! ```
//!
//! Both bags carry the same `localKeyId` (the SHA-1 of the certificate) and,
//! when configured, the same `friendlyName`.

use keyshare_core::Error;
use sha1::{Digest, Sha1};
use yasna::{DERWriter, Tag};

use crate::mac::MacData;
use crate::oids::{self, oid};
use crate::scheme::PbeParams;
use crate::Pkcs12Options;

/// Attributes attached to a SafeBag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BagAttributes {
    pub(crate) local_key_id: Option<Vec<u8>>,
    pub(crate) friendly_name: Option<String>,
}

impl BagAttributes {
    fn is_empty(&self) -> bool {
        self.local_key_id.is_none() && self.friendly_name.is_none()
    }

    fn write(&self, w: DERWriter) {
        w.write_set_of(|w| {
            if let Some(name) = &self.friendly_name {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oids::FRIENDLY_NAME));
                    w.next().write_set_of(|w| w.next().write_bmp_string(name));
                });
            }
            if let Some(id) = &self.local_key_id {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oids::LOCAL_KEY_ID));
                    w.next().write_set_of(|w| w.next().write_bytes(id));
                });
            }
        })
    }
}

pub(crate) fn encode_pfx(
    cert_der: &[u8],
    pkcs8_der: &[u8],
    password: &str,
    options: &Pkcs12Options,
) -> Result<Vec<u8>, Error> {
    let attributes = BagAttributes {
        local_key_id: Some(Sha1::digest(cert_der).to_vec()),
        friendly_name: options.friendly_name.clone(),
    };

    let key_params = PbeParams::generate(options.scheme, options.iterations);
    let shrouded_key = key_params.encrypt(pkcs8_der, password)?;
    let key_contents = yasna::construct_der(|w| {
        w.write_sequence(|w| {
            write_shrouded_key_bag(w.next(), &key_params, &shrouded_key, &attributes)
        })
    });

    let cert_contents = yasna::construct_der(|w| {
        w.write_sequence(|w| write_cert_bag(w.next(), cert_der, &attributes))
    });
    let cert_params = PbeParams::generate(options.scheme, options.iterations);
    let encrypted_certs = cert_params.encrypt(&cert_contents, password)?;

    let auth_safe = yasna::construct_der(|w| {
        w.write_sequence(|w| {
            write_encrypted_data(w.next(), &cert_params, &encrypted_certs);
            write_data(w.next(), &key_contents);
        })
    });

    let mac = MacData::compute(
        options.scheme.mac_hash(),
        options.mac_iterations,
        &auth_safe,
        password,
    )?;

    Ok(yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_u32(3);
            write_data(w.next(), &auth_safe);
            mac.write(w.next());
        })
    }))
}

/// ContentInfo of type data wrapping `content`.
fn write_data(w: DERWriter, content: &[u8]) {
    w.write_sequence(|w| {
        w.next().write_oid(&oid(oids::DATA));
        w.next()
            .write_tagged(Tag::context(0), |w| w.write_bytes(content));
    })
}

/// ContentInfo of type encryptedData.
fn write_encrypted_data(w: DERWriter, params: &PbeParams, ciphertext: &[u8]) {
    w.write_sequence(|w| {
        w.next().write_oid(&oid(oids::ENCRYPTED_DATA));
        w.next().write_tagged(Tag::context(0), |w| {
            w.write_sequence(|w| {
                w.next().write_u32(0);
                // EncryptedContentInfo
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oids::DATA));
                    params.write(w.next());
                    w.next()
                        .write_tagged_implicit(Tag::context(0), |w| w.write_bytes(ciphertext));
                });
            })
        });
    })
}

fn write_shrouded_key_bag(
    w: DERWriter,
    params: &PbeParams,
    ciphertext: &[u8],
    attributes: &BagAttributes,
) {
    w.write_sequence(|w| {
        w.next().write_oid(&oid(oids::PKCS8_SHROUDED_KEY_BAG));
        // EncryptedPrivateKeyInfo
        w.next().write_tagged(Tag::context(0), |w| {
            w.write_sequence(|w| {
                params.write(w.next());
                w.next().write_bytes(ciphertext);
            })
        });
        if !attributes.is_empty() {
            attributes.write(w.next());
        }
    })
}

fn write_cert_bag(w: DERWriter, cert_der: &[u8], attributes: &BagAttributes) {
    w.write_sequence(|w| {
        w.next().write_oid(&oid(oids::CERT_BAG));
        w.next().write_tagged(Tag::context(0), |w| {
            w.write_sequence(|w| {
                w.next().write_oid(&oid(oids::X509_CERTIFICATE));
                w.next()
                    .write_tagged(Tag::context(0), |w| w.write_bytes(cert_der));
            })
        });
        if !attributes.is_empty() {
            attributes.write(w.next());
        }
    })
}
