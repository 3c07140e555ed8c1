#![forbid(unsafe_code)]

//! Reading PFX files (RFC 7292).
//!
//! Uses `yasna::parse_ber` since PKCS#12 files in the wild are BER, not
//! strict DER. Only password privacy and password integrity are supported.

use keyshare_core::Error;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, BERReaderSeq, Tag};

use crate::mac::MacData;
use crate::oids::{self, oid};
use crate::pfx::BagAttributes;
use crate::scheme::PbeParams;
use crate::{Pkcs12Contents, Pkcs12Entry};

enum SafeBag {
    ShroudedKey {
        params: PbeParams,
        ciphertext: Vec<u8>,
        attributes: BagAttributes,
    },
    Cert {
        der: Vec<u8>,
        attributes: BagAttributes,
    },
    Other,
}

enum ContentInfo {
    Data(Vec<u8>),
    EncryptedData {
        params: PbeParams,
        ciphertext: Vec<u8>,
    },
}

pub(crate) fn parse_pfx(data: &[u8], password: &str) -> Result<Pkcs12Contents, Error> {
    let (auth_safe, mac) = yasna::parse_ber(data, |r| {
        r.read_sequence(|r| {
            if r.next().read_u32()? != 3 {
                return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
            }
            let auth_safe = match read_content_info(r.next())? {
                ContentInfo::Data(bytes) => bytes,
                ContentInfo::EncryptedData { .. } => {
                    return Err(ASN1Error::new(ASN1ErrorKind::Invalid))
                }
            };
            let mac = r.read_optional(MacData::read)?;
            Ok((auth_safe, mac))
        })
    })
    .map_err(|e| Error::Decryption(format!("failed to parse PKCS#12 PFX: {e}")))?;

    match &mac {
        Some(mac) => mac.verify(&auth_safe, password)?,
        None => tracing::warn!("PKCS#12 file has no integrity MAC"),
    }

    let content_infos = yasna::parse_ber(&auth_safe, |r| r.collect_sequence_of(read_content_info))
        .map_err(|e| Error::Decryption(format!("failed to parse authSafe contents: {e}")))?;

    let mut contents = Pkcs12Contents::default();
    for info in content_infos {
        let safe_contents = match info {
            ContentInfo::Data(bytes) => bytes,
            ContentInfo::EncryptedData { params, ciphertext } => {
                params.decrypt(&ciphertext, password)?
            }
        };

        let bags = yasna::parse_ber(&safe_contents, |r| r.collect_sequence_of(read_safe_bag))
            .map_err(|e| Error::Decryption(format!("failed to parse SafeBags: {e}")))?;

        for bag in bags {
            match bag {
                SafeBag::ShroudedKey {
                    params,
                    ciphertext,
                    attributes,
                } => contents.private_keys.push(Pkcs12Entry::new(
                    params.decrypt(&ciphertext, password)?,
                    attributes,
                )),
                SafeBag::Cert { der, attributes } => {
                    contents.certificates.push(Pkcs12Entry::new(der, attributes))
                }
                SafeBag::Other => tracing::debug!("skipping unsupported SafeBag"),
            }
        }
    }

    tracing::debug!(
        keys = contents.private_keys.len(),
        certificates = contents.certificates.len(),
        "opened PKCS#12 file"
    );
    Ok(contents)
}

fn read_content_info(r: BERReader) -> Result<ContentInfo, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        if content_type == oid(oids::DATA) {
            let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
            Ok(ContentInfo::Data(data))
        } else if content_type == oid(oids::ENCRYPTED_DATA) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let _version = r.next().read_u32()?;
                    r.next().read_sequence(|r| {
                        let _content_type = r.next().read_oid()?;
                        let params = PbeParams::read(r.next())?;
                        let ciphertext = r
                            .next()
                            .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                        Ok(ContentInfo::EncryptedData { params, ciphertext })
                    })
                })
            })
        } else {
            Err(ASN1Error::new(ASN1ErrorKind::Invalid))
        }
    })
}

fn read_safe_bag(r: BERReader) -> Result<SafeBag, ASN1Error> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;

        if bag_type == oid(oids::PKCS8_SHROUDED_KEY_BAG) {
            let (params, ciphertext) = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let params = PbeParams::read(r.next())?;
                    let ciphertext = r.next().read_bytes()?;
                    Ok((params, ciphertext))
                })
            })?;
            Ok(SafeBag::ShroudedKey {
                params,
                ciphertext,
                attributes: read_attributes(r)?,
            })
        } else if bag_type == oid(oids::CERT_BAG) {
            let der = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    if r.next().read_oid()? != oid(oids::X509_CERTIFICATE) {
                        return Err(ASN1Error::new(ASN1ErrorKind::Invalid));
                    }
                    r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
                })
            })?;
            Ok(SafeBag::Cert {
                der,
                attributes: read_attributes(r)?,
            })
        } else {
            r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            read_attributes(r)?;
            Ok(SafeBag::Other)
        }
    })
}

/// Optional `bagAttributes`. Attributes other than friendlyName and
/// localKeyId are skipped.
fn read_attributes(r: &mut BERReaderSeq) -> Result<BagAttributes, ASN1Error> {
    let mut attributes = BagAttributes::default();
    r.read_optional(|r| {
        r.read_set_of(|r| {
            r.read_sequence(|r| {
                let attr = r.next().read_oid()?;
                if attr == oid(oids::FRIENDLY_NAME) {
                    r.next().read_set_of(|r| {
                        attributes.friendly_name = Some(r.read_bmp_string()?);
                        Ok(())
                    })
                } else if attr == oid(oids::LOCAL_KEY_ID) {
                    r.next().read_set_of(|r| {
                        attributes.local_key_id = Some(r.read_bytes()?);
                        Ok(())
                    })
                } else {
                    r.next().read_set_of(|r| r.read_der().map(drop))
                }
            })
        })
    })?;
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage() {
        let err = parse_pfx(&[0x30, 0x03, 0x02, 0x01, 0x03], "pw").unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let der = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_u32(2);
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oids::DATA));
                    w.next()
                        .write_tagged(Tag::context(0), |w| w.write_bytes(&[0x30, 0x00]));
                });
            })
        });
        assert!(parse_pfx(&der, "pw").is_err());
    }

    #[test]
    fn test_reads_unauthenticated_plain_bags() {
        let cert = b"not really a certificate".to_vec();
        let safe_contents = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oids::CERT_BAG));
                    w.next().write_tagged(Tag::context(0), |w| {
                        w.write_sequence(|w| {
                            w.next().write_oid(&oid(oids::X509_CERTIFICATE));
                            w.next()
                                .write_tagged(Tag::context(0), |w| w.write_bytes(&cert));
                        })
                    });
                });
            })
        });
        let auth_safe = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oids::DATA));
                    w.next()
                        .write_tagged(Tag::context(0), |w| w.write_bytes(&safe_contents));
                });
            })
        });
        let pfx = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_u32(3);
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oids::DATA));
                    w.next()
                        .write_tagged(Tag::context(0), |w| w.write_bytes(&auth_safe));
                });
            })
        });

        let contents = parse_pfx(&pfx, "ignored").unwrap();
        assert!(contents.private_keys.is_empty());
        assert_eq!(contents.certificates.len(), 1);
        assert_eq!(contents.certificates[0].der, cert);
        assert_eq!(contents.certificates[0].friendly_name, None);
    }
}
