//! Signing credential resolution.
//!
//! Operators hand over signing material as a PKCS#12 container or as a
//! certificate/key pair, in PEM or DER. This module normalizes all of it into
//! a [`ResolvedCredential`]: a PEM certificate, a PEM private key and an
//! optional key passphrase.
//!
//! # Supported Formats
//!
//! - **PKCS#12**: binary DER, or the same bytes base64-armoured as text
//! - **Certificates**: PEM (passed through verbatim) or DER (re-encoded to PEM)
//! - **Private keys**: PEM only, optionally encrypted
//!
//! # Examples
//!
//! ```no_run
//! use secrecy::SecretString;
//! use walletpass::crypto::SigningCredential;
//!
//! let credential = SigningCredential::Pkcs12 {
//!     container: std::fs::read("signer.p12")?,
//!     passphrase: SecretString::new("password".into()),
//! };
//! let resolved = credential.resolve()?;
//! assert!(resolved.passphrase.is_none());
//! # Ok::<(), walletpass::Error>(())
//! ```

use crate::config::CredentialSource;
use crate::{Error, Result};
use base64::Engine;
use openssl::pkcs12::Pkcs12;
use openssl::x509::X509;
use secrecy::{ExposeSecret, SecretString};
use std::fs;
use std::path::Path;

const PEM_MARKER: &[u8] = b"-----BEGIN";

/// Encoding of a credential file as found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Pem,
    Der,
}

/// Detect whether `bytes` hold PEM text or binary DER.
///
/// A `-----BEGIN` marker anywhere in the buffer means PEM.
pub fn detect_encoding(bytes: &[u8]) -> Encoding {
    if bytes.windows(PEM_MARKER.len()).any(|w| w == PEM_MARKER) {
        Encoding::Pem
    } else {
        Encoding::Der
    }
}

/// A PEM-encoded X.509 certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct CanonicalCertificate(Vec<u8>);

impl CanonicalCertificate {
    pub fn as_pem(&self) -> &[u8] {
        &self.0
    }

    /// Parse into an openssl certificate.
    pub fn to_x509(&self) -> Result<X509> {
        X509::from_pem(&self.0)
            .map_err(|e| Error::CertificateFormat(format!("PEM certificate: {}", e)))
    }
}

impl std::fmt::Debug for CanonicalCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CanonicalCertificate({} bytes)", self.0.len())
    }
}

/// A PEM-encoded private key, possibly encrypted.
///
/// The key bytes are never printed.
#[derive(Clone)]
pub struct CanonicalPrivateKey(Vec<u8>);

impl CanonicalPrivateKey {
    pub fn as_pem(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for CanonicalPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CanonicalPrivateKey(..)")
    }
}

/// The intermediate (WWDR) certificate that chains the signer to the wallet
/// platform's root.
pub type IntermediateCertificate = CanonicalCertificate;

/// Normalize a certificate to PEM.
///
/// PEM input is returned verbatim; DER input is parsed as X.509 and re-encoded.
///
/// # Errors
///
/// Returns [`Error::CertificateFormat`] carrying `label` if DER parsing fails.
pub fn normalize_certificate(bytes: &[u8], label: &str) -> Result<CanonicalCertificate> {
    match detect_encoding(bytes) {
        Encoding::Pem => Ok(CanonicalCertificate(bytes.to_vec())),
        Encoding::Der => {
            let cert =
                X509::from_der(bytes).map_err(|_| Error::CertificateFormat(label.to_string()))?;
            let pem = cert
                .to_pem()
                .map_err(|_| Error::CertificateFormat(label.to_string()))?;
            Ok(CanonicalCertificate(pem))
        }
    }
}

/// Accept a private key only if it is already PEM-encoded.
///
/// # Errors
///
/// Returns [`Error::UnsupportedKeyEncoding`] for DER (or any non-PEM) input.
pub fn require_pem_key(bytes: &[u8], label: &str) -> Result<CanonicalPrivateKey> {
    match detect_encoding(bytes) {
        Encoding::Pem => Ok(CanonicalPrivateKey(bytes.to_vec())),
        Encoding::Der => Err(Error::UnsupportedKeyEncoding(label.to_string())),
    }
}

/// Extract the first certificate and private key from a PKCS#12 container.
///
/// openssl walks the safe bags for us: a PKCS#8-shrouded key bag is used when
/// present, an unshrouded key bag otherwise. The key comes back as an
/// unencrypted PKCS#8 PEM.
///
/// # Errors
///
/// Returns [`Error::InvalidPkcs12`] carrying `label` when the container cannot
/// be parsed, the passphrase is wrong, or either bag is missing. Nothing is
/// returned in any of those cases.
pub fn extract_from_pkcs12(
    container: &[u8],
    passphrase: &SecretString,
    label: &str,
) -> Result<(CanonicalCertificate, CanonicalPrivateKey)> {
    let invalid = || Error::InvalidPkcs12(label.to_string());

    let der = unarmor_container(container);
    let pkcs12 = Pkcs12::from_der(&der).map_err(|_| invalid())?;
    let parsed = pkcs12.parse2(passphrase.expose_secret()).map_err(|_| invalid())?;

    let (cert, pkey) = match (parsed.cert, parsed.pkey) {
        (Some(cert), Some(pkey)) => (cert, pkey),
        _ => return Err(invalid()),
    };

    let cert_pem = cert.to_pem().map_err(|_| invalid())?;
    let key_pem = pkey.private_key_to_pem_pkcs8().map_err(|_| invalid())?;

    Ok((CanonicalCertificate(cert_pem), CanonicalPrivateKey(key_pem)))
}

/// Undo base64 text armouring of a PKCS#12 file.
///
/// A DER container starts with a SEQUENCE tag; anything else that decodes as
/// base64 is taken to be armoured. Undecodable input is passed on unchanged so
/// the parser reports it.
fn unarmor_container(container: &[u8]) -> Vec<u8> {
    if container.first() == Some(&0x30) {
        return container.to_vec();
    }
    let text: Vec<u8> = container
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(&text)
        .unwrap_or_else(|_| container.to_vec())
}

/// Operator-supplied signing material, before normalization.
#[derive(Clone)]
pub enum SigningCredential {
    /// A PKCS#12 container and its decryption passphrase.
    Pkcs12 {
        container: Vec<u8>,
        passphrase: SecretString,
    },
    /// A certificate and private key, with the key's passphrase if it is encrypted.
    PemPair {
        certificate: Vec<u8>,
        private_key: Vec<u8>,
        passphrase: Option<SecretString>,
    },
}

impl SigningCredential {
    /// Read the files named by a validated [`CredentialSource`].
    pub fn load(source: &CredentialSource) -> Result<Self> {
        match source {
            CredentialSource::Pkcs12 { path, password } => Ok(Self::Pkcs12 {
                container: read_file(path)?,
                passphrase: password.clone(),
            }),
            CredentialSource::PemPair {
                certificate,
                private_key,
                key_password,
            } => Ok(Self::PemPair {
                certificate: read_file(certificate)?,
                private_key: read_file(private_key)?,
                passphrase: key_password.clone(),
            }),
        }
    }

    /// Normalize into canonical PEM material.
    ///
    /// PKCS#12 extraction yields an unencrypted key, so the resolved
    /// passphrase is `None` in that mode.
    pub fn resolve(&self) -> Result<ResolvedCredential> {
        match self {
            Self::Pkcs12 {
                container,
                passphrase,
            } => {
                let (signer_cert, signer_key) =
                    extract_from_pkcs12(container, passphrase, "signer PKCS#12")?;
                Ok(ResolvedCredential {
                    signer_cert,
                    signer_key,
                    passphrase: None,
                })
            }
            Self::PemPair {
                certificate,
                private_key,
                passphrase,
            } => Ok(ResolvedCredential {
                signer_cert: normalize_certificate(certificate, "signer certificate")?,
                signer_key: require_pem_key(private_key, "signer private key")?,
                passphrase: passphrase.clone(),
            }),
        }
    }
}

/// Canonical signing material.
///
/// `signer_key` must belong to `signer_cert`; that is enforced by the CMS
/// backend at signing time, not here.
#[derive(Clone, Debug)]
pub struct ResolvedCredential {
    pub signer_cert: CanonicalCertificate,
    pub signer_key: CanonicalPrivateKey,
    pub passphrase: Option<SecretString>,
}

/// Load and normalize the intermediate (WWDR) certificate.
pub fn load_intermediate(path: &Path) -> Result<IntermediateCertificate> {
    normalize_certificate(&read_file(path)?, "WWDR certificate")
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}
