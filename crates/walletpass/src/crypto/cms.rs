//! Detached CMS signatures over the pass manifest.
//!
//! The wallet verifies `manifest.json` against the `signature` file: a DER
//! `SignedData` structure without encapsulated content, carrying the signer
//! and intermediate certificates and signed attributes for content type and
//! message digest.

use crate::crypto::credentials::{CanonicalCertificate, CanonicalPrivateKey};
use crate::{Error, Result};
use openssl::cms::{CMSOptions, CmsContentInfo};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::X509;
use secrecy::{ExposeSecret, SecretString};

/// Name of the signature file inside a pass bundle.
pub const SIGNATURE_FILE: &str = "signature";

/// Sign `manifest` and return the DER-encoded detached CMS structure.
///
/// # Arguments
///
/// * `manifest` - The exact `manifest.json` bytes written to the bundle
/// * `signer_cert` - The pass type certificate
/// * `signer_key` - Its private key, optionally encrypted
/// * `intermediate` - The WWDR certificate included alongside the signer
/// * `passphrase` - Passphrase for an encrypted `signer_key`
///
/// # Errors
///
/// Returns [`Error::Signing`] if the key cannot be opened with `passphrase`,
/// or if openssl rejects the key/certificate pairing.
pub fn sign(
    manifest: &[u8],
    signer_cert: &CanonicalCertificate,
    signer_key: &CanonicalPrivateKey,
    intermediate: &CanonicalCertificate,
    passphrase: Option<&SecretString>,
) -> Result<Vec<u8>> {
    let cert = X509::from_pem(signer_cert.as_pem())
        .map_err(|e| Error::Signing(format!("Failed to load signer certificate: {}", e)))?;
    let wwdr = X509::from_pem(intermediate.as_pem())
        .map_err(|e| Error::Signing(format!("Failed to load intermediate certificate: {}", e)))?;
    let pkey = load_private_key(signer_key, passphrase)?;

    let mut chain = Stack::new().map_err(|e| Error::Signing(e.to_string()))?;
    chain
        .push(wwdr)
        .map_err(|e| Error::Signing(format!("Failed to build certificate chain: {}", e)))?;

    let flags = CMSOptions::BINARY | CMSOptions::DETACHED | CMSOptions::NOSMIMECAP;
    let cms = CmsContentInfo::sign(Some(&cert), Some(&pkey), Some(&chain), Some(manifest), flags)
        .map_err(|e| Error::Signing(format!("Failed to build CMS signature: {}", e)))?;

    cms.to_der()
        .map_err(|e| Error::Signing(format!("Failed to encode CMS signature: {}", e)))
}

fn load_private_key(
    key: &CanonicalPrivateKey,
    passphrase: Option<&SecretString>,
) -> Result<PKey<Private>> {
    match passphrase {
        Some(pass) => {
            PKey::private_key_from_pem_passphrase(key.as_pem(), pass.expose_secret().as_bytes())
        }
        // Never fall back to openssl's interactive passphrase prompt.
        None => PKey::private_key_from_pem_callback(key.as_pem(), |_| Ok(0)),
    }
    .map_err(|e| Error::Signing(format!("Failed to load private key: {}", e)))
}

/// Verify a detached signature against `content`.
///
/// Only the signature itself is checked, using the signer certificate
/// embedded in the structure; the certificate chain is not validated.
///
/// # Errors
///
/// Returns [`Error::Signing`] if the structure is malformed or the content
/// does not match.
pub fn verify_detached(signature: &[u8], content: &[u8]) -> Result<()> {
    let mut cms = CmsContentInfo::from_der(signature)
        .map_err(|e| Error::Signing(format!("Malformed CMS signature: {}", e)))?;
    cms.verify(
        None,
        None,
        Some(content),
        None,
        CMSOptions::BINARY | CMSOptions::NO_SIGNER_CERT_VERIFY,
    )
    .map_err(|e| Error::Signing(format!("Signature verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::credentials::{normalize_certificate, require_pem_key};
    use crate::crypto::testing::{generate_key, issued_chain};
    use openssl::symm::Cipher;

    fn material() -> (CanonicalCertificate, CanonicalPrivateKey, CanonicalCertificate, X509) {
        let (ca, signer) = issued_chain();
        let cert = normalize_certificate(&signer.cert.to_pem().unwrap(), "signer").unwrap();
        let key = require_pem_key(&signer.key.private_key_to_pem_pkcs8().unwrap(), "key").unwrap();
        let wwdr = normalize_certificate(&ca.cert.to_der().unwrap(), "wwdr").unwrap();
        (cert, key, wwdr, signer.cert)
    }

    #[test]
    fn test_sign_and_verify() {
        let (cert, key, wwdr, _) = material();
        let manifest = br#"{"pass.json":"a9993e364706816aba3e25717850c26c9cd0d89d"}"#;

        let signature = sign(manifest, &cert, &key, &wwdr, None).unwrap();
        assert_eq!(signature[0], 0x30);
        verify_detached(&signature, manifest).unwrap();
    }

    #[test]
    fn test_tampered_manifest_fails() {
        let (cert, key, wwdr, _) = material();
        let manifest = br#"{"icon.png":"da39a3ee5e6b4b0d3255bfef95601890afd80709"}"#.to_vec();
        let signature = sign(&manifest, &cert, &key, &wwdr, None).unwrap();

        let mut tampered = manifest.clone();
        tampered[5] ^= 0x01;
        assert!(matches!(verify_detached(&signature, &tampered), Err(Error::Signing(_))));
    }

    #[test]
    fn test_signature_is_detached_and_carries_both_certs() {
        let (cert, key, wwdr, signer_cert) = material();
        let manifest = b"{}";
        let signature = sign(manifest, &cert, &key, &wwdr, None).unwrap();

        // Detached: the manifest is not embedded, so verifying without it fails.
        let mut cms = CmsContentInfo::from_der(&signature).unwrap();
        assert!(cms
            .verify(None, None, None, None, CMSOptions::NO_SIGNER_CERT_VERIFY)
            .is_err());

        let signer_der = signer_cert.to_der().unwrap();
        let wwdr_der = wwdr.to_x509().unwrap().to_der().unwrap();
        let contains = |needle: &[u8]| signature.windows(needle.len()).any(|w| w == needle);
        assert!(contains(&signer_der));
        assert!(contains(&wwdr_der));
    }

    #[test]
    fn test_mismatched_key_is_rejected() {
        let (cert, _, wwdr, _) = material();
        let stranger = generate_key();
        let key = require_pem_key(&stranger.private_key_to_pem_pkcs8().unwrap(), "key").unwrap();

        let result = sign(b"{}", &cert, &key, &wwdr, None);
        assert!(matches!(result, Err(Error::Signing(_))));
    }

    #[test]
    fn test_encrypted_key_with_passphrase() {
        let (ca, signer) = issued_chain();
        let encrypted = signer
            .key
            .private_key_to_pem_pkcs8_passphrase(Cipher::aes_256_cbc(), b"open sesame")
            .unwrap();
        let cert = normalize_certificate(&signer.cert.to_pem().unwrap(), "signer").unwrap();
        let key = require_pem_key(&encrypted, "key").unwrap();
        let wwdr = normalize_certificate(&ca.cert.to_pem().unwrap(), "wwdr").unwrap();

        let right = SecretString::new("open sesame".into());
        let signature = sign(b"{}", &cert, &key, &wwdr, Some(&right)).unwrap();
        verify_detached(&signature, b"{}").unwrap();

        let wrong = SecretString::new("closed".into());
        assert!(matches!(
            sign(b"{}", &cert, &key, &wwdr, Some(&wrong)),
            Err(Error::Signing(_))
        ));
    }

    #[test]
    fn test_verify_garbage() {
        assert!(verify_detached(b"not a signature", b"{}").is_err());
    }
}
