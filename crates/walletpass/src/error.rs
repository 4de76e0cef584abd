//! Error types for wallet pass construction.
//!
//! This module defines the [`enum@Error`] enum covering every failure a pass
//! request can hit: missing operator configuration, malformed signing
//! material, bad request payloads, signing and packaging failures.
//!
//! Asset fetch failures also have a variant ([`Error::AssetFetch`]) but the
//! pipeline never lets them escape: they degrade to a bundled default or to
//! omission of the file.
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error
//! - [`crate::builder::Stage`] - Lifecycle states that errors terminate in

use crate::builder::Stage;
use thiserror::Error;

/// Error type for wallet pass operations.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
///
/// # Examples
///
/// ```no_run
/// use walletpass::{Error, PassRequest, PassSigner, SignerConfig};
///
/// # async fn run(request: PassRequest) -> walletpass::Result<()> {
/// let signer = PassSigner::new(SignerConfig::from_env())?;
/// match signer.build(&request).await {
///     Ok(bundle) => println!("{} bytes", bundle.len()),
///     Err(Error::ConfigurationMissing(items)) => eprintln!("configure: {}", items.join(", ")),
///     Err(e) if e.is_user_correctable() => eprintln!("bad request: {e}"),
///     Err(e) => eprintln!("internal error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Occurs when reading credential files named by the operator configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required operator configuration is absent.
    ///
    /// Lists every missing item. Raised before any credential file is read.
    #[error("Missing configuration: {}", .0.join(", "))]
    ConfigurationMissing(Vec<String>),

    /// A certificate could not be parsed as PEM or DER X.509.
    ///
    /// Carries the label of the offending input (for example `"WWDR certificate"`).
    #[error("Invalid certificate format: {0}")]
    CertificateFormat(String),

    /// A private key was not PEM-encoded.
    #[error("Unsupported private key encoding for {0}: keys must be exported as PEM")]
    UnsupportedKeyEncoding(String),

    /// A PKCS#12 container was malformed, had a wrong passphrase, or lacked
    /// a certificate or key.
    ///
    /// The causes are deliberately not distinguished.
    #[error("Invalid PKCS#12 container: {0}")]
    InvalidPkcs12(String),

    /// The pass request payload is malformed or missing required fields.
    #[error("Invalid pass request: {0}")]
    InvalidPayload(String),

    /// A branding asset could not be fetched or decoded from its source.
    #[error("Failed to fetch asset from {0}")]
    AssetFetch(String),

    /// Image decoding, resizing or encoding failed.
    #[error("Image processing failed: {0}")]
    Image(String),

    /// CMS signature generation failed.
    ///
    /// Raised when the key cannot be loaded with the given passphrase or when
    /// the backend rejects the key/certificate pairing.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Writing the pass archive failed.
    #[error("Packaging failed: {0}")]
    Packaging(String),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller can fix this error by changing the request.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Error::InvalidPayload(_))
    }

    /// The terminal lifecycle state a request ends in when it fails with this error.
    pub fn terminal_stage(&self) -> Stage {
        match self {
            Error::ConfigurationMissing(_) => Stage::ConfigurationMissing,
            Error::InvalidPayload(_) => Stage::Rejected,
            Error::Io(_)
            | Error::CertificateFormat(_)
            | Error::UnsupportedKeyEncoding(_)
            | Error::InvalidPkcs12(_) => Stage::CredentialError,
            Error::Signing(_) => Stage::SigningError,
            Error::AssetFetch(_) | Error::Image(_) | Error::Packaging(_) | Error::Json(_) => {
                Stage::PackagingError
            }
        }
    }
}
