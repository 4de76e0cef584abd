//! Pass signing pipeline.
//!
//! [`PassSigner`] runs a request through every stage, strictly in order:
//!
//! ```text
//! Received -> ConfigValidated -> CredentialsResolved -> AssetsGathered
//!          -> ManifestBuilt -> Signed -> Packaged -> Returned
//! ```
//!
//! Missing configuration is reported before any credential file is opened.
//! Asset failures degrade inside the `AssetsGathered` stage and never end the
//! request.

use crate::archive::{self, CompressionLevel};
use crate::assets::{AssetFetcher, AssetPipeline, HttpFetcher, ImageBackend, RasterBackend};
use crate::bundle::{build_directory, compute_manifest, PassDefinition};
use crate::config::{PassConfig, SignerConfig};
use crate::crypto::{self, IntermediateCertificate, ResolvedCredential, SigningCredential};
use crate::request::PassRequest;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Lifecycle state of a pass request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    ConfigValidated,
    CredentialsResolved,
    AssetsGathered,
    ManifestBuilt,
    Signed,
    Packaged,
    Returned,
    /// Terminal: operator configuration incomplete.
    ConfigurationMissing,
    /// Terminal: the request payload was rejected.
    Rejected,
    /// Terminal: signing material unreadable or malformed.
    CredentialError,
    /// Terminal: signature generation failed.
    SigningError,
    /// Terminal: the archive could not be assembled.
    PackagingError,
}

/// Everything the signature stage needs, resolved once per request or per process.
#[derive(Debug)]
struct SigningMaterial {
    credential: ResolvedCredential,
    intermediate: IntermediateCertificate,
}

impl SigningMaterial {
    fn load(config: &PassConfig) -> Result<Self> {
        let credential = SigningCredential::load(&config.credential)?.resolve()?;
        let intermediate = crypto::load_intermediate(&config.wwdr_certificate)?;
        Ok(Self {
            credential,
            intermediate,
        })
    }
}

/// A signed `.pkpass` archive.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedBundle {
    bytes: Vec<u8>,
    file_name: String,
}

impl SignedBundle {
    /// MIME type to serve the bundle with.
    pub const CONTENT_TYPE: &'static str = "application/vnd.apple.pkpass";

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Suggested download filename, derived from the card holder's name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl std::fmt::Debug for SignedBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedBundle")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Builds signed wallet passes from branding requests.
///
/// # Example
///
/// ```no_run
/// use walletpass::{PassRequest, PassSigner, SignerConfig};
///
/// # async fn run() -> walletpass::Result<()> {
/// let signer = PassSigner::new(
///     SignerConfig::new()
///         .pkcs12("signer.p12")
///         .pkcs12_password("secret")
///         .wwdr_certificate("wwdr.cer")
///         .team_identifier("ABCDE12345")
///         .pass_type_identifier("pass.com.example.card")
///         .organization_name("Example Cards"),
/// )?;
///
/// let request = PassRequest::from_json(br#"{
///     "name": "Jane Doe",
///     "company": "Acme",
///     "title": "Engineer",
///     "barcodeMessage": "hi"
/// }"#)?;
/// let bundle = signer.build(&request).await?;
/// std::fs::write(bundle.file_name(), bundle.as_bytes())?;
/// # Ok(())
/// # }
/// ```
pub struct PassSigner {
    config: SignerConfig,
    assets: AssetPipeline,
    compression_level: CompressionLevel,
    cached: Option<OnceCell<Arc<SigningMaterial>>>,
}

impl PassSigner {
    /// Create a signer with the default HTTP fetcher and raster backend.
    ///
    /// Does not validate `config`; that happens per request.
    pub fn new(config: SignerConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(config.get_fetch_timeout())?);
        Ok(Self::with_collaborators(config, fetcher, Arc::new(RasterBackend::new())))
    }

    /// Create a signer with explicit asset collaborators.
    pub fn with_collaborators(
        config: SignerConfig,
        fetcher: Arc<dyn AssetFetcher>,
        backend: Arc<dyn ImageBackend>,
    ) -> Self {
        let compression_level = config.get_compression_level();
        let cached = config.caches_credentials().then(OnceCell::new);
        Self {
            config,
            assets: AssetPipeline::new(fetcher, backend),
            compression_level,
            cached,
        }
    }

    /// Build and sign a pass for `request`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConfigurationMissing`](crate::Error::ConfigurationMissing) before any file is read
    /// - [`Error::InvalidPayload`](crate::Error::InvalidPayload) for a malformed request
    /// - Credential errors ([`Error::Io`](crate::Error::Io),
    ///   [`Error::CertificateFormat`](crate::Error::CertificateFormat),
    ///   [`Error::UnsupportedKeyEncoding`](crate::Error::UnsupportedKeyEncoding),
    ///   [`Error::InvalidPkcs12`](crate::Error::InvalidPkcs12))
    /// - [`Error::Signing`](crate::Error::Signing) and [`Error::Packaging`](crate::Error::Packaging)
    pub async fn build(&self, request: &PassRequest) -> Result<SignedBundle> {
        debug!(stage = ?Stage::Received);
        let config = self.config.validate()?;
        request.validate()?;
        let branding = request.branding()?;
        debug!(stage = ?Stage::ConfigValidated);

        let material = self.signing_material(&config).await?;
        debug!(stage = ?Stage::CredentialsResolved);

        let assets = self.assets.gather(&branding).await?;
        debug!(stage = ?Stage::AssetsGathered, assets = assets.len());

        let serial_number = uuid::Uuid::new_v4().to_string();
        let definition = PassDefinition::for_card(request, &config.identity, serial_number);
        let directory = build_directory(&definition, &assets)?;
        let manifest = compute_manifest(&directory).to_json()?;
        debug!(stage = ?Stage::ManifestBuilt, files = directory.len());

        let signature = {
            let manifest = manifest.clone();
            run_blocking(Error::Signing, move || {
                crypto::sign(
                    &manifest,
                    &material.credential.signer_cert,
                    &material.credential.signer_key,
                    &material.intermediate,
                    material.credential.passphrase.as_ref(),
                )
            })
            .await?
        };
        debug!(stage = ?Stage::Signed);

        let files = directory.len() + 2;
        let compression_level = self.compression_level;
        let bytes = run_blocking(Error::Packaging, move || {
            archive::package(&directory, &manifest, &signature, compression_level)
        })
        .await?;
        debug!(stage = ?Stage::Packaged);

        info!(
            serial_number = %definition.serial_number,
            files,
            bytes = bytes.len(),
            "pass bundle built"
        );
        debug!(stage = ?Stage::Returned);
        Ok(SignedBundle {
            bytes,
            file_name: bundle_file_name(&request.name),
        })
    }

    async fn signing_material(&self, config: &PassConfig) -> Result<Arc<SigningMaterial>> {
        let load = || {
            let config = config.clone();
            run_blocking(credential_task_failed, move || {
                SigningMaterial::load(&config).map(Arc::new)
            })
        };
        match &self.cached {
            Some(cell) => cell.get_or_try_init(load).await.cloned(),
            None => load().await,
        }
    }
}

/// Run file reads and openssl work on the blocking thread pool.
///
/// `on_abort` classifies a panicked or cancelled task.
async fn run_blocking<T, F>(on_abort: fn(String) -> Error, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| on_abort(format!("blocking task failed: {}", e)))?
}

fn credential_task_failed(message: String) -> Error {
    Error::Io(std::io::Error::other(message))
}

/// `Jane Doe` becomes `jane-doe.pkpass`.
fn bundle_file_name(name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "pass.pkpass".to_string()
    } else {
        format!("{}.pkpass", slug)
    }
}
