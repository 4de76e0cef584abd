//! Operator configuration for pass signing.
//!
//! [`SignerConfig`] collects credential paths and pass identifiers through a
//! builder API or the environment. [`SignerConfig::validate`] turns it into a
//! [`PassConfig`] by checking presence only: no credential file is opened
//! until a configuration is known to be complete.
//!
//! # Examples
//!
//! ```
//! use walletpass::SignerConfig;
//!
//! let config = SignerConfig::new()
//!     .pkcs12("/etc/walletpass/signer.p12")
//!     .pkcs12_password("secret")
//!     .wwdr_certificate("/etc/walletpass/wwdr.cer")
//!     .team_identifier("ABCDE12345")
//!     .pass_type_identifier("pass.com.example.card")
//!     .organization_name("Example Cards");
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::archive::CompressionLevel;
use crate::{Error, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for remote asset fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_P12_PATH: &str = "WALLETPASS_P12_PATH";
pub const ENV_P12_PASSWORD: &str = "WALLETPASS_P12_PASSWORD";
pub const ENV_CERT_PATH: &str = "WALLETPASS_CERT_PATH";
pub const ENV_KEY_PATH: &str = "WALLETPASS_KEY_PATH";
pub const ENV_KEY_PASSPHRASE: &str = "WALLETPASS_KEY_PASSPHRASE";
pub const ENV_WWDR_PATH: &str = "WALLETPASS_WWDR_PATH";
pub const ENV_TEAM_ID: &str = "WALLETPASS_TEAM_ID";
pub const ENV_PASS_TYPE_ID: &str = "WALLETPASS_PASS_TYPE_ID";
pub const ENV_ORG_NAME: &str = "WALLETPASS_ORG_NAME";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "WALLETPASS_FETCH_TIMEOUT_SECS";

/// Where the signer's certificate and key come from.
///
/// Exactly one mode is selected by [`SignerConfig::validate`]; PKCS#12 wins
/// when both are fully configured.
#[derive(Clone, Debug)]
pub enum CredentialSource {
    /// A PKCS#12 container and its decryption passphrase.
    Pkcs12 {
        path: PathBuf,
        password: SecretString,
    },
    /// Separate certificate and private key files.
    PemPair {
        certificate: PathBuf,
        private_key: PathBuf,
        key_password: Option<SecretString>,
    },
}

/// Identifiers written into every pass definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassIdentity {
    pub team_identifier: String,
    pub pass_type_identifier: String,
    pub organization_name: String,
}

/// A complete, presence-checked operator configuration.
#[derive(Clone, Debug)]
pub struct PassConfig {
    pub credential: CredentialSource,
    pub wwdr_certificate: PathBuf,
    pub identity: PassIdentity,
}

/// Operator configuration with builder pattern API.
///
/// Every field is optional here; [`validate`](Self::validate) reports what is
/// missing. The secrets are held in [`SecretString`] and zeroized on drop.
#[derive(Clone, Debug)]
pub struct SignerConfig {
    pkcs12: Option<PathBuf>,
    pkcs12_password: Option<SecretString>,
    certificate: Option<PathBuf>,
    private_key: Option<PathBuf>,
    key_password: Option<SecretString>,
    wwdr_certificate: Option<PathBuf>,
    team_identifier: Option<String>,
    pass_type_identifier: Option<String>,
    organization_name: Option<String>,
    fetch_timeout: Duration,
    compression_level: CompressionLevel,
    cache_credentials: bool,
}

impl SignerConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self {
            pkcs12: None,
            pkcs12_password: None,
            certificate: None,
            private_key: None,
            key_password: None,
            wwdr_certificate: None,
            team_identifier: None,
            pass_type_identifier: None,
            organization_name: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            compression_level: CompressionLevel::DEFAULT,
            cache_credentials: false,
        }
    }

    /// Read configuration from the `WALLETPASS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as absent. An unparsable timeout keeps the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new();
        config.pkcs12 = get(ENV_P12_PATH).map(PathBuf::from);
        config.pkcs12_password = get(ENV_P12_PASSWORD).map(SecretString::new);
        config.certificate = get(ENV_CERT_PATH).map(PathBuf::from);
        config.private_key = get(ENV_KEY_PATH).map(PathBuf::from);
        config.key_password = get(ENV_KEY_PASSPHRASE).map(SecretString::new);
        config.wwdr_certificate = get(ENV_WWDR_PATH).map(PathBuf::from);
        config.team_identifier = get(ENV_TEAM_ID);
        config.pass_type_identifier = get(ENV_PASS_TYPE_ID);
        config.organization_name = get(ENV_ORG_NAME);
        if let Some(secs) = get(ENV_FETCH_TIMEOUT_SECS).and_then(|v| v.trim().parse::<u64>().ok()) {
            config.fetch_timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Set the PKCS#12 container path (.p12, DER or base64 text).
    pub fn pkcs12(mut self, path: impl Into<PathBuf>) -> Self {
        self.pkcs12 = Some(path.into());
        self
    }

    /// Set the PKCS#12 decryption password.
    pub fn pkcs12_password(mut self, password: impl Into<String>) -> Self {
        self.pkcs12_password = Some(SecretString::new(password.into()));
        self
    }

    /// Set the signer certificate path (PEM or DER).
    pub fn certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate = Some(path.into());
        self
    }

    /// Set the signer private key path (PEM only).
    pub fn private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key = Some(path.into());
        self
    }

    /// Set the passphrase of an encrypted PEM private key.
    ///
    /// Ignored when PKCS#12 mode is selected.
    pub fn key_password(mut self, password: impl Into<String>) -> Self {
        self.key_password = Some(SecretString::new(password.into()));
        self
    }

    /// Set the intermediate (WWDR) certificate path (PEM or DER).
    pub fn wwdr_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.wwdr_certificate = Some(path.into());
        self
    }

    pub fn team_identifier(mut self, id: impl Into<String>) -> Self {
        self.team_identifier = Some(id.into());
        self
    }

    pub fn pass_type_identifier(mut self, id: impl Into<String>) -> Self {
        self.pass_type_identifier = Some(id.into());
        self
    }

    pub fn organization_name(mut self, name: impl Into<String>) -> Self {
        self.organization_name = Some(name.into());
        self
    }

    /// Set the timeout applied to every remote asset fetch.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set ZIP compression level for the pass archive (0-9).
    ///
    /// 0 stores entries uncompressed. Default is 6.
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = CompressionLevel::new(level);
        self
    }

    /// Resolve credentials once per process instead of once per request.
    pub fn cache_credentials(mut self, enabled: bool) -> Self {
        self.cache_credentials = enabled;
        self
    }

    pub fn get_fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn get_compression_level(&self) -> CompressionLevel {
        self.compression_level
    }

    pub fn caches_credentials(&self) -> bool {
        self.cache_credentials
    }

    /// Check that a complete configuration is present.
    ///
    /// Returns [`Error::ConfigurationMissing`] listing every absent item. This
    /// never touches the filesystem.
    pub fn validate(&self) -> Result<PassConfig> {
        let mut missing = Vec::new();

        let credential = match self.credential_source() {
            Ok(source) => Some(source),
            Err(items) => {
                missing.extend(items);
                None
            }
        };

        if self.wwdr_certificate.is_none() {
            missing.push("WWDR certificate path".to_string());
        }
        if blank(&self.team_identifier) {
            missing.push("team identifier".to_string());
        }
        if blank(&self.pass_type_identifier) {
            missing.push("pass type identifier".to_string());
        }
        if blank(&self.organization_name) {
            missing.push("organization name".to_string());
        }

        match (credential, &self.wwdr_certificate) {
            (Some(credential), Some(wwdr)) if missing.is_empty() => Ok(PassConfig {
                credential,
                wwdr_certificate: wwdr.clone(),
                identity: PassIdentity {
                    team_identifier: self.team_identifier.clone().unwrap_or_default(),
                    pass_type_identifier: self.pass_type_identifier.clone().unwrap_or_default(),
                    organization_name: self.organization_name.clone().unwrap_or_default(),
                },
            }),
            _ => Err(Error::ConfigurationMissing(missing)),
        }
    }

    fn credential_source(&self) -> std::result::Result<CredentialSource, Vec<String>> {
        if let (Some(path), Some(password)) = (&self.pkcs12, &self.pkcs12_password) {
            return Ok(CredentialSource::Pkcs12 {
                path: path.clone(),
                password: password.clone(),
            });
        }

        if let (Some(certificate), Some(private_key)) = (&self.certificate, &self.private_key) {
            return Ok(CredentialSource::PemPair {
                certificate: certificate.clone(),
                private_key: private_key.clone(),
                key_password: self.key_password.clone(),
            });
        }

        let mut missing = Vec::new();
        let pem_started = self.certificate.is_some() || self.private_key.is_some();
        if self.pkcs12.is_some() && !pem_started {
            missing.push("PKCS#12 password".to_string());
        } else if pem_started {
            if self.certificate.is_none() {
                missing.push("signer certificate path".to_string());
            }
            if self.private_key.is_none() {
                missing.push("signer private key path".to_string());
            }
        } else {
            missing.push(
                "signing credentials (PKCS#12 path and password, or certificate and private key paths)"
                    .to_string(),
            );
        }
        Err(missing)
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
