//! Signed wallet pass bundles.
//!
//! Turns a branding request (name, company, colors, image URLs) into a signed
//! `.pkpass` archive: credentials are resolved, images fetched and resized,
//! every file digested into `manifest.json`, the manifest signed with a
//! detached CMS signature and everything zipped flat.
//!
//! Start with [`PassSigner`].

pub mod archive;
pub mod assets;
pub mod builder;
pub mod bundle;
pub mod config;
pub mod crypto;
pub mod error;
pub mod request;

pub use archive::CompressionLevel;
pub use assets::{AssetFetcher, HttpFetcher, ImageBackend, RasterBackend};
pub use builder::{PassSigner, SignedBundle, Stage};
pub use config::SignerConfig;
pub use error::Error;
pub use request::{ColorScheme, PassRequest};

pub type Result<T> = std::result::Result<T, Error>;
