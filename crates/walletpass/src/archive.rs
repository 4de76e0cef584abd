//! Pass archive creation.
//!
//! Packs the pass directory, `manifest.json` and `signature` into a flat ZIP
//! archive. Wallets reject bundles with subdirectories, so every entry is
//! written at the root.
//!
//! # Examples
//!
//! ```
//! use walletpass::archive::{package, CompressionLevel};
//! use walletpass::bundle::PassDirectory;
//!
//! let mut directory = PassDirectory::new();
//! directory.insert("pass.json", b"{}".to_vec());
//! let zip = package(&directory, b"{}", b"sig", CompressionLevel::DEFAULT)?;
//! assert_eq!(&zip[..4], b"PK\x03\x04");
//! # Ok::<(), walletpass::Error>(())
//! ```

use crate::bundle::{PassDirectory, MANIFEST_FILE};
use crate::crypto::SIGNATURE_FILE;
use crate::{Error, Result};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// ZIP compression level for pass archives.
///
/// The wallet accepts both stored and deflated entries.
///
/// # Examples
///
/// ```
/// use walletpass::archive::CompressionLevel;
///
/// let custom = CompressionLevel::new(3);
/// assert_eq!(custom.level(), 3);
/// assert_eq!(CompressionLevel::new(42).level(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// No compression (level 0). Entries are stored.
    pub const NONE: CompressionLevel = CompressionLevel(0);

    /// Default compression (level 6).
    pub const DEFAULT: CompressionLevel = CompressionLevel(6);

    /// Maximum compression (level 9).
    pub const MAX: CompressionLevel = CompressionLevel(9);

    /// Creates a compression level from 0-9.
    ///
    /// Values greater than 9 are clamped to 9.
    #[must_use]
    pub fn new(level: u32) -> Self {
        CompressionLevel(level.min(9))
    }

    /// Returns the compression level value (0-9).
    #[must_use]
    pub fn level(&self) -> u32 {
        self.0
    }

    fn file_options(self) -> SimpleFileOptions {
        if self.0 == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(self.0)))
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for CompressionLevel {
    fn from(level: u32) -> Self {
        CompressionLevel::new(level)
    }
}

/// Package a pass bundle into ZIP bytes.
///
/// Writes every directory file, then `manifest.json`, then `signature`.
///
/// # Errors
///
/// Returns [`Error::Packaging`] if:
/// - A filename contains a path separator or is empty
/// - The directory already holds `manifest.json` or `signature`
/// - The ZIP writer fails
pub fn package(
    directory: &PassDirectory,
    manifest: &[u8],
    signature: &[u8],
    compression_level: CompressionLevel,
) -> Result<Vec<u8>> {
    for (name, _) in directory.iter() {
        check_root_name(name)?;
        if name == MANIFEST_FILE || name == SIGNATURE_FILE {
            return Err(Error::Packaging(format!("{} is reserved", name)));
        }
    }

    let options = compression_level.file_options();
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let entries = directory
        .iter()
        .chain([(MANIFEST_FILE, manifest), (SIGNATURE_FILE, signature)]);
    for (name, data) in entries {
        zip.start_file(name, options)
            .map_err(|e| Error::Packaging(format!("Failed to start {}: {}", name, e)))?;
        zip.write_all(data)
            .map_err(|e| Error::Packaging(format!("Failed to write {}: {}", name, e)))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| Error::Packaging(format!("Failed to finish archive: {}", e)))?;
    Ok(cursor.into_inner())
}

fn check_root_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(Error::Packaging(format!(
            "{:?} is not a root-level filename",
            name
        )));
    }
    Ok(())
}
