//! Pass definition and manifest construction.
//!
//! This module turns a request into the files of a pass bundle and computes
//! the digest manifest that gets signed.
//!
//! # Bundle Layout
//!
//! Every file sits at the archive root:
//!
//! | File | Source |
//! |------|--------|
//! | `pass.json` | [`PassDefinition::to_json`] |
//! | `icon.png`, `icon@2x.png` | logo source or bundled default |
//! | `logo*.png`, `strip*.png`, `thumbnail*.png` | branding assets, when present |
//! | `manifest.json` | [`Manifest::to_json`] |
//! | `signature` | [`crate::crypto::sign`] over `manifest.json` |
//!
//! # Examples
//!
//! ```
//! use walletpass::bundle::{compute_manifest, PassDirectory};
//!
//! let mut directory = PassDirectory::new();
//! directory.insert("pass.json", b"abc".to_vec());
//! let manifest = compute_manifest(&directory);
//! assert_eq!(manifest.get("pass.json"), Some("a9993e364706816aba3e25717850c26c9cd0d89d"));
//! ```

pub mod definition;
pub mod manifest;

pub use definition::{
    parse_hex_color, Barcode, BarcodeFormat, Field, FieldGroups, PassDefinition, Rgb, PASS_FILE,
};
pub use manifest::{
    build_directory, compute_manifest, sha1_hex, Manifest, PassDirectory, MANIFEST_FILE,
};
