//! Pass directory and digest manifest.
//!
//! The directory is the in-memory set of files that end up at the root of the
//! bundle. The manifest maps each of those filenames to the lowercase hex
//! SHA-1 of its contents; the pass format mandates SHA-1 here.

use crate::assets::{AssetName, AssetSet, DEFAULT_ICON, DEFAULT_ICON_2X};
use crate::bundle::definition::{PassDefinition, PASS_FILE};
use crate::Result;
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// Name of the manifest file inside a bundle.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Files of a pass bundle, keyed by filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassDirectory {
    files: BTreeMap<String, Vec<u8>>,
}

impl PassDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, name: impl Into<String>, contents: Vec<u8>) {
        self.files.insert(name.into(), contents);
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(name, data)| (name.as_str(), data.as_slice()))
    }
}

/// Lay out the pass definition and assets as bundle files.
///
/// The icon pair is mandatory: if `assets` lacks it the bundled default is
/// used. Other absent assets are simply not written.
pub fn build_directory(definition: &PassDefinition, assets: &AssetSet) -> Result<PassDirectory> {
    let mut directory = PassDirectory::new();
    directory.insert(PASS_FILE, definition.to_json()?);

    for (name, png) in assets.iter() {
        directory.insert(name.file_name(), png.to_vec());
    }

    if !assets.contains(AssetName::Icon) {
        directory.insert(AssetName::Icon.file_name(), DEFAULT_ICON.to_vec());
    }
    if !assets.contains(AssetName::Icon2x) {
        directory.insert(AssetName::Icon2x.file_name(), DEFAULT_ICON_2X.to_vec());
    }

    Ok(directory)
}

/// Filename to hex SHA-1 digest, one entry per directory file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize to the bytes written as `manifest.json` (and signed).
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Compute the digest of every file in `directory`.
pub fn compute_manifest(directory: &PassDirectory) -> Manifest {
    let entries = directory
        .iter()
        .map(|(name, data)| (name.to_string(), sha1_hex(data)))
        .collect();
    Manifest { entries }
}

/// Lowercase hex SHA-1 of `data` (40 characters).
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PassIdentity;
    use crate::request::PassRequest;

    const QUICK_FOX: &[u8] = b"The quick brown fox jumps over the lazy dog";

    fn definition() -> PassDefinition {
        let request = PassRequest {
            name: "Jane Doe".into(),
            barcode_message: "https://example.com/u/42".into(),
            ..Default::default()
        };
        let identity = PassIdentity {
            team_identifier: "TEAM123456".into(),
            pass_type_identifier: "pass.com.example.card".into(),
            organization_name: "Example".into(),
        };
        PassDefinition::for_card(&request, &identity, "serial".into())
    }

    #[test]
    fn test_sha1_hex_reference_vectors() {
        assert_eq!(sha1_hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(sha1_hex(QUICK_FOX), "2fd4e1c67a2d28fced849ee1bb76e7391b93eb12");
    }

    #[test]
    fn test_manifest_of_fixed_directory() {
        let mut directory = PassDirectory::new();
        directory.insert("pass.json", b"abc".to_vec());
        directory.insert("icon.png", Vec::new());
        directory.insert("logo.png", QUICK_FOX.to_vec());

        let manifest = compute_manifest(&directory);
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest.get("pass.json"), Some("a9993e364706816aba3e25717850c26c9cd0d89d"));
        assert_eq!(manifest.get("icon.png"), Some("da39a3ee5e6b4b0d3255bfef95601890afd80709"));
        assert_eq!(manifest.get("logo.png"), Some("2fd4e1c67a2d28fced849ee1bb76e7391b93eb12"));
    }

    #[test]
    fn test_manifest_json_shape() {
        let mut directory = PassDirectory::new();
        directory.insert("pass.json", b"abc".to_vec());
        let json = compute_manifest(&directory).to_json().unwrap();
        assert_eq!(
            json,
            br#"{"pass.json":"a9993e364706816aba3e25717850c26c9cd0d89d"}"#.to_vec()
        );
    }

    #[test]
    fn test_build_directory_falls_back_to_default_icon() {
        let mut assets = AssetSet::new();
        assets.insert(AssetName::Logo, b"logo".to_vec());

        let directory = build_directory(&definition(), &assets).unwrap();
        assert_eq!(directory.get("icon.png"), Some(DEFAULT_ICON));
        assert_eq!(directory.get("icon@2x.png"), Some(DEFAULT_ICON_2X));
        assert_eq!(directory.get("logo.png"), Some(&b"logo"[..]));
        assert!(!directory.contains("strip.png"));
        assert!(!directory.contains("thumbnail.png"));
        assert_eq!(directory.len(), 4);
    }

    #[test]
    fn test_build_directory_includes_every_asset() {
        let mut assets = AssetSet::new();
        for name in AssetName::ALL {
            assets.insert(name, name.file_name().as_bytes().to_vec());
        }
        let definition = definition();
        let directory = build_directory(&definition, &assets).unwrap();

        assert_eq!(directory.len(), AssetName::ALL.len() + 1);
        assert_eq!(directory.get(PASS_FILE).unwrap(), definition.to_json().unwrap().as_slice());
        assert_eq!(directory.get("icon.png"), Some(&b"icon.png"[..]));

        let manifest = compute_manifest(&directory);
        assert_eq!(manifest.len(), directory.len());
        for (name, data) in directory.iter() {
            assert_eq!(manifest.get(name), Some(sha1_hex(data).as_str()));
        }
    }
}
