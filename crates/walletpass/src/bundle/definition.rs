//! The `pass.json` document.
//!
//! Serialization is deterministic: keys follow struct declaration order and
//! each field group keeps insertion order (primary, secondary, auxiliary).

use crate::config::PassIdentity;
use crate::request::PassRequest;
use crate::Result;
use serde::{Serialize, Serializer};
use std::fmt;

/// Name of the pass definition file inside a bundle.
pub const PASS_FILE: &str = "pass.json";

/// Fallback background when the request color is absent or malformed.
pub const DEFAULT_BACKGROUND: Rgb = Rgb::new(255, 255, 255);
/// Fallback foreground (value text) color.
pub const DEFAULT_FOREGROUND: Rgb = Rgb::new(0, 0, 0);
/// Fallback label color.
pub const DEFAULT_LABEL: Rgb = Rgb::new(99, 99, 102);

/// An 8-bit RGB color, serialized as `rgb(r, g, b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse `#rrggbb` or `#rgb` (the `#` is optional).
///
/// Never fails: anything else yields `fallback`.
pub fn parse_hex_color(input: &str, fallback: Rgb) -> Rgb {
    let hex = input.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return fallback;
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    let parsed = match hex.len() {
        6 => (channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
        3 => (
            channel(&hex[0..1]).map(|v| v * 17),
            channel(&hex[1..2]).map(|v| v * 17),
            channel(&hex[2..3]).map(|v| v * 17),
        ),
        _ => return fallback,
    };

    match parsed {
        (Some(r), Some(g), Some(b)) => Rgb::new(r, g, b),
        _ => fallback,
    }
}

/// Symbology of the pass barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BarcodeFormat {
    #[serde(rename = "PKBarcodeFormatQR")]
    Qr,
    #[serde(rename = "PKBarcodeFormatPDF417")]
    Pdf417,
    #[serde(rename = "PKBarcodeFormatAztec")]
    Aztec,
    #[serde(rename = "PKBarcodeFormatCode128")]
    Code128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Barcode {
    pub message: String,
    pub format: BarcodeFormat,
    pub message_encoding: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// One key/label/value triple shown on the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub key: String,
    pub label: String,
    pub value: String,
}

impl Field {
    pub fn new(key: impl Into<String>, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldGroups {
    pub primary_fields: Vec<Field>,
    pub secondary_fields: Vec<Field>,
    pub auxiliary_fields: Vec<Field>,
}

/// A generic-style pass definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassDefinition {
    pub format_version: u32,
    pub pass_type_identifier: String,
    pub serial_number: String,
    pub team_identifier: String,
    pub organization_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_text: Option<String>,
    pub background_color: Rgb,
    pub foreground_color: Rgb,
    pub label_color: Rgb,
    pub barcode: Barcode,
    pub barcodes: Vec<Barcode>,
    pub generic: FieldGroups,
}

impl PassDefinition {
    /// Build the definition for a business card.
    ///
    /// The holder's name is the primary field, title secondary and company
    /// auxiliary; empty title or company fields are left out.
    pub fn for_card(request: &PassRequest, identity: &PassIdentity, serial_number: String) -> Self {
        let colors = request.colors.clone().unwrap_or_default();
        let color = |value: &Option<String>, fallback: Rgb| {
            value
                .as_deref()
                .map_or(fallback, |v| parse_hex_color(v, fallback))
        };

        let name = request.name.trim().to_string();
        let company = request.company.trim();
        let title = request.title.trim();

        let mut fields = FieldGroups::default();
        fields.primary_fields.push(Field::new("name", "Name", name.clone()));
        if !title.is_empty() {
            fields.secondary_fields.push(Field::new("title", "Title", title));
        }
        if !company.is_empty() {
            fields.auxiliary_fields.push(Field::new("company", "Company", company));
        }

        let barcode = Barcode {
            message: request.barcode_message.clone(),
            format: BarcodeFormat::Qr,
            message_encoding: "iso-8859-1".to_string(),
            alt_text: Some(name.clone()),
        };

        Self {
            format_version: 1,
            pass_type_identifier: identity.pass_type_identifier.clone(),
            serial_number,
            team_identifier: identity.team_identifier.clone(),
            organization_name: identity.organization_name.clone(),
            description: format!("Business card for {}", name),
            logo_text: (!company.is_empty()).then(|| company.to_string()),
            background_color: color(&colors.background, DEFAULT_BACKGROUND),
            foreground_color: color(&colors.text, DEFAULT_FOREGROUND),
            label_color: color(&colors.label, DEFAULT_LABEL),
            barcodes: vec![barcode.clone()],
            barcode,
            generic: fields,
        }
    }

    /// Serialize to the bytes written as `pass.json`.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}
