//! Pass request payload.
//!
//! The branding payload arrives as JSON with camelCase keys:
//!
//! ```json
//! {
//!   "name": "Jane Doe",
//!   "company": "Acme",
//!   "title": "Engineer",
//!   "barcodeMessage": "https://example.com/u/42",
//!   "logoUrl": "https://cdn.example.com/acme.png",
//!   "colors": { "background": "#1d1d1f", "text": "#ffffff" }
//! }
//! ```

use crate::assets::{AssetSource, Branding};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on any single text field, in characters.
pub const MAX_TEXT_LEN: usize = 512;

/// Optional hex colors for the pass; `text` becomes the foreground color.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorScheme {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A request to build one business-card pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassRequest {
    pub name: String,
    pub company: String,
    pub title: String,
    pub barcode_message: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub strip_image_url: Option<String>,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
    #[serde(default)]
    pub colors: Option<ColorScheme>,
}

impl PassRequest {
    /// Parse a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] when the JSON is malformed or lacks
    /// required fields.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidPayload(e.to_string()))
    }

    /// Check required fields, lengths and image URL schemes.
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("barcodeMessage", &self.barcode_message)?;
        for (field, value) in [
            ("name", &self.name),
            ("company", &self.company),
            ("title", &self.title),
            ("barcodeMessage", &self.barcode_message),
        ] {
            if value.chars().count() > MAX_TEXT_LEN {
                return Err(Error::InvalidPayload(format!(
                    "{field} exceeds {MAX_TEXT_LEN} characters"
                )));
            }
        }
        self.branding().map(|_| ())
    }

    /// Classify the image URLs. Blank URLs count as absent.
    pub fn branding(&self) -> Result<Branding> {
        Ok(Branding {
            logo: source(&self.logo_url)?,
            strip: source(&self.strip_image_url)?,
            profile_picture: source(&self.profile_pic_url)?,
        })
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidPayload(format!("{field} is required")));
    }
    Ok(())
}

fn source(url: &Option<String>) -> Result<Option<AssetSource>> {
    match url.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(url) => AssetSource::parse(url).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> PassRequest {
        PassRequest {
            name: "Jane Doe".into(),
            company: "Acme".into(),
            title: "Engineer".into(),
            barcode_message: "https://example.com/u/42".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_json_camel_case() {
        let request = PassRequest::from_json(
            br##"{"name":"Jane Doe","company":"Acme","title":"Engineer",
                 "barcodeMessage":"https://example.com/u/42",
                 "profilePicUrl":"https://cdn.example.com/jane.jpg",
                 "colors":{"background":"#000","text":"#fff"}}"##,
        )
        .unwrap();
        assert_eq!(request.barcode_message, "https://example.com/u/42");
        assert_eq!(request.profile_pic_url.as_deref(), Some("https://cdn.example.com/jane.jpg"));
        assert_eq!(request.colors.unwrap().text.as_deref(), Some("#fff"));
        assert!(request.logo_url.is_none());
    }

    #[test]
    fn test_from_json_missing_required() {
        let no_barcode = br#"{"name":"Jane","company":"Acme","title":"Engineer"}"#;
        let err = PassRequest::from_json(no_barcode).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(msg) if msg.contains("barcodeMessage")));
        assert!(PassRequest::from_json(b"not json").is_err());
    }

    #[test]
    fn test_from_json_requires_company_and_title() {
        let err = PassRequest::from_json(br#"{"name":"Jane","barcodeMessage":"x"}"#).unwrap_err();
        assert!(matches!(&err, Error::InvalidPayload(msg) if msg.contains("company")));
        assert!(err.is_user_correctable());

        let no_title = br#"{"name":"Jane","company":"Acme","barcodeMessage":"x"}"#;
        let err = PassRequest::from_json(no_title).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(msg) if msg.contains("title")));

        // Present but empty is accepted; the field is then left off the pass.
        let blank = br#"{"name":"Jane","company":"","title":"","barcodeMessage":"x"}"#;
        let request = PassRequest::from_json(blank).unwrap();
        request.validate().unwrap();
    }

    #[test]
    fn test_validate_ok() {
        jane().validate().unwrap();
    }

    #[test]
    fn test_validate_blank_name() {
        let request = PassRequest {
            name: "  ".into(),
            ..jane()
        };
        assert!(matches!(
            request.validate(),
            Err(Error::InvalidPayload(msg)) if msg == "name is required"
        ));
    }

    #[test]
    fn test_validate_overlong_field() {
        let request = PassRequest {
            title: "x".repeat(MAX_TEXT_LEN + 1),
            ..jane()
        };
        assert!(matches!(request.validate(), Err(Error::InvalidPayload(_))));
    }

    #[test]
    fn test_validate_bad_url_scheme() {
        let request = PassRequest {
            logo_url: Some("ftp://example.com/logo.png".into()),
            ..jane()
        };
        assert!(matches!(request.validate(), Err(Error::InvalidPayload(_))));
    }

    #[test]
    fn test_blank_urls_are_absent() {
        let request = PassRequest {
            logo_url: Some(String::new()),
            strip_image_url: Some("   ".into()),
            profile_pic_url: Some("data:image/png;base64,AAAA".into()),
            ..jane()
        };
        let branding = request.branding().unwrap();
        assert!(branding.logo.is_none());
        assert!(branding.strip.is_none());
        assert!(matches!(branding.profile_picture, Some(AssetSource::Data(_))));
    }
}
