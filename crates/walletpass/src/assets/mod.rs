//! Branding asset gathering.
//!
//! The pipeline fetches up to three branding sources concurrently and renders
//! each into its 1x/2x PNG variants:
//!
//! | Source | Variants | Rendering | On failure |
//! |--------|----------|-----------|------------|
//! | logo | `icon`, `logo` | contain | bundled default |
//! | strip | `strip` | contain | omitted |
//! | profile picture | `thumbnail` | circular mask | omitted |
//!
//! Fetch and decode failures never fail the request; they are logged at
//! `warn` and degrade as shown.

pub mod fetch;
pub mod raster;

pub use fetch::{decode_data_url, AssetFetcher, AssetSource, HttpFetcher};
pub use raster::{mask_circular, resize_square, ImageBackend, RasterBackend};

use crate::{Error, Result};
use image::DynamicImage;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bundled fallback icon at 1x (29px).
pub const DEFAULT_ICON: &[u8] = include_bytes!("default_icon.png");

/// Bundled fallback icon at 2x (58px).
pub const DEFAULT_ICON_2X: &[u8] = include_bytes!("default_icon@2x.png");

/// Pixel size pairs (1x, 2x) of each variant family.
pub const ICON_SIZES: (u32, u32) = (29, 58);
pub const LOGO_SIZES: (u32, u32) = (40, 80);
pub const STRIP_SIZES: (u32, u32) = (125, 250);
pub const THUMBNAIL_SIZES: (u32, u32) = (90, 180);

/// Logical name of a pass image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetName {
    Icon,
    Icon2x,
    Logo,
    Logo2x,
    Strip,
    Strip2x,
    Thumbnail,
    Thumbnail2x,
}

impl AssetName {
    pub const ALL: [AssetName; 8] = [
        AssetName::Icon,
        AssetName::Icon2x,
        AssetName::Logo,
        AssetName::Logo2x,
        AssetName::Strip,
        AssetName::Strip2x,
        AssetName::Thumbnail,
        AssetName::Thumbnail2x,
    ];

    /// Name of the file inside the pass bundle.
    pub fn file_name(self) -> &'static str {
        match self {
            AssetName::Icon => "icon.png",
            AssetName::Icon2x => "icon@2x.png",
            AssetName::Logo => "logo.png",
            AssetName::Logo2x => "logo@2x.png",
            AssetName::Strip => "strip.png",
            AssetName::Strip2x => "strip@2x.png",
            AssetName::Thumbnail => "thumbnail.png",
            AssetName::Thumbnail2x => "thumbnail@2x.png",
        }
    }
}

/// Rendered PNG bytes keyed by logical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSet {
    entries: BTreeMap<AssetName, Vec<u8>>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: AssetName, png: Vec<u8>) {
        self.entries.insert(name, png);
    }

    pub fn get(&self, name: AssetName) -> Option<&[u8]> {
        self.entries.get(&name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: AssetName) -> bool {
        self.entries.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetName, &[u8])> {
        self.entries.iter().map(|(name, png)| (*name, png.as_slice()))
    }
}

/// Branding image sources taken from a pass request.
#[derive(Debug, Clone, Default)]
pub struct Branding {
    pub logo: Option<AssetSource>,
    pub strip: Option<AssetSource>,
    pub profile_picture: Option<AssetSource>,
}

/// Fetches branding sources and renders pass image variants.
#[derive(Clone)]
pub struct AssetPipeline {
    fetcher: Arc<dyn AssetFetcher>,
    backend: Arc<dyn ImageBackend>,
}

/// Raw bytes of one branding source, with the source kept for logging.
struct Fetched {
    source: AssetSource,
    bytes: Vec<u8>,
}

impl AssetPipeline {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, backend: Arc<dyn ImageBackend>) -> Self {
        Self { fetcher, backend }
    }

    /// Gather every asset for `branding`.
    ///
    /// The three sources are fetched concurrently, then decoded and rendered
    /// on the blocking thread pool. The result always contains `icon` and
    /// `icon@2x`.
    ///
    /// # Errors
    ///
    /// Only fails if the bundled default icon itself cannot be rendered.
    pub async fn gather(&self, branding: &Branding) -> Result<AssetSet> {
        let (logo, strip, profile) = tokio::join!(
            self.load(branding.logo.as_ref()),
            self.load(branding.strip.as_ref()),
            self.load(branding.profile_picture.as_ref()),
        );

        let renderer = Renderer {
            backend: Arc::clone(&self.backend),
        };
        tokio::task::spawn_blocking(move || renderer.render(logo, strip, profile))
            .await
            .map_err(|e| Error::Image(format!("asset rendering aborted: {}", e)))?
    }

    /// Fetch one source, logging and swallowing any failure.
    async fn load(&self, source: Option<&AssetSource>) -> Option<Fetched> {
        let source = source?;
        match fetch::fetch(self.fetcher.as_ref(), source).await {
            Ok(bytes) => Some(Fetched {
                source: source.clone(),
                bytes,
            }),
            Err(e) => {
                warn!(source = %source, error = %e, "asset fetch failed");
                None
            }
        }
    }
}

/// CPU-bound half of the pipeline: decoding and resampling.
struct Renderer {
    backend: Arc<dyn ImageBackend>,
}

impl Renderer {
    fn render(
        &self,
        logo: Option<Fetched>,
        strip: Option<Fetched>,
        profile: Option<Fetched>,
    ) -> Result<AssetSet> {
        let mut assets = AssetSet::new();

        let rendered = match logo.and_then(|f| self.decode(f)) {
            Some(image) => match self.render_primary(&mut assets, &image) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "logo rendering failed");
                    false
                }
            },
            None => false,
        };
        if !rendered {
            debug!("using bundled default icon");
            let default = self.backend.decode(DEFAULT_ICON_2X)?;
            self.render_primary(&mut assets, &default)?;
        }

        // Strip and thumbnail are cosmetic: a failure drops the files.
        if let Some(strip) = strip.and_then(|f| self.decode(f)) {
            let strip_names = (AssetName::Strip, AssetName::Strip2x);
            if let Err(e) =
                self.render_pair(&mut assets, &strip, STRIP_SIZES, strip_names, Fit::Contain)
            {
                warn!(error = %e, "omitting strip image");
            }
        }
        if let Some(profile) = profile.and_then(|f| self.decode(f)) {
            if let Err(e) = self.render_pair(
                &mut assets,
                &profile,
                THUMBNAIL_SIZES,
                (AssetName::Thumbnail, AssetName::Thumbnail2x),
                Fit::Circle,
            ) {
                warn!(error = %e, "omitting thumbnail image");
            }
        }

        Ok(assets)
    }

    fn decode(&self, fetched: Fetched) -> Option<DynamicImage> {
        match self.backend.decode(&fetched.bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(source = %fetched.source, error = %e, "asset decode failed");
                None
            }
        }
    }

    fn render_primary(&self, assets: &mut AssetSet, image: &DynamicImage) -> Result<()> {
        let icon_names = (AssetName::Icon, AssetName::Icon2x);
        let logo_names = (AssetName::Logo, AssetName::Logo2x);
        self.render_pair(assets, image, ICON_SIZES, icon_names, Fit::Contain)?;
        self.render_pair(assets, image, LOGO_SIZES, logo_names, Fit::Contain)
    }

    fn render_pair(
        &self,
        assets: &mut AssetSet,
        image: &DynamicImage,
        (size_1x, size_2x): (u32, u32),
        (name_1x, name_2x): (AssetName, AssetName),
        fit: Fit,
    ) -> Result<()> {
        let render = |size| match fit {
            Fit::Contain => self.backend.contain(image, size),
            Fit::Circle => self.backend.circle(image, size),
        };
        let png_1x = render(size_1x)?;
        let png_2x = render(size_2x)?;
        assets.insert(name_1x, png_1x);
        assets.insert(name_2x, png_2x);
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Fit {
    Contain,
    Circle,
}
