use std::{collections::HashMap, path::PathBuf, sync::Arc};

use futures::future::join_all;
use image::RgbaImage;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    fetch::{AssetFetchError, AssetFetcher, AssetSource, DirSource, FetchedAsset, HttpSource},
    manifest::{asset_key, skin_manifest, ManifestEntry},
    skin_text::{parse_pledit, parse_viscolor, LoadedPlEdit, VisColors},
    sprite::{self, SpriteRegion},
    store::{ObjectUrl, SkinAssetStore, SkinAssets},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinConfig {
    pub base_url: String,
    pub name: String,
}

impl SkinConfig {
    pub fn new(base_url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            name: name.into(),
        }
    }

    /// Local directory behind the base URL, if it isn't a remote one.
    pub fn local_dir(&self) -> Option<PathBuf> {
        let base = self.base_url.trim();
        if base.starts_with("http://") || base.starts_with("https://") {
            return None;
        }
        Some(PathBuf::from(base.strip_prefix("file://").unwrap_or(base)))
    }
}

impl Default for SkinConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SKIN_URL.to_string(),
            name: DEFAULT_SKIN_NAME.to_string(),
        }
    }
}

pub const DEFAULT_SKIN_URL: &str =
    "https://coda-projects.s3.ap-south-1.amazonaws.com/my-winamp/winamp-skin";
pub const DEFAULT_SKIN_NAME: &str = "Old Mac-OS";

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("skin '{0}' has an empty base URL")]
    EmptyBaseUrl(String),
    #[error("unsupported skin URL scheme in '{0}'")]
    UnsupportedScheme(String),
    #[error("skin directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Uninitialized,
    Loading,
    Loaded,
}

/// A dispatched set of fetches for one manifest, detached from the loader
/// so it can run on another thread.
pub struct PendingLoad {
    generation: u64,
    fetcher: AssetFetcher,
    manifest: Vec<ManifestEntry>,
}

impl PendingLoad {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves once every fetch has settled, successful or not.
    pub async fn run(self) -> LoadBatch {
        let fetches = self
            .manifest
            .iter()
            .map(|entry| self.fetcher.fetch(*entry));
        let outcomes = join_all(fetches).await;
        LoadBatch {
            generation: self.generation,
            results: self.manifest.into_iter().zip(outcomes).collect(),
        }
    }
}

pub struct LoadBatch {
    generation: u64,
    results: Vec<(ManifestEntry, Result<FetchedAsset, AssetFetchError>)>,
}

impl LoadBatch {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

pub struct SkinLoader {
    config: SkinConfig,
    fetcher: AssetFetcher,
    store: SkinAssetStore,
    images: HashMap<String, RgbaImage>,
    failures: Vec<AssetFetchError>,
    pledit: Option<LoadedPlEdit>,
    state: LoaderState,
    generation: u64,
}

impl SkinLoader {
    /// Builds a loader with the source implied by `config.base_url`.
    pub fn new(config: SkinConfig) -> Result<Self, OrchestrationError> {
        let base = config.base_url.trim();
        if base.is_empty() {
            return Err(OrchestrationError::EmptyBaseUrl(config.name.clone()));
        }
        let source: Arc<dyn AssetSource> = match config.local_dir() {
            None => Arc::new(HttpSource::new(base)),
            Some(_) if base.contains("://") && !base.starts_with("file://") => {
                return Err(OrchestrationError::UnsupportedScheme(base.to_string()));
            }
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(OrchestrationError::MissingDirectory(dir));
                }
                Arc::new(DirSource::new(dir))
            }
        };
        Self::with_source(config, source)
    }

    pub fn with_source(
        config: SkinConfig,
        source: Arc<dyn AssetSource>,
    ) -> Result<Self, OrchestrationError> {
        if config.base_url.trim().is_empty() {
            return Err(OrchestrationError::EmptyBaseUrl(config.name.clone()));
        }
        Ok(Self {
            store: SkinAssetStore::new(config.name.as_str()),
            fetcher: AssetFetcher::new(source),
            config,
            images: HashMap::new(),
            failures: Vec::new(),
            pledit: None,
            state: LoaderState::Uninitialized,
            generation: 0,
        })
    }

    pub fn config(&self) -> &SkinConfig {
        &self.config
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Loads every manifest entry. Entries that fail are left out of the
    /// result and recorded in [`SkinLoader::failures`].
    pub async fn load_skin(&mut self) -> SkinAssets {
        let pending = self.begin_load();
        let batch = pending.run().await;
        self.commit(batch).unwrap_or_else(|| self.assets())
    }

    pub fn begin_load(&mut self) -> PendingLoad {
        info!(
            "Loading skin: {} from {}",
            self.config.name,
            self.fetcher.location()
        );
        self.state = LoaderState::Loading;
        PendingLoad {
            generation: self.generation,
            fetcher: self.fetcher.clone(),
            manifest: skin_manifest(),
        }
    }

    /// Merges a finished batch. Batches started before the last
    /// [`SkinLoader::dispose`] are dropped and `None` is returned.
    pub fn commit(&mut self, batch: LoadBatch) -> Option<SkinAssets> {
        if batch.generation != self.generation {
            debug!(
                "Discarding skin batch from generation {} (current {})",
                batch.generation, self.generation
            );
            return None;
        }

        let mut loaded = 0usize;
        for (entry, outcome) in batch.results {
            match outcome {
                Ok(asset) => {
                    self.merge(entry, asset);
                    loaded += 1;
                }
                Err(err) => {
                    if entry.required {
                        warn!("Could not load {}: {err}", entry.filename);
                    } else {
                        debug!("Optional skin file {} unavailable: {err}", entry.filename);
                    }
                    self.failures.retain(|f| f.filename() != entry.filename);
                    self.failures.push(err);
                }
            }
        }

        self.pledit = self.text_asset("PLEdit.txt").map(parse_pledit);
        if let Some(loaded) = &self.pledit {
            for warning in &loaded.warnings {
                warn!("PLEdit.txt: {warning}");
            }
        }

        self.state = LoaderState::Loaded;
        info!(
            "Skin {} loaded: {loaded} assets, {} missing",
            self.config.name,
            self.failures.len()
        );
        Some(self.assets())
    }

    fn merge(&mut self, entry: ManifestEntry, asset: FetchedAsset) {
        let key = entry.key();
        self.failures.retain(|f| f.filename() != entry.filename);
        match asset {
            FetchedAsset::Image { image, bytes } => {
                self.store.insert_image(key.clone(), bytes);
                self.images.insert(key, image);
            }
            FetchedAsset::Text(text) => self.store.insert_text(key, text),
        }
    }

    pub fn assets(&self) -> SkinAssets {
        self.store.snapshot()
    }

    pub fn failures(&self) -> &[AssetFetchError] {
        &self.failures
    }

    pub fn resolve(&self, url: &ObjectUrl) -> Option<Arc<[u8]>> {
        self.store.resolve(url)
    }

    /// Decoded bitmap by filename (`CButtons.bmp`) or key (`cbuttons`).
    pub fn image(&self, filename: &str) -> Option<&RgbaImage> {
        self.images.get(&asset_key(filename))
    }

    pub fn sprite(&self, filename: &str, region: SpriteRegion) -> Option<RgbaImage> {
        let Some(image) = self.image(filename) else {
            warn!("Image not loaded: {filename}");
            return None;
        };
        Some(sprite::extract(image, region))
    }

    pub fn tiled_background(
        &self,
        filename: &str,
        region: SpriteRegion,
        target_width: u32,
        target_height: u32,
    ) -> Option<RgbaImage> {
        let Some(image) = self.image(filename) else {
            warn!("Image not loaded: {filename}");
            return None;
        };
        Some(sprite::tile(image, region, target_width, target_height))
    }

    pub fn get_sprite_data_url(&self, filename: &str, region: SpriteRegion) -> Option<String> {
        let sprite = self.sprite(filename, region)?;
        encode_data_url(filename, &sprite)
    }

    pub fn create_tiled_background(
        &self,
        filename: &str,
        region: SpriteRegion,
        target_width: u32,
        target_height: u32,
    ) -> Option<String> {
        let tiled = self.tiled_background(filename, region, target_width, target_height)?;
        encode_data_url(filename, &tiled)
    }

    pub fn text_asset(&self, key: &str) -> Option<&str> {
        self.store.text(&asset_key(key))
    }

    /// Playlist colours, parsed once when the batch carrying `PLEdit.txt`
    /// is committed.
    pub fn pledit_colors(&self) -> Option<&LoadedPlEdit> {
        self.pledit.as_ref()
    }

    pub fn vis_colors(&self) -> Option<VisColors> {
        self.text_asset("VisColor.txt").map(parse_viscolor)
    }

    /// Releases every handle and decoded image. Fetches still in flight are
    /// not cancelled, but their batch will be rejected by `commit`.
    pub fn dispose(&mut self) {
        self.store.dispose();
        self.images.clear();
        self.failures.clear();
        self.pledit = None;
        self.generation += 1;
        self.state = LoaderState::Uninitialized;
    }

    pub fn is_local(&self) -> bool {
        self.config.local_dir().is_some()
    }

    pub fn local_dir(&self) -> Option<PathBuf> {
        self.config.local_dir().filter(|dir| dir.is_dir())
    }
}

fn encode_data_url(filename: &str, image: &RgbaImage) -> Option<String> {
    match sprite::png_data_url(image) {
        Ok(url) => Some(url),
        Err(err) => {
            warn!("Could not encode sprite from {filename}: {err}");
            None
        }
    }
}
