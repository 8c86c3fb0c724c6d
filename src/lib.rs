//! Skinned retro audio player: skin asset loading and the playback engine.
//!
//! Re-exports the modules for the `retro_player` binary.

// Skin assets
pub mod fetch;
pub mod manifest;
pub mod skin_loader;
pub mod skin_text;
pub mod sprite;
pub mod sprites;
pub mod store;

// Playback
pub mod command;
pub mod equalizer;
pub mod playback;
pub mod stream;

// App
pub mod config;
pub mod ui_skin;

pub use command::Command;
pub use fetch::{AssetFetchError, AssetFetcher, AssetSource, DirSource, HttpSource, MemorySource};
pub use manifest::{skin_manifest, ManifestEntry};
pub use playback::{AudioSource, ClockSource, PlaybackEngine, PlaybackError, Track};
pub use skin_loader::{SkinConfig, SkinLoader};
pub use store::{AssetValue, ObjectUrl, SkinAssetStore, SkinAssets};
