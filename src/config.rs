use anyhow::Context;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    playback::{SkipPolicy, Track, DEFAULT_VOLUME},
    skin_loader::{SkinConfig, DEFAULT_SKIN_NAME, DEFAULT_SKIN_URL},
};

const MUSIC_BUCKET: &str =
    "https://m1xtape-man-music.s3.ap-south-1.amazonaws.com/Beats%20in%20Drive/BID%20Pt.%201";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub skin: SkinSettings,
    pub playback: PlaybackSettings,
    pub playlist: Vec<Track>,
}

impl Config {
    /// Reads `explicit` when given, otherwise the first config file found
    /// beside the working directory or the executable.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        for path in candidate_paths() {
            if path.exists() {
                return Self::read(&path);
            }
        }

        Ok(Config::default())
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let doc: ConfigDocument = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(doc.into())
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(current_dir) = env::current_dir() {
        roots.push(current_dir);
    }
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            roots.push(dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| {
            [
                root.join("config.toml"),
                root.join("config").join("config.toml"),
                root.join("config").join("retro_player.toml"),
            ]
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct SkinSettings {
    pub source: SkinConfig,
    pub hot_reload: bool,
}

impl Default for SkinSettings {
    fn default() -> Self {
        Self {
            source: SkinConfig::default(),
            hot_reload: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub volume: i32,
    pub shuffle: bool,
    pub repeat: bool,
    pub skip_policy: SkipPolicy,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            shuffle: false,
            repeat: false,
            skip_policy: SkipPolicy::default(),
        }
    }
}

pub fn default_playlist() -> Vec<Track> {
    [
        ("Analog", "Analog.wav"),
        ("Alarms", "Alarms.wav"),
        ("Ark", "Ark.wav"),
        ("B-roll", "B-roll.wav"),
        ("Back in the day", "Back%20in%20the%20day.wav"),
        ("Cool", "Cool.wav"),
        ("December", "December%20(Instrumental).wav"),
        ("Digital", "Digital.wav"),
    ]
    .into_iter()
    .map(|(title, file)| Track::new(title, "m1xtapeman", format!("{MUSIC_BUCKET}/{file}")))
    .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    skin: SkinSection,
    #[serde(default)]
    playback: PlaybackSection,
    playlist: Option<Vec<Track>>,
}

impl From<ConfigDocument> for Config {
    fn from(value: ConfigDocument) -> Self {
        let skin = SkinSettings {
            source: SkinConfig::new(
                value
                    .skin
                    .base_url
                    .unwrap_or_else(|| DEFAULT_SKIN_URL.to_string()),
                value
                    .skin
                    .name
                    .unwrap_or_else(|| DEFAULT_SKIN_NAME.to_string()),
            ),
            hot_reload: value.skin.hot_reload.unwrap_or(false),
        };

        let playback = PlaybackSettings {
            volume: value.playback.volume.unwrap_or(DEFAULT_VOLUME).clamp(0, 100),
            shuffle: value.playback.shuffle.unwrap_or(false),
            repeat: value.playback.repeat.unwrap_or(false),
            skip_policy: value.playback.skip_policy.unwrap_or_default(),
        };

        let playlist = value
            .playlist
            .filter(|tracks| !tracks.is_empty())
            .unwrap_or_else(default_playlist);

        Config {
            skin,
            playback,
            playlist,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SkinSection {
    base_url: Option<String>,
    name: Option<String>,
    hot_reload: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaybackSection {
    volume: Option<i32>,
    shuffle: Option<bool>,
    repeat: Option<bool>,
    skip_policy: Option<SkipPolicy>,
}
