use std::{
    collections::HashMap,
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
};

use anyhow::{anyhow, Context, Result};
use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};
use image::RgbaImage;
use log::{error, info, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::{
    manifest::MANIFEST,
    skin_loader::{LoadBatch, LoaderState, SkinLoader},
    sprite::SpriteRegion,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TextureKey {
    Sprite(String, SpriteRegion),
    Tiled(String, SpriteRegion, u32, u32),
}

/// Owns the skin loader on the UI side: runs loads off the frame loop,
/// turns sprites into textures and reloads a local skin when it changes.
pub struct SkinManager {
    loader: SkinLoader,
    pending: Option<Receiver<LoadBatch>>,
    missing: Vec<String>,
    watcher: Option<RecommendedWatcher>,
    changes_rx: Option<Receiver<notify::Result<notify::Event>>>,
    textures: HashMap<TextureKey, TextureHandle>,
}

impl SkinManager {
    pub fn new(loader: SkinLoader) -> Self {
        Self {
            loader,
            pending: None,
            missing: Vec::new(),
            watcher: None,
            changes_rx: None,
            textures: HashMap::new(),
        }
    }

    pub fn loader(&self) -> &SkinLoader {
        &self.loader
    }

    pub fn skin_name(&self) -> &str {
        &self.loader.config().name
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.loader.state() == LoaderState::Loaded
    }

    /// Required bitmaps the last load could not provide.
    pub fn missing_required(&self) -> &[String] {
        &self.missing
    }

    /// Dispatches a load on a worker thread; `poll_load` picks up the batch.
    pub fn start_load(&mut self, ctx: &egui::Context) -> Result<()> {
        let pending = self.loader.begin_load();
        let generation = pending.generation();
        let (tx, rx) = mpsc::channel();
        let ctx = ctx.clone();
        thread::Builder::new()
            .name(format!("skin-load-{generation}"))
            .spawn(move || {
                let batch = futures::executor::block_on(pending.run());
                if tx.send(batch).is_ok() {
                    ctx.request_repaint();
                }
            })
            .context("Failed to spawn skin loader thread")?;
        self.pending = Some(rx);
        Ok(())
    }

    /// Returns `true` when a batch was committed this call.
    pub fn poll_load(&mut self) -> bool {
        let Some(rx) = self.pending.as_ref() else {
            return false;
        };
        let batch = match rx.try_recv() {
            Ok(batch) => batch,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                error!("Skin loader thread exited without a result");
                self.pending = None;
                return false;
            }
        };
        self.pending = None;

        if self.loader.commit(batch).is_none() {
            return false;
        }
        self.textures.clear();
        self.missing = self
            .loader
            .failures()
            .iter()
            .filter(|failure| {
                MANIFEST
                    .iter()
                    .any(|entry| entry.required && entry.filename == failure.filename())
            })
            .map(|failure| failure.filename().to_string())
            .collect();
        true
    }

    pub fn reload(&mut self, ctx: &egui::Context) -> Result<()> {
        self.dispose();
        self.start_load(ctx)
    }

    pub fn dispose(&mut self) {
        self.pending = None;
        self.textures.clear();
        self.missing.clear();
        self.loader.dispose();
    }

    pub fn sprite_texture(
        &mut self,
        ctx: &egui::Context,
        filename: &str,
        region: SpriteRegion,
    ) -> Option<TextureHandle> {
        let key = TextureKey::Sprite(filename.to_string(), region);
        if let Some(texture) = self.textures.get(&key) {
            return Some(texture.clone());
        }
        let sprite = self.loader.sprite(filename, region)?;
        Some(self.upload(ctx, key, &sprite))
    }

    pub fn tiled_texture(
        &mut self,
        ctx: &egui::Context,
        filename: &str,
        region: SpriteRegion,
        width: u32,
        height: u32,
    ) -> Option<TextureHandle> {
        let key = TextureKey::Tiled(filename.to_string(), region, width, height);
        if let Some(texture) = self.textures.get(&key) {
            return Some(texture.clone());
        }
        let tiled = self.loader.tiled_background(filename, region, width, height)?;
        Some(self.upload(ctx, key, &tiled))
    }

    fn upload(&mut self, ctx: &egui::Context, key: TextureKey, image: &RgbaImage) -> TextureHandle {
        let name = match &key {
            TextureKey::Sprite(file, r) => format!("skin-{file}-{}-{}-{}x{}", r.x, r.y, r.width, r.height),
            TextureKey::Tiled(file, r, w, h) => format!("skin-tile-{file}-{}-{}-{w}x{h}", r.x, r.y),
        };
        let texture = ctx.load_texture(name, to_color_image(image), TextureOptions::NEAREST);
        self.textures.insert(key, texture.clone());
        texture
    }

    pub fn enable_hot_reload(&mut self) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let root = self.loader.local_dir().ok_or_else(|| {
            anyhow!(
                "Skin '{}' is not a local directory",
                self.loader.config().base_url
            )
        })?;

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;
        info!("Watching {} for skin changes", root.display());

        self.changes_rx = Some(rx);
        self.watcher = Some(watcher);
        Ok(())
    }

    pub fn disable_hot_reload(&mut self) {
        self.watcher = None;
        self.changes_rx = None;
    }

    pub fn hot_reload_enabled(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn poll_hot_reload(&mut self, ctx: &egui::Context) -> bool {
        let mut events = Vec::new();
        if let Some(rx) = self.changes_rx.as_ref() {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }

        let mut relevant = false;
        for event in events {
            match event {
                Ok(evt) => relevant |= evt.paths.iter().any(|p| is_skin_file(p)),
                Err(err) => warn!("Skin watcher error: {err}"),
            }
        }
        if !relevant {
            return false;
        }

        info!("Skin files changed, reloading {}", self.skin_name());
        match self.reload(ctx) {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to reload skin: {err:#}");
                false
            }
        }
    }
}

fn is_skin_file(path: &std::path::Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("bmp") || ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

pub fn to_color_image(image: &RgbaImage) -> ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    ColorImage::from_rgba_unmultiplied(size, image.as_raw())
}
