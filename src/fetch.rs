use std::{
    collections::HashMap,
    fs, io,
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use futures::{channel::oneshot, future::BoxFuture, FutureExt};
use image::RgbaImage;
use log::debug;
use thiserror::Error;

use crate::manifest::{AssetKind, ManifestEntry};

pub const MAX_ASSET_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AssetFetchError {
    #[error("{filename}: request failed: {reason}")]
    Transport { filename: String, reason: String },
    #[error("{filename}: server responded with status {status}")]
    Status { filename: String, status: u16 },
    #[error("{filename}: {source}")]
    Io {
        filename: String,
        #[source]
        source: io::Error,
    },
    #[error("{filename}: larger than {limit} bytes")]
    TooLarge { filename: String, limit: u64 },
    #[error("{filename}: could not decode image: {source}")]
    Decode {
        filename: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{filename}: fetch worker exited before responding")]
    Disconnected { filename: String },
}

impl AssetFetchError {
    pub fn filename(&self) -> &str {
        match self {
            Self::Transport { filename, .. }
            | Self::Status { filename, .. }
            | Self::Io { filename, .. }
            | Self::TooLarge { filename, .. }
            | Self::Decode { filename, .. }
            | Self::Disconnected { filename } => filename,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 404,
            Self::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Byte-level access to the files of one skin.
pub trait AssetSource: Send + Sync {
    /// Human readable location, used in log lines.
    fn location(&self) -> String;

    fn get(&self, filename: &str) -> BoxFuture<'static, Result<Vec<u8>, AssetFetchError>>;
}

/// Runs a blocking read on its own thread and resolves with its result.
fn on_worker<F>(filename: String, job: F) -> BoxFuture<'static, Result<Vec<u8>, AssetFetchError>>
where
    F: FnOnce() -> Result<Vec<u8>, AssetFetchError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let spawned = thread::Builder::new()
        .name(format!("fetch-{filename}"))
        .spawn(move || {
            let _ = tx.send(job());
        });

    async move {
        if let Err(err) = spawned {
            return Err(AssetFetchError::Transport {
                filename,
                reason: format!("could not start fetch worker: {err}"),
            });
        }
        rx.await
            .unwrap_or_else(|_| Err(AssetFetchError::Disconnected { filename }))
    }
    .boxed()
}

/// Reads at most `limit` bytes; anything longer is an error, never a
/// truncated asset.
fn read_capped(reader: impl Read, limit: u64, filename: &str) -> Result<Vec<u8>, AssetFetchError> {
    let mut bytes = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|source| AssetFetchError::Io {
            filename: filename.to_string(),
            source,
        })?;
    if bytes.len() as u64 > limit {
        return Err(AssetFetchError::TooLarge {
            filename: filename.to_string(),
            limit,
        });
    }
    Ok(bytes)
}

pub struct HttpSource {
    base_url: String,
    agent: ureq::Agent,
    max_bytes: u64,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
            max_bytes: MAX_ASSET_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.base_url, filename)
    }
}

impl AssetSource for HttpSource {
    fn location(&self) -> String {
        self.base_url.clone()
    }

    fn get(&self, filename: &str) -> BoxFuture<'static, Result<Vec<u8>, AssetFetchError>> {
        let url = self.url_for(filename);
        let agent = self.agent.clone();
        let limit = self.max_bytes;
        let name = filename.to_string();
        on_worker(filename.to_string(), move || {
            http_get(&agent, &url, &name, limit)
        })
    }
}

fn http_get(
    agent: &ureq::Agent,
    url: &str,
    filename: &str,
    limit: u64,
) -> Result<Vec<u8>, AssetFetchError> {
    debug!("GET {url}");
    let response = agent.get(url).call().map_err(|err| match err {
        ureq::Error::Status(status, _) => AssetFetchError::Status {
            filename: filename.to_string(),
            status,
        },
        ureq::Error::Transport(transport) => AssetFetchError::Transport {
            filename: filename.to_string(),
            reason: transport.to_string(),
        },
    })?;
    read_capped(response.into_reader(), limit, filename)
}

#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, filename: &str) -> io::Result<PathBuf> {
        let exact = self.root.join(filename);
        if exact.is_file() {
            return Ok(exact);
        }
        // Skins built on case-insensitive filesystems disagree on casing.
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry
                .file_name()
                .to_string_lossy()
                .eq_ignore_ascii_case(filename)
            {
                return Ok(entry.path());
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found in {}", filename, self.root.display()),
        ))
    }

    fn read(&self, filename: &str) -> Result<Vec<u8>, AssetFetchError> {
        let file = self
            .resolve(filename)
            .and_then(fs::File::open)
            .map_err(|source| AssetFetchError::Io {
                filename: filename.to_string(),
                source,
            })?;
        read_capped(file, MAX_ASSET_BYTES, filename)
    }
}

impl AssetSource for DirSource {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn get(&self, filename: &str) -> BoxFuture<'static, Result<Vec<u8>, AssetFetchError>> {
        let source = self.clone();
        let name = filename.to_string();
        on_worker(filename.to_string(), move || source.read(&name))
    }
}

/// In-memory skin, mostly for tests. Unknown names answer with status 404.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, filename: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(filename.into(), bytes.into());
    }

    pub fn with(mut self, filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(filename, bytes);
        self
    }

    pub fn remove(&mut self, filename: &str) -> Option<Vec<u8>> {
        self.files.remove(filename)
    }
}

impl AssetSource for MemorySource {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn get(&self, filename: &str) -> BoxFuture<'static, Result<Vec<u8>, AssetFetchError>> {
        let result = self
            .files
            .get(filename)
            .cloned()
            .ok_or_else(|| AssetFetchError::Status {
                filename: filename.to_string(),
                status: 404,
            });
        futures::future::ready(result).boxed()
    }
}

pub enum FetchedAsset {
    Image { image: RgbaImage, bytes: Vec<u8> },
    Text(String),
}

impl FetchedAsset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Image { .. } => AssetKind::Image,
            Self::Text(_) => AssetKind::Text,
        }
    }
}

/// Fetches manifest entries from a source and decodes them by kind.
#[derive(Clone)]
pub struct AssetFetcher {
    source: Arc<dyn AssetSource>,
}

impl AssetFetcher {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self { source }
    }

    pub fn location(&self) -> String {
        self.source.location()
    }

    pub fn fetch(
        &self,
        entry: ManifestEntry,
    ) -> BoxFuture<'static, Result<FetchedAsset, AssetFetchError>> {
        let request = self.source.get(entry.filename);
        async move {
            let bytes = request.await?;
            decode_asset(entry, bytes)
        }
        .boxed()
    }
}

pub fn decode_asset(entry: ManifestEntry, bytes: Vec<u8>) -> Result<FetchedAsset, AssetFetchError> {
    match entry.kind {
        AssetKind::Image => {
            let image = image::load_from_memory(&bytes)
                .map_err(|source| AssetFetchError::Decode {
                    filename: entry.filename.to_string(),
                    source,
                })?
                .to_rgba8();
            Ok(FetchedAsset::Image { image, bytes })
        }
        AssetKind::Text => Ok(FetchedAsset::Text(
            String::from_utf8_lossy(&bytes).into_owned(),
        )),
    }
}
