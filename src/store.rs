use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use log::{debug, warn};

/// Transient handle for a loaded bitmap, live until revoked by its store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetValue {
    Image(ObjectUrl),
    Text(String),
}

impl AssetValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Image(url) => url.as_str().is_empty(),
            Self::Text(text) => text.is_empty(),
        }
    }
}

/// Read-only view of a skin's loaded assets.
///
/// Entries whose fetch failed are absent, so this is partial even after a
/// completed load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkinAssets {
    entries: BTreeMap<String, AssetValue>,
}

impl SkinAssets {
    pub fn get(&self, key: &str) -> Option<&AssetValue> {
        self.entries.get(key)
    }

    pub fn image(&self, key: &str) -> Option<&ObjectUrl> {
        match self.entries.get(key) {
            Some(AssetValue::Image(url)) => Some(url),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(AssetValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct SkinAssetStore {
    scope: String,
    next_handle: u64,
    entries: BTreeMap<String, AssetValue>,
    blobs: HashMap<ObjectUrl, Arc<[u8]>>,
}

impl SkinAssetStore {
    pub fn new(scope: impl Into<String>) -> Self {
        let scope: String = scope
            .into()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        Self {
            scope,
            next_handle: 0,
            entries: BTreeMap::new(),
            blobs: HashMap::new(),
        }
    }

    /// Stores the raw bitmap bytes under `key` and mints a handle for them.
    /// A previous image under the same key is revoked first.
    pub fn insert_image(&mut self, key: impl Into<String>, bytes: Vec<u8>) -> ObjectUrl {
        let key = key.into();
        self.next_handle += 1;
        let url = ObjectUrl(format!("blob:{}/{}", self.scope, self.next_handle));
        self.blobs.insert(url.clone(), Arc::from(bytes));
        if let Some(AssetValue::Image(old)) =
            self.entries.insert(key, AssetValue::Image(url.clone()))
        {
            self.revoke(&old);
        }
        url
    }

    pub fn insert_text(&mut self, key: impl Into<String>, text: String) {
        if let Some(AssetValue::Image(old)) = self.entries.insert(key.into(), AssetValue::Text(text))
        {
            self.revoke(&old);
        }
    }

    pub fn resolve(&self, url: &ObjectUrl) -> Option<Arc<[u8]>> {
        self.blobs.get(url).cloned()
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.entries.get(key)? {
            AssetValue::Text(text) => Some(text),
            AssetValue::Image(_) => None,
        }
    }

    /// Releases one handle. Returns whether it was still live.
    pub fn revoke(&mut self, url: &ObjectUrl) -> bool {
        self.blobs.remove(url).is_some()
    }

    pub fn live_handles(&self) -> usize {
        self.blobs.len()
    }

    pub fn snapshot(&self) -> SkinAssets {
        SkinAssets {
            entries: self.entries.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dispose(&mut self) {
        if self.entries.is_empty() && self.blobs.is_empty() {
            return;
        }
        let released = self.blobs.len();
        self.blobs.clear();
        self.entries.clear();
        debug!("Released {released} object URLs for {}", self.scope);
    }
}

impl Drop for SkinAssetStore {
    fn drop(&mut self) {
        if !self.blobs.is_empty() {
            warn!(
                "Skin store {} dropped with {} live handles; releasing",
                self.scope,
                self.blobs.len()
            );
        }
        self.dispose();
    }
}
