use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManifestEntry {
    pub filename: &'static str,
    pub kind: AssetKind,
    /// Missing optional entries are expected and only logged at debug level.
    pub required: bool,
}

impl ManifestEntry {
    const fn bitmap(filename: &'static str) -> Self {
        Self {
            filename,
            kind: AssetKind::Image,
            required: true,
        }
    }

    const fn text(filename: &'static str) -> Self {
        Self {
            filename,
            kind: AssetKind::Text,
            required: false,
        }
    }

    pub fn key(&self) -> String {
        asset_key(self.filename)
    }
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename)
    }
}

pub const BITMAP_FILES: [&str; 19] = [
    "Main.bmp",
    "Titlebar.bmp",
    "CButtons.bmp",
    "ShufRep.bmp",
    "Volume.bmp",
    "Balance.bmp",
    "MonoSter.bmp",
    "PosBar.bmp",
    "PlayPaus.bmp",
    "Numbers.bmp",
    "Text.bmp",
    "EqMain.bmp",
    "PLEdit.bmp",
    "Eq_Ex.bmp",
    "Gen.bmp",
    "Genex.bmp",
    "Mb.bmp",
    "Avs.bmp",
    "Video.bmp",
];

pub const TEXT_FILES: [&str; 3] = ["PLEdit.txt", "VisColor.txt", "Region.txt"];

pub const MANIFEST: [ManifestEntry; 22] = [
    ManifestEntry::bitmap(BITMAP_FILES[0]),
    ManifestEntry::bitmap(BITMAP_FILES[1]),
    ManifestEntry::bitmap(BITMAP_FILES[2]),
    ManifestEntry::bitmap(BITMAP_FILES[3]),
    ManifestEntry::bitmap(BITMAP_FILES[4]),
    ManifestEntry::bitmap(BITMAP_FILES[5]),
    ManifestEntry::bitmap(BITMAP_FILES[6]),
    ManifestEntry::bitmap(BITMAP_FILES[7]),
    ManifestEntry::bitmap(BITMAP_FILES[8]),
    ManifestEntry::bitmap(BITMAP_FILES[9]),
    ManifestEntry::bitmap(BITMAP_FILES[10]),
    ManifestEntry::bitmap(BITMAP_FILES[11]),
    ManifestEntry::bitmap(BITMAP_FILES[12]),
    ManifestEntry::bitmap(BITMAP_FILES[13]),
    ManifestEntry::bitmap(BITMAP_FILES[14]),
    ManifestEntry::bitmap(BITMAP_FILES[15]),
    ManifestEntry::bitmap(BITMAP_FILES[16]),
    ManifestEntry::bitmap(BITMAP_FILES[17]),
    ManifestEntry::bitmap(BITMAP_FILES[18]),
    ManifestEntry::text(TEXT_FILES[0]),
    ManifestEntry::text(TEXT_FILES[1]),
    ManifestEntry::text(TEXT_FILES[2]),
];

pub fn skin_manifest() -> Vec<ManifestEntry> {
    MANIFEST.to_vec()
}

/// Canonical key for a manifest filename.
///
/// Bitmaps map to their lowercase stem (`CButtons.bmp` -> `cbuttons`), text
/// files to the lowercase stem plus `Txt` (`PLEdit.txt` -> `pleditTxt`).
/// Names without a known extension are lowercased as-is, so a key passed in
/// place of a filename maps to itself.
pub fn asset_key(filename: &str) -> String {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (filename, None),
    };
    match ext {
        Some(ext) if ext.eq_ignore_ascii_case("txt") => {
            format!("{}Txt", stem.to_ascii_lowercase())
        }
        Some(ext) if ext.eq_ignore_ascii_case("bmp") => stem.to_ascii_lowercase(),
        _ if filename.ends_with("Txt") => filename.to_string(),
        _ => filename.to_ascii_lowercase(),
    }
}
