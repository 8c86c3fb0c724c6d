//! Cosmetic 10-band equalizer. Levels are not applied to the audio output.

pub const BAND_COUNT: usize = 10;
pub const BAND_STEP: u8 = 10;
pub const BAND_MAX: u8 = 100;
pub const DEFAULT_LEVEL: u8 = 0;

pub const BAND_LABELS: [&str; BAND_COUNT] = [
    "60", "170", "310", "600", "1K", "3K", "6K", "12K", "14K", "16K",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equalizer {
    levels: [u8; BAND_COUNT],
}

impl Default for Equalizer {
    fn default() -> Self {
        Self {
            levels: [DEFAULT_LEVEL; BAND_COUNT],
        }
    }
}

impl Equalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> &[u8; BAND_COUNT] {
        &self.levels
    }

    pub fn level(&self, band: usize) -> Option<u8> {
        self.levels.get(band).copied()
    }

    /// Raises a band by one step, wrapping back to zero past the maximum.
    /// Unknown bands are ignored.
    pub fn step(&mut self, band: usize) {
        if let Some(level) = self.levels.get_mut(band) {
            *level = if *level >= BAND_MAX {
                0
            } else {
                (*level + BAND_STEP).min(BAND_MAX)
            };
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
