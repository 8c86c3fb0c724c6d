use std::{
    collections::hash_map::RandomState,
    fmt,
    hash::{BuildHasher, Hasher},
    sync::{
        mpsc::{self, Receiver, TryRecvError},
        Arc,
    },
    thread,
    time::Instant,
};

use log::{debug, info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::command::Command;

pub const DEFAULT_VOLUME: i32 = 70;
pub const VOLUME_STEP: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Track {
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub url: String,
}

impl Track {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            url: url.into(),
        }
    }

    pub fn display_title(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.artist)
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("playlist is empty")]
    EmptyPlaylist,
    #[error("audio source failed to start: {0}")]
    Source(String),
}

/// One streaming audio output. Positions and durations are in seconds.
pub trait AudioSource {
    fn load(&mut self, url: &str);
    fn has_source(&self) -> bool;
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn position(&self) -> f64;
    fn set_position(&mut self, seconds: f64);
    /// `None` while the duration is unknown.
    fn duration(&self) -> Option<f64>;
    /// Linear gain in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);
    /// Returns `true` once after the loaded track reached its end.
    fn take_ended(&mut self) -> bool {
        false
    }
    /// Called on every engine poll to collect background work.
    fn tick(&mut self) {}
}

type DurationLookup = Arc<dyn Fn(&str) -> Option<f64> + Send + Sync>;

/// Wall-clock driven source that tracks position without decoding audio.
///
/// With a duration lookup the duration of each loaded track is read on a
/// worker thread and picked up by [`AudioSource::tick`].
#[derive(Default)]
pub struct ClockSource {
    url: Option<String>,
    started: Option<Instant>,
    offset: f64,
    duration: Option<f64>,
    volume: f32,
    ended: bool,
    lookup: Option<DurationLookup>,
    pending_duration: Option<Receiver<Option<f64>>>,
}

impl fmt::Debug for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClockSource")
            .field("url", &self.url)
            .field("position", &self.position())
            .field("duration", &self.duration)
            .field("volume", &self.volume)
            .field("looks_up_duration", &self.lookup.is_some())
            .finish()
    }
}

impl ClockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source whose durations come from `lookup`, called with each track url.
    pub fn with_duration_lookup(
        lookup: impl Fn(&str) -> Option<f64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            lookup: Some(Arc::new(lookup)),
            ..Self::default()
        }
    }

    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration.filter(|d| d.is_finite() && *d >= 0.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    fn elapsed(&self) -> f64 {
        self.started
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AudioSource for ClockSource {
    fn load(&mut self, url: &str) {
        self.url = Some(url.to_string());
        self.started = None;
        self.offset = 0.0;
        self.ended = false;
        if let Some(lookup) = self.lookup.clone() {
            self.duration = None;
            self.pending_duration = spawn_duration_lookup(lookup, url.to_string());
        }
    }

    fn has_source(&self) -> bool {
        self.url.is_some()
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.url.is_none() {
            return Err(PlaybackError::Source("no track loaded".to_string()));
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.offset = self.position();
        self.started = None;
    }

    fn position(&self) -> f64 {
        let position = self.offset + self.elapsed();
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn set_position(&mut self, seconds: f64) {
        self.offset = seconds;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn take_ended(&mut self) -> bool {
        if let Some(duration) = self.duration {
            if self.started.is_some() && self.offset + self.elapsed() >= duration {
                self.pause();
                self.ended = true;
            }
        }
        std::mem::take(&mut self.ended)
    }

    fn tick(&mut self) {
        let Some(rx) = &self.pending_duration else {
            return;
        };
        match rx.try_recv() {
            Ok(duration) => {
                self.set_duration(duration);
                self.pending_duration = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => self.pending_duration = None,
        }
    }
}

fn spawn_duration_lookup(lookup: DurationLookup, url: String) -> Option<Receiver<Option<f64>>> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("duration-lookup".to_string())
        .spawn(move || {
            let duration = lookup(&url);
            debug!("Duration of {url}: {duration:?}");
            if tx.send(duration).is_err() {
                debug!("Track changed before its duration of {url} arrived");
            }
        });
    match spawned {
        Ok(_) => Some(rx),
        Err(err) => {
            warn!("Failed to start duration lookup: {err}");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Paused,
    Playing,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportState::Stopped => "Stopped",
            TransportState::Paused => "Paused",
            TransportState::Playing => "Playing",
        })
    }
}

/// What `next`/`previous` do with the transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipPolicy {
    /// Keep playing if playing, otherwise stay paused or stopped.
    #[default]
    #[serde(alias = "preserve")]
    PreserveState,
    AlwaysPlay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub current_track_index: usize,
    pub is_playing: bool,
    pub is_shuffle: bool,
    pub is_repeat: bool,
    pub is_muted: bool,
    pub volume: i32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_track_index: 0,
            is_playing: false,
            is_shuffle: false,
            is_repeat: false,
            is_muted: false,
            volume: DEFAULT_VOLUME,
        }
    }
}

type IndexPicker = Box<dyn FnMut(usize) -> usize + Send>;

pub struct PlaybackEngine<A: AudioSource = ClockSource> {
    audio: A,
    playlist: Vec<Track>,
    state: PlaybackState,
    transport: TransportState,
    skip_policy: SkipPolicy,
    pick_index: IndexPicker,
}

impl<A: AudioSource> PlaybackEngine<A> {
    pub fn new(audio: A, playlist: Vec<Track>) -> Self {
        let mut engine = Self {
            audio,
            playlist,
            state: PlaybackState::default(),
            transport: TransportState::Stopped,
            skip_policy: SkipPolicy::default(),
            pick_index: random_index_picker(),
        };
        engine.apply_volume();
        engine
    }

    pub fn with_skip_policy(mut self, policy: SkipPolicy) -> Self {
        self.skip_policy = policy;
        self
    }

    /// Replaces the shuffle randomness; the picker gets the playlist length.
    pub fn with_index_picker(mut self, picker: impl FnMut(usize) -> usize + Send + 'static) -> Self {
        self.pick_index = Box::new(picker);
        self
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn skip_policy(&self) -> SkipPolicy {
        self.skip_policy
    }

    pub fn playlist(&self) -> &[Track] {
        &self.playlist
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.get(self.state.current_track_index)
    }

    pub fn is_playing(&self) -> bool {
        self.transport == TransportState::Playing
    }

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        if self.playlist.is_empty() {
            warn!("Play requested with an empty playlist");
            return Err(PlaybackError::EmptyPlaylist);
        }
        if !self.audio.has_source() {
            self.load_current();
        }
        if let Err(err) = self.audio.play() {
            warn!("Playback did not start: {err}");
            return Err(err);
        }
        self.set_transport(TransportState::Playing);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.transport == TransportState::Playing {
            self.audio.pause();
            self.set_transport(TransportState::Paused);
        }
    }

    pub fn stop(&mut self) {
        self.audio.pause();
        self.audio.set_position(0.0);
        self.set_transport(TransportState::Stopped);
    }

    pub fn toggle_play(&mut self) -> Result<(), PlaybackError> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    pub fn next(&mut self) {
        let len = self.playlist.len();
        if len == 0 {
            return;
        }
        let index = (self.state.current_track_index + 1) % len;
        self.skip_to(index, self.skip_policy);
    }

    pub fn previous(&mut self) {
        let len = self.playlist.len();
        if len == 0 {
            return;
        }
        let index = (self.state.current_track_index + len - 1) % len;
        self.skip_to(index, self.skip_policy);
    }

    /// Jumps to a playlist entry. Out of range indices are ignored.
    pub fn select(&mut self, index: usize) {
        if index < self.playlist.len() {
            self.skip_to(index, self.skip_policy);
        }
    }

    pub fn on_track_ended(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        if self.state.is_repeat {
            self.audio.set_position(0.0);
            self.resume_after_skip();
        } else if self.state.is_shuffle {
            let len = self.playlist.len();
            let index = (self.pick_index)(len) % len;
            self.skip_to(index, SkipPolicy::AlwaysPlay);
        } else {
            let index = (self.state.current_track_index + 1) % self.playlist.len();
            self.skip_to(index, SkipPolicy::AlwaysPlay);
        }
    }

    /// Forwards an end-of-track reported by the audio source.
    pub fn poll(&mut self) {
        self.audio.tick();
        if self.audio.take_ended() {
            debug!("Track {} ended", self.state.current_track_index);
            self.on_track_ended();
        }
    }

    pub fn set_volume(&mut self, volume: i32) {
        self.state.volume = volume.clamp(0, 100);
        self.apply_volume();
    }

    pub fn adjust_volume(&mut self, delta: i32) {
        self.set_volume(self.state.volume.saturating_add(delta));
    }

    pub fn volume(&self) -> i32 {
        self.state.volume
    }

    pub fn toggle_mute(&mut self) {
        self.state.is_muted = !self.state.is_muted;
        self.apply_volume();
    }

    pub fn toggle_shuffle(&mut self) {
        self.state.is_shuffle = !self.state.is_shuffle;
    }

    pub fn toggle_repeat(&mut self) {
        self.state.is_repeat = !self.state.is_repeat;
    }

    /// Moves the playhead, clamped to the known duration.
    pub fn seek_to(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let upper = self.audio.duration().unwrap_or(f64::INFINITY);
        self.audio.set_position(seconds.clamp(0.0, upper));
    }

    pub fn position(&self) -> f64 {
        self.audio.position()
    }

    pub fn duration(&self) -> Option<f64> {
        self.audio.duration()
    }

    /// Fraction of the track played, for the position bar.
    pub fn progress_fraction(&self) -> f32 {
        match self.duration() {
            Some(duration) if duration > 0.0 => (self.position() / duration).clamp(0.0, 1.0) as f32,
            _ => 0.0,
        }
    }

    pub fn time_display(&self) -> String {
        let total = self.duration().unwrap_or(f64::NAN);
        format!("{} / {}", format_time(self.position()), format_time(total))
    }

    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::Play => {
                if let Err(err) = self.play() {
                    debug!("Play command ignored: {err}");
                }
            }
            Command::Pause => self.pause(),
            Command::Stop => self.stop(),
            Command::Next => self.next(),
            Command::Previous => self.previous(),
            Command::TogglePlay => {
                if let Err(err) = self.toggle_play() {
                    debug!("Toggle play command ignored: {err}");
                }
            }
            Command::Eject => info!("Eject requested; no file selector is attached"),
            Command::VolumeDelta(delta) => self.adjust_volume(delta),
            Command::Seek(seconds) => self.seek_to(seconds),
            Command::ToggleShuffle => self.toggle_shuffle(),
            Command::ToggleRepeat => self.toggle_repeat(),
            Command::ToggleMute => self.toggle_mute(),
        }
    }

    fn skip_to(&mut self, index: usize, policy: SkipPolicy) {
        let was_playing = self.is_playing();
        self.state.current_track_index = index;
        self.load_current();
        match policy {
            SkipPolicy::AlwaysPlay => self.resume_after_skip(),
            SkipPolicy::PreserveState if was_playing => self.resume_after_skip(),
            SkipPolicy::PreserveState => {}
        }
    }

    fn resume_after_skip(&mut self) {
        match self.audio.play() {
            Ok(()) => self.set_transport(TransportState::Playing),
            Err(err) => {
                warn!("Playback did not start: {err}");
                self.set_transport(TransportState::Stopped);
            }
        }
    }

    fn load_current(&mut self) {
        if let Some(track) = self.playlist.get(self.state.current_track_index) {
            debug!("Loading track {}", track.display_title());
            self.audio.load(&track.url);
        }
    }

    fn set_transport(&mut self, transport: TransportState) {
        self.transport = transport;
        self.state.is_playing = transport == TransportState::Playing;
    }

    fn apply_volume(&mut self) {
        let gain = if self.state.is_muted {
            0.0
        } else {
            self.state.volume as f32 / 100.0
        };
        self.audio.set_volume(gain);
    }
}

fn random_index_picker() -> IndexPicker {
    let mut seed = RandomState::new().build_hasher().finish() | 1;
    Box::new(move |len| {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        (seed % len.max(1) as u64) as usize
    })
}

/// `m:ss` with unpadded minutes. Unknown times render as `-:--`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "-:--".to_string();
    }
    let total_seconds = seconds.max(0.0).floor() as u64;
    let minutes = total_seconds / 60;
    let secs = total_seconds % 60;
    format!("{minutes}:{secs:02}")
}
