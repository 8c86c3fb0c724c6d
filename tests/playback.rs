use std::{
    fs, thread,
    time::{Duration, Instant},
};

use retro_player::{
    config::default_playlist,
    playback::{SkipPolicy, TransportState},
    stream, ClockSource, Command, PlaybackEngine, PlaybackError, Track,
};

fn engine() -> PlaybackEngine<ClockSource> {
    PlaybackEngine::new(ClockSource::new(), default_playlist())
}

#[test]
fn transport_cycle_with_clock_source() {
    let mut engine = engine();
    assert_eq!(engine.transport(), TransportState::Stopped);

    engine.play().unwrap();
    assert!(engine.audio().is_running());
    assert_eq!(engine.transport(), TransportState::Playing);

    engine.pause();
    assert!(!engine.audio().is_running());
    assert_eq!(engine.transport(), TransportState::Paused);

    engine.stop();
    assert_eq!(engine.transport(), TransportState::Stopped);
    assert_eq!(engine.position(), 0.0);
}

#[test]
fn text_commands_drive_the_engine() {
    let mut engine = engine();
    for line in ["toggle", "next", "next", "prev", "volume:+5", "mute", "repeat"] {
        engine.dispatch(line.parse::<Command>().unwrap());
    }
    assert!(engine.is_playing());
    assert_eq!(engine.state().current_track_index, 1);
    assert_eq!(engine.volume(), 75);
    assert!(engine.state().is_muted);
    assert_eq!(engine.audio().volume(), 0.0);
    assert!(engine.state().is_repeat);
}

#[test]
fn finished_track_advances_to_the_next_one() {
    let mut clock = ClockSource::new();
    clock.set_duration(Some(0.0));
    let mut engine = PlaybackEngine::new(clock, default_playlist());

    engine.play().unwrap();
    engine.poll();

    assert_eq!(engine.state().current_track_index, 1);
    assert_eq!(engine.transport(), TransportState::Playing);
}

#[test]
fn wrap_around_from_first_track() {
    let mut engine = engine().with_skip_policy(SkipPolicy::AlwaysPlay);
    let last = engine.playlist().len() - 1;
    engine.previous();
    assert_eq!(engine.state().current_track_index, last);
    assert!(engine.is_playing());
    engine.next();
    assert_eq!(engine.state().current_track_index, 0);
}

#[test]
fn empty_playlist_reports_an_error() {
    let mut engine = PlaybackEngine::new(ClockSource::new(), Vec::new());
    assert_eq!(engine.play(), Err(PlaybackError::EmptyPlaylist));
    assert!(engine.current_track().is_none());
    assert_eq!(engine.time_display(), "0:00 / -:--");
}

fn write_wav(path: &std::path::Path, byte_rate: u32, data_len: u32) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&[1, 0, 1, 0]);
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&[1, 0, 8, 0]);
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(bytes.len() + data_len as usize, 0x80);
    fs::write(path, bytes).unwrap();
}

fn poll_until(engine: &mut PlaybackEngine<ClockSource>, done: impl Fn(&PlaybackEngine<ClockSource>) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !done(&*engine) && Instant::now() < deadline {
        engine.poll();
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn header_durations_drive_display_and_track_end() {
    let dir = std::env::temp_dir().join(format!("retro_player_tracks_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let short = dir.join("short.wav");
    let long = dir.join("long.wav");
    write_wav(&short, 8_000, 400);
    write_wav(&long, 8_000, 720_000);
    let playlist = vec![
        Track::new("Short", "", short.to_string_lossy()),
        Track::new("Long", "", format!("file://{}", long.display())),
    ];
    let mut engine = PlaybackEngine::new(ClockSource::with_duration_lookup(stream::header_duration), playlist);

    engine.play().unwrap();
    poll_until(&mut engine, |engine| engine.state().current_track_index == 1);
    assert_eq!(engine.state().current_track_index, 1);
    assert_eq!(engine.transport(), TransportState::Playing);

    poll_until(&mut engine, |engine| engine.duration().is_some());
    assert_eq!(engine.duration(), Some(90.0));
    assert!(engine.time_display().ends_with("/ 1:30"), "{}", engine.time_display());
    engine.seek_to(500.0);
    assert!(engine.position() <= 90.0);

    fs::remove_dir_all(&dir).unwrap();
}
