use std::{
    collections::HashMap,
    fs,
    io::{BufRead, BufReader, Cursor, Write},
    net::{TcpListener, TcpStream},
    path::PathBuf,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use futures::executor::block_on;
use image::{ImageFormat, Rgb, RgbImage};
use retro_player::{
    manifest::{asset_key, BITMAP_FILES},
    AssetFetchError,
    skin_loader::LoaderState,
    sprites::cbuttons,
    MemorySource, SkinConfig, SkinLoader,
};

fn bmp(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0x80]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Bmp)
        .unwrap();
    bytes
}

fn full_skin() -> MemorySource {
    let mut source = MemorySource::new();
    for file in BITMAP_FILES {
        source.insert(file, bmp(160, 40));
    }
    source.insert("PLEdit.txt", "[Text]\nNormal=#00FF00\nCurrent=#FFFFFF\n");
    source
}

fn loader(source: MemorySource) -> SkinLoader {
    SkinLoader::with_source(SkinConfig::new("memory://skin", "Test Skin"), Arc::new(source))
        .unwrap()
}

#[test]
fn missing_volume_bitmap_leaves_the_rest() {
    let mut source = full_skin();
    source.remove("Volume.bmp");
    let mut loader = loader(source);

    let assets = block_on(loader.load_skin());

    assert_eq!(loader.state(), LoaderState::Loaded);
    assert!(assets.image("volume").is_none());
    let loaded: Vec<_> = BITMAP_FILES
        .iter()
        .filter(|file| **file != "Volume.bmp")
        .map(|file| asset_key(file))
        .collect();
    assert_eq!(loaded.len(), 18);
    for key in &loaded {
        let value = assets.get(key).unwrap_or_else(|| panic!("{key} missing"));
        assert!(!value.is_empty(), "{key} is empty");
    }

    let volume_failure = loader
        .failures()
        .iter()
        .find(|failure| failure.filename() == "Volume.bmp")
        .expect("Volume.bmp failure recorded");
    assert!(volume_failure.is_not_found());
}

#[test]
fn each_missing_file_only_affects_itself() {
    for missing in BITMAP_FILES {
        let mut source = full_skin();
        source.remove(missing);
        let mut loader = loader(source);
        let assets = block_on(loader.load_skin());

        for file in BITMAP_FILES {
            let present = assets.image(&asset_key(file)).is_some();
            assert_eq!(present, file != missing, "{file} with {missing} removed");
        }
    }
}

#[test]
fn optional_text_files_are_loaded_when_present() {
    let mut loader = loader(full_skin());
    let assets = block_on(loader.load_skin());
    assert!(assets.text("pleditTxt").is_some());
    assert!(assets.text("viscolorTxt").is_none());

    let pledit = loader.pledit_colors().unwrap();
    assert!(pledit.warnings.is_empty());
    assert_eq!(pledit.colors.current.0, [0xFF, 0xFF, 0xFF, 0xFF]);
}

#[test]
fn sprites_come_from_loaded_bitmaps() {
    let mut loader = loader(full_skin());
    block_on(loader.load_skin());

    let play = loader.sprite(cbuttons::FILE, cbuttons::PLAY).unwrap();
    assert_eq!(play.dimensions(), (23, 18));
    assert_eq!(play.get_pixel(0, 0).0, [23, 0, 0x80, 0xFF]);

    let url = loader
        .get_sprite_data_url("cbuttons", cbuttons::PLAY)
        .unwrap();
    assert!(url.starts_with("data:image/png;base64,"));

    let tiled = loader
        .tiled_background("Main.bmp", cbuttons::PLAY, 100, 50)
        .unwrap();
    assert_eq!(tiled.dimensions(), (100, 50));
}

#[test]
fn dispose_releases_every_handle() {
    let mut loader = loader(full_skin());
    let assets = block_on(loader.load_skin());
    let url = assets.image("main").unwrap().clone();
    assert!(loader.resolve(&url).is_some());

    loader.dispose();
    loader.dispose();

    assert!(loader.assets().is_empty());
    assert!(loader.resolve(&url).is_none());
    assert!(loader.image("Main.bmp").is_none());
    assert_eq!(loader.state(), LoaderState::Uninitialized);
}

#[test]
fn batch_started_before_dispose_is_dropped() {
    let mut loader = loader(full_skin());
    let pending = loader.begin_load();
    loader.dispose();

    let batch = block_on(pending.run());
    assert_eq!(batch.len(), 22);
    assert!(loader.commit(batch).is_none());
    assert!(loader.assets().is_empty());
}

#[test]
fn local_directory_skin_loads_through_the_filesystem() {
    let dir: PathBuf = std::env::temp_dir().join(format!("retro-player-skin-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    for file in BITMAP_FILES {
        fs::write(dir.join(file.to_ascii_lowercase()), bmp(30, 20)).unwrap();
    }

    let config = SkinConfig::new(dir.to_string_lossy(), "Local");
    let mut loader = SkinLoader::new(config).unwrap();
    assert!(loader.is_local());
    let assets = block_on(loader.load_skin());
    assert_eq!(assets.len(), BITMAP_FILES.len());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_local_directory_is_rejected() {
    let config = SkinConfig::new("/no/such/skin/dir", "Nowhere");
    assert!(SkinLoader::new(config).is_err());
}

/// Serves `files` over HTTP, answering every request after `delay`.
fn serve_skin(files: HashMap<String, Vec<u8>>, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let files = Arc::new(files);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let files = Arc::clone(&files);
            thread::spawn(move || {
                thread::sleep(delay);
                respond(stream, &files);
            });
        }
    });
    format!("http://{addr}/winamp-skin")
}

fn respond(mut stream: TcpStream, files: &HashMap<String, Vec<u8>>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
            break;
        }
    }
    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    let name = path.rsplit('/').next().unwrap_or_default();
    let (status, body) = match files.get(name) {
        Some(body) => ("200 OK", body.clone()),
        None => ("404 Not Found", Vec::new()),
    };
    write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .unwrap();
    stream.write_all(&body).unwrap();
}

#[test]
fn remote_skin_missing_volume_loads_the_rest() {
    let files: HashMap<String, Vec<u8>> = BITMAP_FILES
        .iter()
        .filter(|file| **file != "Volume.bmp")
        .map(|file| (file.to_string(), bmp(40, 20)))
        .collect();
    let base = serve_skin(files, Duration::from_millis(300));
    let mut loader = SkinLoader::new(SkinConfig::new(base, "Remote")).unwrap();
    assert!(!loader.is_local());

    let started = Instant::now();
    let assets = block_on(loader.load_skin());
    let elapsed = started.elapsed();

    assert!(assets.image("volume").is_none());
    for file in BITMAP_FILES.iter().filter(|file| **file != "Volume.bmp") {
        assert!(assets.image(&asset_key(file)).is_some(), "{file} missing");
    }
    let volume = loader
        .failures()
        .iter()
        .find(|failure| failure.filename() == "Volume.bmp")
        .unwrap();
    assert!(matches!(volume, AssetFetchError::Status { status: 404, .. }));

    // 22 requests at 300ms each would take over six seconds one by one.
    assert!(elapsed < Duration::from_secs(3), "load took {elapsed:?}");
}
