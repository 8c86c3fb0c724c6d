use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Context};
use clap::Parser;
use eframe::egui::{
    self, pos2, vec2, Color32, Key, Painter, Pos2, Rect, RichText, Sense, ViewportBuilder,
};
use log::{error, info, warn};
use retro_player::{
    config::{Config, SkinSettings},
    equalizer::{Equalizer, BAND_LABELS},
    playback::{format_time, ClockSource, PlaybackEngine, TransportState, VOLUME_STEP},
    skin_loader::{SkinConfig, SkinLoader},
    sprite::SpriteRegion,
    sprites::{
        cbuttons, eq_pl_buttons, main_window, monoster, numbers, playpaus, posbar, shufrep,
        titlebar, volume,
    },
    stream,
    ui_skin::SkinManager,
    Command,
};

const SCALE: f32 = 2.0;
const WINDOW_WIDTH: f32 = 275.0;
const WINDOW_HEIGHT: f32 = 116.0;

struct SkinButton {
    file: &'static str,
    normal: SpriteRegion,
    pressed: SpriteRegion,
    at: (f32, f32),
    command: Command,
}

const TRANSPORT_BUTTONS: [SkinButton; 6] = [
    SkinButton {
        file: cbuttons::FILE,
        normal: cbuttons::PREV,
        pressed: cbuttons::PREV_PRESSED,
        at: (16.0, 88.0),
        command: Command::Previous,
    },
    SkinButton {
        file: cbuttons::FILE,
        normal: cbuttons::PLAY,
        pressed: cbuttons::PLAY_PRESSED,
        at: (39.0, 88.0),
        command: Command::Play,
    },
    SkinButton {
        file: cbuttons::FILE,
        normal: cbuttons::PAUSE,
        pressed: cbuttons::PAUSE_PRESSED,
        at: (62.0, 88.0),
        command: Command::Pause,
    },
    SkinButton {
        file: cbuttons::FILE,
        normal: cbuttons::STOP,
        pressed: cbuttons::STOP_PRESSED,
        at: (85.0, 88.0),
        command: Command::Stop,
    },
    SkinButton {
        file: cbuttons::FILE,
        normal: cbuttons::NEXT,
        pressed: cbuttons::NEXT_PRESSED,
        at: (108.0, 88.0),
        command: Command::Next,
    },
    SkinButton {
        file: cbuttons::FILE,
        normal: cbuttons::EJECT,
        pressed: cbuttons::EJECT_PRESSED,
        at: (136.0, 89.0),
        command: Command::Eject,
    },
];

#[derive(Parser, Debug)]
#[command(name = "retro_player", version, about = "Skinned retro audio player")]
struct Cli {
    /// Config file to read instead of the default search path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn key_command(key: Key) -> Option<Command> {
    match key {
        Key::Space => Some(Command::TogglePlay),
        Key::ArrowLeft => Some(Command::Previous),
        Key::ArrowRight => Some(Command::Next),
        Key::ArrowUp => Some(Command::VolumeDelta(VOLUME_STEP)),
        Key::ArrowDown => Some(Command::VolumeDelta(-VOLUME_STEP)),
        _ => None,
    }
}

struct App {
    skin: Option<SkinManager>,
    skin_settings: SkinSettings,
    engine: PlaybackEngine<ClockSource>,
    equalizer: Equalizer,
    show_equalizer: bool,
    show_playlist: bool,
    skin_error: Option<String>,
}

impl App {
    fn new(ctx: &egui::Context, config: Config) -> Self {
        let audio = ClockSource::with_duration_lookup(stream::header_duration);
        let mut engine = PlaybackEngine::new(audio, config.playlist)
            .with_skip_policy(config.playback.skip_policy);
        engine.set_volume(config.playback.volume);
        if config.playback.shuffle {
            engine.toggle_shuffle();
        }
        if config.playback.repeat {
            engine.toggle_repeat();
        }

        let mut app = Self {
            skin: None,
            skin_settings: config.skin,
            engine,
            equalizer: Equalizer::new(),
            show_equalizer: false,
            show_playlist: false,
            skin_error: None,
        };
        app.init_skin(ctx);
        app
    }

    /// Connects the configured skin source and starts loading it. On failure
    /// the error stays on the status line next to a Retry button.
    fn init_skin(&mut self, ctx: &egui::Context) -> bool {
        match connect_skin(ctx, &self.skin_settings.source) {
            Ok(mut skin) => {
                self.skin_error = None;
                if self.skin_settings.hot_reload {
                    if let Err(err) = skin.enable_hot_reload() {
                        warn!("Hot reload unavailable: {err:#}");
                        self.skin_error = Some(err.to_string());
                    }
                }
                self.skin = Some(skin);
                true
            }
            Err(err) => {
                error!("Skin unavailable: {err:#}");
                self.skin_error = Some(format!("{err:#}"));
                false
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let keys = [Key::Space, Key::ArrowLeft, Key::ArrowRight, Key::ArrowUp, Key::ArrowDown];
        let pressed: Vec<Command> = ctx.input(|input| {
            keys.iter()
                .filter(|key| input.key_pressed(**key))
                .filter_map(|key| key_command(*key))
                .collect()
        });
        for command in pressed {
            self.engine.dispatch(command);
        }
    }

    fn draw_sprite(
        &mut self,
        ctx: &egui::Context,
        painter: &Painter,
        origin: Pos2,
        file: &str,
        region: SpriteRegion,
        at: (f32, f32),
    ) -> Rect {
        let rect = skin_rect(origin, at, region.width as f32, region.height as f32);
        let texture = self
            .skin
            .as_mut()
            .and_then(|skin| skin.sprite_texture(ctx, file, region));
        if let Some(texture) = texture {
            painter.image(
                texture.id(),
                rect,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        rect
    }

    #[allow(clippy::too_many_arguments)]
    fn sprite_button(
        &mut self,
        ui: &mut egui::Ui,
        painter: &Painter,
        origin: Pos2,
        id: &str,
        file: &str,
        (normal, pressed): (SpriteRegion, SpriteRegion),
        at: (f32, f32),
    ) -> bool {
        let rect = skin_rect(origin, at, normal.width as f32, normal.height as f32);
        let response = ui.interact(rect, ui.id().with(id), Sense::click());
        let region = if response.is_pointer_button_down_on() { pressed } else { normal };
        self.draw_sprite(ui.ctx(), painter, origin, file, region, at);
        response.clicked()
    }

    fn main_window(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        let (area, _) = ui.allocate_exact_size(
            vec2(WINDOW_WIDTH * SCALE, WINDOW_HEIGHT * SCALE),
            Sense::hover(),
        );
        let painter = ui.painter_at(area);
        let origin = area.min;

        self.draw_sprite(&ctx, &painter, origin, main_window::FILE, main_window::NORMAL, (0.0, 0.0));
        self.draw_sprite(&ctx, &painter, origin, titlebar::FILE, titlebar::ACTIVE, (0.0, 0.0));

        let status = match self.engine.transport() {
            TransportState::Playing => playpaus::PLAYING,
            TransportState::Paused => playpaus::PAUSED,
            TransportState::Stopped => playpaus::STOPPED,
        };
        self.draw_sprite(&ctx, &painter, origin, playpaus::FILE, status, (26.0, 28.0));
        self.draw_time(&ctx, &painter, origin);
        self.draw_sprite(&ctx, &painter, origin, monoster::FILE, monoster::STEREO, (212.0, 41.0));

        let title = self
            .engine
            .current_track()
            .map(|track| track.display_title())
            .unwrap_or_default();
        painter.text(
            skin_rect(origin, (111.0, 27.0), 154.0, 6.0).left_center(),
            egui::Align2::LEFT_CENTER,
            title,
            egui::FontId::monospace(6.0 * SCALE),
            Color32::from_rgb(0x00, 0xE2, 0x00),
        );

        self.volume_slider(ui, &painter, origin);
        self.position_bar(ui, &painter, origin);

        for (index, button) in TRANSPORT_BUTTONS.iter().enumerate() {
            let id = format!("transport-{index}");
            if self.sprite_button(ui, &painter, origin, &id, button.file, (button.normal, button.pressed), button.at) {
                self.engine.dispatch(button.command);
            }
        }

        let shuffle = if self.engine.state().is_shuffle {
            (shufrep::SHUFFLE_ON, shufrep::SHUFFLE_OFF)
        } else {
            (shufrep::SHUFFLE_OFF, shufrep::SHUFFLE_ON)
        };
        if self.sprite_button(ui, &painter, origin, "shuffle", shufrep::FILE, shuffle, (164.0, 89.0)) {
            self.engine.dispatch(Command::ToggleShuffle);
        }
        let repeat = if self.engine.state().is_repeat {
            (shufrep::REPEAT_ON, shufrep::REPEAT_OFF)
        } else {
            (shufrep::REPEAT_OFF, shufrep::REPEAT_ON)
        };
        if self.sprite_button(ui, &painter, origin, "repeat", shufrep::FILE, repeat, (210.0, 89.0)) {
            self.engine.dispatch(Command::ToggleRepeat);
        }

        let eq = (eq_pl_buttons::EQ_NORMAL, eq_pl_buttons::EQ_PRESSED);
        if self.sprite_button(ui, &painter, origin, "eq", eq_pl_buttons::FILE, eq, (219.0, 58.0)) {
            self.show_equalizer = !self.show_equalizer;
        }
        let pl = (eq_pl_buttons::PL_NORMAL, eq_pl_buttons::PL_PRESSED);
        if self.sprite_button(ui, &painter, origin, "pl", eq_pl_buttons::FILE, pl, (242.0, 58.0)) {
            self.show_playlist = !self.show_playlist;
        }
    }

    fn draw_time(&mut self, ctx: &egui::Context, painter: &Painter, origin: Pos2) {
        let text = format_time(self.engine.position());
        let mut x = 48.0;
        for ch in text.chars() {
            let glyph = match ch {
                '0'..='9' => numbers::digit(ch as u8 - b'0'),
                '-' => Some(numbers::MINUS),
                ':' => {
                    x += 6.0;
                    continue;
                }
                _ => Some(numbers::BLANK),
            };
            if let Some(region) = glyph {
                self.draw_sprite(ctx, painter, origin, numbers::FILE, region, (x, 26.0));
            }
            x += 12.0;
        }
    }

    fn volume_slider(&mut self, ui: &mut egui::Ui, painter: &Painter, origin: Pos2) {
        let ctx = ui.ctx().clone();
        let track = self.draw_sprite(&ctx, painter, origin, volume::FILE, volume::SLIDER_BG, (107.0, 57.0));
        let response = ui.interact(track, ui.id().with("volume"), Sense::click_and_drag());
        if let Some(pointer) = response.interact_pointer_pos() {
            if response.is_pointer_button_down_on() {
                let fraction = ((pointer.x - track.left()) / track.width()).clamp(0.0, 1.0);
                self.engine.set_volume((fraction * 100.0).round() as i32);
            }
        }
        let thumb_span = volume::SLIDER_BG.width as f32 - volume::SLIDER_THUMB.width as f32;
        let thumb_x = 107.0 + thumb_span * self.engine.volume() as f32 / 100.0;
        self.draw_sprite(&ctx, painter, origin, volume::FILE, volume::SLIDER_THUMB, (thumb_x, 58.0));
    }

    fn position_bar(&mut self, ui: &mut egui::Ui, painter: &Painter, origin: Pos2) {
        let ctx = ui.ctx().clone();
        let bar = self.draw_sprite(&ctx, painter, origin, posbar::FILE, posbar::BG, (16.0, 72.0));
        let response = ui.interact(bar, ui.id().with("posbar"), Sense::click());
        if response.clicked() {
            if let (Some(pointer), Some(duration)) = (response.interact_pointer_pos(), self.engine.duration()) {
                let fraction = ((pointer.x - bar.left()) / bar.width()).clamp(0.0, 1.0);
                self.engine.dispatch(Command::Seek(fraction as f64 * duration));
            }
        }
        let span = posbar::BG.width as f32 - posbar::THUMB.width as f32;
        let thumb_x = 16.0 + span * self.engine.progress_fraction();
        self.draw_sprite(&ctx, painter, origin, posbar::FILE, posbar::THUMB, (thumb_x, 72.0));
    }

    fn equalizer_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let levels = *self.equalizer.levels();
            for (band, level) in levels.iter().enumerate() {
                if ui.button(format!("{}\n{level}", BAND_LABELS[band])).clicked() {
                    self.equalizer.step(band);
                }
            }
        });
    }

    fn playlist_panel(&mut self, ui: &mut egui::Ui) {
        let colors = self
            .skin
            .as_ref()
            .and_then(|skin| skin.loader().pledit_colors())
            .map(|loaded| loaded.colors.clone())
            .unwrap_or_default();
        let current = self.engine.state().current_track_index;
        let mut selected = None;
        egui::Frame::NONE
            .fill(to_color32(colors.normal_bg))
            .show(ui, |ui| {
                for (index, track) in self.engine.playlist().iter().enumerate() {
                    let color = if index == current { colors.current } else { colors.normal };
                    let label = RichText::new(format!("{}. {}", index + 1, track.display_title()))
                        .monospace()
                        .color(to_color32(color));
                    if ui.selectable_label(index == current, label).clicked() {
                        selected = Some(index);
                    }
                }
            });
        if let Some(index) = selected {
            self.engine.select(index);
        }
    }

    fn skin_status(&mut self, ui: &mut egui::Ui) {
        let Some(skin) = self.skin.as_mut() else {
            ui.colored_label(
                Color32::from_rgb(0xE0, 0x40, 0x40),
                format!("Skin {} unavailable", self.skin_settings.source.name),
            );
            if let Some(err) = &self.skin_error {
                ui.small(err);
            }
            if ui.button("Retry").clicked() {
                let ctx = ui.ctx().clone();
                self.init_skin(&ctx);
            }
            return;
        };
        if skin.is_loading() {
            ui.label(format!("Loading skin {}…", skin.skin_name()));
            return;
        }
        let missing = skin.missing_required();
        if !missing.is_empty() {
            ui.colored_label(
                Color32::from_rgb(0xE0, 0x40, 0x40),
                format!("Skin incomplete, missing {}", missing.join(", ")),
            );
            if ui.button("Retry").clicked() {
                if let Err(err) = skin.reload(ui.ctx()) {
                    error!("Skin reload failed: {err:#}");
                    self.skin_error = Some(err.to_string());
                }
            }
        }
        if let Some(err) = &self.skin_error {
            ui.small(err);
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(skin) = self.skin.as_mut() {
            if skin.poll_load() {
                info!("Skin {} ready", skin.skin_name());
            }
            if skin.hot_reload_enabled() {
                skin.poll_hot_reload(ctx);
            }
        }
        self.engine.poll();
        self.handle_keys(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            self.main_window(ui);
            self.skin_status(ui);
            ui.label(self.engine.time_display());
            if self.show_equalizer {
                self.equalizer_panel(ui);
            }
            if self.show_playlist {
                egui::ScrollArea::vertical().show(ui, |ui| self.playlist_panel(ui));
            }
        });

        if self.engine.is_playing() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.engine.stop();
        if let Some(skin) = self.skin.as_mut() {
            skin.dispose();
        }
    }
}

fn connect_skin(ctx: &egui::Context, source: &SkinConfig) -> anyhow::Result<SkinManager> {
    let loader = SkinLoader::new(source.clone())
        .with_context(|| format!("Invalid skin source '{}'", source.base_url))?;
    let mut skin = SkinManager::new(loader);
    skin.start_load(ctx)?;
    Ok(skin)
}

fn skin_rect(origin: Pos2, (x, y): (f32, f32), width: f32, height: f32) -> Rect {
    Rect::from_min_size(
        origin + vec2(x * SCALE, y * SCALE),
        vec2(width * SCALE, height * SCALE),
    )
}

fn to_color32(color: image::Rgba<u8>) -> Color32 {
    let [r, g, b, a] = color.0;
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title("Retro Player")
            .with_inner_size([WINDOW_WIDTH * SCALE + 16.0, WINDOW_HEIGHT * SCALE + 220.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Retro Player",
        native_options,
        Box::new(
            move |cc| -> Result<Box<dyn eframe::App>, Box<dyn std::error::Error + Send + Sync>> {
                Ok(Box::new(App::new(&cc.egui_ctx, config)))
            },
        ),
    )
    .map_err(|err| anyhow!("Failed to run the player window: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_keys_map_to_transport_and_volume() {
        assert_eq!(key_command(Key::Space), Some(Command::TogglePlay));
        assert_eq!(key_command(Key::ArrowLeft), Some(Command::Previous));
        assert_eq!(key_command(Key::ArrowRight), Some(Command::Next));
        assert_eq!(key_command(Key::ArrowUp), Some(Command::VolumeDelta(5)));
        assert_eq!(key_command(Key::ArrowDown), Some(Command::VolumeDelta(-5)));
        assert_eq!(key_command(Key::Enter), None);
    }

    #[test]
    fn skin_rect_scales_from_origin() {
        let rect = skin_rect(pos2(10.0, 20.0), (16.0, 88.0), 23.0, 18.0);
        assert_eq!(rect.min, pos2(10.0 + 32.0, 20.0 + 176.0));
        assert_eq!(rect.size(), vec2(46.0, 36.0));
    }

    #[test]
    fn transport_buttons_cover_cbuttons_row() {
        assert!(TRANSPORT_BUTTONS.iter().all(|b| b.file == cbuttons::FILE));
        assert_eq!(TRANSPORT_BUTTONS[1].command, Command::Play);
    }

    #[test]
    fn unusable_skin_source_can_be_retried() {
        let dir = std::env::temp_dir().join(format!("retro_player_retry_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut config = Config::default();
        config.skin.source = SkinConfig::new(dir.to_string_lossy(), "Retry");
        let ctx = egui::Context::default();

        let mut app = App::new(&ctx, config);
        assert!(app.skin.is_none());
        assert!(app.skin_error.as_deref().is_some_and(|err| err.contains("Invalid skin source")));

        std::fs::create_dir_all(&dir).unwrap();
        assert!(app.init_skin(&ctx));
        assert!(app.skin.is_some());
        assert!(app.skin_error.is_none());

        drop(app);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
