//! Known sprite regions of the classic skin bitmaps.
//!
//! Each submodule names the bitmap it indexes into (`FILE`) and the regions
//! of the individual elements inside it.

use crate::sprite::SpriteRegion;

const fn region(x: i32, y: i32, width: u32, height: u32) -> SpriteRegion {
    SpriteRegion::new(x, y, width, height)
}

/// Main.bmp, 275x116.
pub mod main_window {
    use super::*;

    pub const FILE: &str = "Main.bmp";
    pub const NORMAL: SpriteRegion = region(0, 0, 275, 116);
    pub const WINDOWSHADE: SpriteRegion = region(0, 116, 275, 14);
}

/// Titlebar.bmp, 275x29.
pub mod titlebar {
    use super::*;

    pub const FILE: &str = "Titlebar.bmp";
    pub const ACTIVE: SpriteRegion = region(27, 0, 275, 14);
    pub const INACTIVE: SpriteRegion = region(27, 15, 275, 14);
}

/// CButtons.bmp, 23x18 per transport button.
pub mod cbuttons {
    use super::*;

    pub const FILE: &str = "CButtons.bmp";
    pub const PREV: SpriteRegion = region(0, 0, 23, 18);
    pub const PREV_PRESSED: SpriteRegion = region(0, 18, 23, 18);
    pub const PLAY: SpriteRegion = region(23, 0, 23, 18);
    pub const PLAY_PRESSED: SpriteRegion = region(23, 18, 23, 18);
    pub const PAUSE: SpriteRegion = region(46, 0, 23, 18);
    pub const PAUSE_PRESSED: SpriteRegion = region(46, 18, 23, 18);
    pub const STOP: SpriteRegion = region(69, 0, 23, 18);
    pub const STOP_PRESSED: SpriteRegion = region(69, 18, 23, 18);
    pub const NEXT: SpriteRegion = region(92, 0, 23, 18);
    pub const NEXT_PRESSED: SpriteRegion = region(92, 18, 23, 18);
    pub const EJECT: SpriteRegion = region(114, 0, 22, 16);
    pub const EJECT_PRESSED: SpriteRegion = region(114, 16, 22, 16);
}

/// Numbers.bmp: a single row of 9x13 glyphs, digits 0-9 then blank and minus.
pub mod numbers {
    use super::*;

    pub const FILE: &str = "Numbers.bmp";
    pub const WIDTH: u32 = 9;
    pub const HEIGHT: u32 = 13;
    pub const BLANK: SpriteRegion = region(90, 0, WIDTH, HEIGHT);
    pub const MINUS: SpriteRegion = region(99, 0, WIDTH, HEIGHT);

    pub fn digit(value: u8) -> Option<SpriteRegion> {
        (value <= 9).then(|| region(value as i32 * WIDTH as i32, 0, WIDTH, HEIGHT))
    }
}

/// ShufRep.bmp.
pub mod shufrep {
    use super::*;

    pub const FILE: &str = "ShufRep.bmp";
    pub const SHUFFLE_OFF: SpriteRegion = region(28, 0, 47, 15);
    pub const SHUFFLE_ON: SpriteRegion = region(28, 15, 47, 15);
    pub const REPEAT_OFF: SpriteRegion = region(0, 0, 28, 15);
    pub const REPEAT_ON: SpriteRegion = region(0, 15, 28, 15);
}

/// Volume.bmp, 68px wide slider strip.
pub mod volume {
    use super::*;

    pub const FILE: &str = "Volume.bmp";
    pub const SLIDER_BG: SpriteRegion = region(0, 0, 68, 13);
    pub const SLIDER_THUMB: SpriteRegion = region(15, 422, 14, 11);
}

/// Balance.bmp, 38px wide slider strip.
pub mod balance {
    use super::*;

    pub const FILE: &str = "Balance.bmp";
    pub const SLIDER_BG: SpriteRegion = region(9, 0, 38, 13);
    pub const SLIDER_THUMB: SpriteRegion = region(15, 422, 14, 11);
}

/// PosBar.bmp, 248x10 track with the thumb to its right.
pub mod posbar {
    use super::*;

    pub const FILE: &str = "PosBar.bmp";
    pub const BG: SpriteRegion = region(0, 0, 248, 10);
    pub const THUMB: SpriteRegion = region(248, 0, 29, 10);
}

pub mod monoster {
    use super::*;

    pub const FILE: &str = "MonoSter.bmp";
    pub const STEREO: SpriteRegion = region(0, 12, 29, 12);
    pub const MONO: SpriteRegion = region(29, 0, 29, 12);
}

/// PlayPaus.bmp, 9x9 status indicators.
pub mod playpaus {
    use super::*;

    pub const FILE: &str = "PlayPaus.bmp";
    pub const PLAYING: SpriteRegion = region(36, 0, 9, 9);
    pub const PAUSED: SpriteRegion = region(27, 0, 9, 9);
    pub const STOPPED: SpriteRegion = region(18, 0, 9, 9);
}

/// EQ and PL window toggles.
pub mod eq_pl_buttons {
    use super::*;

    pub const FILE: &str = "ShufRep.bmp";
    pub const EQ_NORMAL: SpriteRegion = region(0, 0, 23, 12);
    pub const EQ_PRESSED: SpriteRegion = region(0, 12, 23, 12);
    pub const PL_NORMAL: SpriteRegion = region(23, 0, 23, 12);
    pub const PL_PRESSED: SpriteRegion = region(23, 12, 23, 12);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BITMAP_FILES;

    #[test]
    fn digits_step_by_glyph_width() {
        assert_eq!(numbers::digit(0), Some(region(0, 0, 9, 13)));
        assert_eq!(numbers::digit(7), Some(region(63, 0, 9, 13)));
        assert_eq!(numbers::digit(10), None);
    }

    #[test]
    fn sprite_files_belong_to_the_manifest() {
        for file in [
            main_window::FILE,
            titlebar::FILE,
            cbuttons::FILE,
            numbers::FILE,
            shufrep::FILE,
            volume::FILE,
            balance::FILE,
            posbar::FILE,
            monoster::FILE,
            playpaus::FILE,
            eq_pl_buttons::FILE,
        ] {
            assert!(BITMAP_FILES.contains(&file), "{file} missing from manifest");
        }
    }

    #[test]
    fn transport_buttons_share_a_row() {
        let row = [
            cbuttons::PREV,
            cbuttons::PLAY,
            cbuttons::PAUSE,
            cbuttons::STOP,
            cbuttons::NEXT,
        ];
        for pair in row.windows(2) {
            assert_eq!(pair[0].y, pair[1].y);
            assert_eq!(pair[0].x + pair[0].width as i32, pair[1].x);
        }
    }
}
