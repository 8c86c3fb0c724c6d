use std::io::Cursor;

use image::{imageops, ImageFormat, RgbaImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl SpriteRegion {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the whole region lies inside an image of the given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// Copies `region` out of `source` into a new image of exactly the region's
/// size. Pixels outside the source stay transparent.
pub fn extract(source: &RgbaImage, region: SpriteRegion) -> RgbaImage {
    let mut sprite = RgbaImage::new(region.width, region.height);
    if region.is_empty() {
        return sprite;
    }
    imageops::replace(
        &mut sprite,
        source,
        -(region.x as i64),
        -(region.y as i64),
    );
    sprite
}

/// Fills a `target_width x target_height` canvas with copies of the sprite
/// at `region`, aligned to the sprite grid from the top-left corner.
pub fn tile(
    source: &RgbaImage,
    region: SpriteRegion,
    target_width: u32,
    target_height: u32,
) -> RgbaImage {
    let sprite = extract(source, region);
    let mut canvas = RgbaImage::new(target_width, target_height);
    if region.is_empty() {
        return canvas;
    }

    for y in (0..target_height).step_by(region.height as usize) {
        for x in (0..target_width).step_by(region.width as usize) {
            imageops::replace(&mut canvas, &sprite, x as i64, y as i64);
        }
    }
    canvas
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut png_data = Vec::new();
    image.write_to(&mut Cursor::new(&mut png_data), ImageFormat::Png)?;
    Ok(png_data)
}

pub fn png_data_url(image: &RgbaImage) -> Result<String, image::ImageError> {
    let png_data = encode_png(image)?;
    let base64 = base64_simd::STANDARD;
    Ok(format!(
        "data:image/png;base64,{}",
        base64.encode_to_string(png_data)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checkerboard(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 10) as u8, (y * 10) as u8, ((x + y) % 2 * 255) as u8, 255])
        })
    }

    #[test]
    fn extract_copies_the_region_pixels() {
        let source = checkerboard(20, 10);
        let sprite = extract(&source, SpriteRegion::new(4, 2, 3, 5));
        assert_eq!(sprite.dimensions(), (3, 5));
        assert_eq!(sprite.get_pixel(0, 0), source.get_pixel(4, 2));
        assert_eq!(sprite.get_pixel(2, 4), source.get_pixel(6, 6));
    }

    #[test]
    fn extract_keeps_requested_size_for_undersized_sources() {
        let source = checkerboard(4, 4);
        let sprite = extract(&source, SpriteRegion::new(2, 2, 10, 6));
        assert_eq!(sprite.dimensions(), (10, 6));
        assert_eq!(sprite.get_pixel(0, 0), source.get_pixel(2, 2));
        assert_eq!(sprite.get_pixel(1, 1), source.get_pixel(3, 3));
        assert_eq!(sprite.get_pixel(5, 5), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn extract_handles_negative_and_disjoint_regions() {
        let source = checkerboard(4, 4);
        let shifted = extract(&source, SpriteRegion::new(-1, -1, 3, 3));
        assert_eq!(shifted.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(shifted.get_pixel(1, 1), source.get_pixel(0, 0));

        let outside = extract(&source, SpriteRegion::new(100, 100, 2, 2));
        assert_eq!(outside.dimensions(), (2, 2));
        assert!(outside.pixels().all(|p| p.0[3] == 0));

        assert_eq!(extract(&source, SpriteRegion::new(0, 0, 0, 3)).dimensions(), (0, 3));
    }

    #[test]
    fn tile_repeats_sprite_across_target() {
        let source = checkerboard(8, 8);
        let region = SpriteRegion::new(1, 1, 3, 2);
        let tiled = tile(&source, region, 10, 5);
        assert_eq!(tiled.dimensions(), (10, 5));
        for (x, y, pixel) in tiled.enumerate_pixels() {
            let expected = source.get_pixel(1 + x % 3, 1 + y % 2);
            assert_eq!(pixel, expected, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn tile_is_deterministic() {
        let source = checkerboard(16, 16);
        let region = SpriteRegion::new(2, 3, 5, 4);
        assert_eq!(tile(&source, region, 33, 17), tile(&source, region, 33, 17));
    }

    #[test]
    fn tile_with_empty_region_is_blank() {
        let source = checkerboard(4, 4);
        let tiled = tile(&source, SpriteRegion::new(0, 0, 0, 0), 6, 6);
        assert_eq!(tiled.dimensions(), (6, 6));
        assert!(tiled.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn data_url_round_trips_through_png() {
        let sprite = checkerboard(3, 2);
        let url = png_data_url(&sprite).unwrap();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = base64_simd::STANDARD.decode_to_vec(payload).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, sprite);
    }

    #[test]
    fn fits_within_checks_bounds() {
        assert!(SpriteRegion::new(0, 0, 275, 116).fits_within(275, 116));
        assert!(!SpriteRegion::new(1, 0, 275, 116).fits_within(275, 116));
        assert!(!SpriteRegion::new(-1, 0, 2, 2).fits_within(275, 116));
    }
}
