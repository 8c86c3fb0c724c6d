use anyhow::{anyhow, Result};
use image::Rgba;

pub const VIS_COLOR_COUNT: usize = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct PlEditColors {
    pub normal: Rgba<u8>,
    pub current: Rgba<u8>,
    pub normal_bg: Rgba<u8>,
    pub selected_bg: Rgba<u8>,
    pub font: Option<String>,
}

impl Default for PlEditColors {
    fn default() -> Self {
        Self {
            normal: Rgba([0x00, 0xFF, 0x00, 0xFF]),
            current: Rgba([0xFF, 0xFF, 0xFF, 0xFF]),
            normal_bg: Rgba([0x00, 0x00, 0x00, 0xFF]),
            selected_bg: Rgba([0x00, 0x00, 0xFF, 0xFF]),
            font: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedPlEdit {
    pub colors: PlEditColors,
    pub warnings: Vec<String>,
}

/// Parses the `[Text]` section of a `PLEdit.txt`. Unknown keys and other
/// sections are ignored; bad colours keep their defaults.
pub fn parse_pledit(source: &str) -> LoadedPlEdit {
    let mut colors = PlEditColors::default();
    let mut warnings = Vec::new();
    let mut in_text_section = false;

    for raw_line in source.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_text_section = section.trim().eq_ignore_ascii_case("text");
            continue;
        }
        if !in_text_section {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warnings.push(format!("Ignoring malformed PLEdit line: {line}"));
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        let slot = match key.as_str() {
            "normal" => &mut colors.normal,
            "current" => &mut colors.current,
            "normalbg" => &mut colors.normal_bg,
            "selectedbg" => &mut colors.selected_bg,
            "font" => {
                colors.font = Some(value.to_string());
                continue;
            }
            _ => continue,
        };
        match parse_hex_color(value) {
            Ok(color) => *slot = color,
            Err(err) => warnings.push(format!("{key}: {err}; keeping default")),
        }
    }

    LoadedPlEdit { colors, warnings }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisColors {
    pub colors: Vec<Rgba<u8>>,
}

/// Parses a `VisColor.txt`: one `r,g,b` triple per line, `//` comments
/// allowed, at most 24 entries. Lines that don't parse are skipped.
pub fn parse_viscolor(source: &str) -> VisColors {
    let colors = source
        .lines()
        .filter_map(|line| {
            let line = line.split("//").next().unwrap_or_default().trim();
            if line.is_empty() {
                return None;
            }
            parse_rgb_triple(line).ok()
        })
        .take(VIS_COLOR_COUNT)
        .collect();
    VisColors { colors }
}

fn parse_rgb_triple(input: &str) -> Result<Rgba<u8>> {
    let parts: Vec<_> = input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 {
        return Err(anyhow!("rgb expects 3 components"));
    }
    let r = parse_component(parts[0])?;
    let g = parse_component(parts[1])?;
    let b = parse_component(parts[2])?;
    Ok(Rgba([r, g, b, 255]))
}

fn parse_component(src: &str) -> Result<u8> {
    src.parse::<u8>()
        .map_err(|_| anyhow!("Invalid color channel: {src}"))
}

fn parse_hex_color(value: &str) -> Result<Rgba<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return Err(anyhow!("Invalid hex color: {value}"));
    }
    let bytes =
        u32::from_str_radix(hex, 16).map_err(|_| anyhow!("Invalid hex color: {value}"))?;
    let r = ((bytes >> 16) & 0xFF) as u8;
    let g = ((bytes >> 8) & 0xFF) as u8;
    let b = (bytes & 0xFF) as u8;
    Ok(Rgba([r, g, b, 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pledit_reads_text_section() {
        let loaded = parse_pledit(
            "[Text]\r\nNormal=#00FF00\r\nCurrent=#FFFFFF\r\nnormalbg=#101010\r\nSelectedBG=#0000C6\r\nFont=Arial\r\n",
        );
        assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
        assert_eq!(loaded.colors.normal_bg, Rgba([0x10, 0x10, 0x10, 0xFF]));
        assert_eq!(loaded.colors.selected_bg, Rgba([0x00, 0x00, 0xC6, 0xFF]));
        assert_eq!(loaded.colors.font.as_deref(), Some("Arial"));
    }

    #[test]
    fn pledit_bad_color_keeps_default_and_warns() {
        let loaded = parse_pledit("[text]\nNormal=green\n[Other]\nCurrent=#123456\n");
        assert_eq!(loaded.colors, PlEditColors::default());
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].starts_with("normal:"));
    }

    #[test]
    fn viscolor_skips_comments_and_caps_entries() {
        let mut source = String::from("0,0,0, // background\n24,33,41 // dots\n\nbad line\n");
        for _ in 0..30 {
            source.push_str("255,255,255\n");
        }
        let vis = parse_viscolor(&source);
        assert_eq!(vis.colors.len(), VIS_COLOR_COUNT);
        assert_eq!(vis.colors[0], Rgba([0, 0, 0, 255]));
        assert_eq!(vis.colors[1], Rgba([24, 33, 41, 255]));
    }
}
