//! Track duration from the stream header.
//!
//! Only the first [`HEADER_BYTES`] of a track are read, over HTTP with
//! a `Range` request or from a local file.

use std::{fs, io::Read, path::Path, time::Duration};

use anyhow::{Context, Result};
use log::{debug, warn};

pub const HEADER_BYTES: u64 = 64 * 1024;

/// Duration in seconds of a RIFF/WAVE stream, read from its `fmt ` and
/// `data` chunk headers. `None` when the header is not a WAV header or
/// ends before the `data` chunk.
pub fn wav_duration(header: &[u8]) -> Option<f64> {
    if header.len() < 12 || &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        return None;
    }

    let mut offset = 12usize;
    let mut byte_rate = None;
    while offset + 8 <= header.len() {
        let id = &header[offset..offset + 4];
        let size = read_u32(header, offset + 4)? as usize;
        let body = offset + 8;
        match id {
            b"fmt " => byte_rate = Some(read_u32(header, body + 8)?),
            b"data" => {
                let rate = byte_rate.filter(|rate| *rate > 0)?;
                if size == u32::MAX as usize {
                    // Streamed WAVs leave the size open.
                    return None;
                }
                return Some(size as f64 / rate as f64);
            }
            _ => {}
        }
        // Chunks are word aligned.
        offset = body.checked_add(size)?.checked_add(size & 1)?;
    }
    None
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes(raw.try_into().ok()?))
}

/// Reads the header of the track at `url` and returns its duration.
/// Failures are logged and reported as an unknown duration.
pub fn header_duration(url: &str) -> Option<f64> {
    match read_header(url) {
        Ok(header) => {
            let duration = wav_duration(&header);
            if duration.is_none() {
                debug!("No duration in stream header of {url}");
            }
            duration
        }
        Err(err) => {
            warn!("Could not read the stream header of {url}: {err:#}");
            None
        }
    }
}

fn read_header(url: &str) -> Result<Vec<u8>> {
    let mut header = Vec::new();
    if url.starts_with("http://") || url.starts_with("https://") {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .build();
        let response = agent
            .get(url)
            .set("Range", &format!("bytes=0-{}", HEADER_BYTES - 1))
            .call()
            .with_context(|| format!("Range request for {url} failed"))?;
        response
            .into_reader()
            .take(HEADER_BYTES)
            .read_to_end(&mut header)
            .with_context(|| format!("Failed to read stream header of {url}"))?;
    } else {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        fs::File::open(path)
            .with_context(|| format!("Unable to open track: {}", path.display()))?
            .take(HEADER_BYTES)
            .read_to_end(&mut header)
            .with_context(|| format!("Failed to read track: {}", path.display()))?;
    }
    Ok(header)
}
