// Assets module - Image resources read from a directory on disk
//
// `<id>.json` holds a segment in the WLED layout, `{"seg": {"i": [...]}}`:
// integers set a start (and optional stop) index and each color closes a run.
// Colors are hex strings or `[r, g, b]` / `[r, g, b, a]` arrays. An optional
// top-level `"proxy"` hex names the color to swap for the theme color.
// `<id>.png` is sampled pixel by pixel onto the serpentine.

use anyhow::{Context, Result};
use image::RgbaImage;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::loader::{ImageResource, ImageSource, PixelRun};
use crate::serpentine::{Point, Serpentine};
use crate::types::Rgba;

pub struct FileImageSource {
    dir: PathBuf,
    grid: Serpentine,
}

impl FileImageSource {
    pub fn new(dir: impl Into<PathBuf>, grid: Serpentine) -> Self {
        FileImageSource { dir: dir.into(), grid }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str, extension: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(&['/', '\\'][..]) || id.contains("..") {
            anyhow::bail!("Invalid image id '{}'", id);
        }
        Ok(self.dir.join(format!("{}.{}", id, extension)))
    }
}

impl ImageSource for FileImageSource {
    fn fetch(&self, id: &str) -> Result<ImageResource> {
        let json = self.path_for(id, "json")?;
        if json.exists() {
            let text = std::fs::read_to_string(&json)
                .with_context(|| format!("Failed to read {}", json.display()))?;
            return parse_segment_json(&text).with_context(|| format!("Failed to parse {}", json.display()));
        }

        let png = self.path_for(id, "png")?;
        if png.exists() {
            let img = image::open(&png)
                .with_context(|| format!("Failed to open {}", png.display()))?
                .to_rgba8();
            return Ok(image_to_runs(&img, self.grid));
        }

        anyhow::bail!("No image '{}' in {}", id, self.dir.display())
    }
}

fn decode_error(message: impl Into<String>) -> anyhow::Error {
    EngineError::decode(message).into()
}

fn parse_color(value: &Value) -> Result<Rgba> {
    match value {
        Value::String(hex) => Rgba::from_hex(hex),
        Value::Array(channels) if (3..=4).contains(&channels.len()) => {
            let mut rgba = [0u8, 0, 0, 255];
            for (slot, channel) in rgba.iter_mut().zip(channels) {
                let v = channel.as_u64().ok_or_else(|| decode_error("color channel is not a number"))?;
                *slot = v.min(255) as u8;
            }
            Ok(Rgba::new(rgba[0], rgba[1], rgba[2], rgba[3]))
        }
        other => Err(decode_error(format!("unsupported color {}", other))),
    }
}

pub fn parse_segment_json(text: &str) -> Result<ImageResource> {
    let root: Value = serde_json::from_str(text)?;
    let items = root["seg"]["i"]
        .as_array()
        .ok_or_else(|| decode_error("missing seg.i array"))?;

    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    let mut stop: Option<usize> = None;
    for item in items {
        if let Some(n) = item.as_i64() {
            let n = n.unsigned_abs() as usize;
            if start.is_none() {
                start = Some(n);
            } else {
                stop = Some(n);
            }
            continue;
        }
        let color = parse_color(item)?;
        // A color without indices continues right after the previous run
        let from = start.unwrap_or_else(|| runs.last().map_or(0, |r: &PixelRun| r.start + r.count));
        let to = match stop {
            Some(s) if s > from => s,
            _ => from + 1,
        };
        runs.push(PixelRun { start: from, count: to - from, color });
        start = None;
        stop = None;
    }

    let proxy_color = root["proxy"].as_str().map(str::to_string);
    Ok(ImageResource { runs, proxy_color })
}

/// Samples the top-left `cols`×`rows` corner of `img` into single-pixel runs,
/// merging neighbours of the same color along the wiring order.
pub fn image_to_runs(img: &RgbaImage, grid: Serpentine) -> ImageResource {
    let mut runs: Vec<PixelRun> = Vec::new();
    for i in 0..grid.len() {
        let Point { x, y } = grid.to_cartesian(i);
        if x as u32 >= img.width() || y as u32 >= img.height() {
            continue;
        }
        let p = img.get_pixel(x as u32, y as u32);
        let color = Rgba::new(p[0], p[1], p[2], p[3]);
        if color.is_transparent() {
            continue;
        }
        match runs.last_mut() {
            Some(last) if last.color == color && last.start + last.count == i => last.count += 1,
            _ => runs.push(PixelRun { start: i, count: 1, color }),
        }
    }
    ImageResource { runs, proxy_color: None }
}
