// Config Module - Configuration management and command-line argument parsing
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::layer::LayerKind;

pub const MAX_LAYERS: usize = 8;
const APP_DIR: &str = "glowmatrix";

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Layered LED matrix animations for WLED controllers via DDP",
    long_about = "Renders stacked pattern, image, text and clock layers onto a serpentine-wired\n\
                  LED matrix and streams the frames to one or more WLED controllers over DDP,\n\
                  or previews them in the terminal. Edit the config file while running to\n\
                  change layers live."
)]
pub struct Args {
    /// Matrix rows
    #[arg(short = 'r', long)]
    pub rows: Option<usize>,

    /// Matrix columns
    #[arg(short = 'c', long)]
    pub cols: Option<usize>,

    /// Target framerate
    #[arg(long)]
    pub fps: Option<f64>,

    /// Output sink (preview, ddp, none)
    #[arg(short, long)]
    pub output: Option<String>,

    /// WLED device address (replaces the configured device list with this one)
    #[arg(short, long)]
    pub wled_ip: Option<String>,

    /// Directory holding image resources (<id>.json or <id>.png)
    #[arg(long)]
    pub image_dir: Option<String>,

    /// Fixed RNG seed for reproducible animations
    #[arg(long)]
    pub seed: Option<u64>,

    /// Quiet mode, errors only
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode, debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Config file path or name (e.g., --cfg /full/path or --cfg desk for ~/.config/glowmatrix/desk.toml)
    #[arg(long)]
    pub cfg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WledDeviceConfig {
    pub ip: String,
    pub led_offset: usize,
    pub led_count: usize,
    pub enabled: bool,
}

/// One layer of the stack, bottom first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// pattern, accent, image, text or info
    pub kind: String,
    /// Pattern id for pattern/accent layers, info id for info layers
    pub id: u8,
    pub overlay: u8,
    pub persistent_overlay: u8,
    /// "dynamic", "complement" or a hex color
    pub color: String,
    pub heading: u8,
    pub image: String,
    pub text: String,
    /// 0 disables
    pub autocycle_ms: u64,
    /// 0 disables
    pub flipflop_ms: u64,
    pub reverse: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        LayerConfig {
            kind: "pattern".to_string(),
            id: 0,
            overlay: 0,
            persistent_overlay: 0,
            color: "dynamic".to_string(),
            heading: 0,
            image: String::new(),
            text: String::new(),
            autocycle_ms: 0,
            flipflop_ms: 0,
            reverse: false,
        }
    }
}

impl LayerConfig {
    pub fn layer_kind(&self) -> Option<LayerKind> {
        match self.kind.as_str() {
            "pattern" => Some(LayerKind::Pattern),
            "accent" => Some(LayerKind::Accent),
            "image" => Some(LayerKind::Image),
            "text" => Some(LayerKind::Text),
            "info" => Some(LayerKind::Info),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
    pub rows: usize,
    pub cols: usize,
    pub fps: f64,
    pub output: String,
    pub wled_devices: Vec<WledDeviceConfig>,
    pub parallel_send: bool,
    pub fail_fast: bool,
    pub image_dir: String,
    pub loader_tick_ms: u64,
    pub image_retry_ms: u64,
    pub dynamic_color_ms: u64,
    pub seed: Option<u64>,
    pub layers: Vec<LayerConfig>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        MatrixConfig {
            config_path: None,
            rows: 16,
            cols: 16,
            fps: 60.0,
            output: "preview".to_string(),
            wled_devices: Vec::new(),
            parallel_send: true,
            fail_fast: false,
            image_dir: String::new(),
            loader_tick_ms: 10,
            image_retry_ms: 500,
            dynamic_color_ms: 100,
            seed: None,
            layers: vec![
                LayerConfig { id: 0, ..LayerConfig::default() },
                LayerConfig {
                    kind: "accent".to_string(),
                    id: 11,
                    color: "complement".to_string(),
                    ..LayerConfig::default()
                },
            ],
        }
    }
}

impl MatrixConfig {
    pub fn merge_with_args(&mut self, args: &Args) -> bool {
        // Track if any args were actually provided
        let mut args_provided = false;

        if let Some(rows) = args.rows {
            self.rows = rows;
            args_provided = true;
        }

        if let Some(cols) = args.cols {
            self.cols = cols;
            args_provided = true;
        }

        if let Some(fps) = args.fps {
            self.fps = fps;
            args_provided = true;
        }

        if let Some(ref output) = args.output {
            self.output = output.clone();
            args_provided = true;
        }

        if let Some(ref image_dir) = args.image_dir {
            self.image_dir = image_dir.clone();
            args_provided = true;
        }

        if let Some(seed) = args.seed {
            self.seed = Some(seed);
            args_provided = true;
        }

        // Last, so the device spans the grid as sanitize leaves it
        if let Some(ref wled_ip) = args.wled_ip {
            self.sanitize();
            self.wled_devices = vec![WledDeviceConfig {
                ip: wled_ip.clone(),
                led_offset: 0,
                led_count: self.led_count(),
                enabled: true,
            }];
            args_provided = true;
        }

        args_provided
    }

    fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let config_dir = PathBuf::from(home).join(".config").join(APP_DIR);
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn config_path(cfg_arg: Option<&str>) -> Result<PathBuf> {
        if let Some(cfg) = cfg_arg {
            let path = PathBuf::from(cfg);
            if path.is_absolute() || cfg.contains('/') || cfg.contains('\\') {
                return Ok(path);
            }

            // Otherwise treat as config name in config directory
            let filename = if cfg.ends_with(".toml") {
                cfg.to_string()
            } else {
                format!("{}.toml", cfg)
            };
            Ok(Self::config_dir()?.join(filename))
        } else {
            Ok(Self::config_dir()?.join("config.toml"))
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut parsed: Self = toml::from_str(contents)?;
        parsed.sanitize();
        Ok(parsed)
    }

    pub fn load_with_path(cfg_arg: Option<&str>) -> Result<Self> {
        let path = Self::config_path(cfg_arg)?;
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut parsed = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        parsed.config_path = Some(path);
        Ok(parsed)
    }

    /// Loads the config, writing the defaults out first when none exists yet.
    pub fn load_or_create(cfg_arg: Option<&str>) -> Result<Self> {
        let path = Self::config_path(cfg_arg)?;
        if path.exists() {
            return Self::load_with_path(cfg_arg);
        }
        let config = MatrixConfig { config_path: Some(path), ..MatrixConfig::default() };
        config.save()?;
        Ok(config)
    }

    /// Clamp values into ranges the engine can run with
    pub fn sanitize(&mut self) {
        self.rows = self.rows.clamp(1, 256);
        self.cols = self.cols.clamp(1, 256);
        self.fps = if self.fps.is_finite() { self.fps.clamp(1.0, 240.0) } else { 60.0 };
        self.output = self.output.trim().to_lowercase();
        self.image_dir = self.image_dir.trim().to_string();
        self.loader_tick_ms = self.loader_tick_ms.clamp(1, 1000);
        self.image_retry_ms = self.image_retry_ms.clamp(10, 60_000);
        self.dynamic_color_ms = self.dynamic_color_ms.clamp(1, 10_000);

        for device in self.wled_devices.iter_mut() {
            device.ip = device.ip.trim().to_string();
        }

        self.layers.truncate(MAX_LAYERS);
        for layer in self.layers.iter_mut() {
            layer.kind = layer.kind.trim().to_lowercase();
            layer.color = Self::sanitize_color_string(&layer.color);
            layer.image = layer.image.trim().to_string();
            layer.heading = layer.heading.min(8);
        }
    }

    /// Keywords are lowercased; hex colors lose any '#' and are uppercased.
    fn sanitize_color_string(color: &str) -> String {
        let trimmed = color.trim();
        let hex = trimmed.trim_start_matches('#');
        if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            hex.to_uppercase()
        } else {
            trimmed.to_lowercase()
        }
    }

    pub fn led_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Image directory, defaulting to `images/` next to the config file.
    pub fn image_dir(&self) -> Result<PathBuf> {
        if !self.image_dir.is_empty() {
            return Ok(PathBuf::from(&self.image_dir));
        }
        let base = match self.config_path.as_ref().and_then(|p| p.parent()) {
            Some(parent) => parent.to_path_buf(),
            None => Self::config_dir()?,
        };
        Ok(base.join("images"))
    }

    pub fn save(&self) -> Result<()> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => Self::config_path(None)?,
        };

        let mut sanitized = self.clone();
        sanitized.sanitize();

        let body = toml::to_string_pretty(&sanitized)?;
        let contents = format!(
            "# glowmatrix configuration\n\
             # Edit this file while the program is running; layers are rebuilt on save.\n\
             # Layer kinds: pattern, accent, image, text, info. Colors: dynamic, complement or hex.\n\n{}",
            body
        );
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
