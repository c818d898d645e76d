// glowmatrix - Layered LED matrix animations streamed to WLED or previewed in the terminal
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use notify::{Config, Event as NotifyEvent, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Level};

use glowmatrix::assets::FileImageSource;
use glowmatrix::compositor::{Compositor, DynamicColor};
use glowmatrix::config::{Args, MatrixConfig, MAX_LAYERS};
use glowmatrix::layer::LayerContext;
use glowmatrix::loader::ImageLoader;
use glowmatrix::output::{DdpSink, DdpSinkConfig, NullSink, PixelSink};
use glowmatrix::preview::PreviewSink;
use glowmatrix::serpentine::Serpentine;
use glowmatrix::timing::{Clock, SystemClock};

fn init_tracing(args: &Args, config: &MatrixConfig) {
    let level = if args.quiet {
        Level::ERROR
    } else if args.verbose {
        Level::DEBUG
    } else if config.output == "preview" {
        // Keep the terminal preview readable
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();
}

fn build_sink(config: &MatrixConfig, grid: Serpentine, shutdown: Arc<AtomicBool>) -> Result<Box<dyn PixelSink>> {
    match config.output.as_str() {
        "preview" => Ok(Box::new(PreviewSink::new(grid, shutdown)?)),
        "ddp" => {
            let sink = DdpSink::new(DdpSinkConfig {
                devices: config.wled_devices.clone(),
                send_parallel: config.parallel_send,
                fail_fast: config.fail_fast,
            })?;
            info!(devices = sink.device_count(), "streaming to WLED over DDP");
            Ok(Box::new(sink))
        }
        "none" => Ok(Box::new(NullSink)),
        other => Err(anyhow!("Unknown output '{}' (expected preview, ddp or none)", other)),
    }
}

/// Watch the config file and signal the render loop when it is modified
fn spawn_config_watcher(config_path: PathBuf) -> mpsc::Receiver<()> {
    let (changed_tx, changed_rx) = mpsc::channel();

    thread::spawn(move || {
        let (tx, rx) = mpsc::channel();
        let mut watcher = match RecommendedWatcher::new(tx, Config::default()) {
            Ok(w) => w,
            Err(e) => {
                warn!("Config watcher unavailable: {}", e);
                return;
            }
        };

        if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
            warn!("Cannot watch {}: {}", config_path.display(), e);
            return;
        }

        loop {
            match rx.recv() {
                Ok(Ok(NotifyEvent { kind, .. })) => {
                    if matches!(kind, notify::EventKind::Modify(_)) && changed_tx.send(()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
                _ => {}
            }
        }
    });

    changed_rx
}

fn apply_layers(compositor: &mut Compositor, config: &MatrixConfig) {
    let errors = compositor.apply_config(&config.layers);
    if !errors.is_empty() {
        warn!(count = errors.len(), "layer config has problems, defaults used where needed");
    }
    for index in 0..compositor.layer_count() {
        if let Some(layer) = compositor.layer_mut(index) {
            layer.set_callback(move |code| debug!(layer = index, code, "pattern event"));
        }
    }
}

fn render_loop(ctx: LayerContext, mut config: MatrixConfig, config_rx: mpsc::Receiver<()>, shutdown: Arc<AtomicBool>) -> Result<()> {
    // Layers hold pattern state that never leaves this thread
    let dynamic = Arc::new(DynamicColor::new(config.dynamic_color_ms));
    let mut compositor = Compositor::new(ctx.clone(), MAX_LAYERS, dynamic);
    apply_layers(&mut compositor, &config);
    let mut sink = build_sink(&config, ctx.grid, shutdown.clone())?;
    let frame_time = Duration::from_secs_f64(1.0 / config.fps);

    while !shutdown.load(Ordering::Relaxed) {
        let frame_start = Instant::now();

        // Collapse bursts of file events into one reload
        if config_rx.try_recv().is_ok() {
            while config_rx.try_recv().is_ok() {}
            let path = config.config_path.clone();
            match MatrixConfig::load_with_path(path.as_ref().and_then(|p| p.to_str())) {
                Ok(new_config) => {
                    if new_config.rows != config.rows || new_config.cols != config.cols {
                        warn!("Matrix size changes need a restart; keeping {}x{}", config.cols, config.rows);
                    }
                    apply_layers(&mut compositor, &new_config);
                    info!(layers = new_config.layers.len(), "config reloaded");
                    config = MatrixConfig { rows: config.rows, cols: config.cols, ..new_config };
                }
                Err(e) => warn!("Config reload failed, keeping current layers: {:#}", e),
            }
        }

        compositor.reanimate();
        let frame = compositor.compose();
        if let Err(e) = sink.send(frame) {
            if config.fail_fast {
                return Err(e);
            }
            warn!("Frame send failed: {:#}", e);
        }

        if let Some(remaining) = frame_time.checked_sub(frame_start.elapsed()) {
            thread::sleep(remaining);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = MatrixConfig::load_or_create(args.cfg.as_deref())?;
    if config.merge_with_args(&args) {
        config.sanitize();
        config.save()?;
    }
    init_tracing(&args, &config);

    let config_path = config
        .config_path
        .clone()
        .context("config path was not resolved")?;
    info!("Using config file: {}", config_path.display());

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))?;
    }

    // Runtime only hosts the image loader; rendering stays on its own thread
    let rt = tokio::runtime::Runtime::new()?;

    let grid = Serpentine::new(config.cols, config.rows);
    let image_dir = config.image_dir()?;
    info!("Loading images from {}", image_dir.display());
    let source = Arc::new(FileImageSource::new(image_dir, grid));
    let (queue, loader_task) = ImageLoader::spawn(
        rt.handle(),
        source,
        MAX_LAYERS + 1,
        Duration::from_millis(config.loader_tick_ms),
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let mut ctx = LayerContext::new(grid, clock).with_loader(queue).with_seed(config.seed);
    ctx.image_retry_ms = config.image_retry_ms;
    let config_rx = spawn_config_watcher(config_path);

    let render_shutdown = shutdown.clone();
    let renderer = thread::Builder::new()
        .name("render".to_string())
        .spawn(move || render_loop(ctx, config, config_rx, render_shutdown))?;

    let result = renderer.join().map_err(|_| anyhow!("render thread panicked"))?;
    shutdown.store(true, Ordering::Relaxed);

    // The compositor (and every queue handle) is gone now, so the loader winds down
    if rt.block_on(async { tokio::time::timeout(Duration::from_secs(1), loader_task).await }).is_err() {
        error!("image loader did not stop in time");
    }

    result
}
