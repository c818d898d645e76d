// Image Loader module - Bounded request queue drained by one background task
//
// The render loop never waits on image I/O. Layers submit requests without
// blocking; a single consumer on the tokio runtime fetches and decodes them
// and swaps the result into the layer's `ImageTarget` slot. Requests only hold
// a weak handle plus the target generation at submit time, so a layer that
// went away or switched images in the meantime is simply skipped.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::buffer::PixelBuffer;
use crate::types::{Rgb, Rgba};

pub const DEFAULT_LOADER_TICK: Duration = Duration::from_millis(10);

/// `count` pixels starting at linear index `start`, all one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRun {
    pub start: usize,
    pub count: usize,
    pub color: Rgba,
}

/// Decoded image: pixel runs plus an optional proxy color (hex) that the
/// layer swaps for its theme color when reading pixels back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageResource {
    pub runs: Vec<PixelRun>,
    pub proxy_color: Option<String>,
}

impl ImageResource {
    /// Paints the runs over a transparent `buffer`. Returns how many runs
    /// were clipped at the end of the buffer.
    pub fn render(&self, buffer: &mut PixelBuffer) -> usize {
        buffer.clear();
        let len = buffer.len();
        let mut clipped = 0;
        for run in &self.runs {
            let end = run.start.saturating_add(run.count);
            if end > len {
                clipped += 1;
            }
            for i in run.start..end.min(len) {
                buffer[i] = run.color;
            }
        }
        clipped
    }
}

/// Where image resources come from. Called on the blocking pool.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, id: &str) -> Result<ImageResource>;
}

/// Fixed set of images held in memory.
#[derive(Default)]
pub struct MemorySource {
    images: HashMap<String, ImageResource>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &str, image: ImageResource) {
        self.images.insert(id.to_string(), image);
    }
}

impl ImageSource for MemorySource {
    fn fetch(&self, id: &str) -> Result<ImageResource> {
        self.images.get(id).cloned().with_context(|| format!("No image named '{}'", id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Pending,
    Loaded,
    Failed,
}

pub struct ImageSlot {
    pub pixels: PixelBuffer,
    pub proxy: Option<Rgb>,
    pub status: LoadStatus,
    pub generation: u64,
}

/// Destination of image loads, shared between a layer and the loader task.
pub struct ImageTarget {
    slot: Mutex<ImageSlot>,
}

impl ImageTarget {
    pub fn new(len: usize) -> Arc<Self> {
        Arc::new(ImageTarget {
            slot: Mutex::new(ImageSlot {
                pixels: PixelBuffer::new(len),
                proxy: None,
                status: LoadStatus::Idle,
                generation: 0,
            }),
        })
    }

    pub fn lock(&self) -> MutexGuard<'_, ImageSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Invalidates anything in flight; returns the new generation.
    pub fn bump_generation(&self) -> u64 {
        let mut slot = self.lock();
        slot.generation += 1;
        slot.status = LoadStatus::Idle;
        slot.generation
    }
}

pub struct ImageLoadRequest {
    pub id: String,
    pub target: Weak<ImageTarget>,
    pub generation: u64,
}

impl ImageLoadRequest {
    pub fn new(id: &str, target: &Arc<ImageTarget>) -> Self {
        let generation = target.lock().generation;
        ImageLoadRequest { id: id.to_string(), target: Arc::downgrade(target), generation }
    }
}

#[derive(Debug, Default)]
pub struct LoaderStats {
    completed: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
    dropped: AtomicU64,
}

impl LoaderStats {
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Producer side of the loader. Cheap to clone; the consumer stops once
/// every clone is gone.
#[derive(Clone)]
pub struct LoadQueue {
    tx: mpsc::Sender<ImageLoadRequest>,
    stats: Arc<LoaderStats>,
}

impl LoadQueue {
    /// Never blocks. False means the request was dropped and should be
    /// submitted again on a later frame.
    pub fn submit(&self, request: ImageLoadRequest) -> bool {
        match self.tx.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(id = %request.id, "image queue full, request dropped");
                false
            }
            Err(TrySendError::Closed(request)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(id = %request.id, "image loader stopped, request dropped");
                false
            }
        }
    }

    pub fn stats(&self) -> Arc<LoaderStats> {
        self.stats.clone()
    }
}

pub struct ImageLoader;

impl ImageLoader {
    /// Starts the consumer task on `handle`. `capacity` should be the layer
    /// count plus one.
    pub fn spawn(
        handle: &Handle,
        source: Arc<dyn ImageSource>,
        capacity: usize,
        tick: Duration,
    ) -> (LoadQueue, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(LoaderStats::default());
        let task = handle.spawn(consume(rx, source, stats.clone(), tick));
        (LoadQueue { tx, stats }, task)
    }
}

async fn consume(
    mut rx: mpsc::Receiver<ImageLoadRequest>,
    source: Arc<dyn ImageSource>,
    stats: Arc<LoaderStats>,
    tick: Duration,
) {
    let mut ticker = tokio::time::interval(tick.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        loop {
            match rx.try_recv() {
                Ok(request) => process(request, &source, &stats).await,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("image loader stopping, all queues dropped");
                    return;
                }
            }
        }
    }
}

/// Live target for `request`, or None when it was dropped or moved on.
fn live_target(request: &ImageLoadRequest) -> Option<Arc<ImageTarget>> {
    let target = request.target.upgrade()?;
    let current = target.lock().generation;
    (current == request.generation).then_some(target)
}

async fn process(request: ImageLoadRequest, source: &Arc<dyn ImageSource>, stats: &LoaderStats) {
    let len = match live_target(&request) {
        Some(target) => {
            let len = target.lock().pixels.len();
            len
        }
        None => {
            stats.abandoned.fetch_add(1, Ordering::Relaxed);
            debug!(id = %request.id, "image request abandoned before fetch");
            return;
        }
    };

    let fetch_source = source.clone();
    let id = request.id.clone();
    let fetched = tokio::task::spawn_blocking(move || fetch_source.fetch(&id)).await;

    let decoded = match fetched {
        Ok(Ok(resource)) => decode(&request.id, &resource, len),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(anyhow::anyhow!("Image fetch task failed: {}", e)),
    };

    // The layer may have gone away while we were fetching
    let Some(target) = live_target(&request) else {
        stats.abandoned.fetch_add(1, Ordering::Relaxed);
        debug!(id = %request.id, "image request abandoned after fetch");
        return;
    };
    let mut slot = target.lock();
    match decoded {
        Ok((pixels, proxy)) => {
            slot.pixels = pixels;
            slot.proxy = proxy;
            slot.status = LoadStatus::Loaded;
            stats.completed.fetch_add(1, Ordering::Relaxed);
            debug!(id = %request.id, "image loaded");
        }
        Err(e) => {
            // Last good pixels stay in place
            slot.status = LoadStatus::Failed;
            stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!(id = %request.id, "image load failed: {:#}", e);
        }
    }
}

fn decode(id: &str, resource: &ImageResource, len: usize) -> Result<(PixelBuffer, Option<Rgb>)> {
    let proxy = match &resource.proxy_color {
        Some(hex) => Some(Rgb::from_hex(hex).with_context(|| format!("Bad proxy color in '{}'", id))?),
        None => None,
    };
    let mut scratch = PixelBuffer::new(len);
    let clipped = resource.render(&mut scratch);
    if clipped > 0 {
        warn!(id, clipped, "image runs clipped to the matrix");
    }
    Ok((scratch, proxy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_block() -> ImageResource {
        ImageResource {
            runs: vec![PixelRun { start: 2, count: 3, color: Rgba::opaque(Rgb::new(255, 0, 0)) }],
            proxy_color: Some("00FF00".to_string()),
        }
    }

    fn source() -> Arc<dyn ImageSource> {
        let mut memory = MemorySource::new();
        memory.insert("block", red_block());
        memory.insert(
            "bad_proxy",
            ImageResource { runs: Vec::new(), proxy_color: Some("nope".to_string()) },
        );
        memory.insert(
            "accented_proxy",
            ImageResource { runs: Vec::new(), proxy_color: Some("a\u{e9}123".to_string()) },
        );
        Arc::new(memory)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    #[test]
    fn test_render_clips_runs() {
        let mut buf = PixelBuffer::new(4);
        let image = ImageResource {
            runs: vec![
                PixelRun { start: 0, count: 1, color: Rgba::opaque(Rgb::WHITE) },
                PixelRun { start: 3, count: 5, color: Rgba::opaque(Rgb::WHITE) },
            ],
            proxy_color: None,
        };
        assert_eq!(image.render(&mut buf), 1);
        assert_eq!(buf[0].a, 255);
        assert!(buf[1].is_transparent());
        assert_eq!(buf[3].a, 255);
    }

    #[tokio::test]
    async fn test_load_completes_into_slot() {
        let (queue, _task) = ImageLoader::spawn(&Handle::current(), source(), 3, Duration::from_millis(5));
        let target = ImageTarget::new(8);
        assert!(queue.submit(ImageLoadRequest::new("block", &target)));
        settle().await;

        let slot = target.lock();
        assert_eq!(slot.status, LoadStatus::Loaded);
        assert_eq!(slot.proxy, Some(Rgb::new(0, 255, 0)));
        assert!(slot.pixels[1].is_transparent());
        assert_eq!(slot.pixels[2].rgb(), Rgb::new(255, 0, 0));
        assert_eq!(queue.stats().completed(), 1);
    }

    #[tokio::test]
    async fn test_dropped_target_is_abandoned() {
        let (queue, _task) = ImageLoader::spawn(&Handle::current(), source(), 3, Duration::from_millis(5));
        let target = ImageTarget::new(8);
        let weak = Arc::downgrade(&target);
        assert!(queue.submit(ImageLoadRequest::new("block", &target)));
        drop(target);
        settle().await;

        assert!(weak.upgrade().is_none());
        assert_eq!(queue.stats().abandoned(), 1);
        assert_eq!(queue.stats().completed(), 0);
    }

    #[tokio::test]
    async fn test_stale_generation_never_writes() {
        let (queue, _task) = ImageLoader::spawn(&Handle::current(), source(), 3, Duration::from_millis(5));
        let target = ImageTarget::new(8);
        assert!(queue.submit(ImageLoadRequest::new("block", &target)));
        target.bump_generation();
        settle().await;

        let slot = target.lock();
        assert!(slot.pixels.is_all_transparent());
        assert_eq!(slot.status, LoadStatus::Idle);
        assert_eq!(queue.stats().abandoned(), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_last_good_pixels() {
        let (queue, _task) = ImageLoader::spawn(&Handle::current(), source(), 3, Duration::from_millis(5));
        let target = ImageTarget::new(8);
        assert!(queue.submit(ImageLoadRequest::new("block", &target)));
        settle().await;

        for id in ["missing", "bad_proxy"] {
            target.lock().status = LoadStatus::Pending;
            assert!(queue.submit(ImageLoadRequest::new(id, &target)));
            settle().await;
            let slot = target.lock();
            assert_eq!(slot.status, LoadStatus::Failed);
            assert_eq!(slot.pixels[2].rgb(), Rgb::new(255, 0, 0));
        }
        assert_eq!(queue.stats().failed(), 2);
    }

    #[tokio::test]
    async fn test_non_ascii_proxy_fails_and_loader_keeps_running() {
        let (queue, task) = ImageLoader::spawn(&Handle::current(), source(), 3, Duration::from_millis(5));
        let target = ImageTarget::new(8);
        assert!(queue.submit(ImageLoadRequest::new("accented_proxy", &target)));
        settle().await;
        assert_eq!(target.lock().status, LoadStatus::Failed);
        assert!(!task.is_finished());

        assert!(queue.submit(ImageLoadRequest::new("block", &target)));
        settle().await;
        let slot = target.lock();
        assert_eq!(slot.status, LoadStatus::Loaded);
        assert_eq!(slot.pixels[2].rgb(), Rgb::new(255, 0, 0));
        assert_eq!(queue.stats().failed(), 1);
        assert_eq!(queue.stats().completed(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (queue, _task) = ImageLoader::spawn(&Handle::current(), source(), 1, Duration::from_millis(5));
        let target = ImageTarget::new(8);
        assert!(queue.submit(ImageLoadRequest::new("block", &target)));
        assert!(!queue.submit(ImageLoadRequest::new("block", &target)));
        assert_eq!(queue.stats().dropped(), 1);
    }

    #[tokio::test]
    async fn test_consumer_stops_when_queues_drop() {
        let (queue, task) = ImageLoader::spawn(&Handle::current(), source(), 1, Duration::from_millis(5));
        drop(queue);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("loader did not stop")
            .unwrap();
    }
}
