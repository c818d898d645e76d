// glowmatrix - Layered animation and compositing engine for serpentine LED matrices
//
// Layers (patterns, accents, images, scrolling text, clock) are reanimated once
// per frame, read back through their scroll transform and blended into one RGB
// frame for the strip driver. Image resources load on a background tokio task
// so the render loop never blocks on I/O.

pub mod assets;
pub mod buffer;
pub mod compositor;
pub mod config;
pub mod error;
pub mod info;
pub mod layer;
pub mod loader;
pub mod math8;
pub mod output;
pub mod overlay;
pub mod patterns;
pub mod preview;
pub mod serpentine;
pub mod text;
pub mod timing;
pub mod transform;
pub mod types;

pub use buffer::PixelBuffer;
pub use compositor::{Compositor, DynamicColor};
pub use error::{EngineError, EngineResult};
pub use layer::{Layer, LayerContext, LayerKind, ThemeColor};
pub use loader::{ImageLoader, ImageSource, LoadQueue};
pub use overlay::Overlay;
pub use patterns::{Pattern, PuckManEvent};
pub use serpentine::{Heading, Serpentine};
pub use timing::{Clock, ManualClock, SystemClock};
pub use types::{Rgb, Rgba};
