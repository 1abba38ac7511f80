//! Packed framebuffers, polygon parsing, the fixed-point rasterizer, and
//! palette handling (spec §4.7).

pub mod framebuffer;
pub mod palette;
pub mod polygon;
pub mod rasterizer;
pub mod video;

pub use framebuffer::{DrawOperation, Framebuffer, BUFFER_SIZE, HEIGHT, WIDTH};
pub use palette::{Palette, PaletteError, Rgba, COLOR_COUNT, PALETTE_COUNT};
pub use polygon::{Polygon, PolygonError, MAX_POLYGON_VERTICES};
pub use rasterizer::{RasterizerError, PRECOMPUTED_SLOPE_COUNT};
pub use video::{Video, VideoError, BACK_BUFFER_ID, BUFFER_COUNT, FRONT_BUFFER_ID};
