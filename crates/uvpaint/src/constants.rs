//! Constants shared across the paint core.

/// Tile edge used for dirty tracking on render targets.
pub const DEFAULT_TILE_SIZE: u32 = 128;

/// Number of compositing kernels a [`crate::BlendMode`] index can select.
pub const BLEND_MODE_COUNT: u8 = 16;

/// One 8-bit colour level. Gradual fades step in multiples of this.
pub const COLOR_STEP: f32 = 1.0 / 255.0;

/// Bytes used by one RGBA f32 texel.
pub const BYTES_PER_TEXEL: usize = 16;

/// Tolerance for barycentric edge tests when rasterizing in UV space.
pub const RASTER_EPSILON: f32 = 1.0e-5;
