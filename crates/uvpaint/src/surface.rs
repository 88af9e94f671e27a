//! CPU surface backing render targets, snapshots and source textures

use glam::{Vec2, Vec4};
use uvpaint_config::{FilterMode, WrapMode};

use crate::error::PaintError;
use crate::types::{Rgba, to_rgba, to_vec4};
use crate::validation::{ValidationError, validate_pixel_len, validate_same_size};

/// Filter and wrap state used when sampling a surface by UV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sampler {
    pub filter: FilterMode,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
}

impl Sampler {
    pub const POINT_CLAMP: Sampler = Sampler {
        filter: FilterMode::Point,
        wrap_u: WrapMode::Clamp,
        wrap_v: WrapMode::Clamp,
    };

    pub const BILINEAR_CLAMP: Sampler = Sampler {
        filter: FilterMode::Bilinear,
        wrap_u: WrapMode::Clamp,
        wrap_v: WrapMode::Clamp,
    };
}

/// An RGBA CPU surface.
/// Stores pixels as [f32; 4] in row-major order, row 0 at the top (v = 1).
#[derive(Debug, Clone, PartialEq)]
pub struct CpuSurface {
    /// Surface dimensions
    pub width: u32,
    pub height: u32,
    pixels: Vec<[f32; 4]>,
}

impl CpuSurface {
    /// Create a new surface with the given dimensions, initialized to transparent black
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0.0, 0.0, 0.0, 0.0])
    }

    /// Create a surface cleared to `color`
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: vec![color; pixel_count],
        }
    }

    /// Wrap an existing texel buffer
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgba>) -> Result<Self, ValidationError> {
        validate_pixel_len((width as usize) * (height as usize), pixels.len())?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build a surface from tightly packed RGBA8 bytes
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, ValidationError> {
        validate_pixel_len((width as usize) * (height as usize) * 4, bytes.len())?;
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| {
                [
                    c[0] as f32 / 255.0,
                    c[1] as f32 / 255.0,
                    c[2] as f32 / 255.0,
                    c[3] as f32 / 255.0,
                ]
            })
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Quantize to RGBA8, the persisted pixel format
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| p.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect()
    }

    /// Clone into a buffer allocated with `try_reserve`, so snapshot
    /// allocation failure is reported instead of aborting.
    pub fn try_clone(&self) -> Result<Self, PaintError> {
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(self.pixels.len())?;
        pixels.extend_from_slice(&self.pixels);
        Ok(Self {
            width: self.width,
            height: self.height,
            pixels,
        })
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Clear the surface to a solid color
    pub fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    /// Get a pixel at the given coordinates
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[self.index(x, y)])
    }

    /// Set a pixel at the given coordinates
    /// Does nothing if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index(x, y);
        self.pixels[index] = color;
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Copy every texel from a surface of the same size
    pub fn copy_from(&mut self, other: &CpuSurface) -> Result<(), ValidationError> {
        validate_same_size(self.size(), other.size())?;
        self.pixels.copy_from_slice(&other.pixels);
        Ok(())
    }

    /// Resample to a new size through `sampler`
    pub fn resized(&self, width: u32, height: u32, sampler: &Sampler) -> CpuSurface {
        if self.size() == (width, height) {
            return self.clone();
        }
        let mut out = CpuSurface::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let uv = texel_uv(x, y, width, height);
                out.set_pixel(x, y, self.sample(uv, sampler));
            }
        }
        out
    }

    /// Next mip level: 2x2 box filter, odd edges clamp
    pub fn downsample(&self) -> CpuSurface {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut out = CpuSurface::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let x0 = (x * 2).min(self.width - 1);
                let y0 = (y * 2).min(self.height - 1);
                let x1 = (x0 + 1).min(self.width - 1);
                let y1 = (y0 + 1).min(self.height - 1);
                let sum = to_vec4(self.pixels[self.index(x0, y0)])
                    + to_vec4(self.pixels[self.index(x1, y0)])
                    + to_vec4(self.pixels[self.index(x0, y1)])
                    + to_vec4(self.pixels[self.index(x1, y1)]);
                out.set_pixel(x, y, to_rgba(sum * 0.25));
            }
        }
        out
    }

    /// Sample by UV with the given filter and wrap modes
    pub fn sample(&self, uv: Vec2, sampler: &Sampler) -> Rgba {
        if self.pixels.is_empty() {
            return [0.0; 4];
        }
        let fx = uv.x * self.width as f32;
        let fy = (1.0 - uv.y) * self.height as f32;
        match sampler.filter {
            FilterMode::Point => {
                let x = wrap(fx.floor() as i64, self.width, sampler.wrap_u);
                let y = wrap(fy.floor() as i64, self.height, sampler.wrap_v);
                self.pixels[self.index(x, y)]
            }
            FilterMode::Bilinear => {
                let fx = fx - 0.5;
                let fy = fy - 0.5;
                let x0 = fx.floor();
                let y0 = fy.floor();
                let tx = fx - x0;
                let ty = fy - y0;
                let xa = wrap(x0 as i64, self.width, sampler.wrap_u);
                let xb = wrap(x0 as i64 + 1, self.width, sampler.wrap_u);
                let ya = wrap(y0 as i64, self.height, sampler.wrap_v);
                let yb = wrap(y0 as i64 + 1, self.height, sampler.wrap_v);
                let top = to_vec4(self.pixels[self.index(xa, ya)])
                    .lerp(to_vec4(self.pixels[self.index(xb, ya)]), tx);
                let bottom = to_vec4(self.pixels[self.index(xa, yb)])
                    .lerp(to_vec4(self.pixels[self.index(xb, yb)]), tx);
                to_rgba(top.lerp(bottom, ty))
            }
        }
    }

    /// Read a texel as a vector, clamping coordinates to the edges
    #[inline]
    pub fn texel_clamped(&self, x: i64, y: i64) -> Vec4 {
        let x = wrap(x, self.width, WrapMode::Clamp);
        let y = wrap(y, self.height, WrapMode::Clamp);
        to_vec4(self.pixels[self.index(x, y)])
    }

    /// Get raw pixel data for GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Get the total number of pixels
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Get direct access to pixel data (for advanced operations)
    #[inline]
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    /// Get mutable access to pixel data (for advanced operations)
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [[f32; 4]] {
        &mut self.pixels
    }
}

/// UV of the centre of texel (x, y) on a `width` x `height` surface
#[inline]
pub fn texel_uv(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32,
        1.0 - (y as f32 + 0.5) / height as f32,
    )
}

fn wrap(coord: i64, size: u32, mode: WrapMode) -> u32 {
    let size = size as i64;
    let wrapped = match mode {
        WrapMode::Repeat => coord.rem_euclid(size),
        WrapMode::Clamp => coord.clamp(0, size - 1),
        WrapMode::Mirror => {
            let m = coord.rem_euclid(size * 2);
            if m >= size { size * 2 - 1 - m } else { m }
        }
    };
    wrapped as u32
}
