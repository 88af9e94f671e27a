//! Render targets: a paintable surface plus its mip chain and dirty tiles

mod dirty_tracking;

use std::collections::HashSet;

use glam::Vec2;
use tracing::debug;

use crate::constants::DEFAULT_TILE_SIZE;
use crate::error::PaintError;
use crate::surface::{CpuSurface, Sampler};
use crate::types::Rgba;
use crate::validation::ValidationError;

/// Tile coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

/// A surface the compositor writes into.
///
/// Mips are regenerated explicitly through [`RenderTarget::generate_mips`];
/// nothing downstream observes a half-updated chain.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub(crate) surface: CpuSurface,
    pub(crate) tile_size: u32,
    tiles_x: u32,
    tiles_y: u32,
    pub(crate) dirty_tiles: HashSet<TileCoord>,
    use_mips: bool,
    mips: Vec<CpuSurface>,
    mip_generation_count: u64,
    sampler: Sampler,
}

impl RenderTarget {
    /// Create a transparent target with the default tile size
    pub fn new(width: u32, height: u32, use_mips: bool) -> Self {
        Self::from_surface(CpuSurface::new(width, height), use_mips)
    }

    pub fn from_surface(surface: CpuSurface, use_mips: bool) -> Self {
        let tile_size = DEFAULT_TILE_SIZE;
        let tiles_x = surface.width.div_ceil(tile_size);
        let tiles_y = surface.height.div_ceil(tile_size);
        Self {
            surface,
            tile_size,
            tiles_x,
            tiles_y,
            dirty_tiles: HashSet::new(),
            use_mips,
            mips: Vec::new(),
            mip_generation_count: 0,
            sampler: Sampler::default(),
        }
    }

    /// Filter and wrap state a host samples this target with
    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// A target of the same size and mip mode, with copied contents
    pub fn duplicate_of(other: &RenderTarget) -> Self {
        let mut target = Self::from_surface(other.surface.clone(), other.use_mips).with_sampler(other.sampler);
        target.mips = other.mips.clone();
        target.mark_all_dirty();
        target
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.surface.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.surface.height
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.surface.size()
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    #[inline]
    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    #[inline]
    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    /// Get the underlying surface for direct pixel access
    #[inline]
    pub fn surface(&self) -> &CpuSurface {
        &self.surface
    }

    /// Mutable surface access. Callers mark what they touch.
    #[inline]
    pub fn surface_mut(&mut self) -> &mut CpuSurface {
        &mut self.surface
    }

    #[inline]
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// Sample the base surface by UV with this target's sampler
    pub fn sample(&self, uv: Vec2) -> Rgba {
        self.surface.sample(uv, &self.sampler)
    }

    #[inline]
    pub fn uses_mips(&self) -> bool {
        self.use_mips
    }

    /// Mip levels below the base surface (empty until generated)
    pub fn mips(&self) -> &[CpuSurface] {
        &self.mips
    }

    /// How many times the mip chain has been rebuilt
    pub fn mip_generation_count(&self) -> u64 {
        self.mip_generation_count
    }

    /// Rebuild the mip chain from the base surface. No-op without mips.
    pub fn generate_mips(&mut self) {
        if !self.use_mips {
            return;
        }
        let mut mips: Vec<CpuSurface> = Vec::new();
        loop {
            let level = mips.last().unwrap_or(&self.surface);
            if level.width <= 1 && level.height <= 1 {
                break;
            }
            let next = level.downsample();
            mips.push(next);
        }
        self.mips = mips;
        self.mip_generation_count += 1;
        debug!(
            "generate_mips: {}x{} -> {} levels",
            self.surface.width,
            self.surface.height,
            self.mips.len()
        );
    }

    /// Fill with a solid colour
    pub fn fill(&mut self, color: Rgba) {
        self.surface.clear(color);
        self.mark_all_dirty();
    }

    /// Overwrite contents with a surface of the same size
    pub fn copy_from(&mut self, source: &CpuSurface) -> Result<(), ValidationError> {
        self.surface.copy_from(source)?;
        self.mark_all_dirty();
        Ok(())
    }

    /// Replace the surface wholesale, possibly changing size
    pub fn replace_surface(&mut self, surface: CpuSurface) {
        let use_mips = self.use_mips;
        let count = self.mip_generation_count;
        let sampler = self.sampler;
        *self = Self::from_surface(surface, use_mips).with_sampler(sampler);
        self.mip_generation_count = count;
        self.mark_all_dirty();
    }

    /// Snapshot copy that reports allocation failure
    pub fn try_snapshot(&self) -> Result<CpuSurface, PaintError> {
        self.surface.try_clone()
    }
}
