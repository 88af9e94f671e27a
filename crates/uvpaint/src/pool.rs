//! Scratch surface pool for double-buffered compositing

use std::collections::HashMap;

use tracing::debug;

use crate::constants::BYTES_PER_TEXEL;
use crate::surface::CpuSurface;

/// Key for pooled surfaces: (width, height).
type PoolKey = (u32, u32);

/// Recycles scratch surfaces between flushes.
///
/// Every acquire must be paired with a release; [`ScratchSlot`] does the
/// pairing automatically so skipped commands cannot leak a surface.
#[derive(Debug)]
pub struct ScratchPool {
    pool: HashMap<PoolKey, Vec<CpuSurface>>,
    /// Maximum number of surfaces to keep per key.
    max_per_key: usize,
    outstanding: usize,
    allocations: u64,
}

impl ScratchPool {
    pub fn new(max_per_key: usize) -> Self {
        Self {
            pool: HashMap::new(),
            max_per_key,
            outstanding: 0,
            allocations: 0,
        }
    }

    /// Take a surface of the given size, recycled when possible.
    /// Contents are unspecified.
    pub fn acquire(&mut self, width: u32, height: u32) -> CpuSurface {
        self.outstanding += 1;
        match self.pool.get_mut(&(width, height)).and_then(|v| v.pop()) {
            Some(surface) => surface,
            None => {
                self.allocations += 1;
                debug!("ScratchPool: allocating {}x{} scratch surface", width, height);
                CpuSurface::new(width, height)
            }
        }
    }

    /// Return a surface. If the pool is full for this size it is dropped.
    pub fn release(&mut self, surface: CpuSurface) {
        assert!(
            self.outstanding > 0,
            "scratch surface released more times than acquired"
        );
        self.outstanding -= 1;
        let entry = self.pool.entry(surface.size()).or_default();
        if entry.len() < self.max_per_key {
            entry.push(surface);
        }
    }

    /// Scoped acquisition; the surface is acquired lazily and released on drop
    pub fn scoped(&mut self) -> ScratchSlot<'_> {
        ScratchSlot {
            pool: self,
            surface: None,
        }
    }

    /// Surfaces currently handed out
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Fresh allocations made since creation
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Total number of surfaces currently in the pool.
    pub fn pooled_count(&self) -> usize {
        self.pool.values().map(|v| v.len()).sum()
    }

    /// Approximate memory held by pooled surfaces (bytes).
    pub fn pooled_memory_bytes(&self) -> usize {
        self.pool
            .iter()
            .map(|((w, h), surfaces)| (*w as usize) * (*h as usize) * BYTES_PER_TEXEL * surfaces.len())
            .sum()
    }

    /// Drop all pooled surfaces
    pub fn clear(&mut self) {
        self.pool.clear();
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new(uvpaint_config::DEFAULT_SCRATCH_MAX_PER_KEY)
    }
}

/// A scratch surface borrowed for one batch
pub struct ScratchSlot<'a> {
    pool: &'a mut ScratchPool,
    surface: Option<CpuSurface>,
}

impl ScratchSlot<'_> {
    /// Copy `source` into the scratch surface, acquiring it on first use
    pub fn blit_from(&mut self, source: &CpuSurface) -> &CpuSurface {
        if matches!(&self.surface, Some(s) if s.size() != source.size()) {
            if let Some(old) = self.surface.take() {
                self.pool.release(old);
            }
        }
        let pool = &mut *self.pool;
        let scratch = self
            .surface
            .get_or_insert_with(|| pool.acquire(source.width, source.height));
        scratch.pixels_mut().copy_from_slice(source.pixels());
        scratch
    }

    /// The scratch surface, if one has been blitted this batch
    pub fn get(&self) -> Option<&CpuSurface> {
        self.surface.as_ref()
    }

    pub fn is_acquired(&self) -> bool {
        self.surface.is_some()
    }
}

impl Drop for ScratchSlot<'_> {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.take() {
            self.pool.release(surface);
        }
    }
}
