//! Immutable source textures sampled by commands

use glam::Vec2;
use tracing::debug;

use crate::error::PaintError;
use crate::registry::Registry;
use crate::surface::{CpuSurface, Sampler};
use crate::types::{Rgba, TextureId};

/// A read-only texture: pixels plus sampler state
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    surface: CpuSurface,
    sampler: Sampler,
    mip_maps: bool,
}

impl Texture {
    pub fn new(surface: CpuSurface, sampler: Sampler) -> Self {
        Self {
            surface,
            sampler,
            mip_maps: false,
        }
    }

    /// Mark the texture as carrying mips. Paintable textures in
    /// `MipMode::Auto` copy this flag.
    pub fn with_mips(mut self, mip_maps: bool) -> Self {
        self.mip_maps = mip_maps;
        self
    }

    pub fn width(&self) -> u32 {
        self.surface.width
    }

    pub fn height(&self) -> u32 {
        self.surface.height
    }

    pub fn surface(&self) -> &CpuSurface {
        &self.surface
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn has_mips(&self) -> bool {
        self.mip_maps
    }

    #[inline]
    pub fn sample(&self, uv: Vec2) -> Rgba {
        self.surface.sample(uv, &self.sampler)
    }
}

/// Owns every source texture the commands refer to
#[derive(Debug, Default)]
pub struct TextureStore {
    textures: Registry<TextureId, Texture>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, texture: Texture) -> TextureId {
        let id = self.textures.insert(texture);
        debug!("TextureStore: inserted {:?}", id);
        id
    }

    /// Swap the pixels behind an existing id
    pub fn replace(&mut self, id: TextureId, texture: Texture) -> Result<(), PaintError> {
        let slot = self
            .textures
            .get_mut(id)
            .ok_or(PaintError::MissingTexture(id))?;
        *slot = texture;
        Ok(())
    }

    pub fn remove(&mut self, id: TextureId) -> Option<Texture> {
        self.textures.remove(id)
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id)
    }

    /// Look up a texture, reporting a configuration error when missing
    pub fn require(&self, id: TextureId) -> Result<&Texture, PaintError> {
        self.get(id).ok_or(PaintError::MissingTexture(id))
    }

    pub fn sample(&self, id: TextureId, uv: Vec2) -> Option<Rgba> {
        self.get(id).map(|t| t.sample(uv))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
