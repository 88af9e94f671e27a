//! Direct texture (re)initialization, outside the command queues

use std::io::Cursor;

use glam::{Vec3, Vec4};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use tracing::{debug, info};
use uvpaint_config::ConversionMode;

use crate::error::PaintError;
use crate::surface::{CpuSurface, texel_uv};
use crate::texture::{Texture, TextureStore};
use crate::types::{TextureId, to_rgba, to_vec4};
use crate::validation::validate_dimensions;

use super::PaintableTexture;

impl PaintableTexture {
    /// Overwrite `current` with `texture * tint` (or `tint` alone) without
    /// resizing, applying the configured conversion.
    pub fn clear(
        &mut self,
        textures: &TextureStore,
        texture: Option<TextureId>,
        tint: Vec4,
    ) -> Result<(), PaintError> {
        let source = texture.map(|id| textures.require(id)).transpose()?;
        self.clear_from(source, tint, true)
    }

    pub(crate) fn clear_without_mips(
        &mut self,
        textures: &TextureStore,
        texture: Option<TextureId>,
        tint: Vec4,
    ) -> Result<(), PaintError> {
        let source = texture.map(|id| textures.require(id)).transpose()?;
        self.clear_from(source, tint, false)
    }

    fn clear_from(&mut self, source: Option<&Texture>, tint: Vec4, update_mips: bool) -> Result<(), PaintError> {
        let conversion = self.config.conversion;
        let current = self.current.as_mut().ok_or(PaintError::NotActivated)?;
        paint_base(current.surface_mut(), source, tint, conversion);
        current.mark_all_dirty();
        if update_mips {
            current.generate_mips();
        }
        Ok(())
    }

    /// Resize to the texture's size (or the configured size), then clear
    pub fn replace(
        &mut self,
        textures: &TextureStore,
        texture: Option<TextureId>,
        tint: Vec4,
    ) -> Result<(), PaintError> {
        let source = texture.map(|id| textures.require(id)).transpose()?;
        let (width, height) = source.map_or((self.config.width, self.config.height), |t| {
            (t.width(), t.height())
        });
        self.resize(width, height, false)?;
        self.clear_from(source, tint, true)
    }

    /// Change the size of `current`, optionally resampling its contents.
    /// Returns whether the size changed.
    pub fn resize(&mut self, width: u32, height: u32, copy_contents: bool) -> Result<bool, PaintError> {
        validate_dimensions(width, height, self.max_texture_size)?;
        let current = self.current.as_mut().ok_or(PaintError::NotActivated)?;
        if current.size() == (width, height) {
            return Ok(false);
        }

        let surface = if copy_contents {
            current.surface().resized(width, height, current.sampler())
        } else {
            CpuSurface::new(width, height)
        };
        let (old_width, old_height) = current.size();
        current.replace_surface(surface);
        if copy_contents {
            current.generate_mips();
        }
        self.preview = None;

        debug!(
            "PaintableTexture: resized {}x{} -> {}x{}",
            old_width, old_height, width, height
        );
        Ok(true)
    }

    /// Swap in a stored surface wholesale, taking its size
    pub(crate) fn replace_surface(&mut self, surface: CpuSurface) {
        if let Some(current) = self.current.as_mut() {
            current.replace_surface(surface);
            current.generate_mips();
        }
        self.preview = None;
    }

    /// Copy of the committed pixels. An inactive texture reports what it
    /// would clear to on activation.
    pub fn readable_copy(&self, textures: &TextureStore) -> Result<CpuSurface, PaintError> {
        if let Some(current) = self.current.as_ref() {
            return current.surface().try_clone();
        }
        let source = self
            .base_texture
            .map(|id| textures.require(id))
            .transpose()?;
        let mut surface = CpuSurface::new(self.config.width, self.config.height);
        paint_base(&mut surface, source, Vec4::from(self.config.color), ConversionMode::None);
        Ok(surface)
    }

    /// Committed pixels encoded as PNG
    pub fn png_data(&self, textures: &TextureStore) -> Result<Vec<u8>, PaintError> {
        let surface = self.readable_copy(textures)?;
        let mut bytes = Vec::new();
        PngEncoder::new(Cursor::new(&mut bytes)).write_image(
            &surface.to_rgba8(),
            surface.width,
            surface.height,
            ExtendedColorType::Rgba8,
        )?;
        Ok(bytes)
    }

    /// Replace `current` with decoded PNG data. With `allow_resize` the
    /// texture takes the image's size; otherwise the image is resampled.
    /// Empty input is ignored.
    pub fn load_from_png(&mut self, data: &[u8], allow_resize: bool) -> Result<(), PaintError> {
        if data.is_empty() {
            return Ok(());
        }
        if !self.activated {
            return Err(PaintError::NotActivated);
        }

        let image = image::load_from_memory_with_format(data, ImageFormat::Png)?.to_rgba8();
        let (width, height) = image.dimensions();
        let surface = CpuSurface::from_rgba8(width, height, image.as_raw())?;
        let loaded = Texture::new(surface, self.sampler());

        if allow_resize {
            self.resize(width, height, false)?;
        }
        self.clear_from(Some(&loaded), Vec4::ONE, true)?;
        info!("PaintableTexture: loaded {}x{} PNG", width, height);
        Ok(())
    }
}

/// Fill every texel with the base colour for `conversion`
fn paint_base(surface: &mut CpuSurface, source: Option<&Texture>, tint: Vec4, conversion: ConversionMode) {
    let (width, height) = surface.size();
    for (i, pixel) in surface.pixels_mut().iter_mut().enumerate() {
        let x = (i % width as usize) as u32;
        let y = (i / width as usize) as u32;
        let base = source.map(|t| to_vec4(t.sample(texel_uv(x, y, width, height))));
        *pixel = to_rgba(convert(base, tint, conversion));
    }
}

fn convert(base: Option<Vec4>, tint: Vec4, conversion: ConversionMode) -> Vec4 {
    match conversion {
        ConversionMode::None => base.unwrap_or(Vec4::ONE) * tint,
        ConversionMode::Premultiply => {
            let c = base.unwrap_or(Vec4::ONE) * tint;
            (c.truncate() * c.w).extend(c.w)
        }
        // Repack as a unit tangent-space normal; no source means flat
        ConversionMode::Normal => match base {
            Some(packed) => {
                let n = (packed.truncate() * 2.0 - Vec3::ONE).normalize_or(Vec3::Z);
                (n * 0.5 + Vec3::splat(0.5)).extend(1.0)
            }
            None => Vec4::new(0.5, 0.5, 1.0, 1.0),
        },
    }
}
