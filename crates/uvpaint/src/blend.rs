//! Blend modes: the sixteen compositing kernels a command can select
//!
//! A [`BlendMode`] is an immutable value. Its index picks the kernel and its
//! channel weights scale how far each RGBA component moves toward the
//! kernel's result: `out = dst + (kernel(dst, src) - dst) * channels`.

use glam::{Vec2, Vec3, Vec4};

use crate::constants::BLEND_MODE_COUNT;
use crate::surface::CpuSurface;
use crate::texture::TextureStore;
use crate::types::{TextureId, to_vec4};
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendMode {
    index: u8,
    channels: Vec4,
    color: Vec4,
    texture: Option<TextureId>,
}

impl BlendMode {
    pub const ALPHA_BLEND: u8 = 0;
    pub const ALPHA_BLEND_INVERSE: u8 = 1;
    pub const PREMULTIPLIED: u8 = 2;
    pub const ADDITIVE: u8 = 3;
    pub const ADDITIVE_SOFT: u8 = 4;
    pub const SUBTRACTIVE: u8 = 5;
    pub const SUBTRACTIVE_SOFT: u8 = 6;
    pub const REPLACE: u8 = 7;
    pub const REPLACE_ORIGINAL: u8 = 8;
    pub const REPLACE_CUSTOM: u8 = 9;
    pub const MULTIPLY_INVERSE_RGB: u8 = 10;
    pub const BLUR: u8 = 11;
    pub const NORMAL_BLEND: u8 = 12;
    pub const NORMAL_REPLACE: u8 = 13;
    pub const MULTIPLY: u8 = 14;
    pub const ERASE: u8 = 15;

    /// Build from a raw kernel index
    pub fn from_index(index: u8, channels: Vec4) -> Result<Self, ValidationError> {
        if index >= BLEND_MODE_COUNT {
            return Err(ValidationError::BlendIndex(index));
        }
        Ok(Self::with_index(index, channels))
    }

    const fn with_index(index: u8, channels: Vec4) -> Self {
        Self {
            index,
            channels,
            color: Vec4::ONE,
            texture: None,
        }
    }

    pub const fn alpha_blend(channels: Vec4) -> Self {
        Self::with_index(Self::ALPHA_BLEND, channels)
    }

    pub const fn alpha_blend_inverse(channels: Vec4) -> Self {
        Self::with_index(Self::ALPHA_BLEND_INVERSE, channels)
    }

    pub const fn premultiplied(channels: Vec4) -> Self {
        Self::with_index(Self::PREMULTIPLIED, channels)
    }

    pub const fn additive(channels: Vec4) -> Self {
        Self::with_index(Self::ADDITIVE, channels)
    }

    pub const fn additive_soft(channels: Vec4) -> Self {
        Self::with_index(Self::ADDITIVE_SOFT, channels)
    }

    pub const fn subtractive(channels: Vec4) -> Self {
        Self::with_index(Self::SUBTRACTIVE, channels)
    }

    pub const fn subtractive_soft(channels: Vec4) -> Self {
        Self::with_index(Self::SUBTRACTIVE_SOFT, channels)
    }

    pub const fn replace(channels: Vec4) -> Self {
        Self::with_index(Self::REPLACE, channels)
    }

    /// Restores the receiving texture's own base colour and texture.
    /// The colour and texture are bound when the command is submitted.
    pub const fn replace_original(channels: Vec4) -> Self {
        Self::with_index(Self::REPLACE_ORIGINAL, channels)
    }

    pub const fn replace_custom(color: Vec4, texture: Option<TextureId>, channels: Vec4) -> Self {
        Self {
            index: Self::REPLACE_CUSTOM,
            channels,
            color,
            texture,
        }
    }

    pub const fn multiply_inverse_rgb(channels: Vec4) -> Self {
        Self::with_index(Self::MULTIPLY_INVERSE_RGB, channels)
    }

    pub const fn blur(channels: Vec4) -> Self {
        Self::with_index(Self::BLUR, channels)
    }

    pub const fn normal_blend(channels: Vec4) -> Self {
        Self::with_index(Self::NORMAL_BLEND, channels)
    }

    pub const fn normal_replace(channels: Vec4) -> Self {
        Self::with_index(Self::NORMAL_REPLACE, channels)
    }

    pub const fn multiply(channels: Vec4) -> Self {
        Self::with_index(Self::MULTIPLY, channels)
    }

    pub const fn erase(channels: Vec4) -> Self {
        Self::with_index(Self::ERASE, channels)
    }

    /// Copy with the original colour/texture bound
    pub fn with_original(self, color: Vec4, texture: Option<TextureId>) -> Self {
        Self {
            color,
            texture,
            ..self
        }
    }

    #[inline]
    pub fn index(&self) -> u8 {
        self.index
    }

    #[inline]
    pub fn channels(&self) -> Vec4 {
        self.channels
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    /// Kernels that sample neighbouring texels need the pre-command image
    pub fn requires_double_buffer(&self) -> bool {
        self.index == Self::BLUR
    }

    pub fn name(&self) -> &'static str {
        match self.index {
            Self::ALPHA_BLEND => "Alpha Blend",
            Self::ALPHA_BLEND_INVERSE => "Alpha Blend Inverse",
            Self::PREMULTIPLIED => "Premultiplied",
            Self::ADDITIVE => "Additive",
            Self::ADDITIVE_SOFT => "Additive Soft",
            Self::SUBTRACTIVE => "Subtractive",
            Self::SUBTRACTIVE_SOFT => "Subtractive Soft",
            Self::REPLACE => "Replace",
            Self::REPLACE_ORIGINAL => "Replace Original",
            Self::REPLACE_CUSTOM => "Replace Custom",
            Self::MULTIPLY_INVERSE_RGB => "Multiply Inverse RGB",
            Self::BLUR => "Blur",
            Self::NORMAL_BLEND => "Normal Blend",
            Self::NORMAL_REPLACE => "Normal Replace",
            Self::MULTIPLY => "Multiply",
            _ => "Erase",
        }
    }

    /// Composite one texel. Result components are clamped to [0, 1].
    pub fn composite(&self, sample: &BlendSample<'_>) -> Vec4 {
        let dst = sample.dst;
        let result = self.kernel(sample);
        (dst + (result - dst) * self.channels).clamp(Vec4::ZERO, Vec4::ONE)
    }

    fn kernel(&self, sample: &BlendSample<'_>) -> Vec4 {
        let BlendSample {
            dst, src, strength, ..
        } = *sample;
        let alpha = (src.w * strength).clamp(0.0, 1.0);

        match self.index {
            Self::ALPHA_BLEND => {
                let rgb = dst.truncate().lerp(src.truncate(), alpha);
                rgb.extend(dst.w + (1.0 - dst.w) * alpha)
            }
            Self::ALPHA_BLEND_INVERSE => {
                // Paint behind: existing coverage shields the new colour
                let behind = alpha * (1.0 - dst.w);
                let rgb = dst.truncate().lerp(src.truncate(), behind);
                rgb.extend(dst.w + (1.0 - dst.w) * alpha)
            }
            Self::PREMULTIPLIED => {
                let s = src * strength;
                s + dst * (1.0 - s.w)
            }
            Self::ADDITIVE => dst + src * strength,
            Self::ADDITIVE_SOFT => dst + src * strength * (Vec4::ONE - dst),
            Self::SUBTRACTIVE => dst - src * strength,
            Self::SUBTRACTIVE_SOFT => dst - src * strength * dst,
            Self::REPLACE => dst.lerp(src, strength),
            Self::REPLACE_ORIGINAL | Self::REPLACE_CUSTOM => {
                let original = self.original_at(sample.uv, sample.textures);
                dst.lerp(original, strength)
            }
            Self::MULTIPLY_INVERSE_RGB => {
                let rgb = dst.truncate() * (Vec3::ONE - src.truncate() * alpha);
                rgb.extend(dst.w)
            }
            Self::BLUR => match sample.buffer {
                Some(buffer) => dst.lerp(box_blur(buffer, sample.x, sample.y), strength),
                None => dst,
            },
            Self::NORMAL_BLEND => {
                let nd = unpack_normal(dst);
                let ns = unpack_normal(src);
                let n = Vec3::new(nd.x + ns.x * alpha, nd.y + ns.y * alpha, nd.z);
                pack_normal(n).extend(dst.w)
            }
            Self::NORMAL_REPLACE => {
                let n = unpack_normal(dst).lerp(unpack_normal(src), alpha);
                pack_normal(n).extend(dst.w)
            }
            Self::MULTIPLY => dst.lerp(dst * src, strength),
            _ => dst * (1.0 - alpha),
        }
    }

    fn original_at(&self, uv: Vec2, textures: &TextureStore) -> Vec4 {
        let base = self
            .texture
            .and_then(|id| textures.sample(id, uv))
            .map(to_vec4)
            .unwrap_or(Vec4::ONE);
        base * self.color
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        Self::alpha_blend(Vec4::ONE)
    }
}

/// Inputs for compositing one texel
#[derive(Clone, Copy)]
pub struct BlendSample<'a> {
    /// Current destination value
    pub dst: Vec4,
    /// Command source colour
    pub src: Vec4,
    /// Coverage after shape, falloff and masks (0..1)
    pub strength: f32,
    pub uv: Vec2,
    pub x: u32,
    pub y: u32,
    /// Pre-command image for double-buffered commands
    pub buffer: Option<&'a CpuSurface>,
    pub textures: &'a TextureStore,
}

fn box_blur(buffer: &CpuSurface, x: u32, y: u32) -> Vec4 {
    let mut sum = Vec4::ZERO;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += buffer.texel_clamped(x as i64 + dx, y as i64 + dy);
        }
    }
    sum / 9.0
}

#[inline]
fn unpack_normal(c: Vec4) -> Vec3 {
    c.truncate() * 2.0 - Vec3::ONE
}

#[inline]
fn pack_normal(n: Vec3) -> Vec3 {
    n.normalize_or(Vec3::Z) * 0.5 + Vec3::splat(0.5)
}
