//! Full-surface fill

use glam::Vec4;

use super::{Shade, TexelShader};
use crate::mesh::Texel;
use crate::texture::TextureStore;
use crate::types::{TextureId, to_vec4};

#[derive(Debug, Clone, PartialEq)]
pub struct FillCommand {
    pub color: Vec4,
    /// Optional texture multiplied into the colour
    pub texture: Option<TextureId>,
    pub opacity: f32,
    /// Smallest step each changed channel takes toward the full result
    pub minimum: f32,
}

impl FillCommand {
    pub fn new(color: Vec4, opacity: f32) -> Self {
        Self {
            color,
            texture: None,
            opacity,
            minimum: 0.0,
        }
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_minimum(mut self, minimum: f32) -> Self {
        self.minimum = minimum;
        self
    }
}

impl TexelShader for FillCommand {
    fn shade(&self, texel: &Texel, textures: &TextureStore) -> Option<Shade> {
        let mut color = self.color;
        if let Some(id) = self.texture {
            color *= to_vec4(textures.sample(id, texel.uv)?);
        }
        Some(Shade {
            color,
            strength: self.opacity,
            minimum: self.minimum,
        })
    }
}

/// Push each channel that moved at least `minimum` toward `full`
/// (or all the way, if `full` is closer than that).
pub fn enforce_minimum(dst: Vec4, out: Vec4, full: Vec4, minimum: f32) -> Vec4 {
    if minimum <= 0.0 {
        return out;
    }
    let mut result = out;
    for c in 0..4 {
        let full_delta = full[c] - dst[c];
        if full_delta == 0.0 {
            continue;
        }
        let need = minimum.min(full_delta.abs());
        if (out[c] - dst[c]).abs() < need {
            result[c] = dst[c] + need * full_delta.signum();
        }
    }
    result
}
