//! Whole-texture replacement from source textures

use glam::Vec4;

use super::{Shade, TexelShader};
use crate::mesh::Texel;
use crate::texture::TextureStore;
use crate::types::{TextureId, to_vec4};

/// Replace every texel with `texture * color`. A missing texture reads white.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceCommand {
    pub texture: Option<TextureId>,
    pub color: Vec4,
}

impl TexelShader for ReplaceCommand {
    fn shade(&self, texel: &Texel, textures: &TextureStore) -> Option<Shade> {
        let base = match self.texture {
            Some(id) => to_vec4(textures.sample(id, texel.uv)?),
            None => Vec4::ONE,
        };
        Some(Shade {
            color: base * self.color,
            strength: 1.0,
            minimum: 0.0,
        })
    }
}

/// Build each output channel from a dot product of one source texture
/// with a channel selector, e.g. packing separate masks into one texture.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceChannelsCommand {
    /// Source per output channel (R, G, B, A). A missing texture reads white.
    pub textures: [Option<TextureId>; 4],
    pub channels: [Vec4; 4],
}

impl TexelShader for ReplaceChannelsCommand {
    fn shade(&self, texel: &Texel, textures: &TextureStore) -> Option<Shade> {
        let mut color = Vec4::ZERO;
        for c in 0..4 {
            let source = match self.textures[c] {
                Some(id) => to_vec4(textures.sample(id, texel.uv)?),
                None => Vec4::ONE,
            };
            color[c] = source.dot(self.channels[c]);
        }
        Some(Shade {
            color,
            strength: 1.0,
            minimum: 0.0,
        })
    }
}
