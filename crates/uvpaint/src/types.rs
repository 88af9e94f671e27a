//! Core value types shared by commands, textures and the manager.

use glam::Vec4;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

/// Linear RGBA colour with components in `[0, 1]`.
pub type Rgba = [f32; 4];

/// A single colour channel of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Channel {
    #[default]
    Red = 0,
    Green = 1,
    Blue = 2,
    Alpha = 3,
}

impl Channel {
    /// Component index inside an RGBA texel.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// One-hot selector vector, used with `dot` to read this channel.
    pub fn to_vector(self) -> Vec4 {
        let mut v = Vec4::ZERO;
        v[self.index()] = 1.0;
        v
    }
}

/// Paint group. Submissions filtered by group only reach textures in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Group(pub u32);

impl From<u32> for Group {
    fn from(value: u32) -> Self {
        Group(value)
    }
}

new_key_type! {
    /// Handle to a registered [`crate::Model`].
    pub struct ModelId;
    /// Handle to a registered [`crate::PaintableTexture`].
    pub struct PaintableId;
    /// Handle to an immutable source texture in a [`crate::TextureStore`].
    pub struct TextureId;
}

#[inline]
pub(crate) fn to_vec4(color: Rgba) -> Vec4 {
    Vec4::from_array(color)
}

#[inline]
pub(crate) fn to_rgba(v: Vec4) -> Rgba {
    v.to_array()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_vector() {
        assert_eq!(Channel::Red.to_vector(), Vec4::X);
        assert_eq!(Channel::Alpha.to_vector(), Vec4::W);
        assert_eq!(Channel::Blue.index(), 2);
    }

    #[test]
    fn test_group_from_u32() {
        assert_eq!(Group::from(7), Group(7));
        assert_eq!(Group::default(), Group(0));
    }
}
