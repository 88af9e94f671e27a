//! Box-projected decal

use glam::{Mat3, Quat, Vec2, Vec3, Vec4};

use super::shape::{Extrusion, PreparedMask, TileLayer, WorldMask, calculate_hardness_falloff};
use super::{Shade, TexelShader};
use crate::mesh::Texel;
use crate::texture::TextureStore;
use crate::types::{TextureId, to_vec4};

#[derive(Debug, Clone, PartialEq)]
pub struct DecalCommand {
    /// Sample world positions; when false the texel UV is the position
    pub in_3d: bool,
    pub extrusion: Extrusion,
    /// Rotation and half-extents of the decal box
    pub matrix: Mat3,
    pub color: Vec4,
    pub opacity: f32,
    pub hardness: f32,
    /// Colour texture stretched over the decal
    pub texture: Option<TextureId>,
    /// Shape texture; none paints the whole box
    pub shape: Option<TextureId>,
    pub shape_channel: Vec4,
    /// How far paint wraps around front faces (1 = every front face)
    pub normal_front: f32,
    /// How far paint reaches onto back faces (0 = none)
    pub normal_back: f32,
    pub normal_fade: f32,
    pub tile: Option<TileLayer>,
    pub mask: Option<WorldMask>,
}

impl DecalCommand {
    pub fn new(position: Vec3, size: Vec3) -> Self {
        Self {
            in_3d: true,
            extrusion: Extrusion::Point(position),
            matrix: Mat3::from_diagonal(size),
            color: Vec4::ONE,
            opacity: 1.0,
            hardness: 1.0,
            texture: None,
            shape: None,
            shape_channel: Vec4::W,
            normal_front: 1.0,
            normal_back: 0.0,
            normal_fade: 0.01,
            tile: None,
            mask: None,
        }
    }

    /// Orientation and size. In 2D only the roll angle applies.
    pub fn set_shape(&mut self, rotation: Quat, size: Vec3, angle: f32) {
        let roll = Quat::from_rotation_z(angle);
        let rotation = if self.in_3d { rotation * roll } else { roll };
        self.matrix = Mat3::from_quat(rotation) * Mat3::from_diagonal(size);
    }

    pub fn set_location(&mut self, extrusion: Extrusion, in_3d: bool) {
        self.in_3d = in_3d;
        self.extrusion = extrusion;
    }

    pub fn set_color(&mut self, color: Vec4, opacity: f32, hardness: f32) {
        self.color = color;
        self.opacity = opacity;
        self.hardness = hardness;
    }

    pub fn set_normal_limits(&mut self, front: f32, back: f32, fade: f32) {
        self.normal_front = front;
        self.normal_back = back;
        self.normal_fade = fade;
    }

    /// Squash the box width so a non-square shape keeps its aspect ratio
    pub fn apply_aspect(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let scale = if width > height {
            height as f32 / width as f32
        } else {
            width as f32 / height as f32
        };
        self.matrix.x_axis *= scale;
    }

    /// Projection direction (box +Z)
    pub fn direction(&self) -> Vec3 {
        (self.matrix * Vec3::Z).normalize_or_zero()
    }

    pub(super) fn textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.texture
            .into_iter()
            .chain(self.shape)
            .chain(self.tile.map(|t| t.texture))
            .chain(self.mask.map(|m| m.texture))
    }

    pub(super) fn shader(&self) -> DecalShader<'_> {
        DecalShader {
            decal: self,
            inverse: self.matrix.inverse(),
            direction: self.direction(),
            mask: self.mask.map(|m| m.prepare()),
        }
    }

    fn facing_weight(&self, facing: f32) -> f32 {
        let fade = self.normal_fade.max(1.0e-4);
        if facing >= 0.0 {
            let threshold = 1.0 - self.normal_front;
            ((facing - threshold + fade) / fade).clamp(0.0, 1.0)
        } else {
            ((self.normal_back + fade + facing) / fade).clamp(0.0, 1.0)
        }
    }
}

pub(crate) struct DecalShader<'a> {
    decal: &'a DecalCommand,
    inverse: Mat3,
    direction: Vec3,
    mask: Option<PreparedMask>,
}

impl TexelShader for DecalShader<'_> {
    fn shade(&self, texel: &Texel, textures: &TextureStore) -> Option<Shade> {
        let decal = self.decal;
        let position = if decal.in_3d {
            texel.position
        } else {
            texel.uv.extend(0.0)
        };
        let closest = decal.extrusion.closest_point(position);
        let local = self.inverse * (position - closest);
        if local.x.abs() > 1.0 || local.y.abs() > 1.0 || local.z.abs() > 1.0 {
            return None;
        }

        let shape_uv = Vec2::new(local.x, local.y) * 0.5 + Vec2::splat(0.5);
        let shape = match decal.shape {
            Some(id) => to_vec4(textures.sample(id, shape_uv)?).dot(decal.shape_channel),
            None => 1.0,
        };
        let falloff = calculate_hardness_falloff(local.z.abs(), decal.hardness);
        let facing = if decal.in_3d {
            decal.facing_weight(-self.direction.dot(texel.normal))
        } else {
            1.0
        };
        let mask = self
            .mask
            .map_or(1.0, |m| m.strength(position, textures));

        let mut color = decal.color;
        if let Some(id) = decal.texture {
            color *= to_vec4(textures.sample(id, shape_uv)?);
        }
        if let Some(tile) = &decal.tile {
            color *= tile.tint(position, textures);
        }

        Some(Shade {
            color,
            strength: decal.opacity * shape * falloff * facing * mask,
            minimum: 0.0,
        })
    }
}
