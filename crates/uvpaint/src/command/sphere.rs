//! Spherical (or ellipsoidal) paint volume

use glam::{Mat3, Quat, Vec3, Vec4};

use super::shape::{Extrusion, PreparedMask, TileLayer, WorldMask, calculate_hardness_falloff};
use super::{Shade, TexelShader};
use crate::mesh::Texel;
use crate::texture::TextureStore;
use crate::types::TextureId;

#[derive(Debug, Clone, PartialEq)]
pub struct SphereCommand {
    pub in_3d: bool,
    pub extrusion: Extrusion,
    /// Rotation and radii of the volume
    pub matrix: Mat3,
    pub color: Vec4,
    pub opacity: f32,
    pub hardness: f32,
    pub tile: Option<TileLayer>,
    pub mask: Option<WorldMask>,
}

impl SphereCommand {
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            in_3d: true,
            extrusion: Extrusion::Point(position),
            matrix: Mat3::from_diagonal(Vec3::splat(radius)),
            color: Vec4::ONE,
            opacity: 1.0,
            hardness: 1.0,
            tile: None,
            mask: None,
        }
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.matrix = Mat3::from_diagonal(Vec3::splat(radius));
    }

    /// Ellipsoid orientation and radii. In 2D only the roll angle applies.
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

    pub(super) fn textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.tile
            .map(|t| t.texture)
            .into_iter()
            .chain(self.mask.map(|m| m.texture))
    }

    pub(super) fn shader(&self) -> SphereShader<'_> {
        SphereShader {
            sphere: self,
            inverse: self.matrix.inverse(),
            mask: self.mask.map(|m| m.prepare()),
        }
    }
}

pub(crate) struct SphereShader<'a> {
    sphere: &'a SphereCommand,
    inverse: Mat3,
    mask: Option<PreparedMask>,
}

impl TexelShader for SphereShader<'_> {
    fn shade(&self, texel: &Texel, textures: &TextureStore) -> Option<Shade> {
        let sphere = self.sphere;
        let position = if sphere.in_3d {
            texel.position
        } else {
            texel.uv.extend(0.0)
        };
        let closest = sphere.extrusion.closest_point(position);
        let distance = (self.inverse * (position - closest)).length();
        if distance > 1.0 {
            return None;
        }

        let falloff = calculate_hardness_falloff(distance, sphere.hardness);
        let mask = self
            .mask
            .map_or(1.0, |m| m.strength(position, textures));
        let mut color = sphere.color;
        if let Some(tile) = &sphere.tile {
            color *= tile.tint(position, textures);
        }

        Some(Shade {
            color,
            strength: sphere.opacity * falloff * mask,
            minimum: 0.0,
        })
    }
}
