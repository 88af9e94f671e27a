//! Paint commands
//!
//! A [`Command`] is a plain value: the shared header (ordering, blend, mesh
//! binding) plus a closed [`CommandKind`] carrying the variant's geometry.
//! Copies are value clones, so a replica can never alias the state of the
//! command it was spawned from.

mod decal;
mod fill;
mod replace;
mod shape;
mod sphere;

pub use decal::DecalCommand;
pub use fill::{FillCommand, enforce_minimum};
pub use replace::{ReplaceChannelsCommand, ReplaceCommand};
pub use shape::{
    Extrusion, PreparedMask, TileLayer, WorldMask, calculate_hardness_falloff, closest_point_on_segment,
    closest_point_on_triangle,
};
pub use sphere::SphereCommand;

use std::cmp::Ordering;

use glam::{Mat3, Mat4, Vec4};

use crate::blend::BlendMode;
use crate::mesh::Texel;
use crate::texture::TextureStore;
use crate::types::{ModelId, TextureId};

/// Source colour and coverage a command produces for one texel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shade {
    pub color: Vec4,
    pub strength: f32,
    /// Minimum per-channel step toward the full-strength result
    pub minimum: f32,
}

/// Per-texel evaluation of a command, prepared once per execution
pub(crate) trait TexelShader {
    /// `None` leaves the texel untouched
    fn shade(&self, texel: &Texel, textures: &TextureStore) -> Option<Shade>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Decal(DecalCommand),
    Sphere(SphereCommand),
    Fill(FillCommand),
    Replace(ReplaceCommand),
    ReplaceChannels(ReplaceChannelsCommand),
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Decal(_) => "decal",
            CommandKind::Sphere(_) => "sphere",
            CommandKind::Fill(_) => "fill",
            CommandKind::Replace(_) => "replace",
            CommandKind::ReplaceChannels(_) => "replace_channels",
        }
    }

    /// Apply `pos` to positional fields and `rot` to orientation fields
    pub fn transform(&mut self, pos: &Mat4, rot: &Mat4) {
        let rot = Mat3::from_mat4(*rot);
        match self {
            CommandKind::Decal(decal) => {
                decal.extrusion = decal.extrusion.transformed(pos);
                decal.matrix = rot * decal.matrix;
            }
            CommandKind::Sphere(sphere) => {
                sphere.extrusion = sphere.extrusion.transformed(pos);
                sphere.matrix = rot * sphere.matrix;
            }
            CommandKind::Fill(_) | CommandKind::Replace(_) | CommandKind::ReplaceChannels(_) => {}
        }
    }

    fn textures(&self) -> Vec<TextureId> {
        match self {
            CommandKind::Decal(decal) => decal.textures().collect(),
            CommandKind::Sphere(sphere) => sphere.textures().collect(),
            CommandKind::Fill(fill) => fill.texture.into_iter().collect(),
            CommandKind::Replace(replace) => replace.texture.into_iter().collect(),
            CommandKind::ReplaceChannels(channels) => {
                channels.textures.iter().flatten().copied().collect()
            }
        }
    }

    pub(crate) fn shader(&self) -> Box<dyn TexelShader + '_> {
        match self {
            CommandKind::Decal(decal) => Box::new(decal.shader()),
            CommandKind::Sphere(sphere) => Box::new(sphere.shader()),
            CommandKind::Fill(fill) => Box::new(fill),
            CommandKind::Replace(replace) => Box::new(replace),
            CommandKind::ReplaceChannels(channels) => Box::new(channels),
        }
    }
}

impl<T: TexelShader + ?Sized> TexelShader for &T {
    fn shade(&self, texel: &Texel, textures: &TextureStore) -> Option<Shade> {
        (**self).shade(texel, textures)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Position in the receiving queue; tie-break after priority
    pub index: usize,
    /// Speculative paint shown on the preview target only
    pub preview: bool,
    pub priority: i32,
    /// Blit the target into scratch before executing
    pub double_buffer: bool,
    pub blend: BlendMode,
    /// Mesh binding, set when the command is queued on a texture
    pub model: Option<ModelId>,
    pub submesh: usize,
    pub kind: CommandKind,
}

impl Command {
    pub fn new(kind: CommandKind, blend: BlendMode) -> Self {
        Self {
            index: 0,
            preview: false,
            priority: 0,
            double_buffer: true,
            blend,
            model: None,
            submesh: 0,
            kind,
        }
    }

    pub fn decal(decal: DecalCommand, blend: BlendMode) -> Self {
        Self::new(CommandKind::Decal(decal), blend)
    }

    pub fn sphere(sphere: SphereCommand, blend: BlendMode) -> Self {
        Self::new(CommandKind::Sphere(sphere), blend)
    }

    pub fn fill(fill: FillCommand, blend: BlendMode) -> Self {
        Self::new(CommandKind::Fill(fill), blend)
    }

    /// Replace the texture contents with `texture * color` on the given channels
    pub fn replace(texture: Option<TextureId>, color: Vec4, channels: Vec4) -> Self {
        Self::new(
            CommandKind::Replace(ReplaceCommand { texture, color }),
            BlendMode::replace(channels),
        )
    }

    pub fn replace_channels(command: ReplaceChannelsCommand, channels: Vec4) -> Self {
        Self::new(
            CommandKind::ReplaceChannels(command),
            BlendMode::replace(channels),
        )
    }

    /// Set preview flag and priority, resetting the queue index
    pub fn set_state(&mut self, preview: bool, priority: i32) {
        self.preview = preview;
        self.priority = priority;
        self.index = 0;
    }

    pub fn with_state(mut self, preview: bool, priority: i32) -> Self {
        self.set_state(preview, priority);
        self
    }

    pub fn with_double_buffer(mut self, double_buffer: bool) -> Self {
        self.double_buffer = double_buffer;
        self
    }

    /// Total order: priority ascending, then queue index ascending
    pub fn compare(&self, other: &Command) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.index.cmp(&other.index))
    }

    /// Decals and spheres rasterize the bound submesh; the rest cover the
    /// whole texture
    pub fn requires_mesh(&self) -> bool {
        matches!(self.kind, CommandKind::Decal(_) | CommandKind::Sphere(_))
    }

    pub fn requires_double_buffer(&self) -> bool {
        self.double_buffer || self.blend.requires_double_buffer()
    }

    pub fn transform(&mut self, pos: &Mat4, rot: &Mat4) {
        self.kind.transform(pos, rot);
    }

    /// Independent copy with identical fields
    pub fn spawn_copy(&self) -> Command {
        self.clone()
    }

    /// Copy converted from world space into the space `world_to_local` maps to
    pub fn spawn_copy_local(&self, world_to_local: &Mat4) -> Command {
        let mut copy = self.spawn_copy();
        copy.transform(world_to_local, world_to_local);
        copy
    }

    /// Copy converted from local space back to world space
    pub fn spawn_copy_world(&self, local_to_world: &Mat4) -> Command {
        let mut copy = self.spawn_copy();
        copy.transform(local_to_world, local_to_world);
        copy
    }

    /// Every source texture this command samples, including its blend's
    pub fn referenced_textures(&self) -> Vec<TextureId> {
        let mut textures = self.kind.textures();
        textures.extend(self.blend.texture());
        textures
    }
}
