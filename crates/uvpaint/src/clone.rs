//! Paint replication through cloners such as mirror planes

use std::fmt;

use glam::{Mat3, Mat4, Vec3};
use tracing::debug;

use crate::command::Command;

/// A transform source that duplicates submitted paint
pub trait Cloner {
    /// Fold this cloner's transform into the position and rotation matrices
    fn transform(&self, pos: &mut Mat4, rot: &mut Mat4);
}

impl<F> Cloner for F
where
    F: Fn(&mut Mat4, &mut Mat4),
{
    fn transform(&self, pos: &mut Mat4, rot: &mut Mat4) {
        self(pos, rot)
    }
}

/// Reflects paint across a plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirrorCloner {
    pub origin: Vec3,
    pub normal: Vec3,
    /// Keep orientation unmirrored so decals do not read backwards
    pub flip: bool,
}

impl MirrorCloner {
    pub fn new(origin: Vec3, normal: Vec3) -> Self {
        Self {
            origin,
            normal: normal.normalize_or(Vec3::X),
            flip: false,
        }
    }

    pub fn with_flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    /// Householder reflection about the plane
    pub fn matrix(&self) -> Mat4 {
        let n = self.normal;
        let linear = Mat3::from_cols(
            Vec3::X - n * (2.0 * n.x),
            Vec3::Y - n * (2.0 * n.y),
            Vec3::Z - n * (2.0 * n.z),
        );
        let mut matrix = Mat4::from_mat3(linear);
        matrix.w_axis = (n * (2.0 * n.dot(self.origin))).extend(1.0);
        matrix
    }
}

impl Cloner for MirrorCloner {
    fn transform(&self, pos: &mut Mat4, rot: &mut Mat4) {
        let matrix = self.matrix();
        *pos = matrix * *pos;
        if !self.flip {
            *rot = matrix * *rot;
        }
    }
}

/// The set of active cloners
#[derive(Default)]
pub struct Replicator {
    cloners: Vec<Box<dyn Cloner>>,
}

impl Replicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<C: Cloner + 'static>(&mut self, cloner: C) {
        self.cloners.push(Box::new(cloner));
    }

    pub fn clear(&mut self) {
        self.cloners.clear();
    }

    pub fn len(&self) -> usize {
        self.cloners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloners.is_empty()
    }

    /// `(pos, rot)` pairs: identity first, then one per cloner.
    ///
    /// Each cloner is applied to the base identity only, so cloners do not
    /// compound: C cloners give exactly 1 + C matrices.
    pub fn build_matrices(&self) -> Vec<(Mat4, Mat4)> {
        let mut matrices = Vec::with_capacity(1 + self.cloners.len());
        matrices.push((Mat4::IDENTITY, Mat4::IDENTITY));
        let (base_pos, base_rot) = matrices[0];
        for cloner in &self.cloners {
            let (mut pos, mut rot) = (base_pos, base_rot);
            cloner.transform(&mut pos, &mut rot);
            matrices.push((pos, rot));
        }
        matrices
    }

    /// Transformed copies of `command`, one per cloner (the original excluded)
    pub fn replicate(&self, command: &Command) -> Vec<Command> {
        let copies: Vec<Command> = self
            .build_matrices()
            .into_iter()
            .skip(1)
            .map(|(pos, rot)| {
                let mut copy = command.spawn_copy();
                copy.transform(&pos, &rot);
                copy
            })
            .collect();
        if !copies.is_empty() {
            debug!(
                "Replicator: {} command expanded into {} copies",
                command.kind.name(),
                copies.len()
            );
        }
        copies
    }
}

impl fmt::Debug for Replicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replicator")
            .field("cloners", &self.cloners.len())
            .finish()
    }
}
