//! Paintable mesh geometry and per-frame prepared world data
//!
//! A [`PaintMesh`] is shared, immutable vertex data. A [`Model`] places it in
//! the world and lazily caches world-space positions and normals. The cache
//! is dropped at the start of every flush so transform changes made during
//! the frame are picked up.

mod raster;

pub use raster::{Texel, interpolate_vec2, interpolate_vec3, rasterize_submesh};

use std::cell::OnceCell;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};
use uvpaint_config::Coord;

use crate::validation::ValidationError;

/// Vertex data of a paintable mesh
#[derive(Debug, Clone, PartialEq)]
pub struct PaintMesh {
    /// Vertex positions
    positions: Vec<Vec3>,
    /// Vertex normals (same length as positions)
    normals: Vec<Vec3>,
    /// First UV channel (same length as positions)
    uv0: Vec<Vec2>,
    /// Optional second UV channel
    uv1: Option<Vec<Vec2>>,
    /// Triangle indices per submesh (3 per triangle)
    submeshes: Vec<Vec<u32>>,
}

impl PaintMesh {
    pub fn new(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        uv0: Vec<Vec2>,
        submeshes: Vec<Vec<u32>>,
    ) -> Result<Self, ValidationError> {
        let vertex_count = positions.len();
        check_len("normals", vertex_count, normals.len())?;
        check_len("uv0", vertex_count, uv0.len())?;
        for indices in &submeshes {
            check_len("indices", indices.len() - indices.len() % 3, indices.len())?;
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(ValidationError::TriangleIndex {
                    index,
                    vertex_count,
                });
            }
        }
        Ok(Self {
            positions,
            normals,
            uv0,
            uv1: None,
            submeshes,
        })
    }

    /// Attach a second UV channel
    pub fn with_uv1(mut self, uv1: Vec<Vec2>) -> Result<Self, ValidationError> {
        check_len("uv1", self.positions.len(), uv1.len())?;
        self.uv1 = Some(uv1);
        Ok(self)
    }

    /// A `size` x `size` quad in the XY plane facing -Z, UVs spanning 0..1.
    pub fn quad(size: f32) -> Self {
        let h = size * 0.5;
        Self {
            positions: vec![
                Vec3::new(-h, -h, 0.0),
                Vec3::new(h, -h, 0.0),
                Vec3::new(h, h, 0.0),
                Vec3::new(-h, h, 0.0),
            ],
            normals: vec![Vec3::NEG_Z; 4],
            uv0: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            uv1: None,
            submeshes: vec![vec![0, 1, 2, 0, 2, 3]],
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Indices of a submesh, 3 per triangle
    pub fn indices(&self, submesh: usize) -> Option<&[u32]> {
        self.submeshes.get(submesh).map(Vec::as_slice)
    }

    /// UVs for a channel. `Coord::Second` falls back to the first channel
    /// when the mesh has none.
    pub fn uvs(&self, coord: Coord) -> &[Vec2] {
        match (coord, &self.uv1) {
            (Coord::Second, Some(uv1)) => uv1,
            _ => &self.uv0,
        }
    }
}

fn check_len(attribute: &'static str, expected: usize, actual: usize) -> Result<(), ValidationError> {
    if expected != actual {
        return Err(ValidationError::MeshAttributeLength {
            attribute,
            expected,
            actual,
        });
    }
    Ok(())
}

/// World-space vertex data, valid for one flush
#[derive(Debug, Clone)]
pub struct PreparedMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Bounding sphere centre
    pub center: Vec3,
    pub radius: f32,
}

impl PreparedMesh {
    fn build(mesh: &PaintMesh, local_to_world: &Mat4) -> Self {
        let positions: Vec<Vec3> = mesh
            .positions
            .iter()
            .map(|p| local_to_world.transform_point3(*p))
            .collect();
        let normal_matrix = local_to_world.inverse().transpose();
        let normals = mesh
            .normals
            .iter()
            .map(|n| normal_matrix.transform_vector3(*n).normalize_or_zero())
            .collect();

        let (min, max) = positions.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        );
        let (center, radius) = if positions.is_empty() {
            (local_to_world.transform_point3(Vec3::ZERO), 0.0)
        } else {
            let center = (min + max) * 0.5;
            (center, (max - center).length())
        };

        Self {
            positions,
            normals,
            center,
            radius,
        }
    }
}

/// A mesh placed in the world
#[derive(Debug)]
pub struct Model {
    mesh: Arc<PaintMesh>,
    local_to_world: Mat4,
    prepared: OnceCell<PreparedMesh>,
}

impl Model {
    pub fn new(mesh: Arc<PaintMesh>, local_to_world: Mat4) -> Self {
        Self {
            mesh,
            local_to_world,
            prepared: OnceCell::new(),
        }
    }

    pub fn mesh(&self) -> &PaintMesh {
        &self.mesh
    }

    pub fn local_to_world(&self) -> Mat4 {
        self.local_to_world
    }

    pub fn set_local_to_world(&mut self, local_to_world: Mat4) {
        self.local_to_world = local_to_world;
        self.clear_prepared();
    }

    /// World-space data, computed on first use after a clear
    pub fn prepared(&self) -> &PreparedMesh {
        self.prepared
            .get_or_init(|| PreparedMesh::build(&self.mesh, &self.local_to_world))
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.get().is_some()
    }

    pub fn clear_prepared(&mut self) {
        self.prepared = OnceCell::new();
    }

    /// True when the world bounding sphere touches the given sphere
    pub fn overlaps_sphere(&self, position: Vec3, radius: f32) -> bool {
        let prepared = self.prepared();
        prepared.center.distance(position) <= prepared.radius + radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_validation() {
        let err = PaintMesh::new(vec![Vec3::ZERO; 3], vec![Vec3::Z; 2], vec![Vec2::ZERO; 3], vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MeshAttributeLength {
                attribute: "normals",
                ..
            }
        ));

        let err = PaintMesh::new(
            vec![Vec3::ZERO; 3],
            vec![Vec3::Z; 3],
            vec![Vec2::ZERO; 3],
            vec![vec![0, 1, 5]],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::TriangleIndex { index: 5, .. }));
    }

    #[test]
    fn test_second_uv_falls_back() {
        let mesh = PaintMesh::quad(1.0);
        assert_eq!(mesh.uvs(Coord::Second), mesh.uvs(Coord::First));
        let flipped: Vec<Vec2> = mesh.uvs(Coord::First).iter().map(|uv| Vec2::ONE - *uv).collect();
        let mesh = mesh.with_uv1(flipped.clone()).unwrap();
        assert_eq!(mesh.uvs(Coord::Second), flipped.as_slice());
    }

    #[test]
    fn test_prepared_is_lazy_and_cleared() {
        let mut model = Model::new(Arc::new(PaintMesh::quad(2.0)), Mat4::from_translation(Vec3::X * 10.0));
        assert!(!model.is_prepared());
        assert!((model.prepared().center - Vec3::X * 10.0).length() < 1e-5);
        assert!(model.is_prepared());

        model.set_local_to_world(Mat4::IDENTITY);
        assert!(!model.is_prepared());
        assert!(model.overlaps_sphere(Vec3::new(0.0, 0.0, 1.0), 0.5));
        assert!(!model.overlaps_sphere(Vec3::new(5.0, 0.0, 0.0), 0.5));
    }
}
