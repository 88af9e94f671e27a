//! UV-space rasterization of a submesh onto a render target

use glam::{Vec2, Vec3};
use uvpaint_config::Coord;

use super::{PaintMesh, PreparedMesh};
use crate::constants::RASTER_EPSILON;
use crate::surface::texel_uv;

/// One covered texel with its interpolated world-space surface data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Texel {
    pub x: u32,
    pub y: u32,
    pub uv: Vec2,
    pub position: Vec3,
    pub normal: Vec3,
}

/// Interpolate a Vec3 attribute using barycentric coordinates.
pub fn interpolate_vec3(v0: Vec3, v1: Vec3, v2: Vec3, u: f32, v: f32) -> Vec3 {
    let w = 1.0 - u - v;
    v0 * w + v1 * u + v2 * v
}

/// Interpolate a Vec2 attribute (like UVs) using barycentric coordinates.
pub fn interpolate_vec2(v0: Vec2, v1: Vec2, v2: Vec2, u: f32, v: f32) -> Vec2 {
    let w = 1.0 - u - v;
    v0 * w + v1 * u + v2 * v
}

#[inline]
fn edge(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Visit every texel whose centre lies inside a triangle of `submesh`.
///
/// Triangles are placed at `(u * width, (1 - v) * height)`. Texels on shared
/// edges are visited once; the first triangle to cover a texel wins.
/// Returns the number of texels visited.
pub fn rasterize_submesh(
    mesh: &PaintMesh,
    prepared: &PreparedMesh,
    submesh: usize,
    coord: Coord,
    width: u32,
    height: u32,
    mut visit: impl FnMut(Texel),
) -> usize {
    let Some(indices) = mesh.indices(submesh) else {
        return 0;
    };
    let uvs = mesh.uvs(coord);
    let size = Vec2::new(width as f32, height as f32);
    let mut visited = vec![false; (width as usize) * (height as usize)];
    let mut count = 0;

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let p0 = to_pixel(uvs[i0], size);
        let p1 = to_pixel(uvs[i1], size);
        let p2 = to_pixel(uvs[i2], size);

        let area = edge(p0, p1, p2);
        if area.abs() < RASTER_EPSILON {
            continue;
        }

        let min = p0.min(p1).min(p2).floor().max(Vec2::ZERO);
        let max = p0.max(p1).max(p2).ceil().min(size);
        if min.x >= max.x || min.y >= max.y {
            continue;
        }

        for y in min.y as u32..max.y as u32 {
            for x in min.x as u32..max.x as u32 {
                let index = (y as usize) * (width as usize) + (x as usize);
                if visited[index] {
                    continue;
                }
                let centre = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                // Weights of p1 and p2; p0 takes the remainder
                let u = edge(p2, p0, centre) / area;
                let v = edge(p0, p1, centre) / area;
                if u < -RASTER_EPSILON || v < -RASTER_EPSILON || u + v > 1.0 + RASTER_EPSILON {
                    continue;
                }
                visited[index] = true;
                count += 1;

                let position = interpolate_vec3(
                    prepared.positions[i0],
                    prepared.positions[i1],
                    prepared.positions[i2],
                    u,
                    v,
                );
                let normal = interpolate_vec3(
                    prepared.normals[i0],
                    prepared.normals[i1],
                    prepared.normals[i2],
                    u,
                    v,
                )
                .normalize_or_zero();

                visit(Texel {
                    x,
                    y,
                    uv: texel_uv(x, y, width, height),
                    position,
                    normal,
                });
            }
        }
    }

    count
}

#[inline]
fn to_pixel(uv: Vec2, size: Vec2) -> Vec2 {
    Vec2::new(uv.x * size.x, (1.0 - uv.y) * size.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn test_interpolate_vec3() {
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);

        // At vertex 0 (u=0, v=0, w=1)
        assert_eq!(interpolate_vec3(v0, v1, v2, 0.0, 0.0), v0);
        // Centre
        let c = interpolate_vec3(v0, v1, v2, 1.0 / 3.0, 1.0 / 3.0);
        assert!((c - Vec3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_quad_covers_every_texel_once() {
        let mesh = PaintMesh::quad(2.0);
        let prepared = PreparedMesh::build(&mesh, &Mat4::IDENTITY);
        let mut hits = vec![0u32; 8 * 8];
        let count = rasterize_submesh(&mesh, &prepared, 0, Coord::First, 8, 8, |t| {
            hits[(t.y * 8 + t.x) as usize] += 1;
        });
        assert_eq!(count, 64);
        assert!(hits.iter().all(|&h| h == 1));
    }

    #[test]
    fn test_texel_world_position_follows_uv() {
        let mesh = PaintMesh::quad(2.0);
        let prepared = PreparedMesh::build(&mesh, &Mat4::IDENTITY);
        let mut texels = Vec::new();
        rasterize_submesh(&mesh, &prepared, 0, Coord::First, 4, 4, |t| texels.push(t));

        // Top-left texel sits at u = 0.125, v = 0.875 -> x = -0.75, y = 0.75
        let top_left = texels.iter().find(|t| t.x == 0 && t.y == 0).unwrap();
        assert!((top_left.position - Vec3::new(-0.75, 0.75, 0.0)).length() < 1e-5);
        assert!((top_left.normal - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_missing_submesh_visits_nothing() {
        let mesh = PaintMesh::quad(1.0);
        let prepared = PreparedMesh::build(&mesh, &Mat4::IDENTITY);
        assert_eq!(rasterize_submesh(&mesh, &prepared, 3, Coord::First, 4, 4, |_| {}), 0);
    }
}
