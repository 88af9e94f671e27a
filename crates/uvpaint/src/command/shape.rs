//! Geometry shared by the shaped commands: extrusions, falloff and masks

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::texture::TextureStore;
use crate::types::{TextureId, to_vec4};

/// The anchor a shaped command is swept along.
///
/// Texels measure their distance from the closest point on the extrusion,
/// so a line paints a capsule and a quad paints a slab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extrusion {
    Point(Vec3),
    Line(Vec3, Vec3),
    /// Corners in winding order
    Quad([Vec3; 4]),
}

impl Extrusion {
    /// A triangle is a quad whose last corner folds back onto the first
    pub fn triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Extrusion::Quad([a, b, c, a])
    }

    pub fn anchor(&self) -> Vec3 {
        match self {
            Extrusion::Point(p) | Extrusion::Line(p, _) => *p,
            Extrusion::Quad(q) => q[0],
        }
    }

    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        match self {
            Extrusion::Point(a) => *a,
            Extrusion::Line(a, b) => closest_point_on_segment(p, *a, *b),
            Extrusion::Quad([a, b, c, d]) => {
                let first = closest_point_on_triangle(p, *a, *b, *c);
                let second = closest_point_on_triangle(p, *a, *c, *d);
                if first.distance_squared(p) <= second.distance_squared(p) {
                    first
                } else {
                    second
                }
            }
        }
    }

    pub fn transformed(&self, matrix: &Mat4) -> Self {
        match self {
            Extrusion::Point(a) => Extrusion::Point(matrix.transform_point3(*a)),
            Extrusion::Line(a, b) => {
                Extrusion::Line(matrix.transform_point3(*a), matrix.transform_point3(*b))
            }
            Extrusion::Quad(q) => Extrusion::Quad(q.map(|p| matrix.transform_point3(p))),
        }
    }
}

impl Default for Extrusion {
    fn default() -> Self {
        Extrusion::Point(Vec3::ZERO)
    }
}

pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest point on triangle `abc` (Voronoi region walk).
/// Degenerate triangles fall back to their edges.
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    if ab.cross(ac).length_squared() <= f32::EPSILON * f32::EPSILON {
        return [
            closest_point_on_segment(p, a, b),
            closest_point_on_segment(p, b, c),
            closest_point_on_segment(p, c, a),
        ]
        .into_iter()
        .min_by(|x, y| x.distance_squared(p).total_cmp(&y.distance_squared(p)))
        .unwrap_or(a);
    }

    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

/// Falloff from the centre (0) to the edge (1) of a shape.
///
/// Hardness 1 is a hard edge; hardness 0 fades linearly to the edge.
pub fn calculate_hardness_falloff(distance_normalized: f32, hardness: f32) -> f32 {
    if distance_normalized > 1.0 {
        return 0.0;
    }
    if hardness >= 1.0 {
        return 1.0;
    }
    let soft = 1.0 - distance_normalized.clamp(0.0, 1.0);
    soft * (1.0 - hardness) + hardness
}

/// Tiling detail texture projected in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileLayer {
    pub texture: TextureId,
    /// World space to tile UV space
    pub matrix: Mat4,
    pub opacity: f32,
}

impl TileLayer {
    /// Multiplier for the paint colour at a world position
    pub fn tint(&self, position: Vec3, textures: &TextureStore) -> Vec4 {
        let uv = self.matrix.transform_point3(position).truncate();
        let tile = textures.sample(self.texture, uv).map(to_vec4).unwrap_or(Vec4::ONE);
        Vec4::ONE.lerp(tile, self.opacity.clamp(0.0, 1.0))
    }
}

/// A world-space mask projected along its local Z axis.
///
/// Inside the mask box the strength is the selected texture channel;
/// outside it paint is unaffected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldMask {
    pub texture: TextureId,
    /// Mask space to world space
    pub matrix: Mat4,
    pub channel: Vec4,
}

impl WorldMask {
    /// Invert the mask matrix once for a whole command execution
    pub fn prepare(&self) -> PreparedMask {
        PreparedMask {
            texture: self.texture,
            world_to_mask: self.matrix.inverse(),
            channel: self.channel,
        }
    }
}

/// A [`WorldMask`] ready to be evaluated per texel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparedMask {
    texture: TextureId,
    world_to_mask: Mat4,
    channel: Vec4,
}

impl PreparedMask {
    pub fn strength(&self, position: Vec3, textures: &TextureStore) -> f32 {
        let local = self.world_to_mask.transform_point3(position);
        if local.x.abs() > 1.0 || local.y.abs() > 1.0 {
            return 1.0;
        }
        let uv = Vec2::new(local.x, local.y) * 0.5 + Vec2::splat(0.5);
        textures
            .sample(self.texture, uv)
            .map(|c| to_vec4(c).dot(self.channel))
            .unwrap_or(1.0)
    }
}
