//! Executes sorted command batches against a render target
//!
//! One batch is one queue of one texture. Commands run in `(priority, index)`
//! order. A failing command is logged and skipped; the rest of the batch
//! still runs. The mip chain is rebuilt once after the whole batch.

use tracing::{debug, warn};
use uvpaint_config::Coord;

use crate::blend::BlendSample;
use crate::command::{Command, enforce_minimum};
use crate::error::PaintError;
use crate::mesh::{Model, Texel, rasterize_submesh};
use crate::pool::{ScratchPool, ScratchSlot};
use crate::registry::Registry;
use crate::surface::texel_uv;
use crate::target::RenderTarget;
use crate::texture::TextureStore;
use crate::types::{Channel, ModelId, TextureId, to_rgba, to_vec4};
use crate::validation::validate_same_size;

/// Shared resources a batch reads from
pub struct CompositeContext<'a> {
    pub models: &'a Registry<ModelId, Model>,
    pub textures: &'a TextureStore,
    pub scratch: &'a mut ScratchPool,
}

/// UV-space mask limiting where a texture accepts paint.
/// The mask texture must match the target size exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalMask {
    pub texture: TextureId,
    pub channel: Channel,
}

/// Per-texture settings that apply to every command in a batch
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSettings {
    pub coord: Coord,
    pub local_mask: Option<LocalMask>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: usize,
    pub skipped: usize,
    /// Texels written across all applied commands
    pub texels: usize,
}

impl BatchReport {
    pub fn merge(&mut self, other: BatchReport) {
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.texels += other.texels;
    }
}

/// Sort and execute `commands`, leaving the vector empty.
pub fn execute_batch(
    commands: &mut Vec<Command>,
    target: &mut RenderTarget,
    settings: &BatchSettings,
    ctx: &mut CompositeContext<'_>,
) -> BatchReport {
    let mut report = BatchReport::default();
    if commands.is_empty() {
        return report;
    }

    commands.sort_by(Command::compare);

    {
        // Released on scope exit whatever happens to the commands
        let mut scratch = ctx.scratch.scoped();
        for command in commands.drain(..) {
            match execute_command(&command, target, settings, ctx.models, ctx.textures, &mut scratch) {
                Ok(texels) => {
                    report.applied += 1;
                    report.texels += texels;
                }
                Err(err) => {
                    warn!(
                        "Compositor: skipping {} command (priority {}, index {}): {}",
                        command.kind.name(),
                        command.priority,
                        command.index,
                        err
                    );
                    report.skipped += 1;
                }
            }
        }
    }

    target.generate_mips();

    debug!(
        "Compositor: batch done, {} applied, {} skipped, {} texels",
        report.applied, report.skipped, report.texels
    );
    report
}

fn execute_command(
    command: &Command,
    target: &mut RenderTarget,
    settings: &BatchSettings,
    models: &Registry<ModelId, Model>,
    textures: &TextureStore,
    scratch: &mut ScratchSlot<'_>,
) -> Result<usize, PaintError> {
    for id in command.referenced_textures() {
        textures.require(id)?;
    }

    let mask = match settings.local_mask {
        Some(mask) => {
            let texture = textures.require(mask.texture)?;
            validate_same_size(target.size(), (texture.width(), texture.height()))?;
            Some((texture.surface(), mask.channel))
        }
        None => None,
    };

    let model = if command.requires_mesh() {
        let model = command
            .model
            .and_then(|id| models.get(id))
            .ok_or(PaintError::MissingModel)?;
        let count = model.mesh().submesh_count();
        if command.submesh >= count {
            return Err(PaintError::SubmeshOutOfRange {
                submesh: command.submesh,
                count,
            });
        }
        Some(model)
    } else {
        None
    };

    let buffer = if command.requires_double_buffer() {
        Some(scratch.blit_from(target.surface()))
    } else {
        None
    };

    let shader = command.kind.shader();
    let (width, height) = target.size();
    let surface = target.surface_mut();
    let mut dirty = DirtyBounds::default();

    let mut apply = |texel: Texel| {
        let Some(shade) = shader.shade(&texel, textures) else {
            return;
        };
        let mut strength = shade.strength;
        if let Some((mask, channel)) = mask {
            strength *= mask.pixels()[texel_index(&texel, width)][channel.index()];
        }
        if strength <= 0.0 {
            return;
        }

        let pixels = surface.pixels_mut();
        let index = texel_index(&texel, width);
        let dst = to_vec4(pixels[index]);
        let mut sample = BlendSample {
            dst,
            src: shade.color,
            strength,
            uv: texel.uv,
            x: texel.x,
            y: texel.y,
            buffer,
            textures,
        };
        let mut out = command.blend.composite(&sample);
        if shade.minimum > 0.0 {
            sample.strength = 1.0;
            let full = command.blend.composite(&sample);
            out = enforce_minimum(dst, out, full, shade.minimum);
        }
        pixels[index] = to_rgba(out);
        dirty.include(texel.x, texel.y);
    };

    match model {
        Some(model) => {
            rasterize_submesh(
                model.mesh(),
                model.prepared(),
                command.submesh,
                settings.coord,
                width,
                height,
                &mut apply,
            );
        }
        None => {
            for y in 0..height {
                for x in 0..width {
                    apply(Texel {
                        x,
                        y,
                        uv: texel_uv(x, y, width, height),
                        position: glam::Vec3::ZERO,
                        normal: glam::Vec3::ZERO,
                    });
                }
            }
        }
    }

    let written = dirty.count;
    if let Some((x, y, w, h)) = dirty.region() {
        target.mark_region_dirty(x, y, w, h);
    }

    debug!(
        "Compositor: {} {} (priority {}, index {}) wrote {} texels",
        command.blend.name(),
        command.kind.name(),
        command.priority,
        command.index,
        written
    );
    Ok(written)
}

#[inline]
fn texel_index(texel: &Texel, width: u32) -> usize {
    (texel.y as usize) * (width as usize) + (texel.x as usize)
}

#[derive(Default)]
struct DirtyBounds {
    min: Option<(u32, u32)>,
    max: (u32, u32),
    count: usize,
}

impl DirtyBounds {
    fn include(&mut self, x: u32, y: u32) {
        self.count += 1;
        self.min = Some(match self.min {
            Some((mx, my)) => (mx.min(x), my.min(y)),
            None => (x, y),
        });
        self.max = (self.max.0.max(x), self.max.1.max(y));
    }

    fn region(&self) -> Option<(u32, u32, u32, u32)> {
        let (x, y) = self.min?;
        Some((x, y, self.max.0 - x + 1, self.max.1 - y + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use glam::{Mat4, Vec3, Vec4};

    use crate::blend::BlendMode;
    use crate::command::{DecalCommand, FillCommand, SphereCommand};
    use crate::mesh::PaintMesh;
    use crate::surface::{CpuSurface, Sampler};
    use crate::texture::Texture;

    struct Fixture {
        models: Registry<ModelId, Model>,
        textures: TextureStore,
        scratch: ScratchPool,
        model: ModelId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut models = Registry::new();
            let model = models.insert(Model::new(Arc::new(PaintMesh::quad(2.0)), Mat4::IDENTITY));
            Self {
                models,
                textures: TextureStore::new(),
                scratch: ScratchPool::new(4),
                model,
            }
        }

        fn run(&mut self, commands: &mut Vec<Command>, target: &mut RenderTarget, settings: &BatchSettings) -> BatchReport {
            let mut ctx = CompositeContext {
                models: &self.models,
                textures: &self.textures,
                scratch: &mut self.scratch,
            };
            execute_batch(commands, target, settings, &mut ctx)
        }
    }

    fn fill(color: Vec4, priority: i32, index: usize) -> Command {
        let mut command = Command::fill(FillCommand::new(color, 1.0), BlendMode::replace(Vec4::ONE))
            .with_state(false, priority);
        command.index = index;
        command
    }

    #[test]
    fn test_priority_order_wins_regardless_of_submission() {
        let mut fixture = Fixture::new();
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);

        let mut target = RenderTarget::new(4, 4, false);
        let mut commands = vec![fill(red, 5, 0), fill(blue, 3, 1)];
        fixture.run(&mut commands, &mut target, &BatchSettings::default());
        assert_eq!(target.surface().get_pixel(0, 0), Some(red.to_array()));

        let mut target = RenderTarget::new(4, 4, false);
        let mut commands = vec![fill(blue, 3, 0), fill(red, 5, 1)];
        fixture.run(&mut commands, &mut target, &BatchSettings::default());
        assert_eq!(target.surface().get_pixel(0, 0), Some(red.to_array()));
        assert!(commands.is_empty());
    }

    #[test]
    fn test_mesh_command_without_model_is_skipped() {
        let mut fixture = Fixture::new();
        let mut target = RenderTarget::new(4, 4, false);
        let decal = Command::decal(DecalCommand::new(Vec3::ZERO, Vec3::ONE), BlendMode::default());
        let mut commands = vec![decal, fill(Vec4::ONE, 0, 1)];
        let report = fixture.run(&mut commands, &mut target, &BatchSettings::default());
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(fixture.scratch.outstanding(), 0);
    }

    #[test]
    fn test_sphere_paints_only_inside_radius() {
        let mut fixture = Fixture::new();
        let mut target = RenderTarget::new(8, 8, false);
        let mut sphere = Command::sphere(
            SphereCommand::new(Vec3::new(-0.5, 0.5, 0.0), 0.3),
            BlendMode::replace(Vec4::ONE),
        );
        sphere.model = Some(fixture.model);
        let report = fixture.run(&mut vec![sphere], &mut target, &BatchSettings::default());
        assert_eq!(report.applied, 1);
        assert!(report.texels > 0 && report.texels < 64);
        // Texel (1, 1) sits at world (-0.625, 0.625)
        assert_eq!(target.surface().get_pixel(1, 1), Some([1.0; 4]));
        assert_eq!(target.surface().get_pixel(6, 6), Some([0.0; 4]));
    }

    #[test]
    fn test_mismatched_local_mask_skips_command() {
        let mut fixture = Fixture::new();
        let mask = fixture
            .textures
            .insert(Texture::new(CpuSurface::filled(2, 2, [1.0; 4]), Sampler::default()));
        let settings = BatchSettings {
            coord: Coord::First,
            local_mask: Some(LocalMask {
                texture: mask,
                channel: Channel::Red,
            }),
        };
        let mut target = RenderTarget::new(4, 4, false);
        let report = fixture.run(&mut vec![fill(Vec4::ONE, 0, 0)], &mut target, &settings);
        assert_eq!(report.skipped, 1);
        assert_eq!(target.surface().get_pixel(0, 0), Some([0.0; 4]));
    }

    #[test]
    fn test_local_mask_scales_strength() {
        let mut fixture = Fixture::new();
        let mut mask_surface = CpuSurface::new(2, 1);
        mask_surface.set_pixel(1, 0, [0.0, 1.0, 0.0, 0.0]);
        let mask = fixture.textures.insert(Texture::new(mask_surface, Sampler::default()));
        let settings = BatchSettings {
            coord: Coord::First,
            local_mask: Some(LocalMask {
                texture: mask,
                channel: Channel::Green,
            }),
        };
        let mut target = RenderTarget::new(2, 1, false);
        fixture.run(&mut vec![fill(Vec4::ONE, 0, 0)], &mut target, &settings);
        assert_eq!(target.surface().get_pixel(0, 0), Some([0.0; 4]));
        assert_eq!(target.surface().get_pixel(1, 0), Some([1.0; 4]));
    }

    #[test]
    fn test_mips_generated_once_per_batch() {
        let mut fixture = Fixture::new();
        let mut target = RenderTarget::new(4, 4, true);
        let mut commands = vec![fill(Vec4::ONE, 0, 0), fill(Vec4::ZERO, 1, 1), fill(Vec4::ONE, 2, 2)];
        fixture.run(&mut commands, &mut target, &BatchSettings::default());
        assert_eq!(target.mip_generation_count(), 1);
    }

    #[test]
    fn test_scratch_reused_across_double_buffered_commands() {
        let mut fixture = Fixture::new();
        let mut target = RenderTarget::new(4, 4, false);
        let mut commands = vec![fill(Vec4::ONE, 0, 0), fill(Vec4::ONE, 0, 1)];
        fixture.run(&mut commands, &mut target, &BatchSettings::default());
        assert_eq!(fixture.scratch.allocations(), 1);
        assert_eq!(fixture.scratch.outstanding(), 0);
        assert_eq!(fixture.scratch.pooled_count(), 1);
    }

    #[test]
    fn test_blur_reads_pre_command_state() {
        let mut fixture = Fixture::new();
        let mut target = RenderTarget::new(3, 1, false);
        target.surface_mut().set_pixel(1, 0, [0.9; 4]);
        let mut blur = Command::fill(FillCommand::new(Vec4::ONE, 1.0), BlendMode::blur(Vec4::ONE))
            .with_double_buffer(false);
        blur.index = 0;
        fixture.run(&mut vec![blur], &mut target, &BatchSettings::default());
        // Every texel averages the untouched buffer, not partially blurred output
        let left = target.surface().get_pixel(0, 0).unwrap()[0];
        assert!((left - 0.3).abs() < 1e-6);
    }
}
