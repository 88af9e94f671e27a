//! Registry of models, source textures and paintable textures, plus the
//! two-phase frame driver.
//!
//! Commands are submitted through a [`Frame`]. Ending (or dropping) the
//! frame flushes every paintable texture once, in registration order, after
//! all of the frame's submissions.

use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use tracing::{debug, info};
use uvpaint_config::ManagerConfig;

use crate::blend::BlendMode;
use crate::clone::Replicator;
use crate::command::Command;
use crate::compositor::{BatchReport, CompositeContext};
use crate::error::PaintError;
use crate::mesh::{Model, PaintMesh};
use crate::paintable::PaintableTexture;
use crate::pool::ScratchPool;
use crate::registry::Registry;
use crate::texture::{Texture, TextureStore};
use crate::types::{Group, ModelId, PaintableId, TextureId};
use crate::validation::validate_dimensions;

/// Where a submitted command goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmitTarget {
    /// One paintable texture, regardless of group
    Texture(PaintableId),
    /// Every paintable texture bound to the model
    Model(ModelId),
    /// Every paintable texture on models whose bounds touch the sphere
    Nearby { position: Vec3, radius: f32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// Paintable textures flushed
    pub textures: usize,
    pub applied: usize,
    pub skipped: usize,
    pub texels: usize,
}

impl FrameReport {
    fn add(&mut self, batch: BatchReport) {
        self.applied += batch.applied;
        self.skipped += batch.skipped;
        self.texels += batch.texels;
    }
}

pub struct PaintManager {
    config: ManagerConfig,
    textures: TextureStore,
    models: Registry<ModelId, Model>,
    paintables: Registry<PaintableId, PaintableTexture>,
    scratch: ScratchPool,
    replicator: Replicator,
    frame: u64,
}

impl std::fmt::Debug for PaintManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaintManager")
            .field("frame", &self.frame)
            .field("textures", &self.textures.len())
            .field("models", &self.models.len())
            .field("paintables", &self.paintables.len())
            .field("cloners", &self.replicator.len())
            .finish()
    }
}

impl Default for PaintManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl PaintManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            scratch: ScratchPool::new(config.scratch_max_per_key),
            config,
            textures: TextureStore::new(),
            models: Registry::new(),
            paintables: Registry::new(),
            replicator: Replicator::new(),
            frame: 0,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn textures(&self) -> &TextureStore {
        &self.textures
    }

    pub fn scratch(&self) -> &ScratchPool {
        &self.scratch
    }

    pub fn replicator_mut(&mut self) -> &mut Replicator {
        &mut self.replicator
    }

    pub fn add_texture(&mut self, texture: Texture) -> Result<TextureId, PaintError> {
        validate_dimensions(texture.width(), texture.height(), self.config.max_texture_size)?;
        Ok(self.textures.insert(texture))
    }

    pub fn remove_texture(&mut self, id: TextureId) -> Option<Texture> {
        self.textures.remove(id)
    }

    pub fn add_model(&mut self, mesh: Arc<PaintMesh>, local_to_world: Mat4) -> ModelId {
        let id = self.models.insert(Model::new(mesh, local_to_world));
        info!("PaintManager: registered model {:?}", id);
        id
    }

    pub fn remove_model(&mut self, id: ModelId) -> Option<Model> {
        self.models.remove(id)
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id)
    }

    /// Move a model. Bound paintable textures follow, so later undo/redo
    /// replays land where the model is now.
    pub fn set_model_transform(&mut self, id: ModelId, local_to_world: Mat4) -> Result<(), PaintError> {
        let model = self.models.get_mut(id).ok_or(PaintError::MissingModel)?;
        model.set_local_to_world(local_to_world);
        for paintable in self.paintables.values_mut() {
            if paintable.model() == Some(id) {
                paintable.set_local_to_world(local_to_world);
            }
        }
        Ok(())
    }

    /// Activate and register a paintable texture. It is flushed after every
    /// texture registered before it.
    pub fn add_paintable(&mut self, paintable: PaintableTexture) -> Result<PaintableId, PaintError> {
        let mut paintable = paintable.with_max_texture_size(self.config.max_texture_size);
        let config = paintable.config();
        validate_dimensions(config.width, config.height, self.config.max_texture_size)?;
        if let Some(model) = paintable.model().and_then(|id| self.models.get(id)) {
            paintable.set_local_to_world(model.local_to_world());
        }
        paintable.activate(&self.textures)?;
        let id = self.paintables.insert(paintable);
        info!("PaintManager: registered paintable {:?}", id);
        Ok(id)
    }

    pub fn remove_paintable(&mut self, id: PaintableId) -> Option<PaintableTexture> {
        let mut paintable = self.paintables.remove(id)?;
        paintable.deactivate();
        Some(paintable)
    }

    pub fn paintable(&self, id: PaintableId) -> Option<&PaintableTexture> {
        self.paintables.get(id)
    }

    pub fn paintable_mut(&mut self, id: PaintableId) -> Option<&mut PaintableTexture> {
        self.paintables.get_mut(id)
    }

    pub fn paintable_ids(&self) -> Vec<PaintableId> {
        self.paintables.ids()
    }

    /// Open the submission phase of a frame
    pub fn begin_frame(&mut self) -> Frame<'_> {
        self.frame += 1;
        debug!("PaintManager: frame {} begins", self.frame);
        Frame {
            manager: self,
            ended: false,
        }
    }

    pub fn store_state(&mut self, id: PaintableId) -> Result<(), PaintError> {
        self.paintables
            .get_mut(id)
            .ok_or(PaintError::UnknownPaintable(id))?
            .store_state()
    }

    pub fn undo(&mut self, id: PaintableId) -> Result<bool, PaintError> {
        self.with_paintable(id, |paintable, ctx| paintable.undo(ctx))?
    }

    pub fn redo(&mut self, id: PaintableId) -> Result<bool, PaintError> {
        self.with_paintable(id, |paintable, ctx| paintable.redo(ctx))?
    }

    pub fn clear_states(&mut self, id: PaintableId) -> Result<(), PaintError> {
        self.paintables
            .get_mut(id)
            .ok_or(PaintError::UnknownPaintable(id))?
            .clear_states();
        Ok(())
    }

    /// Flush one texture now instead of waiting for the end of the frame
    pub fn execute_commands(&mut self, id: PaintableId, send_notifications: bool) -> Result<BatchReport, PaintError> {
        self.with_paintable(id, |paintable, ctx| {
            paintable.execute_commands(ctx, send_notifications)
        })
    }

    pub fn hide_all_previews(&mut self) {
        for paintable in self.paintables.values_mut() {
            paintable.hide_preview();
        }
    }

    fn with_paintable<R>(
        &mut self,
        id: PaintableId,
        f: impl FnOnce(&mut PaintableTexture, &mut CompositeContext<'_>) -> R,
    ) -> Result<R, PaintError> {
        let Self {
            models,
            textures,
            paintables,
            scratch,
            ..
        } = self;
        let paintable = paintables.get_mut(id).ok_or(PaintError::UnknownPaintable(id))?;
        let mut ctx = CompositeContext {
            models: &*models,
            textures: &*textures,
            scratch,
        };
        Ok(f(paintable, &mut ctx))
    }

    /// Expand `command` through the active cloners and queue the original
    /// and every copy on the targets resolved for the original. Returns the
    /// number queued.
    fn submit(&mut self, command: &Command, target: SubmitTarget, group: Option<Group>) -> usize {
        let targets = self.resolve(target, group);
        let mut queued = 0;
        for (n, (pos, rot)) in self.replicator.build_matrices().into_iter().enumerate() {
            let mut copy = command.spawn_copy();
            if n > 0 {
                copy.transform(&pos, &rot);
            }
            for &id in &targets {
                if self.queue_on(id, &copy) {
                    queued += 1;
                }
            }
        }
        debug!(
            "PaintManager: {} command submitted to {:?}, {} queued",
            command.kind.name(),
            target,
            queued
        );
        queued
    }

    fn resolve(&self, target: SubmitTarget, group: Option<Group>) -> Vec<PaintableId> {
        let matches = |paintable: &PaintableTexture| group.is_none_or(|g| g == paintable.group());
        match target {
            SubmitTarget::Texture(id) => {
                if self.paintables.contains(id) {
                    vec![id]
                } else {
                    Vec::new()
                }
            }
            SubmitTarget::Model(model) => self
                .paintables
                .iter()
                .filter(|(_, p)| p.model() == Some(model) && matches(p))
                .map(|(id, _)| id)
                .collect(),
            SubmitTarget::Nearby { position, radius } => {
                let nearby: Vec<ModelId> = self
                    .models
                    .iter()
                    .filter(|(_, m)| m.overlaps_sphere(position, radius))
                    .map(|(id, _)| id)
                    .collect();
                self.paintables
                    .iter()
                    .filter(|(_, p)| p.model().is_some_and(|m| nearby.contains(&m)) && matches(p))
                    .map(|(id, _)| id)
                    .collect()
            }
        }
    }

    /// Bind a copy of `command` to the texture's model and base state, then queue it
    fn queue_on(&mut self, id: PaintableId, command: &Command) -> bool {
        let Some(paintable) = self.paintables.get_mut(id) else {
            return false;
        };
        if !paintable.is_activated() {
            return false;
        }

        let mut copy = command.spawn_copy();
        if copy.blend.index() == BlendMode::REPLACE_ORIGINAL {
            copy.blend = copy
                .blend
                .with_original(Vec4::from(paintable.config().color), paintable.base_texture());
        }
        copy.model = paintable.model();
        copy.submesh = paintable.config().submesh;
        if let Some(model) = paintable.model().and_then(|m| self.models.get(m)) {
            paintable.set_local_to_world(model.local_to_world());
        }
        paintable.add_command(copy);
        true
    }

    /// Late-frame flush: drop cached world-space meshes, then execute every
    /// paintable texture once in registration order
    fn flush(&mut self) -> FrameReport {
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };

        for model in self.models.values_mut() {
            model.clear_prepared();
        }

        for id in self.paintables.ids() {
            if let Ok(batch) = self.with_paintable(id, |paintable, ctx| paintable.execute_commands(ctx, true)) {
                report.textures += 1;
                report.add(batch);
            }
        }

        debug!(
            "PaintManager: frame {} flushed {} textures, {} commands applied, {} skipped",
            report.frame, report.textures, report.applied, report.skipped
        );
        report
    }
}

/// Submission phase of one frame
pub struct Frame<'a> {
    manager: &'a mut PaintManager,
    ended: bool,
}

impl Frame<'_> {
    /// Queue `command` (and its cloned copies) for this frame's flush
    pub fn submit(&mut self, command: &Command, target: SubmitTarget, group: Option<Group>) -> usize {
        self.manager.submit(command, target, group)
    }

    pub fn manager(&self) -> &PaintManager {
        self.manager
    }

    /// Close the frame and flush every paintable texture
    pub fn end(mut self) -> FrameReport {
        self.ended = true;
        self.manager.flush()
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        if !self.ended {
            self.manager.flush();
        }
    }
}
