//! Undo/redo for paintable textures
//!
//! `FullTextureCopy` stores whole pixel copies and restores them wholesale.
//! `LocalCommandCopy` stores the local-space commands committed since the
//! previous state, and rebuilds `current` by replaying every stored command
//! up to the cursor on top of a clean clear.

use std::mem;

use glam::Vec4;
use tracing::{debug, info, warn};
use uvpaint_config::UndoRedoMode;

use crate::command::Command;
use crate::compositor::{CompositeContext, execute_batch};
use crate::error::PaintError;
use crate::history::Snapshot;

use super::{PaintableTexture, TextureEvent};

impl PaintableTexture {
    pub fn can_undo(&self) -> bool {
        self.config.undo_redo != UndoRedoMode::None && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.config.undo_redo != UndoRedoMode::None && self.history.can_redo()
    }

    pub fn state_index(&self) -> usize {
        self.history.index()
    }

    pub fn state_count(&self) -> usize {
        self.history.len()
    }

    /// Store the current state so a later `undo` can return to it.
    /// Call before modifying the texture.
    ///
    /// On failure the history is left as it was and `current` stays paintable.
    pub fn store_state(&mut self) -> Result<(), PaintError> {
        if !self.activated {
            return Err(PaintError::NotActivated);
        }
        let mode = self.config.undo_redo;
        if mode == UndoRedoMode::None {
            return Ok(());
        }

        // Already resting on the newest snapshot: nothing new to store
        if !self.history.on_last_snapshot() {
            let kept = (self.history.index() + 1).min(self.config.state_limit.max(1));
            let snapshot = self.capture_snapshot(kept)?;
            self.history.trim_future();
            self.history.push(snapshot);
        }

        if mode == UndoRedoMode::FullTextureCopy {
            let trimmed = self.history.trim_past(self.config.state_limit);
            if trimmed > 0 {
                debug!("PaintableTexture: dropped {} oldest states", trimmed);
            }
        }
        self.history.seek_head();

        info!(
            "PaintableTexture: stored state {} ({} bytes held)",
            self.history.index(),
            self.history.pixel_bytes()
        );
        Ok(())
    }

    /// Step back one state. Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self, ctx: &mut CompositeContext<'_>) -> Result<bool, PaintError> {
        if !self.can_undo() {
            return Ok(false);
        }

        // First undo from the head keeps the live state as the redo target.
        // It sits above the stored limit, so the budget only counts the rest.
        if self.history.at_head() {
            let snapshot = self.capture_snapshot(self.history.len())?;
            self.history.push(snapshot);
        }

        self.clear_commands();
        self.history.step_back();
        self.restore_state(ctx)?;

        info!("PaintableTexture: undo to state {}", self.history.index());
        self.notify(TextureEvent::Modified { preview: false });
        Ok(true)
    }

    /// Step forward one state. Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self, ctx: &mut CompositeContext<'_>) -> Result<bool, PaintError> {
        if !self.can_redo() {
            return Ok(false);
        }

        self.clear_commands();
        self.history.step_forward();
        self.restore_state(ctx)?;

        info!("PaintableTexture: redo to state {}", self.history.index());
        self.notify(TextureEvent::Modified { preview: false });
        Ok(true)
    }

    pub fn clear_states(&mut self) {
        if !self.history.is_empty() {
            debug!("PaintableTexture: cleared {} states", self.history.len());
        }
        self.history.clear();
    }

    /// Build the snapshot for the active mode. `retained` is the number of
    /// pixel snapshots held once it is stored, checked against the budget.
    fn capture_snapshot(&mut self, retained: usize) -> Result<Snapshot, PaintError> {
        match self.config.undo_redo {
            UndoRedoMode::LocalCommandCopy => Ok(Snapshot::Commands(mem::take(&mut self.local_commands))),
            UndoRedoMode::FullTextureCopy | UndoRedoMode::None => {
                let current = self.current.as_ref().ok_or(PaintError::NotActivated)?;
                if let Some(budget) = self.config.snapshot_budget_bytes {
                    let requested = current.surface().as_bytes().len() * retained;
                    if requested > budget {
                        warn!(
                            "PaintableTexture: snapshot needs {} bytes, budget is {}",
                            requested, budget
                        );
                        return Err(PaintError::ResourceExhausted { requested, budget });
                    }
                }
                let pixels = current.try_snapshot().inspect_err(|err| {
                    warn!("PaintableTexture: snapshot allocation failed: {}", err);
                })?;
                Ok(Snapshot::Pixels(pixels))
            }
        }
    }

    fn restore_state(&mut self, ctx: &mut CompositeContext<'_>) -> Result<(), PaintError> {
        match self.config.undo_redo {
            UndoRedoMode::FullTextureCopy => {
                let Some(Snapshot::Pixels(pixels)) = self.history.current() else {
                    return Ok(());
                };
                let pixels = pixels.try_clone()?;
                self.replace_surface(pixels);
                Ok(())
            }
            UndoRedoMode::LocalCommandCopy => self.rebuild_from_commands(ctx),
            UndoRedoMode::None => Ok(()),
        }
    }

    /// Clear to the base state, then replay every stored command up to the
    /// cursor, converted back to world space with the current transform.
    /// Logged commands already carry their execution order.
    fn rebuild_from_commands(&mut self, ctx: &mut CompositeContext<'_>) -> Result<(), PaintError> {
        let local_to_world = self.local_to_world;
        let mut replay: Vec<Command> = self
            .history
            .commands_through_cursor()
            .enumerate()
            .map(|(index, local)| {
                let mut world = local.spawn_copy_world(&local_to_world);
                world.set_state(false, 0);
                world.index = index;
                world
            })
            .collect();

        let color = Vec4::from(self.config.color);
        self.preview = None;
        if replay.is_empty() {
            return self.clear(ctx.textures, self.base_texture, color);
        }

        self.clear_without_mips(ctx.textures, self.base_texture, color)?;
        debug!("PaintableTexture: replaying {} commands", replay.len());
        let settings = self.batch_settings();
        let current = self.current.as_mut().ok_or(PaintError::NotActivated)?;
        execute_batch(&mut replay, current, &settings, ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Mat4, Vec3, Vec4};
    use uvpaint_config::PaintableTextureConfig;

    use super::super::test_support::*;
    use super::*;
    use crate::blend::BlendMode;
    use crate::command::{FillCommand, SphereCommand};
    use crate::mesh::{Model, PaintMesh};

    fn fill(color: Vec4) -> Command {
        Command::fill(FillCommand::new(color, 1.0), BlendMode::replace(Vec4::ONE)).with_double_buffer(false)
    }

    fn paint(texture: &mut PaintableTexture, scene: &mut Scene, command: Command) {
        texture.store_state().unwrap();
        texture.add_command(command);
        texture.execute_commands(&mut scene.context(), true);
    }

    fn pixels(texture: &PaintableTexture) -> Vec<[f32; 4]> {
        texture.current().unwrap().surface().pixels().to_vec()
    }

    const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
    const GREEN: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);

    #[test]
    fn test_full_copy_undo_redo_round_trip() {
        let mut scene = Scene::new();
        let config = PaintableTextureConfig::new(4, 4).with_undo(UndoRedoMode::FullTextureCopy, 10);
        let mut texture = activated(config, &scene);
        let blank = pixels(&texture);

        paint(&mut texture, &mut scene, fill(RED));
        paint(&mut texture, &mut scene, fill(GREEN));
        let painted = pixels(&texture);

        assert!(texture.undo(&mut scene.context()).unwrap());
        assert_eq!(texture.current().unwrap().surface().get_pixel(0, 0), Some(RED.to_array()));
        assert!(texture.redo(&mut scene.context()).unwrap());
        assert_eq!(pixels(&texture), painted);

        assert!(texture.undo(&mut scene.context()).unwrap());
        assert!(texture.undo(&mut scene.context()).unwrap());
        assert_eq!(pixels(&texture), blank);
        assert!(!texture.can_undo());
        assert!(!texture.undo(&mut scene.context()).unwrap());
    }

    #[test]
    fn test_bounded_history() {
        let mut scene = Scene::new();
        let config = PaintableTextureConfig::new(2, 2).with_undo(UndoRedoMode::FullTextureCopy, 3);
        let mut texture = activated(config, &scene);
        for step in 0..5 {
            paint(&mut texture, &mut scene, fill(Vec4::splat(step as f32 / 10.0)));
        }
        assert!(texture.state_count() <= 3);

        let mut undone = 0;
        while texture.undo(&mut scene.context()).unwrap() {
            undone += 1;
        }
        assert_eq!(undone, 3);
        assert!(!texture.can_undo());
        // The oldest reachable state is the one stored before the third paint
        assert_eq!(
            texture.current().unwrap().surface().get_pixel(0, 0),
            Some([0.1; 4])
        );
    }

    #[test]
    fn test_store_after_redo_to_newest_skips_push() {
        let mut scene = Scene::new();
        let config = PaintableTextureConfig::new(2, 2).with_undo(UndoRedoMode::FullTextureCopy, 10);
        let mut texture = activated(config, &scene);
        paint(&mut texture, &mut scene, fill(RED));
        texture.undo(&mut scene.context()).unwrap();
        texture.redo(&mut scene.context()).unwrap();
        assert_eq!(texture.state_count(), 2);

        texture.store_state().unwrap();
        assert_eq!(texture.state_count(), 2);
        assert_eq!(texture.state_index(), 2);
    }

    #[test]
    fn test_painting_after_undo_discards_redo_branch() {
        let mut scene = Scene::new();
        let config = PaintableTextureConfig::new(2, 2).with_undo(UndoRedoMode::FullTextureCopy, 10);
        let mut texture = activated(config, &scene);
        paint(&mut texture, &mut scene, fill(RED));
        texture.undo(&mut scene.context()).unwrap();
        assert!(texture.can_redo());

        paint(&mut texture, &mut scene, fill(GREEN));
        assert!(!texture.can_redo());
        assert_eq!(texture.current().unwrap().surface().get_pixel(0, 0), Some(GREEN.to_array()));
    }

    #[test]
    fn test_budget_failure_keeps_texture_paintable() {
        let mut scene = Scene::new();
        let mut config = PaintableTextureConfig::new(4, 4).with_undo(UndoRedoMode::FullTextureCopy, 10);
        config.snapshot_budget_bytes = Some(config.snapshot_bytes() - 1);
        let mut texture = activated(config, &scene);

        let err = texture.store_state().unwrap_err();
        assert!(err.is_resource_exhaustion());
        assert_eq!(texture.state_count(), 0);

        texture.add_command(fill(RED));
        texture.execute_commands(&mut scene.context(), true);
        assert_eq!(texture.current().unwrap().surface().get_pixel(0, 0), Some(RED.to_array()));
    }

    #[test]
    fn test_undo_fits_a_budget_sized_for_the_state_limit() {
        let mut scene = Scene::new();
        let mut config = PaintableTextureConfig::new(2, 2).with_undo(UndoRedoMode::FullTextureCopy, 3);
        config.snapshot_budget_bytes = Some(config.snapshot_bytes() * 3);
        let mut texture = activated(config, &scene);
        for step in 0..5 {
            paint(&mut texture, &mut scene, fill(Vec4::splat(step as f32 / 10.0)));
        }
        assert_eq!(texture.state_count(), 3);

        let mut undone = 0;
        while texture.can_undo() {
            assert!(texture.undo(&mut scene.context()).unwrap());
            undone += 1;
        }
        assert_eq!(undone, 3);
    }

    #[test]
    fn test_replay_keeps_execution_order_across_frames() {
        let mut scene = Scene::new();
        let config = PaintableTextureConfig::new(2, 2).with_undo(UndoRedoMode::LocalCommandCopy, 10);
        let mut texture = activated(config, &scene);
        let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);

        paint(&mut texture, &mut scene, fill(RED).with_state(false, 5));
        paint(&mut texture, &mut scene, fill(blue).with_state(false, 0));
        let live = pixels(&texture);
        assert_eq!(live[0], blue.to_array());

        assert!(texture.undo(&mut scene.context()).unwrap());
        assert_eq!(pixels(&texture)[0], RED.to_array());
        assert!(texture.redo(&mut scene.context()).unwrap());
        assert_eq!(pixels(&texture), live);
    }

    #[test]
    fn test_store_state_requires_activation() {
        let mut texture = PaintableTexture::new(
            PaintableTextureConfig::new(2, 2).with_undo(UndoRedoMode::FullTextureCopy, 10),
        );
        assert!(matches!(texture.store_state(), Err(PaintError::NotActivated)));
    }

    #[test]
    fn test_undo_disabled_without_mode() {
        let mut scene = Scene::new();
        let mut texture = activated(PaintableTextureConfig::new(2, 2), &scene);
        paint(&mut texture, &mut scene, fill(RED));
        assert_eq!(texture.state_count(), 0);
        assert!(!texture.undo(&mut scene.context()).unwrap());
    }

    #[test]
    fn test_command_replay_matches_full_copy() {
        let mut scene = Scene::new();
        let model = scene
            .models
            .insert(Model::new(Arc::new(PaintMesh::quad(2.0)), Mat4::IDENTITY));

        let spheres = [
            (Vec3::new(-0.4, 0.2, 0.0), RED),
            (Vec3::new(0.3, -0.1, 0.0), GREEN),
            (Vec3::new(0.0, 0.0, 0.0), Vec4::new(0.0, 0.0, 1.0, 0.5)),
        ];
        let sphere = |(position, color): (Vec3, Vec4)| {
            let mut command = Command::sphere(SphereCommand::new(position, 0.5), BlendMode::alpha_blend(Vec4::ONE));
            if let crate::command::CommandKind::Sphere(s) = &mut command.kind {
                s.set_color(color, 0.8, 0.3);
            }
            command.model = Some(model);
            command
        };

        let mut by_pixels = activated(
            PaintableTextureConfig::new(16, 16).with_undo(UndoRedoMode::FullTextureCopy, 10),
            &scene,
        );
        let mut by_commands = activated(
            PaintableTextureConfig::new(16, 16).with_undo(UndoRedoMode::LocalCommandCopy, 10),
            &scene,
        );
        for texture in [&mut by_pixels, &mut by_commands] {
            for &step in &spheres {
                paint(texture, &mut scene, sphere(step));
            }
            assert!(texture.undo(&mut scene.context()).unwrap());
        }

        let expected = pixels(&by_pixels);
        let replayed = pixels(&by_commands);
        for (a, b) in expected.iter().zip(&replayed) {
            for c in 0..4 {
                assert!((a[c] - b[c]).abs() < 1e-5, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_replay_without_commands_is_plain_clear() {
        let mut scene = Scene::new();
        let config = PaintableTextureConfig::new(2, 2).with_undo(UndoRedoMode::LocalCommandCopy, 10);
        let mut texture = activated(config, &scene);
        let blank = pixels(&texture);
        paint(&mut texture, &mut scene, fill(RED));
        assert!(texture.undo(&mut scene.context()).unwrap());
        assert_eq!(pixels(&texture), blank);
        assert!(texture.redo(&mut scene.context()).unwrap());
        assert_eq!(texture.current().unwrap().surface().get_pixel(1, 1), Some(RED.to_array()));
    }
}
