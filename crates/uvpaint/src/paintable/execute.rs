//! Per-frame flush of the paint and preview queues

use tracing::debug;
use uvpaint_config::UndoRedoMode;

use crate::command::Command;
use crate::compositor::{BatchReport, CompositeContext, execute_batch};
use crate::target::RenderTarget;

use super::{PaintableTexture, TextureEvent, emit};

impl PaintableTexture {
    /// Composite pending commands.
    ///
    /// Committed commands land on `current` first. Preview commands then
    /// run on a copy of the updated `current`, which becomes the visible
    /// target. Without pending previews the preview target is released.
    pub fn execute_commands(
        &mut self,
        ctx: &mut CompositeContext<'_>,
        send_notifications: bool,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        if !self.activated {
            return report;
        }
        if !self.paint_commands.is_empty() {
            self.paint_commands.sort_by(Command::compare);
            if self.config.undo_redo == UndoRedoMode::LocalCommandCopy {
                self.log_local_copies();
            }
        }

        let settings = self.batch_settings();
        let Some(current) = self.current.as_mut() else {
            return report;
        };

        if !self.paint_commands.is_empty() {
            report.merge(execute_batch(&mut self.paint_commands, current, &settings, ctx));
            if send_notifications {
                emit(&self.listeners, TextureEvent::Modified { preview: false });
            }
        }

        if self.preview_commands.is_empty() {
            self.preview = None;
        } else {
            let mut preview = match self.preview.take() {
                Some(mut preview) => {
                    if preview.copy_from(current.surface()).is_ok() {
                        preview
                    } else {
                        RenderTarget::duplicate_of(current)
                    }
                }
                None => RenderTarget::duplicate_of(current),
            };
            report.merge(execute_batch(&mut self.preview_commands, &mut preview, &settings, ctx));
            self.preview = Some(preview);
            if send_notifications {
                emit(&self.listeners, TextureEvent::Modified { preview: true });
            }
        }

        if report.applied + report.skipped > 0 {
            debug!(
                "PaintableTexture: flushed {} commands ({} skipped)",
                report.applied + report.skipped,
                report.skipped
            );
        }
        report
    }

    /// Append texture-space copies of the sorted paint queue to the local
    /// log. The log keeps execution order with a flat priority, so a replay
    /// runs the commands exactly as they ran here.
    fn log_local_copies(&mut self) {
        let world_to_local = self.local_to_world.inverse();
        for command in &self.paint_commands {
            let mut local = command.spawn_copy_local(&world_to_local);
            local.set_state(false, 0);
            local.index = self.local_commands.len();
            self.local_commands.push(local);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;
    use uvpaint_config::PaintableTextureConfig;

    use super::super::test_support::*;
    use super::*;
    use crate::blend::BlendMode;
    use crate::command::{Command, FillCommand};

    fn fill(color: Vec4, preview: bool) -> Command {
        Command::fill(FillCommand::new(color, 1.0), BlendMode::replace(Vec4::ONE)).with_state(preview, 0)
    }

    const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
    const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

    #[test]
    fn test_preview_layers_over_committed_paint() {
        let mut scene = Scene::new();
        let mut texture = activated(PaintableTextureConfig::new(2, 2), &scene);
        let events = record_events(&mut texture);

        texture.add_command(fill(RED, false));
        texture.add_command(fill(BLUE, true));
        let report = texture.execute_commands(&mut scene.context(), true);

        assert_eq!(report.applied, 2);
        assert_eq!(texture.current().unwrap().surface().get_pixel(0, 0), Some(RED.to_array()));
        assert_eq!(texture.preview().unwrap().surface().get_pixel(0, 0), Some(BLUE.to_array()));
        assert!(std::ptr::eq(texture.visible().unwrap(), texture.preview().unwrap()));
        assert!(!texture.commands_pending());

        let events = events.lock().unwrap();
        assert!(events.contains(&TextureEvent::Modified { preview: false }));
        assert!(events.contains(&TextureEvent::Modified { preview: true }));
    }

    #[test]
    fn test_reused_preview_tracks_new_committed_paint() {
        let mut scene = Scene::new();
        let mut texture = activated(PaintableTextureConfig::new(2, 2), &scene);
        let half_blue = Command::fill(FillCommand::new(BLUE, 0.5), BlendMode::alpha_blend(Vec4::ONE)).with_state(true, 0);

        texture.add_command(half_blue.clone());
        texture.execute_commands(&mut scene.context(), false);
        let first = texture.preview().unwrap().surface().get_pixel(0, 0).unwrap();

        texture.add_command(fill(RED, false));
        texture.add_command(half_blue);
        texture.execute_commands(&mut scene.context(), false);
        let second = texture.preview().unwrap().surface().get_pixel(0, 0).unwrap();

        assert_ne!(first, second);
        assert_eq!(second[0], 0.5);
        assert_eq!(texture.current().unwrap().surface().get_pixel(0, 0), Some(RED.to_array()));
    }

    #[test]
    fn test_preview_released_when_no_previews_pending() {
        let mut scene = Scene::new();
        let mut texture = activated(PaintableTextureConfig::new(2, 2), &scene);
        texture.add_command(fill(BLUE, true));
        texture.execute_commands(&mut scene.context(), false);
        assert!(texture.preview().is_some());

        texture.execute_commands(&mut scene.context(), false);
        assert!(texture.preview().is_none());
        assert!(std::ptr::eq(texture.visible().unwrap(), texture.current().unwrap()));
    }

    #[test]
    fn test_preview_does_not_touch_current() {
        let mut scene = Scene::new();
        let mut texture = activated(PaintableTextureConfig::new(4, 4), &scene);
        let before = texture.current().unwrap().surface().clone();

        texture.add_command(fill(RED, true));
        texture.execute_commands(&mut scene.context(), true);
        texture.hide_preview();

        assert_eq!(texture.current().unwrap().surface(), &before);
        assert!(texture.preview().is_none());
    }

    #[test]
    fn test_inactive_texture_keeps_queue() {
        let mut scene = Scene::new();
        let mut texture = crate::paintable::PaintableTexture::new(PaintableTextureConfig::new(2, 2));
        texture.add_command(fill(RED, false));
        let report = texture.execute_commands(&mut scene.context(), true);
        assert_eq!(report, BatchReport::default());
        assert!(texture.commands_pending());
    }

    #[test]
    fn test_silent_flush_sends_no_modified_event() {
        let mut scene = Scene::new();
        let mut texture = activated(PaintableTextureConfig::new(2, 2), &scene);
        let events = record_events(&mut texture);
        texture.add_command(fill(RED, false));
        texture.execute_commands(&mut scene.context(), false);
        assert_eq!(
            *events.lock().unwrap(),
            vec![TextureEvent::CommandAdded { preview: false, index: 0 }]
        );
    }
}
