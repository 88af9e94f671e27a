//! Paint and preview queues

use tracing::debug;

use crate::command::Command;

use super::{PaintableTexture, TextureEvent};

impl PaintableTexture {
    /// Queue a command for the next flush.
    ///
    /// The command's `index` becomes its queue position.
    pub fn add_command(&mut self, mut command: Command) {
        let preview = command.preview;
        let index = if preview {
            command.index = self.preview_commands.len();
            self.preview_commands.push(command);
            self.preview_commands.len() - 1
        } else {
            command.index = self.paint_commands.len();
            self.paint_commands.push(command);
            self.paint_commands.len() - 1
        };

        debug!(
            "PaintableTexture: queued command at {} (preview: {})",
            index, preview
        );
        self.notify(TextureEvent::CommandAdded { preview, index });
    }

    pub fn commands_pending(&self) -> bool {
        !self.paint_commands.is_empty() || !self.preview_commands.is_empty()
    }

    pub fn paint_commands(&self) -> &[Command] {
        &self.paint_commands
    }

    pub fn preview_commands(&self) -> &[Command] {
        &self.preview_commands
    }

    pub fn local_commands(&self) -> &[Command] {
        &self.local_commands
    }

    /// Discard every queued command and the unsaved local log
    pub fn clear_commands(&mut self) {
        self.paint_commands.clear();
        self.preview_commands.clear();
        self.local_commands.clear();
    }

    /// Drop pending previews and the preview target, showing `current`
    pub fn hide_preview(&mut self) {
        self.preview_commands.clear();
        if self.preview.take().is_some() {
            debug!("PaintableTexture: preview hidden");
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3, Vec4};
    use uvpaint_config::{PaintableTextureConfig, UndoRedoMode};

    use super::super::test_support::*;
    use super::*;
    use crate::blend::BlendMode;
    use crate::command::{CommandKind, FillCommand, SphereCommand};

    fn fill(preview: bool) -> Command {
        Command::fill(FillCommand::new(Vec4::ONE, 1.0), BlendMode::default()).with_state(preview, 0)
    }

    #[test]
    fn test_indices_follow_queue_position() {
        let scene = Scene::new();
        let mut texture = activated(PaintableTextureConfig::new(2, 2), &scene);
        let events = record_events(&mut texture);

        texture.add_command(fill(false));
        texture.add_command(fill(true));
        texture.add_command(fill(false));

        assert_eq!(texture.paint_commands()[1].index, 1);
        assert_eq!(texture.preview_commands()[0].index, 0);
        assert!(texture.commands_pending());
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                TextureEvent::CommandAdded { preview: false, index: 0 },
                TextureEvent::CommandAdded { preview: true, index: 0 },
                TextureEvent::CommandAdded { preview: false, index: 1 },
            ]
        );
    }

    #[test]
    fn test_local_log_only_in_command_mode() {
        let mut scene = Scene::new();
        let mut plain = activated(PaintableTextureConfig::new(2, 2), &scene);
        plain.add_command(fill(false));
        plain.execute_commands(&mut scene.context(), false);
        assert!(plain.local_commands().is_empty());

        let config = PaintableTextureConfig::new(2, 2).with_undo(UndoRedoMode::LocalCommandCopy, 10);
        let mut logged = activated(config, &scene);
        logged.add_command(fill(false));
        logged.add_command(fill(true));
        // Logged when the commands run, not when they are queued
        assert!(logged.local_commands().is_empty());
        logged.execute_commands(&mut scene.context(), false);
        assert_eq!(logged.local_commands().len(), 1);
    }

    #[test]
    fn test_local_copy_is_in_texture_space() {
        let mut scene = Scene::new();
        let config = PaintableTextureConfig::new(2, 2).with_undo(UndoRedoMode::LocalCommandCopy, 10);
        let mut texture = activated(config, &scene);
        texture.set_local_to_world(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        texture.add_command(Command::sphere(
            SphereCommand::new(Vec3::new(6.0, 0.0, 0.0), 1.0),
            BlendMode::default(),
        ));
        texture.execute_commands(&mut scene.context(), false);

        let CommandKind::Sphere(local) = &texture.local_commands()[0].kind else {
            panic!("variant changed");
        };
        assert!((local.extrusion.anchor() - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_clear_commands_empties_all_queues() {
        let mut scene = Scene::new();
        let config = PaintableTextureConfig::new(2, 2).with_undo(UndoRedoMode::LocalCommandCopy, 10);
        let mut texture = activated(config, &scene);
        texture.add_command(fill(false));
        texture.execute_commands(&mut scene.context(), false);
        texture.add_command(fill(false));
        texture.add_command(fill(true));
        assert_eq!(texture.local_commands().len(), 1);
        texture.clear_commands();
        assert!(!texture.commands_pending());
        assert!(texture.local_commands().is_empty());
    }
}
