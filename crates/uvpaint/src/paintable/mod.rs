//! Paintable textures
//!
//! A [`PaintableTexture`] owns the committed `current` target, an optional
//! `preview` target, the paint and preview queues and the undo history.
//! The work is split the way it is used:
//! - `queue`: adding and discarding commands
//! - `execute`: the per-frame flush
//! - `undo`: snapshot storage and undo/redo
//! - `surface_ops`: direct (non-queued) clear, replace, resize and PNG I/O

mod execute;
mod queue;
mod surface_ops;
mod undo;

use std::fmt;

use glam::{Mat4, Vec4};
use tracing::info;
use uvpaint_config::{MipMode, PaintableTextureConfig, UndoRedoMode};

use crate::command::Command;
use crate::compositor::{BatchSettings, LocalMask};
use crate::error::PaintError;
use crate::history::History;
use crate::surface::Sampler;
use crate::target::RenderTarget;
use crate::texture::TextureStore;
use crate::types::{Group, ModelId, TextureId};
use crate::validation::validate_dimensions;

/// Notifications a paintable texture sends to its listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureEvent {
    /// A command entered the paint or preview queue at `index`
    CommandAdded { preview: bool, index: usize },
    /// `current` (or `preview`) pixels changed
    Modified { preview: bool },
}

type Listener = Box<dyn Fn(TextureEvent) + Send + Sync>;

pub struct PaintableTexture {
    pub(crate) config: PaintableTextureConfig,
    /// Source the texture clears to, tinted by `config.color`
    pub(crate) base_texture: Option<TextureId>,
    /// Mesh that decals and spheres rasterize against
    pub(crate) model: Option<ModelId>,
    pub(crate) local_mask: Option<LocalMask>,
    pub(crate) local_to_world: Mat4,
    pub(crate) activated: bool,
    pub(crate) current: Option<RenderTarget>,
    pub(crate) preview: Option<RenderTarget>,
    pub(crate) paint_commands: Vec<Command>,
    pub(crate) preview_commands: Vec<Command>,
    /// Local-space copies of committed commands since the last stored state
    pub(crate) local_commands: Vec<Command>,
    pub(crate) history: History,
    /// Largest width or height accepted on activation and resize
    pub(crate) max_texture_size: u32,
    listeners: Vec<Listener>,
}

impl fmt::Debug for PaintableTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintableTexture")
            .field("size", &(self.config.width, self.config.height))
            .field("activated", &self.activated)
            .field("paint_commands", &self.paint_commands.len())
            .field("preview_commands", &self.preview_commands.len())
            .field("states", &self.history.len())
            .field("state_index", &self.history.index())
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

impl PaintableTexture {
    pub fn new(config: PaintableTextureConfig) -> Self {
        Self {
            config,
            base_texture: None,
            model: None,
            local_mask: None,
            local_to_world: Mat4::IDENTITY,
            activated: false,
            current: None,
            preview: None,
            paint_commands: Vec::new(),
            preview_commands: Vec::new(),
            local_commands: Vec::new(),
            history: History::new(),
            max_texture_size: uvpaint_config::DEFAULT_MAX_TEXTURE_SIZE,
            listeners: Vec::new(),
        }
    }

    pub fn with_max_texture_size(mut self, max_texture_size: u32) -> Self {
        self.max_texture_size = max_texture_size;
        self
    }

    pub fn with_base_texture(mut self, texture: Option<TextureId>) -> Self {
        self.base_texture = texture;
        self
    }

    pub fn with_model(mut self, model: Option<ModelId>) -> Self {
        self.model = model;
        self
    }

    pub fn with_local_mask(mut self, mask: Option<LocalMask>) -> Self {
        self.local_mask = mask;
        self
    }

    pub fn config(&self) -> &PaintableTextureConfig {
        &self.config
    }

    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    /// Sampler the host should read `current` and `preview` with
    pub fn sampler(&self) -> Sampler {
        Sampler {
            filter: self.config.filter,
            wrap_u: self.config.wrap_u,
            wrap_v: self.config.wrap_v,
        }
    }

    pub fn group(&self) -> Group {
        Group(self.config.group)
    }

    pub fn model(&self) -> Option<ModelId> {
        self.model
    }

    pub fn base_texture(&self) -> Option<TextureId> {
        self.base_texture
    }

    pub fn undo_mode(&self) -> UndoRedoMode {
        self.config.undo_redo
    }

    pub fn local_to_world(&self) -> Mat4 {
        self.local_to_world
    }

    /// Transform used to store and replay local command copies
    pub fn set_local_to_world(&mut self, local_to_world: Mat4) {
        self.local_to_world = local_to_world;
    }

    pub fn set_local_mask(&mut self, mask: Option<LocalMask>) {
        self.local_mask = mask;
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn current(&self) -> Option<&RenderTarget> {
        self.current.as_ref()
    }

    pub fn preview(&self) -> Option<&RenderTarget> {
        self.preview.as_ref()
    }

    /// The externally visible target: the preview while one exists
    pub fn visible(&self) -> Option<&RenderTarget> {
        self.preview.as_ref().or(self.current.as_ref())
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Register a listener for [`TextureEvent`]s
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(TextureEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub(crate) fn notify(&self, event: TextureEvent) {
        emit(&self.listeners, event);
    }

    /// Allocate `current` and clear it to the base texture and colour
    pub fn activate(&mut self, textures: &TextureStore) -> Result<(), PaintError> {
        if self.activated {
            return Ok(());
        }
        validate_dimensions(self.config.width, self.config.height, self.max_texture_size)?;

        let base = self
            .base_texture
            .map(|id| textures.require(id))
            .transpose()?;
        let use_mips = match self.config.mip_maps {
            MipMode::On => true,
            MipMode::Off => false,
            MipMode::Auto => base.is_some_and(|t| t.has_mips()),
        };

        self.current = Some(
            RenderTarget::new(self.config.width, self.config.height, use_mips).with_sampler(self.sampler()),
        );
        self.activated = true;
        self.clear(textures, self.base_texture, Vec4::from(self.config.color))?;

        info!(
            "PaintableTexture: activated {}x{} (mips: {}, undo: {:?})",
            self.config.width, self.config.height, use_mips, self.config.undo_redo
        );
        self.notify(TextureEvent::Modified { preview: false });
        Ok(())
    }

    /// Release targets, pending commands and history
    pub fn deactivate(&mut self) {
        if !self.activated {
            return;
        }
        self.activated = false;
        self.current = None;
        self.preview = None;
        self.clear_commands();
        self.clear_states();
        info!("PaintableTexture: deactivated");
    }

    pub(crate) fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            coord: self.config.coord,
            local_mask: self.local_mask,
        }
    }
}

fn emit(listeners: &[Listener], event: TextureEvent) {
    for listener in listeners {
        listener(event);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::surface::{CpuSurface, Sampler};
    use crate::texture::Texture;

    #[test]
    fn test_activate_clears_to_base_colour() {
        let scene = Scene::new();
        let mut config = PaintableTextureConfig::new(4, 4);
        config.color = [0.2, 0.4, 0.6, 1.0];
        let mut texture = PaintableTexture::new(config);
        let events = record_events(&mut texture);

        texture.activate(&scene.textures).unwrap();
        let current = texture.current().unwrap();
        assert_eq!(current.size(), (4, 4));
        assert_eq!(current.surface().get_pixel(3, 3), Some([0.2, 0.4, 0.6, 1.0]));
        assert_eq!(*events.lock().unwrap(), vec![TextureEvent::Modified { preview: false }]);
    }

    #[test]
    fn test_auto_mips_follow_base_texture() {
        let mut scene = Scene::new();
        let base = scene
            .textures
            .insert(Texture::new(CpuSurface::filled(4, 4, [1.0; 4]), Sampler::default()).with_mips(true));
        let mut texture = PaintableTexture::new(PaintableTextureConfig::new(4, 4)).with_base_texture(Some(base));
        texture.activate(&scene.textures).unwrap();
        assert!(texture.current().unwrap().uses_mips());

        let plain = activated(PaintableTextureConfig::new(4, 4), &scene);
        assert!(!plain.current().unwrap().uses_mips());
    }

    #[test]
    fn test_activate_rejects_zero_size() {
        let scene = Scene::new();
        let mut texture = PaintableTexture::new(PaintableTextureConfig::new(0, 4));
        let err = texture.activate(&scene.textures).unwrap_err();
        assert!(err.is_configuration());
        assert!(!texture.is_activated());
    }

    #[test]
    fn test_missing_base_texture_fails_activation() {
        let mut scene = Scene::new();
        let id = scene.textures.insert(Texture::new(CpuSurface::new(1, 1), Sampler::default()));
        scene.textures.remove(id);
        let mut texture = PaintableTexture::new(PaintableTextureConfig::new(2, 2)).with_base_texture(Some(id));
        assert!(matches!(
            texture.activate(&scene.textures),
            Err(PaintError::MissingTexture(_))
        ));
    }

    #[test]
    fn test_deactivate_releases_everything() {
        let scene = Scene::new();
        let mut texture = activated(PaintableTextureConfig::new(2, 2), &scene);
        texture.deactivate();
        assert!(texture.current().is_none());
        assert!(texture.visible().is_none());
        assert!(texture.history().is_empty());
    }
}
