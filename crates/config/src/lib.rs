//! Shared configuration for uvpaint
//!
//! This crate provides the single source of truth for paintable texture
//! settings and paint manager limits. Every struct uses `#[serde(default)]`
//! so hosts can load partial documents and keep defaults for the rest.

use serde::{Deserialize, Serialize};

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default paintable texture width in pixels
pub const DEFAULT_WIDTH: u32 = 512;

/// Default paintable texture height in pixels
pub const DEFAULT_HEIGHT: u32 = 512;

/// Default amount of full texture snapshots kept for undo
pub const DEFAULT_STATE_LIMIT: usize = 10;

/// Default amount of pooled scratch surfaces kept per size
pub const DEFAULT_SCRATCH_MAX_PER_KEY: usize = 4;

/// Largest texture edge the manager accepts
pub const DEFAULT_MAX_TEXTURE_SIZE: u32 = 8192;

/// How a paintable texture stores undo/redo states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UndoRedoMode {
    /// No history is kept.
    #[default]
    None,
    /// A full copy of the pixels is stored per state. Fast to restore,
    /// memory grows with `state_limit * width * height`.
    FullTextureCopy,
    /// Paint commands are stored in local space and replayed from a clean
    /// texture. Unlimited depth, cost grows with the replayed command count.
    LocalCommandCopy,
}

/// Mip chain mode of the created render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MipMode {
    /// Copied from the base texture (off when there is none).
    #[default]
    Auto,
    On,
    Off,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FilterMode {
    Point,
    #[default]
    Bilinear,
}

/// Texture coordinate wrapping per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    Clamp,
    Mirror,
}

/// Conversion applied when a texture is cleared from its base texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConversionMode {
    #[default]
    None,
    /// Repack the base texture as a tangent-space normal map.
    Normal,
    /// Multiply RGB by alpha.
    Premultiply,
}

/// Which mesh UV channel a texture is mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Coord {
    #[default]
    First,
    Second,
}

/// Settings for one paintable texture slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct PaintableTextureConfig {
    /// Render target width in pixels
    pub width: u32,
    /// Render target height in pixels
    pub height: u32,
    /// Clear color, multiplied with the base texture when there is one
    pub color: [f32; 4],
    /// Undo/redo strategy
    pub undo_redo: UndoRedoMode,
    /// Maximum retained full texture snapshots
    pub state_limit: usize,
    /// Optional byte budget for full texture snapshots
    pub snapshot_budget_bytes: Option<usize>,
    pub mip_maps: MipMode,
    pub filter: FilterMode,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
    pub conversion: ConversionMode,
    /// UV channel used when rasterizing the owning mesh
    pub coord: Coord,
    /// Only paint submitted with a matching group reaches this texture
    pub group: u32,
    /// Submesh (material slot) of the owning model this texture covers
    pub submesh: usize,
}

impl Default for PaintableTextureConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            color: [1.0, 1.0, 1.0, 1.0],
            undo_redo: UndoRedoMode::None,
            state_limit: DEFAULT_STATE_LIMIT,
            snapshot_budget_bytes: None,
            mip_maps: MipMode::Auto,
            filter: FilterMode::Bilinear,
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
            conversion: ConversionMode::None,
            coord: Coord::First,
            group: 0,
            submesh: 0,
        }
    }
}

impl PaintableTextureConfig {
    /// Create a config with the given dimensions and defaults elsewhere
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Builder-style undo mode selection
    pub fn with_undo(mut self, mode: UndoRedoMode, state_limit: usize) -> Self {
        self.undo_redo = mode;
        self.state_limit = state_limit;
        self
    }

    /// Bytes needed for one full texture snapshot (RGBA f32)
    pub fn snapshot_bytes(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 16
    }
}

/// Paint manager limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct ManagerConfig {
    /// Scratch surfaces kept per (width, height) once released
    pub scratch_max_per_key: usize,
    /// Largest accepted texture edge in pixels
    pub max_texture_size: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            scratch_max_per_key: DEFAULT_SCRATCH_MAX_PER_KEY,
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PaintableTextureConfig::default();
        assert_eq!(config.width, DEFAULT_WIDTH);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.state_limit, DEFAULT_STATE_LIMIT);
        assert_eq!(config.undo_redo, UndoRedoMode::None);
        assert_eq!(config.color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let json = r#"{ "width": 64, "undo_redo": "LocalCommandCopy" }"#;
        let config: PaintableTextureConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.undo_redo, UndoRedoMode::LocalCommandCopy);
        assert_eq!(config.wrap_u, WrapMode::Repeat);
    }

    #[test]
    fn test_snapshot_bytes() {
        let config = PaintableTextureConfig::new(4, 2);
        assert_eq!(config.snapshot_bytes(), 4 * 2 * 16);
    }

    #[test]
    fn test_manager_defaults() {
        let config: ManagerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.scratch_max_per_key, DEFAULT_SCRATCH_MAX_PER_KEY);
        assert_eq!(config.max_texture_size, DEFAULT_MAX_TEXTURE_SIZE);
    }
}
