//! UV-space texture painting - command queues, compositing and undo
//!
//! This crate provides the CPU painting core:
//! - Blend modes and per-channel compositing
//! - Paint commands (fill, sphere, decal, texture replacement)
//! - Per-texture command queues with preview and commit paths
//! - Clone replication of every submitted command
//! - Snapshot and command-replay undo/redo
//! - A registry of paintable textures driven once per frame
//! - Pixel counters and gradual fades over committed state

pub mod blend;
pub mod clone;
pub mod command;
pub mod compositor;
pub mod constants;
pub mod error;
pub mod fade;
pub mod history;
pub mod manager;
pub mod mesh;
pub mod monitor;
pub mod paintable;
pub mod pool;
pub mod registry;
pub mod surface;
pub mod target;
pub mod texture;
pub mod types;
pub mod validation;

pub use blend::*;
pub use clone::*;
pub use command::*;
pub use compositor::*;
pub use constants::*;
pub use error::*;
pub use fade::*;
pub use history::*;
pub use manager::*;
pub use mesh::*;
pub use monitor::*;
pub use paintable::*;
pub use pool::*;
pub use registry::*;
pub use surface::*;
pub use target::*;
pub use texture::*;
pub use types::*;
pub use validation::*;

pub use uvpaint_config as config;
