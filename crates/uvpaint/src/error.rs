//! Error types for the paint core

use std::collections::TryReserveError;

use thiserror::Error;

use crate::types::{PaintableId, TextureId};
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum PaintError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Command requires a mesh but no model is bound")]
    MissingModel,
    #[error("Texture {0:?} is not in the texture store")]
    MissingTexture(TextureId),
    #[error("Submesh {submesh} out of range ({count} submeshes)")]
    SubmeshOutOfRange { submesh: usize, count: usize },
    #[error("Paintable texture is not activated")]
    NotActivated,
    #[error("Paintable texture {0:?} is not registered")]
    UnknownPaintable(PaintableId),
    #[error("Snapshot of {requested} bytes exceeds the {budget} byte budget")]
    ResourceExhausted { requested: usize, budget: usize },
    #[error("Snapshot allocation failed: {0}")]
    AllocationFailed(#[from] TryReserveError),
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
}

impl PaintError {
    /// True for misconfiguration that should be logged and skipped
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PaintError::Validation(_)
                | PaintError::MissingModel
                | PaintError::MissingTexture(_)
                | PaintError::SubmeshOutOfRange { .. }
        )
    }

    /// True when history could not be stored but painting can continue
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(
            self,
            PaintError::ResourceExhausted { .. } | PaintError::AllocationFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err = PaintError::from(ValidationError::BlendIndex(20));
        assert!(err.is_configuration());
        assert!(!err.is_resource_exhaustion());

        let err = PaintError::ResourceExhausted {
            requested: 10,
            budget: 5,
        };
        assert!(err.is_resource_exhaustion());
        assert!(!PaintError::NotActivated.is_configuration());
    }
}
