use thiserror::Error;

use crate::constants::BLEND_MODE_COUNT;

/// Configuration-class failures. Callers log these and skip the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid texture dimensions {width}x{height} (max {max})")]
    InvalidDimensions { width: u32, height: u32, max: u32 },
    #[error("Pixel buffer holds {actual} texels, expected {expected}")]
    PixelBufferLength { expected: usize, actual: usize },
    #[error("Blend index {0} out of range 0..{BLEND_MODE_COUNT}")]
    BlendIndex(u8),
    #[error("Size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },
    #[error("Mesh attribute {attribute} has {actual} entries, expected {expected}")]
    MeshAttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Triangle index {index} out of range for {vertex_count} vertices")]
    TriangleIndex { index: u32, vertex_count: usize },
}

/// Check that a texture size is non-zero and within `max` on both axes
pub fn validate_dimensions(width: u32, height: u32, max: u32) -> Result<(), ValidationError> {
    if width == 0 || height == 0 || width > max || height > max {
        return Err(ValidationError::InvalidDimensions { width, height, max });
    }
    Ok(())
}

/// Check a texel buffer against the texel count it should hold
pub fn validate_pixel_len(expected: usize, actual: usize) -> Result<(), ValidationError> {
    if expected != actual {
        return Err(ValidationError::PixelBufferLength { expected, actual });
    }
    Ok(())
}

/// Check that two textures share the same size
pub fn validate_same_size(expected: (u32, u32), actual: (u32, u32)) -> Result<(), ValidationError> {
    if expected != actual {
        return Err(ValidationError::DimensionMismatch {
            expected_width: expected.0,
            expected_height: expected.1,
            width: actual.0,
            height: actual.1,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        assert!(validate_dimensions(16, 16, 64).is_ok());
        assert!(validate_dimensions(0, 16, 64).is_err());
        assert!(validate_dimensions(16, 65, 64).is_err());
    }

    #[test]
    fn test_same_size() {
        assert!(validate_same_size((4, 4), (4, 4)).is_ok());
        let err = validate_same_size((4, 4), (8, 4)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DimensionMismatch {
                expected_width: 4,
                expected_height: 4,
                width: 8,
                height: 4
            }
        );
    }
}
