//! Pixel counters over committed texture state
//!
//! Both counters work on 8-bit quantized pixels, the same precision a host
//! would read back. A mask texel counts when its selected channel is above
//! half intensity.

use glam::Vec4;

use crate::surface::CpuSurface;
use crate::types::Channel;
use crate::validation::{ValidationError, validate_pixel_len};

/// Mask surface plus the channel read from it
#[derive(Debug, Clone, Copy)]
pub struct PixelMask<'a> {
    pub surface: &'a CpuSurface,
    pub channel: Channel,
}

impl PixelMask<'_> {
    fn allows(&self, index: usize) -> bool {
        quantize(self.surface.pixels()[index][self.channel.index()]) > 127
    }
}

/// Per-channel counts of texels at or above a threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelCounts {
    pub total: u64,
    pub counts: [u64; 4],
}

impl ChannelCounts {
    pub fn count(&self, channel: Channel) -> u64 {
        self.counts[channel.index()]
    }

    pub fn ratio(&self, channel: Channel) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(channel) as f32 / self.total as f32
    }

    pub fn ratios(&self) -> Vec4 {
        if self.total == 0 {
            return Vec4::ZERO;
        }
        let scale = 1.0 / self.total as f32;
        Vec4::from_array(self.counts.map(|c| c as f32 * scale)).clamp(Vec4::ZERO, Vec4::ONE)
    }

    /// Combine counts from several textures
    pub fn merge(&mut self, other: &ChannelCounts) {
        self.total += other.total;
        for (a, b) in self.counts.iter_mut().zip(other.counts) {
            *a += b;
        }
    }
}

/// Count texels whose channel value reaches `threshold`, per channel
pub fn count_channels(
    current: &CpuSurface,
    mask: Option<PixelMask<'_>>,
    threshold: f32,
) -> Result<ChannelCounts, ValidationError> {
    if let Some(mask) = &mask {
        validate_pixel_len(current.pixel_count(), mask.surface.pixel_count())?;
    }
    let threshold = quantize(threshold);
    let mut result = ChannelCounts::default();

    for (i, pixel) in current.pixels().iter().enumerate() {
        if mask.as_ref().is_some_and(|m| !m.allows(i)) {
            continue;
        }
        result.total += 1;
        for (count, value) in result.counts.iter_mut().zip(pixel) {
            if quantize(*value) >= threshold {
                *count += 1;
            }
        }
    }
    Ok(result)
}

/// Count of texels matching a reference, out of the texels considered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCount {
    pub count: u64,
    pub total: u64,
}

impl ChangeCount {
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.count as f32 / self.total as f32
    }
}

/// Counts texels still within `threshold` of a reference state.
///
/// The distance is the summed absolute RGBA8 difference.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeCounter {
    reference: Vec<[u8; 4]>,
    threshold: f32,
}

impl ChangeCounter {
    pub const DEFAULT_THRESHOLD: f32 = 0.1;

    pub fn new(reference: &CpuSurface) -> Self {
        Self {
            reference: quantize_all(reference),
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn count(&self, current: &CpuSurface, mask: Option<PixelMask<'_>>) -> Result<ChangeCount, ValidationError> {
        validate_pixel_len(self.reference.len(), current.pixel_count())?;
        if let Some(mask) = &mask {
            validate_pixel_len(current.pixel_count(), mask.surface.pixel_count())?;
        }
        let threshold = u32::from(quantize(self.threshold));
        let mut result = ChangeCount::default();

        for (i, (pixel, reference)) in current.pixels().iter().zip(&self.reference).enumerate() {
            if mask.as_ref().is_some_and(|m| !m.allows(i)) {
                continue;
            }
            result.total += 1;
            let distance: u32 = pixel
                .iter()
                .zip(reference)
                .map(|(c, r)| u32::from(quantize(*c).abs_diff(*r)))
                .sum();
            if distance <= threshold {
                result.count += 1;
            }
        }
        Ok(result)
    }
}

#[inline]
fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

fn quantize_all(surface: &CpuSurface) -> Vec<[u8; 4]> {
    surface.pixels().iter().map(|p| p.map(quantize)).collect()
}
