//! Gradual fading toward a colour or texture
//!
//! Fading accumulates `speed * dt` and emits a fill once the accumulated
//! amount passes the threshold. Each fill moves by a whole number of 8-bit
//! colour steps, and carries the same amount as its minimum so that slow
//! fades still make progress after quantization.

use glam::Vec4;

use crate::blend::BlendMode;
use crate::command::{Command, FillCommand};
use crate::constants::COLOR_STEP;
use crate::types::TextureId;

#[derive(Debug, Clone, PartialEq)]
pub struct GradualFade {
    pub blend: BlendMode,
    pub texture: Option<TextureId>,
    pub color: Vec4,
    /// Accumulated fade needed before a fill is emitted
    pub threshold: f32,
    /// Fade per second; 1 fades fully in one second
    pub speed: f32,
    counter: f32,
}

impl Default for GradualFade {
    fn default() -> Self {
        Self {
            blend: BlendMode::replace_original(Vec4::ONE),
            texture: None,
            color: Vec4::ONE,
            threshold: 0.02,
            speed: 1.0,
            counter: 0.0,
        }
    }
}

impl GradualFade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> f32 {
        self.counter
    }

    /// Advance by `dt` seconds, returning the fill to submit, if any
    pub fn update(&mut self, dt: f32) -> Option<Command> {
        if self.speed > 0.0 {
            self.counter += self.speed * dt;
        }
        if self.counter < self.threshold {
            return None;
        }

        let steps = (self.counter / COLOR_STEP).floor();
        if steps <= 0.0 {
            return None;
        }
        let change = steps * COLOR_STEP;
        self.counter -= change;

        let amount = change.min(1.0);
        let mut fill = FillCommand::new(self.color, amount).with_minimum(amount);
        if let Some(texture) = self.texture {
            fill = fill.with_texture(texture);
        }
        Some(Command::fill(fill, self.blend).with_state(false, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;

    fn amount(command: &Command) -> f32 {
        match &command.kind {
            CommandKind::Fill(fill) => fill.opacity,
            _ => panic!("fade emits fills"),
        }
    }

    #[test]
    fn test_accumulates_until_threshold() {
        let mut fade = GradualFade::new();
        assert!(fade.update(0.01).is_none());
        let command = fade.update(0.015).expect("threshold crossed");
        let opacity = amount(&command);
        assert!((opacity - 6.0 / 255.0).abs() < 1e-6);
        assert!(fade.pending() >= 0.0 && fade.pending() < COLOR_STEP);
        assert_eq!(command.blend.index(), BlendMode::REPLACE_ORIGINAL);
    }

    #[test]
    fn test_minimum_matches_step() {
        let mut fade = GradualFade::new();
        let command = fade.update(0.5).unwrap();
        let CommandKind::Fill(fill) = &command.kind else {
            panic!("fade emits fills");
        };
        assert_eq!(fill.minimum, fill.opacity);
        assert!(!command.preview);
    }

    #[test]
    fn test_large_steps_are_capped() {
        let mut fade = GradualFade::new();
        fade.speed = 10.0;
        let command = fade.update(1.0).unwrap();
        assert_eq!(amount(&command), 1.0);
    }

    #[test]
    fn test_stopped_fade_emits_nothing() {
        let mut fade = GradualFade::new();
        fade.speed = 0.0;
        assert!(fade.update(100.0).is_none());
    }
}
