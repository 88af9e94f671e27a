//! Undo/redo snapshot list with a cursor
//!
//! The cursor (`index`) counts snapshots behind the live texture. While it
//! equals `len()` the texture sits at the head: nothing has been undone and
//! the live pixels are not stored anywhere yet.

use crate::command::Command;
use crate::surface::CpuSurface;

/// One stored undo state
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// Full copy of the committed pixels
    Pixels(CpuSurface),
    /// Local-space commands committed since the previous snapshot
    Commands(Vec<Command>),
}

impl Snapshot {
    /// Heap bytes held by this snapshot's pixels
    pub fn pixel_bytes(&self) -> usize {
        match self {
            Snapshot::Pixels(surface) => surface.as_bytes().len(),
            Snapshot::Commands(_) => 0,
        }
    }

    pub fn commands(&self) -> &[Command] {
        match self {
            Snapshot::Pixels(_) => &[],
            Snapshot::Commands(commands) => commands,
        }
    }
}

#[derive(Debug, Default)]
pub struct History {
    states: Vec<Snapshot>,
    index: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn states(&self) -> &[Snapshot] {
        &self.states
    }

    /// Snapshot under the cursor
    pub fn current(&self) -> Option<&Snapshot> {
        self.states.get(self.index)
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.states.len()
    }

    pub fn at_head(&self) -> bool {
        self.index == self.states.len()
    }

    /// The cursor rests on the newest snapshot, so the live pixels equal it
    pub fn on_last_snapshot(&self) -> bool {
        self.index + 1 == self.states.len()
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.states.push(snapshot);
    }

    /// Drop every snapshot at or after the cursor
    pub fn trim_future(&mut self) {
        self.states.truncate(self.index);
    }

    /// Keep only the newest `limit` snapshots
    pub fn trim_past(&mut self, limit: usize) -> usize {
        let excess = self.states.len().saturating_sub(limit);
        if excess > 0 {
            self.states.drain(..excess);
            self.index = self.index.saturating_sub(excess);
        }
        excess
    }

    pub fn seek_head(&mut self) {
        self.index = self.states.len();
    }

    pub fn step_back(&mut self) -> &Snapshot {
        assert!(self.can_undo(), "undo cursor moved below zero");
        self.index -= 1;
        &self.states[self.index]
    }

    pub fn step_forward(&mut self) -> &Snapshot {
        assert!(self.can_redo(), "redo cursor moved past the newest snapshot");
        self.index += 1;
        &self.states[self.index]
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.index = 0;
    }

    pub fn pixel_bytes(&self) -> usize {
        self.states.iter().map(Snapshot::pixel_bytes).sum()
    }

    /// Commands of every snapshot up to and including the cursor, oldest first
    pub fn commands_through_cursor(&self) -> impl Iterator<Item = &Command> {
        let end = (self.index + 1).min(self.states.len());
        self.states[..end].iter().flat_map(Snapshot::commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::BlendMode;
    use crate::command::FillCommand;
    use glam::Vec4;

    fn pixels(value: f32) -> Snapshot {
        Snapshot::Pixels(CpuSurface::filled(2, 2, [value; 4]))
    }

    #[test]
    fn test_cursor_walk() {
        let mut history = History::new();
        history.push(pixels(0.1));
        history.push(pixels(0.2));
        history.seek_head();
        assert!(history.at_head());
        assert!(history.can_undo());
        assert!(!history.can_redo());

        history.push(pixels(0.3));
        assert_eq!(history.step_back(), &pixels(0.2));
        assert!(history.can_redo());
        assert_eq!(history.step_forward(), &pixels(0.3));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_trim_past_keeps_newest() {
        let mut history = History::new();
        for i in 0..5 {
            history.push(pixels(i as f32));
        }
        history.seek_head();
        assert_eq!(history.trim_past(3), 2);
        assert_eq!(history.len(), 3);
        assert_eq!(history.index(), 3);
        assert_eq!(history.states()[0], pixels(2.0));
    }

    #[test]
    fn test_trim_future_discards_redo_branch() {
        let mut history = History::new();
        for i in 0..3 {
            history.push(pixels(i as f32));
        }
        history.seek_head();
        history.step_back();
        history.trim_future();
        assert_eq!(history.len(), 2);
        assert!(history.at_head());
    }

    #[test]
    fn test_commands_through_cursor() {
        let command = Command::fill(FillCommand::new(Vec4::ONE, 1.0), BlendMode::default());
        let mut history = History::new();
        history.push(Snapshot::Commands(vec![command.clone()]));
        history.push(Snapshot::Commands(vec![command.clone(), command.clone()]));
        history.push(Snapshot::Commands(Vec::new()));
        history.seek_head();
        assert_eq!(history.commands_through_cursor().count(), 3);
        history.step_back();
        history.step_back();
        assert_eq!(history.commands_through_cursor().count(), 3);
        history.step_back();
        assert_eq!(history.commands_through_cursor().count(), 1);
    }

    #[test]
    fn test_pixel_bytes() {
        let mut history = History::new();
        history.push(pixels(0.0));
        history.push(Snapshot::Commands(Vec::new()));
        assert_eq!(history.pixel_bytes(), 2 * 2 * 16);
    }

    #[test]
    #[should_panic(expected = "undo cursor")]
    fn test_step_back_at_zero_panics() {
        let mut history = History::new();
        history.step_back();
    }
}
