//! Deterministic input: logical buttons and a frame-stamped event queue.
//!
//! The queue lets tests and headless runs script button presses without a
//! window: events are sorted by frame number and applied to controller 1
//! at the start of each frame.

use std::collections::VecDeque;

use crate::controller::{button, Controller};

/// Logical controller button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NesButton {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl NesButton {
    /// Bit position in the controller latch.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::A => button::A,
            Self::B => button::B,
            Self::Select => button::SELECT,
            Self::Start => button::START,
            Self::Up => button::UP,
            Self::Down => button::DOWN,
            Self::Left => button::LEFT,
            Self::Right => button::RIGHT,
        }
    }
}

/// A button transition scheduled for a frame.
#[derive(Debug, Clone)]
pub struct InputEvent {
    pub frame: u64,
    pub button: NesButton,
    pub pressed: bool,
}

/// Frame-ordered queue of input events.
pub struct InputQueue {
    events: VecDeque<InputEvent>,
}

impl InputQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Insert an event, keeping the queue sorted by frame.
    pub fn push(&mut self, event: InputEvent) {
        let position = self
            .events
            .iter()
            .position(|e| e.frame > event.frame)
            .unwrap_or(self.events.len());
        self.events.insert(position, event);
    }

    /// Schedule a press at `frame` held for `hold_frames`.
    pub fn press(&mut self, button: NesButton, frame: u64, hold_frames: u64) {
        self.push(InputEvent {
            frame,
            button,
            pressed: true,
        });
        self.push(InputEvent {
            frame: frame + hold_frames,
            button,
            pressed: false,
        });
    }

    /// Apply every event due at or before `frame` to the controller.
    pub fn process(&mut self, frame: u64, controller: &mut Controller) {
        while let Some(event) = self.events.front() {
            if event.frame > frame {
                break;
            }
            let event = self.events.pop_front().expect("front was Some");
            controller.set_button(event.button.bit(), event.pressed);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_schedules_press_and_release() {
        let mut queue = InputQueue::new();
        queue.press(NesButton::Start, 10, 2);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn events_apply_at_their_frame() {
        let mut queue = InputQueue::new();
        let mut controller = Controller::new();
        queue.press(NesButton::A, 5, 3);

        queue.process(4, &mut controller);
        assert_eq!(controller.buttons() & 0x01, 0);
        queue.process(5, &mut controller);
        assert_eq!(controller.buttons() & 0x01, 1);
        queue.process(8, &mut controller);
        assert_eq!(controller.buttons() & 0x01, 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn out_of_order_pushes_are_sorted() {
        let mut queue = InputQueue::new();
        queue.push(InputEvent {
            frame: 9,
            button: NesButton::B,
            pressed: true,
        });
        queue.push(InputEvent {
            frame: 3,
            button: NesButton::A,
            pressed: true,
        });
        let mut controller = Controller::new();
        queue.process(3, &mut controller);
        assert_eq!(controller.buttons(), 0x01);
        assert_eq!(queue.len(), 1);
    }
}
