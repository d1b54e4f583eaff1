//! Host input sink.
//!
//! The core writes one composite [`Action`] per tick into whatever structure
//! the host polls for input. It only needs two operations, captured by
//! [`InputSink`]: set the directional intent, and press or release a button.
//! Nothing is ever read back.
//!
//! [`VirtualGamepad`] is a ready-made sink that keeps a previous/current pad
//! state pair, the shape most engines poll for edge-triggered presses.

use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Buttons the autoplayer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Jump,
    Dash,
}

/// Write side of the host's input layer.
pub trait InputSink {
    /// Set the stick position. Each axis is -1.0, 0.0 or 1.0; `y` is positive
    /// upward.
    fn set_direction(&mut self, x: f32, y: f32);

    /// Press or release a button.
    fn set_button(&mut self, button: Button, pressed: bool);
}

/// Translate `action` into sink writes.
///
/// Left wins over Right and Down wins over Up when both are set. Every button
/// is written, so released buttons are explicitly released.
pub fn apply_action<S: InputSink + ?Sized>(action: Action, sink: &mut S) {
    let mut x = 0.0;
    if action.contains(Action::RIGHT) {
        x = 1.0;
    }
    if action.contains(Action::LEFT) {
        x = -1.0;
    }

    let mut y = 0.0;
    if action.contains(Action::UP) {
        y = 1.0;
    }
    if action.contains(Action::DOWN) {
        y = -1.0;
    }

    sink.set_direction(x, y);
    sink.set_button(Button::Jump, action.contains(Action::JUMP));
    sink.set_button(Button::Dash, action.contains(Action::DASH));
}

// ---------------------------------------------------------------------------
// VirtualGamepad
// ---------------------------------------------------------------------------

/// One polled gamepad state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PadState {
    pub stick_x: f32,
    pub stick_y: f32,
    pub jump: bool,
    pub dash: bool,
}

impl PadState {
    pub fn pressed(&self, button: Button) -> bool {
        match button {
            Button::Jump => self.jump,
            Button::Dash => self.dash,
        }
    }
}

/// An [`InputSink`] holding the previous and current pad state.
#[derive(Debug, Clone, Default)]
pub struct VirtualGamepad {
    previous: PadState,
    current: PadState,
}

impl VirtualGamepad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll the current state into `previous` and start a blank frame.
    pub fn begin_frame(&mut self) {
        self.previous = self.current;
        self.current = PadState::default();
    }

    pub fn current(&self) -> PadState {
        self.current
    }

    pub fn previous(&self) -> PadState {
        self.previous
    }

    pub fn pressed(&self, button: Button) -> bool {
        self.current.pressed(button)
    }

    /// Pressed this frame but not the previous one.
    pub fn just_pressed(&self, button: Button) -> bool {
        self.current.pressed(button) && !self.previous.pressed(button)
    }
}

impl InputSink for VirtualGamepad {
    fn set_direction(&mut self, x: f32, y: f32) {
        self.current.stick_x = x;
        self.current.stick_y = y;
    }

    fn set_button(&mut self, button: Button, pressed: bool) {
        match button {
            Button::Jump => self.current.jump = pressed,
            Button::Dash => self.current.dash = pressed,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pad_for(action: Action) -> PadState {
        let mut pad = VirtualGamepad::new();
        apply_action(action, &mut pad);
        pad.current()
    }

    #[test]
    fn none_releases_everything() {
        assert_eq!(pad_for(Action::NONE), PadState::default());
    }

    #[test]
    fn directions_map_to_stick() {
        assert_eq!(pad_for(Action::RIGHT).stick_x, 1.0);
        assert_eq!(pad_for(Action::LEFT).stick_x, -1.0);
        assert_eq!(pad_for(Action::UP).stick_y, 1.0);
        assert_eq!(pad_for(Action::DOWN).stick_y, -1.0);
    }

    #[test]
    fn opposing_directions_resolve_to_left_and_down() {
        let pad = pad_for(Action::LEFT | Action::RIGHT | Action::UP | Action::DOWN);
        assert_eq!(pad.stick_x, -1.0);
        assert_eq!(pad.stick_y, -1.0);
    }

    #[test]
    fn combo_sets_buttons_and_stick() {
        let pad = pad_for(Action::DASH | Action::UP | Action::RIGHT | Action::JUMP);
        assert!(pad.jump);
        assert!(pad.dash);
        assert_eq!((pad.stick_x, pad.stick_y), (1.0, 1.0));
    }

    #[test]
    fn just_pressed_tracks_edges() {
        let mut pad = VirtualGamepad::new();
        apply_action(Action::JUMP, &mut pad);
        assert!(pad.just_pressed(Button::Jump));

        pad.begin_frame();
        apply_action(Action::JUMP, &mut pad);
        assert!(pad.pressed(Button::Jump));
        assert!(!pad.just_pressed(Button::Jump));

        pad.begin_frame();
        apply_action(Action::NONE, &mut pad);
        assert!(!pad.pressed(Button::Jump));
        assert!(pad.previous().jump);
    }
}
