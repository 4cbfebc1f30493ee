//! Held-key snapshot.
//!
//! Key listeners only flip flags here; the world reads the snapshot once per
//! tick, so movement speed does not depend on the browser's key-repeat rate.

const ACTION_COUNT: usize = 6;

/// Movement intents the simulation understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
}

impl Action {
    pub const ALL: [Action; ACTION_COUNT] = [
        Action::Forward,
        Action::Backward,
        Action::StrafeLeft,
        Action::StrafeRight,
        Action::TurnLeft,
        Action::TurnRight,
    ];

    /// Map a `KeyboardEvent.code` to an action
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "KeyW" | "ArrowUp" => Some(Action::Forward),
            "KeyS" | "ArrowDown" => Some(Action::Backward),
            "KeyA" => Some(Action::StrafeLeft),
            "KeyD" => Some(Action::StrafeRight),
            "ArrowLeft" | "KeyQ" => Some(Action::TurnLeft),
            "ArrowRight" | "KeyE" => Some(Action::TurnRight),
            _ => None,
        }
    }

    #[inline(always)]
    const fn slot(self) -> usize {
        self as usize
    }
}

/// Per-tick movement request, each axis in `[-1, 1]`
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Intent {
    /// +1 forward, -1 backward
    pub forward: f64,
    /// +1 toward the right vector, -1 toward the left
    pub strafe: f64,
    /// +1 turns toward increasing angle (right), -1 left
    pub turn: f64,
}

impl Intent {
    pub fn is_idle(&self) -> bool {
        self.forward == 0.0 && self.strafe == 0.0 && self.turn == 0.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct InputState {
    held: [bool; ACTION_COUNT],
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key-down. Returns false for keys with no binding.
    pub fn key_down(&mut self, code: &str) -> bool {
        match Action::from_code(code) {
            Some(action) => {
                self.held[action.slot()] = true;
                true
            }
            None => false,
        }
    }

    pub fn key_up(&mut self, code: &str) -> bool {
        match Action::from_code(code) {
            Some(action) => {
                self.held[action.slot()] = false;
                true
            }
            None => false,
        }
    }

    #[inline(always)]
    pub fn is_held(&self, action: Action) -> bool {
        self.held[action.slot()]
    }

    /// Release everything, e.g. when the page loses focus
    pub fn clear(&mut self) {
        self.held = [false; ACTION_COUNT];
    }

    /// Collapse held keys into axes; opposing keys cancel out
    pub fn intent(&self) -> Intent {
        let axis = |pos: Action, neg: Action| {
            f64::from(u8::from(self.is_held(pos))) - f64::from(u8::from(self.is_held(neg)))
        };
        Intent {
            forward: axis(Action::Forward, Action::Backward),
            strafe: axis(Action::StrafeRight, Action::StrafeLeft),
            turn: axis(Action::TurnRight, Action::TurnLeft),
        }
    }
}
