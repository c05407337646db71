//! Dial control-value state machine
//!
//! Turns relative rotation and press gestures into an absolute, bounded
//! 7-bit value with mute/unmute and reset. The engine only decides; the
//! dial action performs the dispatch and persistence it asks for.
//!
//! ## Invariants
//! - Not muted: `min_value <= current_value <= max_value`
//! - Muted: `current_value` is the mute value and `pre_mute_value` holds
//!   what unmuting restores
//! - `pre_mute_value` is only written when mute engages

use crate::midi::{convert, MAX_DATA};

/// Rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn sign(self) -> i32 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }
}

/// What pressing the dial does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressAction {
    /// Mute to the mute value, or restore the pre-mute value
    MuteToggle,
    /// Jump to `default_value` (clamped into range) and clear mute
    Reset { default_value: u8 },
    /// One-shot send of `value`; state is untouched
    SendFixed { value: u8 },
}

/// Inclusive value bounds plus the value emitted while muted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialLimits {
    pub min_value: u8,
    pub max_value: u8,
    pub mute_value: u8,
}

impl DialLimits {
    /// Normalized limits: 7-bit, and `min <= max`
    pub fn new(min_value: u8, max_value: u8, mute_value: u8) -> Self {
        let min_value = min_value.min(MAX_DATA);
        let max_value = max_value.min(MAX_DATA);
        let (min_value, max_value) = if min_value <= max_value {
            (min_value, max_value)
        } else {
            (max_value, min_value)
        };
        Self {
            min_value,
            max_value,
            mute_value: mute_value.min(MAX_DATA),
        }
    }

    pub fn clamp(&self, value: i64) -> u8 {
        value.clamp(i64::from(self.min_value), i64::from(self.max_value)) as u8
    }
}

impl Default for DialLimits {
    fn default() -> Self {
        Self::new(0, MAX_DATA, 0)
    }
}

/// Per-dial state, persisted after every mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub current_value: u8,
    pub is_muted: bool,
    pub pre_mute_value: u8,
}

/// What the caller must do after a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialEffect {
    /// Value to dispatch, if any
    pub send: Option<u8>,
    /// Whether the state changed and must be persisted
    pub persist: bool,
}

/// Value shown on the control; derived only, never fed back into state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayValue {
    pub muted: bool,
    pub value: u8,
    pub percent: u8,
}

/// The dial state machine
#[derive(Debug, Clone)]
pub struct ControlValueEngine {
    limits: DialLimits,
    state: ControlState,
}

impl ControlValueEngine {
    /// Fresh engine at `initial` (clamped into range), not muted
    pub fn new(limits: DialLimits, initial: i64) -> Self {
        let value = limits.clamp(initial);
        Self {
            limits,
            state: ControlState {
                current_value: value,
                is_muted: false,
                pre_mute_value: value,
            },
        }
    }

    /// Engine from persisted values; anything out of range is clamped, never rejected
    pub fn restore(limits: DialLimits, current_value: i64, is_muted: bool, pre_mute_value: i64) -> Self {
        let pre_mute_value = limits.clamp(pre_mute_value);
        let state = if is_muted {
            ControlState {
                current_value: limits.mute_value,
                is_muted: true,
                pre_mute_value,
            }
        } else {
            ControlState {
                current_value: limits.clamp(current_value),
                is_muted: false,
                pre_mute_value,
            }
        };
        Self { limits, state }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn limits(&self) -> DialLimits {
        self.limits
    }

    pub fn is_muted(&self) -> bool {
        self.state.is_muted
    }

    /// Move by `direction * step_size`, unmuting first if muted
    pub fn apply_rotation(&mut self, direction: Direction, step_size: u32) -> DialEffect {
        if self.state.is_muted {
            self.unmute();
        }

        let delta = i64::from(direction.sign()) * i64::from(step_size);
        self.state.current_value = self.limits.clamp(i64::from(self.state.current_value) + delta);

        DialEffect {
            send: Some(self.state.current_value),
            persist: true,
        }
    }

    pub fn apply_press(&mut self, action: PressAction) -> DialEffect {
        match action {
            PressAction::MuteToggle => {
                if self.state.is_muted {
                    self.unmute();
                } else {
                    self.state.pre_mute_value = self.state.current_value;
                    self.state.current_value = self.limits.mute_value;
                    self.state.is_muted = true;
                }
                DialEffect {
                    send: Some(self.state.current_value),
                    persist: true,
                }
            }
            PressAction::Reset { default_value } => {
                self.state.current_value = self.limits.clamp(i64::from(default_value));
                self.state.is_muted = false;
                DialEffect {
                    send: Some(self.state.current_value),
                    persist: true,
                }
            }
            PressAction::SendFixed { value } => DialEffect {
                send: Some(value.min(MAX_DATA)),
                persist: false,
            },
        }
    }

    pub fn current_display_value(&self) -> DisplayValue {
        let value = if self.state.is_muted {
            0
        } else {
            self.state.current_value
        };
        DisplayValue {
            muted: self.state.is_muted,
            value,
            percent: convert::to_rounded_percent(value),
        }
    }

    fn unmute(&mut self) {
        self.state.current_value = self.limits.clamp(i64::from(self.state.pre_mute_value));
        self.state.is_muted = false;
    }
}
