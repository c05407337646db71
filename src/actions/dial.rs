//! Dial: rotation moves a CC value, press mutes, resets or sends a fixed value
//!
//! State lives in the [`ControlValueEngine`]; this adapter restores it from
//! settings, dispatches what the engine asks for and writes the state back
//! into the settings map so the deck can persist it.

use super::{Action, ActionOutcome, Gesture};
use crate::config::{keys, ActionType, DialConfig};
use crate::dial::{ControlState, ControlValueEngine, Direction, DialEffect, DisplayValue};
use crate::dispatcher::Dispatcher;
use crate::midi::MidiMessage;
use crate::settings::{SettingsMap, SettingsStore};

pub struct DialAction {
    settings: SettingsMap,
    config: DialConfig,
    engine: ControlValueEngine,
}

impl DialAction {
    pub fn new(settings: SettingsMap) -> Self {
        let config = DialConfig::load(&settings);
        let engine = Self::restore_engine(&settings, &config);
        Self {
            settings,
            config,
            engine,
        }
    }

    fn restore_engine(settings: &SettingsMap, config: &DialConfig) -> ControlValueEngine {
        let default = i64::from(config.default_value);
        let current = settings.get_int(keys::CURRENT_VALUE, default);
        let muted = settings.get_bool_any(&[keys::IS_MUTED, keys::LEGACY_MUTED], false);
        // A muted dial's current_value is the mute value, never a restore target
        let pre_mute = settings.get_int(keys::PRE_MUTE_VALUE, default);
        ControlValueEngine::restore(config.limits, current, muted, pre_mute)
    }

    pub fn state(&self) -> ControlState {
        self.engine.state()
    }

    pub fn display(&self) -> DisplayValue {
        self.engine.current_display_value()
    }

    fn store_state(&mut self) {
        let state = self.engine.state();
        self.settings.set(keys::CURRENT_VALUE, state.current_value.into());
        self.settings.set(keys::IS_MUTED, state.is_muted.into());
        self.settings.set(keys::PRE_MUTE_VALUE, state.pre_mute_value.into());
    }

    fn apply(&mut self, effect: DialEffect, dispatcher: &Dispatcher) -> ActionOutcome {
        let mut outcome = ActionOutcome::idle();

        if let Some(value) = effect.send {
            let message = MidiMessage::control_change(
                i64::from(self.config.channel),
                i64::from(self.config.cc_number),
                i64::from(value),
            );
            outcome.send(dispatcher, &self.config.port, message);
        }

        // State stands even when the send failed; the next gesture resends
        if effect.persist {
            self.store_state();
            outcome.persist = true;
        }

        outcome
    }

    fn rotate(&mut self, direction: Direction, detents: u32, dispatcher: &Dispatcher) -> ActionOutcome {
        let step = u32::from(self.config.step_size).saturating_mul(detents.max(1));
        let effect = self.engine.apply_rotation(direction, step);
        self.apply(effect, dispatcher)
    }
}

impl Action for DialAction {
    fn action_type(&self) -> ActionType {
        ActionType::Dial
    }

    fn on_ready(&mut self) {
        self.config = DialConfig::load(&self.settings);
        self.engine = Self::restore_engine(&self.settings, &self.config);
    }

    fn handle(&mut self, gesture: Gesture, dispatcher: &Dispatcher) -> ActionOutcome {
        match gesture {
            Gesture::RotateCw(detents) => self.rotate(Direction::Clockwise, detents, dispatcher),
            Gesture::RotateCcw(detents) => self.rotate(Direction::CounterClockwise, detents, dispatcher),
            Gesture::Press => {
                let effect = self.engine.apply_press(self.config.press_action());
                self.apply(effect, dispatcher)
            }
            Gesture::Release => ActionOutcome::idle(),
        }
    }

    fn settings(&self) -> &SettingsMap {
        &self.settings
    }

    fn update_settings(&mut self, settings: SettingsMap) {
        self.settings = settings;
        self.on_ready();
    }

    fn label(&self) -> String {
        let display = self.display();
        let target = format!("Ch{} CC{}", self.config.channel + 1, self.config.cc_number);
        if display.muted {
            format!("MUTED {}", target)
        } else {
            format!("{}% {}", display.percent, target)
        }
    }
}
