//! CC button: one-shot, momentary or toggled Control Change

use super::{Action, ActionOutcome, Gesture};
use crate::config::{ActionType, CcConfig, CcMode};
use crate::dispatcher::Dispatcher;
use crate::midi::MidiMessage;
use crate::settings::SettingsMap;

/// Common controller names for labels
pub fn cc_name(cc: u8) -> Option<&'static str> {
    match cc {
        0 => Some("Bank Select"),
        1 => Some("Modulation"),
        7 => Some("Volume"),
        10 => Some("Pan"),
        11 => Some("Expression"),
        64 => Some("Sustain Pedal"),
        91 => Some("Reverb"),
        93 => Some("Chorus"),
        _ => None,
    }
}

pub struct CcAction {
    settings: SettingsMap,
    config: CcConfig,
    /// Toggle mode: whether `value` was sent last
    toggled: bool,
}

impl CcAction {
    pub fn new(settings: SettingsMap) -> Self {
        let config = CcConfig::load(&settings);
        Self {
            settings,
            config,
            toggled: false,
        }
    }

    pub fn is_toggled(&self) -> bool {
        self.toggled
    }

    fn send_value(&self, outcome: &mut ActionOutcome, dispatcher: &Dispatcher, value: u8) {
        let message = MidiMessage::control_change(
            i64::from(self.config.channel),
            i64::from(self.config.cc_number),
            i64::from(value),
        );
        outcome.send(dispatcher, &self.config.port, message);
    }
}

impl Action for CcAction {
    fn action_type(&self) -> ActionType {
        ActionType::Cc
    }

    fn on_ready(&mut self) {
        self.config = CcConfig::load(&self.settings);
    }

    fn handle(&mut self, gesture: Gesture, dispatcher: &Dispatcher) -> ActionOutcome {
        let mut outcome = ActionOutcome::idle();

        match (gesture, self.config.mode) {
            (Gesture::Press, CcMode::Single | CcMode::Momentary) => {
                self.send_value(&mut outcome, dispatcher, self.config.value);
            }
            (Gesture::Press, CcMode::Toggle) => {
                let value = if self.toggled {
                    self.config.value_off
                } else {
                    self.config.value
                };
                self.send_value(&mut outcome, dispatcher, value);
                self.toggled = !self.toggled;
            }
            (Gesture::Release, CcMode::Momentary) => {
                self.send_value(&mut outcome, dispatcher, self.config.value_off);
            }
            _ => {}
        }

        outcome
    }

    fn settings(&self) -> &SettingsMap {
        &self.settings
    }

    fn update_settings(&mut self, settings: SettingsMap) {
        self.settings = settings;
        self.on_ready();
    }

    fn label(&self) -> String {
        let channel = self.config.channel + 1;
        match cc_name(self.config.cc_number) {
            Some(name) => format!("Ch{} {}", channel, name),
            None => format!("Ch{} CC{}", channel, self.config.cc_number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::*;

    fn cc_action(mode: &str) -> CcAction {
        CcAction::new(
            SettingsMap::new()
                .with("port", PORT)
                .with("cc_number", 64i64)
                .with("value", 127i64)
                .with("value_off", 0i64)
                .with("mode", mode),
        )
    }

    #[test]
    fn test_single_sends_on_press_only() {
        let (transport, dispatcher) = virtual_dispatcher();
        let mut action = cc_action("single");
        action.handle(Gesture::Press, &dispatcher);
        action.handle(Gesture::Release, &dispatcher);
        assert_eq!(transport.sent_to(PORT), vec![vec![0xB0, 64, 127]]);
    }

    #[test]
    fn test_momentary_sends_off_on_release() {
        let (transport, dispatcher) = virtual_dispatcher();
        let mut action = cc_action("momentary");
        action.handle(Gesture::Press, &dispatcher);
        action.handle(Gesture::Release, &dispatcher);
        assert_eq!(transport.sent_to(PORT), vec![vec![0xB0, 64, 127], vec![0xB0, 64, 0]]);
    }

    #[test]
    fn test_toggle_flips_each_press() {
        let (transport, dispatcher) = virtual_dispatcher();
        let mut action = cc_action("toggle");
        for _ in 0..3 {
            action.handle(Gesture::Press, &dispatcher);
            action.handle(Gesture::Release, &dispatcher);
        }
        assert!(action.is_toggled());
        assert_eq!(
            transport.sent_to(PORT),
            vec![vec![0xB0, 64, 127], vec![0xB0, 64, 0], vec![0xB0, 64, 127]]
        );
    }

    #[test]
    fn test_toggle_state_advances_on_failure() {
        let (transport, dispatcher) = virtual_dispatcher();
        transport.set_fail_writes(PORT, true);
        let mut action = cc_action("toggle");

        let outcome = action.handle(Gesture::Press, &dispatcher);
        assert!(outcome.is_error());
        assert!(action.is_toggled());
    }

    #[test]
    fn test_labels() {
        assert_eq!(cc_action("single").label(), "Ch1 Sustain Pedal");
        let action = CcAction::new(SettingsMap::new().with("cc_number", 20i64).with("channel", 2i64));
        assert_eq!(action.label(), "Ch3 CC20");
    }
}
