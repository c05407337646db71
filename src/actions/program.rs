//! Program Change button

use super::{Action, ActionOutcome, Gesture};
use crate::config::{ActionType, ProgramConfig};
use crate::dispatcher::Dispatcher;
use crate::midi::MidiMessage;
use crate::settings::SettingsMap;

pub struct ProgramAction {
    settings: SettingsMap,
    config: ProgramConfig,
}

impl ProgramAction {
    pub fn new(settings: SettingsMap) -> Self {
        let config = ProgramConfig::load(&settings);
        Self { settings, config }
    }
}

impl Action for ProgramAction {
    fn action_type(&self) -> ActionType {
        ActionType::Program
    }

    fn on_ready(&mut self) {
        self.config = ProgramConfig::load(&self.settings);
    }

    fn handle(&mut self, gesture: Gesture, dispatcher: &Dispatcher) -> ActionOutcome {
        let mut outcome = ActionOutcome::idle();
        if gesture == Gesture::Press {
            let message = MidiMessage::program_change(
                i64::from(self.config.channel),
                i64::from(self.config.program),
            );
            outcome.send(dispatcher, &self.config.port, message);
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
        format!("Ch{} PC{}", self.config.channel + 1, self.config.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::*;

    #[test]
    fn test_press_sends_program_change() {
        let (transport, dispatcher) = virtual_dispatcher();
        let mut action = ProgramAction::new(
            SettingsMap::new()
                .with("port", PORT)
                .with("channel", 9i64)
                .with("program", 12i64),
        );

        assert_eq!(action.handle(Gesture::Press, &dispatcher).sent, 1);
        assert_eq!(action.handle(Gesture::Release, &dispatcher).sent, 0);
        assert_eq!(transport.sent_to(PORT), vec![vec![0xC9, 12]]);
        assert_eq!(action.label(), "Ch10 PC12");
    }

    #[test]
    fn test_settings_update_reloads() {
        let (transport, dispatcher) = virtual_dispatcher();
        let mut action = ProgramAction::new(SettingsMap::new().with("port", PORT));
        action.update_settings(SettingsMap::new().with("port", PORT).with("program", 3i64));

        action.handle(Gesture::Press, &dispatcher);
        assert_eq!(transport.sent_to(PORT), vec![vec![0xC0, 3]]);
    }
}
