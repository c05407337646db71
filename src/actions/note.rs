//! Note button: Note On/Off on press and release

use super::{Action, ActionOutcome, Gesture};
use crate::config::{ActionType, NoteConfig, NoteMode};
use crate::dispatcher::Dispatcher;
use crate::error::MidiError;
use crate::midi::MidiMessage;
use crate::settings::SettingsMap;

pub struct NoteAction {
    settings: SettingsMap,
    config: NoteConfig,
    /// Whether we last sent Note On (momentary/toggle)
    note_on: bool,
}

impl NoteAction {
    pub fn new(settings: SettingsMap) -> Self {
        let config = NoteConfig::load(&settings);
        Self {
            settings,
            config,
            note_on: false,
        }
    }

    pub fn is_note_on(&self) -> bool {
        self.note_on
    }

    fn on(&self) -> Result<MidiMessage, MidiError> {
        MidiMessage::note_on(
            i64::from(self.config.channel),
            i64::from(self.config.note),
            i64::from(self.config.velocity),
        )
    }

    fn off(&self) -> Result<MidiMessage, MidiError> {
        MidiMessage::note_off(i64::from(self.config.channel), i64::from(self.config.note))
    }
}

impl Action for NoteAction {
    fn action_type(&self) -> ActionType {
        ActionType::Note
    }

    fn on_ready(&mut self) {
        self.config = NoteConfig::load(&self.settings);
    }

    fn handle(&mut self, gesture: Gesture, dispatcher: &Dispatcher) -> ActionOutcome {
        let mut outcome = ActionOutcome::idle();
        let port = self.config.port.clone();

        match (gesture, self.config.mode) {
            (Gesture::Press, NoteMode::Momentary) => {
                outcome.send(dispatcher, &port, self.on());
                self.note_on = true;
            }
            (Gesture::Press, NoteMode::Toggle) => {
                if self.note_on {
                    outcome.send(dispatcher, &port, self.off());
                } else {
                    outcome.send(dispatcher, &port, self.on());
                }
                self.note_on = !self.note_on;
            }
            (Gesture::Press, NoteMode::NoteOnOnly) => outcome.send(dispatcher, &port, self.on()),
            (Gesture::Press, NoteMode::NoteOffOnly) => outcome.send(dispatcher, &port, self.off()),
            (Gesture::Release, NoteMode::Momentary) if self.note_on => {
                outcome.send(dispatcher, &port, self.off());
                self.note_on = false;
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
        format!("Ch{} N{}", self.config.channel + 1, self.config.note)
    }
}
