//! Generic command button: any one message type, chosen in settings

use super::{Action, ActionOutcome, Gesture};
use crate::config::{ActionType, CommandConfig, CommandType};
use crate::dispatcher::Dispatcher;
use crate::error::MidiError;
use crate::midi::MidiMessage;
use crate::settings::SettingsMap;

pub struct CommandAction {
    settings: SettingsMap,
    config: CommandConfig,
}

impl CommandAction {
    pub fn new(settings: SettingsMap) -> Self {
        let config = CommandConfig::load(&settings);
        Self { settings, config }
    }

    fn press_message(&self) -> Result<MidiMessage, MidiError> {
        let channel = i64::from(self.config.channel);
        let data1 = self.config.data1;
        let data2 = i64::from(self.config.data2);

        match self.config.msg_type {
            CommandType::NoteOn => MidiMessage::note_on(channel, data1, data2),
            CommandType::NoteOff => MidiMessage::note_off(channel, data1),
            CommandType::ControlChange => MidiMessage::control_change(channel, data1, data2),
            CommandType::ProgramChange => MidiMessage::program_change(channel, data1),
            CommandType::PitchWheel => MidiMessage::pitch_wheel(channel, data1),
        }
    }
}

impl Action for CommandAction {
    fn action_type(&self) -> ActionType {
        ActionType::Command
    }

    fn on_ready(&mut self) {
        self.config = CommandConfig::load(&self.settings);
    }

    fn handle(&mut self, gesture: Gesture, dispatcher: &Dispatcher) -> ActionOutcome {
        let mut outcome = ActionOutcome::idle();

        match gesture {
            Gesture::Press => {
                outcome.send(dispatcher, &self.config.port, self.press_message());
            }
            // A Note On command is released like a key
            Gesture::Release if self.config.msg_type == CommandType::NoteOn => {
                let message = MidiMessage::note_off(i64::from(self.config.channel), self.config.data1);
                outcome.send(dispatcher, &self.config.port, message);
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
        let data1 = self.config.data1;
        match self.config.msg_type {
            CommandType::NoteOn => format!("Note {}", data1),
            CommandType::NoteOff => format!("Off {}", data1),
            CommandType::ControlChange => format!("CC {}", data1),
            CommandType::ProgramChange => format!("PC {}", data1),
            CommandType::PitchWheel => format!("PW {}", data1),
        }
    }
}
