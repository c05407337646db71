//! Control actions
//!
//! Each button or dial on the surface is bound to one action. An action
//! turns gestures into messages through the shared [`Dispatcher`] and keeps
//! its settings map up to date; the deck persists that map whenever an
//! outcome asks for it.

pub mod cc;
pub mod command;
pub mod dial;
pub mod note;
pub mod program;

use tracing::debug;

use crate::config::ActionType;
use crate::dispatcher::Dispatcher;
use crate::error::{ErrorKind, MidiError};
use crate::midi::MidiMessage;
use crate::settings::SettingsMap;

pub use cc::CcAction;
pub use command::CommandAction;
pub use dial::DialAction;
pub use note::NoteAction;
pub use program::ProgramAction;

/// Discrete gesture delivered by the host, at most once per physical action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Press,
    Release,
    /// Clockwise rotation by this many detents
    RotateCw(u32),
    /// Counter-clockwise rotation by this many detents
    RotateCcw(u32),
}

/// Result of handling one gesture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Messages delivered
    pub sent: u8,
    /// First failure, if any; the control should flash an error
    pub error: Option<ErrorKind>,
    /// Settings changed and should be persisted
    pub persist: bool,
}

impl ActionOutcome {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    fn record(&mut self, result: Result<(), MidiError>) {
        match result {
            Ok(()) => self.sent += 1,
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e.kind());
                }
            }
        }
    }

    /// Validate-then-send; the dispatcher reports delivery failures itself
    fn send(&mut self, dispatcher: &Dispatcher, port: &str, message: Result<MidiMessage, MidiError>) {
        let result = message.and_then(|message| dispatcher.try_send(port, &message));
        self.record(result);
    }
}

/// A button or dial behavior
///
/// Note: `Send` so a deck can be moved into the runtime's main task.
pub trait Action: Send {
    fn action_type(&self) -> ActionType;

    /// (Re)load configuration and state from the settings map
    fn on_ready(&mut self);

    fn handle(&mut self, gesture: Gesture, dispatcher: &Dispatcher) -> ActionOutcome;

    /// Current settings, including any state written by `handle`
    fn settings(&self) -> &SettingsMap;

    /// Replace settings (e.g. after the user edits them) and reload
    fn update_settings(&mut self, settings: SettingsMap);

    /// Short text for the control's label
    fn label(&self) -> String;
}

/// Build the action for `action_type`, ready to handle gestures
pub fn create_action(action_type: ActionType, settings: SettingsMap) -> Box<dyn Action> {
    debug!("Creating {} action", action_type.as_str());
    let mut action: Box<dyn Action> = match action_type {
        ActionType::Note => Box::new(NoteAction::new(settings)),
        ActionType::Cc => Box::new(CcAction::new(settings)),
        ActionType::Program => Box::new(ProgramAction::new(settings)),
        ActionType::Command => Box::new(CommandAction::new(settings)),
        ActionType::Dial => Box::new(DialAction::new(settings)),
    };
    action.on_ready();
    action
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::settings::SettingsStore;

    #[test]
    fn test_create_every_action_type() {
        let (_transport, _dispatcher) = virtual_dispatcher();
        for action_type in [
            ActionType::Note,
            ActionType::Cc,
            ActionType::Program,
            ActionType::Command,
            ActionType::Dial,
        ] {
            let action = create_action(action_type, SettingsMap::new().with("port", PORT));
            assert_eq!(action.action_type(), action_type);
            assert_eq!(action.settings().get_str("port", ""), PORT);
        }
    }

    #[test]
    fn test_outcome_keeps_first_error() {
        let mut outcome = ActionOutcome::idle();
        outcome.record(Err(MidiError::InvalidDestination(String::new())));
        outcome.record(Ok(()));
        outcome.record(Err(MidiError::send_failed("x", "y")));

        assert_eq!(outcome.sent, 1);
        assert_eq!(outcome.error, Some(ErrorKind::InvalidDestination));
        assert!(outcome.is_error());
    }
}
