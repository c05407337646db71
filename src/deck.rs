//! Deck - the set of controls on one surface
//!
//! Builds one action per profile control, routes gestures to them by id and
//! saves settings whenever an action changes its state.

use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::actions::{create_action, Action, ActionOutcome, Gesture};
use crate::config::{keys, ActionType, DeckProfile};
use crate::dispatcher::Dispatcher;
use crate::settings::SettingsFile;

pub struct Deck {
    dispatcher: Dispatcher,
    controls: BTreeMap<String, Box<dyn Action>>,
    settings: SettingsFile,
}

impl Deck {
    /// Build every control of `profile`
    ///
    /// Configuration comes from the profile alone; only dial state
    /// (`current_value`, `is_muted`, `pre_mute_value`) is restored from the
    /// settings file, so profile edits apply on the next start.
    pub fn from_profile(profile: &DeckProfile, dispatcher: Dispatcher, settings: SettingsFile) -> Result<Self> {
        profile.validate()?;

        let mut controls = BTreeMap::new();
        for control in &profile.controls {
            let state = settings.control(&control.id).only(keys::RESTORED_STATE);
            let merged = profile.settings_for(control).merged_with(&state);
            debug!("Control '{}' ({}) starts with {} settings", control.id, control.action.as_str(), merged.len());
            controls.insert(control.id.clone(), create_action(control.action, merged));
        }

        info!(
            "Deck{} ready with {} controls",
            profile.name.as_deref().map(|n| format!(" '{}'", n)).unwrap_or_default(),
            controls.len()
        );

        Ok(Self {
            dispatcher,
            controls,
            settings,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.controls.keys().map(String::as_str)
    }

    pub fn action_type(&self, id: &str) -> Option<ActionType> {
        self.controls.get(id).map(|action| action.action_type())
    }

    pub fn label(&self, id: &str) -> Option<String> {
        self.controls.get(id).map(|action| action.label())
    }

    /// Deliver `gesture` to control `id`
    ///
    /// Only an unknown id is an error; MIDI failures are reported in the
    /// outcome.
    pub fn gesture(&mut self, id: &str, gesture: Gesture) -> Result<ActionOutcome> {
        let action = self
            .controls
            .get_mut(id)
            .ok_or_else(|| anyhow!("Unknown control '{}'", id))?;

        let outcome = action.handle(gesture, &self.dispatcher);

        if outcome.persist {
            self.settings.update(id, action.settings().only(keys::STATE));
            if let Err(e) = self.settings.save() {
                warn!("Failed to save settings for '{}': {:#}", id, e);
            }
        }

        if let Some(kind) = outcome.error {
            debug!("Control '{}' flashed an error ({:?})", id, kind);
        }

        Ok(outcome)
    }

    /// Close every open output
    pub fn shutdown(&self) {
        info!("Releasing MIDI outputs");
        self.dispatcher.registry().release_all();
    }
}
