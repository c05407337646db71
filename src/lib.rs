//! Deck MIDI
//!
//! Sends MIDI from control-surface buttons and dials. Controls resolve
//! named outputs through a shared [`PortRegistry`], send through the
//! [`Dispatcher`], and never fail the host when a device is missing.

pub mod actions;
pub mod cli;
pub mod config;
pub mod deck;
pub mod dial;
pub mod dispatcher;
pub mod error;
pub mod midi;
pub mod paths;
pub mod registry;
pub mod settings;
pub mod transport;

pub use actions::{Action, ActionOutcome, Gesture};
pub use deck::Deck;
pub use dial::ControlValueEngine;
pub use dispatcher::Dispatcher;
pub use error::{ErrorKind, MidiError};
pub use midi::MidiMessage;
pub use registry::PortRegistry;
