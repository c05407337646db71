//! Message dispatcher
//!
//! The single entry point every control uses to send MIDI. Resolves the
//! destination through the [`PortRegistry`], writes the encoded message, and
//! turns any failure into a reported, non-fatal result.
//!
//! Delivery is deliver-if-possible: one attempt per call, no retries. A
//! failed write evicts the handle so the next gesture re-opens fresh.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{MidiError, Result};
use crate::midi::{format_hex, MidiMessage};
use crate::registry::PortRegistry;

/// Cheap to clone; all clones share one registry
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<PortRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<PortRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<PortRegistry> {
        &self.registry
    }

    /// Send `message` to `destination`, keeping the failure kind
    ///
    /// Failures are logged here, once per call.
    pub fn try_send(&self, destination: &str, message: &MidiMessage) -> Result<()> {
        let result = self.deliver(destination, message);
        if let Err(e) = &result {
            warn!(kind = ?e.kind(), "MIDI send to '{}' failed: {}", destination, e);
        }
        result
    }

    /// Send `message` to `destination`; `false` if anything went wrong
    pub fn send(&self, destination: &str, message: &MidiMessage) -> bool {
        self.try_send(destination, message).is_ok()
    }

    fn deliver(&self, destination: &str, message: &MidiMessage) -> Result<()> {
        let handle = self.registry.acquire(destination)?;
        let bytes = message.encode();

        if let Err(e) = handle.write(&bytes) {
            // Presumed dead; the next attempt opens a fresh handle
            self.registry.evict(destination, &handle);
            return Err(match e {
                MidiError::SendFailed { .. } => e,
                other => MidiError::send_failed(destination, other.to_string()),
            });
        }

        debug!("Sent MIDI message to '{}': {} [{}]", destination, message, format_hex(&bytes));
        Ok(())
    }

    /// Encode then send; an encode failure is reported like a send failure
    fn encode_and_send(&self, destination: &str, message: Result<MidiMessage>) -> bool {
        match message {
            Ok(message) => self.send(destination, &message),
            Err(e) => {
                warn!(kind = ?e.kind(), "Refusing to send to '{}': {}", destination, e);
                false
            }
        }
    }

    pub fn send_note_on(&self, destination: &str, channel: i64, note: i64, velocity: i64) -> bool {
        self.encode_and_send(destination, MidiMessage::note_on(channel, note, velocity))
    }

    pub fn send_note_off(&self, destination: &str, channel: i64, note: i64) -> bool {
        self.encode_and_send(destination, MidiMessage::note_off(channel, note))
    }

    pub fn send_control_change(&self, destination: &str, channel: i64, cc: i64, value: i64) -> bool {
        self.encode_and_send(destination, MidiMessage::control_change(channel, cc, value))
    }

    pub fn send_program_change(&self, destination: &str, channel: i64, program: i64) -> bool {
        self.encode_and_send(destination, MidiMessage::program_change(channel, program))
    }

    pub fn send_pitch_wheel(&self, destination: &str, channel: i64, pitch: i64) -> bool {
        self.encode_and_send(destination, MidiMessage::pitch_wheel(channel, pitch))
    }
}
