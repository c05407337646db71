//! System MIDI outputs through midir

use midir::{MidiOutput, MidiOutputConnection};
use tracing::debug;

use super::{OutputConnection, Transport};
use crate::error::{MidiError, Result};

/// Client name registered with the system MIDI service
pub const DEFAULT_CLIENT_NAME: &str = "Deck-MIDI";

/// Transport over the platform's MIDI outputs (ALSA, CoreMIDI, WinMM)
pub struct MidirTransport {
    client_name: String,
}

impl MidirTransport {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }
}

impl Default for MidirTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_NAME)
    }
}

impl Transport for MidirTransport {
    fn enumerate_destinations(&self) -> Result<Vec<String>> {
        let midi_out = MidiOutput::new(&format!("{}-Scanner", self.client_name))?;

        let mut port_names = Vec::new();
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                port_names.push(name);
            }
        }

        debug!("Found {} MIDI output ports", port_names.len());
        Ok(port_names)
    }

    fn open(&self, name: &str) -> Result<Box<dyn OutputConnection>> {
        let midi_out = MidiOutput::new(&format!("{}-Output", self.client_name))
            .map_err(|e| MidiError::unavailable(name, e.to_string()))?;

        // Exact match: the registry already checked the name against the port list
        let port = midi_out
            .ports()
            .into_iter()
            .find(|port| midi_out.port_name(port).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| MidiError::unavailable(name, "port not found"))?;

        let connection = midi_out
            .connect(&port, &format!("{}-{}", self.client_name, name))
            .map_err(|e| MidiError::unavailable(name, e.to_string()))?;

        Ok(Box::new(MidirConnection {
            port_name: name.to_string(),
            connection: Some(connection),
        }))
    }
}

struct MidirConnection {
    port_name: String,
    connection: Option<MidiOutputConnection>,
}

impl OutputConnection for MidirConnection {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| MidiError::send_failed(&self.port_name, "connection is closed"))?;

        connection
            .send(bytes)
            .map_err(|e| MidiError::send_failed(&self.port_name, e.to_string()))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            // Returns the MidiOutput client, which we don't reuse
            let _ = connection.close();
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }
}
