//! In-memory virtual outputs
//!
//! Named destinations that live only inside the process. Used by the CLI's
//! `--virtual` dry-run mode and as the transport in tests: it counts opens,
//! records every write, and can be told to fail.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{OutputConnection, Transport};
use crate::error::{MidiError, Result};
use crate::midi::format_hex;

#[derive(Default)]
struct VirtualState {
    destinations: Vec<String>,
    opens: HashMap<String, usize>,
    sent: Vec<(String, Vec<u8>)>,
    /// Bumped when a destination is removed so existing connections go dead
    generations: HashMap<String, u64>,
    fail_enumeration: bool,
    fail_writes: HashSet<String>,
    fail_close: bool,
    open_delay: Option<Duration>,
}

/// Shared in-memory transport; clones observe the same destinations
#[derive(Clone, Default)]
pub struct VirtualTransport {
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualTransport {
    pub fn new<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let transport = Self::default();
        for name in destinations {
            transport.add_destination(name);
        }
        transport
    }

    /// Plug in a destination
    pub fn add_destination(&self, name: impl Into<String>) {
        let name = name.into();
        let mut state = self.state.lock();
        if !state.destinations.contains(&name) {
            state.destinations.push(name);
        }
    }

    /// Unplug a destination; connections already open to it go dead
    pub fn remove_destination(&self, name: &str) {
        let mut state = self.state.lock();
        state.destinations.retain(|n| n != name);
        *state.generations.entry(name.to_string()).or_default() += 1;
    }

    pub fn set_fail_enumeration(&self, fail: bool) {
        self.state.lock().fail_enumeration = fail;
    }

    /// Make writes to `name` fail (connection stays open)
    pub fn set_fail_writes(&self, name: &str, fail: bool) {
        let mut state = self.state.lock();
        if fail {
            state.fail_writes.insert(name.to_string());
        } else {
            state.fail_writes.remove(name);
        }
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.state.lock().fail_close = fail;
    }

    /// Slow down `open` to widen race windows
    pub fn set_open_delay(&self, delay: Option<Duration>) {
        self.state.lock().open_delay = delay;
    }

    /// Number of successful opens of `name`
    pub fn open_count(&self, name: &str) -> usize {
        self.state.lock().opens.get(name).copied().unwrap_or(0)
    }

    /// Every write so far, in order, as (destination, bytes)
    pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().sent.clone()
    }

    /// Writes delivered to one destination
    pub fn sent_to(&self, name: &str) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|(dest, _)| dest == name)
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }
}

impl Transport for VirtualTransport {
    fn enumerate_destinations(&self) -> Result<Vec<String>> {
        let state = self.state.lock();
        if state.fail_enumeration {
            return Err(MidiError::DeviceEnumeration(
                "virtual enumeration failure".to_string(),
            ));
        }
        Ok(state.destinations.clone())
    }

    fn open(&self, name: &str) -> Result<Box<dyn OutputConnection>> {
        let delay = self.state.lock().open_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if !state.destinations.iter().any(|n| n == name) {
            return Err(MidiError::unavailable(name, "virtual port not found"));
        }
        *state.opens.entry(name.to_string()).or_default() += 1;
        let generation = state.generations.get(name).copied().unwrap_or(0);

        debug!("Virtual output opened: '{}'", name);
        Ok(Box::new(VirtualConnection {
            name: name.to_string(),
            generation,
            closed: false,
            state: Arc::clone(&self.state),
        }))
    }
}

struct VirtualConnection {
    name: String,
    generation: u64,
    closed: bool,
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualConnection {
    fn is_alive(&self, state: &VirtualState) -> bool {
        !self.closed && state.generations.get(&self.name).copied().unwrap_or(0) == self.generation
    }
}

impl OutputConnection for VirtualConnection {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !self.is_alive(&state) {
            return Err(MidiError::send_failed(&self.name, "virtual port disconnected"));
        }
        if state.fail_writes.contains(&self.name) {
            return Err(MidiError::send_failed(&self.name, "injected write failure"));
        }
        debug!("Virtual TX -> {}: {}", self.name, format_hex(bytes));
        state.sent.push((self.name.clone(), bytes.to_vec()));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        if self.state.lock().fail_close {
            return Err(MidiError::send_failed(&self.name, "injected close failure"));
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        let state = self.state.lock();
        self.is_alive(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_write() {
        let transport = VirtualTransport::new(["Synth"]);
        let mut conn = transport.open("Synth").unwrap();
        conn.write(&[0x90, 60, 100]).unwrap();

        assert_eq!(transport.open_count("Synth"), 1);
        assert_eq!(transport.sent_to("Synth"), vec![vec![0x90, 60, 100]]);
    }

    #[test]
    fn test_open_missing_destination() {
        let transport = VirtualTransport::new(["Synth"]);
        assert!(matches!(
            transport.open("Other"),
            Err(MidiError::DeviceUnavailable { .. })
        ));
    }

    #[test]
    fn test_removed_destination_kills_connection() {
        let transport = VirtualTransport::new(["Synth"]);
        let mut conn = transport.open("Synth").unwrap();
        assert!(conn.is_open());

        transport.remove_destination("Synth");
        assert!(!conn.is_open());
        assert!(conn.write(&[0xB0, 7, 1]).is_err());

        // Re-plugging does not revive the old connection
        transport.add_destination("Synth");
        assert!(!conn.is_open());
        assert!(transport.open("Synth").unwrap().is_open());
    }

    #[test]
    fn test_enumeration_failure() {
        let transport = VirtualTransport::new(["Synth"]);
        transport.set_fail_enumeration(true);
        assert!(matches!(
            transport.enumerate_destinations(),
            Err(MidiError::DeviceEnumeration(_))
        ));
    }
}
