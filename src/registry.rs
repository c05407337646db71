//! Output port registry
//!
//! Discovers destinations, opens them on demand, and caches one live handle
//! per destination name. Dead handles are evicted and never reused; the next
//! `acquire` opens a fresh one.
//!
//! The registry is an explicit object (not a global) shared as
//! `Arc<PortRegistry>` by the dispatcher and the deck. All cache
//! read-modify-write sequences run under one mutex, so two racing
//! `acquire` calls for the same name open the destination exactly once.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{MidiError, Result};
use crate::transport::{OutputConnection, Transport};

/// An open, write-capable channel to one destination
///
/// Owned by the registry; callers get shared references. Once closed the
/// inner connection is dropped and the handle can never write again.
pub struct ConnectionHandle {
    name: String,
    open: AtomicBool,
    connection: Mutex<Option<Box<dyn OutputConnection>>>,
}

impl ConnectionHandle {
    fn new(name: &str, connection: Box<dyn OutputConnection>) -> Self {
        Self {
            name: name.to_string(),
            open: AtomicBool::new(true),
            connection: Mutex::new(Some(connection)),
        }
    }

    /// Destination name this handle is bound to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Never blocks. A handle busy writing counts as open; if that write
    /// fails the writer evicts it.
    pub fn is_open(&self) -> bool {
        if !self.open.load(Ordering::Acquire) {
            return false;
        }
        match self.connection.try_lock() {
            Some(guard) => guard.as_ref().map(|conn| conn.is_open()).unwrap_or(false),
            None => true,
        }
    }

    /// Write encoded bytes
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        match self.connection.lock().as_mut() {
            Some(conn) => conn.write(bytes),
            None => Err(MidiError::send_failed(&self.name, "handle is closed")),
        }
    }

    /// Close the handle. Closing twice is a no-op.
    fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::Release);
        match self.connection.lock().take() {
            Some(mut conn) => conn.close(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Registry of open output handles, keyed by destination name
pub struct PortRegistry {
    transport: Arc<dyn Transport>,
    handles: Mutex<HashMap<String, Arc<ConnectionHandle>>>,
}

impl PortRegistry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Destinations currently present
    ///
    /// A failed query is logged and reads as "nothing available". Each call
    /// queries the environment again.
    pub fn list_destinations(&self) -> Vec<String> {
        self.try_list_destinations().unwrap_or_else(|e| {
            error!("Failed to get MIDI output ports: {}", e);
            Vec::new()
        })
    }

    /// Like [`list_destinations`](Self::list_destinations) but keeps the error
    pub fn try_list_destinations(&self) -> Result<Vec<String>> {
        self.transport.enumerate_destinations()
    }

    /// Get the live handle for `name`, opening the destination if needed
    pub fn acquire(&self, name: &str) -> Result<Arc<ConnectionHandle>> {
        if name.trim().is_empty() {
            return Err(MidiError::InvalidDestination(name.to_string()));
        }

        let mut handles = self.handles.lock();

        if let Some(handle) = handles.get(name) {
            if handle.is_open() {
                return Ok(Arc::clone(handle));
            }
            debug!("Evicting dead MIDI output handle: {}", name);
            if let Some(dead) = handles.remove(name) {
                if let Err(e) = dead.close() {
                    debug!("Closing dead handle '{}' failed: {}", name, e);
                }
            }
        }

        // Never open a destination that isn't listed
        if !self.list_destinations().iter().any(|n| n == name) {
            return Err(MidiError::unavailable(name, "not present"));
        }

        let connection = self.transport.open(name).map_err(|e| match e {
            MidiError::DeviceUnavailable { .. } => e,
            other => MidiError::unavailable(name, other.to_string()),
        })?;

        let handle = Arc::new(ConnectionHandle::new(name, connection));
        handles.insert(name.to_string(), Arc::clone(&handle));
        info!("Opened MIDI output port: {}", name);
        Ok(handle)
    }

    /// Drop `handle` from the cache if it is still the cached one for `name`
    ///
    /// Used after a failed write. A handle opened by someone else in the
    /// meantime is left alone.
    pub fn evict(&self, name: &str, handle: &Arc<ConnectionHandle>) {
        let mut handles = self.handles.lock();
        let is_current = handles
            .get(name)
            .map(|cached| Arc::ptr_eq(cached, handle))
            .unwrap_or(false);

        if is_current {
            handles.remove(name);
            warn!("Evicted MIDI output port after failure: {}", name);
        }
        drop(handles);

        if let Err(e) = handle.close() {
            debug!("Closing failed handle '{}' also failed: {}", name, e);
        }
    }

    /// Close and forget the handle for `name`; no-op if none is cached
    pub fn release(&self, name: &str) {
        let removed = self.handles.lock().remove(name);
        if let Some(handle) = removed {
            match handle.close() {
                Ok(()) => info!("Closed MIDI output port: {}", name),
                Err(e) => error!("Failed to close MIDI output port '{}': {}", name, e),
            }
        }
    }

    /// Close every cached handle. Best effort: failures are logged and skipped.
    pub fn release_all(&self) {
        let drained: Vec<(String, Arc<ConnectionHandle>)> = self.handles.lock().drain().collect();
        for (name, handle) in drained {
            match handle.close() {
                Ok(()) => info!("Closed MIDI output port: {}", name),
                Err(e) => error!("Failed to close MIDI output port '{}': {}", name, e),
            }
        }
    }

    /// Whether a handle for `name` is currently cached (open or not)
    pub fn is_cached(&self, name: &str) -> bool {
        self.handles.lock().contains_key(name)
    }

    /// Names with a cached handle, sorted
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Drop for PortRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::VirtualTransport;
    use std::time::Duration;

    fn registry_with(names: &[&str]) -> (VirtualTransport, PortRegistry) {
        let transport = VirtualTransport::new(names.iter().copied());
        let registry = PortRegistry::new(Arc::new(transport.clone()));
        (transport, registry)
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let (transport, registry) = registry_with(&["Synth"]);
        assert_eq!(
            registry.acquire("").unwrap_err(),
            MidiError::InvalidDestination(String::new())
        );
        assert!(matches!(
            registry.acquire("   "),
            Err(MidiError::InvalidDestination(_))
        ));
        assert_eq!(transport.open_count(""), 0);
    }

    #[test]
    fn test_missing_device_is_unavailable() {
        let (_transport, registry) = registry_with(&[]);
        let err = registry.acquire("MissingDevice").unwrap_err();
        assert!(matches!(err, MidiError::DeviceUnavailable { .. }));
        assert!(!registry.is_cached("MissingDevice"));
    }

    #[test]
    fn test_acquire_caches_handle() {
        let (transport, registry) = registry_with(&["Synth"]);
        let first = registry.acquire("Synth").unwrap();
        let second = registry.acquire("Synth").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(transport.open_count("Synth"), 1);
        assert_eq!(registry.cached_names(), vec!["Synth".to_string()]);
    }

    #[test]
    fn test_dead_handle_is_replaced() {
        let (transport, registry) = registry_with(&["Synth"]);
        let first = registry.acquire("Synth").unwrap();

        // Unplug and re-plug: the old connection is dead
        transport.remove_destination("Synth");
        transport.add_destination("Synth");
        assert!(!first.is_open());

        let second = registry.acquire("Synth").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.is_open());
        assert_eq!(transport.open_count("Synth"), 2);
    }

    #[test]
    fn test_dead_handle_replaced_when_close_fails() {
        let (transport, registry) = registry_with(&["Synth"]);
        let first = registry.acquire("Synth").unwrap();

        transport.remove_destination("Synth");
        transport.add_destination("Synth");
        transport.set_fail_close(true);

        let second = registry.acquire("Synth").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!first.is_open());
        assert!(second.is_open());
        assert_eq!(registry.cached_names(), vec!["Synth".to_string()]);
    }

    #[test]
    fn test_busy_handle_does_not_block_acquire() {
        let (transport, registry) = registry_with(&["Synth"]);
        let handle = registry.acquire("Synth").unwrap();

        // Same thread: a blocking liveness check would deadlock here
        let busy = handle.connection.lock();
        let again = registry.acquire("Synth").unwrap();
        drop(busy);

        assert!(Arc::ptr_eq(&handle, &again));
        assert_eq!(transport.open_count("Synth"), 1);
    }

    #[test]
    fn test_closed_flag_wins_over_busy_lock() {
        let (_transport, registry) = registry_with(&["Synth"]);
        let handle = registry.acquire("Synth").unwrap();
        handle.open.store(false, Ordering::Release);

        let _busy = handle.connection.lock();
        assert!(!handle.is_open());
    }

    #[test]
    fn test_dead_handle_for_unplugged_device() {
        let (transport, registry) = registry_with(&["Synth"]);
        registry.acquire("Synth").unwrap();

        transport.remove_destination("Synth");
        assert!(matches!(
            registry.acquire("Synth"),
            Err(MidiError::DeviceUnavailable { .. })
        ));
        assert!(!registry.is_cached("Synth"));
    }

    #[test]
    fn test_enumeration_failure_reads_as_empty() {
        let (transport, registry) = registry_with(&["Synth"]);
        transport.set_fail_enumeration(true);

        assert!(registry.list_destinations().is_empty());
        assert!(matches!(
            registry.try_list_destinations(),
            Err(MidiError::DeviceEnumeration(_))
        ));
        assert!(matches!(
            registry.acquire("Synth"),
            Err(MidiError::DeviceUnavailable { .. })
        ));
    }

    #[test]
    fn test_release_is_idempotent() {
        let (transport, registry) = registry_with(&["Synth"]);
        let handle = registry.acquire("Synth").unwrap();

        registry.release("Synth");
        assert!(!handle.is_open());
        assert!(!registry.is_cached("Synth"));

        registry.release("Synth");
        assert!(!registry.is_cached("Synth"));

        // A closed handle is never reused
        assert!(handle.write(&[0xB0, 7, 0]).is_err());
        let fresh = registry.acquire("Synth").unwrap();
        assert!(!Arc::ptr_eq(&handle, &fresh));
        assert_eq!(transport.open_count("Synth"), 2);
    }

    #[test]
    fn test_release_all_survives_close_failures() {
        let (transport, registry) = registry_with(&["A", "B"]);
        let a = registry.acquire("A").unwrap();
        let b = registry.acquire("B").unwrap();

        transport.set_fail_close(true);
        registry.release_all();

        assert!(registry.cached_names().is_empty());
        assert!(!a.is_open());
        assert!(!b.is_open());
    }

    #[test]
    fn test_evict_ignores_stale_handle() {
        let (_transport, registry) = registry_with(&["Synth"]);
        let old = registry.acquire("Synth").unwrap();
        registry.release("Synth");
        let fresh = registry.acquire("Synth").unwrap();

        registry.evict("Synth", &old);
        assert!(registry.is_cached("Synth"));
        assert!(fresh.is_open());
    }

    #[test]
    fn test_concurrent_acquire_opens_once() {
        let (transport, registry) = registry_with(&["X"]);
        transport.set_open_delay(Some(Duration::from_millis(50)));

        let (a, b) = std::thread::scope(|s| {
            let a = s.spawn(|| registry.acquire("X").unwrap());
            let b = s.spawn(|| registry.acquire("X").unwrap());
            (a.join().unwrap(), b.join().unwrap())
        });

        assert_eq!(transport.open_count("X"), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
