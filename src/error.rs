//! Error taxonomy for the MIDI output core
//!
//! Every failure the core can hit is recovered at the registry/dispatcher
//! boundary. Callers get one of these values back (or a `false`), never a
//! panic, so a control surface stays responsive with no device attached.

use thiserror::Error;

/// Failures raised by the encoder, the port registry and the dispatcher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MidiError {
    /// Empty or whitespace-only destination name, rejected before any I/O
    #[error("invalid MIDI destination name: {0:?}")]
    InvalidDestination(String),

    /// The environment could not be queried for output destinations
    #[error("failed to enumerate MIDI outputs: {0}")]
    DeviceEnumeration(String),

    /// The requested destination is not currently present (or refused to open)
    #[error("MIDI output '{name}' is unavailable: {reason}")]
    DeviceUnavailable { name: String, reason: String },

    /// A write to an open handle failed; the handle has been evicted
    #[error("failed to send to MIDI output '{port}': {reason}")]
    SendFailed { port: String, reason: String },

    /// A protocol field outside its legal domain
    #[error("{field} value {value} is outside {min}..={max}")]
    InvalidFieldValue {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Fieldless mirror of [`MidiError`], handy for outcomes and log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidDestination,
    DeviceEnumeration,
    DeviceUnavailable,
    SendFailed,
    InvalidFieldValue,
}

impl MidiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MidiError::InvalidDestination(_) => ErrorKind::InvalidDestination,
            MidiError::DeviceEnumeration(_) => ErrorKind::DeviceEnumeration,
            MidiError::DeviceUnavailable { .. } => ErrorKind::DeviceUnavailable,
            MidiError::SendFailed { .. } => ErrorKind::SendFailed,
            MidiError::InvalidFieldValue { .. } => ErrorKind::InvalidFieldValue,
        }
    }

    pub(crate) fn unavailable(name: &str, reason: impl Into<String>) -> Self {
        MidiError::DeviceUnavailable {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn send_failed(port: &str, reason: impl Into<String>) -> Self {
        MidiError::SendFailed {
            port: port.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<midir::InitError> for MidiError {
    fn from(e: midir::InitError) -> Self {
        MidiError::DeviceEnumeration(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MidiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            MidiError::InvalidDestination(String::new()).kind(),
            ErrorKind::InvalidDestination
        );
        assert_eq!(
            MidiError::unavailable("X", "absent").kind(),
            ErrorKind::DeviceUnavailable
        );
        assert_eq!(
            MidiError::send_failed("X", "broken pipe").kind(),
            ErrorKind::SendFailed
        );
    }

    #[test]
    fn test_field_error_names_the_field() {
        let err = MidiError::InvalidFieldValue {
            field: "channel",
            value: 20,
            min: 0,
            max: 15,
        };
        assert_eq!(err.to_string(), "channel value 20 is outside 0..=15");
    }
}
