//! Outbound MIDI messages
//!
//! Validating constructors for the five channel messages a control can emit,
//! plus wire encoding and a few value conversions used for display.

use std::fmt;

use crate::error::{MidiError, Result};

/// Highest MIDI channel (0-based)
pub const MAX_CHANNEL: u8 = 15;
/// Highest 7-bit data value
pub const MAX_DATA: u8 = 127;
/// Pitch wheel range, signed 14-bit
pub const PITCH_MIN: i16 = -8192;
pub const PITCH_MAX: i16 = 8191;

/// Outbound MIDI message
///
/// Build these through the validating constructors ([`MidiMessage::note_on`],
/// [`MidiMessage::control_change`], ...). A message is an immutable value
/// created once per send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Note Off: channel (0-15), note (0-127); always sent with velocity 0
    NoteOff { channel: u8, note: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },

    /// Pitch Wheel: channel (0-15), pitch (-8192..=8191, 0 = center)
    PitchWheel { channel: u8, pitch: i16 },
}

/// Which message a control emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    NoteOn,
    NoteOff,
    ControlChange,
    ProgramChange,
    PitchWheel,
}

fn checked(field: &'static str, value: i64, max: u8) -> Result<u8> {
    if (0..=i64::from(max)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(MidiError::InvalidFieldValue {
            field,
            value,
            min: 0,
            max: i64::from(max),
        })
    }
}

impl MidiMessage {
    pub fn note_on(channel: i64, note: i64, velocity: i64) -> Result<Self> {
        Ok(MidiMessage::NoteOn {
            channel: checked("channel", channel, MAX_CHANNEL)?,
            note: checked("note", note, MAX_DATA)?,
            velocity: checked("velocity", velocity, MAX_DATA)?,
        })
    }

    pub fn note_off(channel: i64, note: i64) -> Result<Self> {
        Ok(MidiMessage::NoteOff {
            channel: checked("channel", channel, MAX_CHANNEL)?,
            note: checked("note", note, MAX_DATA)?,
        })
    }

    pub fn control_change(channel: i64, cc: i64, value: i64) -> Result<Self> {
        Ok(MidiMessage::ControlChange {
            channel: checked("channel", channel, MAX_CHANNEL)?,
            cc: checked("controller", cc, MAX_DATA)?,
            value: checked("value", value, MAX_DATA)?,
        })
    }

    pub fn program_change(channel: i64, program: i64) -> Result<Self> {
        Ok(MidiMessage::ProgramChange {
            channel: checked("channel", channel, MAX_CHANNEL)?,
            program: checked("program", program, MAX_DATA)?,
        })
    }

    /// Pitch is clamped into range rather than rejected; the channel is not.
    pub fn pitch_wheel(channel: i64, pitch: i64) -> Result<Self> {
        Ok(MidiMessage::PitchWheel {
            channel: checked("channel", channel, MAX_CHANNEL)?,
            pitch: pitch.clamp(i64::from(PITCH_MIN), i64::from(PITCH_MAX)) as i16,
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            MidiMessage::NoteOn { .. } => MessageKind::NoteOn,
            MidiMessage::NoteOff { .. } => MessageKind::NoteOff,
            MidiMessage::ControlChange { .. } => MessageKind::ControlChange,
            MidiMessage::ProgramChange { .. } => MessageKind::ProgramChange,
            MidiMessage::PitchWheel { .. } => MessageKind::PitchWheel,
        }
    }

    /// Channel (0-15)
    pub fn channel(&self) -> u8 {
        match *self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::PitchWheel { channel, .. } => channel,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOff { channel, note } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, 0]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
            MidiMessage::PitchWheel { channel, pitch } => {
                let value = (i32::from(pitch) + 8192) as u16;
                let lsb = (value & 0x7F) as u8;
                let msb = ((value >> 7) & 0x7F) as u8;
                vec![0xE0 | (channel & 0x0F), lsb, msb]
            }
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOff { channel, note } => {
                write!(f, "NoteOff ch:{} n:{}", channel + 1, note)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::ProgramChange { channel, program } => {
                write!(f, "ProgramChange ch:{} p:{}", channel + 1, program)
            }
            MidiMessage::PitchWheel { channel, pitch } => {
                write!(f, "PitchWheel ch:{} p:{}", channel + 1, pitch)
            }
        }
    }
}

/// MIDI value conversion utilities
pub mod convert {
    /// Convert 7-bit value (0-127) to percentage (0-100)
    pub fn to_percent_7bit(value: u8) -> f32 {
        (value as f32 * 100.0) / 127.0
    }

    /// Rounded whole percentage of a 7-bit value
    pub fn to_rounded_percent(value: u8) -> u8 {
        to_percent_7bit(value.min(127)).round() as u8
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
