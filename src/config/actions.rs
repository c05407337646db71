//! Typed per-action configuration
//!
//! Each action reads its settings into one of these structs. Loading never
//! fails: missing keys take the documented default and out-of-domain values
//! are clamped, so a hand-edited or corrupted settings file can't take a
//! control down.

use tracing::{debug, warn};

use crate::dial::{DialLimits, PressAction};
use crate::midi::{MAX_CHANNEL, MAX_DATA, PITCH_MAX, PITCH_MIN};
use crate::settings::SettingsStore;

/// Settings keys shared by the actions
pub mod keys {
    pub const PORT: &str = "port";
    pub const CHANNEL: &str = "channel";
    pub const NOTE: &str = "note";
    pub const VELOCITY: &str = "velocity";
    pub const MODE: &str = "mode";
    pub const CC_NUMBER: &str = "cc_number";
    pub const LEGACY_CC: &str = "cc";
    pub const VALUE: &str = "value";
    pub const VALUE_OFF: &str = "value_off";
    pub const PROGRAM: &str = "program";
    pub const MSG_TYPE: &str = "msg_type";
    pub const DATA1: &str = "data1";
    pub const DATA2: &str = "data2";
    pub const STEP_SIZE: &str = "step_size";
    pub const LEGACY_STEP: &str = "step";
    pub const DEFAULT_VALUE: &str = "default_value";
    pub const PRESS_VALUE: &str = "press_value";
    pub const MIN_VALUE: &str = "min_value";
    pub const MAX_VALUE: &str = "max_value";
    pub const MUTE_VALUE: &str = "mute_value";
    pub const PRESS_ACTION: &str = "press_action";
    pub const CURRENT_VALUE: &str = "current_value";
    pub const IS_MUTED: &str = "is_muted";
    pub const LEGACY_MUTED: &str = "muted";
    pub const PRE_MUTE_VALUE: &str = "pre_mute_value";

    /// Runtime state written back to the settings file; everything else
    /// comes from the profile
    pub const STATE: &[&str] = &[CURRENT_VALUE, IS_MUTED, PRE_MUTE_VALUE];

    /// State keys accepted when restoring, legacy names included
    pub const RESTORED_STATE: &[&str] = &[CURRENT_VALUE, IS_MUTED, LEGACY_MUTED, PRE_MUTE_VALUE];
}

/// Read an int from the first present key and clamp it into `lo..=hi`
fn read_clamped(store: &dyn SettingsStore, names: &[&str], default: i64, lo: i64, hi: i64) -> i64 {
    let raw = store.get_int_any(names, default);
    let clamped = raw.clamp(lo, hi);
    if clamped != raw {
        debug!("Setting '{}' = {} clamped to {}", names[0], raw, clamped);
    }
    clamped
}

fn read_u8(store: &dyn SettingsStore, names: &[&str], default: u8, max: u8) -> u8 {
    read_clamped(store, names, i64::from(default), 0, i64::from(max)) as u8
}

fn read_port(store: &dyn SettingsStore) -> String {
    store.get_str(keys::PORT, "").trim().to_string()
}

fn read_channel(store: &dyn SettingsStore) -> u8 {
    read_u8(store, &[keys::CHANNEL], 0, MAX_CHANNEL)
}

/// Parse a string-valued mode, warning on unknown values
fn read_mode<T: Copy>(
    store: &dyn SettingsStore,
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    match store.get(key) {
        None => default,
        Some(_) => {
            let raw = store.get_str(key, "");
            parse(raw.trim()).unwrap_or_else(|| {
                warn!("Unknown {} '{}', using default", key, raw);
                default
            })
        }
    }
}

/// How a note button reacts to press/release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteMode {
    /// Note On while held, Note Off on release
    #[default]
    Momentary,
    /// Alternate Note On / Note Off on each press
    Toggle,
    NoteOnOnly,
    NoteOffOnly,
}

impl NoteMode {
    pub fn from_setting(s: &str) -> Option<Self> {
        match s {
            "momentary" => Some(NoteMode::Momentary),
            "toggle" => Some(NoteMode::Toggle),
            "note_on_only" => Some(NoteMode::NoteOnOnly),
            "note_off_only" => Some(NoteMode::NoteOffOnly),
            _ => None,
        }
    }
}

/// Note button settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteConfig {
    pub port: String,
    pub channel: u8,
    /// Default 60 (middle C)
    pub note: u8,
    /// Default 100
    pub velocity: u8,
    pub mode: NoteMode,
}

impl NoteConfig {
    pub fn load(store: &dyn SettingsStore) -> Self {
        Self {
            port: read_port(store),
            channel: read_channel(store),
            note: read_u8(store, &[keys::NOTE], 60, MAX_DATA),
            velocity: read_u8(store, &[keys::VELOCITY], 100, MAX_DATA),
            mode: read_mode(store, keys::MODE, NoteMode::default(), NoteMode::from_setting),
        }
    }
}

/// How a CC button reacts to press/release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CcMode {
    /// Send `value` on press
    #[default]
    Single,
    /// `value` on press, `value_off` on release
    Momentary,
    /// Alternate `value` / `value_off` on each press
    Toggle,
}

impl CcMode {
    pub fn from_setting(s: &str) -> Option<Self> {
        match s {
            "single" => Some(CcMode::Single),
            "momentary" => Some(CcMode::Momentary),
            "toggle" => Some(CcMode::Toggle),
            _ => None,
        }
    }
}

/// CC button settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcConfig {
    pub port: String,
    pub channel: u8,
    /// Default 7 (volume)
    pub cc_number: u8,
    /// Default 127
    pub value: u8,
    /// Default 0
    pub value_off: u8,
    pub mode: CcMode,
}

impl CcConfig {
    pub fn load(store: &dyn SettingsStore) -> Self {
        Self {
            port: read_port(store),
            channel: read_channel(store),
            cc_number: read_u8(store, &[keys::CC_NUMBER, keys::LEGACY_CC], 7, MAX_DATA),
            value: read_u8(store, &[keys::VALUE], 127, MAX_DATA),
            value_off: read_u8(store, &[keys::VALUE_OFF], 0, MAX_DATA),
            mode: read_mode(store, keys::MODE, CcMode::default(), CcMode::from_setting),
        }
    }
}

/// Program Change button settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramConfig {
    pub port: String,
    pub channel: u8,
    /// Default 0
    pub program: u8,
}

impl ProgramConfig {
    pub fn load(store: &dyn SettingsStore) -> Self {
        Self {
            port: read_port(store),
            channel: read_channel(store),
            program: read_u8(store, &[keys::PROGRAM], 0, MAX_DATA),
        }
    }
}

/// Message sent by a generic command button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandType {
    #[default]
    NoteOn,
    NoteOff,
    ControlChange,
    ProgramChange,
    PitchWheel,
}

impl CommandType {
    pub fn from_setting(s: &str) -> Option<Self> {
        match s {
            "note_on" => Some(CommandType::NoteOn),
            "note_off" => Some(CommandType::NoteOff),
            "control_change" => Some(CommandType::ControlChange),
            "program_change" => Some(CommandType::ProgramChange),
            "pitchwheel" => Some(CommandType::PitchWheel),
            _ => None,
        }
    }
}

/// Generic command button settings
///
/// `data1` is the note, controller or program; for `pitchwheel` it is the
/// signed pitch. `data2` is the velocity or CC value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    pub port: String,
    pub channel: u8,
    pub msg_type: CommandType,
    /// Default 60
    pub data1: i64,
    /// Default 100
    pub data2: u8,
}

impl CommandConfig {
    pub fn load(store: &dyn SettingsStore) -> Self {
        let msg_type = read_mode(store, keys::MSG_TYPE, CommandType::default(), CommandType::from_setting);
        let data1 = match msg_type {
            CommandType::PitchWheel => read_clamped(
                store,
                &[keys::DATA1],
                0,
                i64::from(PITCH_MIN),
                i64::from(PITCH_MAX),
            ),
            _ => i64::from(read_u8(store, &[keys::DATA1], 60, MAX_DATA)),
        };

        Self {
            port: read_port(store),
            channel: read_channel(store),
            msg_type,
            data1,
            data2: read_u8(store, &[keys::DATA2], 100, MAX_DATA),
        }
    }
}

/// What a dial press does, as stored in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PressActionKind {
    #[default]
    Mute,
    Reset,
    SendValue,
}

impl PressActionKind {
    pub fn from_setting(s: &str) -> Option<Self> {
        match s {
            "mute" => Some(PressActionKind::Mute),
            "reset" => Some(PressActionKind::Reset),
            "send_value" => Some(PressActionKind::SendValue),
            _ => None,
        }
    }
}

/// Dial settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialConfig {
    pub port: String,
    pub channel: u8,
    /// Default 7 (volume)
    pub cc_number: u8,
    /// Value change per rotation click, 1-127, default 4
    pub step_size: u8,
    /// Value used by reset, default 100
    pub default_value: u8,
    /// Value sent by `send_value`, default 127
    pub press_value: u8,
    pub limits: DialLimits,
    pub press_action: PressActionKind,
}

impl DialConfig {
    pub fn load(store: &dyn SettingsStore) -> Self {
        let limits = DialLimits::new(
            read_u8(store, &[keys::MIN_VALUE], 0, MAX_DATA),
            read_u8(store, &[keys::MAX_VALUE], MAX_DATA, MAX_DATA),
            read_u8(store, &[keys::MUTE_VALUE], 0, MAX_DATA),
        );

        Self {
            port: read_port(store),
            channel: read_channel(store),
            cc_number: read_u8(store, &[keys::CC_NUMBER, keys::LEGACY_CC], 7, MAX_DATA),
            step_size: read_clamped(store, &[keys::STEP_SIZE, keys::LEGACY_STEP], 4, 1, i64::from(MAX_DATA)) as u8,
            default_value: read_u8(store, &[keys::DEFAULT_VALUE], 100, MAX_DATA),
            press_value: read_u8(store, &[keys::PRESS_VALUE], 127, MAX_DATA),
            limits,
            press_action: read_mode(
                store,
                keys::PRESS_ACTION,
                PressActionKind::default(),
                PressActionKind::from_setting,
            ),
        }
    }

    /// The engine-level press action with its configuration attached
    pub fn press_action(&self) -> PressAction {
        match self.press_action {
            PressActionKind::Mute => PressAction::MuteToggle,
            PressActionKind::Reset => PressAction::Reset {
                default_value: self.default_value,
            },
            PressActionKind::SendValue => PressAction::SendFixed {
                value: self.press_value,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsMap;

    #[test]
    fn test_dial_defaults() {
        let config = DialConfig::load(&SettingsMap::new());
        assert_eq!(config.port, "");
        assert_eq!(config.channel, 0);
        assert_eq!(config.cc_number, 7);
        assert_eq!(config.step_size, 4);
        assert_eq!(config.default_value, 100);
        assert_eq!(config.press_value, 127);
        assert_eq!(config.limits, DialLimits::new(0, 127, 0));
        assert_eq!(config.press_action(), PressAction::MuteToggle);
    }

    #[test]
    fn test_dial_clamps_on_load() {
        let settings = SettingsMap::new()
            .with("channel", 40i64)
            .with("cc_number", -5i64)
            .with("step_size", 0i64)
            .with("max_value", 900i64)
            .with("press_action", "send_value")
            .with("press_value", 300i64);
        let config = DialConfig::load(&settings);

        assert_eq!(config.channel, 15);
        assert_eq!(config.cc_number, 0);
        assert_eq!(config.step_size, 1);
        assert_eq!(config.limits.max_value, 127);
        assert_eq!(config.press_action(), PressAction::SendFixed { value: 127 });
    }

    #[test]
    fn test_dial_legacy_keys() {
        let settings = SettingsMap::new().with("cc", 10i64).with("step", 8i64);
        let config = DialConfig::load(&settings);
        assert_eq!(config.cc_number, 10);
        assert_eq!(config.step_size, 8);
    }

    #[test]
    fn test_reset_carries_default() {
        let settings = SettingsMap::new()
            .with("press_action", "reset")
            .with("default_value", 64i64);
        assert_eq!(
            DialConfig::load(&settings).press_action(),
            PressAction::Reset { default_value: 64 }
        );
    }

    #[test]
    fn test_unknown_mode_falls_back() {
        let settings = SettingsMap::new().with("mode", "bogus");
        assert_eq!(NoteConfig::load(&settings).mode, NoteMode::Momentary);
        assert_eq!(CcConfig::load(&settings).mode, CcMode::Single);
    }

    #[test]
    fn test_note_config() {
        let settings = SettingsMap::new()
            .with("port", "  Synth ")
            .with("note", 36i64)
            .with("mode", "toggle");
        let config = NoteConfig::load(&settings);
        assert_eq!(config.port, "Synth");
        assert_eq!(config.note, 36);
        assert_eq!(config.velocity, 100);
        assert_eq!(config.mode, NoteMode::Toggle);
    }

    #[test]
    fn test_command_pitch_range() {
        let settings = SettingsMap::new()
            .with("msg_type", "pitchwheel")
            .with("data1", -9000i64);
        let config = CommandConfig::load(&settings);
        assert_eq!(config.msg_type, CommandType::PitchWheel);
        assert_eq!(config.data1, -8192);

        let settings = SettingsMap::new().with("msg_type", "control_change").with("data1", 500i64);
        assert_eq!(CommandConfig::load(&settings).data1, 127);
    }
}
