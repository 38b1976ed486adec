//! Core types for the trace engine
//!
//! This module defines the values every other module passes around: the raw
//! [`Frame`] as read from a log file, the time-ordered [`Recording`] a parser
//! produces, decoded signal values, and the engine's error type.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, TraceError>;

/// One occurrence of a CAN message in a recording
///
/// Frames are immutable once a parser has produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Timestamp in seconds (relative to the recording start after normalization)
    pub timestamp: f64,
    /// CAN channel number (e.g., 1, 2...)
    pub channel: u8,
    /// CAN message ID (11-bit or 29-bit)
    pub can_id: u32,
    /// Frame data bytes (0-8 bytes for classic CAN, up to 64 for CAN-FD)
    pub data: Vec<u8>,
    /// Declared data length as written in the log
    pub dlc: u8,
}

impl Frame {
    /// Create a frame whose declared length matches its payload
    pub fn new(timestamp: f64, channel: u8, can_id: u32, data: Vec<u8>) -> Self {
        let dlc = data.len().min(u8::MAX as usize) as u8;
        Self {
            timestamp,
            channel,
            can_id,
            data,
            dlc,
        }
    }

    /// Hex label for the arbitration id, e.g. `0x1A0`
    pub fn id_label(&self) -> String {
        format!("0x{:X}", self.can_id)
    }

    /// Payload rendered as space separated hex pairs
    pub fn data_hex(&self) -> String {
        self.data
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A complete, timestamp-ordered sequence of frames from one log file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    frames: Vec<Frame>,
}

impl Recording {
    /// Build a recording, stable-sorting the frames by timestamp
    pub fn new(mut frames: Vec<Frame>) -> Self {
        frames.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { frames }
    }

    /// Shift every timestamp so the first frame sits at 0.0
    pub fn normalized(mut self) -> Self {
        if let Some(first) = self.frames.first().map(|f| f.timestamp) {
            for frame in &mut self.frames {
                frame.timestamp -= first;
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

/// Errors that can occur while loading or navigating a recording
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse log file: {0}")]
    LogParseError(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("No CAN frames found in {0:?}")]
    NoFrames(PathBuf),

    #[error("Failed to parse DBC file: {0}")]
    DbcParseError(String),

    #[error("Frame index {index} out of range (recording has {len} frames)")]
    OutOfRange { index: usize, len: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A decoded signal with its current value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedSignal {
    /// Signal name from the DBC
    pub name: String,
    /// Physical value (after scaling)
    pub value: SignalValue,
    /// Engineering unit (e.g., "km/h", "°C", "V")
    pub unit: Option<String>,
    /// Value description from the signal's value table, if the raw value has one
    pub value_description: Option<String>,
    /// Raw value before scaling
    pub raw_value: i64,
}

impl DecodedSignal {
    /// Display text: the value table entry if present, else the value, plus unit
    pub fn display(&self) -> String {
        let value = match &self.value_description {
            Some(description) => description.clone(),
            None => self.value.to_string(),
        };
        match self.unit.as_deref() {
            Some(unit) if !unit.is_empty() => format!("{} {}", value, unit),
            _ => value,
        }
    }
}

/// The decode result of one payload: signals in definition order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodedValue {
    pub signals: Vec<DecodedSignal>,
}

impl DecodedValue {
    /// Look up a signal by name
    pub fn get(&self, name: &str) -> Option<&DecodedSignal> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Format as "Sig1: 12.5, Sig2: 100"
    pub fn summary(&self) -> String {
        self.signals
            .iter()
            .map(|s| {
                let value = s
                    .value_description
                    .clone()
                    .unwrap_or_else(|| s.value.to_string());
                format!("{}: {}", s.name, value)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Signal value types supported by the decoder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Signed integer value
    Integer(i64),
    /// Floating-point value (after scaling/offset)
    Float(f64),
    /// Boolean value (single unscaled bit)
    Boolean(bool),
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Integer(v) => write!(f, "{}", v),
            SignalValue::Float(v) => write!(f, "{:.3}", v),
            SignalValue::Boolean(v) => write!(f, "{}", if *v { "true" } else { "false" }),
        }
    }
}

impl SignalValue {
    /// Convert signal value to f64 for plotting
    pub fn as_f64(&self) -> f64 {
        match self {
            SignalValue::Integer(v) => *v as f64,
            SignalValue::Float(v) => *v,
            SignalValue::Boolean(v) => {
                if *v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}
