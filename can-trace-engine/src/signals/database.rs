//! Signal database
//!
//! Holds the message definitions loaded from a DBC file, keyed by CAN ID.

use std::collections::HashMap;

/// A complete CAN message definition
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// Message size in bytes
    pub size: usize,
    /// Sender ECU name (optional)
    pub sender: Option<String>,
    /// All signals in this message, in definition order
    pub signals: Vec<SignalDefinition>,
    /// True if this message has multiplexed signals
    pub is_multiplexed: bool,
    /// Multiplexer signal name (if multiplexed)
    pub multiplexer_signal: Option<String>,
}

impl MessageDefinition {
    /// Look up a signal definition by name
    pub fn signal(&self, name: &str) -> Option<&SignalDefinition> {
        self.signals.iter().find(|s| s.name == name)
    }
}

/// A CAN signal definition
#[derive(Debug, Clone)]
pub struct SignalDefinition {
    /// Signal name
    pub name: String,
    /// Start bit in the CAN frame
    pub start_bit: u16,
    /// Length in bits
    pub length: u16,
    /// Byte order
    pub byte_order: ByteOrder,
    /// Value type (signed/unsigned)
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Minimum physical value
    pub min: f64,
    /// Maximum physical value
    pub max: f64,
    /// Engineering unit (e.g., "km/h", "°C", "V")
    pub unit: Option<String>,
    /// Value table for enum-like values (raw_value -> description)
    pub value_table: Option<HashMap<i64, String>>,
    /// Multiplexer info (None if not multiplexed)
    pub multiplexer_info: Option<MultiplexerInfo>,
}

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Signed integer
    Signed,
    /// Unsigned integer
    Unsigned,
}

/// Multiplexer information for multiplexed signals
#[derive(Debug, Clone)]
pub struct MultiplexerInfo {
    /// Name of the multiplexer signal that controls this signal
    pub multiplexer_signal: String,
    /// Multiplexer value(s) for which this signal is active
    pub multiplexer_values: Vec<u64>,
}

/// The loaded signal database
#[derive(Debug, Default)]
pub struct SignalDatabase {
    /// All message definitions by CAN ID
    messages: HashMap<u32, MessageDefinition>,
}

impl SignalDatabase {
    /// Create a new empty signal database
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message definition to the database
    ///
    /// A later definition for the same CAN ID replaces the earlier one.
    pub fn add_message(&mut self, message: MessageDefinition) {
        let can_id = message.id;

        if let Some(previous) = self.messages.get(&can_id) {
            log::warn!(
                "Duplicate definition for CAN ID 0x{:X}: {} replaces {}",
                can_id,
                message.name,
                previous.name
            );
        }

        self.messages.insert(can_id, message);
    }

    /// Get the message definition for a CAN ID
    pub fn get_message(&self, can_id: u32) -> Option<&MessageDefinition> {
        self.messages.get(&can_id)
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            num_messages: self.messages.len(),
            num_signals: self.messages.values().map(|msg| msg.signals.len()).sum(),
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of message definitions
    pub num_messages: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
}
