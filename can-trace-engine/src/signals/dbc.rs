//! DBC file parser
//!
//! Parses Vector DBC files and converts them into our internal signal database format.

use crate::signals::database::{
    ByteOrder, MessageDefinition, MultiplexerInfo, SignalDatabase, SignalDefinition, ValueType,
};
use crate::types::{Result, TraceError};
use std::collections::HashMap;
use std::path::Path;

/// Extended-ID flag bit used by DBC message IDs
const DBC_EXTENDED_ID_FLAG: u32 = 0x8000_0000;

impl SignalDatabase {
    /// Load a DBC file into a new database
    pub fn from_dbc_file(path: &Path) -> Result<Self> {
        let mut db = SignalDatabase::new();
        for message in parse_dbc_file(path)? {
            db.add_message(message);
        }
        Ok(db)
    }
}

/// Parse a DBC file and return message definitions
pub fn parse_dbc_file(path: &Path) -> Result<Vec<MessageDefinition>> {
    log::info!("Parsing DBC file: {:?}", path);

    // Read the DBC file as bytes first (handle non-UTF8 encodings)
    let bytes = std::fs::read(path).map_err(|e| {
        TraceError::DbcParseError(format!("Failed to read file {:?}: {}", path, e))
    })?;

    // Try UTF-8 first, then fall back to Latin-1 (compatible with Windows-1252)
    let dbc_content = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("DBC file is not UTF-8, trying Latin-1 encoding");
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };

    let source_filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.dbc")
        .to_string();

    let messages = parse_dbc_str(&dbc_content, &source_filename)?;

    log::info!("Parsed {} messages from {:?}", messages.len(), path);

    Ok(messages)
}

/// Parse DBC text and return message definitions
pub fn parse_dbc_str(content: &str, source: &str) -> Result<Vec<MessageDefinition>> {
    let dbc = can_dbc::DBC::from_slice(content.as_bytes()).map_err(|e| {
        TraceError::DbcParseError(format!("Failed to parse DBC {}: {:?}", source, e))
    })?;

    dbc.messages()
        .iter()
        .map(|dbc_msg| convert_message(&dbc, dbc_msg))
        .collect()
}

/// Convert a can-dbc message to our MessageDefinition
fn convert_message(
    dbc: &can_dbc::DBC,
    dbc_msg: &can_dbc::Message,
) -> Result<MessageDefinition> {
    let mut is_multiplexed = false;
    let mut multiplexer_signal_name: Option<String> = None;

    // First pass: identify multiplexer signal
    for dbc_sig in dbc_msg.signals() {
        match dbc_sig.multiplexer_indicator() {
            can_dbc::MultiplexIndicator::Multiplexor => {
                is_multiplexed = true;
                multiplexer_signal_name = Some(dbc_sig.name().to_string());
                break;
            }
            can_dbc::MultiplexIndicator::MultiplexedSignal(_) => {
                is_multiplexed = true;
            }
            _ => {}
        }
    }

    // Second pass: convert all signals
    let signals = dbc_msg
        .signals()
        .iter()
        .map(|dbc_sig| {
            let value_table = dbc
                .value_descriptions_for_signal(dbc_msg.message_id().clone(), dbc_sig.name())
                .map(|descriptions| {
                    descriptions
                        .iter()
                        .map(|d| (*d.a() as i64, d.b().to_string()))
                        .collect::<HashMap<i64, String>>()
                })
                .filter(|table| !table.is_empty());
            convert_signal(dbc_sig, multiplexer_signal_name.as_deref(), value_table)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MessageDefinition {
        id: dbc_msg.message_id().0 & !DBC_EXTENDED_ID_FLAG,
        name: dbc_msg.message_name().to_string(),
        size: *dbc_msg.message_size() as usize,
        sender: match dbc_msg.transmitter() {
            can_dbc::Transmitter::NodeName(name) => Some(name.to_string()),
            _ => None,
        },
        signals,
        is_multiplexed,
        multiplexer_signal: multiplexer_signal_name,
    })
}

/// Convert a can-dbc signal to our SignalDefinition
fn convert_signal(
    dbc_sig: &can_dbc::Signal,
    multiplexer_signal_name: Option<&str>,
    value_table: Option<HashMap<i64, String>>,
) -> Result<SignalDefinition> {
    let byte_order = match *dbc_sig.byte_order() {
        can_dbc::ByteOrder::LittleEndian => ByteOrder::LittleEndian,
        can_dbc::ByteOrder::BigEndian => ByteOrder::BigEndian,
    };

    let value_type = match *dbc_sig.value_type() {
        can_dbc::ValueType::Signed => ValueType::Signed,
        can_dbc::ValueType::Unsigned => ValueType::Unsigned,
    };

    let multiplexer_info = match *dbc_sig.multiplexer_indicator() {
        can_dbc::MultiplexIndicator::MultiplexedSignal(switch_value) => Some(MultiplexerInfo {
            multiplexer_signal: multiplexer_signal_name
                .ok_or_else(|| {
                    TraceError::DbcParseError(format!(
                        "Multiplexed signal '{}' but no multiplexer found",
                        dbc_sig.name()
                    ))
                })?
                .to_string(),
            multiplexer_values: vec![switch_value],
        }),
        _ => None,
    };

    Ok(SignalDefinition {
        name: dbc_sig.name().to_string(),
        start_bit: *dbc_sig.start_bit() as u16,
        length: *dbc_sig.signal_size() as u16,
        byte_order,
        value_type,
        factor: *dbc_sig.factor(),
        offset: *dbc_sig.offset(),
        min: *dbc_sig.min(),
        max: *dbc_sig.max(),
        unit: if dbc_sig.unit().is_empty() {
            None
        } else {
            Some(dbc_sig.unit().to_string())
        },
        value_table,
        multiplexer_info,
    })
}
