//! Message Decoding Engine
//!
//! Extracts signal values from raw CAN payloads based on signal definitions
//! from the signal database. Handles bit extraction, endianness, multiplexing,
//! and physical value conversion.

use crate::signals::database::{ByteOrder, MessageDefinition, SignalDefinition, ValueType};
use crate::types::{DecodedSignal, DecodedValue, SignalValue};

/// Message decoder - extracts signals from CAN payloads
pub struct MessageDecoder;

impl MessageDecoder {
    /// Decode a payload against a message definition
    ///
    /// Fails with a reason when the payload is shorter than the message or a
    /// signal does not fit inside it. Multiplexed signals whose multiplexer
    /// value does not match are left out of the result.
    pub fn decode(data: &[u8], message_def: &MessageDefinition) -> Result<DecodedValue, String> {
        if data.len() < message_def.size {
            return Err(format!(
                "{} expects {} bytes, payload has {}",
                message_def.name,
                message_def.size,
                data.len()
            ));
        }

        let mut multiplexer_value: Option<u64> = None;

        // For multiplexed messages, first extract the multiplexer signal value
        if message_def.is_multiplexed {
            if let Some(mux_signal) = message_def
                .multiplexer_signal
                .as_deref()
                .and_then(|name| message_def.signal(name))
            {
                multiplexer_value = Some(Self::extract_signal_value(data, mux_signal)? as u64);
            }
        }

        let mut signals = Vec::with_capacity(message_def.signals.len());

        for signal in &message_def.signals {
            if let Some(ref mux_info) = signal.multiplexer_info {
                match multiplexer_value {
                    Some(current) if mux_info.multiplexer_values.contains(&current) => {}
                    _ => continue,
                }
            }

            signals.push(Self::decode_signal(data, signal)?);
        }

        Ok(DecodedValue { signals })
    }

    /// Decode a single signal from CAN payload data
    fn decode_signal(data: &[u8], signal: &SignalDefinition) -> Result<DecodedSignal, String> {
        let raw_value = Self::extract_signal_value(data, signal)?;

        // Apply physical value conversion (factor and offset)
        let physical_value = signal.offset + signal.factor * (raw_value as f64);

        let value = if signal.factor == 1.0 && signal.offset == 0.0 && signal.length == 1 {
            // Boolean signal (single bit, no scaling)
            SignalValue::Boolean(raw_value != 0)
        } else if signal.factor != 1.0 || signal.offset != 0.0 {
            // Scaled signal - use float
            SignalValue::Float(physical_value)
        } else {
            SignalValue::Integer(raw_value)
        };

        let value_description = signal
            .value_table
            .as_ref()
            .and_then(|table| table.get(&raw_value))
            .cloned();

        Ok(DecodedSignal {
            name: signal.name.clone(),
            value,
            unit: signal.unit.clone(),
            value_description,
            raw_value,
        })
    }

    /// Extract raw signal value from CAN payload data
    fn extract_signal_value(data: &[u8], signal: &SignalDefinition) -> Result<i64, String> {
        let start_bit = signal.start_bit as usize;
        let length = signal.length as usize;

        if length == 0 || length > 64 {
            return Err(format!("Signal '{}' has invalid length {}", signal.name, length));
        }

        let required_bytes = match signal.byte_order {
            ByteOrder::LittleEndian => (start_bit + length).div_ceil(8),
            ByteOrder::BigEndian => Self::big_endian_required_bytes(start_bit, length),
        };
        if required_bytes > data.len() {
            return Err(format!(
                "Signal '{}' requires {} bytes but frame only has {} bytes",
                signal.name,
                required_bytes,
                data.len()
            ));
        }

        let raw_value = match signal.byte_order {
            ByteOrder::LittleEndian => Self::extract_little_endian(data, start_bit, length),
            ByteOrder::BigEndian => Self::extract_big_endian(data, start_bit, length),
        };

        let signed_value = match signal.value_type {
            ValueType::Unsigned => raw_value as i64,
            ValueType::Signed => Self::sign_extend(raw_value, length),
        };

        Ok(signed_value)
    }

    /// Extract signal with little-endian (Intel) byte order
    ///
    /// The start bit points to the LSB; bits are numbered from LSB to MSB
    /// within each byte, byte 0 first.
    fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
        let mut result: u64 = 0;

        for i in 0..length {
            let bit_pos = start_bit + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = bit_pos % 8;

            if byte_idx < data.len() {
                let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
                result |= (bit_value as u64) << i;
            }
        }

        result
    }

    /// Extract signal with big-endian (Motorola) byte order
    ///
    /// DBC numbering: the start bit is the MSB of the signal, counted LSB-first
    /// within its byte. Walking towards the LSB goes down within a byte and
    /// then continues at bit 7 of the next byte.
    fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
        let mut result: u64 = 0;
        let mut bit_pos = start_bit;

        for _ in 0..length {
            let byte_idx = bit_pos / 8;
            let bit_in_byte = bit_pos % 8;

            if byte_idx < data.len() {
                let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
                result = (result << 1) | bit_value as u64;
            }

            bit_pos = if bit_in_byte == 0 {
                bit_pos + 15
            } else {
                bit_pos - 1
            };
        }

        result
    }

    /// Bytes a Motorola signal touches, counted from byte 0
    fn big_endian_required_bytes(start_bit: usize, length: usize) -> usize {
        let msb_byte = start_bit / 8;
        let bits_in_first = start_bit % 8 + 1;
        if length <= bits_in_first {
            msb_byte + 1
        } else {
            msb_byte + 1 + (length - bits_in_first).div_ceil(8)
        }
    }

    /// Sign-extend a value from N bits to 64 bits
    fn sign_extend(value: u64, bit_length: usize) -> i64 {
        if bit_length >= 64 {
            return value as i64;
        }

        let sign_bit = 1u64 << (bit_length - 1);
        if (value & sign_bit) != 0 {
            let mask = !0u64 << bit_length;
            (value | mask) as i64
        } else {
            value as i64
        }
    }
}
