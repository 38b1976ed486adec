//! Signal database, DBC parser and payload decoding
//!
//! This module contains the DBC parser, the signal database it fills, the
//! bit-level message decoder and the adapter the trace engine talks to.

pub mod adapter;
pub mod database;
pub mod dbc;
pub mod decoder;

// Re-export key types for convenience
pub use adapter::{DecodeFailure, SignalDatabaseAdapter};
pub use database::{
    ByteOrder, DatabaseStats, MessageDefinition, MultiplexerInfo, SignalDatabase,
    SignalDefinition, ValueType,
};
pub use decoder::MessageDecoder;
