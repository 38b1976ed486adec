//! Signal database adapter
//!
//! Wraps the optionally loaded database and answers the questions the trace
//! view asks of it. Decode problems come back as a [`DecodeFailure`] value for
//! the caller to render, never as a [`TraceError`](crate::types::TraceError).

use crate::signals::database::{DatabaseStats, MessageDefinition, SignalDatabase};
use crate::signals::decoder::MessageDecoder;
use crate::types::{DecodedValue, Result};
use std::path::Path;

/// Why a payload could not be turned into signal values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeFailure {
    /// The loaded database has no message with this ID
    #[error("Unknown ID")]
    UnknownId(u32),

    /// The payload does not fit the message layout
    #[error("Decode Error")]
    DecodeError { reason: String },

    /// No database has been loaded
    #[error("No DBC Loaded")]
    NotLoaded,
}

/// The signal database as seen by the trace engine
#[derive(Debug, Default)]
pub struct SignalDatabaseAdapter {
    db: Option<SignalDatabase>,
}

impl SignalDatabaseAdapter {
    /// Create an adapter with no database loaded
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.db.is_some()
    }

    /// Load a DBC file, replacing the current database
    ///
    /// # Arguments
    /// * `path` - Path to the DBC file
    ///
    /// # Returns
    /// * `Result<()>` - Ok if loaded; on error the previous database is kept
    ///
    /// # Example
    /// ```no_run
    /// use can_trace_engine::SignalDatabaseAdapter;
    /// use std::path::Path;
    ///
    /// let mut adapter = SignalDatabaseAdapter::new();
    /// adapter.load_dbc(Path::new("powertrain.dbc")).unwrap();
    /// ```
    pub fn load_dbc(&mut self, path: &Path) -> Result<()> {
        log::info!("Loading DBC file: {:?}", path);

        let db = SignalDatabase::from_dbc_file(path)?;
        let stats = db.stats();
        self.db = Some(db);

        log::info!(
            "DBC file loaded successfully: {} messages, {} signals",
            stats.num_messages,
            stats.num_signals
        );
        Ok(())
    }

    /// Install an already built database
    pub fn set_database(&mut self, db: SignalDatabase) {
        self.db = Some(db);
    }

    pub fn database(&self) -> Option<&SignalDatabase> {
        self.db.as_ref()
    }

    /// Resolve a CAN ID to its message definition
    pub fn resolve(&self, can_id: u32) -> std::result::Result<&MessageDefinition, DecodeFailure> {
        let db = self.db.as_ref().ok_or(DecodeFailure::NotLoaded)?;
        db.get_message(can_id)
            .ok_or(DecodeFailure::UnknownId(can_id))
    }

    /// Decode a payload for a CAN ID into signal values
    pub fn decode(
        &self,
        can_id: u32,
        payload: &[u8],
    ) -> std::result::Result<DecodedValue, DecodeFailure> {
        let message_def = self.resolve(can_id)?;
        MessageDecoder::decode(payload, message_def).map_err(|reason| {
            log::trace!("Failed to decode 0x{:X}: {}", can_id, reason);
            DecodeFailure::DecodeError { reason }
        })
    }

    /// Signal names of a message in definition order; empty when unresolved
    pub fn signal_names(&self, can_id: u32) -> Vec<String> {
        self.resolve(can_id)
            .map(|msg| msg.signals.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Unit of a signal; empty when the signal or its unit is absent
    pub fn unit(&self, can_id: u32, signal_name: &str) -> String {
        self.resolve(can_id)
            .ok()
            .and_then(|msg| msg.signal(signal_name))
            .and_then(|sig| sig.unit.clone())
            .unwrap_or_default()
    }

    pub fn message_name(&self, can_id: u32) -> Option<&str> {
        self.resolve(can_id).ok().map(|msg| msg.name.as_str())
    }

    /// Statistics of the loaded database (zero when none is loaded)
    pub fn stats(&self) -> DatabaseStats {
        self.db.as_ref().map(SignalDatabase::stats).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::dbc::tests::write_test_dbc;
    use crate::types::SignalValue;

    fn loaded() -> (SignalDatabaseAdapter, tempfile::NamedTempFile) {
        let dbc = write_test_dbc();
        let mut adapter = SignalDatabaseAdapter::new();
        adapter.load_dbc(dbc.path()).unwrap();
        (adapter, dbc)
    }

    #[test]
    fn test_not_loaded() {
        let adapter = SignalDatabaseAdapter::new();
        assert!(!adapter.is_loaded());
        assert_eq!(adapter.decode(291, &[0; 8]), Err(DecodeFailure::NotLoaded));
        assert!(adapter.signal_names(291).is_empty());
        assert_eq!(adapter.unit(291, "EngineSpeed"), "");
        assert_eq!(adapter.stats(), DatabaseStats::default());
    }

    #[test]
    fn test_unknown_id_is_a_value() {
        let (adapter, _dbc) = loaded();
        assert_eq!(
            adapter.decode(0x7FF, &[0; 8]),
            Err(DecodeFailure::UnknownId(0x7FF))
        );
        assert_eq!(DecodeFailure::UnknownId(0x7FF).to_string(), "Unknown ID");
        assert!(adapter.signal_names(0x7FF).is_empty());
    }

    #[test]
    fn test_decode_and_lookups() {
        let (adapter, _dbc) = loaded();
        // EngineSpeed = 0x0BB8 = 3000 rpm, EngineTemp = 130 - 40 = 90
        let decoded = adapter
            .decode(291, &[0xB8, 0x0B, 130, 0, 0, 0, 0, 0])
            .unwrap();
        assert_eq!(
            decoded.get("EngineSpeed").unwrap().value,
            SignalValue::Integer(3000)
        );
        assert_eq!(
            decoded.get("EngineTemp").unwrap().value,
            SignalValue::Float(90.0)
        );
        assert_eq!(adapter.signal_names(291), vec!["EngineSpeed", "EngineTemp"]);
        assert_eq!(adapter.unit(291, "EngineSpeed"), "rpm");
        assert_eq!(adapter.unit(512, "ChargeState"), "");
        assert_eq!(adapter.unit(291, "Missing"), "");
        assert_eq!(adapter.message_name(512), Some("BatteryStatus"));
    }

    #[test]
    fn test_short_payload_is_decode_error() {
        let (adapter, _dbc) = loaded();
        let failure = adapter.decode(291, &[1, 2]).unwrap_err();
        assert!(matches!(failure, DecodeFailure::DecodeError { .. }));
        assert_eq!(failure.to_string(), "Decode Error");
    }

    #[test]
    fn test_failed_load_keeps_database() {
        let (mut adapter, _dbc) = loaded();
        assert!(adapter
            .load_dbc(Path::new("/nonexistent/other.dbc"))
            .is_err());
        assert!(adapter.is_loaded());
        assert_eq!(adapter.stats().num_messages, 3);
        assert_eq!(DecodeFailure::NotLoaded.to_string(), "No DBC Loaded");
    }
}
