//! Signal series extraction
//!
//! Decodes one named signal across every frame of an ID, for plotting.
//! Series are rebuilt on each request and never cached.

use crate::signals::SignalDatabaseAdapter;
use crate::store::FrameStore;
use serde::Serialize;

/// Parallel timestamp and value sequences
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalSeries {
    pub timestamps: Vec<f64>,
    pub values: Vec<f64>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Smallest and largest value, `None` for an empty series
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values.iter().fold(None, |range, &v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    fn push(&mut self, timestamp: f64, value: f64) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }
}

/// Values of `signal_name` over all frames of `can_id`
///
/// Frames that fail to decode or do not carry the signal (for example an
/// inactive multiplexed signal) are skipped.
pub fn extract_signal(
    store: &FrameStore,
    database: &SignalDatabaseAdapter,
    can_id: u32,
    signal_name: &str,
) -> SignalSeries {
    let mut series = SignalSeries::default();
    let mut skipped = 0usize;

    for (_, frame) in store.frames_for_id(can_id) {
        let value = database
            .decode(can_id, &frame.data)
            .ok()
            .and_then(|decoded| decoded.get(signal_name).map(|s| s.value.as_f64()));
        match value {
            Some(value) => series.push(frame.timestamp, value),
            None => skipped += 1,
        }
    }

    log::debug!(
        "Extracted {} points for 0x{:X}/{} ({} frames skipped)",
        series.len(),
        can_id,
        signal_name,
        skipped
    );
    series
}

/// Occurrence series for `can_id`: one point of value 1.0 per frame
pub fn extract_occurrences(store: &FrameStore, can_id: u32) -> SignalSeries {
    let mut series = SignalSeries::default();
    for (_, frame) in store.frames_for_id(can_id) {
        series.push(frame.timestamp, 1.0);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::database::tests::{message, signal};
    use crate::signals::SignalDatabase;
    use crate::types::{Frame, Recording};

    fn fixtures() -> (FrameStore, SignalDatabaseAdapter) {
        let store = FrameStore::from_recording(Recording::new(vec![
            Frame::new(0.0, 1, 0x10, vec![10, 0, 0, 0, 0, 0, 0, 0]),
            Frame::new(0.1, 1, 0x20, vec![99]),
            Frame::new(0.2, 1, 0x10, vec![20]),
            Frame::new(0.3, 1, 0x10, vec![30, 0, 0, 0, 0, 0, 0, 0]),
        ]));
        let mut db = SignalDatabase::new();
        let mut level = signal("Level", 0, 8);
        level.factor = 0.5;
        db.add_message(message(0x10, "Tank", vec![level]));
        let mut adapter = SignalDatabaseAdapter::new();
        adapter.set_database(db);
        (store, adapter)
    }

    #[test]
    fn test_extract_skips_undecodable_frames() {
        let (store, adapter) = fixtures();
        let series = extract_signal(&store, &adapter, 0x10, "Level");
        assert_eq!(series.timestamps, vec![0.0, 0.3]);
        assert_eq!(series.values, vec![5.0, 15.0]);
        assert_eq!(series.value_range(), Some((5.0, 15.0)));
    }

    #[test]
    fn test_extract_missing_signal_or_id() {
        let (store, adapter) = fixtures();
        assert!(extract_signal(&store, &adapter, 0x10, "Missing").is_empty());
        assert!(extract_signal(&store, &adapter, 0x99, "Level").is_empty());
        assert!(extract_signal(&FrameStore::new(), &adapter, 0x10, "Level").is_empty());
        assert!(extract_signal(&store, &SignalDatabaseAdapter::new(), 0x10, "Level").is_empty());
    }

    #[test]
    fn test_occurrences() {
        let (store, _) = fixtures();
        let series = extract_occurrences(&store, 0x10);
        assert_eq!(series.timestamps, vec![0.0, 0.2, 0.3]);
        assert_eq!(series.values, vec![1.0; 3]);
        assert_eq!(SignalSeries::default().value_range(), None);
    }
}
