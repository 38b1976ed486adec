//! Decode cache
//!
//! Memoizes the display string of each decoded frame by frame index. Entries
//! are never rewritten; the whole cache is dropped when the recording or the
//! database changes.

use crate::signals::{DecodeFailure, SignalDatabaseAdapter};
use crate::store::FrameStore;
use crate::types::DecodedValue;
use std::collections::HashMap;

/// Display string for a decode outcome
pub fn decode_label(result: &Result<DecodedValue, DecodeFailure>) -> String {
    match result {
        Ok(decoded) => decoded.summary(),
        Err(failure) => failure.to_string(),
    }
}

/// Frame index -> "name: value, ..." or a fallback label
#[derive(Debug, Default)]
pub struct DecodeCache {
    entries: HashMap<usize, String>,
    limit: Option<usize>,
}

impl DecodeCache {
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache that clears itself once it holds `limit` entries
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            limit,
        }
    }

    /// Return the display string for a frame, decoding it on first request
    ///
    /// An index outside the store yields an empty string and is not cached.
    pub fn get_or_decode(
        &mut self,
        index: usize,
        store: &FrameStore,
        database: &SignalDatabaseAdapter,
    ) -> String {
        if let Some(text) = self.entries.get(&index) {
            return text.clone();
        }

        let Ok(frame) = store.get(index) else {
            return String::new();
        };

        self.get_or_insert_with(index, || {
            decode_label(&database.decode(frame.can_id, &frame.data))
        })
    }

    /// Return the cached string for `index`, storing `label()` on a miss
    ///
    /// Callers that already hold the decode result use this to skip a
    /// second decode.
    pub fn get_or_insert_with(&mut self, index: usize, label: impl FnOnce() -> String) -> String {
        if let Some(text) = self.entries.get(&index) {
            return text.clone();
        }

        let text = label();
        if let Some(limit) = self.limit {
            if self.entries.len() >= limit {
                log::debug!("Decode cache reached {} entries, clearing", limit);
                self.entries.clear();
            }
        }

        self.entries.insert(index, text.clone());
        text
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(&index).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
