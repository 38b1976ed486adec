//! Change tracking state
//!
//! [`TraceContext`] is everything the trace view remembers between frames:
//! the last payload per ID, the last value per signal, and the freshness of
//! every byte lane and signal. It is owned by the session and handed to the
//! engine on each call.

use crate::types::SignalValue;
use serde::Serialize;
use std::collections::HashMap;

/// Freshness of a byte lane or signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeState {
    /// Seen, but no difference observed yet
    #[default]
    Fresh,
    /// Differs from the previous occurrence
    Changed,
    /// Changed at some point, unchanged since
    Settled,
}

impl ChangeState {
    /// State after observing the lane again
    pub fn next(self, differs: bool) -> Self {
        if differs {
            return ChangeState::Changed;
        }
        match self {
            ChangeState::Fresh => ChangeState::Fresh,
            ChangeState::Changed | ChangeState::Settled => ChangeState::Settled,
        }
    }

    pub fn color(self) -> ColorClass {
        match self {
            ChangeState::Fresh => ColorClass::Neutral,
            ChangeState::Changed => ColorClass::Alert,
            ChangeState::Settled => ColorClass::Warn,
        }
    }
}

/// Presentation class a host maps to actual colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorClass {
    Neutral,
    Alert,
    Warn,
}

/// A signal of a specific message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub can_id: u32,
    pub signal: String,
}

impl SignalKey {
    pub fn new(can_id: u32, signal: &str) -> Self {
        Self {
            can_id,
            signal: signal.to_string(),
        }
    }
}

/// Last known payloads and values plus their freshness
#[derive(Debug, Clone, Default)]
pub struct TraceContext {
    pub(crate) last_payload: HashMap<u32, Vec<u8>>,
    pub(crate) last_value: HashMap<SignalKey, SignalValue>,
    pub(crate) byte_states: HashMap<u32, Vec<ChangeState>>,
    pub(crate) signal_states: HashMap<SignalKey, ChangeState>,
    known_ids: Vec<u32>,
}

impl TraceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, as before the first frame
    pub fn reset(&mut self) {
        self.last_payload.clear();
        self.last_value.clear();
        self.byte_states.clear();
        self.signal_states.clear();
        self.known_ids.clear();
    }

    /// IDs in the order they first appeared since the last reset
    pub fn known_ids(&self) -> &[u32] {
        &self.known_ids
    }

    pub fn is_known(&self, can_id: u32) -> bool {
        self.last_payload.contains_key(&can_id)
    }

    pub fn last_payload(&self, can_id: u32) -> Option<&[u8]> {
        self.last_payload.get(&can_id).map(Vec::as_slice)
    }

    pub fn byte_states(&self, can_id: u32) -> Option<&[ChangeState]> {
        self.byte_states.get(&can_id).map(Vec::as_slice)
    }

    pub fn signal_state(&self, can_id: u32, signal: &str) -> Option<ChangeState> {
        self.signal_states.get(&SignalKey::new(can_id, signal)).copied()
    }

    /// Track a payload for `can_id` and return the updated lane states
    ///
    /// Without a prior payload of the same length every lane starts Fresh;
    /// a length change is not reconciled lane by lane.
    pub(crate) fn observe_payload(&mut self, can_id: u32, payload: &[u8]) -> Vec<ChangeState> {
        if !self.is_known(can_id) {
            self.known_ids.push(can_id);
        }

        let states = match self.last_payload.get(&can_id) {
            Some(prior) => {
                // A length change restarts every lane, then the overlap is compared
                let previous = self
                    .byte_states
                    .get(&can_id)
                    .filter(|states| states.len() == payload.len());
                payload
                    .iter()
                    .enumerate()
                    .map(|(lane, new)| match prior.get(lane) {
                        Some(old) => {
                            let state = previous.map_or(ChangeState::Fresh, |s| s[lane]);
                            state.next(new != old)
                        }
                        None => ChangeState::Fresh,
                    })
                    .collect()
            }
            None => vec![ChangeState::Fresh; payload.len()],
        };

        self.last_payload.insert(can_id, payload.to_vec());
        self.byte_states.insert(can_id, states.clone());
        states
    }

    /// Track a decoded signal value and return its updated state
    pub(crate) fn observe_signal(&mut self, key: SignalKey, value: &SignalValue) -> ChangeState {
        let state = match self.last_value.get(&key) {
            Some(prior) => {
                let previous = self.signal_states.get(&key).copied().unwrap_or_default();
                previous.next(prior != value)
            }
            None => ChangeState::Fresh,
        };

        self.last_value.insert(key.clone(), value.clone());
        self.signal_states.insert(key, state);
        state
    }
}
