//! Frame store
//!
//! Owns the loaded recording and a per-ID index of frame positions, built
//! once per load. The index answers "frames of this ID" and "latest frame of
//! every ID up to position k" without rescanning the recording.

use crate::types::{Frame, Recording, Result, TraceError};
use std::collections::HashMap;

/// The canonical frame sequence of the loaded recording
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: Vec<Frame>,
    /// Key: CAN ID, Value: ascending frame indices carrying that ID
    by_id: HashMap<u32, Vec<usize>>,
    /// IDs in order of first appearance
    id_order: Vec<u32>,
}

impl FrameStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `recording`
    pub fn from_recording(recording: Recording) -> Self {
        let frames = recording.into_frames();
        let mut by_id: HashMap<u32, Vec<usize>> = HashMap::new();
        let mut id_order = Vec::new();

        for (index, frame) in frames.iter().enumerate() {
            let positions = by_id.entry(frame.can_id).or_default();
            if positions.is_empty() {
                id_order.push(frame.can_id);
            }
            positions.push(index);
        }

        Self {
            frames,
            by_id,
            id_order,
        }
    }

    /// Replace the whole recording
    pub fn replace(&mut self, recording: Recording) {
        *self = Self::from_recording(recording);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Last valid index, `None` for an empty store
    pub fn last_index(&self) -> Option<usize> {
        self.frames.len().checked_sub(1)
    }

    /// Frame at `index`
    pub fn get(&self, index: usize) -> Result<&Frame> {
        self.frames.get(index).ok_or(TraceError::OutOfRange {
            index,
            len: self.frames.len(),
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// IDs in order of first appearance
    pub fn ids(&self) -> &[u32] {
        &self.id_order
    }

    /// Number of frames carrying `can_id`
    pub fn count_for_id(&self, can_id: u32) -> usize {
        self.by_id.get(&can_id).map_or(0, Vec::len)
    }

    /// All frames with `can_id` in time order, with their indices
    pub fn frames_for_id(&self, can_id: u32) -> impl Iterator<Item = (usize, &Frame)> + '_ {
        self.by_id
            .get(&can_id)
            .into_iter()
            .flatten()
            .map(move |&index| (index, &self.frames[index]))
    }

    /// For every ID seen in `[0, k]`, the index of its latest frame
    ///
    /// Indices are returned ascending. `k` beyond the end is treated as the
    /// last index.
    pub fn latest_per_id(&self, k: usize) -> Vec<usize> {
        let mut latest: Vec<usize> = self
            .by_id
            .values()
            .filter_map(|positions| {
                let upto = positions.partition_point(|&i| i <= k);
                upto.checked_sub(1).map(|p| positions[p])
            })
            .collect();
        latest.sort_unstable();
        latest
    }

    /// Time span between the first and last frame in seconds
    pub fn duration(&self) -> f64 {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }
}
