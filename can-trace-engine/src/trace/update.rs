//! Renderable output of the trace engine

use crate::trace::context::{ChangeState, ColorClass};
use serde::Serialize;

/// Navigation direction for a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Result of one navigation operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceUpdate {
    /// Frame index the view now sits at
    pub position: usize,
    /// Timestamp of the frame at `position`
    pub timestamp: f64,
    /// True when the host must drop all rows before applying `rows`
    pub reset: bool,
    /// Rows in processing order; later rows for the same ID win
    pub rows: Vec<MessageRow>,
}

/// One message line of the trace view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRow {
    pub index: usize,
    pub timestamp: f64,
    pub channel: u8,
    pub can_id: u32,
    pub id_label: String,
    /// Message name from the database, if resolved
    pub name: Option<String>,
    pub dlc: u8,
    pub bytes: Vec<ByteCell>,
    pub signals: Vec<SignalCell>,
    /// Decoded summary or fallback label
    pub decoded: String,
}

impl MessageRow {
    /// Payload as space separated hex pairs
    pub fn data_hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02X}", b.value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteCell {
    pub value: u8,
    pub state: ChangeState,
    pub color: ColorClass,
}

impl ByteCell {
    pub fn new(value: u8, state: ChangeState) -> Self {
        Self {
            value,
            state,
            color: state.color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalCell {
    pub name: String,
    /// Value (or value table text) with unit
    pub display: String,
    pub state: ChangeState,
    pub color: ColorClass,
}
