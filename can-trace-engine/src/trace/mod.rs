//! Trace view state machine
//!
//! Computes per-byte and per-signal freshness for the frames the view is
//! showing, under forward steps, arbitrary seeks and playback.

pub mod context;
pub mod engine;
pub mod playback;
pub mod update;

pub use context::{ChangeState, ColorClass, SignalKey, TraceContext};
pub use engine::TraceEngine;
pub use playback::{Playback, PlaybackTick};
pub use update::{ByteCell, Direction, MessageRow, SignalCell, TraceUpdate};
