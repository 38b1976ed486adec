//! CAN Trace Engine Library
//!
//! Loads recorded CAN traffic from several log dialects, decodes frames into
//! signals with a DBC database, and drives a replayable trace view that marks
//! which bytes and signals changed as the user steps, seeks or plays through
//! the recording.
//!
//! # Architecture
//!
//! - Format parsers turn a log file into a time-ordered [`Recording`]
//! - The [`FrameStore`] indexes the recording by CAN ID
//! - The [`SignalDatabaseAdapter`] decodes payloads, reporting failures as
//!   [`DecodeFailure`] values
//! - The [`DecodeCache`] memoizes decoded display strings per frame
//! - The [`TraceEngine`] computes Fresh/Changed/Settled states into a
//!   caller-owned [`TraceContext`]
//! - Series extraction produces one signal's values over time
//!
//! The library does NOT render anything or schedule playback; the host owns
//! presentation and timers. [`Session`] bundles all of the above for hosts.
//!
//! # Example Usage
//!
//! ```no_run
//! use can_trace_engine::{Session, TraceConfig};
//! use std::path::Path;
//!
//! let mut session = Session::new(TraceConfig::default());
//! session.load_log(Path::new("trace.log")).unwrap();
//! session.load_dbc(Path::new("powertrain.dbc")).unwrap();
//!
//! if let Some(update) = session.seek(1000) {
//!     for row in &update.rows {
//!         println!("{} {} {}", row.id_label, row.data_hex(), row.decoded);
//!     }
//! }
//! ```

// Public modules
pub mod cache;
pub mod config;
pub mod formats;
pub mod series;
pub mod session;
pub mod signals;
pub mod store;
pub mod trace;
pub mod types;

// Re-export main types for convenience
pub use cache::DecodeCache;
pub use config::TraceConfig;
pub use formats::{load_recording, LogFormat, LogReader};
pub use series::{extract_occurrences, extract_signal, SignalSeries};
pub use session::Session;
pub use signals::{DatabaseStats, DecodeFailure, SignalDatabase, SignalDatabaseAdapter};
pub use store::FrameStore;
pub use trace::{
    ByteCell, ChangeState, ColorClass, Direction, MessageRow, Playback, PlaybackTick,
    SignalCell, TraceContext, TraceEngine, TraceUpdate,
};
pub use types::{
    DecodedSignal, DecodedValue, Frame, Recording, Result, SignalValue, TraceError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
