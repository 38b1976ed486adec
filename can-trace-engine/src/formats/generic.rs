//! Generic log adapter
//!
//! Drains any [`LogReader`] into a [`Recording`], applying the load-time
//! filters and, when enabled, shifting timestamps so the first frame sits at
//! time zero.

use crate::config::TraceConfig;
use crate::formats::LogReader;
use crate::types::{Frame, Recording, Result};
use std::path::Path;

/// Collects frames from a generic reader
pub struct GenericLogAdapter;

impl GenericLogAdapter {
    /// Open `path` with reader `R` and collect its frames
    pub fn load<R: LogReader>(path: &Path, config: &TraceConfig) -> Result<Recording> {
        let reader = R::open(path)?;
        Ok(Self::collect(reader, config))
    }

    /// Collect frames from an already opened reader
    ///
    /// Records the reader fails on are skipped; the load only fails later if
    /// nothing at all was collected.
    pub fn collect<I>(reader: I, config: &TraceConfig) -> Recording
    where
        I: IntoIterator<Item = Result<Frame>>,
    {
        let mut frames = Vec::new();
        let mut skipped = 0usize;

        for record in reader {
            match record {
                Ok(frame) => {
                    if config.should_process_frame(frame.channel, frame.can_id) {
                        frames.push(frame);
                    }
                }
                Err(e) => {
                    skipped += 1;
                    log::debug!("Skipping unreadable record: {}", e);
                }
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} unreadable records", skipped);
        }

        let recording = Recording::new(frames);
        if config.normalize_timestamps {
            recording.normalized()
        } else {
            recording
        }
    }
}
