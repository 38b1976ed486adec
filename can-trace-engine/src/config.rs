//! Trace engine configuration
//!
//! Loading and navigation need very little configuration; the host (CLI or
//! UI) owns scheduling and presentation.

use serde::{Deserialize, Serialize};

/// Configuration for loading recordings and driving the trace view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Shift generic-reader recordings so the first frame is at time zero
    #[serde(default = "default_true")]
    pub normalize_timestamps: bool,

    /// Playback cadence in milliseconds, used by the host's timer
    #[serde(default = "default_playback_interval")]
    pub playback_interval_ms: u64,

    /// Optional: clear the decode cache once it holds this many entries
    #[serde(default)]
    pub decode_cache_limit: Option<usize>,

    /// Optional: only load frames from these CAN channels
    #[serde(default)]
    pub channel_filter: Option<Vec<u8>>,

    /// Optional: only load these specific CAN message IDs
    #[serde(default)]
    pub message_filter: Option<Vec<u32>>,
}

fn default_true() -> bool {
    true
}

fn default_playback_interval() -> u64 {
    50
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            normalize_timestamps: true,
            playback_interval_ms: default_playback_interval(),
            decode_cache_limit: None,
            channel_filter: None,
            message_filter: None,
        }
    }
}

impl TraceConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable time-zero normalization
    pub fn with_normalized_timestamps(mut self, enabled: bool) -> Self {
        self.normalize_timestamps = enabled;
        self
    }

    /// Builder method: set the playback cadence
    pub fn with_playback_interval_ms(mut self, interval_ms: u64) -> Self {
        self.playback_interval_ms = interval_ms;
        self
    }

    /// Builder method: bound the decode cache
    pub fn with_decode_cache_limit(mut self, limit: usize) -> Self {
        self.decode_cache_limit = Some(limit);
        self
    }

    /// Builder method: set channel filter
    pub fn with_channel_filter(mut self, channels: Vec<u8>) -> Self {
        self.channel_filter = Some(channels);
        self
    }

    /// Builder method: set message filter
    pub fn with_message_filter(mut self, messages: Vec<u32>) -> Self {
        self.message_filter = Some(messages);
        self
    }

    /// Check if a channel should be loaded
    pub fn should_process_channel(&self, channel: u8) -> bool {
        match &self.channel_filter {
            Some(channels) => channels.contains(&channel),
            None => true,
        }
    }

    /// Check if a message ID should be loaded
    pub fn should_process_message(&self, can_id: u32) -> bool {
        match &self.message_filter {
            Some(messages) => messages.contains(&can_id),
            None => true,
        }
    }

    /// Check if a frame should be loaded based on filters
    pub fn should_process_frame(&self, channel: u8, can_id: u32) -> bool {
        self.should_process_channel(channel) && self.should_process_message(can_id)
    }
}
