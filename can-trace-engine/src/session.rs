//! Trace session
//!
//! A [`Session`] owns everything one trace view needs: the loaded recording,
//! the signal database, the decode cache, the change tracking context, the
//! current position and the playback flag. Hosts drive it with navigation
//! calls and render the [`TraceUpdate`]s it returns.

use crate::cache::DecodeCache;
use crate::config::TraceConfig;
use crate::formats::{self, mock};
use crate::series::{self, SignalSeries};
use crate::signals::SignalDatabaseAdapter;
use crate::store::FrameStore;
use crate::trace::{Direction, Playback, PlaybackTick, TraceContext, TraceEngine, TraceUpdate};
use crate::types::{Frame, Recording, Result};
use rand::Rng;
use std::path::Path;

#[derive(Debug, Default)]
pub struct Session {
    config: TraceConfig,
    store: FrameStore,
    database: SignalDatabaseAdapter,
    cache: DecodeCache,
    ctx: TraceContext,
    position: usize,
    playback: Playback,
}

impl Session {
    pub fn new(config: TraceConfig) -> Self {
        let cache = DecodeCache::with_limit(config.decode_cache_limit);
        Self {
            config,
            cache,
            ..Self::default()
        }
    }

    /// Load a log file, replacing the current recording
    ///
    /// On failure (unreadable file, unsupported format, no frames) the
    /// session is left exactly as it was.
    pub fn load_log(&mut self, path: &Path) -> Result<Option<TraceUpdate>> {
        let recording = formats::load_recording(path, &self.config)?;
        Ok(self.install(recording))
    }

    /// Replace the current recording with generated traffic
    pub fn load_mock<R: Rng>(&mut self, count: usize, rng: &mut R) -> Option<TraceUpdate> {
        let recording = mock::generate_mock(count, rng);
        if recording.is_empty() {
            return None;
        }
        self.install(recording)
    }

    /// Load a DBC file, replacing the current database
    ///
    /// On failure the previous database and cache are kept.
    pub fn load_dbc(&mut self, path: &Path) -> Result<Option<TraceUpdate>> {
        self.database.load_dbc(path)?;
        self.cache.clear();
        Ok(self.refresh())
    }

    fn install(&mut self, recording: Recording) -> Option<TraceUpdate> {
        self.store.replace(recording);
        self.cache.clear();
        self.ctx.reset();
        self.playback.stop();
        self.position = 0;
        self.refresh()
    }

    /// Rebuild the view from the current frame alone
    ///
    /// A position beyond the recording falls back to the first frame.
    pub fn refresh(&mut self) -> Option<TraceUpdate> {
        if self.position >= self.store.len() {
            self.position = 0;
        }
        let position = self.position;
        self.navigate(|engine, ctx| engine.refresh(ctx, position))
    }

    pub fn step_forward(&mut self) -> Option<TraceUpdate> {
        let current = self.position;
        self.navigate(|engine, ctx| engine.step(ctx, Direction::Forward, current))
    }

    pub fn step_back(&mut self) -> Option<TraceUpdate> {
        let current = self.position;
        self.navigate(|engine, ctx| engine.step(ctx, Direction::Backward, current))
    }

    pub fn seek(&mut self, target: usize) -> Option<TraceUpdate> {
        self.navigate(|engine, ctx| engine.seek(ctx, target))
    }

    /// Move to `target` as a position slider would
    ///
    /// Moving exactly one frame ahead is a forward step; anything else seeks.
    pub fn scrub_to(&mut self, target: usize) -> Option<TraceUpdate> {
        if self.position.checked_add(1) == Some(target) {
            self.step_forward()
        } else {
            self.seek(target)
        }
    }

    /// Pause playback while the user drags the position
    pub fn begin_scrub(&mut self) {
        self.playback.suspend();
    }

    /// Resume playback if it was running when the drag began
    pub fn end_scrub(&mut self) {
        self.playback.resume();
    }

    /// Start or pause playback, returning whether it is now playing
    pub fn toggle_playback(&mut self) -> bool {
        self.playback.toggle()
    }

    /// Advance playback by one frame; call on every host timer tick
    pub fn playback_tick(&mut self) -> PlaybackTick {
        if self.store.is_empty() {
            self.playback.stop();
            return PlaybackTick::Idle;
        }
        let current = self.position;
        let mut engine = TraceEngine::new(&self.store, &self.database, &mut self.cache);
        let tick = self.playback.tick(&mut engine, &mut self.ctx, current);
        if let PlaybackTick::Advanced(update) = &tick {
            self.position = update.position;
        }
        tick
    }

    fn navigate<F>(&mut self, op: F) -> Option<TraceUpdate>
    where
        F: FnOnce(&mut TraceEngine<'_>, &mut TraceContext) -> Option<TraceUpdate>,
    {
        let mut engine = TraceEngine::new(&self.store, &self.database, &mut self.cache);
        let update = op(&mut engine, &mut self.ctx)?;
        self.position = update.position;
        Some(update)
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.store.get(self.position).ok()
    }

    pub fn current_timestamp(&self) -> Option<f64> {
        self.current_frame().map(|frame| frame.timestamp)
    }

    /// Signal names for an ID, for a signal picker
    pub fn signals_for_id(&self, can_id: u32) -> Vec<String> {
        self.database.signal_names(can_id)
    }

    pub fn signal_series(&self, can_id: u32, signal_name: &str) -> SignalSeries {
        series::extract_signal(&self.store, &self.database, can_id, signal_name)
    }

    pub fn occurrences(&self, can_id: u32) -> SignalSeries {
        series::extract_occurrences(&self.store, can_id)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn database(&self) -> &SignalDatabaseAdapter {
        &self.database
    }

    pub fn context(&self) -> &TraceContext {
        &self.ctx
    }

    pub fn cache(&self) -> &DecodeCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::ChangeState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mock_session(count: usize) -> Session {
        let mut session = Session::new(TraceConfig::default());
        session.load_mock(count, &mut StdRng::seed_from_u64(3));
        session
    }

    #[test]
    fn test_load_mock_starts_at_first_frame() {
        let session = mock_session(20);
        assert_eq!(session.store().len(), 20);
        assert_eq!(session.position(), 0);
        assert_eq!(session.context().known_ids().len(), 1);
        assert_eq!(session.cache().len(), 1);
    }

    #[test]
    fn test_scrub_to_next_is_a_step() {
        let mut session = mock_session(20);
        let update = session.scrub_to(1).unwrap();
        assert!(!update.reset);
        assert_eq!(session.position(), 1);

        let update = session.scrub_to(10).unwrap();
        assert!(update.reset);
        assert_eq!(session.position(), 10);
        assert!(update
            .rows
            .iter()
            .all(|row| row.bytes.iter().all(|b| b.state == ChangeState::Fresh)));
    }

    #[test]
    fn test_playback_on_empty_session_stops() {
        let mut session = Session::new(TraceConfig::default());
        assert!(session.toggle_playback());
        assert!(matches!(session.playback_tick(), PlaybackTick::Idle));
        assert!(!session.is_playing());
    }

    #[test]
    fn test_step_back_and_bounds() {
        let mut session = mock_session(3);
        assert!(session.step_back().is_none());
        session.seek(usize::MAX);
        assert_eq!(session.position(), 2);
        assert!(session.step_forward().is_none());
        assert_eq!(session.step_back().unwrap().position, 1);
        assert_eq!(session.current_timestamp(), Some(session.store().frames()[1].timestamp));
    }

    #[test]
    fn test_playback_through_session() {
        let mut session = mock_session(4);
        assert_eq!(session.playback_tick(), PlaybackTick::Idle);
        assert!(session.toggle_playback());

        let mut advanced = 0;
        while let PlaybackTick::Advanced(_) = session.playback_tick() {
            advanced += 1;
        }
        assert_eq!(advanced, 3);
        assert_eq!(session.position(), 3);
        assert!(!session.is_playing());
    }

    #[test]
    fn test_scrub_suspends_playback() {
        let mut session = mock_session(10);
        session.toggle_playback();
        session.begin_scrub();
        assert!(!session.is_playing());
        session.scrub_to(5);
        session.end_scrub();
        assert!(session.is_playing());
    }

    #[test]
    fn test_empty_session_is_noop() {
        let mut session = Session::default();
        assert!(session.refresh().is_none());
        assert!(session.step_forward().is_none());
        assert!(session.step_back().is_none());
        assert!(session.seek(5).is_none());
        assert!(session.scrub_to(1).is_none());
        session.toggle_playback();
        assert_eq!(session.playback_tick(), PlaybackTick::Idle);
        assert!(session.current_frame().is_none());
        assert!(session.occurrences(0x100).is_empty());
        assert_eq!(session.position(), 0);
    }

    #[test]
    fn test_failed_load_keeps_recording() {
        let mut session = mock_session(5);
        session.seek(3);
        assert!(session.load_log(Path::new("/nonexistent/trace.csv")).is_err());
        assert!(session.load_dbc(Path::new("/nonexistent/db.dbc")).is_err());
        assert_eq!(session.store().len(), 5);
        assert_eq!(session.position(), 3);
        assert!(!session.database().is_loaded());
    }
}
