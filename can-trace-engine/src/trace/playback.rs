//! Playback control
//!
//! The host owns the timer. Each time it fires, the host calls
//! [`Playback::tick`], which advances one frame exactly like a forward step
//! and stops itself at the end of the recording.

use crate::trace::context::TraceContext;
use crate::trace::engine::TraceEngine;
use crate::trace::update::{Direction, TraceUpdate};

/// Outcome of one playback tick
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackTick {
    /// Moved one frame forward
    Advanced(TraceUpdate),
    /// Reached the last frame; playback has stopped
    Finished,
    /// Playback is not running
    Idle,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Playback {
    playing: bool,
    /// Whether playback was running when a scrub began
    resume_after_scrub: bool,
}

impl Playback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn start(&mut self) {
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Flip between playing and paused, returning the new state
    pub fn toggle(&mut self) -> bool {
        self.playing = !self.playing;
        self.playing
    }

    /// Pause while the user drags the position, remembering the prior state
    pub fn suspend(&mut self) {
        self.resume_after_scrub = self.playing;
        self.playing = false;
    }

    /// Resume after a scrub if playback was running when it began
    pub fn resume(&mut self) {
        if self.resume_after_scrub {
            self.playing = true;
        }
        self.resume_after_scrub = false;
    }

    /// Advance one frame from `current` if playing
    pub fn tick(
        &mut self,
        engine: &mut TraceEngine<'_>,
        ctx: &mut TraceContext,
        current: usize,
    ) -> PlaybackTick {
        if !self.playing {
            return PlaybackTick::Idle;
        }

        match engine.step(ctx, Direction::Forward, current) {
            Some(update) => PlaybackTick::Advanced(update),
            None => {
                log::debug!("Playback reached the end at frame {}", current);
                self.stop();
                PlaybackTick::Finished
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DecodeCache;
    use crate::signals::SignalDatabaseAdapter;
    use crate::store::FrameStore;
    use crate::types::{Frame, Recording};

    #[test]
    fn test_toggle_and_scrub() {
        let mut playback = Playback::new();
        assert!(playback.toggle());
        playback.suspend();
        assert!(!playback.is_playing());
        playback.resume();
        assert!(playback.is_playing());

        playback.stop();
        playback.suspend();
        playback.resume();
        assert!(!playback.is_playing());
    }

    #[test]
    fn test_tick_runs_to_end_and_stops() {
        let store = FrameStore::from_recording(Recording::new(vec![
            Frame::new(0.0, 1, 0x10, vec![1]),
            Frame::new(0.1, 1, 0x10, vec![2]),
            Frame::new(0.2, 1, 0x10, vec![2]),
        ]));
        let database = SignalDatabaseAdapter::new();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);
        let mut ctx = TraceContext::new();
        let mut playback = Playback::new();

        assert_eq!(playback.tick(&mut engine, &mut ctx, 0), PlaybackTick::Idle);

        engine.refresh(&mut ctx, 0);
        playback.start();
        let mut position = 0;
        let mut positions = Vec::new();
        loop {
            match playback.tick(&mut engine, &mut ctx, position) {
                PlaybackTick::Advanced(update) => {
                    position = update.position;
                    positions.push(position);
                }
                PlaybackTick::Finished => break,
                PlaybackTick::Idle => panic!("playback stopped early"),
            }
        }

        assert_eq!(positions, vec![1, 2]);
        assert!(!playback.is_playing());
        assert_eq!(
            ctx.byte_states(0x10).unwrap()[0],
            crate::trace::ChangeState::Settled
        );
    }
}
