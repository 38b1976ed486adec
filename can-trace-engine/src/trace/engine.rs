//! Trace state machine
//!
//! `process` folds one frame into the [`TraceContext`]. Forward steps and
//! playback call it once per frame; a seek throws the context away and
//! replays only the latest frame of every ID up to the target, so every lane
//! shows Fresh right after a jump. Stepping backwards is a seek.

use crate::cache::{decode_label, DecodeCache};
use crate::signals::SignalDatabaseAdapter;
use crate::store::FrameStore;
use crate::trace::context::{SignalKey, TraceContext};
use crate::trace::update::{ByteCell, Direction, MessageRow, SignalCell, TraceUpdate};

/// Borrowed view over one session's recording, database and decode cache
pub struct TraceEngine<'a> {
    store: &'a FrameStore,
    database: &'a SignalDatabaseAdapter,
    cache: &'a mut DecodeCache,
}

impl<'a> TraceEngine<'a> {
    pub fn new(
        store: &'a FrameStore,
        database: &'a SignalDatabaseAdapter,
        cache: &'a mut DecodeCache,
    ) -> Self {
        Self {
            store,
            database,
            cache,
        }
    }

    /// Fold the frame at `index` into the context and render its row
    ///
    /// Returns `None` for an index outside the recording.
    pub fn process(&mut self, ctx: &mut TraceContext, index: usize) -> Option<MessageRow> {
        let store = self.store;
        let frame = store.get(index).ok()?;
        let can_id = frame.can_id;

        let bytes = ctx
            .observe_payload(can_id, &frame.data)
            .into_iter()
            .zip(&frame.data)
            .map(|(state, &value)| ByteCell::new(value, state))
            .collect();

        let result = self.database.decode(can_id, &frame.data);
        let signals = match &result {
            Ok(decoded) => decoded
                .signals
                .iter()
                .map(|signal| {
                    let key = SignalKey::new(can_id, &signal.name);
                    let state = ctx.observe_signal(key, &signal.value);
                    SignalCell {
                        name: signal.name.clone(),
                        display: signal.display(),
                        state,
                        color: state.color(),
                    }
                })
                .collect(),
            Err(failure) => {
                log::trace!("Frame {} (0x{:X}) not decoded: {}", index, can_id, failure);
                Vec::new()
            }
        };

        let decoded = self
            .cache
            .get_or_insert_with(index, || decode_label(&result));

        Some(MessageRow {
            index,
            timestamp: frame.timestamp,
            channel: frame.channel,
            can_id,
            id_label: frame.id_label(),
            name: self.database.message_name(can_id).map(str::to_string),
            dlc: frame.dlc,
            bytes,
            signals,
            decoded,
        })
    }

    /// Move one frame from `current`
    ///
    /// Forward processes the next frame on top of the current context and is
    /// a no-op at the last frame. Backward seeks to the previous frame and is
    /// a no-op at the first.
    pub fn step(
        &mut self,
        ctx: &mut TraceContext,
        direction: Direction,
        current: usize,
    ) -> Option<TraceUpdate> {
        match direction {
            Direction::Forward => {
                let next = current.checked_add(1)?;
                let row = self.process(ctx, next)?;
                log::trace!("Stepped forward to {}", next);
                Some(TraceUpdate {
                    position: next,
                    timestamp: row.timestamp,
                    reset: false,
                    rows: vec![row],
                })
            }
            Direction::Backward => {
                let previous = current.checked_sub(1)?;
                self.seek(ctx, previous)
            }
        }
    }

    /// Jump to `target`, rebuilding the view from an empty context
    ///
    /// A target past the end is clamped to the last frame. Returns `None` only
    /// for an empty recording.
    pub fn seek(&mut self, ctx: &mut TraceContext, target: usize) -> Option<TraceUpdate> {
        let store = self.store;
        let last = store.last_index()?;
        let position = target.min(last);

        ctx.reset();

        let mut representatives = store.latest_per_id(position);
        let frames = store.frames();
        representatives.sort_by(|&a, &b| {
            frames[a]
                .timestamp
                .total_cmp(&frames[b].timestamp)
                .then(a.cmp(&b))
        });

        let rows: Vec<MessageRow> = representatives
            .into_iter()
            .filter_map(|index| self.process(ctx, index))
            .collect();

        log::debug!("Seek to {}: rebuilt {} message rows", position, rows.len());

        Some(TraceUpdate {
            position,
            timestamp: frames[position].timestamp,
            reset: true,
            rows,
        })
    }

    /// Rebuild the view showing only the frame at `position`
    ///
    /// Used right after a load, where the view starts from a single frame
    /// rather than the latest state of every ID.
    pub fn refresh(&mut self, ctx: &mut TraceContext, position: usize) -> Option<TraceUpdate> {
        let last = self.store.last_index()?;
        let position = position.min(last);

        ctx.reset();
        let row = self.process(ctx, position)?;

        Some(TraceUpdate {
            position,
            timestamp: row.timestamp,
            reset: true,
            rows: vec![row],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::database::tests::{message, signal};
    use crate::signals::SignalDatabase;
    use crate::trace::context::{ChangeState, ColorClass};
    use crate::types::{Frame, Recording};

    fn store(frames: Vec<Frame>) -> FrameStore {
        FrameStore::from_recording(Recording::new(frames))
    }

    fn sequence_store() -> FrameStore {
        store(vec![
            Frame::new(0.0, 1, 0x10, vec![0x01, 0xAA]),
            Frame::new(0.1, 1, 0x20, vec![0x00]),
            Frame::new(0.2, 1, 0x10, vec![0x02, 0xAA]),
            Frame::new(0.3, 1, 0x10, vec![0x02, 0xAA]),
        ])
    }

    fn adapter() -> SignalDatabaseAdapter {
        let mut db = SignalDatabase::new();
        let mut msg = message(0x10, "Status", vec![signal("Counter", 0, 8)]);
        msg.size = 2;
        db.add_message(msg);
        let mut adapter = SignalDatabaseAdapter::new();
        adapter.set_database(db);
        adapter
    }

    fn byte0(row: &MessageRow) -> ChangeState {
        row.bytes[0].state
    }

    #[test]
    fn test_process_sequence_fresh_changed_settled() {
        let store = sequence_store();
        let database = adapter();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);
        let mut ctx = TraceContext::new();

        let states: Vec<ChangeState> = [0, 2, 3]
            .iter()
            .map(|&i| byte0(&engine.process(&mut ctx, i).unwrap()))
            .collect();
        assert_eq!(
            states,
            vec![ChangeState::Fresh, ChangeState::Changed, ChangeState::Settled]
        );

        let row = engine.process(&mut ctx, 3).unwrap();
        assert_eq!(row.bytes[1].color, ColorClass::Neutral);
        assert_eq!(row.signals[0].name, "Counter");
        assert_eq!(row.signals[0].state, ChangeState::Settled);
        assert_eq!(row.decoded, "Counter: 2");
        assert_eq!(row.name.as_deref(), Some("Status"));
    }

    #[test]
    fn test_process_fills_decode_cache() {
        let store = sequence_store();
        let database = adapter();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);
        let mut ctx = TraceContext::new();

        let row = engine.process(&mut ctx, 3).unwrap();
        engine.process(&mut ctx, 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(3), Some(row.decoded.as_str()));
        assert_eq!(cache.get(1), Some("Unknown ID"));
    }

    #[test]
    fn test_step_forward_matches_process() {
        let store = sequence_store();
        let database = adapter();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);
        let mut ctx = TraceContext::new();

        engine.refresh(&mut ctx, 0).unwrap();
        let update = engine.step(&mut ctx, Direction::Forward, 0).unwrap();
        assert_eq!(update.position, 1);
        assert!(!update.reset);
        assert_eq!(update.rows[0].can_id, 0x20);

        let update = engine.step(&mut ctx, Direction::Forward, 1).unwrap();
        assert_eq!(byte0(&update.rows[0]), ChangeState::Changed);
        assert_eq!(update.rows[0].signals[0].color, ColorClass::Alert);
    }

    #[test]
    fn test_step_is_noop_at_bounds() {
        let store = sequence_store();
        let database = SignalDatabaseAdapter::new();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);
        let mut ctx = TraceContext::new();

        assert!(engine.step(&mut ctx, Direction::Forward, 3).is_none());
        assert!(engine.step(&mut ctx, Direction::Backward, 0).is_none());
    }

    /// Sequential stepping to index 3 shows byte 0 as Settled, a jump to the
    /// same index shows it Fresh: the jump starts from an empty context.
    #[test]
    fn test_seek_shows_fresh_unlike_stepping() {
        let store = sequence_store();
        let database = adapter();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);

        let mut stepped = TraceContext::new();
        engine.refresh(&mut stepped, 0);
        for current in 0..3 {
            engine.step(&mut stepped, Direction::Forward, current);
        }
        assert_eq!(
            stepped.byte_states(0x10).unwrap()[0],
            ChangeState::Settled
        );

        let mut jumped = TraceContext::new();
        let update = engine.seek(&mut jumped, 3).unwrap();
        assert!(update.reset);
        assert!(update
            .rows
            .iter()
            .flat_map(|row| row.bytes.iter())
            .all(|cell| cell.state == ChangeState::Fresh));
        assert!(update
            .rows
            .iter()
            .flat_map(|row| row.signals.iter())
            .all(|cell| cell.state == ChangeState::Fresh));
    }

    #[test]
    fn test_seek_rows_are_latest_per_id_in_time_order() {
        let store = sequence_store();
        let database = SignalDatabaseAdapter::new();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);
        let mut ctx = TraceContext::new();

        let update = engine.seek(&mut ctx, 2).unwrap();
        let indices: Vec<usize> = update.rows.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(update.timestamp, 0.2);
        assert_eq!(ctx.known_ids(), &[0x20, 0x10]);
        assert_eq!(update.rows[1].decoded, "No DBC Loaded");
    }

    #[test]
    fn test_seek_is_deterministic() {
        let store = sequence_store();
        let database = adapter();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);
        let mut ctx = TraceContext::new();

        let first = engine.seek(&mut ctx, 3);
        let second = engine.seek(&mut ctx, 3);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_seek_clamps_and_step_back_delegates() {
        let store = sequence_store();
        let database = SignalDatabaseAdapter::new();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);
        let mut ctx = TraceContext::new();

        assert_eq!(engine.seek(&mut ctx, 100).unwrap().position, 3);

        let back = engine.step(&mut ctx, Direction::Backward, 3).unwrap();
        let mut fresh_ctx = TraceContext::new();
        let seek = engine.seek(&mut fresh_ctx, 2).unwrap();
        assert_eq!(back, seek);
    }

    #[test]
    fn test_empty_store_is_noop() {
        let store = FrameStore::new();
        let database = SignalDatabaseAdapter::new();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);
        let mut ctx = TraceContext::new();

        assert!(engine.process(&mut ctx, 0).is_none());
        assert!(engine.seek(&mut ctx, 0).is_none());
        assert!(engine.refresh(&mut ctx, 0).is_none());
        assert!(engine.step(&mut ctx, Direction::Forward, 0).is_none());
        assert!(engine.step(&mut ctx, Direction::Backward, 0).is_none());
        assert!(ctx.known_ids().is_empty());
    }

    #[test]
    fn test_length_change_resets_to_fresh() {
        let store = store(vec![
            Frame::new(0.0, 1, 0x30, vec![1, 2]),
            Frame::new(0.1, 1, 0x30, vec![5, 2]),
            Frame::new(0.2, 1, 0x30, vec![5, 2, 3]),
            Frame::new(0.3, 1, 0x30, vec![9, 2]),
        ]);
        let database = SignalDatabaseAdapter::new();
        let mut cache = DecodeCache::new();
        let mut engine = TraceEngine::new(&store, &database, &mut cache);
        let mut ctx = TraceContext::new();

        engine.process(&mut ctx, 0);
        assert_eq!(byte0(&engine.process(&mut ctx, 1).unwrap()), ChangeState::Changed);
        let row = engine.process(&mut ctx, 2).unwrap();
        assert_eq!(row.bytes.len(), 3);
        assert!(row.bytes.iter().all(|b| b.state == ChangeState::Fresh));
        assert_eq!(row.data_hex(), "05 02 03");

        let shrunk = engine.process(&mut ctx, 3).unwrap();
        let states: Vec<ChangeState> = shrunk.bytes.iter().map(|b| b.state).collect();
        assert_eq!(states, vec![ChangeState::Changed, ChangeState::Fresh]);
    }
}
