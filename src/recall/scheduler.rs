//! Recall scheduler
//!
//! Owns the collection of words being recalled for the selected content
//! sheet. Mutations replace the collection copy-on-write, publish the new
//! snapshot and queue a full write-through to the store.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;

use super::bus::{Snapshot, SnapshotBus, SnapshotSubscriber};
use super::clock::Clock;
use super::ladder::StopLadder;
use super::models::RecallItem;
use super::writer::{decode_items, sheet_storage_key, PersistenceQueue};
use crate::storage::KeyValueStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecallError {
    #[error("Word is not being recalled: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, RecallError>;

struct SchedulerState {
    sheet: String,
    items: Snapshot,
}

pub struct RecallScheduler {
    store: Arc<dyn KeyValueStore>,
    ladder: Arc<StopLadder>,
    clock: Arc<dyn Clock>,
    state: Mutex<SchedulerState>,
    /// Serializes sheet switches
    switching: tokio::sync::Mutex<()>,
    queue: PersistenceQueue,
    bus: SnapshotBus,
}

impl RecallScheduler {
    /// Create a scheduler for `sheet`, restoring its persisted collection
    ///
    /// Spawns the background writer, so this must run inside a tokio runtime.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        ladder: Arc<StopLadder>,
        clock: Arc<dyn Clock>,
        sheet: &str,
    ) -> Self {
        let items = load_items(store.as_ref(), &ladder, sheet, clock.now());
        log::info!(
            "Recall scheduler: loaded {} items for sheet '{}'",
            items.len(),
            sheet
        );

        let queue = PersistenceQueue::start(Arc::clone(&store));

        Self {
            store,
            ladder,
            clock,
            state: Mutex::new(SchedulerState {
                sheet: sheet.to_string(),
                items: Arc::new(items),
            }),
            switching: tokio::sync::Mutex::new(()),
            queue,
            bus: SnapshotBus::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Install a new collection, publish it and queue its write
    fn commit(&self, state: &mut SchedulerState, items: Vec<RecallItem>) {
        state.items = Arc::new(items);
        self.queue
            .persist(sheet_storage_key(&state.sheet), Arc::clone(&state.items));
        self.bus.publish(Arc::clone(&state.items));
    }

    // ==================== Mutations ====================

    /// Start recalling a word on the first stop
    ///
    /// Returns false (and changes nothing) if the word is already tracked.
    pub fn focus_on_word(&self, key: &str) -> bool {
        let mut state = self.lock_state();
        if state.items.iter().any(|item| item.key == key) {
            log::debug!("Already recalling '{}'", key);
            return false;
        }

        let mut items = (*state.items).clone();
        items.push(RecallItem::new(key.to_string(), &self.ladder, self.clock.now()));
        self.commit(&mut state, items);

        log::info!("Focusing on '{}'", key);
        true
    }

    /// Stop recalling a word; unknown words are ignored
    pub fn remove(&self, key: &str) {
        let mut state = self.lock_state();
        if !state.items.iter().any(|item| item.key == key) {
            return;
        }

        let items = state
            .items
            .iter()
            .filter(|item| item.key != key)
            .cloned()
            .collect();
        self.commit(&mut state, items);

        log::info!("Removed '{}' from recall", key);
    }

    /// Drop every word of the current sheet
    pub fn remove_all(&self) {
        let mut state = self.lock_state();
        let count = state.items.len();
        self.commit(&mut state, Vec::new());

        log::info!("Removed all {} recall items", count);
    }

    /// Record a successful recall and move the word to the next stop
    pub fn recalled_ok(&self, key: &str) -> Result<RecallItem> {
        let mut state = self.lock_state();
        let pos = state
            .items
            .iter()
            .position(|item| item.key == key)
            .ok_or_else(|| RecallError::NotFound(key.to_string()))?;

        let mut items = (*state.items).clone();
        items[pos].advance(&self.ladder, self.clock.now());
        let updated = items[pos].clone();
        self.commit(&mut state, items);

        log::info!(
            "Recalled '{}', now at stop {}/{}",
            key,
            updated.current_stop_number,
            self.ladder.len()
        );
        Ok(updated)
    }

    /// Replace the free-form note attached to a word
    pub fn set_additional_text(&self, key: &str, text: &str) -> Result<()> {
        let mut state = self.lock_state();
        let pos = state
            .items
            .iter()
            .position(|item| item.key == key)
            .ok_or_else(|| RecallError::NotFound(key.to_string()))?;

        let mut items = (*state.items).clone();
        items[pos].additional_text = text.to_string();
        self.commit(&mut state, items);
        Ok(())
    }

    /// Recompute the cached state of every item
    ///
    /// Publishes a snapshot when anything changed. Nothing is written to the
    /// store since the state is derived from `next_event_time`.
    pub fn refresh_states(&self) -> bool {
        let mut state = self.lock_state();
        let now = self.clock.now();

        let mut items = (*state.items).clone();
        let mut changed = false;
        for item in &mut items {
            changed |= item.refresh_state(now);
        }

        if changed {
            state.items = Arc::new(items);
            self.bus.publish(Arc::clone(&state.items));
        }
        changed
    }

    /// Switch to another content sheet and load its collection
    ///
    /// Concurrent switches run one at a time in call order.
    pub async fn select_sheet(&self, sheet: &str) {
        let _switch = self.switching.lock().await;
        if self.sheet() == sheet {
            return;
        }

        // Writes for the previous sheet must land before we read
        self.queue.flush().await;

        let items = load_items(self.store.as_ref(), &self.ladder, sheet, self.clock.now());
        log::info!(
            "Recall scheduler: switched to sheet '{}' ({} items)",
            sheet,
            items.len()
        );

        let mut state = self.lock_state();
        state.sheet = sheet.to_string();
        state.items = Arc::new(items);
        self.bus.publish(Arc::clone(&state.items));
    }

    /// Wait until every write queued so far has reached the store
    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    // ==================== Queries ====================

    pub fn am_i_recalling(&self, key: &str) -> bool {
        self.lock_state().items.iter().any(|item| item.key == key)
    }

    pub fn get(&self, key: &str) -> Option<RecallItem> {
        self.lock_state()
            .items
            .iter()
            .find(|item| item.key == key)
            .cloned()
    }

    /// Current snapshot, in the order words were focused
    pub fn items(&self) -> Snapshot {
        Arc::clone(&self.lock_state().items)
    }

    /// Observe every snapshot published from now on
    pub fn subscribe(&self) -> SnapshotSubscriber {
        self.bus.subscribe()
    }

    /// Items whose due time has passed, most overdue first
    pub fn overdue_items(&self) -> Vec<RecallItem> {
        let now = self.clock.now();
        let mut due: Vec<RecallItem> = self
            .items()
            .iter()
            .filter(|item| item.is_overdue(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.next_event_time.cmp(&b.next_event_time));
        due
    }

    /// The item that becomes (or became) due first
    pub fn next_due(&self) -> Option<RecallItem> {
        self.items()
            .iter()
            .min_by_key(|item| item.next_event_time)
            .cloned()
    }

    pub fn ladder(&self) -> &StopLadder {
        &self.ladder
    }

    pub fn sheet(&self) -> String {
        self.lock_state().sheet.clone()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Periodically refresh cached recall states
///
/// The task holds only a weak reference and ends once the scheduler is gone.
pub fn spawn_refresh_loop(scheduler: &Arc<RecallScheduler>, period: Duration) -> JoinHandle<()> {
    let weak: Weak<RecallScheduler> = Arc::downgrade(scheduler);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let Some(scheduler) = weak.upgrade() else {
                break;
            };
            if scheduler.refresh_states() {
                log::debug!("Recall states refreshed");
            }
        }
    })
}

/// Read a sheet's collection, falling back to empty on any failure
fn load_items(
    store: &dyn KeyValueStore,
    ladder: &StopLadder,
    sheet: &str,
    now: DateTime<Utc>,
) -> Vec<RecallItem> {
    let key = sheet_storage_key(sheet);
    let data = match store.get(&key) {
        Ok(Some(data)) => data,
        Ok(None) => return Vec::new(),
        Err(e) => {
            log::error!("Failed to read recall items from {}: {}", key, e);
            return Vec::new();
        }
    };

    let decoded = match decode_items(&data) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("Discarding unreadable recall items in {}: {}", key, e);
            return Vec::new();
        }
    };

    let mut items: Vec<RecallItem> = Vec::with_capacity(decoded.len());
    for mut item in decoded {
        if items.iter().any(|existing| existing.key == item.key) {
            log::warn!("Skipping duplicate recall item '{}' in {}", item.key, key);
            continue;
        }

        // The ladder may have shrunk since the item was saved
        let stop = ladder.clamp(item.current_stop_number);
        if stop != item.current_stop_number {
            item.current_stop_number = stop;
            item.next_event_time = ladder.due_after(stop, item.prev_event_time);
        }

        item.refresh_state(now);
        items.push(item);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::recall::clock::ManualClock;
    use crate::recall::models::RecallState;
    use crate::recall::writer::encode_items;
    use crate::storage::{FileStore, MemoryStore};

    fn millis(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn create_scheduler(
        ladder: &str,
        start_ms: i64,
    ) -> (RecallScheduler, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::at_millis(start_ms));
        let scheduler = RecallScheduler::new(
            store.clone(),
            Arc::new(StopLadder::parse(ladder).unwrap()),
            clock.clone(),
            "default",
        );
        (scheduler, store, clock)
    }

    #[tokio::test]
    async fn test_focus_on_word_sets_first_stop() {
        let (scheduler, _store, _clock) = create_scheduler("10m,1h", 0);

        assert!(scheduler.focus_on_word("x"));
        let item = scheduler.get("x").unwrap();
        assert_eq!(item.current_stop_number, 1);
        assert_eq!(item.prev_event_time, millis(0));
        assert_eq!(item.next_event_time, millis(600_000));
        assert_eq!(
            item.next_event_time,
            item.prev_event_time + scheduler.ladder().duration_at(1, item.prev_event_time)
        );
        assert_eq!(item.recall_state, RecallState::Waiting);
        assert!(scheduler.am_i_recalling("x"));
    }

    #[tokio::test]
    async fn test_recall_scenario_clamps_at_last_stop() {
        let (scheduler, _store, clock) = create_scheduler("10m,1h", 0);
        scheduler.focus_on_word("x");

        clock.set_millis(700_000);
        let item = scheduler.recalled_ok("x").unwrap();
        assert_eq!(item.current_stop_number, 2);
        assert_eq!(item.prev_event_time, millis(700_000));
        assert_eq!(item.next_event_time, millis(4_300_000));

        let item = scheduler.recalled_ok("x").unwrap();
        assert_eq!(item.current_stop_number, 2);
    }

    #[tokio::test]
    async fn test_stop_is_monotonic_and_capped() {
        let (scheduler, _store, clock) = create_scheduler("10m,1h,1D,1W,1M,4M", 0);
        let ladder_len = scheduler.ladder().len();
        scheduler.focus_on_word("libro");

        let mut previous = 1;
        for _ in 0..ladder_len + 5 {
            clock.advance(chrono::TimeDelta::minutes(1));
            let item = scheduler.recalled_ok("libro").unwrap();
            assert!(item.current_stop_number >= previous);
            assert!(item.current_stop_number <= ladder_len);
            previous = item.current_stop_number;
        }
        assert_eq!(scheduler.get("libro").unwrap().current_stop_number, ladder_len);
    }

    #[tokio::test]
    async fn test_recalled_ok_unknown_word() {
        let (scheduler, store, _clock) = create_scheduler("10m", 0);

        assert_eq!(
            scheduler.recalled_ok("nada"),
            Err(RecallError::NotFound("nada".to_string()))
        );
        scheduler.flush().await;
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_focus_is_noop() {
        let (scheduler, store, clock) = create_scheduler("10m,1h", 0);
        scheduler.focus_on_word("x");
        clock.set_millis(700_000);
        scheduler.recalled_ok("x").unwrap();

        assert!(!scheduler.focus_on_word("x"));
        scheduler.flush().await;

        assert_eq!(scheduler.items().len(), 1);
        assert_eq!(scheduler.get("x").unwrap().current_stop_number, 2);
        assert_eq!(store.write_count("recall_items_default"), 2);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let (scheduler, store, _clock) = create_scheduler("10m", 0);
        scheduler.focus_on_word("a");
        let before = scheduler.items();

        scheduler.remove("missing");
        scheduler.flush().await;

        assert_eq!(*scheduler.items(), *before);
        assert_eq!(store.write_count("recall_items_default"), 1);
    }

    #[tokio::test]
    async fn test_remove_keeps_other_words() {
        let (scheduler, _store, _clock) = create_scheduler("10m", 0);
        scheduler.focus_on_word("a");
        scheduler.focus_on_word("b");
        scheduler.focus_on_word("c");

        scheduler.remove("b");

        let keys: Vec<String> = scheduler.items().iter().map(|i| i.key.clone()).collect();
        assert_eq!(keys, vec!["a", "c"]);
        assert!(!scheduler.am_i_recalling("b"));
    }

    #[tokio::test]
    async fn test_remove_all_writes_once() {
        let (scheduler, store, _clock) = create_scheduler("10m", 0);
        scheduler.focus_on_word("a");
        scheduler.focus_on_word("b");
        scheduler.focus_on_word("c");
        scheduler.flush().await;
        let writes_before = store.write_count("recall_items_default");

        scheduler.remove_all();
        scheduler.flush().await;

        assert!(scheduler.items().is_empty());
        assert_eq!(store.write_count("recall_items_default"), writes_before + 1);
        assert_eq!(
            store.get("recall_items_default").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_every_mutation_persists_full_collection() {
        let (scheduler, store, _clock) = create_scheduler("10m", 0);
        scheduler.focus_on_word("a");
        scheduler.focus_on_word("b");
        scheduler.set_additional_text("a", "article").unwrap();
        scheduler.flush().await;

        let persisted = decode_items(&store.get("recall_items_default").unwrap().unwrap()).unwrap();
        assert_eq!(persisted, *scheduler.items());
        assert_eq!(persisted[0].additional_text, "article");
        assert_eq!(store.write_count("recall_items_default"), 3);
    }

    #[tokio::test]
    async fn test_restores_from_store() {
        let store = Arc::new(MemoryStore::new());
        let ladder = Arc::new(StopLadder::parse("10m,1h").unwrap());
        let clock = Arc::new(ManualClock::at_millis(0));

        {
            let scheduler =
                RecallScheduler::new(store.clone(), ladder.clone(), clock.clone(), "default");
            scheduler.focus_on_word("x");
            scheduler.focus_on_word("y");
            scheduler.recalled_ok("y").unwrap();
            scheduler.flush().await;
        }

        let restored = RecallScheduler::new(store.clone(), ladder, clock, "default");
        assert_eq!(restored.items().len(), 2);
        assert_eq!(restored.get("y").unwrap().current_stop_number, 2);
    }

    #[tokio::test]
    async fn test_corrupt_state_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set("recall_items_default", "{not json").unwrap();

        let scheduler = RecallScheduler::new(
            store.clone(),
            Arc::new(StopLadder::default()),
            Arc::new(ManualClock::at_millis(0)),
            "default",
        );
        assert!(scheduler.items().is_empty());

        scheduler.focus_on_word("nuevo");
        assert_eq!(scheduler.items().len(), 1);
    }

    #[tokio::test]
    async fn test_load_recomputes_state_and_drops_duplicates() {
        let ladder = StopLadder::parse("10m,1h").unwrap();
        let mut first = RecallItem::new("x".to_string(), &ladder, millis(0));
        first.current_stop_number = 9;
        let second = RecallItem::new("x".to_string(), &ladder, millis(5));

        let store = Arc::new(MemoryStore::new());
        store
            .set("recall_items_default", &encode_items(&[first, second]).unwrap())
            .unwrap();

        let scheduler = RecallScheduler::new(
            store.clone(),
            Arc::new(ladder),
            Arc::new(ManualClock::at_millis(10_000_000)),
            "default",
        );
        let items = scheduler.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].current_stop_number, 2);
        assert_eq!(items[0].prev_event_time, millis(0));
        assert_eq!(items[0].next_event_time, millis(3_600_000));
        assert_eq!(items[0].recall_state, RecallState::Overdue);
    }

    #[tokio::test]
    async fn test_sheets_are_isolated() {
        let (scheduler, store, _clock) = create_scheduler("10m", 0);
        scheduler.focus_on_word("hola");

        scheduler.select_sheet("german").await;
        assert_eq!(scheduler.sheet(), "german");
        assert!(scheduler.items().is_empty());
        scheduler.focus_on_word("hallo");

        scheduler.select_sheet("default").await;
        assert!(scheduler.am_i_recalling("hola"));
        assert!(!scheduler.am_i_recalling("hallo"));
        scheduler.flush().await;

        assert!(store.get("recall_items_german").unwrap().unwrap().contains("hallo"));
    }

    #[tokio::test]
    async fn test_concurrent_sheet_switches_keep_call_order() {
        let (scheduler, store, _clock) = create_scheduler("10m", 0);
        store
            .set("recall_items_one", &encode_items(&[]).unwrap())
            .unwrap();
        let two = RecallItem::new("zwei".to_string(), scheduler.ladder(), millis(0));
        store
            .set("recall_items_two", &encode_items(&[two]).unwrap())
            .unwrap();

        tokio::join!(scheduler.select_sheet("one"), scheduler.select_sheet("two"));

        assert_eq!(scheduler.sheet(), "two");
        assert!(scheduler.am_i_recalling("zwei"));
    }

    #[tokio::test]
    async fn test_similar_sheet_names_stay_isolated_on_disk() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(FileStore::open(temp_dir.path().to_path_buf()).unwrap());
        let scheduler = RecallScheduler::new(
            store.clone(),
            Arc::new(StopLadder::default()),
            Arc::new(ManualClock::at_millis(0)),
            "my sheet",
        );
        scheduler.focus_on_word("hola");

        scheduler.select_sheet("my_sheet").await;
        assert!(!scheduler.am_i_recalling("hola"));
        scheduler.focus_on_word("hallo");
        scheduler.flush().await;

        assert_eq!(
            store.keys().unwrap(),
            vec!["recall_items_my sheet", "recall_items_my_sheet"]
        );

        scheduler.select_sheet("my sheet").await;
        assert!(scheduler.am_i_recalling("hola"));
        assert!(!scheduler.am_i_recalling("hallo"));
    }

    #[tokio::test]
    async fn test_far_future_timing_falls_back_without_panic() {
        let (scheduler, _store, clock) = create_scheduler("10m,100000000D", 0);
        scheduler.focus_on_word("x");

        clock.set_millis(700_000);
        let item = scheduler.recalled_ok("x").unwrap();
        assert_eq!(item.current_stop_number, 2);
        assert_eq!(item.next_event_time, millis(700_000 + 3_600_000));

        // The scheduler is still usable afterwards
        assert!(scheduler.focus_on_word("y"));
        assert_eq!(scheduler.items().len(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_transition() {
        let (scheduler, _store, _clock) = create_scheduler("10m,1h", 0);
        let mut sub = scheduler.subscribe();

        scheduler.focus_on_word("a");
        scheduler.focus_on_word("b");
        scheduler.recalled_ok("a").unwrap();
        scheduler.remove("b");
        scheduler.remove_all();

        let lens: Vec<usize> = vec![
            sub.recv().await.unwrap().len(),
            sub.recv().await.unwrap().len(),
            sub.recv().await.unwrap().len(),
            sub.recv().await.unwrap().len(),
            sub.recv().await.unwrap().len(),
        ];
        assert_eq!(lens, vec![1, 2, 2, 1, 0]);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_old_snapshots_are_untouched() {
        let (scheduler, _store, _clock) = create_scheduler("10m,1h", 0);
        scheduler.focus_on_word("a");
        let snapshot = scheduler.items();

        scheduler.recalled_ok("a").unwrap();
        scheduler.remove_all();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].current_stop_number, 1);
    }

    #[tokio::test]
    async fn test_refresh_states_and_overdue_queries() {
        let (scheduler, store, clock) = create_scheduler("10m,1h", 0);
        scheduler.focus_on_word("a");
        clock.set_millis(60_000);
        scheduler.focus_on_word("b");
        scheduler.flush().await;
        let writes = store.writes().len();

        assert!(!scheduler.refresh_states());
        assert!(scheduler.overdue_items().is_empty());
        assert_eq!(scheduler.next_due().unwrap().key, "a");

        clock.set_millis(700_000);
        assert!(scheduler.refresh_states());
        let due: Vec<String> = scheduler.overdue_items().into_iter().map(|i| i.key).collect();
        assert_eq!(due, vec!["a", "b"]);
        assert!(scheduler
            .items()
            .iter()
            .all(|i| i.recall_state == RecallState::Overdue));

        scheduler.flush().await;
        assert_eq!(store.writes().len(), writes);
    }

    #[tokio::test]
    async fn test_set_additional_text_unknown_word() {
        let (scheduler, _store, _clock) = create_scheduler("10m", 0);
        assert_eq!(
            scheduler.set_additional_text("x", "note"),
            Err(RecallError::NotFound("x".to_string()))
        );
    }

    #[tokio::test]
    async fn test_refresh_loop_stops_with_scheduler() {
        let (scheduler, _store, clock) = create_scheduler("10m", 0);
        let scheduler = Arc::new(scheduler);
        scheduler.focus_on_word("a");
        let mut sub = scheduler.subscribe();

        let handle = spawn_refresh_loop(&scheduler, Duration::from_millis(10));
        clock.set_millis(600_000);

        let snapshot = sub.recv().await.unwrap();
        assert_eq!(snapshot[0].recall_state, RecallState::Overdue);

        drop(sub);
        drop(scheduler);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_through_file_store() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let ladder = Arc::new(StopLadder::default());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap()));

        {
            let store = Arc::new(FileStore::open(temp_dir.path().to_path_buf()).unwrap());
            let scheduler = RecallScheduler::new(store, ladder.clone(), clock.clone(), "spanish");
            scheduler.focus_on_word("mesa");
            scheduler.recalled_ok("mesa").unwrap();
            scheduler.set_additional_text("mesa", "table").unwrap();
            scheduler.flush().await;
        }

        let store = Arc::new(FileStore::open(temp_dir.path().to_path_buf()).unwrap());
        let scheduler = RecallScheduler::new(store, ladder, clock, "spanish");
        let item = scheduler.get("mesa").unwrap();
        assert_eq!(item.current_stop_number, 2);
        assert_eq!(item.additional_text, "table");
    }
}
