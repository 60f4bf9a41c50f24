use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::fingerprint::SessionProfile;
use crate::store::TrackingStore;

use super::session_loop::session_loop;
use super::state::{PopupPhase, PopupState};

/// Create the scroll signal pair. The scheduler holds the receiver; whoever
/// bridges the real scroll event source publishes vertical offsets (px)
/// through the sender.
pub fn scroll_channel() -> (watch::Sender<f64>, watch::Receiver<f64>) {
    watch::channel(0.0)
}

/// Decides, once per page session, whether to surface the email modal.
///
/// One instance per session. `start` spawns the pipeline task; `shutdown`
/// cancels it, which is the only teardown semantic the scheduler needs: a
/// pending delay timer dies without ever touching the Tracking Store.
pub struct PopupScheduler {
    session_id: String,
    fingerprint: String,
    config: SchedulerConfig,
    store: Arc<dyn TrackingStore>,
    state: Arc<Mutex<PopupState>>,
    show_tx: Arc<watch::Sender<bool>>,
    cancel_token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PopupScheduler {
    pub fn new(
        store: Arc<dyn TrackingStore>,
        profile: &SessionProfile,
        config: SchedulerConfig,
    ) -> Self {
        let (show_tx, _) = watch::channel(false);

        Self {
            session_id: Uuid::new_v4().to_string(),
            fingerprint: profile.fingerprint(),
            config,
            store,
            state: Arc::new(Mutex::new(PopupState::new())),
            show_tx: Arc::new(show_tx),
            cancel_token: CancellationToken::new(),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the session pipeline against a scroll signal. At most one
    /// pipeline per scheduler; a second call fails.
    pub async fn start(&self, scroll_rx: watch::Receiver<f64>) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            bail!("popup scheduler already started");
        }

        info!("Popup scheduler started for session {}", self.session_id);

        let handle = tokio::spawn(session_loop(
            self.session_id.clone(),
            self.fingerprint.clone(),
            self.config.clone(),
            self.store.clone(),
            self.state.clone(),
            self.show_tx.clone(),
            scroll_rx,
            self.cancel_token.clone(),
        ));

        *worker = Some(handle);
        Ok(())
    }

    /// Subscribe to the boolean show signal consumed by the modal UI.
    pub fn show_signal(&self) -> watch::Receiver<bool> {
        self.show_tx.subscribe()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub async fn phase(&self) -> PopupPhase {
        self.state.lock().await.phase
    }

    /// UI closed the modal. The scheduler never re-arms for the session.
    pub async fn close(&self) {
        let closed = self.state.lock().await.close();
        if closed {
            let _ = self.show_tx.send(false);
        }
    }

    /// Tear the session down: cancels any pending timer or decision.
    pub async fn shutdown(&self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.worker.lock().await.take() {
            handle
                .await
                .context("popup session task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use tokio::time::Duration;

    use crate::db::models::TrackingRecord;

    use super::*;

    #[derive(Default)]
    struct MockTrackingStore {
        records: StdMutex<Vec<TrackingRecord>>,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        reads: AtomicUsize,
        writes: AtomicUsize,
    }

    impl MockTrackingStore {
        fn with_record(record: TrackingRecord) -> Self {
            let store = Self::default();
            store.records.lock().unwrap().push(record);
            store
        }

        fn read_count(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TrackingStore for MockTrackingStore {
        async fn latest_for_fingerprint(
            &self,
            fingerprint: &str,
        ) -> anyhow::Result<Option<TrackingRecord>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(anyhow!("simulated read failure"));
            }
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|r| r.fingerprint == fingerprint)
                .max_by_key(|r| r.last_shown)
                .cloned())
        }

        async fn record_shown(
            &self,
            fingerprint: &str,
            shown_at: DateTime<Utc>,
        ) -> anyhow::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(anyhow!("simulated write failure"));
            }
            self.records.lock().unwrap().push(TrackingRecord {
                fingerprint: fingerprint.to_string(),
                last_shown: shown_at,
                email_captured: false,
            });
            Ok(())
        }

        async fn mark_email_captured(&self, fingerprint: &str) -> anyhow::Result<()> {
            let mut records = self.records.lock().unwrap();
            if let Some(record) = records
                .iter_mut()
                .filter(|r| r.fingerprint == fingerprint)
                .max_by_key(|r| r.last_shown)
            {
                record.email_captured = true;
            }
            Ok(())
        }
    }

    fn profile() -> SessionProfile {
        SessionProfile {
            user_agent: "Mozilla/5.0".into(),
            language: "en-US".into(),
            screen_width: 1440,
            screen_height: 900,
            timezone_offset_min: 0,
        }
    }

    fn scheduler(store: Arc<MockTrackingStore>) -> PopupScheduler {
        PopupScheduler::new(store, &profile(), SchedulerConfig::default())
    }

    fn prior_record(age_hours: i64, email_captured: bool) -> TrackingRecord {
        TrackingRecord {
            fingerprint: profile().fingerprint(),
            last_shown: Utc::now() - ChronoDuration::hours(age_hours),
            email_captured,
        }
    }

    /// Yield long enough for the session task to finish its current step
    /// (the tracking write lands after the show signal flips).
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    async fn wait_for_phase(scheduler: &PopupScheduler, expected: PopupPhase) {
        for _ in 0..200 {
            if scheduler.phase().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!(
            "timed out waiting for {expected:?}, still in {:?}",
            scheduler.phase().await
        );
    }

    #[tokio::test(start_paused = true)]
    async fn new_fingerprint_shows_and_writes_once() {
        let store = Arc::new(MockTrackingStore::default());
        let scheduler = scheduler(store.clone());
        let mut show_rx = scheduler.show_signal();

        let (scroll_tx, scroll_rx) = scroll_channel();
        scheduler.start(scroll_rx).await.unwrap();

        scroll_tx.send(150.0).unwrap();
        show_rx.changed().await.unwrap();
        assert!(*show_rx.borrow());

        wait_for_phase(&scheduler, PopupPhase::Shown).await;
        settle().await;
        assert_eq!(store.read_count(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn armed_fires_at_most_once_per_session() {
        let store = Arc::new(MockTrackingStore::default());
        let scheduler = scheduler(store.clone());

        let (scroll_tx, scroll_rx) = scroll_channel();
        // Keep the channel open after the session task finishes
        let _scroll_rx_keep = scroll_tx.subscribe();
        scheduler.start(scroll_rx).await.unwrap();

        // Keep scrolling well past the threshold the whole time
        for offset in [150.0, 900.0, 40.0, 2500.0, 101.0] {
            scroll_tx.send(offset).unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        wait_for_phase(&scheduler, PopupPhase::Shown).await;
        settle().await;
        assert_eq!(store.read_count(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scroll_below_threshold_never_arms() {
        let store = Arc::new(MockTrackingStore::default());
        let scheduler = scheduler(store.clone());

        let (scroll_tx, scroll_rx) = scroll_channel();
        scheduler.start(scroll_rx).await.unwrap();

        scroll_tx.send(99.0).unwrap();
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        assert_eq!(scheduler.phase().await, PopupPhase::Idle);
        assert_eq!(store.read_count(), 0);
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_before_delay_leaves_store_untouched() {
        let store = Arc::new(MockTrackingStore::default());
        let scheduler = scheduler(store.clone());

        let (scroll_tx, scroll_rx) = scroll_channel();
        scheduler.start(scroll_rx).await.unwrap();

        scroll_tx.send(150.0).unwrap();
        wait_for_phase(&scheduler, PopupPhase::Armed).await;

        scheduler.shutdown().await.unwrap();

        assert_eq!(store.read_count(), 0);
        assert_eq!(store.write_count(), 0);
        assert!(!*scheduler.show_signal().borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn captured_fingerprint_never_reprompts() {
        let store = Arc::new(MockTrackingStore::with_record(prior_record(24 * 365, true)));
        let scheduler = scheduler(store.clone());

        let (scroll_tx, scroll_rx) = scroll_channel();
        scheduler.start(scroll_rx).await.unwrap();
        scroll_tx.send(150.0).unwrap();

        wait_for_phase(&scheduler, PopupPhase::Suppressed).await;
        assert_eq!(store.write_count(), 0);
        assert!(!*scheduler.show_signal().borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_suppresses_recent_and_reprompts_stale() {
        let store = Arc::new(MockTrackingStore::with_record(prior_record(23, false)));
        let scheduler = scheduler(store.clone());
        let (scroll_tx, scroll_rx) = scroll_channel();
        scheduler.start(scroll_rx).await.unwrap();
        scroll_tx.send(150.0).unwrap();
        wait_for_phase(&scheduler, PopupPhase::Suppressed).await;
        assert_eq!(store.write_count(), 0);

        let store = Arc::new(MockTrackingStore::with_record(prior_record(25, false)));
        let scheduler = PopupScheduler::new(store.clone(), &profile(), SchedulerConfig::default());
        let (scroll_tx, scroll_rx) = scroll_channel();
        scheduler.start(scroll_rx).await.unwrap();
        scroll_tx.send(150.0).unwrap();
        wait_for_phase(&scheduler, PopupPhase::Shown).await;
        settle().await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn read_failure_suppresses_without_writing() {
        let store = Arc::new(MockTrackingStore::default());
        store.fail_reads.store(true, Ordering::SeqCst);
        let scheduler = scheduler(store.clone());

        let (scroll_tx, scroll_rx) = scroll_channel();
        scheduler.start(scroll_rx).await.unwrap();
        scroll_tx.send(150.0).unwrap();

        wait_for_phase(&scheduler, PopupPhase::Suppressed).await;
        assert_eq!(store.write_count(), 0);
        assert!(!*scheduler.show_signal().borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_keeps_popup_shown() {
        let store = Arc::new(MockTrackingStore::default());
        store.fail_writes.store(true, Ordering::SeqCst);
        let scheduler = scheduler(store.clone());
        let mut show_rx = scheduler.show_signal();

        let (scroll_tx, scroll_rx) = scroll_channel();
        scheduler.start(scroll_rx).await.unwrap();
        scroll_tx.send(150.0).unwrap();

        show_rx.changed().await.unwrap();
        assert!(*show_rx.borrow());
        wait_for_phase(&scheduler, PopupPhase::Shown).await;
        settle().await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_ends_the_session_without_rearming() {
        let store = Arc::new(MockTrackingStore::default());
        let scheduler = scheduler(store.clone());

        let (scroll_tx, scroll_rx) = scroll_channel();
        // Keep the channel open after the session task finishes
        let _scroll_rx_keep = scroll_tx.subscribe();
        scheduler.start(scroll_rx).await.unwrap();
        scroll_tx.send(150.0).unwrap();
        wait_for_phase(&scheduler, PopupPhase::Shown).await;

        scheduler.close().await;
        assert_eq!(scheduler.phase().await, PopupPhase::Closed);
        assert!(!*scheduler.show_signal().borrow());

        // More scroll traffic after close changes nothing
        scroll_tx.send(5000.0).unwrap();
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        assert_eq!(scheduler.phase().await, PopupPhase::Closed);
        assert_eq!(store.read_count(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_fails() {
        let store = Arc::new(MockTrackingStore::default());
        let scheduler = scheduler(store);

        let (_tx_a, rx_a) = scroll_channel();
        let (_tx_b, rx_b) = scroll_channel();
        scheduler.start(rx_a).await.unwrap();
        assert!(scheduler.start(rx_b).await.is_err());
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn scroll_source_closing_while_idle_suppresses() {
        let store = Arc::new(MockTrackingStore::default());
        let scheduler = scheduler(store.clone());

        let (scroll_tx, scroll_rx) = scroll_channel();
        scheduler.start(scroll_rx).await.unwrap();
        drop(scroll_tx);

        wait_for_phase(&scheduler, PopupPhase::Suppressed).await;
        assert_eq!(store.read_count(), 0);
    }
}
