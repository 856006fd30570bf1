//! Presentation state machine and the store the display layer observes.
//!
//! [`PresentationState`] is the single value the window renders.  The
//! pipeline moves it through
//!
//! ```text
//! Idle ──selection──▶ Analyzing ──run finished──▶ Done(result)
//! Done ──selection──▶ Analyzing
//! Analyzing ──selection──▶ Analyzing   (new run token, nothing is cancelled)
//! ```
//!
//! [`PresentationStore`] holds the state behind `Arc<Mutex<…>>`.  It is cheap
//! to clone; observers registered with [`PresentationStore::subscribe`] are
//! called after each transition commits, outside the state lock, and always
//! in commit order.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PredictionResult
// ---------------------------------------------------------------------------

/// Why a run did not produce a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The photo could not be decoded or resized.
    Resize,
    /// The model could not be loaded or did not return a prediction.
    Analysis,
}

impl FailureReason {
    /// Text shown to the user.  Diagnostic detail only goes to the log.
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::Resize => "Image resize failed",
            FailureReason::Analysis => "Analysis failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionResult {
    /// Human-readable scene label (underscores already replaced).
    Success(String),
    Failure(FailureReason),
}

impl PredictionResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, PredictionResult::Failure(_))
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionResult::Success(label) => write!(f, "Result: {label}"),
            PredictionResult::Failure(reason) => reason.fmt(f),
        }
    }
}

// ---------------------------------------------------------------------------
// PresentationState
// ---------------------------------------------------------------------------

/// What the display layer shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PresentationState {
    /// No photo selected yet.
    #[default]
    Idle,
    /// A run is in flight.
    Analyzing,
    /// The latest applied run finished.
    Done(PredictionResult),
}

impl PresentationState {
    /// The single line of text rendered for this state.
    ///
    /// ```
    /// use scene_classifier::pipeline::{FailureReason, PredictionResult, PresentationState};
    ///
    /// assert_eq!(PresentationState::Idle.display_text(), "Tap image to select");
    /// assert_eq!(PresentationState::Analyzing.display_text(), "Analyzing image...");
    /// assert_eq!(
    ///     PresentationState::Done(PredictionResult::Success("ice skating rink".into()))
    ///         .display_text(),
    ///     "Result: ice skating rink"
    /// );
    /// assert_eq!(
    ///     PresentationState::Done(PredictionResult::Failure(FailureReason::Analysis))
    ///         .display_text(),
    ///     "Analysis failed"
    /// );
    /// ```
    pub fn display_text(&self) -> String {
        match self {
            PresentationState::Idle => "Tap image to select".to_string(),
            PresentationState::Analyzing => "Analyzing image...".to_string(),
            PresentationState::Done(result) => result.to_string(),
        }
    }

    /// `true` when the latest run ended in a failure; drives the red styling.
    pub fn is_failure(&self) -> bool {
        matches!(self, PresentationState::Done(result) if result.is_failure())
    }

    /// `true` while a run is in flight; drives the progress indicator.
    pub fn is_busy(&self) -> bool {
        matches!(self, PresentationState::Analyzing)
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            PresentationState::Idle => "Idle",
            PresentationState::Analyzing => "Analyzing",
            PresentationState::Done(PredictionResult::Success(_)) => "Done(success)",
            PresentationState::Done(PredictionResult::Failure(_)) => "Done(failure)",
        }
    }
}

// ---------------------------------------------------------------------------
// RunToken / StaleRunPolicy
// ---------------------------------------------------------------------------

/// Identifies one pipeline run.  Tokens increase monotonically per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunToken(u64);

impl RunToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What [`PresentationStore::finish`] does with a result from a run that has
/// since been superseded by a newer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StaleRunPolicy {
    /// Only the latest run may publish its result.
    #[default]
    DiscardStale,
    /// Every run publishes; whichever finishes last is shown.
    LastWriterWins,
}

// ---------------------------------------------------------------------------
// PresentationStore
// ---------------------------------------------------------------------------

type Observer = Arc<dyn Fn(&PresentationState) + Send + Sync>;

/// Handle returned by [`PresentationStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct StoreInner {
    state: PresentationState,
    policy: StaleRunPolicy,
    latest_run: u64,
    next_subscription: u64,
    observers: Vec<(u64, Observer)>,
}

/// Thread-safe owner of the current [`PresentationState`].
///
/// Cheap to clone (`Arc` clone).  The pipeline writes through
/// [`begin_run`](Self::begin_run) / [`finish`](Self::finish); the UI reads
/// [`current_state`](Self::current_state) each frame.
///
/// Transitions are serialised by a delivery lock held from commit until every
/// observer has returned.  Observers may read the store but must not call
/// `begin_run` or `finish` themselves.
#[derive(Clone)]
pub struct PresentationStore {
    inner: Arc<Mutex<StoreInner>>,
    delivery: Arc<Mutex<()>>,
}

impl fmt::Debug for PresentationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("PresentationStore")
            .field("state", &inner.state)
            .field("policy", &inner.policy)
            .field("latest_run", &inner.latest_run)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

impl Default for PresentationStore {
    fn default() -> Self {
        Self::new(StaleRunPolicy::default())
    }
}

impl PresentationStore {
    /// A store in `Idle` with no runs yet.
    pub fn new(policy: StaleRunPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                state: PresentationState::Idle,
                policy,
                latest_run: 0,
                next_subscription: 0,
                observers: Vec::new(),
            })),
            delivery: Arc::new(Mutex::new(())),
        }
    }

    pub fn policy(&self) -> StaleRunPolicy {
        self.lock().policy
    }

    /// Snapshot of the current state.
    pub fn current_state(&self) -> PresentationState {
        self.lock().state.clone()
    }

    /// Register `observer`; it receives every state committed from now on.
    pub fn subscribe(
        &self,
        observer: impl Fn(&PresentationState) + Send + Sync + 'static,
    ) -> Subscription {
        let mut inner = self.lock();
        inner.next_subscription += 1;
        let id = inner.next_subscription;
        inner.observers.push((id, Arc::new(observer)));
        Subscription(id)
    }

    /// Remove an observer.  Returns `false` if it was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut inner = self.lock();
        let before = inner.observers.len();
        inner.observers.retain(|(id, _)| *id != subscription.0);
        inner.observers.len() != before
    }

    /// Enter `Analyzing` for a new selection and hand out its token.
    ///
    /// Valid from every state: a selection while another run is in flight
    /// starts a second, independent run.
    pub fn begin_run(&self) -> RunToken {
        let _delivery = self.lock_delivery();
        let (token, observers) = {
            let mut inner = self.lock();
            inner.latest_run += 1;
            inner.state = PresentationState::Analyzing;
            (RunToken(inner.latest_run), observers_of(&inner))
        };
        log::debug!("pipeline: run {token} started → Analyzing");
        notify(&observers, &PresentationState::Analyzing);
        token
    }

    /// Publish the result of run `token`.
    ///
    /// Returns `true` when the result became the current state.  Under
    /// [`StaleRunPolicy::DiscardStale`] results from superseded runs, and a
    /// second result for the same run, are dropped.
    pub fn finish(&self, token: RunToken, result: PredictionResult) -> bool {
        let next = PresentationState::Done(result);
        let _delivery = self.lock_delivery();
        let observers = {
            let mut inner = self.lock();
            let is_latest = token.0 == inner.latest_run;
            let in_flight = inner.state == PresentationState::Analyzing;
            match inner.policy {
                StaleRunPolicy::DiscardStale if !is_latest || !in_flight => {
                    log::warn!(
                        "pipeline: discarding result of run {token} ({}), a newer run owns the display",
                        next.label()
                    );
                    return false;
                }
                StaleRunPolicy::LastWriterWins if !is_latest => {
                    log::debug!("pipeline: run {token} is stale but overwrites the display");
                }
                _ => {}
            }
            inner.state = next.clone();
            observers_of(&inner)
        };
        log::debug!("pipeline: run {token} finished → {}", next.label());
        notify(&observers, &next);
        true
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Taken before the state lock and held through `notify`.
    fn lock_delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn observers_of(inner: &StoreInner) -> Vec<Observer> {
    inner.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
}

fn notify(observers: &[Observer], state: &PresentationState) {
    for observer in observers {
        observer(state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn success(label: &str) -> PredictionResult {
        PredictionResult::Success(label.to_string())
    }

    fn recorder(store: &PresentationStore) -> (Subscription, Arc<Mutex<Vec<PresentationState>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(move |s| sink.lock().unwrap().push(s.clone()));
        (sub, seen)
    }

    // ---- display policy ---

    #[test]
    fn display_texts() {
        assert_eq!(PresentationState::Idle.display_text(), "Tap image to select");
        assert_eq!(PresentationState::Analyzing.display_text(), "Analyzing image...");
        assert_eq!(
            PresentationState::Done(success("coast")).display_text(),
            "Result: coast"
        );
        assert_eq!(
            PresentationState::Done(PredictionResult::Failure(FailureReason::Resize))
                .display_text(),
            "Image resize failed"
        );
        assert_eq!(
            PresentationState::Done(PredictionResult::Failure(FailureReason::Analysis))
                .display_text(),
            "Analysis failed"
        );
    }

    #[test]
    fn failure_and_busy_flags() {
        assert!(!PresentationState::Idle.is_failure());
        assert!(!PresentationState::Idle.is_busy());
        assert!(PresentationState::Analyzing.is_busy());
        assert!(!PresentationState::Done(success("coast")).is_failure());
        assert!(
            PresentationState::Done(PredictionResult::Failure(FailureReason::Resize)).is_failure()
        );
        assert!(!PresentationState::Done(success("coast")).is_busy());
    }

    /// A label that merely contains "failed" is still a success.
    #[test]
    fn failure_flag_is_typed_not_textual() {
        let state = PresentationState::Done(success("failed launch pad"));
        assert!(!state.is_failure());
        assert_eq!(state.display_text(), "Result: failed launch pad");
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(PresentationState::default(), PresentationState::Idle);
        assert_eq!(PresentationStore::default().current_state(), PresentationState::Idle);
        assert_eq!(StaleRunPolicy::default(), StaleRunPolicy::DiscardStale);
    }

    // ---- transitions ---

    #[test]
    fn begin_then_finish() {
        let store = PresentationStore::default();
        let token = store.begin_run();
        assert_eq!(store.current_state(), PresentationState::Analyzing);

        assert!(store.finish(token, success("beach")));
        assert_eq!(store.current_state(), PresentationState::Done(success("beach")));
    }

    #[test]
    fn tokens_increase() {
        let store = PresentationStore::default();
        let a = store.begin_run();
        let b = store.begin_run();
        assert!(b > a);
        assert_eq!(b.get(), a.get() + 1);
    }

    #[test]
    fn done_to_analyzing_on_new_selection() {
        let store = PresentationStore::default();
        let t = store.begin_run();
        store.finish(t, success("beach"));
        store.begin_run();
        assert_eq!(store.current_state(), PresentationState::Analyzing);
    }

    // ---- stale runs ---

    #[test]
    fn discard_stale_keeps_latest_result() {
        let store = PresentationStore::new(StaleRunPolicy::DiscardStale);
        let a = store.begin_run();
        let b = store.begin_run();

        assert!(store.finish(b, success("forest")));
        assert!(!store.finish(a, success("beach")));
        assert_eq!(store.current_state(), PresentationState::Done(success("forest")));
    }

    #[test]
    fn discard_stale_keeps_analyzing_until_latest_finishes() {
        let store = PresentationStore::new(StaleRunPolicy::DiscardStale);
        let a = store.begin_run();
        let b = store.begin_run();

        assert!(!store.finish(a, success("beach")));
        assert_eq!(store.current_state(), PresentationState::Analyzing);
        assert!(store.finish(b, success("forest")));
        assert_eq!(store.current_state(), PresentationState::Done(success("forest")));
    }

    #[test]
    fn discard_stale_ignores_second_finish() {
        let store = PresentationStore::new(StaleRunPolicy::DiscardStale);
        let t = store.begin_run();
        assert!(store.finish(t, success("forest")));
        assert!(!store.finish(t, success("beach")));
        assert_eq!(store.current_state(), PresentationState::Done(success("forest")));
    }

    #[test]
    fn last_writer_wins_shows_whichever_finishes_last() {
        let store = PresentationStore::new(StaleRunPolicy::LastWriterWins);
        let a = store.begin_run();
        let b = store.begin_run();

        assert!(store.finish(b, success("forest")));
        assert!(store.finish(a, success("beach")));
        assert_eq!(store.current_state(), PresentationState::Done(success("beach")));
    }

    // ---- observers ---

    #[test]
    fn observer_sees_every_transition() {
        let store = PresentationStore::default();
        let (_sub, seen) = recorder(&store);

        let t = store.begin_run();
        store.finish(t, PredictionResult::Failure(FailureReason::Resize));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                PresentationState::Analyzing,
                PresentationState::Done(PredictionResult::Failure(FailureReason::Resize)),
            ]
        );
    }

    #[test]
    fn discarded_results_are_not_broadcast() {
        let store = PresentationStore::new(StaleRunPolicy::DiscardStale);
        let a = store.begin_run();
        let (_sub, seen) = recorder(&store);
        let b = store.begin_run();
        store.finish(a, success("beach"));
        store.finish(b, success("forest"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                PresentationState::Analyzing,
                PresentationState::Done(success("forest")),
            ]
        );
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = PresentationStore::default();
        let (sub, seen) = recorder(&store);

        store.begin_run();
        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        let t = store.begin_run();
        store.finish(t, success("beach"));

        assert_eq!(*seen.lock().unwrap(), vec![PresentationState::Analyzing]);
    }

    /// Observers may read the store; they run outside the state lock.
    #[test]
    fn observer_can_reenter_store() {
        let store = PresentationStore::default();
        let reader = store.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |_| sink.lock().unwrap().push(reader.current_state()));

        let t = store.begin_run();
        store.finish(t, success("beach"));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    /// A `begin_run` racing a slow `Done` delivery must not be overtaken by it.
    #[test]
    fn notifications_follow_commit_order() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let store = PresentationStore::default();
        let token = store.begin_run();

        let last = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&last);
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        store.subscribe(move |state| {
            if matches!(state, PresentationState::Done(_)) {
                entered_tx.lock().unwrap().send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
            }
            *sink.lock().unwrap() = Some(state.clone());
        });

        let finisher = {
            let store = store.clone();
            thread::spawn(move || store.finish(token, success("beach")))
        };
        entered_rx.recv().unwrap();

        let starter = {
            let store = store.clone();
            thread::spawn(move || store.begin_run())
        };
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        assert!(finisher.join().unwrap());
        let next = starter.join().unwrap();
        assert!(next > token);

        assert_eq!(store.current_state(), PresentationState::Analyzing);
        assert_eq!(*last.lock().unwrap(), Some(PresentationState::Analyzing));
    }

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PresentationStore>();
    }
}
