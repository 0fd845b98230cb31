//! Client-side analysis state machine.
//!
//! ```text
//! Idle --select_file--> Selected --submit--> Analyzing(0..=100) --> Result(record)
//!                                                              \--> Error(reason)
//! Result | Error --reset--> Idle
//! ```
//!
//! A `Result` is only entered once the record store has confirmed the insert.
//! Classification alone never produces a visible result.

use crate::auth::AuthSession;
use crate::classifier::Classifier;
use crate::model::{
    AnalysisRequest, ImageSelection, NewPrediction, PlantCategory, PredictionRecord,
};
use crate::progress::{CancelHandle, InstantTicker, ProgressSchedule, Ticker};
use crate::stats::{STATS_WINDOW, StatsSnapshot};
use crate::store::{DEFAULT_HISTORY_LIMIT, RecordStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    Idle,
    Selected,
    Analyzing { progress: u8 },
    Result(PredictionRecord),
    Error(AnalysisError),
}

/// Faults that end an attempt. The operator must reset before retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("Please sign in to analyze plant images")]
    AuthenticationRequired,
    #[error("Classification failed: {0}")]
    ClassificationFailed(String),
    #[error("Could not save the analysis: {0}")]
    PersistenceFailed(String),
}

/// Precondition gates. These leave the state untouched and are not shown as
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationRejected {
    #[error("selected file is not an image")]
    NotAnImage,
    #[error("no image selected")]
    MissingImage,
    #[error("no plant type selected")]
    MissingCategory,
    #[error("an analysis is already running")]
    AnalysisInFlight,
    #[error("reset before starting another analysis")]
    AwaitingReset,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Please sign in to view your history")]
    AuthenticationRequired,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one stats load: the snapshot and the newest records for history.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsUpdate {
    pub snapshot: StatsSnapshot,
    pub recent: Vec<PredictionRecord>,
}

#[derive(Clone)]
pub struct StatsLoader {
    store: Arc<dyn RecordStore>,
    auth: Arc<dyn AuthSession>,
}

impl StatsLoader {
    pub async fn load(&self) -> Result<StatsUpdate, RefreshError> {
        let user = self
            .auth
            .current_user()
            .await
            .ok_or(RefreshError::AuthenticationRequired)?;
        let total = self.store.count_by_owner(user.id).await?;
        let window = self.store.list_by_owner(user.id, STATS_WINDOW).await?;
        let snapshot = StatsSnapshot::compute(total, &window);
        let recent = window.into_iter().take(DEFAULT_HISTORY_LIMIT).collect();
        Ok(StatsUpdate { snapshot, recent })
    }
}

pub struct AnalysisController {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn RecordStore>,
    auth: Arc<dyn AuthSession>,
    ticker: Arc<dyn Ticker>,
    schedule: ProgressSchedule,
    cancel: CancelHandle,
    progress_sink: Option<Box<dyn Fn(u8)>>,

    state: ControllerState,
    selection: Option<ImageSelection>,
    category: Option<PlantCategory>,
    stats: Option<StatsSnapshot>,
    recent: Vec<PredictionRecord>,
}

impl AnalysisController {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn RecordStore>,
        auth: Arc<dyn AuthSession>,
    ) -> Self {
        Self {
            classifier,
            store,
            auth,
            ticker: Arc::new(InstantTicker),
            schedule: ProgressSchedule::default(),
            cancel: CancelHandle::default(),
            progress_sink: None,
            state: ControllerState::Idle,
            selection: None,
            category: None,
            stats: None,
            recent: Vec::new(),
        }
    }

    pub fn with_ticker(mut self, ticker: Arc<dyn Ticker>, schedule: ProgressSchedule) -> Self {
        self.ticker = ticker;
        self.schedule = schedule;
        self
    }

    /// Called with every progress value while analyzing.
    pub fn on_progress(mut self, sink: impl Fn(u8) + 'static) -> Self {
        self.progress_sink = Some(Box::new(sink));
        self
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn selection(&self) -> Option<&ImageSelection> {
        self.selection.as_ref()
    }

    pub fn category(&self) -> Option<PlantCategory> {
        self.category
    }

    pub fn progress(&self) -> u8 {
        match self.state {
            ControllerState::Analyzing { progress } => progress,
            _ => 0,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self.state, ControllerState::Analyzing { .. })
    }

    pub fn can_submit(&self) -> bool {
        matches!(self.state, ControllerState::Idle | ControllerState::Selected)
            && self.selection.is_some()
            && self.category.is_some()
    }

    pub fn stats(&self) -> Option<&StatsSnapshot> {
        self.stats.as_ref()
    }

    pub fn recent(&self) -> &[PredictionRecord] {
        &self.recent
    }

    /// Handle for logically cancelling the running submission. A cancelled
    /// submission discards whatever arrives and ends in `Idle`.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn select_file(&mut self, image: ImageSelection) -> Result<(), ValidationRejected> {
        self.ensure_editable()?;
        if !image.is_image() {
            log::debug!(
                "Ignoring {} with media type {}",
                image.file_name,
                image.media_type
            );
            return Err(ValidationRejected::NotAnImage);
        }
        log::debug!("Selected {} ({})", image.file_name, image.size_label());
        self.selection = Some(image);
        self.state = ControllerState::Selected;
        Ok(())
    }

    pub fn set_category(&mut self, category: Option<PlantCategory>) -> Result<(), ValidationRejected> {
        self.ensure_editable()?;
        self.category = category;
        Ok(())
    }

    /// Runs one analysis attempt to completion.
    ///
    /// Returns `Err` only when a precondition blocks the attempt; faults during
    /// the attempt end in [`ControllerState::Error`].
    pub async fn submit(&mut self) -> Result<(), ValidationRejected> {
        match self.state {
            ControllerState::Analyzing { .. } => return Err(ValidationRejected::AnalysisInFlight),
            ControllerState::Result(_) | ControllerState::Error(_) => {
                return Err(ValidationRejected::AwaitingReset);
            }
            ControllerState::Idle | ControllerState::Selected => {}
        }
        if self.selection.is_none() {
            return Err(ValidationRejected::MissingImage);
        }
        let Some(category) = self.category else {
            return Err(ValidationRejected::MissingCategory);
        };

        // A cancel issued while nothing was running must not end this attempt.
        self.cancel.clear();
        // Progress 0 is announced by the schedule itself.
        self.state = ControllerState::Analyzing { progress: 0 };

        let Some(user) = self.auth.current_user().await else {
            self.fail(AnalysisError::AuthenticationRequired);
            return Ok(());
        };

        for progress in self.schedule.steps() {
            if self.cancel.is_cancelled() {
                self.abandon();
                return Ok(());
            }
            self.set_progress(progress);
            self.ticker.tick(self.schedule.interval).await;
        }
        if self.cancel.is_cancelled() {
            self.abandon();
            return Ok(());
        }

        let Some(image) = self.selection.as_ref() else {
            self.fail(AnalysisError::ClassificationFailed("image selection was discarded".into()));
            return Ok(());
        };
        let request = AnalysisRequest { image, category };
        let classified = self.classifier.classify(&request).await;
        let result = match classified {
            Ok(result) if result.has_valid_confidence() => result,
            Ok(result) => {
                self.fail(AnalysisError::ClassificationFailed(format!(
                    "confidence {} outside [0, 1]",
                    result.confidence
                )));
                return Ok(());
            }
            Err(e) => {
                self.fail(AnalysisError::ClassificationFailed(e.to_string()));
                return Ok(());
            }
        };
        let new = NewPrediction::completed(user.id, image.image_ref.clone(), category, &result);

        if self.cancel.is_cancelled() {
            self.abandon();
            return Ok(());
        }

        let stored = self.store.insert(new).await;
        match stored {
            Ok(record) => {
                if self.cancel.is_cancelled() {
                    log::info!("Discarding stored prediction {} after cancellation", record.id);
                    self.abandon();
                    return Ok(());
                }
                log::info!(
                    "Prediction {} stored: {} ({})",
                    record.id,
                    record.predicted_label,
                    record.analysis_result().confidence_percent()
                );
                self.selection = None;
                self.state = ControllerState::Result(record);
            }
            Err(e) => self.fail(AnalysisError::PersistenceFailed(e.to_string())),
        }
        Ok(())
    }

    /// Returns to a pristine `Idle`. Cached history and stats are kept.
    pub fn reset(&mut self) {
        self.selection = None;
        self.category = None;
        self.state = ControllerState::Idle;
        self.cancel.clear();
    }

    /// Recomputes the stats snapshot and recent history from the store.
    pub async fn refresh_stats(&mut self) -> Result<&StatsSnapshot, RefreshError> {
        let update = self.stats_loader().load().await?;
        Ok(self.apply_stats(update))
    }

    /// A loader sharing this controller's store and session. It does not
    /// borrow the controller, so selection and category stay editable while
    /// it runs.
    pub fn stats_loader(&self) -> StatsLoader {
        StatsLoader {
            store: self.store.clone(),
            auth: self.auth.clone(),
        }
    }

    pub fn apply_stats(&mut self, update: StatsUpdate) -> &StatsSnapshot {
        self.recent = update.recent;
        &*self.stats.insert(update.snapshot)
    }

    fn ensure_editable(&self) -> Result<(), ValidationRejected> {
        match self.state {
            ControllerState::Idle | ControllerState::Selected => Ok(()),
            ControllerState::Analyzing { .. } => Err(ValidationRejected::AnalysisInFlight),
            ControllerState::Result(_) | ControllerState::Error(_) => {
                Err(ValidationRejected::AwaitingReset)
            }
        }
    }

    fn set_progress(&mut self, progress: u8) {
        self.state = ControllerState::Analyzing { progress };
        if let Some(sink) = &self.progress_sink {
            sink(progress);
        }
    }

    fn fail(&mut self, error: AnalysisError) {
        log::warn!("Analysis failed: {}", error);
        self.state = ControllerState::Error(error);
    }

    fn abandon(&mut self) {
        log::info!("Analysis cancelled");
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CurrentUser;
    use crate::classifier::{ClassifyError, StandInClassifier};
    use crate::model::{AnalysisResult, OwnerId, PredictionStatus};
    use crate::store::MemoryRecordStore;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    struct FixedSession {
        user: Option<CurrentUser>,
        calls: AtomicUsize,
    }

    impl FixedSession {
        fn signed_in(owner: OwnerId) -> Self {
            Self {
                user: Some(CurrentUser { id: owner }),
                calls: AtomicUsize::new(0),
            }
        }

        fn anonymous() -> Self {
            Self {
                user: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait(?Send)]
    impl AuthSession for FixedSession {
        async fn current_user(&self) -> Option<CurrentUser> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.user
        }
    }

    struct CountingClassifier {
        inner: StandInClassifier,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingClassifier {
        fn new() -> Self {
            Self {
                inner: StandInClassifier::seeded(11),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    #[async_trait(?Send)]
    impl Classifier for CountingClassifier {
        async fn classify(
            &self,
            request: &AnalysisRequest<'_>,
        ) -> Result<AnalysisResult, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClassifyError::Unavailable("model offline".into()));
            }
            self.inner.classify(request).await
        }
    }

    struct OutOfRangeClassifier;

    #[async_trait(?Send)]
    impl Classifier for OutOfRangeClassifier {
        async fn classify(
            &self,
            _request: &AnalysisRequest<'_>,
        ) -> Result<AnalysisResult, ClassifyError> {
            Ok(AnalysisResult {
                label: "Healthy".into(),
                confidence: 1.7,
            })
        }
    }

    #[derive(Default)]
    struct FaultyStore {
        inner: MemoryRecordStore,
        fail_inserts: AtomicBool,
        inserts: AtomicUsize,
    }

    #[async_trait(?Send)]
    impl RecordStore for FaultyStore {
        async fn insert(&self, record: NewPrediction) -> Result<PredictionRecord, StoreError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if self.fail_inserts.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            self.inner.insert(record).await
        }

        async fn list_by_owner(
            &self,
            owner: OwnerId,
            limit: usize,
        ) -> Result<Vec<PredictionRecord>, StoreError> {
            self.inner.list_by_owner(owner, limit).await
        }

        async fn count_by_owner(&self, owner: OwnerId) -> Result<u64, StoreError> {
            self.inner.count_by_owner(owner).await
        }
    }

    struct Harness {
        controller: AnalysisController,
        classifier: Arc<CountingClassifier>,
        store: Arc<FaultyStore>,
        session: Arc<FixedSession>,
        owner: OwnerId,
    }

    fn harness_with(classifier: CountingClassifier, session: Option<FixedSession>) -> Harness {
        let owner = OwnerId(Uuid::new_v4());
        let classifier = Arc::new(classifier);
        let store = Arc::new(FaultyStore::default());
        let session = Arc::new(session.unwrap_or_else(|| FixedSession::signed_in(owner)));
        let controller = AnalysisController::new(classifier.clone(), store.clone(), session.clone());
        Harness {
            controller,
            classifier,
            store,
            session,
            owner,
        }
    }

    fn harness() -> Harness {
        harness_with(CountingClassifier::new(), None)
    }

    fn jpeg() -> ImageSelection {
        ImageSelection::new("leaf.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    #[test]
    fn test_non_image_selection_is_ignored() {
        let mut h = harness();
        let pdf = ImageSelection::new("notes.pdf", "application/pdf", vec![1]);
        assert_eq!(h.controller.select_file(pdf), Err(ValidationRejected::NotAnImage));
        assert_eq!(h.controller.state(), &ControllerState::Idle);
        assert!(h.controller.selection().is_none());
    }

    #[test]
    fn test_select_then_change_category_stays_selected() {
        let mut h = harness();
        h.controller.select_file(jpeg()).unwrap();
        assert_eq!(h.controller.state(), &ControllerState::Selected);
        h.controller.set_category(Some(PlantCategory::Tomato)).unwrap();
        h.controller.set_category(Some(PlantCategory::Pepper)).unwrap();
        assert_eq!(h.controller.state(), &ControllerState::Selected);
        assert_eq!(h.controller.category(), Some(PlantCategory::Pepper));
        assert!(h.controller.can_submit());
    }

    #[tokio::test]
    async fn test_submit_without_category_is_noop() {
        let mut h = harness();
        h.controller.select_file(jpeg()).unwrap();

        let outcome = h.controller.submit().await;
        assert_eq!(outcome, Err(ValidationRejected::MissingCategory));
        assert_eq!(h.controller.state(), &ControllerState::Selected);
        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.inserts.load(Ordering::SeqCst), 0);
        assert_eq!(h.session.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_without_image_is_noop() {
        let mut h = harness();
        h.controller.set_category(Some(PlantCategory::Potato)).unwrap();

        let outcome = h.controller.submit().await;
        assert_eq!(outcome, Err(ValidationRejected::MissingImage));
        assert_eq!(h.controller.state(), &ControllerState::Idle);
        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_potato_submission_reports_progress_then_result() {
        let mut h = harness();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        h.controller = h.controller.on_progress(move |p| sink.borrow_mut().push(p));

        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Potato)).unwrap();
        h.controller.submit().await.unwrap();

        let expected: Vec<u8> = (0..=100).step_by(10).collect();
        assert_eq!(*seen.borrow(), expected);

        let ControllerState::Result(record) = h.controller.state() else {
            panic!("expected result, got {:?}", h.controller.state());
        };
        assert!(
            PlantCategory::Potato
                .candidates()
                .iter()
                .any(|c| c.label == record.predicted_label && c.confidence == record.confidence)
        );
        assert!(["Early Blight", "Late Blight", "Healthy"].contains(&record.predicted_label.as_str()));
        assert_eq!(record.owner_id, h.owner);
        assert_eq!(record.status, PredictionStatus::Completed);
        assert_eq!(record.plant_category, PlantCategory::Potato);
        assert!(h.controller.selection().is_none());
        assert_eq!(h.store.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(h.session.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthenticated_submit_skips_classifier() {
        let mut h = harness_with(CountingClassifier::new(), Some(FixedSession::anonymous()));
        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Tomato)).unwrap();
        h.controller.submit().await.unwrap();

        assert_eq!(
            h.controller.state(),
            &ControllerState::Error(AnalysisError::AuthenticationRequired)
        );
        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_classifier_failure_persists_nothing() {
        let mut h = harness_with(CountingClassifier::failing(), None);
        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Pepper)).unwrap();
        h.controller.submit().await.unwrap();

        assert!(matches!(
            h.controller.state(),
            ControllerState::Error(AnalysisError::ClassificationFailed(_))
        ));
        assert_eq!(h.store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_is_a_classification_failure() {
        let owner = OwnerId(Uuid::new_v4());
        let store = Arc::new(FaultyStore::default());
        let mut controller = AnalysisController::new(
            Arc::new(OutOfRangeClassifier),
            store.clone(),
            Arc::new(FixedSession::signed_in(owner)),
        );
        controller.select_file(jpeg()).unwrap();
        controller.set_category(Some(PlantCategory::Tomato)).unwrap();
        controller.submit().await.unwrap();

        assert!(matches!(
            controller.state(),
            ControllerState::Error(AnalysisError::ClassificationFailed(_))
        ));
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_fault_hides_result_and_stats() {
        let mut h = harness();
        h.store.fail_inserts.store(true, Ordering::SeqCst);
        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Potato)).unwrap();
        h.controller.submit().await.unwrap();

        assert!(matches!(
            h.controller.state(),
            ControllerState::Error(AnalysisError::PersistenceFailed(_))
        ));
        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 1);

        let stats = h.controller.refresh_stats().await.unwrap();
        assert_eq!(stats.total_predictions, 0);
        assert!(h.controller.recent().is_empty());
    }

    #[tokio::test]
    async fn test_resubmit_requires_reset() {
        let mut h = harness();
        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Tomato)).unwrap();
        h.controller.submit().await.unwrap();

        assert_eq!(h.controller.submit().await, Err(ValidationRejected::AwaitingReset));
        assert_eq!(
            h.controller.select_file(jpeg()),
            Err(ValidationRejected::AwaitingReset)
        );
        assert_eq!(h.store.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_from_every_state_is_pristine() {
        let mut h = harness();
        h.controller.reset();
        assert_pristine(&h.controller);

        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Potato)).unwrap();
        h.controller.reset();
        assert_pristine(&h.controller);

        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Potato)).unwrap();
        h.controller.submit().await.unwrap();
        assert!(matches!(h.controller.state(), ControllerState::Result(_)));
        h.controller.reset();
        assert_pristine(&h.controller);

        h.store.fail_inserts.store(true, Ordering::SeqCst);
        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Potato)).unwrap();
        h.controller.submit().await.unwrap();
        assert!(matches!(h.controller.state(), ControllerState::Error(_)));
        h.controller.reset();
        assert_pristine(&h.controller);
    }

    fn assert_pristine(controller: &AnalysisController) {
        assert_eq!(controller.state(), &ControllerState::Idle);
        assert!(controller.selection().is_none());
        assert!(controller.category().is_none());
        assert_eq!(controller.progress(), 0);
    }

    #[tokio::test]
    async fn test_count_matches_successful_submissions() {
        let mut h = harness();
        for category in [PlantCategory::Tomato, PlantCategory::Potato, PlantCategory::Pepper] {
            h.controller.select_file(jpeg()).unwrap();
            h.controller.set_category(Some(category)).unwrap();
            h.controller.submit().await.unwrap();
            assert!(matches!(h.controller.state(), ControllerState::Result(_)));
            h.controller.reset();
        }

        let first = h.controller.refresh_stats().await.unwrap().clone();
        let second = h.controller.refresh_stats().await.unwrap().clone();
        assert_eq!(first.total_predictions, 3);
        assert_eq!(first, second);
        assert_eq!(h.store.inner.count_by_owner(h.owner).await.unwrap(), 3);
        assert_eq!(h.controller.recent().len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_stats_requires_identity() {
        let mut h = harness_with(CountingClassifier::new(), Some(FixedSession::anonymous()));
        let err = h.controller.refresh_stats().await.unwrap_err();
        assert!(matches!(err, RefreshError::AuthenticationRequired));
    }

    #[tokio::test]
    async fn test_stale_cancel_does_not_abort_next_submit() {
        let mut h = harness();
        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Potato)).unwrap();
        h.controller.cancel_handle().cancel();

        h.controller.submit().await.unwrap();

        assert!(matches!(h.controller.state(), ControllerState::Result(_)));
        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stats_load_leaves_selection_editable() {
        let mut h = harness();
        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Tomato)).unwrap();
        h.controller.submit().await.unwrap();
        h.controller.reset();

        let loader = h.controller.stats_loader();
        let pending = loader.load();
        h.controller.select_file(jpeg()).unwrap();
        h.controller.set_category(Some(PlantCategory::Pepper)).unwrap();
        let update = pending.await.unwrap();

        assert_eq!(h.controller.apply_stats(update).total_predictions, 1);
        assert_eq!(h.controller.state(), &ControllerState::Selected);
        assert_eq!(h.controller.category(), Some(PlantCategory::Pepper));
        assert_eq!(h.controller.recent().len(), 1);
    }

    struct CancellingTicker {
        handle: Mutex<Option<CancelHandle>>,
        after: usize,
        ticks: AtomicUsize,
    }

    #[async_trait(?Send)]
    impl Ticker for CancellingTicker {
        async fn tick(&self, _interval: Duration) {
            let ticks = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
            if ticks == self.after {
                if let Some(handle) = self.handle.lock().unwrap().as_ref() {
                    handle.cancel();
                }
            }
        }
    }

    #[tokio::test]
    async fn test_cancellation_discards_attempt() {
        let h = harness();
        let ticker = Arc::new(CancellingTicker {
            handle: Mutex::new(None),
            after: 3,
            ticks: AtomicUsize::new(0),
        });
        let mut controller = h
            .controller
            .with_ticker(ticker.clone(), ProgressSchedule::default());
        *ticker.handle.lock().unwrap() = Some(controller.cancel_handle());

        controller.select_file(jpeg()).unwrap();
        controller.set_category(Some(PlantCategory::Tomato)).unwrap();
        controller.submit().await.unwrap();

        assert_pristine(&controller);
        assert_eq!(ticker.ticks.load(Ordering::SeqCst), 3);
        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.inserts.load(Ordering::SeqCst), 0);
        assert!(!controller.cancel_handle().is_cancelled());
    }

    struct SleepTicker;

    #[async_trait(?Send)]
    impl Ticker for SleepTicker {
        async fn tick(&self, interval: Duration) {
            tokio::time::sleep(interval).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_schedule_fast_forwards_under_paused_clock() {
        let h = harness();
        let mut controller = h
            .controller
            .with_ticker(Arc::new(SleepTicker), ProgressSchedule::default());
        controller.select_file(jpeg()).unwrap();
        controller.set_category(Some(PlantCategory::Pepper)).unwrap();

        let started = tokio::time::Instant::now();
        controller.submit().await.unwrap();

        assert!(matches!(controller.state(), ControllerState::Result(_)));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2200), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(2300), "{:?}", elapsed);
    }
}
