//! The job controller: single owner of job state.
//!
//! Every job run is one spawned task tagged with a generation number and a
//! cancellation token. All mutations go through [`Shared::apply`], which
//! drops updates whose generation is no longer current, so a response that
//! arrives after `cancel`/`reset` is a no-op.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{interval_at, sleep, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::error::{ControllerError, FailureKind, JobFailure};
use super::events::{JobEvent, JobObserver, NoopObserver};
use super::settings::ControllerSettings;
use super::state::{JobSnapshot, JobState, Phase, Progress, Stage};
use super::strategy::{PollingLoop, ProgressStrategy, SimulatedSteps};
use crate::document::SourceDocument;
use crate::gateway::{Gateway, GatewayError, JobId, RemoteStatus, ResultLocator, StartOutcome};

/// Orchestrates upload, start, progress observation and the terminal outcome
/// of one job at a time.
///
/// Cloning yields another handle to the same job.
#[derive(Clone)]
pub struct JobController {
    shared: Arc<Shared>,
}

struct Shared {
    gateway: Arc<dyn Gateway>,
    settings: ControllerSettings,
    observer: Arc<dyn JobObserver>,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<JobSnapshot>,
}

struct Inner {
    state: JobState,
    source: Option<Arc<SourceDocument>>,
    generation: u64,
    run: Option<ActiveRun>,
}

/// Handle on the running task's timers and in-flight calls.
///
/// Dropping it cancels the token, so clearing `Inner::run` on any exit path
/// stops the interval, the deadline and any pending gateway call together.
struct ActiveRun {
    generation: u64,
    cancel: CancellationToken,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        debug!(generation = self.generation, "releasing job run");
        self.cancel.cancel();
    }
}

impl JobController {
    pub fn new(gateway: Arc<dyn Gateway>, settings: ControllerSettings) -> Self {
        Self::with_observer(gateway, settings, Arc::new(NoopObserver))
    }

    pub fn with_observer(
        gateway: Arc<dyn Gateway>,
        settings: ControllerSettings,
        observer: Arc<dyn JobObserver>,
    ) -> Self {
        let (snapshots, _) = watch::channel(JobSnapshot::idle());
        Self {
            shared: Arc::new(Shared {
                gateway,
                settings,
                observer,
                inner: Mutex::new(Inner {
                    state: JobState::Idle,
                    source: None,
                    generation: 0,
                    run: None,
                }),
                snapshots,
            }),
        }
    }

    /// Current state.
    pub fn snapshot(&self) -> JobSnapshot {
        let inner = self.shared.lock();
        self.shared.capture(&inner)
    }

    /// Stream of snapshots, one per applied transition.
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Document of the current job, kept for preview until `reset`.
    pub fn source_document(&self) -> Option<Arc<SourceDocument>> {
        self.shared.lock().source.clone()
    }

    /// Starts a job for an already validated document.
    ///
    /// Requires the `Idle` phase and a tokio runtime. Issues exactly one
    /// upload and returns the generation assigned to the run.
    pub fn submit_document(&self, document: SourceDocument) -> Result<u64, ControllerError> {
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;

        let mut inner = self.shared.lock();
        let phase = inner.state.phase();
        if phase != Phase::Idle {
            return Err(ControllerError::InvalidPhase {
                operation: "submit a document",
                phase,
            });
        }

        inner.generation += 1;
        let generation = inner.generation;
        let cancel = CancellationToken::new();
        inner.run = Some(ActiveRun {
            generation,
            cancel: cancel.clone(),
        });

        let document = Arc::new(document);
        inner.source = Some(Arc::clone(&document));
        self.shared.set_state(
            &mut inner,
            JobState::Uploading {
                progress: Progress::ZERO,
            },
        );

        let span = info_span!("job", generation, filename = %document.filename());
        runtime.spawn(
            Arc::clone(&self.shared)
                .drive(generation, cancel, document)
                .instrument(span),
        );

        Ok(generation)
    }

    /// Abandons the job in flight and returns to `Idle`.
    ///
    /// No-op when idle. Terminal phases are left with [`reset`](Self::reset).
    pub fn cancel(&self) -> Result<(), ControllerError> {
        let mut inner = self.shared.lock();
        let phase = inner.state.phase();
        if phase == Phase::Idle {
            return Ok(());
        }
        if phase.is_terminal() {
            return Err(ControllerError::InvalidPhase {
                operation: "cancel",
                phase,
            });
        }

        info!(generation = inner.generation, %phase, "cancelling job");
        Shared::invalidate(&mut inner);
        self.shared.set_state(&mut inner, JobState::Idle);
        Ok(())
    }

    /// Returns to `Idle` from any phase and drops the source document.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        let phase = inner.state.phase();
        debug!(generation = inner.generation, %phase, "resetting job");

        Shared::invalidate(&mut inner);
        inner.source = None;
        if phase == Phase::Idle {
            let snapshot = self.shared.capture(&inner);
            self.shared.snapshots.send_replace(snapshot);
        } else {
            self.shared.set_state(&mut inner, JobState::Idle);
        }
    }

    /// Waits until the job completes, fails or is cancelled.
    ///
    /// Resolves immediately when no job is in flight.
    pub async fn wait_until_settled(&self) -> JobSnapshot {
        let mut snapshots = self.subscribe();
        let settled = match snapshots.wait_for(JobSnapshot::is_settled).await {
            Ok(snapshot) => Some(snapshot.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.snapshot())
    }

    /// Downloads the artifact of a completed job. Does not change state.
    pub async fn fetch_result(&self) -> Result<Vec<u8>, ControllerError> {
        let job_id = {
            let inner = self.shared.lock();
            match &inner.state {
                JobState::Completed { job_id, .. } => job_id.clone(),
                other => {
                    return Err(ControllerError::InvalidPhase {
                        operation: "fetch the result",
                        phase: other.phase(),
                    })
                }
            }
        };

        self.shared.gateway.fetch_result(&job_id).await.map_err(|e| {
            warn!(job_id = %job_id, error = %e, "result download failed");
            ControllerError::Failed(JobFailure::from_gateway(FailureKind::Fetch, &e))
        })
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn capture(&self, inner: &Inner) -> JobSnapshot {
        JobSnapshot::capture(
            &inner.state,
            inner.generation,
            inner.source.as_deref().map(SourceDocument::filename),
        )
    }

    /// Makes every callback of the current run stale.
    fn invalidate(inner: &mut Inner) {
        inner.generation += 1;
        inner.run = None;
    }

    /// Replaces the state and reports the transition. Caller holds the lock.
    fn set_state(&self, inner: &mut Inner, next: JobState) {
        if inner.state == next {
            return;
        }

        let previous = inner.state.phase();
        inner.state = next;
        let phase = inner.state.phase();
        if !phase.is_active() {
            inner.run = None;
        }

        let snapshot = self.capture(inner);
        let event = match phase {
            Phase::Completed => JobEvent::Completed(snapshot.clone()),
            Phase::Error => JobEvent::Failed(snapshot.clone()),
            _ if phase != previous => JobEvent::Phase(snapshot.clone()),
            _ => JobEvent::Progress(snapshot.clone()),
        };

        match &event {
            JobEvent::Failed(s) => warn!(
                generation = s.generation,
                kind = ?s.failure.as_ref().map(|f| f.kind),
                error = s.failure.as_ref().map(|f| f.message.as_str()).unwrap_or_default(),
                "job failed"
            ),
            JobEvent::Progress(s) => debug!(
                generation = s.generation,
                progress = ?s.progress,
                stage = ?s.stage,
                "job progress"
            ),
            other => info!(
                generation = other.snapshot().generation,
                from = %previous,
                to = %phase,
                "job phase changed"
            ),
        }

        self.snapshots.send_replace(snapshot);
        self.observer.report(&event);
    }

    /// Applies `update` if `generation` still owns the job.
    ///
    /// Returns `false` for stale callers, which must stop driving the job.
    /// `update` returning `None` leaves the state untouched.
    fn apply<F>(&self, generation: u64, update: F) -> bool
    where
        F: FnOnce(&JobState) -> Option<JobState>,
    {
        let mut inner = self.lock();
        let current = inner.run.as_ref().map(|run| run.generation);
        if inner.generation != generation || current != Some(generation) {
            debug!(
                generation,
                current = inner.generation,
                "discarding stale job update"
            );
            return false;
        }

        if let Some(next) = update(&inner.state) {
            self.set_state(&mut inner, next);
        }
        true
    }

    async fn drive(
        self: Arc<Self>,
        generation: u64,
        cancel: CancellationToken,
        document: Arc<SourceDocument>,
    ) {
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = self.gateway.submit(&document) => result,
        };
        let Some(job_id) = self.on_upload_settled(generation, submitted) else {
            return;
        };
        let processing_started = Instant::now();

        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = self.gateway.start(&job_id) => result,
        };
        let Some(strategy) =
            self.on_start_settled(generation, &job_id, started, processing_started)
        else {
            return;
        };

        match strategy {
            ProgressStrategy::Simulated(steps) => {
                self.run_simulated(generation, &cancel, steps).await
            }
            ProgressStrategy::Polling(polling) => {
                self.run_polling(generation, &cancel, &job_id, polling).await
            }
        }
    }

    /// Stores the job id and enters `Processing`, or fails with an upload error.
    fn on_upload_settled(
        &self,
        generation: u64,
        outcome: Result<JobId, GatewayError>,
    ) -> Option<JobId> {
        match outcome {
            Ok(job_id) => {
                info!(job_id = %job_id, "upload accepted, starting job");
                let next = job_id.clone();
                let applied = self.apply(generation, move |state| match state {
                    JobState::Uploading { progress } => Some(JobState::Processing {
                        job_id: next,
                        progress: progress.advance_to(Stage::Analyzing.progress()),
                        strategy: None,
                    }),
                    _ => None,
                });
                applied.then_some(job_id)
            }
            Err(e) => {
                self.fail(generation, JobFailure::from_gateway(FailureKind::Upload, &e));
                None
            }
        }
    }

    /// Selects the progress strategy, or fails with a start error.
    fn on_start_settled(
        &self,
        generation: u64,
        job_id: &JobId,
        outcome: Result<StartOutcome, GatewayError>,
        processing_started: Instant,
    ) -> Option<ProgressStrategy> {
        match outcome {
            Ok(outcome) => {
                let strategy =
                    ProgressStrategy::select(outcome, &self.settings, processing_started);
                let kind = strategy.kind();
                info!(job_id = %job_id, strategy = ?kind, "job started");
                let applied = self.apply(generation, |state| match state {
                    JobState::Processing {
                        job_id, progress, ..
                    } => Some(JobState::Processing {
                        job_id: job_id.clone(),
                        progress: *progress,
                        strategy: Some(kind),
                    }),
                    _ => None,
                });
                applied.then_some(strategy)
            }
            Err(e) => {
                self.fail(generation, JobFailure::from_gateway(FailureKind::Start, &e));
                None
            }
        }
    }

    async fn run_simulated(
        &self,
        generation: u64,
        cancel: &CancellationToken,
        steps: SimulatedSteps,
    ) {
        for (stage, delay) in steps.schedule() {
            if !self.advance(generation, stage.progress()) {
                return;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = sleep(delay) => {}
            }
        }
        self.complete(generation, steps.result);
    }

    async fn run_polling(
        &self,
        generation: u64,
        cancel: &CancellationToken,
        job_id: &JobId,
        polling: PollingLoop,
    ) {
        let deadline = sleep_until(polling.deadline);
        tokio::pin!(deadline);

        let mut ticker = interval_at(Instant::now() + polling.interval, polling.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut polls: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = &mut deadline => {
                    self.fail(generation, JobFailure::timeout(polling.deadline_after));
                    return;
                }
                _ = ticker.tick() => {}
            }

            polls += 1;
            let report = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = &mut deadline => {
                    self.fail(generation, JobFailure::timeout(polling.deadline_after));
                    return;
                }
                report = self.gateway.poll(job_id) => report,
            };

            let report = match report {
                Ok(report) => report,
                Err(e) => {
                    self.fail(generation, JobFailure::from_gateway(FailureKind::Poll, &e));
                    return;
                }
            };
            debug!(polls, status = ?report.status, progress = ?report.progress, "poll settled");

            if let Some(progress) = report.progress {
                if !self.advance(generation, Progress::new(progress)) {
                    return;
                }
            }

            match report.status {
                RemoteStatus::Pending => {}
                RemoteStatus::Completed => {
                    self.complete(generation, self.gateway.result_locator(job_id));
                    return;
                }
                RemoteStatus::Failed => {
                    self.fail(generation, JobFailure::processing(report.message));
                    return;
                }
            }
        }
    }

    /// Raises progress while `Processing`.
    fn advance(&self, generation: u64, target: Progress) -> bool {
        self.apply(generation, |state| match state {
            JobState::Processing {
                job_id,
                progress,
                strategy,
            } => Some(JobState::Processing {
                job_id: job_id.clone(),
                progress: progress.advance_to(target),
                strategy: *strategy,
            }),
            _ => None,
        })
    }

    fn complete(&self, generation: u64, result: ResultLocator) {
        self.apply(generation, |state| match state {
            JobState::Processing { job_id, .. } => Some(JobState::Completed {
                job_id: job_id.clone(),
                result,
            }),
            _ => None,
        });
    }

    fn fail(&self, generation: u64, failure: JobFailure) {
        self.apply(generation, |state| {
            state.phase().is_active().then(|| JobState::Error {
                job_id: state.job_id().cloned(),
                failure,
            })
        });
    }
}
