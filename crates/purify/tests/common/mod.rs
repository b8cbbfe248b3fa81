//! Shared test utilities for purify integration tests.
//!
//! This module provides:
//! - `ScriptedGateway`, an in-memory `Gateway` answering from a script
//! - `RecordingObserver`, which keeps every reported event in order

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use purify::gateway::{
    Gateway, GatewayError, JobId, PollReport, ResultLocator, StartOutcome,
};
use purify::{JobController, JobEvent, JobObserver, JobSnapshot, SourceDocument};

type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway answering from a fixed script.
///
/// Once the poll script is exhausted every further poll reports `pending`.
pub struct ScriptedGateway {
    submit: Mutex<Option<GatewayResult<JobId>>>,
    start: Mutex<Option<GatewayResult<StartOutcome>>>,
    polls: Mutex<VecDeque<GatewayResult<PollReport>>>,
    fetch: Mutex<Option<GatewayResult<Vec<u8>>>>,
    latency: Duration,
    pub submit_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            submit: Mutex::new(Some(Ok(JobId::new("job-1")))),
            start: Mutex::new(Some(Ok(StartOutcome::Pending))),
            polls: Mutex::new(VecDeque::new()),
            fetch: Mutex::new(Some(Ok(b"%PDF-clean".to_vec()))),
            latency: Duration::ZERO,
            submit_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_submit(self, result: GatewayResult<JobId>) -> Self {
        *self.submit.lock().unwrap() = Some(result);
        self
    }

    pub fn with_start(self, result: GatewayResult<StartOutcome>) -> Self {
        *self.start.lock().unwrap() = Some(result);
        self
    }

    pub fn with_polls<I>(self, polls: I) -> Self
    where
        I: IntoIterator<Item = GatewayResult<PollReport>>,
    {
        self.polls.lock().unwrap().extend(polls);
        self
    }

    pub fn with_fetch(self, result: GatewayResult<Vec<u8>>) -> Self {
        *self.fetch.lock().unwrap() = Some(result);
        self
    }

    /// Delay applied to every call before it answers.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn polls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn submit(&self, _document: &SourceDocument) -> GatewayResult<JobId> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await;
        let scripted = self.submit.lock().unwrap().take();
        scripted.unwrap_or_else(|| panic!("submit called more than once"))
    }

    async fn start(&self, _job: &JobId) -> GatewayResult<StartOutcome> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await;
        let scripted = self.start.lock().unwrap().take();
        scripted.unwrap_or_else(|| panic!("start called more than once"))
    }

    async fn poll(&self, _job: &JobId) -> GatewayResult<PollReport> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await;
        let scripted = self.polls.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(PollReport::pending(None)))
    }

    async fn fetch_result(&self, _job: &JobId) -> GatewayResult<Vec<u8>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await;
        let scripted = self.fetch.lock().unwrap().take();
        scripted.unwrap_or_else(|| Ok(Vec::new()))
    }

    fn result_locator(&self, job: &JobId) -> ResultLocator {
        ResultLocator::new(format!("scripted://download/{}", job))
    }
}

/// Observer keeping every event it sees.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<JobEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn snapshots(&self) -> Vec<JobSnapshot> {
        self.events()
            .iter()
            .map(|event| event.snapshot().clone())
            .collect()
    }
}

impl JobObserver for RecordingObserver {
    fn report(&self, event: &JobEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn pdf(name: &str) -> SourceDocument {
    SourceDocument::new(name, b"%PDF-1.7 test".to_vec())
}

/// Controller over `gateway` with default timings and a recording observer.
pub fn controller_with(
    gateway: ScriptedGateway,
) -> (JobController, Arc<ScriptedGateway>, Arc<RecordingObserver>) {
    let gateway = Arc::new(gateway);
    let observer = Arc::new(RecordingObserver::default());
    let controller = JobController::with_observer(
        gateway.clone(),
        Default::default(),
        observer.clone(),
    );
    (controller, gateway, observer)
}
