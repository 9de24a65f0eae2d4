//! Strategy client: the caller-facing entry point
//!
//! Owns what outlives a single session: the conversation thread, the busy
//! flag and the last progress log. Each submission builds one request, runs
//! one session (streaming or blocking) and settles it through the same
//! post-settlement path.

use crate::config::ClientConfig;
use crate::fallback::{FallbackClient, FallbackError};
use crate::progress::ProgressLog;
use crate::protocol::{Outcome, OutcomeFailure, Request, RequestError, StrategyParams};
use crate::runtime::{SessionHandle, SessionObserver, SessionReport, SessionRuntime};
use crate::transport::{Connector, TransportError, WsConnector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Rejections that happen before any channel is opened
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("A strategy request is already in flight")]
    Busy,
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error(transparent)]
    Setup(#[from] FallbackError),
}

// ============================================================================
// Conversation thread
// ============================================================================

/// Continuity between consecutive requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationThread {
    thread_id: Option<String>,
    is_new_conversation: bool,
}

impl ConversationThread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a thread the server handed out earlier
    pub fn continuing(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            is_new_conversation: false,
        }
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn is_new_conversation(&self) -> bool {
        self.is_new_conversation
    }

    pub fn request_for(&self, params: StrategyParams) -> Request {
        Request::from_params(params, self.thread_id.clone(), self.is_new_conversation)
    }

    /// Adopt the thread id from a successful run. Empty ids change nothing.
    pub fn record_success(&mut self, thread_id: &str) -> bool {
        if thread_id.is_empty() {
            return false;
        }
        self.thread_id = Some(thread_id.to_string());
        self.is_new_conversation = false;
        true
    }

    /// Forget the thread; the next request starts a new conversation
    pub fn reset(&mut self) {
        self.thread_id = None;
        self.is_new_conversation = true;
    }
}

// ============================================================================
// Busy flag
// ============================================================================

/// Shared view of whether a request is in flight
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: self.clone() })
    }
}

/// Clears the flag when dropped, on every exit path
struct BusyGuard {
    flag: BusyFlag,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.0.store(false, Ordering::Release);
    }
}

/// One accepted submission. Dropping it clears the abort handle, then the
/// busy flag.
struct InFlight<'a> {
    active: &'a Mutex<Option<SessionHandle>>,
    handle: SessionHandle,
    _busy: BusyGuard,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.active).take();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Client
// ============================================================================

pub struct StrategyClient<C: Connector = WsConnector> {
    config: ClientConfig,
    connector: C,
    fallback: FallbackClient,
    conversation: Mutex<ConversationThread>,
    progress: Mutex<ProgressLog>,
    busy: BusyFlag,
    active: Mutex<Option<SessionHandle>>,
}

impl StrategyClient<WsConnector> {
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let connector = WsConnector::new(config.connect_timeout);
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> StrategyClient<C> {
    pub fn with_connector(config: ClientConfig, connector: C) -> Result<Self, ClientError> {
        let fallback = FallbackClient::new(config.http_endpoint(), config.http_timeout)?;
        Ok(Self {
            config,
            connector,
            fallback,
            conversation: Mutex::new(ConversationThread::new()),
            progress: Mutex::new(ProgressLog::new()),
            busy: BusyFlag::default(),
            active: Mutex::new(None),
        })
    }

    /// Start from an existing conversation instead of a fresh one
    #[must_use]
    pub fn with_conversation(self, conversation: ConversationThread) -> Self {
        *lock(&self.conversation) = conversation;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stream one request. Progress goes to `observer` as it arrives, then
    /// exactly one of `on_done`/`on_fail`.
    pub async fn submit<O>(
        &self,
        params: StrategyParams,
        observer: &mut O,
    ) -> Result<SessionReport, ClientError>
    where
        O: SessionObserver + ?Sized,
    {
        let in_flight = self.begin()?;
        let request = self.build_request(params)?;
        lock(&self.progress).clear();

        let report = SessionRuntime::new(
            &self.connector,
            self.config.ws_endpoint(),
            request,
            observer,
        )
        .with_handle(&in_flight.handle)
        .with_timeout(self.config.session_timeout)
        .run()
        .await;

        *lock(&self.progress) = report.progress.clone();
        self.settle(&report.outcome, observer);
        Ok(report)
    }

    /// Same contract as `submit` over the blocking endpoint; no progress
    /// arrives before the outcome.
    pub async fn submit_blocking<O>(
        &self,
        params: StrategyParams,
        observer: &mut O,
    ) -> Result<SessionReport, ClientError>
    where
        O: SessionObserver + ?Sized,
    {
        let in_flight = self.begin()?;
        let request = self.build_request(params)?;
        lock(&self.progress).clear();

        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            session_id = %session_id,
            thread_id = ?request.thread_id,
            "Starting blocking strategy request"
        );

        let cancel = in_flight.handle.token();

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Outcome::Failure(OutcomeFailure::transport(
                TransportError::ClosedByCaller.to_string(),
            )),
            outcome = self.fallback.generate(&request) => outcome,
        };

        self.settle(&outcome, observer);
        Ok(SessionReport {
            session_id,
            outcome,
            progress: ProgressLog::new(),
        })
    }

    /// Drop continuity; the next request starts a new conversation
    pub fn reset_conversation(&self) {
        lock(&self.conversation).reset();
        lock(&self.progress).clear();
        tracing::info!("Conversation reset");
    }

    /// Force-close the in-flight request, if any
    pub fn abort(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn thread_id(&self) -> Option<String> {
        lock(&self.conversation).thread_id().map(str::to_owned)
    }

    pub fn conversation(&self) -> ConversationThread {
        lock(&self.conversation).clone()
    }

    /// Progress log of the most recently settled request
    pub fn progress(&self) -> ProgressLog {
        lock(&self.progress).clone()
    }

    /// Mark the client busy with the abort handle already installed, so an
    /// `abort` that sees the flag always finds the handle
    fn begin(&self) -> Result<InFlight<'_>, ClientError> {
        let mut active = lock(&self.active);
        let busy = self.busy.try_acquire().ok_or(ClientError::Busy)?;
        let handle = SessionHandle::new();
        *active = Some(handle.clone());
        Ok(InFlight {
            active: &self.active,
            handle,
            _busy: busy,
        })
    }

    fn build_request(&self, params: StrategyParams) -> Result<Request, ClientError> {
        let request = lock(&self.conversation).request_for(params);
        request.validate()?;
        Ok(request)
    }

    fn settle<O>(&self, outcome: &Outcome, observer: &mut O)
    where
        O: SessionObserver + ?Sized,
    {
        match outcome {
            Outcome::Success(result) => {
                if lock(&self.conversation).record_success(&result.thread_id) {
                    tracing::debug!(thread_id = %result.thread_id, "Conversation continues");
                }
                observer.on_done(result);
            }
            Outcome::Failure(failure) => {
                tracing::warn!(
                    kind = ?failure.kind,
                    error = %failure.message,
                    "Strategy request failed"
                );
                observer.on_fail(failure);
            }
        }
    }
}
