//! Session runtime executor

use super::{SessionHandle, SessionObserver, SessionReport};
use crate::progress::ProgressLog;
use crate::protocol::{classify, Outcome, OutcomeFailure, Request};
use crate::state_machine::{transition, Effect, Event, SessionState, TransitionError};
use crate::transport::{Channel, Connector, TransportError};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drives one request from open to settlement over any connector
pub struct SessionRuntime<'a, C, O>
where
    C: Connector,
    O: SessionObserver + ?Sized,
{
    session_id: String,
    connector: &'a C,
    endpoint: String,
    request: Request,
    observer: &'a mut O,
    state: SessionState,
    progress: ProgressLog,
    channel: Option<C::Channel>,
    outcome: Option<Outcome>,
    /// Cancelled when the caller force-closes the session
    cancel: CancellationToken,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl<'a, C, O> SessionRuntime<'a, C, O>
where
    C: Connector,
    O: SessionObserver + ?Sized,
{
    pub fn new(
        connector: &'a C,
        endpoint: impl Into<String>,
        request: Request,
        observer: &'a mut O,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            connector,
            endpoint: endpoint.into(),
            request,
            observer,
            state: SessionState::Idle,
            progress: ProgressLog::new(),
            channel: None,
            outcome: None,
            cancel: CancellationToken::new(),
            timeout: None,
            deadline: None,
        }
    }

    /// Let `handle` force-close this session
    pub fn with_handle(mut self, handle: &SessionHandle) -> Self {
        self.cancel = handle.token();
        self
    }

    /// Force-close the session if it hasn't settled within `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn run(mut self) -> SessionReport {
        tracing::info!(
            session_id = %self.session_id,
            endpoint = %self.endpoint,
            thread_id = ?self.request.thread_id,
            is_new_conversation = self.request.is_new_conversation,
            "Starting strategy session"
        );
        self.deadline = self.timeout.map(|timeout| Instant::now() + timeout);

        // Process events in a loop until a terminal transition
        self.process_event(Event::Start).await;
        while !self.state.is_settled() {
            let event = self.next_event().await;
            self.process_event(event).await;
        }

        // Every settling transition closes already; close is idempotent
        self.close_channel().await;

        let outcome = self.outcome.take().unwrap_or_else(|| {
            Outcome::Failure(OutcomeFailure::transport(
                TransportError::ClosedBeforeOutcome.to_string(),
            ))
        });

        tracing::info!(
            session_id = %self.session_id,
            success = outcome.is_success(),
            steps = self.progress.len(),
            "Strategy session settled"
        );

        SessionReport {
            session_id: self.session_id,
            outcome,
            progress: self.progress,
        }
    }

    async fn process_event(&mut self, event: Event) {
        // Effects may generate follow-up events; handle them in order
        let mut pending = VecDeque::from([event]);

        while let Some(current) = pending.pop_front() {
            let event_name = current.name();
            let result = match transition(&self.state, current) {
                Ok(r) => r,
                Err(e @ TransitionError::AlreadySettled { .. }) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        error = %e,
                        "Ignoring event after settlement"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        session_id = %self.session_id,
                        error = %e,
                        "Rejected session event"
                    );
                    continue;
                }
            };

            tracing::debug!(
                session_id = %self.session_id,
                event = event_name,
                from = ?self.state,
                to = ?result.new_state,
                "Session transition"
            );
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect).await {
                    pending.push_back(generated);
                }
            }
        }
    }

    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::OpenChannel => Some(self.open_channel().await),

            Effect::SendRequest => {
                let sent = match self.channel.as_mut() {
                    Some(channel) => channel.send_request(&self.request).await,
                    None => Err(TransportError::NotOpen),
                };
                sent.err().map(|error| Event::TransportFailed { error })
            }

            Effect::AppendProgress { step } => {
                tracing::debug!(
                    session_id = %self.session_id,
                    step = %step.kind,
                    node = ?step.node,
                    iteration = ?step.iteration,
                    "Progress step"
                );
                self.progress.append(step);
                None
            }

            Effect::NotifyProgress => {
                let summary = self.progress.summary();
                self.observer.on_progress(&summary);
                None
            }

            Effect::LogMalformed { frame } => {
                tracing::warn!(
                    session_id = %self.session_id,
                    reason = %frame.reason,
                    "Skipping malformed frame"
                );
                None
            }

            Effect::CloseChannel => {
                self.close_channel().await;
                None
            }

            Effect::Settle { outcome } => {
                if self.outcome.is_some() {
                    tracing::error!(
                        session_id = %self.session_id,
                        "Second outcome for a settled session; keeping the first"
                    );
                } else {
                    self.outcome = Some(outcome);
                }
                None
            }
        }
    }

    async fn open_channel(&mut self) -> Event {
        let opened = tokio::select! {
            biased;
            error = interrupted(&self.cancel, self.deadline) => Err(error),
            result = self.connector.open(&self.endpoint) => result,
        };

        match opened {
            Ok(channel) => {
                self.channel = Some(channel);
                Event::ChannelOpened
            }
            Err(error) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    error = %error,
                    "Failed to open channel"
                );
                Event::TransportFailed { error }
            }
        }
    }

    async fn next_event(&mut self) -> Event {
        let Some(channel) = self.channel.as_mut() else {
            return Event::TransportFailed {
                error: TransportError::NotOpen,
            };
        };

        tokio::select! {
            biased;
            error = interrupted(&self.cancel, self.deadline) => Event::TransportFailed { error },
            frame = channel.next_frame() => match frame {
                Some(Ok(text)) => match classify(&text) {
                    Ok(classified) => Event::Frame(classified),
                    Err(malformed) => Event::Malformed(malformed),
                },
                Some(Err(error)) => Event::TransportFailed { error },
                None => Event::TransportFailed {
                    error: TransportError::ClosedBeforeOutcome,
                },
            },
        }
    }

    async fn close_channel(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            channel.close().await;
        }
    }
}

/// Resolves when the caller aborts or the deadline passes
async fn interrupted(cancel: &CancellationToken, deadline: Option<Instant>) -> TransportError {
    match deadline {
        Some(deadline) => tokio::select! {
            () = cancel.cancelled() => TransportError::ClosedByCaller,
            () = tokio::time::sleep_until(deadline) => TransportError::Timeout,
        },
        None => {
            cancel.cancelled().await;
            TransportError::ClosedByCaller
        }
    }
}
