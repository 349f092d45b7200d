//! Progress Monitor: follows one task over a websocket subscription.
//!
//! # State Machine
//!
//! ```text
//! Connecting -> Subscribed -> (Progress)* -> Completed -> Closed
//!      |             |             |
//!      +-------------+-------------+--> Failed -> Closed
//! ```
//!
//! * On connect, the `subscribe:<taskId>` directive is sent once. No other
//!   directive is ever sent.
//! * Every text message is decoded and emitted as an [`Event`], in arrival
//!   order, without coalescing.
//! * `done:` moves to `Completed` and schedules `Closed` after the grace
//!   period, so the final status stays visible for a while.
//! * A transport failure or a close by the server before completion emits
//!   [`Event::Failed`] and closes immediately. There is no reconnect:
//!   progress is best-effort feedback and the job continues server-side.
//! * Cancelling the token closes the subscription from any state, sending a
//!   normal close frame if the connection is open.
//!
//! [`Event::Closed`] is always the last event of a subscription.

use std::{pin::Pin, time::Duration};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::{
    task::JoinHandle,
    time::{Instant, Sleep},
};
use tokio_tungstenite::tungstenite::{
    self,
    protocol::{frame::coding::CloseCode, CloseFrame},
    Message,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    events::{self, Event},
    protocol::progress::{Directive, Status},
    track::TaskId,
};

/// Lifecycle of a subscription.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Connecting,
    Subscribed,
    Progress,
    Completed,
    Failed,
    Closed,
}

pub struct Monitor {
    url: Url,
    connect_timeout: Duration,
    grace_period: Duration,
    event_tx: events::Sender,
    state: State,
}

/// A monitor running in the background.
///
/// Dropping the handle does not stop the monitor; call [`Handle::stop`].
#[derive(Debug)]
pub struct Handle {
    cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl Monitor {
    /// Reason sent along with the normal close frame.
    const CLOSE_REASON: &'static str = "Done";

    #[must_use]
    pub fn new(config: &Config, event_tx: events::Sender) -> Self {
        Self {
            url: config.progress_url.clone(),
            connect_timeout: config.connect_timeout,
            grace_period: config.grace_period,
            event_tx,
            state: State::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Runs the monitor for `task_id` on the runtime.
    #[must_use]
    pub fn spawn(mut self, task_id: TaskId) -> Handle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(&task_id, &token).await });

        Handle { cancel, task }
    }

    /// Connects and follows `task_id` until the subscription closes.
    ///
    /// # Errors
    ///
    /// Returns `StreamFailure` if the connection could not be established,
    /// or failed or was closed by the server before the task completed.
    /// Completion and cancellation return `Ok`.
    pub async fn run(&mut self, task_id: &TaskId, cancel: &CancellationToken) -> Result<()> {
        self.transition(State::Connecting);

        let url = self.url.to_string();
        debug!("connecting to {url}");
        let connect = tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url));

        let mut stream = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                self.close();
                return Ok(());
            }

            result = connect => match result {
                Ok(Ok((stream, _))) => stream,
                Ok(Err(e)) => return self.fail(e.to_string()),
                Err(e) => return self.fail(format!("connecting timed out ({e})")),
            }
        };

        self.drive(&mut stream, task_id, cancel).await
    }

    /// Follows `task_id` over an established connection.
    ///
    /// # Errors
    ///
    /// See [`Monitor::run`].
    pub async fn drive<S>(
        &mut self,
        stream: &mut S,
        task_id: &TaskId,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        S: Stream<Item = std::result::Result<Message, tungstenite::Error>>
            + Sink<Message, Error = tungstenite::Error>
            + Unpin,
    {
        let directive = Directive::Subscribe(task_id.clone()).to_string();
        debug!("sending {directive}");
        if let Err(e) = stream.send(Message::text(directive)).await {
            return self.fail(e.to_string());
        }

        self.transition(State::Subscribed);
        self.emit(Event::Subscribed {
            task_id: task_id.clone(),
        });

        // Armed when the task completes.
        let grace = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(grace);

        let mut open = true;
        loop {
            tokio::select! {
                // Prioritize teardown.
                biased;

                () = cancel.cancelled() => {
                    debug!("subscription to {task_id} stopped");
                    if open {
                        Self::close_stream(stream).await;
                    }
                    self.close();
                    return Ok(());
                }

                () = &mut grace, if self.state == State::Completed => {
                    if open {
                        Self::close_stream(stream).await;
                    }
                    self.close();
                    return Ok(());
                }

                message = stream.next(), if open => {
                    let detail = match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!("received: {}", text.as_str());
                            self.handle_text(text.as_str(), grace.as_mut());
                            continue;
                        }
                        Some(Ok(Message::Close(frame))) => match frame {
                            Some(frame) if !frame.reason.is_empty() => {
                                format!("connection closed by server: {}", frame.reason.as_str())
                            }
                            _ => "connection closed by server".to_owned(),
                        },
                        Some(Ok(other)) => {
                            // Pings are answered by the websocket layer.
                            trace!("ignoring {other:?}");
                            continue;
                        }
                        Some(Err(e)) => e.to_string(),
                        None => "connection closed".to_owned(),
                    };

                    open = false;
                    if self.state != State::Completed {
                        return self.fail(detail);
                    }

                    // Keep the final status up for the rest of the grace period.
                    debug!("{detail} after completion");
                }
            }
        }
    }

    fn handle_text(&mut self, text: &str, grace: Pin<&mut Sleep>) {
        let status = Status::parse(text);
        match status {
            Status::Progress { .. } => {
                if matches!(self.state, State::Subscribed | State::Progress) {
                    self.transition(State::Progress);
                }
            }
            Status::Done { .. } => {
                // A repeated `done:` does not extend the grace period.
                if self.state != State::Completed {
                    self.transition(State::Completed);
                    grace.reset(Instant::now() + self.grace_period);
                }
            }
            Status::Other { .. } => {}
        }

        self.emit(status.into());
    }

    async fn close_stream<S>(stream: &mut S)
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: Self::CLOSE_REASON.into(),
        };
        if let Err(e) = stream.send(Message::Close(Some(frame))).await {
            debug!("error closing subscription: {e}");
        }
    }

    fn fail(&mut self, detail: String) -> Result<()> {
        warn!("progress subscription failed: {detail}");
        self.transition(State::Failed);
        self.emit(Event::Failed {
            detail: detail.clone(),
        });
        self.close();

        Err(Error::stream_failure(detail))
    }

    fn close(&mut self) {
        self.transition(State::Closed);
        self.emit(Event::Closed);
    }

    fn transition(&mut self, state: State) {
        if self.state != state {
            debug!("subscription: {:?} -> {state:?}", self.state);
            self.state = state;
        }
    }

    fn emit(&self, event: Event) {
        if self.event_tx.send(event).is_err() {
            trace!("event observer is gone");
        }
    }
}

impl Handle {
    /// Force-closes the subscription from any state and waits for it.
    ///
    /// # Errors
    ///
    /// Returns the monitor's error if it had already failed.
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        self.task.await?
    }

    /// Waits for the subscription to close by itself.
    ///
    /// If this future is dropped before it completes, the monitor keeps
    /// running and the handle can still [`stop`](Handle::stop) it. Once this
    /// has returned, the handle must not be joined or stopped again.
    ///
    /// # Errors
    ///
    /// See [`Monitor::run`].
    pub async fn join(&mut self) -> Result<()> {
        (&mut self.task).await?
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
