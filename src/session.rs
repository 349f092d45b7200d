//! Orchestrator: one link handling session, from shared text to progress.
//!
//! A session runs its stages in strict sequence:
//!
//! 1. **Resolving** - the shared text is pre-filtered to an accepted link
//!    and resolved into tracks
//! 2. **Selecting** - the caller edits the [`SelectionState`]
//! 3. **Submitting** - a snapshot of the selections is submitted as a job
//! 4. **Monitoring** - the job's progress is followed until the
//!    subscription closes
//!
//! Every error is converted into a user-visible [`Event::Notice`] and, except
//! for an empty selection, aborts the session. Nothing is retried.
//!
//! # Cancellation
//!
//! [`Session::abort`] is safe to call at any stage. Network calls run as
//! detached tasks: dropping a pending [`Session::open`] or
//! [`Session::submit`] lets the request complete and discards its result,
//! while an active subscription is closed with a normal close frame.
//!
//! # Example
//!
//! ```no_run
//! use sharelink::{config::Config, events, session::Session};
//!
//! # async fn example() -> sharelink::error::Result<()> {
//! let (event_tx, mut event_rx) = events::channel();
//! let mut session = Session::new(Config::default(), event_tx)?;
//!
//! let selection = session.open("https://youtu.be/abc123").await?;
//! selection.set_variant(0, 1)?;
//! session.submit().await?;
//!
//! while let Some(event) = event_rx.recv().await {
//!     println!("{event}");
//!     if event.is_closed() {
//!         break;
//!     }
//! }
//! session.finish().await
//! # }
//! ```

use std::{fmt, sync::Arc};

use crate::{
    config::Config,
    error::{Error, ErrorKind, Result},
    events::{self, Event},
    http,
    link::{self, Rejection},
    monitor::{self, Monitor},
    resolver::Resolver,
    selection::SelectionState,
    submission::Submitter,
    track::TaskId,
};

/// Stage marker of a session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    #[default]
    Idle,
    Resolving,
    Selecting,
    Submitting,
    Monitoring,
    Finished,
    Aborted,
}

pub struct Session {
    config: Config,
    filter: link::Filter,
    resolver: Resolver,
    submitter: Submitter,
    event_tx: events::Sender,

    stage: Stage,
    selection: Option<SelectionState>,
    task_id: Option<TaskId>,
    monitor: Option<monitor::Handle>,
}

impl Session {
    /// Creates an idle session reporting to `event_tx`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the HTTP client cannot be built from `config`.
    pub fn new(config: Config, event_tx: events::Sender) -> Result<Self> {
        let http_client = Arc::new(http::Client::new(&config)?);

        Ok(Self {
            filter: link::Filter::from_config(&config),
            resolver: Resolver::new(&config, Arc::clone(&http_client)),
            submitter: Submitter::new(&config, http_client),
            config,
            event_tx,
            stage: Stage::default(),
            selection: None,
            task_id: None,
            monitor: None,
        })
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn selection(&self) -> Option<&SelectionState> {
        self.selection.as_ref()
    }

    /// The selection to edit before submitting.
    #[must_use]
    pub fn selection_mut(&mut self) -> Option<&mut SelectionState> {
        self.selection.as_mut()
    }

    /// The task of the last successful submission.
    #[must_use]
    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    /// Extracts the link from shared `text` and resolves it.
    ///
    /// # Errors
    ///
    /// * `UnsupportedLink` - `text` has no accepted link
    /// * `Network`, `Server`, `InvalidResponse` - resolving failed
    /// * `Internal` - the session is past its idle stage
    ///
    /// All of these abort the session.
    pub async fn open(&mut self, text: &str) -> Result<&mut SelectionState> {
        self.expect_stage(Stage::Idle)?;

        let link = match self.filter.extract(text) {
            Ok(link) => link.to_owned(),
            Err(e) => return Err(self.fail(e)),
        };

        self.transition(Stage::Resolving);
        let resolver = self.resolver.clone();
        let task = tokio::spawn(async move { resolver.resolve(&link).await });

        let tracks = match task.await.map_err(Error::from).and_then(|result| result) {
            Ok(tracks) => tracks,
            Err(e) => return Err(self.fail(e)),
        };

        if tracks.is_empty() {
            warn!("link resolved into no tracks");
        }

        self.transition(Stage::Selecting);
        Ok(self.selection.insert(SelectionState::new(tracks)))
    }

    /// Includes or excludes a track of the selection.
    ///
    /// # Errors
    ///
    /// * `IndexOutOfRange` - there is no such track; this aborts the session
    /// * `Internal` - there is nothing to select from
    pub fn set_included(&mut self, track: usize, included: bool) -> Result<()> {
        self.edit(|selection| selection.set_included(track, included))
    }

    /// Picks the variant of a track to submit.
    ///
    /// # Errors
    ///
    /// * `IndexOutOfRange` - there is no such track or variant; this aborts
    ///   the session
    /// * `Internal` - there is nothing to select from
    pub fn set_variant(&mut self, track: usize, variant: usize) -> Result<()> {
        self.edit(|selection| selection.set_variant(track, variant))
    }

    fn edit<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut SelectionState) -> Result<()>,
    {
        self.expect_stage(Stage::Selecting)?;

        let result = match self.selection.as_mut() {
            Some(selection) => f(selection),
            None => return Err(Error::internal("no selection")),
        };
        result.map_err(|e| self.fail(e))
    }

    /// Submits the current selection and starts following its progress.
    ///
    /// The selection is snapshot before anything is sent. It stays
    /// available afterwards, but edits no longer affect the submitted job.
    ///
    /// # Errors
    ///
    /// * `NoSelection` - no track is included; nothing is sent and the
    ///   session stays in its selecting stage
    /// * `Network`, `Server`, `InvalidResponse` - submitting failed; this
    ///   aborts the session
    /// * `Internal` - there is nothing to submit yet
    pub async fn submit(&mut self) -> Result<TaskId> {
        self.expect_stage(Stage::Selecting)?;

        let selections = self
            .selection
            .as_ref()
            .map(SelectionState::snapshot)
            .unwrap_or_default();

        if selections.is_empty() {
            let e = Error::no_selection("no tracks selected");
            self.notify(user_message(self.stage, &e));
            return Err(e);
        }

        self.transition(Stage::Submitting);
        let submitter = self.submitter.clone();
        let task = tokio::spawn(async move { submitter.submit(&selections).await });

        let task_id = match task.await.map_err(Error::from).and_then(|result| result) {
            Ok(task_id) => task_id,
            Err(e) => return Err(self.fail(e)),
        };

        self.emit(Event::Submitted {
            task_id: task_id.clone(),
        });

        let monitor = Monitor::new(&self.config, self.event_tx.clone());
        self.monitor = Some(monitor.spawn(task_id.clone()));
        self.task_id = Some(task_id.clone());
        self.transition(Stage::Monitoring);

        Ok(task_id)
    }

    /// Waits for the progress subscription to close by itself.
    ///
    /// A lost subscription is reported as "Connection lost" and does not
    /// fail the session: the job continues server-side. If this future is
    /// dropped, the subscription stays open until [`abort`](Self::abort).
    ///
    /// # Errors
    ///
    /// Returns `Internal` if nothing was submitted.
    pub async fn finish(&mut self) -> Result<()> {
        self.expect_stage(Stage::Monitoring)?;

        if let Some(monitor) = self.monitor.as_mut() {
            let result = monitor.join().await;
            self.monitor = None;
            self.settle(result);
        }

        self.transition(Stage::Finished);
        Ok(())
    }

    /// Aborts the session from any stage.
    ///
    /// Closes an active subscription and discards the selection. Calling
    /// this on a finished or aborted session has no effect.
    pub async fn abort(&mut self) {
        if matches!(self.stage, Stage::Finished | Stage::Aborted) {
            return;
        }

        if let Some(monitor) = self.monitor.take() {
            let result = monitor.stop().await;
            self.settle(result);
        }

        self.selection = None;
        self.transition(Stage::Aborted);
    }

    /// Reports how the progress subscription ended.
    fn settle(&self, result: Result<()>) {
        match result {
            Ok(()) => (),
            Err(e) if e.is(ErrorKind::StreamFailure) => {
                warn!("progress no longer visible: {e}");
                self.notify(user_message(self.stage, &e));
            }
            Err(e) => debug!("progress subscription ended: {e}"),
        }
    }

    fn expect_stage(&self, stage: Stage) -> Result<()> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(Error::internal(format!(
                "session is {}, not {stage}",
                self.stage
            )))
        }
    }

    /// Reports `error` to the user and aborts the session.
    fn fail(&mut self, error: Error) -> Error {
        error!("session failed while {}: {error}", self.stage);
        self.notify(user_message(self.stage, &error));

        self.selection = None;
        self.transition(Stage::Aborted);

        error
    }

    fn transition(&mut self, stage: Stage) {
        if self.stage != stage {
            info!("session {} -> {stage}", self.stage);
            self.stage = stage;
        }
    }

    fn notify(&self, message: String) {
        self.emit(Event::Notice { message });
    }

    fn emit(&self, event: Event) {
        if self.event_tx.send(event).is_err() {
            trace!("event observer is gone");
        }
    }
}

/// Converts `error`, raised while in `stage`, to a message for the user.
#[must_use]
pub fn user_message(stage: Stage, error: &Error) -> String {
    match error.kind {
        ErrorKind::UnsupportedLink => match error.downcast::<Rejection>() {
            Some(Rejection::UnsupportedHost(_)) => "Unsupported link type".to_owned(),
            _ => "No valid link found".to_owned(),
        },
        ErrorKind::NoSelection => "No tracks selected".to_owned(),
        ErrorKind::Server if stage == Stage::Resolving => {
            format!("Failed to get metadata: {}", error.detail())
        }
        ErrorKind::Server if stage == Stage::Submitting => {
            format!("Failed to submit: {}", error.detail())
        }
        ErrorKind::StreamFailure => format!("Connection lost: {}", error.detail()),
        ErrorKind::Cancelled => "Cancelled".to_owned(),
        _ => format!("Error: {}", error.detail()),
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resolving => write!(f, "resolving"),
            Self::Selecting => write!(f, "selecting"),
            Self::Submitting => write!(f, "submitting"),
            Self::Monitoring => write!(f, "monitoring"),
            Self::Finished => write!(f, "finished"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}
