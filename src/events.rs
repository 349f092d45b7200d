//! Events surfaced to the user during a link handling session.
//!
//! The progress monitor and the session send these to a single observer,
//! typically something that renders a notification line per event. Events
//! are ephemeral: they are forwarded once, in order, and never stored.
//!
//! # Example
//!
//! ```rust
//! use sharelink::events::Event;
//!
//! fn render(event: &Event) {
//!     match event {
//!         Event::Closed => println!("bye"),
//!         other => println!("{other}"),
//!     }
//! }
//! ```

use std::fmt;

use tokio::sync::mpsc;

use crate::{protocol::progress::Status, track::TaskId};

/// Sending half of an event observer.
pub type Sender = mpsc::UnboundedSender<Event>;

/// Receiving half of an event observer.
pub type Receiver = mpsc::UnboundedReceiver<Event>;

/// Creates a connected observer pair.
#[must_use]
pub fn channel() -> (Sender, Receiver) {
    mpsc::unbounded_channel()
}

/// Something the user should see.
///
/// Events fall into two categories:
///
/// Session Events:
/// * [`Submitted`](Self::Submitted) - The job was accepted
/// * [`Notice`](Self::Notice) - A message about the session, such as why it
///   was aborted
///
/// Subscription Events:
/// * [`Subscribed`](Self::Subscribed) - Progress is being followed
/// * [`Progress`](Self::Progress), [`Done`](Self::Done),
///   [`Other`](Self::Other) - Decoded server messages
/// * [`Failed`](Self::Failed) - Progress visibility was lost
/// * [`Closed`](Self::Closed) - The subscription is gone; always last
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// The selections were accepted as a job.
    Submitted { task_id: TaskId },

    /// A message for the user, typically why the session was aborted.
    Notice { message: String },

    /// The subscribe directive was sent.
    Subscribed { task_id: TaskId },

    /// The job advanced.
    Progress { percent: u8, label: String },

    /// The job finished. The subscription closes after a grace period.
    Done { status: String },

    /// Informational text from the server.
    Other { text: String },

    /// The subscription failed or was closed by the server before the job
    /// finished. The job itself is unaffected.
    Failed { detail: String },

    /// The subscription is closed.
    Closed,
}

impl Event {
    /// Whether no further events follow for this subscription.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<Status> for Event {
    fn from(status: Status) -> Self {
        match status {
            Status::Progress { percent, label } => Self::Progress { percent, label },
            Status::Done { status } => Self::Done { status },
            Status::Other { text } => Self::Other { text },
        }
    }
}

/// Formats the event as a notification line.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted { .. } => write!(f, "Selections submitted"),
            Self::Notice { message } => write!(f, "{message}"),
            Self::Subscribed { .. } => write!(f, "Starting..."),
            Self::Progress { percent, label } if label.is_empty() => {
                write!(f, "Downloading: {percent}%")
            }
            Self::Progress { percent, label } => write!(f, "Downloading {label}: {percent}%"),
            Self::Done { status } => write!(f, "Finished: {status}"),
            Self::Other { text } => write!(f, "{text}"),
            Self::Failed { detail } => write!(f, "Connection lost: {detail}"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_lines() {
        let lines: Vec<_> = [
            Event::from(Status::parse("progress:42 Song")),
            Event::from(Status::parse("progress:7")),
            Event::from(Status::parse("done:3 tracks")),
            Event::from(Status::parse("queued")),
            Event::Failed {
                detail: "reset".to_owned(),
            },
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        assert_eq!(
            lines,
            [
                "Downloading Song: 42%",
                "Downloading: 7%",
                "Finished: 3 tracks",
                "queued",
                "Connection lost: reset"
            ]
        );
    }
}
