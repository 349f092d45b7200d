//! Text protocol of the progress subscription.
//!
//! One directive goes from client to server, right after connecting:
//!
//! ```text
//! subscribe:<taskId>
//! ```
//!
//! The server then sends any number of text messages:
//!
//! ```text
//! progress:<percent> <label>   repeatable, label optional
//! done:<statusText>            terminal
//! <anything else>              informational, passed through verbatim
//! ```
//!
//! Only the leading marker is interpreted. A progress line whose percent is
//! not an integer in `0..=100` is passed through as [`Status::Other`] rather
//! than treated as an error.

use std::fmt;

use crate::track::TaskId;

/// Client to server directives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Subscribe to the progress of a task.
    Subscribe(TaskId),
}

/// A decoded server message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// The job advanced.
    Progress { percent: u8, label: String },
    /// The job finished.
    Done { status: String },
    /// Informational text.
    Other { text: String },
}

impl Directive {
    const SUBSCRIBE: &'static str = "subscribe:";
}

impl fmt::Display for Directive {
    /// Formats the directive as its wire text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscribe(task_id) => write!(f, "{}{task_id}", Self::SUBSCRIBE),
        }
    }
}

impl Status {
    const PROGRESS: &'static str = "progress:";
    const DONE: &'static str = "done:";

    /// Upper bound of a progress percentage.
    const MAX_PERCENT: u8 = 100;

    /// Decodes a text message. Never fails: anything unrecognized becomes
    /// [`Status::Other`].
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if let Some(rest) = text.strip_prefix(Self::PROGRESS) {
            let (percent, label) = rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest, ""));

            return match percent.parse::<u8>() {
                Ok(percent) if percent <= Self::MAX_PERCENT => Self::Progress {
                    percent,
                    label: label.trim().to_owned(),
                },
                _ => {
                    warn!("passing through malformed progress: {text}");
                    Self::other(text)
                }
            };
        }

        if let Some(status) = text.strip_prefix(Self::DONE) {
            return Self::Done {
                status: status.to_owned(),
            };
        }

        Self::other(text)
    }

    fn other(text: &str) -> Self {
        Self::Other {
            text: text.to_owned(),
        }
    }

    /// Whether this status ends the job.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

impl From<&str> for Status {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}
