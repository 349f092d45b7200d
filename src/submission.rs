//! Submission Client: exchanges selections for a task identifier.

use std::{sync::Arc, time::Duration};

use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    http,
    protocol::submit::{Request, Response},
    track::{Selection, TaskId},
};

/// Submits selections through the server's submit endpoint.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct Submitter {
    http_client: Arc<http::Client>,
    url: Url,
    timeout: Duration,
}

impl Submitter {
    #[must_use]
    pub fn new(config: &Config, http_client: Arc<http::Client>) -> Self {
        Self {
            http_client,
            url: config.submit_url.clone(),
            timeout: config.submit_timeout,
        }
    }

    /// Submits `selections` as one job and returns its task identifier.
    ///
    /// A single attempt: the job either was accepted or it was not.
    /// Submitting the same selections again creates an independent task.
    ///
    /// # Errors
    ///
    /// * `NoSelection` - `selections` is empty; nothing is sent
    /// * `Network` - connection, timeout or I/O failure
    /// * `Server` - non-success status
    /// * `InvalidResponse` - no non-empty `taskId` in the response
    pub async fn submit(&self, selections: &[Selection]) -> Result<TaskId> {
        if selections.is_empty() {
            return Err(Error::no_selection("no tracks selected"));
        }

        let response: Response = self
            .http_client
            .post_json(self.url.clone(), &Request { selections }, self.timeout, "submit")
            .await?;
        info!(
            "submitted {} selections as task {}",
            selections.len(),
            response.task_id
        );

        Ok(response.task_id)
    }
}
