//! Job submission exchange.
//!
//! Request:
//!
//! ```json
//! { "selections": [ { "metadata": { ... }, "variant": { ... } } ] }
//! ```
//!
//! Response:
//!
//! ```json
//! { "taskId": "..." }
//! ```

use serde::{Deserialize, Serialize};

use crate::track::{Selection, TaskId};

/// Body of a submit request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Request<'a> {
    pub selections: &'a [Selection],
}

/// Body of a successful submit response.
///
/// A missing or empty `taskId` fails deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub task_id: TaskId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_requires_task_id() {
        let response: Response = serde_json::from_str(r#"{"taskId":"42"}"#).unwrap();
        assert_eq!(response.task_id.as_str(), "42");

        assert!(serde_json::from_str::<Response>("{}").is_err());
        assert!(serde_json::from_str::<Response>(r#"{"taskId":""}"#).is_err());
        assert!(serde_json::from_str::<Response>(r#"{"taskId":null}"#).is_err());
    }

    #[test]
    fn request_body() {
        let body = serde_json::to_value(Request { selections: &[] }).unwrap();
        assert_eq!(body, serde_json::json!({ "selections": [] }));
    }
}
