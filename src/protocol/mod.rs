//! Wire formats spoken with the processing server.
//!
//! # Submodules
//!
//! * [`resolve`] - link resolution request and track records (JSON over HTTP)
//! * [`submit`] - job submission request and task identifier (JSON over HTTP)
//! * [`progress`] - subscription directive and progress messages (text over
//!   websocket)
//!
//! The data model shared by the JSON formats (metadata, variants and
//! selections) lives in [`crate::track`].

pub mod progress;
pub mod resolve;
pub mod submit;

use crate::error::Result;
use serde::Deserialize;
use std::fmt::Debug;

/// Parses and logs JSON responses from the server.
///
/// # Arguments
///
/// * `body` - Response body text to parse
/// * `origin` - Description of API endpoint for logging
///
/// # Errors
///
/// Returns an `InvalidResponse` error if:
/// * Response body is not valid JSON
/// * JSON structure doesn't match type `T`
/// * Deserialization fails for any field
///
/// # Logging
///
/// * Success: Logs parsed structure at TRACE level
/// * Parse Error: Logs raw JSON at TRACE level if valid JSON
/// * Invalid JSON: Logs error and raw text at ERROR level
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_str(body) {
        Ok(result) => {
            trace!("{}: {result:#?}", origin);
            Ok(result)
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
                error!("{}: unexpected response ({e})", origin);
                trace!("{}: {json:#?}", origin);
            } else {
                error!("{}: failed parsing response ({e:?})", origin);
                trace!("{body}");
            }
            Err(e.into())
        }
    }
}
