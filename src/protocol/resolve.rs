//! Link resolution exchange.
//!
//! Request:
//!
//! ```json
//! { "link": "https://youtu.be/abc123" }
//! ```
//!
//! Response: an array of track records.
//!
//! ```json
//! [
//!     {
//!         "metadata": { "title": "...", "artist": "...", "album": "...", "genre": "...", "year": "..." },
//!         "variants": [
//!             { "id": "...", "url": "...", "title": "...", "duration": "245",
//!               "views": 1234, "uploader": "...", "uploadDate": "..." }
//!         ]
//!     }
//! ]
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    track::{Metadata, Track, Variant},
};

/// Body of a resolve request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Request<'a> {
    pub link: &'a str,
}

/// One track as returned by the server.
///
/// Every field is required; a missing field fails the entire response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub metadata: Metadata,
    pub variants: Vec<Variant>,
}

/// Converts a record into a fresh, included track.
///
/// # Errors
///
/// Returns `InvalidResponse` if the record has no variants.
impl TryFrom<TrackRecord> for Track {
    type Error = Error;

    fn try_from(record: TrackRecord) -> Result<Self, Self::Error> {
        Track::new(record.metadata, record.variants)
    }
}
