//! Metadata Resolver: turns a link into tracks with variants.

use std::{sync::Arc, time::Duration};

use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    http,
    protocol::resolve::{Request, TrackRecord},
    track::Track,
};

/// Resolves links through the server's resolve endpoint.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct Resolver {
    http_client: Arc<http::Client>,
    url: Url,
    timeout: Duration,
}

impl Resolver {
    #[must_use]
    pub fn new(config: &Config, http_client: Arc<http::Client>) -> Self {
        Self {
            http_client,
            url: config.resolve_url.clone(),
            timeout: config.resolve_timeout,
        }
    }

    /// Resolves `link` into its tracks, in server order.
    ///
    /// The link is not checked against accepted domains; that is up to the
    /// caller. The call is a single attempt that may take minutes.
    ///
    /// # Errors
    ///
    /// * `UnsupportedLink` - `link` is empty
    /// * `Network` - connection, timeout or I/O failure
    /// * `Server` - non-success status
    /// * `InvalidResponse` - malformed body, a missing field, or a track
    ///   without variants; no partial track list is returned
    pub async fn resolve(&self, link: &str) -> Result<Vec<Track>> {
        if link.is_empty() {
            return Err(Error::unsupported_link("link is empty"));
        }

        let records: Vec<TrackRecord> = self
            .http_client
            .post_json(self.url.clone(), &Request { link }, self.timeout, "resolve")
            .await?;

        let tracks = records
            .into_iter()
            .map(Track::try_from)
            .collect::<Result<Vec<_>>>()?;
        info!("resolved {link} into {} tracks", tracks.len());

        Ok(tracks)
    }
}
