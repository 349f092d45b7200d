//! Accepted-link pre-filter.
//!
//! Shared text often carries more than the link itself ("Check this out:
//! https://youtu.be/abc123"). The filter picks the first `http(s)` URL from
//! the text and accepts it only if its host is one of the configured
//! domains or a subdomain of one.

use std::sync::LazyLock;

use regex_lite::Regex;
use thiserror::Error;
use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Candidate URLs in free text.
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://[^\s<>]+").expect("invalid url pattern"));

/// Punctuation that commonly trails a link in prose.
const TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '"', '\''];

/// Why shared text was not accepted. Carried inside `UnsupportedLink`
/// errors.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    #[error("no valid link found")]
    NoLink,

    #[error("unsupported link type: {0}")]
    UnsupportedHost(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    domains: Vec<String>,
}

impl Filter {
    #[must_use]
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|domain| domain.as_ref().trim_matches('.').to_ascii_lowercase())
            .filter(|domain| !domain.is_empty())
            .collect();

        Self { domains }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.accepted_domains)
    }

    /// Extracts the link to resolve from shared text.
    ///
    /// The link is returned as it appears in `text`, minus trailing
    /// punctuation, so the server sees what the user shared.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedLink` if the text contains no URL, or if the first
    /// URL points to a host that is not accepted. Text that names an accepted
    /// domain without an `http(s)` link is an unsupported link, not a
    /// missing one.
    pub fn extract<'a>(&self, text: &'a str) -> Result<&'a str> {
        let Some(candidate) = URL_PATTERN
            .find(text)
            .map(|found| found.as_str().trim_end_matches(TRAILING))
        else {
            return Err(Error::unsupported_link(self.reject_text(text)));
        };

        let url = Url::parse(candidate).map_err(|e| {
            debug!("rejecting {candidate}: {e}");
            Error::unsupported_link(Rejection::NoLink)
        })?;

        if self.accepts(&url) {
            debug!("accepted link: {candidate}");
            Ok(candidate)
        } else {
            Err(Error::unsupported_link(Rejection::UnsupportedHost(
                url.host_str().unwrap_or_default().to_owned(),
            )))
        }
    }

    /// Classifies text without any `http(s)` URL.
    fn reject_text(&self, text: &str) -> Rejection {
        let text = text.to_ascii_lowercase();
        match self
            .domains
            .iter()
            .find(|domain| text.contains(domain.as_str()))
        {
            Some(domain) => Rejection::UnsupportedHost(domain.clone()),
            None => Rejection::NoLink,
        }
    }

    /// Whether the host of `url` is an accepted domain or a subdomain of one.
    #[must_use]
    pub fn accepts(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> Filter {
        Filter::new(["youtube.com", "youtu.be", "spotify.com"])
    }

    #[test]
    fn bare_link() {
        let link = filter().extract("https://youtu.be/abc123").unwrap();
        assert_eq!(link, "https://youtu.be/abc123");
    }

    #[test]
    fn link_inside_prose() {
        let link = filter()
            .extract("Listen to this (https://www.youtube.com/watch?v=abc123).")
            .unwrap();
        assert_eq!(link, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn link_is_kept_as_shared() {
        assert_eq!(filter().extract("https://youtu.be").unwrap(), "https://youtu.be");
        assert_eq!(
            filter().extract("HTTPS://YouTu.be/AbC?t=1").unwrap(),
            "HTTPS://YouTu.be/AbC?t=1"
        );
    }

    #[test]
    fn subdomains_are_accepted() {
        assert!(filter()
            .extract("https://open.spotify.com/track/xyz")
            .is_ok());
    }

    #[test]
    fn lookalike_hosts_are_rejected() {
        let err = filter().extract("https://notyoutube.com/watch?v=1").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UnsupportedLink);
        assert_eq!(
            err.downcast::<Rejection>(),
            Some(&Rejection::UnsupportedHost("notyoutube.com".to_owned()))
        );
        assert!(filter().extract("https://youtube.com.evil.org/x").is_err());
    }

    #[test]
    fn text_without_link_is_rejected() {
        for text in ["", "   ", "just some text"] {
            let err = filter().extract(text).unwrap_err();
            assert_eq!(err.downcast::<Rejection>(), Some(&Rejection::NoLink), "{text}");
        }
    }

    #[test]
    fn accepted_domain_without_scheme_is_unsupported() {
        let err = filter().extract("youtube.com/watch?v=1").unwrap_err();
        assert_eq!(
            err.downcast::<Rejection>(),
            Some(&Rejection::UnsupportedHost("youtube.com".to_owned()))
        );

        let err = filter().extract("ftp://youtu.be/x").unwrap_err();
        assert_eq!(
            err.downcast::<Rejection>(),
            Some(&Rejection::UnsupportedHost("youtu.be".to_owned()))
        );
    }
}
