//! Client configuration.
//!
//! A [`Config`] holds the server endpoints, the timeouts of each stage and
//! the hosts that shared links are accepted from. It starts from
//! [`Config::default`] and can be overlaid with a TOML file:
//!
//! ```toml
//! server = "https://media.example.com/"
//! accepted_domains = ["youtube.com", "youtu.be"]
//! resolve_timeout = 600
//! grace_period = 5
//! ```
//!
//! Every key is optional. The endpoint URLs are derived from `server` unless
//! `resolve_url`, `submit_url` or `progress_url` are given explicitly.

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use url::Url;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub user_agent: String,

    /// Endpoint that resolves a link into tracks.
    pub resolve_url: Url,
    /// Endpoint that accepts the selections as a job.
    pub submit_url: Url,
    /// Websocket endpoint streaming job progress.
    pub progress_url: Url,

    /// Hosts (and their subdomains) that links are accepted from.
    pub accepted_domains: Vec<String>,

    pub connect_timeout: Duration,
    /// Resolution may trigger slow upstream lookups, so this is in minutes.
    pub resolve_timeout: Duration,
    pub submit_timeout: Duration,
    /// How long a completed job stays visible before the subscription closes.
    pub grace_period: Duration,
}

/// On-disk representation of [`Config`].
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct File {
    server: Option<Url>,
    resolve_url: Option<Url>,
    submit_url: Option<Url>,
    progress_url: Option<Url>,
    accepted_domains: Option<Vec<String>>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    connect_timeout: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    resolve_timeout: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    submit_timeout: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    grace_period: Option<Duration>,
}

impl Config {
    pub const DEFAULT_SERVER: &'static str = "http://localhost:8085/";

    const RESOLVE_PATH: &'static str = "api/share-link";
    const SUBMIT_PATH: &'static str = "api/submit-selections";
    const PROGRESS_PATH: &'static str = "ws/progress";

    pub const DEFAULT_DOMAINS: [&'static str; 3] = ["youtube.com", "youtu.be", "spotify.com"];

    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    const RESOLVE_TIMEOUT: Duration = Duration::from_secs(15 * 60);
    const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
    const GRACE_PERIOD: Duration = Duration::from_secs(5);

    /// Configuration files are tiny; refuse anything larger.
    const MAX_FILE_SIZE: u64 = 64 * 1024;

    /// Creates a configuration with all endpoints below `server`.
    ///
    /// # Errors
    ///
    /// Returns an error if `server` cannot be a base URL or has no websocket
    /// equivalent scheme.
    pub fn with_server(server: &Url) -> Result<Self> {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();

        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };
        let os_version = sysinfo::System::os_version().unwrap_or_else(|| String::from("0"));
        let user_agent = format!("{app_name}/{app_version} (Rust; {os_name}/{os_version})");
        trace!("user agent: {user_agent}");

        let (resolve_url, submit_url, progress_url) = Self::endpoints(server)?;

        Ok(Self {
            app_name,
            app_version,
            user_agent,

            resolve_url,
            submit_url,
            progress_url,

            accepted_domains: Self::DEFAULT_DOMAINS.map(String::from).to_vec(),

            connect_timeout: Self::CONNECT_TIMEOUT,
            resolve_timeout: Self::RESOLVE_TIMEOUT,
            submit_timeout: Self::SUBMIT_TIMEOUT,
            grace_period: Self::GRACE_PERIOD,
        })
    }

    /// Loads the configuration from a TOML file on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is too large, or
    /// contains unknown keys or invalid values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Prevent out-of-memory condition: configuration files should be small.
        let file_size = fs::metadata(path)?.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::internal(format!(
                "{} is too large ({file_size} bytes)",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parses the configuration from TOML text on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown keys or invalid values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: File = toml::from_str(contents)?;

        let mut config = match file.server {
            Some(ref server) => Self::with_server(server)?,
            None => Self::default(),
        };

        if let Some(url) = file.resolve_url {
            config.resolve_url = url;
        }
        if let Some(url) = file.submit_url {
            config.submit_url = url;
        }
        if let Some(url) = file.progress_url {
            config.progress_url = url;
        }
        if let Some(domains) = file.accepted_domains {
            config.accepted_domains = domains;
        }
        if let Some(timeout) = file.connect_timeout {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = file.resolve_timeout {
            config.resolve_timeout = timeout;
        }
        if let Some(timeout) = file.submit_timeout {
            config.submit_timeout = timeout;
        }
        if let Some(period) = file.grace_period {
            config.grace_period = period;
        }

        Ok(config)
    }

    /// Points all endpoints below another server.
    ///
    /// # Errors
    ///
    /// See [`Config::with_server`].
    pub fn set_server(&mut self, server: &Url) -> Result<()> {
        let (resolve_url, submit_url, progress_url) = Self::endpoints(server)?;
        self.resolve_url = resolve_url;
        self.submit_url = submit_url;
        self.progress_url = progress_url;
        Ok(())
    }

    fn endpoints(server: &Url) -> Result<(Url, Url, Url)> {
        // `Url::join` replaces the last path segment unless it ends in a slash.
        let mut base = server.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let resolve_url = base.join(Self::RESOLVE_PATH)?;
        let submit_url = base.join(Self::SUBMIT_PATH)?;

        let mut progress_url = base.join(Self::PROGRESS_PATH)?;
        let scheme = match base.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(Error::internal(format!(
                    "no websocket scheme for {other}://"
                )))
            }
        };
        progress_url
            .set_scheme(scheme)
            .map_err(|()| Error::internal(format!("cannot use {scheme}:// for {base}")))?;
        debug!("endpoints: {resolve_url}, {submit_url}, {progress_url}");

        Ok((resolve_url, submit_url, progress_url))
    }
}

impl Default for Config {
    fn default() -> Self {
        let server = Url::parse(Self::DEFAULT_SERVER).expect("invalid default server");
        Self::with_server(&server).expect("invalid default endpoints")
    }
}
