use std::time::Duration;

use anyhow::Context;
use thesis_core::output_path::DEFAULT_DOWNLOAD_ROOT;

use crate::cli::Cli;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Console configuration loaded from environment variables.
///
/// Every field has a default suitable for a backend on the local machine;
/// command-line flags override the environment.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Backend base URL (default: `http://localhost:8080`).
    pub backend_url: String,
    /// Log in as this user before running the command.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Reconciliation cadence (default: 5 seconds).
    pub poll_interval: Duration,
    /// Per-request HTTP timeout (default: 30 seconds).
    pub request_timeout: Duration,
    /// Public root finished outputs are served from (default: `/output/`).
    pub download_root: String,
}

impl ConsoleConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `THESIS_BACKEND_URL`          | `http://localhost:8080` |
    /// | `THESIS_USERNAME`             | --                      |
    /// | `THESIS_PASSWORD`             | --                      |
    /// | `THESIS_POLL_INTERVAL_SECS`   | `5`                     |
    /// | `THESIS_REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `THESIS_DOWNLOAD_ROOT`        | `/output/`              |
    pub fn from_env() -> anyhow::Result<Self> {
        let backend_url =
            std::env::var("THESIS_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.into());

        let username = non_empty_var("THESIS_USERNAME");
        let password = non_empty_var("THESIS_PASSWORD");

        let poll_interval_secs = secs_var("THESIS_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let request_timeout_secs =
            secs_var("THESIS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        let download_root = std::env::var("THESIS_DOWNLOAD_ROOT")
            .map(|root| with_trailing_slash(&root))
            .unwrap_or_else(|_| DEFAULT_DOWNLOAD_ROOT.into());

        Ok(Self {
            backend_url,
            username,
            password,
            poll_interval: Duration::from_secs(poll_interval_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            download_root,
        })
    }

    /// Apply command-line overrides.
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(url) = &cli.url {
            self.backend_url = url.clone();
        }
        if let Some(username) = &cli.username {
            self.username = Some(username.clone());
        }
        if let Some(password) = &cli.password {
            self.password = Some(password.clone());
        }
        if let Some(secs) = cli.interval {
            self.poll_interval = Duration::from_secs(secs);
        }
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn secs_var(name: &str, default: u64) -> anyhow::Result<u64> {
    let secs = match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a whole number of seconds"))?,
        Err(_) => default,
    };
    anyhow::ensure!(secs > 0, "{name} must be greater than zero");
    Ok(secs)
}

fn with_trailing_slash(root: &str) -> String {
    if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{root}/")
    }
}
