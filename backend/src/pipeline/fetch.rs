//! Loads binary resources from HTTP(S) URLs or the local filesystem.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Where the contract template lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Url(String),
    Path(PathBuf),
}

impl TemplateSource {
    /// `http://` and `https://` locators are URLs, anything else a path.
    pub fn parse(locator: &str) -> TemplateSource {
        let locator = locator.trim();
        if is_http_url(locator) {
            TemplateSource::Url(locator.to_string())
        } else {
            TemplateSource::Path(PathBuf::from(locator))
        }
    }
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::Url(url) => f.write_str(url),
            TemplateSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

pub fn is_http_url(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Blocking fetcher shared by every generation; holds no per-call state.
#[derive(Clone)]
pub struct Fetcher {
    agent: ureq::Agent,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Fetcher {
        Fetcher {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    /// Reads a fresh copy of the template.
    pub fn fetch(&self, source: &TemplateSource) -> Result<Vec<u8>, FetchError> {
        match source {
            TemplateSource::Url(url) => self.get(url),
            TemplateSource::Path(path) => std::fs::read(path).map_err(|source| FetchError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// GETs `url` and returns the body. Non-2xx statuses are errors.
    pub fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.agent.get(url).call().map_err(|err| match err {
            ureq::Error::Status(status, _) => FetchError::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => FetchError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        })?;

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|err| FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        Ok(body)
    }
}
