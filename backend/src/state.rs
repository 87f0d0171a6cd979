//! Read-only state shared by every request handler through `web::Data`.

use crate::config::AppConfig;
use crate::pipeline::{Fetcher, TemplateSource};

#[derive(Clone)]
pub struct AppState {
    pub template: TemplateSource,
    /// One HTTP agent for template and QR downloads; its pool is shared.
    pub fetcher: Fetcher,
}

impl AppState {
    pub fn new(config: &AppConfig) -> AppState {
        AppState {
            template: config.template.clone(),
            fetcher: Fetcher::new(config.http_timeout),
        }
    }
}
