use serde::{Deserialize, Serialize};
use std::fmt;

/// A single structured failure reported by the template engine.
///
/// Several of these are collected during one compile or render pass and
/// surfaced together, so the caller sees every broken placeholder at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderErrorDetail {
    /// Short human-readable summary, e.g. `Unclosed tag`.
    pub message: String,
    /// Stable machine identifier, e.g. `unclosed_tag`.
    pub id: String,
    /// Template text surrounding the failure.
    pub context: String,
    /// Longer explanation naming the offending tag.
    pub explanation: String,
}

impl fmt::Display for RenderErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} near \"{}\"",
            self.message, self.id, self.explanation, self.context
        )
    }
}

/// Outcome of the template availability probe, as returned over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub ok: bool,
    pub message: String,
}
