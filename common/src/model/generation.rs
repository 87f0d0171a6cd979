use serde::{Deserialize, Serialize};

use super::diagnostic::RenderErrorDetail;

/// What happened to the QR code image during a successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QrStatus {
    /// The image was resolved and placed into the document.
    Embedded,
    /// The contract carried no QR code reference.
    Absent,
    /// A reference was present but could not be resolved; the document was
    /// produced without the image.
    Degraded { reason: String },
}

impl QrStatus {
    /// Short label used in the `X-Qr-Status` response header.
    pub fn label(&self) -> &'static str {
        match self {
            QrStatus::Embedded => "embedded",
            QrStatus::Absent => "absent",
            QrStatus::Degraded { .. } => "degraded",
        }
    }
}

/// Error body of a failed document generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationFailure {
    /// Pipeline stage that failed, e.g. `probe` or `render`.
    pub stage: String,
    pub message: String,
    /// Every broken placeholder, when the template itself is at fault.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<RenderErrorDetail>,
}
