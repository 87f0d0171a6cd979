use common::model::diagnostic::RenderErrorDetail;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("not a valid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to read archive entry: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive has no `{0}` entry")]
    MissingPart(String),
    #[error("part `{0}` is not valid UTF-8")]
    Encoding(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// Every broken tag found in one compile or render pass.
    #[error("{}", join_details(.0))]
    Multi(Vec<RenderErrorDetail>),
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error("invalid relationship pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl RenderError {
    pub fn details(&self) -> &[RenderErrorDetail] {
        match self {
            RenderError::Multi(details) => details,
            _ => &[],
        }
    }
}

fn join_details(details: &[RenderErrorDetail]) -> String {
    details
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub(crate) fn detail(id: &str, message: &str, explanation: String, context: &str) -> RenderErrorDetail {
    RenderErrorDetail {
        message: message.to_string(),
        id: id.to_string(),
        context: context.to_string(),
        explanation,
    }
}
