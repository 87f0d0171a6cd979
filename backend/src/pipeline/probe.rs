//! Dry-runs the contract template before any real document is produced.

use common::model::diagnostic::ProbeReport;
use log::{debug, error};
use thiserror::Error;

use crate::contract::context::TemplateContext;
use crate::docx::{DocxPackage, PackageError, RenderError, TemplateEngine, TemplateOptions};

use super::fetch::{FetchError, Fetcher, TemplateSource};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("template could not be fetched: {0}")]
    Fetch(#[from] FetchError),
    #[error("template is not a usable DOCX package: {0}")]
    Package(#[from] PackageError),
    #[error("template has invalid placeholders: {0}")]
    Compile(#[source] RenderError),
    #[error("template failed to render: {0}")]
    Render(#[source] RenderError),
    #[error("empty context could not be serialized: {0}")]
    Context(#[from] serde_json::Error),
}

impl ProbeError {
    pub fn render_error(&self) -> Option<&RenderError> {
        match self {
            ProbeError::Compile(err) | ProbeError::Render(err) => Some(err),
            _ => None,
        }
    }
}

/// Options every contract template is rendered with.
pub fn contract_options() -> TemplateOptions {
    TemplateOptions {
        paragraph_loop: true,
        line_breaks: true,
        strict: true,
    }
}

/// Fetches the template and renders it against an empty contract. Nothing
/// is kept; the fetched copy is dropped on return.
pub fn probe_template(fetcher: &Fetcher, source: &TemplateSource) -> Result<(), ProbeError> {
    let result = run(fetcher, source);
    match &result {
        Ok(()) => debug!("Template {source} passed the probe"),
        Err(err) => error!("Template {source} failed the probe: {err}"),
    }
    result
}

fn run(fetcher: &Fetcher, source: &TemplateSource) -> Result<(), ProbeError> {
    let bytes = fetcher.fetch(source)?;
    let package = DocxPackage::from_bytes(&bytes)?;
    let engine = TemplateEngine::new(package, contract_options()).map_err(ProbeError::Compile)?;
    let data = TemplateContext::empty().to_value()?;
    engine.render(&data).map_err(ProbeError::Render)?;
    Ok(())
}

/// Summary of a probe outcome for callers that only need pass/fail.
pub fn report(result: &Result<(), ProbeError>) -> ProbeReport {
    match result {
        Ok(()) => ProbeReport {
            ok: true,
            message: "Template is available".to_string(),
        },
        Err(err) => ProbeReport {
            ok: false,
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::{docx_with_body, paragraph};
    use std::io::Write;
    use std::time::Duration;

    fn template_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    fn probe(bytes: &[u8]) -> Result<(), ProbeError> {
        let file = template_file(bytes);
        let fetcher = Fetcher::new(Duration::from_secs(1));
        probe_template(&fetcher, &TemplateSource::Path(file.path().to_path_buf()))
    }

    #[test]
    fn accepts_a_valid_template() {
        let body = [
            paragraph("Шартнома № {contract_number}"),
            paragraph("{#payments}"),
            paragraph("{index}. {amount}"),
            paragraph("{/payments}"),
            paragraph("{%qr_code}"),
        ]
        .concat();
        let result = probe(&docx_with_body(&body));
        assert!(result.is_ok(), "{result:?}");
        assert!(report(&result).ok);
    }

    #[test]
    fn rejects_unknown_placeholders() {
        let result = probe(&docx_with_body(&paragraph("{no_such_field}")));
        let err = result.as_ref().unwrap_err();
        assert!(matches!(err, ProbeError::Render(_)));
        assert_eq!(err.render_error().unwrap().details()[0].id, "undefined_tag");

        let summary = report(&result);
        assert!(!summary.ok);
        assert!(summary.message.contains("no_such_field"));
    }

    #[test]
    fn rejects_broken_syntax() {
        let err = probe(&docx_with_body(&paragraph("{contract_number"))).unwrap_err();
        assert!(matches!(err, ProbeError::Compile(_)));
    }

    #[test]
    fn rejects_unclosed_xml_with_cyrillic_text() {
        let body = format!(
            "{}<w:p w:rsidR=\"00AB12CD\" x=\"yyyyyyyyyyyyШартнома",
            paragraph("{full_name}")
        );
        let err = probe(&docx_with_body(&body)).unwrap_err();
        let ProbeError::Compile(render) = &err else {
            panic!("expected a compile failure, got {err:?}");
        };
        assert_eq!(render.details()[0].id, "malformed_xml");
    }

    #[test]
    fn rejects_non_zip_bytes() {
        let err = probe(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ProbeError::Package(_)));
    }

    #[test]
    fn rejects_missing_template() {
        let fetcher = Fetcher::new(Duration::from_secs(1));
        let source = TemplateSource::Path("/nonexistent/contract.docx".into());
        assert!(matches!(
            probe_template(&fetcher, &source),
            Err(ProbeError::Fetch(_))
        ));
    }
}
