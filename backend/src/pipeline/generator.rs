//! # Document Generator
//!
//! Produces a filled contract from a `ContractRecord` in fixed stages:
//!
//! 1. **Probe**: dry-run the template; any failure aborts.
//! 2. **ResolveImage**: turn the QR reference into bytes. Never fatal.
//! 3. **BuildContext**: flatten the record into display strings.
//! 4. **LoadTemplate**: fetch a fresh copy of the template and open it.
//! 5. **Render**: fill every placeholder, embedding the QR image.
//! 6. **Serialize**: write the package back out as DOCX bytes.
//!
//! Delivery of the bytes is left to the caller. Nothing is written to disk
//! and nothing outlives the call.

use std::fmt;

use common::model::contract::ContractRecord;
use common::model::diagnostic::RenderErrorDetail;
use common::model::generation::QrStatus;
use log::{error, info, warn};
use thiserror::Error;

use crate::contract::context::{TemplateContext, QR_CODE_PLACEHOLDER};
use crate::docx::{DocxPackage, ImageResolver, PackageError, RenderError, TemplateEngine};

use super::fetch::{FetchError, Fetcher, TemplateSource};
use super::probe::{contract_options, probe_template, ProbeError};
use super::qr::{resolve_qr_image, QrImage};

pub use crate::docx::DOCX_MIME;

/// Display size of the embedded QR code, in pixels.
pub const QR_SIZE_PX: (u32, u32) = (100, 100);

const FILE_NAME_FALLBACK: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Probe,
    ResolveImage,
    BuildContext,
    LoadTemplate,
    Render,
    Serialize,
    Deliver,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Probe => "probe",
            Stage::ResolveImage => "resolve image",
            Stage::BuildContext => "build context",
            Stage::LoadTemplate => "load template",
            Stage::Render => "render",
            Stage::Serialize => "serialize",
            Stage::Deliver => "deliver",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("template probe failed: {0}")]
    Probe(#[from] ProbeError),
    #[error("context could not be built: {0}")]
    Context(#[source] serde_json::Error),
    #[error("template could not be fetched: {0}")]
    Fetch(#[source] FetchError),
    #[error("template could not be opened: {0}")]
    Load(#[source] PackageError),
    #[error("document failed to render: {0}")]
    Render(#[source] RenderError),
    #[error("document could not be written: {0}")]
    Serialize(#[source] PackageError),
}

impl GenerationError {
    pub fn stage(&self) -> Stage {
        match self {
            GenerationError::Probe(_) => Stage::Probe,
            GenerationError::Context(_) => Stage::BuildContext,
            GenerationError::Fetch(_) | GenerationError::Load(_) => Stage::LoadTemplate,
            GenerationError::Render(_) => Stage::Render,
            GenerationError::Serialize(_) => Stage::Serialize,
        }
    }

    /// The structured placeholder failures behind this error, if any.
    pub fn render_details(&self) -> &[RenderErrorDetail] {
        match self {
            GenerationError::Render(err) => err.details(),
            GenerationError::Probe(err) => err.render_error().map_or(&[], |err| err.details()),
            _ => &[],
        }
    }
}

#[derive(Debug)]
pub struct GeneratedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub qr: QrStatus,
}

impl GeneratedDocument {
    pub fn mime_type(&self) -> &'static str {
        DOCX_MIME
    }
}

/// Hands the resolved QR bytes to `{%qr_code}` tags armed with the
/// placeholder value.
struct QrImageModule {
    image: Option<Vec<u8>>,
}

impl ImageResolver for QrImageModule {
    fn resolve(&self, tag_value: &str, _tag_name: &str) -> Option<Vec<u8>> {
        if tag_value == QR_CODE_PLACEHOLDER {
            self.image.clone()
        } else {
            None
        }
    }

    fn size(&self, _image: &[u8], _tag_value: &str, _tag_name: &str) -> (u32, u32) {
        QR_SIZE_PX
    }
}

pub fn generate(
    fetcher: &Fetcher,
    source: &TemplateSource,
    record: &ContractRecord,
) -> Result<GeneratedDocument, GenerationError> {
    let result = run(fetcher, source, record);
    if let Err(err) = &result {
        error!(
            "Contract {:?} failed at stage '{}': {}",
            record.contract_number,
            err.stage(),
            err
        );
    }
    result
}

fn run(
    fetcher: &Fetcher,
    source: &TemplateSource,
    record: &ContractRecord,
) -> Result<GeneratedDocument, GenerationError> {
    probe_template(fetcher, source)?;

    let (image, qr) = match resolve_qr_image(fetcher, record.qr_code.as_deref()) {
        QrImage::Resolved(bytes) => (Some(bytes), QrStatus::Embedded),
        QrImage::Absent => (None, QrStatus::Absent),
        QrImage::Unavailable(reason) => {
            warn!(
                "Contract {:?} continues past stage '{}' without a QR image",
                record.contract_number,
                Stage::ResolveImage
            );
            (None, QrStatus::Degraded { reason })
        }
    };

    let data = TemplateContext::build(record, image.is_some())
        .to_value()
        .map_err(GenerationError::Context)?;

    let template = fetcher.fetch(source).map_err(GenerationError::Fetch)?;
    let package = DocxPackage::from_bytes(&template).map_err(GenerationError::Load)?;

    let rendered = TemplateEngine::new(package, contract_options())
        .map_err(GenerationError::Render)?
        .with_image_module(Box::new(QrImageModule { image }))
        .render(&data)
        .map_err(GenerationError::Render)?;

    let bytes = rendered.to_bytes().map_err(GenerationError::Serialize)?;
    let file_name = file_name_for(record.contract_number.as_deref());
    info!(
        "Generated {} ({} bytes, QR {})",
        file_name,
        bytes.len(),
        qr.label()
    );

    Ok(GeneratedDocument {
        file_name,
        bytes,
        qr,
    })
}

/// `Contract_<number>.docx`, keeping only characters that are safe in a
/// file name and a `Content-Disposition` header.
pub fn file_name_for(contract_number: Option<&str>) -> String {
    let cleaned: String = contract_number
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');

    if cleaned.is_empty() {
        format!("Contract_{FILE_NAME_FALLBACK}.docx")
    } else {
        format!("Contract_{cleaned}.docx")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::format::NOT_AVAILABLE;
    use crate::docx::package::MAIN_DOCUMENT;
    use crate::docx::testing::{docx_with_body, paragraph};
    use crate::pipeline::testing::serve;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use std::io::Write;
    use std::time::Duration;

    const PNG_BYTES: [u8; 16] = [
        0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
    ];

    fn contract_body() -> String {
        [
            paragraph("Шартнома № {contract_number}"),
            paragraph("Нархи: {price} ({price_in_words})"),
            paragraph("Банк: {bank_name}"),
            paragraph("{#laboratory}"),
            paragraph("{index}. {name}"),
            paragraph("{/laboratory}"),
            paragraph("Март: {март}"),
            paragraph("{%qr_code}"),
        ]
        .concat()
    }

    struct Template {
        _file: tempfile::NamedTempFile,
        source: TemplateSource,
    }

    fn template(body: &str) -> Template {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&docx_with_body(body)).unwrap();
        let source = TemplateSource::Path(file.path().to_path_buf());
        Template {
            _file: file,
            source,
        }
    }

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(2))
    }

    fn document_xml(bytes: &[u8]) -> String {
        let package = DocxPackage::from_bytes(bytes).unwrap();
        package.part_text(MAIN_DOCUMENT).unwrap().unwrap().to_string()
    }

    #[test]
    fn minimal_record_renders_sentinels() {
        let template = template(&contract_body());
        let record = ContractRecord {
            contract_number: Some("A-17".to_string()),
            ..Default::default()
        };

        let document = generate(&fetcher(), &template.source, &record).unwrap();
        assert_eq!(document.file_name, "Contract_A-17.docx");
        assert_eq!(document.qr, QrStatus::Absent);

        let xml = document_xml(&document.bytes);
        assert!(xml.contains("Шартнома № A-17"));
        assert!(xml.contains(&format!("Банк: {NOT_AVAILABLE}")));
        assert!(xml.contains(&format!("Март: {NOT_AVAILABLE}")));
        assert!(!xml.contains("{#laboratory}"));
        assert!(!xml.contains("<w:drawing>"));
    }

    #[test]
    fn fills_values_and_rows() {
        let template = template(&contract_body());
        let record: ContractRecord = serde_json::from_value(serde_json::json!({
            "contractNumber": "B/9",
            "price": 1250000,
            "laboratory": [{ "name": "Кимё" }, { "name": "Физика" }],
            "monthlyPayments": [{ "month": 3, "fee": 500000 }]
        }))
        .unwrap();

        let document = generate(&fetcher(), &template.source, &record).unwrap();
        assert_eq!(document.file_name, "Contract_B_9.docx");

        let xml = document_xml(&document.bytes);
        assert!(xml.contains("1 250 000 сўм (бир миллион икки юз эллик минг сўм)"));
        assert!(xml.contains("1. Кимё"));
        assert!(xml.contains("2. Физика"));
        assert!(xml.contains("Март: 500 000 сўм"));
    }

    #[test]
    fn undefined_placeholder_fails_at_probe() {
        let template = template(&paragraph("{contract_number} {missing_field}"));
        let err = generate(&fetcher(), &template.source, &ContractRecord::default()).unwrap_err();
        assert_eq!(err.stage(), Stage::Probe);
        let details = err.render_details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].id, "undefined_tag");
    }

    #[test]
    fn unreachable_qr_degrades() {
        let template = template(&contract_body());
        let record = ContractRecord {
            qr_code: Some("http://127.0.0.1:9/qr.png".to_string()),
            ..Default::default()
        };

        let document = generate(&fetcher(), &template.source, &record).unwrap();
        assert!(matches!(document.qr, QrStatus::Degraded { .. }));
        assert!(!document_xml(&document.bytes).contains("<w:drawing>"));
    }

    #[test]
    fn missing_qr_url_degrades() {
        let template = template(&contract_body());
        let base = serve(404, "text/plain", b"gone".to_vec());
        let record = ContractRecord {
            qr_code: Some(format!("{base}/qr/A-17.png")),
            ..Default::default()
        };

        let document = generate(&fetcher(), &template.source, &record).unwrap();
        match &document.qr {
            QrStatus::Degraded { reason } => assert!(reason.contains("404"), "{reason}"),
            other => panic!("expected degraded QR, got {other:?}"),
        }
        assert!(!document_xml(&document.bytes).contains("<w:drawing>"));
    }

    #[test]
    fn embeds_downloaded_qr() {
        let template = template(&contract_body());
        let base = serve(200, "image/png", PNG_BYTES.to_vec());
        let record = ContractRecord {
            qr_code: Some(format!("{base}/qr/A-17.png")),
            ..Default::default()
        };

        let document = generate(&fetcher(), &template.source, &record).unwrap();
        assert_eq!(document.qr, QrStatus::Embedded);

        let package = DocxPackage::from_bytes(&document.bytes).unwrap();
        assert!(package.part_text(MAIN_DOCUMENT).unwrap().unwrap().contains("<w:drawing>"));
        let media = format!("word/media/image_{:x}.png", md5::compute(PNG_BYTES));
        assert_eq!(package.part(&media), Some(&PNG_BYTES[..]));
    }

    #[test]
    fn renders_template_served_over_http() {
        let base = serve(
            200,
            "application/octet-stream",
            docx_with_body(&contract_body()),
        );
        let source = TemplateSource::parse(&format!("{base}/templates/contract.docx"));
        assert!(matches!(source, TemplateSource::Url(_)));

        let record = ContractRecord {
            contract_number: Some("URL-1".to_string()),
            ..Default::default()
        };
        let document = generate(&fetcher(), &source, &record).unwrap();
        assert_eq!(document.file_name, "Contract_URL-1.docx");
        assert!(document_xml(&document.bytes).contains("Шартнома № URL-1"));
    }

    #[test]
    fn unavailable_remote_template_fails_at_probe() {
        let base = serve(500, "text/plain", b"down".to_vec());
        let source = TemplateSource::parse(&format!("{base}/templates/contract.docx"));
        let err = generate(&fetcher(), &source, &ContractRecord::default()).unwrap_err();
        assert_eq!(err.stage(), Stage::Probe);
        assert!(matches!(
            err,
            GenerationError::Probe(ProbeError::Fetch(FetchError::Status { status: 500, .. }))
        ));
    }

    #[test]
    fn embeds_data_uri_qr() {
        let template = template(&contract_body());
        let record = ContractRecord {
            qr_code: Some(format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES))),
            ..Default::default()
        };

        let document = generate(&fetcher(), &template.source, &record).unwrap();
        assert_eq!(document.qr, QrStatus::Embedded);

        let package = DocxPackage::from_bytes(&document.bytes).unwrap();
        let xml = package.part_text(MAIN_DOCUMENT).unwrap().unwrap();
        assert!(xml.contains("<w:drawing>"));
        assert!(!xml.contains(QR_CODE_PLACEHOLDER));
        assert!(package.part_text("word/_rels/document.xml.rels").unwrap().unwrap().contains("media/"));
    }

    #[test]
    fn output_reopens_as_docx() {
        let template = template(&contract_body());
        let document = generate(&fetcher(), &template.source, &ContractRecord::default()).unwrap();
        assert_eq!(document.mime_type(), DOCX_MIME);
        assert_eq!(
            DOCX_MIME,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(document.file_name, "Contract_unknown.docx");

        let package = DocxPackage::from_bytes(&document.bytes).unwrap();
        assert!(package.has_part(MAIN_DOCUMENT));
        assert!(package.has_part("[Content_Types].xml"));
    }

    #[test]
    fn sanitizes_file_names() {
        assert_eq!(file_name_for(Some("12/2024")), "Contract_12_2024.docx");
        assert_eq!(file_name_for(Some("  ")), "Contract_unknown.docx");
        assert_eq!(file_name_for(Some("..")), "Contract_unknown.docx");
        assert_eq!(file_name_for(None), "Contract_unknown.docx");
        assert_eq!(file_name_for(Some("Ш-5")), "Contract_Ш-5.docx");
    }
}
