//! # Contract Document Generation Service
//!
//! Provides `POST /api/contracts/document`. The handler moves the record onto
//! the blocking pool, runs the whole pipeline there (probe, QR download,
//! template fetch, render, zip) and streams the finished DOCX back as an
//! attachment.
//!
//! Failures map to status codes by stage:
//! - template probe failed: `503 Service Unavailable`
//! - placeholders failed with the contract's data: `422 Unprocessable Entity`
//!   with every `RenderErrorDetail`
//! - anything else, including a panicked worker: `500 Internal Server Error`

use actix_web::http::header::{
    Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue,
};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use common::model::contract::ContractRecord;
use common::model::generation::GenerationFailure;
use log::{error, info};

use crate::pipeline::generator::{generate, GenerationError, Stage};
use crate::state::AppState;

pub const QR_STATUS_HEADER: &str = "X-Qr-Status";

/// The Actix web handler for `POST /api/contracts/document`.
pub(crate) async fn process(
    state: web::Data<AppState>,
    payload: web::Json<ContractRecord>,
) -> impl Responder {
    let record = payload.into_inner();
    info!("Generating contract document for {:?}", record.contract_number);

    let state = state.into_inner();
    let handle = tokio::task::spawn_blocking(move || {
        generate(&state.fetcher, &state.template, &record)
    });

    match handle.await {
        Ok(Ok(document)) => HttpResponse::Ok()
            .content_type(document.mime_type())
            .insert_header(attachment(&document.file_name))
            .insert_header((QR_STATUS_HEADER, document.qr.label()))
            .body(document.bytes),
        Ok(Err(err)) => failure_response(&err),
        Err(err) => {
            error!("Document generation task panicked: {}", err);
            HttpResponse::InternalServerError().json(GenerationFailure {
                stage: Stage::Deliver.to_string(),
                message: "Document generation failed unexpectedly".to_string(),
                details: Vec::new(),
            })
        }
    }
}

/// `attachment` disposition. Non-ASCII names get an ASCII `filename` for old
/// clients and the exact name as an RFC 5987 `filename*`.
fn attachment(file_name: &str) -> ContentDisposition {
    let mut parameters = Vec::with_capacity(2);
    if file_name.is_ascii() {
        parameters.push(DispositionParam::Filename(file_name.to_string()));
    } else {
        let fallback: String = file_name
            .chars()
            .map(|c| if c.is_ascii() { c } else { '_' })
            .collect();
        parameters.push(DispositionParam::Filename(fallback));
        parameters.push(DispositionParam::FilenameExt(ExtendedValue {
            charset: Charset::Ext("UTF-8".to_string()),
            language_tag: None,
            value: file_name.as_bytes().to_vec(),
        }));
    }
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters,
    }
}

fn failure_response(err: &GenerationError) -> HttpResponse {
    let status = match err.stage() {
        Stage::Probe => StatusCode::SERVICE_UNAVAILABLE,
        Stage::Render if !err.render_details().is_empty() => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    HttpResponse::build(status).json(GenerationFailure {
        stage: err.stage().to_string(),
        message: err.to_string(),
        details: err.render_details().to_vec(),
    })
}
