//! # Contract Document Service Module
//!
//! Routes under `/api/contracts` that expose the document pipeline over HTTP.
//!
//! ## Sub-modules:
//! - `probe`: Checks that the configured template can be fetched and rendered.
//! - `generate`: Produces a filled DOCX for a contract record.

mod generate;
mod probe;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

/// The base path for all contract document endpoints.
const API_PATH: &str = "/api/contracts";

/// Configures and returns the Actix `Scope` for the contract document routes.
///
/// # Registered Routes:
///
/// *   **`GET /template/probe`**:
///     - **Handler**: `probe::process`
///     - **Description**: Fetches the template and renders it against an empty
///       contract. Answers `200` with a `ProbeReport` when the template is
///       usable and `503` with the failure message otherwise.
///
/// *   **`POST /document`**:
///     - **Handler**: `generate::process`
///     - **Description**: Expects a JSON `ContractRecord` and answers with the
///       filled document as a `Contract_<number>.docx` attachment. The
///       `X-Qr-Status` header tells whether the QR code was embedded.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/template/probe", get().to(probe::process))
        .route("/document", post().to(generate::process))
}
