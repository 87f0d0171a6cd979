use actix_web::{web, HttpResponse, Responder};
use common::model::diagnostic::ProbeReport;
use log::error;

use crate::pipeline::probe::{probe_template, report};
use crate::state::AppState;

/// The Actix web handler for `GET /api/contracts/template/probe`.
///
/// The probe fetches over the network and walks the whole template, so it
/// runs on the blocking pool.
pub(crate) async fn process(state: web::Data<AppState>) -> impl Responder {
    let state = state.into_inner();
    let handle =
        tokio::task::spawn_blocking(move || probe_template(&state.fetcher, &state.template));

    match handle.await {
        Ok(result) => {
            let report = report(&result);
            if report.ok {
                HttpResponse::Ok().json(report)
            } else {
                HttpResponse::ServiceUnavailable().json(report)
            }
        }
        Err(err) => {
            error!("Template probe task panicked: {}", err);
            HttpResponse::InternalServerError().json(ProbeReport {
                ok: false,
                message: "Template probe failed unexpectedly".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::docx::testing::{docx_with_body, paragraph};
    use crate::services::contracts::configure_routes;
    use crate::services::contracts::test_support::state_with_template;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use common::model::diagnostic::ProbeReport;

    #[actix_web::test]
    async fn reports_usable_template() {
        let (_file, state) = state_with_template(&docx_with_body(&paragraph("{full_name}")));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(configure_routes()),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/contracts/template/probe")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let report: ProbeReport = test::read_body_json(resp).await;
        assert!(report.ok);
    }

    #[actix_web::test]
    async fn reports_broken_template() {
        let (_file, state) = state_with_template(&docx_with_body(&paragraph("{nope}")));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(configure_routes()),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/contracts/template/probe")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let report: ProbeReport = test::read_body_json(resp).await;
        assert!(!report.ok);
        assert!(report.message.contains("nope"));
    }
}
