pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod enums;
pub mod error;
pub mod flow;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod store;

use actix_web::web;
use diesel::PgConnection;
use diesel::r2d2::{self, ConnectionManager};

use crate::error::ApiError;
use crate::handlers::{dashboard, departments, patients, queue, requests, session, visits};

// Database connection pool type
pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Registers every route. Malformed forms, query strings and path ids are
/// reported with the same JSON body as any other validation error.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(|err, _| ApiError::validation(err.to_string()).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _| ApiError::validation(err.to_string()).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _| ApiError::validation(err.to_string()).into()))
        .route("/health", web::get().to(session::health))
        .route("/login", web::post().to(session::login))
        .route("/logout", web::post().to(session::logout))
        .route("/me", web::get().to(session::me))
        .route("/dashboard", web::get().to(dashboard::dashboard))
        .route("/admin/dashboard", web::get().to(dashboard::admin_dashboard))
        .service(
            web::scope("/patients")
                .route("", web::get().to(patients::list))
                .route("", web::post().to(patients::register))
                .route("/{patient_id}", web::get().to(patients::get))
                .route("/{patient_id}", web::post().to(patients::update))
                .route("/{patient_id}/status", web::post().to(patients::set_status))
                .route("/{patient_id}/send-to-doctor", web::post().to(patients::send_to_doctor)),
        )
        .service(
            web::scope("/queue")
                .route("", web::get().to(queue::active))
                .route("/waiting", web::get().to(queue::waiting))
                .route("/{queue_id}/start", web::post().to(queue::start))
                .route("/{queue_id}/complete", web::post().to(queue::complete)),
        )
        .service(
            web::scope("/visits")
                .route("", web::get().to(visits::list))
                .route("", web::post().to(visits::create))
                .route("/{visit_id}", web::get().to(visits::get))
                .route("/{visit_id}", web::post().to(visits::update))
                .route("/{visit_id}/delete", web::post().to(visits::delete))
                .route("/{visit_id}/refer", web::post().to(visits::refer)),
        )
        .service(
            web::scope("/departments/{department}/referrals")
                .route("", web::get().to(departments::worklist))
                .route("/{referral_id}/status", web::post().to(departments::transition)),
        )
        .service(
            web::scope("/lab-requests")
                .route("", web::get().to(requests::list_lab_requests))
                .route("", web::post().to(requests::create_lab_request))
                .route("/pending", web::get().to(requests::pending_lab_requests))
                .route("/{request_id}/result", web::post().to(requests::record_lab_result)),
        )
        .service(
            web::scope("/ultrasound")
                .route("", web::get().to(requests::list_ultrasound_requests))
                .route("", web::post().to(requests::create_ultrasound_request))
                .route("/pending", web::get().to(requests::pending_ultrasound_requests))
                .route("/{report_id}/report", web::post().to(requests::record_ultrasound_report)),
        )
        .route("/results", web::get().to(requests::results));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};

    use crate::config::AppConfig;

    // A pool that never connects; only usable by routes that fail before a query runs.
    fn offline_pool() -> DbPool {
        let manager = ConnectionManager::<PgConnection>::new("postgres://localhost:1/offline");
        r2d2::Pool::builder().max_size(1).build_unchecked(manager)
    }

    fn offline_config() -> AppConfig {
        AppConfig::from_lookup(|key| (key == "DATABASE_URL").then(|| "postgres://localhost:1/offline".to_string()))
            .unwrap()
    }

    macro_rules! offline_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(offline_pool()))
                    .app_data(web::Data::new(offline_config()))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn health_needs_no_session() {
        let app = offline_app!();
        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn protected_routes_reject_missing_session() {
        let app = offline_app!();
        for uri in ["/me", "/dashboard", "/queue", "/patients", "/departments/lab/referrals"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
        }
    }

    #[actix_web::test]
    async fn state_transitions_reject_missing_session() {
        let app = offline_app!();
        let req = test::TestRequest::post().uri("/queue/5/start").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn login_requires_both_fields() {
        let app = offline_app!();
        let req = test::TestRequest::post()
            .uri("/login")
            .set_form([("username", "doctor")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Password is required.");
    }

    #[actix_web::test]
    async fn logout_without_session_still_clears_cookie() {
        let app = offline_app!();
        let resp = test::call_service(&app, test::TestRequest::post().uri("/logout").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == auth::SESSION_COOKIE)
            .expect("removal cookie");
        assert_eq!(cookie.value(), "");
    }
}
