use std::time::Duration;

use actix_web::error::JsonPayloadError;
use actix_web::web::*;

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::Limiter;

mod auth;
mod contact;
mod health;
mod listing;
mod mentor;
mod points;
mod reference;
mod request;
mod school_request;
mod user;

const MAX_JSON_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct RouteLimiters {
    pub create_user: Limiter,
    pub password: Limiter,
    pub email: Limiter,
    pub refresh_tokens: Limiter,
    pub create_content: Limiter,
    pub contact: Limiter,
}

impl Default for RouteLimiters {
    fn default() -> Self {
        const CLEAR_FREQUENCY: Duration = Duration::from_secs(3600 * 24);

        Self {
            create_user: Limiter::new(5, Duration::from_secs(1200), CLEAR_FREQUENCY),
            password: Limiter::new(6, Duration::from_secs(600), CLEAR_FREQUENCY),
            email: Limiter::new(6, Duration::from_secs(360), CLEAR_FREQUENCY),
            refresh_tokens: Limiter::new(20, Duration::from_secs(180), CLEAR_FREQUENCY),
            create_content: Limiter::new(20, Duration::from_secs(600), CLEAR_FREQUENCY),
            contact: Limiter::new(5, Duration::from_secs(3600), CLEAR_FREQUENCY),
        }
    }
}

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/api")
            .app_data(json_config())
            .configure(|cfg| auth::configure(cfg, limiters.clone()))
            .configure(|cfg| contact::configure(cfg, limiters.clone()))
            .configure(health::configure)
            .configure(|cfg| listing::configure(cfg, limiters.clone()))
            .configure(mentor::configure)
            .configure(points::configure)
            .configure(reference::configure)
            .configure(|cfg| request::configure(cfg, limiters.clone()))
            .configure(|cfg| school_request::configure(cfg, limiters.clone()))
            .configure(|cfg| user::configure(cfg, limiters)),
    );
}

fn json_config() -> JsonConfig {
    JsonConfig::default()
        .limit(MAX_JSON_BODY_BYTES)
        .error_handler(|err, _req| {
            let resp = match err {
                JsonPayloadError::Overflow { limit }
                | JsonPayloadError::OverflowKnownLength { limit, .. } => {
                    HttpErrorResponse::InputTooLarge(format!(
                        "Request body cannot be larger than {limit} bytes"
                    ))
                }
                e => HttpErrorResponse::InvalidMessage(e.to_string()),
            };

            resp.into()
        })
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;
    use actix_web::http::header::ContentType;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use peercodex_common::messages::{ErrorType, ServerErrorResponse};

    use crate::handlers::test_utils;

    #[actix_web::test]
    async fn test_malformed_json_is_rejected() {
        let app = test_utils::init_app().await;

        let req = TestRequest::post()
            .uri("/api/contact")
            .insert_header(ContentType::json())
            .set_payload("{\"name\": \"Pat\"")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let resp_body: ServerErrorResponse = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(resp_body.err_type, ErrorType::InvalidMessage);

        let req = TestRequest::post()
            .uri("/api/contact")
            .insert_header(ContentType::json())
            .set_payload(format!("\"{}\"", "a".repeat(super::MAX_JSON_BODY_BYTES)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn test_limiter_applies_to_routes() {
        let app = test_utils::init_app().await;

        for _ in 0..5 {
            let req = TestRequest::post()
                .uri("/api/contact")
                .insert_header(("test-ip", "10.0.0.7"))
                .set_json(serde_json::json!({"name": "", "email": "", "message": ""}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        let req = TestRequest::post()
            .uri("/api/contact")
            .insert_header(("test-ip", "10.0.0.7"))
            .set_json(serde_json::json!({"name": "", "email": "", "message": ""}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let req = TestRequest::post()
            .uri("/api/contact")
            .insert_header(("test-ip", "10.0.0.8"))
            .set_json(serde_json::json!({"name": "", "email": "", "message": ""}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
