use peercodex_common::db::DbThreadPool;

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::env;

#[derive(Deserialize)]
pub struct HealthKeyQuery {
    pub key: Option<String>,
}

pub async fn heartbeat() -> impl Responder {
    HttpResponse::Ok()
}

pub async fn health(
    db_thread_pool: web::Data<DbThreadPool>,
    query: web::Query<HealthKeyQuery>,
) -> impl Responder {
    if !is_health_key_correct(query.key.as_deref()) {
        return HttpResponse::Unauthorized().finish();
    }

    let pool_state = db_thread_pool.state();
    let resp_body = json!({
        "db_thread_pool_state": {
            "max_connections": db_thread_pool.max_size(),
            "connections": pool_state.connections,
            "idle_connections": pool_state.idle_connections
        }
    });

    HttpResponse::Ok().json(resp_body)
}

#[inline]
fn is_health_key_correct(key: Option<&str>) -> bool {
    let Some(key) = key else {
        return false;
    };

    let correct_key = env::CONF.health_endpoint_key.as_bytes();
    let key = key.as_bytes();

    let mut keys_dont_match = 0u8;

    if correct_key.len() != key.len() || key.is_empty() {
        return false;
    }

    // Do bitwise comparison to prevent timing attacks
    for (i, correct_key_byte) in correct_key.iter().enumerate() {
        unsafe {
            keys_dont_match |= correct_key_byte ^ key.get_unchecked(i);
        }
    }

    keys_dont_match == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};

    use crate::handlers::test_utils;

    #[test]
    fn test_is_health_key_correct() {
        assert!(is_health_key_correct(Some(&env::CONF.health_endpoint_key)));
        assert!(!is_health_key_correct(Some("test-health-kez")));
        assert!(!is_health_key_correct(Some("short")));
        assert!(!is_health_key_correct(Some("")));
        assert!(!is_health_key_correct(None));
    }

    #[actix_web::test]
    async fn test_heartbeat() {
        let app = test_utils::init_app().await;

        let req = TestRequest::get().uri("/api/health/heartbeat").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_health_reports_pool_state() {
        let app = test_utils::init_app().await;

        let req = TestRequest::get()
            .uri(&format!("/api/health?key={}", env::CONF.health_endpoint_key))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = test::read_body(resp).await;
        let resp_json: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();

        let db_state = resp_json.get("db_thread_pool_state").unwrap();
        assert_eq!(
            db_state.get("max_connections").and_then(|c| c.as_u64()),
            Some(env::CONF.db_max_connections as u64)
        );
        assert!(db_state.get("connections").is_some());
        assert!(db_state.get("idle_connections").is_some());
    }

    #[actix_web::test]
    async fn test_health_rejects_bad_keys() {
        let app = test_utils::init_app().await;

        for uri in ["/api/health", "/api/health?key=invalid_key", "/api/health?key="] {
            let req = TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
