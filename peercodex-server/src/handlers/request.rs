use peercodex_common::db::{self, DaoError, DbThreadPool};
use peercodex_common::messages::{
    NewRequest, ReceivedRequestItem, ReceivedRequestList, RequestStatusUpdate,
    RequestSummaryOutput, SentRequestItem, SentRequestList,
};
use peercodex_common::models::request::TransitionError;
use peercodex_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::handlers::error::{self, DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    new_request: web::Json<NewRequest>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let new_request = new_request.into_inner();
    let requester_id = user_access_token.claims.user_id;
    let requestee_id = new_request.requestee_id;

    if requestee_id == requester_id {
        return Err(HttpErrorResponse::InvalidState(String::from(
            "You cannot send a request to yourself",
        )));
    }

    let message = String::from(new_request.message.trim());

    if let Validity::Invalid(msg) = validators::validate_request_message(&message) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let request_dao = db::request::Dao::new(&db_thread_pool);
    let request = match web::block(move || {
        request_dao.create_request(requester_id, requestee_id, &message)
    })
    .await?
    {
        Ok(r) => r,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("No mentor with the given ID"),
                DoesNotExistType::User,
            ));
        }
        Err(DaoError::CannotRunQuery(msg)) => {
            return Err(HttpErrorResponse::InvalidState(String::from(msg)));
        }
        Err(e) if error::is_unique_violation(&e) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "You already have a pending request with this mentor",
            )));
        }
        Err(e) => return Err(error::internal(e, "Failed to create request")),
    };

    log::info!(
        "Request {} sent from {} to {}",
        request.id,
        requester_id,
        requestee_id
    );

    Ok(HttpResponse::Created().finish())
}

pub async fn list_sent(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let request_dao = db::request::Dao::new(&db_thread_pool);
    let sent = match web::block(move || request_dao.get_sent_requests(user_id)).await? {
        Ok(s) => s,
        Err(e) => return Err(error::internal(e, "Failed to get sent requests")),
    };

    Ok(HttpResponse::Ok().json(SentRequestList {
        requests: sent.into_iter().map(SentRequestItem::from).collect(),
    }))
}

pub async fn list_received(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let request_dao = db::request::Dao::new(&db_thread_pool);
    let received = match web::block(move || request_dao.get_received_requests(user_id)).await? {
        Ok(r) => r,
        Err(e) => return Err(error::internal(e, "Failed to get received requests")),
    };

    Ok(HttpResponse::Ok().json(ReceivedRequestList {
        requests: received
            .into_iter()
            .map(ReceivedRequestItem::from)
            .collect(),
    }))
}

pub async fn summary(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let request_dao = db::request::Dao::new(&db_thread_pool);
    let summary = match web::block(move || request_dao.get_request_summary(user_id)).await? {
        Ok(s) => s,
        Err(e) => return Err(error::internal(e, "Failed to get request summary")),
    };

    Ok(HttpResponse::Ok().json(RequestSummaryOutput::from(summary)))
}

pub async fn transition(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    request_id: web::Path<Uuid>,
    update: web::Json<RequestStatusUpdate>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let request_id = request_id.into_inner();
    let target = update.into_inner().status;
    let user_id = user_access_token.claims.user_id;

    let request_dao = db::request::Dao::new(&db_thread_pool);
    match web::block(move || request_dao.transition_request(request_id, user_id, target)).await? {
        Ok(request) => {
            log::info!("Request {} marked as {}", request.id, request.status);
            Ok(HttpResponse::Ok().finish())
        }
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            Err(HttpErrorResponse::DoesNotExist(
                String::from("No request with the given ID"),
                DoesNotExistType::Request,
            ))
        }
        Err(DaoError::InvalidTransition(e @ TransitionError::AlreadyResolved(_))) => {
            Err(HttpErrorResponse::OutOfDate(e.to_string()))
        }
        Err(DaoError::InvalidTransition(e @ TransitionError::NotPermitted { .. })) => {
            Err(HttpErrorResponse::UserDisallowed(e.to_string()))
        }
        Err(DaoError::OutOfDate) => Err(HttpErrorResponse::OutOfDate(String::from(
            "Request was answered by another action",
        ))),
        Err(e) => Err(error::internal(e, "Failed to update request")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use peercodex_common::messages::{ErrorType, ServerErrorResponse};
    use peercodex_common::models::request::RequestStatus;
    use peercodex_common::models::user::ProfileChanges;
    use peercodex_common::token::auth_token::AuthTokenType;
    use std::time::SystemTime;

    use crate::env;
    use crate::handlers::test_utils;

    #[actix_web::test]
    async fn test_create_checks_message_before_db() {
        let app = test_utils::init_app().await;

        let user = test_utils::unsaved_user();
        let access_token = test_utils::gen_token(&user, AuthTokenType::Access);

        let req = TestRequest::post()
            .uri("/api/request")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(NewRequest {
                requestee_id: user.id,
                message: String::from("Help me with myself"),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let resp_body: ServerErrorResponse = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(resp_body.err_type, ErrorType::InvalidState);

        let req = TestRequest::post()
            .uri("/api/request")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(NewRequest {
                requestee_id: Uuid::now_v7(),
                message: String::from("   "),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::post()
            .uri("/api/request")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(NewRequest {
                requestee_id: Uuid::now_v7(),
                message: ["word"; 101].join(" "),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let resp_body: ServerErrorResponse = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(resp_body.err_type, ErrorType::IncorrectlyFormed);
    }

    #[actix_web::test]
    #[ignore = "requires a running PostgreSQL database"]
    async fn test_request_lifecycle() {
        let app = test_utils::init_app().await;

        let (mentee, mentee_token) = test_utils::create_user(&[]);
        let (mentor, mentor_token) = test_utils::create_user(&["AP Calculus BC"]);

        let req = TestRequest::post()
            .uri("/api/request")
            .insert_header(("AccessToken", mentee_token.as_str()))
            .set_json(NewRequest {
                requestee_id: Uuid::now_v7(),
                message: String::from("Can you help with series?"),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let new_request = NewRequest {
            requestee_id: mentor.id,
            message: String::from("  Can you help with series?  "),
        };

        let req = TestRequest::post()
            .uri("/api/request")
            .insert_header(("AccessToken", mentee_token.as_str()))
            .set_json(&new_request)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = TestRequest::post()
            .uri("/api/request")
            .insert_header(("AccessToken", mentee_token.as_str()))
            .set_json(&new_request)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let resp_body: ServerErrorResponse = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(resp_body.err_type, ErrorType::ConflictWithExisting);

        let req = TestRequest::get()
            .uri("/api/request/sent")
            .insert_header(("AccessToken", mentee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let sent: SentRequestList = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(sent.requests.len(), 1);
        assert_eq!(sent.requests[0].message, "Can you help with series?");
        assert_eq!(sent.requests[0].status, "pending");
        assert!(sent.requests[0].contact.is_none());

        let request_id = sent.requests[0].id;

        // Only the requestee may accept
        let req = TestRequest::put()
            .uri(&format!("/api/request/{request_id}/status"))
            .insert_header(("AccessToken", mentee_token.as_str()))
            .set_json(RequestStatusUpdate {
                status: RequestStatus::Accepted,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let (outsider, outsider_token) = test_utils::create_user(&[]);
        let req = TestRequest::put()
            .uri(&format!("/api/request/{request_id}/status"))
            .insert_header(("AccessToken", outsider_token.as_str()))
            .set_json(RequestStatusUpdate {
                status: RequestStatus::Accepted,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = TestRequest::put()
            .uri(&format!("/api/request/{request_id}/status"))
            .insert_header(("AccessToken", mentor_token.as_str()))
            .set_json(RequestStatusUpdate {
                status: RequestStatus::Accepted,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::put()
            .uri(&format!("/api/request/{request_id}/status"))
            .insert_header(("AccessToken", mentee_token.as_str()))
            .set_json(RequestStatusUpdate {
                status: RequestStatus::Cancelled,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let resp_body: ServerErrorResponse = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(resp_body.err_type, ErrorType::OutOfDate);

        // Contact details are copied when the request is accepted, so later edits don't leak
        let user_dao = db::user::Dao::new(&env::testing::DB_THREAD_POOL);
        user_dao
            .update_profile(
                mentor.id,
                &ProfileChanges {
                    school: mentor.school.as_deref(),
                    grade: mentor.grade.as_deref(),
                    phone_number: None,
                    discord: Some("changed"),
                    mentor_subjects: &mentor.mentor_subjects,
                    modified_timestamp: SystemTime::now(),
                },
            )
            .unwrap();

        let req = TestRequest::get()
            .uri("/api/request/sent")
            .insert_header(("AccessToken", mentee_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let sent: SentRequestList = serde_json::from_slice(&resp_body).unwrap();

        let contact = sent.requests[0].contact.as_ref().unwrap();
        assert_eq!(contact.phone_number.as_deref(), Some("5551234567"));
        assert_eq!(contact.discord.as_deref(), Some("tester"));

        let req = TestRequest::get()
            .uri("/api/request/received")
            .insert_header(("AccessToken", mentor_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let received: ReceivedRequestList = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(received.requests.len(), 1);
        assert_eq!(received.requests[0].requester_id, mentee.id);
        assert_eq!(received.requests[0].points_received, 0);

        let req = TestRequest::get()
            .uri("/api/request/summary")
            .insert_header(("AccessToken", mentor_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let summary: RequestSummaryOutput = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(summary.received.accepted, 1);
        assert_eq!(summary.received.pending, 0);
        assert_eq!(summary.sent.accepted, 0);
        assert_eq!(summary.total_points_received, 0);

        for user in [mentee, mentor, outsider] {
            user_dao.delete_user(user.id).unwrap();
        }
    }
}
