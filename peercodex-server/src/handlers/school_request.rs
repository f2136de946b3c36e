use peercodex_common::db::{self, DbThreadPool};
use peercodex_common::messages::{NewSchoolRequest, SchoolRequestItem, SchoolRequestList};

use actix_web::{web, HttpResponse};

use crate::handlers::error::{self, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

const MAX_SCHOOL_NAME_LENGTH: usize = 200;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    new_request: web::Json<NewSchoolRequest>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let school_name = String::from(new_request.into_inner().school_name.trim());

    if school_name.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "School name is required",
        )));
    }

    if school_name.chars().count() > MAX_SCHOOL_NAME_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "School name cannot be longer than {MAX_SCHOOL_NAME_LENGTH} characters"
        )));
    }

    let requester_id = user_access_token.claims.user_id;

    let school_request_dao = db::school_request::Dao::new(&db_thread_pool);
    let request = match web::block(move || {
        school_request_dao.create_school_add_request(requester_id, &school_name)
    })
    .await?
    {
        Ok(r) => r,
        Err(e) => return Err(error::internal(e, "Failed to save school request")),
    };

    Ok(HttpResponse::Created().json(SchoolRequestItem::from(request)))
}

pub async fn list_mine(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let requester_id = user_access_token.claims.user_id;

    let school_request_dao = db::school_request::Dao::new(&db_thread_pool);
    let requests = match web::block(move || {
        school_request_dao.get_school_requests_for_user(requester_id)
    })
    .await?
    {
        Ok(r) => r,
        Err(e) => return Err(error::internal(e, "Failed to get school requests")),
    };

    Ok(HttpResponse::Ok().json(SchoolRequestList {
        school_requests: requests.into_iter().map(SchoolRequestItem::from).collect(),
    }))
}
