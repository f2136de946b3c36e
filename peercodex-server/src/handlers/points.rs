use peercodex_common::db::{self, DaoError, DbThreadPool};
use peercodex_common::messages::{AwardResult, PointAwardForm, PointBalance, PointsReceivedOutput};
use peercodex_common::points::{self, AwardError, MAX_SINGLE_AWARD};

use actix_web::{web, HttpResponse};

use crate::handlers::error::{self, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

pub async fn get_balance(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let points_dao = db::points::Dao::new(&db_thread_pool);
    let balance = match web::block(move || points_dao.get_balance(user_id)).await? {
        Ok(b) => b,
        Err(e) => return Err(error::internal(e, "Failed to get point balance")),
    };

    Ok(HttpResponse::Ok().json(PointBalance {
        balance,
        month_tag: points::current_month_tag(),
        award_options: points::award_options(balance),
    }))
}

pub async fn award(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    award_form: web::Json<PointAwardForm>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let PointAwardForm { mentor_id, amount } = award_form.into_inner();
    let mentee_id = user_access_token.claims.user_id;

    if mentor_id == mentee_id {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "You cannot award points to yourself",
        )));
    }

    // Catch malformed amounts before taking a connection. The balance is checked again inside
    // the award transaction.
    if let Err(e) = points::apply_award(amount, MAX_SINGLE_AWARD) {
        return Err(HttpErrorResponse::IncorrectlyFormed(e.to_string()));
    }

    let points_dao = db::points::Dao::new(&db_thread_pool);
    let remaining_balance =
        match web::block(move || points_dao.award_points(mentee_id, mentor_id, amount)).await? {
            Ok(b) => b,
            Err(DaoError::AwardRejected(e @ AwardError::NotEnoughPoints { .. })) => {
                return Err(HttpErrorResponse::NotEnoughPoints(e.to_string()));
            }
            Err(DaoError::AwardRejected(e)) => {
                return Err(HttpErrorResponse::IncorrectlyFormed(e.to_string()));
            }
            Err(DaoError::NoAcceptedRequest) => {
                return Err(HttpErrorResponse::UserDisallowed(String::from(
                    "Points can only be awarded to a mentor who accepted your request",
                )));
            }
            Err(e) => return Err(error::internal(e, "Failed to award points")),
        };

    log::info!("{mentee_id} awarded {amount} points to {mentor_id}");

    Ok(HttpResponse::Ok().json(AwardResult { remaining_balance }))
}

pub async fn received(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let points_dao = db::points::Dao::new(&db_thread_pool);
    let received = match web::block(move || points_dao.get_points_received(user_id)).await? {
        Ok(r) => r,
        Err(e) => return Err(error::internal(e, "Failed to get points received")),
    };

    Ok(HttpResponse::Ok().json(PointsReceivedOutput::from(received)))
}
