use peercodex_common::messages::ReferenceData;

use actix_web::HttpResponse;

pub async fn get() -> HttpResponse {
    HttpResponse::Ok().json(ReferenceData::current())
}
