use actix_web::web::*;

use crate::handlers::mentor;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/mentor").route("/search", post().to(mentor::search)));
}
