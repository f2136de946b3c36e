use actix_web::web::*;

use crate::handlers::points;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/points")
            .route("/balance", get().to(points::get_balance))
            .route("/award", post().to(points::award))
            .route("/received", get().to(points::received)),
    );
}
