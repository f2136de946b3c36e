use actix_web::web::*;

use crate::handlers::request;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/request")
            .service(
                resource("")
                    .route(post().to(request::create).wrap(limiters.create_content)),
            )
            .service(resource("/sent").route(get().to(request::list_sent)))
            .service(resource("/received").route(get().to(request::list_received)))
            .service(resource("/summary").route(get().to(request::summary)))
            .service(resource("/{request_id}/status").route(put().to(request::transition))),
    );
}
