use actix_web::web::*;

use crate::handlers::school_request;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        resource("/school_request")
            .route(
                post()
                    .to(school_request::create)
                    .wrap(limiters.create_content),
            )
            .route(get().to(school_request::list_mine)),
    );
}
