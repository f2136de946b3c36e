use actix_web::web::*;

use crate::handlers::listing;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/listing")
            .service(
                resource("")
                    .route(post().to(listing::create).wrap(limiters.create_content))
                    .route(get().to(listing::list)),
            )
            .service(resource("/mine").route(get().to(listing::list_mine)))
            .service(resource("/{listing_id}").route(delete().to(listing::delete)))
            .service(
                resource("/{listing_id}/status").route(put().to(listing::update_status)),
            ),
    );
}
